//! Deriving TLSA certificate associations from a TLS certificate.
//!
//! The associations are fixed to TCP port 443; the produced records sit at
//! the zone apex and the wildcard name rather than under a `_443._tcp`
//! prefix.

use bytes::Bytes;
use domain::base::iana::Class;
use domain::base::rdata::UnknownRecordData;
use domain::base::{Record, Rtype};
use domain::rdata::ZoneRecordData;
use ring::digest;

use crate::error::{Error, Result};
use crate::zone::{StoredRecord, ZoneName, ZONE_TTL};

//------------ Constants -----------------------------------------------------

// DANE-EE: the zone vouches for exactly this certificate.
const CERT_USAGE_DANE_EE: u8 = 3;
// Selector: the full certificate, matched by its SHA-256 digest.
const SELECTOR_CERT: u8 = 0;
const MATCHING_SHA256: u8 = 1;

//------------ CertAssociation -----------------------------------------------

/// The TLSA rdata derived from one certificate.
///
/// Deriving is deterministic: identical certificate bytes always produce
/// identical association data, so the generator can safely run again after
/// every certificate rotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertAssociation {
    rdata: Vec<u8>,
}

impl CertAssociation {
    /// Compute the association for a PEM encoded certificate.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let mut reader = pem;
        let der = rustls_pemfile::certs(&mut reader)
            .next()
            .ok_or_else(|| Error::new("certificate file contains no certificate"))?
            .map_err(|err| Error::new(&format!("cannot parse certificate: {err}")))?;

        let hash = digest::digest(&digest::SHA256, der.as_ref());
        let mut rdata = Vec::with_capacity(3 + hash.as_ref().len());
        rdata.extend_from_slice(&[CERT_USAGE_DANE_EE, SELECTOR_CERT, MATCHING_SHA256]);
        rdata.extend_from_slice(hash.as_ref());
        Ok(CertAssociation { rdata })
    }

    /// The raw TLSA rdata: usage, selector, matching type, association data.
    pub fn rdata(&self) -> &[u8] {
        &self.rdata
    }

    /// The TLSA record pair for a zone: apex record plus wildcard clone.
    ///
    /// The wildcard record differs from the base record in its owner name
    /// only, so subdomains pin the same certificate.
    pub fn into_records(self, origin: &ZoneName) -> Result<(StoredRecord, StoredRecord)> {
        let data = UnknownRecordData::from_octets(Rtype::TLSA, Bytes::from(self.rdata))
            .map_err(|err| Error::new(&format!("cannot build TLSA record data: {err}")))?;
        let base = Record::new(
            origin.apex().clone(),
            Class::IN,
            ZONE_TTL,
            ZoneRecordData::Unknown(data.clone()),
        );
        let wildcard = Record::new(
            origin.wildcard().clone(),
            Class::IN,
            ZONE_TTL,
            ZoneRecordData::Unknown(data),
        );
        Ok((base, wildcard))
    }
}

//============ Tests =========================================================

//! Selecting and sequencing RRset signatures.
//!
//! The rules are fixed: the apex DNSKEY RRset is signed by the key-signing
//! key and nothing else; every other RRset is signed by the zone-signing
//! key. The canonical encoding and the signature math itself live in the
//! `domain` crate; this module only decides which key signs what, and in
//! which order.

use bytes::Bytes;
use domain::base::iana::{Class, Rtype};
use domain::base::Record;
use domain::crypto::sign::{KeyPair, SecretKeyBytes};
use domain::dnssec::common::parse_from_bind;
use domain::dnssec::sign::keys::SigningKey;
use domain::dnssec::sign::records::Rrset;
use domain::dnssec::sign::signatures::rrsigs::sign_rrset;
use domain::rdata::dnssec::Timestamp;
use domain::rdata::{Dnskey, ZoneRecordData};

use crate::error::{Error, Result};
use crate::zone::{
    is_rrsig_covering, StoredName, StoredRecord, StoredRecordData, Zone, ZONE_TTL,
};

//------------ Constants -----------------------------------------------------

/// How long produced signatures stay valid.
const FOUR_WEEKS: u32 = 2419200;

// DNSKEY flag bits.
const FLAG_SEP: u16 = 0x0001;
const FLAG_ZONE: u16 = 0x0100;

//------------ KeyRole -------------------------------------------------------

/// What a key is allowed to sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyRole {
    /// Key-signing key: signs the apex DNSKEY RRset, nothing else.
    Ksk,

    /// Zone-signing key: signs every RRset except DNSKEY.
    Zsk,
}

impl KeyRole {
    fn as_str(self) -> &'static str {
        match self {
            KeyRole::Ksk => "KSK",
            KeyRole::Zsk => "ZSK",
        }
    }
}

//------------ ZoneKey -------------------------------------------------------

/// One signing key, loaded from a BIND format key file pair.
///
/// Loaded fresh for every signing pass; the pipeline never holds private
/// key material beyond the pass it was loaded for.
pub struct ZoneKey {
    role: KeyRole,
    key_tag: u16,
    dnskey: StoredRecord,
    key: SigningKey<Bytes, KeyPair>,
}

impl ZoneKey {
    /// Load a key from the contents of its public and private key files.
    ///
    /// The public file is a DNSKEY record in zone file format, the private
    /// file the conventional BIND private key format. The key must belong
    /// to the zone apex and its flags must match the requested role.
    pub fn load(
        role: KeyRole,
        apex: &StoredName,
        public_data: &str,
        private_data: &str,
    ) -> Result<Self> {
        let secret_key = SecretKeyBytes::parse_from_bind(private_data)
            .map_err(|err| format!("unable to parse BIND formatted private key: {err}"))?;

        let public: Record<StoredName, Dnskey<Bytes>> = parse_from_bind(public_data)
            .map_err(|err| format!("unable to parse BIND formatted public key: {err}"))?;

        if public.owner() != apex {
            return Err(Error::new(&format!(
                "{} has owner {} but the zone apex is {}",
                role.as_str(),
                public.owner(),
                apex
            )));
        }

        let flags = public.data().flags();
        if flags & FLAG_ZONE == 0 {
            return Err(Error::new(&format!(
                "{} is not a zone key (flags {flags})",
                role.as_str()
            )));
        }
        match role {
            KeyRole::Ksk if flags & FLAG_SEP == 0 => {
                return Err(Error::new(&format!(
                    "KSK does not carry the SEP flag (flags {flags})"
                )));
            }
            KeyRole::Zsk if flags & FLAG_SEP != 0 => {
                return Err(Error::new(&format!(
                    "ZSK unexpectedly carries the SEP flag (flags {flags})"
                )));
            }
            _ => {}
        }

        let key_pair = KeyPair::from_bytes(&secret_key, public.data())
            .map_err(|err| format!("unable to import {} private key: {err}", role.as_str()))?;
        let key = SigningKey::new(public.owner().clone(), flags, key_pair);

        let dnskey = Record::new(
            public.owner().clone(),
            Class::IN,
            ZONE_TTL,
            ZoneRecordData::Dnskey(public.data().clone()),
        );

        Ok(ZoneKey {
            role,
            key_tag: public.data().key_tag(),
            dnskey,
            key,
        })
    }

    pub fn role(&self) -> KeyRole {
        self.role
    }

    /// The DNSKEY record to place in the apex DNSKEY RRset.
    pub fn dnskey_record(&self) -> &StoredRecord {
        &self.dnskey
    }

    pub fn key_tag(&self) -> u16 {
        self.key_tag
    }
}

//------------ SignatureValidity ---------------------------------------------

/// The inception/expiration window stamped into produced RRSIGs.
#[derive(Clone, Copy, Debug)]
pub struct SignatureValidity {
    inception: Timestamp,
    expiration: Timestamp,
}

impl SignatureValidity {
    /// Valid from now until four weeks from now.
    pub fn starting_now() -> Self {
        let now = Timestamp::now();
        SignatureValidity {
            inception: now,
            expiration: (now.into_int().wrapping_add(FOUR_WEEKS)).into(),
        }
    }
}

//------------ Signing passes ------------------------------------------------

/// Fully sign a freshly assembled zone.
///
/// Adds both DNSKEY records at the apex, signs the DNSKEY RRset with the
/// KSK, then signs every remaining RRset with the ZSK. The DNSKEY RRSIG is
/// always produced before the ZSK pass starts, so a validator can chain
/// every ZSK signature back to a KSK-signed DNSKEY RRset. The input zone is
/// left untouched; the signed zone is returned as a new value.
pub fn sign_zone(
    zone: &Zone,
    ksk: &ZoneKey,
    zsk: &ZoneKey,
    validity: SignatureValidity,
) -> Result<Zone> {
    if ksk.role() != KeyRole::Ksk {
        return Err("the full signing pass needs a KSK".into());
    }
    if zsk.role() != KeyRole::Zsk {
        return Err("the full signing pass needs a ZSK".into());
    }

    let mut scratch_zone = zone.clone();
    scratch_zone.insert(zsk.dnskey_record().clone())?;
    scratch_zone.insert(ksk.dnskey_record().clone())?;

    // The DNSKEY RRset first, with the KSK.
    let mut rrsigs = Vec::new();
    scratch_zone.for_each_rrset(|rrset| {
        if rrset.rtype() == Rtype::DNSKEY {
            rrsigs.push(sign_one_rrset(ksk, rrset, validity)?);
        }
        Ok::<_, Error>(())
    })?;
    if rrsigs.is_empty() {
        return Err("no apex DNSKEY RRset to sign".into());
    }

    rrsigs.extend(zsk_pass(&scratch_zone, zsk, validity)?);

    for rrsig in rrsigs {
        scratch_zone.insert(rrsig)?;
    }
    Ok(scratch_zone)
}

/// Re-sign a previously signed zone with the ZSK only.
///
/// Every RRSIG except the one covering the DNSKEY RRset is discarded and
/// produced anew; the KSK's DNSKEY signature survives byte for byte. This
/// is the second half of the certificate-rotation path, after the TLSA
/// records have been replaced.
pub fn resign_zone(zone: &Zone, zsk: &ZoneKey, validity: SignatureValidity) -> Result<Zone> {
    if zsk.role() != KeyRole::Zsk {
        return Err("the re-signing pass needs a ZSK".into());
    }

    let mut scratch_zone = zone.filtered(|record| {
        record.rtype() != Rtype::RRSIG || is_rrsig_covering(record, Rtype::DNSKEY)
    });
    for rrsig in zsk_pass(&scratch_zone, zsk, validity)? {
        scratch_zone.insert(rrsig)?;
    }
    Ok(scratch_zone)
}

/// Sign every RRset except RRSIG and DNSKEY with the ZSK.
fn zsk_pass(zone: &Zone, zsk: &ZoneKey, validity: SignatureValidity) -> Result<Vec<StoredRecord>> {
    let mut rrsigs = Vec::new();
    zone.for_each_rrset(|rrset| {
        // An RRSIG RR must not be signed, and the DNSKEY RRset belongs to
        // the KSK alone.
        if rrset.rtype() == Rtype::RRSIG || rrset.rtype() == Rtype::DNSKEY {
            return Ok(());
        }
        rrsigs.push(sign_one_rrset(zsk, rrset, validity)?);
        Ok::<_, Error>(())
    })?;
    Ok(rrsigs)
}

/// Produce the RRSIG for one RRset with one key.
fn sign_one_rrset(
    key: &ZoneKey,
    rrset: &Rrset<'_, StoredName, StoredRecordData>,
    validity: SignatureValidity,
) -> Result<StoredRecord> {
    let rrsig = sign_rrset(&key.key, rrset, validity.inception, validity.expiration).map_err(
        |err| {
            format!(
                "cannot sign the {} RRset of {} with the {}: {err}",
                rrset.rtype(),
                rrset.owner(),
                key.role().as_str()
            )
        },
    )?;

    Ok(Record::new(
        rrsig.owner().clone(),
        rrsig.class(),
        rrsig.ttl(),
        ZoneRecordData::Rrsig(rrsig.into_data()),
    ))
}

//============ Tests =========================================================

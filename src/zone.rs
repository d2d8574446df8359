//! The in-memory zone aggregate and its foundational records.

use core::fmt;
use core::str::FromStr;

use std::net::Ipv4Addr;

use bytes::Bytes;
use domain::base::iana::Class;
use domain::base::name::FlattenInto;
use domain::base::zonefile_fmt::{DisplayKind, ZonefileFmt};
use domain::base::{Name, Record, Rtype, Serial, Ttl};
use domain::dnssec::sign::records::{RecordsIter, Rrset, SortedRecords};
use domain::rdata::{Ns, Soa, ZoneRecordData, A};
use domain::zonefile::inplace::{Entry, Zonefile};

use crate::error::{Error, Result};

//------------ Record types --------------------------------------------------

pub type StoredName = Name<Bytes>;
pub type StoredRecordData = ZoneRecordData<Bytes, StoredName>;
pub type StoredRecord = Record<StoredName, StoredRecordData>;

//------------ Constants -----------------------------------------------------

/// The TTL used for every record this pipeline creates.
pub const ZONE_TTL: Ttl = Ttl::from_secs(21600);

const SOA_REFRESH: Ttl = Ttl::from_secs(86400);
const SOA_RETRY: Ttl = Ttl::from_secs(7200);
const SOA_EXPIRE: Ttl = Ttl::from_secs(604800);
const SOA_MINIMUM: Ttl = Ttl::from_secs(300);

//------------ ZoneName ------------------------------------------------------

/// The domain a zone is authoritative for.
///
/// Internally the apex is always an absolute name; the display form drops
/// the trailing dot. The derived names are the only other owner names that
/// may appear in the zone: the name server itself, the responsible mailbox
/// and the wildcard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZoneName {
    apex: StoredName,
    ns: StoredName,
    mailbox: StoredName,
    wildcard: StoredName,
}

impl ZoneName {
    /// The zone apex as an absolute name.
    pub fn apex(&self) -> &StoredName {
        &self.apex
    }

    /// The in-zone name server name, `ns.<domain>`.
    pub fn ns(&self) -> &StoredName {
        &self.ns
    }

    /// The responsible mailbox name, `email.<domain>`.
    pub fn mailbox(&self) -> &StoredName {
        &self.mailbox
    }

    /// The wildcard name, `*.<domain>`.
    pub fn wildcard(&self) -> &StoredName {
        &self.wildcard
    }

    /// The display form without the trailing dot.
    pub fn display(&self) -> String {
        format!("{}", self.apex)
    }

    fn prefixed(apex: &StoredName, label: &str) -> Result<StoredName> {
        Name::from_str(&format!("{label}.{apex}"))
            .map_err(|err| Error::new(&format!("invalid name {label}.{apex}: {err}")))
    }
}

impl FromStr for ZoneName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s == "." {
            return Err("a zone needs a non-root domain name".into());
        }
        let apex: StoredName = Name::from_str(&s.to_lowercase())
            .map_err(|err| Error::new(&format!("invalid domain name '{s}': {err}")))?;
        if apex.is_root() {
            return Err("a zone needs a non-root domain name".into());
        }
        let ns = Self::prefixed(&apex, "ns")?;
        let mailbox = Self::prefixed(&apex, "email")?;
        let wildcard = Self::prefixed(&apex, "*")?;
        Ok(ZoneName {
            apex,
            ns,
            mailbox,
            wildcard,
        })
    }
}

impl fmt::Display for ZoneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.apex.fmt(f)
    }
}

//------------ Zone ----------------------------------------------------------

/// All RRsets of a zone, canonically ordered and unique.
///
/// A `Zone` is a value: pipeline stages clone it, transform the clone and
/// publish the finished version whole. Nothing ever mutates a published
/// zone in place.
pub struct Zone {
    origin: ZoneName,
    records: SortedRecords<StoredName, StoredRecordData>,
}

impl Clone for Zone {
    fn clone(&self) -> Self {
        Zone {
            origin: self.origin.clone(),
            records: self.records.iter().cloned().collect::<Vec<_>>().into(),
        }
    }
}

impl Zone {
    /// Create an empty zone for the given origin.
    pub fn new(origin: ZoneName) -> Self {
        Zone {
            origin,
            records: SortedRecords::default(),
        }
    }

    /// Rebuild a zone from its zonefile dump.
    pub fn from_text(origin: ZoneName, text: &str) -> Result<Self> {
        let mut records = SortedRecords::default();
        for entry in Zonefile::from(text) {
            let entry = entry.map_err(|err| format!("invalid zone data: {err}"))?;
            match entry {
                Entry::Record(record) => {
                    let record: StoredRecord = record.flatten_into();
                    // Re-inserting a dump of a canonically unique zone
                    // cannot collide.
                    records.insert(record).map_err(|record| {
                        format!("invalid zone data: duplicate record {record:?}")
                    })?;
                }
                Entry::Include { .. } => {
                    return Err(Error::new(
                        "invalid zone data: $INCLUDE directive is not supported",
                    ));
                }
            }
        }
        let zone = Zone { origin, records };
        if zone.soa_serial().is_none() {
            return Err("invalid zone data: no SOA record at the apex".into());
        }
        Ok(zone)
    }

    pub fn origin(&self) -> &ZoneName {
        &self.origin
    }

    pub fn records(&self) -> &SortedRecords<StoredName, StoredRecordData> {
        &self.records
    }

    /// Add a record, failing on canonical duplicates.
    pub fn insert(&mut self, record: StoredRecord) -> Result<()> {
        self.records
            .insert(record)
            .map_err(|record| Error::new(&format!("duplicate record: {record:?}")))
    }

    /// All records, cloned, in canonical order.
    pub fn to_vec(&self) -> Vec<StoredRecord> {
        self.records.iter().cloned().collect()
    }

    /// A copy of this zone keeping only records the predicate accepts.
    pub fn filtered(&self, mut keep: impl FnMut(&StoredRecord) -> bool) -> Self {
        let mut records = SortedRecords::default();
        for record in self.records.iter() {
            if keep(record) {
                // A subset of a unique set cannot collide.
                let _ = records.insert(record.clone());
            }
        }
        Zone {
            origin: self.origin.clone(),
            records,
        }
    }

    /// Run a closure over every RRset in the zone.
    pub fn for_each_rrset<E>(
        &self,
        mut op: impl FnMut(&Rrset<'_, StoredName, StoredRecordData>) -> core::result::Result<(), E>,
    ) -> core::result::Result<(), E> {
        for owner_rrs in RecordsIter::new(&self.records) {
            for rrset in owner_rrs.rrsets() {
                op(&rrset)?;
            }
        }
        Ok(())
    }

    /// The serial of the apex SOA record, if the zone has one.
    pub fn soa_serial(&self) -> Option<Serial> {
        self.records.iter().find_map(|record| {
            if record.owner() != self.origin.apex() {
                return None;
            }
            match record.data() {
                ZoneRecordData::Soa(soa) => Some(soa.serial()),
                _ => None,
            }
        })
    }

    /// Render the zone one record per line, in canonical order.
    pub fn lines(&self) -> Vec<String> {
        self.to_vec()
            .iter()
            .map(|record| format!("{}", record.display_zonefile(DisplayKind::Simple)))
            .collect()
    }
}

//------------ ZoneBuilder ---------------------------------------------------

/// Creates the foundational RRsets of a zone.
///
/// This runs exactly once, during full initialization. The SOA serial is
/// the current Unix time in seconds, so repeated initializations never
/// move the serial backwards.
pub struct ZoneBuilder {
    origin: ZoneName,
    host: Ipv4Addr,
}

impl ZoneBuilder {
    pub fn new(origin: ZoneName, host: Ipv4Addr) -> Self {
        ZoneBuilder { origin, host }
    }

    /// Build the base zone: SOA, NS, glue A, apex A and wildcard A.
    pub fn build(self) -> Result<Zone> {
        let mut zone = Zone::new(self.origin.clone());
        let apex = self.origin.apex().clone();
        let octets = self.host.octets();
        let host = A::from_octets(octets[0], octets[1], octets[2], octets[3]);

        let soa = Soa::new(
            self.origin.ns().clone(),
            self.origin.mailbox().clone(),
            Serial::now(),
            SOA_REFRESH,
            SOA_RETRY,
            SOA_EXPIRE,
            SOA_MINIMUM,
        );
        zone.insert(Record::new(
            apex.clone(),
            Class::IN,
            ZONE_TTL,
            ZoneRecordData::Soa(soa),
        ))?;

        zone.insert(Record::new(
            apex.clone(),
            Class::IN,
            ZONE_TTL,
            ZoneRecordData::Ns(Ns::new(self.origin.ns().clone())),
        ))?;

        // Glue for the in-zone name server, then the apex and wildcard
        // addresses.
        zone.insert(Record::new(
            self.origin.ns().clone(),
            Class::IN,
            ZONE_TTL,
            ZoneRecordData::A(host.clone()),
        ))?;
        zone.insert(Record::new(
            apex,
            Class::IN,
            ZONE_TTL,
            ZoneRecordData::A(host.clone()),
        ))?;
        zone.insert(Record::new(
            self.origin.wildcard().clone(),
            Class::IN,
            ZONE_TTL,
            ZoneRecordData::A(host),
        ))?;

        Ok(zone)
    }
}

//------------ Helpers -------------------------------------------------------

/// Whether a record is an RRSIG covering the given type.
pub fn is_rrsig_covering(record: &StoredRecord, rtype: Rtype) -> bool {
    match record.data() {
        ZoneRecordData::Rrsig(rrsig) => rrsig.type_covered() == rtype,
        _ => false,
    }
}

//============ Tests =========================================================

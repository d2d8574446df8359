//! The boundary to the query-answering engine.
//!
//! The pipeline never hands out a half-built zone: stages assemble and
//! sign a scratch copy and the finished version is swapped in atomically.
//! Whatever serves queries only ever loads a handle to a complete,
//! fully signed zone.

use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};

use crate::signer::ZoneKey;
use crate::zone::{Zone, ZoneName};

//------------ ZoneAuthority -------------------------------------------------

/// Holds the currently published zone for one origin.
pub struct ZoneAuthority {
    origin: ZoneName,
    zone: ArcSwap<Zone>,

    /// The zone-signing key registered for on-the-fly signing.
    ///
    /// Records synthesized at serve time for wildcard matches must carry
    /// signatures from the same ZSK that signed the zone, without running
    /// the pipeline again.
    zsk: ArcSwapOption<ZoneKey>,
}

impl ZoneAuthority {
    /// Create an authority with an empty zone for the given origin.
    pub fn new(origin: ZoneName) -> Self {
        let zone = Zone::new(origin.clone());
        ZoneAuthority {
            origin,
            zone: ArcSwap::from_pointee(zone),
            zsk: ArcSwapOption::empty(),
        }
    }

    /// The configured origin.
    pub fn origin(&self) -> &ZoneName {
        &self.origin
    }

    /// The currently published zone.
    pub fn zone(&self) -> Arc<Zone> {
        self.zone.load_full()
    }

    /// Atomically replace the published zone.
    pub fn publish(&self, zone: Zone) {
        self.zone.store(Arc::new(zone));
    }

    /// Register the active zone-signing key.
    pub fn set_active_zsk(&self, key: ZoneKey) {
        self.zsk.store(Some(Arc::new(key)));
    }

    /// The active zone-signing key, if one has been registered.
    pub fn active_zsk(&self) -> Option<Arc<ZoneKey>> {
        self.zsk.load_full()
    }
}

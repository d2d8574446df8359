//! The zone assembly and signing pipeline.
//!
//! An [`AuthNs`] ties one domain's configuration, blob store and
//! [`ZoneAuthority`] together and runs the two pipelines over them: full
//! initialization, which assembles and signs the zone from scratch, and
//! TLSA regeneration, which replaces the certificate associations in the
//! published zone and re-signs with the ZSK only.

use std::sync::Arc;

use domain::base::Rtype;
use tracing::{debug, info};

use crate::authority::ZoneAuthority;
use crate::config::Config;
use crate::dedup::dedup_lines;
use crate::error::{Context, Result};
use crate::signer::{self, KeyRole, SignatureValidity, ZoneKey};
use crate::store::{paths, BlobStore};
use crate::tlsa::CertAssociation;
use crate::zone::{Zone, ZoneBuilder, ZoneName};

//------------ AuthNs --------------------------------------------------------

/// The authoritative name service state for one domain.
pub struct AuthNs<S> {
    store: S,
    config: Config,
    authority: Arc<ZoneAuthority>,
}

impl<S: BlobStore> AuthNs<S> {
    /// Load a domain's configuration and set up an empty authority.
    pub async fn load(store: S, domain: &str) -> Result<Self> {
        let origin: ZoneName = domain.parse()?;
        let domain = origin.display();
        let data = store
            .read(&paths::config(&domain))
            .await
            .with_context(|| format!("loading the configuration for {domain}"))?;
        let config = Config::parse(&data)?;
        let configured: ZoneName = config.main.domain.parse()?;
        if configured != origin {
            return Err(format!(
                "the configuration for {domain} names a different domain, {configured}"
            )
            .into());
        }
        Ok(AuthNs {
            store,
            config,
            authority: Arc::new(ZoneAuthority::new(origin)),
        })
    }

    /// The authority holding the published zone.
    pub fn authority(&self) -> &Arc<ZoneAuthority> {
        &self.authority
    }

    fn domain(&self) -> String {
        self.authority.origin().display()
    }

    /// Assemble, sign and publish the zone from scratch.
    ///
    /// The base RRsets are built first, then the TLSA pair for the current
    /// certificate is added, and the result is fully signed with both keys.
    /// The published zone is only replaced once the new one is complete,
    /// and the ZSK stays registered with the authority for on-the-fly
    /// signing afterwards.
    pub async fn init(&self) -> Result<()> {
        let origin = self.authority.origin().clone();
        info!("assembling the zone for {origin}");
        let mut zone = ZoneBuilder::new(origin.clone(), self.config.main.host).build()?;

        let (base, wildcard) = self.cert_association().await?.into_records(&origin)?;
        zone.insert(base)?;
        zone.insert(wildcard)?;

        let ksk = self.load_key(KeyRole::Ksk).await?;
        let zsk = self.load_key(KeyRole::Zsk).await?;
        debug!(
            "loaded the KSK (tag {}) and the ZSK (tag {})",
            ksk.key_tag(),
            zsk.key_tag()
        );

        let signed = signer::sign_zone(&zone, &ksk, &zsk, SignatureValidity::starting_now())
            .with_context(|| format!("signing the zone for {origin}"))?;
        info!("publishing the signed zone for {origin}");
        self.authority.publish(signed);
        self.authority.set_active_zsk(zsk);
        Ok(())
    }

    /// Replace the TLSA records after a certificate rotation and re-sign.
    ///
    /// Starts from the published zone, so everything else, including the
    /// KSK's signature over the DNSKEY RRset, carries over unchanged.
    pub async fn regenerate_tlsa(&self) -> Result<()> {
        let origin = self.authority.origin().clone();
        info!("regenerating the TLSA records for {origin}");

        let current = self.authority.zone();
        if current.soa_serial().is_none() {
            return Err(format!(
                "no signed zone is loaded for {origin}; initialize or restore one first"
            )
            .into());
        }
        let mut scratch = current.filtered(|record| record.rtype() != Rtype::TLSA);
        let (base, wildcard) = self.cert_association().await?.into_records(&origin)?;
        scratch.insert(base)?;
        scratch.insert(wildcard)?;

        let zsk = self.load_key(KeyRole::Zsk).await?;
        let signed = signer::resign_zone(&scratch, &zsk, SignatureValidity::starting_now())
            .with_context(|| format!("re-signing the zone for {origin}"))?;
        info!("publishing the re-signed zone for {origin}");
        self.authority.publish(signed);
        Ok(())
    }

    /// Restore the published zone from its exported dump.
    pub async fn restore(&self) -> Result<()> {
        let domain = self.domain();
        let text = self
            .store
            .read(&paths::signed_zone(&domain))
            .await
            .with_context(|| format!("loading the signed zone for {domain}"))?;
        let zone = Zone::from_text(self.authority.origin().clone(), &text)?;
        debug!("restored the zone for {domain}");
        self.authority.publish(zone);
        Ok(())
    }

    /// The published zone as cleaned-up zonefile text.
    pub fn zone_text(&self) -> String {
        let zone = self.authority.zone();
        let lines = zone.lines();
        dedup_lines(lines.iter().map(String::as_str))
    }

    /// Write the published zone to the store.
    pub async fn export(&self) -> Result<()> {
        let domain = self.domain();
        self.store
            .write(&paths::signed_zone(&domain), &self.zone_text())
            .await
            .with_context(|| format!("exporting the signed zone for {domain}"))
    }

    async fn cert_association(&self) -> Result<CertAssociation> {
        let domain = self.domain();
        let pem = self
            .store
            .read(&paths::certificate(&domain))
            .await
            .with_context(|| format!("loading the certificate for {domain}"))?;
        CertAssociation::from_pem(pem.as_bytes())
    }

    async fn load_key(&self, role: KeyRole) -> Result<ZoneKey> {
        let domain = self.domain();
        let (dir, files) = match role {
            KeyRole::Ksk => ("ksk", &self.config.ksk),
            KeyRole::Zsk => ("zsk", &self.config.zsk),
        };
        let public = self
            .store
            .read(&paths::key_file(&domain, dir, &files.public))
            .await?;
        let private = self
            .store
            .read(&paths::key_file(&domain, dir, &files.private))
            .await?;
        ZoneKey::load(role, self.authority.origin().apex(), &public, &private)
    }
}

//! The commands of _authzone_.
pub mod init;
pub mod regen;

use crate::error::Result;

#[derive(Clone, Debug, clap::Subcommand)]
pub enum Command {
    /// Assemble, sign and export the zone for a domain
    ///
    /// The base RRsets and the TLSA records for the domain's current TLS
    /// certificate are built from the configuration in the store, the
    /// result is signed with the configured KSK and ZSK, and the signed
    /// zone is written back to the store as `<domain>/zone.signed`.
    #[command(name = "init")]
    Init(self::init::Init),

    /// Replace the TLSA records of a signed zone and re-sign
    ///
    /// This is the certificate-rotation path: the previously exported
    /// zone is loaded back, its TLSA records are rebuilt from the current
    /// certificate and everything except the DNSKEY RRset's signature is
    /// re-signed with the ZSK.
    #[command(name = "regen")]
    Regen(self::regen::Regen),
}

impl Command {
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Init(init) => init.execute(),
            Self::Regen(regen) => regen.execute(),
        }
    }
}

use std::path::PathBuf;

use clap::Parser;
use tokio::runtime::Runtime;

use crate::error::Result;
use crate::pipeline::AuthNs;
use crate::store::FileStore;

#[derive(Clone, Debug, Parser)]
pub struct Init {
    /// Directory holding per-domain configuration, keys and certificates
    #[arg(short = 's', long = "store", default_value = "store")]
    store: PathBuf,

    /// Also print the exported zone to stdout
    #[arg(short = 'p', long = "print")]
    print: bool,

    /// The domain to assemble and sign a zone for
    #[arg()]
    domain: String,
}

impl Init {
    pub fn execute(self) -> Result<()> {
        let runtime = Runtime::new()?;
        runtime.block_on(async {
            let ns = AuthNs::load(FileStore::new(self.store), &self.domain).await?;
            ns.init().await?;
            ns.export().await?;
            if self.print {
                print!("{}", ns.zone_text());
            }
            Ok(())
        })
    }
}

//! The per-domain configuration file.

use std::net::Ipv4Addr;

use serde::Deserialize;

use crate::error::Result;

//------------ Config --------------------------------------------------------

/// The three sections of a domain's TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub main: Main,
    pub ksk: KeyFiles,
    pub zsk: KeyFiles,
}

/// The `[main]` section.
#[derive(Clone, Debug, Deserialize)]
pub struct Main {
    /// The domain, stored with its trailing dot.
    pub domain: String,

    /// The address every A record points at.
    pub host: Ipv4Addr,
}

/// A `[ksk]` or `[zsk]` section: the file names of one key pair.
#[derive(Clone, Debug, Deserialize)]
pub struct KeyFiles {
    pub public: String,
    pub private: String,
}

impl Config {
    pub fn parse(data: &str) -> Result<Self> {
        toml::from_str(data).map_err(|err| format!("invalid configuration: {err}").into())
    }
}

//============ Tests =========================================================

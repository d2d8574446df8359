pub mod args;
pub mod authority;
pub mod commands;
pub mod config;
pub mod dedup;
pub mod error;
pub mod pipeline;
pub mod signer;
pub mod store;
pub mod tlsa;
pub mod zone;

pub use self::args::Args;

pub mod commands;
pub mod compose;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod types;

pub use error::{Error, Result};
pub use types::OutputFormat;

/// Default staging directory written by `stitch assemble`
pub const DEFAULT_STAGING_DIR: &str = ".stitch";

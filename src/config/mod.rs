//! Configuration management for stitch
//!
//! All config operations go through this module so that every write is
//! validated.
//!
//! - `schema` - Configuration data structures
//! - `io` - Reading, writing, and updating config files
//! - `paths` - Directory path management
//! - `utils` - Component spec classification
//!
//! ```rust,no_run
//! use stitch::config;
//!
//! # fn example() -> anyhow::Result<()> {
//! // Load config (returns default if file doesn't exist)
//! let config = config::io::load_config()?;
//!
//! // Register a component alias
//! config::io::register_component("db", "/srv/stack/postgres")?;
//! # Ok(())
//! # }
//! ```

pub mod io;
pub mod paths;
pub mod schema;
pub mod utils;

pub use io::{load_config, register_component, unregister_component};
pub use paths::{get_config_path, get_log_dir, get_stitch_dir};
pub use schema::{MergeSettings, StitchConfig};

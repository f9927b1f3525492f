//! Configuration for the Strata generator.
//!
//! Settings persist to disk as a RON file and can be overridden from the
//! command line. Missing fields fall back to defaults, so old files keep
//! loading as new settings are added.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, ContentConfig, DebugConfig, WorkerConfig, default_config_dir};
pub use error::ConfigError;

//! Top-level error type of the command-line tool.

use strata_config::ConfigError;
use strata_mapgen::notify::UnknownNotifyFlag;
use strata_mapgen::{ContentError, GeneratorError, SchematicError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("could not determine a config directory; pass --config")]
    NoConfigDir,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("content pack error: {0}")]
    Content(#[from] ContentError),

    #[error("cannot build generator: {0}")]
    Generator(#[from] GeneratorError),

    #[error("schematic export failed: {0}")]
    Schematic(#[from] SchematicError),

    #[error("invalid content.gennotify: {0}")]
    Notify(#[from] UnknownNotifyFlag),

    #[error("failed to start worker threads: {0}")]
    Spawn(#[source] std::io::Error),
}

//! Command-line argument parsing for the Strata generator.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Strata command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "strata", about = "Procedural voxel chunk generator")]
pub struct CliArgs {
    /// World seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Water level in nodes.
    #[arg(long)]
    pub water_level: Option<i32>,

    /// Chunks generated around the origin chunk.
    #[arg(long)]
    pub radius: Option<i32>,

    /// Worker threads (0 = one per CPU).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Content pack file (overrides the configured pack).
    #[arg(long)]
    pub content: Option<PathBuf>,

    /// Save the origin chunk's surface as an MTSM schematic to this path.
    #[arg(long)]
    pub export_schematic: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.mapgen.seed = seed;
        }
        if let Some(level) = args.water_level {
            self.mapgen.water_level = level;
        }
        if let Some(radius) = args.radius {
            self.worker.radius = radius;
        }
        if let Some(threads) = args.threads {
            self.worker.threads = threads;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(ref pack) = args.content {
            self.content.pack = Some(pack.clone());
        }
    }
}

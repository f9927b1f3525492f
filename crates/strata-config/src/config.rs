//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strata_mapgen::MapgenParams;

use crate::error::ConfigError;

/// Top-level generator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// World-wide generation parameters.
    pub mapgen: MapgenParams,
    /// Content pack selection.
    pub content: ContentConfig,
    /// Batch generation settings.
    pub worker: WorkerConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Which content the generator places.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContentConfig {
    /// Content pack file. The built-in pack is used when unset.
    pub pack: Option<PathBuf>,
    /// Generation events to record (e.g. "tree, ore"); empty records nothing.
    pub gennotify: String,
}

/// Batch generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Worker threads (0 = one per logical CPU).
    pub threads: usize,
    /// Chunks generated around the origin chunk on each horizontal axis.
    pub radius: i32,
    /// Vertical chunk layers generated below and above the origin chunk.
    pub vertical_radius: i32,
    /// Print a content hash for every chunk.
    pub print_hashes: bool,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Also write JSON logs to the config directory's `logs/`.
    pub log_to_file: bool,
}

// --- Default implementations ---

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            pack: None,
            gennotify: "decoration, ore, tree, schematic".to_string(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            radius: 1,
            vertical_radius: 0,
            print_hashes: false,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: false,
        }
    }
}

/// Default config directory, `<platform config dir>/strata`.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("strata"))
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            config.validate()?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        new_config.validate()?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Checks the mapgen section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mapgen.validate().map_err(ConfigError::InvalidMapgen)
    }

    /// Worker thread count with 0 resolved to the number of logical CPUs.
    pub fn worker_threads(&self) -> usize {
        match self.worker.threads {
            0 => num_cpus::get(),
            n => n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(!ron_str.is_empty());
        assert!(ron_str.contains("water_level: 1"));
        assert!(ron_str.contains("radius: 1"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.mapgen.seed = 82341;
        config.mapgen.flags.caves = false;
        config.content.pack = Some(PathBuf::from("packs/default.ron"));
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_field_uses_default() {
        // Config missing the `worker` section entirely
        let ron_str = "(mapgen: (seed: 5), content: (), debug: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.worker, WorkerConfig::default());
        assert_eq!(config.mapgen.seed, 5);
        assert_eq!(config.mapgen.chunksize, 5);
    }

    #[test]
    fn test_extra_field_ignored() {
        let ron_str = "(future_setting: true)";
        let result: Result<Config, _> = ron::from_str(ron_str);
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.mapgen.seed = 42;
        config.mapgen.water_level = -4;
        config.worker.threads = 3;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_invalid_chunksize_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "(mapgen: (chunksize: 0))").unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::InvalidMapgen(_))
        ));
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.mapgen.seed = 1920;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_some());
        assert_eq!(result.unwrap().mapgen.seed, 1920);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_worker_threads_resolves_zero() {
        let mut config = Config::default();
        assert!(config.worker_threads() >= 1);
        config.worker.threads = 6;
        assert_eq!(config.worker_threads(), 6);
    }
}

//! Configuration loading and typed config structures for the Delve simulation.
//!
//! The configuration lives in `delve-config.yaml` in the working directory.
//! Every field has a default, so a missing file or a partial one is fine.
//!
//! ```yaml
//! world:
//!   spawn_chance: 120
//!   warm_up_monsters: 6
//!   items_per_level: 10
//! replay:
//!   snapshot_interval: 1
//!   replay_delay_frames: 0
//!   frame_ms: 16
//! ```

use std::path::Path;

use serde::Deserialize;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "delve-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Population of the dungeon.
    #[serde(default)]
    pub world: WorldConfig,

    /// Save file and replay behavior.
    #[serde(default)]
    pub replay: ReplayConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Load `path` if it exists, otherwise use the defaults.
    ///
    /// # Errors
    ///
    /// As [`SimulationConfig::from_file`], for a file that exists.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// How the dungeon is populated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// A monster spawns on a tick with probability `1 / spawn_chance`.
    #[serde(default = "default_spawn_chance")]
    pub spawn_chance: u32,

    /// Monsters placed on every new level.
    #[serde(default = "default_warm_up_monsters")]
    pub warm_up_monsters: u32,

    /// Items scattered on every new level.
    #[serde(default = "default_items_per_level")]
    pub items_per_level: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            spawn_chance: default_spawn_chance(),
            warm_up_monsters: default_warm_up_monsters(),
            items_per_level: default_items_per_level(),
        }
    }
}

/// Save file and replay pacing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplayConfig {
    /// A snapshot is written before every n-th recorded action outside test
    /// mode. Zero disables snapshots.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: u32,

    /// Frames to wait between replayed actions.
    #[serde(default)]
    pub replay_delay_frames: u32,

    /// Length of one frame in milliseconds.
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: default_snapshot_interval(),
            replay_delay_frames: 0,
            frame_ms: default_frame_ms(),
        }
    }
}

const fn default_spawn_chance() -> u32 {
    120
}

const fn default_warm_up_monsters() -> u32 {
    6
}

const fn default_items_per_level() -> u32 {
    10
}

const fn default_snapshot_interval() -> u32 {
    1
}

const fn default_frame_ms() -> u64 {
    16
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = SimulationConfig::parse("").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.world.spawn_chance, 120);
        assert_eq!(config.world.warm_up_monsters, 6);
        assert_eq!(config.world.items_per_level, 10);
        assert_eq!(config.replay.snapshot_interval, 1);
        assert_eq!(config.replay.frame_ms, 16);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let yaml = "world:\n  spawn_chance: 40\nreplay:\n  replay_delay_frames: 3\n";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.world.spawn_chance, 40);
        assert_eq!(config.world.items_per_level, 10);
        assert_eq!(config.replay.replay_delay_frames, 3);
        assert_eq!(config.replay.snapshot_interval, 1);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let error = SimulationConfig::parse("world: [unclosed").unwrap_err();
        assert!(matches!(error, ConfigError::Yaml { .. }));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config =
            SimulationConfig::load_or_default(Path::new("/nonexistent/delve-config.yaml")).unwrap();
        assert_eq!(config, SimulationConfig::default());
    }
}

//! Stage configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub stage: StageConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load configuration from `path`, writing the defaults there if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml_str(&contents)
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// Universe, population and loop settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StageConfig {
    /// Universe width.
    #[serde(default = "default_width")]
    pub width: f32,
    /// Universe height.
    #[serde(default = "default_height")]
    pub height: f32,
    /// Number of rocks, papers and scissors spawned at start.
    #[serde(default = "default_objects_per_kind")]
    pub objects_per_kind: usize,
    /// Points per quadtree node before it subdivides.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Tick interval in milliseconds (0 = run as fast as possible).
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Stop after this many ticks (0 = run until a single kind is left).
    #[serde(default)]
    pub max_ticks: u64,
    /// Seed for spawn positions. Random when unset.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Ticks between population reports.
    #[serde(default = "default_report_every")]
    pub report_every: u64,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            objects_per_kind: default_objects_per_kind(),
            capacity: default_capacity(),
            tick_interval_ms: default_tick_interval(),
            max_ticks: 0,
            seed: None,
            report_every: default_report_every(),
        }
    }
}

fn default_width() -> f32 {
    800.0
}
fn default_height() -> f32 {
    600.0
}
fn default_objects_per_kind() -> usize {
    50
}
fn default_capacity() -> usize {
    quadtree::DEFAULT_CAPACITY
}
fn default_tick_interval() -> u64 {
    16
}
fn default_report_every() -> u64 {
    60
}

/// Movement and steering settings shared by every object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PhysicsConfig {
    #[serde(default = "default_object_size")]
    pub object_width: f32,
    #[serde(default = "default_object_size")]
    pub object_height: f32,
    /// Speed limit applied after every velocity update.
    #[serde(default = "default_max_velocity")]
    pub max_velocity: f32,
    /// Upper bound on the steering force.
    #[serde(default = "default_max_force")]
    pub max_force: f32,
    /// Fraction of speed kept when bouncing off the border.
    #[serde(default = "default_restitution")]
    pub restitution: f32,
    #[serde(default = "default_delta_time")]
    pub delta_time: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            object_width: default_object_size(),
            object_height: default_object_size(),
            max_velocity: default_max_velocity(),
            max_force: default_max_force(),
            restitution: default_restitution(),
            delta_time: default_delta_time(),
        }
    }
}

fn default_object_size() -> f32 {
    30.0
}
fn default_max_velocity() -> f32 {
    2.0
}
fn default_max_force() -> f32 {
    0.05
}
fn default_restitution() -> f32 {
    0.8
}
fn default_delta_time() -> f32 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            [stage]
            width = 500.0
            seed = 7

            [physics]
            max_velocity = 3.5
            "#,
        )
        .unwrap();

        assert_eq!(config.stage.width, 500.0);
        assert_eq!(config.stage.height, 600.0);
        assert_eq!(config.stage.seed, Some(7));
        assert_eq!(config.stage.capacity, 4);
        assert_eq!(config.physics.max_velocity, 3.5);
        assert_eq!(config.physics.object_width, 30.0);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        assert!(Config::from_toml_str("[stage]\nwidth = \"wide\"").is_err());
    }

    #[test]
    fn test_load_from_missing_file_writes_defaults() {
        let path = std::env::temp_dir().join(format!("rps-config-{}.toml", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.stage.objects_per_kind, 50);
        assert!(path.exists());

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.stage.width, config.stage.width);
        std::fs::remove_file(&path).unwrap();
    }
}

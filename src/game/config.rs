//! Simulation Configuration
//!
//! Every tuning constant lives here with the game's values as defaults.
//! Configs load from JSON; missing fields keep their defaults, so a file
//! only needs the values it changes.

use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::game::collision::CollisionMask;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV_VAR: &str = "RAINFALL_CONFIG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Config JSON is malformed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid config value {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong
        reason: String,
    },
}

/// Player movement tuning. Speeds in m/s, heights in meters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Horizontal speed cap
    pub max_speed: f32,
    /// Horizontal acceleration on the ground (m/s²)
    pub ground_acceleration: f32,
    /// Horizontal acceleration in the air (m/s²)
    pub air_acceleration: f32,
    /// Jump apex height
    pub jump_height: f32,
    /// Bounce pad apex height
    pub bounce_height: f32,
    /// Gravity after releasing jump mid-ascent (m/s²)
    pub short_jump_gravity: f32,
    /// Body width
    pub width: f32,
    /// Body height
    pub height: f32,
    /// Seconds submerged before respawning
    pub drown_seconds: f32,
    /// Pixels above ground before a descent counts as falling
    pub fall_threshold: f32,
    /// Mean seconds between walking dust puffs
    pub dust_interval: f32,
    /// Speed above which walking raises dust
    pub dust_speed: f32,
    /// Probe masks
    pub collision: CollisionMask,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_speed: 4.5,
            ground_acceleration: 15.0,
            air_acceleration: 4.0,
            jump_height: 1.6,
            bounce_height: 4.5,
            short_jump_gravity: 100.0,
            width: 0.5,
            height: 1.85,
            drown_seconds: 3.0,
            fall_threshold: 10.0,
            dust_interval: 0.2,
            dust_speed: 1.0,
            collision: CollisionMask::default(),
        }
    }
}

/// Whole-scene configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Ticks per second
    pub tick_rate: u32,
    /// World scale
    pub pixels_per_meter: f32,
    /// Gravity (m/s²)
    pub gravity: f32,
    /// Gravity for props (m/s²)
    pub prop_gravity: f32,
    /// Player tuning
    pub player: PlayerConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: crate::TICK_RATE,
            pixels_per_meter: 18.0,
            gravity: 35.0,
            prop_gravity: 35.0,
            player: PlayerConfig::default(),
        }
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, reason: format!("must be positive, got {}", value) })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, reason: format!("must be non-negative, got {}", value) })
    }
}

impl SimulationConfig {
    /// Parse and validate JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Load from `RAINFALL_CONFIG` if set, else defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => {
                tracing::info!(path = %Path::new(&path).display(), "loading config");
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Check every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid { field: "tick_rate", reason: "must be at least 1".into() });
        }
        positive("pixels_per_meter", self.pixels_per_meter)?;
        non_negative("gravity", self.gravity)?;
        non_negative("prop_gravity", self.prop_gravity)?;

        let p = &self.player;
        positive("player.max_speed", p.max_speed)?;
        non_negative("player.ground_acceleration", p.ground_acceleration)?;
        non_negative("player.air_acceleration", p.air_acceleration)?;
        non_negative("player.jump_height", p.jump_height)?;
        non_negative("player.bounce_height", p.bounce_height)?;
        non_negative("player.short_jump_gravity", p.short_jump_gravity)?;
        positive("player.width", p.width)?;
        positive("player.height", p.height)?;
        positive("player.drown_seconds", p.drown_seconds)?;
        non_negative("player.fall_threshold", p.fall_threshold)?;
        positive("player.dust_interval", p.dust_interval)?;
        non_negative("player.dust_speed", p.dust_speed)?;
        Ok(())
    }

    /// Seconds per tick.
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Player size in pixels.
    pub fn player_size(&self) -> (f32, f32) {
        (
            self.player.width * self.pixels_per_meter,
            self.player.height * self.pixels_per_meter,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::environment::{Environment, EnvironmentSet};

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.player_size(), (9.0, 1.85 * 18.0));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SimulationConfig::from_json_str(r#"{"gravity": 20.0, "player": {"max_speed": 6.0}}"#).unwrap();
        assert_eq!(config.gravity, 20.0);
        assert_eq!(config.player.max_speed, 6.0);
        assert_eq!(config.player.jump_height, 1.6);
        assert_eq!(config.pixels_per_meter, 18.0);
    }

    #[test]
    fn test_collision_mask_from_json() {
        let config = SimulationConfig::from_json_str(
            r#"{"player": {"collision": {"ground": ["Water"]}}}"#,
        )
        .unwrap();
        assert_eq!(config.player.collision.ground, EnvironmentSet::of(&[Environment::Water]));
        assert_eq!(config.player.collision.wall, CollisionMask::default().wall);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SimulationConfig::from_json_str(r#"{"tick_rate": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "tick_rate", .. }));

        let err = SimulationConfig::from_json_str(r#"{"player": {"height": -1.0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "player.height", .. }));
    }

    #[test]
    fn test_parse_error() {
        let err = SimulationConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SimulationConfig::load("/nonexistent/rainfall.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_dt() {
        let config = SimulationConfig { tick_rate: 50, ..SimulationConfig::default() };
        assert_eq!(config.dt(), 0.02);
    }
}

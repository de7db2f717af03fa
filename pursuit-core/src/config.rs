use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PursuitGains {
    pub tolerance: f64,
    pub cruise_speed: f64,
    pub correction_speed: f64,
    pub turn_rate: f64,
    /// Wrap the heading error to (-π, π] before picking a turn direction.
    /// Off by default, which keeps the long-way-round turns near ±π.
    pub normalize_heading_error: bool,
}

impl Default for PursuitGains {
    fn default() -> Self {
        Self {
            tolerance: 0.0348888, // ~2 degrees
            cruise_speed: 10.0,
            correction_speed: 1.0,
            turn_rate: 5.0,
            normalize_heading_error: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArenaBounds {
    pub min: f64,
    pub max: f64,
}

impl ArenaBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.min..self.max).contains(&x) && (self.min..self.max).contains(&y)
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

impl Default for ArenaBounds {
    fn default() -> Self {
        Self::new(0.0, 11.0)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PursuitConfig {
    pub gains: PursuitGains,
    pub capture_threshold: f64,
    pub arena: ArenaBounds,
    pub hunter_name: String,
    pub target_name: String,
}

impl Default for PursuitConfig {
    fn default() -> Self {
        Self {
            gains: PursuitGains::default(),
            capture_threshold: 0.5,
            arena: ArenaBounds::default(),
            hunter_name: "turtle1".to_string(),
            target_name: "turtle2".to_string(),
        }
    }
}

impl PursuitConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let gains = &self.gains;
        if !(gains.tolerance > 0.0) {
            return Err(invalid("gains.tolerance must be positive"));
        }
        if gains.cruise_speed < 0.0 || gains.correction_speed < 0.0 {
            return Err(invalid("forward speeds must not be negative"));
        }
        if gains.turn_rate < 0.0 {
            return Err(invalid("gains.turn_rate is a magnitude and must not be negative"));
        }
        if !(self.capture_threshold > 0.0) {
            return Err(invalid("capture_threshold must be positive"));
        }
        if !(self.arena.span() > 0.0) {
            return Err(invalid("arena.max must be greater than arena.min"));
        }
        if self.hunter_name.is_empty() || self.target_name.is_empty() {
            return Err(invalid("agent names must not be empty"));
        }
        if self.hunter_name == self.target_name {
            return Err(invalid("hunter and target need distinct names"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

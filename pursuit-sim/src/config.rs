use pursuit_core::{ArenaBounds, ConfigError, Pose, PursuitConfig};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FaultPlan {
    pub failure_rate: f64,
    pub unavailable_rate: f64,
    pub call_latency_ms: u64,
}

impl Default for FaultPlan {
    fn default() -> Self {
        Self {
            failure_rate: 0.0,
            unavailable_rate: 0.0,
            call_latency_ms: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackoffPolicy {
    pub initial_ms: u64,
    pub max_ms: u64,
    pub availability_timeout_ms: u64,
}

impl BackoffPolicy {
    pub fn delay(&self, step: u32) -> Duration {
        let factor = 1u64.checked_shl(step.min(32)).unwrap_or(u64::MAX);
        Duration::from_millis(self.initial_ms.saturating_mul(factor).min(self.max_ms))
    }

    pub fn retry_delay(&self, attempt: u32) -> Duration {
        match attempt {
            0 | 1 => Duration::ZERO,
            n => self.delay(n - 2),
        }
    }

    pub fn availability_timeout(&self) -> Duration {
        Duration::from_millis(self.availability_timeout_ms)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_ms: 50,
            max_ms: 1_000,
            availability_timeout_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub pursuit: PursuitConfig,
    pub physics_hz: f64,
    pub hunter_pose_hz: f64,
    pub target_pose_hz: f64,
    /// Agents stop once their last command is older than this.
    pub command_timeout_ms: u64,
    pub walls: ArenaBounds,
    pub hunter_start: Pose,
    pub target_start: Option<Pose>,
    pub faults: FaultPlan,
    pub backoff: BackoffPolicy,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            pursuit: PursuitConfig::default(),
            physics_hz: 62.5,
            hunter_pose_hz: 62.5,
            target_pose_hz: 62.5,
            command_timeout_ms: 1_000,
            walls: ArenaBounds::new(0.0, 11.088889),
            hunter_start: Pose::new(5.544445, 5.544445, 0.0),
            target_start: None,
            faults: FaultPlan::default(),
            backoff: BackoffPolicy::default(),
            seed: None,
        }
    }
}

impl SimConfig {
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
        self.pursuit.validate()?;

        for (name, hz) in [
            ("physics_hz", self.physics_hz),
            ("hunter_pose_hz", self.hunter_pose_hz),
            ("target_pose_hz", self.target_pose_hz),
        ] {
            if period_for(hz).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be positive and give a non-zero, representable period"
                )));
            }
        }

        for (name, rate) in [
            ("faults.failure_rate", self.faults.failure_rate),
            ("faults.unavailable_rate", self.faults.unavailable_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::Invalid(format!("{name} must lie in [0, 1]")));
            }
        }

        if !(self.walls.span() > 0.0) {
            return Err(ConfigError::Invalid(
                "walls.max must be greater than walls.min".to_string(),
            ));
        }
        let (walls, respawn) = (self.walls, self.pursuit.arena);
        if walls.min > respawn.min || walls.max < respawn.max {
            return Err(ConfigError::Invalid(
                "walls must contain the pursuit.arena respawn range".to_string(),
            ));
        }
        if self.backoff.initial_ms > self.backoff.max_ms {
            return Err(ConfigError::Invalid(
                "backoff.initial_ms must not exceed backoff.max_ms".to_string(),
            ));
        }
        Ok(())
    }

    pub fn physics_period(&self) -> Duration {
        period_for(self.physics_hz).unwrap_or(DEFAULT_PERIOD)
    }

    pub fn hunter_pose_period(&self) -> Duration {
        period_for(self.hunter_pose_hz).unwrap_or(DEFAULT_PERIOD)
    }

    pub fn target_pose_period(&self) -> Duration {
        period_for(self.target_pose_hz).unwrap_or(DEFAULT_PERIOD)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

const DEFAULT_PERIOD: Duration = Duration::from_millis(16);

pub fn period_for(hz: f64) -> Option<Duration> {
    if !(hz > 0.0) {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / hz)
        .ok()
        .filter(|period| !period.is_zero())
}

pub fn run_duration(secs: f64) -> Result<Duration, ConfigError> {
    if !(secs > 0.0) {
        return Err(ConfigError::Invalid(format!(
            "run duration must be positive, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|err| ConfigError::Invalid(format!("run duration {secs} s: {err}")))
}

use crate::config::PursuitGains;
use crate::pose::{Pose, VelocityCommand, wrap_angle};

/// Three-level bang-bang steering toward the target.
#[derive(Debug, Clone, PartialEq)]
pub struct PursuitLaw {
    gains: PursuitGains,
}

impl PursuitLaw {
    pub fn new(gains: PursuitGains) -> Self {
        Self { gains }
    }

    pub fn gains(&self) -> &PursuitGains {
        &self.gains
    }

    pub fn heading_error(&self, hunter: &Pose, target: &Pose) -> f64 {
        let delta = hunter.bearing_to(target) - hunter.heading;
        if self.gains.normalize_heading_error {
            wrap_angle(delta)
        } else {
            delta
        }
    }

    pub fn compute(&self, hunter: &Pose, target: &Pose) -> VelocityCommand {
        let delta = self.heading_error(hunter, target);
        let gains = &self.gains;

        if delta.abs() <= gains.tolerance {
            VelocityCommand::new(gains.cruise_speed, 0.0)
        } else if delta >= 0.0 {
            VelocityCommand::new(gains.correction_speed, gains.turn_rate)
        } else {
            VelocityCommand::new(gains.correction_speed, -gains.turn_rate)
        }
    }
}

impl Default for PursuitLaw {
    fn default() -> Self {
        Self::new(PursuitGains::default())
    }
}

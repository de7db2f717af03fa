use crate::pose::Pose;

pub const DEFAULT_CAPTURE_THRESHOLD: f64 = 0.5;

/// True when the hunter is strictly closer than `threshold` to the target.
pub fn is_captured(hunter: &Pose, target: &Pose, threshold: f64) -> bool {
    hunter.distance_to(target) < threshold
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureDetector {
    threshold: f64,
}

impl CaptureDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_captured(&self, hunter: &Pose, target: &Pose) -> bool {
        is_captured(hunter, target, self.threshold)
    }
}

impl Default for CaptureDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTURE_THRESHOLD)
    }
}

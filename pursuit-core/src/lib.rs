pub mod capture;
pub mod config;
pub mod control;
pub mod error;
pub mod pose;
pub mod pose_cache;
pub mod pursuit;
pub mod respawn;

pub use capture::{CaptureDetector, DEFAULT_CAPTURE_THRESHOLD, is_captured};
pub use config::{ArenaBounds, PursuitConfig, PursuitGains};
pub use control::{ControlLoop, Event, Reaction};
pub use error::{ConfigError, ServiceError, ServiceKind};
pub use pose::{AgentRole, Pose, VelocityCommand, wrap_angle};
pub use pose_cache::PoseCache;
pub use pursuit::PursuitLaw;
pub use respawn::{
    PursuitState, RequestId, RequestKind, RespawnCoordinator, RespawnPhase, RespawnStats,
    ServiceRequest,
};

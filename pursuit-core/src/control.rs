use crate::capture::CaptureDetector;
use crate::config::PursuitConfig;
use crate::error::ServiceError;
use crate::pose::{AgentRole, Pose, VelocityCommand};
use crate::pose_cache::PoseCache;
use crate::pursuit::PursuitLaw;
use crate::respawn::{
    PursuitState, RequestId, RespawnCoordinator, RespawnPhase, RespawnStats, ServiceRequest,
};
use fastrand::Rng;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Pose {
        role: AgentRole,
        pose: Pose,
    },
    RemovalFinished {
        id: RequestId,
        result: Result<(), ServiceError>,
    },
    CreationFinished {
        id: RequestId,
        result: Result<(), ServiceError>,
    },
}

impl Event {
    pub fn hunter(pose: Pose) -> Self {
        Event::Pose {
            role: AgentRole::Hunter,
            pose,
        }
    }

    pub fn target(pose: Pose) -> Self {
        Event::Pose {
            role: AgentRole::Target,
            pose,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reaction {
    pub command: Option<VelocityCommand>,
    pub request: Option<ServiceRequest>,
}

impl Reaction {
    pub fn none() -> Self {
        Self::default()
    }

    fn request(request: Option<ServiceRequest>) -> Self {
        Self {
            command: None,
            request,
        }
    }
}

pub struct ControlLoop {
    cache: PoseCache,
    law: PursuitLaw,
    detector: CaptureDetector,
    respawn: RespawnCoordinator,
    // Target poses stamped at or below this describe an agent that was removed.
    stale_target_until: u64,
    commands_emitted: u64,
}

impl ControlLoop {
    pub fn new(config: &PursuitConfig, rng: Rng) -> Self {
        Self {
            cache: PoseCache::new(),
            law: PursuitLaw::new(config.gains.clone()),
            detector: CaptureDetector::new(config.capture_threshold),
            respawn: RespawnCoordinator::new(config.target_name.clone(), config.arena, rng),
            stale_target_until: 0,
            commands_emitted: 0,
        }
    }

    pub fn with_seed(config: &PursuitConfig, seed: u64) -> Self {
        Self::new(config, Rng::with_seed(seed))
    }

    pub fn handle(&mut self, event: Event) -> Reaction {
        match event {
            Event::Pose { role, pose } => {
                self.cache.set_pose(role, pose);
                self.evaluate()
            }
            Event::RemovalFinished { id, result } => {
                Reaction::request(self.respawn.on_removal_finished(id, result))
            }
            Event::CreationFinished { id, result } => {
                let was_suspended = self.respawn.pursuit() == PursuitState::Suspended;
                let request = self.respawn.on_creation_finished(id, result);
                if was_suspended && self.respawn.pursuit() == PursuitState::Active {
                    self.stale_target_until = self.cache.sequence();
                }
                Reaction::request(request)
            }
        }
    }

    pub fn cache(&self) -> &PoseCache {
        &self.cache
    }

    pub fn coordinator(&self) -> &RespawnCoordinator {
        &self.respawn
    }

    pub fn pursuit(&self) -> PursuitState {
        self.respawn.pursuit()
    }

    pub fn phase(&self) -> RespawnPhase {
        self.respawn.phase()
    }

    pub fn stats(&self) -> RespawnStats {
        self.respawn.stats()
    }

    pub fn commands_emitted(&self) -> u64 {
        self.commands_emitted
    }

    fn evaluate(&mut self) -> Reaction {
        let Some((hunter, target)) = self.cache.snapshot() else {
            return Reaction::none();
        };

        if self.respawn.pursuit() == PursuitState::Suspended {
            return self.emit(VelocityCommand::STOP, None);
        }

        if !self.target_is_fresh() {
            debug!("waiting for the respawned target to report a pose");
            return Reaction::none();
        }

        if self.detector.is_captured(&hunter, &target) {
            let request = self.respawn.on_captured();
            return self.emit(VelocityCommand::STOP, request);
        }

        let command = self.law.compute(&hunter, &target);
        self.emit(command, None)
    }

    fn target_is_fresh(&self) -> bool {
        self.cache
            .target_seq()
            .is_some_and(|seq| seq > self.stale_target_until)
    }

    fn emit(&mut self, command: VelocityCommand, request: Option<ServiceRequest>) -> Reaction {
        self.commands_emitted += 1;
        Reaction {
            command: Some(command),
            request,
        }
    }
}

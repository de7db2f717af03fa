//! | phase              | event              | next phase         | request issued         |
//! |--------------------|--------------------|--------------------|------------------------|
//! | `Idle`             | capture            | `AwaitingRemoval`  | remove (attempt 1)     |
//! | `AwaitingRemoval`  | removal ok         | `AwaitingCreation` | create (attempt 1)     |
//! | `AwaitingRemoval`  | removal failed     | `AwaitingRemoval`  | remove (attempt n + 1) |
//! | `AwaitingCreation` | creation ok        | `Idle`             | none                   |
//! | `AwaitingCreation` | creation failed    | `AwaitingCreation` | create, fresh pose     |

use crate::config::ArenaBounds;
use crate::error::{ServiceError, ServiceKind};
use crate::pose::Pose;
use fastrand::Rng;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    Remove { agent: String },
    Create { agent: String, pose: Pose },
}

impl RequestKind {
    pub fn service(&self) -> ServiceKind {
        match self {
            RequestKind::Remove { .. } => ServiceKind::Remove,
            RequestKind::Create { .. } => ServiceKind::Create,
        }
    }

    pub fn agent(&self) -> &str {
        match self {
            RequestKind::Remove { agent } | RequestKind::Create { agent, .. } => agent,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRequest {
    pub id: RequestId,
    pub attempt: u32, // 1-based, per phase
    pub kind: RequestKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RespawnPhase {
    Idle,
    AwaitingRemoval,
    AwaitingCreation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PursuitState {
    Active,
    Suspended,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RespawnStats {
    pub captures: u64,
    pub respawns: u64,
    pub removal_failures: u64,
    pub creation_failures: u64,
    pub ignored_completions: u64,
}

#[derive(Debug, Clone)]
pub struct RespawnCoordinator {
    target_name: String,
    arena: ArenaBounds,
    rng: Rng,
    phase: RespawnPhase,
    outstanding: Option<ServiceRequest>,
    next_id: u64,
    stats: RespawnStats,
}

impl RespawnCoordinator {
    pub fn new(target_name: impl Into<String>, arena: ArenaBounds, rng: Rng) -> Self {
        Self {
            target_name: target_name.into(),
            arena,
            rng,
            phase: RespawnPhase::Idle,
            outstanding: None,
            next_id: 1,
            stats: RespawnStats::default(),
        }
    }

    pub fn phase(&self) -> RespawnPhase {
        self.phase
    }

    pub fn pursuit(&self) -> PursuitState {
        match self.phase {
            RespawnPhase::Idle => PursuitState::Active,
            RespawnPhase::AwaitingRemoval | RespawnPhase::AwaitingCreation => {
                PursuitState::Suspended
            }
        }
    }

    pub fn outstanding(&self) -> Option<&ServiceRequest> {
        self.outstanding.as_ref()
    }

    pub fn stats(&self) -> RespawnStats {
        self.stats
    }

    pub fn on_captured(&mut self) -> Option<ServiceRequest> {
        if self.phase != RespawnPhase::Idle {
            debug!(phase = ?self.phase, "capture ignored while respawn is in flight");
            return None;
        }

        self.stats.captures += 1;
        self.phase = RespawnPhase::AwaitingRemoval;
        info!(target_agent = %self.target_name, "target reached, removing and respawning it");
        Some(self.issue(self.remove_kind(), 1))
    }

    pub fn on_removal_finished(
        &mut self,
        id: RequestId,
        result: Result<(), ServiceError>,
    ) -> Option<ServiceRequest> {
        let finished = self.accept(RespawnPhase::AwaitingRemoval, id)?;

        match result {
            Ok(()) => {
                let pose = self.draw_pose();
                info!(
                    target_agent = %self.target_name,
                    x = pose.x,
                    y = pose.y,
                    "target removed, creating it at a new location"
                );
                self.phase = RespawnPhase::AwaitingCreation;
                Some(self.issue(self.create_kind(pose), 1))
            }
            Err(err) => {
                self.stats.removal_failures += 1;
                report_failure(&err, &finished);
                Some(self.issue(self.remove_kind(), finished.attempt + 1))
            }
        }
    }

    pub fn on_creation_finished(
        &mut self,
        id: RequestId,
        result: Result<(), ServiceError>,
    ) -> Option<ServiceRequest> {
        let finished = self.accept(RespawnPhase::AwaitingCreation, id)?;

        match result {
            Ok(()) => {
                self.stats.respawns += 1;
                self.phase = RespawnPhase::Idle;
                info!(target_agent = %self.target_name, "target created, pursuit resumed");
                None
            }
            Err(err) => {
                self.stats.creation_failures += 1;
                report_failure(&err, &finished);
                let pose = self.draw_pose();
                Some(self.issue(self.create_kind(pose), finished.attempt + 1))
            }
        }
    }

    fn accept(&mut self, expected: RespawnPhase, id: RequestId) -> Option<ServiceRequest> {
        let matches = self.phase == expected
            && self
                .outstanding
                .as_ref()
                .is_some_and(|request| request.id == id);

        if !matches {
            self.stats.ignored_completions += 1;
            warn!(
                request = %id,
                phase = ?self.phase,
                outstanding = ?self.outstanding.as_ref().map(|request| request.id),
                "ignoring completion that does not match the outstanding request"
            );
            return None;
        }

        self.outstanding.take()
    }

    fn issue(&mut self, kind: RequestKind, attempt: u32) -> ServiceRequest {
        let request = ServiceRequest {
            id: RequestId(self.next_id),
            attempt,
            kind,
        };
        self.next_id += 1;
        debug!(request = %request.id, attempt, service = %request.kind.service(), "issuing request");
        self.outstanding = Some(request.clone());
        request
    }

    fn remove_kind(&self) -> RequestKind {
        RequestKind::Remove {
            agent: self.target_name.clone(),
        }
    }

    fn create_kind(&self, pose: Pose) -> RequestKind {
        RequestKind::Create {
            agent: self.target_name.clone(),
            pose,
        }
    }

    fn draw_pose(&mut self) -> Pose {
        let span = self.arena.span();
        let x = self.arena.min + self.rng.f64() * span;
        let y = self.arena.min + self.rng.f64() * span;
        Pose::new(x, y, 0.0)
    }
}

fn report_failure(err: &ServiceError, request: &ServiceRequest) {
    if err.is_transient() {
        warn!(request = %request.id, attempt = request.attempt, "{err}, retrying");
    } else {
        error!(request = %request.id, attempt = request.attempt, "{err}, retrying");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> RespawnCoordinator {
        RespawnCoordinator::new("turtle2", ArenaBounds::default(), Rng::with_seed(11))
    }

    fn failed(service: ServiceKind) -> Result<(), ServiceError> {
        Err(ServiceError::failed(service, "boom"))
    }

    fn created_pose(request: &ServiceRequest) -> Pose {
        match &request.kind {
            RequestKind::Create { pose, .. } => *pose,
            other => panic!("expected a create request, got {other:?}"),
        }
    }

    #[test]
    fn starts_idle_and_active() {
        let coordinator = coordinator();
        assert_eq!(coordinator.phase(), RespawnPhase::Idle);
        assert_eq!(coordinator.pursuit(), PursuitState::Active);
        assert!(coordinator.outstanding().is_none());
    }

    #[test]
    fn full_cycle_returns_to_idle() {
        let mut coordinator = coordinator();

        let removal = coordinator.on_captured().unwrap();
        assert_eq!(removal.kind, RequestKind::Remove { agent: "turtle2".into() });
        assert_eq!(coordinator.pursuit(), PursuitState::Suspended);

        let creation = coordinator.on_removal_finished(removal.id, Ok(())).unwrap();
        assert_eq!(coordinator.phase(), RespawnPhase::AwaitingCreation);
        assert_eq!(creation.attempt, 1);
        let pose = created_pose(&creation);
        assert!(ArenaBounds::default().contains(pose.x, pose.y));
        assert_eq!(pose.heading, 0.0);

        assert!(coordinator.on_creation_finished(creation.id, Ok(())).is_none());
        assert_eq!(coordinator.phase(), RespawnPhase::Idle);
        assert_eq!(coordinator.pursuit(), PursuitState::Active);
        assert!(coordinator.outstanding().is_none());
        assert_eq!(coordinator.stats().captures, 1);
        assert_eq!(coordinator.stats().respawns, 1);
    }

    #[test]
    fn capture_outside_idle_is_ignored() {
        let mut coordinator = coordinator();
        let removal = coordinator.on_captured().unwrap();

        assert!(coordinator.on_captured().is_none());
        assert_eq!(coordinator.outstanding(), Some(&removal));

        let creation = coordinator.on_removal_finished(removal.id, Ok(())).unwrap();
        assert!(coordinator.on_captured().is_none());
        assert_eq!(coordinator.outstanding(), Some(&creation));
        assert_eq!(coordinator.stats().captures, 1);
    }

    #[test]
    fn removal_failures_retry_until_success() {
        let mut coordinator = coordinator();
        let mut request = coordinator.on_captured().unwrap();

        for attempt in 2..=6 {
            let outcome = if attempt % 2 == 0 {
                Err(ServiceError::Unavailable {
                    service: ServiceKind::Remove,
                    waited_ms: 100,
                })
            } else {
                failed(ServiceKind::Remove)
            };
            request = coordinator.on_removal_finished(request.id, outcome).unwrap();
            assert_eq!(request.attempt, attempt);
            assert_eq!(request.kind.service(), ServiceKind::Remove);
            assert_eq!(coordinator.pursuit(), PursuitState::Suspended);
        }

        let creation = coordinator.on_removal_finished(request.id, Ok(())).unwrap();
        assert_eq!(creation.kind.service(), ServiceKind::Create);
        coordinator.on_creation_finished(creation.id, Ok(()));
        assert_eq!(coordinator.phase(), RespawnPhase::Idle);
        assert_eq!(coordinator.stats().removal_failures, 5);
    }

    #[test]
    fn creation_retries_draw_fresh_poses() {
        let mut coordinator = coordinator();
        let removal = coordinator.on_captured().unwrap();
        let first = coordinator.on_removal_finished(removal.id, Ok(())).unwrap();
        let second = coordinator
            .on_creation_finished(first.id, failed(ServiceKind::Create))
            .unwrap();
        let third = coordinator
            .on_creation_finished(second.id, failed(ServiceKind::Create))
            .unwrap();

        assert_eq!(coordinator.pursuit(), PursuitState::Suspended);
        assert_eq!(third.attempt, 3);
        assert_ne!(created_pose(&first), created_pose(&second));
        assert_ne!(created_pose(&second), created_pose(&third));

        assert!(coordinator.on_creation_finished(third.id, Ok(())).is_none());
        assert_eq!(coordinator.pursuit(), PursuitState::Active);
        assert_eq!(coordinator.stats().creation_failures, 2);
    }

    #[test]
    fn stale_and_mismatched_completions_are_ignored() {
        let mut coordinator = coordinator();

        // Nothing outstanding yet.
        assert!(coordinator.on_removal_finished(RequestId(1), Ok(())).is_none());
        assert_eq!(coordinator.phase(), RespawnPhase::Idle);

        let first = coordinator.on_captured().unwrap();
        let retry = coordinator
            .on_removal_finished(first.id, failed(ServiceKind::Remove))
            .unwrap();

        // A second reply for the already-failed attempt changes nothing.
        assert!(coordinator.on_removal_finished(first.id, Ok(())).is_none());
        assert_eq!(coordinator.phase(), RespawnPhase::AwaitingRemoval);
        assert_eq!(coordinator.outstanding(), Some(&retry));

        // A creation reply while removal is pending changes nothing either.
        assert!(coordinator.on_creation_finished(retry.id, Ok(())).is_none());
        assert_eq!(coordinator.phase(), RespawnPhase::AwaitingRemoval);
        assert_eq!(coordinator.stats().ignored_completions, 3);
    }

    #[test]
    fn request_ids_are_never_reused() {
        let mut coordinator = coordinator();
        let mut seen = Vec::new();

        for _ in 0..3 {
            let removal = coordinator.on_captured().unwrap();
            seen.push(removal.id);
            let creation = coordinator.on_removal_finished(removal.id, Ok(())).unwrap();
            seen.push(creation.id);
            coordinator.on_creation_finished(creation.id, Ok(()));
        }

        let mut deduped = seen.clone();
        deduped.dedup();
        assert_eq!(deduped, seen);
        assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

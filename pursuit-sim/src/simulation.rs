use crate::arena::{Arena, ArenaError};
use crate::config::SimConfig;
use crate::services::{Completion, ServiceBoundary};
use fastrand::Rng;
use pursuit_core::{
    AgentRole, ControlLoop, Event, Pose, PursuitState, Reaction, RequestKind, RespawnPhase,
    ServiceError, ServiceKind,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{Instant, interval, sleep};
use tracing::{debug, info, warn};

const COMPLETION_QUEUE: usize = 16;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] pursuit_core::ConfigError),
    #[error("failed to place starting agents: {0}")]
    Arena(#[from] ArenaError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub elapsed_ms: u64,
    pub captures: u64,
    pub respawns: u64,
    pub removal_failures: u64,
    pub creation_failures: u64,
    pub ignored_completions: u64,
    pub rejected_by_arena: u64,
    pub commands_emitted: u64,
    pub final_phase: RespawnPhase,
    pub final_pursuit: PursuitState,
    pub hunter: Option<Pose>,
    pub target: Option<Pose>,
}

pub struct Simulation {
    config: SimConfig,
    arena: Arena,
    control: ControlLoop,
    boundary: ServiceBoundary,
    completions: mpsc::Receiver<Completion>,
    rejected_by_arena: u64,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(|| fastrand::u64(..));
        let mut placement = Rng::with_seed(seed.wrapping_add(1));

        let mut arena = Arena::new(config.walls, config.command_timeout());
        arena.spawn(&config.pursuit.hunter_name, config.hunter_start)?;
        let target_start = config.target_start.unwrap_or_else(|| {
            let bounds = config.pursuit.arena;
            Pose::new(
                bounds.min + placement.f64() * bounds.span(),
                bounds.min + placement.f64() * bounds.span(),
                0.0,
            )
        });
        arena.spawn(&config.pursuit.target_name, target_start)?;

        let (tx, completions) = mpsc::channel(COMPLETION_QUEUE);
        let boundary = ServiceBoundary::new(
            config.faults.clone(),
            config.backoff.clone(),
            seed.wrapping_add(2),
            tx,
        );
        let control = ControlLoop::with_seed(&config.pursuit, seed);

        info!(seed, ?target_start, "pursuit simulation ready");

        Ok(Self {
            config,
            arena,
            control,
            boundary,
            completions,
            rejected_by_arena: 0,
        })
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn control(&self) -> &ControlLoop {
        &self.control
    }

    pub async fn run_for(mut self, duration: Duration) -> SimulationReport {
        let started = Instant::now();
        let dt = self.config.physics_period().as_secs_f64();
        let mut physics = interval(self.config.physics_period());
        let mut hunter_feed = interval(self.config.hunter_pose_period());
        let mut target_feed = interval(self.config.target_pose_period());
        let deadline = sleep(duration);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = &mut deadline => break,
                Some(completion) = self.completions.recv() => self.finish(completion),
                _ = physics.tick() => self.arena.step(dt),
                _ = hunter_feed.tick() => self.publish_pose(AgentRole::Hunter),
                _ = target_feed.tick() => self.publish_pose(AgentRole::Target),
            }
        }

        self.report(started.elapsed())
    }

    fn publish_pose(&mut self, role: AgentRole) {
        let name = match role {
            AgentRole::Hunter => &self.config.pursuit.hunter_name,
            AgentRole::Target => &self.config.pursuit.target_name,
        };
        // A removed agent publishes nothing.
        let Some(pose) = self.arena.pose(name) else {
            return;
        };
        let reaction = self.control.handle(Event::Pose { role, pose });
        self.apply(reaction);
    }

    fn finish(&mut self, completion: Completion) {
        let Completion { request, outcome } = completion;
        let current = self
            .control
            .coordinator()
            .outstanding()
            .is_some_and(|outstanding| outstanding.id == request.id);
        // The controller drops stale completions; the arena must not act on them either.
        let outcome = if current {
            outcome.and_then(|()| self.execute(&request.kind))
        } else {
            outcome
        };

        let event = match request.kind.service() {
            ServiceKind::Remove => Event::RemovalFinished {
                id: request.id,
                result: outcome,
            },
            ServiceKind::Create => Event::CreationFinished {
                id: request.id,
                result: outcome,
            },
        };
        let reaction = self.control.handle(event);
        self.apply(reaction);
    }

    fn execute(&mut self, kind: &RequestKind) -> Result<(), ServiceError> {
        let result = match kind {
            RequestKind::Remove { agent } => self.arena.remove(agent).map(|_| ()),
            RequestKind::Create { agent, pose } => self.arena.spawn(agent, *pose),
        };
        result.map_err(|err| {
            self.rejected_by_arena += 1;
            ServiceError::failed(kind.service(), err.to_string())
        })
    }

    fn apply(&mut self, reaction: Reaction) {
        if let Some(command) = reaction.command {
            let hunter = &self.config.pursuit.hunter_name;
            if let Err(err) = self.arena.set_command(hunter, command) {
                warn!("dropping velocity command: {err}");
            }
        }

        if let Some(request) = reaction.request {
            debug!(request = %request.id, agent = request.kind.agent(), "dispatching request");
            self.boundary.dispatch(request);
        }
    }

    fn report(&self, elapsed: Duration) -> SimulationReport {
        let stats = self.control.stats();
        SimulationReport {
            elapsed_ms: elapsed.as_millis() as u64,
            captures: stats.captures,
            respawns: stats.respawns,
            removal_failures: stats.removal_failures,
            creation_failures: stats.creation_failures,
            ignored_completions: stats.ignored_completions,
            rejected_by_arena: self.rejected_by_arena,
            commands_emitted: self.control.commands_emitted(),
            final_phase: self.control.phase(),
            final_pursuit: self.control.pursuit(),
            hunter: self.arena.pose(&self.config.pursuit.hunter_name),
            target: self.arena.pose(&self.config.pursuit.target_name),
        }
    }
}

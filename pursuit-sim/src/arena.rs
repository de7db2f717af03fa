use pursuit_core::{ArenaBounds, Pose, VelocityCommand, wrap_angle};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("an agent named {0} already exists")]
    AlreadyExists(String),
    #[error("no agent named {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy)]
struct Agent {
    pose: Pose,
    command: VelocityCommand,
    command_age: f64, // seconds since the command was set
}

#[derive(Debug, Clone)]
pub struct Arena {
    walls: ArenaBounds,
    command_timeout: f64,
    agents: HashMap<String, Agent>,
}

impl Arena {
    pub fn new(walls: ArenaBounds, command_timeout: Duration) -> Self {
        Self {
            walls,
            command_timeout: command_timeout.as_secs_f64(),
            agents: HashMap::new(),
        }
    }

    pub fn spawn(&mut self, name: &str, pose: Pose) -> Result<(), ArenaError> {
        if self.agents.contains_key(name) {
            return Err(ArenaError::AlreadyExists(name.to_string()));
        }
        let pose = Pose::new(
            self.clamp(pose.x),
            self.clamp(pose.y),
            wrap_angle(pose.heading),
        );
        self.agents.insert(
            name.to_string(),
            Agent {
                pose,
                command: VelocityCommand::STOP,
                command_age: 0.0,
            },
        );
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<Pose, ArenaError> {
        self.agents
            .remove(name)
            .map(|agent| agent.pose)
            .ok_or_else(|| ArenaError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    pub fn pose(&self, name: &str) -> Option<Pose> {
        self.agents.get(name).map(|agent| agent.pose)
    }

    pub fn command(&self, name: &str) -> Option<VelocityCommand> {
        self.agents.get(name).map(|agent| agent.command)
    }

    pub fn set_command(&mut self, name: &str, command: VelocityCommand) -> Result<(), ArenaError> {
        let agent = self
            .agents
            .get_mut(name)
            .ok_or_else(|| ArenaError::NotFound(name.to_string()))?;
        agent.command = command;
        agent.command_age = 0.0;
        Ok(())
    }

    /// Rotates, then translates every agent by its current command over `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        let walls = self.walls;
        let timeout = self.command_timeout;

        for agent in self.agents.values_mut() {
            if agent.command_age >= timeout {
                agent.command = VelocityCommand::STOP;
            }

            let pose = &mut agent.pose;
            pose.heading = wrap_angle(pose.heading + agent.command.angular * dt);
            pose.x = (pose.x + agent.command.linear * pose.heading.cos() * dt)
                .clamp(walls.min, walls.max);
            pose.y = (pose.y + agent.command.linear * pose.heading.sin() * dt)
                .clamp(walls.min, walls.max);

            agent.command_age += dt;
        }
    }

    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.walls.min, self.walls.max)
    }
}

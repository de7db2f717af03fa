use crate::pose::{AgentRole, Pose};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Stamped {
    pose: Pose,
    seq: u64,
}

#[derive(Debug, Clone, Default)]
pub struct PoseCache {
    hunter: Option<Stamped>,
    target: Option<Stamped>,
    sequence: u64,
}

impl PoseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_hunter_pose(&mut self, pose: Pose) {
        self.hunter = Some(self.stamp(pose));
    }

    pub fn set_target_pose(&mut self, pose: Pose) {
        self.target = Some(self.stamp(pose));
    }

    pub fn set_pose(&mut self, role: AgentRole, pose: Pose) {
        match role {
            AgentRole::Hunter => self.set_hunter_pose(pose),
            AgentRole::Target => self.set_target_pose(pose),
        }
    }

    pub fn has_both(&self) -> bool {
        self.hunter.is_some() && self.target.is_some()
    }

    pub fn snapshot(&self) -> Option<(Pose, Pose)> {
        Some((self.hunter?.pose, self.target?.pose))
    }

    pub fn hunter_seq(&self) -> Option<u64> {
        self.hunter.map(|entry| entry.seq)
    }

    pub fn target_seq(&self) -> Option<u64> {
        self.target.map(|entry| entry.seq)
    }

    /// Stamp given to the most recent update, 0 before any update.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    fn stamp(&mut self, pose: Pose) -> Stamped {
        self.sequence += 1;
        Stamped {
            pose,
            seq: self.sequence,
        }
    }
}

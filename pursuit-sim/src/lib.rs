pub mod arena;
pub mod config;
pub mod services;
pub mod simulation;

pub use arena::{Arena, ArenaError};
pub use config::{BackoffPolicy, FaultPlan, SimConfig, period_for, run_duration};
pub use services::{Completion, ServiceBoundary};
pub use simulation::{SimError, Simulation, SimulationReport};

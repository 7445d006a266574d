//! Domain models: demand queues, servers, and the simulation state aggregate

pub mod queue;
pub mod server;
pub mod state;

pub use queue::DemandQueue;
pub use server::{Server, ServerId, ServerState};
pub use state::{SimulationState, StepStats, TerminationReason};

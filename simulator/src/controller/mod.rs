//! Controller interface
//!
//! The controller is the external decision function driving a run: once per
//! timestep the engine hands it an immutable [`StateSnapshot`] and receives
//! an [`ActionSet`] of requested fleet changes back. The engine validates
//! every item; a rejected item is logged and skipped without affecting the
//! rest of the batch, and a controller error degrades to an empty action
//! set. Controller failure is never fatal to a run.
//!
//! # Implementing a controller
//!
//! ```
//! use fleet_simulator_core_rs::controller::{
//!     ActionSet, Controller, ControllerError, StartAction, StateSnapshot,
//! };
//!
//! struct FixedFleet;
//!
//! impl Controller for FixedFleet {
//!     fn decide(&mut self, snapshot: &StateSnapshot) -> Result<ActionSet, ControllerError> {
//!         let mut actions = ActionSet::default();
//!         if snapshot.timestep == 0 {
//!             actions.start.push(StartAction {
//!                 server_type: "SMALL".to_string(),
//!                 queue: "api".to_string(),
//!             });
//!         }
//!         Ok(actions)
//!     }
//! }
//! ```
//!
//! Closures work too: any `FnMut(&StateSnapshot) -> Result<ActionSet,
//! ControllerError>` is a controller.

use crate::models::server::{ServerId, ServerState};
use crate::models::state::StepStats;
use crate::scenario::ServerTypeParams;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod baseline;

pub use baseline::{GreedyScalingController, IdleController};

/// A controller failure
///
/// Carries only a message; the engine logs it and substitutes an empty
/// action set, so the error type never needs to cross the run boundary.
#[derive(Debug, Error)]
#[error("controller failure: {0}")]
pub struct ControllerError(pub String);

impl ControllerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Observable state of one queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub name: String,

    /// Current backlog length
    pub size: usize,

    /// Demand rate computed at the last generation step
    pub demand_rate: f64,

    /// Capacity assigned at the last processed step
    pub capacity: f64,

    /// Demand attractiveness multiplier in [0.5, 1.5]
    pub heat: f64,
}

/// Observable state of one server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSnapshot {
    pub id: ServerId,
    pub server_type: String,

    /// Currently assigned queue
    pub queue: String,
    pub state: ServerState,

    /// Current throughput bonus in [0, type's max]
    pub specialization: f64,
}

/// Static per-queue economics a controller may price decisions against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueInfo {
    pub revenue_per_request: f64,
    pub timeout_threshold: usize,
}

/// Read-only state handed to the controller each timestep
///
/// Queues and servers appear in registry order. Everything here is a copy;
/// mutating a snapshot never touches the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub timestep: usize,
    pub budget: f64,
    pub max_servers: usize,
    pub max_queue_size: usize,
    pub bankruptcy_threshold: usize,
    pub queues: Vec<QueueSnapshot>,
    pub servers: Vec<ServerSnapshot>,

    /// Static queue economics by name
    pub queue_info: BTreeMap<String, QueueInfo>,

    /// Server type profiles by name
    pub server_types: BTreeMap<String, ServerTypeParams>,

    /// Per-step and cumulative revenue/cost statistics
    pub stats: StepStats,
}

impl StateSnapshot {
    /// Look up a queue snapshot by name
    pub fn queue(&self, name: &str) -> Option<&QueueSnapshot> {
        self.queues.iter().find(|q| q.name == name)
    }
}

/// Request to start a new server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartAction {
    /// Server type name (must exist in the scenario)
    pub server_type: String,

    /// Queue the new server is assigned to
    pub queue: String,
}

/// Request to reassign a running server to another queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReassignAction {
    pub server: ServerId,
    pub queue: String,
}

/// The controller's requested actions for one timestep
///
/// All three lists are optional and validated independently; a rejected
/// item never aborts the remaining batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionSet {
    /// Servers to start
    pub start: Vec<StartAction>,

    /// Servers to stop
    pub stop: Vec<ServerId>,

    /// Servers to move to another queue
    pub reassign: Vec<ReassignAction>,
}

impl ActionSet {
    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.stop.is_empty() && self.reassign.is_empty()
    }
}

/// The external decision function driving a run
///
/// Invoked once per timestep with the current snapshot. Expected to return
/// promptly; the engine imposes no timeout. An `Err` is treated as an empty
/// action set.
pub trait Controller {
    fn decide(&mut self, snapshot: &StateSnapshot) -> Result<ActionSet, ControllerError>;
}

impl<F> Controller for F
where
    F: FnMut(&StateSnapshot) -> Result<ActionSet, ControllerError>,
{
    fn decide(&mut self, snapshot: &StateSnapshot) -> Result<ActionSet, ControllerError> {
        self(snapshot)
    }
}

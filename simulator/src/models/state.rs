//! Simulation state
//!
//! The mutable aggregate for one run: timestep counter, budget, static
//! limits, the queue and server registries, running statistics, and the
//! termination flag. Owned exclusively by the engine for the lifetime of a
//! run; nothing here is shared across runs.
//!
//! # Critical Invariants
//!
//! 1. The queue registry order is fixed at construction and never changes
//! 2. Servers appear in creation order; removal never reorders survivors
//! 3. `termination` is set at most once and never cleared

use crate::models::queue::DemandQueue;
use crate::models::server::{Server, ServerId};
use crate::scenario::ScenarioConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// A queue's backlog exceeded the configured maximum
    QueueOverflow { queue: String },

    /// The budget stayed negative for the configured number of steps
    Bankruptcy,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::QueueOverflow { queue } => write!(f, "queue_overflow: {}", queue),
            TerminationReason::Bankruptcy => write!(f, "bankruptcy"),
        }
    }
}

/// Per-step and cumulative revenue/cost statistics
///
/// The three budget mutations of a timestep are recorded separately:
/// action costs (startup/switching), operational costs, and revenue. The
/// per-step fields are overwritten every step; the totals accumulate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepStats {
    /// Revenue credited this step
    pub revenue_this_step: f64,

    /// Startup/switching costs charged this step
    pub action_costs_this_step: f64,

    /// Per-step operating costs charged this step
    pub operational_costs_this_step: f64,

    /// Cumulative revenue over the run
    pub total_revenue: f64,

    /// Cumulative costs over the run (action + operational)
    pub total_costs: f64,
}

impl StepStats {
    /// All costs charged this step
    pub fn costs_this_step(&self) -> f64 {
        self.action_costs_this_step + self.operational_costs_this_step
    }
}

/// Complete mutable state of one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationState {
    /// Current timestep, monotonic from 0
    timestep: usize,

    /// Current budget; may go negative
    budget: f64,

    /// Maximum number of servers alive at once
    max_servers: usize,

    /// Backlog size above which a queue overflows
    max_queue_size: usize,

    /// Consecutive negative-budget steps before bankruptcy
    bankruptcy_threshold: usize,

    /// Demand queues in registry order (fixed at construction)
    queues: Vec<DemandQueue>,

    /// Servers in creation order
    servers: Vec<Server>,

    /// Per-step and cumulative statistics
    stats: StepStats,

    /// Terminal state, None while the run is live
    termination: Option<TerminationReason>,

    /// Consecutive timesteps the budget has been negative
    bankruptcy_streak: usize,
}

impl SimulationState {
    /// Build the initial state for a scenario
    ///
    /// Queues are created in the scenario's sorted-name order, which becomes
    /// the registry order for the whole run.
    pub fn new(config: &ScenarioConfig) -> Self {
        let queues = config
            .queues
            .iter()
            .map(|(name, params)| DemandQueue::new(name.clone(), params.clone()))
            .collect();

        Self {
            timestep: 0,
            budget: config.initial_budget,
            max_servers: config.max_servers,
            max_queue_size: config.max_queue_size,
            bankruptcy_threshold: config.bankruptcy_threshold,
            queues,
            servers: Vec::new(),
            stats: StepStats::default(),
            termination: None,
            bankruptcy_streak: 0,
        }
    }

    pub fn timestep(&self) -> usize {
        self.timestep
    }

    /// Advance the timestep counter (unconditional, terminal step included)
    pub fn advance_timestep(&mut self) {
        self.timestep += 1;
    }

    pub fn budget(&self) -> f64 {
        self.budget
    }

    /// Charge an amount against the budget
    pub fn debit(&mut self, amount: f64) {
        self.budget -= amount;
    }

    /// Credit an amount to the budget
    pub fn credit(&mut self, amount: f64) {
        self.budget += amount;
    }

    pub fn max_servers(&self) -> usize {
        self.max_servers
    }

    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    pub fn bankruptcy_threshold(&self) -> usize {
        self.bankruptcy_threshold
    }

    /// Queues in registry order
    pub fn queues(&self) -> &[DemandQueue] {
        &self.queues
    }

    pub fn queues_mut(&mut self) -> &mut [DemandQueue] {
        &mut self.queues
    }

    /// Look up a queue by name
    pub fn get_queue(&self, name: &str) -> Option<&DemandQueue> {
        self.queues.iter().find(|q| q.name() == name)
    }

    /// Registry index of a queue, if it exists
    pub fn queue_index(&self, name: &str) -> Option<usize> {
        self.queues.iter().position(|q| q.name() == name)
    }

    /// Servers in creation order
    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub fn servers_mut(&mut self) -> &mut Vec<Server> {
        &mut self.servers
    }

    pub fn num_servers(&self) -> usize {
        self.servers.len()
    }

    /// Add a newly created server to the registry
    pub fn add_server(&mut self, server: Server) {
        self.servers.push(server);
    }

    /// Look up a server by id
    pub fn get_server(&self, id: ServerId) -> Option<&Server> {
        self.servers.iter().find(|s| s.id() == id)
    }

    pub fn get_server_mut(&mut self, id: ServerId) -> Option<&mut Server> {
        self.servers.iter_mut().find(|s| s.id() == id)
    }

    pub fn stats(&self) -> &StepStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut StepStats {
        &mut self.stats
    }

    pub fn termination(&self) -> Option<&TerminationReason> {
        self.termination.as_ref()
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    /// Mark the run terminal; the first reason recorded wins
    pub fn set_termination(&mut self, reason: TerminationReason) {
        if self.termination.is_none() {
            self.termination = Some(reason);
        }
    }

    pub fn bankruptcy_streak(&self) -> usize {
        self.bankruptcy_streak
    }

    /// Record a negative-budget step; returns the updated streak
    pub fn extend_bankruptcy_streak(&mut self) -> usize {
        self.bankruptcy_streak += 1;
        self.bankruptcy_streak
    }

    /// A non-negative budget step resets the streak
    pub fn reset_bankruptcy_streak(&mut self) {
        self.bankruptcy_streak = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::QueueParams;
    use std::collections::BTreeMap;

    fn config() -> ScenarioConfig {
        let mut queues = BTreeMap::new();
        for name in ["batch", "api", "premium"] {
            queues.insert(
                name.to_string(),
                QueueParams {
                    initial_rate: 1.0,
                    growth_factor: 0.0,
                    heat_volatility: 0.0,
                    spike_probability: 0.0,
                    revenue_per_request: 5.0,
                    timeout_threshold: 15,
                },
            );
        }
        ScenarioConfig {
            seed: 1,
            initial_budget: 200.0,
            max_servers: 10,
            max_queue_size: 100,
            bankruptcy_threshold: 5,
            queues,
            server_types: BTreeMap::new(),
        }
    }

    #[test]
    fn test_registry_order_is_sorted_by_name() {
        let state = SimulationState::new(&config());
        let names: Vec<_> = state.queues().iter().map(|q| q.name().to_string()).collect();
        assert_eq!(names, ["api", "batch", "premium"]);
    }

    #[test]
    fn test_budget_mutations() {
        let mut state = SimulationState::new(&config());
        state.debit(250.0);
        assert_eq!(state.budget(), -50.0);
        state.credit(75.0);
        assert_eq!(state.budget(), 25.0);
    }

    #[test]
    fn test_first_termination_reason_wins() {
        let mut state = SimulationState::new(&config());
        state.set_termination(TerminationReason::QueueOverflow { queue: "api".to_string() });
        state.set_termination(TerminationReason::Bankruptcy);

        assert_eq!(
            state.termination().unwrap().to_string(),
            "queue_overflow: api"
        );
    }

    #[test]
    fn test_bankruptcy_streak_accounting() {
        let mut state = SimulationState::new(&config());
        assert_eq!(state.extend_bankruptcy_streak(), 1);
        assert_eq!(state.extend_bankruptcy_streak(), 2);
        state.reset_bankruptcy_streak();
        assert_eq!(state.bankruptcy_streak(), 0);
    }
}

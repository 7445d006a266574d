//! Simulation engine
//!
//! Drives the per-timestep pipeline for one run:
//!
//! ```text
//! For each timestep t:
//! 1. Snapshot state, invoke the controller
//! 2. Validate and apply requested actions (batch-charge their costs)
//! 3. Generate stochastic demand on every queue
//! 4. Advance server lifecycles, sweep removable servers, charge upkeep
//! 5. Process queues with assigned capacity, credit revenue
//! 6. Evaluate termination (overflow before bankruptcy)
//! 7. Increment the timestep (terminal step included)
//! ```
//!
//! The pipeline is infallible once the engine is constructed from a valid
//! scenario: controller faults degrade to an empty action set and invalid
//! action items are logged and skipped, so no error escapes the run loop.
//!
//! # Determinism
//!
//! All randomness flows through the seeded xorshift64* RNG; queues are
//! visited in fixed registry order and servers in creation order, so the
//! RNG call sequence (and therefore the whole run) is a pure function of
//! the scenario and the controller's decisions.
//!
//! # Example
//!
//! ```
//! use fleet_simulator_core_rs::{Engine, IdleController, ScenarioConfig};
//!
//! let config = ScenarioConfig::from_json(r#"{
//!     "seed": 1,
//!     "initial_budget": 100.0,
//!     "max_servers": 5,
//!     "max_queue_size": 20,
//!     "bankruptcy_threshold": 10,
//!     "queues": {
//!         "api": {
//!             "initial_rate": 2.0,
//!             "growth_factor": 0.0,
//!             "heat_volatility": 0.0,
//!             "spike_probability": 0.0,
//!             "revenue_per_request": 5.0,
//!             "timeout_threshold": 15
//!         }
//!     },
//!     "server_types": {}
//! }"#).unwrap();
//!
//! let mut engine = Engine::new(config).unwrap();
//! let report = engine.run(&mut IdleController);
//! assert_eq!(report.score, report.timesteps);
//! ```

use crate::controller::{
    ActionSet, Controller, QueueInfo, QueueSnapshot, ServerSnapshot, StateSnapshot,
};
use crate::models::server::{Server, ServerId, ServerState};
use crate::models::state::{SimulationState, TerminationReason};
use crate::rng::RngManager;
use crate::scenario::{ScenarioConfig, ScenarioError};
use tracing::{debug, info, warn};

/// Result of a single timestep
///
/// Revenue and the two cost categories are reported separately; they are
/// distinct budget mutations within the step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Timestep this result describes
    pub timestep: usize,

    /// New requests enqueued across all queues
    pub num_arrivals: usize,

    /// Requests completed across all processed queues
    pub num_completed: usize,

    /// Requests timed out (served late or evicted) across processed queues
    pub num_timed_out: usize,

    /// Revenue credited this step (may be negative)
    pub revenue: f64,

    /// Startup/switching costs charged this step
    pub action_costs: f64,

    /// Operating costs charged this step
    pub operational_costs: f64,

    /// Whether the run is terminal after this step
    pub terminated: bool,
}

/// Final outcome of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Timesteps survived; this is the score
    pub score: usize,

    /// Same as `score`; kept separate for reporting symmetry with the
    /// batch evaluator
    pub timesteps: usize,

    /// Budget at the end of the run
    pub final_budget: f64,

    /// Cumulative revenue over the run
    pub total_revenue: f64,

    /// Cumulative costs over the run
    pub total_costs: f64,

    /// Why the run ended; None when the caller stopped the loop externally
    pub reason: Option<TerminationReason>,
}

/// Main simulation engine for one run
///
/// Owns the simulation state, the queue and server registries, the RNG and
/// the server id sequence for the lifetime of the run. One engine per run;
/// engines share nothing, so independent runs can be driven in parallel by
/// the caller.
pub struct Engine {
    /// Scenario parameters (server type profiles, queue economics)
    config: ScenarioConfig,

    /// Mutable run state
    state: SimulationState,

    /// Deterministic RNG, seeded from the scenario
    rng: RngManager,

    /// Server id sequence; incremented before each issue, never reused
    next_server_id: u64,
}

impl Engine {
    /// Create an engine from a validated scenario
    pub fn new(config: ScenarioConfig) -> Result<Self, ScenarioError> {
        config.validate()?;

        let state = SimulationState::new(&config);
        let rng = RngManager::new(config.seed);

        Ok(Self { config, state, rng, next_server_id: 0 })
    }

    /// Current simulation state
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Scenario this engine was built from
    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Build the read-only snapshot handed to the controller
    pub fn snapshot(&self) -> StateSnapshot {
        let queues = self
            .state
            .queues()
            .iter()
            .map(|q| QueueSnapshot {
                name: q.name().to_string(),
                size: q.size(),
                demand_rate: q.demand_rate(),
                capacity: q.capacity(),
                heat: q.heat(),
            })
            .collect();

        let servers = self
            .state
            .servers()
            .iter()
            .map(|s| ServerSnapshot {
                id: s.id(),
                server_type: s.server_type().to_string(),
                queue: s.queue().to_string(),
                state: s.state(),
                specialization: s.specialization(),
            })
            .collect();

        let queue_info = self
            .config
            .queues
            .iter()
            .map(|(name, params)| {
                (
                    name.clone(),
                    QueueInfo {
                        revenue_per_request: params.revenue_per_request,
                        timeout_threshold: params.timeout_threshold,
                    },
                )
            })
            .collect();

        StateSnapshot {
            timestep: self.state.timestep(),
            budget: self.state.budget(),
            max_servers: self.state.max_servers(),
            max_queue_size: self.state.max_queue_size(),
            bankruptcy_threshold: self.state.bankruptcy_threshold(),
            queues,
            servers,
            queue_info,
            server_types: self.config.server_types.clone(),
            stats: self.state.stats().clone(),
        }
    }

    /// Execute one timestep of the pipeline
    pub fn step(&mut self, controller: &mut dyn Controller) -> StepResult {
        let timestep = self.state.timestep();

        // STEP 1: CONTROLLER
        // A failing controller never kills the run; it just takes no actions
        let actions = match controller.decide(&self.snapshot()) {
            Ok(actions) => actions,
            Err(e) => {
                warn!(timestep, error = %e, "controller failed, applying no actions");
                ActionSet::default()
            }
        };

        // STEP 2: ACTIONS
        let action_costs = self.apply_actions(actions);

        // STEP 3: DEMAND
        let num_arrivals = self.generate_demand(timestep);

        // STEP 4: SERVERS
        let operational_costs = self.update_servers();

        // STEP 5: QUEUES
        let (revenue, num_completed, num_timed_out) = self.process_queues(timestep);

        // STEP 6: TERMINATION
        self.check_termination();

        // STEP 7: ADVANCE
        // Unconditional, so the reported survival count includes the
        // terminal step
        self.state.advance_timestep();

        StepResult {
            timestep,
            num_arrivals,
            num_completed,
            num_timed_out,
            revenue,
            action_costs,
            operational_costs,
            terminated: self.state.is_terminated(),
        }
    }

    /// Run until the simulation terminates
    ///
    /// A viable policy may survive indefinitely; use [`Engine::run_for`] to
    /// bound the loop externally.
    pub fn run(&mut self, controller: &mut dyn Controller) -> RunReport {
        while !self.state.is_terminated() {
            self.step(controller);
        }
        self.report()
    }

    /// Run until termination or until `max_steps` steps have executed
    ///
    /// When the cap ends the loop, the report's `reason` is None.
    pub fn run_for(&mut self, max_steps: usize, controller: &mut dyn Controller) -> RunReport {
        let mut executed = 0;
        while !self.state.is_terminated() && executed < max_steps {
            self.step(controller);
            executed += 1;
        }
        self.report()
    }

    /// Final (or current) run outcome
    pub fn report(&self) -> RunReport {
        RunReport {
            score: self.state.timestep(),
            timesteps: self.state.timestep(),
            final_budget: self.state.budget(),
            total_revenue: self.state.stats().total_revenue,
            total_costs: self.state.stats().total_costs,
            reason: self.state.termination().cloned(),
        }
    }

    // ========================================================================
    // Pipeline phases
    // ========================================================================

    /// Validate and apply the controller's actions
    ///
    /// Each item is validated independently; a rejected item is logged and
    /// skipped without aborting the batch. Startup and switching costs are
    /// summed and deducted once at the end, before demand generation.
    fn apply_actions(&mut self, actions: ActionSet) -> f64 {
        let mut action_costs = 0.0;

        for start in actions.start {
            if self.state.num_servers() >= self.state.max_servers() {
                warn!(
                    max_servers = self.state.max_servers(),
                    "cannot start server: at max_servers limit"
                );
                continue;
            }

            let Some(profile) = self.config.server_types.get(&start.server_type) else {
                warn!(server_type = %start.server_type, "cannot start server: unknown type");
                continue;
            };

            if self.state.get_queue(&start.queue).is_none() {
                warn!(queue = %start.queue, "cannot start server: unknown queue");
                continue;
            }

            // Checked against the budget before this batch's deductions
            if self.state.budget() < profile.startup_cost {
                warn!(
                    server_type = %start.server_type,
                    startup_cost = profile.startup_cost,
                    budget = self.state.budget(),
                    "cannot start server: insufficient budget"
                );
                continue;
            }

            self.next_server_id += 1;
            let id = ServerId::new(self.next_server_id);
            let server = Server::new(id, start.server_type.clone(), start.queue, profile.clone());
            debug!(server = %id, server_type = %start.server_type, "starting server");
            self.state.add_server(server);

            action_costs += profile.startup_cost;
        }

        for server_id in actions.stop {
            let Some(server) = self.state.get_server_mut(server_id) else {
                warn!(server = %server_id, "cannot stop server: not found");
                continue;
            };

            if server.state() == ServerState::Stopping {
                warn!(server = %server_id, "cannot stop server: already stopping");
                continue;
            }

            server.stop();
            debug!(server = %server_id, "stopping server");
        }

        for reassign in actions.reassign {
            let Some(server_type) = self
                .state
                .get_server(reassign.server)
                .map(|s| s.server_type().to_string())
            else {
                warn!(server = %reassign.server, "cannot reassign server: not found");
                continue;
            };

            if self.state.get_queue(&reassign.queue).is_none() {
                warn!(queue = %reassign.queue, "cannot reassign server: unknown queue");
                continue;
            }

            let server = self
                .state
                .get_server_mut(reassign.server)
                .filter(|s| s.state() == ServerState::Active);
            let Some(server) = server else {
                warn!(server = %reassign.server, "cannot reassign server: not ACTIVE");
                continue;
            };

            server.reassign_to(reassign.queue.clone());
            debug!(server = %reassign.server, queue = %reassign.queue, "reassigning server");

            // Servers are only ever created from configured types
            if let Some(profile) = self.config.server_types.get(&server_type) {
                action_costs += profile.switching_cost;
            }
        }

        self.state.debit(action_costs);
        let stats = self.state.stats_mut();
        stats.action_costs_this_step = action_costs;
        stats.total_costs += action_costs;

        action_costs
    }

    /// Generate stochastic demand on every queue, registry order
    fn generate_demand(&mut self, timestep: usize) -> usize {
        let mut num_arrivals = 0;
        for queue in self.state.queues_mut() {
            num_arrivals += queue.generate_demand(timestep, &mut self.rng);
        }
        num_arrivals
    }

    /// Advance server lifecycles, sweep removable servers, charge upkeep
    fn update_servers(&mut self) -> f64 {
        for server in self.state.servers_mut().iter_mut() {
            server.update();
        }
        self.state.servers_mut().retain(|s| !s.can_remove());

        let operational_costs: f64 = self.state.servers().iter().map(|s| s.cost_per_step()).sum();
        self.state.debit(operational_costs);
        let stats = self.state.stats_mut();
        stats.operational_costs_this_step = operational_costs;
        stats.total_costs += operational_costs;

        operational_costs
    }

    /// Process every queue that has at least one assigned server
    ///
    /// Servers in any lifecycle state claim their queue for processing this
    /// step; only active ones contribute capacity. Queues with no assigned
    /// server are neither drained nor timeout-swept.
    fn process_queues(&mut self, timestep: usize) -> (f64, usize, usize) {
        let num_queues = self.state.queues().len();
        let mut capacity = vec![0.0; num_queues];
        let mut assigned = vec![0usize; num_queues];

        for server in self.state.servers() {
            if let Some(index) = self.state.queue_index(server.queue()) {
                assigned[index] += 1;
                capacity[index] += server.throughput();
            }
        }

        let mut revenue = 0.0;
        let mut num_completed = 0;
        let mut num_timed_out = 0;

        for (index, queue) in self.state.queues_mut().iter_mut().enumerate() {
            if assigned[index] == 0 {
                continue;
            }
            revenue += queue.process_requests(capacity[index], timestep);
            num_completed += queue.completed_last_step();
            num_timed_out += queue.timed_out_last_step();
        }

        self.state.credit(revenue);
        let stats = self.state.stats_mut();
        stats.revenue_this_step = revenue;
        stats.total_revenue += revenue;

        (revenue, num_completed, num_timed_out)
    }

    /// Evaluate termination: overflow first, then bankruptcy
    fn check_termination(&mut self) {
        // Overflow short-circuits bankruptcy for this step
        let overflowed = self
            .state
            .queues()
            .iter()
            .find(|q| q.size() > self.state.max_queue_size())
            .map(|q| q.name().to_string());

        if let Some(queue) = overflowed {
            info!(timestep = self.state.timestep(), queue = %queue, "queue overflow, run over");
            self.state.set_termination(TerminationReason::QueueOverflow { queue });
            return;
        }

        if self.state.budget() < 0.0 {
            let streak = self.state.extend_bankruptcy_streak();
            if streak >= self.state.bankruptcy_threshold() {
                info!(timestep = self.state.timestep(), streak, "bankruptcy, run over");
                self.state.set_termination(TerminationReason::Bankruptcy);
            }
        } else {
            self.state.reset_bankruptcy_streak();
        }
    }
}

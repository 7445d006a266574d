//! Server model
//!
//! A server moves through a timer-driven lifecycle
//! (`Starting → Active → {Switching → Active, Stopping → removed}`) and,
//! while active, builds a specialization bonus that ramps with consecutive
//! steps spent on the same queue. Only active servers produce throughput or
//! cost anything per step; startup and switching costs are charged by the
//! engine from the type configuration, never stored here.

use crate::scenario::ServerTypeParams;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Steps of continuous active service needed to reach full specialization
const SPECIALIZATION_RAMP_STEPS: f64 = 20.0;

/// Unique server identity
///
/// Issued by the engine from a monotonically increasing counter; never
/// reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(u64);

impl ServerId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server_{:03}", self.0)
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerState {
    /// Warming up; produces nothing until the warmup timer expires
    Starting,
    /// Serving its assigned queue at full throughput
    Active,
    /// Mid-reassignment; produces nothing until the switching timer expires
    Switching,
    /// Shutting down; eligible for removal once the timer runs out
    Stopping,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Starting => "STARTING",
            ServerState::Active => "ACTIVE",
            ServerState::Switching => "SWITCHING",
            ServerState::Stopping => "STOPPING",
        };
        f.write_str(name)
    }
}

/// A single server in the fleet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    /// Unique id (immutable)
    id: ServerId,

    /// Server type name (immutable, selects the cost/throughput profile)
    server_type: String,

    /// Type profile (throughput, per-step cost, timers, specialization cap)
    profile: ServerTypeParams,

    /// Currently assigned queue
    queue: String,

    /// Lifecycle state
    state: ServerState,

    /// Remaining timesteps in the current timed state
    state_timer: i32,

    /// Current specialization bonus in [0, max_specialization]
    specialization: f64,

    /// Consecutive active steps on the current queue
    steps_on_queue: u32,
}

impl Server {
    /// Create a server in the starting state, assigned to `queue`
    pub fn new(id: ServerId, server_type: String, queue: String, profile: ServerTypeParams) -> Self {
        let state_timer = profile.warmup_time as i32;
        Self {
            id,
            server_type,
            profile,
            queue,
            state: ServerState::Starting,
            state_timer,
            specialization: 0.0,
            steps_on_queue: 0,
        }
    }

    /// Advance the lifecycle by one timestep
    ///
    /// Timed states decrement their timer and transition at zero; an active
    /// server instead accrues time on its queue and recomputes the
    /// specialization ramp.
    pub fn update(&mut self) {
        match self.state {
            ServerState::Starting | ServerState::Switching => {
                self.state_timer -= 1;
                if self.state_timer <= 0 {
                    self.state = ServerState::Active;
                    self.state_timer = 0;
                }
            }
            ServerState::Active => {
                self.steps_on_queue += 1;
                let ramp = self.steps_on_queue as f64 / SPECIALIZATION_RAMP_STEPS;
                self.specialization =
                    (ramp * self.profile.max_specialization).min(self.profile.max_specialization);
            }
            ServerState::Stopping => {
                // Removed by the engine once the timer is spent
                self.state_timer -= 1;
            }
        }
    }

    /// Requests per timestep this server contributes right now
    pub fn throughput(&self) -> f64 {
        match self.state {
            ServerState::Active => self.profile.throughput * (1.0 + self.specialization),
            _ => 0.0,
        }
    }

    /// Operating cost charged for the current timestep
    pub fn cost_per_step(&self) -> f64 {
        match self.state {
            ServerState::Active => self.profile.cost_per_step,
            _ => 0.0,
        }
    }

    /// Reassign to a new queue; legal only while active
    ///
    /// Enters the switching state for the type's switching time and resets
    /// the specialization ramp. The queue assignment changes immediately, so
    /// this step's capacity attribution already targets the new queue (at
    /// zero throughput, since the server is no longer active).
    ///
    /// Returns false (and does nothing) if the server is not active.
    pub fn reassign_to(&mut self, new_queue: String) -> bool {
        if self.state != ServerState::Active {
            return false;
        }

        self.queue = new_queue;
        self.state = ServerState::Switching;
        self.state_timer = self.profile.switching_time as i32;
        self.specialization = 0.0;
        self.steps_on_queue = 0;
        true
    }

    /// Begin shutdown; unconditional
    ///
    /// The server does no further work from this step on and becomes
    /// removable once the one-step stopping timer is spent.
    pub fn stop(&mut self) {
        self.state = ServerState::Stopping;
        self.state_timer = 1;
    }

    /// Whether the engine may drop this server from the registry
    pub fn can_remove(&self) -> bool {
        self.state == ServerState::Stopping && self.state_timer <= 0
    }

    pub fn id(&self) -> ServerId {
        self.id
    }

    pub fn server_type(&self) -> &str {
        &self.server_type
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn specialization(&self) -> f64 {
        self.specialization
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ServerTypeParams {
        ServerTypeParams {
            throughput: 5.0,
            cost_per_step: 2.0,
            warmup_time: 3,
            startup_cost: 10.0,
            switching_time: 2,
            switching_cost: 5.0,
            max_specialization: 0.2,
        }
    }

    fn server() -> Server {
        Server::new(ServerId::new(1), "SMALL".to_string(), "api".to_string(), profile())
    }

    #[test]
    fn test_warmup_then_active() {
        let mut s = server();
        assert_eq!(s.state(), ServerState::Starting);
        assert_eq!(s.throughput(), 0.0);
        assert_eq!(s.cost_per_step(), 0.0);

        s.update();
        s.update();
        assert_eq!(s.state(), ServerState::Starting);

        s.update();
        assert_eq!(s.state(), ServerState::Active);
        assert_eq!(s.throughput(), 5.0);
        assert_eq!(s.cost_per_step(), 2.0);
    }

    #[test]
    fn test_specialization_ramps_and_caps() {
        let mut s = server();
        for _ in 0..3 {
            s.update(); // warmup
        }

        s.update();
        assert!((s.specialization() - 0.2 / 20.0).abs() < 1e-12);

        // Ramp is monotone and capped at max_specialization
        let mut last = s.specialization();
        for _ in 0..40 {
            s.update();
            assert!(s.specialization() >= last);
            last = s.specialization();
        }
        assert_eq!(s.specialization(), 0.2);
        assert!((s.throughput() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_reassign_only_from_active() {
        let mut s = server();
        assert!(!s.reassign_to("batch".to_string()));
        assert_eq!(s.queue(), "api");

        for _ in 0..3 {
            s.update();
        }
        for _ in 0..10 {
            s.update();
        }
        assert!(s.specialization() > 0.0);

        assert!(s.reassign_to("batch".to_string()));
        assert_eq!(s.queue(), "batch");
        assert_eq!(s.state(), ServerState::Switching);
        assert_eq!(s.specialization(), 0.0);
        assert_eq!(s.throughput(), 0.0);

        // Switching time 2, then active again with a fresh ramp
        s.update();
        s.update();
        assert_eq!(s.state(), ServerState::Active);
        assert_eq!(s.specialization(), 0.0);
    }

    #[test]
    fn test_stop_and_remove_timing() {
        let mut s = server();
        s.stop();
        assert_eq!(s.state(), ServerState::Stopping);
        assert!(!s.can_remove());
        assert_eq!(s.throughput(), 0.0);
        assert_eq!(s.cost_per_step(), 0.0);

        s.update();
        assert!(s.can_remove());
    }

    #[test]
    fn test_zero_warmup_activates_on_first_update() {
        let mut p = profile();
        p.warmup_time = 0;
        let mut s = Server::new(ServerId::new(2), "SMALL".to_string(), "api".to_string(), p);

        s.update();
        assert_eq!(s.state(), ServerState::Active);
    }

    #[test]
    fn test_server_id_display() {
        assert_eq!(ServerId::new(7).to_string(), "server_007");
        assert_eq!(ServerId::new(123).to_string(), "server_123");
    }
}

//! Scenario configuration
//!
//! A scenario is a JSON document describing one complete simulation setup:
//! the RNG seed, the starting budget and hard limits, the demand queues with
//! their stochastic parameters, and the server types the controller may
//! start. Loading is strict: a scenario that fails validation never reaches
//! the engine.
//!
//! # Example
//!
//! ```json
//! {
//!   "seed": 42,
//!   "initial_budget": 200.0,
//!   "max_servers": 20,
//!   "max_queue_size": 500,
//!   "bankruptcy_threshold": 10,
//!   "queues": {
//!     "api": {
//!       "initial_rate": 10.0,
//!       "growth_factor": 0.01,
//!       "heat_volatility": 0.05,
//!       "spike_probability": 0.02,
//!       "revenue_per_request": 5.0,
//!       "timeout_threshold": 15
//!     }
//!   },
//!   "server_types": {
//!     "SMALL": {
//!       "throughput": 5.0,
//!       "cost_per_step": 2.0,
//!       "warmup_time": 3,
//!       "startup_cost": 10.0,
//!       "switching_time": 3,
//!       "switching_cost": 5.0,
//!       "max_specialization": 0.15
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating a scenario
///
/// All variants are fatal at load time: the engine only ever sees a
/// scenario that passed validation.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scenario JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid scenario: {0}")]
    Invalid(String),
}

/// Stochastic demand parameters for a single queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueParams {
    /// Starting base demand rate (requests per timestep, before noise)
    pub initial_rate: f64,

    /// Per-step compounding applied to the base rate (0.01 = 1% per step)
    pub growth_factor: f64,

    /// Half-width of the per-step heat random walk
    pub heat_volatility: f64,

    /// Per-step probability of a new demand spike starting
    pub spike_probability: f64,

    /// Revenue earned for each request served in time
    pub revenue_per_request: f64,

    /// Age in timesteps beyond which a request counts as timed out
    pub timeout_threshold: usize,
}

/// Cost/throughput/timing profile for a server type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerTypeParams {
    /// Requests processed per timestep while active (before specialization)
    pub throughput: f64,

    /// Operating cost charged per active timestep
    pub cost_per_step: f64,

    /// Timesteps spent in the starting state before becoming active
    pub warmup_time: u32,

    /// One-off cost charged when the server is started
    pub startup_cost: f64,

    /// Timesteps spent switching after a reassignment
    pub switching_time: u32,

    /// One-off cost charged when the server is reassigned
    pub switching_cost: f64,

    /// Upper bound of the specialization throughput bonus
    pub max_specialization: f64,
}

/// Complete scenario configuration
///
/// Queues and server types are keyed by name. `BTreeMap` keeps both
/// registries in sorted-name order, which fixes the engine's stable queue
/// iteration order (demand generation, processing, overflow checks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// RNG seed for deterministic replay
    pub seed: u64,

    /// Starting budget
    pub initial_budget: f64,

    /// Maximum number of servers alive at once (any lifecycle state)
    pub max_servers: usize,

    /// Backlog size above which a queue overflows and the run ends
    pub max_queue_size: usize,

    /// Consecutive negative-budget timesteps before bankruptcy
    pub bankruptcy_threshold: usize,

    /// Demand queues by name
    pub queues: BTreeMap<String, QueueParams>,

    /// Server types by name
    pub server_types: BTreeMap<String, ServerTypeParams>,
}

impl ScenarioConfig {
    /// Load and validate a scenario from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse and validate a scenario from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Checks the constraints the engine relies on. Violations are fatal.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.queues.is_empty() {
            return Err(ScenarioError::Invalid(
                "scenario must define at least one queue".to_string(),
            ));
        }

        if self.bankruptcy_threshold == 0 {
            return Err(ScenarioError::Invalid(
                "bankruptcy_threshold must be > 0".to_string(),
            ));
        }

        for (name, params) in &self.queues {
            if params.initial_rate < 0.0 {
                return Err(ScenarioError::Invalid(format!(
                    "queue '{}': initial_rate must be >= 0",
                    name
                )));
            }
            if params.heat_volatility < 0.0 {
                return Err(ScenarioError::Invalid(format!(
                    "queue '{}': heat_volatility must be >= 0",
                    name
                )));
            }
            if !(0.0..=1.0).contains(&params.spike_probability) {
                return Err(ScenarioError::Invalid(format!(
                    "queue '{}': spike_probability must be in [0, 1]",
                    name
                )));
            }
        }

        for (name, params) in &self.server_types {
            if params.throughput < 0.0 {
                return Err(ScenarioError::Invalid(format!(
                    "server type '{}': throughput must be >= 0",
                    name
                )));
            }
            if params.max_specialization < 0.0 {
                return Err(ScenarioError::Invalid(format!(
                    "server type '{}': max_specialization must be >= 0",
                    name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> String {
        r#"{
            "seed": 1,
            "initial_budget": 100.0,
            "max_servers": 5,
            "max_queue_size": 50,
            "bankruptcy_threshold": 10,
            "queues": {
                "api": {
                    "initial_rate": 2.0,
                    "growth_factor": 0.0,
                    "heat_volatility": 0.0,
                    "spike_probability": 0.0,
                    "revenue_per_request": 5.0,
                    "timeout_threshold": 15
                }
            },
            "server_types": {
                "SMALL": {
                    "throughput": 5.0,
                    "cost_per_step": 2.0,
                    "warmup_time": 3,
                    "startup_cost": 10.0,
                    "switching_time": 3,
                    "switching_cost": 5.0,
                    "max_specialization": 0.15
                }
            }
        }"#
        .to_string()
    }

    #[test]
    fn test_parse_minimal_scenario() {
        let config = ScenarioConfig::from_json(&minimal_json()).unwrap();

        assert_eq!(config.seed, 1);
        assert_eq!(config.max_servers, 5);
        assert_eq!(config.queues.len(), 1);
        assert_eq!(config.queues["api"].timeout_threshold, 15);
        assert_eq!(config.server_types["SMALL"].warmup_time, 3);
    }

    #[test]
    fn test_rejects_empty_queues() {
        let json = r#"{
            "seed": 1,
            "initial_budget": 100.0,
            "max_servers": 5,
            "max_queue_size": 50,
            "bankruptcy_threshold": 10,
            "queues": {},
            "server_types": {}
        }"#;
        let err = ScenarioConfig::from_json(json).unwrap_err();
        assert!(matches!(err, ScenarioError::Invalid(_)));
    }

    #[test]
    fn test_rejects_zero_bankruptcy_threshold() {
        let json = minimal_json().replace(r#""bankruptcy_threshold": 10"#, r#""bankruptcy_threshold": 0"#);
        let err = ScenarioConfig::from_json(&json).unwrap_err();
        assert!(matches!(err, ScenarioError::Invalid(_)));
    }

    #[test]
    fn test_rejects_out_of_range_spike_probability() {
        let json = minimal_json().replace(r#""spike_probability": 0.0"#, r#""spike_probability": 1.5"#);
        let err = ScenarioConfig::from_json(&json).unwrap_err();
        assert!(matches!(err, ScenarioError::Invalid(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = ScenarioConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ScenarioError::Parse(_)));
    }
}

//! Built-in baseline controllers
//!
//! Reference policies for scoring comparisons and tests. Neither is meant
//! to survive hard scenarios; they bound the score range a real controller
//! should beat.

use crate::controller::{ActionSet, Controller, ControllerError, StartAction, StateSnapshot};

/// Takes no actions, ever
///
/// The degenerate baseline: queues grow unserved until one overflows.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleController;

impl Controller for IdleController {
    fn decide(&mut self, _snapshot: &StateSnapshot) -> Result<ActionSet, ControllerError> {
        Ok(ActionSet::default())
    }
}

/// Simple reactive scaling strategy
///
/// Each step, finds the queue with the worst capacity-to-demand ratio and
/// requests one server of the configured type for it, as long as there is a
/// free server slot and the budget stays above the reserve. Invalid
/// requests (unknown type, insufficient budget) are simply rejected by the
/// engine, so the controller stays straightforward.
#[derive(Debug, Clone)]
pub struct GreedyScalingController {
    /// Server type to start
    server_type: String,

    /// Do not start servers while the budget is at or below this
    budget_reserve: f64,
}

impl GreedyScalingController {
    pub fn new(server_type: impl Into<String>) -> Self {
        Self {
            server_type: server_type.into(),
            budget_reserve: 50.0,
        }
    }

    pub fn with_budget_reserve(mut self, budget_reserve: f64) -> Self {
        self.budget_reserve = budget_reserve;
        self
    }

    /// Queue with the lowest capacity-to-demand ratio
    fn most_starved_queue<'a>(&self, snapshot: &'a StateSnapshot) -> Option<&'a str> {
        snapshot
            .queues
            .iter()
            .min_by(|a, b| {
                let ratio_a = a.capacity / a.demand_rate.max(1.0);
                let ratio_b = b.capacity / b.demand_rate.max(1.0);
                ratio_a.total_cmp(&ratio_b)
            })
            .map(|q| q.name.as_str())
    }
}

impl Controller for GreedyScalingController {
    fn decide(&mut self, snapshot: &StateSnapshot) -> Result<ActionSet, ControllerError> {
        let mut actions = ActionSet::default();

        if snapshot.servers.len() < snapshot.max_servers && snapshot.budget > self.budget_reserve {
            if let Some(queue) = self.most_starved_queue(snapshot) {
                actions.start.push(StartAction {
                    server_type: self.server_type.clone(),
                    queue: queue.to_string(),
                });
            }
        }

        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{QueueInfo, QueueSnapshot};
    use crate::models::state::StepStats;
    use std::collections::BTreeMap;

    fn snapshot_with_queues(queues: Vec<QueueSnapshot>, budget: f64) -> StateSnapshot {
        let queue_info = queues
            .iter()
            .map(|q| {
                (
                    q.name.clone(),
                    QueueInfo { revenue_per_request: 5.0, timeout_threshold: 15 },
                )
            })
            .collect::<BTreeMap<_, _>>();

        StateSnapshot {
            timestep: 0,
            budget,
            max_servers: 10,
            max_queue_size: 500,
            bankruptcy_threshold: 10,
            queues,
            servers: Vec::new(),
            queue_info,
            server_types: BTreeMap::new(),
            stats: StepStats::default(),
        }
    }

    fn queue(name: &str, demand_rate: f64, capacity: f64) -> QueueSnapshot {
        QueueSnapshot {
            name: name.to_string(),
            size: 0,
            demand_rate,
            capacity,
            heat: 1.0,
        }
    }

    #[test]
    fn test_idle_controller_never_acts() {
        let snapshot = snapshot_with_queues(vec![queue("api", 10.0, 0.0)], 1000.0);
        let actions = IdleController.decide(&snapshot).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_greedy_targets_most_starved_queue() {
        let snapshot = snapshot_with_queues(
            vec![queue("api", 10.0, 8.0), queue("batch", 10.0, 1.0)],
            1000.0,
        );

        let actions = GreedyScalingController::new("SMALL").decide(&snapshot).unwrap();
        assert_eq!(actions.start.len(), 1);
        assert_eq!(actions.start[0].queue, "batch");
        assert_eq!(actions.start[0].server_type, "SMALL");
    }

    #[test]
    fn test_greedy_respects_budget_reserve() {
        let snapshot = snapshot_with_queues(vec![queue("api", 10.0, 0.0)], 30.0);

        let actions = GreedyScalingController::new("SMALL").decide(&snapshot).unwrap();
        assert!(actions.is_empty());
    }
}

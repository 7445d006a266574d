//! Demand queue model
//!
//! Each queue owns one stochastic demand series and a FIFO backlog of
//! requests. Demand generation compounds a base rate, random-walks a bounded
//! "heat" multiplier, and occasionally layers a multi-step spike on top.
//! Processing drains the backlog oldest-first against the capacity the
//! engine assigned this step, paying out revenue with a freshness bonus and
//! charging penalties for requests served or evicted past their timeout.
//!
//! # Critical Invariants
//!
//! 1. The backlog is ordered oldest-first at all times
//! 2. `size()` equals the backlog length at every observation point
//! 3. All randomness flows through the caller-supplied [`RngManager`]

use crate::rng::RngManager;
use crate::scenario::QueueParams;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Heat random walk bounds
const HEAT_MIN: f64 = 0.5;
const HEAT_MAX: f64 = 1.5;

/// A single unit of pending work
///
/// The only attribute is the timestep it arrived at; age relative to the
/// current timestep drives timeout and bonus accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    arrived_at: usize,
}

impl Request {
    /// Timestep at which the request entered the backlog
    pub fn arrived_at(&self) -> usize {
        self.arrived_at
    }
}

/// A named demand queue with stochastic arrivals and FIFO processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandQueue {
    /// Queue identity (immutable)
    name: String,

    /// Stochastic and economic parameters (immutable)
    params: QueueParams,

    /// Current base demand rate, compounded each step by the growth factor
    base_rate: f64,

    /// Demand attractiveness multiplier, random-walked within [0.5, 1.5]
    heat: f64,

    /// Pending requests, oldest first
    backlog: VecDeque<Request>,

    /// Demand rate computed at the last generation step
    demand_rate: f64,

    /// Capacity assigned at the last processed step
    capacity: f64,

    /// Remaining timesteps of an active demand spike
    spike_remaining: u32,

    /// Requests completed at the last processed step (not accumulated)
    completed_last_step: usize,

    /// Requests timed out at the last processed step (not accumulated)
    timed_out_last_step: usize,
}

impl DemandQueue {
    /// Create a queue from its scenario parameters
    pub fn new(name: String, params: QueueParams) -> Self {
        let base_rate = params.initial_rate;
        Self {
            name,
            params,
            base_rate,
            heat: 1.0,
            backlog: VecDeque::new(),
            demand_rate: 0.0,
            capacity: 0.0,
            spike_remaining: 0,
            completed_last_step: 0,
            timed_out_last_step: 0,
        }
    }

    /// Generate this timestep's stochastic demand and enqueue the arrivals
    ///
    /// The RNG draw order is fixed and part of the determinism contract:
    /// heat walk, then (outside an active spike) the spike-onset draw plus,
    /// on onset, the duration draw, then the noise draw.
    ///
    /// Returns the number of requests enqueued.
    pub fn generate_demand(&mut self, timestep: usize, rng: &mut RngManager) -> usize {
        // Base growth compounds every step
        self.base_rate *= 1.0 + self.params.growth_factor;

        // Heat: bounded random walk
        let heat_change = rng.uniform(-self.params.heat_volatility, self.params.heat_volatility);
        self.heat = (self.heat + heat_change).clamp(HEAT_MIN, HEAT_MAX);

        // Spikes: an active spike keeps running at 1.5x base; otherwise a
        // new one may start at 2.0x base for a 2-4 step duration
        let mut spike = 0.0;
        if self.spike_remaining > 0 {
            spike = self.base_rate * 1.5;
            self.spike_remaining -= 1;
        } else if rng.next_f64() < self.params.spike_probability {
            spike = self.base_rate * 2.0;
            self.spike_remaining = rng.uniform_int(2, 4) as u32;
        }

        // Noise proportional to the base rate
        let variation = rng.uniform(-0.15, 0.15) * self.base_rate;
        self.demand_rate = (self.base_rate * self.heat + variation + spike).max(0.0);

        let arrivals = self.demand_rate.round() as usize;
        for _ in 0..arrivals {
            self.backlog.push_back(Request { arrived_at: timestep });
        }

        arrivals
    }

    /// Drain the backlog against the assigned capacity and settle revenue
    ///
    /// Dequeues `min(floor(capacity), size)` requests oldest-first. A request
    /// within its timeout earns `revenue_per_request`, plus a 30% freshness
    /// bonus when served within half the timeout; one served too late costs
    /// half the revenue as a penalty. The remaining backlog is then swept:
    /// every request past its timeout is evicted at the same penalty, with
    /// survivors keeping their order.
    ///
    /// The completed/timed-out counters are overwritten with this step's
    /// values. Returns the total revenue delta, which may be negative.
    pub fn process_requests(&mut self, capacity: f64, timestep: usize) -> f64 {
        self.capacity = capacity;
        let processed = (capacity.floor() as usize).min(self.backlog.len());

        let mut revenue = 0.0;
        let mut completed = 0;
        let mut timed_out = 0;

        for _ in 0..processed {
            if let Some(request) = self.backlog.pop_front() {
                let age = timestep - request.arrived_at;
                if age <= self.params.timeout_threshold {
                    revenue += self.params.revenue_per_request;
                    // Freshness bonus for quick service
                    if age as f64 <= self.params.timeout_threshold as f64 * 0.5 {
                        revenue += self.params.revenue_per_request * 0.3;
                    }
                    completed += 1;
                } else {
                    // Served too late
                    revenue -= self.params.revenue_per_request * 0.5;
                    timed_out += 1;
                }
            }
        }

        // Evict expired requests from the remaining backlog
        let timeout_threshold = self.params.timeout_threshold;
        let penalty = self.params.revenue_per_request * 0.5;
        self.backlog.retain(|request| {
            if timestep - request.arrived_at > timeout_threshold {
                revenue -= penalty;
                timed_out += 1;
                false
            } else {
                true
            }
        });

        self.completed_last_step = completed;
        self.timed_out_last_step = timed_out;

        revenue
    }

    /// Queue name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current backlog length
    pub fn size(&self) -> usize {
        self.backlog.len()
    }

    /// Demand rate computed at the last generation step
    pub fn demand_rate(&self) -> f64 {
        self.demand_rate
    }

    /// Capacity assigned at the last processed step
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Current heat multiplier
    pub fn heat(&self) -> f64 {
        self.heat
    }

    /// Requests completed at the last processed step
    pub fn completed_last_step(&self) -> usize {
        self.completed_last_step
    }

    /// Requests timed out at the last processed step
    pub fn timed_out_last_step(&self) -> usize {
        self.timed_out_last_step
    }

    /// Scenario parameters for this queue
    pub fn params(&self) -> &QueueParams {
        &self.params
    }

    /// Oldest-first view of the backlog
    pub fn backlog(&self) -> &VecDeque<Request> {
        &self.backlog
    }
}

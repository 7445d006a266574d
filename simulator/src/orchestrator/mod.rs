//! Simulation engine and run loop

pub mod engine;

pub use engine::{Engine, RunReport, StepResult};

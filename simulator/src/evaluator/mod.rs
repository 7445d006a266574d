//! Batch evaluation
//!
//! Runs one controller across a set of scenarios and reports per-scenario
//! outcomes plus the average score. Scenarios are loaded (and validated)
//! up front, so a broken scenario file fails the whole evaluation before
//! any run starts. Each scenario gets a fresh engine and a fresh
//! controller; runs share no state.

use crate::controller::Controller;
use crate::models::state::TerminationReason;
use crate::orchestrator::Engine;
use crate::scenario::{ScenarioConfig, ScenarioError};
use std::path::{Path, PathBuf};

/// Outcome of one scenario run
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioResult {
    /// Scenario name (file stem)
    pub scenario: String,

    /// Timesteps survived
    pub score: usize,

    /// Same as `score`; the survival count
    pub timesteps: usize,

    /// Why the run ended; None when the step cap ended it
    pub reason: Option<TerminationReason>,
}

/// Results across all scenarios
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub results: Vec<ScenarioResult>,

    /// Mean score across scenarios
    pub average_score: f64,
}

/// Runs a controller across many scenarios
pub struct Evaluator {
    scenarios: Vec<(String, ScenarioConfig)>,
}

impl Evaluator {
    /// Load scenarios from JSON files; any load failure is fatal
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ScenarioError> {
        let mut scenarios = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let config = ScenarioConfig::from_path(path)?;
            scenarios.push((name, config));
        }
        Ok(Self { scenarios })
    }

    /// Collect `*.json` files in a directory, sorted by name
    pub fn scenario_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, ScenarioError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Build an evaluator from in-memory scenarios (mainly for tests)
    pub fn from_configs(scenarios: Vec<(String, ScenarioConfig)>) -> Self {
        Self { scenarios }
    }

    /// Number of loaded scenarios
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Run every scenario against a fresh controller
    ///
    /// `make_controller` is called once per scenario so controller state
    /// never leaks across runs. `max_steps` bounds each run; a scenario the
    /// controller survives that long reports `reason: None`.
    pub fn evaluate<F>(&self, mut make_controller: F, max_steps: usize) -> EvaluationReport
    where
        F: FnMut() -> Box<dyn Controller>,
    {
        let mut results = Vec::with_capacity(self.scenarios.len());

        for (name, config) in &self.scenarios {
            // Configs were validated at load time
            let mut engine = Engine::new(config.clone())
                .unwrap_or_else(|e| unreachable!("validated scenario rejected: {e}"));
            let mut controller = make_controller();
            let report = engine.run_for(max_steps, controller.as_mut());

            results.push(ScenarioResult {
                scenario: name.clone(),
                score: report.score,
                timesteps: report.timesteps,
                reason: report.reason,
            });
        }

        let average_score = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.score as f64).sum::<f64>() / results.len() as f64
        };

        EvaluationReport { results, average_score }
    }
}

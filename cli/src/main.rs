//! Fleet simulator CLI
//!
//! Runs a single scenario or evaluates a directory of scenarios with the
//! built-in greedy scaling controller.

use clap::{Parser, Subcommand};
use fleet_simulator_core_rs::{
    Controller, Engine, Evaluator, GreedyScalingController, ScenarioConfig, ScenarioError,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "fleet-sim", about = "Server-fleet queue economy simulator")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Server type the built-in controller starts
    #[arg(long, default_value = "SMALL")]
    server_type: String,

    /// Stop a run after this many timesteps even without termination
    #[arg(long, default_value_t = 100_000)]
    max_steps: usize,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a single scenario file
    Run {
        /// Path to the scenario JSON file
        scenario: PathBuf,
    },
    /// Run every scenario in a directory and report the average score
    Evaluate {
        /// Directory containing scenario JSON files
        #[arg(default_value = "scenarios")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let result = match &args.command {
        Command::Run { scenario } => run_scenario(scenario, &args),
        Command::Evaluate { dir } => evaluate_directory(dir, &args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_scenario(path: &PathBuf, args: &Args) -> Result<(), ScenarioError> {
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let config = ScenarioConfig::from_path(path)?;
    let mut engine = Engine::new(config)?;
    let mut controller = GreedyScalingController::new(args.server_type.as_str());

    let report = engine.run_for(args.max_steps, &mut controller);

    println!();
    println!("{}", "=".repeat(60));
    println!("SIMULATION COMPLETE");
    println!("{}", "=".repeat(60));
    println!("Scenario: {name}");
    println!("Survived: {} timesteps", report.timesteps);
    println!("Final Budget: ${:.2}", report.final_budget);
    println!("Total Revenue: ${:.2}", report.total_revenue);
    println!("Total Costs: ${:.2}", report.total_costs);
    println!(
        "Total Profit: ${:.2}",
        report.total_revenue - report.total_costs
    );
    if let Some(reason) = &report.reason {
        println!("Reason: {reason}");
    }
    println!("{}", "=".repeat(60));

    Ok(())
}

fn evaluate_directory(dir: &PathBuf, args: &Args) -> Result<(), ScenarioError> {
    let files = Evaluator::scenario_files(dir)?;
    if files.is_empty() {
        return Err(ScenarioError::Invalid(format!(
            "no scenario files found in {}",
            dir.display()
        )));
    }

    let evaluator = Evaluator::from_paths(&files)?;
    let server_type = args.server_type.clone();
    let report = evaluator.evaluate(
        move || Box::new(GreedyScalingController::new(server_type.as_str())) as Box<dyn Controller>,
        args.max_steps,
    );

    println!();
    println!("{}", "=".repeat(60));
    println!("EVALUATION RESULTS");
    println!("{}", "=".repeat(60));

    for result in &report.results {
        println!();
        println!("{}:", result.scenario);
        println!("  Survived: {} timesteps", result.timesteps);
        if let Some(reason) = &result.reason {
            println!("  Ended: {reason}");
        }
    }

    println!();
    println!("{}", "-".repeat(60));
    println!("Average Score: {:.2}", report.average_score);
    println!("{}", "=".repeat(60));

    Ok(())
}

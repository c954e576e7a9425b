use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use chronoban_core::{Level, SolveOutcome, Solver, SolverConfig, plan_text};

/// Solve a Chronoban level file non-interactively.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the level file
    #[arg(short, long)]
    level: PathBuf,

    /// Node-expansion budget
    #[arg(long, default_value_t = 500_000)]
    budget: u64,

    /// Zobrist seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Enable the corridor deadlock stage
    #[arg(long)]
    corridor_deadlock: bool,

    /// Emit the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    let level = Level::load(&args.level)
        .with_context(|| format!("loading level {}", args.level.display()))?;
    for warning in &level.warnings {
        eprintln!("warning: {warning}");
    }

    let mut config = SolverConfig {
        node_budget: args.budget,
        corridor_deadlock: args.corridor_deadlock,
        ..SolverConfig::default()
    };
    if let Some(seed) = args.seed {
        config.zobrist_seed = seed;
    }

    let solver = Solver::new(&level, config).context("preparing the solver")?;
    let report = solver.solve();

    let (outcome_text, plan, code) = match &report.outcome {
        SolveOutcome::Solved { plan } => ("solved", Some(plan_text(plan)), ExitCode::SUCCESS),
        SolveOutcome::NoSolution => ("no-solution", None, ExitCode::from(2)),
        SolveOutcome::BudgetExhausted => ("budget-exhausted", None, ExitCode::from(3)),
    };

    if args.json {
        let body = serde_json::json!({
            "level": level.meta.name,
            "outcome": outcome_text,
            "plan": plan,
            "stats": report.stats,
        });
        println!("{}", serde_json::to_string_pretty(&body).context("encoding report")?);
    } else {
        println!("{}: {}", level.meta.name, outcome_text);
        if let Some(plan) = plan {
            println!("plan: {plan}");
        }
        let stats = &report.stats;
        println!(
            "expanded {} generated {} peak-open {} peak-closed {} in {} ms",
            stats.nodes_expanded,
            stats.nodes_generated,
            stats.peak_open_size,
            stats.peak_closed_size,
            stats.elapsed_ms
        );
        if stats.solution_length > 0 {
            println!("length {} cost {}", stats.solution_length, stats.solution_cost);
        }
    }
    Ok(code)
}

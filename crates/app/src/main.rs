use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use chronoban_core::{
    Dir, Level, Playfield, SolveOutcome, Solver, SolverConfig, SolverStats, parse_moves, plan_text,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Level file to load on startup
    #[arg(short, long)]
    level: Option<PathBuf>,

    /// Milliseconds between animation frames
    #[arg(long, default_value_t = 150)]
    delay_ms: u64,

    /// Node-expansion budget for the solver
    #[arg(long, default_value_t = 500_000)]
    budget: u64,

    /// Zobrist seed; fix it to reproduce a search exactly
    #[arg(long)]
    seed: Option<u64>,
}

struct Session {
    level: Option<Level>,
    solution: Option<Vec<Dir>>,
    stats: Option<SolverStats>,
    config: SolverConfig,
    delay: Duration,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = SolverConfig { node_budget: args.budget, ..SolverConfig::default() };
    if let Some(seed) = args.seed {
        config.zobrist_seed = seed;
    }

    let mut session = Session {
        level: None,
        solution: None,
        stats: None,
        config,
        delay: Duration::from_millis(args.delay_ms),
    };

    if let Some(path) = &args.level {
        load_level(&mut session, path)?;
    }

    println!("===========================================");
    println!("   Chronoban: timed-door Sokoban solver");
    println!("===========================================");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print_menu();
        let Some(line) = lines.next() else {
            break;
        };
        let choice = line.context("reading menu input")?;
        match choice.trim() {
            "1" => {
                println!("Enter level file path:");
                let Some(path) = lines.next() else {
                    break;
                };
                let path = path.context("reading level path")?;
                if let Err(e) = load_level(&mut session, Path::new(path.trim())) {
                    println!("Load failed: {e:#}");
                }
            }
            "2" => solve(&mut session),
            "3" => animate(&session),
            "4" => {
                println!("Enter a move sequence (U/D/L/R):");
                let Some(moves) = lines.next() else {
                    break;
                };
                let moves = moves.context("reading move input")?;
                play_moves(&session, moves.trim());
            }
            "5" => show_stats(&session),
            "6" => break,
            other => println!("Unknown choice {other:?}, pick 1-6."),
        }
        println!();
    }

    println!("Goodbye.");
    Ok(())
}

fn print_menu() {
    println!("========== MAIN MENU ==========");
    println!("1) Load level from file");
    println!("2) Solve current level");
    println!("3) Animate last solution");
    println!("4) Play custom moves");
    println!("5) Show solver statistics");
    println!("6) Exit");
    println!("===============================");
    print!("Choice: ");
    let _ = io::stdout().flush();
}

fn load_level(session: &mut Session, path: &Path) -> Result<()> {
    let level =
        Level::load(path).with_context(|| format!("loading level {}", path.display()))?;
    for warning in &level.warnings {
        println!("warning: {warning}");
    }
    println!(
        "Loaded '{}' ({}x{}), {} boxes, {} targets, L={}",
        level.meta.name,
        level.meta.width,
        level.meta.height,
        level.start.boxes.len(),
        level.board.targets().len(),
        level.board.time_modulus(),
    );
    if let Some(field) = Playfield::new(&level) {
        print!("{}", field.render());
    }
    session.level = Some(level);
    session.solution = None;
    session.stats = None;
    Ok(())
}

fn solve(session: &mut Session) {
    let Some(level) = &session.level else {
        println!("No level loaded.");
        return;
    };
    let solver = match Solver::new(level, session.config) {
        Ok(solver) => solver,
        Err(e) => {
            println!("Cannot solve: {e}");
            return;
        }
    };

    let report = solver.solve();
    match &report.outcome {
        SolveOutcome::Solved { plan } => {
            println!("Solved in {} moves, cost {}:", plan.len(), report.stats.solution_cost);
            println!("{}", plan_text(plan));
            session.solution = Some(plan.clone());
        }
        SolveOutcome::NoSolution => {
            println!("No solution exists for this level.");
            session.solution = None;
        }
        SolveOutcome::BudgetExhausted => {
            println!(
                "Search stopped after {} expansions without a solution.",
                report.stats.nodes_expanded
            );
            session.solution = None;
        }
    }
    session.stats = Some(report.stats);
}

fn animate(session: &Session) {
    let Some(level) = &session.level else {
        println!("No level loaded.");
        return;
    };
    let Some(plan) = &session.solution else {
        println!("No solution yet; solve first.");
        return;
    };
    let Some(mut field) = Playfield::new(level) else {
        println!("Level has no agent.");
        return;
    };

    println!("{}", field.render());
    for (step, &dir) in plan.iter().enumerate() {
        thread::sleep(session.delay);
        if let Err(e) = field.apply(dir) {
            println!("Animation stopped: {e}");
            return;
        }
        println!("step {} ({}):", step + 1, dir.glyph());
        println!("{}", field.render());
    }
    if field.is_won() {
        println!("All boxes delivered. Energy used: {}", field.state().energy);
    }
}

fn play_moves(session: &Session, input: &str) {
    let Some(level) = &session.level else {
        println!("No level loaded.");
        return;
    };
    let moves = match parse_moves(input) {
        Ok(moves) => moves,
        Err(e) => {
            println!("Bad input: {e}");
            return;
        }
    };
    let Some(mut field) = Playfield::new(level) else {
        println!("Level has no agent.");
        return;
    };

    match field.run(&moves) {
        Ok(()) => {
            print!("{}", field.render());
            println!(
                "Applied {} moves, energy {}, phase {}.",
                field.steps_taken(),
                field.state().energy,
                field.state().phase
            );
            if field.is_won() {
                println!("Level complete!");
            }
        }
        Err(e) => {
            print!("{}", field.render());
            println!("Sequence rejected: {e}");
        }
    }
}

fn show_stats(session: &Session) {
    let Some(stats) = &session.stats else {
        println!("No solve has run yet.");
        return;
    };
    println!("nodes expanded:   {}", stats.nodes_expanded);
    println!("nodes generated:  {}", stats.nodes_generated);
    println!("peak open size:   {}", stats.peak_open_size);
    println!("peak closed size: {}", stats.peak_closed_size);
    println!("elapsed:          {} ms", stats.elapsed_ms);
    println!("solution length:  {}", stats.solution_length);
    println!("solution cost:    {}", stats.solution_cost);
}

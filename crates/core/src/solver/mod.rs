//! The search core: pathfinder, successor generator, heuristic, deadlock
//! oracle, and the A* engine that drives them.
//! This module exists to wire the long-lived solve components together once
//! and keep their lifetimes trivial: everything lives as long as one solve.
//! It does not own level parsing or interactive move application.

mod deadlock;
mod engine;
mod heuristic;
mod pathfinding;
mod successors;

use std::fmt;

use serde::Serialize;

use crate::board::Board;
use crate::door::DoorTable;
use crate::level::{Level, Meta};
use crate::state::SearchState;
use crate::types::Dir;
use crate::zobrist::{DEFAULT_SEED, Zobrist};

pub use deadlock::{DeadlockKind, DeadlockOracle};
pub use heuristic::Heuristic;
pub use pathfinding::TimePathfinder;
pub use successors::{Successor, generate as generate_successors};

/// Solve tunables: a 500k-node budget, a fixed Zobrist seed for
/// reproducible tie-breaking, and the corridor deadlock stage off unless
/// explicitly enabled.
#[derive(Clone, Copy, Debug)]
pub struct SolverConfig {
    pub node_budget: u64,
    pub zobrist_seed: u64,
    pub corridor_deadlock: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            node_budget: 500_000,
            zobrist_seed: DEFAULT_SEED,
            corridor_deadlock: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SolverStats {
    pub nodes_expanded: u64,
    pub nodes_generated: u64,
    pub peak_open_size: usize,
    pub peak_closed_size: usize,
    pub elapsed_ms: u64,
    pub solution_length: usize,
    pub solution_cost: u32,
}

/// How a solve ended. Draining the frontier and running out of budget are
/// deliberately distinct: only the former proves infeasibility.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SolveOutcome {
    Solved { plan: Vec<Dir> },
    NoSolution,
    BudgetExhausted,
}

#[derive(Clone, Debug)]
pub struct SolveReport {
    pub outcome: SolveOutcome,
    pub stats: SolverStats,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SolveError {
    /// The level has no agent start; there is nothing to search from.
    NoAgent,
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAgent => write!(f, "level has no agent start cell"),
        }
    }
}

impl std::error::Error for SolveError {}

/// One solve attempt over one level. Construction precomputes everything
/// that outlives individual expansions: Zobrist tables, target distance
/// fields, and the deadlock oracle.
pub struct Solver {
    board: Board,
    doors: DoorTable,
    meta: Meta,
    initial: SearchState,
    zobrist: Zobrist,
    heuristic: Heuristic,
    oracle: DeadlockOracle,
    config: SolverConfig,
}

impl Solver {
    pub fn new(level: &Level, config: SolverConfig) -> Result<Solver, SolveError> {
        let agent = level.start.agent.ok_or(SolveError::NoAgent)?;
        let board = level.board.clone();
        let doors = level.door_table();
        let zobrist =
            Zobrist::new(board.size(), board.time_modulus() as usize, config.zobrist_seed);
        let heuristic = Heuristic::new(&board, level.meta.push_cost);
        let oracle = DeadlockOracle::new(&board, &doors, &heuristic, config.corridor_deadlock);

        let mut initial = SearchState::new(agent);
        initial.boxes = level.start.boxes.iter().copied().collect();
        initial.keys_on_board = level.start.keys.iter().copied().collect();
        initial.canonicalize();
        initial.rehash(&zobrist);

        Ok(Solver { board, doors, meta: level.meta.clone(), initial, zobrist, heuristic, oracle, config })
    }

    /// Runs A* to the first goal, an empty frontier, or the node budget.
    pub fn solve(&self) -> SolveReport {
        engine::search(self)
    }

    pub fn initial_state(&self) -> &SearchState {
        &self.initial
    }
}

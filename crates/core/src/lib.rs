pub mod board;
pub mod door;
pub mod level;
pub mod runner;
pub mod solver;
pub mod state;
pub mod types;
pub mod zobrist;

pub use board::{Board, Cell, CellKind, MAX_SAFE_MODULUS};
pub use door::{Door, DoorTable};
pub use level::{Level, LevelError, LevelWarning, Meta, StartState};
pub use runner::{ParseMovesError, Playfield, RunError, RunErrorKind, parse_moves};
pub use solver::{
    DeadlockKind, SolveError, SolveOutcome, SolveReport, Solver, SolverConfig, SolverStats,
};
pub use state::{BoxInfo, KeySpot, SearchState};
pub use types::{CellIndex, Dir, KeyId, plan_text};
pub use zobrist::Zobrist;

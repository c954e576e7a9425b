//! Step-by-step application of externally supplied move sequences.
//! This module exists so user input and solution animation replay through
//! the same legality rules the search plans against.
//! It does not own search policy; it never looks ahead.

use std::fmt;

use crate::board::Board;
use crate::door::DoorTable;
use crate::level::{Level, Meta};
use crate::state::SearchState;
use crate::types::Dir;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunErrorKind {
    /// The move leaves the board.
    OutOfBounds,
    IntoWall,
    /// A door is closed at the arrival tick.
    DoorClosed { id: u8 },
    /// The pushed box has nowhere to go.
    BoxBlocked,
    /// The box is locked and the matching key is not in hand.
    LockedBox { letter: char },
    /// Applying the move would exceed the energy limit.
    EnergyExhausted,
}

/// A rejected move, reported at the step index where it failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunError {
    pub step: usize,
    pub kind: RunErrorKind,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "move {} rejected: ", self.step)?;
        match self.kind {
            RunErrorKind::OutOfBounds => write!(f, "leaves the board"),
            RunErrorKind::IntoWall => write!(f, "walks into a wall"),
            RunErrorKind::DoorClosed { id } => write!(f, "door {id} is closed"),
            RunErrorKind::BoxBlocked => write!(f, "box has nowhere to go"),
            RunErrorKind::LockedBox { letter } => {
                write!(f, "box {letter} is locked and the key is not held")
            }
            RunErrorKind::EnergyExhausted => write!(f, "energy limit exceeded"),
        }
    }
}

impl std::error::Error for RunError {}

/// A malformed move string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseMovesError {
    pub index: usize,
    pub glyph: char,
}

impl fmt::Display for ParseMovesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "character {:?} at position {} is not one of U/D/L/R", self.glyph, self.index)
    }
}

impl std::error::Error for ParseMovesError {}

/// Parses a `U/D/L/R` string (either case); whitespace is ignored.
pub fn parse_moves(text: &str) -> Result<Vec<Dir>, ParseMovesError> {
    let mut moves = Vec::new();
    for (index, glyph) in text.chars().enumerate() {
        if glyph.is_whitespace() {
            continue;
        }
        match Dir::from_glyph(glyph) {
            Some(dir) => moves.push(dir),
            None => return Err(ParseMovesError { index, glyph }),
        }
    }
    Ok(moves)
}

/// A live level being played one step at a time.
#[derive(Clone)]
pub struct Playfield<'a> {
    board: &'a Board,
    meta: &'a Meta,
    doors: DoorTable,
    state: SearchState,
    steps_taken: usize,
}

impl<'a> Playfield<'a> {
    /// `None` when the level has no agent start.
    pub fn new(level: &'a Level) -> Option<Playfield<'a>> {
        let agent = level.start.agent?;
        let mut state = SearchState::new(agent);
        state.boxes = level.start.boxes.iter().copied().collect();
        state.keys_on_board = level.start.keys.iter().copied().collect();
        Some(Playfield {
            board: &level.board,
            meta: &level.meta,
            doors: level.door_table(),
            state,
            steps_taken: 0,
        })
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    pub fn is_won(&self) -> bool {
        self.state.is_goal(self.board)
    }

    /// Applies one move. Every check happens before any mutation, so a
    /// rejected move leaves the field untouched.
    pub fn apply(&mut self, dir: Dir) -> Result<(), RunError> {
        let step = self.steps_taken;
        let fail = |kind| Err(RunError { step, kind });

        let arrival = (self.state.phase + 1) % self.board.time_modulus();
        let Some(dest) = self.board.step(self.state.agent, dir) else {
            return fail(RunErrorKind::OutOfBounds);
        };
        if self.board.is_wall(dest) {
            return fail(RunErrorKind::IntoWall);
        }

        let push = if let Some(slot) = self.state.box_at(dest) {
            let Some(beyond) = self.board.step(dest, dir) else {
                return fail(RunErrorKind::BoxBlocked);
            };
            if self.board.is_wall(beyond) || self.state.box_at(beyond).is_some() {
                return fail(RunErrorKind::BoxBlocked);
            }
            if let Some(id) = self.board.door_id(beyond)
                && !self.doors.is_open(id, arrival as i32)
            {
                return fail(RunErrorKind::DoorClosed { id });
            }
            if let Some(label) = self.state.boxes[slot].label
                && self.state.key_held != Some(label)
            {
                return fail(RunErrorKind::LockedBox { letter: label.box_letter() });
            }
            Some((slot, beyond))
        } else {
            // Doors gate plain walks; on a push the agent squeezes into the
            // cell the box just vacated, mirroring the search model.
            if let Some(id) = self.board.door_id(dest)
                && !self.doors.is_open(id, arrival as i32)
            {
                return fail(RunErrorKind::DoorClosed { id });
            }
            None
        };

        let cost = if push.is_some() { self.meta.push_cost } else { self.meta.move_cost };
        if self.state.energy + cost > self.meta.energy_limit {
            return fail(RunErrorKind::EnergyExhausted);
        }

        if let Some((slot, beyond)) = push {
            self.state.boxes[slot].pos = beyond;
            if self.state.boxes[slot].label.take().is_some() {
                // First push of a locked box consumes the key.
                self.state.key_held = None;
            }
        }
        self.state.agent = dest;
        self.state.energy += cost;
        self.state.phase = arrival;
        self.steps_taken += 1;
        self.state.try_pickup_at(dest);
        Ok(())
    }

    /// Applies a whole sequence, stopping at the first illegal move.
    pub fn run(&mut self, moves: &[Dir]) -> Result<(), RunError> {
        for &dir in moves {
            self.apply(dir)?;
        }
        Ok(())
    }

    /// One text frame of the current position.
    pub fn render(&self) -> String {
        let board = self.board;
        let mut out = String::with_capacity((board.width() + 1) * board.height());
        for row in 0..board.height() {
            for col in 0..board.width() {
                let idx = board.index(row, col);
                let glyph = if board.is_wall(idx) {
                    '#'
                } else if self.state.agent == idx {
                    if board.is_target(idx) { '+' } else { '@' }
                } else if let Some(slot) = self.state.box_at(idx) {
                    match self.state.boxes[slot].label {
                        _ if board.is_target(idx) => '*',
                        Some(label) => label.box_letter(),
                        None => '$',
                    }
                } else if let Some(slot) = self.state.key_at(idx) {
                    self.state.keys_on_board[slot].key.key_letter()
                } else if board.is_target(idx) {
                    '.'
                } else if let Some(id) = board.door_id(idx) {
                    (b'0' + id) as char
                } else {
                    ' '
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}

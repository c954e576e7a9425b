//! Time-expanded BFS over the agent layer.
//! This module exists so walk reachability under door timing is computed in
//! one place and reused by the successor generator each expansion.
//! It does not own box legality or push semantics.

use std::collections::VecDeque;

use crate::board::Board;
use crate::door::DoorTable;
use crate::types::{CellIndex, Dir};

const UNREACHED: u32 = u32::MAX;
const NO_PARENT: u32 = u32::MAX;

/// Shortest agent walks over `(cell, phase)` nodes with boxes as obstacles.
///
/// Tables are sized `width * height * modulus` once and reset per search so
/// the A* engine can rebuild reachability every expansion without
/// reallocating. A step from `(c, t)` lands in `(c', (t + 1) mod L)` and is
/// legal iff `c'` is floor, unblocked, and any door on `c'` is open at the
/// arrival phase.
pub struct TimePathfinder {
    size: usize,
    modulus: usize,
    dist: Vec<u32>,
    parent: Vec<u32>,
    parent_move: Vec<u8>,
    blocked: Vec<bool>,
    origin: CellIndex,
    origin_phase: u32,
    queue: VecDeque<(CellIndex, u32)>,
}

impl TimePathfinder {
    pub fn new(board: &Board) -> TimePathfinder {
        let size = board.size();
        let modulus = board.time_modulus() as usize;
        let nodes = size * modulus;
        TimePathfinder {
            size,
            modulus,
            dist: vec![UNREACHED; nodes],
            parent: vec![NO_PARENT; nodes],
            parent_move: vec![0; nodes],
            blocked: vec![false; size],
            origin: 0,
            origin_phase: 0,
            queue: VecDeque::new(),
        }
    }

    fn node(&self, cell: CellIndex, phase: u32) -> usize {
        cell * self.modulus + phase as usize
    }

    fn passable(&self, board: &Board, doors: &DoorTable, cell: CellIndex, phase: u32) -> bool {
        if board.is_wall(cell) || self.blocked[cell] {
            return false;
        }
        match board.door_id(cell) {
            Some(id) => doors.is_open(id, phase as i32),
            None => true,
        }
    }

    /// Runs BFS from `(origin, phase)` with `blocked` cells (box positions)
    /// impassable. An origin that is itself impassable leaves every node
    /// unreached, which downstream code reads as "no pushes available".
    pub fn search(
        &mut self,
        board: &Board,
        doors: &DoorTable,
        origin: CellIndex,
        phase: u32,
        blocked: impl IntoIterator<Item = CellIndex>,
    ) {
        self.dist.fill(UNREACHED);
        self.parent.fill(NO_PARENT);
        self.blocked.fill(false);
        for cell in blocked {
            self.blocked[cell] = true;
        }
        self.origin = origin;
        self.origin_phase = phase;
        self.queue.clear();

        if !self.passable(board, doors, origin, phase) {
            return;
        }

        let start = self.node(origin, phase);
        self.dist[start] = 0;
        self.queue.push_back((origin, phase));

        while let Some((cell, t)) = self.queue.pop_front() {
            let here = self.node(cell, t);
            let next_dist = self.dist[here] + 1;
            let next_phase = (t + 1) % self.modulus as u32;

            for dir in Dir::ALL {
                let Some(neighbor) = board.step(cell, dir) else {
                    continue;
                };
                if !self.passable(board, doors, neighbor, next_phase) {
                    continue;
                }
                let slot = self.node(neighbor, next_phase);
                if next_dist < self.dist[slot] {
                    self.dist[slot] = next_dist;
                    self.parent[slot] = here as u32;
                    self.parent_move[slot] = dir as u8;
                    self.queue.push_back((neighbor, next_phase));
                }
            }
        }
    }

    /// Exact distance to `(cell, phase)`, or `None` if unreached.
    pub fn distance_at(&self, cell: CellIndex, phase: u32) -> Option<u32> {
        let d = self.dist[self.node(cell, phase)];
        if d == UNREACHED { None } else { Some(d) }
    }

    /// Minimum distance to `cell` over every arrival phase.
    pub fn min_distance(&self, cell: CellIndex) -> Option<u32> {
        let base = cell * self.modulus;
        self.dist[base..base + self.modulus]
            .iter()
            .copied()
            .filter(|&d| d != UNREACHED)
            .min()
    }

    fn best_phase(&self, cell: CellIndex) -> Option<u32> {
        let base = cell * self.modulus;
        (0..self.modulus as u32)
            .filter(|&t| self.dist[base + t as usize] != UNREACHED)
            .min_by_key(|&t| self.dist[base + t as usize])
    }

    /// The move sequence of a shortest walk to `cell`, at its cheapest
    /// arrival phase.
    pub fn path_to(&self, cell: CellIndex) -> Option<Vec<Dir>> {
        self.best_phase(cell).and_then(|t| self.path_to_at(cell, t))
    }

    pub fn path_to_at(&self, cell: CellIndex, phase: u32) -> Option<Vec<Dir>> {
        self.distance_at(cell, phase)?;
        let mut path = Vec::new();
        let mut slot = self.node(cell, phase);
        while self.parent[slot] != NO_PARENT {
            path.push(Dir::ALL[self.parent_move[slot] as usize]);
            slot = self.parent[slot] as usize;
        }
        path.reverse();
        Some(path)
    }

    /// All distances to `cell`, useful in tests asserting dominance.
    #[cfg(test)]
    pub(crate) fn distances(&self, cell: CellIndex) -> Vec<Option<u32>> {
        (0..self.modulus as u32).map(|t| self.distance_at(cell, t)).collect()
    }
}

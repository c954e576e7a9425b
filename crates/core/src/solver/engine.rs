//! The A* main loop over arena-owned nodes.
//!
//! Nodes live in one `Vec` owned by the search; parent links and frontier
//! entries are plain indices into it, so reconstruction is an index walk
//! and teardown is dropping the vector.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use log::debug;
use rustc_hash::FxHashMap;

use super::pathfinding::TimePathfinder;
use super::successors;
use super::{SolveOutcome, SolveReport, Solver, SolverStats};
use crate::state::SearchState;
use crate::types::Dir;

const PROGRESS_INTERVAL: u64 = 25_000;

struct Node {
    state: SearchState,
    parent: Option<u32>,
    /// Walk steps plus the final push that produced this node.
    actions: Vec<Dir>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct OpenEntry {
    f: u32,
    h: u32,
    index: u32,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so the smallest f wins, ties
        // going to the smaller h (deeper node) and then insertion order.
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub(super) fn search(solver: &Solver) -> SolveReport {
    let started = Instant::now();
    let mut stats = SolverStats::default();
    let mut nodes: Vec<Node> = Vec::new();
    let mut open: BinaryHeap<OpenEntry> = BinaryHeap::new();
    let mut best_g: FxHashMap<u64, u32> = FxHashMap::default();
    let mut pathfinder = TimePathfinder::new(&solver.board);

    let finish = |outcome: SolveOutcome, mut stats: SolverStats| -> SolveReport {
        stats.elapsed_ms = started.elapsed().as_millis() as u64;
        SolveReport { outcome, stats }
    };

    let root = solver.initial.clone();
    stats.nodes_generated = 1;
    let Some(root_h) = solver.heuristic.lower_bound(&root) else {
        return finish(SolveOutcome::NoSolution, stats);
    };
    nodes.push(Node { state: root, parent: None, actions: Vec::new() });
    open.push(OpenEntry { f: root_h, h: root_h, index: 0 });
    stats.peak_open_size = 1;

    while let Some(entry) = open.pop() {
        let index = entry.index as usize;
        let (hash, g) = {
            let node = &nodes[index];
            (node.state.hash(), node.state.energy)
        };
        // A closed entry at equal or better cost makes this pop stale.
        if best_g.get(&hash).is_some_and(|&known| known <= g) {
            continue;
        }
        if nodes[index].state.is_goal(&solver.board) {
            let plan = reconstruct(&nodes, index);
            stats.solution_length = plan.len();
            stats.solution_cost = g;
            return finish(SolveOutcome::Solved { plan }, stats);
        }

        best_g.insert(hash, g);
        stats.peak_closed_size = stats.peak_closed_size.max(best_g.len());
        stats.nodes_expanded += 1;
        if stats.nodes_expanded % PROGRESS_INTERVAL == 0 {
            debug!(
                "expanded {} generated {} open {} closed {}",
                stats.nodes_expanded,
                stats.nodes_generated,
                open.len(),
                best_g.len()
            );
        }
        if stats.nodes_expanded >= solver.config.node_budget {
            return finish(SolveOutcome::BudgetExhausted, stats);
        }
        if solver.oracle.check(&nodes[index].state).is_some() {
            continue;
        }

        let expansions = successors::generate(
            &nodes[index].state,
            &solver.board,
            &solver.doors,
            &solver.meta,
            &mut pathfinder,
            &solver.zobrist,
        );
        for successor in expansions {
            if solver.oracle.check(&successor.state).is_some() {
                continue;
            }
            let g_next = successor.state.energy;
            if best_g.get(&successor.state.hash()).is_some_and(|&known| g_next >= known) {
                continue;
            }
            let Some(h) = solver.heuristic.lower_bound(&successor.state) else {
                continue;
            };
            let f = g_next.saturating_add(h);
            let index = nodes.len() as u32;
            nodes.push(Node {
                state: successor.state,
                parent: Some(entry.index),
                actions: successor.actions,
            });
            open.push(OpenEntry { f, h, index });
            stats.nodes_generated += 1;
            stats.peak_open_size = stats.peak_open_size.max(open.len());
        }
    }

    finish(SolveOutcome::NoSolution, stats)
}

/// Walks parent indices from the goal to the root, concatenating the
/// per-edge action segments in forward order.
fn reconstruct(nodes: &[Node], goal: usize) -> Vec<Dir> {
    let mut chain = Vec::new();
    let mut cursor = Some(goal);
    while let Some(index) = cursor {
        chain.push(index);
        cursor = nodes[index].parent.map(|p| p as usize);
    }

    let mut plan = Vec::new();
    for &index in chain.iter().rev() {
        plan.extend_from_slice(&nodes[index].actions);
    }
    plan
}

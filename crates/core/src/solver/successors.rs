//! Push-based macro-move enumeration.
//! This module exists to turn "walk somewhere, then push one box one cell"
//! into single search edges, collapsing the branching factor while keeping
//! energy-optimal plans reachable.
//! It does not own frontier policy or cost ordering; the engine does.

use crate::board::Board;
use crate::door::DoorTable;
use crate::level::Meta;
use crate::solver::pathfinding::TimePathfinder;
use crate::state::SearchState;
use crate::types::Dir;
use crate::zobrist::Zobrist;

/// One legal macro-move out of a state: the successor plus the action
/// segment (walk steps then the push) that produced it.
pub struct Successor {
    pub state: SearchState,
    pub actions: Vec<Dir>,
}

/// Enumerates every legal push reachable from `state`.
///
/// The pathfinder is re-run here with the state's boxes as obstacles; the
/// caller owns it so its tables persist across expansions.
pub fn generate(
    state: &SearchState,
    board: &Board,
    doors: &DoorTable,
    meta: &Meta,
    pathfinder: &mut TimePathfinder,
    zobrist: &Zobrist,
) -> Vec<Successor> {
    let modulus = board.time_modulus();
    pathfinder.search(board, doors, state.agent, state.phase, state.boxes.iter().map(|b| b.pos));

    let mut out = Vec::new();
    for (box_index, bx) in state.boxes.iter().enumerate() {
        for dir in Dir::ALL {
            let Some(push_from) = board.step(bx.pos, dir.opposite()) else {
                continue;
            };
            let Some(push_to) = board.step(bx.pos, dir) else {
                continue;
            };
            if board.is_wall(push_to) || state.box_at(push_to).is_some() {
                continue;
            }
            let Some(walk) = pathfinder.min_distance(push_from) else {
                continue;
            };
            let arrival = (state.phase + walk + 1) % modulus;
            if let Some(door) = board.door_id(push_to)
                && !doors.is_open(door, arrival as i32)
            {
                continue;
            }
            // A locked box needs its key in hand before the macro starts;
            // keys found during this very walk arrive too late.
            if let Some(label) = bx.label
                && state.key_held != Some(label)
            {
                continue;
            }
            let energy = state.energy + walk * meta.move_cost + meta.push_cost;
            if energy > meta.energy_limit {
                continue;
            }

            let mut actions = match pathfinder.path_to(push_from) {
                Some(path) => path,
                None => continue,
            };

            let mut next = state.clone();
            // Keys are picked up as a side effect of the walk, one hand only.
            let mut cell = state.agent;
            for step in &actions {
                if let Some(entered) = board.step(cell, *step) {
                    cell = entered;
                    next.try_pickup_at(cell);
                }
            }

            next.agent = bx.pos;
            next.boxes[box_index].pos = push_to;
            if bx.label.is_some() {
                next.boxes[box_index].label = None;
                next.key_held = None;
            }
            // The push step itself also enters a cell; an uncovered key
            // there lands in the now-free hand.
            next.try_pickup_at(bx.pos);

            next.energy = energy;
            next.phase = arrival;
            next.canonicalize();
            next.rehash(zobrist);

            actions.push(dir);
            out.push(Successor { state: next, actions });
        }
    }
    out
}

//! Conservative unsolvability tests used to prune the search.
//! Every stage may only fire on provably dead states; a false positive
//! here silently discards the optimum, so anything doubtful stays off.

use crate::board::Board;
use crate::door::DoorTable;
use crate::solver::heuristic::Heuristic;
use crate::state::SearchState;
use crate::types::{CellIndex, Dir};

/// Which stage condemned the state; useful in logs and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeadlockKind {
    /// S1: box on a non-target corner cell.
    Corner,
    /// S2: box statically unable to reach any target.
    StaticUnreachable,
    /// S3a: a 1-wide corridor holding more boxes than targets (opt-in).
    Corridor,
    /// S3b: a wall-bounded region holding more boxes than targets.
    RegionCapacity,
    /// S4: every target in the box's door-sealed component is unreachable.
    DoorCycle,
}

const NO_SEGMENT: u32 = u32::MAX;

pub struct DeadlockOracle {
    is_corner: Vec<bool>,
    is_target: Vec<bool>,
    /// S2: some target statically reachable from here.
    reaches_target: Vec<bool>,
    /// S3b: wall-flooded region ids and their target capacities.
    region: Vec<u32>,
    region_targets: Vec<u32>,
    /// S3a: corridor segment ids and their target capacities.
    corridor: Vec<u32>,
    corridor_targets: Vec<u32>,
    corridor_enabled: bool,
    /// S4: some target in this cell's door-sealed component is statically
    /// reachable from here.
    feasible_target: Vec<bool>,
}

impl DeadlockOracle {
    pub fn new(
        board: &Board,
        doors: &DoorTable,
        heuristic: &Heuristic,
        corridor_enabled: bool,
    ) -> DeadlockOracle {
        let size = board.size();
        let is_target: Vec<bool> = (0..size).map(|idx| board.is_target(idx)).collect();
        let reaches_target: Vec<bool> =
            (0..size).map(|idx| heuristic.reaches_any_target(idx)).collect();

        let (region, region_targets) = flood_regions(board, |_| false);

        // Door cells whose door can never open seal their component off for
        // boxes: a push moves a box one adjacent cell at a time, so a box
        // can never cross such a cell.
        let modulus = board.time_modulus();
        let sealed = |idx: CellIndex| -> bool {
            board
                .door_id(idx)
                .and_then(|id| doors.get(id))
                .is_some_and(|door| door.never_opens(modulus))
        };
        let (component, _) = flood_regions(board, &sealed);
        let mut feasible_target = vec![false; size];
        for idx in 0..size {
            if board.is_wall(idx) || sealed(idx) {
                continue;
            }
            feasible_target[idx] = (0..heuristic.target_count()).any(|t| {
                component[heuristic.target_position(t)] == component[idx]
                    && heuristic.target_distance(t, idx).is_some()
            });
        }

        let (corridor, corridor_targets) = scan_corridors(board);

        DeadlockOracle {
            is_corner: (0..size).map(|idx| is_corner_cell(board, idx)).collect(),
            is_target,
            reaches_target,
            region,
            region_targets,
            corridor,
            corridor_targets,
            corridor_enabled,
            feasible_target,
        }
    }

    /// Runs the stages in order and short-circuits on the first hit.
    pub fn check(&self, state: &SearchState) -> Option<DeadlockKind> {
        for bx in &state.boxes {
            if self.is_target[bx.pos] {
                continue;
            }
            if self.is_corner[bx.pos] {
                return Some(DeadlockKind::Corner);
            }
            if !self.reaches_target[bx.pos] {
                return Some(DeadlockKind::StaticUnreachable);
            }
        }

        if self.corridor_enabled && self.corridor_overflows(state) {
            return Some(DeadlockKind::Corridor);
        }
        if self.region_overflows(state) {
            return Some(DeadlockKind::RegionCapacity);
        }

        for bx in &state.boxes {
            if !self.is_target[bx.pos] && !self.feasible_target[bx.pos] {
                return Some(DeadlockKind::DoorCycle);
            }
        }
        None
    }

    fn region_overflows(&self, state: &SearchState) -> bool {
        let mut counts = vec![0u32; self.region_targets.len()];
        for bx in &state.boxes {
            let r = self.region[bx.pos];
            if r != NO_SEGMENT {
                counts[r as usize] += 1;
            }
        }
        counts.iter().zip(&self.region_targets).any(|(boxes, targets)| boxes > targets)
    }

    fn corridor_overflows(&self, state: &SearchState) -> bool {
        let mut counts = vec![0u32; self.corridor_targets.len()];
        for bx in &state.boxes {
            let c = self.corridor[bx.pos];
            if c != NO_SEGMENT {
                counts[c as usize] += 1;
            }
        }
        counts.iter().zip(&self.corridor_targets).any(|(boxes, targets)| boxes > targets)
    }
}

/// Corner = floor cell with walls (or borders) on two perpendicular sides.
fn is_corner_cell(board: &Board, idx: CellIndex) -> bool {
    if board.is_wall(idx) {
        return false;
    }
    let up = board.blocked_beyond(idx, Dir::Up);
    let down = board.blocked_beyond(idx, Dir::Down);
    let left = board.blocked_beyond(idx, Dir::Left);
    let right = board.blocked_beyond(idx, Dir::Right);
    (up || down) && (left || right)
}

/// Floods the non-wall cells, treating `extra_block` cells as walls too.
/// Returns per-cell region ids (NO_SEGMENT for blocked cells) and each
/// region's target count.
fn flood_regions(
    board: &Board,
    extra_block: impl Fn(CellIndex) -> bool,
) -> (Vec<u32>, Vec<u32>) {
    let size = board.size();
    let mut region = vec![NO_SEGMENT; size];
    let mut targets = Vec::new();

    for start in 0..size {
        if board.is_wall(start) || extra_block(start) || region[start] != NO_SEGMENT {
            continue;
        }
        let id = targets.len() as u32;
        targets.push(0);
        let mut stack = vec![start];
        region[start] = id;
        while let Some(cell) = stack.pop() {
            if board.is_target(cell) {
                targets[id as usize] += 1;
            }
            for dir in Dir::ALL {
                if let Some(neighbor) = board.step(cell, dir)
                    && !board.is_wall(neighbor)
                    && !extra_block(neighbor)
                    && region[neighbor] == NO_SEGMENT
                {
                    region[neighbor] = id;
                    stack.push(neighbor);
                }
            }
        }
    }
    (region, targets)
}

/// Finds maximal 1-wide passages: runs of cells walled on both long sides.
fn scan_corridors(board: &Board) -> (Vec<u32>, Vec<u32>) {
    let size = board.size();
    let mut corridor = vec![NO_SEGMENT; size];
    let mut targets = Vec::new();

    let horizontal = |idx: CellIndex| {
        !board.is_wall(idx)
            && board.blocked_beyond(idx, Dir::Up)
            && board.blocked_beyond(idx, Dir::Down)
            && !board.blocked_beyond(idx, Dir::Left)
            && !board.blocked_beyond(idx, Dir::Right)
    };
    let vertical = |idx: CellIndex| {
        !board.is_wall(idx)
            && board.blocked_beyond(idx, Dir::Left)
            && board.blocked_beyond(idx, Dir::Right)
            && !board.blocked_beyond(idx, Dir::Up)
            && !board.blocked_beyond(idx, Dir::Down)
    };

    let claim = |cells: Vec<CellIndex>, targets: &mut Vec<u32>, corridor: &mut Vec<u32>| {
        if cells.len() < 2 {
            return;
        }
        let id = targets.len() as u32;
        targets.push(cells.iter().filter(|&&c| board.is_target(c)).count() as u32);
        for cell in cells {
            corridor[cell] = id;
        }
    };

    for row in 0..board.height() {
        let mut run = Vec::new();
        for col in 0..board.width() {
            let idx = board.index(row, col);
            if horizontal(idx) {
                run.push(idx);
            } else {
                claim(std::mem::take(&mut run), &mut targets, &mut corridor);
            }
        }
        claim(run, &mut targets, &mut corridor);
    }
    for col in 0..board.width() {
        let mut run = Vec::new();
        for row in 0..board.height() {
            let idx = board.index(row, col);
            if vertical(idx) {
                run.push(idx);
            } else {
                claim(std::mem::take(&mut run), &mut targets, &mut corridor);
            }
        }
        claim(run, &mut targets, &mut corridor);
    }

    (corridor, targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::door::Door;
    use crate::state::BoxInfo;

    fn walled_room(width: usize, height: usize) -> Board {
        let mut board = Board::new(width, height);
        for col in 0..width {
            board.set_wall(0, col);
            board.set_wall(height - 1, col);
        }
        for row in 0..height {
            board.set_wall(row, 0);
            board.set_wall(row, width - 1);
        }
        board
    }

    fn oracle(board: &Board, push_cost: u32, corridor: bool) -> DeadlockOracle {
        let doors = DoorTable::default();
        let heuristic = Heuristic::new(board, push_cost);
        DeadlockOracle::new(board, &doors, &heuristic, corridor)
    }

    fn state_with_boxes(positions: &[CellIndex]) -> SearchState {
        let mut s = SearchState::new(0);
        s.boxes = positions.iter().map(|&pos| BoxInfo { label: None, pos }).collect();
        s
    }

    #[test]
    fn box_in_a_non_target_corner_is_dead() {
        let mut board = walled_room(5, 5);
        board.set_target(2, 2);
        let oracle = oracle(&board, 1, false);
        let dead = state_with_boxes(&[board.index(1, 1)]);
        assert_eq!(oracle.check(&dead), Some(DeadlockKind::Corner));
    }

    #[test]
    fn box_on_a_target_corner_is_fine() {
        let mut board = walled_room(5, 5);
        board.set_target(1, 1);
        let oracle = oracle(&board, 1, false);
        let alive = state_with_boxes(&[board.index(1, 1)]);
        assert_eq!(oracle.check(&alive), None);
    }

    #[test]
    fn statically_unreachable_box_is_dead() {
        let mut board = walled_room(7, 5);
        for row in 1..4 {
            board.set_wall(row, 3);
        }
        board.set_target(2, 5);
        // Keep the box out of corners so S2 is the stage that fires.
        let oracle = oracle(&board, 1, false);
        let dead = state_with_boxes(&[board.index(2, 1)]);
        assert_eq!(oracle.check(&dead), Some(DeadlockKind::StaticUnreachable));
    }

    #[test]
    fn region_with_more_boxes_than_targets_is_dead() {
        let mut board = walled_room(7, 5);
        board.set_target(2, 5);
        board.set_target(1, 5);
        let oracle = oracle(&board, 1, false);
        // One connected region, two targets: three boxes overflow it.
        let dead = state_with_boxes(&[board.index(2, 2), board.index(2, 3), board.index(3, 3)]);
        assert_eq!(oracle.check(&dead), Some(DeadlockKind::RegionCapacity));
        let alive = state_with_boxes(&[board.index(2, 2), board.index(3, 3)]);
        assert_eq!(oracle.check(&alive), None);
    }

    #[test]
    fn corridor_stage_is_gated_behind_the_flag() {
        // A 3-cell 1-wide passage in the middle of row 2, holding a single
        // target, with open chambers at both mouths.
        let mut board = walled_room(9, 5);
        for col in 3..6 {
            board.set_wall(1, col);
            board.set_wall(3, col);
        }
        board.set_target(2, 3);
        board.set_target(1, 1);
        board.set_target(1, 2);

        let corridor_row: Vec<CellIndex> = (3..6).map(|col| board.index(2, col)).collect();
        for &idx in &corridor_row {
            assert!(
                board.blocked_beyond(idx, Dir::Up) && board.blocked_beyond(idx, Dir::Down),
                "fixture cell {idx} is not corridor-shaped\n{}",
                board.layout_diag()
            );
        }

        // Two boxes against one corridor target overflow the passage.
        let two_in_corridor = state_with_boxes(&[corridor_row[1], corridor_row[2]]);

        let lenient = oracle(&board, 1, false);
        assert_eq!(lenient.check(&two_in_corridor), None, "stage disabled by default");

        let strict = oracle(&board, 1, true);
        assert_eq!(strict.check(&two_in_corridor), Some(DeadlockKind::Corridor));

        let one_box = state_with_boxes(&[corridor_row[1]]);
        assert_eq!(strict.check(&one_box), None, "one box fits the one target");
    }

    #[test]
    fn never_opening_door_seals_targets_off() {
        // @ side | door(never opens) | target side. The box shares a
        // component with no target, although static distance is finite.
        let mut board = walled_room(7, 3);
        board.set_door(1, 3, 1);
        board.set_target(1, 5);
        let door = Door { id: 1, open_time: 0, close_time: 4, phase: 0, initial_open: false };
        board.compute_time_modulus(&[door]);
        let doors = DoorTable::new(&[door]);
        let heuristic = Heuristic::new(&board, 1);
        let oracle = DeadlockOracle::new(&board, &doors, &heuristic, false);

        let dead = state_with_boxes(&[board.index(1, 2)]);
        assert_eq!(oracle.check(&dead), Some(DeadlockKind::DoorCycle));

        // The same box already past the door is fine.
        let alive = state_with_boxes(&[board.index(1, 4)]);
        assert_eq!(oracle.check(&alive), None);
    }

    #[test]
    fn opening_door_does_not_seal_anything() {
        let mut board = walled_room(7, 3);
        board.set_door(1, 3, 1);
        board.set_target(1, 5);
        let door = Door { id: 1, open_time: 2, close_time: 2, phase: 0, initial_open: true };
        board.compute_time_modulus(&[door]);
        let doors = DoorTable::new(&[door]);
        let heuristic = Heuristic::new(&board, 1);
        let oracle = DeadlockOracle::new(&board, &doors, &heuristic, false);

        let state = state_with_boxes(&[board.index(1, 2)]);
        assert_eq!(oracle.check(&state), None);
    }

    #[test]
    fn whole_board_capacity_catches_surplus_boxes() {
        let mut board = walled_room(6, 4);
        board.set_target(1, 4);
        let oracle = oracle(&board, 1, false);
        let dead = state_with_boxes(&[board.index(1, 2), board.index(2, 2)]);
        assert_eq!(oracle.check(&dead), Some(DeadlockKind::RegionCapacity));
    }
}

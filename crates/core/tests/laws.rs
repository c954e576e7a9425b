//! Property suites for the state algebra and the search laws: canonical
//! idempotence, hash coherence, door periodicity, pathfinder dominance,
//! heuristic admissibility, and A* optimality against a step-level
//! reference search.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use proptest::prelude::{Strategy, prop};
use proptest::test_runner::{Config as ProptestConfig, TestCaseError, TestRunner};
use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::{RngCore, SeedableRng};

use chronoban_core::solver::{Heuristic, TimePathfinder};
use chronoban_core::{
    Board, BoxInfo, Door, DoorTable, KeyId, KeySpot, Level, Meta, Playfield, SearchState,
    SolveOutcome, Solver, SolverConfig, StartState, Zobrist,
};

fn runner(cases: u32) -> TestRunner {
    TestRunner::new(ProptestConfig { cases, ..ProptestConfig::default() })
}

fn box_strategy() -> impl Strategy<Value = Vec<(Option<u8>, usize)>> {
    prop::collection::vec((prop::option::of(0u8..26), 0usize..48), 0..6)
}

fn key_strategy() -> impl Strategy<Value = Vec<(u8, usize)>> {
    prop::collection::vec((0u8..26, 0usize..48), 0..4)
}

fn build_state(boxes: &[(Option<u8>, usize)], keys: &[(u8, usize)], phase: u32) -> SearchState {
    let mut state = SearchState::new(0);
    state.boxes = boxes
        .iter()
        .map(|&(label, pos)| BoxInfo { label: label.map(KeyId), pos })
        .collect();
    state.keys_on_board = keys.iter().map(|&(key, pos)| KeySpot { key: KeyId(key), pos }).collect();
    state.phase = phase;
    state
}

#[test]
fn canonicalization_is_idempotent_and_hash_coherent() {
    let zobrist = Zobrist::new(48, 8, 7);
    runner(256)
        .run(&(box_strategy(), key_strategy(), 0u32..8), |(boxes, keys, phase)| {
            let mut state = build_state(&boxes, &keys, phase);
            state.canonicalize();
            state.rehash(&zobrist);
            let once = state.clone();

            state.canonicalize();
            state.rehash(&zobrist);
            if state != once || state.hash() != once.hash() {
                return Err(TestCaseError::fail("canonicalize is not idempotent"));
            }
            Ok(())
        })
        .expect("canonicalization law");
}

#[test]
fn unlabeled_box_permutations_collapse_to_one_hash() {
    let zobrist = Zobrist::new(48, 8, 7);
    runner(256)
        .run(
            &(box_strategy(), key_strategy(), 0u32..8, 0usize..16),
            |(boxes, keys, phase, rotation)| {
                let mut a = build_state(&boxes, &keys, phase);
                let mut b = build_state(&boxes, &keys, phase);
                if !b.boxes.is_empty() {
                    let pivot = rotation % b.boxes.len();
                    b.boxes.rotate_left(pivot);
                }
                a.canonicalize();
                b.canonicalize();
                a.rehash(&zobrist);
                b.rehash(&zobrist);
                if a != b || a.hash() != b.hash() {
                    return Err(TestCaseError::fail("permuted boxes changed the canonical state"));
                }
                Ok(())
            },
        )
        .expect("permutation law");
}

#[test]
fn door_passability_is_periodic() {
    runner(512)
        .run(
            &(0i32..6, 0i32..6, -6i32..6, proptest::bool::ANY),
            |(open, close, phase, initial)| {
                let door = Door { id: 1, open_time: open, close_time: close, phase, initial_open: initial };
                let len = door.cycle_len();
                if len <= 0 {
                    return Ok(());
                }
                for t in -12..24 {
                    if door.is_open_at(t) != door.is_open_at(t + len) {
                        return Err(TestCaseError::fail(format!(
                            "door {door:?} not periodic at t={t}"
                        )));
                    }
                }
                Ok(())
            },
        )
        .expect("periodicity law");
}

// ---------------------------------------------------------------------------
// Randomized boards
// ---------------------------------------------------------------------------

/// Deterministic small random level: bordered room, sparse interior walls,
/// one agent, `boxes` boxes with as many targets, no doors or keys.
fn random_level(seed: u64, boxes: usize, move_cost: u32, push_cost: u32) -> Option<Level> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let width = 5 + (rng.next_u32() % 3) as usize;
    let height = 4 + (rng.next_u32() % 3) as usize;

    let mut board = Board::new(width, height);
    for col in 0..width {
        board.set_wall(0, col);
        board.set_wall(height - 1, col);
    }
    for row in 0..height {
        board.set_wall(row, 0);
        board.set_wall(row, width - 1);
    }
    for row in 1..height - 1 {
        for col in 1..width - 1 {
            if rng.next_u32() % 5 == 0 {
                board.set_wall(row, col);
            }
        }
    }

    let mut floors: Vec<usize> =
        (0..board.size()).filter(|&idx| !board.is_wall(idx)).collect();
    if floors.len() < 1 + 2 * boxes {
        return None;
    }
    let mut draw = |floors: &mut Vec<usize>| {
        let at = (rng.next_u32() as usize) % floors.len();
        floors.swap_remove(at)
    };

    let agent = draw(&mut floors);
    let mut start = StartState { agent: Some(agent), boxes: Vec::new(), keys: Vec::new() };
    for _ in 0..boxes {
        start.boxes.push(BoxInfo { label: None, pos: draw(&mut floors) });
    }
    for _ in 0..boxes {
        let target = draw(&mut floors);
        board.set_target(board.row_of(target), board.col_of(target));
    }
    board.compute_time_modulus(&[]);

    let meta = Meta {
        name: format!("fuzz-{seed}"),
        width,
        height,
        energy_limit: 250,
        move_cost,
        push_cost,
    };
    Some(Level { meta, board, doors: Vec::new(), start, warnings: Vec::new() })
}

type RefKey = (usize, Vec<BoxInfo>, Option<KeyId>, Vec<KeySpot>, u32);

fn reference_key(state: &SearchState) -> RefKey {
    let mut boxes: Vec<BoxInfo> = state.boxes.iter().copied().collect();
    boxes.sort_unstable();
    let mut keys: Vec<KeySpot> = state.keys_on_board.iter().copied().collect();
    keys.sort_unstable();
    (state.agent, boxes, state.key_held, keys, state.phase)
}

/// Step-level Dijkstra over the runner's own move rules. Returns
/// `None` when the state cap blew (caller skips the case), otherwise the
/// optimal energy to win, if any.
fn reference_min_energy(level: &Level, state_cap: usize) -> Option<Option<u32>> {
    let start = Playfield::new(level).expect("random level has an agent");
    let mut best: HashMap<RefKey, u32> = HashMap::new();
    let mut heap: BinaryHeap<Reverse<(u32, usize)>> = BinaryHeap::new();
    let mut fields: Vec<Playfield<'_>> = Vec::new();

    best.insert(reference_key(start.state()), 0);
    fields.push(start);
    heap.push(Reverse((0, 0)));

    while let Some(Reverse((energy, index))) = heap.pop() {
        if fields.len() > state_cap {
            return None;
        }
        let field = fields[index].clone();
        if best.get(&reference_key(field.state())).is_some_and(|&known| known < energy) {
            continue;
        }
        if field.is_won() {
            return Some(Some(energy));
        }
        for dir in chronoban_core::Dir::ALL {
            let mut next = field.clone();
            if next.apply(dir).is_err() {
                continue;
            }
            let key = reference_key(next.state());
            let cost = next.state().energy;
            if best.get(&key).is_none_or(|&known| cost < known) {
                best.insert(key, cost);
                let slot = fields.len();
                fields.push(next);
                heap.push(Reverse((cost, slot)));
            }
        }
    }
    Some(None)
}

#[test]
fn astar_matches_the_step_level_optimum() {
    runner(48)
        .run(
            &(proptest::arbitrary::any::<u64>(), 1usize..3, 0u32..3, 1u32..3),
            |(seed, boxes, move_cost, push_cost)| {
                let Some(level) = random_level(seed, boxes, move_cost, push_cost) else {
                    return Ok(());
                };
                let Some(reference) = reference_min_energy(&level, 60_000) else {
                    return Ok(());
                };
                let config =
                    SolverConfig { node_budget: 100_000, ..SolverConfig::default() };
                let solver = Solver::new(&level, config).expect("agent placed");
                let report = solver.solve();

                match (&report.outcome, reference) {
                    (SolveOutcome::BudgetExhausted, _) => Ok(()),
                    (SolveOutcome::Solved { .. }, Some(optimal)) => {
                        if report.stats.solution_cost == optimal {
                            Ok(())
                        } else {
                            Err(TestCaseError::fail(format!(
                                "seed {seed}: solver cost {} vs optimal {optimal}\n{}",
                                report.stats.solution_cost,
                                level.board.layout_diag()
                            )))
                        }
                    }
                    (SolveOutcome::NoSolution, None) => Ok(()),
                    (outcome, reference) => Err(TestCaseError::fail(format!(
                        "seed {seed}: solver said {outcome:?}, reference said {reference:?}\n{}",
                        level.board.layout_diag()
                    ))),
                }
            },
        )
        .expect("optimality law");
}

#[test]
fn heuristic_never_exceeds_the_solved_cost() {
    runner(48)
        .run(
            &(proptest::arbitrary::any::<u64>(), 1usize..3, 0u32..3, 1u32..4),
            |(seed, boxes, move_cost, push_cost)| {
                let Some(level) = random_level(seed, boxes, move_cost, push_cost) else {
                    return Ok(());
                };
                let solver = Solver::new(&level, SolverConfig::default()).expect("agent placed");
                let report = solver.solve();
                let SolveOutcome::Solved { .. } = report.outcome else {
                    return Ok(());
                };
                let heuristic = Heuristic::new(&level.board, push_cost);
                let bound = heuristic
                    .lower_bound(solver.initial_state())
                    .expect("solved level cannot be infeasible at the root");
                if bound > report.stats.solution_cost {
                    return Err(TestCaseError::fail(format!(
                        "seed {seed}: bound {bound} exceeds solved cost {}",
                        report.stats.solution_cost
                    )));
                }
                Ok(())
            },
        )
        .expect("admissibility law");
}

#[test]
fn zobrist_seed_changes_ordering_but_not_cost() {
    runner(24)
        .run(&(proptest::arbitrary::any::<u64>(), 1usize..3), |(seed, boxes)| {
            let Some(level) = random_level(seed, boxes, 1, 1) else {
                return Ok(());
            };
            let solve_with = |zobrist_seed: u64| {
                let config = SolverConfig { zobrist_seed, ..SolverConfig::default() };
                Solver::new(&level, config).expect("agent placed").solve()
            };
            let first = solve_with(11);
            let second = solve_with(92);
            let same = match (&first.outcome, &second.outcome) {
                (SolveOutcome::Solved { .. }, SolveOutcome::Solved { .. }) => {
                    first.stats.solution_cost == second.stats.solution_cost
                }
                (a, b) => a == b,
            };
            if same {
                Ok(())
            } else {
                Err(TestCaseError::fail(format!(
                    "seed {seed}: outcomes diverge across Zobrist seeds"
                )))
            }
        })
        .expect("seed invariance law");
}

#[test]
fn pathfinder_distance_dominance_on_random_door_boards() {
    runner(64)
        .run(&proptest::arbitrary::any::<u64>(), |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut board = Board::new(7, 5);
            for col in 0..7 {
                board.set_wall(0, col);
                board.set_wall(4, col);
            }
            for row in 0..5 {
                board.set_wall(row, 0);
                board.set_wall(row, 6);
            }
            for row in 1..4 {
                for col in 1..6 {
                    match rng.next_u32() % 6 {
                        0 => board.set_wall(row, col),
                        1 => board.set_door(row, col, 1 + (rng.next_u32() % 2) as u8),
                        _ => {}
                    }
                }
            }
            let doors = [
                Door {
                    id: 1,
                    open_time: 1 + (rng.next_u32() % 3) as i32,
                    close_time: (rng.next_u32() % 3) as i32,
                    phase: (rng.next_u32() % 4) as i32,
                    initial_open: rng.next_u32() % 2 == 0,
                },
                Door {
                    id: 2,
                    open_time: (rng.next_u32() % 3) as i32,
                    close_time: 1 + (rng.next_u32() % 3) as i32,
                    phase: 0,
                    initial_open: rng.next_u32() % 2 == 1,
                },
            ];
            board.compute_time_modulus(&doors);
            let table = DoorTable::new(&doors);

            let floors: Vec<usize> = (0..board.size()).filter(|&i| !board.is_wall(i)).collect();
            let origin = floors[(rng.next_u32() as usize) % floors.len()];
            let mut pathfinder = TimePathfinder::new(&board);
            pathfinder.search(&board, &table, origin, 0, []);

            for cell in 0..board.size() {
                let min = pathfinder.min_distance(cell);
                for phase in 0..board.time_modulus() {
                    if let Some(d) = pathfinder.distance_at(cell, phase)
                        && Some(d) < min
                    {
                        return Err(TestCaseError::fail(format!(
                            "seed {seed}: dist {d} at ({cell}, {phase}) beats min {min:?}"
                        )));
                    }
                }
                if let Some(expected) = min {
                    let path = pathfinder
                        .path_to(cell)
                        .unwrap_or_else(|| panic!("reachable cell {cell} has no path"));
                    if path.len() as u32 != expected {
                        return Err(TestCaseError::fail(format!(
                            "seed {seed}: path length {} disagrees with distance {expected}",
                            path.len()
                        )));
                    }
                }
            }
            Ok(())
        })
        .expect("dominance law");
}

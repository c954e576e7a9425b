//! Level loading through real files: the parse-solve-replay pipeline and
//! the error paths a caller sees for bad paths and bad content.

use std::io::Write;

use chronoban_core::{Level, LevelError, SolveOutcome, Solver, SolverConfig, plan_text};

fn write_level(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write level");
    file
}

#[test]
fn load_parse_solve_round_trip() {
    let file = write_level(
        "\
[META]
NAME = From Disk
WIDTH = 6
HEIGHT = 3
ENERGY_LIMIT = 12
MOVE_COST = 1
PUSH_COST = 2
[BOARD]
######
#@ $.#
######
",
    );

    let level = Level::load(file.path()).expect("file loads");
    assert_eq!(level.meta.name, "From Disk");

    let solver = Solver::new(&level, SolverConfig::default()).expect("agent present");
    let report = solver.solve();
    let SolveOutcome::Solved { plan } = &report.outcome else {
        panic!("expected a solution, got {:?}", report.outcome);
    };
    assert_eq!(plan_text(plan), "RR");
    assert_eq!(report.stats.solution_cost, 3);
}

#[test]
fn missing_file_surfaces_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("nope.txt");
    match Level::load(&missing) {
        Err(LevelError::Io(_)) => {}
        other => panic!("expected an I/O error, got {other:?}"),
    }
}

#[test]
fn crlf_line_endings_parse_cleanly() {
    let text = "[META]\r\nNAME = CRLF\r\nWIDTH = 5\r\nHEIGHT = 3\r\nENERGY_LIMIT = 9\r\nMOVE_COST = 1\r\nPUSH_COST = 1\r\n[BOARD]\r\n#####\r\n#@$.#\r\n#####\r\n";
    let file = write_level(text);
    let level = Level::load(file.path()).expect("CRLF file loads");
    assert_eq!(level.meta.name, "CRLF");
    assert!(level.warnings.is_empty(), "warnings: {:?}", level.warnings);
}

#[test]
fn doors_and_keys_survive_the_file_round_trip() {
    let file = write_level(
        "\
[META]
NAME = Full House
WIDTH = 8
HEIGHT = 3
ENERGY_LIMIT = 40
MOVE_COST = 1
PUSH_COST = 1
[DOORS]
3 OPEN=2 CLOSE=1 PHASE=1 INITIAL=0
[BOARD]
########
#@a A3.#
########
",
    );
    let level = Level::load(file.path()).expect("file loads");
    assert_eq!(level.doors.len(), 1);
    assert_eq!(level.doors[0].id, 3);
    assert_eq!(level.board.time_modulus(), 3);
    assert_eq!(level.start.keys.len(), 1);
    assert_eq!(level.start.boxes.len(), 1);
    assert!(level.start.boxes[0].label.is_some());
}

//! Level file parsing: `[META]`, `[DOORS]`, `[BOARD]`.
//!
//! The format is line oriented and the three sections must appear in that
//! order. Malformed or missing META is a hard error; most other oddities
//! (unknown glyphs, dimension mismatches, a missing agent) degrade to
//! warnings that are collected on the parsed level and mirrored through
//! `log::warn!` so callers may still proceed.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use log::warn;

use crate::board::Board;
use crate::door::{Door, DoorTable};
use crate::state::{BoxInfo, KeySpot};
use crate::types::{CellIndex, KeyId};

/// The `[META]` block: level name, dimensions, and cost model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Meta {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub energy_limit: u32,
    pub move_cost: u32,
    pub push_cost: u32,
}

/// Dynamic entities read off the `[BOARD]` glyphs.
#[derive(Clone, Debug, Default)]
pub struct StartState {
    pub agent: Option<CellIndex>,
    pub boxes: Vec<BoxInfo>,
    pub keys: Vec<KeySpot>,
}

/// A fully parsed level: static board, door definitions, starting entities,
/// and every warning the parser swallowed along the way.
#[derive(Debug)]
pub struct Level {
    pub meta: Meta,
    pub board: Board,
    pub doors: Vec<Door>,
    pub start: StartState,
    pub warnings: Vec<LevelWarning>,
}

impl Level {
    pub fn load(path: &Path) -> Result<Level, LevelError> {
        let text = fs::read_to_string(path).map_err(LevelError::Io)?;
        Level::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Level, LevelError> {
        Parser::default().run(text)
    }

    pub fn door_table(&self) -> DoorTable {
        DoorTable::new(&self.doors)
    }
}

#[derive(Debug)]
pub enum LevelError {
    Io(io::Error),
    /// No `[META]` section, or one without usable dimensions, before BOARD.
    MissingMeta,
    InvalidDimensions { width: usize, height: usize },
    /// A `KEY = VALUE` line whose value does not parse as required.
    InvalidMetaValue { line: usize, key: String },
    UnknownSection { line: usize },
    SectionOutOfOrder { line: usize, section: &'static str },
    ContentOutsideSection { line: usize },
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cannot read level file: {e}"),
            Self::MissingMeta => write!(f, "level is missing a [META] section"),
            Self::InvalidDimensions { width, height } => {
                write!(f, "unusable board dimensions {width}x{height}")
            }
            Self::InvalidMetaValue { line, key } => {
                write!(f, "META value for {key} at line {line} is not a non-negative integer")
            }
            Self::UnknownSection { line } => write!(f, "unknown section header at line {line}"),
            Self::SectionOutOfOrder { line, section } => {
                write!(f, "section {section} at line {line} is out of order")
            }
            Self::ContentOutsideSection { line } => {
                write!(f, "content before any section header at line {line}")
            }
        }
    }
}

impl std::error::Error for LevelError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LevelWarning {
    UnknownMetaKey { line: usize, key: String },
    MalformedMetaLine { line: usize },
    MalformedDoorLine { line: usize },
    DuplicateDoorId { id: u8 },
    UnknownGlyph { row: usize, col: usize, glyph: char },
    RowWidthMismatch { row: usize, expected: usize, found: usize },
    RowCountMismatch { expected: usize, found: usize },
    MissingAgent,
    BoxTargetMismatch { boxes: usize, targets: usize },
    MissingKeyForBox { letter: char },
    UndefinedDoor { id: u8 },
}

impl fmt::Display for LevelWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMetaKey { line, key } => {
                write!(f, "unknown META key {key} at line {line}")
            }
            Self::MalformedMetaLine { line } => {
                write!(f, "META line {line} has no KEY = VALUE shape")
            }
            Self::MalformedDoorLine { line } => write!(f, "unparseable door at line {line}"),
            Self::DuplicateDoorId { id } => {
                write!(f, "door id {id} defined more than once; first definition wins")
            }
            Self::UnknownGlyph { row, col, glyph } => {
                write!(f, "unknown glyph {glyph:?} at ({row}, {col}); treated as floor")
            }
            Self::RowWidthMismatch { row, expected, found } => {
                write!(f, "board row {row} has {found} columns, expected {expected}")
            }
            Self::RowCountMismatch { expected, found } => {
                write!(f, "board has {found} rows, META declares {expected}")
            }
            Self::MissingAgent => write!(f, "no agent start (@) on the board"),
            Self::BoxTargetMismatch { boxes, targets } => {
                write!(f, "{boxes} boxes but {targets} targets")
            }
            Self::MissingKeyForBox { letter } => {
                write!(f, "locked box {letter} has no matching key on the board")
            }
            Self::UndefinedDoor { id } => {
                write!(f, "board references door {id} with no [DOORS] definition")
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Section {
    Meta,
    Doors,
    Board,
}

#[derive(Default)]
struct Parser {
    meta: Option<MetaDraft>,
    doors: Vec<Door>,
    board: Option<Board>,
    start: StartState,
    warnings: Vec<LevelWarning>,
    board_rows_seen: usize,
}

#[derive(Default)]
struct MetaDraft {
    name: String,
    width: usize,
    height: usize,
    energy_limit: u32,
    move_cost: u32,
    push_cost: u32,
}

impl Parser {
    fn run(mut self, text: &str) -> Result<Level, LevelError> {
        let mut section: Option<Section> = None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                let next = match trimmed {
                    "[META]" => Section::Meta,
                    "[DOORS]" => Section::Doors,
                    "[BOARD]" => Section::Board,
                    _ => return Err(LevelError::UnknownSection { line: line_no }),
                };
                if section.is_some_and(|current| next <= current) {
                    let name = match next {
                        Section::Meta => "[META]",
                        Section::Doors => "[DOORS]",
                        Section::Board => "[BOARD]",
                    };
                    return Err(LevelError::SectionOutOfOrder { line: line_no, section: name });
                }
                if next == Section::Board {
                    self.open_board()?;
                }
                section = Some(next);
                continue;
            }

            match section {
                None => return Err(LevelError::ContentOutsideSection { line: line_no }),
                Some(Section::Meta) => self.meta_line(line_no, trimmed)?,
                Some(Section::Doors) => self.door_line(line_no, trimmed),
                Some(Section::Board) => self.board_line(line),
            }
        }

        self.finish()
    }

    fn meta_line(&mut self, line_no: usize, line: &str) -> Result<(), LevelError> {
        let meta = self.meta.get_or_insert_with(MetaDraft::default);
        let Some((key, value)) = line.split_once('=') else {
            self.warnings.push(LevelWarning::MalformedMetaLine { line: line_no });
            return Ok(());
        };
        let key = key.trim();
        let value = value.trim();

        let parse_number = |value: &str| -> Result<u64, LevelError> {
            value
                .parse::<u64>()
                .map_err(|_| LevelError::InvalidMetaValue { line: line_no, key: key.to_string() })
        };

        match key {
            "NAME" => meta.name = value.to_string(),
            "WIDTH" => meta.width = parse_number(value)? as usize,
            "HEIGHT" => meta.height = parse_number(value)? as usize,
            "ENERGY_LIMIT" => meta.energy_limit = parse_number(value)? as u32,
            "MOVE_COST" => meta.move_cost = parse_number(value)? as u32,
            "PUSH_COST" => meta.push_cost = parse_number(value)? as u32,
            _ => {
                self.warnings
                    .push(LevelWarning::UnknownMetaKey { line: line_no, key: key.to_string() });
            }
        }
        Ok(())
    }

    /// `<id> OPEN=<k> CLOSE=<l> PHASE=<p> INITIAL=<0|1>`; token order after
    /// the id is free.
    fn door_line(&mut self, line_no: usize, line: &str) {
        let mut tokens = line.split_whitespace();
        let id = tokens.next().and_then(|t| t.parse::<u8>().ok());
        let Some(id @ 1..=9) = id else {
            self.warnings.push(LevelWarning::MalformedDoorLine { line: line_no });
            return;
        };

        let mut door = Door { id, open_time: 0, close_time: 0, phase: 0, initial_open: false };
        for token in tokens {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            let Ok(number) = value.parse::<i32>() else {
                self.warnings.push(LevelWarning::MalformedDoorLine { line: line_no });
                return;
            };
            match key {
                "OPEN" => door.open_time = number,
                "CLOSE" => door.close_time = number,
                "PHASE" => door.phase = number,
                "INITIAL" => door.initial_open = number == 1,
                _ => {}
            }
        }

        if self.doors.iter().any(|d| d.id == id) {
            self.warnings.push(LevelWarning::DuplicateDoorId { id });
        }
        self.doors.push(door);
    }

    fn open_board(&mut self) -> Result<(), LevelError> {
        let Some(meta) = &self.meta else {
            return Err(LevelError::MissingMeta);
        };
        if meta.width == 0 || meta.height == 0 {
            return Err(LevelError::InvalidDimensions { width: meta.width, height: meta.height });
        }
        self.board = Some(Board::new(meta.width, meta.height));
        Ok(())
    }

    fn board_line(&mut self, line: &str) {
        // open_board ran before any board content is accepted.
        let Some(board) = self.board.as_mut() else {
            return;
        };
        let width = board.width();
        let height = board.height();
        let row = self.board_rows_seen;
        self.board_rows_seen += 1;
        if row >= height {
            return; // counted and reported in finish()
        }

        let found = line.chars().count();
        if found != width {
            self.warnings.push(LevelWarning::RowWidthMismatch { row, expected: width, found });
        }

        for (col, glyph) in line.chars().enumerate().take(width) {
            let idx = board.index(row, col);
            match glyph {
                '#' => board.set_wall(row, col),
                ' ' => {}
                '.' => board.set_target(row, col),
                '@' => self.start.agent = Some(idx),
                '$' => self.start.boxes.push(BoxInfo { label: None, pos: idx }),
                '*' => {
                    board.set_target(row, col);
                    self.start.boxes.push(BoxInfo { label: None, pos: idx });
                }
                'A'..='Z' => {
                    let label = KeyId::from_box_letter(glyph);
                    self.start.boxes.push(BoxInfo { label, pos: idx });
                }
                'a'..='z' => {
                    if let Some(key) = KeyId::from_key_letter(glyph) {
                        self.start.keys.push(KeySpot { key, pos: idx });
                    }
                }
                '1'..='9' => board.set_door(row, col, glyph as u8 - b'0'),
                _ => {
                    self.warnings.push(LevelWarning::UnknownGlyph { row, col, glyph });
                }
            }
        }
    }

    fn finish(mut self) -> Result<Level, LevelError> {
        let Some(draft) = self.meta.take() else {
            return Err(LevelError::MissingMeta);
        };
        let meta = Meta {
            name: draft.name,
            width: draft.width,
            height: draft.height,
            energy_limit: draft.energy_limit,
            move_cost: draft.move_cost,
            push_cost: draft.push_cost,
        };
        let Some(mut board) = self.board.take() else {
            // A level without [BOARD] has nothing to solve; treat like bad
            // dimensions rather than inventing an empty grid.
            return Err(LevelError::InvalidDimensions { width: meta.width, height: 0 });
        };

        if self.board_rows_seen != meta.height {
            self.warnings.push(LevelWarning::RowCountMismatch {
                expected: meta.height,
                found: self.board_rows_seen,
            });
        }
        if self.start.agent.is_none() {
            self.warnings.push(LevelWarning::MissingAgent);
        }

        board.compute_time_modulus(&self.doors);
        self.validate(&board);

        for warning in &self.warnings {
            warn!("{warning}");
        }

        Ok(Level {
            meta,
            board,
            doors: self.doors,
            start: self.start,
            warnings: self.warnings,
        })
    }

    fn validate(&mut self, board: &Board) {
        let boxes = self.start.boxes.len();
        let targets = board.targets().len();
        if boxes != targets {
            self.warnings.push(LevelWarning::BoxTargetMismatch { boxes, targets });
        }

        for bx in &self.start.boxes {
            if let Some(label) = bx.label
                && !self.start.keys.iter().any(|k| k.key == label)
            {
                self.warnings.push(LevelWarning::MissingKeyForBox { letter: label.box_letter() });
            }
        }

        let mut reported: Vec<u8> = Vec::new();
        for idx in 0..board.size() {
            if let Some(id) = board.door_id(idx)
                && !self.doors.iter().any(|d| d.id == id)
                && !reported.contains(&id)
            {
                reported.push(id);
                self.warnings.push(LevelWarning::UndefinedDoor { id });
            }
        }
    }
}

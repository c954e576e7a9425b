//! Static cell grid: walls, targets, door ids, and the derived clock period.
//! This module exists to keep board geometry separate from search state.
//! It does not own door timing rules or any dynamic entity positions.

use log::warn;

use crate::door::Door;
use crate::types::{CellIndex, Dir};

/// Hard safety cap on the clock period. Exceeding it is a warning, not a
/// failure; the search simply pays for the larger time dimension.
pub const MAX_SAFE_MODULUS: u32 = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellKind {
    Wall,
    Floor,
}

/// One static cell. Walls never carry a target or a door id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub kind: CellKind,
    pub is_target: bool,
    pub door_id: u8,
}

impl Default for Cell {
    fn default() -> Self {
        Cell { kind: CellKind::Floor, is_target: false, door_id: 0 }
    }
}

#[derive(Clone, Debug)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    targets: Vec<CellIndex>,
    time_modulus: u32,
}

impl Board {
    /// An all-floor board with clock period 1 (no doors yet).
    pub fn new(width: usize, height: usize) -> Board {
        Board {
            width,
            height,
            cells: vec![Cell::default(); width * height],
            targets: Vec::new(),
            time_modulus: 1,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn index(&self, row: usize, col: usize) -> CellIndex {
        row * self.width + col
    }

    pub fn row_of(&self, idx: CellIndex) -> usize {
        idx / self.width
    }

    pub fn col_of(&self, idx: CellIndex) -> usize {
        idx % self.width
    }

    pub fn in_bounds(&self, row: i32, col: i32) -> bool {
        row >= 0 && (row as usize) < self.height && col >= 0 && (col as usize) < self.width
    }

    pub fn cell(&self, idx: CellIndex) -> &Cell {
        &self.cells[idx]
    }

    pub fn is_wall(&self, idx: CellIndex) -> bool {
        self.cells[idx].kind == CellKind::Wall
    }

    pub fn is_target(&self, idx: CellIndex) -> bool {
        self.cells[idx].is_target
    }

    pub fn door_id(&self, idx: CellIndex) -> Option<u8> {
        let id = self.cells[idx].door_id;
        if id == 0 { None } else { Some(id) }
    }

    /// Indices of all target cells, in row-major order.
    pub fn targets(&self) -> &[CellIndex] {
        &self.targets
    }

    /// The clock period L; 1 when the board has no doors.
    pub fn time_modulus(&self) -> u32 {
        self.time_modulus
    }

    /// The neighbor of `idx` one step in `dir`, or `None` at the border.
    pub fn step(&self, idx: CellIndex, dir: Dir) -> Option<CellIndex> {
        let (dr, dc) = dir.delta();
        let row = self.row_of(idx) as i32 + dr;
        let col = self.col_of(idx) as i32 + dc;
        if self.in_bounds(row, col) { Some(self.index(row as usize, col as usize)) } else { None }
    }

    /// Border cells and walls both block; used by corner and corridor scans.
    pub fn blocked_beyond(&self, idx: CellIndex, dir: Dir) -> bool {
        match self.step(idx, dir) {
            Some(next) => self.is_wall(next),
            None => true,
        }
    }

    pub fn set_wall(&mut self, row: usize, col: usize) {
        let idx = self.index(row, col);
        if self.cells[idx].is_target {
            self.targets.retain(|&t| t != idx);
        }
        self.cells[idx] = Cell { kind: CellKind::Wall, is_target: false, door_id: 0 };
    }

    pub fn set_target(&mut self, row: usize, col: usize) {
        let idx = self.index(row, col);
        let cell = &mut self.cells[idx];
        cell.kind = CellKind::Floor;
        if !cell.is_target {
            cell.is_target = true;
            self.targets.push(idx);
        }
    }

    pub fn set_door(&mut self, row: usize, col: usize, id: u8) {
        let idx = self.index(row, col);
        let cell = &mut self.cells[idx];
        cell.kind = CellKind::Floor;
        cell.door_id = id;
    }

    /// Recomputes L as the lcm of all door cycle lengths.
    ///
    /// Degenerate cycles contribute nothing. Going past [`MAX_SAFE_MODULUS`]
    /// keeps the computed value and only warns; the search space grows but
    /// stays correct.
    pub fn compute_time_modulus(&mut self, doors: &[Door]) {
        let mut modulus: u64 = 1;
        for door in doors {
            let cycle = door.cycle_len();
            if cycle <= 0 {
                warn!("door {} has a degenerate cycle length {cycle}", door.id);
                continue;
            }
            modulus = lcm(modulus, cycle as u64);
            if modulus > u32::MAX as u64 {
                warn!("clock period overflow; falling back to {MAX_SAFE_MODULUS}");
                modulus = MAX_SAFE_MODULUS as u64;
                break;
            }
        }
        if modulus > MAX_SAFE_MODULUS as u64 {
            warn!("clock period {modulus} exceeds the safety cap {MAX_SAFE_MODULUS}");
        }
        self.time_modulus = modulus as u32;
    }

    /// Static layout render for test panics and logs.
    pub fn layout_diag(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in 0..self.height {
            for col in 0..self.width {
                let cell = &self.cells[self.index(row, col)];
                let glyph = match cell.kind {
                    CellKind::Wall => '#',
                    CellKind::Floor if cell.door_id != 0 => (b'0' + cell.door_id) as char,
                    CellKind::Floor if cell.is_target => '.',
                    CellKind::Floor => ' ',
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn lcm(a: u64, b: u64) -> u64 {
    a / gcd(a, b) * b
}

//! Precomputed random tags for incremental-friendly state fingerprints.
//! This module exists so every hashable feature draws from one seeded stream.
//! It does not own canonicalization; states must be canonical before hashing.

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::{RngCore, SeedableRng};

use crate::types::{CellIndex, KEY_ALPHABET, KeyId};

/// Default seed so frontier ordering is reproducible unless a caller asks
/// for a fresh one.
pub const DEFAULT_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Independent 64-bit tag tables, one entry per (feature, position) pair.
///
/// A state's hash is the xor of the entries selected by its contents, so
/// any reordering of identical features cancels out by construction.
pub struct Zobrist {
    board_size: usize,
    modulus: usize,
    agent: Vec<u64>,
    box_unlabeled: Vec<u64>,
    box_labeled: Vec<u64>,
    key_on_board: Vec<u64>,
    key_held: Vec<u64>,
    phase: Vec<u64>,
}

impl Zobrist {
    pub fn new(board_size: usize, modulus: usize, seed: u64) -> Zobrist {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut fill = |len: usize| -> Vec<u64> {
            (0..len).map(|_| rng.next_u64()).collect()
        };
        Zobrist {
            board_size,
            modulus,
            agent: fill(board_size),
            box_unlabeled: fill(board_size),
            box_labeled: fill(KEY_ALPHABET * board_size),
            key_on_board: fill(KEY_ALPHABET * board_size),
            // Slot 0 is the empty hand.
            key_held: fill(KEY_ALPHABET + 1),
            phase: fill(modulus),
        }
    }

    pub fn board_size(&self) -> usize {
        self.board_size
    }

    pub fn agent(&self, pos: CellIndex) -> u64 {
        self.agent[pos]
    }

    pub fn box_unlabeled(&self, pos: CellIndex) -> u64 {
        self.box_unlabeled[pos]
    }

    pub fn box_labeled(&self, label: KeyId, pos: CellIndex) -> u64 {
        self.box_labeled[label.index() * self.board_size + pos]
    }

    pub fn key_on_board(&self, key: KeyId, pos: CellIndex) -> u64 {
        self.key_on_board[key.index() * self.board_size + pos]
    }

    pub fn key_held(&self, key: Option<KeyId>) -> u64 {
        let slot = match key {
            None => 0,
            Some(id) => id.index() + 1,
        };
        self.key_held[slot]
    }

    pub fn phase(&self, phase: u32) -> u64 {
        self.phase[phase as usize % self.modulus]
    }
}

use smallvec::SmallVec;

use crate::board::Board;
use crate::types::{CellIndex, KeyId};
use crate::zobrist::Zobrist;

/// A movable box. `label: None` is an unlabeled, interchangeable box;
/// `Some(id)` is a locked box that needs the matching key before its first
/// push. The derived ordering (label, then pos) is exactly the canonical
/// ordering: unlabeled boxes form a position-sorted prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoxInfo {
    pub label: Option<KeyId>,
    pub pos: CellIndex,
}

/// A key still lying on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeySpot {
    pub key: KeyId,
    pub pos: CellIndex,
}

pub type BoxList = SmallVec<[BoxInfo; 8]>;
pub type KeyList = SmallVec<[KeySpot; 4]>;

/// The unit of search: everything that varies between expansions.
///
/// Equality and hashing cover the identity fields (agent, boxes, held key,
/// keys on the board, clock phase). `energy` is the path cost to reach the
/// state and deliberately takes no part in either; the closed map keeps the
/// best energy per identity.
#[derive(Clone, Debug)]
pub struct SearchState {
    pub agent: CellIndex,
    pub boxes: BoxList,
    pub key_held: Option<KeyId>,
    pub keys_on_board: KeyList,
    pub energy: u32,
    pub phase: u32,
    hash: u64,
}

impl PartialEq for SearchState {
    fn eq(&self, other: &Self) -> bool {
        self.agent == other.agent
            && self.phase == other.phase
            && self.key_held == other.key_held
            && self.boxes == other.boxes
            && self.keys_on_board == other.keys_on_board
    }
}

impl Eq for SearchState {}

impl SearchState {
    pub fn new(agent: CellIndex) -> SearchState {
        SearchState {
            agent,
            boxes: BoxList::new(),
            key_held: None,
            keys_on_board: KeyList::new(),
            energy: 0,
            phase: 0,
            hash: 0,
        }
    }

    /// Sorts boxes by (label, pos) and keys by (key, pos) so permutations of
    /// interchangeable boxes collapse to one representative.
    pub fn canonicalize(&mut self) {
        self.boxes.sort_unstable();
        self.keys_on_board.sort_unstable();
    }

    /// Recomputes the cached fingerprint from scratch.
    ///
    /// Call after `canonicalize`; the xor over unlabeled boxes is
    /// order-insensitive anyway, but equality checks rely on sorted order.
    pub fn rehash(&mut self, z: &Zobrist) {
        let mut hash = z.agent(self.agent);
        for bx in &self.boxes {
            hash ^= match bx.label {
                None => z.box_unlabeled(bx.pos),
                Some(label) => z.box_labeled(label, bx.pos),
            };
        }
        hash ^= z.key_held(self.key_held);
        for spot in &self.keys_on_board {
            hash ^= z.key_on_board(spot.key, spot.pos);
        }
        hash ^= z.phase(self.phase);
        self.hash = hash;
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn box_at(&self, pos: CellIndex) -> Option<usize> {
        self.boxes.iter().position(|b| b.pos == pos)
    }

    pub fn key_at(&self, pos: CellIndex) -> Option<usize> {
        self.keys_on_board.iter().position(|k| k.pos == pos)
    }

    /// Goal test: every box rests on a target. Whether a box is still
    /// labelled does not matter here; delivery is positional.
    pub fn is_goal(&self, board: &Board) -> bool {
        self.boxes.iter().all(|b| board.is_target(b.pos))
    }

    /// Picks up the key at `pos` if the hand is empty. Returns true when a
    /// key changed hands.
    pub fn try_pickup_at(&mut self, pos: CellIndex) -> bool {
        if self.key_held.is_some() {
            return false;
        }
        if let Some(slot) = self.key_at(pos) {
            self.key_held = Some(self.keys_on_board[slot].key);
            self.keys_on_board.remove(slot);
            true
        } else {
            false
        }
    }
}

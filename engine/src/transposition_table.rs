use serde::{Deserialize, Serialize};

use crate::chess_move::Move;
use crate::evaluation::Eval;
use crate::position::ZobristHash;

pub const DEFAULT_ENTRIES: usize = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bound {
    /// Score fell inside the window.
    Exact,
    /// Search failed high; the true score is at least this.
    LowerBound,
    /// Search failed low; the true score is at most this.
    UpperBound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranspositionTableEntry {
    pub hash: ZobristHash,
    pub depth: u8,
    pub bound: Bound,
    /// Node relative; see [`Eval::to_tt`].
    pub score: Eval,
    pub best_move: Option<Move>,
    pub age: u8,
}

/// Fixed size, always-allocated hash table of search results. Scoped to one
/// engine; entries from earlier searches are kept but lose replacement ties.
#[derive(Debug, Clone)]
pub struct TranspositionTable {
    entries: Vec<Option<TranspositionTableEntry>>,
    age: u8,
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self::with_entries(DEFAULT_ENTRIES)
    }

    /// Rounds `entries` up to a power of two.
    pub fn with_entries(entries: usize) -> Self {
        let size = entries.max(1).next_power_of_two();
        Self {
            entries: vec![None; size],
            age: 0,
        }
    }

    /// A table that stores nothing; every probe misses.
    pub fn disabled() -> Self {
        Self {
            entries: Vec::new(),
            age: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, hash: ZobristHash) -> Option<&TranspositionTableEntry> {
        let idx = self.index(hash)?;
        self.entries[idx]
            .as_ref()
            .filter(|entry| entry.hash == hash)
    }

    /// Replaces the slot if it is empty, holds the same position, holds an
    /// entry from an older search, or holds a shallower one.
    pub fn store(
        &mut self,
        hash: ZobristHash,
        depth: u8,
        bound: Bound,
        score: Eval,
        best_move: Option<Move>,
    ) {
        let Some(idx) = self.index(hash) else {
            return;
        };
        let age = self.age;

        let replace = match &self.entries[idx] {
            None => true,
            Some(existing) => {
                existing.hash == hash || existing.age != age || depth >= existing.depth
            }
        };
        if !replace {
            return;
        }

        // Keep a known best move when re-storing the same position without one.
        let best_move = match (&self.entries[idx], best_move) {
            (Some(existing), None) if existing.hash == hash => existing.best_move,
            _ => best_move,
        };

        self.entries[idx] = Some(TranspositionTableEntry {
            hash,
            depth,
            bound,
            score,
            best_move,
            age,
        });
    }

    /// Marks the start of a new search so earlier entries become replaceable.
    pub fn new_search(&mut self) {
        self.age = self.age.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|entry| *entry = None);
        self.age = 0;
    }

    /// Occupied slots per thousand, sampled from the first thousand slots.
    pub fn hashfull(&self) -> usize {
        let sample = self.entries.len().min(1000);
        if sample == 0 {
            return 0;
        }
        let used = self.entries[..sample]
            .iter()
            .filter(|entry| entry.is_some_and(|entry| entry.age == self.age))
            .count();
        used * 1000 / sample
    }

    fn index(&self, hash: ZobristHash) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        Some((hash.value() as usize) & (self.entries.len() - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitboard::Square::*;
    use crate::position::Position;
    use testresult::TestResult;

    fn hashes() -> Result<(ZobristHash, ZobristHash), crate::position::FenParseError> {
        let start = Position::start().zobrist_hash;
        let other = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1")?.zobrist_hash;
        Ok((start, other))
    }

    #[test]
    fn test_store_and_get() -> TestResult {
        let (hash, other) = hashes()?;
        let mut tt = TranspositionTable::with_entries(1024);
        tt.store(hash, 3, Bound::Exact, Eval(25), Some(Move::new(E2, E4)));

        let entry = tt.get(hash).ok_or("missing entry")?;
        assert_eq!(entry.depth, 3);
        assert_eq!(entry.bound, Bound::Exact);
        assert_eq!(entry.score, Eval(25));
        assert_eq!(entry.best_move, Some(Move::new(E2, E4)));
        assert!(tt.get(other).is_none());
        Ok(())
    }

    #[test]
    fn test_shallower_entry_kept_out_same_search() -> TestResult {
        let (hash, other) = hashes()?;
        // One slot, so every hash collides.
        let mut tt = TranspositionTable::with_entries(1);
        tt.store(hash, 5, Bound::Exact, Eval(10), None);
        tt.store(other, 2, Bound::Exact, Eval(-10), None);
        assert!(tt.get(hash).is_some());
        assert!(tt.get(other).is_none());

        tt.store(other, 6, Bound::LowerBound, Eval(-10), None);
        assert!(tt.get(hash).is_none());
        assert!(tt.get(other).is_some());
        Ok(())
    }

    #[test]
    fn test_older_search_replaced() -> TestResult {
        let (hash, other) = hashes()?;
        let mut tt = TranspositionTable::with_entries(1);
        tt.store(hash, 8, Bound::Exact, Eval(10), None);
        tt.new_search();
        tt.store(other, 1, Bound::UpperBound, Eval(3), None);
        assert!(tt.get(other).is_some());
        Ok(())
    }

    #[test]
    fn test_same_position_keeps_best_move() -> TestResult {
        let (hash, _) = hashes()?;
        let mut tt = TranspositionTable::with_entries(16);
        tt.store(hash, 2, Bound::Exact, Eval(10), Some(Move::new(D2, D4)));
        tt.store(hash, 1, Bound::UpperBound, Eval(5), None);

        let entry = tt.get(hash).ok_or("missing entry")?;
        assert_eq!(entry.depth, 1);
        assert_eq!(entry.best_move, Some(Move::new(D2, D4)));
        Ok(())
    }

    #[test]
    fn test_disabled_and_clear() -> TestResult {
        let (hash, _) = hashes()?;
        let mut tt = TranspositionTable::disabled();
        tt.store(hash, 2, Bound::Exact, Eval(10), None);
        assert!(tt.get(hash).is_none());
        assert_eq!(tt.hashfull(), 0);

        let mut tt = TranspositionTable::with_entries(100);
        assert_eq!(tt.capacity(), 128);
        tt.store(hash, 2, Bound::Exact, Eval(10), None);
        tt.clear();
        assert!(tt.get(hash).is_none());
        Ok(())
    }
}

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use rand::Rng;
use tracing::debug;

use crate::chess_move::{Move, MoveParseError};
use crate::position::{FenParseError, Position};

/// Book shipped with the engine, used when no path is configured.
pub const DEFAULT_BOOK: &str = include_str!("../data/opening_book.txt");

const POSITION_MARKER: &str = "pos";

#[derive(thiserror::Error, Debug)]
pub enum OpeningBookError {
    #[error("reading opening book: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {0}: move listed before any position")]
    MoveWithoutPosition(usize),

    #[error("line {line}: {source}")]
    Move { line: usize, source: MoveParseError },

    #[error("line {line}: invalid weight {value:?}")]
    Weight { line: usize, value: String },

    #[error("line {line}: invalid position key: {source}")]
    PositionKey { line: usize, source: FenParseError },

    #[error("line {line}: want a move and a weight, got {text:?}")]
    MoveLine { line: usize, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookMove {
    /// Bare coordinates; the kind is resolved against the position on lookup.
    pub mve: Move,
    pub weight: u32,
}

/// Candidate moves keyed by [`Position::book_key`].
///
/// The text format skips blank lines and `#` comments. A `pos <key>` line
/// starts a position and the lines after it each hold a move and a weight:
///
/// ```text
/// pos rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -
/// e2e4 40
/// d2d4 35
/// ```
#[derive(Debug, Clone, Default)]
pub struct OpeningBook {
    entries: HashMap<String, Vec<BookMove>>,
}

impl OpeningBook {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, OpeningBookError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, OpeningBookError> {
        let mut entries: HashMap<String, Vec<BookMove>> = HashMap::new();
        let mut curr_key: Option<String> = None;

        for (idx, raw_line) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw_line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(key) = trimmed.strip_prefix(POSITION_MARKER) {
                // Round trip through a position so equivalent keys collapse.
                let position = Position::from_fen(&format!("{} 0 1", key.trim()))
                    .map_err(|source| OpeningBookError::PositionKey { line, source })?;
                let key = position.book_key();
                entries.entry(key.clone()).or_default();
                curr_key = Some(key);
                continue;
            }

            let Some(key) = &curr_key else {
                return Err(OpeningBookError::MoveWithoutPosition(line));
            };
            let book_move = parse_move_line(trimmed, line)?;
            entries.entry(key.clone()).or_default().push(book_move);
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw candidates for a position. A miss on a key with an en passant
    /// square is retried with the square cleared, since books usually omit it.
    pub fn candidates(&self, position: &Position) -> Option<&[BookMove]> {
        let key = position.book_key();
        if let Some(moves) = self.entries.get(&key) {
            return Some(moves);
        }

        let fields: Vec<&str> = key.split(' ').collect();
        match fields.as_slice() {
            [placement, side, castling, ep] if *ep != "-" => {
                let key = format!("{} {} {} -", placement, side, castling);
                self.entries.get(&key).map(Vec::as_slice)
            }
            _ => None,
        }
    }

    /// Picks a legal book move at random, weighted by the listed weights.
    /// Moves that are not legal in `position` are ignored.
    pub fn choose_move(&self, position: &Position, rng: &mut impl Rng) -> Option<Move> {
        let Some(candidates) = self.candidates(position) else {
            debug!(key = %position.book_key(), "book miss");
            return None;
        };

        let legal: Vec<(Move, u32)> = candidates
            .iter()
            .filter_map(|book_move| {
                position
                    .parse_move(&book_move.mve.to_string())
                    .ok()
                    .map(|mve| (mve, book_move.weight))
            })
            .collect();
        if legal.is_empty() {
            debug!(key = %position.book_key(), "book hit without legal moves");
            return None;
        }

        let total: u64 = legal.iter().map(|(_, weight)| *weight as u64).sum();
        let chosen = if total == 0 {
            legal[rng.random_range(0..legal.len())].0
        } else {
            let mut pick = rng.random_range(0..total);
            let mut chosen = legal[legal.len() - 1].0;
            for (mve, weight) in &legal {
                if pick < *weight as u64 {
                    chosen = *mve;
                    break;
                }
                pick -= *weight as u64;
            }
            chosen
        };

        debug!(key = %position.book_key(), mve = %chosen, "book hit");
        Some(chosen)
    }
}

fn parse_move_line(text: &str, line: usize) -> Result<BookMove, OpeningBookError> {
    let mut parts = text.split_whitespace();
    let (Some(mve), Some(weight), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(OpeningBookError::MoveLine {
            line,
            text: text.to_string(),
        });
    };

    let mve: Move = mve
        .parse()
        .map_err(|source| OpeningBookError::Move { line, source })?;
    let weight = weight.parse().map_err(|_| OpeningBookError::Weight {
        line,
        value: weight.to_string(),
    })?;
    Ok(BookMove { mve, weight })
}

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::chess_move::Move;
use crate::evaluation::{Eval, POSITION_EVALUATOR};
use crate::move_gen::MOVE_GEN;
use crate::opening_book::{OpeningBook, DEFAULT_BOOK};
use crate::position::{FenParseError, GameStatus, Position};
use crate::search::{search, SearchError, SearchParams, SearchResult};
use crate::transposition_table::{TranspositionTable, DEFAULT_ENTRIES};

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("invalid position: {0}")]
    Fen(#[from] FenParseError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("no move to play, game is over: {0:?}")]
    GameOver(GameStatus),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    /// Rounded up to a power of two.
    pub tt_entries: usize,
    /// None loads the built in book.
    pub book_path: Option<PathBuf>,
    /// Seed for book move selection. None seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tt_entries: DEFAULT_ENTRIES,
            book_path: None,
            seed: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BestMoveSource {
    Book,
    Search { eval: Eval, depth: u8, nodes: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BestMove {
    pub mve: Move,
    pub source: BestMoveSource,
}

impl fmt::Display for BestMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            BestMoveSource::Book => write!(f, "{} (book)", self.mve),
            BestMoveSource::Search { eval, depth, nodes } => {
                write!(f, "{} ({}, depth {}, {} nodes)", self.mve, eval, depth, nodes)
            }
        }
    }
}

/// Owns everything that outlives a single search: the opening book, the
/// transposition table and the random source for book picks.
pub struct Engine {
    book: OpeningBook,
    transposition_table: TranspositionTable,
    rng: StdRng,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl Engine {
    /// A book that fails to load is logged and replaced by an empty one.
    pub fn new(options: EngineOptions) -> Self {
        let book = match &options.book_path {
            Some(path) => OpeningBook::load(path),
            None => OpeningBook::parse(DEFAULT_BOOK),
        };
        let book = book.unwrap_or_else(|err| {
            warn!(
                path = ?options.book_path,
                "opening book unavailable, searching every move: {}", err
            );
            OpeningBook::empty()
        });
        debug!(positions = book.len(), "opening book loaded");

        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            book,
            transposition_table: TranspositionTable::with_entries(options.tt_entries),
            rng,
        }
    }

    pub fn book(&self) -> &OpeningBook {
        &self.book
    }

    /// Forgets cached search results, for when the next position is unrelated.
    pub fn new_game(&mut self) {
        self.transposition_table.clear();
    }

    pub fn best_move(
        &mut self,
        fen: &str,
        params: &SearchParams,
        terminate: Arc<AtomicBool>,
    ) -> Result<BestMove, EngineError> {
        let position = Position::from_fen(fen)?;
        self.best_move_for(&position, params, terminate)
    }

    /// Book move when enabled and found, otherwise a search.
    pub fn best_move_for(
        &mut self,
        position: &Position,
        params: &SearchParams,
        terminate: Arc<AtomicBool>,
    ) -> Result<BestMove, EngineError> {
        let status = position.status();
        if matches!(status, GameStatus::Checkmate | GameStatus::Stalemate) {
            return Err(EngineError::GameOver(status));
        }

        if params.use_opening_book {
            if let Some(mve) = self.book.choose_move(position, &mut self.rng) {
                info!(%mve, "playing book move");
                return Ok(BestMove {
                    mve,
                    source: BestMoveSource::Book,
                });
            }
        }

        let SearchResult {
            best_move,
            eval,
            depth,
            nodes,
            ..
        } = self.search(position, params, terminate)?;
        let mve = best_move.ok_or(EngineError::GameOver(status))?;

        Ok(BestMove {
            mve,
            source: BestMoveSource::Search { eval, depth, nodes },
        })
    }

    /// Runs the search alone, skipping the book.
    pub fn search(
        &mut self,
        position: &Position,
        params: &SearchParams,
        terminate: Arc<AtomicBool>,
    ) -> Result<SearchResult, SearchError> {
        search(
            position,
            params,
            MOVE_GEN,
            POSITION_EVALUATOR,
            &mut self.transposition_table,
            terminate,
        )
    }
}

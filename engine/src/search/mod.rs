use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, info_span};

use crate::chess_move::Move;
use crate::evaluation::{Eval, EvaluatePosition};
use crate::move_gen::{GenerateMoves, MoveList};
use crate::position::{Position, PositionError};
use crate::search::move_ordering::order_moves;
use crate::transposition_table::{Bound, TranspositionTable};

mod move_ordering;

/// Depth used when the caller bounds the search by nothing else.
pub const DEFAULT_MAX_DEPTH: u8 = 5;
/// Ceiling for time or node bounded searches.
pub const MAX_DEPTH: u8 = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchParams {
    pub max_depth: Option<u8>,
    /// Hard wall clock bound for the whole search.
    pub move_time: Option<Duration>,
    pub max_nodes: Option<u64>,
    pub use_opening_book: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            move_time: None,
            max_nodes: None,
            use_opening_book: true,
        }
    }
}

impl SearchParams {
    pub fn with_depth(max_depth: u8) -> Self {
        Self {
            max_depth: Some(max_depth),
            ..Default::default()
        }
    }

    fn resolve_max_depth(&self) -> Result<u8, SearchError> {
        match (self.max_depth, self.move_time, self.max_nodes) {
            (Some(0), _, _) => Err(SearchError::InvalidDepth(0)),
            (Some(max_depth), _, _) => Ok(max_depth.min(MAX_DEPTH)),
            (None, None, None) => Ok(DEFAULT_MAX_DEPTH),
            (None, _, _) => Ok(MAX_DEPTH),
        }
    }
}

impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only the bounds that were set.
        let mut parts = vec![];
        if let Some(max_depth) = self.max_depth {
            parts.push(format!("max_depth: {}", max_depth));
        }
        if let Some(move_time) = self.move_time {
            parts.push(format!("move_time: {:?}", move_time));
        }
        if let Some(max_nodes) = self.max_nodes {
            parts.push(format!("max_nodes: {}", max_nodes));
        }
        if !self.use_opening_book {
            parts.push("use_opening_book: false".to_string());
        }
        write!(f, "SearchParams: {}", parts.join(", "))
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SearchError {
    #[error("max depth must be at least 1, got {0}")]
    InvalidDepth(u8),

    #[error("search hit a broken position: {0}")]
    Position(#[from] PositionError),
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    /// None only when the root has no legal moves.
    pub best_move: Option<Move>,
    pub eval: Eval,
    /// Deepest fully completed iteration.
    pub depth: u8,
    pub nodes: u64,
    pub time_elapsed: Duration,
    /// Root moves in the order of the last iteration, `value` holding each
    /// move's score (exact for the best, a bound for the rest).
    pub root_moves: MoveList,
}

enum Iteration {
    Complete(Move, Eval),
    /// Stopped part way; holds the best fully searched move, if any.
    Interrupted(Option<(Move, Eval)>),
}

struct Searcher<'a, G, E> {
    params: &'a SearchParams,
    move_gen: G,
    position_eval: E,
    transposition_table: &'a mut TranspositionTable,
    terminate: Arc<AtomicBool>,
    start: Instant,
    nodes: u64,
}

/// Iterative deepening negamax with alpha-beta pruning and a transposition
/// table. Deepens from 1 to the resolved max depth and returns the best move
/// of the last completed iteration, or of the interrupted one if a fully
/// searched move there beat it.
pub fn search(
    position: &Position,
    params: &SearchParams,
    move_gen: impl GenerateMoves + Copy,
    position_eval: impl EvaluatePosition + Copy,
    transposition_table: &mut TranspositionTable,
    terminate: Arc<AtomicBool>,
) -> Result<SearchResult, SearchError> {
    let max_depth = params.resolve_max_depth()?;
    let _span = info_span!("search", fen = %position.to_fen(), max_depth).entered();
    debug!("{}", params);

    transposition_table.new_search();
    let mut searcher = Searcher {
        params,
        move_gen,
        position_eval,
        transposition_table,
        terminate,
        start: Instant::now(),
        nodes: 0,
    };

    let mut root_moves = move_gen.gen_moves(position);
    if root_moves.is_empty() {
        let eval = searcher.leaf_eval(position, 0);
        return Ok(searcher.result(None, eval, 0, root_moves));
    }

    // Fallback if even the first iteration is cut short.
    let mut best_move = root_moves[0];
    let mut best_eval = position_eval.evaluate(position);
    let mut completed_depth = 0;

    for depth in 1..=max_depth {
        let _iteration = info_span!("iteration", depth).entered();

        match searcher.search_root(position, &mut root_moves, depth)? {
            Iteration::Complete(mve, eval) => {
                best_move = mve;
                best_eval = eval;
                completed_depth = depth;
                info!(
                    depth,
                    nodes = searcher.nodes,
                    score = %eval,
                    elapsed_ms = searcher.start.elapsed().as_millis() as u64,
                    best_move = %mve,
                    "search iteration complete"
                );
            }
            Iteration::Interrupted(partial) => {
                if let Some((mve, eval)) = partial {
                    if completed_depth == 0 || eval > best_eval {
                        best_move = mve;
                        best_eval = eval;
                    }
                }
                debug!(depth, nodes = searcher.nodes, "search interrupted");
                break;
            }
        }

        // Iterative deepening finds the shortest forced mate first.
        if best_eval.is_mate() && best_eval > Eval::DRAW {
            break;
        }
    }

    debug!(
        hashfull = searcher.transposition_table.hashfull(),
        "transposition table usage"
    );

    Ok(searcher.result(Some(best_move), best_eval, completed_depth, root_moves))
}

impl<G: GenerateMoves + Copy, E: EvaluatePosition + Copy> Searcher<'_, G, E> {
    fn result(&self, best_move: Option<Move>, eval: Eval, depth: u8, root_moves: MoveList) -> SearchResult {
        SearchResult {
            best_move,
            eval,
            depth,
            nodes: self.nodes,
            time_elapsed: self.start.elapsed(),
            root_moves,
        }
    }

    fn should_stop(&self) -> bool {
        if self.terminate.load(Ordering::Relaxed) {
            return true;
        }
        if self.params.max_nodes.is_some_and(|max_nodes| self.nodes >= max_nodes) {
            return true;
        }
        self.params
            .move_time
            .is_some_and(|move_time| self.start.elapsed() >= move_time)
    }

    /// Static evaluation with mate scores adjusted so nearer mates win.
    fn leaf_eval(&self, position: &Position, ply: u8) -> Eval {
        let eval = self.position_eval.evaluate(position);
        if eval == -Eval::MATE {
            Eval::mated_in(ply)
        } else {
            eval
        }
    }

    fn search_root(
        &mut self,
        position: &Position,
        root_moves: &mut MoveList,
        depth: u8,
    ) -> Result<Iteration, SearchError> {
        let mut alpha = Eval::MIN;
        let beta = Eval::MAX;
        let mut best: Option<(Move, Eval)> = None;

        for mve in root_moves.iter_mut() {
            let child = self.child(position, *mve)?;
            let Some(child_eval) = self.negamax(&child, depth - 1, 1, -beta, -alpha)? else {
                return Ok(Iteration::Interrupted(best));
            };
            let eval = -child_eval;
            mve.value = eval.0;

            if best.map_or(true, |(_, best_eval)| eval > best_eval) {
                best = Some((*mve, eval));
            }
            if eval > alpha {
                alpha = eval;
            }
        }

        // Next iteration searches the best moves first.
        root_moves.sort_by_key(|mve| std::cmp::Reverse(mve.value));

        match best {
            Some((mve, eval)) => {
                self.transposition_table.store(
                    position.zobrist_hash,
                    depth,
                    Bound::Exact,
                    eval.to_tt(0),
                    Some(mve),
                );
                Ok(Iteration::Complete(mve, eval))
            }
            None => Ok(Iteration::Interrupted(None)),
        }
    }

    fn child(&self, position: &Position, mve: Move) -> Result<Position, SearchError> {
        let child = position.try_move(mve)?;
        #[cfg(debug_assertions)]
        child.validate()?;
        Ok(child)
    }

    /// Returns `None` once the search has been told to stop; callers unwind
    /// without using partial scores.
    fn negamax(
        &mut self,
        position: &Position,
        depth: u8,
        ply: u8,
        mut alpha: Eval,
        mut beta: Eval,
    ) -> Result<Option<Eval>, SearchError> {
        if self.should_stop() {
            return Ok(None);
        }
        self.nodes += 1;

        if depth == 0 {
            return Ok(Some(self.leaf_eval(position, ply)));
        }

        let original_alpha = alpha;
        let hash = position.zobrist_hash;

        let maybe_tt_best_move = match self.transposition_table.get(hash) {
            Some(entry) => {
                if entry.depth >= depth {
                    let score = entry.score.from_tt(ply);
                    match entry.bound {
                        Bound::Exact => return Ok(Some(score)),
                        Bound::LowerBound => alpha = alpha.max(score),
                        Bound::UpperBound => beta = beta.min(score),
                    }
                    if alpha >= beta {
                        return Ok(Some(score));
                    }
                }
                entry.best_move
            }
            None => None,
        };

        let mut moves = self.move_gen.gen_moves(position);
        if moves.is_empty() {
            return Ok(Some(self.leaf_eval(position, ply)));
        }
        if position.is_rule_draw() {
            return Ok(Some(Eval::DRAW));
        }

        order_moves(&mut moves, maybe_tt_best_move);

        let mut best_eval = Eval::MIN;
        let mut best_move = None;
        for mve in moves {
            let child = self.child(position, mve)?;
            // A stopped child means this node's score is incomplete too.
            let Some(child_eval) = self.negamax(&child, depth - 1, ply + 1, -beta, -alpha)? else {
                return Ok(None);
            };
            let eval = -child_eval;

            if eval > best_eval {
                best_eval = eval;
                best_move = Some(mve);
            }
            if eval > alpha {
                alpha = eval;
            }
            if alpha >= beta {
                break;
            }
        }

        let bound = if best_eval <= original_alpha {
            Bound::UpperBound
        } else if best_eval >= beta {
            Bound::LowerBound
        } else {
            Bound::Exact
        };
        self.transposition_table
            .store(hash, depth, bound, best_eval.to_tt(ply), best_move);

        Ok(Some(best_eval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitboard::Square::*;
    use crate::evaluation::POSITION_EVALUATOR;
    use crate::move_gen::MOVE_GEN;
    use test_case::test_case;
    use testresult::TestResult;

    fn run(position: &Position, params: &SearchParams) -> Result<SearchResult, SearchError> {
        search(
            position,
            params,
            MOVE_GEN,
            POSITION_EVALUATOR,
            &mut TranspositionTable::new(),
            Arc::new(AtomicBool::new(false)),
        )
    }

    /// Plain negamax with no pruning.
    fn minimax(position: &Position, depth: u8, ply: u8) -> Eval {
        let moves = MOVE_GEN.gen_moves(position);
        if depth == 0 || moves.is_empty() {
            let eval = POSITION_EVALUATOR.evaluate(position);
            return if eval == -Eval::MATE {
                Eval::mated_in(ply)
            } else {
                eval
            };
        }
        if position.is_rule_draw() {
            return Eval::DRAW;
        }
        moves
            .into_iter()
            .filter_map(|mve| position.try_move(mve).ok())
            .map(|child| -minimax(&child, depth - 1, ply + 1))
            .max()
            .unwrap_or(Eval::MIN)
    }

    #[test_case("r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5Q2/PPPP1PPP/RNB1K1NR w KQkq - 2 3", 3 ; "scholars mate setup")]
    #[test_case("4k3/8/8/3q4/8/2N5/8/4K3 w - - 0 1", 3 ; "knight takes queen")]
    #[test_case("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1", 2 ; "kiwipete")]
    fn test_alpha_beta_matches_minimax(fen: &str, depth: u8) -> TestResult {
        let position = Position::from_fen(fen)?;
        let params = SearchParams::with_depth(depth);

        let with_tt = run(&position, &params)?;
        let without_tt = search(
            &position,
            &params,
            MOVE_GEN,
            POSITION_EVALUATOR,
            &mut TranspositionTable::disabled(),
            Arc::new(AtomicBool::new(false)),
        )?;
        let want = minimax(&position, depth, 0);

        assert_eq!(without_tt.eval, want);
        assert_eq!(with_tt.eval, want);
        Ok(())
    }

    #[test_case("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1", Move::new(A1, A8) ; "back rank")]
    #[test_case("r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5Q2/PPPP1PPP/RNB1K1NR w KQkq - 2 3", Move::new(F3, F7) ; "scholars mate")]
    fn test_finds_mate_in_one(fen: &str, want: Move) -> TestResult {
        let position = Position::from_fen(fen)?;
        let res = run(&position, &SearchParams::with_depth(3))?;

        assert_eq!(res.best_move, Some(want));
        assert_eq!(res.eval, -Eval::mated_in(1));
        assert_eq!(res.eval.to_string(), "mate 1");
        Ok(())
    }

    #[test]
    fn test_any_of_several_mates() -> TestResult {
        // Both Qh8 and Qb7 mate.
        let position = Position::from_fen("k7/8/1K6/8/8/8/8/7Q w - - 0 1")?;
        let res = run(&position, &SearchParams::with_depth(4))?;
        let mve = res.best_move.ok_or("no move")?;
        let after = position.make_move(mve)?;
        assert_eq!(after.status(), crate::position::GameStatus::Checkmate);
        assert_eq!(res.eval, -Eval::mated_in(1));
        assert_eq!(res.depth, 1);
        Ok(())
    }

    #[test]
    fn test_wins_hanging_queen() -> TestResult {
        let position = Position::from_fen("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1")?;
        let res = run(&position, &SearchParams::with_depth(2))?;
        assert_eq!(res.best_move, Some(Move::new(D2, D5)));
        Ok(())
    }

    #[test]
    fn test_no_legal_moves() -> TestResult {
        let mated = Position::from_fen("R5k1/5ppp/8/8/8/8/8/6K1 b - - 0 1")?;
        let res = run(&mated, &SearchParams::with_depth(3))?;
        assert_eq!(res.best_move, None);
        assert_eq!(res.eval, Eval::mated_in(0));

        let stalemate = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1")?;
        let res = run(&stalemate, &SearchParams::with_depth(3))?;
        assert_eq!(res.best_move, None);
        assert_eq!(res.eval, Eval::DRAW);
        Ok(())
    }

    #[test]
    fn test_zero_depth_rejected() {
        let res = run(&Position::start(), &SearchParams::with_depth(0));
        assert_eq!(res.err(), Some(SearchError::InvalidDepth(0)));
    }

    #[test_case(SearchParams::default(), Ok(DEFAULT_MAX_DEPTH) ; "default")]
    #[test_case(SearchParams::with_depth(3), Ok(3) ; "explicit")]
    #[test_case(SearchParams { move_time: Some(Duration::from_millis(10)), ..Default::default() }, Ok(MAX_DEPTH) ; "time bounded")]
    #[test_case(SearchParams::with_depth(0), Err(SearchError::InvalidDepth(0)) ; "zero")]
    fn test_resolve_max_depth(params: SearchParams, want: Result<u8, SearchError>) {
        assert_eq!(params.resolve_max_depth(), want);
    }

    #[test]
    fn test_terminated_search_still_returns_move() -> TestResult {
        let position = Position::start();
        let res = search(
            &position,
            &SearchParams::with_depth(6),
            MOVE_GEN,
            POSITION_EVALUATOR,
            &mut TranspositionTable::new(),
            Arc::new(AtomicBool::new(true)),
        )?;
        assert_eq!(res.depth, 0);
        assert_eq!(res.nodes, 0);
        let mve = res.best_move.ok_or("no move")?;
        assert!(MOVE_GEN.gen_moves(&position).contains(&mve));
        Ok(())
    }

    #[test]
    fn test_node_budget_respected() -> TestResult {
        let params = SearchParams {
            max_depth: Some(8),
            max_nodes: Some(2_000),
            ..Default::default()
        };
        let res = run(&Position::start(), &params)?;
        assert!(res.nodes <= 2_000);
        assert!(res.depth < 8);
        assert!(res.best_move.is_some());
        Ok(())
    }

    #[test]
    fn test_root_moves_sorted_by_score() -> TestResult {
        let position = Position::from_fen("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1")?;
        let res = run(&position, &SearchParams::with_depth(2))?;
        assert_eq!(res.root_moves[0], Move::new(D2, D5));
        assert_eq!(res.root_moves[0].value, res.eval.0);
        Ok(())
    }
}

pub mod bitboard;
pub mod chess_move;
pub mod engine;
pub mod evaluation;
pub mod move_gen;
pub mod opening_book;
pub mod perft;
pub mod position;
pub mod search;
pub mod transposition_table;

pub use bitboard::{BitBoard, Square, SquareParseError};
pub use chess_move::{Move, MoveKind, MoveParseError};
pub use engine::{BestMove, BestMoveSource, Engine, EngineError, EngineOptions};
pub use evaluation::{Eval, EvaluatePosition, PositionEvaluator, POSITION_EVALUATOR};
pub use move_gen::{attack_tables, GenerateMoves, MoveList, MOVE_GEN};
pub use opening_book::{OpeningBook, OpeningBookError};
pub use perft::{perft, perft_full, PerftDepthResult, PerftResult};
pub use position::{
    CastlingRights, FenParseError, GameStatus, Piece, Position, PositionError, Side, ZobristHash,
    START_FEN,
};
pub use search::{search, SearchError, SearchParams, SearchResult, DEFAULT_MAX_DEPTH};
pub use transposition_table::TranspositionTable;

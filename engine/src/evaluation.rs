use std::fmt;
use std::ops::Neg;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::bitboard::BitBoard;
use crate::position::{GameStatus, Piece, Position, Side};

/// Centipawn score from the point of view of the side to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Eval(pub i32);

impl Eval {
    pub const DRAW: Eval = Eval(0);
    /// Score of delivering mate right now. Mates found deeper score less.
    pub const MATE: Eval = Eval(1_000_000);
    pub const MAX: Eval = Eval(2_000_000);
    pub const MIN: Eval = Eval(-2_000_000);

    /// Anything this close to [`Eval::MATE`] is a forced mate.
    const MATE_THRESHOLD: i32 = Eval::MATE.0 - 1_000;

    /// The side to move is mated `ply` half moves from the root.
    pub const fn mated_in(ply: u8) -> Eval {
        Eval(-Eval::MATE.0 + ply as i32)
    }

    pub const fn is_mate(self) -> bool {
        self.0.abs() >= Eval::MATE_THRESHOLD && self.0.abs() <= Eval::MATE.0
    }

    /// Full moves until mate, positive when the side to move mates.
    pub fn mate_in_moves(self) -> Option<i32> {
        if !self.is_mate() {
            return None;
        }
        let plies = Eval::MATE.0 - self.0.abs();
        let moves = (plies + 1) / 2;
        Some(if self.0 > 0 { moves } else { -moves })
    }

    /// Mate scores are stored relative to the node instead of the root so
    /// they stay correct when the entry is reached at another ply.
    pub(crate) fn to_tt(self, ply: u8) -> Eval {
        match self.0 {
            x if x >= Eval::MATE_THRESHOLD => Eval(x + ply as i32),
            x if x <= -Eval::MATE_THRESHOLD => Eval(x - ply as i32),
            x => Eval(x),
        }
    }

    pub(crate) fn from_tt(self, ply: u8) -> Eval {
        match self.0 {
            x if x >= Eval::MATE_THRESHOLD => Eval(x - ply as i32),
            x if x <= -Eval::MATE_THRESHOLD => Eval(x + ply as i32),
            x => Eval(x),
        }
    }
}

impl Neg for Eval {
    type Output = Eval;

    fn neg(self) -> Eval {
        Eval(-self.0)
    }
}

impl fmt::Display for Eval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mate_in_moves() {
            Some(moves) => write!(f, "mate {}", moves),
            None => write!(f, "cp {}", self.0),
        }
    }
}

pub trait EvaluatePosition {
    /// Static score, positive when the side to move stands better.
    fn evaluate(&self, position: &Position) -> Eval;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PositionEvaluator;

impl EvaluatePosition for PositionEvaluator {
    fn evaluate(&self, position: &Position) -> Eval {
        match position.status() {
            GameStatus::Checkmate => return -Eval::MATE,
            GameStatus::Stalemate
            | GameStatus::FiftyMoveRule
            | GameStatus::InsufficientMaterial => return Eval::DRAW,
            GameStatus::Ongoing | GameStatus::Check => {}
        }

        let mut eval = 0;
        for piece in Piece::iter() {
            let white = position.pieces(piece, Side::White);
            let black = position.pieces(piece, Side::Black);

            eval += piece_value(piece)
                * (white.num_squares_set() as i32 - black.num_squares_set() as i32);
            eval += pst_score(white, piece, Side::White) - pst_score(black, piece, Side::Black);
        }

        match position.state.to_move {
            Side::White => Eval(eval),
            Side::Black => Eval(-eval),
        }
    }
}

pub const fn piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 100,
        Piece::Knight => 320,
        Piece::Bishop => 330,
        Piece::Rook => 500,
        Piece::Queen => 900,
        Piece::King => 0,
    }
}

/// Tables read from White's side with the eighth rank on top, so a white
/// piece on square `s` looks up `s ^ 56` and a black piece mirrors to `s`.
fn pst_score(pieces: BitBoard, piece: Piece, side: Side) -> i32 {
    let table = match piece {
        Piece::Pawn => &PAWN_TABLE,
        Piece::Knight => &KNIGHT_TABLE,
        Piece::Bishop => &BISHOP_TABLE,
        Piece::Rook => &ROOK_TABLE,
        Piece::Queen => &QUEEN_TABLE,
        Piece::King => &KING_TABLE,
    };
    pieces
        .squares()
        .map(|square| {
            let idx = match side {
                Side::White => square.index() ^ 56,
                Side::Black => square.index(),
            };
            table[idx] as i32
        })
        .sum()
}

#[rustfmt::skip]
const PAWN_TABLE: [i16; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
    50, 50, 50, 50, 50, 50, 50, 50,
    10, 10, 20, 30, 30, 20, 10, 10,
     5,  5, 10, 25, 25, 10,  5,  5,
     0,  0,  0, 20, 20,  0,  0,  0,
     5, -5,-10,  0,  0,-10, -5,  5,
     5, 10, 10,-20,-20, 10, 10,  5,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const KNIGHT_TABLE: [i16; 64] = [
    -50,-40,-30,-30,-30,-30,-40,-50,
    -40,-20,  0,  0,  0,  0,-20,-40,
    -30,  0, 10, 15, 15, 10,  0,-30,
    -30,  5, 15, 20, 20, 15,  5,-30,
    -30,  0, 15, 20, 20, 15,  0,-30,
    -30,  5, 10, 15, 15, 10,  5,-30,
    -40,-20,  0,  5,  5,  0,-20,-40,
    -50,-40,-30,-30,-30,-30,-40,-50,
];

#[rustfmt::skip]
const BISHOP_TABLE: [i16; 64] = [
    -20,-10,-10,-10,-10,-10,-10,-20,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -10,  0,  5, 10, 10,  5,  0,-10,
    -10,  5,  5, 10, 10,  5,  5,-10,
    -10,  0, 10, 10, 10, 10,  0,-10,
    -10, 10, 10, 10, 10, 10, 10,-10,
    -10,  5,  0,  0,  0,  0,  5,-10,
    -20,-10,-10,-10,-10,-10,-10,-20,
];

#[rustfmt::skip]
const ROOK_TABLE: [i16; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
     5, 10, 10, 10, 10, 10, 10,  5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
     0,  0,  0,  5,  5,  0,  0,  0,
];

#[rustfmt::skip]
const QUEEN_TABLE: [i16; 64] = [
    -20,-10,-10, -5, -5,-10,-10,-20,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -10,  0,  5,  5,  5,  5,  0,-10,
     -5,  0,  5,  5,  5,  5,  0, -5,
      0,  0,  5,  5,  5,  5,  0, -5,
    -10,  5,  5,  5,  5,  5,  0,-10,
    -10,  0,  5,  0,  0,  0,  0,-10,
    -20,-10,-10, -5, -5,-10,-10,-20,
];

#[rustfmt::skip]
const KING_TABLE: [i16; 64] = [
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -20,-30,-30,-40,-40,-30,-30,-20,
    -10,-20,-20,-20,-20,-20,-20,-10,
     20, 20,  0,  0,  0,  0, 20, 20,
     20, 30, 10,  0,  0, 10, 30, 20,
];

pub static POSITION_EVALUATOR: PositionEvaluator = PositionEvaluator;

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use testresult::TestResult;

    #[test]
    fn test_start_is_balanced() {
        assert_eq!(POSITION_EVALUATOR.evaluate(&Position::start()), Eval(0));
    }

    #[test_case("4k3/8/8/8/8/8/8/3QK3 w - - 0 1", true ; "white up a queen, white to move")]
    #[test_case("4k3/8/8/8/8/8/8/3QK3 b - - 0 1", false ; "white up a queen, black to move")]
    #[test_case("3qk3/8/8/8/8/8/8/4K3 b - - 0 1", true ; "black up a queen, black to move")]
    fn test_score_is_side_relative(fen: &str, positive: bool) -> TestResult {
        let eval = POSITION_EVALUATOR.evaluate(&Position::from_fen(fen)?);
        assert_eq!(eval > Eval::DRAW, positive);
        assert!(eval.0.abs() > 800);
        Ok(())
    }

    #[test]
    fn test_mirrored_positions_score_equal() -> TestResult {
        let white = Position::from_fen("4k3/8/8/8/4P3/2N5/8/4K3 w - - 0 1")?;
        let black = Position::from_fen("4k3/8/2n5/4p3/8/8/8/4K3 b - - 0 1")?;
        assert_eq!(
            POSITION_EVALUATOR.evaluate(&white),
            POSITION_EVALUATOR.evaluate(&black)
        );
        Ok(())
    }

    #[test]
    fn test_centralized_knight_better() -> TestResult {
        let rim = Position::from_fen("4k3/p7/8/8/8/8/P7/N3K3 w - - 0 1")?;
        let center = Position::from_fen("4k3/p7/8/8/3N4/8/P7/4K3 w - - 0 1")?;
        assert!(POSITION_EVALUATOR.evaluate(&center) > POSITION_EVALUATOR.evaluate(&rim));
        Ok(())
    }

    #[test_case("R5k1/5ppp/8/8/8/8/8/6K1 b - - 0 1", -Eval::MATE ; "checkmated")]
    #[test_case("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", Eval::DRAW ; "stalemate")]
    #[test_case("4k3/8/8/8/8/8/8/2N1K3 w - - 0 1", Eval::DRAW ; "insufficient material")]
    fn test_terminal_scores(fen: &str, want: Eval) -> TestResult {
        assert_eq!(POSITION_EVALUATOR.evaluate(&Position::from_fen(fen)?), want);
        Ok(())
    }

    #[test]
    fn test_mate_display_and_tt_adjust() {
        let mate_in_two = -Eval::mated_in(3);
        assert!(mate_in_two.is_mate());
        assert_eq!(mate_in_two.to_string(), "mate 2");
        assert_eq!(Eval::mated_in(2).to_string(), "mate -1");
        assert_eq!(Eval(35).to_string(), "cp 35");

        assert_eq!(mate_in_two.to_tt(2).from_tt(2), mate_in_two);
        assert_eq!(mate_in_two.to_tt(2), -Eval::mated_in(1));
        assert_eq!(Eval(35).to_tt(4), Eval(35));
    }
}

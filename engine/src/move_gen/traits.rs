use arrayvec::ArrayVec;

use crate::chess_move::Move;
use crate::position::Position;

/// No legal chess position has more than 218 moves; 256 leaves headroom for
/// pseudo-legal lists.
pub type MoveList = ArrayVec<Move, 256>;

pub trait GenerateMoves {
    /// Legal moves for the side to move, captures and promotions first.
    fn gen_moves(&self, position: &Position) -> MoveList;

    /// Moves that obey piece movement but may leave the mover's king attacked.
    fn gen_pseudo_legal_moves(&self, position: &Position) -> MoveList;
}

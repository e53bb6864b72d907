use crate::chess_move::Move;
use crate::move_gen::MoveList;

/// Moves arrive from the generator already sorted by MVV-LVA and promotion
/// value. The transposition table move, if any, is pulled to the front and
/// the rest keep their order.
pub(super) fn order_moves(moves: &mut MoveList, maybe_tt_best_move: Option<Move>) {
    let Some(tt_best_move) = maybe_tt_best_move else {
        return;
    };
    if let Some(idx) = moves.iter().position(|&mve| mve == tt_best_move) {
        moves[..=idx].rotate_right(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitboard::Square::*;
    use crate::move_gen::{GenerateMoves, MOVE_GEN};
    use crate::position::Position;
    use testresult::TestResult;

    #[test]
    fn test_tt_move_first_then_captures() -> TestResult {
        let position = Position::from_fen("7k/8/8/8/5q1b/3q1pP1/2r3b1/K3N3 w - - 0 1")?;
        let mut moves = MOVE_GEN.gen_moves(&position);
        order_moves(&mut moves, Some(Move::new(A1, B1)));

        let want = [
            Move::new(A1, B1),
            // Captures, most valuable victim then least valuable attacker.
            Move::new(G3, F4),
            Move::new(E1, D3),
            Move::new(E1, C2),
            Move::new(G3, H4),
            Move::new(E1, G2),
            Move::new(E1, F3),
        ];
        assert_eq!(&moves[..want.len()], &want);
        Ok(())
    }

    #[test]
    fn test_missing_tt_move_leaves_order() -> TestResult {
        let position = Position::start();
        let mut moves = MOVE_GEN.gen_moves(&position);
        let before = moves.clone();
        order_moves(&mut moves, Some(Move::new(E4, E5)));
        assert_eq!(moves, before);

        order_moves(&mut moves, None);
        assert_eq!(moves, before);
        Ok(())
    }
}

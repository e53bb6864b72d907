use std::cmp::Reverse;

use super::traits::MoveList;
use super::AttackTables;
use crate::bitboard::Square::*;
use crate::bitboard::{BitBoard, Square};
use crate::chess_move::{Move, MoveKind};
use crate::position::{CastlingRights, Piece, Position, Side};

const PROMOTIONS: [Piece; 4] = [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen];

struct CastlingSquares {
    king: Square,
    king_side_rook: Square,
    queen_side_rook: Square,
    /// Must be empty and unattacked.
    king_side_path: [Square; 2],
    /// Must be empty; only the first two must be unattacked.
    queen_side_path: [Square; 3],
}

const fn castling_squares(side: Side) -> CastlingSquares {
    match side {
        Side::White => CastlingSquares {
            king: E1,
            king_side_rook: H1,
            queen_side_rook: A1,
            king_side_path: [F1, G1],
            queen_side_path: [D1, C1, B1],
        },
        Side::Black => CastlingSquares {
            king: E8,
            king_side_rook: H8,
            queen_side_rook: A8,
            king_side_path: [F8, G8],
            queen_side_path: [D8, C8, B8],
        },
    }
}

fn push_pawn_moves(moves: &mut MoveList, src: Square, dest: Square, side: Side) {
    let last_rank = match side {
        Side::White => 7,
        Side::Black => 0,
    };
    if dest.rank() == last_rank {
        for piece in PROMOTIONS {
            moves.push(Move::with_promotion(src, dest, piece));
        }
    } else {
        moves.push(Move::new(src, dest));
    }
}

fn gen_pawn_moves(position: &Position, tables: &AttackTables, moves: &mut MoveList) {
    let side = position.to_move();
    let opp_side = side.opposite_side();
    let dir = side.pawn_direction();
    let start_rank = match side {
        Side::White => 1,
        Side::Black => 6,
    };

    let empty = !position.occupancy();
    let enemies = position.side(opp_side);

    // En passant is only offered when the pawn that just double pushed is
    // where the target says it is.
    let ep_target = position.state.en_passant_target.filter(|target| {
        target
            .offset(-dir, 0)
            .is_some_and(|sq| position.pieces(Piece::Pawn, opp_side).is_square_set(sq))
    });

    for src in position.pieces(Piece::Pawn, side).squares() {
        if let Some(single) = src.offset(dir, 0).filter(|&sq| empty.is_square_set(sq)) {
            push_pawn_moves(moves, src, single, side);

            if src.rank() == start_rank {
                if let Some(double) = single.offset(dir, 0).filter(|&sq| empty.is_square_set(sq)) {
                    moves.push(Move::with_kind(src, double, MoveKind::DoublePawnPush));
                }
            }
        }

        let atks = tables.pawn_attacks(src, side);
        for dest in (atks & enemies).squares() {
            push_pawn_moves(moves, src, dest, side);
        }

        if let Some(target) = ep_target.filter(|&target| atks.is_square_set(target)) {
            moves.push(Move::with_kind(src, target, MoveKind::EnPassant));
        }
    }
}

fn gen_castling_moves(position: &Position, moves: &mut MoveList) {
    let side = position.to_move();
    let opp_side = side.opposite_side();
    let rights = position.state.castling_rights;
    let squares = castling_squares(side);

    if !position.pieces(Piece::King, side).is_square_set(squares.king)
        || position.is_attacked(squares.king, opp_side)
    {
        return;
    }

    let rooks = position.pieces(Piece::Rook, side);
    let occupancy = position.occupancy();

    if rights.has(CastlingRights::king_side(side))
        && rooks.is_square_set(squares.king_side_rook)
        && squares.king_side_path.iter().all(|&sq| {
            !occupancy.is_square_set(sq) && !position.is_attacked(sq, opp_side)
        })
    {
        moves.push(Move::with_kind(
            squares.king,
            squares.king_side_path[1],
            MoveKind::CastleKingSide,
        ));
    }

    if rights.has(CastlingRights::queen_side(side))
        && rooks.is_square_set(squares.queen_side_rook)
        && squares
            .queen_side_path
            .iter()
            .all(|&sq| !occupancy.is_square_set(sq))
        && squares.queen_side_path[..2]
            .iter()
            .all(|&sq| !position.is_attacked(sq, opp_side))
    {
        moves.push(Move::with_kind(
            squares.king,
            squares.queen_side_path[1],
            MoveKind::CastleQueenSide,
        ));
    }
}

pub(super) fn gen_pseudo_legal_moves(position: &Position, tables: &AttackTables) -> MoveList {
    let mut moves = MoveList::new();
    let side = position.to_move();
    let friendly_pieces = position.side(side);
    let occupancy = position.occupancy();

    gen_pawn_moves(position, tables, &mut moves);

    for piece in [
        Piece::Knight,
        Piece::Bishop,
        Piece::Rook,
        Piece::Queen,
        Piece::King,
    ] {
        for src in position.pieces(piece, side).squares() {
            let moves_bb = match piece {
                Piece::Knight => tables.knight_attacks(src),
                Piece::Bishop => tables.bishop_attacks(src, occupancy),
                Piece::Rook => tables.rook_attacks(src, occupancy),
                Piece::Queen => tables.queen_attacks(src, occupancy),
                Piece::King => tables.king_attacks(src),
                Piece::Pawn => BitBoard::empty(),
            };
            for dest in (moves_bb & !friendly_pieces).squares() {
                moves.push(Move::new(src, dest));
            }
        }
    }

    gen_castling_moves(position, &mut moves);

    moves
}

/// Filters pseudo-legal moves to those that don't leave the mover's king
/// attacked, then orders them best guess first.
pub(super) fn gen_legal_moves(position: &Position, tables: &AttackTables) -> MoveList {
    let side = position.to_move();

    let mut moves: MoveList = gen_pseudo_legal_moves(position, tables)
        .into_iter()
        .filter(|&mve| {
            let next = match position.try_move(mve) {
                Ok(next) => next,
                Err(err) => panic!(
                    "generated move {:?} failed to apply: {}\n{:?}",
                    mve, err, position
                ),
            };
            next.king_square(side)
                .map_or(true, |king| !next.is_attacked(king, side.opposite_side()))
        })
        .collect();

    for mve in moves.iter_mut() {
        mve.value = order_value(position, *mve);
    }
    // Stable, so equal scores keep generation order.
    moves.sort_by_key(|mve| Reverse(mve.value));

    moves
}

/// Ordinal piece weight for ordering only, pawn lowest.
const fn ordering_weight(piece: Piece) -> i32 {
    piece.index() as i32 + 1
}

/// Most valuable victim, least valuable attacker, with promotions scored by
/// the new piece. Quiet moves score zero.
pub(crate) fn order_value(position: &Position, mve: Move) -> i32 {
    let attacker = position
        .piece_at(mve.src)
        .map_or(Piece::Pawn, |(piece, _)| piece);
    let victim = match mve.kind {
        MoveKind::EnPassant => Some(Piece::Pawn),
        _ => position.piece_at(mve.dest).map(|(piece, _)| piece),
    };

    let mut value = 0;
    if let Some(victim) = victim {
        value += 100 * ordering_weight(victim) - ordering_weight(attacker);
    }
    if let Some(promotion) = mve.promotion() {
        value += 100 * ordering_weight(promotion);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::move_gen::attack_tables;
    use crate::position::START_FEN;
    use std::collections::HashSet;
    use test_case::test_case;
    use testresult::TestResult;

    macro_rules! assert_eq_collections {
        ($coll_a:expr, $coll_b:expr) => {
            let set_a: HashSet<_> = HashSet::from_iter($coll_a.iter().cloned());
            let set_b: HashSet<_> = HashSet::from_iter($coll_b.iter().cloned());

            let mut diff_a_b: Vec<_> = set_a.difference(&set_b).cloned().collect();
            let mut diff_b_a: Vec<_> = set_b.difference(&set_a).cloned().collect();
            diff_a_b.sort_by_key(|mve: &Move| (mve.src, mve.dest));
            diff_b_a.sort_by_key(|mve: &Move| (mve.src, mve.dest));

            if !diff_a_b.is_empty() || !diff_b_a.is_empty() {
                panic!(
                    "collections don't have the same elements.\
                       \nin {} but not {}: {:?}.\
                       \nin {} but not {}: {:?}.",
                    stringify!($coll_a),
                    stringify!($coll_b),
                    diff_a_b,
                    stringify!($coll_b),
                    stringify!($coll_a),
                    diff_b_a,
                );
            }
        };
    }

    fn double(src: Square, dest: Square) -> Move {
        Move::with_kind(src, dest, MoveKind::DoublePawnPush)
    }

    #[test_case(START_FEN, vec![
        Move::new(A2, A3), double(A2, A4),
        Move::new(B2, B3), double(B2, B4),
        Move::new(C2, C3), double(C2, C4),
        Move::new(D2, D3), double(D2, D4),
        Move::new(E2, E3), double(E2, E4),
        Move::new(F2, F3), double(F2, F4),
        Move::new(G2, G3), double(G2, G4),
        Move::new(H2, H3), double(H2, H4),
        Move::new(B1, A3), Move::new(B1, C3),
        Move::new(G1, F3), Move::new(G1, H3),
    ] ; "start")]
    #[test_case("8/8/p7/1p1p4/1P6/P1P3kp/5p2/1b5K w - - 0 51", vec![
        Move::new(C3, C4), Move::new(A3, A4),
    ] ; "pawns only")]
    #[test_case("8/8/8/8/k2Pp3/8/8/7K b - d3 0 1", vec![
        Move::new(A4, A5), Move::new(A4, B5),
        Move::new(A4, A3), Move::new(A4, B3),
        Move::new(A4, B4),
        Move::new(E4, E3), Move::with_kind(E4, D3, MoveKind::EnPassant),
    ] ; "en passant")]
    #[test_case("8/8/4k3/8/8/4R3/8/7K b - - 0 1", vec![
        Move::new(E6, D7), Move::new(E6, F7),
        Move::new(E6, D6), Move::new(E6, F6),
        Move::new(E6, D5), Move::new(E6, F5),
    ] ; "king cant move into check")]
    #[test_case("8/8/4k3/8/5N2/8/3b4/7K b - - 0 1", vec![
        Move::new(E6, E7), Move::new(E6, E5),
        Move::new(E6, D7), Move::new(E6, F7),
        Move::new(E6, D6), Move::new(E6, F6),
        Move::new(E6, F5), Move::new(D2, F4),
    ] ; "capture checker")]
    #[test_case("k7/6r1/8/8/8/R7/8/7K b - - 0 1", vec![
        Move::new(A8, B8), Move::new(A8, B7),
        Move::new(G7, A7),
    ] ; "block checker")]
    #[test_case("8/8/4k3/6N1/8/4R3/3b4/7K b - - 0 1", vec![
        Move::new(E6, D6), Move::new(E6, F6),
        Move::new(E6, D5), Move::new(E6, F5),
        Move::new(E6, D7),
    ] ; "double check")]
    #[test_case("8/8/8/2k5/3Pp3/8/8/7K b - d3 0 1", vec![
        Move::new(C5, B6), Move::new(C5, D6),
        Move::new(C5, B5), Move::new(C5, D5),
        Move::new(C5, B4), Move::new(C5, D4),
        Move::new(C5, C6), Move::new(C5, C4),
        Move::with_kind(E4, D3, MoveKind::EnPassant),
    ] ; "en passant capture to end check")]
    #[test_case("7k/8/7r/8/7Q/8/8/K7 b - - 0 1", vec![
        Move::new(H8, G7), Move::new(H8, H7),
        Move::new(H8, G8),
        Move::new(H6, H7), Move::new(H6, H5),
        Move::new(H6, H4),
    ] ; "cant move out of pin file")]
    #[test_case("k7/1r6/8/3Q4/8/8/8/7K b - - 0 1", vec![
        Move::new(A8, B8), Move::new(A8, A7),
    ] ; "cant move out of pin diagonal")]
    #[test_case("8/8/8/8/k2Pp2R/8/8/7K b - d3 0 1", vec![
        Move::new(A4, A5), Move::new(A4, B5),
        Move::new(A4, A3), Move::new(A4, B3),
        Move::new(A4, B4),
        Move::new(E4, E3),
    ] ; "prevent en passant discovered check")]
    #[test_case("4k3/8/8/8/8/8/P6P/R3K2R w KQ - 0 1", vec![
        Move::new(E1, F1), Move::new(E1, D1),
        Move::new(E1, F2), Move::new(E1, D2),
        Move::new(E1, E2),
        Move::with_kind(E1, G1, MoveKind::CastleKingSide),
        Move::with_kind(E1, C1, MoveKind::CastleQueenSide),
        Move::new(A1, B1), Move::new(A1, C1),
        Move::new(A1, D1), Move::new(H1, G1),
        Move::new(H1, F1),
        Move::new(A2, A3), double(A2, A4),
        Move::new(H2, H3), double(H2, H4),
    ] ; "white castling")]
    #[test_case("4k3/8/8/8/8/3bb3/P6P/R3K2R w KQ - 0 1", vec![
        Move::new(E1, D1),
        Move::new(A1, B1), Move::new(A1, C1),
        Move::new(A1, D1), Move::new(H1, G1),
        Move::new(H1, F1),
        Move::new(A2, A3), double(A2, A4),
        Move::new(H2, H3), double(H2, H4),
    ] ; "white castling cant through check")]
    #[test_case("r3k2r/p6p/8/8/8/8/8/4K3 b kq - 0 1", vec![
        Move::new(E8, F8), Move::new(E8, D8),
        Move::new(E8, F7), Move::new(E8, D7),
        Move::new(E8, E7),
        Move::with_kind(E8, G8, MoveKind::CastleKingSide),
        Move::with_kind(E8, C8, MoveKind::CastleQueenSide),
        Move::new(A8, B8), Move::new(A8, C8),
        Move::new(A8, D8), Move::new(H8, G8),
        Move::new(H8, F8),
        Move::new(A7, A6), double(A7, A5),
        Move::new(H7, H6), double(H7, H5),
    ] ; "black castling")]
    #[test_case("1r2k3/8/8/8/8/8/8/4K3 b q - 0 1", vec![
        Move::new(E8, F8), Move::new(E8, D8),
        Move::new(E8, F7), Move::new(E8, D7),
        Move::new(E8, E7),
        Move::new(B8, A8), Move::new(B8, C8), Move::new(B8, D8),
        Move::new(B8, B7), Move::new(B8, B6), Move::new(B8, B5),
        Move::new(B8, B4), Move::new(B8, B3), Move::new(B8, B2),
        Move::new(B8, B1),
    ] ; "castling needs the rook at home")]
    #[test_case("4k3/1P6/8/8/8/8/8/4K3 w - - 0 1", vec![
        Move::new(E1, D1), Move::new(E1, F1),
        Move::new(E1, D2), Move::new(E1, E2), Move::new(E1, F2),
        Move::with_promotion(B7, B8, Piece::Knight),
        Move::with_promotion(B7, B8, Piece::Bishop),
        Move::with_promotion(B7, B8, Piece::Rook),
        Move::with_promotion(B7, B8, Piece::Queen),
    ] ; "promotion")]
    fn test_gen_moves(fen: &str, want: Vec<Move>) -> TestResult {
        let position = Position::from_fen(fen)?;
        let got = gen_legal_moves(&position, attack_tables());
        assert_eq_collections!(got, want);
        assert_eq!(got.len(), want.len(), "duplicate moves generated");
        Ok(())
    }

    #[test]
    fn test_en_passant_needs_pawn_behind_target() -> TestResult {
        // Target set but no black pawn on d4.
        let position = Position::from_fen("4k3/8/8/8/4P3/8/8/4K3 b - d3 0 1")?;
        let moves = gen_legal_moves(&position, attack_tables());
        assert!(moves.iter().all(|mve| mve.kind != MoveKind::EnPassant));
        Ok(())
    }

    #[test]
    fn test_captures_ordered_first() -> TestResult {
        // Pawn takes queen beats rook takes knight beats quiet moves.
        let position = Position::from_fen("4k3/8/3q4/4P3/8/1n6/8/1R2K3 w - - 0 1")?;
        let moves = gen_legal_moves(&position, attack_tables());

        assert_eq!(moves[0], Move::new(E5, D6));
        assert_eq!(moves[1], Move::new(B1, B3));
        assert!(moves[2..].iter().all(|mve| mve.value == 0));
        assert!(moves.windows(2).all(|pair| pair[0].value >= pair[1].value));
        Ok(())
    }

    #[test]
    fn test_pseudo_legal_includes_self_check() -> TestResult {
        let position = Position::from_fen("8/8/4k3/8/8/4R3/8/7K b - - 0 1")?;
        let tables = attack_tables();
        let pseudo = gen_pseudo_legal_moves(&position, tables);
        let legal = gen_legal_moves(&position, tables);

        assert!(pseudo.contains(&Move::new(E6, E7)));
        assert!(!legal.contains(&Move::new(E6, E7)));
        Ok(())
    }
}

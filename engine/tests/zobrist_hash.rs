use gambit::{GenerateMoves, Position, ZobristHash, MOVE_GEN};
use test_case::test_case;
use testresult::TestResult;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
const POSITION_3: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";

#[test_case(gambit::START_FEN, 3)]
#[test_case(KIWIPETE, 2)]
#[test_case(POSITION_3, 4)]
fn test_zobrist_hash_perft(fen: &str, max_depth: usize) -> TestResult {
    zobrist_hash_perft_helper(&Position::from_fen(fen)?, max_depth, MOVE_GEN);
    Ok(())
}

#[test_case(gambit::START_FEN, 5)]
#[test_case(KIWIPETE, 4)]
#[test_case(POSITION_3, 6)]
#[ignore]
fn test_zobrist_hash_perft_long(fen: &str, max_depth: usize) -> TestResult {
    zobrist_hash_perft_helper(&Position::from_fen(fen)?, max_depth, MOVE_GEN);
    Ok(())
}

fn zobrist_hash_perft_helper(position: &Position, depth: usize, move_gen: impl GenerateMoves + Copy) {
    if depth == 0 {
        return;
    }

    for mve in move_gen.gen_moves(position) {
        let child = position.make_move(mve).unwrap();

        // Incremental hash must match one generated from scratch.
        assert_eq!(
            ZobristHash::of_position(&child),
            child.zobrist_hash,
            "incremental hash differs after {:?}, fen=`{}`",
            mve,
            child.to_fen()
        );
        assert_ne!(child.zobrist_hash, position.zobrist_hash);

        zobrist_hash_perft_helper(&child, depth - 1, move_gen);
    }
}

#[test]
fn test_transposition_same_hash() -> TestResult {
    let mut by_knights = Position::start();
    for notation in ["g1f3", "g8f6", "b1c3", "b8c6"] {
        by_knights = by_knights.make_move(by_knights.parse_move(notation)?)?;
    }
    let mut other_order = Position::start();
    for notation in ["b1c3", "b8c6", "g1f3", "g8f6"] {
        other_order = other_order.make_move(other_order.parse_move(notation)?)?;
    }
    assert_eq!(by_knights.zobrist_hash, other_order.zobrist_hash);

    let from_fen = Position::from_fen(&by_knights.to_fen())?;
    assert_eq!(from_fen.zobrist_hash, by_knights.zobrist_hash);
    Ok(())
}

#[test]
fn test_en_passant_and_castling_change_hash() -> TestResult {
    let with_ep = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1")?;
    let without_ep = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - - 0 1")?;
    assert_ne!(with_ep.zobrist_hash, without_ep.zobrist_hash);

    let castle = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1")?;
    let no_castle = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w Kkq - 0 1")?;
    assert_ne!(castle.zobrist_hash, no_castle.zobrist_hash);
    Ok(())
}

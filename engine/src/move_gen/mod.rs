mod all_pieces;
mod leaping_pieces;
mod magic_bitboard;
mod traits;

use std::sync::LazyLock;

use crate::bitboard::{BitBoard, Square};
use crate::position::{Position, Side};

use self::leaping_pieces::LEAPING_PIECES;
pub use self::magic_bitboard::{
    MagicTable, MagicTableError, Slider, BISHOP_MAGICS, ROOK_MAGICS,
};
pub use self::traits::{GenerateMoves, MoveList};

/// Every attack lookup the engine does. Leaper tables are computed at compile
/// time; the slider tables are built on first use.
pub struct AttackTables {
    rook: MagicTable,
    bishop: MagicTable,
}

impl AttackTables {
    pub fn new() -> Result<Self, MagicTableError> {
        Ok(Self {
            rook: MagicTable::generate(Slider::Rook, &ROOK_MAGICS)?,
            bishop: MagicTable::generate(Slider::Bishop, &BISHOP_MAGICS)?,
        })
    }

    pub fn knight_attacks(&self, square: Square) -> BitBoard {
        LEAPING_PIECES.knight_atks(square)
    }

    pub fn king_attacks(&self, square: Square) -> BitBoard {
        LEAPING_PIECES.king_atks(square)
    }

    /// Squares a pawn of `side` on `square` captures on.
    pub fn pawn_attacks(&self, square: Square, side: Side) -> BitBoard {
        LEAPING_PIECES.pawn_atks(square, side)
    }

    pub fn rook_attacks(&self, square: Square, occupancy: BitBoard) -> BitBoard {
        self.rook.attacks(square, occupancy)
    }

    pub fn bishop_attacks(&self, square: Square, occupancy: BitBoard) -> BitBoard {
        self.bishop.attacks(square, occupancy)
    }

    pub fn queen_attacks(&self, square: Square, occupancy: BitBoard) -> BitBoard {
        self.rook_attacks(square, occupancy) | self.bishop_attacks(square, occupancy)
    }
}

static ATTACK_TABLES: LazyLock<AttackTables> = LazyLock::new(|| match AttackTables::new() {
    Ok(tables) => tables,
    // The shipped magics are collision free.
    Err(err) => panic!("attack tables: {}", err),
});

/// Process wide attack tables. Call once at startup to pay the build cost
/// up front.
pub fn attack_tables() -> &'static AttackTables {
    &ATTACK_TABLES
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MagicBitboardMoveGen;

impl GenerateMoves for MagicBitboardMoveGen {
    fn gen_moves(&self, position: &Position) -> MoveList {
        all_pieces::gen_legal_moves(position, attack_tables())
    }

    fn gen_pseudo_legal_moves(&self, position: &Position) -> MoveList {
        all_pieces::gen_pseudo_legal_moves(position, attack_tables())
    }
}

pub static MOVE_GEN: MagicBitboardMoveGen = MagicBitboardMoveGen;

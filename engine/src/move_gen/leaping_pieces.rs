use crate::bitboard::{BitBoard, Square};
use crate::position::Side;

/// (rank, file) deltas.
type Offsets = [(i8, i8)];

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

const WHITE_PAWN_ATK_OFFSETS: [(i8, i8); 2] = [(1, 1), (1, -1)];
const BLACK_PAWN_ATK_OFFSETS: [(i8, i8); 2] = [(-1, 1), (-1, -1)];

pub(crate) struct LeapingPieces {
    knight: [BitBoard; 64],
    king: [BitBoard; 64],
    pawn_atks: [[BitBoard; 64]; 2],
}

impl LeapingPieces {
    pub(crate) const fn knight_atks(&self, square: Square) -> BitBoard {
        self.knight[square as usize]
    }

    pub(crate) const fn king_atks(&self, square: Square) -> BitBoard {
        self.king[square as usize]
    }

    pub(crate) const fn pawn_atks(&self, square: Square, side: Side) -> BitBoard {
        self.pawn_atks[side as usize][square as usize]
    }
}

/// Destinations that would wrap around a board edge are dropped by
/// [`Square::offset`].
const fn calc_square_to_atks_table(offsets: &Offsets) -> [BitBoard; 64] {
    let mut bbs = [BitBoard::empty(); 64];

    let mut sq_idx = 0;
    while sq_idx < bbs.len() {
        let sq = Square::from_u8(sq_idx as u8);

        let mut sq_bb = BitBoard::empty();
        let mut offset_idx = 0;
        while offset_idx < offsets.len() {
            let (rank_delta, file_delta) = offsets[offset_idx];
            if let Some(dest) = sq.offset(rank_delta, file_delta) {
                sq_bb = sq_bb.const_bit_or(BitBoard::from_square(dest));
            }
            offset_idx += 1;
        }
        bbs[sq_idx] = sq_bb;
        sq_idx += 1;
    }

    bbs
}

pub(crate) static LEAPING_PIECES: LeapingPieces = LeapingPieces {
    knight: calc_square_to_atks_table(&KNIGHT_OFFSETS),
    king: calc_square_to_atks_table(&KING_OFFSETS),
    pawn_atks: [
        calc_square_to_atks_table(&WHITE_PAWN_ATK_OFFSETS),
        calc_square_to_atks_table(&BLACK_PAWN_ATK_OFFSETS),
    ],
};

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::bitboard::{BitBoard, Square};
use crate::position::{CastlingRights, Piece, Position, Side, State};

const RNG_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Standard Xorshift
const fn xorshift(mut x: u64) -> u64 {
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}

struct ZobristKeys {
    pieces: [u64; 64 * 12],
    black_to_move: u64,
    /// One key per combination of the four castling bits.
    castling_rights: [u64; 16],
    en_passant_file: [u64; 8],
}

impl ZobristKeys {
    const fn init() -> Self {
        let mut rng = RNG_SEED;

        let mut pieces = [0; 64 * 12];
        let mut i = 0;
        while i < pieces.len() {
            rng = xorshift(rng);
            pieces[i] = rng;
            i += 1;
        }

        rng = xorshift(rng);
        let black_to_move = rng;

        // An empty set of rights hashes to zero.
        let mut castling_rights = [0; 16];
        let mut i = 1;
        while i < castling_rights.len() {
            rng = xorshift(rng);
            castling_rights[i] = rng;
            i += 1;
        }

        let mut en_passant_file = [0; 8];
        let mut i = 0;
        while i < en_passant_file.len() {
            rng = xorshift(rng);
            en_passant_file[i] = rng;
            i += 1;
        }

        Self {
            pieces,
            black_to_move,
            castling_rights,
            en_passant_file,
        }
    }
}

static ZOBRIST_KEYS: ZobristKeys = ZobristKeys::init();

const fn piece_key_idx(square: Square, piece: Piece, side: Side) -> usize {
    (side as usize * 6 + piece as usize) * 64 + square as usize
}

/// 64 bit position fingerprint, kept up to date incrementally as moves are
/// applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub struct ZobristHash(u64);

impl fmt::Display for ZobristHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl ZobristHash {
    pub fn value(self) -> u64 {
        self.0
    }

    /// Recomputes the hash from scratch, ignoring the one the position carries.
    pub fn of_position(position: &Position) -> ZobristHash {
        Self::calculate(&position.pieces, &position.state)
    }

    pub(crate) fn calculate(pieces: &[BitBoard; 12], state: &State) -> ZobristHash {
        let mut hash = ZobristHash(0);
        for side in Side::iter() {
            for piece in Piece::iter() {
                for square in pieces[side as usize * 6 + piece as usize].squares() {
                    hash.toggle_piece(square, piece, side);
                }
            }
        }

        if state.to_move == Side::Black {
            hash.flip_side_to_move();
        }
        hash.flip_castling_rights(state.castling_rights);
        if let Some(en_passant_target) = state.en_passant_target {
            hash.flip_en_passant_file(en_passant_target);
        }

        hash
    }

    /// Adds or removes a piece; XOR is its own inverse.
    pub(crate) fn toggle_piece(&mut self, square: Square, piece: Piece, side: Side) {
        self.0 ^= ZOBRIST_KEYS.pieces[piece_key_idx(square, piece, side)];
    }

    pub(crate) fn flip_side_to_move(&mut self) {
        self.0 ^= ZOBRIST_KEYS.black_to_move;
    }

    pub(crate) fn flip_castling_rights(&mut self, rights: CastlingRights) {
        self.0 ^= ZOBRIST_KEYS.castling_rights[rights.bits() as usize];
    }

    pub(crate) fn flip_en_passant_file(&mut self, en_passant_target: Square) {
        self.0 ^= ZOBRIST_KEYS.en_passant_file[en_passant_target.file() as usize];
    }
}

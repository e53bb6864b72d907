use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, FromRepr};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SquareParseError {
    #[error("square: want 2 chars got {0:?}")]
    Length(String),

    #[error("square file: want a-h got {0}")]
    File(char),

    #[error("square rank: want 1-8 got {0}")]
    Rank(char),
}

#[rustfmt::skip]
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, FromRepr, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum Square {
    A1, B1, C1, D1, E1, F1, G1, H1,
    A2, B2, C2, D2, E2, F2, G2, H2,
    A3, B3, C3, D3, E3, F3, G3, H3,
    A4, B4, C4, D4, E4, F4, G4, H4,
    A5, B5, C5, D5, E5, F5, G5, H5,
    A6, B6, C6, D6, E6, F6, G6, H6,
    A7, B7, C7, D7, E7, F7, G7, H7,
    A8, B8, C8, D8, E8, F8, G8, H8,
}

impl Square {
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Rank 0 is the first rank.
    pub const fn rank(self) -> u8 {
        self as u8 / 8
    }

    pub const fn file(self) -> u8 {
        self as u8 % 8
    }

    pub(crate) const fn from_u8(idx: u8) -> Square {
        match Square::from_repr(idx) {
            Some(sq) => sq,
            None => panic!("square out of bounds"),
        }
    }

    pub const fn from_rank_file(rank: i8, file: i8) -> Option<Square> {
        if rank < 0 || rank > 7 || file < 0 || file > 7 {
            return None;
        }
        Square::from_repr((rank * 8 + file) as u8)
    }

    /// Steps by a rank/file delta. Returns None rather than wrapping around a
    /// board edge.
    pub const fn offset(self, rank_delta: i8, file_delta: i8) -> Option<Square> {
        Square::from_rank_file(self.rank() as i8 + rank_delta, self.file() as i8 + file_delta)
    }

    #[rustfmt::skip]
    pub const fn list_white_perspective() -> [Square; 64] {
        use Square::*;
        [
            A8, B8, C8, D8, E8, F8, G8, H8,
            A7, B7, C7, D7, E7, F7, G7, H7,
            A6, B6, C6, D6, E6, F6, G6, H6,
            A5, B5, C5, D5, E5, F5, G5, H5,
            A4, B4, C4, D4, E4, F4, G4, H4,
            A3, B3, C3, D3, E3, F3, G3, H3,
            A2, B2, C2, D2, E2, F2, G2, H2,
            A1, B1, C1, D1, E1, F1, G1, H1,
        ]
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = (b'a' + self.file()) as char;
        let rank = (b'1' + self.rank()) as char;
        write!(f, "{}{}", file, rank)
    }
}

impl FromStr for Square {
    type Err = SquareParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(file_ch), Some(rank_ch), None) = (chars.next(), chars.next(), chars.next())
        else {
            return Err(SquareParseError::Length(s.to_string()));
        };

        let file = match file_ch.to_ascii_lowercase() {
            ch @ 'a'..='h' => (ch as u8 - b'a') as i8,
            _ => return Err(SquareParseError::File(file_ch)),
        };
        let rank = match rank_ch {
            '1'..='8' => (rank_ch as u8 - b'1') as i8,
            _ => return Err(SquareParseError::Rank(rank_ch)),
        };

        Square::from_rank_file(rank, file).ok_or(SquareParseError::Length(s.to_string()))
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Default, Hash, Deserialize, Serialize)]
pub struct BitBoard(u64);

impl BitBoard {
    pub const fn empty() -> Self {
        BitBoard(0)
    }

    pub const fn from_square(square: Square) -> Self {
        BitBoard(1 << (square as u8))
    }

    pub fn from_squares(squares: &[Square]) -> Self {
        BitBoard(squares.iter().fold(0, |board, sq| board | 1 << (*sq as u8)))
    }

    pub const fn from_val(val: u64) -> Self {
        BitBoard(val)
    }

    pub const fn to_val(self) -> u64 {
        self.0
    }

    pub fn to_squares(self) -> Vec<Square> {
        self.squares().collect()
    }

    /// Squares set on this board, lowest index first.
    pub fn squares(mut self) -> impl Iterator<Item = Square> {
        std::iter::from_fn(move || {
            if self.is_empty() {
                None
            } else {
                Some(self.pop_lsb())
            }
        })
    }

    pub(crate) fn toggle_square(&mut self, square: Square) {
        self.0 ^= 1 << square as u64
    }

    pub(crate) fn move_piece(&mut self, src: Square, dest: Square) {
        self.clear_square(src);
        self.set_square(dest);
    }

    pub(crate) fn set_square(&mut self, square: Square) {
        self.0 |= 1 << square as u64
    }

    pub(crate) fn clear_square(&mut self, square: Square) {
        self.0 &= !(1 << square as u64)
    }

    pub const fn is_square_set(&self, square: Square) -> bool {
        self.0 & 1 << (square as u64) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn get_lsb(&self) -> Square {
        debug_assert!(self.0 != 0, "want != 0, got 0");
        Square::from_u8(self.0.trailing_zeros() as u8)
    }

    pub fn pop_lsb(&mut self) -> Square {
        let lsb = self.get_lsb();
        self.0 &= self.0 - 1;
        lsb
    }

    pub const fn num_squares_set(self) -> u32 {
        self.0.count_ones()
    }

    pub(crate) const fn const_bit_or(self, other: BitBoard) -> BitBoard {
        BitBoard(self.0 | other.0)
    }
}

impl BitOr for BitBoard {
    type Output = BitBoard;

    fn bitor(self, other: BitBoard) -> BitBoard {
        BitBoard(self.0 | other.0)
    }
}

impl BitOrAssign for BitBoard {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0
    }
}

impl BitAnd for BitBoard {
    type Output = BitBoard;

    fn bitand(self, other: BitBoard) -> BitBoard {
        BitBoard(self.0 & other.0)
    }
}

impl BitAndAssign for BitBoard {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0
    }
}

impl BitXor for BitBoard {
    type Output = BitBoard;

    fn bitxor(self, other: BitBoard) -> BitBoard {
        BitBoard(self.0 ^ other.0)
    }
}

impl BitXorAssign for BitBoard {
    fn bitxor_assign(&mut self, rhs: Self) {
        self.0 ^= rhs.0
    }
}

impl Not for BitBoard {
    type Output = BitBoard;

    fn not(self) -> Self::Output {
        BitBoard(!self.0)
    }
}

impl fmt::Debug for BitBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut board_str = String::with_capacity(64 + 7);

        for rank in (0..8).rev() {
            for file in 0..8 {
                let square = Square::from_u8(rank * 8 + file);
                let ch = if self.is_square_set(square) { 'X' } else { '.' };
                board_str.push(ch);
            }
            if rank != 0 {
                board_str.push('\n');
            }
        }

        write!(f, "{}", board_str)
    }
}

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::bitboard::{Square, SquareParseError};
use crate::position::Piece;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MoveParseError {
    #[error("move: want 4 or 5 chars got {0:?}")]
    Length(String),

    #[error("move square: {0}")]
    Square(#[from] SquareParseError),

    #[error("move kind suffix: got {0}")]
    Suffix(char),

    #[error("move {0} is not legal in this position")]
    Illegal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Deserialize, Serialize)]
pub enum MoveKind {
    Normal,
    DoublePawnPush,
    EnPassant,
    CastleKingSide,
    CastleQueenSide,
    PromoteKnight,
    PromoteBishop,
    PromoteRook,
    PromoteQueen,
}

impl MoveKind {
    pub fn promotion(self) -> Option<Piece> {
        match self {
            MoveKind::PromoteKnight => Some(Piece::Knight),
            MoveKind::PromoteBishop => Some(Piece::Bishop),
            MoveKind::PromoteRook => Some(Piece::Rook),
            MoveKind::PromoteQueen => Some(Piece::Queen),
            _ => None,
        }
    }

    pub(crate) fn promote_to(piece: Piece) -> Option<MoveKind> {
        match piece {
            Piece::Knight => Some(MoveKind::PromoteKnight),
            Piece::Bishop => Some(MoveKind::PromoteBishop),
            Piece::Rook => Some(MoveKind::PromoteRook),
            Piece::Queen => Some(MoveKind::PromoteQueen),
            Piece::Pawn | Piece::King => None,
        }
    }

    /// Letter printed after origin+destination. Promotions use the lowercase
    /// piece letter so they read like coordinate notation.
    pub fn suffix(self) -> Option<char> {
        match self {
            MoveKind::Normal => None,
            MoveKind::DoublePawnPush => Some('d'),
            MoveKind::EnPassant => Some('e'),
            MoveKind::CastleKingSide => Some('K'),
            MoveKind::CastleQueenSide => Some('Q'),
            MoveKind::PromoteKnight => Some('n'),
            MoveKind::PromoteBishop => Some('b'),
            MoveKind::PromoteRook => Some('r'),
            MoveKind::PromoteQueen => Some('q'),
        }
    }

    pub fn from_suffix(ch: char) -> Result<MoveKind, MoveParseError> {
        match ch {
            'd' => Ok(MoveKind::DoublePawnPush),
            'e' => Ok(MoveKind::EnPassant),
            'K' => Ok(MoveKind::CastleKingSide),
            'Q' => Ok(MoveKind::CastleQueenSide),
            'n' => Ok(MoveKind::PromoteKnight),
            'b' => Ok(MoveKind::PromoteBishop),
            'r' => Ok(MoveKind::PromoteRook),
            'q' => Ok(MoveKind::PromoteQueen),
            _ => Err(MoveParseError::Suffix(ch)),
        }
    }
}

/// A move from one square to another. `value` is scratch space for move
/// ordering and root search scores; it takes no part in equality or hashing.
#[derive(Clone, Copy, Eq, Deserialize, Serialize)]
pub struct Move {
    pub src: Square,
    pub dest: Square,
    pub kind: MoveKind,
    pub value: i32,
}

impl Move {
    pub fn new(src: Square, dest: Square) -> Move {
        Self::with_kind(src, dest, MoveKind::Normal)
    }

    pub fn with_kind(src: Square, dest: Square, kind: MoveKind) -> Move {
        Self {
            src,
            dest,
            kind,
            value: 0,
        }
    }

    pub fn with_promotion(src: Square, dest: Square, promotion: Piece) -> Move {
        let kind = MoveKind::promote_to(promotion).unwrap_or(MoveKind::Normal);
        Self::with_kind(src, dest, kind)
    }

    pub fn promotion(&self) -> Option<Piece> {
        self.kind.promotion()
    }

    pub fn is_castle(&self) -> bool {
        matches!(
            self.kind,
            MoveKind::CastleKingSide | MoveKind::CastleQueenSide
        )
    }

    /// Same origin and destination, ignoring kind.
    pub(crate) fn same_squares(&self, other: &Move) -> bool {
        self.src == other.src && self.dest == other.dest
    }
}

impl PartialEq for Move {
    fn eq(&self, other: &Self) -> bool {
        self.src == other.src && self.dest == other.dest && self.kind == other.kind
    }
}

impl Hash for Move {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.src.hash(state);
        self.dest.hash(state);
        self.kind.hash(state);
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dest)?;
        if self.kind != MoveKind::Normal {
            write!(f, " ({:?})", self.kind)?;
        }
        Ok(())
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.src, self.dest)?;
        if let Some(suffix) = self.kind.suffix() {
            write!(f, "{}", suffix)?;
        }
        Ok(())
    }
}

/// Parses origin+destination with an optional kind suffix. A bare four char
/// move parses as [`MoveKind::Normal`]; use [`crate::Position::parse_move`] to
/// resolve the kind against a position.
impl FromStr for Move {
    type Err = MoveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_ascii() || !(4..=5).contains(&s.len()) {
            return Err(MoveParseError::Length(s.to_string()));
        }
        let src = s[0..2].parse()?;
        let dest = s[2..4].parse()?;
        let kind = match s.chars().nth(4) {
            Some(ch) => MoveKind::from_suffix(ch)?,
            None => MoveKind::Normal,
        };
        Ok(Move::with_kind(src, dest, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitboard::Square::*;
    use strum::IntoEnumIterator;
    use test_case::test_case;

    #[test_case(Move::new(A1, G7), "a1g7" ; "normal")]
    #[test_case(Move::with_kind(E2, E4, MoveKind::DoublePawnPush), "e2e4d" ; "double push")]
    #[test_case(Move::with_kind(E1, G1, MoveKind::CastleKingSide), "e1g1K" ; "castle king side")]
    #[test_case(Move::with_kind(E8, C8, MoveKind::CastleQueenSide), "e8c8Q" ; "castle queen side")]
    #[test_case(Move::with_promotion(F7, F8, Piece::Queen), "f7f8q" ; "promotion")]
    fn test_move_display(mve: Move, want: &str) {
        assert_eq!(mve.to_string(), want);
    }

    #[test_case(Move::new(A1, G7), "a1 -> g7" ; "no kind")]
    #[test_case(Move::with_promotion(F7, B8, Piece::Queen), "f7 -> b8 (PromoteQueen)" ; "with promotion")]
    fn test_move_debug(mve: Move, want: &str) {
        assert_eq!(format!("{:?}", mve), want);
    }

    #[test]
    fn test_suffix_round_trip() {
        for kind in MoveKind::iter() {
            let mve = Move::with_kind(B7, B8, kind);
            assert_eq!(mve.to_string().parse::<Move>(), Ok(mve));
        }
    }

    #[test_case("e2e", MoveParseError::Length("e2e".to_string()) ; "too short")]
    #[test_case("e2e4x", MoveParseError::Suffix('x') ; "bad suffix")]
    #[test_case("z2e4", MoveParseError::Square(SquareParseError::File('z')) ; "bad square")]
    fn test_move_from_str_err(input: &str, want: MoveParseError) {
        assert_eq!(input.parse::<Move>(), Err(want));
    }

    #[test]
    fn test_value_ignored_by_eq() {
        let mut scored = Move::new(D2, D3);
        scored.value = 400;
        assert_eq!(scored, Move::new(D2, D3));
    }
}

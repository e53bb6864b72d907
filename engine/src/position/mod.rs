use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use crate::bitboard::Square::*;
use crate::bitboard::{BitBoard, Square};
use crate::chess_move::{Move, MoveKind, MoveParseError};
use crate::move_gen::{attack_tables, GenerateMoves, MOVE_GEN};

mod fen;
mod zobrist_hash;

pub use fen::FenParseError;
pub use zobrist_hash::ZobristHash;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PositionError {
    #[error("no piece at {0}")]
    MoveNoPiece(Square),

    #[error("to_move is the other side, for move: {0}")]
    MoveNotToMove(Move),

    #[error("move {0} lands on a friendly piece")]
    MoveOntoOwnPiece(Move),

    #[error("move kind {kind:?} can't be played by a {piece}: {mve}")]
    KindPieceMismatch { mve: Move, kind: MoveKind, piece: Piece },

    #[error("white and black occupancy overlap at {0:?} after {1}")]
    OccupancyOverlap(Vec<Square>, Move),

    #[error("square {0} is set in more than one piece board")]
    PieceOverlap(Square),
}

#[repr(u8)]
#[derive(Debug, PartialEq, Eq, EnumIter, Clone, Copy, Display, Hash, Deserialize, Serialize)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opposite_side(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Rank delta of a pawn push.
    pub(crate) const fn pawn_direction(self) -> i8 {
        match self {
            Side::White => 1,
            Side::Black => -1,
        }
    }
}

#[repr(u8)]
#[derive(
    Debug, PartialEq, Eq, EnumIter, Clone, Copy, Display, Hash, PartialOrd, Ord, Deserialize, Serialize,
)]
pub enum Piece {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl Piece {
    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl From<Piece> for char {
    fn from(piece: Piece) -> char {
        match piece {
            Piece::Pawn => 'p',
            Piece::Knight => 'n',
            Piece::Bishop => 'b',
            Piece::Rook => 'r',
            Piece::Queen => 'q',
            Piece::King => 'k',
        }
    }
}

impl TryFrom<char> for Piece {
    type Error = FenParseError;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase() {
            'p' => Ok(Piece::Pawn),
            'n' => Ok(Piece::Knight),
            'b' => Ok(Piece::Bishop),
            'r' => Ok(Piece::Rook),
            'q' => Ok(Piece::Queen),
            'k' => Ok(Piece::King),
            _ => Err(FenParseError::PieceChar(value)),
        }
    }
}

/// Four independent rights packed into the low nibble.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default, Deserialize, Serialize)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const WHITE_KING_SIDE: u8 = 0b0001;
    pub const WHITE_QUEEN_SIDE: u8 = 0b0010;
    pub const BLACK_KING_SIDE: u8 = 0b0100;
    pub const BLACK_QUEEN_SIDE: u8 = 0b1000;
    pub const ALL: u8 = 0b1111;

    pub const fn new(bits: u8) -> Self {
        Self(bits & Self::ALL)
    }

    pub const fn none() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn has(self, right: u8) -> bool {
        self.0 & right != 0
    }

    pub(crate) fn remove(&mut self, rights: u8) {
        self.0 &= !rights;
    }

    pub(crate) const fn king_side(side: Side) -> u8 {
        match side {
            Side::White => Self::WHITE_KING_SIDE,
            Side::Black => Self::BLACK_KING_SIDE,
        }
    }

    pub(crate) const fn queen_side(side: Side) -> u8 {
        match side {
            Side::White => Self::WHITE_QUEEN_SIDE,
            Side::Black => Self::BLACK_QUEEN_SIDE,
        }
    }

    /// Rights lost when a piece leaves or lands on `square`: king and rook
    /// home squares.
    const fn cleared_by(square: Square) -> u8 {
        match square {
            A1 => Self::WHITE_QUEEN_SIDE,
            H1 => Self::WHITE_KING_SIDE,
            E1 => Self::WHITE_KING_SIDE | Self::WHITE_QUEEN_SIDE,
            A8 => Self::BLACK_QUEEN_SIDE,
            H8 => Self::BLACK_KING_SIDE,
            E8 => Self::BLACK_KING_SIDE | Self::BLACK_QUEEN_SIDE,
            _ => 0,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Display, Hash, Deserialize, Serialize)]
pub enum GameStatus {
    Ongoing,
    Check,
    Checkmate,
    Stalemate,
    FiftyMoveRule,
    InsufficientMaterial,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::Ongoing | GameStatus::Check)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct State {
    pub to_move: Side,
    pub half_move_clock: u16,
    pub en_passant_target: Option<Square>,
    pub castling_rights: CastlingRights,
    pub full_move_counter: u16,
}

/// An immutable snapshot of a game. Moves never modify a position in place;
/// [`Position::try_move`] and [`Position::make_move`] build a successor.
#[derive(Clone)]
pub struct Position {
    pub state: State,
    pub(crate) pieces: [BitBoard; 12],
    pub(crate) sides: [BitBoard; 2],
    pub(crate) occupancy: BitBoard,
    pub zobrist_hash: ZobristHash,
    status: OnceLock<GameStatus>,
}

const fn piece_board_idx(piece: Piece, side: Side) -> usize {
    side as usize * 6 + piece as usize
}

impl Position {
    pub fn start() -> Self {
        // The start position always parses.
        match Position::from_fen(START_FEN) {
            Ok(position) => position,
            Err(err) => panic!("start position: {}", err),
        }
    }

    pub(crate) fn from_parts(pieces: [BitBoard; 12], state: State) -> Self {
        let mut sides = [BitBoard::empty(); 2];
        for side in Side::iter() {
            for piece in Piece::iter() {
                sides[side as usize] |= pieces[piece_board_idx(piece, side)];
            }
        }
        let zobrist_hash = ZobristHash::calculate(&pieces, &state);

        Self {
            state,
            pieces,
            sides,
            occupancy: sides[0] | sides[1],
            zobrist_hash,
            status: OnceLock::new(),
        }
    }

    pub fn pieces(&self, piece: Piece, side: Side) -> BitBoard {
        self.pieces[piece_board_idx(piece, side)]
    }

    pub fn side(&self, side: Side) -> BitBoard {
        self.sides[side as usize]
    }

    pub fn occupancy(&self) -> BitBoard {
        self.occupancy
    }

    pub fn to_move(&self) -> Side {
        self.state.to_move
    }

    pub fn piece_at(&self, square: Square) -> Option<(Piece, Side)> {
        if !self.occupancy.is_square_set(square) {
            return None;
        }
        let side = if self.sides[Side::White as usize].is_square_set(square) {
            Side::White
        } else {
            Side::Black
        };
        Piece::iter()
            .find(|&piece| self.pieces(piece, side).is_square_set(square))
            .map(|piece| (piece, side))
    }

    pub fn king_square(&self, side: Side) -> Option<Square> {
        let kings = self.pieces(Piece::King, side);
        (!kings.is_empty()).then(|| kings.get_lsb())
    }

    /// True if any piece of `by_side` attacks `square`.
    pub fn is_attacked(&self, square: Square, by_side: Side) -> bool {
        let tables = attack_tables();

        // A pawn of `by_side` attacks `square` exactly when a pawn of the
        // other side on `square` would attack it back.
        let pawns = self.pieces(Piece::Pawn, by_side);
        if !(tables.pawn_attacks(square, by_side.opposite_side()) & pawns).is_empty() {
            return true;
        }

        let knights = self.pieces(Piece::Knight, by_side);
        if !(tables.knight_attacks(square) & knights).is_empty() {
            return true;
        }

        let king = self.pieces(Piece::King, by_side);
        if !(tables.king_attacks(square) & king).is_empty() {
            return true;
        }

        let queens = self.pieces(Piece::Queen, by_side);
        let diagonal = self.pieces(Piece::Bishop, by_side) | queens;
        if !(tables.bishop_attacks(square, self.occupancy) & diagonal).is_empty() {
            return true;
        }

        let orthogonal = self.pieces(Piece::Rook, by_side) | queens;
        !(tables.rook_attacks(square, self.occupancy) & orthogonal).is_empty()
    }

    pub fn is_in_check(&self) -> bool {
        let side = self.state.to_move;
        self.king_square(side)
            .is_some_and(|king_square| self.is_attacked(king_square, side.opposite_side()))
    }

    /// Status of the side to move, computed on first use and cached.
    pub fn status(&self) -> GameStatus {
        *self.status.get_or_init(|| self.calc_status())
    }

    fn calc_status(&self) -> GameStatus {
        let in_check = self.is_in_check();
        let has_moves = !MOVE_GEN.gen_moves(self).is_empty();

        match (in_check, has_moves) {
            (true, false) => GameStatus::Checkmate,
            (false, false) => GameStatus::Stalemate,
            _ if self.state.half_move_clock >= 100 => GameStatus::FiftyMoveRule,
            _ if self.is_insufficient_material() => GameStatus::InsufficientMaterial,
            (true, true) => GameStatus::Check,
            (false, true) => GameStatus::Ongoing,
        }
    }

    /// Draws that don't depend on the move list: the fifty move rule and
    /// insufficient material.
    pub fn is_rule_draw(&self) -> bool {
        self.state.half_move_clock >= 100 || self.is_insufficient_material()
    }

    /// No pawns, rooks or queens, and at most two knights or at most one
    /// bishop on the board.
    fn is_insufficient_material(&self) -> bool {
        let mating_material = [Piece::Pawn, Piece::Rook, Piece::Queen]
            .into_iter()
            .flat_map(|piece| Side::iter().map(move |side| (piece, side)))
            .any(|(piece, side)| !self.pieces(piece, side).is_empty());
        if mating_material {
            return false;
        }

        let count = |piece: Piece| {
            self.pieces(piece, Side::White).num_squares_set()
                + self.pieces(piece, Side::Black).num_squares_set()
        };
        let knights = count(Piece::Knight);
        let bishops = count(Piece::Bishop);

        knights <= 2 || bishops <= 1
    }

    /// Applies `mve` without any legality checks beyond "the right piece is
    /// moving". The move generator is responsible for legality.
    pub fn try_move(&self, mve: Move) -> Result<Position, PositionError> {
        let side = self.state.to_move;
        let opp_side = side.opposite_side();

        let (piece, piece_side) = self
            .piece_at(mve.src)
            .ok_or(PositionError::MoveNoPiece(mve.src))?;
        if piece_side != side {
            return Err(PositionError::MoveNotToMove(mve));
        }
        if self.sides[side as usize].is_square_set(mve.dest) {
            return Err(PositionError::MoveOntoOwnPiece(mve));
        }

        let kind_mismatch = PositionError::KindPieceMismatch {
            mve,
            kind: mve.kind,
            piece,
        };

        let mut next = Position {
            state: self.state.clone(),
            pieces: self.pieces,
            sides: self.sides,
            occupancy: self.occupancy,
            zobrist_hash: self.zobrist_hash,
            status: OnceLock::new(),
        };

        if let Some(ep_target) = next.state.en_passant_target.take() {
            next.zobrist_hash.flip_en_passant_file(ep_target);
        }
        next.state.half_move_clock = next.state.half_move_clock.saturating_add(1);

        match mve.kind {
            MoveKind::Normal => {
                let last_rank = if side == Side::White { 7 } else { 0 };
                if piece == Piece::Pawn && mve.dest.rank() == last_rank {
                    return Err(kind_mismatch);
                }
                let captured = next.capture(mve.dest, opp_side);
                next.move_piece(piece, side, mve.src, mve.dest);
                if piece == Piece::Pawn || captured.is_some() {
                    next.state.half_move_clock = 0;
                }
            }
            MoveKind::DoublePawnPush => {
                if piece != Piece::Pawn {
                    return Err(kind_mismatch);
                }
                next.move_piece(piece, side, mve.src, mve.dest);
                let ep_target = mve.src.offset(side.pawn_direction(), 0).ok_or(kind_mismatch)?;
                next.state.en_passant_target = Some(ep_target);
                next.zobrist_hash.flip_en_passant_file(ep_target);
                next.state.half_move_clock = 0;
            }
            MoveKind::EnPassant => {
                if piece != Piece::Pawn {
                    return Err(kind_mismatch);
                }
                let captured_square = mve
                    .dest
                    .offset(-side.pawn_direction(), 0)
                    .ok_or(kind_mismatch)?;
                next.move_piece(piece, side, mve.src, mve.dest);
                next.remove_piece(Piece::Pawn, opp_side, captured_square);
                next.state.half_move_clock = 0;
            }
            MoveKind::CastleKingSide | MoveKind::CastleQueenSide => {
                if piece != Piece::King {
                    return Err(kind_mismatch);
                }
                let (rook_src, rook_dest) = match (side, mve.kind) {
                    (Side::White, MoveKind::CastleKingSide) => (H1, F1),
                    (Side::White, _) => (A1, D1),
                    (Side::Black, MoveKind::CastleKingSide) => (H8, F8),
                    (Side::Black, _) => (A8, D8),
                };
                next.move_piece(Piece::King, side, mve.src, mve.dest);
                next.move_piece(Piece::Rook, side, rook_src, rook_dest);
            }
            MoveKind::PromoteKnight
            | MoveKind::PromoteBishop
            | MoveKind::PromoteRook
            | MoveKind::PromoteQueen => {
                if piece != Piece::Pawn {
                    return Err(kind_mismatch);
                }
                let promotion = mve.kind.promotion().ok_or(kind_mismatch)?;
                next.capture(mve.dest, opp_side);
                next.remove_piece(Piece::Pawn, side, mve.src);
                next.add_piece(promotion, side, mve.dest);
                next.state.half_move_clock = 0;
            }
        }

        let old_rights = next.state.castling_rights;
        next.state
            .castling_rights
            .remove(CastlingRights::cleared_by(mve.src) | CastlingRights::cleared_by(mve.dest));
        if old_rights != next.state.castling_rights {
            next.zobrist_hash.flip_castling_rights(old_rights);
            next.zobrist_hash
                .flip_castling_rights(next.state.castling_rights);
        }

        if side == Side::Black {
            next.state.full_move_counter = next.state.full_move_counter.saturating_add(1);
        }
        next.state.to_move = opp_side;
        next.zobrist_hash.flip_side_to_move();
        next.occupancy = next.sides[0] | next.sides[1];

        Ok(next)
    }

    /// [`Position::try_move`] followed by an occupancy check and the game
    /// status of the resulting position.
    pub fn make_move(&self, mve: Move) -> Result<Position, PositionError> {
        let next = self.try_move(mve)?;

        let overlap = next.sides[Side::White as usize] & next.sides[Side::Black as usize];
        if !overlap.is_empty() {
            return Err(PositionError::OccupancyOverlap(overlap.to_squares(), mve));
        }
        next.status();

        Ok(next)
    }

    /// Checks the board invariants: sides are disjoint, the aggregate masks
    /// agree with the piece boards, and no square holds two pieces.
    pub fn validate(&self) -> Result<(), PositionError> {
        let overlap = self.sides[0] & self.sides[1];
        if !overlap.is_empty() {
            return Err(PositionError::PieceOverlap(overlap.get_lsb()));
        }

        let mut seen = BitBoard::empty();
        for side in Side::iter() {
            for piece in Piece::iter() {
                let board = self.pieces(piece, side);
                let doubled = seen & board;
                if !doubled.is_empty() {
                    return Err(PositionError::PieceOverlap(doubled.get_lsb()));
                }
                seen |= board;
            }
        }
        if seen != self.occupancy {
            let mismatch = seen ^ self.occupancy;
            return Err(PositionError::PieceOverlap(mismatch.get_lsb()));
        }
        Ok(())
    }

    /// Resolves coordinate notation against the legal moves of this position.
    /// Accepts `e2e4`, `e7e8q` and the kind suffixed form `e2e4d`.
    pub fn parse_move(&self, notation: &str) -> Result<Move, MoveParseError> {
        let parsed: Move = notation.parse()?;
        let moves = MOVE_GEN.gen_moves(self);

        let candidates = moves.iter().filter(|mve| mve.same_squares(&parsed));
        let resolved = match parsed.kind {
            // Bare coordinates on the last rank mean a queen.
            MoveKind::Normal => candidates
                .min_by_key(|mve| match mve.kind.promotion() {
                    Some(Piece::Queen) | None => 0,
                    Some(_) => 1,
                })
                .copied(),
            kind => candidates.copied().find(|mve| mve.kind == kind),
        };

        resolved
            .map(|mut mve| {
                mve.value = 0;
                mve
            })
            .ok_or_else(|| MoveParseError::Illegal(notation.to_string()))
    }

    fn add_piece(&mut self, piece: Piece, side: Side, square: Square) {
        self.pieces[piece_board_idx(piece, side)].set_square(square);
        self.sides[side as usize].set_square(square);
        self.zobrist_hash.toggle_piece(square, piece, side);
    }

    fn remove_piece(&mut self, piece: Piece, side: Side, square: Square) {
        self.pieces[piece_board_idx(piece, side)].clear_square(square);
        self.sides[side as usize].clear_square(square);
        self.zobrist_hash.toggle_piece(square, piece, side);
    }

    fn move_piece(&mut self, piece: Piece, side: Side, src: Square, dest: Square) {
        self.pieces[piece_board_idx(piece, side)].move_piece(src, dest);
        self.sides[side as usize].move_piece(src, dest);
        self.zobrist_hash.toggle_piece(src, piece, side);
        self.zobrist_hash.toggle_piece(dest, piece, side);
    }

    /// Clears `square` from every board of `side`, returning what stood there.
    fn capture(&mut self, square: Square, side: Side) -> Option<Piece> {
        if !self.sides[side as usize].is_square_set(square) {
            return None;
        }
        let captured = Piece::iter().find(|&piece| self.pieces(piece, side).is_square_set(square));
        for piece in Piece::iter() {
            let board = &mut self.pieces[piece_board_idx(piece, side)];
            if board.is_square_set(square) {
                board.toggle_square(square);
                self.zobrist_hash.toggle_piece(square, piece, side);
            }
        }
        self.sides[side as usize].clear_square(square);
        captured
    }
}

// Two positions are equal when their boards and state match; the cached
// status is derived.
impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state && self.pieces == other.pieces
    }
}

impl Eq for Position {}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut board_str = String::with_capacity(64 + 7);
        for (idx, square) in Square::list_white_perspective().into_iter().enumerate() {
            let ch = match self.piece_at(square) {
                Some((p, Side::White)) => char::from(p).to_ascii_uppercase(),
                Some((p, Side::Black)) => char::from(p),
                None => '.',
            };

            board_str.push(ch);
            if (idx + 1) % 8 == 0 && idx != 63 {
                board_str.push('\n');
            }
        }
        write!(f, "{}", board_str)
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self, self.to_fen())
    }
}

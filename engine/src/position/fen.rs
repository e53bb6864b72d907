use crate::bitboard::{BitBoard, Square};
use crate::position::{CastlingRights, Piece, Position, Side, State};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FenParseError {
    #[error("num fields: want 6 got {0}")]
    NumFields(usize),

    #[error("piece placement: got {0}, err at {1}")]
    PiecePlacement(String, usize),

    #[error("piece: unrecognized letter {0}")]
    PieceChar(char),

    #[error("side to move: want 'w'|'b' got {0}")]
    SideToMove(String),

    #[error("castling rights given: got {0}, err at idx {1}")]
    CastlingRights(String, usize),

    #[error("en passant target: got {0}")]
    EnPassantTarget(String),

    #[error("halfmove clock: want 0 <= x < 65_535 got {0}")]
    HalfmoveClock(String),

    #[error("full move counter: want 1 <= x < 65_535 got {0}")]
    FullMoveCounter(String),
}

impl Position {
    pub fn from_fen(fen: &str) -> Result<Self, FenParseError> {
        let fields = fen.split_whitespace().collect::<Vec<&str>>();

        if fields.len() != 6 {
            Err(FenParseError::NumFields(fields.len()))?
        }

        let pieces = pieces_from_fen(fields[0])?;

        let to_move = match fields[1] {
            "w" => Side::White,
            "b" => Side::Black,
            _ => Err(FenParseError::SideToMove(String::from(fields[1])))?,
        };

        let half_move_clock = fields[4]
            .parse::<u16>()
            .map_err(|_| FenParseError::HalfmoveClock(fields[4].to_string()))?;

        let full_move_counter = fields[5]
            .parse::<u16>()
            .ok()
            .filter(|&counter| counter >= 1)
            .ok_or_else(|| FenParseError::FullMoveCounter(fields[5].to_string()))?;

        let state = State {
            castling_rights: castling_rights_from_fen(fields[2])?,
            en_passant_target: en_passant_target_from_fen(fields[3])?,
            half_move_clock,
            to_move,
            full_move_counter,
        };

        Ok(Position::from_parts(pieces, state))
    }

    pub fn to_fen(&self) -> String {
        format!(
            "{} {} {}",
            self.book_key(),
            self.state.half_move_clock,
            self.state.full_move_counter
        )
    }

    /// The first four FEN fields: placement, side, castling and en passant.
    /// Move counters don't change what the book should play.
    pub fn book_key(&self) -> String {
        let mut placement = String::with_capacity(64 + 7);
        let mut curr_empty_count = 0;

        for (idx, square) in Square::list_white_perspective().into_iter().enumerate() {
            if let Some((piece, side)) = self.piece_at(square) {
                if curr_empty_count != 0 {
                    placement += &curr_empty_count.to_string();
                    curr_empty_count = 0;
                }
                let piece_char = match side {
                    Side::White => char::from(piece).to_ascii_uppercase(),
                    Side::Black => char::from(piece),
                };
                placement.push(piece_char);
            } else {
                curr_empty_count += 1;
            }
            if (idx + 1) % 8 == 0 {
                if curr_empty_count != 0 {
                    placement += &curr_empty_count.to_string();
                    curr_empty_count = 0;
                }
                if idx != 63 {
                    placement.push('/');
                }
            }
        }

        let side_to_move_char = match self.state.to_move {
            Side::White => 'w',
            Side::Black => 'b',
        };

        let rights = self.state.castling_rights;
        let mut castling_rights: String = [
            (CastlingRights::WHITE_KING_SIDE, 'K'),
            (CastlingRights::WHITE_QUEEN_SIDE, 'Q'),
            (CastlingRights::BLACK_KING_SIDE, 'k'),
            (CastlingRights::BLACK_QUEEN_SIDE, 'q'),
        ]
        .into_iter()
        .filter(|&(right, _)| rights.has(right))
        .map(|(_, ch)| ch)
        .collect();
        if castling_rights.is_empty() {
            castling_rights.push('-');
        }

        let en_passant = match self.state.en_passant_target {
            Some(ep_target) => ep_target.to_string(),
            None => "-".to_string(),
        };

        format!(
            "{} {} {} {}",
            placement, side_to_move_char, castling_rights, en_passant
        )
    }
}

fn castling_rights_from_fen(castling_rights_str: &str) -> Result<CastlingRights, FenParseError> {
    if castling_rights_str == "-" {
        return Ok(CastlingRights::none());
    }

    let mut bits = 0;
    for (idx, ch) in castling_rights_str.chars().enumerate() {
        let right = match ch {
            'K' => CastlingRights::WHITE_KING_SIDE,
            'Q' => CastlingRights::WHITE_QUEEN_SIDE,
            'k' => CastlingRights::BLACK_KING_SIDE,
            'q' => CastlingRights::BLACK_QUEEN_SIDE,
            _ => 0,
        };
        // Unknown letters and repeats are both rejected.
        if right == 0 || bits & right != 0 {
            return Err(FenParseError::CastlingRights(
                castling_rights_str.to_string(),
                idx,
            ));
        }
        bits |= right;
    }

    Ok(CastlingRights::new(bits))
}

fn en_passant_target_from_fen(
    en_passant_target_str: &str,
) -> Result<Option<Square>, FenParseError> {
    if en_passant_target_str == "-" {
        return Ok(None);
    }

    let err = || FenParseError::EnPassantTarget(en_passant_target_str.to_string());
    let square: Square = en_passant_target_str.parse().map_err(|_| err())?;
    // Only the third and sixth ranks can hold a target.
    if square.rank() != 2 && square.rank() != 5 {
        return Err(err());
    }
    Ok(Some(square))
}

fn pieces_from_fen(pieces_str: &str) -> Result<[BitBoard; 12], FenParseError> {
    let mut pieces = [BitBoard::empty(); 12];
    let err = |idx: usize| FenParseError::PiecePlacement(pieces_str.to_string(), idx);

    let mut rank: i8 = 7;
    let mut file: i8 = 0;

    for (ch_idx, ch) in pieces_str.chars().enumerate() {
        match ch {
            '/' => {
                if file != 8 || rank == 0 {
                    return Err(err(ch_idx));
                }
                rank -= 1;
                file = 0;
            }
            '1'..='8' => {
                file += (ch as u8 - b'0') as i8;
                if file > 8 {
                    return Err(err(ch_idx));
                }
            }
            _ => {
                let piece = Piece::try_from(ch)?;
                let side = if ch.is_ascii_uppercase() {
                    Side::White
                } else {
                    Side::Black
                };
                let square = Square::from_rank_file(rank, file).ok_or_else(|| err(ch_idx))?;
                pieces[side as usize * 6 + piece as usize].set_square(square);
                file += 1;
            }
        }
    }

    if rank != 0 || file != 8 {
        return Err(err(pieces_str.len()));
    }

    Ok(pieces)
}

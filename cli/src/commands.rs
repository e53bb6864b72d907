use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;

use winnow::ascii::{alphanumeric1, digit1};
use winnow::combinator::{alt, opt, preceded, separated, terminated};
use winnow::token::{one_of, take_while};
use winnow::Parser;
use winnow::Result as WinnowResult;

/// One line of the stdin session.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SessionCommand {
    /// `None` is the start position. Moves are kept as text and resolved
    /// against the position when applied.
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    NewGame,
    Moves,
    Board,
    Status,
    Eval,
    Go(GoOptions),
    Perft {
        depth: usize,
    },
    PerftFull {
        depth: usize,
    },
    Quit,
}

/// Bounds given to `go`; unset ones fall back to the session defaults.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct GoOptions {
    pub depth: Option<u8>,
    pub move_time: Option<Duration>,
    pub nodes: Option<u64>,
    pub no_book: bool,
}

impl Display for SessionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionCommand::Position { fen, moves } => {
                write!(f, "position ")?;
                match fen {
                    Some(fen) => write!(f, "fen {}", fen)?,
                    None => write!(f, "startpos")?,
                }
                if !moves.is_empty() {
                    write!(f, " moves {}", moves.join(" "))?;
                }
                Ok(())
            }
            SessionCommand::NewGame => write!(f, "newgame"),
            SessionCommand::Moves => write!(f, "moves"),
            SessionCommand::Board => write!(f, "board"),
            SessionCommand::Status => write!(f, "status"),
            SessionCommand::Eval => write!(f, "eval"),
            SessionCommand::Go(options) => {
                write!(f, "go")?;
                if let Some(depth) = options.depth {
                    write!(f, " depth {}", depth)?;
                }
                if let Some(move_time) = options.move_time {
                    write!(f, " movetime {}", move_time.as_millis())?;
                }
                if let Some(nodes) = options.nodes {
                    write!(f, " nodes {}", nodes)?;
                }
                if options.no_book {
                    write!(f, " nobook")?;
                }
                Ok(())
            }
            SessionCommand::Perft { depth } => write!(f, "perft {}", depth),
            SessionCommand::PerftFull { depth } => write!(f, "perft full {}", depth),
            SessionCommand::Quit => write!(f, "quit"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct CommandParseError(String);

impl Display for CommandParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot parse: [{}]", self.0)
    }
}

impl std::error::Error for CommandParseError {}

impl FromStr for SessionCommand {
    type Err = CommandParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        alt((
            parse_position,
            parse_newgame,
            parse_moves,
            parse_board,
            parse_status,
            parse_eval,
            parse_go,
            // "perft full" shares a prefix with "perft"
            parse_perft_full,
            parse_perft,
            parse_quit,
        ))
        .parse(trimmed)
        .map_err(|_| CommandParseError(trimmed.to_string()))
    }
}

fn parse_position(input: &mut &str) -> WinnowResult<SessionCommand> {
    preceded(
        "position ",
        (
            alt((
                "startpos".value(None),
                preceded("fen ", parse_position_fen.map(Some)),
            )),
            opt(preceded(" moves ", separated(1.., alphanumeric1, ' '))),
        ),
    )
    .map(
        |(fen, moves): (Option<String>, Option<Vec<&str>>)| SessionCommand::Position {
            fen,
            moves: moves
                .unwrap_or_default()
                .into_iter()
                .map(str::to_string)
                .collect(),
        },
    )
    .parse_next(input)
}

/// Only the shape of the six fields; the engine validates the content.
fn parse_position_fen(input: &mut &str) -> WinnowResult<String> {
    (
        terminated(separated(8, alphanumeric1, '/'), ' '),
        terminated(one_of(['w', 'b']), ' '),
        terminated(take_while(1.., ('K', 'k', 'Q', 'q', '-')), ' '),
        terminated(alt((alphanumeric1, "-")), ' '),
        terminated(digit1, ' '),
        digit1,
    )
        .map(
            |(placement, side, castling, ep, half_moves, full_moves): (
                Vec<&str>,
                char,
                &str,
                &str,
                &str,
                &str,
            )| {
                format!(
                    "{} {} {} {} {} {}",
                    placement.join("/"),
                    side,
                    castling,
                    ep,
                    half_moves,
                    full_moves
                )
            },
        )
        .parse_next(input)
}

fn parse_newgame(input: &mut &str) -> WinnowResult<SessionCommand> {
    "newgame".value(SessionCommand::NewGame).parse_next(input)
}

fn parse_moves(input: &mut &str) -> WinnowResult<SessionCommand> {
    "moves".value(SessionCommand::Moves).parse_next(input)
}

fn parse_board(input: &mut &str) -> WinnowResult<SessionCommand> {
    "board".value(SessionCommand::Board).parse_next(input)
}

fn parse_status(input: &mut &str) -> WinnowResult<SessionCommand> {
    "status".value(SessionCommand::Status).parse_next(input)
}

fn parse_eval(input: &mut &str) -> WinnowResult<SessionCommand> {
    "eval".value(SessionCommand::Eval).parse_next(input)
}

fn parse_quit(input: &mut &str) -> WinnowResult<SessionCommand> {
    "quit".value(SessionCommand::Quit).parse_next(input)
}

fn parse_perft(input: &mut &str) -> WinnowResult<SessionCommand> {
    preceded("perft ", digit1.try_map(usize::from_str))
        .map(|depth| SessionCommand::Perft { depth })
        .parse_next(input)
}

fn parse_perft_full(input: &mut &str) -> WinnowResult<SessionCommand> {
    preceded("perft full ", digit1.try_map(usize::from_str))
        .map(|depth| SessionCommand::PerftFull { depth })
        .parse_next(input)
}

#[derive(Debug, PartialEq, Eq, Clone)]
enum GoParameter {
    Depth(u8),
    MoveTime(Duration),
    Nodes(u64),
    NoBook,
}

fn parse_go(input: &mut &str) -> WinnowResult<SessionCommand> {
    preceded(
        "go",
        opt(preceded(
            ' ',
            separated(
                1..,
                alt((
                    parse_go_depth,
                    parse_go_movetime,
                    parse_go_nodes,
                    parse_go_nobook,
                )),
                ' ',
            ),
        )),
    )
    .map(|params: Option<Vec<GoParameter>>| {
        let params = params.unwrap_or_default();
        SessionCommand::Go(GoOptions {
            depth: params.iter().find_map(|param| match param {
                GoParameter::Depth(depth) => Some(*depth),
                _ => None,
            }),
            move_time: params.iter().find_map(|param| match param {
                GoParameter::MoveTime(time) => Some(*time),
                _ => None,
            }),
            nodes: params.iter().find_map(|param| match param {
                GoParameter::Nodes(nodes) => Some(*nodes),
                _ => None,
            }),
            no_book: params.contains(&GoParameter::NoBook),
        })
    })
    .parse_next(input)
}

fn parse_go_depth(input: &mut &str) -> WinnowResult<GoParameter> {
    preceded("depth ", digit1.try_map(u8::from_str))
        .map(GoParameter::Depth)
        .parse_next(input)
}

fn parse_go_movetime(input: &mut &str) -> WinnowResult<GoParameter> {
    preceded("movetime ", digit1.try_map(u64::from_str))
        .map(|msec| GoParameter::MoveTime(Duration::from_millis(msec)))
        .parse_next(input)
}

fn parse_go_nodes(input: &mut &str) -> WinnowResult<GoParameter> {
    preceded("nodes ", digit1.try_map(u64::from_str))
        .map(GoParameter::Nodes)
        .parse_next(input)
}

fn parse_go_nobook(input: &mut &str) -> WinnowResult<GoParameter> {
    "nobook".value(GoParameter::NoBook).parse_next(input)
}

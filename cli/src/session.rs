use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use gambit::{
    perft, perft_full, BestMoveSource, Engine, EngineError, EvaluatePosition, GenerateMoves,
    Position, SearchParams, MOVE_GEN, POSITION_EVALUATOR,
};

use crate::commands::{GoOptions, SessionCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// A current position plus an engine, driven one command at a time.
/// Responses are plain text lines written to `out`.
pub struct Session {
    engine: Engine,
    position: Position,
    default_params: SearchParams,
}

impl Session {
    pub fn new(engine: Engine, default_params: SearchParams) -> Self {
        Self {
            engine,
            position: Position::start(),
            default_params,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn handle_line(&mut self, line: &str, out: &mut impl Write) -> Result<Flow> {
        let command = SessionCommand::from_str(line)?;
        self.handle_command(command, out)
    }

    pub fn handle_command(
        &mut self,
        command: SessionCommand,
        out: &mut impl Write,
    ) -> Result<Flow> {
        debug!("> {}", command);

        match command {
            SessionCommand::Position { fen, moves } => {
                let mut position = match &fen {
                    Some(fen) => Position::from_fen(fen)
                        .with_context(|| format!("Couldn't parse given fen: `{}`", fen))?,
                    None => Position::start(),
                };
                for notation in &moves {
                    let mve = position
                        .parse_move(notation)
                        .with_context(|| format!("Couldn't apply move `{}`", notation))?;
                    position = position.make_move(mve)?;
                }
                self.position = position;
            }
            SessionCommand::NewGame => {
                self.engine.new_game();
                self.position = Position::start();
            }
            SessionCommand::Moves => {
                let moves: Vec<String> = MOVE_GEN
                    .gen_moves(&self.position)
                    .iter()
                    .map(|mve| mve.to_string())
                    .collect();
                writeln!(out, "{}", moves.join(" "))?;
            }
            SessionCommand::Board => {
                writeln!(out, "{}", self.position)?;
                writeln!(out, "fen: {}", self.position.to_fen())?;
            }
            SessionCommand::Status => {
                writeln!(out, "{}", self.position.status())?;
            }
            SessionCommand::Eval => {
                writeln!(out, "{}", POSITION_EVALUATOR.evaluate(&self.position))?;
            }
            SessionCommand::Go(options) => self.go(&options, out)?,
            SessionCommand::Perft { depth } => {
                let (move_counts, total) = perft(&self.position, depth, &MOVE_GEN);
                for (mve, nodes) in move_counts {
                    writeln!(out, "{}: {}", mve, nodes)?;
                }
                writeln!(out, "total: {}", total)?;
            }
            SessionCommand::PerftFull { depth } => {
                write!(out, "{}", perft_full(&self.position, depth, &MOVE_GEN))?;
            }
            SessionCommand::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    fn go(&mut self, options: &GoOptions, out: &mut impl Write) -> Result<()> {
        let params = self.search_params(options);

        match self.engine.best_move_for(&self.position, &params, Arc::default()) {
            Ok(best) => {
                info!("{}", best);
                match best.source {
                    BestMoveSource::Book => writeln!(out, "info book")?,
                    BestMoveSource::Search { eval, depth, nodes } => {
                        writeln!(out, "info depth {} score {} nodes {}", depth, eval, nodes)?
                    }
                }
                writeln!(out, "bestmove {}", best.mve)?;
            }
            Err(EngineError::GameOver(status)) => {
                writeln!(out, "info {}", status)?;
                writeln!(out, "bestmove (none)")?;
            }
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    /// Bounds from `go` win; without any, the session defaults apply.
    fn search_params(&self, options: &GoOptions) -> SearchParams {
        let bounded =
            options.depth.is_some() || options.move_time.is_some() || options.nodes.is_some();
        let mut params = if bounded {
            SearchParams {
                max_depth: options.depth,
                move_time: options.move_time,
                max_nodes: options.nodes,
                ..self.default_params.clone()
            }
        } else {
            self.default_params.clone()
        };
        if options.no_book {
            params.use_opening_book = false;
        }
        params
    }
}

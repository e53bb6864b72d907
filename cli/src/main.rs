use std::{
    env,
    fs::{self, File},
    io::{self, BufRead, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gambit::{attack_tables, Engine, EngineOptions, SearchParams, DEFAULT_MAX_DEPTH};
use mimalloc::MiMalloc;
use tracing::{debug, level_filters::LevelFilter, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, prelude::*, util::SubscriberInitExt, Registry};

use gambit_cli::{Flow, GoOptions, Session, SessionCommand};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Opening book file. Falls back to `GAMBIT_BOOK_PATH`, then the built in book.
    #[arg(long, global = true)]
    book: Option<PathBuf>,

    /// Transposition table entries, rounded up to a power of two.
    #[arg(long, global = true, default_value_t = gambit::transposition_table::DEFAULT_ENTRIES)]
    tt_entries: usize,

    /// Search depth used by `go` when it names no bound.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_DEPTH)]
    depth: u8,

    /// Skip the opening book.
    #[arg(long, global = true)]
    no_book: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search a position for the best move.
    Search {
        fen: String,
        /// Stop after this many milliseconds.
        #[arg(long)]
        move_time_ms: Option<u64>,
    },
    /// Count leaf nodes, split by root move.
    Perft {
        fen: String,
        depth: usize,
        /// Per depth statistics instead of the split.
        #[arg(long)]
        full: bool,
    },
    /// List the legal moves.
    Moves { fen: String },
    /// Print the board.
    Board { fen: String },
    /// Print whether the game is ongoing, check or over.
    Status { fen: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    enable_logging()?;

    // Build the slider tables before the first command needs them.
    let _ = attack_tables();

    let book_path = cli
        .book
        .clone()
        .or_else(|| env::var_os("GAMBIT_BOOK_PATH").map(PathBuf::from));
    let engine = Engine::new(EngineOptions {
        tt_entries: cli.tt_entries,
        book_path,
        seed: None,
    });
    let default_params = SearchParams {
        use_opening_book: !cli.no_book,
        ..SearchParams::with_depth(cli.depth)
    };
    let mut session = Session::new(engine, default_params);

    let commands = match cli.command {
        None => return session_main_loop(&mut session),
        Some(Commands::Search { fen, move_time_ms }) => vec![
            load(fen),
            SessionCommand::Go(GoOptions {
                move_time: move_time_ms.map(Duration::from_millis),
                ..Default::default()
            }),
        ],
        Some(Commands::Perft { fen, depth, full }) => vec![
            load(fen),
            if full {
                SessionCommand::PerftFull { depth }
            } else {
                SessionCommand::Perft { depth }
            },
        ],
        Some(Commands::Moves { fen }) => vec![load(fen), SessionCommand::Moves],
        Some(Commands::Board { fen }) => vec![load(fen), SessionCommand::Board],
        Some(Commands::Status { fen }) => vec![load(fen), SessionCommand::Status],
    };

    let mut stdout = io::stdout().lock();
    for command in commands {
        session.handle_command(command, &mut stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

fn load(fen: String) -> SessionCommand {
    SessionCommand::Position {
        fen: Some(fen),
        moves: vec![],
    }
}

fn session_main_loop(session: &mut Session) -> Result<()> {
    let stdin = io::stdin().lock();
    let mut stdout = io::stdout();

    for line in stdin.lines() {
        let line = line.context("Couldn't read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        debug!("{}", line);

        match session.handle_line(&line, &mut stdout) {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(err) => warn!("{:#}", err),
        }
        stdout.flush()?;
    }
    Ok(())
}

fn enable_logging() -> Result<()> {
    let log_path = match env::var_os("GAMBIT_LOG_PATH") {
        Some(log_path) => PathBuf::from(log_path),
        None => {
            let log_path = get_default_log_path()?;
            if let Some(log_path_dir) = log_path.parent() {
                fs::create_dir_all(log_path_dir)
                    .with_context(|| format!("Couldn't create directory {:?}", log_path_dir))?;
            }
            log_path
        }
    };

    let log_file =
        File::create(&log_path).with_context(|| format!("Couldn't create file {:?}", log_path))?;

    let stderr_layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        );

    let log_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(LevelFilter::from_level(Level::DEBUG));

    Registry::default().with(stderr_layer).with(log_layer).init();

    Ok(())
}

fn get_default_log_path() -> Result<PathBuf> {
    let mut log_path = match dirs::state_dir() {
        Some(state_dir) => state_dir,
        None => {
            let mut home = dirs::home_dir().context("Home directory not set")?;
            home.push(".local/state");
            home
        }
    };
    log_path.push("gambit");
    log_path.push("gambit.log");
    Ok(log_path)
}

use gambit::{Engine, EngineOptions, SearchParams};
use gambit_cli::{Flow, Session};
use testresult::TestResult;

struct Script {
    session: Session,
}

impl Script {
    fn new() -> Self {
        let engine = Engine::new(EngineOptions {
            seed: Some(11),
            tt_entries: 1 << 12,
            ..Default::default()
        });
        Self {
            session: Session::new(engine, SearchParams::with_depth(3)),
        }
    }

    fn send(&mut self, line: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
        let mut out = Vec::new();
        self.session.handle_line(line, &mut out)?;
        Ok(String::from_utf8(out)?.lines().map(str::to_string).collect())
    }
}

#[test]
fn test_happy_path() -> TestResult {
    let mut script = Script::new();

    assert_eq!(script.send("position startpos")?, Vec::<String>::new());
    assert_eq!(
        script.send("board")?,
        vec![
            "rnbqkbnr",
            "pppppppp",
            "........",
            "........",
            "........",
            "........",
            "PPPPPPPP",
            "RNBQKBNR",
            "fen: rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        ]
    );
    assert_eq!(script.send("status")?, vec!["Ongoing"]);
    assert_eq!(script.send("eval")?, vec!["cp 0"]);
    assert_eq!(script.send("moves")?[0].split(' ').count(), 20);

    // The start position is in the book.
    let responses = script.send("go")?;
    assert_eq!(responses[0], "info book");
    assert!(responses[1].starts_with("bestmove "));

    let responses = script.send("go depth 2 nobook")?;
    assert!(responses[0].starts_with("info depth 2 score "));
    assert!(responses[1].starts_with("bestmove "));

    let responses = script.send("perft 2")?;
    assert_eq!(responses.len(), 21);
    assert_eq!(responses.last().map(String::as_str), Some("total: 400"));

    assert_eq!(script.send("position startpos moves f2f3 e7e5 g2g4 d8h4")?, Vec::<String>::new());
    assert_eq!(script.send("status")?, vec!["Checkmate"]);
    assert_eq!(script.send("go")?, vec!["info Checkmate", "bestmove (none)"]);

    assert_eq!(script.send("newgame")?, Vec::<String>::new());
    assert_eq!(script.session.position(), &gambit::Position::start());

    let mut out = Vec::new();
    assert_eq!(script.session.handle_line("quit", &mut out)?, Flow::Quit);
    Ok(())
}

#[test]
fn test_finds_mate_from_session() -> TestResult {
    let mut script = Script::new();
    script.send("position fen 6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1")?;

    let responses = script.send("go depth 3")?;
    assert_eq!(responses[0].split(' ').take(5).collect::<Vec<_>>(), ["info", "depth", "1", "score", "mate"]);
    assert_eq!(responses[1], "bestmove a1a8");
    Ok(())
}

#[test]
fn test_bad_lines_are_errors() -> TestResult {
    let mut script = Script::new();
    assert!(script.send("position fen not a fen").is_err());
    assert!(script.send("position startpos moves e2e5").is_err());
    assert!(script.send("fly").is_err());

    // Still usable afterwards.
    assert_eq!(script.send("status")?, vec!["Ongoing"]);
    Ok(())
}

#[test]
fn test_perft_full_table() -> TestResult {
    let mut script = Script::new();
    script.send("position fen r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")?;
    let responses = script.send("perft full 2")?;
    assert_eq!(responses[0], "total nodes: 2087");
    assert!(responses.iter().any(|line| line.contains("2039")));
    Ok(())
}

use std::fmt::Display;
use std::time::{Duration, Instant};

use tabled::{Table, Tabled};

use crate::chess_move::{Move, MoveKind};
use crate::move_gen::GenerateMoves;
use crate::position::Position;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Tabled)]
pub struct PerftDepthResult {
    pub depth: usize,
    pub nodes: u64,
    pub captures: u64,
    pub en_passants: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
    pub checkmates: u64,
}

pub struct PerftResult {
    pub depth_results: Vec<PerftDepthResult>,
    pub tot_nodes: u64,
    pub time_elapsed: Duration,
    pub nodes_per_second: f64,
}

impl Display for PerftResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "total nodes: {}", self.tot_nodes)?;
        writeln!(f, "time elapsed: {}", self.time_elapsed.as_secs_f32())?;
        writeln!(f, "nodes/s: {:.0}", self.nodes_per_second)?;
        writeln!(f, "{}", Table::new(&self.depth_results))?;
        Ok(())
    }
}

/// Leaf count at `depth`, split by root move.
pub fn perft(
    position: &Position,
    depth: usize,
    move_gen: &impl GenerateMoves,
) -> (Vec<(Move, u64)>, u64) {
    if depth == 0 {
        return (vec![], 1);
    }

    let divided: Vec<(Move, u64)> = move_gen
        .gen_moves(position)
        .into_iter()
        .map(|mve| {
            let child = apply(position, mve);
            (mve, count_leaves(&child, depth - 1, move_gen))
        })
        .collect();
    let total = divided.iter().map(|(_, count)| count).sum();

    (divided, total)
}

fn count_leaves(position: &Position, depth: usize, move_gen: &impl GenerateMoves) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = move_gen.gen_moves(position);
    if depth == 1 {
        return moves.len() as u64;
    }
    moves
        .into_iter()
        .map(|mve| count_leaves(&apply(position, mve), depth - 1, move_gen))
        .sum()
}

/// Move statistics for every ply up to `depth`, one row per ply.
pub fn perft_full(position: &Position, depth: usize, move_gen: &impl GenerateMoves) -> PerftResult {
    let mut depth_results: Vec<PerftDepthResult> = (1..=depth)
        .map(|depth| PerftDepthResult {
            depth,
            ..Default::default()
        })
        .collect();

    let start = Instant::now();
    perft_helper(&mut depth_results, position, move_gen, 0);
    let time_elapsed = start.elapsed();

    let tot_nodes = depth_results.iter().map(|res| res.nodes).sum();
    let nodes_per_second = tot_nodes as f64 / time_elapsed.as_secs_f64().max(f64::EPSILON);

    PerftResult {
        depth_results,
        tot_nodes,
        time_elapsed,
        nodes_per_second,
    }
}

fn perft_helper(
    depth_results: &mut [PerftDepthResult],
    position: &Position,
    move_gen: &impl GenerateMoves,
    curr_depth: usize,
) {
    if curr_depth == depth_results.len() {
        return;
    }

    let opponent = position.side(position.to_move().opposite_side());
    for mve in move_gen.gen_moves(position) {
        let child = apply(position, mve);
        let res = &mut depth_results[curr_depth];

        res.nodes += 1;
        if mve.kind == MoveKind::EnPassant {
            res.en_passants += 1;
            res.captures += 1;
        } else if opponent.is_square_set(mve.dest) {
            res.captures += 1;
        }
        if mve.is_castle() {
            res.castles += 1;
        }
        if mve.promotion().is_some() {
            res.promotions += 1;
        }
        if child.is_in_check() {
            res.checks += 1;
            if move_gen.gen_moves(&child).is_empty() {
                res.checkmates += 1;
            }
        }

        perft_helper(depth_results, &child, move_gen, curr_depth + 1);
    }
}

fn apply(position: &Position, mve: Move) -> Position {
    match position.try_move(mve) {
        Ok(child) => child,
        Err(err) => panic!("generated move {:?} failed to apply: {}\n{:?}", mve, err, position),
    }
}

//! Benchmarks for match detection.
//!
//! # Benchmarks
//!
//! - **`find_matches`**: a full row and column scan.
//! - **`has_valid_moves`**: the uncached legal-move search. The dead boards
//!   are the worst case, since every pair must be tried.
//! - **`find_possible_moves`**: enumerating every matching swap.
//!
//! # Test Data
//!
//! Boards are generated from fixed formulas so runs are reproducible:
//!
//! - **`dead_NxN`**: diagonal stripes of three types, with no legal move.
//! - **`mixed_NxN`**: a five-type pattern with scattered runs and moves.
//!
//! # Running
//!
//! ```sh
//! cargo bench --bench matcher
//! ```

use std::{hint, time::Duration};

use criterion::{
    BatchSize, BenchmarkId, Criterion, PlottingBackend, criterion_group, criterion_main,
};
use matchfall_core::{Board, Position, TileType};
use matchfall_matcher::{MatchDetector, find_matches, find_possible_moves};

const SIZES: [usize; 3] = [8, 12, 20];

fn patterned_board(size: usize, f: impl Fn(usize, usize) -> u8) -> Board {
    let mut board = Board::new(size, size).unwrap();
    for y in 0..size {
        for x in 0..size {
            board.spawn_tile(Position::new(x, y), TileType::new(f(x, y)));
        }
    }
    board
}

fn dead_board(size: usize) -> Board {
    patterned_board(size, |x, y| ((x + y) % 3) as u8)
}

fn mixed_board(size: usize) -> Board {
    patterned_board(size, |x, y| ((x * 7 + y * 3 + x * y) % 5) as u8)
}

fn cases() -> Vec<(String, Board)> {
    SIZES
        .into_iter()
        .flat_map(|n| {
            [
                (format!("dead_{n}x{n}"), dead_board(n)),
                (format!("mixed_{n}x{n}"), mixed_board(n)),
            ]
        })
        .collect()
}

fn bench_find_matches(c: &mut Criterion) {
    for (name, board) in cases() {
        c.bench_with_input(
            BenchmarkId::new("find_matches", name),
            &board,
            |b, board| {
                b.iter(|| find_matches(hint::black_box(board)));
            },
        );
    }
}

fn bench_has_valid_moves(c: &mut Criterion) {
    for (name, board) in cases() {
        c.bench_with_input(
            BenchmarkId::new("has_valid_moves", name),
            &board,
            |b, board| {
                b.iter_batched(
                    MatchDetector::new,
                    |mut detector| detector.has_valid_moves(hint::black_box(board)),
                    BatchSize::SmallInput,
                );
            },
        );
    }
}

fn bench_find_possible_moves(c: &mut Criterion) {
    for (name, board) in cases() {
        c.bench_with_input(
            BenchmarkId::new("find_possible_moves", name),
            &board,
            |b, board| {
                b.iter(|| find_possible_moves(hint::black_box(board)));
            },
        );
    }
}

criterion_group!(
    name = benches;
    config =
        Criterion::default()
            .plotting_backend(PlottingBackend::Plotters)
            .measurement_time(Duration::from_secs(5));
    targets =
        bench_find_matches,
        bench_has_valid_moves,
        bench_find_possible_moves
);
criterion_main!(benches);

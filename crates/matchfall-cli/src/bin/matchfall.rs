//! Autoplays Matchfall sessions and prints a summary of each.
//!
//! # Usage
//!
//! ```sh
//! cargo run -- --seed 42 --moves 50
//! ```
//!
//! Play several sessions in parallel with consecutive seeds:
//!
//! ```sh
//! cargo run -- --seed 42 --sessions 16 --strategy random
//! ```
//!
//! Load a partial JSON config and emit JSON:
//!
//! ```sh
//! cargo run -- --config config.json --json
//! ```

use std::{path::PathBuf, process};

use clap::Parser;
use matchfall_cli::{CliError, SessionSummary, Strategy, load_config, play_session};
use matchfall_game::GameConfig;
use rayon::prelude::*;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Seed of the first session; later sessions use the following seeds.
    /// Drawn at random when omitted.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// JSON config file. Missing fields take their defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Maximum swaps per session.
    #[arg(long, value_name = "COUNT", default_value_t = 100)]
    moves: u32,

    /// Number of sessions to play.
    #[arg(long, value_name = "COUNT", default_value_t = 1)]
    sessions: u64,

    /// How swaps are chosen.
    #[arg(long, value_name = "STRATEGY", default_value = "greedy")]
    strategy: Strategy,

    /// Print the final board of each session.
    #[arg(long)]
    print_board: bool,

    /// Print summaries as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    better_panic::install();
    env_logger::init();

    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GameConfig::default(),
    };
    let first_seed = args.seed.unwrap_or_else(rand::random);
    log::info!(
        "playing {} session(s) from seed {first_seed:#x}",
        args.sessions
    );

    let summaries = (0..args.sessions)
        .into_par_iter()
        .map(|i| {
            play_session(
                &config,
                first_seed.wrapping_add(i),
                args.moves,
                args.strategy,
                args.print_board,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            print_summary(summary);
        }
        if summaries.len() > 1 {
            print_totals(&summaries);
        }
    }
    Ok(())
}

fn print_summary(summary: &SessionSummary) {
    let snapshot = &summary.snapshot;
    println!("Seed {:#x}:", summary.seed);
    println!("  Score: {}", snapshot.score);
    println!("  Moves: {} of {} attempts", snapshot.moves, summary.attempts);
    println!(
        "  Cascades: {} (longest {})",
        summary.cascades, summary.longest_cascade
    );
    println!("  Specials created: {}", summary.specials_created);
    println!("  Shuffles: {}", summary.shuffles);
    println!("  State: {}", snapshot.state);
    if let Some(board) = &summary.board {
        println!("  Board:");
        for line in board.lines() {
            println!("    {line}");
        }
    }
    println!();
}

fn print_totals(summaries: &[SessionSummary]) {
    let scores = summaries
        .iter()
        .map(|s| s.snapshot.score)
        .collect::<Vec<_>>();
    let total = scores.iter().sum::<u64>();
    let best = scores.iter().copied().max().unwrap_or(0);
    println!("Sessions: {}", summaries.len());
    println!("  Total score: {total}");
    println!("  Best score: {best}");
    println!(
        "  Mean score: {}",
        total / u64::try_from(summaries.len()).unwrap_or(1)
    );
}

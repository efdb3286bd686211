#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that autoplays a Tile Cascade session.
//!
//! Each turn plays the first valid move the solvability guard finds and
//! prints the resulting board. Boards can be exported to, and imported
//! from, single-line layout strings.

mod config;
mod layout_transfer;
mod render;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tile_cascade_board::SeededRandom;
use tile_cascade_core::EngineConfig;
use tile_cascade_session::Session;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{config::Overrides, layout_transfer::BoardLayoutSnapshot};

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Parser)]
#[command(name = "tile-cascade")]
#[command(about = "Seeded autoplay for the Tile Cascade puzzle engine", long_about = None)]
struct CliArgs {
    /// Seed for the session's random source
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of hinted moves to play
    #[arg(long, default_value_t = 10)]
    turns: u32,

    /// TOML file holding an engine configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Board rows (overrides the config file)
    #[arg(long)]
    rows: Option<u32>,

    /// Board columns (overrides the config file)
    #[arg(long)]
    columns: Option<u32>,

    /// Number of token types (overrides the config file)
    #[arg(long)]
    token_types: Option<u8>,

    /// Moves the session allows (overrides the config file)
    #[arg(long)]
    move_limit: Option<u32>,

    /// Start from an exported `board:v1:...` layout instead of a fresh fill
    #[arg(long, value_name = "LAYOUT")]
    import: Option<String>,

    /// Print the final board as a layout string
    #[arg(long)]
    export: bool,

    /// Log filter, e.g. `debug` or `tile_cascade_system_cascade=debug`; defaults to RUST_LOG, then `info`
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

impl CliArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            rows: self.rows,
            columns: self.columns,
            token_types: self.token_types,
            move_limit: self.move_limit,
        }
    }
}

/// Entry point for the Tile Cascade command-line interface.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_level.as_deref())?;

    let config = args
        .overrides()
        .apply(config::load(args.config.as_deref())?);
    let mut session = open_session(&args, &config)?;
    println!("{}", render::board(session.board()));

    for turn in 0..args.turns {
        if session.moves_remaining() == Some(0) {
            info!(turn, "move limit reached");
            break;
        }
        let Some((first, second)) = session.hint() else {
            warn!(turn, "no valid move left");
            break;
        };
        let result = session.request_swap(first, second);
        if !result.accepted {
            bail!("hinted move {first:?} <-> {second:?} was rejected: {:?}", result.reason);
        }
        info!(
            turn,
            ?first,
            ?second,
            passes = result.cascades.len(),
            combo = result.combo_count,
            score = result.score_delta,
            "turn played"
        );
        println!(
            "turn {turn}: swap ({}, {}) <-> ({}, {}), {} pass(es), +{} points",
            first.row(),
            first.column(),
            second.row(),
            second.column(),
            result.cascades.len(),
            result.score_delta
        );
        println!("{}", render::board(session.board()));
    }

    let stats = session.stats();
    println!(
        "score {} | currency {} | moves {} | longest streak {} | reshuffles {}",
        stats.total_score,
        stats.total_currency,
        stats.moves_used,
        stats.longest_streak,
        stats.reshuffles
    );

    if args.export {
        let snapshot = BoardLayoutSnapshot::capture(session.board());
        println!("{}", snapshot.encode()?);
    }
    Ok(())
}

fn open_session(args: &CliArgs, config: &EngineConfig) -> Result<Session<SeededRandom>> {
    let rng = SeededRandom::new(args.seed);
    let Some(layout) = args.import.as_deref() else {
        return Session::start(config, rng).context("invalid engine configuration");
    };

    let snapshot = BoardLayoutSnapshot::decode(layout).context("failed to decode layout")?;
    let config = snapshot
        .engine_config(config)
        .validate()
        .context("imported layout does not describe a valid board")?;
    let board = snapshot
        .to_board(&config)
        .context("imported layout does not fit its board")?;
    info!(
        rows = snapshot.rows,
        columns = snapshot.columns,
        "imported board layout"
    );
    Session::from_board(&config, board, rng).context("imported layout does not fit its board")
}

fn init_tracing(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter '{directives}'"))?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
            .context("invalid log filter")?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow!("failed to install log subscriber: {error}"))
}

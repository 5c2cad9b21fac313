use anyhow::{Context, Result};
use clap::Parser;
use fiefdom_core::{JsonlSink, NotificationSink, PlayerInputs, SharedWorld, SimConfig};
use std::path::PathBuf;

mod scenario;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file overriding the default tunables
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON file with the first season's player commands
    #[arg(long)]
    commands: Option<PathBuf>,

    /// Number of seasons to run
    #[arg(short, long, default_value_t = 4)]
    seasons: u32,

    /// Seed for all random draws
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Write player notifications to stdout as JSON lines
    #[arg(long)]
    notifications: bool,

    /// Dispatch each player's orders on the thread pool (not reproducible
    /// across runs when several players act)
    #[arg(long)]
    parallel: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_config(path: Option<&PathBuf>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    SimConfig::from_json(&raw)
        .with_context(|| format!("Failed to parse config in {}", path.display()))
}

fn run_orders(world: &SharedWorld, batch: &[PlayerInputs], parallel: bool) {
    let results = if parallel {
        world.dispatch_batch(batch)
    } else {
        batch
            .iter()
            .map(|inputs| {
                let results: Vec<_> = inputs
                    .commands
                    .iter()
                    .map(|cmd| world.execute(&inputs.player, cmd))
                    .collect();
                (inputs.player.clone(), results)
            })
            .collect()
    };

    for (player, results) in results {
        for result in results {
            match result {
                Ok(outcome) => log::info!("{}: {:?}", player, outcome),
                Err(e) => log::warn!("{}: rejected: {}", player, e),
            }
        }
    }
}

fn deliver<S: NotificationSink>(world: &SharedWorld, sink: Option<&mut S>) {
    let pending = world.drain_notifications();
    match sink {
        Some(sink) => pending.into_iter().for_each(|n| sink.notify(n)),
        None => log::debug!("Dropped {} notifications", pending.len()),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = std::str::FromStr::from_str(&args.log_level).unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    log::info!("Starting fiefdom-sim...");

    let config = load_config(args.config.as_ref())?;
    let orders = match &args.commands {
        Some(path) => scenario::load_commands(path)?,
        None => scenario::opening_moves()?,
    };
    let (state, map) = scenario::demo_realm()?;
    let world = SharedWorld::new(state, config, map, args.seed);

    let mut sink = args.notifications.then(JsonlSink::stdout);

    log::info!("Initial clock: {}", world.read(|s| s.clock));
    run_orders(&world, &orders, args.parallel);
    deliver(&world, sink.as_mut());

    for _ in 0..args.seasons {
        let summary = world.end_season();
        let (clock, armies) = world.read(|s| (s.clock, s.armies.len()));
        log::info!(
            "Season closed: {} | armies: {} (updated {}) | lost: {} | dissolved: {:?}",
            clock,
            armies,
            summary.armies_updated,
            summary.troops_lost,
            summary.dissolved
        );
        deliver(&world, sink.as_mut());
    }

    if let Some(mut sink) = sink {
        sink.flush().context("Failed to flush notifications")?;
        log::info!("Wrote {} notifications", sink.written());
    }

    let checksum = world.read(|s| s.checksum());
    log::info!("Simulation finished, checksum {:016x}", checksum);

    Ok(())
}

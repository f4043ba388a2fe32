mod sim;

use anyhow::Result;
use clap::Parser;

use rewind::{InputFallback, LinkConditions, SyncConfig};
use sim::Simulation;

#[derive(Parser)]
#[command(name = "rewind-sim")]
#[command(about = "Runs a client and a server session over a simulated lossy link")]
struct Args {
    #[arg(short, long, default_value_t = 600)]
    ticks: u32,

    #[arg(long, default_value_t = rewind::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(long, default_value_t = 0.0, help = "Packet loss percentage (0-100)")]
    loss_percent: f32,

    #[arg(long, default_value_t = 3, help = "Minimum one-way latency in ticks")]
    min_latency: u32,

    #[arg(long, default_value_t = 3, help = "Maximum one-way latency in ticks")]
    max_latency: u32,

    #[arg(long, default_value_t = 0, help = "Extra random delay in ticks")]
    jitter: u32,

    #[arg(long, default_value_t = rewind::DEFAULT_MISMATCH_THRESHOLD)]
    threshold: f32,

    #[arg(long, default_value_t = 64, help = "Hit-test history depth in ticks")]
    depth: usize,

    #[arg(long, help = "Run missing inputs as neutral instead of repeating the last one")]
    neutral_fallback: bool,

    #[arg(long, default_value_t = 1)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = SyncConfig {
        tick_rate: args.tick_rate,
        hit_history_depth: args.depth,
        mismatch_threshold: args.threshold,
        input_fallback: if args.neutral_fallback {
            InputFallback::Neutral
        } else {
            InputFallback::RepeatLast
        },
        ..Default::default()
    };
    let link = LinkConditions {
        loss_percent: args.loss_percent,
        min_latency_ticks: args.min_latency,
        max_latency_ticks: args.max_latency.max(args.min_latency),
        jitter_ticks: args.jitter,
    };

    let mut simulation = Simulation::new(config, link, args.seed)?;
    log::info!(
        "running {} ticks at {} Hz, link {:?}",
        args.ticks,
        args.tick_rate,
        simulation.link()
    );
    for _ in 0..args.ticks {
        simulation.step()?;
    }

    simulation.fire()?;
    simulation.summary().log();
    Ok(())
}

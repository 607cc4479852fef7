//! # Replication Simulation Runner
//!
//! Runs remote entities over a simulated link and reports how smooth the
//! reconciled motion was.
//!
//! ```text
//! netsync_sim [--preset perfect|good|average|poor] [--secs N] [--entities N]
//!             [--seed N] [--respawn SECONDS] [--config FILE.toml] [--realtime]
//! ```
//!
//! `RUST_LOG=skirmish_networking=debug` together with `log_stats = true` in the
//! config file prints the periodic per-entity statistics.

use std::process::ExitCode;

use skirmish_networking::{NetConfig, NetworkConditions, ReplicationSimulation, SimulationConfig};
use tracing_subscriber::EnvFilter;

struct Args {
    sim: SimulationConfig,
    preset: String,
    realtime: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut sim = SimulationConfig::default();
    let mut preset = String::from("average");
    let mut realtime = false;

    let mut args = std::env::args().skip(1);
    while let Some(flag) = args.next() {
        let mut value = || args.next().ok_or_else(|| format!("{flag} needs a value"));
        match flag.as_str() {
            "--preset" => {
                preset = value()?;
                sim.network =
                    NetworkConditions::preset(&preset).ok_or_else(|| format!("unknown preset '{preset}'"))?;
            }
            "--secs" => sim.duration_secs = parse(&value()?)?,
            "--entities" => sim.entity_count = parse(&value()?)?,
            "--seed" => sim.seed = parse(&value()?)?,
            "--respawn" => sim.respawn_interval = Some(parse(&value()?)?),
            "--config" => {
                let config = NetConfig::from_file(value()?).map_err(|e| e.to_string())?;
                sim.sync = config.sync;
            }
            "--realtime" => realtime = true,
            "--help" | "-h" => {
                return Err("usage: netsync_sim [--preset NAME] [--secs N] [--entities N] [--seed N] \
                            [--respawn SECONDS] [--config FILE] [--realtime]"
                    .into())
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }

    Ok(Args { sim, preset, realtime })
}

fn parse<T: std::str::FromStr>(text: &str) -> Result<T, String> {
    text.parse().map_err(|_| format!("invalid number '{text}'"))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let network = args.sim.network;
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║           SKIRMISH REPLICATION SIMULATION                        ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("Configuration:");
    println!("  Preset:        {}", args.preset);
    println!("  Latency:       {}ms one-way ±{}ms", network.base_latency_ms, network.jitter_ms);
    println!("  Packet Loss:   {}%", network.packet_loss_percent);
    println!("  Reordering:    {}%", network.out_of_order_percent);
    println!("  Entities:      {}", args.sim.entity_count);
    println!("  Duration:      {}s", args.sim.duration_secs);
    println!("  Delay bounds:  {:.0}-{:.0}ms", args.sim.sync.min_delay * 1000.0, args.sim.sync.max_delay * 1000.0);
    println!();

    let mut simulation = match ReplicationSimulation::new(args.sim) {
        Ok(simulation) => simulation,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let stats = if args.realtime {
        let (stats, pacing) = simulation.run_paced();
        println!(
            "Frame work: avg {}µs, max {}µs, {} overruns",
            pacing.avg_work_us, pacing.max_work_us, pacing.overruns
        );
        stats
    } else {
        simulation.run()
    };

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                    FINAL RESULTS                                 ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!("  Frames:        {}", stats.frames);
    println!("  Published:     {}", stats.published);
    println!("  Lost:          {}", stats.lost);
    println!("  Reordered:     {}", stats.reordered);
    println!("  Accepted:      {}", stats.accepted);
    println!("  Rejected:      {} (stale)", stats.rejected);
    println!(
        "  Modes:         interp {} | extrap {} ({:.1}%) | hold {}",
        stats.interpolated,
        stats.extrapolated,
        stats.extrapolation_percent(),
        stats.held
    );
    println!("  Teleports:     {}", stats.teleports);
    println!("  Error:         avg {:.3} | max {:.3} units", stats.avg_error, stats.max_error);
    println!("  Final delay:   {:.1}ms", stats.final_delay * 1000.0);

    ExitCode::SUCCESS
}

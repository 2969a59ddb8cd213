//! `blocksim`: run a discrete-event blockchain network simulation to
//! completion and dump per-node statistics as JSON (§6, §11).

use blocksim::config::{CliArgs, SimConfig};
use blocksim::error::ConfigError;
use blocksim::sim::World;
use clap::Parser;
use std::io::Write;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = CliArgs::parse();
    setup_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "blocksim exiting");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(verbose: bool) {
    let default_filter = if verbose { "trace" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cli: &CliArgs) -> Result<(), ConfigError> {
    let config = SimConfig::load_or_create(&cli.config)?.merge_cli(cli)?;
    tracing::info!(
        nodes = config.nodes,
        miners = config.miners,
        endorsers = config.endorsers,
        clients = config.clients,
        orders = config.orders,
        no_blocks = config.no_blocks,
        "starting simulation"
    );

    let mut world = World::from_config(&config)?;
    world.start_all();

    let target_blocks = config.no_blocks;
    if config.miners > 0 {
        world.run_while(|w| w.total_miner_generated_blocks() < target_blocks);
    } else {
        // No PoW miners: `--no-blocks` is reinterpreted as a virtual-time
        // horizon measured in block intervals, so the flag still bounds
        // Hyperledger-only (order-node) runs.
        let horizon = target_blocks as f64 * config.block_interval_seconds;
        world.run_while(|w| w.clock.now() < horizon);
    }

    world.stop_all();
    tracing::info!(virtual_time = world.clock.now(), "simulation complete");

    dump_statistics(&world, cli.out.as_deref())
}

fn dump_statistics(world: &World, out_path: Option<&str>) -> Result<(), ConfigError> {
    let mut stats: Vec<_> = world.nodes.values().map(|n| &n.stats).collect();
    stats.sort_by_key(|s| s.node_id);

    let json = serde_json::to_string_pretty(&stats).map_err(|e| ConfigError::InvalidValue(format!("failed to serialize statistics: {e}")))?;

    match out_path {
        Some(path) => {
            std::fs::write(path, json)?;
        }
        None => {
            let mut stdout = std::io::stdout();
            writeln!(stdout, "{json}").map_err(ConfigError::Io)?;
        }
    }
    Ok(())
}

//! CLI flags and the layered TOML configuration for the `blocksim` driver
//! (§6), following the `timed` project's `Config::load_or_create` pattern:
//! a `clap`-derived [`CliArgs`] struct for the command line, a
//! `serde`-derived [`SimConfig`] for the on-disk/default shape, and a merge
//! step where CLI flags that were actually passed win.

use crate::error::ConfigError;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "blocksim")]
#[command(about = "Discrete-event blockchain network simulator", long_about = None)]
pub struct CliArgs {
    /// TOML config file; CLI flags override values it sets.
    #[arg(long, default_value = "blocksim.toml")]
    pub config: String,

    /// Fixed block size in bytes; unset samples from normal(23000, 2000).
    #[arg(long = "block-size")]
    pub block_size: Option<u32>,

    /// Number of blocks to mine before stopping the run.
    #[arg(long = "no-blocks")]
    pub no_blocks: Option<u64>,

    #[arg(long)]
    pub nodes: Option<u64>,

    #[arg(long)]
    pub miners: Option<u64>,

    #[arg(long = "min-connections")]
    pub min_connections: Option<usize>,

    #[arg(long = "max-connections")]
    pub max_connections: Option<usize>,

    #[arg(long = "block-interval-seconds")]
    pub block_interval_seconds: Option<f64>,

    /// Use a literal fixed mining interval instead of the geometric
    /// (Poisson-like) schedule of §4.7.
    #[arg(long = "fixed-block-interval")]
    pub fixed_block_interval: bool,

    #[arg(long = "inv-timeout-mins")]
    pub inv_timeout_mins: Option<f64>,

    #[arg(long)]
    pub endorsers: Option<u64>,

    #[arg(long)]
    pub clients: Option<u64>,

    #[arg(long)]
    pub orders: Option<u64>,

    /// Upper bound, in seconds, of a client's `[1, creating_time]` (§4.6)
    /// transaction-creation interval.
    #[arg(long = "creating-time")]
    pub creating_time: Option<f64>,

    /// Scalability/smoke mode: a small fixed-size run used for quick checks.
    #[arg(long)]
    pub test: bool,

    /// Seed the per-node RNGs deterministically, for reproducible tests.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Where to write the final per-node statistics JSON (stdout if unset).
    #[arg(long)]
    pub out: Option<String>,

    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub block_size: Option<u32>,
    #[serde(default = "default_no_blocks")]
    pub no_blocks: u64,
    #[serde(default = "default_nodes")]
    pub nodes: u64,
    #[serde(default = "default_miners")]
    pub miners: u64,
    #[serde(default)]
    pub min_connections: Option<usize>,
    #[serde(default)]
    pub max_connections: Option<usize>,
    #[serde(default = "default_block_interval_seconds")]
    pub block_interval_seconds: f64,
    #[serde(default)]
    pub fixed_block_interval: bool,
    #[serde(default)]
    pub inv_timeout_mins: Option<f64>,
    #[serde(default = "default_endorsers")]
    pub endorsers: u64,
    #[serde(default = "default_clients")]
    pub clients: u64,
    #[serde(default)]
    pub orders: u64,
    #[serde(default = "default_ordering_interval_seconds")]
    pub ordering_interval_seconds: f64,
    #[serde(default = "default_creating_time")]
    pub creating_time: f64,
    #[serde(default)]
    pub test: bool,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_no_blocks() -> u64 {
    100
}
fn default_nodes() -> u64 {
    16
}
fn default_miners() -> u64 {
    1
}
fn default_block_interval_seconds() -> f64 {
    15.0
}
fn default_endorsers() -> u64 {
    6
}
fn default_clients() -> u64 {
    10
}
fn default_creating_time() -> f64 {
    20.0
}
fn default_ordering_interval_seconds() -> f64 {
    5.0
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            block_size: None,
            no_blocks: default_no_blocks(),
            nodes: default_nodes(),
            miners: default_miners(),
            min_connections: None,
            max_connections: None,
            block_interval_seconds: default_block_interval_seconds(),
            fixed_block_interval: false,
            inv_timeout_mins: None,
            endorsers: default_endorsers(),
            clients: default_clients(),
            orders: 0,
            ordering_interval_seconds: default_ordering_interval_seconds(),
            creating_time: default_creating_time(),
            test: false,
            seed: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Load `path`, falling back to (and persisting) defaults if it's
    /// missing — mirrors the `timed` project's `Config::load_or_create`.
    pub fn load_or_create(path: &str) -> Result<Self, ConfigError> {
        if Path::new(path).exists() {
            Self::load_from_file(path)
        } else {
            let config = Self::default();
            config.save_to_file(path)?;
            Ok(config)
        }
    }

    /// Apply CLI overrides (a flag that was actually passed wins over the
    /// file/default value), then validate the result is a runnable
    /// topology (§7's fatal-error case).
    pub fn merge_cli(mut self, cli: &CliArgs) -> Result<Self, ConfigError> {
        if cli.block_size.is_some() {
            self.block_size = cli.block_size;
        }
        if let Some(v) = cli.no_blocks {
            self.no_blocks = v;
        }
        if let Some(v) = cli.nodes {
            self.nodes = v;
        }
        if let Some(v) = cli.miners {
            self.miners = v;
        }
        if cli.min_connections.is_some() {
            self.min_connections = cli.min_connections;
        }
        if cli.max_connections.is_some() {
            self.max_connections = cli.max_connections;
        }
        if let Some(v) = cli.block_interval_seconds {
            self.block_interval_seconds = v;
        }
        if cli.fixed_block_interval {
            self.fixed_block_interval = true;
        }
        if cli.inv_timeout_mins.is_some() {
            self.inv_timeout_mins = cli.inv_timeout_mins;
        }
        if let Some(v) = cli.endorsers {
            self.endorsers = v;
        }
        if let Some(v) = cli.clients {
            self.clients = v;
        }
        if let Some(v) = cli.orders {
            self.orders = v;
        }
        if let Some(v) = cli.creating_time {
            self.creating_time = v;
        }
        if cli.test {
            self.test = true;
            self.nodes = self.nodes.min(8).max(4);
            self.no_blocks = self.no_blocks.min(10).max(3);
        }
        if cli.seed.is_some() {
            self.seed = cli.seed;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes == 0 {
            return Err(ConfigError::InvalidValue("--nodes must be at least 1".into()));
        }
        let assigned = self.miners + self.endorsers + self.clients + self.orders;
        if assigned > self.nodes {
            return Err(ConfigError::Topology(format!(
                "miners ({}) + endorsers ({}) + clients ({}) + orders ({}) = {} exceeds --nodes ({})",
                self.miners, self.endorsers, self.clients, self.orders, assigned, self.nodes
            )));
        }
        if self.block_interval_seconds <= 0.0 {
            return Err(ConfigError::InvalidValue("--block-interval-seconds must be positive".into()));
        }
        Ok(())
    }

    pub fn min_connections_resolved(&self) -> usize {
        self.min_connections.unwrap_or_else(|| auto_connections(self.nodes).0)
    }

    pub fn max_connections_resolved(&self) -> usize {
        self.max_connections.unwrap_or_else(|| auto_connections(self.nodes).1)
    }

    /// Each node's RNG is seeded deterministically from `(wall_time,
    /// nodeId)` unless `--seed` pins an explicit value (§9's randomness
    /// design note) — `World::from_config` folds a node's address into
    /// whatever this returns, so only the wall-time component lives here.
    pub fn resolved_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| chrono::Utc::now().timestamp_millis() as u64)
    }

    /// `2x` the block interval (in minutes) for block producers, `4x` for
    /// everyone else, unless `--inv-timeout-mins` pins an explicit value
    /// (§6).
    pub fn inv_timeout_seconds(&self, is_block_producer: bool) -> f64 {
        let block_interval_minutes = self.block_interval_seconds / 60.0;
        let minutes = self
            .inv_timeout_mins
            .unwrap_or(if is_block_producer { 2.0 * block_interval_minutes } else { 4.0 * block_interval_minutes });
        (minutes * 60.0).max(1.0)
    }
}

/// `--min-connections`/`--max-connections` default to "auto" (§6): a modest
/// spread scaled to network size so small test runs stay well-connected
/// and larger ones don't turn into a complete graph.
fn auto_connections(nodes: u64) -> (usize, usize) {
    let n = nodes.max(1) as usize;
    let min = (n / 4).clamp(1, 8);
    let max = (n / 2).clamp(min, 16);
    (min, max)
}

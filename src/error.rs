use thiserror::Error;

/// Errors raised while configuring or launching a simulation run.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid CLI/config value: {0}")]
    InvalidValue(String),

    #[error("topology is unsatisfiable: {0}")]
    Topology(String),

    #[error("config file error: {0}")]
    File(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while a simulation is running.
///
/// None of these stop the simulation on their own: parse failures, unknown
/// messages and timeouts are logged and the run continues. `SimError`
/// exists for the handful of genuinely fatal cases and for plumbing
/// `Result` through components that can fail (codec, JSON stats dump).
#[derive(Error, Debug)]
pub enum SimError {
    #[error("message codec error: {0}")]
    Codec(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown peer address: {0}")]
    UnknownPeer(String),

    #[error("fatal: {0}")]
    Fatal(String),
}

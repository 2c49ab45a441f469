use std::{io, path::PathBuf};

use thiserror::Error;

/// Fatal errors surfaced from `main`.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to open serial port \"{port}\": {source}")]
    SerialOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("failed to list serial ports: {0}")]
    PortListing(#[source] serialport::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to set up logging: {0}")]
    Logging(String),

    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("panel reader thread error: {0}")]
    Reader(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("configuration must define at least one profile")]
    NoProfiles,
}

/// Failure of one of the host capabilities. Never fatal.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("failed to start \"{program}\": {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("\"{program}\" exited with {status}")]
    ExitStatus { program: String, status: String },

    #[error("no volume command configured for this platform")]
    NoVolumeCommand,

    #[error("volume worker thread is not running")]
    WorkerStopped,
}

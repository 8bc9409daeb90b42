use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::LogArgs;

/// Command line interface of the `mega-proxy` tool
#[derive(Parser, Debug)]
#[command(version, about, infer_subcommands = true)]
pub struct Cli {
    /// The command to run
    #[command(subcommand)]
    pub command: MainCmd,

    /// Logging configuration
    #[command(flatten)]
    pub log_args: LogArgs,
}

/// Main command enumeration for the mega-proxy CLI tool
#[derive(Subcommand, Debug)]
pub enum MainCmd {
    /// Predict proxy addresses for an origin
    Predict(crate::predict::Cmd),
    /// Deploy proxies and run forwarded calls against an in-memory world
    Simulate(crate::simulate::Cmd),
    /// Print the selector the proxy extracts from call data
    Selector(crate::selector::Cmd),
}

/// Error types for the main command system
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Failed to set up logging or write output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to serialize output
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Factory rejected a deployment
    #[error("Deployment failed: {0}")]
    Factory(#[from] mega_proxy::FactoryError),
    /// Proxy rejected a call
    #[error("Proxy call failed: {0}")]
    Proxy(#[from] mega_proxy::ProxyError),
}

impl MainCmd {
    /// Execute the main command
    pub fn run(&self) -> Result<(), Error> {
        match self {
            Self::Predict(cmd) => cmd.run(),
            Self::Simulate(cmd) => cmd.run(),
            Self::Selector(cmd) => cmd.run(),
        }
    }
}

/// Prints `value` as pretty JSON if `json` is set, or as `text` otherwise.
pub(crate) fn print_output<T: Serialize>(
    json: bool,
    value: &T,
    text: impl FnOnce() -> String,
) -> Result<(), Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

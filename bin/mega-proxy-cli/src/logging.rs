//! Logging configuration for the mega-proxy CLI tool.
//!
//! Verbosity is set with `-v` flags, overridden by `RUST_LOG` when set. Logs go to stderr unless
//! `--log.file` is given.

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Logging configuration arguments.
#[derive(Debug, Clone, Default, Parser)]
pub struct LogArgs {
    /// Increase logging verbosity (-v = error, -vv = warn, -vvv = info, -vvvv = debug, -vvvvv =
    /// trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log file path. If specified, logs are written to this file instead of stderr.
    #[arg(long = "log.file", visible_aliases = ["log-file"], global = true)]
    pub log_file: Option<PathBuf>,

    /// Disable colorful console logging. Only applies when logging to stderr (no --log.file).
    #[arg(long = "log.no-color", visible_aliases = ["log-no-color"], global = true)]
    pub log_no_color: bool,
}

impl LogArgs {
    /// Returns the filter selected by `RUST_LOG` or, if unset, by the verbosity.
    pub fn filter(&self) -> EnvFilter {
        if std::env::var("RUST_LOG").is_ok() {
            return EnvFilter::from_default_env();
        }
        match self.level() {
            Some(level) => EnvFilter::new(format!("mega_proxy={level},mega_proxy_cli={level}")),
            None => EnvFilter::new("off"),
        }
    }

    /// Returns the level selected by the verbosity, `None` if logging is off.
    pub const fn level(&self) -> Option<Level> {
        match self.verbose {
            0 => None,
            1 => Some(Level::ERROR),
            2 => Some(Level::WARN),
            3 => Some(Level::INFO),
            4 => Some(Level::DEBUG),
            _ => Some(Level::TRACE),
        }
    }

    /// Installs the global tracing subscriber.
    ///
    /// Targets are shown from DEBUG level on. File output never uses ANSI colors.
    pub fn init(&self) -> std::io::Result<()> {
        let show_target = self.verbose >= 4;
        let builder = fmt().with_env_filter(self.filter()).with_target(show_target);

        if let Some(log_file) = &self.log_file {
            let file = std::fs::File::create(log_file)?;
            builder.with_writer(file).with_ansi(false).init();
        } else {
            builder.with_writer(std::io::stderr).with_ansi(!self.log_no_color).init();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, None)]
    #[case(1, Some(Level::ERROR))]
    #[case(3, Some(Level::INFO))]
    #[case(9, Some(Level::TRACE))]
    fn test_verbosity_level(#[case] verbose: u8, #[case] level: Option<Level>) {
        assert_eq!(LogArgs { verbose, ..Default::default() }.level(), level);
    }
}

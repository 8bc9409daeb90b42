//! `mega-proxy` CLI tool for predicting and simulating proxy deployments.
//!
//! Addresses are computed exactly as the factory computes them, so the output of `predict` can be
//! relied upon before a deployment is submitted.

use clap::Parser;

mod cmd;
pub use cmd::*;

mod logging;
pub use logging::*;

/// Address prediction
pub mod predict;
/// Selector extraction
pub mod selector;
/// In-memory deployment simulation
pub mod simulate;

fn main() -> Result<(), Error> {
    set_thread_panic_hook();
    let cli = Cli::parse();
    cli.log_args.init()?;
    cli.command.run().inspect_err(|e| eprintln!("{e}"))
}

/// Sets thread panic hook, useful for having tests that panic.
fn set_thread_panic_hook() {
    use std::{
        backtrace::Backtrace,
        panic::{set_hook, take_hook},
        process::exit,
    };
    let orig_hook = take_hook();
    set_hook(Box::new(move |panic_info| {
        eprintln!("Custom backtrace: {}", Backtrace::capture());
        orig_hook(panic_info);
        exit(1);
    }));
}

//! Repopulse - repository health analysis CLI
//!
//! A fast, local-first audit of a codebase's evolution and current
//! quality: contribution history, complexity, maintainability, and
//! design-balance metrics.

use anyhow::Result;
use clap::Parser;
use repopulse::cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging; RUST_LOG wins over the CLI flag.
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone())),
        )
        .init();

    cli::run(cli)
}

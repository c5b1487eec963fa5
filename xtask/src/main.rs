// Desktop/tooling crate: unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod check;
mod test;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "SlimPort bridge development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the control core for the Cortex-M target and the host
    Check,
    /// Run unit, integration and doc tests
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests (crates/*/tests)
        #[arg(long)]
        integration: bool,
        /// Log bridge state transitions (RUST_LOG=debug, `tracing` feature)
        #[arg(long)]
        trace: bool,
    },
    /// Document the bridge crates with the host `tracing` hooks enabled
    Doc {
        /// Open the slimport docs in a browser
        #[arg(long)]
        open: bool,
        /// Include private items (state-machine internals)
        #[arg(long)]
        private: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => check::run(),
        Commands::Test {
            unit,
            integration,
            trace,
        } => test::run(unit, integration, trace),
        Commands::Doc { open, private } => doc(open, private),
    }
}

fn doc(open: bool, private: bool) -> Result<()> {
    println!("{}", "📚 Documenting platform and slimport...".cyan().bold());

    let mut cmd = Command::new("cargo");
    cmd.args([
        "doc",
        "--no-deps",
        "-p",
        "platform",
        "-p",
        "slimport",
        "--features",
        "slimport/tracing",
    ]);
    if private {
        cmd.arg("--document-private-items");
    }
    if open {
        cmd.arg("--open");
    }

    let status = cmd.status().context("Failed to run cargo doc")?;
    if !status.success() {
        anyhow::bail!("cargo doc exited with {status}");
    }
    println!("{}", "✓ Docs in target/doc/slimport/index.html".green());
    Ok(())
}

//! Seda CLI Binary
//!
//! Command-line interface for reconciling broadcast archive catalogues.

use anyhow::Context;
use clap::Parser;
use seda::logging::init_logging;
use seda::tooling::cli::{Cli, CliContext};
use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let context = CliContext::new(cli.config.clone()).context("Error loading configuration")?;
    let logging = cli.logging_config(&context.config().logging);
    init_logging(Some(&logging)).context("Error initializing logging")?;

    let output = context.execute(&cli.command).await?;
    println!("{}", output);
    Ok(())
}

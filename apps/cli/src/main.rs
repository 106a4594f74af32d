//! Outreach CLI: batch prospect research and email drafting.
//!
//! Reads a prospect CSV, runs each prospect through a research call and an
//! email call against the model gateway, and writes CSV, Markdown and text
//! reports.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

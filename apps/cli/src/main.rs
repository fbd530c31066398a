//! Curricula CLI: harvest curriculum pages and import them into a
//! relational store.
//!
//! `scrape` writes the intermediate JSON document, `import` loads it into
//! libSQL exactly once.

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

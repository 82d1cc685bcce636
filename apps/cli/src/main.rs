//! rosterscrape CLI: harvest a people roster from client-rendered detail views.
//!
//! Opens every roster entry's detail panel in a headless browser, extracts
//! the labelled fields and biography, and writes JSON and CSV artifacts.

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

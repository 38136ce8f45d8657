//! mealiesync CLI — rule-driven category and tag assignment for Mealie.
//!
//! Periodically runs filter queries against a Mealie server and adds or
//! removes categories and tags on the matching recipes.

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

//! `pressroom`: index a document corpus and run the editorial pipeline on it.

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

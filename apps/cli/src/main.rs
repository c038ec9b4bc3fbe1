//! Underwriter CLI — litigation funding intake analysis.
//!
//! Sends a structured case intake to the model, segments the answer into
//! verdict-tagged sections, and can serve the same flow over HTTP.

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

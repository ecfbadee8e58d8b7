//! campus CLI — canteen dish catalog and laundry availability.
//!
//! Queries the dish catalog (remote API or CSV snapshot) and polls laundry
//! machine state from the command line.

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

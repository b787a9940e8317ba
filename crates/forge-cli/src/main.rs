//! Forge CLI - generate and validate UI components from the command line
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

use anyhow::Result;
use clap::Parser as _;
use cli::{Cli, Commands};

mod cli;
mod handlers;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    handlers::init_tracing();

    match cli.command {
        Commands::Generate(args) => handlers::handle_generate(args).await,
        Commands::Validate { file, tenant } => handlers::handle_validate(&file, &tenant).await,
    }
}

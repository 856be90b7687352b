//! rClockIn library root.
//! Exposes the CLI parser, the high-level run() function and the internal modules.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod ledger;
pub mod remote;
pub mod report;
pub mod ui;
pub mod utils;

use clap::Parser;
use cli::parser::{Cli, Commands};
use config::Paths;
use errors::AppResult;
use tracing::debug;

use app::Context;

/// Central command dispatcher
pub async fn dispatch(cli: &Cli, ctx: &Context) -> AppResult<()> {
    match &cli.command {
        Commands::Init => cli::commands::init::handle(ctx),
        Commands::Config { .. } => cli::commands::config::handle(&cli.command, ctx).await,
        Commands::In { .. } => cli::commands::clock::handle_in(&cli.command, ctx),
        Commands::Out { .. } => cli::commands::clock::handle_out(&cli.command, ctx).await,
        Commands::Status => cli::commands::clock::handle_status(ctx),
        Commands::List { .. } => cli::commands::list::handle(&cli.command, ctx),
        Commands::Report { .. } => cli::commands::report::handle(&cli.command, ctx),
        Commands::Login => cli::commands::login::handle(ctx).await,
        Commands::Shell => cli::commands::shell::handle(ctx).await,
    }
}

/// Entry point used by main.rs
pub async fn run() -> AppResult<()> {
    let cli = Cli::parse();
    let paths = Paths::resolve(cli.dir.as_deref());

    // a logging setup failure is not fatal
    let _guard = std::fs::create_dir_all(paths.logs_dir())
        .and_then(|_| utils::logging::enable_logging(&paths.logs_dir(), cli.verbose))
        .map_err(|e| {
            if cli.verbose {
                eprintln!("⚠️ Logging disabled: {e}");
            }
        })
        .ok();
    debug!(dir = %paths.dir.display(), "data directory");

    let ctx = Context::load(paths)?;
    dispatch(&cli, &ctx).await
}

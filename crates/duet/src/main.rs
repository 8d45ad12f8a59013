// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Duet - command-line client for the matchmaking and moderation backend.
//!
//! This is the binary entry point. Calls themselves need a calling platform
//! and run inside the app; the CLI covers the backend-only flows.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod check;
mod notifier;
mod report;
mod search;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use duet_config::DuetConfig;

/// Duet - time-boxed, audio-only conversations with strangers.
#[derive(Parser, Debug)]
#[command(name = "duet", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate the configuration, then print a summary.
    Check,
    /// Show the account's star balance and moderation status.
    Status,
    /// Report a user.
    Report {
        /// Id of the user being reported.
        user_id: String,
        /// Why the user is being reported.
        reason: String,
    },
    /// Join the matchmaking queue and wait for a partner.
    Search,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            duet_config::render_errors(errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.client.log_level);

    let result = match cli.command {
        Some(Commands::Check) => {
            check::print_summary(&config);
            Ok(())
        }
        Some(Commands::Status) => status::run_status(&config).await,
        Some(Commands::Report { user_id, reason }) => {
            report::run_report(&config, &user_id, &reason).await
        }
        Some(Commands::Search) => search::run_search(&config).await,
        None => {
            println!("duet: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(2);
    }
}

fn load_config(
    path: Option<&std::path::Path>,
) -> Result<DuetConfig, Vec<duet_config::ConfigError>> {
    match path {
        Some(path) => duet_config::load_and_validate_path(path),
        None => duet_config::load_and_validate(),
    }
}

/// Initialize the tracing subscriber with the configured log level.
///
/// `RUST_LOG` overrides the config value when set.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("duet={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

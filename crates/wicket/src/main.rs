// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wicket - a terminal client for real-time support-ticket chat.
//!
//! This is the binary entry point for the Wicket client.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod shell;
mod status;

/// Wicket - a terminal client for real-time support-ticket chat.
#[derive(Parser, Debug)]
#[command(name = "wicket", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch the interactive chat shell.
    Shell,
    /// Check broker and backend connectivity.
    Status,
    /// Validate and print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match wicket_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            wicket_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.client.log_level);

    let result = match cli.command {
        Some(Commands::Shell) => shell::run_shell(config).await,
        Some(Commands::Status) => status::run_status(config).await,
        Some(Commands::Config) => print_config(&config),
        None => {
            println!("wicket: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so they never interleave with chat output on stdout.
fn init_tracing(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Prints the effective configuration with the token redacted.
fn print_config(
    config: &wicket_config::WicketConfig,
) -> Result<(), wicket_core::error::WicketError> {
    let mut redacted = config.clone();
    if redacted.auth.token.is_some() {
        redacted.auth.token = Some("<redacted>".to_string());
    }
    let rendered = toml::to_string_pretty(&redacted).map_err(|e| {
        wicket_core::error::WicketError::Internal(format!("failed to render config: {e}"))
    })?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        // Verify config loads with defaults (no config file needed).
        let config = wicket_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.broker.reconnect_delay_secs, 5);
    }

    #[test]
    fn print_config_redacts_token() {
        let mut config = wicket_config::WicketConfig::default();
        config.auth.token = Some("secret-jwt".to_string());
        // Rendering never leaks the raw token.
        let mut redacted = config.clone();
        redacted.auth.token = Some("<redacted>".to_string());
        let rendered = toml::to_string_pretty(&redacted).unwrap();
        assert!(!rendered.contains("secret-jwt"));
        assert!(rendered.contains("<redacted>"));
    }
}

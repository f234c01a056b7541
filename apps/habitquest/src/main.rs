//! # HabitQuest
//!
//! The main binary for the HabitQuest habit tracker.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │              apps/habitquest (THE BINARY)         │
//! │                                                   │
//! │   ┌─────────────┐          ┌──────────────────┐   │
//! │   │   CLI       │          │  Config          │   │
//! │   │  (clap)     │          │  (toml + env)    │   │
//! │   └──────┬──────┘          └────────┬─────────┘   │
//! │          └──────────────┬───────────┘             │
//! │                         ▼                         │
//! │               ┌──────────────────┐                │
//! │               │ habitquest-core  │                │
//! │               │   (THE RULES)    │                │
//! │               └──────────────────┘                │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! habitquest init
//! habitquest habit add -n "Morning run" -t body -x 25
//! habitquest habit complete 1
//! habitquest gate analyze 1
//! habitquest stats --json-mode
//! ```

use clap::Parser;
use habitquest::cli;
use habitquest::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // Config is read before logging starts; its error is reported once tracing is up.
    let config = Config::load(cli.config.as_deref());
    let directive = match &config {
        Ok(config) => config.log_filter_or_default(cli.verbose),
        Err(_) => Config::default().log_filter_or_default(cli.verbose),
    };
    init_tracing(&directive);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(2);
        }
    };

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli, config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing. HABITQUEST_LOG_FORMAT=json enables machine-parseable output.
///
/// `RUST_LOG` takes precedence over the configured directive.
fn init_tracing(directive: &str) {
    let log_format =
        std::env::var("HABITQUEST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| directive.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Print the HabitQuest banner.
fn print_banner() {
    println!(
        r#"
  ╦ ╦╔═╗╔╗ ╦╔╦╗╔═╗ ╦ ╦╔═╗╔═╗╔╦╗
  ╠═╣╠═╣╠╩╗║ ║ ║═╬╗║ ║║╣ ╚═╗ ║
  ╩ ╩╩ ╩╚═╝╩ ╩ ╚═╝╚╚═╝╚═╝╚═╝ ╩

  v{}  Level up by keeping your habits
"#,
        env!("CARGO_PKG_VERSION")
    );
}

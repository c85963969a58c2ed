// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prelix - turns freeform requests into optimized prompts.
//!
//! This is the binary entry point for the Prelix service.

use clap::{Parser, Subcommand};

mod serve;
mod status;

/// Prelix - turns freeform requests into optimized prompts.
#[derive(Parser, Debug)]
#[command(name = "prelix", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Prelix gateway server.
    Serve,
    /// Print the effective configuration as TOML.
    Config,
    /// Check whether a running Prelix instance is healthy.
    Status {
        /// Output structured JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match prelix_config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("prelix: failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => {
                println!("{rendered}");
                Ok(())
            }
            Err(e) => Err(prelix_core::PrelixError::Internal(format!(
                "failed to render configuration: {e}"
            ))),
        },
        Some(Commands::Status { json }) => status::run_status(&config, json).await,
        None => {
            println!("prelix: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("prelix: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_serve() {
        let cli = Cli::parse_from(["prelix", "serve"]);
        assert!(matches!(cli.command, Some(Commands::Serve)));
    }

    #[test]
    fn cli_parses_status_json() {
        let cli = Cli::parse_from(["prelix", "status", "--json"]);
        assert!(matches!(cli.command, Some(Commands::Status { json: true })));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = prelix_config::load().expect("default config should be valid");
        assert_eq!(config.agent.name, "prelix");
    }
}

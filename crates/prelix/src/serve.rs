// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `prelix serve` command implementation.
//!
//! Wires SQLite storage, the Anthropic provider, the clarification workflow
//! controller, and the template repository into the axum gateway, then runs
//! the server until shutdown.

use std::sync::Arc;
use std::time::Instant;

use prelix_anthropic::AnthropicProvider;
use prelix_config::PrelixConfig;
use prelix_core::{PrelixError, StorageAdapter};
use prelix_gateway::{start_server, AuthConfig, GatewayState};
use prelix_storage::SqliteStorage;
use prelix_templates::TemplateRepository;
use prelix_workflow::WorkflowController;
use tracing::{info, warn};

/// Runs the `prelix serve` command.
///
/// Initializes all adapters, builds the gateway state, and serves until
/// the process is terminated.
pub async fn run_serve(config: PrelixConfig) -> Result<(), PrelixError> {
    init_tracing(&config.agent.log_level);

    info!(name = %config.agent.name, "starting prelix serve");

    let storage: Arc<dyn StorageAdapter> = {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        Arc::new(storage)
    };

    let provider = Arc::new(AnthropicProvider::new(&config)?);

    let controller = Arc::new(WorkflowController::new(
        storage.clone(),
        provider,
        &config,
    ));
    let templates = Arc::new(TemplateRepository::new(storage));

    if config.gateway.auth_token.is_none() {
        warn!("gateway auth token not configured -- requests are unauthenticated");
    }

    let state = GatewayState {
        controller,
        templates,
        auth: AuthConfig {
            bearer_token: config.gateway.auth_token.clone(),
        },
        start_time: Instant::now(),
    };

    start_server(&config.gateway, state).await
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the configured log level applies
/// to prelix crates with `warn` for everything else.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("prelix={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

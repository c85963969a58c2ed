// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Claude provider adapter for the Prelix prompt workflow.
//!
//! This crate implements [`ProviderAdapter`] for the Anthropic Messages API.
//! Estimation and optimization calls are single-shot completions; the
//! structured-output parsing lives in the caller.

pub mod client;
pub mod types;

use async_trait::async_trait;
use prelix_config::PrelixConfig;
use prelix_core::types::{HealthStatus, ProviderRequest, ProviderResponse};
use prelix_core::{PrelixError, ProviderAdapter};
use tracing::{debug, info};

use crate::client::AnthropicClient;
use crate::types::{ApiMessage, MessageRequest};

/// Anthropic Claude provider implementing [`ProviderAdapter`].
///
/// API key resolution order: config -> `ANTHROPIC_API_KEY` env var -> error.
pub struct AnthropicProvider {
    client: AnthropicClient,
}

impl AnthropicProvider {
    /// Creates a new Anthropic provider from the given configuration.
    pub fn new(config: &PrelixConfig) -> Result<Self, PrelixError> {
        let api_key = resolve_api_key(&config.anthropic.api_key)?;
        let client = AnthropicClient::new(
            api_key,
            config.anthropic.api_version.clone(),
            config.anthropic.default_model.clone(),
        )?;

        info!(
            model = config.anthropic.default_model,
            "Anthropic provider initialized"
        );

        Ok(Self { client })
    }

    /// Converts a [`ProviderRequest`] to an Anthropic [`MessageRequest`].
    fn to_message_request(&self, request: &ProviderRequest) -> MessageRequest {
        let model = if request.model.is_empty() {
            self.client.default_model().to_string()
        } else {
            request.model.clone()
        };
        MessageRequest {
            model,
            messages: request
                .messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            system: request.system_prompt.clone(),
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, PrelixError> {
        let api_request = self.to_message_request(&request);
        let response = self.client.complete_message(&api_request).await?;

        debug!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "completion received"
        );

        Ok(ProviderResponse {
            id: response.id.clone(),
            content: response.text(),
            model: response.model.clone(),
            stop_reason: response.stop_reason.clone(),
        })
    }

    async fn health_check(&self) -> Result<HealthStatus, PrelixError> {
        // Avoid consuming tokens on health checks; a constructable client
        // with a resolved key is treated as healthy.
        Ok(HealthStatus::Healthy)
    }
}

/// Resolves the API key: config value first, then `ANTHROPIC_API_KEY`.
fn resolve_api_key(configured: &Option<String>) -> Result<String, PrelixError> {
    if let Some(key) = configured {
        if !key.is_empty() {
            return Ok(key.clone());
        }
    }
    std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
        PrelixError::Config(
            "no Anthropic API key: set anthropic.api_key or ANTHROPIC_API_KEY".to_string(),
        )
    })
}

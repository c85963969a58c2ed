// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Final prompt synthesis.
//!
//! Two paths: a purely mechanical template fill (no model call), and a
//! generative path that asks the provider to rewrite the confirmed request
//! into one optimized prompt for the target model.

use std::collections::HashMap;
use std::sync::Arc;

use prelix_core::types::{ProviderMessage, ProviderRequest};
use prelix_core::{PrelixError, PromptType, ProviderAdapter, Template};
use prelix_templates::{auto_fill_all, fill_template};
use tracing::debug;

/// System instruction template for the generative path. `{framework}` and
/// `{target_model}` are substituted before the call.
const OPTIMIZER_PROMPT: &str = "You rewrite a confirmed user request into a single optimized prompt. {framework} The prompt will be run on {target_model}; phrase it for that model. Output only the optimized prompt text, with no preamble and no commentary.";

/// Inputs for one optimization.
pub struct OptimizeRequest<'a> {
    /// The canonical original ask (first user turn of the session).
    pub original_input: &'a str,
    /// The confirmed understanding from the clarification loop.
    pub understanding: &'a str,
    pub prompt_type: PromptType,
    pub target_model: &'a str,
    pub template: Option<&'a Template>,
    /// Explicit placeholder values; absent values are auto-filled from the
    /// original input.
    pub placeholder_values: Option<&'a HashMap<String, String>>,
}

/// Produces the final optimized prompt text.
pub struct PromptOptimizer {
    provider: Arc<dyn ProviderAdapter>,
    model: String,
    max_tokens: u32,
}

impl PromptOptimizer {
    pub fn new(provider: Arc<dyn ProviderAdapter>, model: String, max_tokens: u32) -> Self {
        Self {
            provider,
            model,
            max_tokens,
        }
    }

    /// Produces the optimized prompt.
    ///
    /// With a template this is a pure substitution and never touches the
    /// provider; otherwise a single generative call is made.
    pub async fn optimize(&self, request: OptimizeRequest<'_>) -> Result<String, PrelixError> {
        if let Some(template) = request.template {
            let filled = match request.placeholder_values {
                Some(values) => fill_template(&template.text, values),
                None => {
                    let values = auto_fill_all(&template.placeholders, request.original_input);
                    fill_template(&template.text, &values)
                }
            };
            debug!(template_id = %template.id, "optimized via template fill");
            return Ok(filled);
        }

        let system = OPTIMIZER_PROMPT
            .replace("{framework}", request.prompt_type.framework())
            .replace("{target_model}", request.target_model);

        let user_content = format!(
            "Original request:\n{}\n\nConfirmed understanding:\n{}",
            request.original_input, request.understanding
        );

        let response = self
            .provider
            .complete(ProviderRequest {
                model: self.model.clone(),
                system_prompt: Some(system),
                messages: vec![ProviderMessage {
                    role: "user".to_string(),
                    content: user_content,
                }],
                max_tokens: self.max_tokens,
            })
            .await?;

        debug!(
            provider = self.provider.name(),
            target_model = request.target_model,
            "optimized via generative call"
        );

        Ok(response.content.trim().to_string())
    }

    /// Sends an already-optimized prompt to the provider and returns the
    /// raw reply. The user-gated execute step.
    pub async fn execute(&self, optimized_prompt: &str) -> Result<String, PrelixError> {
        let response = self
            .provider
            .complete(ProviderRequest {
                model: self.model.clone(),
                system_prompt: None,
                messages: vec![ProviderMessage {
                    role: "user".to_string(),
                    content: optimized_prompt.to_string(),
                }],
                max_tokens: self.max_tokens,
            })
            .await?;
        Ok(response.content)
    }
}

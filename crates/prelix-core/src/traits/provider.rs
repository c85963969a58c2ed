// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for LLM backend integrations.

use async_trait::async_trait;

use crate::error::PrelixError;
use crate::types::{HealthStatus, ProviderRequest, ProviderResponse};

/// Adapter for chat-completion-style LLM backends.
///
/// The estimator and optimizer call `complete` and expect free text back;
/// structured-output parsing and its fallbacks live in the caller, behind a
/// single adapter seam, so a strict structured-output provider can replace
/// the regex salvage path wholesale.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Short identifier for logging ("anthropic", "stub", ...).
    fn name(&self) -> &str;

    /// Sends a completion request and returns the full response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, PrelixError>;

    /// Reports whether the backend is reachable.
    async fn health_check(&self) -> Result<HealthStatus, PrelixError> {
        Ok(HealthStatus::Healthy)
    }
}

// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Prelix prompt workflow.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Prelix configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrelixConfig {
    /// Agent identity and logging settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Anthropic API settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Clarification workflow settings.
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Per-user quota settings.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Agent identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the service.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "prelix".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Anthropic API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// Anthropic API key. `None` requires the environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Default model for estimation and optimization calls.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Anthropic API version string.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: default_model(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("prelix").join("prelix.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("prelix.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Clarification workflow configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Safety cap on estimator calls per session. Reaching it forces a
    /// proceed-anyway confirmation offer regardless of confidence.
    #[serde(default = "default_max_estimator_calls")]
    pub max_estimator_calls: u32,

    /// Number of most-recent user strings merged into the estimation
    /// context. The original ask is always retained regardless.
    #[serde(default = "default_context_window_entries")]
    pub context_window_entries: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_estimator_calls: default_max_estimator_calls(),
            context_window_entries: default_context_window_entries(),
        }
    }
}

fn default_max_estimator_calls() -> u32 {
    6
}

fn default_context_window_entries() -> usize {
    32
}

/// Per-user quota configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum number of sessions a user may create.
    #[serde(default = "default_max_sessions_per_user")]
    pub max_sessions_per_user: usize,

    /// User ids exempt from the session quota.
    #[serde(default)]
    pub unlimited_users: Vec<String>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_user: default_max_sessions_per_user(),
            unlimited_users: Vec::new(),
        }
    }
}

fn default_max_sessions_per_user() -> usize {
    10
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Address to bind the server to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token required on every request. `None` disables the gate
    /// (local development only).
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            auth_token: None,
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8686
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = PrelixConfig::default();
        assert_eq!(config.agent.name, "prelix");
        assert_eq!(config.workflow.max_estimator_calls, 6);
        assert_eq!(config.limits.max_sessions_per_user, 10);
        assert_eq!(config.gateway.port, 8686);
        assert!(config.gateway.auth_token.is_none());
        assert!(config.storage.wal_mode);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = PrelixConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: PrelixConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.anthropic.default_model, config.anthropic.default_model);
        assert_eq!(parsed.workflow.context_window_entries, 32);
    }
}

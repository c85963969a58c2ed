// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./prelix.toml` > `~/.config/prelix/prelix.toml`
//! > `/etc/prelix/prelix.toml` with environment variable overrides via the
//! `PRELIX_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::PrelixConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/prelix/prelix.toml` (system-wide)
/// 3. `~/.config/prelix/prelix.toml` (user XDG config)
/// 4. `./prelix.toml` (local directory)
/// 5. `PRELIX_*` environment variables
pub fn load_config() -> Result<PrelixConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PrelixConfig::default()))
        .merge(Toml::file("/etc/prelix/prelix.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("prelix/prelix.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("prelix.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and for callers that carry their own config text.
pub fn load_config_from_str(toml_content: &str) -> Result<PrelixConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PrelixConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PrelixConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PrelixConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `PRELIX_ANTHROPIC_API_KEY` must map to
/// `anthropic.api_key`, not `anthropic.api.key`.
fn env_provider() -> Env {
    Env::prefixed("PRELIX_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("anthropic_", "anthropic.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("workflow_", "workflow.", 1)
            .replacen("limits_", "limits.", 1)
            .replacen("gateway_", "gateway.", 1);
        mapped.into()
    })
}

// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Prelix prompt workflow.
//!
//! Layered TOML configuration (figment) with `PRELIX_` environment variable
//! overrides. See [`loader`] for the merge hierarchy.

#![allow(clippy::result_large_err)]

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::PrelixConfig;

use prelix_core::PrelixError;

/// Loads configuration and wraps figment errors in [`PrelixError::Config`].
pub fn load() -> Result<PrelixConfig, PrelixError> {
    load_config().map_err(|e| PrelixError::Config(e.to_string()))
}

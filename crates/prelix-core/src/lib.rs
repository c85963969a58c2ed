// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Prelix prompt workflow.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Prelix workspace. The storage and
//! provider backends implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::PrelixError;
pub use traits::{ProviderAdapter, StorageAdapter};
pub use types::{
    EstimationResult, HealthStatus, ModelCategory, PromptType, Session, SessionId, Stage,
    Template, Turn, TurnId, TurnKind, READY_CONFIDENCE_THRESHOLD,
};

// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Prelix prompt workflow.

use thiserror::Error;

/// The primary error type used across all Prelix adapter traits and core operations.
#[derive(Debug, Error)]
pub enum PrelixError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// LLM provider errors (API failure, token limits, model not found).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The provider returned output that could not be parsed as the expected
    /// structured result, and salvage extraction also failed.
    #[error("malformed provider response: {message}")]
    MalformedResponse { message: String },

    /// The user has reached the session quota and has no unlimited entitlement.
    /// Must be raised before any session or turn row is written.
    #[error("session limit exceeded (max {limit})")]
    SessionLimitExceeded { limit: usize },

    /// A previous estimator/optimizer call for this session is still in flight.
    #[error("session {session_id} has a request in flight")]
    Busy { session_id: String },

    /// No valid caller identity.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A referenced entity does not exist.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

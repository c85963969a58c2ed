// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the session transcript store and template repository.

use async_trait::async_trait;

use crate::error::PrelixError;
use crate::types::{HealthStatus, ModelCategory, Session, Template, Turn, TurnKind};

/// Adapter for the relational store backing sessions, turns, and templates.
///
/// The turns table is append-only; reads are ordered by creation time
/// ascending. Counter updates must be additive (increment, not overwrite) so
/// concurrent template selections never lose updates.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Initializes the storage backend (migrations, connection, PRAGMAs).
    async fn initialize(&self) -> Result<(), PrelixError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), PrelixError>;

    /// Reports whether the backend is reachable.
    async fn health_check(&self) -> Result<HealthStatus, PrelixError>;

    // --- Session operations ---

    async fn create_session(&self, session: &Session) -> Result<(), PrelixError>;

    async fn get_session(&self, id: &str) -> Result<Option<Session>, PrelixError>;

    async fn list_sessions_for_user(&self, user_id: &str) -> Result<Vec<Session>, PrelixError>;

    /// Number of sessions owned by the user. Drives the creation quota gate.
    async fn count_sessions_for_user(&self, user_id: &str) -> Result<i64, PrelixError>;

    /// Bumps `updated_at`. Called on every turn.
    async fn touch_session(&self, id: &str) -> Result<(), PrelixError>;

    /// User-initiated delete. Sessions are never deleted automatically.
    async fn delete_session(&self, id: &str) -> Result<(), PrelixError>;

    // --- Turn operations (append-only transcript) ---

    async fn insert_turn(&self, turn: &Turn) -> Result<(), PrelixError>;

    /// Turns for a session ordered by creation time ascending.
    async fn get_turns(&self, session_id: &str, limit: Option<i64>)
        -> Result<Vec<Turn>, PrelixError>;

    /// Earliest turn of the given kind, if any. The first `UserInput` turn
    /// is the optimizer's original-ask anchor.
    async fn first_turn_of_kind(
        &self,
        session_id: &str,
        kind: TurnKind,
    ) -> Result<Option<Turn>, PrelixError>;

    // --- Template operations ---

    async fn insert_template(&self, template: &Template) -> Result<(), PrelixError>;

    async fn get_template(&self, id: &str) -> Result<Option<Template>, PrelixError>;

    /// Active templates in a category, ordered by priority descending then id.
    async fn templates_by_category(
        &self,
        category: ModelCategory,
    ) -> Result<Vec<Template>, PrelixError>;

    /// All active templates across categories.
    async fn list_active_templates(&self) -> Result<Vec<Template>, PrelixError>;

    /// Additive usage-count increment (`usage_count = usage_count + 1`).
    async fn increment_template_usage(&self, id: &str) -> Result<(), PrelixError>;

    /// Folds a feedback score into the running effectiveness average.
    async fn record_template_feedback(&self, id: &str, score: f64) -> Result<(), PrelixError>;

    /// Soft activation toggle. Templates are deactivated, not deleted.
    async fn set_template_active(&self, id: &str, active: bool) -> Result<(), PrelixError>;

    /// Hard delete, explicit admin action only.
    async fn delete_template(&self, id: &str) -> Result<(), PrelixError>;

    /// Records that a template was applied in a session. Returns `true` the
    /// first time for a given (session, template) pair and `false` after,
    /// so confirmed uses increment usage_count at most once.
    async fn record_template_applied(
        &self,
        session_id: &str,
        template_id: &str,
    ) -> Result<bool, PrelixError>;
}

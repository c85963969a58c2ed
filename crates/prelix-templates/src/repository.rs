// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template repository over the storage adapter.
//!
//! Templates are read-many/write-rarely: lookups dominate, mutations are
//! usage-count increments and feedback updates. Usage increments are
//! guarded to at-most-once per (session, template) pair.

use std::sync::Arc;

use prelix_core::{ModelCategory, PrelixError, StorageAdapter, Template};
use tracing::debug;

use crate::selector::{self, RankedTemplate};

/// Read/rank/feedback facade over stored templates.
pub struct TemplateRepository {
    storage: Arc<dyn StorageAdapter>,
}

impl TemplateRepository {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Active templates in one category.
    pub async fn by_category(&self, category: ModelCategory) -> Result<Vec<Template>, PrelixError> {
        self.storage.templates_by_category(category).await
    }

    /// Active templates across all categories. Used when the selected
    /// model has no mapped category and the filter passes everything.
    pub async fn all_active(&self) -> Result<Vec<Template>, PrelixError> {
        self.storage.list_active_templates().await
    }

    /// Fetches one template or a typed not-found error.
    pub async fn get(&self, id: &str) -> Result<Template, PrelixError> {
        self.storage
            .get_template(id)
            .await?
            .ok_or_else(|| PrelixError::NotFound {
                what: "template",
                id: id.to_string(),
            })
    }

    /// Ranks the active templates of a category against the user input.
    pub async fn match_by_input(
        &self,
        category: ModelCategory,
        user_input: &str,
    ) -> Result<Vec<RankedTemplate>, PrelixError> {
        let candidates = self.by_category(category).await?;
        Ok(selector::select(user_input, candidates))
    }

    /// Records a confirmed template use for a session.
    ///
    /// The usage counter only increments the first time a given
    /// (session, template) pair is recorded; re-invocation (double click,
    /// client retry) is a no-op.
    pub async fn record_use(&self, session_id: &str, template_id: &str) -> Result<(), PrelixError> {
        let first_use = self
            .storage
            .record_template_applied(session_id, template_id)
            .await?;
        if first_use {
            self.storage.increment_template_usage(template_id).await?;
            debug!(session_id, template_id, "template usage recorded");
        } else {
            debug!(session_id, template_id, "duplicate template use ignored");
        }
        Ok(())
    }

    /// Folds an explicit feedback score into the effectiveness average.
    pub async fn record_feedback(&self, template_id: &str, score: f64) -> Result<(), PrelixError> {
        self.storage.record_template_feedback(template_id, score).await
    }

    /// Soft-deactivates a template; it stays fetchable by id.
    pub async fn deactivate(&self, template_id: &str) -> Result<(), PrelixError> {
        self.storage.set_template_active(template_id, false).await
    }

    /// Hard delete. Explicit admin action only.
    pub async fn remove(&self, template_id: &str) -> Result<(), PrelixError> {
        self.storage.delete_template(template_id).await
    }
}

// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use prelix_config::model::StorageConfig;
use prelix_core::types::{HealthStatus, ModelCategory, Session, Template, Turn, TurnKind};
use prelix_core::{PrelixError, StorageAdapter};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, PrelixError> {
        self.db.get().ok_or_else(|| PrelixError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), PrelixError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| PrelixError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), PrelixError> {
        let db = self.db()?;
        // Checkpoint WAL before close.
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, PrelixError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    // --- Session operations ---

    async fn create_session(&self, session: &Session) -> Result<(), PrelixError> {
        queries::sessions::create_session(self.db()?, session).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, PrelixError> {
        queries::sessions::get_session(self.db()?, id).await
    }

    async fn list_sessions_for_user(&self, user_id: &str) -> Result<Vec<Session>, PrelixError> {
        queries::sessions::list_sessions_for_user(self.db()?, user_id).await
    }

    async fn count_sessions_for_user(&self, user_id: &str) -> Result<i64, PrelixError> {
        queries::sessions::count_sessions_for_user(self.db()?, user_id).await
    }

    async fn touch_session(&self, id: &str) -> Result<(), PrelixError> {
        let now = chrono_now();
        queries::sessions::touch_session(self.db()?, id, &now).await
    }

    async fn delete_session(&self, id: &str) -> Result<(), PrelixError> {
        queries::sessions::delete_session(self.db()?, id).await
    }

    // --- Turn operations ---

    async fn insert_turn(&self, turn: &Turn) -> Result<(), PrelixError> {
        queries::turns::insert_turn(self.db()?, turn).await
    }

    async fn get_turns(
        &self,
        session_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Turn>, PrelixError> {
        queries::turns::get_turns_for_session(self.db()?, session_id, limit).await
    }

    async fn first_turn_of_kind(
        &self,
        session_id: &str,
        kind: TurnKind,
    ) -> Result<Option<Turn>, PrelixError> {
        queries::turns::first_turn_of_kind(self.db()?, session_id, kind).await
    }

    // --- Template operations ---

    async fn insert_template(&self, template: &Template) -> Result<(), PrelixError> {
        queries::templates::insert_template(self.db()?, template).await
    }

    async fn get_template(&self, id: &str) -> Result<Option<Template>, PrelixError> {
        queries::templates::get_template(self.db()?, id).await
    }

    async fn templates_by_category(
        &self,
        category: ModelCategory,
    ) -> Result<Vec<Template>, PrelixError> {
        queries::templates::templates_by_category(self.db()?, category).await
    }

    async fn list_active_templates(&self) -> Result<Vec<Template>, PrelixError> {
        queries::templates::list_active_templates(self.db()?).await
    }

    async fn increment_template_usage(&self, id: &str) -> Result<(), PrelixError> {
        queries::templates::increment_usage(self.db()?, id).await
    }

    async fn record_template_feedback(&self, id: &str, score: f64) -> Result<(), PrelixError> {
        queries::templates::record_feedback(self.db()?, id, score).await
    }

    async fn set_template_active(&self, id: &str, active: bool) -> Result<(), PrelixError> {
        queries::templates::set_active(self.db()?, id, active).await
    }

    async fn delete_template(&self, id: &str) -> Result<(), PrelixError> {
        queries::templates::delete_template(self.db()?, id).await
    }

    async fn record_template_applied(
        &self,
        session_id: &str,
        template_id: &str,
    ) -> Result<bool, PrelixError> {
        let now = chrono_now();
        queries::templates::record_applied(self.db()?, session_id, template_id, &now).await
    }
}

fn chrono_now() -> String {
    // RFC 3339 with millisecond precision, matching turn timestamps.
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    fn make_session(id: &str, user: &str) -> Session {
        Session {
            id: id.to_string(),
            user_id: user.to_string(),
            title: "Untitled".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn make_template(id: &str, category: ModelCategory) -> Template {
        Template {
            id: id.to_string(),
            text: "Write a {length} article about {topic}".to_string(),
            placeholders: vec!["length".to_string(), "topic".to_string()],
            category,
            subcategory: None,
            tags: vec!["article".to_string()],
            priority: 1,
            usage_count: 0,
            effectiveness_score: 0.0,
            active: true,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    async fn open_storage() -> (tempfile::TempDir, SqliteStorage) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let (_dir, storage) = open_storage().await;
        let result = storage.initialize().await;
        assert!(result.is_err(), "second initialize should fail");
    }

    #[tokio::test]
    async fn health_check_fails_when_not_initialized() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("no_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        let result = storage.health_check().await;
        assert!(result.is_err(), "health_check should fail before initialize");
    }

    #[tokio::test]
    async fn session_lifecycle_and_quota_count() {
        let (_dir, storage) = open_storage().await;

        storage.create_session(&make_session("s1", "u1")).await.unwrap();
        storage.create_session(&make_session("s2", "u1")).await.unwrap();
        storage.create_session(&make_session("s3", "u2")).await.unwrap();

        assert_eq!(storage.count_sessions_for_user("u1").await.unwrap(), 2);
        assert_eq!(storage.count_sessions_for_user("u2").await.unwrap(), 1);
        assert_eq!(storage.count_sessions_for_user("nobody").await.unwrap(), 0);

        let fetched = storage.get_session("s1").await.unwrap().unwrap();
        assert_eq!(fetched.user_id, "u1");

        storage.delete_session("s1").await.unwrap();
        assert!(storage.get_session("s1").await.unwrap().is_none());
        assert_eq!(storage.count_sessions_for_user("u1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn turns_read_back_in_creation_order() {
        let (_dir, storage) = open_storage().await;
        storage.create_session(&make_session("s1", "u1")).await.unwrap();

        let mut t1 = Turn::new("t1", "s1", TurnKind::UserInput, "write a poem", "2026-01-01T00:00:01.000Z");
        t1.raw_input = Some("write a poem".to_string());
        let mut t2 = Turn::new("t2", "s1", TurnKind::AiQuestion, "About what?", "2026-01-01T00:00:02.000Z");
        t2.confidence_score = Some(60);
        t2.missing_parameters = Some(vec!["core subject".to_string()]);
        let t3 = Turn::new("t3", "s1", TurnKind::AiClarificationResponse, "about autumn", "2026-01-01T00:00:03.000Z");

        // Insert out of order; reads must still come back by created_at.
        storage.insert_turn(&t2).await.unwrap();
        storage.insert_turn(&t3).await.unwrap();
        storage.insert_turn(&t1).await.unwrap();

        let turns = storage.get_turns("s1", None).await.unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].id, "t1");
        assert_eq!(turns[1].id, "t2");
        assert_eq!(turns[2].id, "t3");
        assert_eq!(turns[1].confidence_score, Some(60));
        assert_eq!(
            turns[1].missing_parameters.as_deref(),
            Some(&["core subject".to_string()][..])
        );
    }

    #[tokio::test]
    async fn first_turn_of_kind_is_stable_anchor() {
        let (_dir, storage) = open_storage().await;
        storage.create_session(&make_session("s1", "u1")).await.unwrap();

        let t1 = Turn::new("t1", "s1", TurnKind::UserInput, "original ask", "2026-01-01T00:00:01.000Z");
        let t2 = Turn::new("t2", "s1", TurnKind::UserInput, "later input", "2026-01-01T00:00:05.000Z");
        storage.insert_turn(&t1).await.unwrap();
        storage.insert_turn(&t2).await.unwrap();

        let first = storage
            .first_turn_of_kind("s1", TurnKind::UserInput)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.content, "original ask");
    }

    #[tokio::test]
    async fn template_queries_filter_active_and_order_by_priority() {
        let (_dir, storage) = open_storage().await;

        let mut high = make_template("tpl-a", ModelCategory::CreativeDesign);
        high.priority = 10;
        let low = make_template("tpl-b", ModelCategory::CreativeDesign);
        let mut inactive = make_template("tpl-c", ModelCategory::CreativeDesign);
        inactive.active = false;
        let other_cat = make_template("tpl-d", ModelCategory::DevelopmentCode);

        for t in [&high, &low, &inactive, &other_cat] {
            storage.insert_template(t).await.unwrap();
        }

        let creative = storage
            .templates_by_category(ModelCategory::CreativeDesign)
            .await
            .unwrap();
        assert_eq!(creative.len(), 2);
        assert_eq!(creative[0].id, "tpl-a", "higher priority first");
        assert_eq!(creative[1].id, "tpl-b");

        let all = storage.list_active_templates().await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn usage_increment_is_additive() {
        let (_dir, storage) = open_storage().await;
        storage
            .insert_template(&make_template("tpl-1", ModelCategory::BusinessMarketing))
            .await
            .unwrap();

        storage.increment_template_usage("tpl-1").await.unwrap();
        storage.increment_template_usage("tpl-1").await.unwrap();
        storage.increment_template_usage("tpl-1").await.unwrap();

        let t = storage.get_template("tpl-1").await.unwrap().unwrap();
        assert_eq!(t.usage_count, 3);
    }

    #[tokio::test]
    async fn feedback_updates_running_average() {
        let (_dir, storage) = open_storage().await;
        storage
            .insert_template(&make_template("tpl-1", ModelCategory::ResearchKnowledge))
            .await
            .unwrap();

        storage.record_template_feedback("tpl-1", 4.0).await.unwrap();
        storage.record_template_feedback("tpl-1", 2.0).await.unwrap();

        let t = storage.get_template("tpl-1").await.unwrap().unwrap();
        assert!((t.effectiveness_score - 3.0).abs() < 1e-9, "got {}", t.effectiveness_score);
    }

    #[tokio::test]
    async fn record_applied_is_first_time_only() {
        let (_dir, storage) = open_storage().await;
        storage.create_session(&make_session("s1", "u1")).await.unwrap();
        storage
            .insert_template(&make_template("tpl-1", ModelCategory::CreativeDesign))
            .await
            .unwrap();

        assert!(storage.record_template_applied("s1", "tpl-1").await.unwrap());
        assert!(!storage.record_template_applied("s1", "tpl-1").await.unwrap());
        // A different session is a fresh pair.
        storage.create_session(&make_session("s2", "u1")).await.unwrap();
        assert!(storage.record_template_applied("s2", "tpl-1").await.unwrap());
    }

    #[tokio::test]
    async fn soft_deactivation_hides_template() {
        let (_dir, storage) = open_storage().await;
        storage
            .insert_template(&make_template("tpl-1", ModelCategory::CreativeDesign))
            .await
            .unwrap();

        storage.set_template_active("tpl-1", false).await.unwrap();
        let creative = storage
            .templates_by_category(ModelCategory::CreativeDesign)
            .await
            .unwrap();
        assert!(creative.is_empty());
        // Still fetchable by id (soft, not deleted).
        assert!(storage.get_template("tpl-1").await.unwrap().is_some());

        storage.delete_template("tpl-1").await.unwrap();
        assert!(storage.get_template("tpl-1").await.unwrap().is_none());
    }
}

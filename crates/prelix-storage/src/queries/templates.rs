// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template table queries.
//!
//! Counters use relative SQL updates (`usage_count = usage_count + 1`) so
//! concurrent increments are additive, never lost to read-modify-write.

use std::str::FromStr;

use prelix_core::{ModelCategory, PrelixError, Template};
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};

const TEMPLATE_COLUMNS: &str = "id, text, placeholders, category, subcategory, tags, \
     priority, usage_count, effectiveness_score, active, created_at";

fn row_to_template(row: &Row<'_>) -> Result<Template, rusqlite::Error> {
    let category_str: String = row.get(3)?;
    let category = ModelCategory::from_str(&category_str).map_err(|_| {
        rusqlite::Error::ModuleError(format!("unknown template category: {category_str}"))
    })?;

    let placeholders_json: String = row.get(2)?;
    let placeholders = serde_json::from_str::<Vec<String>>(&placeholders_json)
        .map_err(|e| rusqlite::Error::ModuleError(format!("bad placeholders JSON: {e}")))?;

    let tags_json: String = row.get(5)?;
    let tags = serde_json::from_str::<Vec<String>>(&tags_json)
        .map_err(|e| rusqlite::Error::ModuleError(format!("bad tags JSON: {e}")))?;

    Ok(Template {
        id: row.get(0)?,
        text: row.get(1)?,
        placeholders,
        category,
        subcategory: row.get(4)?,
        tags,
        priority: row.get(6)?,
        usage_count: row.get(7)?,
        effectiveness_score: row.get(8)?,
        active: row.get::<_, i64>(9)? != 0,
        created_at: row.get(10)?,
    })
}

pub async fn insert_template(db: &Database, template: &Template) -> Result<(), PrelixError> {
    let t = template.clone();
    let placeholders_json =
        serde_json::to_string(&t.placeholders).map_err(|e| PrelixError::Storage {
            source: Box::new(e),
        })?;
    let tags_json = serde_json::to_string(&t.tags).map_err(|e| PrelixError::Storage {
        source: Box::new(e),
    })?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO templates (id, text, placeholders, category, subcategory,
                     tags, priority, usage_count, effectiveness_score, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    t.id,
                    t.text,
                    placeholders_json,
                    t.category.to_string(),
                    t.subcategory,
                    tags_json,
                    t.priority,
                    t.usage_count,
                    t.effectiveness_score,
                    i64::from(t.active),
                    t.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_template(db: &Database, id: &str) -> Result<Option<Template>, PrelixError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Template>, rusqlite::Error> {
            let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params![id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_template(row)?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn templates_by_category(
    db: &Database,
    category: ModelCategory,
) -> Result<Vec<Template>, PrelixError> {
    let category_str = category.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Template>, rusqlite::Error> {
            let sql = format!(
                "SELECT {TEMPLATE_COLUMNS} FROM templates
                 WHERE category = ?1 AND active = 1
                 ORDER BY priority DESC, id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![category_str], row_to_template)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_active_templates(db: &Database) -> Result<Vec<Template>, PrelixError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Template>, rusqlite::Error> {
            let sql = format!(
                "SELECT {TEMPLATE_COLUMNS} FROM templates
                 WHERE active = 1
                 ORDER BY priority DESC, id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], row_to_template)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn increment_usage(db: &Database, id: &str) -> Result<(), PrelixError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE templates SET usage_count = usage_count + 1 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Folds a new feedback score into the running effectiveness average:
/// `avg' = (avg * n + score) / (n + 1)`, with `feedback_count` as `n`.
pub async fn record_feedback(db: &Database, id: &str, score: f64) -> Result<(), PrelixError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE templates
                 SET effectiveness_score =
                         (effectiveness_score * feedback_count + ?2) / (feedback_count + 1),
                     feedback_count = feedback_count + 1
                 WHERE id = ?1",
                params![id, score],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_active(db: &Database, id: &str, active: bool) -> Result<(), PrelixError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE templates SET active = ?2 WHERE id = ?1",
                params![id, i64::from(active)],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_template(db: &Database, id: &str) -> Result<(), PrelixError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM templates WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Records a (session, template) application. Returns `true` only the first
/// time for the pair, so usage increments stay at-most-once per confirmed use.
pub async fn record_applied(
    db: &Database,
    session_id: &str,
    template_id: &str,
    applied_at: &str,
) -> Result<bool, PrelixError> {
    let session_id = session_id.to_string();
    let template_id = template_id.to_string();
    let applied_at = applied_at.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO applied_templates (session_id, template_id, applied_at)
                 VALUES (?1, ?2, ?3)",
                params![session_id, template_id, applied_at],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

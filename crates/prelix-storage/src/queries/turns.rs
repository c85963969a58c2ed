// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn table queries.
//!
//! The transcript is append-only: turns are inserted once and only read
//! back, ordered by creation time ascending (rowid as a stable tie-break
//! for same-millisecond inserts).

use std::str::FromStr;

use prelix_core::{PrelixError, PromptType, Stage, Turn, TurnKind};
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};

const TURN_COLUMNS: &str = "id, session_id, kind, content, confidence_score, \
     missing_parameters, stage, selected_model, optimized_prompt, template_id, \
     template_applied, raw_input, prompt_type, created_at";

fn row_to_turn(row: &Row<'_>) -> Result<Turn, rusqlite::Error> {
    let kind_str: String = row.get(2)?;
    let kind = TurnKind::from_str(&kind_str)
        .map_err(|_| rusqlite::Error::ModuleError(format!("unknown turn kind: {kind_str}")))?;

    let missing_json: Option<String> = row.get(5)?;
    let missing_parameters = match missing_json {
        Some(json) => Some(serde_json::from_str::<Vec<String>>(&json).map_err(|e| {
            rusqlite::Error::ModuleError(format!("bad missing_parameters JSON: {e}"))
        })?),
        None => None,
    };

    let stage_str: Option<String> = row.get(6)?;
    let stage = match stage_str {
        Some(s) => Some(
            Stage::from_str(&s)
                .map_err(|_| rusqlite::Error::ModuleError(format!("unknown stage: {s}")))?,
        ),
        None => None,
    };

    let prompt_type_str: Option<String> = row.get(12)?;
    let prompt_type = match prompt_type_str {
        Some(s) => Some(
            PromptType::from_str(&s)
                .map_err(|_| rusqlite::Error::ModuleError(format!("unknown prompt type: {s}")))?,
        ),
        None => None,
    };

    let confidence: Option<i64> = row.get(4)?;

    Ok(Turn {
        id: row.get(0)?,
        session_id: row.get(1)?,
        kind,
        content: row.get(3)?,
        confidence_score: confidence.map(|c| c.clamp(0, 100) as u8),
        missing_parameters,
        stage,
        selected_model: row.get(7)?,
        optimized_prompt: row.get(8)?,
        template_id: row.get(9)?,
        template_applied: row.get::<_, Option<i64>>(10)?.map(|v| v != 0),
        raw_input: row.get(11)?,
        prompt_type,
        created_at: row.get(13)?,
    })
}

pub async fn insert_turn(db: &Database, turn: &Turn) -> Result<(), PrelixError> {
    let t = turn.clone();
    let missing_json = t
        .missing_parameters
        .as_ref()
        .map(|m| serde_json::to_string(m))
        .transpose()
        .map_err(|e| PrelixError::Storage {
            source: Box::new(e),
        })?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO turns (id, session_id, kind, content, confidence_score,
                     missing_parameters, stage, selected_model, optimized_prompt,
                     template_id, template_applied, raw_input, prompt_type, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    t.id,
                    t.session_id,
                    t.kind.to_string(),
                    t.content,
                    t.confidence_score.map(i64::from),
                    missing_json,
                    t.stage.map(|s| s.to_string()),
                    t.selected_model,
                    t.optimized_prompt,
                    t.template_id,
                    t.template_applied.map(i64::from),
                    t.raw_input,
                    t.prompt_type.map(|p| p.to_string()),
                    t.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_turns_for_session(
    db: &Database,
    session_id: &str,
    limit: Option<i64>,
) -> Result<Vec<Turn>, PrelixError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Turn>, rusqlite::Error> {
            let sql = match limit {
                Some(_) => format!(
                    "SELECT {TURN_COLUMNS} FROM turns WHERE session_id = ?1
                     ORDER BY created_at ASC, rowid ASC LIMIT ?2"
                ),
                None => format!(
                    "SELECT {TURN_COLUMNS} FROM turns WHERE session_id = ?1
                     ORDER BY created_at ASC, rowid ASC"
                ),
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = match limit {
                Some(n) => stmt.query_map(params![session_id, n], row_to_turn)?,
                None => stmt.query_map(params![session_id], row_to_turn)?,
            };
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn first_turn_of_kind(
    db: &Database,
    session_id: &str,
    kind: TurnKind,
) -> Result<Option<Turn>, PrelixError> {
    let session_id = session_id.to_string();
    let kind_str = kind.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Turn>, rusqlite::Error> {
            let sql = format!(
                "SELECT {TURN_COLUMNS} FROM turns
                 WHERE session_id = ?1 AND kind = ?2
                 ORDER BY created_at ASC, rowid ASC LIMIT 1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params![session_id, kind_str])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_turn(row)?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the action surface.
//!
//! A single action-discriminated endpoint (`POST /v1/actions`) drives the
//! whole workflow, plus an unauthenticated health endpoint.

use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use prelix_core::{PrelixError, PromptType, TurnKind};
use prelix_templates::{auto_fill_all, fill_template, selector};
use prelix_workflow::{catalog, stage_from_turns};

use crate::server::GatewayState;

fn default_prompt_type() -> PromptType {
    PromptType::Auto
}

/// Request body for `POST /v1/actions`, discriminated by `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    CreateSession {
        user_id: String,
        #[serde(default)]
        title: String,
    },
    UnderstandInput {
        session_id: String,
        user_input: String,
        #[serde(default = "default_prompt_type")]
        prompt_type: PromptType,
    },
    ProcessClarification {
        session_id: String,
        answer: String,
        #[serde(default = "default_prompt_type")]
        prompt_type: PromptType,
    },
    ConfirmUnderstanding {
        session_id: String,
        #[serde(default)]
        affirmation: Option<String>,
    },
    SelectModel {
        session_id: String,
        model: String,
    },
    GetFilteredTemplates {
        session_id: String,
        model: String,
        #[serde(default)]
        user_input: Option<String>,
    },
    ApplyTemplate {
        session_id: String,
        template_id: String,
        #[serde(default)]
        placeholder_values: Option<HashMap<String, String>>,
    },
    OptimizePrompt {
        session_id: String,
        target_model: String,
        #[serde(default = "default_prompt_type")]
        prompt_type: PromptType,
        #[serde(default)]
        template_id: Option<String>,
        #[serde(default)]
        placeholder_values: Option<HashMap<String, String>>,
    },
    GenerateResponse {
        session_id: String,
        target_model: String,
        #[serde(default = "default_prompt_type")]
        prompt_type: PromptType,
        #[serde(default)]
        template_id: Option<String>,
        #[serde(default)]
        placeholder_values: Option<HashMap<String, String>>,
    },
    ExecutePrompt {
        session_id: String,
        #[serde(default)]
        optimized_prompt: Option<String>,
    },
    SimpleConversation {
        session_id: String,
        text: String,
    },
    GetTranscript {
        session_id: String,
    },
}

/// POST /v1/actions
pub async fn post_actions(
    State(state): State<GatewayState>,
    Json(body): Json<ActionRequest>,
) -> Response {
    match dispatch(&state, body).await {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => error_response(&err),
    }
}

/// GET /v1/health
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
    .into_response()
}

async fn dispatch(
    state: &GatewayState,
    action: ActionRequest,
) -> Result<serde_json::Value, PrelixError> {
    match action {
        ActionRequest::CreateSession { user_id, title } => {
            let session = state.controller.create_session(&user_id, &title).await?;
            Ok(json!({ "session": session }))
        }

        ActionRequest::UnderstandInput {
            session_id,
            user_input,
            prompt_type,
        } => {
            let outcome = state
                .controller
                .understand_input(&session_id, &user_input, prompt_type)
                .await?;
            to_value(outcome)
        }

        ActionRequest::ProcessClarification {
            session_id,
            answer,
            prompt_type,
        } => {
            let outcome = state
                .controller
                .process_clarification(&session_id, &answer, prompt_type)
                .await?;
            to_value(outcome)
        }

        ActionRequest::ConfirmUnderstanding {
            session_id,
            affirmation,
        } => {
            state
                .controller
                .confirm_understanding(&session_id, affirmation.as_deref())
                .await?;
            Ok(json!({ "session_id": session_id, "confirmed": true }))
        }

        ActionRequest::SelectModel { session_id, model } => {
            let category = state.controller.select_model(&session_id, &model).await?;
            Ok(json!({ "session_id": session_id, "model": model, "category": category }))
        }

        ActionRequest::GetFilteredTemplates {
            session_id,
            model,
            user_input,
        } => {
            // Validate the session before touching the template tables.
            let turns = state.controller.get_transcript(&session_id).await?;

            let category = catalog::category_for_model(&model);
            let candidates = match category {
                Some(cat) => state.templates.by_category(cat).await?,
                // Unmapped model: the filter passes everything through.
                None => state.templates.all_active().await?,
            };

            let input = user_input
                .or_else(|| original_ask(&turns))
                .unwrap_or_default();
            let ranked = selector::select(&input, candidates);
            Ok(json!({ "model": model, "category": category, "templates": ranked }))
        }

        ActionRequest::ApplyTemplate {
            session_id,
            template_id,
            placeholder_values,
        } => {
            let turns = state.controller.get_transcript(&session_id).await?;
            let template = state.templates.get(&template_id).await?;

            let values = match placeholder_values {
                Some(values) => values,
                None => {
                    let original = original_ask(&turns).unwrap_or_default();
                    auto_fill_all(&template.placeholders, &original)
                }
            };
            let filled = fill_template(&template.text, &values);
            state.templates.record_use(&session_id, &template_id).await?;

            Ok(json!({
                "session_id": session_id,
                "template_id": template_id,
                "filled_text": filled,
            }))
        }

        ActionRequest::OptimizePrompt {
            session_id,
            target_model,
            prompt_type,
            template_id,
            placeholder_values,
        } => {
            let optimized = state
                .controller
                .optimize_prompt(
                    &session_id,
                    prompt_type,
                    &target_model,
                    template_id.as_deref(),
                    placeholder_values.as_ref(),
                )
                .await?;
            Ok(json!({ "session_id": session_id, "optimized_prompt": optimized }))
        }

        ActionRequest::GenerateResponse {
            session_id,
            target_model,
            prompt_type,
            template_id,
            placeholder_values,
        } => {
            let optimized = state
                .controller
                .generate_response(
                    &session_id,
                    prompt_type,
                    &target_model,
                    template_id.as_deref(),
                    placeholder_values.as_ref(),
                )
                .await?;
            Ok(json!({ "session_id": session_id, "optimized_prompt": optimized }))
        }

        ActionRequest::ExecutePrompt {
            session_id,
            optimized_prompt,
        } => {
            let reply = state
                .controller
                .execute_prompt(&session_id, optimized_prompt.as_deref())
                .await?;
            Ok(json!({ "session_id": session_id, "response": reply }))
        }

        ActionRequest::SimpleConversation { session_id, text } => {
            let reply = state
                .controller
                .simple_conversation(&session_id, &text)
                .await?;
            Ok(json!({ "session_id": session_id, "response": reply }))
        }

        ActionRequest::GetTranscript { session_id } => {
            let turns = state.controller.get_transcript(&session_id).await?;
            Ok(json!({
                "session_id": session_id,
                "stage": stage_from_turns(&turns),
                "turns": turns,
            }))
        }
    }
}

fn original_ask(turns: &[prelix_core::Turn]) -> Option<String> {
    turns
        .iter()
        .find(|t| t.kind == TurnKind::UserInput)
        .map(|t| t.raw_input.clone().unwrap_or_else(|| t.content.clone()))
}

fn to_value<T: serde::Serialize>(value: T) -> Result<serde_json::Value, PrelixError> {
    serde_json::to_value(value).map_err(|e| PrelixError::Internal(e.to_string()))
}

/// Maps workflow errors onto HTTP statuses with stable error codes.
fn error_response(err: &PrelixError) -> Response {
    let (status, code) = match err {
        PrelixError::SessionLimitExceeded { .. } => {
            (StatusCode::FORBIDDEN, "session_limit_exceeded")
        }
        PrelixError::Busy { .. } => (StatusCode::CONFLICT, "busy"),
        PrelixError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
        PrelixError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "action failed");
    }

    (
        status,
        Json(json!({
            "error": { "code": code, "message": err.to_string() }
        })),
    )
        .into_response()
}

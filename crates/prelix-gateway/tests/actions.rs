// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP-level tests for the action endpoint: auth gate, the clarification
//! flow end to end, error status mapping, and template actions.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use prelix_config::PrelixConfig;
use prelix_core::types::{ProviderRequest, ProviderResponse};
use prelix_core::{ModelCategory, PrelixError, ProviderAdapter, StorageAdapter, Template};
use prelix_gateway::{build_router, AuthConfig, GatewayState};
use prelix_storage::SqliteStorage;
use prelix_templates::TemplateRepository;
use prelix_workflow::WorkflowController;

const READY_90: &str = r#"{"understanding": "a complete request", "confidence": 90, "missing_parameters": [], "clarification_question": null}"#;

struct ScriptedProvider {
    script: Mutex<VecDeque<String>>,
}

impl ScriptedProvider {
    fn new(responses: &[&str]) -> Self {
        Self {
            script: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
        }
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, PrelixError> {
        let content = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PrelixError::Internal("scripted provider exhausted".to_string()))?;
        Ok(ProviderResponse {
            id: "r".to_string(),
            content,
            model: "stub".to_string(),
            stop_reason: None,
        })
    }
}

struct TestApp {
    app: Router,
    storage: Arc<SqliteStorage>,
    _dir: tempfile::TempDir,
}

async fn build_app(
    responses: &[&str],
    token: Option<&str>,
    mutate: impl FnOnce(&mut PrelixConfig),
) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = PrelixConfig::default();
    config.storage.database_path = dir.path().join("gateway.db").to_string_lossy().into_owned();
    config.storage.wal_mode = false;
    config.gateway.auth_token = token.map(str::to_string);
    mutate(&mut config);

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await.unwrap();
    let provider = Arc::new(ScriptedProvider::new(responses));

    let controller = Arc::new(WorkflowController::new(
        storage.clone(),
        provider,
        &config,
    ));
    let templates = Arc::new(TemplateRepository::new(storage.clone()));

    let state = GatewayState {
        controller,
        templates,
        auth: AuthConfig {
            bearer_token: config.gateway.auth_token.clone(),
        },
        start_time: std::time::Instant::now(),
    };

    TestApp {
        app: build_router(state),
        storage,
        _dir: dir,
    }
}

async fn post_action(app: &Router, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/v1/actions")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn template(id: &str, category: ModelCategory) -> Template {
    Template {
        id: id.to_string(),
        text: "Write a {length} blog post about {topic} for {target_audience}.".to_string(),
        placeholders: vec![
            "length".to_string(),
            "topic".to_string(),
            "target_audience".to_string(),
        ],
        category,
        subcategory: None,
        tags: vec!["blog".to_string()],
        priority: 0,
        usage_count: 0,
        effectiveness_score: 0.5,
        active: true,
        created_at: "2026-01-01T00:00:00.000Z".to_string(),
    }
}

#[tokio::test]
async fn health_is_unauthenticated() {
    let test = build_app(&[], Some("secret"), |_| {}).await;

    let request = Request::builder()
        .method("GET")
        .uri("/v1/health")
        .body(Body::empty())
        .unwrap();
    let response = test.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn actions_require_valid_bearer_token() {
    let test = build_app(&[], Some("secret"), |_| {}).await;
    let create = json!({ "action": "create_session", "user_id": "u1" });

    let (status, _) = post_action(&test.app, None, create.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post_action(&test.app, Some("wrong"), create.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Nothing was written for the rejected requests.
    let sessions = test.storage.list_sessions_for_user("u1").await.unwrap();
    assert!(sessions.is_empty());

    let (status, body) = post_action(&test.app, Some("secret"), create).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["session"]["id"].is_string());
}

#[tokio::test]
async fn clarification_flow_end_to_end() {
    let test = build_app(&[READY_90], None, |_| {}).await;

    let (status, body) = post_action(
        &test.app,
        None,
        json!({ "action": "create_session", "user_id": "u1", "title": "docs" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let session_id = body["session"]["id"].as_str().unwrap().to_string();

    let (status, body) = post_action(
        &test.app,
        None,
        json!({
            "action": "understand_input",
            "session_id": session_id,
            "user_input": "write docs for my API",
            "prompt_type": "instructional",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready_for_confirmation"], true);
    assert_eq!(body["confidence"], 90);

    let (status, _) = post_action(
        &test.app,
        None,
        json!({ "action": "confirm_understanding", "session_id": session_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_action(
        &test.app,
        None,
        json!({ "action": "select_model", "session_id": session_id, "model": "gpt-4.1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category"], "development_code");

    let (status, body) = post_action(
        &test.app,
        None,
        json!({ "action": "get_transcript", "session_id": session_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = body["turns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["kind"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec![
            "user_input",
            "ai_understanding",
            "confirmation",
            "model_selection",
        ]
    );
}

#[tokio::test]
async fn session_limit_maps_to_403_with_code() {
    let test = build_app(&[], None, |c| c.limits.max_sessions_per_user = 1).await;

    let create = json!({ "action": "create_session", "user_id": "u1" });
    let (status, _) = post_action(&test.app, None, create.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_action(&test.app, None, create).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "session_limit_exceeded");
}

#[tokio::test]
async fn unknown_session_maps_to_404() {
    let test = build_app(&[], None, |_| {}).await;
    let (status, body) = post_action(
        &test.app,
        None,
        json!({
            "action": "understand_input",
            "session_id": "no-such-session",
            "user_input": "hello",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn apply_template_fills_and_counts_once() {
    let test = build_app(&[READY_90], None, |_| {}).await;
    test.storage
        .insert_template(&template("tpl-blog", ModelCategory::CreativeDesign))
        .await
        .unwrap();

    let (_, body) = post_action(
        &test.app,
        None,
        json!({ "action": "create_session", "user_id": "u1" }),
    )
    .await;
    let session_id = body["session"]["id"].as_str().unwrap().to_string();

    post_action(
        &test.app,
        None,
        json!({
            "action": "understand_input",
            "session_id": session_id,
            "user_input": "Write a blog post about renewable energy for small business owners, keep it short",
        }),
    )
    .await;

    let apply = json!({
        "action": "apply_template",
        "session_id": session_id,
        "template_id": "tpl-blog",
    });
    let (status, body) = post_action(&test.app, None, apply.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let filled = body["filled_text"].as_str().unwrap();
    assert!(filled.contains("renewable energy"));
    assert!(filled.starts_with("Write a brief blog post"));

    // Double-invocation counts the use once.
    let (status, _) = post_action(&test.app, None, apply).await;
    assert_eq!(status, StatusCode::OK);
    let stored = test.storage.get_template("tpl-blog").await.unwrap().unwrap();
    assert_eq!(stored.usage_count, 1);
}

#[tokio::test]
async fn filtered_templates_respect_model_category() {
    let test = build_app(&[], None, |_| {}).await;
    test.storage
        .insert_template(&template("tpl-creative", ModelCategory::CreativeDesign))
        .await
        .unwrap();
    test.storage
        .insert_template(&template("tpl-dev", ModelCategory::DevelopmentCode))
        .await
        .unwrap();

    let (_, body) = post_action(
        &test.app,
        None,
        json!({ "action": "create_session", "user_id": "u1" }),
    )
    .await;
    let session_id = body["session"]["id"].as_str().unwrap().to_string();

    // Mapped model: only its category survives.
    let (status, body) = post_action(
        &test.app,
        None,
        json!({
            "action": "get_filtered_templates",
            "session_id": session_id,
            "model": "gpt-4o",
            "user_input": "a blog post",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["templates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["template"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["tpl-creative"]);

    // Unmapped model: everything passes through.
    let (status, body) = post_action(
        &test.app,
        None,
        json!({
            "action": "get_filtered_templates",
            "session_id": session_id,
            "model": "mystery-model",
            "user_input": "a blog post",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["templates"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_action_body_is_client_error() {
    let test = build_app(&[], None, |_| {}).await;
    let (status, _) = post_action(&test.app, None, json!({ "action": "no_such_action" })).await;
    assert!(status.is_client_error());
}

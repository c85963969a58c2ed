// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-backed confidence estimation for incoming requests.
//!
//! One provider call per estimation. The model is instructed to return a
//! JSON judgment; parsing handles code fences, surrounding prose, and
//! malformed output with a salvage pass and a hard fallback so an
//! estimation never fails on bad model output. Provider transport errors
//! still propagate.

use std::sync::Arc;
use std::sync::OnceLock;

use prelix_core::types::{ProviderMessage, ProviderRequest};
use prelix_core::{EstimationResult, PrelixError, PromptType, ProviderAdapter};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

/// System instruction for the estimation call. The weighting and thresholds
/// here govern user-visible behavior and must stay in sync with
/// [`prelix_core::READY_CONFIDENCE_THRESHOLD`].
const ESTIMATION_PROMPT: &str = r#"You assess whether a user's request contains enough information to write an optimized prompt for it. Score confidence 0-100 against four essential parameter classes, weighted:

- Output format/type (40): what kind of artifact is wanted (essay, code, list, email, ...)
- Core subject (30): what the request is actually about
- Purpose (20): what the result will be used for
- Critical constraints (10): hard requirements that change the result

Only missing ESSENTIAL information lowers confidence. Stylistic, tone, or length preferences are never missing-essential. Thresholds:
- confidence >= 85: enough to proceed; set ready_for_confirmation true and ask nothing
- 70-84: one essential gap; ask one question about it
- below 70: multiple gaps; ask only the single most important question

Ask AT MOST one clarification question. Never compound several questions into one.

Respond with a JSON object only, no explanation:
{"understanding": "<one-paragraph restatement of the request>", "confidence": <0-100>, "missing_parameters": ["<essential gap>", ...], "clarification_question": "<one question or null>", "ready_for_confirmation": <bool>}"#;

/// Hard-fallback question used when the model output yields nothing usable.
const FALLBACK_QUESTION: &str =
    "Could you tell me a bit more about what you need? What should the result look like, and what will it be used for?";

/// Generic missing parameter attached to fallback results.
const FALLBACK_MISSING: &str = "request details";

/// Confidence pinned on unparseable output so the loop keeps questioning.
const FALLBACK_CONFIDENCE: u8 = 50;

#[derive(Debug, Deserialize)]
struct RawEstimation {
    #[serde(default)]
    understanding: String,
    /// Accepts both integer and float confidence from the model.
    confidence: Option<f64>,
    #[serde(default)]
    missing_parameters: Vec<String>,
    #[serde(default)]
    clarification_question: Option<String>,
    // ready_for_confirmation is recomputed from the threshold, never trusted.
}

/// Produces structured confidence judgments via the provider.
pub struct ConfidenceEstimator {
    provider: Arc<dyn ProviderAdapter>,
    model: String,
    max_tokens: u32,
}

impl ConfidenceEstimator {
    pub fn new(provider: Arc<dyn ProviderAdapter>, model: String, max_tokens: u32) -> Self {
        Self {
            provider,
            model,
            max_tokens,
        }
    }

    /// One estimation round: provider call plus resilient parse.
    ///
    /// `prior_context` is the merged user-authored history; `transcript`
    /// the rendered conversation so far. Bad model output degrades to the
    /// fallback result instead of erroring.
    pub async fn estimate(
        &self,
        user_input: &str,
        prompt_type: PromptType,
        prior_context: &str,
        transcript: &str,
    ) -> Result<EstimationResult, PrelixError> {
        let user_content = build_estimation_input(user_input, prompt_type, prior_context, transcript);

        let request = ProviderRequest {
            model: self.model.clone(),
            system_prompt: Some(ESTIMATION_PROMPT.to_string()),
            messages: vec![ProviderMessage {
                role: "user".to_string(),
                content: user_content,
            }],
            max_tokens: self.max_tokens,
        };

        let response = self.provider.complete(request).await?;
        let result = parse_estimation_response(&response.content);

        debug!(
            provider = self.provider.name(),
            confidence = result.confidence,
            ready = result.ready_for_confirmation,
            "estimation complete"
        );

        Ok(result)
    }
}

fn build_estimation_input(
    user_input: &str,
    prompt_type: PromptType,
    prior_context: &str,
    transcript: &str,
) -> String {
    let mut input = format!("Prompt type: {prompt_type}\n\nLatest user input:\n{user_input}\n");
    if !prior_context.trim().is_empty() {
        input.push_str(&format!("\nAccumulated user context:\n{prior_context}\n"));
    }
    if !transcript.trim().is_empty() {
        input.push_str(&format!("\nConversation so far:\n{transcript}\n"));
    }
    input
}

/// Parses the model's judgment, tolerating fences and surrounding prose.
///
/// Never fails: unparseable output goes through a regex salvage pass, then
/// the hard fallback (confidence pinned at 50, one generic gap, generic
/// question) so the turn transcript always stays consistent.
pub fn parse_estimation_response(raw: &str) -> EstimationResult {
    let trimmed = raw.trim();

    // Locate the JSON object inside fences or prose.
    let start = trimmed.find('{').unwrap_or(0);
    let end = trimmed.rfind('}').map(|i| i + 1).unwrap_or(trimmed.len());
    let json_str = trimmed.get(start..end).unwrap_or(trimmed);

    let result = match serde_json::from_str::<RawEstimation>(json_str) {
        Ok(parsed) => {
            let confidence = parsed
                .confidence
                .map(|c| c.clamp(0.0, 100.0).round() as u8)
                .unwrap_or(FALLBACK_CONFIDENCE);
            EstimationResult::normalized(
                parsed.understanding,
                confidence,
                parsed.missing_parameters,
                parsed.clarification_question,
            )
        }
        Err(e) => {
            warn!(error = %e, "estimation response unparseable, attempting salvage");
            salvage_estimation(trimmed)
        }
    };
    ensure_question(result)
}

/// A not-ready result must carry exactly one non-empty question; if the
/// model withheld one, substitute the generic fallback.
fn ensure_question(mut result: EstimationResult) -> EstimationResult {
    if !result.ready_for_confirmation && result.clarification_question.is_none() {
        result.clarification_question = Some(FALLBACK_QUESTION.to_string());
        if result.missing_parameters.is_empty() {
            result.missing_parameters.push(FALLBACK_MISSING.to_string());
        }
    }
    result
}

fn question_fragment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""clarification_question"\s*:\s*"((?:[^"\\]|\\.)+)""#).expect("question regex")
    })
}

fn understanding_fragment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""understanding"\s*:\s*"((?:[^"\\]|\\.)+)""#).expect("understanding regex")
    })
}

/// Best-effort extraction of usable fragments from broken output, falling
/// back to the fixed generic result.
fn salvage_estimation(raw: &str) -> EstimationResult {
    let question = question_fragment_re()
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| unescape_fragment(m.as_str()));
    let understanding = understanding_fragment_re()
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| unescape_fragment(m.as_str()))
        .unwrap_or_default();

    if question.is_some() {
        debug!("salvaged clarification question from malformed response");
    }

    EstimationResult::normalized(
        understanding,
        FALLBACK_CONFIDENCE,
        vec![FALLBACK_MISSING.to_string()],
        Some(question.unwrap_or_else(|| FALLBACK_QUESTION.to_string())),
    )
}

fn unescape_fragment(s: &str) -> String {
    s.replace("\\\"", "\"").replace("\\n", "\n").replace("\\\\", "\\")
}

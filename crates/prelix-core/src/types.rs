// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Prelix workflow.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// Unique identifier for a persisted turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Kind of a persisted conversation turn.
///
/// Turn kinds form a closed set. Storage serializes them via `Display` and
/// parses them back via `FromStr`; an unrecognized tag in the database is a
/// storage error, never a silently-passed string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    /// A user request. The first one in a session is the canonical
    /// original ask used by the prompt optimizer.
    UserInput,
    /// User confirmed the understanding (forcibly advances the workflow).
    Confirmation,
    /// Estimator reported readiness; content is the confirmation prompt.
    AiUnderstanding,
    /// Estimator asked a clarifying question; content is the question only.
    AiQuestion,
    /// User answered a clarifying question.
    AiClarificationResponse,
    /// Announces the chosen downstream model.
    ModelSelection,
    /// Holds the final optimized prompt verbatim.
    AiResponse,
    /// Raw reply from an explicit execute step.
    ExecutedResponse,
    /// Casual conversation, user side.
    SimpleUser,
    /// Casual conversation, assistant side.
    SimpleAssistant,
}

impl TurnKind {
    /// Returns true for kinds authored by the user.
    pub fn is_user_authored(self) -> bool {
        matches!(
            self,
            TurnKind::UserInput
                | TurnKind::Confirmation
                | TurnKind::AiClarificationResponse
                | TurnKind::SimpleUser
        )
    }
}

/// Stage of the clarification loop, reconstructible from turn history.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Initial,
    Questioning,
    ReadyForConfirmation,
}

/// Prompt type selected by the user, each mapping to a one-sentence
/// methodological framework used by the generative optimizer path.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
    Research,
    Creative,
    Instructional,
    Analytical,
    ProblemSolving,
    Auto,
}

impl PromptType {
    /// Fixed framework guidance embedded into the optimizer's system instruction.
    pub fn framework(self) -> &'static str {
        match self {
            PromptType::Research => {
                "Structure the prompt to request sourced, verifiable findings with explicit scope boundaries."
            }
            PromptType::Creative => {
                "Structure the prompt to establish voice, mood, and creative constraints before the ask."
            }
            PromptType::Instructional => {
                "Structure the prompt to request ordered steps with prerequisites stated up front."
            }
            PromptType::Analytical => {
                "Structure the prompt to request explicit criteria, comparisons, and a reasoned conclusion."
            }
            PromptType::ProblemSolving => {
                "Structure the prompt to state the problem, constraints, and desired solution shape before asking for options."
            }
            PromptType::Auto => {
                "Choose the most fitting methodology from the request itself and structure the prompt accordingly."
            }
        }
    }
}

/// The four fixed model categories used to filter templates after model choice.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ModelCategory {
    /// Development & Code Execution.
    DevelopmentCode,
    /// Research & Knowledge Work.
    ResearchKnowledge,
    /// Creative & Design.
    CreativeDesign,
    /// Business & Marketing.
    BusinessMarketing,
}

/// One persisted unit of conversation in a session.
///
/// Turns are append-only: created once, never mutated, read back ordered by
/// creation time ascending for context reconstruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub session_id: String,
    pub kind: TurnKind,
    /// User-facing text only. Raw structured payloads never land here.
    pub content: String,
    pub confidence_score: Option<u8>,
    pub missing_parameters: Option<Vec<String>>,
    pub stage: Option<Stage>,
    pub selected_model: Option<String>,
    pub optimized_prompt: Option<String>,
    pub template_id: Option<String>,
    pub template_applied: Option<bool>,
    pub raw_input: Option<String>,
    pub prompt_type: Option<PromptType>,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

impl Turn {
    /// Creates a bare turn with all optional fields unset.
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        kind: TurnKind,
        content: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            kind,
            content: content.into(),
            confidence_score: None,
            missing_parameters: None,
            stage: None,
            selected_model: None,
            optimized_prompt: None,
            template_id: None,
            template_applied: None,
            raw_input: None,
            prompt_type: None,
            created_at: created_at.into(),
        }
    }
}

/// A conversation session owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A reusable prompt skeleton with named placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    /// Template text containing `{placeholder}` tokens.
    pub text: String,
    /// Ordered placeholder names. Every `{token}` in `text` should appear
    /// here; the filler assumes it but does not enforce it.
    pub placeholders: Vec<String>,
    pub category: ModelCategory,
    pub subcategory: Option<String>,
    pub tags: Vec<String>,
    /// Higher = preferred.
    pub priority: i64,
    pub usage_count: i64,
    pub effectiveness_score: f64,
    pub active: bool,
    pub created_at: String,
}

/// Confidence threshold above which the estimator reports readiness.
pub const READY_CONFIDENCE_THRESHOLD: u8 = 85;

/// Structured judgment produced by the confidence estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    /// Draft restatement of what the user wants.
    pub understanding: String,
    /// 0-100.
    pub confidence: u8,
    /// Missing essential parameters (format, subject, purpose, constraints).
    pub missing_parameters: Vec<String>,
    /// At most one question per estimation.
    pub clarification_question: Option<String>,
    pub ready_for_confirmation: bool,
}

impl EstimationResult {
    /// Builds a result, normalizing the invariants the controller relies on:
    /// confidence is clamped to 100, readiness is recomputed from the
    /// threshold, and a ready result carries no question.
    pub fn normalized(
        understanding: String,
        confidence: u8,
        missing_parameters: Vec<String>,
        clarification_question: Option<String>,
    ) -> Self {
        let confidence = confidence.min(100);
        let ready = confidence >= READY_CONFIDENCE_THRESHOLD;
        let clarification_question = if ready {
            None
        } else {
            clarification_question.filter(|q| !q.trim().is_empty())
        };
        Self {
            understanding,
            confidence,
            missing_parameters,
            clarification_question,
            ready_for_confirmation: ready,
        }
    }
}

/// A single message in a provider chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: String,
    pub content: String,
}

/// A chat-completion request to an LLM provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub messages: Vec<ProviderMessage>,
    pub max_tokens: u32,
}

/// A response from an LLM provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub stop_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn turn_kind_round_trips_through_strings() {
        let kinds = [
            TurnKind::UserInput,
            TurnKind::Confirmation,
            TurnKind::AiUnderstanding,
            TurnKind::AiQuestion,
            TurnKind::AiClarificationResponse,
            TurnKind::ModelSelection,
            TurnKind::AiResponse,
            TurnKind::ExecutedResponse,
            TurnKind::SimpleUser,
            TurnKind::SimpleAssistant,
        ];
        for kind in kinds {
            let s = kind.to_string();
            let parsed = TurnKind::from_str(&s).expect("should parse back");
            assert_eq!(kind, parsed);
        }
        assert_eq!(TurnKind::UserInput.to_string(), "user_input");
        assert_eq!(TurnKind::AiQuestion.to_string(), "ai_question");
    }

    #[test]
    fn turn_kind_rejects_unknown_tag() {
        assert!(TurnKind::from_str("something_else").is_err());
    }

    #[test]
    fn user_authored_kinds() {
        assert!(TurnKind::UserInput.is_user_authored());
        assert!(TurnKind::Confirmation.is_user_authored());
        assert!(TurnKind::AiClarificationResponse.is_user_authored());
        assert!(!TurnKind::AiQuestion.is_user_authored());
        assert!(!TurnKind::AiResponse.is_user_authored());
    }

    #[test]
    fn estimation_result_readiness_follows_threshold() {
        let ready = EstimationResult::normalized("ok".into(), 85, vec![], None);
        assert!(ready.ready_for_confirmation);

        let not_ready = EstimationResult::normalized(
            "partial".into(),
            84,
            vec!["output format".into()],
            Some("What format do you want?".into()),
        );
        assert!(!not_ready.ready_for_confirmation);
        assert_eq!(
            not_ready.clarification_question.as_deref(),
            Some("What format do you want?")
        );
    }

    #[test]
    fn estimation_result_ready_drops_question() {
        let r = EstimationResult::normalized(
            "all clear".into(),
            92,
            vec![],
            Some("leftover question".into()),
        );
        assert!(r.ready_for_confirmation);
        assert!(r.clarification_question.is_none());
    }

    #[test]
    fn estimation_result_clamps_confidence() {
        let r = EstimationResult::normalized("x".into(), 200, vec![], None);
        assert_eq!(r.confidence, 100);
    }

    #[test]
    fn estimation_result_blank_question_dropped() {
        let r = EstimationResult::normalized("x".into(), 60, vec!["subject".into()], Some("  ".into()));
        assert!(r.clarification_question.is_none());
    }

    #[test]
    fn prompt_type_frameworks_are_single_sentences() {
        for pt in [
            PromptType::Research,
            PromptType::Creative,
            PromptType::Instructional,
            PromptType::Analytical,
            PromptType::ProblemSolving,
            PromptType::Auto,
        ] {
            let fw = pt.framework();
            assert!(!fw.is_empty());
            assert_eq!(fw.matches('.').count(), 1, "{pt}: {fw}");
        }
    }

    #[test]
    fn model_category_serialization() {
        let cat = ModelCategory::DevelopmentCode;
        let json = serde_json::to_string(&cat).unwrap();
        assert_eq!(json, "\"development_code\"");
        let parsed: ModelCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(cat, parsed);
    }

    #[test]
    fn turn_new_leaves_optional_fields_unset() {
        let t = Turn::new("t1", "s1", TurnKind::UserInput, "hello", "2026-01-01T00:00:00Z");
        assert!(t.confidence_score.is_none());
        assert!(t.stage.is_none());
        assert!(t.template_id.is_none());
        assert_eq!(t.kind, TurnKind::UserInput);
    }
}

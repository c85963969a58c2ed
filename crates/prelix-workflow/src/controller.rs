// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The clarification loop state machine.
//!
//! Drives repeated confidence estimations across turns, decides when to
//! surface a question versus a confirmation offer, and owns all turn
//! persistence for the workflow. One estimator/optimizer call may be in
//! flight per session at a time; a resubmission while one is outstanding
//! is refused with [`PrelixError::Busy`].

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use prelix_config::model::{LimitsConfig, WorkflowConfig};
use prelix_config::PrelixConfig;
use prelix_core::types::{ProviderMessage, ProviderRequest};
use prelix_core::{
    EstimationResult, ModelCategory, PrelixError, PromptType, ProviderAdapter, Session, Stage,
    StorageAdapter, Turn, TurnKind,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog;
use crate::context::ContextMemory;
use crate::estimator::ConfidenceEstimator;
use crate::optimizer::{OptimizeRequest, PromptOptimizer};

/// Fixed affirmation payloads for the confirm action.
pub const CONFIRMATION_AFFIRMATIONS: [&str; 2] =
    ["Yes, that's correct. Proceed.", "Looks good. Go ahead."];

/// Confirmation offer persisted when the estimator call cap is reached.
const CAP_REACHED_PROMPT: &str =
    "We've clarified quite a bit already. I'll work with what you've told me so far. Shall I proceed?";

/// What the loop tells the caller after each estimation round.
#[derive(Debug, Clone, Serialize)]
pub struct ClarificationOutcome {
    pub session_id: String,
    pub stage: Stage,
    /// User-facing text: the clarifying question or the confirmation offer.
    pub message: String,
    pub confidence: u8,
    pub missing_parameters: Vec<String>,
    pub ready_for_confirmation: bool,
}

/// Orchestrates sessions, the clarification loop, and prompt production.
pub struct WorkflowController {
    storage: Arc<dyn StorageAdapter>,
    provider: Arc<dyn ProviderAdapter>,
    estimator: ConfidenceEstimator,
    optimizer: PromptOptimizer,
    workflow: WorkflowConfig,
    limits: LimitsConfig,
    max_tokens: u32,
    default_model: String,
    in_flight: Arc<DashMap<String, String>>,
}

/// Clears the in-flight marker when the call finishes, so a failed
/// estimation re-arms retry.
struct InFlightGuard {
    map: Arc<DashMap<String, String>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}

impl WorkflowController {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        provider: Arc<dyn ProviderAdapter>,
        config: &PrelixConfig,
    ) -> Self {
        let model = config.anthropic.default_model.clone();
        let max_tokens = config.anthropic.max_tokens;
        Self {
            estimator: ConfidenceEstimator::new(provider.clone(), model.clone(), max_tokens),
            optimizer: PromptOptimizer::new(provider.clone(), model.clone(), max_tokens),
            storage,
            provider,
            workflow: config.workflow.clone(),
            limits: config.limits.clone(),
            max_tokens,
            default_model: model,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Creates a session after the per-user quota gate.
    ///
    /// The gate runs before any row is written: a user at the limit gets
    /// `SessionLimitExceeded` and leaves no session or turn behind.
    pub async fn create_session(&self, user_id: &str, title: &str) -> Result<Session, PrelixError> {
        if !self.limits.unlimited_users.iter().any(|u| u == user_id) {
            let count = self.storage.count_sessions_for_user(user_id).await?;
            if count >= self.limits.max_sessions_per_user as i64 {
                warn!(user_id, count, "session quota reached");
                return Err(PrelixError::SessionLimitExceeded {
                    limit: self.limits.max_sessions_per_user,
                });
            }
        }

        let now = now();
        let session = Session {
            id: new_id(),
            user_id: user_id.to_string(),
            title: if title.trim().is_empty() {
                "New chat".to_string()
            } else {
                title.trim().to_string()
            },
            created_at: now.clone(),
            updated_at: now,
        };
        self.storage.create_session(&session).await?;
        info!(session_id = %session.id, user_id, "session created");
        Ok(session)
    }

    /// Entry point of the loop: persists the first (or a new) user request
    /// and runs one estimation round.
    pub async fn understand_input(
        &self,
        session_id: &str,
        user_input: &str,
        prompt_type: PromptType,
    ) -> Result<ClarificationOutcome, PrelixError> {
        self.require_session(session_id).await?;
        let _guard = self.acquire_in_flight(session_id, user_input)?;

        let mut turn = Turn::new(new_id(), session_id, TurnKind::UserInput, user_input, now());
        turn.raw_input = Some(user_input.to_string());
        turn.prompt_type = Some(prompt_type);
        turn.stage = Some(Stage::Initial);
        self.storage.insert_turn(&turn).await?;
        self.storage.touch_session(session_id).await?;

        self.run_estimation(session_id, user_input, prompt_type).await
    }

    /// Questioning loop step: persists the user's answer, merges all
    /// user-authored history, and re-invokes the estimator. Reaching the
    /// configured estimator call cap skips the provider and forces a
    /// proceed-anyway confirmation offer instead.
    pub async fn process_clarification(
        &self,
        session_id: &str,
        answer: &str,
        prompt_type: PromptType,
    ) -> Result<ClarificationOutcome, PrelixError> {
        self.require_session(session_id).await?;
        let _guard = self.acquire_in_flight(session_id, answer)?;

        let mut turn = Turn::new(
            new_id(),
            session_id,
            TurnKind::AiClarificationResponse,
            answer,
            now(),
        );
        turn.stage = Some(Stage::Questioning);
        self.storage.insert_turn(&turn).await?;
        self.storage.touch_session(session_id).await?;

        let turns = self.storage.get_turns(session_id, None).await?;
        let estimator_calls = turns
            .iter()
            .filter(|t| matches!(t.kind, TurnKind::AiQuestion | TurnKind::AiUnderstanding))
            .count() as u32;
        if estimator_calls >= self.workflow.max_estimator_calls {
            return self.force_ready(session_id, &turns).await;
        }

        self.estimate_over(session_id, answer, prompt_type, &turns).await
    }

    /// Explicit confirmation always overrides the last measured confidence
    /// and terminates the loop.
    pub async fn confirm_understanding(
        &self,
        session_id: &str,
        affirmation: Option<&str>,
    ) -> Result<(), PrelixError> {
        self.require_session(session_id).await?;

        let content = affirmation
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(CONFIRMATION_AFFIRMATIONS[0]);
        let mut turn = Turn::new(new_id(), session_id, TurnKind::Confirmation, content, now());
        turn.stage = Some(Stage::ReadyForConfirmation);
        self.storage.insert_turn(&turn).await?;
        self.storage.touch_session(session_id).await?;

        info!(session_id, "understanding confirmed, workflow advances to model selection");
        Ok(())
    }

    /// Persists the model choice and returns its catalog category, which
    /// drives template filtering. Unknown models have no category.
    pub async fn select_model(
        &self,
        session_id: &str,
        model: &str,
    ) -> Result<Option<ModelCategory>, PrelixError> {
        self.require_session(session_id).await?;

        let display = catalog::MODELS
            .iter()
            .find(|m| m.id == model)
            .map(|m| m.display_name)
            .unwrap_or(model);
        let mut turn = Turn::new(
            new_id(),
            session_id,
            TurnKind::ModelSelection,
            format!("Selected model: {display}"),
            now(),
        );
        turn.selected_model = Some(model.to_string());
        self.storage.insert_turn(&turn).await?;
        self.storage.touch_session(session_id).await?;

        Ok(catalog::category_for_model(model))
    }

    /// Computes the optimized prompt without persisting it.
    pub async fn optimize_prompt(
        &self,
        session_id: &str,
        prompt_type: PromptType,
        target_model: &str,
        template_id: Option<&str>,
        placeholder_values: Option<&HashMap<String, String>>,
    ) -> Result<String, PrelixError> {
        self.require_session(session_id).await?;
        let _guard = self.acquire_in_flight(session_id, "optimize")?;
        self.build_optimized(session_id, prompt_type, target_model, template_id, placeholder_values)
            .await
    }

    /// The explicit generate step: computes the optimized prompt and
    /// persists it verbatim as the session's deliverable.
    pub async fn generate_response(
        &self,
        session_id: &str,
        prompt_type: PromptType,
        target_model: &str,
        template_id: Option<&str>,
        placeholder_values: Option<&HashMap<String, String>>,
    ) -> Result<String, PrelixError> {
        self.require_session(session_id).await?;
        let _guard = self.acquire_in_flight(session_id, "generate")?;
        let optimized = self
            .build_optimized(session_id, prompt_type, target_model, template_id, placeholder_values)
            .await?;

        let mut turn = Turn::new(new_id(), session_id, TurnKind::AiResponse, &optimized, now());
        turn.optimized_prompt = Some(optimized.clone());
        turn.selected_model = Some(target_model.to_string());
        turn.prompt_type = Some(prompt_type);
        turn.template_id = template_id.map(str::to_string);
        turn.template_applied = Some(template_id.is_some());
        self.storage.insert_turn(&turn).await?;
        self.storage.touch_session(session_id).await?;

        info!(session_id, target_model, "optimized prompt generated");
        Ok(optimized)
    }

    /// The user-gated execute step: sends the optimized prompt to the
    /// provider and stores the raw reply.
    pub async fn execute_prompt(
        &self,
        session_id: &str,
        optimized_prompt: Option<&str>,
    ) -> Result<String, PrelixError> {
        self.require_session(session_id).await?;
        let _guard = self.acquire_in_flight(session_id, "execute")?;

        let prompt = match optimized_prompt.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => p.to_string(),
            None => {
                let turns = self.storage.get_turns(session_id, None).await?;
                turns
                    .iter()
                    .rev()
                    .find(|t| t.kind == TurnKind::AiResponse)
                    .map(|t| t.optimized_prompt.clone().unwrap_or_else(|| t.content.clone()))
                    .ok_or_else(|| PrelixError::NotFound {
                        what: "optimized prompt",
                        id: session_id.to_string(),
                    })?
            }
        };

        let reply = self.optimizer.execute(&prompt).await?;

        let mut turn = Turn::new(new_id(), session_id, TurnKind::ExecutedResponse, &reply, now());
        turn.optimized_prompt = Some(prompt);
        self.storage.insert_turn(&turn).await?;
        self.storage.touch_session(session_id).await?;

        Ok(reply)
    }

    /// Casual conversation once the workflow completes: an ordinary chat
    /// round trip appended as simple turns.
    pub async fn simple_conversation(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<String, PrelixError> {
        self.require_session(session_id).await?;
        let _guard = self.acquire_in_flight(session_id, text)?;

        let user_turn = Turn::new(new_id(), session_id, TurnKind::SimpleUser, text, now());
        self.storage.insert_turn(&user_turn).await?;

        let response = self
            .provider
            .complete(ProviderRequest {
                model: self.default_model.clone(),
                system_prompt: None,
                messages: vec![ProviderMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                }],
                max_tokens: self.max_tokens,
            })
            .await?;

        let assistant_turn = Turn::new(
            new_id(),
            session_id,
            TurnKind::SimpleAssistant,
            &response.content,
            now(),
        );
        self.storage.insert_turn(&assistant_turn).await?;
        self.storage.touch_session(session_id).await?;

        Ok(response.content)
    }

    /// Full ordered transcript for a session.
    pub async fn get_transcript(&self, session_id: &str) -> Result<Vec<Turn>, PrelixError> {
        self.require_session(session_id).await?;
        self.storage.get_turns(session_id, None).await
    }

    // --- internals ---

    async fn require_session(&self, session_id: &str) -> Result<Session, PrelixError> {
        self.storage
            .get_session(session_id)
            .await?
            .ok_or_else(|| PrelixError::NotFound {
                what: "session",
                id: session_id.to_string(),
            })
    }

    fn acquire_in_flight(
        &self,
        session_id: &str,
        content: &str,
    ) -> Result<InFlightGuard, PrelixError> {
        use dashmap::mapref::entry::Entry;
        match self.in_flight.entry(session_id.to_string()) {
            Entry::Occupied(_) => {
                debug!(session_id, "refusing resubmission while a call is in flight");
                Err(PrelixError::Busy {
                    session_id: session_id.to_string(),
                })
            }
            Entry::Vacant(v) => {
                v.insert(content.to_string());
                Ok(InFlightGuard {
                    map: self.in_flight.clone(),
                    key: session_id.to_string(),
                })
            }
        }
    }

    async fn run_estimation(
        &self,
        session_id: &str,
        user_input: &str,
        prompt_type: PromptType,
    ) -> Result<ClarificationOutcome, PrelixError> {
        let turns = self.storage.get_turns(session_id, None).await?;
        self.estimate_over(session_id, user_input, prompt_type, &turns).await
    }

    async fn estimate_over(
        &self,
        session_id: &str,
        user_input: &str,
        prompt_type: PromptType,
        turns: &[Turn],
    ) -> Result<ClarificationOutcome, PrelixError> {
        let context = ContextMemory::from_turns(turns, self.workflow.context_window_entries);
        let transcript = render_transcript(turns);
        let result = self
            .estimator
            .estimate(user_input, prompt_type, &context.merged(), &transcript)
            .await?;
        self.persist_estimation(session_id, &result).await
    }

    /// Appends exactly one turn per estimation: `AiUnderstanding` when
    /// ready, `AiQuestion` otherwise, carrying only the user-facing string.
    async fn persist_estimation(
        &self,
        session_id: &str,
        result: &EstimationResult,
    ) -> Result<ClarificationOutcome, PrelixError> {
        let (kind, stage, message) = if result.ready_for_confirmation {
            (
                TurnKind::AiUnderstanding,
                Stage::ReadyForConfirmation,
                confirmation_prompt(&result.understanding),
            )
        } else {
            // Normalized results always carry a question when not ready.
            (
                TurnKind::AiQuestion,
                Stage::Questioning,
                result.clarification_question.clone().unwrap_or_default(),
            )
        };

        let mut turn = Turn::new(new_id(), session_id, kind, &message, now());
        turn.confidence_score = Some(result.confidence);
        turn.missing_parameters = Some(result.missing_parameters.clone());
        turn.stage = Some(stage);
        if result.ready_for_confirmation {
            // The unframed understanding, kept for the optimizer.
            turn.raw_input = Some(result.understanding.clone());
        }
        self.storage.insert_turn(&turn).await?;

        info!(
            session_id,
            confidence = result.confidence,
            stage = %stage,
            "estimation persisted"
        );

        Ok(ClarificationOutcome {
            session_id: session_id.to_string(),
            stage,
            message,
            confidence: result.confidence,
            missing_parameters: result.missing_parameters.clone(),
            ready_for_confirmation: result.ready_for_confirmation,
        })
    }

    /// Call-cap safety valve: offer to proceed with what we have, without
    /// another provider call.
    async fn force_ready(
        &self,
        session_id: &str,
        turns: &[Turn],
    ) -> Result<ClarificationOutcome, PrelixError> {
        let confidence = turns
            .iter()
            .rev()
            .find_map(|t| t.confidence_score)
            .unwrap_or(50);

        let mut turn = Turn::new(
            new_id(),
            session_id,
            TurnKind::AiUnderstanding,
            CAP_REACHED_PROMPT,
            now(),
        );
        turn.confidence_score = Some(confidence);
        turn.stage = Some(Stage::ReadyForConfirmation);
        self.storage.insert_turn(&turn).await?;

        warn!(
            session_id,
            cap = self.workflow.max_estimator_calls,
            "estimator call cap reached, offering to proceed anyway"
        );

        Ok(ClarificationOutcome {
            session_id: session_id.to_string(),
            stage: Stage::ReadyForConfirmation,
            message: CAP_REACHED_PROMPT.to_string(),
            confidence,
            missing_parameters: Vec::new(),
            ready_for_confirmation: true,
        })
    }

    async fn build_optimized(
        &self,
        session_id: &str,
        prompt_type: PromptType,
        target_model: &str,
        template_id: Option<&str>,
        placeholder_values: Option<&HashMap<String, String>>,
    ) -> Result<String, PrelixError> {
        let original = self
            .storage
            .first_turn_of_kind(session_id, TurnKind::UserInput)
            .await?
            .ok_or_else(|| PrelixError::NotFound {
                what: "original request",
                id: session_id.to_string(),
            })?;

        let turns = self.storage.get_turns(session_id, None).await?;
        let understanding = turns
            .iter()
            .rev()
            .find(|t| t.kind == TurnKind::AiUnderstanding)
            .map(|t| t.raw_input.clone().unwrap_or_else(|| t.content.clone()))
            .unwrap_or_else(|| original.content.clone());

        let template = match template_id {
            Some(id) => Some(self.storage.get_template(id).await?.ok_or_else(|| {
                PrelixError::NotFound {
                    what: "template",
                    id: id.to_string(),
                }
            })?),
            None => None,
        };

        self.optimizer
            .optimize(OptimizeRequest {
                original_input: original.raw_input.as_deref().unwrap_or(&original.content),
                understanding: &understanding,
                prompt_type,
                target_model,
                template: template.as_ref(),
                placeholder_values,
            })
            .await
    }
}

/// Current loop stage, reconstructed from turn history.
pub fn stage_from_turns(turns: &[Turn]) -> Stage {
    for turn in turns.iter().rev() {
        match turn.kind {
            TurnKind::AiUnderstanding | TurnKind::Confirmation => {
                return Stage::ReadyForConfirmation
            }
            TurnKind::AiQuestion => return Stage::Questioning,
            _ => continue,
        }
    }
    Stage::Initial
}

fn confirmation_prompt(understanding: &str) -> String {
    format!(
        "Here's my understanding: {understanding}\n\nShall I proceed, or would you like to clarify anything?"
    )
}

fn render_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| {
            let speaker = if t.kind.is_user_authored() {
                "User"
            } else {
                "Assistant"
            };
            format!("{speaker}: {}", t.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

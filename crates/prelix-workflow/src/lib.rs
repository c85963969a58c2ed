// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Prelix clarification and optimization workflow.
//!
//! A conversational state machine: the confidence estimator judges whether
//! a request has enough information, the controller loops at most one
//! clarifying question at a time until readiness or explicit confirmation,
//! and the optimizer produces the final model-tailored prompt.

pub mod catalog;
pub mod context;
pub mod controller;
pub mod estimator;
pub mod optimizer;

pub use catalog::category_for_model;
pub use context::ContextMemory;
pub use controller::{stage_from_turns, ClarificationOutcome, WorkflowController};
pub use estimator::ConfidenceEstimator;
pub use optimizer::{OptimizeRequest, PromptOptimizer};

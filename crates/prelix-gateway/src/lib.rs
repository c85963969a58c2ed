// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP action surface for the Prelix prompt workflow.
//!
//! One action-discriminated endpoint (`POST /v1/actions`) drives session
//! creation, the clarification loop, template selection, and prompt
//! generation, behind an optional bearer-token gate.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{build_router, start_server, GatewayState};

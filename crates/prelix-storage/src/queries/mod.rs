// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table.
//!
//! Every function accepts `&Database` and goes through the single-writer
//! connection's `call()`.

pub mod sessions;
pub mod templates;
pub mod turns;

// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt template selection and placeholder filling.
//!
//! Templates are ranked against the user's request by a weighted blend of
//! effectiveness, popularity, keyword overlap and tag overlap; placeholders
//! are filled either from explicit values or from lightweight heuristics
//! over the raw input.

pub mod fill;
pub mod repository;
pub mod selector;

pub use fill::{auto_fill_all, fill_template};
pub use repository::TemplateRepository;
pub use selector::{filter_by_model, select, RankedTemplate};

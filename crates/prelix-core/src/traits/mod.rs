// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! External collaborators (the relational store and the language-model
//! backend) are reached only through these traits.

pub mod provider;
pub mod storage;

pub use provider::ProviderAdapter;
pub use storage::StorageAdapter;

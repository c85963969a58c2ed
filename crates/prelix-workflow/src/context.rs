// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session context memory for the clarification loop.
//!
//! An ordered list of user-authored strings: the original ask plus every
//! clarification answer and confirmation. Rebuilt from persisted turns on
//! session load, appended to in memory per user turn, and merged into a
//! single context blob before each estimation call.

use prelix_core::Turn;

/// Ordered user-authored context for one session.
#[derive(Debug, Clone)]
pub struct ContextMemory {
    entries: Vec<String>,
    /// Most-recent entries merged per estimation. The first entry (the
    /// original ask) is always retained regardless of the window.
    window: usize,
}

impl ContextMemory {
    pub fn new(window: usize) -> Self {
        Self {
            entries: Vec::new(),
            window: window.max(1),
        }
    }

    /// Rebuilds context from persisted turns, keeping user-authored kinds
    /// in transcript order.
    pub fn from_turns(turns: &[Turn], window: usize) -> Self {
        let mut memory = Self::new(window);
        for turn in turns {
            if turn.kind.is_user_authored() {
                memory.push(&turn.content);
            }
        }
        memory
    }

    /// Appends one user-authored string.
    pub fn push(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref().trim();
        if !text.is_empty() {
            self.entries.push(text.to_string());
        }
    }

    /// The canonical original ask: the first user-authored entry.
    pub fn original(&self) -> Option<&str> {
        self.entries.first().map(String::as_str)
    }

    /// Merges the windowed history into one context blob.
    ///
    /// The original ask always comes first; after it, only the most recent
    /// entries within the window are included.
    pub fn merged(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let tail_window = self.window.saturating_sub(1);
        let tail_start = self.entries.len().saturating_sub(tail_window).max(1);

        let mut parts: Vec<&str> = Vec::with_capacity(self.window);
        parts.push(&self.entries[0]);
        parts.extend(self.entries[tail_start..].iter().map(String::as_str));
        parts.join("\n")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed catalog of selectable downstream models.
//!
//! Each selectable model belongs to exactly one of the four template
//! categories. An unknown model maps to no category, which makes the
//! template filter pass everything through.

use prelix_core::ModelCategory;

/// Catalog entry for one selectable downstream model.
#[derive(Debug, Clone, Copy)]
pub struct CatalogModel {
    pub id: &'static str,
    pub display_name: &'static str,
    pub category: ModelCategory,
}

/// The selectable downstream models, grouped by category.
pub const MODELS: &[CatalogModel] = &[
    CatalogModel {
        id: "claude-sonnet-4-20250514",
        display_name: "Claude Sonnet 4",
        category: ModelCategory::DevelopmentCode,
    },
    CatalogModel {
        id: "gpt-4.1",
        display_name: "GPT-4.1",
        category: ModelCategory::DevelopmentCode,
    },
    CatalogModel {
        id: "deepseek-v3",
        display_name: "DeepSeek V3",
        category: ModelCategory::DevelopmentCode,
    },
    CatalogModel {
        id: "claude-opus-4-20250514",
        display_name: "Claude Opus 4",
        category: ModelCategory::ResearchKnowledge,
    },
    CatalogModel {
        id: "gemini-2.5-pro",
        display_name: "Gemini 2.5 Pro",
        category: ModelCategory::ResearchKnowledge,
    },
    CatalogModel {
        id: "sonar-pro",
        display_name: "Perplexity Sonar Pro",
        category: ModelCategory::ResearchKnowledge,
    },
    CatalogModel {
        id: "gpt-4o",
        display_name: "GPT-4o",
        category: ModelCategory::CreativeDesign,
    },
    CatalogModel {
        id: "claude-haiku-3-5-20241022",
        display_name: "Claude Haiku 3.5",
        category: ModelCategory::CreativeDesign,
    },
    CatalogModel {
        id: "gemini-2.5-flash",
        display_name: "Gemini 2.5 Flash",
        category: ModelCategory::BusinessMarketing,
    },
    CatalogModel {
        id: "gpt-4o-mini",
        display_name: "GPT-4o mini",
        category: ModelCategory::BusinessMarketing,
    },
];

/// Category for a model id, `None` when the model is not in the catalog.
pub fn category_for_model(model: &str) -> Option<ModelCategory> {
    MODELS.iter().find(|m| m.id == model).map(|m| m.category)
}

// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template ranking and model-category filtering.
//!
//! Ranking is a fixed weighted sum over template statistics and lexical
//! overlap with the user input. Model-category filtering runs strictly
//! after the user picks a downstream model, never before.

use prelix_core::{ModelCategory, Template};
use serde::Serialize;

/// A template with its computed ranking score.
#[derive(Debug, Clone, Serialize)]
pub struct RankedTemplate {
    pub template: Template,
    pub score: f64,
}

/// Ranks candidate templates against the user's input.
///
/// Score = `0.4 * effectiveness_score + 0.1 * usage_count
///        + 0.3 * keyword_matches + 0.2 * tag_matches`.
///
/// Highest score first. Exact ties break by lexicographic template id so
/// results are deterministic.
pub fn select(user_input: &str, candidates: Vec<Template>) -> Vec<RankedTemplate> {
    let mut ranked: Vec<RankedTemplate> = candidates
        .into_iter()
        .map(|template| {
            let score = score_template(user_input, &template);
            RankedTemplate { template, score }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.template.id.cmp(&b.template.id))
    });
    ranked
}

/// Computes the weighted ranking score for one template.
pub fn score_template(user_input: &str, template: &Template) -> f64 {
    let keywords = keyword_matches(user_input, &template.text) as f64;
    let tags = tag_matches(user_input, &template.tags) as f64;
    0.4 * template.effectiveness_score
        + 0.1 * template.usage_count as f64
        + 0.3 * keywords
        + 0.2 * tags
}

/// Counts user-input words longer than 3 characters that appear verbatim
/// (case-insensitive) in the template text.
fn keyword_matches(user_input: &str, template_text: &str) -> usize {
    let haystack = template_text.to_lowercase();
    user_input
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.len() > 3)
        .filter(|w| haystack.contains(w.as_str()))
        .count()
}

/// Counts template tags that appear verbatim (case-insensitive) in the user input.
fn tag_matches(user_input: &str, tags: &[String]) -> usize {
    let input = user_input.to_lowercase();
    tags.iter()
        .filter(|tag| !tag.is_empty() && input.contains(&tag.to_lowercase()))
        .count()
}

/// Retains only templates whose category matches the selected model's
/// category. A model with no mapped category (`None`) passes every template
/// through unchanged.
pub fn filter_by_model(
    model_category: Option<ModelCategory>,
    templates: Vec<Template>,
) -> Vec<Template> {
    match model_category {
        Some(category) => templates
            .into_iter()
            .filter(|t| t.category == category)
            .collect(),
        None => templates,
    }
}

// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Placeholder auto-fill heuristics and mechanical template filling.
//!
//! Both operations are pure functions: filling the same template with the
//! same values twice yields byte-identical output, and no model call is
//! ever made on this path.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Style vocabulary scanned for the `style` placeholder, in match order.
const STYLE_KEYWORDS: [&str; 5] = ["formal", "casual", "professional", "creative", "technical"];

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("placeholder regex"))
}

fn topic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Capture runs lazily so a following "for <audience>" clause is not
    // swallowed into the topic.
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:about|regarding|on|for)\s+(.+?)(?:\s+for\s|[,.!?;]|$)")
            .expect("topic regex")
    })
}

fn audience_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:for|to|audience)\s+([^.!?;]+)").expect("audience regex")
    })
}

/// Substitutes every `{placeholder}` occurrence with its value,
/// case-insensitively on the placeholder name. A placeholder with no value
/// is left as the literal `{placeholder}` token.
pub fn fill_template(text: &str, values: &HashMap<String, String>) -> String {
    // Normalize lookup keys once so {Topic} and {topic} resolve alike.
    let lowered: HashMap<String, &str> = values
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.as_str()))
        .collect();

    placeholder_re()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let name = caps[1].to_lowercase();
            match lowered.get(&name) {
                Some(value) => (*value).to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Applies the fixed per-name heuristic to derive a placeholder value from
/// free text. Unknown placeholder names yield an empty string (manual fill).
pub fn auto_fill(placeholder: &str, user_input: &str) -> String {
    match placeholder.to_lowercase().as_str() {
        "topic" | "subject" => topic_re()
            .captures(user_input)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
        "style" => {
            let input = user_input.to_lowercase();
            STYLE_KEYWORDS
                .iter()
                .find(|kw| input.contains(*kw))
                .map(|kw| (*kw).to_string())
                .unwrap_or_else(|| "professional".to_string())
        }
        "target_audience" | "audience" => audience_re()
            .captures(user_input)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| "general audience".to_string()),
        "length" => {
            let input = user_input.to_lowercase();
            if input.contains("short") {
                "brief".to_string()
            } else if input.contains("long") || input.contains("detailed") {
                "comprehensive".to_string()
            } else {
                "medium".to_string()
            }
        }
        _ => String::new(),
    }
}

/// Derives values for every listed placeholder from the user input.
pub fn auto_fill_all(placeholders: &[String], user_input: &str) -> HashMap<String, String> {
    placeholders
        .iter()
        .map(|name| (name.clone(), auto_fill(name, user_input)))
        .collect()
}

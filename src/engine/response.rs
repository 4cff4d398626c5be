//! Parsing of untrusted LM answer text.
use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\n?(.*?)\s*```").expect("valid fence regex")
    })
}

/// Extract JSON from text that might be wrapped in markdown code fences.
pub fn extract_json(text: &str) -> &str {
    let text = text.trim();
    match fence_regex().captures(text).and_then(|caps| caps.get(1)) {
        Some(body) => body.as_str().trim(),
        None => text,
    }
}

/// Strictly parse an answer after stripping any code fences.
pub fn parse_answer(text: &str) -> Result<Value> {
    let json_text = extract_json(text);
    serde_json::from_str(json_text).with_context(|| {
        format!(
            "parse LM answer as JSON: {}",
            crate::util::truncate_string(json_text, 500)
        )
    })
}

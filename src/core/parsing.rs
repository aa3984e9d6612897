//! Extraction of structured answers from free-form generative output.
//!
//! Responses are untrusted text: they may wrap JSON in markdown fences, prepend
//! chatter, or be truncated. Everything here fails soft (empty list / `None`).

use std::collections::HashMap;

use serde_json::Value;

use crate::models::Judgement;

/// End index (exclusive) of the balanced JSON value opening at `start`
///
/// String-aware: brackets inside string literals and escaped quotes are
/// ignored. `None` when the text ends before the value closes.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// First balanced JSON array or object in `text` that parses
pub fn extract_json(text: &str) -> Option<Value> {
    let mut search_from = 0;

    while let Some(rel) = text[search_from..].find(['{', '[']) {
        let start = search_from + rel;
        if let Some(end) = balanced_end(text, start) {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..end]) {
                return Some(value);
            }
        }
        search_from = start + 1;
    }
    None
}

fn name_of(item: &Value) -> Option<String> {
    let name = match item {
        Value::String(s) => s.as_str(),
        Value::Object(obj) => ["name", "station", "hub"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_str))?,
        _ => return None,
    };
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Hub names from a scout response
///
/// Accepts `["A", "B"]`, `[{"name": "A"}]`, or an object holding such an
/// array under `hubs`, `stations`, `suggestions` or `candidates`.
pub fn parse_suggestions(text: &str) -> Vec<String> {
    let Some(value) = extract_json(text) else {
        tracing::debug!("Scout response contained no JSON");
        return Vec::new();
    };

    let items = match &value {
        Value::Array(items) => items,
        Value::Object(obj) => match ["hubs", "stations", "suggestions", "candidates"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_array))
        {
            Some(items) => items,
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items.iter().filter_map(name_of).collect()
}

/// Winner and reasons from a judge response
///
/// Expects `{"winner": "...", "reasons": {"name": "why"}}`; `rationale` or
/// `reasoning` may stand in for `reasons`, either as a map or as a single
/// string that then belongs to the winner.
pub fn parse_judgement(text: &str) -> Option<Judgement> {
    let value = extract_json(text)?;
    let obj = value.as_object()?;

    let winner = obj
        .get("winner")
        .and_then(name_of)
        .or_else(|| obj.get("best").and_then(name_of))?;

    let mut rationales = HashMap::new();
    for key in ["reasons", "rationale", "rationales", "reasoning"] {
        match obj.get(key) {
            Some(Value::Object(map)) => {
                for (name, reason) in map {
                    if let Some(reason) = reason.as_str().map(str::trim).filter(|r| !r.is_empty()) {
                        rationales.insert(name.clone(), reason.to_string());
                    }
                }
            }
            Some(Value::String(reason)) if !reason.trim().is_empty() => {
                rationales.entry(winner.clone()).or_insert_with(|| reason.trim().to_string());
            }
            _ => {}
        }
    }

    Some(Judgement { winner, rationales })
}

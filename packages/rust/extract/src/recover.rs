//! JSON recovery from free-form completion output.
//!
//! An ordered pipeline of extraction strategies — fenced block, brace scan,
//! whole output — each producing a candidate substring. The first candidate
//! that parses to a JSON object wins; if none does, recovery fails and the
//! caller falls back to heuristic extraction.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use tenderlens_shared::SummaryRecord;

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?si)```json\s*(\{.*?\})\s*```").unwrap());

/// Recover a JSON object from arbitrary model output.
pub(crate) fn recover_object(raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }

    let strategies: [fn(&str) -> Option<&str>; 3] = [fenced_block, brace_scan, whole_output];

    for strategy in strategies {
        if let Some(candidate) = strategy(raw) {
            if let Ok(value) = serde_json::from_str::<Value>(candidate) {
                if value.is_object() {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// A ```json fenced block, if present.
fn fenced_block(raw: &str) -> Option<&str> {
    FENCED_JSON
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// The first balanced `{...}` region, skipping braces inside string literals.
fn brace_scan(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn whole_output(raw: &str) -> Option<&str> {
    Some(raw.trim())
}

// ---------------------------------------------------------------------------
// Schema coercion
// ---------------------------------------------------------------------------

/// Coerce a recovered JSON object into the fixed summary schema.
///
/// Missing or null fields stay `None`; scalar values are stringified.
/// `compliance_notes` must be a list — anything else becomes empty; list
/// elements are stringified with nulls dropped, order preserved.
pub(crate) fn coerce_record(value: &Value) -> SummaryRecord {
    let Some(map) = value.as_object() else {
        return SummaryRecord::default();
    };

    let scalar = |key: &str| -> Option<String> {
        match map.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    };

    let compliance_notes = match map.get("compliance_notes") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .collect(),
        _ => Vec::new(),
    };

    SummaryRecord {
        tender_name: scalar("tender_name"),
        issuer: scalar("issuer"),
        emd_amount: scalar("emd_amount"),
        location: scalar("location"),
        duration: scalar("duration"),
        scope_of_work: scalar("scope_of_work"),
        compliance_notes,
    }
}

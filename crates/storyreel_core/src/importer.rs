//! Turns pasted AI chat output into an ordered list of scene suggestions.
//!
//! The text is expected to be JSON, but chat tools tend to wrap it in prose
//! or markdown fences. A whole-text parse is tried first; if that fails,
//! every brace-delimited fragment is parsed on its own and the ones that
//! decode are kept.

use crate::error::{CoreError, Result};
use crate::types::{Filter, MediaKind, SceneSuggestion, Transition, DEFAULT_CLIP_DURATION};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::debug;

/// Shortest `{...}` runs, spanning newlines. Nested objects are cut at the
/// first closing brace and fail to parse, which drops them.
static OBJECT_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*?\}").expect("static regex"));

/// Parse `text` into scene suggestions sorted by timestamp.
pub fn import_scenes(text: &str) -> Result<Vec<SceneSuggestion>> {
    if text.trim().is_empty() {
        return Err(CoreError::EmptyInput);
    }

    let items = match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items,
        Ok(obj @ Value::Object(_)) => vec![obj],
        Ok(other) => {
            debug!(kind = json_kind(&other), "pasted text is JSON but not a scene list");
            extract_fragments(text)
        }
        Err(e) => {
            debug!(error = %e, "pasted text is not plain JSON, scanning for objects");
            extract_fragments(text)
        }
    };

    let mut scenes: Vec<SceneSuggestion> = items
        .iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(scene_from_map(map)),
            other => {
                debug!(kind = json_kind(other), "skipping non-object timeline entry");
                None
            }
        })
        .collect();

    if scenes.is_empty() {
        return Err(CoreError::NoValidScenes);
    }

    // Stable, so scenes sharing a timestamp keep document order.
    scenes.sort_by(|a, b| a.timestamp_seconds().total_cmp(&b.timestamp_seconds()));
    Ok(scenes)
}

/// Every brace-delimited fragment of `text` that parses as a JSON object,
/// in document order.
fn extract_fragments(text: &str) -> Vec<Value> {
    OBJECT_FRAGMENT
        .find_iter(text)
        .filter_map(|m| match serde_json::from_str::<Value>(m.as_str()) {
            Ok(value @ Value::Object(_)) => Some(value),
            Ok(_) => None,
            Err(e) => {
                debug!(fragment = m.as_str(), error = %e, "discarding unparseable fragment");
                None
            }
        })
        .collect()
}

/// Decode one loosely typed scene object. Missing, empty, or unusable
/// fields take their defaults.
fn scene_from_map(map: &Map<String, Value>) -> SceneSuggestion {
    let defaults = SceneSuggestion::default();

    SceneSuggestion {
        timestamp: text_field(map, &["timestamp", "time"]).unwrap_or(defaults.timestamp),
        duration: field(map, &["duration"])
            .and_then(coerce_duration)
            .unwrap_or(DEFAULT_CLIP_DURATION),
        kind: text_field(map, &["type", "kind"])
            .and_then(|t| MediaKind::parse_tag(&t))
            .unwrap_or(defaults.kind),
        description: text_field(map, &["description"]).unwrap_or_default(),
        source: text_field(map, &["source"]).unwrap_or_default(),
        start_transition: text_field(map, &["startTransition", "start_transition"])
            .and_then(|t| Transition::parse_tag(&t))
            .unwrap_or(Transition::DEFAULT_START),
        end_transition: text_field(map, &["endTransition", "end_transition"])
            .and_then(|t| Transition::parse_tag(&t))
            .unwrap_or(Transition::DEFAULT_END),
        filter: text_field(map, &["filter"])
            .and_then(|t| Filter::parse_tag(&t))
            .unwrap_or(Filter::None),
    }
}

fn field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| map.get(*k)).filter(|v| !v.is_null())
}

/// A non-empty string view of a scalar field.
fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let text = match field(map, keys)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "true".to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Numbers are taken as-is; strings use their leading numeric part, so
/// `"3s"` is three seconds. Only finite positive values are usable.
fn coerce_duration(value: &Value) -> Option<f64> {
    let secs = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => leading_number(s)?,
        _ => return None,
    };
    (secs.is_finite() && secs > 0.0).then_some(secs)
}

fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let candidate_len = s
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E')))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let candidate = &s[..candidate_len];
    (1..=candidate.len())
        .rev()
        .find_map(|end| candidate[..end].parse::<f64>().ok())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

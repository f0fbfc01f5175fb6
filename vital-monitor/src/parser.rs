use crate::types::{DecodeError, PredictionResult, RawResponse, Result, TransportError, WindowMeta};
use serde_json::{Map, Value};
use tracing::debug;

const ERROR_SNIPPET_CHARS: usize = 200;

/// Envelope bookkeeping that never belongs in a result grid.
const ENVELOPE_KEYS: [&str; 3] = ["success", "meta", "error"];

/// Turns a raw service response into a `PredictionResult`.
///
/// Accepts both the bare result object and the service envelope
/// `{"success": true, "predictions": {...}, "meta": {...}}`.
pub fn parse_response(raw: &RawResponse) -> Result<PredictionResult> {
    if !raw.is_success() {
        return Err(TransportError::Status {
            status: raw.status,
            message: error_message(&raw.body),
        }
        .into());
    }

    let value: Value = serde_json::from_str(&raw.body).map_err(DecodeError::from)?;
    let object = match value {
        Value::Object(map) => map,
        other => {
            return Err(DecodeError::NotAnObject { found: json_type(&other) }.into());
        }
    };

    if let Some(Value::Bool(false)) = object.get("success") {
        let message = error_text(&object).unwrap_or_else(|| "no reason given".to_string());
        return Err(TransportError::Rejected(message).into());
    }

    let fields = match object.get("predictions") {
        Some(Value::Object(predictions)) => predictions.clone(),
        Some(other) => {
            return Err(DecodeError::NotAnObject { found: json_type(other) }.into());
        }
        None => object
            .iter()
            .filter(|(key, _)| !ENVELOPE_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    };
    let mut result = PredictionResult::from_fields(fields);

    if let Some(meta) = object.get("meta").and_then(parse_meta) {
        debug!("window prediction used {} rows", meta.rows_used);
        result = result.with_meta(meta);
    }

    Ok(result)
}

fn parse_meta(value: &Value) -> Option<WindowMeta> {
    serde_json::from_value(value.clone()).ok()
}

fn error_text(object: &Map<String, Value>) -> Option<String> {
    match object.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
        None => None,
    }
}

/// Best-effort reason from an error body: the `error` field if the body is
/// JSON, otherwise the start of the text.
fn error_message(body: &str) -> Option<String> {
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(body) {
        if let Some(text) = error_text(&object) {
            return Some(text);
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(ERROR_SNIPPET_CHARS).collect())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

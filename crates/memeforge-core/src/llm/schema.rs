//! Response schemas and tolerant parsing of model output.
//!
//! Models wrap JSON in code fences, prepend chatter, or answer with a bare
//! list. Parsing tries, in order: the whole (fence-stripped) text, the
//! outermost `{...}` object, and finally a bare `[...]` list if the schema
//! accepts one.

use crate::error::WorkflowError;
use serde::de::DeserializeOwned;

/// A typed layout the model is asked to answer in.
pub trait ResponseSchema: DeserializeOwned + Send + 'static {
    /// Short name used in logs and parse errors.
    const NAME: &'static str;

    /// Instructions appended to the prompt describing the exact layout.
    fn format_instructions() -> String;

    /// Build a value from a bare JSON list of strings, if this schema allows it.
    fn from_bare_list(_items: Vec<String>) -> Option<Self> {
        None
    }
}

/// Parse raw model text into `T`.
pub fn parse_response<T: ResponseSchema>(raw: &str) -> Result<T, WorkflowError> {
    let cleaned = strip_code_fences(raw);

    let first_error = match serde_json::from_str::<T>(cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let Some(object) = extract_json_object(cleaned) {
        match serde_json::from_str::<T>(object) {
            Ok(value) => return Ok(value),
            Err(e) => return Err(parse_error::<T>(e.to_string(), raw)),
        }
    }

    if let Some(list) = extract_json_array(cleaned) {
        if let Ok(items) = serde_json::from_str::<Vec<String>>(list) {
            if let Some(value) = T::from_bare_list(items) {
                return Ok(value);
            }
        }
    }

    Err(parse_error::<T>(first_error.to_string(), raw))
}

/// Deserialize an identifier that may arrive as a JSON string or number.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s.trim().to_string()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Deserialize an index that may arrive as an integer, an integral float
/// (`1.0`) or a numeric string (`"1"`).
pub(crate) fn integer_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Number(n) => integral(n.as_i64(), n.as_f64()),
        serde_json::Value::String(s) => {
            let s = s.trim();
            integral(s.parse::<i64>().ok(), s.parse::<f64>().ok())
        }
        _ => None,
    };
    parsed.ok_or_else(|| {
        serde::de::Error::custom(format!("expected an integer index, got {value}"))
    })
}

fn integral(int: Option<i64>, float: Option<f64>) -> Option<i64> {
    int.or_else(|| {
        float
            .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn parse_error<T: ResponseSchema>(detail: String, raw: &str) -> WorkflowError {
    WorkflowError::Parse {
        message: format!("expected {} JSON ({detail})", T::NAME),
        raw: raw.to_string(),
    }
}

/// Remove a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after_open = &trimmed[start + 3..];
    // Skip the info string ("json") up to the end of the fence line
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

//! Structured payload extraction from free-form model output.
//!
//! Models asked for JSON still wrap it in prose or markdown fences now and
//! then. The extractor takes the first well-formed JSON object anywhere in
//! the text; if there is none, that is an explicit error, never a default.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("model output is empty")]
    Empty,

    #[error("no JSON object found in model output")]
    NoObject,

    #[error("payload does not match the expected shape: {0}")]
    Shape(String),
}

/// Find the first complete JSON object in `text`.
///
/// # Errors
///
/// Returns [`PayloadError::Empty`] for blank input and
/// [`PayloadError::NoObject`] when no parseable object exists.
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>, PayloadError> {
    if text.trim().is_empty() {
        return Err(PayloadError::Empty);
    }

    for (offset, _) in text.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&text[offset..]).into_iter::<Value>();
        if let Some(Ok(Value::Object(map))) = stream.next() {
            return Ok(map);
        }
    }
    Err(PayloadError::NoObject)
}

/// Extract the first JSON object and deserialize it into `T`.
///
/// # Errors
///
/// Returns a [`PayloadError`] if no object is found or it has the wrong shape.
pub fn parse_payload<T: DeserializeOwned>(text: &str) -> Result<T, PayloadError> {
    let map = extract_json_object(text)?;
    serde_json::from_value(Value::Object(map)).map_err(|err| PayloadError::Shape(err.to_string()))
}

/// Validate that a model-reported score lies in `[0, 1]`.
///
/// # Errors
///
/// Returns [`PayloadError::Shape`] naming `field` when out of range.
pub fn unit_score(field: &str, value: f64) -> Result<f64, PayloadError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(PayloadError::Shape(format!("{field} {value} outside [0, 1]")))
    }
}

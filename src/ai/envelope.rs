//! Extraction of generated text from endpoint response envelopes.
//!
//! Recognized shapes:
//! - list of candidates: `{"candidates":[{"content":{"parts":[{"text":".."}]}}]}`
//! - single object: `{"generated_text":".."}` or `{"text":".."}`
//! - list of single objects: `[{"generated_text":".."}]`
//!
//! An `error` member in any object is reported as a remote error.

use serde::Deserialize;
use serde_json::Value;

use crate::ai::errors::{AiError, AiResult};

/// Max characters of an unrecognized envelope kept in the error message.
const ENVELOPE_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Default, Deserialize)]
struct ObjectEnvelope {
    candidates: Option<Vec<Candidate>>,
    generated_text: Option<String>,
    text: Option<String>,
    error: Option<ErrorField>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Detailed { message: String },
    Plain(String),
    Other(Value),
}

impl ErrorField {
    fn into_message(self) -> String {
        match self {
            Self::Detailed { message } | Self::Plain(message) => message,
            Self::Other(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope {
    List(Vec<ObjectEnvelope>),
    Object(ObjectEnvelope),
}

/// Extract the generated text from a response body.
///
/// # Errors
/// Returns [`AiError::Remote`] for error envelopes and [`AiError::Envelope`]
/// when no known shape carries text.
pub fn extract_text(body: &Value) -> AiResult<String> {
    let envelope: Envelope =
        serde_json::from_value(body.clone()).map_err(|_| unrecognized(body))?;

    let object = match envelope {
        Envelope::Object(object) => object,
        Envelope::List(list) => list.into_iter().next().ok_or_else(|| unrecognized(body))?,
    };

    if let Some(error) = object.error {
        return Err(AiError::Remote(error.into_message()));
    }

    if let Some(candidates) = object.candidates {
        let text = candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .filter(|t| !t.is_empty());
        return text.ok_or_else(|| {
            AiError::Envelope("no response generated from the AI model".to_string())
        });
    }

    object
        .generated_text
        .or(object.text)
        .ok_or_else(|| unrecognized(body))
}

/// Message from an error envelope, if the body is one.
#[must_use]
pub fn error_message(body: &Value) -> Option<String> {
    match serde_json::from_value::<ObjectEnvelope>(body.clone()) {
        Ok(object) => object.error.map(ErrorField::into_message),
        Err(_) => None,
    }
}

fn unrecognized(body: &Value) -> AiError {
    let preview: String = body.to_string().chars().take(ENVELOPE_PREVIEW_CHARS).collect();
    AiError::Envelope(preview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_candidates_shape() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Photosynthesis is..." }] } }]
        });
        assert_eq!(extract_text(&body).unwrap(), "Photosynthesis is...");
    }

    #[test]
    fn test_candidates_join_parts() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello, " }, { "text": "world" }] } }]
        });
        assert_eq!(extract_text(&body).unwrap(), "Hello, world");
    }

    #[test]
    fn test_single_object_shapes() {
        assert_eq!(extract_text(&json!({ "generated_text": "a" })).unwrap(), "a");
        assert_eq!(extract_text(&json!({ "text": "b" })).unwrap(), "b");
        assert_eq!(extract_text(&json!([{ "generated_text": "c" }])).unwrap(), "c");
    }

    #[test]
    fn test_error_envelopes() {
        let detailed = json!({ "error": { "code": 400, "message": "API key not valid" } });
        assert!(matches!(extract_text(&detailed), Err(AiError::Remote(m)) if m == "API key not valid"));
        assert_eq!(error_message(&detailed).as_deref(), Some("API key not valid"));

        let plain = json!({ "error": "quota exceeded" });
        assert!(matches!(extract_text(&plain), Err(AiError::Remote(m)) if m == "quota exceeded"));
    }

    #[test]
    fn test_unrecognized_shapes() {
        assert!(matches!(extract_text(&json!({})), Err(AiError::Envelope(_))));
        assert!(matches!(extract_text(&json!([])), Err(AiError::Envelope(_))));
        assert!(matches!(extract_text(&json!("text")), Err(AiError::Envelope(_))));
        assert!(matches!(
            extract_text(&json!({ "candidates": [] })),
            Err(AiError::Envelope(_))
        ));
        assert!(matches!(
            extract_text(&json!({ "candidates": [{ "finishReason": "SAFETY" }] })),
            Err(AiError::Envelope(_))
        ));
        assert!(error_message(&json!({ "text": "fine" })).is_none());
    }
}

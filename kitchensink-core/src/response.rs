use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The structured error body produced by the backend's exception handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    /// When the error occurred.
    #[serde(default)]
    pub timestamp: Option<Value>,
    /// HTTP status.
    #[serde(default)]
    pub status: Option<u16>,
    /// Reason phrase.
    #[serde(default)]
    pub error: Option<String>,
    /// Human-readable detail.
    #[serde(default)]
    pub message: Option<String>,
    /// Request path.
    #[serde(default)]
    pub path: Option<String>,
}

impl ApiError {
    /// `message`, else `error`.
    pub fn best_message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .filter(|m| !m.is_empty())
            .or(self.error.as_deref().filter(|e| !e.is_empty()))
    }
}

/// A decoded error response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorBody {
    /// `{timestamp, status, error, message, path}` or any object carrying `message`/`error`.
    Structured(ApiError),
    /// `{field: message}` produced by request validation.
    FieldErrors(BTreeMap<String, String>),
}

impl ErrorBody {
    /// Decode a raw response body. Returns `None` for non-JSON or non-object bodies.
    pub fn decode(text: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(text.trim()).ok()? {
            Value::Object(object) => Self::from_object(object),
            _ => None,
        }
    }

    fn from_object(object: Map<String, Value>) -> Option<Self> {
        if object.is_empty() {
            return None;
        }
        let structured = object.contains_key("timestamp") || object.contains_key("status");
        if !structured {
            let fields: Option<BTreeMap<String, String>> = object
                .iter()
                .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect();
            if let Some(fields) = fields {
                let is_plain_message = fields.keys().all(|k| k == "message" || k == "error");
                if !is_plain_message {
                    return Some(ErrorBody::FieldErrors(fields));
                }
            }
        }
        serde_json::from_value(Value::Object(object))
            .ok()
            .map(ErrorBody::Structured)
    }
}

/// Build the caller-facing message for a failed response: the JSON `message`/`error` field
/// when the body is JSON, else the raw text, else a generic status line.
pub fn error_message(status: u16, content_type: Option<&str>, text: &str) -> String {
    let json = if crate::utils::is_json(content_type) && text.trim_start().starts_with('{') {
        serde_json::from_str::<Value>(text).ok()
    } else {
        None
    };

    let from_json = json.as_ref().and_then(|json| {
        ["message", "error"].iter().find_map(|key| {
            json.get(*key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
    });

    from_json
        .or_else(|| (!text.is_empty()).then(|| text.to_string()))
        .unwrap_or_else(|| format!("HTTP error, status {status}"))
}

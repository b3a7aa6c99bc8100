use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";
pub const PREDICT_PATH: &str = "predict";
pub const PING_PATH: &str = "ping";
/// Multipart form field carrying the uploaded image.
pub const UPLOAD_FIELD: &str = "file";

pub const FIELD_PREDICTION: &str = "prediction";
pub const FIELD_CONFIDENCE: &str = "confidence";
pub const FIELD_CLASS_PROBABILITIES: &str = "class_probabilities";

/// Error body returned by the service on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub detail: Value,
}

impl ServiceErrorBody {
    /// Human-readable detail text, if the body carries one.
    ///
    /// `detail` is usually a string. Request validation failures carry a list of
    /// `{ "msg": ... }` objects instead; their messages are joined.
    pub fn detail_message(&self) -> Option<String> {
        match &self.detail {
            Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            Value::Array(items) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .filter(|msg| !msg.trim().is_empty())
                    .collect();
                if messages.is_empty() {
                    None
                } else {
                    Some(messages.join("; "))
                }
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

use serde::{Deserialize, Serialize};

/// Body the services attach to non-2xx responses. The field is optional;
/// a bare status with no body is just as valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiError {
    /// Extracts the server message from a raw response body, if the body is a
    /// JSON object carrying a non-empty `error` field.
    pub fn server_message(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<ApiError>(body)
            .ok()
            .and_then(|parsed| parsed.error)
            .filter(|message| !message.trim().is_empty())
    }
}

/// Generic text shown when a failed response carries no usable message.
pub fn status_fallback_message(status: u16) -> String {
    format!("HTTP error! status: {status}")
}

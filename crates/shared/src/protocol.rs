use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{ProductDraft, UserDraft};

/// `POST /users` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl From<&UserDraft> for CreateUserRequest {
    fn from(draft: &UserDraft) -> Self {
        Self {
            name: draft.name.clone(),
            email: draft.email.clone(),
            password: draft.password.clone(),
        }
    }
}

/// `POST /products` body. `price` is always a JSON number on the wire; a
/// non-finite value serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: f64,
}

impl From<&ProductDraft> for CreateProductRequest {
    fn from(draft: &ProductDraft) -> Self {
        Self {
            name: draft.name.clone(),
            description: draft.description.clone(),
            price: draft.parsed_price(),
        }
    }
}

/// What a successful create response told us.
#[derive(Debug, Clone, PartialEq)]
pub enum Created<T> {
    /// The service echoed the stored record, enveloped or raw.
    Record(T),
    /// The service only acknowledged the write, optionally with a message.
    Acknowledged(Option<String>),
}

/// Interprets a 2xx create response body.
///
/// The canonical shape is `{"<envelope_key>": {...}}`. A raw record and a bare
/// `{"message": "..."}` acknowledgement are accepted too, and so is an empty or
/// non-JSON body, since the write already succeeded. Only an envelope whose
/// record fails to decode is an error.
pub fn parse_created<T: DeserializeOwned>(
    body: &[u8],
    envelope_key: &str,
) -> Result<Created<T>, serde_json::Error> {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return Ok(Created::Acknowledged(None));
    };

    if let Some(record) = value.get(envelope_key) {
        return serde_json::from_value(record.clone()).map(Created::Record);
    }

    if let Ok(record) = serde_json::from_value::<T>(value.clone()) {
        return Ok(Created::Record(record));
    }

    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned);
    Ok(Created::Acknowledged(message))
}

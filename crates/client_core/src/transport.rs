//! JSON-over-HTTP access to the two collections.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::error::{status_fallback_message, ApiError};
use tracing::debug;

use crate::error::{ConfigError, RequestError};

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Option<Duration>) -> Result<Self, ConfigError> {
        let mut builder = Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;
        Ok(Self { http })
    }

    /// `GET <url>`, expecting a JSON array of records.
    pub async fn fetch_list<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>, RequestError> {
        let response = self.http.get(url).send().await?;
        let body = success_body(response).await?;
        serde_json::from_slice(&body).map_err(|err| RequestError::Decode(err.to_string()))
    }

    /// `POST <url>` with a JSON body; returns the raw success body.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Vec<u8>, RequestError> {
        let response = self.http.post(url).json(body).send().await?;
        success_body(response).await
    }
}

async fn success_body(response: Response) -> Result<Vec<u8>, RequestError> {
    let status = response.status();
    let body = response.bytes().await?;
    if status.is_success() {
        return Ok(body.to_vec());
    }

    let message = ApiError::server_message(&body)
        .unwrap_or_else(|| status_fallback_message(status.as_u16()));
    debug!(status = status.as_u16(), %message, "request rejected");
    Err(RequestError::Http {
        status: status.as_u16(),
        message,
    })
}

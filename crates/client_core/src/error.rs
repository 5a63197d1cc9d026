use std::path::PathBuf;

use thiserror::Error;

use crate::lane::LaneKind;

/// Why a single request against a collection failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The request never produced a response.
    #[error("network failure: {0}")]
    Network(String),
    /// Non-2xx response; `message` is the server's `error` text or a generic
    /// status line.
    #[error("{message}")]
    Http { status: u16, message: String },
    /// The draft was refused before anything was sent.
    #[error("{0}")]
    Validation(String),
    /// 2xx response whose body could not be read as the expected records.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl RequestError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Http {
                status: status.as_u16(),
                message: shared::error::status_fallback_message(status.as_u16()),
            },
            None => Self::Network(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load {lane}: {source}")]
pub struct FetchError {
    pub lane: LaneKind,
    #[source]
    pub source: RequestError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to create {lane} entry: {source}")]
pub struct CreateError {
    pub lane: LaneKind,
    #[source]
    pub source: RequestError,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid api base url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("api base url '{0}' cannot carry collection paths")]
    NotABase(String),
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

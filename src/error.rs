//! Error types for the API client.

use http::StatusCode;
use thiserror::Error;

pub const LOGIN_HINT: &str = "run 'aja login' to re-authenticate";

/// Failures while inspecting a token's payload.
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("malformed token: expected 3 segments, found {segments}")]
    MalformedToken { segments: usize },

    #[error("token payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("token payload is not valid claims json: {0}")]
    ClaimParse(#[from] serde_json::Error),
}

/// Token persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("home directory could not be determined")]
    NoHomeDir,

    #[error("token store io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("no token to refresh; {}", LOGIN_HINT)]
    NoToken,

    #[error("token refresh failed: {reason}; {}", LOGIN_HINT)]
    RefreshFailed { reason: String },
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("not authenticated; run 'aja login' first")]
    NoToken,

    #[error("token expired: {0}")]
    TokenExpired(#[source] RefreshError),
}

/// Anything that can go wrong between building a request and decoding its body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("invalid API url: {0}")]
    InvalidUrl(String),

    #[error("failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error: {message}{}", .hint.map(|h| format!(" ({h})")).unwrap_or_default())]
    Api {
        status: StatusCode,
        code: Option<String>,
        message: String,
        details: Option<serde_json::Value>,
        hint: Option<&'static str>,
    },

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode deployment config: {0}")]
    Descriptor(#[from] serde_yaml::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status(),
            _ => None,
        }
    }
}

/// Errors published on a log stream's error channel.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The stream could not be opened or the server rejected it.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// One `data:` line did not decode. The stream keeps going.
    #[error("failed to parse log entry: {source}")]
    Parse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("log stream terminated: {0}")]
    Terminated(#[source] reqwest::Error),
}

impl StreamError {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamError::Parse { .. })
    }
}

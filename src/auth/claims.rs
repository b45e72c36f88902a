use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClaimError;

/// Identity and expiry fields carried in a bearer token's payload segment.
///
/// Nothing here is verified: the server remains the only trust boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "sub", default)]
    pub subject: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "iat", default, with = "chrono::serde::ts_seconds_option")]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

/// Decode the claims of a `header.payload.signature` token.
pub fn parse_claims(token: &str) -> Result<Claims, ClaimError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ClaimError::MalformedToken { segments: parts.len() });
    }

    let decoded = base64::engine::general_purpose::URL_SAFE.decode(pad_segment(parts[1]))?;
    Ok(serde_json::from_slice::<Claims>(&decoded)?)
}

fn pad_segment(segment: &str) -> String {
    let mut padded = segment.to_owned();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    padded
}

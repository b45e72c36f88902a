use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::auth::claims::{parse_claims, Claims};

/// True iff `now + buffer` is past the token's expiry.
///
/// A token expiring exactly at `now + buffer` is still considered valid.
pub fn is_expired(claims: &Claims, now: DateTime<Utc>, buffer: TimeDelta) -> bool {
    now + buffer > claims.expires_at
}

/// A token together with the claims decoded from it.
///
/// The pair is only ever built together, so a token can never be seen next
/// to another token's claims.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    token: String,
    claims: Option<Claims>,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let claims = if token.is_empty() {
            None
        } else {
            parse_claims(&token)
                .inspect_err(|err| warn!(error = %err, "token claims unreadable, treating token as expired"))
                .ok()
        };
        Self { token, claims }
    }

    pub fn token(&self) -> Option<&str> {
        (!self.token.is_empty()).then_some(self.token.as_str())
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    /// Tokens without readable claims count as expired.
    pub fn is_expired(&self, now: DateTime<Utc>, buffer: TimeDelta) -> bool {
        self.claims
            .as_ref()
            .map(|claims| is_expired(claims, now, buffer))
            .unwrap_or(true)
    }
}

/// Per-process client session: where the backend lives and who we are.
#[derive(Debug)]
pub struct Session {
    base_url: String,
    login_url: String,
    credentials: RwLock<Credentials>,
}

impl Session {
    /// `api_url` is the server root; `/api/v1` is appended here.
    pub fn new(api_url: &str, token: impl Into<String>) -> Self {
        let base_url = format!("{}{}", api_url.trim_end_matches('/'), crate::utils::constants::API_PREFIX);
        let login_url = format!("{}/login", base_url);
        Self {
            base_url,
            login_url,
            credentials: RwLock::new(Credentials::new(token)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Snapshot of the current (token, claims) pair.
    pub async fn credentials(&self) -> Credentials {
        self.credentials.read().await.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.credentials.read().await.token().map(str::to_owned)
    }

    pub async fn claims(&self) -> Option<Claims> {
        self.credentials.read().await.claims().cloned()
    }

    /// Replace token and claims in one step.
    pub async fn set_token(&self, token: impl Into<String>) {
        let credentials = Credentials::new(token);
        debug!(has_claims = credentials.claims().is_some(), "session token replaced");
        *self.credentials.write().await = credentials;
    }

    /// Run `persist` and swap in `token` under one write guard.
    ///
    /// Racing callers are serialized here, so whatever `persist` wrote last is
    /// also what the session holds. Nothing changes when `persist` fails.
    pub async fn replace_token<E>(
        &self,
        token: impl Into<String>,
        persist: impl FnOnce(&str) -> Result<(), E>,
    ) -> Result<(), E> {
        let credentials = Credentials::new(token);
        let mut current = self.credentials.write().await;
        persist(&credentials.token)?;
        debug!(has_claims = credentials.claims().is_some(), "session token replaced and persisted");
        *current = credentials;
        Ok(())
    }
}

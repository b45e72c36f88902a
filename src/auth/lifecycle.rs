use http::Method;
use serde::Deserialize;
use tracing::{error, info};

use crate::client::ApiClient;
use crate::error::{AuthError, RefreshError};
use crate::helpers::time::now_utc;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::REFRESH_ENDPOINT;

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    token: String,
}

impl ApiClient {
    /// Make sure the session holds a token that outlives the refresh buffer.
    ///
    /// Refreshes at most once per call. Concurrent callers that both see an
    /// expired token both refresh; the last assignment wins, the session
    /// still holds one consistent (token, claims) pair, and the store holds
    /// that same token.
    pub async fn ensure_valid(&self) -> Result<(), AuthError> {
        let credentials = self.session().credentials().await;
        if credentials.token().is_none() {
            return Err(AuthError::NoToken);
        }
        if !credentials.is_expired(now_utc(), self.expiry_buffer()) {
            return Ok(());
        }

        info!(
            expires_at = ?credentials.claims().map(|c| c.expires_at),
            "token expired or about to expire, refreshing"
        );
        self.refresh().await.map_err(AuthError::TokenExpired)
    }

    /// Exchange the current token for a new one and persist it.
    ///
    /// On failure the current token is kept as is.
    pub async fn refresh(&self) -> Result<(), RefreshError> {
        let metrics = get_metrics().await;
        if self.session().token().await.is_none() {
            return Err(RefreshError::NoToken);
        }

        let outcome = match self.request_new_token().await {
            Ok(token) => self
                .session()
                .replace_token(token, |token| self.store().save(token))
                .await
                .map_err(|e| format!("could not persist refreshed token: {}", e)),
            Err(reason) => Err(reason),
        };

        match outcome {
            Ok(()) => {
                metrics.token_refreshes.with_label_values(&["success"]).inc();
                info!("token refreshed");
                Ok(())
            }
            Err(reason) => {
                metrics.token_refreshes.with_label_values(&["failure"]).inc();
                error!("token refresh failed: {}", reason);
                Err(RefreshError::RefreshFailed { reason })
            }
        }
    }

    /// POST the refresh endpoint for a new token.
    async fn request_new_token(&self) -> Result<String, String> {
        let url = self.api_url(REFRESH_ENDPOINT);
        let response = self
            .dispatch::<()>(Method::POST, &url, None)
            .await
            .map_err(|e| e.to_string())?;

        let body = response
            .json::<RefreshResponse>()
            .await
            .map_err(|e| format!("invalid refresh response: {}", e))?;
        if body.token.is_empty() {
            return Err("refresh response carried no token".to_owned());
        }
        Ok(body.token)
    }
}

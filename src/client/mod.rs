//! Authenticated REST client for the DeployAja API.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use reqwest::{Client, Url};

use crate::auth::session::Session;
use crate::auth::store::TokenStore;
use crate::config::settings::CliSettings;
use crate::error::ApiError;
use crate::helpers::time::get_refresh_buffer;
use crate::utils::constants::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_REFRESH_BUFFER_SECS};

pub mod dispatch;
pub mod endpoints;
pub mod types;

/// One session against one backend. Construct as many as needed; nothing is global.
pub struct ApiClient {
    session: Session,
    base: Url,
    http: Client,
    stream_http: Client,
    store: Arc<dyn TokenStore>,
    expiry_buffer: TimeDelta,
}

impl ApiClient {
    /// Client for `api_url` holding whatever token `store` currently has.
    pub fn new(api_url: &str, store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        Self::build(
            api_url,
            store,
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            get_refresh_buffer(Some(DEFAULT_REFRESH_BUFFER_SECS)),
        )
    }

    pub fn from_settings(settings: &CliSettings, store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        Self::build(
            &settings.api_url,
            store,
            Duration::from_secs(settings.request_timeout_seconds.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)),
            get_refresh_buffer(settings.refresh_buffer_seconds),
        )
    }

    fn build(
        api_url: &str,
        store: Arc<dyn TokenStore>,
        timeout: Duration,
        expiry_buffer: TimeDelta,
    ) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        // streams are long-lived, so no overall request timeout here
        let stream_http = Client::builder().build()?;
        let session = Session::new(api_url, store.load());
        let base = Url::parse(session.base_url())
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ApiError::InvalidUrl(api_url.to_owned()))?;

        Ok(Self {
            session,
            base,
            http,
            stream_http,
            store,
            expiry_buffer,
        })
    }

    pub fn with_expiry_buffer(mut self, buffer: TimeDelta) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &dyn TokenStore {
        self.store.as_ref()
    }

    pub fn expiry_buffer(&self) -> TimeDelta {
        self.expiry_buffer
    }

    /// `<base>/api/v1/<endpoint>`
    pub fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.session.base_url(), endpoint.trim_start_matches('/'))
    }

    /// `<base>/api/v1/<segments...>?<query>`, each segment and pair percent-encoded.
    pub fn endpoint_url(&self, segments: &[&str], query: &[(&str, &str)]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url.into()
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn stream_http(&self) -> &Client {
        &self.stream_http
    }
}

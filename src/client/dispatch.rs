use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::client::types::{ErrorEnvelope, ErrorResponse};
use crate::client::ApiClient;
use crate::error::{ApiError, LOGIN_HINT};
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;

static TRANSPORT_MSG: &str = "transport";
static STATUS_MSG: &str = "status";

impl ApiClient {
    /// Send one request, attaching the bearer token when the session has one.
    ///
    /// Missing tokens are not an error here; some endpoints are public.
    pub async fn dispatch<B>(&self, method: Method, url: &str, body: Option<&B>) -> Result<Response, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let metrics = get_metrics().await;
        let start = get_instant();

        let mut request = self
            .http()
            .request(method.clone(), url)
            .header(CONTENT_TYPE, "application/json");

        if let Some(body) = body {
            let json = serde_json::to_vec(body).map_err(ApiError::Serialize)?;
            request = request.body(json);
        }
        if let Some(token) = self.session().token().await {
            request = request.bearer_auth(token);
        }

        debug!(%method, url, "dispatching request");
        let response = request.send().await.inspect_err(|err| {
            warn!(%method, url, error = %err, "request failed");
            metrics.api_request_failures.with_label_values(&[method.as_str(), TRANSPORT_MSG]).inc();
        })?;

        let status = response.status();
        metrics.api_requests.with_label_values(&[method.as_str(), status.as_str()]).inc();
        metrics.api_request_duration.with_label_values(&[method.as_str()]).observe(start.elapsed().as_secs_f64());

        if status.as_u16() >= 400 {
            metrics.api_request_failures.with_label_values(&[method.as_str(), STATUS_MSG]).inc();
            return Err(decode_api_error(response).await);
        }
        Ok(response)
    }

    /// `ensure_valid` then `dispatch`: never fires with a token known to be stale.
    pub async fn dispatch_authenticated<B>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.ensure_valid().await?;
        self.dispatch(method, url, body).await
    }

    /// Authenticated GET of `endpoint`, decoded as `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.get_json_from(&self.api_url(endpoint)).await
    }

    /// Authenticated GET of an absolute `url`, decoded as `T`.
    pub async fn get_json_from<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.dispatch_authenticated::<()>(Method::GET, url, None).await?;
        decode_json(response).await
    }

    /// Authenticated request with a JSON body, response decoded as `T`.
    pub async fn send_json<B, T>(&self, method: Method, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .dispatch_authenticated(method, &self.api_url(endpoint), Some(body))
            .await?;
        decode_json(response).await
    }

    /// Authenticated request whose response body is not needed.
    pub async fn send<B>(&self, method: Method, endpoint: &str, body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.dispatch_authenticated(method, &self.api_url(endpoint), Some(body))
            .await
            .map(|_| ())
    }
}

pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ApiError::Decode)
}

/// Turn a failed response into an `ApiError`, reading the error envelope if there is one.
pub(crate) async fn decode_api_error(response: Response) -> ApiError {
    let status = response.status();
    let envelope = response
        .bytes()
        .await
        .ok()
        .and_then(|bytes| serde_json::from_slice::<ErrorResponse>(&bytes).ok())
        .map(|body| body.error);
    api_error(status, envelope)
}

pub(crate) fn api_error(status: StatusCode, envelope: Option<ErrorEnvelope>) -> ApiError {
    let (code, message, details) = match envelope {
        Some(envelope) if !envelope.message.is_empty() => {
            let code = (!envelope.code.is_empty()).then_some(envelope.code);
            (code, envelope.message, envelope.details)
        }
        _ => (None, format!("request failed with status {}", status), None),
    };

    let hint = (status == StatusCode::UNAUTHORIZED && message.to_lowercase().contains("token"))
        .then_some(LOGIN_HINT);

    ApiError::Api {
        status,
        code,
        message,
        details,
        hint,
    }
}

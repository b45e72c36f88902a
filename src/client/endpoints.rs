//! Typed wrappers for the DeployAja endpoints.

use std::collections::HashMap;

use base64::Engine;
use http::Method;
use serde_json::json;

use crate::client::dispatch::decode_json;
use crate::client::types::{
    AuthCheckResponse, CostResponse, DependenciesResponse, DeployResponse, DescribeResponse,
    EnvVarsBody, LogEntry, LogsResponse, RestartResponse, StatusResponse,
};
use crate::client::ApiClient;
use crate::config::deployment::DeploymentConfig;
use crate::error::ApiError;

/// Descriptor as the backend expects it: base64 of its YAML rendering.
pub fn encode_deployment_config(config: &DeploymentConfig) -> Result<String, ApiError> {
    let yaml = serde_yaml::to_string(config)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(yaml))
}

impl ApiClient {
    /// Login URL for a browser session identified by `session_code`.
    pub fn login_url_for(&self, session_code: &str) -> String {
        self.endpoint_url(&["login"], &[("ses", session_code)])
    }

    /// Poll the login session. `Some(token)` once the browser flow completed.
    pub async fn check_auth(&self, session_code: &str) -> Result<Option<String>, ApiError> {
        let url = self.endpoint_url(&["check"], &[("ses", session_code)]);
        let response = self.dispatch::<()>(Method::GET, &url, None).await?;
        let body: AuthCheckResponse = decode_json(response).await?;

        Ok(body
            .token
            .filter(|token| body.status == "authenticated" && !token.is_empty()))
    }

    pub async fn cost_estimate(&self, config: &DeploymentConfig) -> Result<CostResponse, ApiError> {
        let body = json!({ "deploymentConfig": encode_deployment_config(config)? });
        self.send_json(Method::POST, "cost", &body).await
    }

    pub async fn deploy(&self, config: &DeploymentConfig, dry_run: bool) -> Result<DeployResponse, ApiError> {
        let body = json!({
            "deploymentConfig": encode_deployment_config(config)?,
            "dryRun": dry_run,
        });
        self.send_json(Method::POST, "deploy", &body).await
    }

    pub async fn status(&self, name: Option<&str>) -> Result<StatusResponse, ApiError> {
        let query: Vec<(&str, &str)> = name.map(|name| ("name", name)).into_iter().collect();
        self.get_json_from(&self.endpoint_url(&["status"], &query)).await
    }

    pub async fn list_deployments(&self) -> Result<StatusResponse, ApiError> {
        self.get_json("list").await
    }

    /// Last `tail` log lines, without following.
    pub async fn logs(&self, name: &str, tail: u32) -> Result<Vec<LogEntry>, ApiError> {
        let tail = tail.to_string();
        let url = self.endpoint_url(&["logs", name], &[("tail", tail.as_str())]);
        let response: LogsResponse = self.get_json_from(&url).await?;
        Ok(response.logs)
    }

    pub async fn describe(&self, name: &str) -> Result<DescribeResponse, ApiError> {
        self.get_json_from(&self.endpoint_url(&["describe", name], &[])).await
    }

    pub async fn restart(&self, name: &str) -> Result<RestartResponse, ApiError> {
        self.send_json(Method::POST, "restart", &json!({ "name": name })).await
    }

    pub async fn rollback(&self, name: &str, version: &str) -> Result<(), ApiError> {
        self.send(Method::POST, "rollback", &json!({ "name": name, "version": version }))
            .await
    }

    pub async fn drop_deployment(&self, name: &str) -> Result<(), ApiError> {
        self.send(Method::POST, "drop", &json!({ "name": name })).await
    }

    pub async fn env_vars(&self) -> Result<HashMap<String, String>, ApiError> {
        let body: EnvVarsBody = self.get_json("env").await?;
        Ok(body.variables)
    }

    pub async fn update_env_vars(&self, variables: HashMap<String, String>) -> Result<(), ApiError> {
        self.send(Method::PUT, "env", &EnvVarsBody { variables }).await
    }

    pub async fn dependencies(&self, dependency_type: Option<&str>) -> Result<DependenciesResponse, ApiError> {
        let query: Vec<(&str, &str)> = dependency_type.map(|kind| ("type", kind)).into_iter().collect();
        self.get_json_from(&self.endpoint_url(&["dependencies"], &query)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use base64::Engine;
    use chrono::Utc;
    use httpmock::Method::{GET, POST, PUT};
    use httpmock::MockServer;
    use serde_json::json;

    use super::*;
    use crate::auth::store::MemoryTokenStore;
    use crate::config::deployment::parse_deployment_config;
    use crate::tests::common::sample_token;

    fn authenticated_client(server: &MockServer) -> ApiClient {
        let token = sample_token("user-1", Utc::now().timestamp() + 3600);
        ApiClient::new(&server.base_url(), Arc::new(MemoryTokenStore::new(token))).unwrap()
    }

    #[tokio::test]
    async fn check_auth_returns_token_only_when_authenticated() {
        let server = MockServer::start_async().await;
        let pending = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/check").query_param("ses", "pending-code");
                then.status(200).json_body(json!({"status": "pending"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/check").query_param("ses", "done-code");
                then.status(200).json_body(json!({"status": "authenticated", "token": "a.b.c"}));
            })
            .await;

        let client = ApiClient::new(&server.base_url(), Arc::new(MemoryTokenStore::default())).unwrap();

        assert_eq!(client.check_auth("pending-code").await.unwrap(), None);
        assert_eq!(client.check_auth("done-code").await.unwrap().as_deref(), Some("a.b.c"));
        pending.assert_async().await;
        assert_eq!(
            client.login_url_for("abc"),
            format!("{}/api/v1/login?ses=abc", server.base_url())
        );
    }

    #[tokio::test]
    async fn deploy_sends_base64_yaml_descriptor() {
        let config = parse_deployment_config("name: web\ncontainer:\n  image: nginx:1.27\n  port: 80\n").unwrap();
        let encoded = encode_deployment_config(&config).unwrap();
        let decoded = base64::engine::general_purpose::STANDARD.decode(&encoded).unwrap();
        let round_trip: DeploymentConfig = serde_yaml::from_slice(&decoded).unwrap();
        assert_eq!(round_trip, config);

        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/deploy")
                    .json_body(json!({"deploymentConfig": encoded, "dryRun": true}));
                then.status(200).json_body(json!({
                    "deploymentId": "dep-1",
                    "status": "QUEUED",
                    "message": "queued",
                    "url": "https://web.deployaja.id"
                }));
            })
            .await;

        let client = authenticated_client(&server);
        let response = client.deploy(&config, true).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.deployment_id, "dep-1");
        assert_eq!(response.url.as_deref(), Some("https://web.deployaja.id"));
    }

    #[tokio::test]
    async fn status_filters_by_name() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/status").query_param("name", "web");
                then.status(200).json_body(json!({
                    "deployments": [{
                        "name": "web",
                        "status": "RUNNING",
                        "lastDeployed": "2024-05-01T10:20:30Z",
                        "replicas": {"desired": 2, "available": 1}
                    }]
                }));
            })
            .await;

        let client = authenticated_client(&server);
        let status = client.status(Some("web")).await.unwrap();

        assert_eq!(status.deployments.len(), 1);
        assert_eq!(status.deployments[0].replicas.available, 1);
    }

    #[tokio::test]
    async fn logs_and_env_round_trip() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/logs/web").query_param("tail", "5");
                then.status(200).json_body(json!({
                    "logs": [{"timestamp": "t1", "level": "info", "message": "m1", "source": "s1"}]
                }));
            })
            .await;
        let put = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/api/v1/env")
                    .json_body(json!({"variables": {"MODE": "prod"}}));
                then.status(200).json_body(json!({}));
            })
            .await;

        let client = authenticated_client(&server);
        let logs = client.logs("web", 5).await.unwrap();
        assert_eq!(logs[0].message, "m1");

        let mut vars = HashMap::new();
        vars.insert("MODE".to_owned(), "prod".to_owned());
        client.update_env_vars(vars).await.unwrap();
        put.assert_async().await;
    }
}

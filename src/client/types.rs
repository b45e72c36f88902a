use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// ================================
/// Errors
/// ================================
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorEnvelope,
}

/// ================================
/// Logs
/// ================================
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsResponse {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

/// ================================
/// Auth
/// ================================
#[derive(Debug, Clone, Deserialize)]
pub struct AuthCheckResponse {
    pub status: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// ================================
/// Deployments
/// ================================
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostResponse {
    pub estimated_cost: EstimatedCost,
    #[serde(default)]
    pub breakdown: CostBreakdown,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EstimatedCost {
    pub monthly: f64,
    pub daily: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CostBreakdown {
    #[serde(default)]
    pub compute: f64,
    #[serde(default)]
    pub storage: f64,
    #[serde(default)]
    pub network: f64,
    #[serde(default)]
    pub dependencies: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResponse {
    pub deployment_id: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub estimated_time: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub deployments: Vec<DeploymentStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub last_deployed: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub replicas: Replicas,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Replicas {
    #[serde(default)]
    pub desired: u32,
    #[serde(default)]
    pub available: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DescribeResponse {
    #[serde(default)]
    pub pod: serde_json::Map<String, Value>,
    #[serde(default)]
    pub events: Vec<serde_json::Map<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestartResponse {
    pub success: bool,
    pub data: RestartData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartData {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub method: String,
}

/// ================================
/// Environment & dependencies
/// ================================
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EnvVarsBody {
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DependenciesResponse {
    #[serde(default)]
    pub dependencies: Vec<DependencyInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyInfo {
    #[serde(rename = "type")]
    pub dependency_type: String,
    pub name: String,
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub default_version: String,
}

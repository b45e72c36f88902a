use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// ================================
/// deployaja.yaml descriptor
/// ================================
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub container: Container,
    #[serde(default)]
    pub resources: Resources,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env_map: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_config: Option<DockerConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Container {
    pub image: String,
    #[serde(default)]
    pub port: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Resources {
    #[serde(default)]
    pub cpu: String,
    #[serde(default)]
    pub memory: String,
    #[serde(default)]
    pub replicas: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Dependency {
    pub name: String,
    #[serde(rename = "type")]
    pub dependency_type: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub user_managed: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub path: String,
    pub port: u16,
    #[serde(default)]
    pub initial_delay_seconds: u32,
    #[serde(default)]
    pub period_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    pub size: String,
    pub mount_path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DockerConfig {
    pub auths: BTreeMap<String, DockerAuth>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DockerAuth {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub auth: String,
}

const STARTER_NAMES: [&str; 10] = [
    "bima", "arjuna", "werkudara", "nakula", "sadewa", "gatotkaca", "krishna", "yudhistira", "srikandi", "abimanyu",
];

/// Read the deployment descriptor, pointing at `aja init` when it is missing.
pub async fn load_deployment_config(path: &Path) -> Result<DeploymentConfig> {
    let content = tokio::fs::read_to_string(path).await.map_err(|err| {
        anyhow!(
            "{} could not be read ({}). Run 'aja init' to create one",
            path.display(),
            err
        )
    })?;
    parse_deployment_config(&content)
}

pub fn parse_deployment_config(content: &str) -> Result<DeploymentConfig> {
    let config: DeploymentConfig = serde_yaml::from_str(content)?;
    validate_deployment_config(&config)?;
    Ok(config)
}

/// The fields the backend cannot deploy without.
pub fn validate_deployment_config(config: &DeploymentConfig) -> Result<()> {
    if config.name.trim().is_empty() {
        return Err(anyhow!("name is required"));
    }
    if config.container.image.trim().is_empty() {
        return Err(anyhow!("container.image is required"));
    }
    if config.container.port == 0 {
        return Err(anyhow!("container.port is required"));
    }
    Ok(())
}

/// A complete example descriptor under a generated `<name>-<NN>-app` name.
pub fn starter_deployment_config() -> DeploymentConfig {
    let seed = uuid::Uuid::new_v4().as_u128();
    let name = STARTER_NAMES[(seed % STARTER_NAMES.len() as u128) as usize];
    let number = 10 + (seed >> 64) % 90;

    DeploymentConfig {
        name: format!("{}-{}-app", name, number),
        description: "Simple web application with nginx and postgres".to_owned(),
        container: Container {
            image: "nginx:latest".to_owned(),
            port: 80,
        },
        resources: Resources {
            cpu: "500m".to_owned(),
            memory: "1Gi".to_owned(),
            replicas: 2,
        },
        dependencies: vec![Dependency {
            name: "postgresql".to_owned(),
            dependency_type: "postgresql".to_owned(),
            version: "15".to_owned(),
            config: None,
            storage: Some("1Gi".to_owned()),
        }],
        env: [("NODE_ENV", "production"), ("LOG_LEVEL", "info"), ("CACHE_TTL", "3600")]
            .into_iter()
            .map(|(name, value)| EnvVar {
                name: name.to_owned(),
                value: value.to_owned(),
                user_managed: false,
            })
            .collect(),
        health_check: Some(HealthCheck {
            path: "/api/health".to_owned(),
            port: 80,
            initial_delay_seconds: 60,
            period_seconds: 30,
        }),
        domain: format!("{}{}.deployaja.id", name, number),
        volumes: vec![Volume {
            name: "app-storage".to_owned(),
            size: "1Gi".to_owned(),
            mount_path: "/usr/share/nginx/html".to_owned(),
        }],
        ..DeploymentConfig::default()
    }
}

/// Write a starter descriptor to `path`. An existing file is never overwritten.
pub async fn init_deployment_config(path: &Path) -> Result<DeploymentConfig> {
    let config = starter_deployment_config();
    let yaml = serde_yaml::to_string(&config)?;

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::AlreadyExists => anyhow!("{} already exists", path.display()),
            _ => anyhow!("could not create {}: {}", path.display(), err),
        })?;
    file.write_all(yaml.as_bytes()).await?;
    file.flush().await?;

    debug!(path = %path.display(), name = %config.name, "starter descriptor written");
    Ok(config)
}

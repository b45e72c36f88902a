use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use deployaja::auth::store::{FileTokenStore, TokenStore};
use deployaja::client::types::LogEntry;
use deployaja::client::ApiClient;
use deployaja::config::deployment::{init_deployment_config, load_deployment_config};
use deployaja::config::proc_loader::file_to_settings;
use deployaja::helpers::time::format_timestamp;
use deployaja::observability::metrics::get_metrics;
use deployaja::stream::{consume_stream, ConsumeOutcome};
use deployaja::utils::constants::{CONFIG_DIR, CONFIG_FILE, DEPLOY_FILE};
use deployaja::utils::logging::{self, LogLevel};
use tracing::{debug, info};

const LOGIN_POLL_ATTEMPTS: u32 = 120;

#[derive(Parser)]
#[command(name = "aja", author, version, about, long_about = None)]
struct Args {
    /// settings file, defaults to ~/.deployaja/config.yaml
    #[arg(short, long, env = "AJA_CONFIG", global = true)]
    config: Option<PathBuf>,
    #[arg(long, env = "LOG_LEVEL", value_enum, global = true)]
    log_level: Option<LogLevel>,
    /// dump client metrics to stderr before exiting
    #[arg(long, global = true)]
    print_metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Authenticate through the browser
    Login,
    /// Show who the stored token belongs to
    Whoami,
    /// Exchange the stored token for a fresh one
    Refresh,
    Status { name: Option<String> },
    List,
    Logs {
        name: String,
        #[arg(long, default_value_t = 100)]
        tail: u32,
        /// keep following new lines
        #[arg(short, long)]
        follow: bool,
    },
    Deploy {
        #[arg(short, long, default_value = DEPLOY_FILE)]
        file: PathBuf,
        #[arg(long)]
        dry_run: bool,
    },
    /// Write a starter deployaja.yaml
    Init {
        #[arg(short, long, default_value = DEPLOY_FILE)]
        file: PathBuf,
    },
    /// Check a deployaja.yaml without contacting the server
    Validate {
        #[arg(short, long, default_value = DEPLOY_FILE)]
        file: PathBuf,
    },
    /// Estimate what a deployment costs
    Plan {
        #[arg(short, long, default_value = DEPLOY_FILE)]
        file: PathBuf,
    },
    #[command(subcommand)]
    Env(EnvCommand),
    Rollback { name: String, version: String },
    Drop { name: String },
    Restart { name: String },
    Describe { name: String },
    Deps {
        #[arg(long = "type")]
        dependency_type: Option<String>,
    },
}

#[derive(Subcommand)]
enum EnvCommand {
    Get,
    /// KEY=VALUE pairs
    Set { pairs: Vec<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Settings and logging
    // -------------------------------

    let args = Args::parse();
    let config_path = match args.config.clone() {
        Some(path) => path,
        None => dirs::home_dir()
            .ok_or_else(|| anyhow!("home directory could not be determined"))?
            .join(CONFIG_DIR)
            .join(CONFIG_FILE),
    };
    let settings = file_to_settings(&config_path).await?;
    logging::run(&settings, args.log_level);
    debug!(api_url = %settings.api_url, "settings loaded");

    // -------------------------------
    // 2. Client
    // -------------------------------

    let store = Arc::new(FileTokenStore::default_location()?);
    let client = ApiClient::from_settings(&settings, store.clone())?;

    // -------------------------------
    // 3. Command
    // -------------------------------

    let result = run_command(&client, store.as_ref(), args.command).await;

    if args.print_metrics {
        eprint!("{}", get_metrics().await.render());
    }
    result
}

async fn run_command(client: &ApiClient, store: &FileTokenStore, command: Command) -> Result<()> {
    match command {
        Command::Login => login(client, store).await,
        Command::Whoami => {
            let claims = client
                .session()
                .claims()
                .await
                .ok_or_else(|| anyhow!("not logged in; run 'aja login'"))?;
            println!("subject: {}", claims.subject);
            println!("email:   {}", claims.email);
            println!("expires: {}", claims.expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
            Ok(())
        }
        Command::Refresh => {
            client.refresh().await?;
            println!("Token refreshed");
            Ok(())
        }
        Command::Status { name } => {
            let status = client.status(name.as_deref()).await?;
            for deployment in status.deployments {
                println!(
                    "{:<24} {:<12} {}/{} {}",
                    deployment.name,
                    deployment.status,
                    deployment.replicas.available,
                    deployment.replicas.desired,
                    deployment.url.unwrap_or_default()
                );
            }
            Ok(())
        }
        Command::List => {
            for deployment in client.list_deployments().await?.deployments {
                println!("{:<24} {:<12} {}", deployment.name, deployment.status, format_timestamp(&deployment.last_deployed));
            }
            Ok(())
        }
        Command::Logs { name, tail, follow } => logs(client, &name, tail, follow).await,
        Command::Deploy { file, dry_run } => {
            let config = load_deployment_config(&file).await?;
            let response = client.deploy(&config, dry_run).await?;
            println!("{} {} {}", response.deployment_id, response.status, response.message);
            if let Some(url) = response.url {
                println!("url: {}", url);
            }
            Ok(())
        }
        Command::Init { file } => {
            let config = init_deployment_config(&file).await?;
            println!("Created {} for {}", file.display(), config.name);
            println!("Edit it to fit your application; drop dependencies, volumes or domain if unused");
            Ok(())
        }
        Command::Validate { file } => {
            let config = load_deployment_config(&file).await?;
            println!("{} is valid ({})", file.display(), config.name);
            Ok(())
        }
        Command::Plan { file } => {
            let config = load_deployment_config(&file).await?;
            let cost = client.cost_estimate(&config).await?;
            println!(
                "monthly: {:.2} {}  daily: {:.2} {}",
                cost.estimated_cost.monthly,
                cost.estimated_cost.currency,
                cost.estimated_cost.daily,
                cost.estimated_cost.currency
            );
            Ok(())
        }
        Command::Env(EnvCommand::Get) => {
            let mut variables: Vec<_> = client.env_vars().await?.into_iter().collect();
            variables.sort();
            for (key, value) in variables {
                println!("{}={}", key, value);
            }
            Ok(())
        }
        Command::Env(EnvCommand::Set { pairs }) => {
            let variables = parse_env_pairs(&pairs)?;
            client.update_env_vars(variables).await?;
            println!("Environment updated");
            Ok(())
        }
        Command::Rollback { name, version } => {
            client.rollback(&name, &version).await?;
            println!("Rolled back {} to {}", name, version);
            Ok(())
        }
        Command::Drop { name } => {
            client.drop_deployment(&name).await?;
            println!("Dropped {}", name);
            Ok(())
        }
        Command::Restart { name } => {
            let response = client.restart(&name).await?;
            println!("{}: {}", response.data.status, response.data.message);
            Ok(())
        }
        Command::Describe { name } => {
            let response = client.describe(&name).await?;
            println!("{}", serde_json::to_string_pretty(&response.pod)?);
            for event in response.events {
                println!("{}", serde_json::Value::Object(event));
            }
            Ok(())
        }
        Command::Deps { dependency_type } => {
            for dependency in client.dependencies(dependency_type.as_deref()).await?.dependencies {
                println!(
                    "{:<12} {:<16} default {} ({})",
                    dependency.dependency_type,
                    dependency.name,
                    dependency.default_version,
                    dependency.versions.join(", ")
                );
            }
            Ok(())
        }
    }
}

async fn login(client: &ApiClient, store: &FileTokenStore) -> Result<()> {
    let session_code = uuid::Uuid::new_v4().to_string();
    println!("Open this URL to log in:\n\n  {}\n", client.login_url_for(&session_code));

    for attempt in 1..=LOGIN_POLL_ATTEMPTS {
        tokio::time::sleep(Duration::from_secs(1)).await;
        debug!(attempt, "polling login session");
        if let Some(token) = client.check_auth(&session_code).await? {
            store.save(&token).with_context(|| format!("saving token to {}", store.path().display()))?;
            client.session().set_token(token).await;
            info!("login complete");
            println!("Logged in");
            return Ok(());
        }
    }
    Err(anyhow!("login timed out after {} seconds", LOGIN_POLL_ATTEMPTS))
}

async fn logs(client: &ApiClient, name: &str, tail: u32, follow: bool) -> Result<()> {
    if !follow {
        for entry in client.logs(name, tail).await? {
            print_entry(&entry);
        }
        return Ok(());
    }

    let mut stream = client.stream_logs(name, tail).await?;
    match consume_stream(&mut stream, shutdown_signal(), print_entry).await? {
        ConsumeOutcome::Completed => {}
        ConsumeOutcome::Interrupted => eprintln!("\nStopped following logs for {}", name),
    }
    Ok(())
}

fn print_entry(entry: &LogEntry) {
    println!(
        "{} [{}] {}: {}",
        format_timestamp(&entry.timestamp),
        entry.level.to_uppercase(),
        entry.source,
        entry.message
    );
}

fn parse_env_pairs(pairs: &[String]) -> Result<HashMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
                .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{}'", pair))
        })
        .collect()
}

/// Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

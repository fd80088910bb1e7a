//! Serverless Deploy CLI
//!
//! ```text
//! serverless-deploy deploy <manifest.json>
//! serverless-deploy logs <service_sid> <environment> [--tail] [--function <name|sid>]
//! ```

use std::sync::Arc;

use anyhow::{bail, Context};
use futures::StreamExt;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use serverless_deploy::api::{ApiClient, ServerlessApi};
use serverless_deploy::config::Config;
use serverless_deploy::deploy::Deployer;
use serverless_deploy::logs::{open_log_stream, LogsRequest};
use serverless_deploy::manifest::DeployManifest;

const USAGE: &str = "usage:
  serverless-deploy deploy <manifest.json>
  serverless-deploy logs <service_sid> <environment> [--tail] [--function <name|sid>]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "serverless_deploy=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env()
        .context("SERVERLESS_ACCOUNT_SID and SERVERLESS_AUTH_TOKEN must be set")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("deploy") => {
            let Some(path) = args.get(1) else {
                bail!(USAGE);
            };
            deploy(&config, path).await
        }
        Some("logs") => {
            let (Some(service_sid), Some(environment)) = (args.get(1), args.get(2)) else {
                bail!(USAGE);
            };
            let flags = &args[3..];
            let filter_by_function = match flags.iter().position(|arg| arg == "--function") {
                Some(i) => match flags.get(i + 1) {
                    Some(function) => Some(function.clone()),
                    None => bail!(USAGE),
                },
                None => None,
            };
            let request = LogsRequest {
                service_sid: service_sid.clone(),
                environment: environment.clone(),
                tail: flags.iter().any(|arg| arg == "--tail"),
                filter_by_function,
                ..Default::default()
            };
            logs(&config, request).await
        }
        _ => bail!(USAGE),
    }
}

async fn deploy(config: &Config, manifest_path: &str) -> anyhow::Result<()> {
    let request = DeployManifest::load(manifest_path).await?;

    tracing::info!(
        "Deploying {} functions and {} assets to {}",
        request.functions.len(),
        request.assets.len(),
        request.environment
    );

    let deployer = Deployer::from_config(config)?;
    let summary = deployer.deploy(request).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn logs(config: &Config, request: LogsRequest) -> anyhow::Result<()> {
    let api: Arc<dyn ServerlessApi> = Arc::new(ApiClient::new(&config.client)?);
    let mut stream = open_log_stream(api, request, &config.logs).await?;

    let cancel = stream.cancel_handle();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("Stopping log stream");
            cancel.cancel();
        }
    });

    while let Some(line) = stream.next().await {
        println!("{}", line?);
    }
    Ok(())
}

//! PushApps CLI
//!
//! Deploys the applications, services, user-provided services, database
//! migrations and security groups declared in one YAML file. Exits with 0
//! when every required operation succeeded and 3 otherwise.

use clap::Parser;
use pushapps_control::{Config, PushApps, RunSummary};
use pushapps_platform::HttpPlatformClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod error;
mod output;

use error::{CliResult, FAILURE_EXIT_CODE};
use output::OutputFormat;

/// PushApps CLI application
#[derive(Parser)]
#[command(name = "push-apps")]
#[command(about = "Deploy applications, services and schemas onto the platform", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration YAML
    #[arg(short, long, env = "PUSHAPPS_CONFIG")]
    config: PathBuf,

    /// Log level
    #[arg(long, env = "PUSHAPPS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "PUSHAPPS_LOG_JSON")]
    json: bool,

    /// Summary format (table, json)
    #[arg(short, long, default_value = "table")]
    output: OutputFormat,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    match run(&cli).await {
        Ok(summary) => {
            if let Err(e) = output::print_summary(&summary, cli.output) {
                output::print_error(&e);
            }
            for failure in summary.optional_failures() {
                output::print_warning(&format!("{} {} failed", failure.action, failure.identifier));
            }
            info!("SUCCESS");
            output::print_success("Deployment complete");
        }
        Err(e) => {
            error!(error = %e, "Deployment failed");
            output::print_error(&e);
            std::process::exit(FAILURE_EXIT_CODE);
        }
    }
}

async fn run(cli: &Cli) -> CliResult<RunSummary> {
    let config = Config::load(&cli.config)?;
    info!(
        config = %cli.config.display(),
        apps = config.apps.len(),
        services = config.services.len(),
        migrations = config.migrations.len(),
        "Loaded configuration"
    );

    let timeout = Duration::from_secs(config.push_apps.cf_operation_timeout_in_minutes * 60);
    let platform = HttpPlatformClient::new(&config.platform, timeout)?;

    let summary = PushApps::new(config, Arc::new(platform))
        .run()
        .await?;
    Ok(summary)
}

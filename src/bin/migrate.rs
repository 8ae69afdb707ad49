//! Companion migration command: fetch credentials, connect once, bring the
//! schema forward, exit non-zero if any unit fails.

use sqlx::Connection;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use userhub::config::Config;
use userhub::db::connect::{ConnectionFactory, PgConnectionFactory};
use userhub::error::HubError;
use userhub::migrate::MigrationRunner;
use userhub::secrets::{HttpSecretProvider, SecretProvider};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cfg = &userhub::config::CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    match run(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "migration run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: &Config) -> Result<(), HubError> {
    info!(
        dir = %cfg.migrations_dir.display(),
        secret_name = %cfg.db_secret_name,
        "starting database migrations"
    );

    let secrets = HttpSecretProvider::new(cfg.secrets_endpoint.clone());
    let bundle = secrets.fetch(&cfg.db_secret_name, &cfg.aws_region).await?;

    let connector = PgConnectionFactory::new(Duration::from_secs(cfg.connect_timeout_secs));
    let mut conn = connector.connect(&bundle).await?;

    let runner = MigrationRunner::new(cfg.migrations_dir.clone());
    let result = runner.run(&mut conn).await;

    if let Err(e) = conn.close().await {
        warn!(error = %e, "failed to close database connection");
    }

    let report = result?;
    if report.discovered == 0 {
        info!("no migration files found");
    } else if report.up_to_date() {
        info!(skipped = report.skipped, "all migrations are up to date");
    } else {
        info!(
            count = report.applied.len(),
            skipped = report.skipped,
            "applied new migrations"
        );
    }
    Ok(())
}

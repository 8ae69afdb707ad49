use mimalloc::MiMalloc;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use userhub::db::connect::PgConnectionFactory;
use userhub::router::{HubState, hub_router};
use userhub::secrets::HttpSecretProvider;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
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

    info!(
        port = cfg.port,
        secret_name = %cfg.db_secret_name,
        region = %cfg.aws_region,
        loglevel = %cfg.loglevel,
        "starting userhub"
    );

    let secrets = Arc::new(HttpSecretProvider::new(cfg.secrets_endpoint.clone()));
    let connector = Arc::new(PgConnectionFactory::new(Duration::from_secs(
        cfg.connect_timeout_secs,
    )));

    let state = HubState::new(secrets, connector, cfg);
    let app = hub_router(state);

    let addr = format!("0.0.0.0:{}", cfg.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

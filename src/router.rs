use crate::config::Config;
use crate::db::connect::ConnectionFactory;
use crate::handlers::users::{create_user, get_user, list_users};
use crate::secrets::SecretProvider;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;

/// Request-scoped dependencies. The secret provider and connection factory
/// are injected so tests can substitute fakes.
#[derive(Clone)]
pub struct HubState {
    pub secrets: Arc<dyn SecretProvider>,
    pub connector: Arc<dyn ConnectionFactory>,
    pub secret_name: Arc<str>,
    pub region: Arc<str>,
}

impl HubState {
    pub fn new(
        secrets: Arc<dyn SecretProvider>,
        connector: Arc<dyn ConnectionFactory>,
        cfg: &Config,
    ) -> Self {
        Self {
            secrets,
            connector,
            secret_name: Arc::from(cfg.db_secret_name.as_str()),
            region: Arc::from(cfg.aws_region.as_str()),
        }
    }
}

pub fn hub_router(state: HubState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/hello", get(hello))
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/{id}", get(get_user))
        .with_state(state)
}

// Load balancer health check; must answer regardless of database state.
async fn health() -> &'static str {
    "OK"
}

async fn hello() -> Json<Value> {
    Json(json!({
        "message": "Hello World from Backend!",
        "status": "success",
        "service": "backend-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

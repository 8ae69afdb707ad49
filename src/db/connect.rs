use crate::error::HubError;
use crate::secrets::CredentialBundle;
use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Turns a credential bundle into a live connection. Behind a trait so tests
/// can substitute a failing fake; connections are request-scoped and closed
/// by the caller on every exit path.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(&self, bundle: &CredentialBundle) -> Result<PgConnection, HubError>;
}

pub struct PgConnectionFactory {
    connect_timeout: Duration,
}

impl PgConnectionFactory {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl ConnectionFactory for PgConnectionFactory {
    async fn connect(&self, bundle: &CredentialBundle) -> Result<PgConnection, HubError> {
        let opts = PgConnectOptions::new()
            .host(&bundle.host)
            .port(bundle.port)
            .database(&bundle.dbname)
            .username(&bundle.username)
            .password(&bundle.password);

        debug!(
            host = %bundle.host,
            port = bundle.port,
            dbname = %bundle.dbname,
            "opening database connection"
        );

        // A connection attempt must not hang indefinitely.
        match timeout(self.connect_timeout, PgConnection::connect_with(&opts)).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(HubError::ConnectionFailed(e.to_string())),
            Err(_) => Err(HubError::ConnectionFailed(format!(
                "connect timed out after {:?}",
                self.connect_timeout
            ))),
        }
    }
}

//! Runtime credential retrieval from the remote secret store.
//!
//! The store is an opaque collaborator: one `GetSecretValue`-shaped HTTP
//! call per fetch, no caching, no retry. Every failure surfaces as
//! `SecretUnavailable`.

use crate::error::HubError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use std::fmt;
use std::time::Duration;
use url::Url;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Database credentials as stored in the secret. Vendor-managed databases
/// expose the address under `endpoint` instead of `host`; both are accepted.
#[derive(Clone, Deserialize)]
pub struct CredentialBundle {
    #[serde(alias = "endpoint")]
    pub host: String,
    #[serde(deserialize_with = "port_from_any")]
    pub port: u16,
    pub dbname: String,
    pub username: String,
    pub password: String,
}

// The bundle must never be logged in full.
impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Secrets commonly store the port as either a number or a string.
fn port_from_any<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u16),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn fetch(&self, secret_name: &str, region: &str) -> Result<CredentialBundle, HubError>;
}

/// HTTP implementation speaking the secret store's JSON wire shape. The
/// endpoint is derived from the region unless explicitly overridden
/// (local-stack deployments).
pub struct HttpSecretProvider {
    client: Client,
    endpoint: Option<Url>,
}

impl HttpSecretProvider {
    pub fn new(endpoint: Option<Url>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }

    fn endpoint_for(&self, region: &str) -> Result<Url, HubError> {
        match &self.endpoint {
            Some(url) => Ok(url.clone()),
            None => Url::parse(&format!("https://secretsmanager.{region}.amazonaws.com/"))
                .map_err(|e| HubError::SecretUnavailable(format!("bad endpoint: {e}"))),
        }
    }
}

#[derive(Deserialize)]
struct GetSecretValueResponse {
    #[serde(rename = "SecretString")]
    secret_string: String,
}

#[async_trait]
impl SecretProvider for HttpSecretProvider {
    async fn fetch(&self, secret_name: &str, region: &str) -> Result<CredentialBundle, HubError> {
        let url = self.endpoint_for(region)?;

        let resp = self
            .client
            .post(url)
            .timeout(FETCH_TIMEOUT)
            .header("x-amz-target", "secretsmanager.GetSecretValue")
            .header("content-type", "application/x-amz-json-1.1")
            .json(&json!({ "SecretId": secret_name }))
            .send()
            .await
            .map_err(|e| HubError::SecretUnavailable(format!("secret store unreachable: {e}")))?;

        if !resp.status().is_success() {
            return Err(HubError::SecretUnavailable(format!(
                "secret store returned {} for {secret_name}",
                resp.status()
            )));
        }

        let value: GetSecretValueResponse = resp
            .json()
            .await
            .map_err(|e| HubError::SecretUnavailable(format!("malformed store response: {e}")))?;

        serde_json::from_str(&value.secret_string)
            .map_err(|e| HubError::SecretUnavailable(format!("malformed secret payload: {e}")))
    }
}

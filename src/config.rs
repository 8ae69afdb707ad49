use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;
use url::Url;

/// Runtime configuration, resolved once from environment variables over
/// serialized defaults. Recognized variables: `PORT`, `LOGLEVEL`,
/// `DB_SECRET_NAME`, `AWS_REGION`, `SECRETS_ENDPOINT`, `MIGRATIONS_DIR`,
/// `CONNECT_TIMEOUT_SECS`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub loglevel: String,
    pub db_secret_name: String,
    pub aws_region: String,
    /// Override for the secret-store endpoint (local stacks); when unset the
    /// regional endpoint is derived from `aws_region`.
    pub secrets_endpoint: Option<Url>,
    pub migrations_dir: PathBuf,
    pub connect_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            loglevel: "info".to_string(),
            db_secret_name: "my-project-db-password".to_string(),
            aws_region: "eu-central-1".to_string(),
            secrets_endpoint: None,
            migrations_dir: PathBuf::from("migrations"),
            connect_timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::raw())
            .extract()
    }
}

pub static CONFIG: LazyLock<Config> =
    LazyLock::new(|| Config::from_env().expect("invalid environment configuration"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_conventions() {
        let cfg = Config::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.db_secret_name, "my-project-db-password");
        assert_eq!(cfg.aws_region, "eu-central-1");
        assert_eq!(cfg.migrations_dir, PathBuf::from("migrations"));
        assert_eq!(cfg.connect_timeout_secs, 10);
        assert!(cfg.secrets_endpoint.is_none());
    }
}

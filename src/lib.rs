pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod migrate;
pub mod router;
pub mod secrets;
pub mod validate;

pub use error::HubError;
pub use secrets::{CredentialBundle, SecretProvider};

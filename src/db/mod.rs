//! Database module: connection lifecycle and the users repository.
//!
//! Layout:
//! - `connect.rs`: credential bundle -> live connection, with timeout
//! - `models.rs`: Rust structs mirroring DB rows
//! - `users.rs`: parameterized CRUD over the `users` table

pub mod connect;
pub mod models;
pub mod users;

pub use connect::{ConnectionFactory, PgConnectionFactory};
pub use models::User;
pub use users::{Page, UserRepository};

use crate::db::models::User;
use crate::error::HubError;
use sqlx::{Connection, PgConnection};

/// Effective pagination after clamping, ready to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

/// Parameterized CRUD over the `users` table. Every value is bound via
/// placeholders; no SQL text is ever built from request input.
pub struct UserRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> UserRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Newest-first page of users plus the unfiltered row count.
    pub async fn list(&mut self, page: &Page) -> Result<(Vec<User>, i64), HubError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, name, email, created_at FROM users \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&mut *self.conn)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *self.conn)
            .await?;

        Ok((users, total))
    }

    pub async fn get(&mut self, id: i64) -> Result<User, HubError> {
        sqlx::query_as::<_, User>("SELECT id, name, email, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or(HubError::NotFound)
    }

    /// Single insert-and-return inside an explicit transaction. Duplicate
    /// emails are detected by the schema's uniqueness constraint, not by a
    /// pre-check, so concurrent inserts cannot race past it.
    pub async fn create(&mut self, name: &str, email: &str) -> Result<User, HubError> {
        let mut tx = self.conn.begin().await?;

        let inserted = sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email) VALUES ($1, $2) \
             RETURNING id, name, email, created_at",
        )
        .bind(name)
        .bind(email)
        .fetch_one(&mut *tx)
        .await;

        match inserted {
            Ok(user) => {
                tx.commit().await?;
                Ok(user)
            }
            Err(e) => {
                tx.rollback().await.ok();
                if is_unique_violation(&e) {
                    Err(HubError::DuplicateEmail)
                } else {
                    Err(e.into())
                }
            }
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

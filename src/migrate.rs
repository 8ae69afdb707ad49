//! Versioned schema migrations: discovery, planning, and the apply loop.
//!
//! Units are `.sql` files applied in ascending filename order; the version
//! is the filename stem. Each unit's statements and its tracking record are
//! committed in one transaction, and the run halts at the first failure so
//! the tracking table never records a partially applied version.

use crate::error::HubError;
use sqlx::{Connection, PgConnection};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// Idempotent DDL; no check-then-create race.
const TRACKING_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS schema_migrations (
    version VARCHAR(255) PRIMARY KEY,
    applied_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP
)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationUnit {
    pub version: String,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
pub struct MigrationReport {
    pub discovered: usize,
    pub skipped: usize,
    pub applied: Vec<String>,
}

impl MigrationReport {
    pub fn up_to_date(&self) -> bool {
        self.applied.is_empty()
    }
}

/// List `.sql` units in `dir`, ordered ascending by filename. A missing or
/// empty directory yields zero units, which is a success no-op.
pub fn discover(dir: &Path) -> Result<Vec<MigrationUnit>, HubError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut units: Vec<MigrationUnit> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_sql_file(path))
        .filter_map(|path| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .map(|stem| MigrationUnit {
                    version: stem.to_string(),
                    path: path.clone(),
                })
        })
        .collect();

    units.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(units)
}

fn is_sql_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("sql"))
        == Some(true)
}

/// Units not yet recorded as applied, in discovery order.
pub fn pending<'a>(
    units: &'a [MigrationUnit],
    applied: &HashSet<String>,
) -> Vec<&'a MigrationUnit> {
    units.iter().filter(|u| !applied.contains(&u.version)).collect()
}

pub struct MigrationRunner {
    dir: PathBuf,
}

impl MigrationRunner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Single pass: ensure the tracking table, skip applied units, apply the
    /// rest in order, halt on the first failure.
    pub async fn run(&self, conn: &mut PgConnection) -> Result<MigrationReport, HubError> {
        sqlx::query(TRACKING_TABLE_DDL).execute(&mut *conn).await?;

        let applied: HashSet<String> =
            sqlx::query_scalar::<_, String>("SELECT version FROM schema_migrations ORDER BY version")
                .fetch_all(&mut *conn)
                .await?
                .into_iter()
                .collect();

        let units = discover(&self.dir)?;
        let mut report = MigrationReport {
            discovered: units.len(),
            ..Default::default()
        };

        if units.is_empty() {
            warn!(dir = %self.dir.display(), "no migration files found");
            return Ok(report);
        }

        for skipped in units.iter().filter(|u| applied.contains(&u.version)) {
            info!(version = %skipped.version, "skipping already applied migration");
            report.skipped += 1;
        }

        for unit in pending(&units, &applied) {
            self.apply(conn, unit).await?;
            report.applied.push(unit.version.clone());
        }

        Ok(report)
    }

    async fn apply(&self, conn: &mut PgConnection, unit: &MigrationUnit) -> Result<(), HubError> {
        info!(version = %unit.version, "applying migration");

        let sql = fs::read_to_string(&unit.path).map_err(|e| HubError::MigrationApply {
            version: unit.version.clone(),
            source: Box::new(e.into()),
        })?;

        // Statements and tracking record commit together or not at all; the
        // transaction rolls back on drop if anything fails.
        let result = async {
            let mut tx = conn.begin().await?;
            sqlx::raw_sql(&sql).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO schema_migrations (version) VALUES ($1)")
                .bind(&unit.version)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok::<(), HubError>(())
        }
        .await;

        result.map_err(|e| HubError::MigrationApply {
            version: unit.version.clone(),
            source: Box::new(e),
        })
    }
}

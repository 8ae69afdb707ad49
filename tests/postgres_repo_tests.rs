//! Database-coupled tests for the repository and migration runner. These
//! need a live scratch Postgres: set `TEST_DATABASE_URL` and run with
//! `--ignored`. Fixture tables and versions carry a unique tag so reruns
//! against the same database stay independent.

use sqlx::{Connection, PgConnection};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use userhub::db::users::UserRepository;
use userhub::error::HubError;
use userhub::migrate::MigrationRunner;

// The runner and the users table are shared database state; keep the
// DB-coupled tests from interleaving.
static DB_LOCK: Mutex<()> = Mutex::const_new(());

fn unique_tag() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos()
}

async fn connect() -> PgConnection {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a scratch Postgres");
    PgConnection::connect(&url)
        .await
        .expect("failed to connect to TEST_DATABASE_URL")
}

fn write_unit(dir: &Path, name: &str, sql: &str) {
    fs::write(dir.join(name), sql).expect("failed to write migration fixture");
}

async fn tracked_count(conn: &mut PgConnection, version: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations WHERE version = $1")
        .bind(version)
        .fetch_one(conn)
        .await
        .expect("failed to read schema_migrations")
}

async fn cleanup_versions(conn: &mut PgConnection, tag: u128) {
    sqlx::query("DELETE FROM schema_migrations WHERE version LIKE $1")
        .bind(format!("%{tag}"))
        .execute(conn)
        .await
        .ok();
}

#[tokio::test]
#[ignore = "needs a live Postgres via TEST_DATABASE_URL"]
async fn duplicate_email_is_rejected_without_partial_insert() {
    let _guard = DB_LOCK.lock().await;
    let mut conn = connect().await;

    // Bring up the real schema, uniqueness constraint included.
    MigrationRunner::new("migrations")
        .run(&mut conn)
        .await
        .expect("schema migrations should apply");

    let email = format!("dup-{}@example.com", unique_tag());

    let first = UserRepository::new(&mut conn)
        .create("Ada Lovelace", &email)
        .await
        .expect("first insert should succeed");
    assert_eq!(first.email, email);

    let total_before: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&mut conn)
        .await
        .expect("failed to count users");

    let second = UserRepository::new(&mut conn)
        .create("Grace Hopper", &email)
        .await;
    assert!(matches!(second, Err(HubError::DuplicateEmail)));

    let total_after: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&mut conn)
        .await
        .expect("failed to count users");
    assert_eq!(total_before, total_after);

    sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(&email)
        .execute(&mut conn)
        .await
        .expect("cleanup failed");
    conn.close().await.ok();
}

#[tokio::test]
#[ignore = "needs a live Postgres via TEST_DATABASE_URL"]
async fn second_run_applies_zero_units_and_reports_up_to_date() {
    let _guard = DB_LOCK.lock().await;
    let mut conn = connect().await;

    let tag = unique_tag();
    let table = format!("rerun_{tag}");
    let dir = tempfile::tempdir().expect("tempdir");
    write_unit(
        dir.path(),
        &format!("001_create_{tag}.sql"),
        &format!("CREATE TABLE {table} (id BIGSERIAL PRIMARY KEY);"),
    );
    write_unit(
        dir.path(),
        &format!("002_note_{tag}.sql"),
        &format!("ALTER TABLE {table} ADD COLUMN note TEXT;"),
    );

    let runner = MigrationRunner::new(dir.path());

    let first = runner.run(&mut conn).await.expect("first run should apply");
    assert_eq!(first.discovered, 2);
    assert_eq!(first.skipped, 0);
    assert_eq!(
        first.applied,
        vec![format!("001_create_{tag}"), format!("002_note_{tag}")]
    );

    let second = runner.run(&mut conn).await.expect("second run should no-op");
    assert!(second.up_to_date());
    assert_eq!(second.skipped, 2);
    assert!(second.applied.is_empty());

    sqlx::raw_sql(&format!("DROP TABLE {table};"))
        .execute(&mut conn)
        .await
        .ok();
    cleanup_versions(&mut conn, tag).await;
    conn.close().await.ok();
}

#[tokio::test]
#[ignore = "needs a live Postgres via TEST_DATABASE_URL"]
async fn failing_middle_unit_rolls_back_and_halts_the_run() {
    let _guard = DB_LOCK.lock().await;
    let mut conn = connect().await;

    let tag = unique_tag();
    let first_table = format!("halt_one_{tag}");
    let third_table = format!("halt_three_{tag}");
    let dir = tempfile::tempdir().expect("tempdir");
    write_unit(
        dir.path(),
        &format!("001_create_{tag}.sql"),
        &format!("CREATE TABLE {first_table} (id BIGSERIAL PRIMARY KEY);"),
    );
    // First statement succeeds, second fails: the whole unit must roll back.
    write_unit(
        dir.path(),
        &format!("002_break_{tag}.sql"),
        &format!(
            "INSERT INTO {first_table} DEFAULT VALUES;\n\
             INSERT INTO missing_{tag} DEFAULT VALUES;"
        ),
    );
    write_unit(
        dir.path(),
        &format!("003_never_{tag}.sql"),
        &format!("CREATE TABLE {third_table} (id BIGSERIAL PRIMARY KEY);"),
    );

    let err = MigrationRunner::new(dir.path())
        .run(&mut conn)
        .await
        .expect_err("run should halt on the failing unit");
    match err {
        HubError::MigrationApply { version, .. } => {
            assert_eq!(version, format!("002_break_{tag}"));
        }
        other => panic!("expected MigrationApply, got {other}"),
    }

    // Unit 1 persisted: effects and tracking record both present.
    assert_eq!(tracked_count(&mut conn, &format!("001_create_{tag}")).await, 1);

    // Unit 2 fully rolled back: its partial insert is gone, nothing recorded.
    let leaked: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {first_table}"))
        .fetch_one(&mut conn)
        .await
        .expect("failed to count rolled-back rows");
    assert_eq!(leaked, 0);
    assert_eq!(tracked_count(&mut conn, &format!("002_break_{tag}")).await, 0);

    // Unit 3 never attempted.
    let third_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
    )
    .bind(&third_table)
    .fetch_one(&mut conn)
    .await
    .expect("failed to probe for third table");
    assert!(!third_exists);
    assert_eq!(tracked_count(&mut conn, &format!("003_never_{tag}")).await, 0);

    sqlx::raw_sql(&format!("DROP TABLE {first_table};"))
        .execute(&mut conn)
        .await
        .ok();
    cleanup_versions(&mut conn, tag).await;
    conn.close().await.ok();
}

use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbErr,
    Statement, TransactionTrait,
};
use std::{path::PathBuf, time::Duration};
use tokio::fs;

pub type OrmConn = DatabaseConnection;

/// Create a SeaORM connection.
pub async fn create_orm_conn(database_url: &str) -> Result<OrmConn> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Bounds row-lock waits for the rest of the transaction. A timed out wait
/// fails with SQLSTATE 55P03, which callers treat as transient.
pub async fn set_lock_timeout(txn: &DatabaseTransaction, timeout: Duration) -> Result<(), DbErr> {
    let backend = txn.get_database_backend();
    txn.execute(Statement::from_string(backend, lock_timeout_sql(timeout)))
        .await?;
    Ok(())
}

/// Sub-millisecond timeouts round up: `lock_timeout = 0` disables the bound.
fn lock_timeout_sql(timeout: Duration) -> String {
    format!("SET LOCAL lock_timeout = {}", timeout.as_millis().max(1))
}

/// Arbitrary key for the advisory lock that serialises migration runs.
const MIGRATION_LOCK_KEY: i64 = 0x666c_6565_74;

/// Minimal migration runner that executes SQL files in `migrations/` in filename order.
/// Everything runs in one transaction holding an advisory lock, so processes
/// starting together do not race on `CREATE ... IF NOT EXISTS`.
pub async fn run_migrations(conn: &OrmConn) -> Result<()> {
    let mut entries = fs::read_dir(migrations_dir()).await?;
    let mut files: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort();

    let backend = conn.get_database_backend();
    let txn = conn.begin().await?;
    txn.execute(Statement::from_string(
        backend,
        format!("SELECT pg_advisory_xact_lock({MIGRATION_LOCK_KEY})"),
    ))
    .await?;

    for file in files {
        tracing::debug!(file = %file.display(), "applying migration");
        let sql = fs::read_to_string(&file).await?;
        // Postgres prepared statements cannot contain multiple commands,
        // so split the migration file and run each statement individually.
        for stmt in sql.split(';') {
            let stmt = stmt.trim();
            if stmt.is_empty() {
                continue;
            }
            let statement = format!("{stmt};");
            txn.execute(Statement::from_string(backend, statement))
                .await?;
        }
    }

    txn.commit().await?;
    Ok(())
}

fn migrations_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_timeout_is_never_unbounded() {
        assert_eq!(lock_timeout_sql(Duration::ZERO), "SET LOCAL lock_timeout = 1");
        assert_eq!(
            lock_timeout_sql(Duration::from_micros(300)),
            "SET LOCAL lock_timeout = 1"
        );
        assert_eq!(
            lock_timeout_sql(Duration::from_millis(250)),
            "SET LOCAL lock_timeout = 250"
        );
    }
}

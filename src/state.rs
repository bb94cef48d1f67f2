use std::time::Duration;

use diesel::{
    SqliteConnection,
    connection::SimpleConnection,
    r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection},
};
use diesel_migrations::MigrationHarness;
use tokio::task::spawn_blocking;

use crate::{
    MIGRATIONS,
    error::{Result, TabError},
};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Applied to every connection handed out by the pool.
///
/// Writers take the SQLite write lock up front (see
/// [`crate::tournaments::rounds::ballots::submit::submit_ballot`]), so a second writer
/// has to wait for it; `busy_timeout` is how long it waits before the
/// transaction fails with a storage error.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionOptions {
    pub busy_timeout: Duration,
    pub enable_wal: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            enable_wal: false,
        }
    }
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error>
    for ConnectionOptions
{
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        let mut pragmas = format!(
            "PRAGMA busy_timeout = {}; PRAGMA foreign_keys = ON;",
            self.busy_timeout.as_millis()
        );
        if self.enable_wal {
            pragmas.push_str(" PRAGMA journal_mode = WAL;");
        }
        conn.batch_execute(&pragmas)
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn is_in_memory(db_url: &str) -> bool {
    db_url == ":memory:" || db_url.contains("mode=memory")
}

/// Builds the connection pool. Each connection to an in-memory database is a
/// separate database, so those pools hold exactly one connection.
pub fn make_pool(
    db_url: &str,
    max_connections: u32,
    options: ConnectionOptions,
) -> Result<DbPool> {
    let in_memory = is_in_memory(db_url);
    let options = ConnectionOptions {
        enable_wal: options.enable_wal && !in_memory,
        ..options
    };

    let pool = Pool::builder()
        .max_size(if in_memory { 1 } else { max_connections.max(1) })
        .connection_customizer(Box::new(options))
        .build(ConnectionManager::<SqliteConnection>::new(db_url))?;

    Ok(pool)
}

/// A single connection with the same settings as the server's pool, for the
/// command-line tools.
pub fn connect(db_url: &str, options: ConnectionOptions) -> Result<DbConn> {
    Ok(make_pool(db_url, 1, options)?.get()?)
}

pub fn run_migrations(conn: &mut SqliteConnection) -> Result<()> {
    let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
        TabError::StorageFailure {
            message: format!("failed to run migrations: {e}"),
            source: Some(e),
        }
    })?;
    tracing::debug!(count = applied.len(), "applied pending migrations");
    Ok(())
}

/// Runs blocking database work on a pooled connection, off the async
/// executor.
pub async fn with_conn<T, F>(pool: &DbPool, f: F) -> Result<T>
where
    F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    spawn_blocking(move || {
        let mut conn = pool.get()?;
        f(&mut conn)
    })
    .await?
}

#[cfg(test)]
mod tests {
    use diesel::{prelude::*, sql_query, sql_types::BigInt};

    use super::*;

    #[derive(QueryableByName)]
    struct Timeout {
        #[diesel(sql_type = BigInt)]
        timeout: i64,
    }

    #[test]
    fn single_connections_carry_the_pool_settings() {
        let options = ConnectionOptions {
            busy_timeout: Duration::from_millis(1234),
            enable_wal: false,
        };
        let mut conn = connect(":memory:", options).unwrap();
        run_migrations(&mut conn).unwrap();

        let busy = sql_query("PRAGMA busy_timeout")
            .get_result::<Timeout>(&mut *conn)
            .unwrap();
        assert_eq!(busy.timeout, 1234);

        // Foreign keys are enforced: no team without its tournament.
        let orphan = sql_query(
            "INSERT INTO teams (id, tournament_id, name) \
             VALUES ('t', 'missing', 'Orphans')",
        )
        .execute(&mut *conn);
        assert!(orphan.is_err());
    }
}

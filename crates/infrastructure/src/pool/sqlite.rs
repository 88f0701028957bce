use async_trait::async_trait;
use quire_application::ports::ConnectionFactory;
use quire_domain::DomainError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqliteSynchronous};
use sqlx::{ConnectOptions, Connection};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Opens SQLite connections for one pool.
///
/// Writers create the database if needed and run in WAL mode so readers and
/// the writer don't block each other. Readers open the file read-only.
#[derive(Debug, Clone)]
pub struct SqliteConnectionFactory {
    options: SqliteConnectOptions,
    read_only: bool,
}

impl SqliteConnectionFactory {
    pub fn writer(database_url: &str) -> Result<Self, DomainError> {
        let options = Self::base_options(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
        Ok(Self {
            options,
            read_only: false,
        })
    }

    pub fn reader(database_url: &str) -> Result<Self, DomainError> {
        let options = Self::base_options(database_url)?
            .create_if_missing(false)
            .read_only(true);
        Ok(Self {
            options,
            read_only: true,
        })
    }

    fn base_options(database_url: &str) -> Result<SqliteConnectOptions, DomainError> {
        let options = SqliteConnectOptions::from_str(database_url).map_err(|e| {
            DomainError::ConnectionFactory(format!("invalid database url '{database_url}': {e}"))
        })?;
        // Avoid SQLITE_BUSY errors under concurrent load
        Ok(options.busy_timeout(Duration::from_secs(5)))
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

#[async_trait]
impl ConnectionFactory for SqliteConnectionFactory {
    type Connection = SqliteConnection;

    async fn connect(&self) -> Result<SqliteConnection, DomainError> {
        self.options
            .connect()
            .await
            .map_err(|e| DomainError::ConnectionFactory(e.to_string()))
    }

    async fn close(&self, connection: SqliteConnection) {
        if let Err(e) = connection.close().await {
            warn!(error = %e, read_only = self.read_only, "Failed to close SQLite connection cleanly");
        }
    }
}

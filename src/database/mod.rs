pub mod models;
pub mod queries;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::StoreError;
use models::{EvaluationInfo, Signature, UserSignature};

static MIGRATOR: Migrator = sqlx::migrate!();

/// Persistence contract for signatures and pull requests awaiting them.
///
/// Every write is safe to repeat: tracking upserts resolve conflicts instead
/// of failing and deletes tolerate rows that are already gone, so concurrent
/// evaluations of the same pull request converge without locking.
#[async_trait]
pub trait SignatureStore: Send + Sync {
    /// Records a new signature. Fails with [`StoreError::DuplicateSignature`]
    /// when (login, version) already exists or nothing was written.
    async fn insert_signature(&self, signature: &Signature) -> Result<(), StoreError>;

    /// `Ok(None)` when the user has not signed this version.
    async fn has_signed(&self, login: &str, cla_version: &str) -> Result<Option<Signature>, StoreError>;

    /// Upserts the tracking record for `info`'s pull request and one author row
    /// per entry in `info.user_signatures`. Returns the tracking record id.
    async fn store_unsigned_authors(
        &self,
        info: &EvaluationInfo,
        checked_at: DateTime<Utc>,
    ) -> Result<String, StoreError>;

    /// Every pull request `user` is currently blocking for their CLA version.
    async fn get_tracked_pull_requests(&self, user: &UserSignature) -> Result<Vec<EvaluationInfo>, StoreError>;

    /// Drops tracked author rows for users who have since signed, and the
    /// tracking record itself once its last author is gone.
    async fn remove_resolved_authors(
        &self,
        signed_users: &[UserSignature],
        info: &EvaluationInfo,
    ) -> Result<RemovalOutcome, StoreError>;

    async fn migrate_schema(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub authors_removed: u64,
    pub pull_request_removed: bool,
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens a database file. An in-memory URL gets a single-connection pool,
    /// since every connection to `:memory:` would otherwise see its own empty
    /// database.
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        if is_in_memory_url(database_url) {
            return Self::connect_in_memory(database_url).await;
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Database { pool })
    }

    /// A private in-memory database with the schema applied.
    pub async fn new_in_memory() -> Result<Self, StoreError> {
        let database = Self::connect_in_memory("sqlite::memory:").await?;
        database.run_migrations().await?;
        Ok(database)
    }

    async fn connect_in_memory(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Database { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies pending migrations. Nothing pending is a successful no-op.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        MIGRATOR.run(&self.pool).await?;
        info!("Database schema is up to date");
        Ok(())
    }
}

fn is_in_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Database module for SQLite persistence
///
/// One table per record domain (events, transactions, shopping items, health
/// logs, notes, trips, journal entries) plus the owning users. Queries are
/// parameterized and the pool runs in WAL mode.
///
/// Timestamps are stored as unix milliseconds and converted to
/// `DateTime<Utc>` at the repository boundary.
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

pub mod events;
pub mod finance;
pub mod health;
pub mod journal;
pub mod notes;
pub mod shopping;
pub mod trips;
pub mod users;

pub use events::{EventRepository, NewEvent};
pub use finance::{NewTransaction, TransactionRepository};
pub use health::HealthRepository;
pub use journal::{JournalRepository, NewJournalEntry};
pub use notes::NoteRepository;
pub use shopping::ShoppingRepository;
pub use trips::{NewTrip, TripRepository};
pub use users::UserRepository;

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database file and bootstrap the schema.
    ///
    /// SQLite replays any leftover WAL on open, so an unclean shutdown needs
    /// no extra recovery step. Call [`Database::close`] on graceful shutdown
    /// to checkpoint the WAL into the main file.
    pub async fn new(db_path: &Path) -> Result<Self> {
        info!("Initializing database at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let connection_string = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        debug!("Database connection established");

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run the bootstrap script. Every statement is `IF NOT EXISTS`, so this
    /// is safe on every start.
    async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::raw_sql(include_str!("../../migrations/001_initial.sql"))
            .execute(&self.pool)
            .await
            .context("Failed to execute migration 001_initial.sql")?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Flush the WAL to disk
    pub async fn flush_wal(&self) -> Result<()> {
        info!("Flushing WAL to disk");

        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
            .context("Failed to flush WAL")?;

        debug!("WAL flushed successfully");
        Ok(())
    }

    /// Flush the WAL and close all connections in the pool.
    pub async fn close(self) -> Result<()> {
        info!("Closing database connection");

        self.flush_wal().await?;
        self.pool.close().await;

        info!("Database connection closed");
        Ok(())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn events(&self) -> EventRepository {
        EventRepository::new(self.pool.clone())
    }

    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone())
    }

    pub fn shopping(&self) -> ShoppingRepository {
        ShoppingRepository::new(self.pool.clone())
    }

    pub fn health(&self) -> HealthRepository {
        HealthRepository::new(self.pool.clone())
    }

    pub fn notes(&self) -> NoteRepository {
        NoteRepository::new(self.pool.clone())
    }

    pub fn trips(&self) -> TripRepository {
        TripRepository::new(self.pool.clone())
    }

    pub fn journal(&self) -> JournalRepository {
        JournalRepository::new(self.pool.clone())
    }
}

/// Storage representation of a timestamp
pub(crate) fn to_millis(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

/// Inverse of [`to_millis`]; out-of-range values collapse to the epoch
pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// `dt` cut to the precision the columns keep, so a returned record equals
/// the one read back later
pub(crate) fn stored(dt: DateTime<Utc>) -> DateTime<Utc> {
    from_millis(to_millis(dt))
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Tags are kept as a JSON array in a TEXT column
pub(crate) fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn decode_tags(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

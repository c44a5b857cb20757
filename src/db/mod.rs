use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use sqlx::{migrate::MigrateDatabase, sqlite::{SqlitePool, SqlitePoolOptions}, Sqlite, Row};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::ledger::{decode_entry, encode_entry, ledger_key, VoteLedger};

const CLIENT_TOKEN_KEY: &str = "client_token";

// Key/value storage local to this client, backing the vote ledger
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self, LedgerError> {
        let in_memory = db_url.contains(":memory:");

        // Create database if it doesn't exist
        if !in_memory && !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating ledger database at {}", db_url);
            Sqlite::create_database(db_url).await?;
        }

        // Every connection to an in-memory database is a separate database
        let mut options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            options = options.idle_timeout(None).max_lifetime(None);
        }
        let pool = options.connect(db_url).await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    // Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn get_item(&self, key: &str) -> Result<Option<String>, LedgerError> {
        let row = sqlx::query("SELECT value FROM local_storage WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get::<String, _>("value")))
    }

    pub async fn set_item(&self, key: &str, value: &str) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO local_storage (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key)
            DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Unauthenticated identity of this client, created on first use.
    pub async fn client_token(&self) -> Result<String, LedgerError> {
        if let Some(token) = self.get_item(CLIENT_TOKEN_KEY).await? {
            return Ok(token);
        }
        let token = Uuid::new_v4().to_string();
        self.set_item(CLIENT_TOKEN_KEY, &token).await?;
        Ok(token)
    }
}

#[async_trait]
impl VoteLedger for Database {
    async fn get(&self, poll_id: &str) -> Vec<String> {
        let key = ledger_key(poll_id);
        match self.get_item(&key).await {
            Ok(Some(raw)) => decode_entry(&key, &raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read ledger entry {}: {}", key, e);
                Vec::new()
            }
        }
    }

    async fn set(&self, poll_id: &str, option_ids: &[String]) -> Result<(), LedgerError> {
        let encoded = encode_entry(option_ids)?;
        self.set_item(&ledger_key(poll_id), &encoded).await
    }
}

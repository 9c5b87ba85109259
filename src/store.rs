//! Key/value persistence for feed watermarks and counters.
//!
//! Values are strings; integer helpers live on the trait so every caller
//! parses the same way. A stored `0` watermark means "unset".

use std::collections::HashMap;

use anyhow::{Context as _, Result};
use parking_lot::Mutex;

#[async_trait::async_trait]
pub trait CursorStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Reads a watermark. Absent and `0` are both unset, anything non-numeric is an error.
    async fn watermark(&self, key: &str) -> Result<Option<u64>> {
        let Some(raw) = self.get(key).await? else { return Ok(None) };
        let value = raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("Stored watermark for {key} is not an integer: {raw:?}"))?;

        Ok((value != 0).then_some(value))
    }

    async fn set_watermark(&self, key: &str, value: u64) -> Result<()> {
        self.set(key, &value.to_string()).await
    }

    /// Increments a counter, starting from `default` if unset, and returns the new value.
    async fn increment(&self, key: &str, default: u64) -> Result<u64> {
        let current = match self.get(key).await? {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!("Counter {key} held {raw:?}, restarting from {default}");
                default
            }),
            None => default,
        };

        let next = current + 1;
        self.set(key, &next.to_string()).await?;
        Ok(next)
    }
}

/// The production store, one row per key in `key_value_store`.
pub struct PgStore {
    pool: sqlx::PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Could not connect to the database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS migration_log (
                id SERIAL PRIMARY KEY,
                migration_name TEXT NOT NULL,
                applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&self.pool)
        .await?;

        for &(name, statement) in MIGRATIONS {
            let applied: Option<i32> = sqlx::query_scalar("SELECT 1 FROM migration_log WHERE migration_name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

            if applied.is_some() {
                tracing::debug!("Migration {name} already applied.");
                continue;
            }

            tracing::info!("Applying migration {name}...");
            let mut transaction = self.pool.begin().await?;
            sqlx::query(statement).execute(&mut transaction).await?;
            sqlx::query("INSERT INTO migration_log (migration_name) VALUES ($1)")
                .bind(name)
                .execute(&mut transaction)
                .await?;
            transaction.commit().await?;
        }

        Ok(())
    }
}

const MIGRATIONS: &[(&str, &str)] = &[(
    "create_key_value_table",
    "CREATE TABLE IF NOT EXISTS key_value_store (key TEXT PRIMARY KEY, value TEXT)",
)];

#[async_trait::async_trait]
impl CursorStore for PgStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<Option<String>> = sqlx::query_scalar("SELECT value FROM key_value_store WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value.flatten())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO key_value_store (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Process-local store, used by tests.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn with(pairs: &[(&str, &str)]) -> Self {
        Self {
            values: Mutex::new(pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()),
        }
    }

    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }
}

#[async_trait::async_trait]
impl CursorStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

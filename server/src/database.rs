use sqlx::SqlitePool;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database operation failed: {0}")]
    QueryFailed(#[from] sqlx::Error),
}

/// Partition of the cache namespace. Each kind has its own TTL and rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Current,
    Forecast,
}

impl CacheKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Current => "current",
            CacheKind::Forecast => "forecast",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CacheEntry {
    pub kind: String,
    pub city: String,
    pub payload: String,
    /// Epoch milliseconds.
    pub stored_at: i64,
}

/// Canonical form used for cache keys and favorite identity.
pub fn normalize_city(city: &str) -> String {
    city.trim().to_lowercase()
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_tables(&self) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache (
                kind TEXT NOT NULL,
                city TEXT NOT NULL,
                payload TEXT NOT NULL,
                stored_at INTEGER NOT NULL,
                PRIMARY KEY (kind, city)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS favorites (
                city_key TEXT PRIMARY KEY,
                city TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // Cache entries
    pub async fn get_cache_entry(
        &self,
        kind: CacheKind,
        city: &str,
    ) -> Result<Option<CacheEntry>, DatabaseError> {
        let entry = sqlx::query_as::<_, CacheEntry>(
            "SELECT kind, city, payload, stored_at FROM cache WHERE kind = ? AND city = ?",
        )
        .bind(kind.as_str())
        .bind(normalize_city(city))
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    pub async fn put_cache_entry(
        &self,
        kind: CacheKind,
        city: &str,
        payload: &str,
        stored_at: i64,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO cache (kind, city, payload, stored_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (kind, city) DO UPDATE SET
                payload = excluded.payload,
                stored_at = excluded.stored_at
            "#,
        )
        .bind(kind.as_str())
        .bind(normalize_city(city))
        .bind(payload)
        .bind(stored_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // Favorites
    pub async fn list_favorites(&self) -> Result<Vec<String>, DatabaseError> {
        let cities = sqlx::query_scalar::<_, String>("SELECT city FROM favorites ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        Ok(cities)
    }

    /// Adding a city already present (in any casing) keeps the original row.
    pub async fn add_favorite(&self, city: &str) -> Result<(), DatabaseError> {
        sqlx::query("INSERT OR IGNORE INTO favorites (city_key, city) VALUES (?, ?)")
            .bind(normalize_city(city))
            .bind(city.trim())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn remove_favorite(&self, city: &str) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM favorites WHERE city_key = ?")
            .bind(normalize_city(city))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
impl Database {
    /// Single-connection in-memory store; every pooled connection to
    /// `sqlite::memory:` would otherwise see its own empty database.
    pub async fn in_memory() -> Self {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let database = Self::new(pool);
        database.init_tables().await.unwrap();
        database
    }
}

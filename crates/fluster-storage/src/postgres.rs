use async_trait::async_trait;
use fluster_core::error::{Result, StorageError};
use fluster_core::{Repository, ShortCode};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

/// Connection settings for [`PostgresRepository::connect`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct PostgresSettings {
    #[builder(setter(into))]
    host: String,
    #[builder(default = 5432)]
    port: u16,
    #[builder(setter(into))]
    user: String,
    #[builder(setter(into))]
    password: String,
    #[builder(setter(into))]
    database: String,
    #[builder(default = PgSslMode::Require)]
    ssl_mode: PgSslMode,
    #[builder(default = 5)]
    max_connections: u32,
    #[builder(default = Duration::from_secs(5))]
    acquire_timeout: Duration,
}

impl PostgresSettings {
    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .ssl_mode(self.ssl_mode)
    }
}

/// PostgreSQL implementation of the repository contract.
///
/// Backed by a single `urls(id, url, encode)` table. `id` is a `BIGSERIAL`,
/// so key assignment is left to the database sequence and needs no locking
/// here. `encode` is unique and written at most once per row.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a repository from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a new connection pool with the given settings.
    pub async fn connect(settings: &PostgresSettings) -> Result<Self> {
        info!(
            host = %settings.host,
            port = settings.port,
            database = %settings.database,
            "connecting to postgres"
        );

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(settings.connect_options())
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Query(format!("migration failed: {e}")))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn insert(&self, original_url: &str) -> Result<u64> {
        let row = sqlx::query("INSERT INTO urls (url) VALUES ($1) RETURNING id")
            .bind(original_url)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
        u64::try_from(id)
            .map_err(|_| StorageError::InvalidData(format!("database returned key {id}")))
    }

    async fn attach_short_code(&self, key: u64, code: &ShortCode) -> Result<()> {
        let Ok(id) = i64::try_from(key) else {
            return Err(StorageError::MissingRecord(key));
        };

        let result = sqlx::query(
            r#"
            UPDATE urls
            SET encode = $1
            WHERE id = $2
              AND (encode IS NULL OR encode = $1)
            "#,
        )
        .bind(code.as_str())
        .bind(id)
        .execute(&self.pool)
        .await;

        let affected = match result {
            Ok(done) => done.rows_affected(),
            Err(err) if is_unique_violation(&err) => {
                return Err(StorageError::Conflict(code.to_string()))
            }
            Err(err) => return Err(map_sqlx_error(err)),
        };

        if affected > 0 {
            return Ok(());
        }

        // Nothing updated: either the row is gone or it already carries another code.
        let exists = sqlx::query("SELECT 1 FROM urls WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();

        if exists {
            Err(StorageError::Conflict(code.to_string()))
        } else {
            Err(StorageError::MissingRecord(key))
        }
    }

    async fn resolve(&self, code: &ShortCode) -> Result<String> {
        let row = sqlx::query("SELECT url FROM urls WHERE encode = $1 LIMIT 1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            debug!(code = %code, "short code not found");
            return Err(StorageError::NotFound(code.to_string()));
        };

        let url: Option<String> = row.try_get("url").map_err(map_sqlx_error)?;
        match url {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(StorageError::NotFound(code.to_string())),
        }
    }

    async fn discard(&self, key: u64) -> Result<bool> {
        let Ok(id) = i64::try_from(key) else {
            return Ok(false);
        };

        let result = sqlx::query("DELETE FROM urls WHERE id = $1 AND encode IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

use async_trait::async_trait;
use burrow_core::error::Result;
use burrow_core::{
    AddValue, DeletionRequest, InternalStats, ShortCode, Store, StoreError, UserUrl,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{debug, warn};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS shortener (
        id serial PRIMARY KEY,
        short varchar(128),
        original TEXT,
        user_id varchar(128) NOT NULL,
        is_deleted BOOLEAN NOT NULL
    )
"#;

/// Name of the unique index on `original`.
const ORIGINAL_INDEX: &str = "url_id";
const CREATE_ORIGINAL_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS url_id ON shortener (original)";

/// Name of the unique index on `short`.
const SHORT_INDEX: &str = "short_id";
const CREATE_SHORT_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS short_id ON shortener (short)";

/// PostgreSQL implementation of the store contract.
///
/// Soft delete is implemented with `is_deleted`. The unique index on
/// `original` turns a second insert of the same URL into
/// [`StoreError::Conflict`], reported with the short URL of the row that
/// already exists.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store from an existing connection pool.
    ///
    /// The schema is not touched; call [`bootstrap`](Self::bootstrap) when
    /// it may be missing.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool for `dsn` and bootstraps the schema.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .connect(dsn)
            .await
            .map_err(|e| StoreError::Bootstrap(format!("cannot connect to database: {e}")))?;

        let store = Self::new(pool);
        store.bootstrap().await?;
        Ok(store)
    }

    /// Creates the `shortener` table and its indexes if they do not exist.
    ///
    /// Failures of the individual DDL statements are logged and ignored;
    /// only failing to open or commit the transaction is an error.
    pub async fn bootstrap(&self) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Bootstrap(e.to_string()))?;

        for statement in [CREATE_TABLE, CREATE_ORIGINAL_INDEX, CREATE_SHORT_INDEX] {
            if let Err(err) = sqlx::query(statement).execute(&mut *tx).await {
                warn!(error = %err, "bootstrap statement failed");
            }
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Bootstrap(e.to_string()))
    }

    async fn find_short_code(&self, original_url: &str) -> Result<ShortCode> {
        let row = sqlx::query("SELECT short FROM shortener WHERE original = $1")
            .bind(original_url)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let short: String = row.try_get("short").map_err(map_sqlx_error)?;
        Ok(ShortCode::new_unchecked(short))
    }
}

/// Returns the name of the unique index `err` violated, if any.
fn violated_unique_index(err: &sqlx::Error) -> Option<Option<String>> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }
    Some(db_err.constraint().map(str::to_owned))
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn get_original_url(&self, code: &ShortCode) -> Result<String> {
        let row = sqlx::query("SELECT original, is_deleted FROM shortener WHERE short = $1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Err(StoreError::NotFound(code.to_string()));
        };

        let deleted: bool = row.try_get("is_deleted").map_err(map_sqlx_error)?;
        if deleted {
            return Err(StoreError::Gone(code.to_string()));
        }

        row.try_get("original").map_err(map_sqlx_error)
    }

    async fn add_value(&self, params: AddValue) -> Result<String> {
        if params.original_url.is_empty() {
            return Err(StoreError::EmptyOriginalUrl);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO shortener (short, original, user_id, is_deleted)
            VALUES ($1, $2, $3, FALSE)
            "#,
        )
        .bind(params.short_code.as_str())
        .bind(&params.original_url)
        .bind(&params.owner_id)
        .execute(&self.pool)
        .await;

        let err = match result {
            Ok(_) => {
                debug!(code = %params.short_code, "inserted url");
                return Ok(params.short_code.to_url(&params.base_url));
            }
            Err(err) => err,
        };

        match violated_unique_index(&err) {
            Some(Some(index)) if index == SHORT_INDEX => Err(StoreError::DuplicateShortCode(
                params.short_code.into_string(),
            )),
            Some(index) => {
                debug!(index = ?index.as_deref().unwrap_or(ORIGINAL_INDEX), "original url already shortened");
                let existing = self.find_short_code(&params.original_url).await?;
                Err(StoreError::Conflict {
                    short_url: existing.to_url(&params.base_url),
                })
            }
            None => Err(map_sqlx_error(err)),
        }
    }

    async fn get_user_urls(&self, owner_id: &str, base_url: &str) -> Result<Vec<UserUrl>> {
        let rows = sqlx::query(
            "SELECT short, original FROM shortener WHERE user_id = $1 ORDER BY id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                let short: String = row.try_get("short").map_err(map_sqlx_error)?;
                let original_url: String = row.try_get("original").map_err(map_sqlx_error)?;
                Ok(UserUrl {
                    short_url: ShortCode::new_unchecked(short).to_url(base_url),
                    original_url,
                })
            })
            .collect()
    }

    async fn delete_urls(&self, batch: &[DeletionRequest]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let mut deleted = 0;

        for request in batch {
            let codes: Vec<String> = request
                .short_codes
                .iter()
                .map(|code| code.as_str().to_owned())
                .collect();

            // dropping `tx` on error rolls the whole batch back
            let result = sqlx::query(
                r#"
                UPDATE shortener
                SET is_deleted = TRUE
                WHERE user_id = $1
                  AND short = ANY($2)
                  AND is_deleted = FALSE
                "#,
            )
            .bind(&request.owner_id)
            .bind(&codes)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

            deleted += result.rows_affected();
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(deleted, "soft-deleted urls");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get_internal_stats(&self) -> Result<InternalStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS urls, COUNT(DISTINCT user_id) AS users FROM shortener",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let urls: i64 = row.try_get("urls").map_err(map_sqlx_error)?;
        let users: i64 = row.try_get("users").map_err(map_sqlx_error)?;

        Ok(InternalStats {
            urls: urls.max(0) as u64,
            users: users.max(0) as u64,
        })
    }
}

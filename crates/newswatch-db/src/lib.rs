//! PostgreSQL persistence layer for newswatch.
//!
//! Provides the connection pool, schema migrations, and the concrete
//! repository implementations behind the traits in `newswatch-core`.

pub mod digest_jobs;
pub mod news_items;
pub mod pool;

use std::sync::Arc;

use sqlx::PgPool;

use newswatch_core::{DigestJobRepository, Error, NewsItemRepository, Result};

pub use digest_jobs::PgDigestJobRepository;
pub use news_items::PgNewsItemRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

/// Escape LIKE/ILIKE metacharacters in user input, for use with
/// `ESCAPE '\'` patterns.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Bundle of the connection pool and repository handles.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    pub news_items: Arc<dyn NewsItemRepository>,
    pub digest_jobs: Arc<dyn DigestJobRepository>,
}

impl Database {
    /// Connect to PostgreSQL and run pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::Internal(format!("migration failed: {e}")))?;
        Ok(Self::from_pool(pool))
    }

    /// Build repositories over an existing pool. Does not migrate.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            news_items: Arc::new(PgNewsItemRepository::new(pool.clone())),
            digest_jobs: Arc::new(PgDigestJobRepository::new(pool.clone())),
            pool,
        }
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

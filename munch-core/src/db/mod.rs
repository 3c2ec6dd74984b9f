// munch-core/src/db/mod.rs

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::info;
use crate::Error;

/// Waiting longer than this for a pooled connection counts as a transient
/// fault (`PoolTimedOut`) and goes through the retry policy.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle to the ledger's Postgres pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<Postgres>,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await?;

        info!(max_connections, "Connected to Postgres");
        Ok(Self { pool })
    }

    /// Applies `migrations/` (points, ledger entries, rewards, coupons).
    pub async fn migrate(&self) -> Result<(), Error> {
        info!("Applying ledger migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Ledger migrations applied.");
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Waits for checked-out connections to be returned, then closes them.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Postgres pool closed.");
    }
}

//! munch-server/src/context.rs
//!
//! Defines the main "global" context (ServerContext) for the HTTP server.

use tracing::info;
use munch_core::db::Database;
use munch_core::{Error, Repositories, RewardServices};

use crate::{Args, Storage};

/// Everything the server holds on to while it runs.
pub struct ServerContext {
    /// `None` when running on the in-memory backend.
    pub db: Option<Database>,
    pub services: RewardServices,
}

impl ServerContext {
    /// Connects storage, runs migrations and wires the services.
    pub async fn new(args: &Args) -> Result<Self, Error> {
        let config = args.ledger_config();

        match args.storage {
            Storage::Memory => {
                info!("Using in-memory storage; balances and coupons are not persisted.");
                Ok(Self {
                    db: None,
                    services: RewardServices::in_memory(&config),
                })
            }
            Storage::Postgres => {
                let db = Database::new(&args.db_url, args.max_connections).await?;
                db.migrate().await?;
                let services = RewardServices::new(Repositories::postgres(&db), &config);
                Ok(Self { db: Some(db), services })
            }
        }
    }
}

//! munch-core/src/context.rs
//!
//! Wires repositories into the service graph
//! (RewardCatalog -> AccountLedger -> CouponStore -> checkout / games).

use std::sync::Arc;

use munch_common::traits::repository_traits::{
    AccountRepository, CartStore, CouponRepository, RewardTierRepository,
};

use crate::config::LedgerConfig;
use crate::db::Database;
use crate::repositories::memory::{
    MemoryAccountRepository, MemoryCartStore, MemoryCouponRepository, MemoryRewardTierRepository,
};
use crate::repositories::postgres::{
    PostgresAccountRepository, PostgresCouponRepository, PostgresRewardTierRepository,
};
use crate::services::{AccountLedger, CheckoutService, CouponStore, GameRewards, RewardCatalog};

/// Storage backends the services run on.
pub struct Repositories {
    pub accounts: Arc<dyn AccountRepository + Send + Sync>,
    pub tiers: Arc<dyn RewardTierRepository + Send + Sync>,
    pub coupons: Arc<dyn CouponRepository + Send + Sync>,
    pub carts: Arc<dyn CartStore + Send + Sync>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            accounts: Arc::new(MemoryAccountRepository::new()),
            tiers: Arc::new(MemoryRewardTierRepository::new()),
            coupons: Arc::new(MemoryCouponRepository::new()),
            carts: Arc::new(MemoryCartStore::new()),
        }
    }

    /// Postgres for the ledger tables; carts stay in the session store.
    pub fn postgres(db: &Database) -> Self {
        let pool = db.pool().clone();
        Self {
            accounts: Arc::new(PostgresAccountRepository::new(pool.clone())),
            tiers: Arc::new(PostgresRewardTierRepository::new(pool.clone())),
            coupons: Arc::new(PostgresCouponRepository::new(pool)),
            carts: Arc::new(MemoryCartStore::new()),
        }
    }
}

#[derive(Clone)]
pub struct RewardServices {
    pub ledger: Arc<AccountLedger>,
    pub catalog: Arc<RewardCatalog>,
    pub coupons: Arc<CouponStore>,
    pub checkout: Arc<CheckoutService>,
    pub games: Arc<GameRewards>,
}

impl RewardServices {
    pub fn new(repos: Repositories, config: &LedgerConfig) -> Self {
        let catalog = Arc::new(RewardCatalog::new(repos.tiers, config.retry.clone()));
        let ledger = Arc::new(AccountLedger::new(repos.accounts, config.retry.clone()));
        let coupons = Arc::new(CouponStore::new(
            repos.coupons,
            catalog.clone(),
            ledger.clone(),
            config.retry.clone(),
        ));
        let checkout = Arc::new(CheckoutService::new(
            ledger.clone(),
            coupons.clone(),
            repos.carts,
            config.checkout.clone(),
        ));
        let games = Arc::new(GameRewards::new(ledger.clone(), config.game.clone()));

        Self { ledger, catalog, coupons, checkout, games }
    }

    pub fn in_memory(config: &LedgerConfig) -> Self {
        Self::new(Repositories::in_memory(), config)
    }
}

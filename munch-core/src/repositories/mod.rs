// src/repositories/mod.rs

pub use munch_common::traits::repository_traits::{
    AccountRepository,
    CartStore,
    CouponDeleteOutcome,
    CouponRepository,
    RewardTierRepository,
};

pub use postgres::{
    PostgresAccountRepository,
    PostgresCouponRepository,
    PostgresRewardTierRepository,
};
pub use memory::{
    MemoryAccountRepository,
    MemoryCartStore,
    MemoryCouponRepository,
    MemoryRewardTierRepository,
};

pub mod postgres;
pub mod memory;

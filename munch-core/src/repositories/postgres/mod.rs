// src/repositories/postgres/mod.rs

pub mod account;
pub mod reward_tiers;
pub mod coupons;

pub use account::PostgresAccountRepository;
pub use reward_tiers::PostgresRewardTierRepository;
pub use coupons::PostgresCouponRepository;

// src/repositories/memory/mod.rs
//
// In-process backends. Used by the standalone server mode and the test
// suites; they honour the same atomicity contracts as the Postgres ones.

pub mod account;
pub mod reward_tiers;
pub mod coupons;
pub mod cart;

pub use account::MemoryAccountRepository;
pub use reward_tiers::MemoryRewardTierRepository;
pub use coupons::MemoryCouponRepository;
pub use cart::MemoryCartStore;

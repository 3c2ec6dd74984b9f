// File: munch-common/src/models/mod.rs
pub mod account;
pub mod reward;
pub mod coupon;
pub mod cart;

pub use account::{Account, LedgerEntry};
pub use reward::{NewRewardTier, RewardTier};
pub use coupon::{AppliedCoupon, Coupon};
pub use cart::{Cart, CartItem};

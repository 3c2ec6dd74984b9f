
// File: src/services/mod.rs

pub mod ledger_service;
pub mod reward_catalog;
pub mod coupon_service;
pub mod checkout_service;
pub mod game_service;

pub use ledger_service::AccountLedger;
pub use reward_catalog::RewardCatalog;
pub use coupon_service::{CouponStore, Redemption};
pub use checkout_service::{CheckoutQuote, CheckoutReceipt, CheckoutService};
pub use game_service::{GameAward, GameRewards};

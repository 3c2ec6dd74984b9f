pub mod repository_traits;

pub use repository_traits::{
    AccountRepository, CartStore, CouponDeleteOutcome, CouponRepository, RewardTierRepository,
};

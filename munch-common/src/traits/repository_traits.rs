use async_trait::async_trait;
use uuid::Uuid;
use crate::error::Error;
use crate::models::{Account, Cart, Coupon, LedgerEntry, RewardTier};

/// Storage primitives for point balances.
///
/// Every mutation is a single atomic step on the backend and is keyed by a
/// `reference`. Replaying a reference that was already applied for the
/// user must not touch the balance again; it returns the original entry.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn get_account(&self, user_id: Uuid) -> Result<Option<Account>, Error>;

    /// Atomic increment, creating the account at zero if needed.
    async fn apply_credit(
        &self,
        user_id: Uuid,
        amount: i64,
        reference: &str,
    ) -> Result<LedgerEntry, Error>;

    /// Guarded decrement. Fails with `Error::InsufficientPoints` (and
    /// records nothing) if the balance is below `amount`.
    async fn apply_debit(
        &self,
        user_id: Uuid,
        amount: i64,
        reference: &str,
    ) -> Result<LedgerEntry, Error>;

    async fn find_entry(&self, user_id: Uuid, reference: &str) -> Result<Option<LedgerEntry>, Error>;

    /// Newest first.
    async fn list_entries(&self, user_id: Uuid, limit: i64) -> Result<Vec<LedgerEntry>, Error>;
}

#[async_trait]
pub trait RewardTierRepository: Send + Sync {
    async fn create_tier(&self, tier: &RewardTier) -> Result<(), Error>;
    async fn get_tier(&self, tier_id: Uuid) -> Result<Option<RewardTier>, Error>;
    /// Ascending by points_required, then tier_id.
    async fn list_tiers(&self) -> Result<Vec<RewardTier>, Error>;
    /// Returns false if no such tier existed.
    async fn delete_tier(&self, tier_id: Uuid) -> Result<bool, Error>;
}

/// Outcome of a conditional delete, used to report the precise rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponDeleteOutcome {
    Deleted,
    Missing,
    NotOwner,
    AlreadyUsed,
}

#[async_trait]
pub trait CouponRepository: Send + Sync {
    /// Idempotent on `coupon_id`: inserting the same id twice is a no-op.
    async fn insert_coupon(&self, coupon: &Coupon) -> Result<(), Error>;
    async fn get_coupon(&self, coupon_id: Uuid) -> Result<Option<Coupon>, Error>;
    /// Newest first.
    async fn list_coupons_for_user(&self, user_id: Uuid) -> Result<Vec<Coupon>, Error>;
    /// User's coupons whose display code equals `code` (already normalized).
    async fn find_by_code(&self, user_id: Uuid, code: &str) -> Result<Vec<Coupon>, Error>;
    /// Sets `used_at` and `used_by_order` only if the coupon is still
    /// unused. Returns the updated coupon, or `None` if nothing matched the
    /// condition.
    async fn mark_used(&self, coupon_id: Uuid, order_id: Uuid) -> Result<Option<Coupon>, Error>;
    /// Deletes only if owned by `user_id` and unused.
    async fn delete_unused(&self, coupon_id: Uuid, user_id: Uuid) -> Result<CouponDeleteOutcome, Error>;
}

/// Key-value persistence for session carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Cart, Error>;
    async fn save(&self, session_id: &str, cart: &Cart) -> Result<(), Error>;
    async fn clear(&self, session_id: &str) -> Result<(), Error>;
}

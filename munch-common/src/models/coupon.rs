// File: munch-common/src/models/coupon.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::reward::RewardTier;

/// Length of the human-facing coupon code.
pub const COUPON_CODE_LEN: usize = 12;

/// A single-use discount owned by one user.
///
/// The discount is copied from the tier when the coupon is issued, so
/// later edits or deletion of the tier never change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Coupon {
    pub coupon_id: Uuid,
    pub user_id: Uuid,
    /// The tier it was redeemed from. Informational only; may point to a
    /// tier that no longer exists.
    pub tier_id: Option<Uuid>,
    pub discount_percentage: i32,
    pub issued_at: DateTime<Utc>,
    /// `None` while the coupon is active. Set exactly once.
    pub used_at: Option<DateTime<Utc>>,
    /// The order that consumed the coupon; set together with `used_at`.
    pub used_by_order: Option<Uuid>,
}

impl Coupon {
    pub fn issue(coupon_id: Uuid, user_id: Uuid, tier: &RewardTier) -> Self {
        Self {
            coupon_id,
            user_id,
            tier_id: Some(tier.tier_id),
            discount_percentage: tier.discount_percentage,
            issued_at: Utc::now(),
            used_at: None,
            used_by_order: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.used_at.is_none()
    }

    /// True if `order_id` is the order that consumed this coupon.
    pub fn used_by(&self, order_id: Uuid) -> bool {
        self.used_by_order == Some(order_id)
    }

    /// Display code. Not unique by construction; `coupon_id` is authoritative.
    pub fn code(&self) -> String {
        code_for(self.coupon_id)
    }
}

pub fn code_for(coupon_id: Uuid) -> String {
    coupon_id
        .hyphenated()
        .to_string()
        .chars()
        .take(COUPON_CODE_LEN)
        .collect::<String>()
        .to_uppercase()
}

/// Normalizes user-typed codes for comparison with [`code_for`].
pub fn normalize_code(input: &str) -> String {
    input.trim().to_uppercase()
}

/// What checkout receives after validating a coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub coupon_id: Uuid,
    pub code: String,
    pub discount_percentage: i32,
}

impl From<&Coupon> for AppliedCoupon {
    fn from(c: &Coupon) -> Self {
        Self {
            coupon_id: c.coupon_id,
            code: c.code(),
            discount_percentage: c.discount_percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_uppercased_prefix_of_id() {
        let id = Uuid::parse_str("3f2a1b4c-9d8e-4f00-a1b2-c3d4e5f60718").unwrap();
        assert_eq!(code_for(id), "3F2A1B4C-9D8");
        assert_eq!(code_for(id).len(), COUPON_CODE_LEN);
    }

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(normalize_code("  3f2a1b4c-9d8 "), "3F2A1B4C-9D8");
    }
}

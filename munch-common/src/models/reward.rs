// File: munch-common/src/models/reward.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_DISCOUNT_PERCENTAGE: i32 = 1;
pub const MAX_DISCOUNT_PERCENTAGE: i32 = 100;

/// A reward purchasable with points, yielding a discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RewardTier {
    pub tier_id: Uuid,
    pub discount_percentage: i32,
    pub points_required: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Admin input for a new tier, validated by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRewardTier {
    pub discount_percentage: i32,
    pub points_required: i64,
    pub description: String,
}

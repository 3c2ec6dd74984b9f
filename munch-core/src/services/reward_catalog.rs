use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use munch_common::models::reward::{MAX_DISCOUNT_PERCENTAGE, MIN_DISCOUNT_PERCENTAGE};
use munch_common::models::{NewRewardTier, RewardTier};
use munch_common::traits::repository_traits::RewardTierRepository;

use crate::config::RetryConfig;
use crate::retry::with_retry;
use crate::Error;

/// Admin-managed reward tiers. Plain CRUD plus validation.
pub struct RewardCatalog {
    repo: Arc<dyn RewardTierRepository + Send + Sync>,
    retry: RetryConfig,
}

impl RewardCatalog {
    pub fn new(repo: Arc<dyn RewardTierRepository + Send + Sync>, retry: RetryConfig) -> Self {
        Self { repo, retry }
    }

    /// Cheapest first; ties broken by tier id.
    pub async fn list(&self) -> Result<Vec<RewardTier>, Error> {
        with_retry(&self.retry, "list_tiers", || self.repo.list_tiers()).await
    }

    pub async fn get(&self, tier_id: Uuid) -> Result<RewardTier, Error> {
        with_retry(&self.retry, "get_tier", || self.repo.get_tier(tier_id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("Reward tier {tier_id}")))
    }

    pub async fn create(
        &self,
        discount_percentage: i32,
        points_required: i64,
        description: &str,
    ) -> Result<RewardTier, Error> {
        let input = NewRewardTier {
            discount_percentage,
            points_required,
            description: description.to_string(),
        };
        validate(&input)?;

        let tier = RewardTier {
            tier_id: Uuid::new_v4(),
            discount_percentage,
            points_required,
            description: input.description.trim().to_string(),
            created_at: Utc::now(),
        };
        // Insert is keyed by the fresh tier_id; a retried attempt cannot
        // produce a second row with a different id.
        with_retry(&self.retry, "create_tier", || self.repo.create_tier(&tier)).await?;

        info!(tier_id = %tier.tier_id, discount_percentage, points_required, "reward tier created");
        Ok(tier)
    }

    /// Coupons already issued from the tier keep their captured discount.
    pub async fn delete(&self, tier_id: Uuid) -> Result<(), Error> {
        let existed = with_retry(&self.retry, "delete_tier", || self.repo.delete_tier(tier_id)).await?;
        if !existed {
            return Err(Error::NotFound(format!("Reward tier {tier_id}")));
        }
        info!(%tier_id, "reward tier deleted");
        Ok(())
    }
}

pub fn validate(input: &NewRewardTier) -> Result<(), Error> {
    if !(MIN_DISCOUNT_PERCENTAGE..=MAX_DISCOUNT_PERCENTAGE).contains(&input.discount_percentage) {
        return Err(Error::InvalidInput(format!(
            "discount_percentage must be between {MIN_DISCOUNT_PERCENTAGE} and {MAX_DISCOUNT_PERCENTAGE}, got {}",
            input.discount_percentage
        )));
    }
    if input.points_required <= 0 {
        return Err(Error::InvalidInput(format!(
            "points_required must be positive, got {}",
            input.points_required
        )));
    }
    if input.description.trim().is_empty() {
        return Err(Error::InvalidInput("description must not be empty".into()));
    }
    Ok(())
}

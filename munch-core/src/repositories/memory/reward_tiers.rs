// File: munch-core/src/repositories/memory/reward_tiers.rs

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;
use munch_common::error::Error;
use munch_common::models::RewardTier;
use munch_common::traits::repository_traits::RewardTierRepository;

#[derive(Default)]
pub struct MemoryRewardTierRepository {
    tiers: DashMap<Uuid, RewardTier>,
}

impl MemoryRewardTierRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RewardTierRepository for MemoryRewardTierRepository {
    async fn create_tier(&self, tier: &RewardTier) -> Result<(), Error> {
        self.tiers.insert(tier.tier_id, tier.clone());
        Ok(())
    }

    async fn get_tier(&self, tier_id: Uuid) -> Result<Option<RewardTier>, Error> {
        Ok(self.tiers.get(&tier_id).map(|t| t.clone()))
    }

    async fn list_tiers(&self) -> Result<Vec<RewardTier>, Error> {
        let mut list: Vec<RewardTier> = self.tiers.iter().map(|t| t.value().clone()).collect();
        list.sort_by(|a, b| {
            a.points_required
                .cmp(&b.points_required)
                .then_with(|| a.tier_id.cmp(&b.tier_id))
        });
        Ok(list)
    }

    async fn delete_tier(&self, tier_id: Uuid) -> Result<bool, Error> {
        Ok(self.tiers.remove(&tier_id).is_some())
    }
}

// File: munch-core/src/repositories/postgres/reward_tiers.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;
use munch_common::error::Error;
use munch_common::models::RewardTier;
use munch_common::traits::repository_traits::RewardTierRepository;

pub struct PostgresRewardTierRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresRewardTierRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RewardTierRepository for PostgresRewardTierRepository {
    async fn create_tier(&self, tier: &RewardTier) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO rewards (
                tier_id,
                discount_percentage,
                points_required,
                description,
                created_at
            )
            VALUES ($1,$2,$3,$4,$5)
            ON CONFLICT (tier_id) DO NOTHING
            "#,
        )
            .bind(tier.tier_id)
            .bind(tier.discount_percentage)
            .bind(tier.points_required)
            .bind(&tier.description)
            .bind(tier.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_tier(&self, tier_id: Uuid) -> Result<Option<RewardTier>, Error> {
        let tier = sqlx::query_as::<_, RewardTier>(
            r#"
            SELECT tier_id, discount_percentage, points_required, description, created_at
            FROM rewards
            WHERE tier_id = $1
            "#,
        )
            .bind(tier_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tier)
    }

    async fn list_tiers(&self) -> Result<Vec<RewardTier>, Error> {
        let tiers = sqlx::query_as::<_, RewardTier>(
            r#"
            SELECT tier_id, discount_percentage, points_required, description, created_at
            FROM rewards
            ORDER BY points_required ASC, tier_id ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;
        Ok(tiers)
    }

    async fn delete_tier(&self, tier_id: Uuid) -> Result<bool, Error> {
        let res = sqlx::query("DELETE FROM rewards WHERE tier_id = $1")
            .bind(tier_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

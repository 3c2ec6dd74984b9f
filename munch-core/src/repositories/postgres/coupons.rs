// File: munch-core/src/repositories/postgres/coupons.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;
use munch_common::error::Error;
use munch_common::models::Coupon;
use munch_common::models::coupon::COUPON_CODE_LEN;
use munch_common::traits::repository_traits::{CouponDeleteOutcome, CouponRepository};

#[derive(Clone)]
pub struct PostgresCouponRepository {
    pool: Pool<Postgres>,
}

impl PostgresCouponRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CouponRepository for PostgresCouponRepository {
    async fn insert_coupon(&self, coupon: &Coupon) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO redeemed_coupons (
                coupon_id, user_id, tier_id, discount_percentage,
                issued_at, used_at, used_by_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (coupon_id) DO NOTHING
            "#,
        )
            .bind(coupon.coupon_id)
            .bind(coupon.user_id)
            .bind(coupon.tier_id)
            .bind(coupon.discount_percentage)
            .bind(coupon.issued_at)
            .bind(coupon.used_at)
            .bind(coupon.used_by_order)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_coupon(&self, coupon_id: Uuid) -> Result<Option<Coupon>, Error> {
        let coupon = sqlx::query_as::<_, Coupon>(
            r#"
            SELECT coupon_id, user_id, tier_id, discount_percentage, issued_at, used_at, used_by_order
            FROM redeemed_coupons
            WHERE coupon_id = $1
            "#,
        )
            .bind(coupon_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(coupon)
    }

    async fn list_coupons_for_user(&self, user_id: Uuid) -> Result<Vec<Coupon>, Error> {
        let coupons = sqlx::query_as::<_, Coupon>(
            r#"
            SELECT coupon_id, user_id, tier_id, discount_percentage, issued_at, used_at, used_by_order
            FROM redeemed_coupons
            WHERE user_id = $1
            ORDER BY issued_at DESC, coupon_id DESC
            "#,
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(coupons)
    }

    async fn find_by_code(&self, user_id: Uuid, code: &str) -> Result<Vec<Coupon>, Error> {
        let coupons = sqlx::query_as::<_, Coupon>(
            r#"
            SELECT coupon_id, user_id, tier_id, discount_percentage, issued_at, used_at, used_by_order
            FROM redeemed_coupons
            WHERE user_id = $1
              AND UPPER(LEFT(coupon_id::text, $2)) = $3
            ORDER BY issued_at DESC
            "#,
        )
            .bind(user_id)
            .bind(COUPON_CODE_LEN as i32)
            .bind(code)
            .fetch_all(&self.pool)
            .await?;
        Ok(coupons)
    }

    async fn mark_used(&self, coupon_id: Uuid, order_id: Uuid) -> Result<Option<Coupon>, Error> {
        // Conditional update: only the first caller flips used_at.
        let coupon = sqlx::query_as::<_, Coupon>(
            r#"
            UPDATE redeemed_coupons
            SET used_at = now(),
                used_by_order = $2
            WHERE coupon_id = $1
              AND used_at IS NULL
            RETURNING coupon_id, user_id, tier_id, discount_percentage, issued_at, used_at, used_by_order
            "#,
        )
            .bind(coupon_id)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(coupon)
    }

    async fn delete_unused(&self, coupon_id: Uuid, user_id: Uuid) -> Result<CouponDeleteOutcome, Error> {
        let res = sqlx::query(
            r#"
            DELETE FROM redeemed_coupons
            WHERE coupon_id = $1
              AND user_id = $2
              AND used_at IS NULL
            "#,
        )
            .bind(coupon_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() > 0 {
            return Ok(CouponDeleteOutcome::Deleted);
        }

        // Nothing deleted; work out why.
        Ok(match self.get_coupon(coupon_id).await? {
            None => CouponDeleteOutcome::Missing,
            Some(c) if c.user_id != user_id => CouponDeleteOutcome::NotOwner,
            Some(_) => CouponDeleteOutcome::AlreadyUsed,
        })
    }
}

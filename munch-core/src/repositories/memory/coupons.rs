// File: munch-core/src/repositories/memory/coupons.rs

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;
use munch_common::error::Error;
use munch_common::models::Coupon;
use munch_common::traits::repository_traits::{CouponDeleteOutcome, CouponRepository};

#[derive(Default)]
pub struct MemoryCouponRepository {
    coupons: DashMap<Uuid, Coupon>,
}

impl MemoryCouponRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(list: &mut [Coupon]) {
    list.sort_by(|a, b| {
        b.issued_at
            .cmp(&a.issued_at)
            .then_with(|| b.coupon_id.cmp(&a.coupon_id))
    });
}

#[async_trait]
impl CouponRepository for MemoryCouponRepository {
    async fn insert_coupon(&self, coupon: &Coupon) -> Result<(), Error> {
        self.coupons
            .entry(coupon.coupon_id)
            .or_insert_with(|| coupon.clone());
        Ok(())
    }

    async fn get_coupon(&self, coupon_id: Uuid) -> Result<Option<Coupon>, Error> {
        Ok(self.coupons.get(&coupon_id).map(|c| c.clone()))
    }

    async fn list_coupons_for_user(&self, user_id: Uuid) -> Result<Vec<Coupon>, Error> {
        let mut list: Vec<Coupon> = self
            .coupons
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.value().clone())
            .collect();
        newest_first(&mut list);
        Ok(list)
    }

    async fn find_by_code(&self, user_id: Uuid, code: &str) -> Result<Vec<Coupon>, Error> {
        let mut list: Vec<Coupon> = self
            .coupons
            .iter()
            .filter(|c| c.user_id == user_id && c.code() == code)
            .map(|c| c.value().clone())
            .collect();
        newest_first(&mut list);
        Ok(list)
    }

    async fn mark_used(&self, coupon_id: Uuid, order_id: Uuid) -> Result<Option<Coupon>, Error> {
        let Some(mut coupon) = self.coupons.get_mut(&coupon_id) else {
            return Ok(None);
        };
        if coupon.used_at.is_some() {
            return Ok(None);
        }
        coupon.used_at = Some(Utc::now());
        coupon.used_by_order = Some(order_id);
        Ok(Some(coupon.clone()))
    }

    async fn delete_unused(&self, coupon_id: Uuid, user_id: Uuid) -> Result<CouponDeleteOutcome, Error> {
        let removed = self
            .coupons
            .remove_if(&coupon_id, |_, c| c.user_id == user_id && c.used_at.is_none());
        if removed.is_some() {
            return Ok(CouponDeleteOutcome::Deleted);
        }
        Ok(match self.coupons.get(&coupon_id) {
            None => CouponDeleteOutcome::Missing,
            Some(c) if c.user_id != user_id => CouponDeleteOutcome::NotOwner,
            Some(_) => CouponDeleteOutcome::AlreadyUsed,
        })
    }
}

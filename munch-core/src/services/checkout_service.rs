use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use munch_common::models::{AppliedCoupon, Cart};
use munch_common::traits::repository_traits::CartStore;

use crate::config::CheckoutConfig;
use crate::services::coupon_service::CouponStore;
use crate::services::ledger_service::AccountLedger;
use crate::Error;

/// Price breakdown for a cart, all amounts in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutQuote {
    pub subtotal_cents: i64,
    pub taxes_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub coupon: Option<AppliedCoupon>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub quote: CheckoutQuote,
    pub points_earned: i64,
    pub balance: i64,
}

/// `value * numerator / denominator`, rounded half up. Inputs are non-negative.
fn scale_round(value: i64, numerator: i64, denominator: i64) -> i64 {
    let scaled = (i128::from(value) * i128::from(numerator) + i128::from(denominator) / 2)
        / i128::from(denominator);
    i64::try_from(scaled).unwrap_or(i64::MAX)
}

/// Taxes on the subtotal, then the coupon's percentage off the taxed amount.
pub fn price_cart(cart: &Cart, tax_rate_bps: u32, coupon: Option<AppliedCoupon>) -> CheckoutQuote {
    let subtotal_cents = cart.subtotal_cents();
    let taxes_cents = scale_round(subtotal_cents, i64::from(tax_rate_bps), 10_000);
    let gross = subtotal_cents + taxes_cents;
    let discount_cents = coupon
        .as_ref()
        .map(|c| scale_round(gross, i64::from(c.discount_percentage), 100))
        .unwrap_or(0);

    CheckoutQuote {
        subtotal_cents,
        taxes_cents,
        discount_cents,
        total_cents: gross - discount_cents,
        coupon,
    }
}

/// Glue between a finished order and the rewards ledger.
pub struct CheckoutService {
    ledger: Arc<AccountLedger>,
    coupons: Arc<CouponStore>,
    carts: Arc<dyn CartStore + Send + Sync>,
    config: CheckoutConfig,
}

impl CheckoutService {
    pub fn new(
        ledger: Arc<AccountLedger>,
        coupons: Arc<CouponStore>,
        carts: Arc<dyn CartStore + Send + Sync>,
        config: CheckoutConfig,
    ) -> Self {
        Self { ledger, coupons, carts, config }
    }

    pub fn carts(&self) -> &Arc<dyn CartStore + Send + Sync> {
        &self.carts
    }

    /// Preview only: validates the coupon but does not consume it.
    pub async fn quote(
        &self,
        user_id: Uuid,
        cart: &Cart,
        coupon_id: Option<Uuid>,
    ) -> Result<CheckoutQuote, Error> {
        if cart.is_empty() {
            return Err(Error::InvalidInput("cart is empty".into()));
        }
        let applied = match coupon_id {
            Some(id) => Some(self.coupons.apply(id, user_id).await?),
            None => None,
        };
        Ok(price_cart(cart, self.config.tax_rate_bps, applied))
    }

    /// Completes an order from the stored session cart.
    ///
    /// The coupon is committed for `order_id` before points are awarded.
    /// Both steps are keyed by `order_id`, so resending a completion that
    /// failed partway finishes it without crediting twice.
    pub async fn complete(
        &self,
        user_id: Uuid,
        session_id: &str,
        order_id: Uuid,
        coupon_id: Option<Uuid>,
    ) -> Result<CheckoutReceipt, Error> {
        let cart = self.carts.load(session_id).await?;
        if cart.is_empty() {
            return Err(Error::InvalidInput("cart is empty".into()));
        }
        let applied = match coupon_id {
            Some(id) => Some(self.coupons.apply_for_order(id, user_id, order_id).await?),
            None => None,
        };
        let quote = price_cart(&cart, self.config.tax_rate_bps, applied);

        if let Some(applied) = &quote.coupon {
            self.coupons.commit(applied.coupon_id, order_id).await?;
        }

        let (points_earned, balance) = self
            .ledger
            .award_order(user_id, order_id, quote.total_cents)
            .await?;

        // Order is done at this point; a stale cart is only an annoyance.
        if let Err(e) = self.carts.clear(session_id).await {
            warn!(%user_id, session_id, error = %e, "failed to clear cart after checkout");
        }

        info!(
            %user_id, %order_id,
            total_cents = quote.total_cents,
            points_earned,
            coupon = ?quote.coupon.as_ref().map(|c| c.coupon_id),
            "checkout completed"
        );

        Ok(CheckoutReceipt {
            order_id,
            user_id,
            quote,
            points_earned,
            balance,
        })
    }
}

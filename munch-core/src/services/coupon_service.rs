use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;
use munch_common::models::coupon::normalize_code;
use munch_common::models::{AppliedCoupon, Coupon};
use munch_common::traits::repository_traits::{CouponDeleteOutcome, CouponRepository};

use crate::config::RetryConfig;
use crate::retry::with_retry;
use crate::services::ledger_service::AccountLedger;
use crate::services::reward_catalog::RewardCatalog;
use crate::Error;

pub fn redemption_reference(coupon_id: Uuid) -> String {
    format!("redeem:{coupon_id}")
}

pub fn refund_reference(coupon_id: Uuid) -> String {
    format!("refund:{coupon_id}")
}

/// A freshly issued coupon and the balance its debit left behind.
#[derive(Debug, Clone)]
pub struct Redemption {
    pub coupon: Coupon,
    pub balance: i64,
}

/// Issues coupons against the ledger and tracks their single use.
pub struct CouponStore {
    repo: Arc<dyn CouponRepository + Send + Sync>,
    catalog: Arc<RewardCatalog>,
    ledger: Arc<AccountLedger>,
    retry: RetryConfig,
}

impl CouponStore {
    pub fn new(
        repo: Arc<dyn CouponRepository + Send + Sync>,
        catalog: Arc<RewardCatalog>,
        ledger: Arc<AccountLedger>,
        retry: RetryConfig,
    ) -> Self {
        Self { repo, catalog, ledger, retry }
    }

    /// Spends the tier's points and issues a coupon capturing its discount.
    pub async fn redeem(&self, user_id: Uuid, tier_id: Uuid) -> Result<Coupon, Error> {
        self.redeem_with_balance(user_id, tier_id).await.map(|r| r.coupon)
    }

    /// Like [`redeem`](Self::redeem), also returning the balance recorded by
    /// the redemption's own debit.
    ///
    /// Order is debit, then issue. The coupon id doubles as the key of
    /// both the debit and any refund, so retries never double-charge and a
    /// coupon never exists without its debit.
    pub async fn redeem_with_balance(&self, user_id: Uuid, tier_id: Uuid) -> Result<Redemption, Error> {
        let tier = self.catalog.get(tier_id).await?;
        let coupon_id = Uuid::new_v4();
        let amount = tier.points_required;
        let debit_ref = redemption_reference(coupon_id);

        let balance = match self.ledger.debit_with_reference(user_id, amount, &debit_ref).await {
            Ok(balance) => balance,
            Err(e) if e.is_unavailable() => {
                self.settle_unknown_debit(user_id, tier_id, coupon_id, amount, e).await?
            }
            Err(e) => return Err(e),
        };

        let coupon = Coupon::issue(coupon_id, user_id, &tier);
        let inserted = with_retry(&self.retry, "insert_coupon", || self.repo.insert_coupon(&coupon)).await;
        let issue_err = match inserted {
            Ok(()) => {
                info!(%user_id, %tier_id, %coupon_id, amount, balance, "coupon redeemed");
                return Ok(Redemption { coupon, balance });
            }
            Err(e) => e,
        };

        warn!(%user_id, %tier_id, %coupon_id, error = %issue_err, "coupon issuance failed after debit");

        // The failed insert may still have committed.
        match with_retry(&self.retry, "get_coupon", || self.repo.get_coupon(coupon_id)).await {
            Ok(Some(existing)) => {
                info!(%user_id, %coupon_id, "coupon found after ambiguous insert failure");
                return Ok(Redemption { coupon: existing, balance });
            }
            Ok(None) => {}
            Err(check_err) => {
                error!(
                    %user_id, %tier_id, %coupon_id, amount,
                    error = %check_err,
                    "cannot determine coupon state after debit; manual reconciliation required"
                );
                return Err(Error::RedemptionFailed {
                    user_id,
                    tier_id,
                    amount,
                    compensated: false,
                    reason: format!("issue: {issue_err}; state check: {check_err}"),
                });
            }
        }

        self.refund(user_id, tier_id, coupon_id, amount, issue_err.to_string()).await
    }

    /// The debit gave up without a definite answer. Returns the recorded
    /// balance if it did apply, or the original error if it did not.
    async fn settle_unknown_debit(
        &self,
        user_id: Uuid,
        tier_id: Uuid,
        coupon_id: Uuid,
        amount: i64,
        debit_err: Error,
    ) -> Result<i64, Error> {
        warn!(%user_id, %tier_id, %coupon_id, error = %debit_err, "redemption debit outcome unknown");

        match self.ledger.find_entry(user_id, &redemption_reference(coupon_id)).await {
            Ok(Some(entry)) => {
                info!(%user_id, %coupon_id, balance = entry.balance_after, "redemption debit found after failure");
                Ok(entry.balance_after)
            }
            Ok(None) => Err(debit_err),
            Err(check_err) => {
                error!(
                    %user_id, %tier_id, %coupon_id, amount,
                    error = %check_err,
                    "cannot determine whether redemption debit applied; manual reconciliation required"
                );
                Err(Error::RedemptionFailed {
                    user_id,
                    tier_id,
                    amount,
                    compensated: false,
                    reason: format!("debit: {debit_err}; state check: {check_err}"),
                })
            }
        }
    }

    /// Gives the debited points back under the coupon's refund reference.
    async fn refund(
        &self,
        user_id: Uuid,
        tier_id: Uuid,
        coupon_id: Uuid,
        amount: i64,
        reason: String,
    ) -> Result<Redemption, Error> {
        match self
            .ledger
            .credit_with_reference(user_id, amount, &refund_reference(coupon_id))
            .await
        {
            Ok(balance) => {
                warn!(%user_id, %tier_id, %coupon_id, amount, balance, "redemption compensated, points refunded");
                Err(Error::RedemptionFailed {
                    user_id,
                    tier_id,
                    amount,
                    compensated: true,
                    reason,
                })
            }
            Err(refund_err) => {
                error!(
                    %user_id, %tier_id, %coupon_id, amount,
                    error = %refund_err,
                    "refund after failed redemption did not apply; manual reconciliation required"
                );
                Err(Error::RedemptionFailed {
                    user_id,
                    tier_id,
                    amount,
                    compensated: false,
                    reason: format!("issue: {reason}; refund: {refund_err}"),
                })
            }
        }
    }

    async fn fetch(&self, coupon_id: Uuid) -> Result<Coupon, Error> {
        with_retry(&self.retry, "get_coupon", || self.repo.get_coupon(coupon_id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("Coupon {coupon_id}")))
    }

    /// Validates a coupon for `user_id` and returns its discount. Read only;
    /// see [`commit`](Self::commit).
    pub async fn apply(&self, coupon_id: Uuid, user_id: Uuid) -> Result<AppliedCoupon, Error> {
        let coupon = self.owned(coupon_id, user_id).await?;
        if !coupon.is_active() {
            return Err(Error::AlreadyUsed(coupon_id));
        }
        Ok(AppliedCoupon::from(&coupon))
    }

    /// Like [`apply`](Self::apply), but a coupon already consumed by this
    /// same order still applies, so a resent checkout prices identically.
    pub async fn apply_for_order(
        &self,
        coupon_id: Uuid,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<AppliedCoupon, Error> {
        let coupon = self.owned(coupon_id, user_id).await?;
        if !coupon.is_active() && !coupon.used_by(order_id) {
            return Err(Error::AlreadyUsed(coupon_id));
        }
        Ok(AppliedCoupon::from(&coupon))
    }

    async fn owned(&self, coupon_id: Uuid, user_id: Uuid) -> Result<Coupon, Error> {
        let coupon = self.fetch(coupon_id).await?;
        if coupon.user_id != user_id {
            return Err(Error::NotOwner { coupon_id, user_id });
        }
        Ok(coupon)
    }

    /// Resolves a displayed code among the user's own coupons, then applies it.
    pub async fn apply_code(&self, user_id: Uuid, code: &str) -> Result<AppliedCoupon, Error> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(Error::InvalidInput("coupon code must not be empty".into()));
        }

        let matches = with_retry(&self.retry, "find_by_code", || self.repo.find_by_code(user_id, &code)).await?;
        let active: Vec<&Coupon> = matches.iter().filter(|c| c.is_active()).collect();

        match (active.as_slice(), matches.first()) {
            ([only], _) => self.apply(only.coupon_id, user_id).await,
            ([], Some(used)) => Err(Error::AlreadyUsed(used.coupon_id)),
            ([], None) => Err(Error::NotFound(format!("Coupon code {code}"))),
            (_, _) => Err(Error::InvalidInput(format!(
                "coupon code {code} is ambiguous; use the full coupon id"
            ))),
        }
    }

    /// Consumes the coupon for `order_id`. Succeeds for exactly one order;
    /// repeating the call for that same order returns the consumed coupon.
    pub async fn commit(&self, coupon_id: Uuid, order_id: Uuid) -> Result<Coupon, Error> {
        let updated = with_retry(&self.retry, "mark_used", || self.repo.mark_used(coupon_id, order_id)).await?;
        if let Some(coupon) = updated {
            info!(%coupon_id, %order_id, user_id = %coupon.user_id, "coupon committed");
            return Ok(coupon);
        }

        // Distinguishes unknown ids, our own earlier commit, and other orders.
        let existing = self.fetch(coupon_id).await?;
        if existing.used_by(order_id) {
            return Ok(existing);
        }
        Err(Error::AlreadyUsed(coupon_id))
    }

    /// The user's coupons, newest first.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Coupon>, Error> {
        with_retry(&self.retry, "list_coupons", || self.repo.list_coupons_for_user(user_id)).await
    }

    /// Owner-only deletion of an unused coupon. Points are not refunded.
    pub async fn delete(&self, coupon_id: Uuid, user_id: Uuid) -> Result<(), Error> {
        let outcome = with_retry(&self.retry, "delete_coupon", || self.repo.delete_unused(coupon_id, user_id)).await?;
        match outcome {
            CouponDeleteOutcome::Deleted => {
                info!(%coupon_id, %user_id, "coupon deleted");
                Ok(())
            }
            CouponDeleteOutcome::Missing => Err(Error::NotFound(format!("Coupon {coupon_id}"))),
            CouponDeleteOutcome::NotOwner => Err(Error::NotOwner { coupon_id, user_id }),
            CouponDeleteOutcome::AlreadyUsed => Err(Error::AlreadyUsed(coupon_id)),
        }
    }
}

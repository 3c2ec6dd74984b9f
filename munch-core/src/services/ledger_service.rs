use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;
use munch_common::models::LedgerEntry;
use munch_common::traits::repository_traits::AccountRepository;

use crate::config::RetryConfig;
use crate::retry::with_retry;
use crate::Error;

/// Points balance operations for user accounts.
///
/// Balances are never cached here: every call goes to the repository,
/// whose primitives are atomic per account.
pub struct AccountLedger {
    repo: Arc<dyn AccountRepository + Send + Sync>,
    retry: RetryConfig,
}

fn ensure_positive(amount: i64) -> Result<(), Error> {
    if amount <= 0 {
        return Err(Error::InvalidInput(format!("amount must be positive, got {amount}")));
    }
    Ok(())
}

fn ensure_reference(reference: &str) -> Result<(), Error> {
    if reference.trim().is_empty() {
        return Err(Error::InvalidInput("reference must not be empty".into()));
    }
    Ok(())
}

pub fn order_reference(order_id: Uuid) -> String {
    format!("order:{order_id}")
}

impl AccountLedger {
    pub fn new(repo: Arc<dyn AccountRepository + Send + Sync>, retry: RetryConfig) -> Self {
        Self { repo, retry }
    }

    /// Adds `amount` points and returns the new balance.
    pub async fn credit(&self, user_id: Uuid, amount: i64) -> Result<i64, Error> {
        // One reference per logical call, reused by every retry attempt.
        let reference = format!("credit:{}", Uuid::new_v4());
        self.credit_with_reference(user_id, amount, &reference).await
    }

    /// Like [`credit`](Self::credit) but applied at most once per `reference`.
    /// A replay returns the balance recorded by the original application.
    pub async fn credit_with_reference(
        &self,
        user_id: Uuid,
        amount: i64,
        reference: &str,
    ) -> Result<i64, Error> {
        ensure_positive(amount)?;
        ensure_reference(reference)?;

        let entry = with_retry(&self.retry, "credit", || {
            self.repo.apply_credit(user_id, amount, reference)
        })
        .await?;

        debug!(%user_id, amount, reference, balance = entry.balance_after, "points credited");
        Ok(entry.balance_after)
    }

    /// Removes `amount` points, failing with `InsufficientPoints` if the
    /// balance does not cover it.
    pub async fn debit(&self, user_id: Uuid, amount: i64) -> Result<i64, Error> {
        let reference = format!("debit:{}", Uuid::new_v4());
        self.debit_with_reference(user_id, amount, &reference).await
    }

    pub async fn debit_with_reference(
        &self,
        user_id: Uuid,
        amount: i64,
        reference: &str,
    ) -> Result<i64, Error> {
        ensure_positive(amount)?;
        ensure_reference(reference)?;

        let entry = with_retry(&self.retry, "debit", || {
            self.repo.apply_debit(user_id, amount, reference)
        })
        .await?;

        debug!(%user_id, amount, reference, balance = entry.balance_after, "points debited");
        Ok(entry.balance_after)
    }

    /// Current balance; users without an account have zero.
    pub async fn balance(&self, user_id: Uuid) -> Result<i64, Error> {
        let account = with_retry(&self.retry, "balance", || self.repo.get_account(user_id)).await?;
        Ok(account.map(|a| a.points).unwrap_or(0))
    }

    /// Most recent ledger entries, newest first.
    pub async fn history(&self, user_id: Uuid, limit: i64) -> Result<Vec<LedgerEntry>, Error> {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        with_retry(&self.retry, "history", || self.repo.list_entries(user_id, limit)).await
    }

    /// Whether a mutation with this reference has been applied.
    pub async fn find_entry(&self, user_id: Uuid, reference: &str) -> Result<Option<LedgerEntry>, Error> {
        with_retry(&self.retry, "find_entry", || self.repo.find_entry(user_id, reference)).await
    }

    /// Checkout hook: one point per whole currency unit of the order total,
    /// credited once per order.
    pub async fn award_order(&self, user_id: Uuid, order_id: Uuid, total_cents: i64) -> Result<(i64, i64), Error> {
        let points = points_for_total(total_cents);
        if points == 0 {
            return Ok((0, self.balance(user_id).await?));
        }
        let balance = self
            .credit_with_reference(user_id, points, &order_reference(order_id))
            .await?;
        info!(%user_id, %order_id, points, balance, "order points awarded");
        Ok((points, balance))
    }
}

/// floor(total) for a non-negative total expressed in cents.
pub fn points_for_total(total_cents: i64) -> i64 {
    total_cents.max(0) / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_floor_the_total() {
        assert_eq!(points_for_total(0), 0);
        assert_eq!(points_for_total(99), 0);
        assert_eq!(points_for_total(1999), 19);
        assert_eq!(points_for_total(2000), 20);
        assert_eq!(points_for_total(-500), 0);
    }
}

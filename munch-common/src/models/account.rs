use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's points balance.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub user_id: Uuid,
    pub points: i64,
    pub updated_at: DateTime<Utc>,
}

/// One applied balance mutation. Positive `amount` is a credit,
/// negative a debit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerEntry {
    pub entry_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    /// Idempotency key; unique per user.
    pub reference: String,
    pub balance_after: i64,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(user_id: Uuid, amount: i64, reference: &str, balance_after: i64) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            user_id,
            amount,
            reference: reference.to_string(),
            balance_after,
            created_at: Utc::now(),
        }
    }

    pub fn is_credit(&self) -> bool {
        self.amount > 0
    }
}

// ================================================================
// File: munch-common/src/error.rs
// ================================================================

use thiserror::Error;
use uuid::Uuid;

/// Postgres SQLSTATE codes that are worth another attempt.
const RETRYABLE_SQLSTATES: &[&str] = &[
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "55P03", // lock_not_available
    "57014", // query_canceled (statement_timeout)
];

#[derive(Debug, Error)]
pub enum Error {
    // Business-rule rejections:
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found error: {0}")]
    NotFound(String),

    #[error("Coupon {coupon_id} does not belong to user {user_id}")]
    NotOwner { coupon_id: Uuid, user_id: Uuid },

    #[error("Coupon {0} has already been used")]
    AlreadyUsed(Uuid),

    #[error("Insufficient points: required {required}, available {available}")]
    InsufficientPoints { required: i64, available: i64 },

    // Storage faults:
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Transient storage fault: {0}")]
    Transient(String),

    #[error(
        "Redemption failed for user {user_id}, tier {tier_id}, amount {amount} \
         (compensated: {compensated}): {reason}"
    )]
    RedemptionFailed {
        user_id: Uuid,
        tier_id: Uuid,
        amount: i64,
        compensated: bool,
        reason: String,
    },

    // Infrastructure:
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Uuid error: {0}")]
    Uuid(#[from] uuid::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl Error {
    /// True for faults where repeating the same (idempotent) call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transient(_) | Error::Timeout(_) | Error::Io(_) => true,
            Error::Database(e) => is_transient_sqlx(e),
            _ => false,
        }
    }

    /// True when a call gave up without a definite outcome: a transient
    /// fault, or retries exhausted on one.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::LedgerUnavailable(_)) || self.is_transient()
    }

    /// Message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidInput(msg) => format!("Invalid request: {msg}"),
            Error::NotFound(what) => format!("{what} was not found"),
            Error::NotOwner { .. } => "This coupon belongs to another account".to_string(),
            Error::AlreadyUsed(_) => "This coupon has already been used".to_string(),
            Error::InsufficientPoints { required, available } => {
                format!("You need {required} points but only have {available}")
            }
            Error::LedgerUnavailable(_) | Error::Transient(_) | Error::Timeout(_) => {
                "The rewards service is busy, please try again in a moment".to_string()
            }
            Error::RedemptionFailed { compensated: true, .. } => {
                "We could not issue your coupon; your points have been returned".to_string()
            }
            Error::RedemptionFailed { compensated: false, .. } => {
                "We could not issue your coupon; support has been notified".to_string()
            }
            _ => "Something went wrong, please try again".to_string(),
        }
    }
}

fn is_transient_sqlx(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map(|code| RETRYABLE_SQLSTATES.contains(&code.as_ref()))
            .unwrap_or(false),
        _ => false,
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<chrono::format::ParseError> for Error {
    fn from(err: chrono::format::ParseError) -> Self {
        Error::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rejections_are_not_transient() {
        let errs = [
            Error::InvalidInput("x".into()),
            Error::NotFound("coupon".into()),
            Error::AlreadyUsed(Uuid::new_v4()),
            Error::InsufficientPoints { required: 10, available: 3 },
        ];
        for e in errs {
            assert!(!e.is_transient(), "{e} should not be retried");
        }
    }

    #[test]
    fn pool_timeouts_are_transient() {
        assert!(Error::Database(sqlx::Error::PoolTimedOut).is_transient());
        assert!(Error::Transient("conflict".into()).is_transient());
        assert!(!Error::Database(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn unavailable_maps_to_generic_retry_message() {
        let msg = Error::LedgerUnavailable("debit".into()).user_message();
        assert!(msg.contains("try again"));
    }
}

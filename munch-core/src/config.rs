//! Runtime knobs for the ledger services.
//!
//! The server fills these from CLI flags / environment; tests usually take
//! the defaults and shrink the retry delays.

use std::time::Duration;

/// Default sales tax applied at checkout, in basis points (8%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 800;
/// Points granted per point of game score.
pub const DEFAULT_POINTS_PER_SCORE: i64 = 5;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            min_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    /// A config with millisecond delays, for tests.
    pub fn fast(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub tax_rate_bps: u32,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self { tax_rate_bps: DEFAULT_TAX_RATE_BPS }
    }
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub points_per_score: i64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self { points_per_score: DEFAULT_POINTS_PER_SCORE }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LedgerConfig {
    pub retry: RetryConfig,
    pub checkout: CheckoutConfig,
    pub game: GameConfig,
}

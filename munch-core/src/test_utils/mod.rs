// File: munch-core/src/test_utils/mod.rs

pub mod helpers;

use crate::config::{LedgerConfig, RetryConfig};

/// Defaults with millisecond backoff so fault-injection tests stay quick.
pub fn fast_config() -> LedgerConfig {
    LedgerConfig {
        retry: RetryConfig::fast(4),
        ..LedgerConfig::default()
    }
}

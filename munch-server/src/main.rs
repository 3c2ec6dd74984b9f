use clap::{Parser, ValueEnum};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use munch_core::config::{CheckoutConfig, GameConfig, LedgerConfig, RetryConfig};

mod context;
mod error;
mod identity;
mod routes;
mod server;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Storage {
    /// Process-local maps; state is lost on restart.
    Memory,
    Postgres,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "munch")]
#[command(author, version, about = "Munch rewards ledger - points, reward tiers and coupons")]
pub struct Args {
    /// Address to which the HTTP API will bind
    #[arg(long, env = "MUNCH_SERVER_ADDR", default_value = "0.0.0.0:8080")]
    pub server_addr: String,

    /// Storage backend for accounts, tiers and coupons
    #[arg(long, value_enum, env = "MUNCH_STORAGE", default_value = "postgres")]
    pub storage: Storage,

    /// Postgres connection URL.
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://munch@localhost:5432/munch")]
    pub db_url: String,

    #[arg(long, env = "MUNCH_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// Attempts per storage operation, including the first
    #[arg(long, env = "MUNCH_RETRY_MAX_ATTEMPTS", default_value_t = 4)]
    pub retry_max_attempts: usize,

    #[arg(long, env = "MUNCH_RETRY_MIN_DELAY_MS", default_value_t = 50)]
    pub retry_min_delay_ms: u64,

    #[arg(long, env = "MUNCH_RETRY_MAX_DELAY_MS", default_value_t = 2000)]
    pub retry_max_delay_ms: u64,

    /// Sales tax in basis points (800 = 8%)
    #[arg(long, env = "MUNCH_TAX_RATE_BPS", default_value_t = munch_core::config::DEFAULT_TAX_RATE_BPS)]
    pub tax_rate_bps: u32,

    /// Points credited per point of minigame score
    #[arg(long, env = "MUNCH_POINTS_PER_SCORE", default_value_t = munch_core::config::DEFAULT_POINTS_PER_SCORE)]
    pub points_per_score: i64,
}

impl Args {
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            retry: RetryConfig {
                max_attempts: self.retry_max_attempts.max(1),
                min_delay: Duration::from_millis(self.retry_min_delay_ms),
                max_delay: Duration::from_millis(self.retry_max_delay_ms.max(self.retry_min_delay_ms)),
            },
            checkout: CheckoutConfig { tax_rate_bps: self.tax_rate_bps },
            game: GameConfig { points_per_score: self.points_per_score.max(0) },
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("munch=info".parse().unwrap_or_default())
        .add_directive("tower_http=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(sub) {
        eprintln!("Failed to set global subscriber: {e}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();
    info!("Munch starting. storage={:?}, addr={}", args.storage, args.server_addr);

    if let Err(e) = server::run_server(args).await {
        error!("Server error: {:?}", e);
        return Err(e.into());
    }
    info!("Main finished. Goodbye!");
    Ok(())
}

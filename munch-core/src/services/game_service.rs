use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::config::GameConfig;
use crate::services::ledger_service::AccountLedger;
use crate::Error;

pub fn game_reference(game_session_id: Uuid) -> String {
    format!("game:{game_session_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct GameAward {
    pub points_earned: i64,
    pub balance: i64,
}

/// Turns minigame results into points.
pub struct GameRewards {
    ledger: Arc<AccountLedger>,
    config: GameConfig,
}

impl GameRewards {
    pub fn new(ledger: Arc<AccountLedger>, config: GameConfig) -> Self {
        Self { ledger, config }
    }

    /// Credits `score * points_per_score`, once per game session.
    pub async fn complete_game(
        &self,
        user_id: Uuid,
        game_session_id: Uuid,
        score: u32,
    ) -> Result<GameAward, Error> {
        let points_earned = i64::from(score).saturating_mul(self.config.points_per_score);
        if points_earned <= 0 {
            let balance = self.ledger.balance(user_id).await?;
            return Ok(GameAward { points_earned: 0, balance });
        }

        let balance = self
            .ledger
            .credit_with_reference(user_id, points_earned, &game_reference(game_session_id))
            .await?;
        info!(%user_id, %game_session_id, score, points_earned, balance, "game points awarded");
        Ok(GameAward { points_earned, balance })
    }
}

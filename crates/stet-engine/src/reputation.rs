//! Reputation reads: per-user score with ledger, and the leaderboard.

use serde::Serialize;
use stet_core::{
  reputation::{LeaderboardRow, ScoreEntry},
  sanction::Sanction,
  store::ModerationStore,
};
use uuid::Uuid;

use crate::{Engine, EngineResult, Reject};

/// A user's current clamped score plus the ledger behind it.
#[derive(Debug, Clone, Serialize)]
pub struct UserScore {
  pub user_id: Uuid,
  pub score:   f64,
  pub entries: Vec<ScoreEntry>,
}

impl<S: ModerationStore> Engine<S> {
  pub async fn user_score(&self, user_id: Uuid) -> EngineResult<UserScore> {
    let user = self
      .load_actor(user_id)
      .await?
      .ok_or(Reject::NotFound("user"))?;
    let entries = self
      .store
      .score_entries(user_id)
      .await
      .map_err(Reject::store)?;
    Ok(UserScore { user_id, score: user.score, entries })
  }

  pub async fn leaderboard(
    &self,
    limit: usize,
  ) -> EngineResult<Vec<LeaderboardRow>> {
    self.store.leaderboard(limit).await.map_err(Reject::store)
  }

  pub async fn sanctions(
    &self,
    user_id: Uuid,
  ) -> EngineResult<Vec<Sanction>> {
    self.store.sanctions_for(user_id).await.map_err(Reject::store)
  }
}

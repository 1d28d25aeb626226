//! Reputation read endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/leaderboard` | `?limit` optional, default 20 |
//! | `GET` | `/users/:id/score` | Current score plus the ledger behind it |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use stet_core::{reputation::LeaderboardRow, store::ModerationStore};
use stet_engine::reputation::UserScore;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

const DEFAULT_LEADERBOARD_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
  pub limit: Option<usize>,
}

/// `GET /leaderboard[?limit=N]`
pub async fn leaderboard<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<LeaderboardParams>,
) -> Result<Json<Vec<LeaderboardRow>>, ApiError>
where
  S: ModerationStore + 'static,
{
  let limit = params.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
  Ok(Json(state.engine.leaderboard(limit).await?))
}

/// `GET /users/:id/score`
pub async fn score<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<UserScore>, ApiError>
where
  S: ModerationStore + 'static,
{
  Ok(Json(state.engine.user_score(id).await?))
}

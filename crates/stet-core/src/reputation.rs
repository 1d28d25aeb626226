//! Reputation ledger — append-only score deltas per user.
//!
//! The ledger drives no moderation decision; it exists for bookkeeping
//! and the visible leaderboard. The live score is the clamped running
//! sum of all entries.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Why a delta was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreReason {
  /// Participated in a community vote that removed an annotation.
  VoteContribution,
  /// Book owner resolved a report in a timely fashion.
  HandleReport,
}

impl ScoreReason {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::VoteContribution => "vote_contribution",
      Self::HandleReport => "handle_report",
    }
  }
}

impl FromStr for ScoreReason {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "vote_contribution" => Ok(Self::VoteContribution),
      "handle_report" => Ok(Self::HandleReport),
      other => Err(Error::unknown_token("score reason", other)),
    }
  }
}

/// One immutable ledger entry. Never updated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreEntry {
  pub entry_id:      Uuid,
  pub user_id:       Uuid,
  pub delta:         f64,
  pub reason:        ScoreReason,
  pub annotation_id: Option<Uuid>,
  pub report_id:     Option<Uuid>,
  pub recorded_at:   DateTime<Utc>,
}

/// A leaderboard row — user plus current clamped score.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardRow {
  pub user_id: Uuid,
  pub score:   f64,
}

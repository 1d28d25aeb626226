//! Vote — one registered actor's opinion on one contested annotation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::report::Verdict;

/// At most one vote per `(annotation, voter)` pair, enforced by a unique
/// constraint at the store layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
  pub vote_id:       Uuid,
  pub annotation_id: Uuid,
  pub voter_id:      Uuid,
  pub choice:        Verdict,
  pub reason:        Option<String>,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::ModerationStore::insert_vote`].
#[derive(Debug, Clone)]
pub struct NewVote {
  pub annotation_id: Uuid,
  pub voter_id:      Uuid,
  pub choice:        Verdict,
  pub reason:        Option<String>,
}

/// Running tally over all votes for one annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteTally {
  pub total:  i64,
  pub remove: i64,
  pub keep:   i64,
}

impl VoteTally {
  /// The resolution rule: below quorum there is no verdict; at or above
  /// quorum, `Remove` needs a supermajority, anything less keeps the
  /// annotation.
  pub fn verdict(&self, quorum: i64, supermajority: f64) -> Option<Verdict> {
    if self.total < quorum {
      return None;
    }
    let remove_ratio = self.remove as f64 / self.total as f64;
    if remove_ratio >= supermajority {
      Some(Verdict::Remove)
    } else {
      Some(Verdict::Keep)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn below_quorum_no_verdict() {
    let t = VoteTally { total: 9, remove: 9, keep: 0 };
    assert_eq!(t.verdict(10, 0.75), None);
  }

  #[test]
  fn supermajority_boundary() {
    // 7/10 = 70% < 75% — keep.
    let t = VoteTally { total: 10, remove: 7, keep: 3 };
    assert_eq!(t.verdict(10, 0.75), Some(Verdict::Keep));

    // 8/10 = 80% >= 75% — remove.
    let t = VoteTally { total: 10, remove: 8, keep: 2 };
    assert_eq!(t.verdict(10, 0.75), Some(Verdict::Remove));
  }
}

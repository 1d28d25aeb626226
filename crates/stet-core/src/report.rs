//! Report — one actor's complaint against one annotation.
//!
//! Reports are never deleted. All reports against an annotation resolve
//! together when the annotation's fate is decided, whichever path
//! (community vote or moderator) decides it.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Who filed a report. Registered identity and anonymous fingerprint are
/// mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ReporterId {
  User(Uuid),
  /// Truncated hash of the caller's network address; no account needed.
  Anonymous(String),
}

impl ReporterId {
  pub fn is_registered(&self) -> bool { matches!(self, Self::User(_)) }

  pub fn user_id(&self) -> Option<Uuid> {
    match self {
      Self::User(id) => Some(*id),
      Self::Anonymous(_) => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
  Pending,
  Escalated,
  Resolved,
}

impl ReportStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Escalated => "escalated",
      Self::Resolved => "resolved",
    }
  }
}

impl FromStr for ReportStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "pending" => Ok(Self::Pending),
      "escalated" => Ok(Self::Escalated),
      "resolved" => Ok(Self::Resolved),
      other => Err(Error::unknown_token("report status", other)),
    }
  }
}

/// The terminal decision for a disputed annotation. Shared by votes
/// (as the voter's choice) and by report resolution (as the recorded
/// handler action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
  Remove,
  Keep,
}

impl Verdict {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Remove => "remove",
      Self::Keep => "keep",
    }
  }
}

impl FromStr for Verdict {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "remove" => Ok(Self::Remove),
      "keep" => Ok(Self::Keep),
      other => Err(Error::unknown_token("verdict", other)),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
  pub report_id:            Uuid,
  pub annotation_id:        Uuid,
  pub book_id:              Uuid,
  pub reporter:             ReporterId,
  pub reason:               String,
  pub status:               ReportStatus,
  /// Stamped exactly once, on the tally's first threshold crossing.
  pub threshold_reached_at: Option<DateTime<Utc>>,
  /// The moderator who resolved this report, if the moderator path won.
  pub handled_by:           Option<Uuid>,
  pub handler_action:       Option<Verdict>,
  pub handled_at:           Option<DateTime<Utc>>,
  pub created_at:           DateTime<Utc>,
}

/// Input to [`crate::store::ModerationStore::insert_report`].
/// Reason is already trimmed and length-checked by the engine.
#[derive(Debug, Clone)]
pub struct NewReport {
  pub annotation_id: Uuid,
  pub book_id:       Uuid,
  pub reporter:      ReporterId,
  pub reason:        String,
}

/// Weighted tally over the `pending` reports of one annotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReportTally {
  pub effective_weight: f64,
  pub registered:       i64,
}

impl ReportTally {
  /// The dual escalation condition: weighted volume AND a minimum number
  /// of distinct registered reporters, so neither an anonymous flood nor
  /// a couple of accounts can force escalation alone.
  pub fn crosses(&self, weight_threshold: f64, min_registered: i64) -> bool {
    self.effective_weight >= weight_threshold
      && self.registered >= min_registered
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dual_threshold_requires_both_conditions() {
    // 3 registered + 35 anonymous: weight 3.0 + 7.0 = 10.0, registered 3.
    let t = ReportTally { effective_weight: 10.0, registered: 3 };
    assert!(t.crosses(10.0, 3));

    // 2 registered + 50 anonymous: plenty of weight, too few registered.
    let t = ReportTally { effective_weight: 12.0, registered: 2 };
    assert!(!t.crosses(10.0, 3));

    // 3 registered alone: enough reporters, not enough weight.
    let t = ReportTally { effective_weight: 3.0, registered: 3 };
    assert!(!t.crosses(10.0, 3));
  }
}

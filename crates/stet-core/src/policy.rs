//! Policy constants for moderation decisions.
//!
//! Every threshold in the engine lives here as a named value, bundled
//! into [`Policy`] so a deployment can override individual knobs. The
//! defaults are the production policy.

use serde::{Deserialize, Serialize};

// ─── Escalation ──────────────────────────────────────────────────────────────

/// Weighted report volume required to contest an annotation.
pub const ESCALATION_WEIGHT: f64 = 10.0;
/// Distinct registered reporters required to contest an annotation.
pub const MIN_REGISTERED_REPORTERS: i64 = 3;
pub const REGISTERED_REPORT_WEIGHT: f64 = 1.0;
pub const ANONYMOUS_REPORT_WEIGHT: f64 = 0.2;

// ─── Voting ──────────────────────────────────────────────────────────────────

/// Minimum votes before a resolution can be finalised.
pub const VOTE_QUORUM: i64 = 10;
/// Fraction of `remove` votes needed to remove (else keep).
pub const REMOVE_SUPERMAJORITY: f64 = 0.75;

// ─── Report admission ────────────────────────────────────────────────────────

/// Pairwise bigram-Jaccard similarity at or above this rejects a report
/// reason as a near-duplicate of an existing one.
pub const DUPLICATE_REASON_CUTOFF: f64 = 0.6;
pub const REASON_MIN_CHARS: usize = 10;
pub const REASON_MAX_CHARS: usize = 500;
/// Lifetime cap on reports per (annotation, reporter) pair.
pub const PER_ANNOTATION_REPORT_CAP: i64 = 2;

// ─── Reputation ──────────────────────────────────────────────────────────────

pub const VOTE_CONTRIBUTION_DELTA: f64 = 0.1;
pub const HANDLE_REPORT_DELTA: f64 = 0.2;
pub const SCORE_MIN: f64 = -100.0;
pub const SCORE_MAX: f64 = 100.0;

// ─── Rate limits ─────────────────────────────────────────────────────────────

/// One fixed-window rate limit: at most `limit` admissions per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
  pub limit:       u32,
  pub window_secs: i64,
}

pub const ANNOTATION_RATE: RateLimit = RateLimit { limit: 10, window_secs: 60 };
pub const REPORT_RATE_REGISTERED: RateLimit =
  RateLimit { limit: 20, window_secs: 3600 };
pub const REPORT_RATE_ANONYMOUS: RateLimit =
  RateLimit { limit: 3, window_secs: 3600 };

// ─── Punishment ladder ───────────────────────────────────────────────────────

/// Mute durations in minutes, indexed by (violation count − 2):
/// 1 day, 3 days, 7 days, 30 days. Counts past the table are bans.
pub const MUTE_LADDER_MINUTES: [i64; 4] = [1440, 4320, 10080, 43200];

/// The sanction chosen for a given post-increment violation count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LadderStep {
  Warning,
  Mute { minutes: i64 },
  Ban,
}

// ─── Policy bundle ───────────────────────────────────────────────────────────

/// All moderation knobs in one place. `Default` is the fixed production
/// policy; tests and deployments may override fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
  pub escalation_weight:         f64,
  pub min_registered_reporters:  i64,
  pub registered_report_weight:  f64,
  pub anonymous_report_weight:   f64,
  pub vote_quorum:               i64,
  pub remove_supermajority:      f64,
  pub duplicate_reason_cutoff:   f64,
  pub reason_min_chars:          usize,
  pub reason_max_chars:          usize,
  pub per_annotation_report_cap: i64,
  pub vote_contribution_delta:   f64,
  pub handle_report_delta:       f64,
  pub annotation_rate:           RateLimit,
  pub report_rate_registered:    RateLimit,
  pub report_rate_anonymous:     RateLimit,
  pub mute_ladder_minutes:       Vec<i64>,
}

impl Default for Policy {
  fn default() -> Self {
    Self {
      escalation_weight:         ESCALATION_WEIGHT,
      min_registered_reporters:  MIN_REGISTERED_REPORTERS,
      registered_report_weight:  REGISTERED_REPORT_WEIGHT,
      anonymous_report_weight:   ANONYMOUS_REPORT_WEIGHT,
      vote_quorum:               VOTE_QUORUM,
      remove_supermajority:      REMOVE_SUPERMAJORITY,
      duplicate_reason_cutoff:   DUPLICATE_REASON_CUTOFF,
      reason_min_chars:          REASON_MIN_CHARS,
      reason_max_chars:          REASON_MAX_CHARS,
      per_annotation_report_cap: PER_ANNOTATION_REPORT_CAP,
      vote_contribution_delta:   VOTE_CONTRIBUTION_DELTA,
      handle_report_delta:       HANDLE_REPORT_DELTA,
      annotation_rate:           ANNOTATION_RATE,
      report_rate_registered:    REPORT_RATE_REGISTERED,
      report_rate_anonymous:     REPORT_RATE_ANONYMOUS,
      mute_ladder_minutes:       MUTE_LADDER_MINUTES.to_vec(),
    }
  }
}

impl Policy {
  /// Lookup-table mapping from the post-increment violation count to the
  /// next sanction. Counts at or below 1 warn; counts walking off the end
  /// of the mute table ban.
  pub fn sanction_for(&self, violation_count: i64) -> LadderStep {
    if violation_count <= 1 {
      return LadderStep::Warning;
    }
    let index = (violation_count - 2) as usize;
    match self.mute_ladder_minutes.get(index) {
      Some(&minutes) => LadderStep::Mute { minutes },
      None => LadderStep::Ban,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ladder_is_monotone_until_ban() {
    let policy = Policy::default();

    assert_eq!(policy.sanction_for(1), LadderStep::Warning);
    assert_eq!(policy.sanction_for(2), LadderStep::Mute { minutes: 1440 });
    assert_eq!(policy.sanction_for(3), LadderStep::Mute { minutes: 4320 });
    assert_eq!(policy.sanction_for(4), LadderStep::Mute { minutes: 10080 });
    assert_eq!(policy.sanction_for(5), LadderStep::Mute { minutes: 43200 });
    assert_eq!(policy.sanction_for(6), LadderStep::Ban);
    assert_eq!(policy.sanction_for(40), LadderStep::Ban);

    // Durations never decrease as the count climbs.
    let durations: Vec<i64> = (2..=5)
      .map(|c| match policy.sanction_for(c) {
        LadderStep::Mute { minutes } => minutes,
        other => panic!("expected mute, got {other:?}"),
      })
      .collect();
    assert!(durations.windows(2).all(|w| w[0] <= w[1]));
  }

  #[test]
  fn counts_zero_and_one_share_the_warning_rung() {
    assert_eq!(Policy::default().sanction_for(0), LadderStep::Warning);
    assert_eq!(Policy::default().sanction_for(1), LadderStep::Warning);
  }
}

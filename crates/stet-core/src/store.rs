//! The `ModerationStore` trait.
//!
//! Implemented by storage backends (e.g. `stet-store-sqlite`). The engine
//! depends on this abstraction, not on any concrete backend.
//!
//! Two store properties are load-bearing for correctness under
//! concurrency:
//!
//! - [`transition_annotation`](ModerationStore::transition_annotation) is
//!   a conditional update (compare-and-swap on the status column). Every
//!   resolution path goes through it, so the side effects of resolving a
//!   contested annotation run exactly once.
//! - [`insert_vote`](ModerationStore::insert_vote) relies on a unique
//!   constraint per `(annotation, voter)`; duplicates are rejected, never
//!   merged.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  actor::UserState,
  annotation::{Annotation, AnnotationStatus, NewAnnotation},
  book::Book,
  report::{NewReport, Report, ReporterId, ReportTally, Verdict},
  reputation::{LeaderboardRow, ScoreEntry, ScoreReason},
  sanction::{NewSanction, Sanction},
  vote::{NewVote, Vote, VoteTally},
};

/// Abstraction over a Stet moderation store backend.
pub trait ModerationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Insert or replace a user's moderation profile.
  fn upsert_user(
    &self,
    user: UserState,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Retrieve a user's moderation profile. Returns `None` if unknown.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<UserState>, Self::Error>> + Send + '_;

  /// Atomically increment `violation_count` (and stamp
  /// `last_violation_at`), returning the post-increment count.
  fn increment_violation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  fn set_muted_until(
    &self,
    id: Uuid,
    until: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn set_banned_at(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reputation ledger ─────────────────────────────────────────────────

  /// Apply a clamped score delta and append the ledger entry in one
  /// operation. Returns the user's new clamped score.
  fn apply_score_delta(
    &self,
    user_id: Uuid,
    delta: f64,
    reason: ScoreReason,
    annotation_id: Option<Uuid>,
    report_id: Option<Uuid>,
  ) -> impl Future<Output = Result<f64, Self::Error>> + Send + '_;

  /// All ledger entries for a user, newest first.
  fn score_entries(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ScoreEntry>, Self::Error>> + Send + '_;

  /// Top scores across all users.
  fn leaderboard(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<LeaderboardRow>, Self::Error>> + Send + '_;

  // ── Sanctions ─────────────────────────────────────────────────────────

  fn insert_sanction(
    &self,
    sanction: NewSanction,
  ) -> impl Future<Output = Result<Sanction, Self::Error>> + Send + '_;

  /// All sanction records for a user, newest first.
  fn sanctions_for(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Sanction>, Self::Error>> + Send + '_;

  // ── Books ─────────────────────────────────────────────────────────────

  fn upsert_book(
    &self,
    book: Book,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_book(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Book>, Self::Error>> + Send + '_;

  // ── Annotations ───────────────────────────────────────────────────────

  /// Persist a new annotation in `Normal` status. Timestamps are set by
  /// the store.
  fn insert_annotation(
    &self,
    input: NewAnnotation,
  ) -> impl Future<Output = Result<Annotation, Self::Error>> + Send + '_;

  fn get_annotation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Annotation>, Self::Error>> + Send + '_;

  /// Conditional status transition: succeeds (returns `true`) only if the
  /// row's status still equals `expected` at the moment of the write.
  /// `false` means another resolver won the race; the caller must not
  /// apply resolution side effects.
  fn transition_annotation(
    &self,
    id: Uuid,
    expected: AnnotationStatus,
    to: AnnotationStatus,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Ids of all currently-contested annotations (reconciliation sweep).
  fn contested_annotations(
    &self,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  // ── Reports ───────────────────────────────────────────────────────────

  fn insert_report(
    &self,
    input: NewReport,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + '_;

  fn get_report(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Report>, Self::Error>> + Send + '_;

  /// Reasons of all reports against an annotation (for the similarity
  /// gate). Small by construction: an annotation escalates long before
  /// this list grows large.
  fn report_reasons(
    &self,
    annotation_id: Uuid,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Weighted tally over `pending` reports, with the caller's weights.
  fn pending_report_tally(
    &self,
    annotation_id: Uuid,
    registered_weight: f64,
    anonymous_weight: f64,
  ) -> impl Future<Output = Result<ReportTally, Self::Error>> + Send + '_;

  /// Lifetime count of reports by one reporter against one annotation.
  fn reports_on_by(
    &self,
    annotation_id: Uuid,
    reporter: ReporterId,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Stamp `threshold_reached_at` on every report of the annotation that
  /// does not have it yet. Idempotent; returns the number of rows newly
  /// stamped.
  fn stamp_threshold_reached(
    &self,
    annotation_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// True if any report for the annotation has reached threshold or been
  /// explicitly escalated — the precondition for community voting.
  fn has_escalated_report(
    &self,
    annotation_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Resolve every `pending`/`escalated` report of the annotation in one
  /// operation, recording the handler (if any) and the action. Returns
  /// the number of reports resolved.
  fn resolve_reports(
    &self,
    annotation_id: Uuid,
    handled_by: Option<Uuid>,
    action: Verdict,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Votes ─────────────────────────────────────────────────────────────

  /// Insert a vote. Returns `None` when the `(annotation, voter)` unique
  /// constraint rejects a duplicate.
  fn insert_vote(
    &self,
    input: NewVote,
  ) -> impl Future<Output = Result<Option<Vote>, Self::Error>> + Send + '_;

  fn vote_tally(
    &self,
    annotation_id: Uuid,
  ) -> impl Future<Output = Result<VoteTally, Self::Error>> + Send + '_;

  /// Distinct voters on an annotation, in voting order.
  fn voters(
    &self,
    annotation_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  // ── Rate counters ─────────────────────────────────────────────────────

  /// Fixed-window admission counter for `key`. If the window has
  /// expired, reset the count to 1 and allow; otherwise allow while the
  /// count stays within `limit`, and deny (without further increment)
  /// beyond it. `now` is passed in so windows are testable.
  fn bump_rate_counter(
    &self,
    key: String,
    limit: u32,
    window_secs: i64,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete counters whose window ended before `now`. Returns the number
  /// of rows purged (reconciliation sweep).
  fn purge_expired_rate_counters(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use stet_core::{
  actor::{Role, UserState},
  annotation::{Anchor, AnnotationStatus, NewAnnotation, Visibility},
  book::{AnnotationPolicy, Book},
  report::{NewReport, ReporterId, Verdict},
  reputation::ScoreReason,
  sanction::{NewSanction, SanctionKind},
  store::ModerationStore,
  vote::NewVote,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn seed_user(s: &SqliteStore, role: Role) -> Uuid {
  let id = Uuid::new_v4();
  s.upsert_user(UserState::new(id, role, Utc::now()))
    .await
    .unwrap();
  id
}

async fn seed_book(s: &SqliteStore, owner_id: Uuid) -> Uuid {
  let id = Uuid::new_v4();
  s.upsert_book(Book {
    book_id: id,
    owner_id,
    policy: AnnotationPolicy::Enabled,
    created_at: Utc::now(),
  })
  .await
  .unwrap();
  id
}

fn anchor() -> Anchor {
  Anchor {
    chapter_id:      Uuid::new_v4(),
    paragraph_index: 3,
    sentence_index:  1,
    sentence_hash:   "9f2c".into(),
  }
}

async fn seed_annotation(s: &SqliteStore, book_id: Uuid, author_id: Uuid) -> Uuid {
  s.insert_annotation(NewAnnotation {
    book_id,
    author_id,
    anchor: anchor(),
    visibility: Visibility::Public,
  })
  .await
  .unwrap()
  .annotation_id
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_and_get_user() {
  let s = store().await;
  let id = seed_user(&s, Role::Admin).await;

  let user = s.get_user(id).await.unwrap().unwrap();
  assert_eq!(user.user_id, id);
  assert_eq!(user.role, Role::Admin);
  assert_eq!(user.violation_count, 0);
  assert!(!user.is_banned());
}

#[tokio::test]
async fn get_user_missing_returns_none() {
  let s = store().await;
  assert!(s.get_user(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn increment_violation_returns_running_count() {
  let s = store().await;
  let id = seed_user(&s, Role::Editor).await;

  assert_eq!(s.increment_violation(id).await.unwrap(), 1);
  assert_eq!(s.increment_violation(id).await.unwrap(), 2);

  let user = s.get_user(id).await.unwrap().unwrap();
  assert_eq!(user.violation_count, 2);
  assert!(user.last_violation_at.is_some());
}

#[tokio::test]
async fn mute_and_ban_round_trip() {
  let s = store().await;
  let id = seed_user(&s, Role::Editor).await;
  let now = Utc::now();

  s.set_muted_until(id, now + Duration::days(1)).await.unwrap();
  let user = s.get_user(id).await.unwrap().unwrap();
  assert!(user.is_muted(now));

  s.set_banned_at(id, now).await.unwrap();
  let user = s.get_user(id).await.unwrap().unwrap();
  assert!(user.is_banned());
}

// ─── Reputation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn score_delta_appends_ledger_and_updates_score() {
  let s = store().await;
  let id = seed_user(&s, Role::Editor).await;

  let score = s
    .apply_score_delta(id, 0.1, ScoreReason::VoteContribution, None, None)
    .await
    .unwrap();
  assert!((score - 0.1).abs() < f64::EPSILON);

  let entries = s.score_entries(id).await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].reason, ScoreReason::VoteContribution);
}

#[tokio::test]
async fn score_clamps_at_both_bounds() {
  let s = store().await;
  let id = seed_user(&s, Role::Editor).await;

  s.apply_score_delta(id, 150.0, ScoreReason::HandleReport, None, None)
    .await
    .unwrap();
  let score = s
    .apply_score_delta(id, 0.1, ScoreReason::VoteContribution, None, None)
    .await
    .unwrap();
  assert_eq!(score, 100.0);

  let score = s
    .apply_score_delta(id, -500.0, ScoreReason::HandleReport, None, None)
    .await
    .unwrap();
  assert_eq!(score, -100.0);
  let score = s
    .apply_score_delta(id, -0.1, ScoreReason::HandleReport, None, None)
    .await
    .unwrap();
  assert_eq!(score, -100.0);
}

#[tokio::test]
async fn leaderboard_orders_by_score() {
  let s = store().await;
  let low = seed_user(&s, Role::Editor).await;
  let high = seed_user(&s, Role::Editor).await;

  s.apply_score_delta(high, 5.0, ScoreReason::HandleReport, None, None)
    .await
    .unwrap();
  s.apply_score_delta(low, 1.0, ScoreReason::HandleReport, None, None)
    .await
    .unwrap();

  let rows = s.leaderboard(10).await.unwrap();
  assert_eq!(rows[0].user_id, high);
  assert!(rows[0].score > rows[1].score);
}

// ─── Sanctions ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn sanction_round_trip() {
  let s = store().await;
  let id = seed_user(&s, Role::Editor).await;
  let ends = Utc::now() + Duration::days(1);

  s.insert_sanction(NewSanction {
    user_id:          id,
    kind:             SanctionKind::Mute,
    violation_count:  2,
    duration_minutes: Some(1440),
    ends_at:          Some(ends),
    annotation_id:    None,
  })
  .await
  .unwrap();

  let sanctions = s.sanctions_for(id).await.unwrap();
  assert_eq!(sanctions.len(), 1);
  assert_eq!(sanctions[0].kind, SanctionKind::Mute);
  assert_eq!(sanctions[0].duration_minutes, Some(1440));
  assert!(sanctions[0].ends_at.is_some());
}

// ─── Annotations ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_annotation_starts_normal() {
  let s = store().await;
  let author = seed_user(&s, Role::Editor).await;
  let book = seed_book(&s, author).await;
  let id = seed_annotation(&s, book, author).await;

  let anno = s.get_annotation(id).await.unwrap().unwrap();
  assert_eq!(anno.status, AnnotationStatus::Normal);
  assert_eq!(anno.author_id, author);
  assert_eq!(anno.anchor.paragraph_index, 3);
}

#[tokio::test]
async fn transition_is_conditional() {
  let s = store().await;
  let author = seed_user(&s, Role::Editor).await;
  let book = seed_book(&s, author).await;
  let id = seed_annotation(&s, book, author).await;

  // Wrong expected status: no change.
  let changed = s
    .transition_annotation(id, AnnotationStatus::Contested, AnnotationStatus::Removed)
    .await
    .unwrap();
  assert!(!changed);

  // Correct expected status: transition succeeds.
  let changed = s
    .transition_annotation(id, AnnotationStatus::Normal, AnnotationStatus::Contested)
    .await
    .unwrap();
  assert!(changed);

  // Second identical CAS loses: the status already moved.
  let changed = s
    .transition_annotation(id, AnnotationStatus::Normal, AnnotationStatus::Contested)
    .await
    .unwrap();
  assert!(!changed);

  let anno = s.get_annotation(id).await.unwrap().unwrap();
  assert_eq!(anno.status, AnnotationStatus::Contested);
}

#[tokio::test]
async fn contested_annotations_lists_only_contested() {
  let s = store().await;
  let author = seed_user(&s, Role::Editor).await;
  let book = seed_book(&s, author).await;
  let a = seed_annotation(&s, book, author).await;
  let _b = seed_annotation(&s, book, author).await;

  s.transition_annotation(a, AnnotationStatus::Normal, AnnotationStatus::Contested)
    .await
    .unwrap();

  assert_eq!(s.contested_annotations().await.unwrap(), vec![a]);
}

// ─── Reports ─────────────────────────────────────────────────────────────────

async fn seed_report(
  s: &SqliteStore,
  annotation_id: Uuid,
  book_id: Uuid,
  reporter: ReporterId,
  reason: &str,
) -> Uuid {
  s.insert_report(NewReport {
    annotation_id,
    book_id,
    reporter,
    reason: reason.into(),
  })
  .await
  .unwrap()
  .report_id
}

#[tokio::test]
async fn report_round_trip() {
  let s = store().await;
  let author = seed_user(&s, Role::Editor).await;
  let reporter = seed_user(&s, Role::Editor).await;
  let book = seed_book(&s, author).await;
  let anno = seed_annotation(&s, book, author).await;

  let id = seed_report(
    &s,
    anno,
    book,
    ReporterId::User(reporter),
    "spam links to a storefront",
  )
  .await;

  let report = s.get_report(id).await.unwrap().unwrap();
  assert_eq!(report.reporter, ReporterId::User(reporter));
  assert!(report.threshold_reached_at.is_none());
  assert!(report.handled_by.is_none());
}

#[tokio::test]
async fn tally_weights_registered_and_anonymous_differently() {
  let s = store().await;
  let author = seed_user(&s, Role::Editor).await;
  let book = seed_book(&s, author).await;
  let anno = seed_annotation(&s, book, author).await;

  for i in 0..2 {
    let r = seed_user(&s, Role::Editor).await;
    seed_report(&s, anno, book, ReporterId::User(r), &format!("registered reason {i}")).await;
  }
  for i in 0..5 {
    seed_report(
      &s,
      anno,
      book,
      ReporterId::Anonymous(format!("fp{i}")),
      &format!("anonymous reason {i}"),
    )
    .await;
  }

  let tally = s.pending_report_tally(anno, 1.0, 0.2).await.unwrap();
  assert_eq!(tally.registered, 2);
  assert!((tally.effective_weight - 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn resolved_reports_leave_the_pending_tally() {
  let s = store().await;
  let author = seed_user(&s, Role::Editor).await;
  let reporter = seed_user(&s, Role::Editor).await;
  let book = seed_book(&s, author).await;
  let anno = seed_annotation(&s, book, author).await;

  seed_report(&s, anno, book, ReporterId::User(reporter), "first wave reason").await;
  s.resolve_reports(anno, None, Verdict::Keep).await.unwrap();

  let tally = s.pending_report_tally(anno, 1.0, 0.2).await.unwrap();
  assert_eq!(tally.registered, 0);
  assert_eq!(tally.effective_weight, 0.0);
}

#[tokio::test]
async fn stamp_threshold_is_idempotent() {
  let s = store().await;
  let author = seed_user(&s, Role::Editor).await;
  let reporter = seed_user(&s, Role::Editor).await;
  let book = seed_book(&s, author).await;
  let anno = seed_annotation(&s, book, author).await;

  seed_report(&s, anno, book, ReporterId::User(reporter), "reason one here").await;
  seed_report(
    &s,
    anno,
    book,
    ReporterId::Anonymous("fp".into()),
    "another different reason",
  )
  .await;

  assert_eq!(s.stamp_threshold_reached(anno).await.unwrap(), 2);
  // Second sweep finds nothing left to stamp.
  assert_eq!(s.stamp_threshold_reached(anno).await.unwrap(), 0);
  assert!(s.has_escalated_report(anno).await.unwrap());
}

#[tokio::test]
async fn per_reporter_counts() {
  let s = store().await;
  let author = seed_user(&s, Role::Editor).await;
  let reporter = seed_user(&s, Role::Editor).await;
  let book = seed_book(&s, author).await;
  let anno = seed_annotation(&s, book, author).await;
  let other = seed_annotation(&s, book, author).await;

  seed_report(&s, anno, book, ReporterId::User(reporter), "reason number one").await;
  seed_report(&s, other, book, ReporterId::User(reporter), "reason number two").await;

  assert_eq!(
    s.reports_on_by(anno, ReporterId::User(reporter)).await.unwrap(),
    1
  );
  assert_eq!(
    s.reports_on_by(other, ReporterId::User(reporter)).await.unwrap(),
    1
  );
  assert_eq!(
    s.reports_on_by(anno, ReporterId::Anonymous("fp".into()))
      .await
      .unwrap(),
    0
  );
}

#[tokio::test]
async fn resolve_reports_records_handler() {
  let s = store().await;
  let author = seed_user(&s, Role::Editor).await;
  let reporter = seed_user(&s, Role::Editor).await;
  let handler = seed_user(&s, Role::Admin).await;
  let book = seed_book(&s, author).await;
  let anno = seed_annotation(&s, book, author).await;

  let report_id =
    seed_report(&s, anno, book, ReporterId::User(reporter), "violates the rules").await;

  let n = s
    .resolve_reports(anno, Some(handler), Verdict::Remove)
    .await
    .unwrap();
  assert_eq!(n, 1);

  let report = s.get_report(report_id).await.unwrap().unwrap();
  assert_eq!(report.handled_by, Some(handler));
  assert_eq!(report.handler_action, Some(Verdict::Remove));
  assert!(report.handled_at.is_some());

  // Already resolved: a second sweep touches nothing.
  let n = s
    .resolve_reports(anno, Some(handler), Verdict::Remove)
    .await
    .unwrap();
  assert_eq!(n, 0);
}

// ─── Votes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_vote_rejected_by_unique_constraint() {
  let s = store().await;
  let author = seed_user(&s, Role::Editor).await;
  let voter = seed_user(&s, Role::Editor).await;
  let book = seed_book(&s, author).await;
  let anno = seed_annotation(&s, book, author).await;

  let first = s
    .insert_vote(NewVote {
      annotation_id: anno,
      voter_id:      voter,
      choice:        Verdict::Remove,
      reason:        None,
    })
    .await
    .unwrap();
  assert!(first.is_some());

  let second = s
    .insert_vote(NewVote {
      annotation_id: anno,
      voter_id:      voter,
      choice:        Verdict::Keep,
      reason:        Some("changed my mind".into()),
    })
    .await
    .unwrap();
  assert!(second.is_none());

  let tally = s.vote_tally(anno).await.unwrap();
  assert_eq!(tally.total, 1);
  assert_eq!(tally.remove, 1);
}

#[tokio::test]
async fn vote_tally_and_voters() {
  let s = store().await;
  let author = seed_user(&s, Role::Editor).await;
  let book = seed_book(&s, author).await;
  let anno = seed_annotation(&s, book, author).await;

  let mut expected = Vec::new();
  for i in 0..4 {
    let voter = seed_user(&s, Role::Editor).await;
    expected.push(voter);
    let choice = if i < 3 { Verdict::Remove } else { Verdict::Keep };
    s.insert_vote(NewVote {
      annotation_id: anno,
      voter_id:      voter,
      choice,
      reason:        None,
    })
    .await
    .unwrap();
  }

  let tally = s.vote_tally(anno).await.unwrap();
  assert_eq!(tally.total, 4);
  assert_eq!(tally.remove, 3);
  assert_eq!(tally.keep, 1);

  let mut voters = s.voters(anno).await.unwrap();
  voters.sort();
  expected.sort();
  assert_eq!(voters, expected);
}

// ─── Rate counters ───────────────────────────────────────────────────────────

#[tokio::test]
async fn rate_counter_allows_up_to_limit() {
  let s = store().await;
  let now = Utc::now();

  for _ in 0..3 {
    assert!(
      s.bump_rate_counter("k".into(), 3, 3600, now).await.unwrap()
    );
  }
  // Fourth in the same window: denied.
  assert!(!s.bump_rate_counter("k".into(), 3, 3600, now).await.unwrap());
  // Denials do not consume budget either: still denied, not wrapped.
  assert!(!s.bump_rate_counter("k".into(), 3, 3600, now).await.unwrap());
}

#[tokio::test]
async fn rate_counter_resets_after_window() {
  let s = store().await;
  let now = Utc::now();

  for _ in 0..2 {
    s.bump_rate_counter("k".into(), 2, 60, now).await.unwrap();
  }
  assert!(!s.bump_rate_counter("k".into(), 2, 60, now).await.unwrap());

  let later = now + Duration::seconds(61);
  assert!(s.bump_rate_counter("k".into(), 2, 60, later).await.unwrap());
}

#[tokio::test]
async fn purge_drops_only_expired_windows() {
  let s = store().await;
  let now = Utc::now();

  s.bump_rate_counter("old".into(), 5, 60, now - Duration::seconds(120))
    .await
    .unwrap();
  s.bump_rate_counter("fresh".into(), 5, 3600, now).await.unwrap();

  assert_eq!(s.purge_expired_rate_counters(now).await.unwrap(), 1);
  assert_eq!(s.purge_expired_rate_counters(now).await.unwrap(), 0);
}

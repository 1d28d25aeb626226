//! Report intake, aggregation, and the escalation threshold.
//!
//! Every accepted report re-tallies the annotation's pending reports.
//! The first tally satisfying both escalation conditions flips the
//! annotation to `Contested` through the conditional status update, so
//! exactly one report observes `escalated = true`.

use serde::Serialize;
use stet_core::{
  annotation::AnnotationStatus,
  book::AnnotationPolicy,
  report::{NewReport, Report, ReporterId, ReportTally},
  similarity,
  store::ModerationStore,
};
use uuid::Uuid;

use crate::{limiter, Engine, EngineResult, Reject};

/// What the reporter gets back: the stored report, the post-insert
/// weighted tally, and whether this report crossed the threshold.
#[derive(Debug, Clone, Serialize)]
pub struct ReportReceipt {
  pub report:    Report,
  pub tally:     ReportTally,
  /// True only for the single report whose tally first crossed both
  /// escalation conditions.
  pub escalated: bool,
}

impl<S: ModerationStore> Engine<S> {
  /// File a report against an annotation.
  ///
  /// Gates, in order: reason length, reporter enforcement state,
  /// annotation existence and status, book policy, self-report,
  /// per-annotation lifetime cap, hourly rate limit, and near-duplicate
  /// reason similarity. Anything surviving all of them is stored and
  /// tallied.
  pub async fn submit_report(
    &self,
    reporter: ReporterId,
    annotation_id: Uuid,
    reason: &str,
  ) -> EngineResult<ReportReceipt> {
    let now = chrono::Utc::now();
    let reason = reason.trim();
    let chars = reason.chars().count();
    if chars < self.policy.reason_min_chars {
      return Err(Reject::Validation("reason_too_short"));
    }
    if chars > self.policy.reason_max_chars {
      return Err(Reject::Validation("reason_too_long"));
    }

    if let Some(user_id) = reporter.user_id() {
      let user = self
        .load_actor(user_id)
        .await?
        .ok_or(Reject::NotFound("reporter"))?;
      if user.is_banned() {
        return Err(Reject::Enforcement("banned"));
      }
      if user.is_muted(now) {
        return Err(Reject::Enforcement("muted"));
      }
    }

    let annotation = self.annotation(annotation_id).await?;
    if annotation.status.is_terminal() {
      return Err(Reject::Conflict("already_removed"));
    }

    let book = self
      .store
      .get_book(annotation.book_id)
      .await
      .map_err(Reject::store)?
      .ok_or(Reject::NotFound("book"))?;
    if book.policy == AnnotationPolicy::Locked {
      return Err(Reject::Permission("annotations_locked"));
    }

    if reporter.user_id() == Some(annotation.author_id) {
      return Err(Reject::Permission("self_report"));
    }

    let prior = self
      .store
      .reports_on_by(annotation_id, reporter.clone())
      .await
      .map_err(Reject::store)?;
    if prior >= self.policy.per_annotation_report_cap {
      return Err(Reject::Conflict("report_cap"));
    }

    let (key, rate) = match &reporter {
      ReporterId::User(id) => {
        (format!("report:user:{id}"), self.policy.report_rate_registered)
      }
      ReporterId::Anonymous(fp) => {
        (format!("report:anon:{fp}"), self.policy.report_rate_anonymous)
      }
    };
    limiter::admit(&self.store, key, rate, now, "report_rate").await?;

    let existing = self
      .store
      .report_reasons(annotation_id)
      .await
      .map_err(Reject::store)?;
    let duplicate = existing.iter().any(|prior_reason| {
      similarity::similarity(prior_reason, reason)
        >= self.policy.duplicate_reason_cutoff
    });
    if duplicate {
      return Err(Reject::Conflict("duplicate_reason"));
    }

    let report = self
      .store
      .insert_report(NewReport {
        annotation_id,
        book_id: annotation.book_id,
        reporter,
        reason: reason.to_owned(),
      })
      .await
      .map_err(Reject::store)?;

    let tally = self
      .store
      .pending_report_tally(
        annotation_id,
        self.policy.registered_report_weight,
        self.policy.anonymous_report_weight,
      )
      .await
      .map_err(Reject::store)?;

    let mut escalated = false;
    if tally.crosses(
      self.policy.escalation_weight,
      self.policy.min_registered_reporters,
    ) {
      self
        .store
        .stamp_threshold_reached(annotation_id)
        .await
        .map_err(Reject::store)?;
      escalated = self
        .store
        .transition_annotation(
          annotation_id,
          AnnotationStatus::Normal,
          AnnotationStatus::Contested,
        )
        .await
        .map_err(Reject::store)?;
      if escalated {
        tracing::info!(
          annotation_id = %annotation_id,
          weight = tally.effective_weight,
          registered = tally.registered,
          "annotation contested"
        );
      }
    }

    Ok(ReportReceipt { report, tally, escalated })
  }

  pub async fn report(&self, id: Uuid) -> EngineResult<Report> {
    self
      .store
      .get_report(id)
      .await
      .map_err(Reject::store)?
      .ok_or(Reject::NotFound("report"))
  }
}

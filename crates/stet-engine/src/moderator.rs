//! The moderator resolution path.
//!
//! Book owners and elevated roles can short-circuit the community vote.
//! This path races the vote path on equal terms: both go through the
//! same conditional status transition, so whichever writes first decides
//! the annotation and runs the side-effect sweep.

use serde::Serialize;
use stet_core::{
  actor::{Role, UserState},
  annotation::AnnotationStatus,
  report::{ReportStatus, Verdict},
  reputation::ScoreReason,
  store::ModerationStore,
};
use uuid::Uuid;

use crate::{Engine, EngineResult, Reject};

/// Outcome of a moderator resolution.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReceipt {
  pub report_id:        Uuid,
  pub annotation_id:    Uuid,
  pub action:           Verdict,
  /// How many open reports the sweep closed alongside this one.
  pub reports_resolved: u64,
}

impl<S: ModerationStore> Engine<S> {
  /// Resolve a report (and with it, the annotation's open reports) as a
  /// moderator.
  ///
  /// Permitted to the book's owner and to elevated roles, except that
  /// reports against a super admin's annotation can only be resolved by
  /// another super admin.
  pub async fn resolve_report(
    &self,
    actor: &UserState,
    report_id: Uuid,
    action: Verdict,
  ) -> EngineResult<ResolutionReceipt> {
    if actor.is_banned() {
      return Err(Reject::Enforcement("banned"));
    }

    let report = self.report(report_id).await?;
    if report.status == ReportStatus::Resolved {
      return Err(Reject::Conflict("already_resolved"));
    }

    let annotation = self.annotation(report.annotation_id).await?;
    if annotation.status.is_terminal() {
      return Err(Reject::Conflict("already_removed"));
    }

    let book = self
      .store
      .get_book(annotation.book_id)
      .await
      .map_err(Reject::store)?
      .ok_or(Reject::NotFound("book"))?;
    let is_owner = actor.user_id == book.owner_id;
    if !is_owner && !actor.role.is_elevated() {
      return Err(Reject::Permission("not_moderator"));
    }

    let author = self
      .load_actor(annotation.author_id)
      .await?
      .ok_or(Reject::NotFound("author"))?;
    if author.role == Role::SuperAdmin && actor.role != Role::SuperAdmin {
      return Err(Reject::Permission("shielded_author"));
    }

    // The status write is the linearization point against the vote path.
    match action {
      Verdict::Remove => {
        let won = self
          .store
          .transition_annotation(
            annotation.annotation_id,
            annotation.status,
            AnnotationStatus::Removed,
          )
          .await
          .map_err(Reject::store)?;
        if !won {
          return Err(Reject::Conflict("state_changed"));
        }
      }
      Verdict::Keep => {
        if annotation.status == AnnotationStatus::Contested {
          let won = self
            .store
            .transition_annotation(
              annotation.annotation_id,
              AnnotationStatus::Contested,
              AnnotationStatus::Normal,
            )
            .await
            .map_err(Reject::store)?;
          if !won {
            return Err(Reject::Conflict("state_changed"));
          }
        }
      }
    }

    tracing::info!(
      report_id = %report_id,
      annotation_id = %annotation.annotation_id,
      actor = %actor.user_id,
      action = action.as_str(),
      "report resolved by moderator"
    );

    let reports_resolved = match self
      .store
      .resolve_reports(
        annotation.annotation_id,
        Some(actor.user_id),
        action,
      )
      .await
    {
      Ok(n) => n,
      Err(e) => {
        tracing::warn!(
          annotation_id = %annotation.annotation_id, error = %e,
          "report sweep failed after moderator resolution"
        );
        0
      }
    };

    if action == Verdict::Remove {
      if let Err(e) = crate::punish::apply_punishment(
        &self.store,
        &self.policy,
        annotation.author_id,
        annotation.annotation_id,
      )
      .await
      {
        tracing::warn!(
          author_id = %annotation.author_id, error = %e,
          "punishment failed after removal"
        );
      }
    }

    // The sweep only touches open reports, so a racing resolver that
    // arrived second closed nothing and earns nothing.
    if is_owner && reports_resolved > 0 {
      if let Err(e) = self
        .store
        .apply_score_delta(
          actor.user_id,
          self.policy.handle_report_delta,
          ScoreReason::HandleReport,
          Some(annotation.annotation_id),
          Some(report_id),
        )
        .await
      {
        tracing::warn!(
          user_id = %actor.user_id, error = %e,
          "handle-report grant failed"
        );
      }
    }

    Ok(ResolutionReceipt {
      report_id,
      annotation_id: annotation.annotation_id,
      action,
      reports_resolved,
    })
  }
}

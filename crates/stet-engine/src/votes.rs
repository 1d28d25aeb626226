//! Community voting and the exactly-once resolution step.
//!
//! Any number of concurrent callers may observe a decisive tally; the
//! conditional `Contested -> {Removed, Normal}` transition picks exactly
//! one winner, and only the winner applies the resolution side effects
//! (report sweep, punishment, voter rewards). Losers simply return no
//! outcome. The reconciler calls [`Engine::try_finalize`] too, so a
//! resolution interrupted after the status write still completes its
//! sweep eventually.

use serde::Serialize;
use stet_core::{
  actor::UserState,
  annotation::AnnotationStatus,
  book::AnnotationPolicy,
  report::Verdict,
  reputation::ScoreReason,
  store::ModerationStore,
  vote::{NewVote, Vote, VoteTally},
};
use uuid::Uuid;

use crate::{punish, Engine, EngineResult, Reject};

/// What the voter gets back: the stored vote, the post-insert tally, and
/// the verdict if this vote finalised the annotation.
#[derive(Debug, Clone, Serialize)]
pub struct VoteReceipt {
  pub vote:    Vote,
  pub tally:   VoteTally,
  pub outcome: Option<Verdict>,
}

impl<S: ModerationStore> Engine<S> {
  /// Cast a vote on a contested annotation.
  ///
  /// Only registered users vote, one vote per annotation each, and never
  /// on their own annotations. When the post-insert tally reaches
  /// quorum, resolution is attempted inline.
  pub async fn cast_vote(
    &self,
    voter: &UserState,
    annotation_id: Uuid,
    choice: Verdict,
    reason: Option<String>,
  ) -> EngineResult<VoteReceipt> {
    if voter.is_banned() {
      return Err(Reject::Enforcement("banned"));
    }
    if let Some(r) = &reason {
      if r.chars().count() > self.policy.reason_max_chars {
        return Err(Reject::Validation("reason_too_long"));
      }
    }

    let annotation = self.annotation(annotation_id).await?;
    match annotation.status {
      AnnotationStatus::Contested => {}
      AnnotationStatus::Removed => {
        return Err(Reject::Conflict("already_removed"))
      }
      AnnotationStatus::Normal => return Err(Reject::Conflict("not_contested")),
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

    let escalated = self
      .store
      .has_escalated_report(annotation_id)
      .await
      .map_err(Reject::store)?;
    if !escalated {
      return Err(Reject::Conflict("not_contested"));
    }

    if voter.user_id == annotation.author_id {
      return Err(Reject::Permission("self_vote"));
    }

    let vote = self
      .store
      .insert_vote(NewVote {
        annotation_id,
        voter_id: voter.user_id,
        choice,
        reason,
      })
      .await
      .map_err(Reject::store)?
      .ok_or(Reject::Conflict("already_voted"))?;

    let tally = self
      .store
      .vote_tally(annotation_id)
      .await
      .map_err(Reject::store)?;

    let outcome = if tally.total >= self.policy.vote_quorum {
      self.try_finalize(annotation_id).await?
    } else {
      None
    };

    Ok(VoteReceipt { vote, tally, outcome })
  }

  /// Attempt to resolve one contested annotation from its current vote
  /// tally. Returns the verdict if this call won the status transition,
  /// `None` if the tally is not decisive yet or another resolver won.
  pub async fn try_finalize(
    &self,
    annotation_id: Uuid,
  ) -> EngineResult<Option<Verdict>> {
    let tally = self
      .store
      .vote_tally(annotation_id)
      .await
      .map_err(Reject::store)?;
    let Some(verdict) =
      tally.verdict(self.policy.vote_quorum, self.policy.remove_supermajority)
    else {
      return Ok(None);
    };

    let Some(annotation) = self
      .store
      .get_annotation(annotation_id)
      .await
      .map_err(Reject::store)?
    else {
      return Ok(None);
    };

    let target = match verdict {
      Verdict::Remove => AnnotationStatus::Removed,
      Verdict::Keep => AnnotationStatus::Normal,
    };
    let won = self
      .store
      .transition_annotation(
        annotation_id,
        AnnotationStatus::Contested,
        target,
      )
      .await
      .map_err(Reject::store)?;
    if !won {
      return Ok(None);
    }

    tracing::info!(
      annotation_id = %annotation_id,
      verdict = verdict.as_str(),
      total = tally.total,
      remove = tally.remove,
      "annotation resolved by community vote"
    );
    self
      .finish_resolution(annotation_id, annotation.author_id, None, verdict)
      .await;
    Ok(Some(verdict))
  }

  /// The post-transition sweep, shared by both resolution paths. Each
  /// effect is individually retriable through the reconciler or harmless
  /// to lose, so failures are logged rather than surfaced; the status
  /// write already decided the outcome.
  pub(crate) async fn finish_resolution(
    &self,
    annotation_id: Uuid,
    author_id: Uuid,
    handled_by: Option<Uuid>,
    verdict: Verdict,
  ) {
    if let Err(e) = self
      .store
      .resolve_reports(annotation_id, handled_by, verdict)
      .await
    {
      tracing::warn!(
        annotation_id = %annotation_id, error = %e,
        "report sweep failed after resolution"
      );
    }

    if verdict != Verdict::Remove {
      return;
    }

    if let Err(e) =
      punish::apply_punishment(&self.store, &self.policy, author_id, annotation_id)
        .await
    {
      tracing::warn!(
        author_id = %author_id, error = %e,
        "punishment failed after removal"
      );
    }

    match self.store.voters(annotation_id).await {
      Ok(voters) => {
        for voter_id in voters {
          if let Err(e) = self
            .store
            .apply_score_delta(
              voter_id,
              self.policy.vote_contribution_delta,
              ScoreReason::VoteContribution,
              Some(annotation_id),
              None,
            )
            .await
          {
            tracing::warn!(
              voter_id = %voter_id, error = %e,
              "vote contribution grant failed"
            );
          }
        }
      }
      Err(e) => {
        tracing::warn!(
          annotation_id = %annotation_id, error = %e,
          "voter list unavailable, skipping contribution grants"
        );
      }
    }
  }
}

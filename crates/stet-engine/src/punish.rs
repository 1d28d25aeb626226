//! The punishment ladder.
//!
//! Runs after an annotation is removed, under whichever resolution path
//! won the status transition. Escalation is driven purely by the user's
//! post-increment violation count, so concurrent removals against the
//! same author never hand out the same rung twice.

use chrono::{Duration, Utc};
use stet_core::{
  policy::{LadderStep, Policy},
  sanction::{NewSanction, Sanction, SanctionKind},
  store::ModerationStore,
};
use uuid::Uuid;

/// Increment the author's violation count and record the matching rung
/// of the ladder: warning, timed mute, or permanent ban.
pub(crate) async fn apply_punishment<S: ModerationStore>(
  store: &S,
  policy: &Policy,
  user_id: Uuid,
  annotation_id: Uuid,
) -> Result<Sanction, S::Error> {
  let count = store.increment_violation(user_id).await?;
  let now = Utc::now();

  let sanction = match policy.sanction_for(count) {
    LadderStep::Warning => NewSanction {
      user_id,
      kind: SanctionKind::Warning,
      violation_count: count,
      duration_minutes: None,
      ends_at: None,
      annotation_id: Some(annotation_id),
    },
    LadderStep::Mute { minutes } => {
      let ends_at = now + Duration::minutes(minutes);
      store.set_muted_until(user_id, ends_at).await?;
      NewSanction {
        user_id,
        kind: SanctionKind::Mute,
        violation_count: count,
        duration_minutes: Some(minutes),
        ends_at: Some(ends_at),
        annotation_id: Some(annotation_id),
      }
    }
    LadderStep::Ban => {
      store.set_banned_at(user_id, now).await?;
      NewSanction {
        user_id,
        kind: SanctionKind::Ban,
        violation_count: count,
        duration_minutes: None,
        ends_at: None,
        annotation_id: Some(annotation_id),
      }
    }
  };

  let recorded = store.insert_sanction(sanction).await?;
  tracing::info!(
    user_id = %user_id,
    kind = recorded.kind.as_str(),
    violation_count = count,
    "sanction recorded"
  );
  Ok(recorded)
}

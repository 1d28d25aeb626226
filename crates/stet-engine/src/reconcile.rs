//! Background reconciliation.
//!
//! A periodic sweep that re-attempts resolution of every contested
//! annotation and purges expired rate counters. This is what makes the
//! inline resolution path crash-safe: if a process dies between the
//! decisive vote and the finalize step, the next sweep picks the
//! annotation up and the conditional transition still fires only once.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use stet_core::store::ModerationStore;

use crate::{Engine, EngineResult, Reject};

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReconcileSummary {
  /// Contested annotations examined.
  pub swept:           usize,
  /// Annotations this pass resolved.
  pub finalized:       usize,
  /// Expired rate counter rows removed.
  pub counters_purged: u64,
}

impl<S: ModerationStore> Engine<S> {
  /// Run one reconciliation pass.
  pub async fn reconcile_once(&self) -> EngineResult<ReconcileSummary> {
    let contested = self
      .store()
      .contested_annotations()
      .await
      .map_err(Reject::store)?;

    let mut summary = ReconcileSummary {
      swept: contested.len(),
      ..Default::default()
    };
    for annotation_id in contested {
      match self.try_finalize(annotation_id).await {
        Ok(Some(_)) => summary.finalized += 1,
        Ok(None) => {}
        Err(e) => {
          tracing::warn!(
            annotation_id = %annotation_id, error = %e,
            "reconcile finalize failed"
          );
        }
      }
    }

    summary.counters_purged = self
      .store()
      .purge_expired_rate_counters(chrono::Utc::now())
      .await
      .map_err(Reject::store)?;

    Ok(summary)
  }
}

/// Drive [`Engine::reconcile_once`] forever on a fixed interval.
/// Spawned as a background task by the server binary.
pub async fn run_reconciler<S: ModerationStore>(
  engine: Arc<Engine<S>>,
  every: Duration,
) {
  let mut ticker = tokio::time::interval(every);
  ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
  loop {
    ticker.tick().await;
    match engine.reconcile_once().await {
      Ok(summary) => {
        if summary.finalized > 0 || summary.counters_purged > 0 {
          tracing::info!(
            swept = summary.swept,
            finalized = summary.finalized,
            counters_purged = summary.counters_purged,
            "reconcile pass complete"
          );
        }
      }
      Err(e) => tracing::warn!(error = %e, "reconcile pass failed"),
    }
  }
}

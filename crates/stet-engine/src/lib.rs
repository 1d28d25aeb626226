//! The Stet moderation engine.
//!
//! Ties admission gates (rate limiting, similarity filtering, enforcement
//! checks), report aggregation, community voting, the moderator
//! resolution path, the punishment ladder, and the reputation ledger
//! together over any [`ModerationStore`] backend.
//!
//! Every operation is an independent request; correctness under
//! concurrent resolvers comes from the store's conditional updates, not
//! from in-process locking. See [`votes`] for the exactly-once
//! resolution step.

pub mod annotations;
pub mod error;
pub mod moderator;
pub mod reconcile;
pub mod reports;
pub mod reputation;
pub mod votes;

mod limiter;
mod punish;


use stet_core::{actor::UserState, policy::Policy, store::ModerationStore};
use uuid::Uuid;

pub use error::{EngineResult, Reject};

/// The moderation engine. Cheap to share behind an `Arc`; holds the
/// store handle and the policy knobs.
pub struct Engine<S> {
  store:  S,
  policy: Policy,
}

impl<S: ModerationStore> Engine<S> {
  pub fn new(store: S, policy: Policy) -> Self { Self { store, policy } }

  pub fn policy(&self) -> &Policy { &self.policy }

  /// Direct store access, for read paths that need no moderation logic.
  pub fn store(&self) -> &S { &self.store }

  /// Resolve a user id to its moderation profile. The identity itself
  /// (session, credentials) is verified upstream; this engine only
  /// consumes the resulting profile.
  pub async fn load_actor(&self, id: Uuid) -> EngineResult<Option<UserState>> {
    self.store.get_user(id).await.map_err(Reject::store)
  }
}

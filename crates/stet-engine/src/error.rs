//! The engine's rejection taxonomy.
//!
//! Every operation returns a typed result; rejections carry a stable
//! reason code and nothing else crosses the boundary. Storage failures
//! are the only variant wrapping an internal error, and the API layer
//! maps them to an opaque 5xx.

use thiserror::Error;

/// Why an operation was refused.
#[derive(Debug, Error)]
pub enum Reject {
  /// Malformed or out-of-range input. Never retried.
  #[error("validation failed: {0}")]
  Validation(&'static str),

  /// The referenced entity does not exist (or is terminally removed).
  #[error("not found: {0}")]
  NotFound(&'static str),

  /// Role, ownership, or self-action violation (including role
  /// shielding and locked annotation policies).
  #[error("permission denied: {0}")]
  Permission(&'static str),

  /// The entity is not in the state the operation expects — duplicate
  /// vote, already-resolved report, annotation already decided. The
  /// caller should refresh and re-derive; the engine never retries.
  #[error("conflict: {0}")]
  Conflict(&'static str),

  /// Admission denied by a rate limit. Retryable after a cooldown.
  #[error("rate limited: {0}")]
  RateLimited(&'static str),

  /// The actor is muted or banned. Terminal for the action.
  #[error("enforcement: {0}")]
  Enforcement(&'static str),

  /// Storage I/O failure.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Reject {
  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// The stable reason code for this rejection.
  pub fn code(&self) -> &'static str {
    match self {
      Self::Validation(c)
      | Self::NotFound(c)
      | Self::Permission(c)
      | Self::Conflict(c)
      | Self::RateLimited(c)
      | Self::Enforcement(c) => c,
      Self::Store(_) => "store_error",
    }
  }
}

pub type EngineResult<T> = std::result::Result<T, Reject>;

//! Fixed-window admission gate over the store's rate counters.
//!
//! Fail-closed: if the counter cannot be read or written, the request is
//! denied rather than admitted. A degraded store must never become an
//! open door for floods.

use chrono::{DateTime, Utc};
use stet_core::{policy::RateLimit, store::ModerationStore};

use crate::{EngineResult, Reject};

/// Admit one action under `rate` for `key`, or reject with `code`.
pub(crate) async fn admit<S: ModerationStore>(
  store: &S,
  key: String,
  rate: RateLimit,
  now: DateTime<Utc>,
  code: &'static str,
) -> EngineResult<()> {
  match store
    .bump_rate_counter(key, rate.limit, rate.window_secs, now)
    .await
  {
    Ok(true) => Ok(()),
    Ok(false) => Err(Reject::RateLimited(code)),
    Err(e) => {
      tracing::warn!(error = %e, code, "rate counter unavailable, denying");
      Err(Reject::RateLimited(code))
    }
  }
}

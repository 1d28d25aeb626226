//! Actor identity — the moderation-relevant slice of a user account.
//!
//! Authentication itself happens upstream; the engine only consumes the
//! resolved role, reputation score, and enforcement state, and writes back
//! the enforcement side effects (violations, mutes, bans).

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Ordered role set. Ordering is load-bearing: role shielding compares
/// the resolver's role against the content author's role.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Editor,
  Admin,
  SuperAdmin,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Editor => "editor",
      Self::Admin => "admin",
      Self::SuperAdmin => "super_admin",
    }
  }

  /// True for roles allowed to resolve reports platform-wide.
  pub fn is_elevated(self) -> bool { self >= Self::Admin }
}

impl FromStr for Role {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "editor" => Ok(Self::Editor),
      "admin" => Ok(Self::Admin),
      "super_admin" => Ok(Self::SuperAdmin),
      other => Err(Error::unknown_token("role", other)),
    }
  }
}

/// Per-user moderation profile. The engine increments `violation_count`
/// and sets `muted_until`/`banned_at`; it never touches credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserState {
  pub user_id:           Uuid,
  pub role:              Role,
  /// Clamped running sum of all score-ledger entries.
  pub score:             f64,
  pub violation_count:   i64,
  pub muted_until:       Option<DateTime<Utc>>,
  pub banned_at:         Option<DateTime<Utc>>,
  pub last_violation_at: Option<DateTime<Utc>>,
  pub created_at:        DateTime<Utc>,
}

impl UserState {
  /// A fresh profile with no history, standard role.
  pub fn new(user_id: Uuid, role: Role, now: DateTime<Utc>) -> Self {
    Self {
      user_id,
      role,
      score: 0.0,
      violation_count: 0,
      muted_until: None,
      banned_at: None,
      last_violation_at: None,
      created_at: now,
    }
  }

  /// Bans never expire unless lifted out-of-band.
  pub fn is_banned(&self) -> bool { self.banned_at.is_some() }

  /// Mutes are timed; enforcement state is derived, not stored.
  pub fn is_muted(&self, now: DateTime<Utc>) -> bool {
    self.muted_until.is_some_and(|until| now < until)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn role_ordering() {
    assert!(Role::SuperAdmin > Role::Admin);
    assert!(Role::Admin > Role::Editor);
    assert!(Role::Admin.is_elevated());
    assert!(!Role::Editor.is_elevated());
  }

  #[test]
  fn mute_expiry_is_derived() {
    let now = Utc::now();
    let mut user = UserState::new(Uuid::new_v4(), Role::Editor, now);
    assert!(!user.is_muted(now));

    user.muted_until = Some(now + chrono::Duration::minutes(10));
    assert!(user.is_muted(now));
    assert!(!user.is_muted(now + chrono::Duration::minutes(11)));
  }
}

//! Sanction — an immutable record of a punishment event.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SanctionKind {
  Warning,
  Mute,
  Ban,
}

impl SanctionKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Warning => "warning",
      Self::Mute => "mute",
      Self::Ban => "ban",
    }
  }
}

impl FromStr for SanctionKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "warning" => Ok(Self::Warning),
      "mute" => Ok(Self::Mute),
      "ban" => Ok(Self::Ban),
      other => Err(Error::unknown_token("sanction kind", other)),
    }
  }
}

/// A punishment record. `duration_minutes`/`ends_at` are set for mutes
/// only; warnings and bans carry neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sanction {
  pub sanction_id:      Uuid,
  pub user_id:          Uuid,
  pub kind:             SanctionKind,
  /// The violation count that triggered this sanction.
  pub violation_count:  i64,
  pub duration_minutes: Option<i64>,
  pub ends_at:          Option<DateTime<Utc>>,
  /// The annotation whose removal triggered the sanction.
  pub annotation_id:    Option<Uuid>,
  pub recorded_at:      DateTime<Utc>,
}

/// Input to [`crate::store::ModerationStore::insert_sanction`].
#[derive(Debug, Clone)]
pub struct NewSanction {
  pub user_id:          Uuid,
  pub kind:             SanctionKind,
  pub violation_count:  i64,
  pub duration_minutes: Option<i64>,
  pub ends_at:          Option<DateTime<Utc>>,
  pub annotation_id:    Option<Uuid>,
}

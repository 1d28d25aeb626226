//! Book — the content-store contract the engine consumes.
//!
//! Books are owned elsewhere; the engine reads only the owner (for the
//! moderator permission check) and the annotation policy flag.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Whether a book currently accepts annotation activity. When `Locked`,
/// the engine refuses creation, reports, and votes for the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationPolicy {
  Enabled,
  Locked,
}

impl AnnotationPolicy {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Enabled => "enabled",
      Self::Locked => "locked",
    }
  }
}

impl FromStr for AnnotationPolicy {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "enabled" => Ok(Self::Enabled),
      "locked" => Ok(Self::Locked),
      other => Err(Error::unknown_token("annotation policy", other)),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
  pub book_id:    Uuid,
  pub owner_id:   Uuid,
  pub policy:     AnnotationPolicy,
  pub created_at: DateTime<Utc>,
}

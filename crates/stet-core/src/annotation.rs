//! Annotation — the content unit under moderation.
//!
//! The annotation text itself lives in external blob storage; the engine
//! only tracks the anchor, ownership, visibility, and moderation status.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Where in a chapter the annotation is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
  pub chapter_id:      Uuid,
  pub paragraph_index: u32,
  pub sentence_index:  u32,
  /// Hash of the anchored sentence, so stale anchors can be detected
  /// after a chapter edit.
  pub sentence_hash:   String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
  Public,
  Private,
}

impl Visibility {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Public => "public",
      Self::Private => "private",
    }
  }
}

impl FromStr for Visibility {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "public" => Ok(Self::Public),
      "private" => Ok(Self::Private),
      other => Err(Error::unknown_token("visibility", other)),
    }
  }
}

/// Moderation status. `Removed` is terminal; a `Normal` annotation can
/// be re-contested by a later wave of reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationStatus {
  Normal,
  Contested,
  Removed,
}

impl AnnotationStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Normal => "normal",
      Self::Contested => "contested",
      Self::Removed => "removed",
    }
  }

  pub fn is_terminal(self) -> bool { matches!(self, Self::Removed) }
}

impl FromStr for AnnotationStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "normal" => Ok(Self::Normal),
      "contested" => Ok(Self::Contested),
      "removed" => Ok(Self::Removed),
      other => Err(Error::unknown_token("annotation status", other)),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
  pub annotation_id: Uuid,
  pub book_id:       Uuid,
  pub author_id:     Uuid,
  pub anchor:        Anchor,
  pub visibility:    Visibility,
  pub status:        AnnotationStatus,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to [`crate::store::ModerationStore::insert_annotation`].
/// Status always starts at `Normal`; timestamps are set by the store.
#[derive(Debug, Clone)]
pub struct NewAnnotation {
  pub book_id:    Uuid,
  pub author_id:  Uuid,
  pub anchor:     Anchor,
  pub visibility: Visibility,
}

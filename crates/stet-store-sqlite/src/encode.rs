//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Enum columns store the `as_str()` token
//! of the corresponding `stet-core` type and are decoded via `FromStr`.

use chrono::{DateTime, Utc};
use stet_core::{
  actor::UserState,
  annotation::{Anchor, Annotation},
  book::Book,
  report::{Report, ReporterId},
  reputation::ScoreEntry,
  sanction::Sanction,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:           String,
  pub role:              String,
  pub score:             f64,
  pub violation_count:   i64,
  pub muted_until:       Option<String>,
  pub banned_at:         Option<String>,
  pub last_violation_at: Option<String>,
  pub created_at:        String,
}

impl RawUser {
  pub fn into_user(self) -> Result<UserState> {
    Ok(UserState {
      user_id:           decode_uuid(&self.user_id)?,
      role:              self.role.parse().map_err(Error::Core)?,
      score:             self.score,
      violation_count:   self.violation_count,
      muted_until:       decode_opt_dt(self.muted_until.as_deref())?,
      banned_at:         decode_opt_dt(self.banned_at.as_deref())?,
      last_violation_at: decode_opt_dt(self.last_violation_at.as_deref())?,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `books` row.
pub struct RawBook {
  pub book_id:    String,
  pub owner_id:   String,
  pub policy:     String,
  pub created_at: String,
}

impl RawBook {
  pub fn into_book(self) -> Result<Book> {
    Ok(Book {
      book_id:    decode_uuid(&self.book_id)?,
      owner_id:   decode_uuid(&self.owner_id)?,
      policy:     self.policy.parse().map_err(Error::Core)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `annotations` row.
pub struct RawAnnotation {
  pub annotation_id:   String,
  pub book_id:         String,
  pub author_id:       String,
  pub chapter_id:      String,
  pub paragraph_index: i64,
  pub sentence_index:  i64,
  pub sentence_hash:   String,
  pub visibility:      String,
  pub status:          String,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawAnnotation {
  pub fn into_annotation(self) -> Result<Annotation> {
    Ok(Annotation {
      annotation_id: decode_uuid(&self.annotation_id)?,
      book_id:       decode_uuid(&self.book_id)?,
      author_id:     decode_uuid(&self.author_id)?,
      anchor:        Anchor {
        chapter_id:      decode_uuid(&self.chapter_id)?,
        paragraph_index: self.paragraph_index as u32,
        sentence_index:  self.sentence_index as u32,
        sentence_hash:   self.sentence_hash,
      },
      visibility:    self.visibility.parse().map_err(Error::Core)?,
      status:        self.status.parse().map_err(Error::Core)?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `reports` row.
pub struct RawReport {
  pub report_id:            String,
  pub annotation_id:        String,
  pub book_id:              String,
  pub reporter_id:          Option<String>,
  pub reporter_fingerprint: Option<String>,
  pub reason:               String,
  pub status:               String,
  pub threshold_reached_at: Option<String>,
  pub handled_by:           Option<String>,
  pub handler_action:       Option<String>,
  pub handled_at:           Option<String>,
  pub created_at:           String,
}

impl RawReport {
  pub fn into_report(self) -> Result<Report> {
    let reporter = match (self.reporter_id, self.reporter_fingerprint) {
      (Some(id), _) => ReporterId::User(decode_uuid(&id)?),
      (None, Some(fp)) => ReporterId::Anonymous(fp),
      // The schema CHECK constraint makes this unreachable.
      (None, None) => {
        return Err(Error::Core(stet_core::Error::unknown_token(
          "reporter", "<none>",
        )));
      }
    };

    Ok(Report {
      report_id:            decode_uuid(&self.report_id)?,
      annotation_id:        decode_uuid(&self.annotation_id)?,
      book_id:              decode_uuid(&self.book_id)?,
      reporter,
      reason:               self.reason,
      status:               self.status.parse().map_err(Error::Core)?,
      threshold_reached_at: decode_opt_dt(
        self.threshold_reached_at.as_deref(),
      )?,
      handled_by:           decode_opt_uuid(self.handled_by.as_deref())?,
      handler_action:       self
        .handler_action
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(Error::Core)?,
      handled_at:           decode_opt_dt(self.handled_at.as_deref())?,
      created_at:           decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `score_entries` row.
pub struct RawScoreEntry {
  pub entry_id:      String,
  pub user_id:       String,
  pub delta:         f64,
  pub reason:        String,
  pub annotation_id: Option<String>,
  pub report_id:     Option<String>,
  pub recorded_at:   String,
}

impl RawScoreEntry {
  pub fn into_entry(self) -> Result<ScoreEntry> {
    Ok(ScoreEntry {
      entry_id:      decode_uuid(&self.entry_id)?,
      user_id:       decode_uuid(&self.user_id)?,
      delta:         self.delta,
      reason:        self.reason.parse().map_err(Error::Core)?,
      annotation_id: decode_opt_uuid(self.annotation_id.as_deref())?,
      report_id:     decode_opt_uuid(self.report_id.as_deref())?,
      recorded_at:   decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw strings read directly from a `sanctions` row.
pub struct RawSanction {
  pub sanction_id:      String,
  pub user_id:          String,
  pub kind:             String,
  pub violation_count:  i64,
  pub duration_minutes: Option<i64>,
  pub ends_at:          Option<String>,
  pub annotation_id:    Option<String>,
  pub recorded_at:      String,
}

impl RawSanction {
  pub fn into_sanction(self) -> Result<Sanction> {
    Ok(Sanction {
      sanction_id:      decode_uuid(&self.sanction_id)?,
      user_id:          decode_uuid(&self.user_id)?,
      kind:             self.kind.parse().map_err(Error::Core)?,
      violation_count:  self.violation_count,
      duration_minutes: self.duration_minutes,
      ends_at:          decode_opt_dt(self.ends_at.as_deref())?,
      annotation_id:    decode_opt_uuid(self.annotation_id.as_deref())?,
      recorded_at:      decode_dt(&self.recorded_at)?,
    })
  }
}

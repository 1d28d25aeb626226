//! [`SqliteStore`] — the SQLite implementation of [`ModerationStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use stet_core::{
  actor::UserState,
  annotation::{Annotation, AnnotationStatus, NewAnnotation},
  book::Book,
  policy::{SCORE_MAX, SCORE_MIN},
  report::{NewReport, Report, ReporterId, ReportTally, Verdict},
  reputation::{LeaderboardRow, ScoreEntry, ScoreReason},
  sanction::{NewSanction, Sanction},
  store::ModerationStore,
  vote::{NewVote, Vote, VoteTally},
};

use crate::{
  Error, Result,
  encode::{
    RawAnnotation, RawBook, RawReport, RawSanction, RawScoreEntry, RawUser,
    encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Stet moderation store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All
/// statements for one logical operation run inside a single `call`, so
/// they execute back-to-back on the connection's thread without another
/// operation interleaving.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  ///
  /// Schema init is explicit and idempotent; there is no hidden
  /// per-request "ensure schema" latch.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ModerationStore impl ────────────────────────────────────────────────────

impl ModerationStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn upsert_user(&self, user: UserState) -> Result<()> {
    let id_str   = encode_uuid(user.user_id);
    let role     = user.role.as_str().to_owned();
    let muted    = user.muted_until.map(encode_dt);
    let banned   = user.banned_at.map(encode_dt);
    let last_vio = user.last_violation_at.map(encode_dt);
    let created  = encode_dt(user.created_at);
    let score    = user.score;
    let count    = user.violation_count;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             user_id, role, score, violation_count,
             muted_until, banned_at, last_violation_at, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT(user_id) DO UPDATE SET
             role              = excluded.role,
             score             = excluded.score,
             violation_count   = excluded.violation_count,
             muted_until       = excluded.muted_until,
             banned_at         = excluded.banned_at,
             last_violation_at = excluded.last_violation_at",
          rusqlite::params![
            id_str, role, score, count, muted, banned, last_vio, created,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<UserState>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, role, score, violation_count,
                      muted_until, banned_at, last_violation_at, created_at
               FROM users WHERE user_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawUser {
                  user_id:           row.get(0)?,
                  role:              row.get(1)?,
                  score:             row.get(2)?,
                  violation_count:   row.get(3)?,
                  muted_until:       row.get(4)?,
                  banned_at:         row.get(5)?,
                  last_violation_at: row.get(6)?,
                  created_at:        row.get(7)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn increment_violation(&self, id: Uuid) -> Result<i64> {
    let id_str = encode_uuid(id);
    let now_str = encode_dt(Utc::now());

    let count: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users
           SET violation_count = violation_count + 1, last_violation_at = ?2
           WHERE user_id = ?1",
          rusqlite::params![id_str, now_str],
        )?;
        let count = conn.query_row(
          "SELECT violation_count FROM users WHERE user_id = ?1",
          rusqlite::params![id_str],
          |row| row.get(0),
        )?;
        Ok(count)
      })
      .await?;

    Ok(count)
  }

  async fn set_muted_until(&self, id: Uuid, until: DateTime<Utc>) -> Result<()> {
    let id_str = encode_uuid(id);
    let until_str = encode_dt(until);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users SET muted_until = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, until_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn set_banned_at(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users SET banned_at = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Reputation ledger ─────────────────────────────────────────────────────

  async fn apply_score_delta(
    &self,
    user_id: Uuid,
    delta: f64,
    reason: ScoreReason,
    annotation_id: Option<Uuid>,
    report_id: Option<Uuid>,
  ) -> Result<f64> {
    let entry_id_str = encode_uuid(Uuid::new_v4());
    let user_id_str  = encode_uuid(user_id);
    let reason_str   = reason.as_str().to_owned();
    let anno_str     = annotation_id.map(encode_uuid);
    let report_str   = report_id.map(encode_uuid);
    let at_str       = encode_dt(Utc::now());

    let score: f64 = self
      .conn
      .call(move |conn| {
        // Clamped update first; the ledger entry records the requested
        // delta even when the clamp absorbed part of it.
        conn.execute(
          "UPDATE users SET score = MIN(?2, MAX(?3, score + ?4))
           WHERE user_id = ?1",
          rusqlite::params![user_id_str, SCORE_MAX, SCORE_MIN, delta],
        )?;
        conn.execute(
          "INSERT INTO score_entries (
             entry_id, user_id, delta, reason,
             annotation_id, report_id, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            entry_id_str, user_id_str, delta, reason_str,
            anno_str, report_str, at_str,
          ],
        )?;
        let score = conn.query_row(
          "SELECT score FROM users WHERE user_id = ?1",
          rusqlite::params![user_id_str],
          |row| row.get(0),
        )?;
        Ok(score)
      })
      .await?;

    Ok(score)
  }

  async fn score_entries(&self, user_id: Uuid) -> Result<Vec<ScoreEntry>> {
    let user_id_str = encode_uuid(user_id);

    let raws: Vec<RawScoreEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT entry_id, user_id, delta, reason,
                  annotation_id, report_id, recorded_at
           FROM score_entries
           WHERE user_id = ?1
           ORDER BY recorded_at DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_id_str], |row| {
            Ok(RawScoreEntry {
              entry_id:      row.get(0)?,
              user_id:       row.get(1)?,
              delta:         row.get(2)?,
              reason:        row.get(3)?,
              annotation_id: row.get(4)?,
              report_id:     row.get(5)?,
              recorded_at:   row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawScoreEntry::into_entry).collect()
  }

  async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardRow>> {
    let limit_val = limit as i64;

    let rows: Vec<(String, f64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id, score FROM users ORDER BY score DESC LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val], |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(id, score)| {
        Ok(LeaderboardRow { user_id: crate::encode::decode_uuid(&id)?, score })
      })
      .collect()
  }

  // ── Sanctions ─────────────────────────────────────────────────────────────

  async fn insert_sanction(&self, input: NewSanction) -> Result<Sanction> {
    let sanction = Sanction {
      sanction_id:      Uuid::new_v4(),
      user_id:          input.user_id,
      kind:             input.kind,
      violation_count:  input.violation_count,
      duration_minutes: input.duration_minutes,
      ends_at:          input.ends_at,
      annotation_id:    input.annotation_id,
      recorded_at:      Utc::now(),
    };

    let id_str      = encode_uuid(sanction.sanction_id);
    let user_str    = encode_uuid(sanction.user_id);
    let kind_str    = sanction.kind.as_str().to_owned();
    let count       = sanction.violation_count;
    let duration    = sanction.duration_minutes;
    let ends_str    = sanction.ends_at.map(encode_dt);
    let anno_str    = sanction.annotation_id.map(encode_uuid);
    let at_str      = encode_dt(sanction.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sanctions (
             sanction_id, user_id, kind, violation_count,
             duration_minutes, ends_at, annotation_id, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str, user_str, kind_str, count,
            duration, ends_str, anno_str, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(sanction)
  }

  async fn sanctions_for(&self, user_id: Uuid) -> Result<Vec<Sanction>> {
    let user_id_str = encode_uuid(user_id);

    let raws: Vec<RawSanction> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT sanction_id, user_id, kind, violation_count,
                  duration_minutes, ends_at, annotation_id, recorded_at
           FROM sanctions
           WHERE user_id = ?1
           ORDER BY recorded_at DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_id_str], |row| {
            Ok(RawSanction {
              sanction_id:      row.get(0)?,
              user_id:          row.get(1)?,
              kind:             row.get(2)?,
              violation_count:  row.get(3)?,
              duration_minutes: row.get(4)?,
              ends_at:          row.get(5)?,
              annotation_id:    row.get(6)?,
              recorded_at:      row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSanction::into_sanction).collect()
  }

  // ── Books ─────────────────────────────────────────────────────────────────

  async fn upsert_book(&self, book: Book) -> Result<()> {
    let id_str     = encode_uuid(book.book_id);
    let owner_str  = encode_uuid(book.owner_id);
    let policy_str = book.policy.as_str().to_owned();
    let at_str     = encode_dt(book.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO books (book_id, owner_id, policy, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(book_id) DO UPDATE SET
             owner_id = excluded.owner_id,
             policy   = excluded.policy",
          rusqlite::params![id_str, owner_str, policy_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_book(&self, id: Uuid) -> Result<Option<Book>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawBook> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT book_id, owner_id, policy, created_at
               FROM books WHERE book_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawBook {
                  book_id:    row.get(0)?,
                  owner_id:   row.get(1)?,
                  policy:     row.get(2)?,
                  created_at: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawBook::into_book).transpose()
  }

  // ── Annotations ───────────────────────────────────────────────────────────

  async fn insert_annotation(&self, input: NewAnnotation) -> Result<Annotation> {
    let now = Utc::now();
    let annotation = Annotation {
      annotation_id: Uuid::new_v4(),
      book_id:       input.book_id,
      author_id:     input.author_id,
      anchor:        input.anchor,
      visibility:    input.visibility,
      status:        AnnotationStatus::Normal,
      created_at:    now,
      updated_at:    now,
    };

    let id_str      = encode_uuid(annotation.annotation_id);
    let book_str    = encode_uuid(annotation.book_id);
    let author_str  = encode_uuid(annotation.author_id);
    let chapter_str = encode_uuid(annotation.anchor.chapter_id);
    let para        = annotation.anchor.paragraph_index as i64;
    let sent        = annotation.anchor.sentence_index as i64;
    let hash        = annotation.anchor.sentence_hash.clone();
    let vis_str     = annotation.visibility.as_str().to_owned();
    let status_str  = annotation.status.as_str().to_owned();
    let at_str      = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO annotations (
             annotation_id, book_id, author_id, chapter_id,
             paragraph_index, sentence_index, sentence_hash,
             visibility, status, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
          rusqlite::params![
            id_str, book_str, author_str, chapter_str,
            para, sent, hash, vis_str, status_str, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(annotation)
  }

  async fn get_annotation(&self, id: Uuid) -> Result<Option<Annotation>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAnnotation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT annotation_id, book_id, author_id, chapter_id,
                      paragraph_index, sentence_index, sentence_hash,
                      visibility, status, created_at, updated_at
               FROM annotations WHERE annotation_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawAnnotation {
                  annotation_id:   row.get(0)?,
                  book_id:         row.get(1)?,
                  author_id:       row.get(2)?,
                  chapter_id:      row.get(3)?,
                  paragraph_index: row.get(4)?,
                  sentence_index:  row.get(5)?,
                  sentence_hash:   row.get(6)?,
                  visibility:      row.get(7)?,
                  status:          row.get(8)?,
                  created_at:      row.get(9)?,
                  updated_at:      row.get(10)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAnnotation::into_annotation).transpose()
  }

  async fn transition_annotation(
    &self,
    id: Uuid,
    expected: AnnotationStatus,
    to: AnnotationStatus,
  ) -> Result<bool> {
    let id_str       = encode_uuid(id);
    let expected_str = expected.as_str().to_owned();
    let to_str       = to.as_str().to_owned();
    let at_str       = encode_dt(Utc::now());

    let changed: usize = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE annotations SET status = ?3, updated_at = ?4
           WHERE annotation_id = ?1 AND status = ?2",
          rusqlite::params![id_str, expected_str, to_str, at_str],
        )?;
        Ok(n)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn contested_annotations(&self) -> Result<Vec<Uuid>> {
    let ids: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT annotation_id FROM annotations WHERE status = 'contested'",
        )?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    ids.iter().map(|s| crate::encode::decode_uuid(s)).collect()
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn insert_report(&self, input: NewReport) -> Result<Report> {
    let report = Report {
      report_id:            Uuid::new_v4(),
      annotation_id:        input.annotation_id,
      book_id:              input.book_id,
      reporter:             input.reporter,
      reason:               input.reason,
      status:               stet_core::report::ReportStatus::Pending,
      threshold_reached_at: None,
      handled_by:           None,
      handler_action:       None,
      handled_at:           None,
      created_at:           Utc::now(),
    };

    let id_str     = encode_uuid(report.report_id);
    let anno_str   = encode_uuid(report.annotation_id);
    let book_str   = encode_uuid(report.book_id);
    let (user_str, fp_str) = match &report.reporter {
      ReporterId::User(id) => (Some(encode_uuid(*id)), None),
      ReporterId::Anonymous(fp) => (None, Some(fp.clone())),
    };
    let reason     = report.reason.clone();
    let status_str = report.status.as_str().to_owned();
    let at_str     = encode_dt(report.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO reports (
             report_id, annotation_id, book_id,
             reporter_id, reporter_fingerprint,
             reason, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str, anno_str, book_str, user_str, fp_str,
            reason, status_str, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(report)
  }

  async fn get_report(&self, id: Uuid) -> Result<Option<Report>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawReport> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT report_id, annotation_id, book_id,
                      reporter_id, reporter_fingerprint, reason, status,
                      threshold_reached_at, handled_by, handler_action,
                      handled_at, created_at
               FROM reports WHERE report_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawReport {
                  report_id:            row.get(0)?,
                  annotation_id:        row.get(1)?,
                  book_id:              row.get(2)?,
                  reporter_id:          row.get(3)?,
                  reporter_fingerprint: row.get(4)?,
                  reason:               row.get(5)?,
                  status:               row.get(6)?,
                  threshold_reached_at: row.get(7)?,
                  handled_by:           row.get(8)?,
                  handler_action:       row.get(9)?,
                  handled_at:           row.get(10)?,
                  created_at:           row.get(11)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReport::into_report).transpose()
  }

  async fn report_reasons(&self, annotation_id: Uuid) -> Result<Vec<String>> {
    let anno_str = encode_uuid(annotation_id);

    let reasons = self
      .conn
      .call(move |conn| {
        let mut stmt = conn
          .prepare("SELECT reason FROM reports WHERE annotation_id = ?1")?;
        let rows = stmt
          .query_map(rusqlite::params![anno_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(reasons)
  }

  async fn pending_report_tally(
    &self,
    annotation_id: Uuid,
    registered_weight: f64,
    anonymous_weight: f64,
  ) -> Result<ReportTally> {
    let anno_str = encode_uuid(annotation_id);

    let (weight, registered): (f64, i64) = self
      .conn
      .call(move |conn| {
        let row = conn.query_row(
          "SELECT
             COALESCE(SUM(CASE WHEN reporter_id IS NOT NULL THEN ?2 ELSE ?3 END), 0),
             COALESCE(SUM(CASE WHEN reporter_id IS NOT NULL THEN 1 ELSE 0 END), 0)
           FROM reports
           WHERE annotation_id = ?1 AND status = 'pending'",
          rusqlite::params![anno_str, registered_weight, anonymous_weight],
          |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(row)
      })
      .await?;

    Ok(ReportTally { effective_weight: weight, registered })
  }

  async fn reports_on_by(
    &self,
    annotation_id: Uuid,
    reporter: ReporterId,
  ) -> Result<i64> {
    let anno_str = encode_uuid(annotation_id);

    let count: i64 = self
      .conn
      .call(move |conn| {
        let count = match &reporter {
          ReporterId::User(id) => conn.query_row(
            "SELECT COUNT(*) FROM reports
             WHERE annotation_id = ?1 AND reporter_id = ?2",
            rusqlite::params![anno_str, encode_uuid(*id)],
            |row| row.get(0),
          )?,
          ReporterId::Anonymous(fp) => conn.query_row(
            "SELECT COUNT(*) FROM reports
             WHERE annotation_id = ?1 AND reporter_fingerprint = ?2",
            rusqlite::params![anno_str, fp],
            |row| row.get(0),
          )?,
        };
        Ok(count)
      })
      .await?;

    Ok(count)
  }

  async fn stamp_threshold_reached(&self, annotation_id: Uuid) -> Result<u64> {
    let anno_str = encode_uuid(annotation_id);
    let at_str = encode_dt(Utc::now());

    let stamped: usize = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE reports SET threshold_reached_at = ?2
           WHERE annotation_id = ?1 AND threshold_reached_at IS NULL",
          rusqlite::params![anno_str, at_str],
        )?;
        Ok(n)
      })
      .await?;

    Ok(stamped as u64)
  }

  async fn has_escalated_report(&self, annotation_id: Uuid) -> Result<bool> {
    let anno_str = encode_uuid(annotation_id);

    let found: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM reports
               WHERE annotation_id = ?1
                 AND (status = 'escalated' OR threshold_reached_at IS NOT NULL)
               LIMIT 1",
              rusqlite::params![anno_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(found.is_some())
  }

  async fn resolve_reports(
    &self,
    annotation_id: Uuid,
    handled_by: Option<Uuid>,
    action: Verdict,
  ) -> Result<u64> {
    let anno_str    = encode_uuid(annotation_id);
    let handler_str = handled_by.map(encode_uuid);
    let action_str  = action.as_str().to_owned();
    let at_str      = encode_dt(Utc::now());

    let resolved: usize = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE reports
           SET status = 'resolved', handled_by = ?2,
               handler_action = ?3, handled_at = ?4
           WHERE annotation_id = ?1 AND status IN ('pending', 'escalated')",
          rusqlite::params![anno_str, handler_str, action_str, at_str],
        )?;
        Ok(n)
      })
      .await?;

    Ok(resolved as u64)
  }

  // ── Votes ─────────────────────────────────────────────────────────────────

  async fn insert_vote(&self, input: NewVote) -> Result<Option<Vote>> {
    let vote = Vote {
      vote_id:       Uuid::new_v4(),
      annotation_id: input.annotation_id,
      voter_id:      input.voter_id,
      choice:        input.choice,
      reason:        input.reason,
      created_at:    Utc::now(),
    };

    let id_str     = encode_uuid(vote.vote_id);
    let anno_str   = encode_uuid(vote.annotation_id);
    let voter_str  = encode_uuid(vote.voter_id);
    let choice_str = vote.choice.as_str().to_owned();
    let reason     = vote.reason.clone();
    let at_str     = encode_dt(vote.created_at);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO votes (
             vote_id, annotation_id, voter_id, choice, reason, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str, anno_str, voter_str, choice_str, reason, at_str,
          ],
        );
        match result {
          Ok(_) => Ok(true),
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
          {
            Ok(false)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(inserted.then_some(vote))
  }

  async fn vote_tally(&self, annotation_id: Uuid) -> Result<VoteTally> {
    let anno_str = encode_uuid(annotation_id);

    let (total, remove, keep): (i64, i64, i64) = self
      .conn
      .call(move |conn| {
        let row = conn.query_row(
          "SELECT
             COUNT(*),
             COALESCE(SUM(CASE WHEN choice = 'remove' THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(CASE WHEN choice = 'keep' THEN 1 ELSE 0 END), 0)
           FROM votes WHERE annotation_id = ?1",
          rusqlite::params![anno_str],
          |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(row)
      })
      .await?;

    Ok(VoteTally { total, remove, keep })
  }

  async fn voters(&self, annotation_id: Uuid) -> Result<Vec<Uuid>> {
    let anno_str = encode_uuid(annotation_id);

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT voter_id FROM votes
           WHERE annotation_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![anno_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    ids.iter().map(|s| crate::encode::decode_uuid(s)).collect()
  }

  // ── Rate counters ─────────────────────────────────────────────────────────

  async fn bump_rate_counter(
    &self,
    key: String,
    limit: u32,
    window_secs: i64,
    now: DateTime<Utc>,
  ) -> Result<bool> {
    let now_ts = now.timestamp();
    let limit = limit as i64;

    let allowed: bool = self
      .conn
      .call(move |conn| {
        let row: Option<(i64, i64)> = conn
          .query_row(
            "SELECT count, window_start FROM rate_counters WHERE key = ?1",
            rusqlite::params![key],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;

        match row {
          None => {
            conn.execute(
              "INSERT INTO rate_counters (key, count, window_start, window_secs)
               VALUES (?1, 1, ?2, ?3)",
              rusqlite::params![key, now_ts, window_secs],
            )?;
            Ok(true)
          }
          Some((_, start)) if now_ts - start >= window_secs => {
            // Window expired: restart it with this admission.
            conn.execute(
              "UPDATE rate_counters
               SET count = 1, window_start = ?2, window_secs = ?3
               WHERE key = ?1",
              rusqlite::params![key, now_ts, window_secs],
            )?;
            Ok(true)
          }
          Some((count, _)) if count < limit => {
            conn.execute(
              "UPDATE rate_counters SET count = count + 1 WHERE key = ?1",
              rusqlite::params![key],
            )?;
            Ok(true)
          }
          // At the limit: deny without touching the counter.
          Some(_) => Ok(false),
        }
      })
      .await?;

    Ok(allowed)
  }

  async fn purge_expired_rate_counters(&self, now: DateTime<Utc>) -> Result<u64> {
    let now_ts = now.timestamp();

    let purged: usize = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM rate_counters WHERE window_start + window_secs <= ?1",
          rusqlite::params![now_ts],
        )?;
        Ok(n)
      })
      .await?;

    Ok(purged as u64)
  }
}

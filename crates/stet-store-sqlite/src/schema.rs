//! SQL schema for the Stet SQLite store.
//!
//! Executed explicitly by [`crate::SqliteStore::open`]; idempotent
//! thanks to `CREATE TABLE IF NOT EXISTS`. Future migrations will be
//! gated on `PRAGMA user_version`.

/// Full schema DDL.
///
/// The `votes` unique index and the status column on `annotations` are
/// load-bearing: duplicate votes must fail at insert, and resolution is
/// a conditional `UPDATE ... WHERE status = ?`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id           TEXT PRIMARY KEY,
    role              TEXT NOT NULL DEFAULT 'editor',  -- 'editor' | 'admin' | 'super_admin'
    score             REAL NOT NULL DEFAULT 0,
    violation_count   INTEGER NOT NULL DEFAULT 0,
    muted_until       TEXT,
    banned_at         TEXT,
    last_violation_at TEXT,
    created_at        TEXT NOT NULL
);

-- Mirrored from the content system; the owner may have no moderation
-- profile yet, so owner_id carries no foreign key.
CREATE TABLE IF NOT EXISTS books (
    book_id    TEXT PRIMARY KEY,
    owner_id   TEXT NOT NULL,
    policy     TEXT NOT NULL DEFAULT 'enabled',        -- 'enabled' | 'locked'
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS annotations (
    annotation_id   TEXT PRIMARY KEY,
    book_id         TEXT NOT NULL REFERENCES books(book_id),
    author_id       TEXT NOT NULL REFERENCES users(user_id),
    chapter_id      TEXT NOT NULL,
    paragraph_index INTEGER NOT NULL,
    sentence_index  INTEGER NOT NULL,
    sentence_hash   TEXT NOT NULL,
    visibility      TEXT NOT NULL DEFAULT 'public',    -- 'public' | 'private'
    status          TEXT NOT NULL DEFAULT 'normal',    -- 'normal' | 'contested' | 'removed'
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

-- Reports are never deleted. Exactly one of reporter_id and
-- reporter_fingerprint is set.
CREATE TABLE IF NOT EXISTS reports (
    report_id            TEXT PRIMARY KEY,
    annotation_id        TEXT NOT NULL REFERENCES annotations(annotation_id),
    book_id              TEXT NOT NULL,
    reporter_id          TEXT,
    reporter_fingerprint TEXT,
    reason               TEXT NOT NULL,
    status               TEXT NOT NULL DEFAULT 'pending',  -- 'pending' | 'escalated' | 'resolved'
    threshold_reached_at TEXT,
    handled_by           TEXT,
    handler_action       TEXT,                             -- 'remove' | 'keep'
    handled_at           TEXT,
    created_at           TEXT NOT NULL,
    CHECK ((reporter_id IS NULL) != (reporter_fingerprint IS NULL))
);

CREATE TABLE IF NOT EXISTS votes (
    vote_id       TEXT PRIMARY KEY,
    annotation_id TEXT NOT NULL REFERENCES annotations(annotation_id),
    voter_id      TEXT NOT NULL REFERENCES users(user_id),
    choice        TEXT NOT NULL,                           -- 'remove' | 'keep'
    reason        TEXT,
    created_at    TEXT NOT NULL,
    UNIQUE (annotation_id, voter_id)
);

-- Append-only reputation ledger.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS score_entries (
    entry_id      TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL REFERENCES users(user_id),
    delta         REAL NOT NULL,
    reason        TEXT NOT NULL,                           -- 'vote_contribution' | 'handle_report'
    annotation_id TEXT,
    report_id     TEXT,
    recorded_at   TEXT NOT NULL
);

-- Append-only punishment log.
CREATE TABLE IF NOT EXISTS sanctions (
    sanction_id      TEXT PRIMARY KEY,
    user_id          TEXT NOT NULL REFERENCES users(user_id),
    kind             TEXT NOT NULL,                        -- 'warning' | 'mute' | 'ban'
    violation_count  INTEGER NOT NULL,
    duration_minutes INTEGER,
    ends_at          TEXT,
    annotation_id    TEXT,
    recorded_at      TEXT NOT NULL
);

-- Fixed-window admission counters. Window start is unix seconds so the
-- expiry arithmetic stays inside SQL-adjacent integer math.
CREATE TABLE IF NOT EXISTS rate_counters (
    key         TEXT PRIMARY KEY,
    count       INTEGER NOT NULL,
    window_start INTEGER NOT NULL,
    window_secs INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS reports_annotation_idx  ON reports(annotation_id);
CREATE INDEX IF NOT EXISTS reports_reporter_idx    ON reports(reporter_id, created_at);
CREATE INDEX IF NOT EXISTS reports_fingerprint_idx ON reports(reporter_fingerprint, created_at);
CREATE INDEX IF NOT EXISTS votes_annotation_idx    ON votes(annotation_id);
CREATE INDEX IF NOT EXISTS score_entries_user_idx  ON score_entries(user_id);
CREATE INDEX IF NOT EXISTS sanctions_user_idx      ON sanctions(user_id);
CREATE INDEX IF NOT EXISTS annotations_status_idx  ON annotations(status);

PRAGMA user_version = 1;
";

//! JSON REST API for Stet.
//!
//! Exposes an axum [`Router`] backed by a [`stet_engine::Engine`] over
//! any [`ModerationStore`]. TLS, sessions, and credential storage are
//! upstream concerns; identity arrives as a pre-verified `x-user-id`
//! header (see [`auth`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", stet_api::api_router(engine.clone()))
//! ```

pub mod annotations;
pub mod auth;
pub mod error;
pub mod reports;
pub mod reputation;
pub mod votes;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use serde::Deserialize;
use stet_core::{policy::Policy, store::ModerationStore};
use stet_engine::Engine;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` with
/// `STET_`-prefixed environment overrides.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                     String,
  #[serde(default = "default_port")]
  pub port:                     u16,
  pub store_path:               PathBuf,
  /// Seconds between reconciliation sweeps.
  #[serde(default = "default_reconcile_interval")]
  pub reconcile_interval_secs:  u64,
  /// Moderation knobs; every omitted field keeps its production default.
  #[serde(default)]
  pub policy:                   Policy,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8527 }
fn default_reconcile_interval() -> u64 { 60 }

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S: ModerationStore> {
  pub engine: Arc<Engine<S>>,
}

impl<S: ModerationStore> Clone for AppState<S> {
  fn clone(&self) -> Self { Self { engine: Arc::clone(&self.engine) } }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router<S>(engine: Arc<Engine<S>>) -> Router<()>
where
  S: ModerationStore + 'static,
{
  Router::new()
    // Annotations
    .route("/annotations", post(annotations::create::<S>))
    .route("/annotations/{id}", get(annotations::get_one::<S>))
    // Reports
    .route("/reports", post(reports::create::<S>))
    .route(
      "/reports/{id}",
      get(reports::get_one::<S>).patch(reports::resolve::<S>),
    )
    // Votes
    .route("/votes", post(votes::create::<S>))
    // Reputation
    .route("/leaderboard", get(reputation::leaderboard::<S>))
    .route("/users/{id}/score", get(reputation::score::<S>))
    .with_state(AppState { engine })
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::{Value, json};
  use stet_core::{
    actor::{Role, UserState},
    book::{AnnotationPolicy, Book},
    policy::Policy,
    store::ModerationStore,
  };
  use stet_engine::Engine;
  use stet_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::api_router;
  use crate::auth::USER_ID_HEADER;

  async fn seed() -> (Router, Arc<Engine<SqliteStore>>) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let engine = Arc::new(Engine::new(store, Policy::default()));
    (api_router(engine.clone()), engine)
  }

  async fn seed_user(engine: &Engine<SqliteStore>, role: Role) -> Uuid {
    let id = Uuid::new_v4();
    engine
      .store()
      .upsert_user(UserState::new(id, role, chrono::Utc::now()))
      .await
      .unwrap();
    id
  }

  async fn seed_book(engine: &Engine<SqliteStore>, owner_id: Uuid) -> Uuid {
    let id = Uuid::new_v4();
    engine
      .store()
      .upsert_book(Book {
        book_id: id,
        owner_id,
        policy: AnnotationPolicy::Enabled,
        created_at: chrono::Utc::now(),
      })
      .await
      .unwrap();
    id
  }

  fn annotation_body(book_id: Uuid) -> Value {
    json!({
      "book_id": book_id,
      "anchor": {
        "chapter_id": Uuid::new_v4(),
        "paragraph_index": 2,
        "sentence_index": 0,
        "sentence_hash": "c0ffee",
      },
    })
  }

  async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<Uuid>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = user {
      builder = builder.header(USER_ID_HEADER, id.to_string());
    }
    let request = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  #[tokio::test]
  async fn annotations_require_identity() {
    let (app, engine) = seed().await;
    let book_id = seed_book(&engine, Uuid::new_v4()).await;

    let (status, body) = send(
      &app,
      "POST",
      "/annotations",
      None,
      Some(annotation_body(book_id)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_identity");
  }

  #[tokio::test]
  async fn unknown_identity_is_unauthorized() {
    let (app, engine) = seed().await;
    let book_id = seed_book(&engine, Uuid::new_v4()).await;

    let (status, body) = send(
      &app,
      "POST",
      "/annotations",
      Some(Uuid::new_v4()),
      Some(annotation_body(book_id)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unknown_user");
  }

  #[tokio::test]
  async fn create_and_fetch_annotation() {
    let (app, engine) = seed().await;
    let author = seed_user(&engine, Role::Editor).await;
    let book_id = seed_book(&engine, Uuid::new_v4()).await;

    let (status, created) = send(
      &app,
      "POST",
      "/annotations",
      Some(author),
      Some(annotation_body(book_id)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "normal");
    assert_eq!(created["author_id"], author.to_string());

    let id = created["annotation_id"].as_str().unwrap();
    let (status, fetched) =
      send(&app, "GET", &format!("/annotations/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["annotation_id"], created["annotation_id"]);
  }

  #[tokio::test]
  async fn anonymous_reports_are_fingerprinted() {
    let (app, engine) = seed().await;
    let author = seed_user(&engine, Role::Editor).await;
    let book_id = seed_book(&engine, Uuid::new_v4()).await;

    let (_, created) = send(
      &app,
      "POST",
      "/annotations",
      Some(author),
      Some(annotation_body(book_id)),
    )
    .await;
    let annotation_id = created["annotation_id"].as_str().unwrap();

    let (status, report) = send(
      &app,
      "POST",
      "/reports",
      None,
      Some(json!({
        "annotation_id": annotation_id,
        "reason": "this spoils a later chapter for new readers",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(report["report"]["reporter"]["kind"], "anonymous");
    assert_eq!(report["escalated"], false);
  }

  #[tokio::test]
  async fn short_report_reasons_are_bad_requests() {
    let (app, engine) = seed().await;
    let author = seed_user(&engine, Role::Editor).await;
    let reporter = seed_user(&engine, Role::Editor).await;
    let book_id = seed_book(&engine, Uuid::new_v4()).await;

    let (_, created) = send(
      &app,
      "POST",
      "/annotations",
      Some(author),
      Some(annotation_body(book_id)),
    )
    .await;
    let annotation_id = created["annotation_id"].as_str().unwrap();

    let (status, body) = send(
      &app,
      "POST",
      "/reports",
      Some(reporter),
      Some(json!({ "annotation_id": annotation_id, "reason": "bad" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "reason_too_short");
  }

  #[tokio::test]
  async fn bystanders_cannot_resolve_reports() {
    let (app, engine) = seed().await;
    let author = seed_user(&engine, Role::Editor).await;
    let reporter = seed_user(&engine, Role::Editor).await;
    let bystander = seed_user(&engine, Role::Editor).await;
    let book_id = seed_book(&engine, Uuid::new_v4()).await;

    let (_, created) = send(
      &app,
      "POST",
      "/annotations",
      Some(author),
      Some(annotation_body(book_id)),
    )
    .await;
    let annotation_id = created["annotation_id"].as_str().unwrap();

    let (_, report) = send(
      &app,
      "POST",
      "/reports",
      Some(reporter),
      Some(json!({
        "annotation_id": annotation_id,
        "reason": "this spoils a later chapter for new readers",
      })),
    )
    .await;
    let report_id = report["report"]["report_id"].as_str().unwrap();

    let (status, body) = send(
      &app,
      "PATCH",
      &format!("/reports/{report_id}"),
      Some(bystander),
      Some(json!({ "action": "keep" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_moderator");
  }

  #[tokio::test]
  async fn owner_resolution_appears_on_the_leaderboard() {
    let (app, engine) = seed().await;
    let owner = seed_user(&engine, Role::Editor).await;
    let author = seed_user(&engine, Role::Editor).await;
    let reporter = seed_user(&engine, Role::Editor).await;
    let book_id = seed_book(&engine, owner).await;

    let (_, created) = send(
      &app,
      "POST",
      "/annotations",
      Some(author),
      Some(annotation_body(book_id)),
    )
    .await;
    let annotation_id = created["annotation_id"].as_str().unwrap();

    let (_, report) = send(
      &app,
      "POST",
      "/reports",
      Some(reporter),
      Some(json!({
        "annotation_id": annotation_id,
        "reason": "this spoils a later chapter for new readers",
      })),
    )
    .await;
    let report_id = report["report"]["report_id"].as_str().unwrap();

    let (status, receipt) = send(
      &app,
      "PATCH",
      &format!("/reports/{report_id}"),
      Some(owner),
      Some(json!({ "action": "keep" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["reports_resolved"], 1);

    let (status, rows) = send(&app, "GET", "/leaderboard", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows[0]["user_id"], owner.to_string());

    let (status, score) = send(
      &app,
      "GET",
      &format!("/users/{owner}/score"),
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(score["entries"][0]["reason"], "handle_report");
  }

  #[tokio::test]
  async fn unknown_user_score_is_not_found() {
    let (app, _) = seed().await;
    let (status, _) = send(
      &app,
      "GET",
      &format!("/users/{}/score", Uuid::new_v4()),
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }
}

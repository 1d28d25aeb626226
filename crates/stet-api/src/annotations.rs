//! Handlers for `/annotations` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/annotations` | Authenticated; body: [`CreateBody`]; 201 + stored annotation |
//! | `GET`  | `/annotations/:id` | Anchor, status, and ownership (not the text) |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use stet_core::{
  annotation::{Anchor, Annotation, NewAnnotation, Visibility},
  store::ModerationStore,
};
use uuid::Uuid;

use crate::{AppState, auth::Identity, error::ApiError};

/// JSON body accepted by `POST /annotations`.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub book_id:    Uuid,
  pub anchor:     Anchor,
  pub visibility: Option<Visibility>,
}

/// `POST /annotations`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Identity(author): Identity,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ModerationStore + 'static,
{
  let annotation = state
    .engine
    .create_annotation(&author, NewAnnotation {
      book_id:    body.book_id,
      author_id:  author.user_id,
      anchor:     body.anchor,
      visibility: body.visibility.unwrap_or(Visibility::Public),
    })
    .await?;
  Ok((StatusCode::CREATED, Json(annotation)))
}

/// `GET /annotations/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Annotation>, ApiError>
where
  S: ModerationStore + 'static,
{
  Ok(Json(state.engine.annotation(id).await?))
}

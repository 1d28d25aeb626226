//! Handler for `POST /votes`.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use stet_core::{report::Verdict, store::ModerationStore};
use uuid::Uuid;

use crate::{AppState, auth::Identity, error::ApiError};

/// JSON body accepted by `POST /votes`.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub annotation_id: Uuid,
  pub choice:        Verdict,
  pub reason:        Option<String>,
}

/// `POST /votes` — returns 201 + the vote receipt; the receipt's
/// `outcome` is set when this vote finalised the annotation.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Identity(voter): Identity,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ModerationStore + 'static,
{
  let receipt = state
    .engine
    .cast_vote(&voter, body.annotation_id, body.choice, body.reason)
    .await?;
  Ok((StatusCode::CREATED, Json(receipt)))
}

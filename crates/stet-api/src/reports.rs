//! Handlers for `/reports` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/reports` | Optional auth; anonymous callers are fingerprinted |
//! | `GET`   | `/reports/:id` | Single report |
//! | `PATCH` | `/reports/:id` | Authenticated; moderator resolution, body: [`ResolveBody`] |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use stet_core::{
  report::{Report, ReporterId, Verdict},
  store::ModerationStore,
};
use stet_engine::moderator::ResolutionReceipt;
use uuid::Uuid;

use crate::{
  AppState,
  auth::{Caller, Identity},
  error::ApiError,
};

/// JSON body accepted by `POST /reports`.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub annotation_id: Uuid,
  pub reason:        String,
}

/// `POST /reports`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ModerationStore + 'static,
{
  let reporter = match caller {
    Caller::User(user) => ReporterId::User(user.user_id),
    Caller::Anonymous(fp) => ReporterId::Anonymous(fp),
  };
  let receipt = state
    .engine
    .submit_report(reporter, body.annotation_id, &body.reason)
    .await?;
  Ok((StatusCode::CREATED, Json(receipt)))
}

/// `GET /reports/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Report>, ApiError>
where
  S: ModerationStore + 'static,
{
  Ok(Json(state.engine.report(id).await?))
}

/// JSON body accepted by `PATCH /reports/:id`.
#[derive(Debug, Deserialize)]
pub struct ResolveBody {
  pub action: Verdict,
}

/// `PATCH /reports/:id` — moderator resolution.
pub async fn resolve<S>(
  State(state): State<AppState<S>>,
  Identity(actor): Identity,
  Path(id): Path<Uuid>,
  Json(body): Json<ResolveBody>,
) -> Result<Json<ResolutionReceipt>, ApiError>
where
  S: ModerationStore + 'static,
{
  let receipt = state.engine.resolve_report(&actor, id, body.action).await?;
  Ok(Json(receipt))
}

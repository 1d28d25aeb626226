//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use stet_engine::Reject;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Identity header missing, malformed, or unknown to the store.
  #[error("unauthorized: {0}")]
  Unauthorized(&'static str),

  #[error(transparent)]
  Reject(#[from] Reject),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code, message) = match &self {
      ApiError::Unauthorized(code) => {
        (StatusCode::UNAUTHORIZED, *code, self.to_string())
      }
      ApiError::Reject(reject) => {
        let status = match reject {
          Reject::Validation(_) => StatusCode::BAD_REQUEST,
          Reject::NotFound(_) => StatusCode::NOT_FOUND,
          Reject::Permission(_) | Reject::Enforcement(_) => {
            StatusCode::FORBIDDEN
          }
          Reject::Conflict(_) => StatusCode::CONFLICT,
          Reject::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
          Reject::Store(e) => {
            tracing::error!(error = %e, "store failure surfaced to API");
            return (
              StatusCode::INTERNAL_SERVER_ERROR,
              Json(json!({ "error": "store_error" })),
            )
              .into_response();
          }
        };
        (status, reject.code(), reject.to_string())
      }
    };
    (status, Json(json!({ "error": code, "message": message })))
      .into_response()
  }
}

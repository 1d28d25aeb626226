//! Caller identity extractors.
//!
//! Authentication happens upstream; requests arrive with an
//! `x-user-id` header already verified by the edge. The extractors here
//! resolve that header to a moderation profile, or, for endpoints that
//! accept anonymous callers, to a network-address fingerprint.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use sha2::{Digest, Sha256};
use stet_core::{actor::UserState, store::ModerationStore};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub const USER_ID_HEADER: &str = "x-user-id";
const FORWARDED_FOR: &str = "x-forwarded-for";

/// A resolved registered caller. Extraction fails with 401 when the
/// header is missing, malformed, or names no stored profile.
pub struct Identity(pub UserState);

/// A caller that may be anonymous. Registered callers resolve exactly
/// as [`Identity`]; the rest are reduced to an address fingerprint.
pub enum Caller {
  User(UserState),
  Anonymous(String),
}

/// Truncated hex SHA-256 of the caller's network address. Enough to key
/// rate counters without storing the address itself.
pub fn fingerprint(address: &str) -> String {
  let digest = Sha256::digest(address.as_bytes());
  hex::encode(&digest[..8])
}

fn header_user_id(headers: &HeaderMap) -> Result<Option<Uuid>, ApiError> {
  let Some(value) = headers.get(USER_ID_HEADER) else {
    return Ok(None);
  };
  value
    .to_str()
    .ok()
    .and_then(|s| s.parse().ok())
    .map(Some)
    .ok_or(ApiError::Unauthorized("malformed_user_id"))
}

fn remote_address(parts: &Parts) -> String {
  // Behind the edge the client address arrives forwarded; a raw socket
  // peer is only seen in direct deployments and tests.
  parts
    .headers
    .get(FORWARDED_FOR)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.split(',').next())
    .map(|v| v.trim().to_owned())
    .or_else(|| {
      parts
        .extensions
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
    })
    .unwrap_or_else(|| "unknown".to_owned())
}

impl<S> FromRequestParts<AppState<S>> for Identity
where
  S: ModerationStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let id = header_user_id(&parts.headers)?
      .ok_or(ApiError::Unauthorized("missing_identity"))?;
    let user = state
      .engine
      .load_actor(id)
      .await?
      .ok_or(ApiError::Unauthorized("unknown_user"))?;
    Ok(Identity(user))
  }
}

impl<S> FromRequestParts<AppState<S>> for Caller
where
  S: ModerationStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    match header_user_id(&parts.headers)? {
      Some(id) => {
        let user = state
          .engine
          .load_actor(id)
          .await?
          .ok_or(ApiError::Unauthorized("unknown_user"))?;
        Ok(Caller::User(user))
      }
      None => Ok(Caller::Anonymous(fingerprint(&remote_address(parts)))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fingerprint_is_stable_and_short() {
    let a = fingerprint("203.0.113.7");
    let b = fingerprint("203.0.113.7");
    assert_eq!(a, b);
    assert_eq!(a.len(), 16);
    assert_ne!(a, fingerprint("203.0.113.8"));
  }
}

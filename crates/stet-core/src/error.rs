//! Error types for `stet-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A stored string token did not match any variant of the named enum.
  #[error("unknown {kind} token: {value:?}")]
  UnknownToken { kind: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub fn unknown_token(kind: &'static str, value: &str) -> Self {
    Self::UnknownToken {
      kind,
      value: value.to_owned(),
    }
  }
}

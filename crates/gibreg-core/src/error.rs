//! Error types for `gibreg-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A required field is missing or a value falls outside the column limits.
  #[error("constraint violation on `{field}`: {reason}")]
  ConstraintViolation {
    field:  &'static str,
    reason: String,
  },
}

impl Error {
  pub(crate) fn violation(field: &'static str, reason: impl Into<String>) -> Self {
    Self::ConstraintViolation { field, reason: reason.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

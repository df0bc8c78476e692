//! Error type for `gibreg-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The observation failed validation before reaching the database.
  #[error(transparent)]
  Core(#[from] gibreg_core::Error),

  /// The database rejected a write through a CHECK, NOT NULL or UNIQUE rule.
  #[error("database constraint violated: {0}")]
  Constraint(String),

  /// The database file could not be opened, or the connection thread is gone.
  #[error("connection failure: {0}")]
  Connection(#[source] tokio_rusqlite::Error),

  #[error("database error: {0}")]
  Database(#[source] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored value does not decode into its domain type.
  #[error("corrupt row: {0}")]
  Decode(String),
}

impl Error {
  /// True for both pre-write validation failures and database-enforced rules.
  pub fn is_constraint_violation(&self) -> bool {
    matches!(
      self,
      Self::Core(gibreg_core::Error::ConstraintViolation { .. }) | Self::Constraint(_)
    )
  }
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(err: tokio_rusqlite::Error) -> Self {
    match err {
      tokio_rusqlite::Error::ConnectionClosed => Self::Connection(err),
      tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
        ref failure,
        ref message,
      )) if failure.code == ErrorCode::ConstraintViolation => Self::Constraint(
        message.clone().unwrap_or_else(|| failure.to_string()),
      ),
      other => Self::Database(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

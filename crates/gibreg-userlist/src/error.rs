//! Error types for the user-list codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid part archive: {0}")]
  Archive(#[from] zip::result::ZipError),

  #[error("part archive contains no files")]
  EmptyArchive,

  #[error("malformed user list XML at byte {position}: {message}")]
  Xml { position: u64, message: String },

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

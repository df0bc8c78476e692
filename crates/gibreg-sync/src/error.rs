//! Error type for `gibreg-sync`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot read {path:?}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("cannot decode part {path:?}: {source}")]
  Part {
    path:   PathBuf,
    #[source]
    source: gibreg_userlist::Error,
  },

  /// The inputs named no part archives at all.
  #[error("no part archives found")]
  NoParts,

  /// The source finished without yielding a single batch.
  #[error("registry source produced no batches; refusing to deactivate")]
  EmptySweep,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("decoding task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

impl Error {
  pub(crate) fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Where a sweep's observations come from.
//!
//! Fetching the user list from the registry is outside this crate; a
//! [`RegistrySource`] only has to hand over decoded batches, one part at a
//! time.

use std::{
  collections::VecDeque,
  future::Future,
  path::{Path, PathBuf},
};

use gibreg_core::entry::Observation;
use gibreg_userlist::SkipCounts;

use crate::{Error, Result};

/// One decoded unit of the remote user list.
#[derive(Debug, Default)]
pub struct SourceBatch {
  /// Human-readable origin, used in logs (e.g. the part file name).
  pub label:        String,
  pub observations: Vec<Observation>,
  pub skipped:      SkipCounts,
}

/// A full listing of the remote registry, delivered in batches.
///
/// A sweep treats the union of all batches as the complete registry. An
/// error from `next_batch` aborts the sweep before anything is deactivated.
pub trait RegistrySource: Send {
  /// The next batch, or `None` once the listing is exhausted.
  fn next_batch(
    &mut self,
  ) -> impl Future<Output = Result<Option<SourceBatch>>> + Send + '_;
}

// ─── Part files on disk ──────────────────────────────────────────────────────

/// Reads user-list part archives that have already been downloaded.
pub struct PartFileSource {
  pending: VecDeque<PathBuf>,
}

impl PartFileSource {
  /// Collect part archives from `inputs`. A directory contributes every
  /// `*.zip` file directly inside it; a file is taken as given. Parts are
  /// processed in lexical path order.
  pub fn from_paths(inputs: &[PathBuf]) -> Result<Self> {
    let mut parts = Vec::new();
    for input in inputs {
      if input.is_dir() {
        parts.extend(zip_files_in(input)?);
      } else {
        parts.push(input.clone());
      }
    }
    if parts.is_empty() {
      return Err(Error::NoParts);
    }
    parts.sort();
    parts.dedup();
    Ok(Self { pending: parts.into() })
  }

  pub fn remaining(&self) -> usize { self.pending.len() }
}

fn zip_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
  let io_err = |source| Error::Io { path: dir.to_path_buf(), source };
  let mut found = Vec::new();
  for entry in std::fs::read_dir(dir).map_err(io_err)? {
    let path = entry.map_err(io_err)?.path();
    let is_zip = path
      .extension()
      .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    if is_zip && path.is_file() {
      found.push(path);
    }
  }
  Ok(found)
}

impl RegistrySource for PartFileSource {
  async fn next_batch(&mut self) -> Result<Option<SourceBatch>> {
    let Some(path) = self.pending.pop_front() else {
      return Ok(None);
    };

    let label = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| path.display().to_string());

    // Decompression and XML parsing are blocking work.
    let part = tokio::task::spawn_blocking(move || {
      let file = std::fs::File::open(&path).map_err(|source| Error::Io {
        path: path.clone(),
        source,
      })?;
      gibreg_userlist::decode_archive(file)
        .map_err(|source| Error::Part { path, source })
    })
    .await??;

    Ok(Some(SourceBatch {
      label,
      observations: part.observations,
      skipped: part.skipped,
    }))
  }
}

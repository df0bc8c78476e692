//! Codec for the published e-document user list.
//!
//! The registry publishes its user list as a series of parts; each part is a
//! zip archive holding one XML document. This crate turns a part into
//! [`Observation`]s ready for the store. Pure synchronous; no network or
//! database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! let file = std::fs::File::open("part-0001.zip").unwrap();
//! let part = gibreg_userlist::decode_archive(file).unwrap();
//! println!("{} observations, {} skipped", part.observations.len(), part.skipped.total());
//! ```

mod archive;
pub mod error;
mod parse;

use std::io::BufRead;

pub use archive::decode_archive;
pub use error::{Error, Result};
use gibreg_core::entry::Observation;

// ─── Public types ────────────────────────────────────────────────────────────

/// The registrations decoded from one part.
#[derive(Debug, Default)]
pub struct DecodedPart {
  pub observations: Vec<Observation>,
  pub skipped:      SkipCounts,
}

/// Items present in the XML that did not yield an observation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SkipCounts {
  /// `User` blocks with a missing or empty `Identifier`.
  pub missing_identifier:      usize,
  /// Identifiers that are neither a 10-digit VKN nor an 11-digit TCKN.
  pub unrecognised_identifier: usize,
  /// Aliases carrying a `DeletionTime`.
  pub deleted_aliases:         usize,
  /// Aliases without a `Name` or `CreationTime`.
  pub incomplete_aliases:      usize,
  /// Aliases whose `CreationTime` could not be parsed.
  pub bad_creation_time:       usize,
}

impl SkipCounts {
  pub fn total(&self) -> usize {
    self.missing_identifier
      + self.unrecognised_identifier
      + self.deleted_aliases
      + self.incomplete_aliases
      + self.bad_creation_time
  }

  pub fn add(&mut self, other: SkipCounts) {
    self.missing_identifier += other.missing_identifier;
    self.unrecognised_identifier += other.unrecognised_identifier;
    self.deleted_aliases += other.deleted_aliases;
    self.incomplete_aliases += other.incomplete_aliases;
    self.bad_creation_time += other.bad_creation_time;
  }
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Decode an uncompressed user-list XML document.
pub fn decode_xml<R: BufRead>(reader: R) -> Result<DecodedPart> {
  parse::parse_user_list(reader)
}

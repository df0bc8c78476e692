//! The `RegistryStore` trait and supporting query types.
//!
//! Implemented by storage backends (e.g. `gibreg-store-sqlite`). The sweep
//! engine and the read API depend on this abstraction, not on a concrete
//! backend.

use std::{collections::HashSet, future::Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{DocumentType, NaturalKey, Observation, RegistryEntry};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`RegistryStore::find_active`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
  pub identifier:       Option<String>,
  pub document_type:    Option<DocumentType>,
  /// Inactive rows are only returned when this is set.
  pub include_inactive: bool,
}

/// Row counts for the whole table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
  pub active: u64,
  pub total:  u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a registry mirror backend.
///
/// The table is append/update-only: rows are created on first observation,
/// refreshed on later ones, and flagged inactive when a sweep no longer sees
/// them. No method deletes a row.
pub trait RegistryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert the observed registration, or refresh the existing row with the
  /// same natural key (`title`, `is_active = true`, `last_synced_at`).
  ///
  /// Atomic per natural key; a concurrent insert of the same key resolves to
  /// an update inside the store. Fails with a constraint violation when the
  /// observation does not validate.
  fn upsert_observation(
    &self,
    observation: Observation,
    observed_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<RegistryEntry, Self::Error>> + Send + '_;

  /// Flag every active entry whose key is not in `seen` as inactive, stamping
  /// `last_synced_at = observed_at`. All-or-nothing; returns the number of
  /// rows deactivated.
  fn deactivate_missing(
    &self,
    observed_at: DateTime<Utc>,
    seen: HashSet<NaturalKey>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Entries matching `filter`, ordered by `id` ascending.
  fn find_active<'a>(
    &'a self,
    filter: &'a EntryFilter,
    limit: usize,
    offset: usize,
  ) -> impl Future<Output = Result<Vec<RegistryEntry>, Self::Error>> + Send + 'a;

  /// Every entry for a subject, active or not, across aliases and document
  /// types.
  fn find_all_by_identifier<'a>(
    &'a self,
    identifier: &'a str,
  ) -> impl Future<Output = Result<Vec<RegistryEntry>, Self::Error>> + Send + 'a;

  fn stats(
    &self,
  ) -> impl Future<Output = Result<StoreStats, Self::Error>> + Send + '_;
}

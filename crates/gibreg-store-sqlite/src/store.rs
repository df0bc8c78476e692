//! [`SqliteStore`], the SQLite implementation of [`RegistryStore`].

use std::{collections::HashSet, path::Path, time::Duration};

use chrono::{DateTime, Utc};
use gibreg_core::{
  entry::{NaturalKey, Observation, RegistryEntry},
  store::{EntryFilter, RegistryStore, StoreStats},
};

use crate::{
  encode::{RawEntry, encode_dt},
  schema::{ENTRY_COLUMNS, SCHEMA},
  Error, Result,
};

/// How long a statement waits on a lock held by another process (e.g. a
/// sweep running while `serve` reads the same file).
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A registry mirror backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(Error::Connection)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(Error::Connection)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── RegistryStore impl ──────────────────────────────────────────────────────

impl RegistryStore for SqliteStore {
  type Error = Error;

  async fn upsert_observation(
    &self,
    observation: Observation,
    observed_at: DateTime<Utc>,
  ) -> Result<RegistryEntry> {
    observation.validate()?;

    let Observation {
      identifier,
      alias,
      title,
      kind,
      document_type,
      first_seen_at,
    } = observation;
    let kind_str       = kind.as_str();
    let doc_type_str   = document_type.as_str();
    let first_seen_str = encode_dt(first_seen_at);
    let observed_str   = encode_dt(observed_at);

    // A conflicting row keeps its id, kind, first_seen_at and created_at.
    let raw: RawEntry = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "INSERT INTO registry_entries (
             identifier, alias, title, kind, document_type,
             first_seen_at, is_active, created_at, last_synced_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)
           ON CONFLICT (identifier, alias, document_type) DO UPDATE SET
             title          = excluded.title,
             is_active      = 1,
             last_synced_at = MAX(registry_entries.created_at, excluded.last_synced_at)
           RETURNING {ENTRY_COLUMNS}"
        );
        Ok(conn.query_row(
          &sql,
          rusqlite::params![
            identifier,
            alias,
            title,
            kind_str,
            doc_type_str,
            first_seen_str,
            observed_str,
          ],
          RawEntry::from_row,
        )?)
      })
      .await?;

    raw.into_entry()
  }

  async fn deactivate_missing(
    &self,
    observed_at: DateTime<Utc>,
    seen: HashSet<NaturalKey>,
  ) -> Result<u64> {
    let observed_str = encode_dt(observed_at);
    let seen_count   = seen.len();

    // The seen set is staged in a temp table so the sweep is one UPDATE
    // driven by the is_active index, all inside a single transaction.
    let deactivated = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute_batch(
          "CREATE TEMP TABLE IF NOT EXISTS seen_keys (
             identifier    TEXT NOT NULL,
             alias         TEXT NOT NULL,
             document_type TEXT NOT NULL,
             PRIMARY KEY (identifier, alias, document_type)
           ) WITHOUT ROWID;
           DELETE FROM temp.seen_keys;",
        )?;
        {
          let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO temp.seen_keys (identifier, alias, document_type)
             VALUES (?1, ?2, ?3)",
          )?;
          for key in &seen {
            stmt.execute(rusqlite::params![
              key.identifier,
              key.alias,
              key.document_type.as_str(),
            ])?;
          }
        }
        let changed = tx.execute(
          "UPDATE registry_entries
              SET is_active = 0,
                  last_synced_at = MAX(created_at, ?1)
            WHERE is_active = 1
              AND NOT EXISTS (
                SELECT 1 FROM temp.seen_keys s
                 WHERE s.identifier    = registry_entries.identifier
                   AND s.alias         = registry_entries.alias
                   AND s.document_type = registry_entries.document_type
              )",
          rusqlite::params![observed_str],
        )?;
        tx.execute("DELETE FROM temp.seen_keys", [])?;
        tx.commit()?;
        Ok(changed as u64)
      })
      .await?;

    tracing::debug!(seen = seen_count, deactivated, "deactivated missing entries");
    Ok(deactivated)
  }

  async fn find_active(
    &self,
    filter: &EntryFilter,
    limit: usize,
    offset: usize,
  ) -> Result<Vec<RegistryEntry>> {
    let identifier       = filter.identifier.clone();
    let doc_type_str     = filter.document_type.map(|d| d.as_str());
    let include_inactive = filter.include_inactive;
    let limit_val        = i64::try_from(limit).unwrap_or(i64::MAX);
    let offset_val       = i64::try_from(offset).unwrap_or(i64::MAX);

    let raws: Vec<RawEntry> = self
      .conn
      .call(move |conn| {
        let mut conds: Vec<&'static str> = vec![];
        if identifier.is_some() {
          conds.push("identifier = ?1");
        }
        if doc_type_str.is_some() {
          conds.push("document_type = ?2");
        }
        if !include_inactive {
          conds.push("is_active = 1");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT {ENTRY_COLUMNS}
           FROM registry_entries
           {where_clause}
           ORDER BY id ASC
           LIMIT ?3 OFFSET ?4"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![identifier, doc_type_str, limit_val, offset_val],
            RawEntry::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntry::into_entry).collect()
  }

  async fn find_all_by_identifier(
    &self,
    identifier: &str,
  ) -> Result<Vec<RegistryEntry>> {
    let identifier = identifier.to_owned();

    let raws: Vec<RawEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ENTRY_COLUMNS}
           FROM registry_entries
           WHERE identifier = ?1
           ORDER BY id ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![identifier], RawEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntry::into_entry).collect()
  }

  async fn stats(&self) -> Result<StoreStats> {
    let (active, total): (i64, i64) = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT COALESCE(SUM(is_active), 0), COUNT(*) FROM registry_entries",
          [],
          |row| Ok((row.get(0)?, row.get(1)?)),
        )?)
      })
      .await?;

    Ok(StoreStats {
      active: active.max(0) as u64,
      total:  total.max(0) as u64,
    })
  }
}

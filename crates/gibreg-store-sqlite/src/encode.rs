//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings with microsecond
//! precision, so string comparison in SQL matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use gibreg_core::entry::{DocumentType, PartyKind, RegistryEntry};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Enumerations ────────────────────────────────────────────────────────────

pub fn decode_kind(s: &str) -> Result<PartyKind> {
  PartyKind::parse(s).map_err(|e| Error::Decode(e.to_string()))
}

pub fn decode_document_type(s: &str) -> Result<DocumentType> {
  DocumentType::parse(s).map_err(|e| Error::Decode(e.to_string()))
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Raw values read directly from a `registry_entries` row, in
/// [`crate::schema::ENTRY_COLUMNS`] order.
pub struct RawEntry {
  pub id:             i64,
  pub identifier:     String,
  pub alias:          String,
  pub title:          Option<String>,
  pub kind:           String,
  pub document_type:  String,
  pub first_seen_at:  String,
  pub is_active:      bool,
  pub created_at:     String,
  pub last_synced_at: String,
}

impl RawEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      identifier:     row.get(1)?,
      alias:          row.get(2)?,
      title:          row.get(3)?,
      kind:           row.get(4)?,
      document_type:  row.get(5)?,
      first_seen_at:  row.get(6)?,
      is_active:      row.get(7)?,
      created_at:     row.get(8)?,
      last_synced_at: row.get(9)?,
    })
  }

  pub fn into_entry(self) -> Result<RegistryEntry> {
    Ok(RegistryEntry {
      id:             self.id,
      identifier:     self.identifier,
      alias:          self.alias,
      title:          self.title,
      kind:           decode_kind(&self.kind)?,
      document_type:  decode_document_type(&self.document_type)?,
      first_seen_at:  decode_dt(&self.first_seen_at)?,
      is_active:      self.is_active,
      created_at:     decode_dt(&self.created_at)?,
      last_synced_at: decode_dt(&self.last_synced_at)?,
    })
  }
}

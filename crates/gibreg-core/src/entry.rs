//! Registry entries: the local mirror of one (subject, alias, document type)
//! registration in the remote user list.
//!
//! Entries are never deleted. A registration that disappears from the remote
//! list is flagged inactive by the next full sweep and keeps its history.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::{Error, Result};

// ─── Column limits ───────────────────────────────────────────────────────────

pub const IDENTIFIER_MAX_LEN: usize = 20;
pub const ALIAS_MAX_LEN: usize = 100;
pub const TITLE_MAX_LEN: usize = 100;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Whether the registered subject is a natural person or a legal entity.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PartyKind {
  PrivatePerson,
  LegalEntity,
}

impl PartyKind {
  /// Infer the kind from the shape of a Turkish identification number:
  /// 11 digits is a citizen number (TCKN), 10 digits a tax number (VKN).
  pub fn from_identifier(identifier: &str) -> Option<Self> {
    if !identifier.bytes().all(|b| b.is_ascii_digit()) {
      return None;
    }
    match identifier.len() {
      11 => Some(Self::PrivatePerson),
      10 => Some(Self::LegalEntity),
      _ => None,
    }
  }

  /// The string stored in the `kind` column.
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s)
      .map_err(|_| Error::violation("kind", format!("unknown party kind {s:?}")))
  }
}

/// The e-document family a registration applies to. A subject may be
/// registered for one and not the other, or under different aliases.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
pub enum DocumentType {
  Invoice,
  DespatchAdvice,
}

impl DocumentType {
  /// The string stored in the `document_type` column; matches the registry's
  /// own spelling.
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s).map_err(|_| {
      Error::violation("document_type", format!("unknown document type {s:?}"))
    })
  }
}

// ─── Natural key ─────────────────────────────────────────────────────────────

/// `(identifier, alias, document_type)`, unique across the table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NaturalKey {
  pub identifier:    String,
  pub alias:         String,
  pub document_type: DocumentType,
}

impl NaturalKey {
  pub fn new(
    identifier: impl Into<String>,
    alias: impl Into<String>,
    document_type: DocumentType,
  ) -> Self {
    Self {
      identifier: identifier.into(),
      alias: alias.into(),
      document_type,
    }
  }
}

// ─── Observation ─────────────────────────────────────────────────────────────

/// One registration as seen in the remote registry during a sweep.
///
/// Input to [`crate::store::RegistryStore::upsert_observation`]; the
/// observation time is supplied separately so a whole sweep shares one
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
  pub identifier:    String,
  pub alias:         String,
  pub title:         Option<String>,
  pub kind:          PartyKind,
  pub document_type: DocumentType,
  /// When the registration first appeared in the remote registry.
  pub first_seen_at: DateTime<Utc>,
}

impl Observation {
  pub fn key(&self) -> NaturalKey {
    NaturalKey::new(&self.identifier, &self.alias, self.document_type)
  }

  /// Reject values that would break the column constraints. Nothing is
  /// trimmed or truncated here.
  pub fn validate(&self) -> Result<()> {
    check_required("identifier", &self.identifier, IDENTIFIER_MAX_LEN)?;
    check_required("alias", &self.alias, ALIAS_MAX_LEN)?;
    if let Some(title) = &self.title {
      check_len("title", title, TITLE_MAX_LEN)?;
    }
    Ok(())
  }
}

fn check_required(field: &'static str, value: &str, max: usize) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::violation(field, "must not be empty"));
  }
  check_len(field, value, max)
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<()> {
  let len = value.chars().count();
  if len > max {
    return Err(Error::violation(
      field,
      format!("{len} characters exceeds the limit of {max}"),
    ));
  }
  Ok(())
}

// ─── RegistryEntry ───────────────────────────────────────────────────────────

/// A persisted registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
  /// Store-assigned, monotonic, never reused.
  pub id:             i64,
  pub identifier:     String,
  pub alias:          String,
  pub title:          Option<String>,
  pub kind:           PartyKind,
  pub document_type:  DocumentType,
  /// Immutable once the row exists.
  pub first_seen_at:  DateTime<Utc>,
  pub is_active:      bool,
  pub created_at:     DateTime<Utc>,
  /// Never earlier than `created_at`.
  pub last_synced_at: DateTime<Utc>,
}

impl RegistryEntry {
  pub fn key(&self) -> NaturalKey {
    NaturalKey::new(&self.identifier, &self.alias, self.document_type)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn observation() -> Observation {
    Observation {
      identifier:    "12345678901".into(),
      alias:         "urn:mail:defaultpk@example.com".into(),
      title:         Some("Jane Doe".into()),
      kind:          PartyKind::PrivatePerson,
      document_type: DocumentType::Invoice,
      first_seen_at: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
    }
  }

  #[test]
  fn kind_from_identifier_length() {
    assert_eq!(
      PartyKind::from_identifier("12345678901"),
      Some(PartyKind::PrivatePerson)
    );
    assert_eq!(
      PartyKind::from_identifier("1234567890"),
      Some(PartyKind::LegalEntity)
    );
    assert_eq!(PartyKind::from_identifier("123"), None);
    assert_eq!(PartyKind::from_identifier("12345x7890"), None);
  }

  #[test]
  fn enum_column_spelling() {
    assert_eq!(PartyKind::PrivatePerson.as_str(), "private_person");
    assert_eq!(PartyKind::LegalEntity.as_str(), "legal_entity");
    assert_eq!(DocumentType::DespatchAdvice.as_str(), "DespatchAdvice");
    assert_eq!(DocumentType::parse("Invoice").unwrap(), DocumentType::Invoice);
    assert_eq!(
      PartyKind::parse("legal_entity").unwrap(),
      PartyKind::LegalEntity
    );
  }

  #[test]
  fn unknown_enum_values_are_violations() {
    let err = DocumentType::parse("CreditNote").unwrap_err();
    assert!(matches!(
      err,
      Error::ConstraintViolation { field: "document_type", .. }
    ));
    let err = PartyKind::parse("PK").unwrap_err();
    assert!(matches!(err, Error::ConstraintViolation { field: "kind", .. }));
  }

  #[test]
  fn validate_accepts_well_formed_observation() {
    assert!(observation().validate().is_ok());

    let mut untitled = observation();
    untitled.title = None;
    assert!(untitled.validate().is_ok());
  }

  #[test]
  fn validate_rejects_blank_alias() {
    let mut obs = observation();
    obs.alias = "   ".into();
    assert!(matches!(
      obs.validate(),
      Err(Error::ConstraintViolation { field: "alias", .. })
    ));
  }

  #[test]
  fn validate_rejects_overlong_fields() {
    let mut obs = observation();
    obs.identifier = "1".repeat(IDENTIFIER_MAX_LEN + 1);
    assert!(matches!(
      obs.validate(),
      Err(Error::ConstraintViolation { field: "identifier", .. })
    ));

    let mut obs = observation();
    obs.title = Some("ş".repeat(TITLE_MAX_LEN));
    assert!(obs.validate().is_ok(), "limit counts characters, not bytes");
    obs.title = Some("ş".repeat(TITLE_MAX_LEN + 1));
    assert!(matches!(
      obs.validate(),
      Err(Error::ConstraintViolation { field: "title", .. })
    ));
  }
}

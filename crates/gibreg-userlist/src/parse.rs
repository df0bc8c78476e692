//! Streaming parser for the user-list XML.
//!
//! Namespaces are ignored; elements are matched on their local names. Every
//! `User` block is buffered until its end tag so child order does not matter.

use std::{fmt::Display, io::BufRead, mem};

use chrono::{DateTime, NaiveDateTime, Utc};
use gibreg_core::entry::{DocumentType, Observation, PartyKind};
use quick_xml::{
  Reader,
  events::{BytesStart, Event},
};

use crate::{DecodedPart, Error, Result, SkipCounts};

pub fn parse_user_list<R: BufRead>(input: R) -> Result<DecodedPart> {
  let mut reader = Reader::from_reader(input);
  reader.config_mut().trim_text(true);

  let mut state = ParseState::default();
  let mut buf = Vec::new();

  loop {
    let position = reader.buffer_position() as u64;
    match reader.read_event_into(&mut buf) {
      Ok(Event::Start(ref e)) => {
        state.open(e).map_err(|err| xml_error(position, err))?;
      }
      Ok(Event::Empty(ref e)) => {
        state.open(e).map_err(|err| xml_error(position, err))?;
        state.close(e.local_name().as_ref());
      }
      Ok(Event::Text(ref t)) => {
        let text = t.unescape().map_err(|err| xml_error(position, err))?;
        state.text.push_str(&text);
      }
      Ok(Event::CData(c)) => {
        state.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
      }
      Ok(Event::End(ref e)) => state.close(e.local_name().as_ref()),
      Ok(Event::Eof) => break,
      Err(err) => return Err(xml_error(reader.buffer_position() as u64, err)),
      _ => {}
    }
    buf.clear();
  }

  Ok(state.part)
}

fn xml_error(position: u64, err: impl Display) -> Error {
  Error::Xml { position, message: err.to_string() }
}

// ─── Parser state ────────────────────────────────────────────────────────────

#[derive(Default)]
struct UserBlock {
  identifier: Option<String>,
  title:      Option<String>,
  aliases:    Vec<AliasBlock>,
}

struct AliasBlock {
  document_type: DocumentType,
  name:          Option<String>,
  creation_time: Option<String>,
  deleted:       bool,
}

#[derive(Default)]
struct ParseState {
  /// Local names of the currently open elements.
  stack:         Vec<Vec<u8>>,
  user:          Option<UserBlock>,
  document_type: Option<DocumentType>,
  alias:         Option<AliasBlock>,
  text:          String,
  part:          DecodedPart,
}

impl ParseState {
  fn open(&mut self, e: &BytesStart<'_>) -> Result<(), quick_xml::Error> {
    let local = e.local_name().as_ref().to_vec();
    let in_document = self
      .stack
      .last()
      .is_some_and(|parent| parent.as_slice() == b"Document");
    match local.as_slice() {
      b"User" => self.user = Some(UserBlock::default()),
      b"Document" => self.document_type = Some(document_type_of(e)?),
      // Only direct children of a `Document` are registrations.
      b"Alias" if self.user.is_some() && in_document => {
        if let Some(document_type) = self.document_type {
          self.alias = Some(AliasBlock {
            document_type,
            name:          None,
            creation_time: None,
            deleted:       false,
          });
        }
      }
      _ => {}
    }
    self.text.clear();
    self.stack.push(local);
    Ok(())
  }

  fn close(&mut self, local: &[u8]) {
    self.stack.pop();
    let parent = self.stack.last().map(Vec::as_slice);
    let text = mem::take(&mut self.text);

    match (local, parent) {
      (b"Identifier", Some(b"User")) => {
        if let Some(user) = &mut self.user {
          user.identifier = non_empty(text);
        }
      }
      (b"Title", Some(b"User")) => {
        if let Some(user) = &mut self.user {
          user.title = non_empty(text);
        }
      }
      (b"Name", Some(b"Alias")) => {
        if let Some(alias) = &mut self.alias {
          alias.name = non_empty(text);
        }
      }
      (b"CreationTime", Some(b"Alias")) => {
        if let Some(alias) = &mut self.alias {
          alias.creation_time = non_empty(text);
        }
      }
      (b"DeletionTime", Some(b"Alias")) => {
        if let Some(alias) = &mut self.alias {
          alias.deleted = true;
        }
      }
      (b"Alias", _) => {
        if let (Some(alias), Some(user)) = (self.alias.take(), &mut self.user) {
          user.aliases.push(alias);
        }
      }
      (b"Document", _) => self.document_type = None,
      (b"User", _) => {
        if let Some(user) = self.user.take() {
          finish_user(user, &mut self.part);
        }
      }
      _ => {}
    }
  }
}

fn finish_user(user: UserBlock, part: &mut DecodedPart) {
  let Some(identifier) = user.identifier else {
    part.skipped.missing_identifier += 1;
    return;
  };
  let Some(kind) = PartyKind::from_identifier(&identifier) else {
    part.skipped.unrecognised_identifier += 1;
    return;
  };

  for alias in user.aliases {
    let skipped: &mut SkipCounts = &mut part.skipped;
    if alias.deleted {
      skipped.deleted_aliases += 1;
      continue;
    }
    let (Some(name), Some(creation_time)) = (alias.name, alias.creation_time)
    else {
      skipped.incomplete_aliases += 1;
      continue;
    };
    let Some(first_seen_at) = parse_creation_time(&creation_time) else {
      skipped.bad_creation_time += 1;
      continue;
    };

    part.observations.push(Observation {
      identifier: identifier.clone(),
      alias: name,
      title: user.title.clone(),
      kind,
      document_type: alias.document_type,
      first_seen_at,
    });
  }
}

// ─── Field helpers ───────────────────────────────────────────────────────────

fn document_type_of(e: &BytesStart<'_>) -> Result<DocumentType, quick_xml::Error> {
  for attr in e.attributes() {
    let attr = attr?;
    if attr.key.local_name().as_ref() == b"type" {
      let value = attr.unescape_value()?;
      if value.trim() == "DespatchAdvice" {
        return Ok(DocumentType::DespatchAdvice);
      }
    }
  }
  Ok(DocumentType::Invoice)
}

fn non_empty(text: String) -> Option<String> {
  let trimmed = text.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// `CreationTime` is normally a bare local timestamp; it is taken as UTC.
/// Values carrying an explicit offset are honoured.
fn parse_creation_time(s: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .map(|naive| naive.and_utc())
}

//! Unpacking of part archives.

use std::io::{BufReader, Read, Seek};

use crate::{DecodedPart, Error, Result, parse::parse_user_list};

/// Decode a part archive. The first file entry is taken as the user-list
/// XML; directory entries are ignored.
pub fn decode_archive<R: Read + Seek>(reader: R) -> Result<DecodedPart> {
  let mut archive = zip::ZipArchive::new(reader)?;

  let index = (0..archive.len())
    .find(|&i| archive.by_index(i).is_ok_and(|entry| !entry.is_dir()))
    .ok_or(Error::EmptyArchive)?;

  let entry = archive.by_index(index)?;
  parse_user_list(BufReader::new(entry))
}

#[cfg(test)]
mod tests {
  use std::io::{Cursor, Write};

  use gibreg_core::entry::DocumentType;

  use super::*;

  fn build_zip(files: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, body) in files {
      if name.ends_with('/') {
        zip.add_directory(*name, options).unwrap();
      } else {
        zip.start_file(*name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
      }
    }
    zip.finish().unwrap().into_inner()
  }

  const LIST: &str = r#"<UserList>
    <User>
      <Identifier>1234567890</Identifier>
      <Title>ACME</Title>
      <Documents>
        <Document type="DespatchAdvice">
          <Alias>
            <Name>urn:mail:irsaliyepk@acme.com</Name>
            <CreationTime>2020-02-02T08:00:00</CreationTime>
          </Alias>
        </Document>
      </Documents>
    </User>
  </UserList>"#;

  #[test]
  fn decodes_first_file_in_archive() {
    let bytes = build_zip(&[("xml/", ""), ("users.xml", LIST)]);
    let part = decode_archive(Cursor::new(bytes)).unwrap();

    assert_eq!(part.observations.len(), 1);
    assert_eq!(
      part.observations[0].document_type,
      DocumentType::DespatchAdvice
    );
  }

  #[test]
  fn empty_archive_is_an_error() {
    let bytes = build_zip(&[]);
    assert!(matches!(
      decode_archive(Cursor::new(bytes)),
      Err(Error::EmptyArchive)
    ));
  }

  #[test]
  fn garbage_is_an_archive_error() {
    let err = decode_archive(Cursor::new(b"not a zip".to_vec())).unwrap_err();
    assert!(matches!(err, Error::Archive(_)));
  }
}

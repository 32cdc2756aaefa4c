//! Field encoder for append-only logs

use crate::field::Field;
use std::io::{self, Write};

/// Check that `name` can be framed: it must not contain a space or newline.
///
/// An empty name is accepted even though the grammar asks for at least one
/// byte. Requests without parameters have an empty signature, and the reader
/// decodes an empty name back unchanged.
pub fn validate_name(name: &[u8]) -> io::Result<()> {
    if let Some(byte) = name.iter().find(|b| **b == b' ' || **b == b'\n') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "field name '{}' contains delimiter '{}'",
                name.escape_ascii(),
                byte.escape_ascii()
            ),
        ));
    }
    Ok(())
}

/// Appends encoded fields to an underlying writer
pub struct LogWriter<W> {
    inner: W,
}

impl<W: Write> LogWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Encode and write one field.
    ///
    /// Names that would not decode back are rejected before anything is
    /// written.
    pub fn append(&mut self, field: &Field) -> io::Result<()> {
        validate_name(field.name())?;
        self.inner.write_all(&field.encode())
    }

    /// Encode several fields up front and hand them to the sink in one
    /// `write_all`, so an invalid name aborts before any byte is written.
    pub fn append_all<'a, I>(&mut self, fields: I) -> io::Result<()>
    where
        I: IntoIterator<Item = &'a Field>,
    {
        let mut buf = Vec::new();
        for field in fields {
            validate_name(field.name())?;
            field.write_to(&mut buf)?;
        }
        self.inner.write_all(&buf)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{BlobField, IntegerField};
    use crate::reader::LogReader;
    use std::io::Cursor;

    #[test]
    fn test_append_writes_exact_bytes() {
        let mut writer = LogWriter::new(Vec::new());
        writer
            .append(&Field::from(IntegerField::new("timestamp", 1000)))
            .unwrap();
        writer
            .append(&Field::from(BlobField::new("q=1", "body")))
            .unwrap();
        assert_eq!(
            writer.into_inner(),
            b":i timestamp 1000\n:b q=1 4\nbody\n".to_vec()
        );
    }

    #[test]
    fn test_append_to_existing_bytes() {
        let mut existing = Field::from(IntegerField::new("a", 1)).encode();
        let mut writer = LogWriter::new(&mut existing);
        writer
            .append(&Field::from(IntegerField::new("b", 2)))
            .unwrap();

        let mut reader = LogReader::new(Cursor::new(existing));
        let names: Vec<Vec<u8>> = reader
            .fields()
            .map(|f| f.unwrap().name().to_vec())
            .collect();
        assert_eq!(names, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_append_rejects_unframeable_names() {
        let mut writer = LogWriter::new(Vec::new());
        let err = writer
            .append(&Field::from(IntegerField::new("two words", 1)))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let err = writer
            .append_all(&[
                Field::from(IntegerField::new("ok", 1)),
                Field::from(BlobField::new("line\nbreak", "x")),
            ])
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(writer.into_inner().is_empty());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name(b"a=1&b=2").is_ok());
        assert!(validate_name(b"").is_ok());
        assert!(validate_name(b"a b").is_err());
    }
}

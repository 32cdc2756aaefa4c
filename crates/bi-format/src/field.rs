//! Field variants and their byte encoding

use crate::error::{DecodeError, Result};
use crate::reader::LogReader;
use std::io::{self, Read, Write};

/// The closed set of field variants.
///
/// Tags are not stored here; they come from the [`crate::Registry`], which
/// checks on construction that every kind listed in [`FieldKind::ALL`] has a
/// tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Integer,
    Blob,
}

impl FieldKind {
    pub const COUNT: usize = 2;
    pub const ALL: [FieldKind; Self::COUNT] = [FieldKind::Integer, FieldKind::Blob];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Tag byte for this kind in the global registry
    pub fn tag(self) -> u8 {
        crate::registry()
            .tag_of(self)
            .expect("global registry covers every field kind")
    }

    pub(crate) fn decode<R: Read>(self, name: Vec<u8>, reader: &mut LogReader<R>) -> Result<Field> {
        match self {
            FieldKind::Integer => IntegerField::from_reader(name, reader).map(Field::Integer),
            FieldKind::Blob => BlobField::from_reader(name, reader).map(Field::Blob),
        }
    }
}

/// Named signed integer, stored as ASCII decimal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerField {
    pub name: Vec<u8>,
    pub value: i64,
}

impl IntegerField {
    pub fn new(name: impl Into<Vec<u8>>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Decode the payload that follows `name ` in the stream.
    pub fn from_reader<R: Read>(name: Vec<u8>, reader: &mut LogReader<R>) -> Result<Self> {
        let offset = reader.offset();
        let text = reader.read_line()?;
        let value = parse_decimal(&text).ok_or(DecodeError::InvalidInteger { text, offset })?;
        Ok(Self { name, value })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_header(writer, FieldKind::Integer, &self.name)?;
        writeln!(writer, "{}", self.value)
    }
}

/// Named run of raw bytes, length-prefixed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobField {
    pub name: Vec<u8>,
    pub content: Vec<u8>,
}

impl BlobField {
    pub fn new(name: impl Into<Vec<u8>>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Decode the payload that follows `name ` in the stream.
    ///
    /// A short body is not detected by the read itself; it surfaces as a
    /// missing trailing newline.
    pub fn from_reader<R: Read>(name: Vec<u8>, reader: &mut LogReader<R>) -> Result<Self> {
        let offset = reader.offset();
        let text = reader.read_line()?;
        let size = parse_decimal(&text)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or(DecodeError::InvalidLength { text, offset })?;
        let content = reader.read(size)?;
        reader.expect_fail(b"\n")?;
        Ok(Self { name, content })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_header(writer, FieldKind::Blob, &self.name)?;
        writeln!(writer, "{}", self.content.len())?;
        writer.write_all(&self.content)?;
        writer.write_all(b"\n")
    }
}

/// One unit of a log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Integer(IntegerField),
    Blob(BlobField),
}

impl Field {
    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Integer(_) => FieldKind::Integer,
            Field::Blob(_) => FieldKind::Blob,
        }
    }

    pub fn name(&self) -> &[u8] {
        match self {
            Field::Integer(field) => &field.name,
            Field::Blob(field) => &field.name,
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Field::Integer(field) => field.write_to(writer),
            Field::Blob(field) => field.write_to(writer),
        }
    }

    /// Exact on-disk encoding of this field
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len_hint());
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut out);
        out
    }

    fn encoded_len_hint(&self) -> usize {
        match self {
            Field::Integer(field) => field.name.len() + 24,
            Field::Blob(field) => field.name.len() + field.content.len() + 26,
        }
    }
}

impl From<IntegerField> for Field {
    fn from(field: IntegerField) -> Self {
        Field::Integer(field)
    }
}

impl From<BlobField> for Field {
    fn from(field: BlobField) -> Self {
        Field::Blob(field)
    }
}

fn write_header<W: Write>(writer: &mut W, kind: FieldKind, name: &[u8]) -> io::Result<()> {
    writer.write_all(&[b':', kind.tag(), b' '])?;
    writer.write_all(name)?;
    writer.write_all(b" ")
}

fn parse_decimal(text: &[u8]) -> Option<i64> {
    std::str::from_utf8(text).ok()?.parse().ok()
}

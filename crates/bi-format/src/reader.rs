//! Forward-only field decoder

use crate::error::{DecodeError, Result};
use crate::field::Field;
use crate::outcome::Outcome;
use crate::registry::registry;
use std::io::{self, Read};
use tracing::trace;

/// Cursor over a byte stream that decodes one field at a time.
///
/// Reads go straight to the underlying reader one primitive at a time, so
/// wrap files in a [`std::io::BufReader`].
pub struct LogReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> LogReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read up to `count` bytes; fewer are returned only at end of input.
    pub fn read(&mut self, count: u64) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        (&mut self.inner).take(count).read_to_end(&mut buf)?;
        self.offset += buf.len() as u64;
        Ok(buf)
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.offset += 1;
                    return Ok(Some(byte[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Read `chars.len()` bytes; matched if they equal `chars`.
    pub fn expect(&mut self, chars: &[u8]) -> Result<Outcome<Vec<u8>>> {
        let value = self.read(chars.len() as u64)?;
        if value == chars {
            Ok(Outcome::matched(value))
        } else {
            Ok(Outcome::mismatched(value))
        }
    }

    /// Like [`expect`](Self::expect) but a mismatch is a fault.
    pub fn expect_fail(&mut self, chars: &[u8]) -> Result<Vec<u8>> {
        let offset = self.offset;
        self.expect(chars)?
            .into_result(|found| DecodeError::UnexpectedBytes {
                expected: chars.to_vec(),
                found,
                offset,
            })
    }

    /// Read up to and including `delimiter`, which is not returned.
    ///
    /// Mismatched if input ended first; the bytes read are still returned.
    pub fn read_until(&mut self, delimiter: u8) -> Result<Outcome<Vec<u8>>> {
        let mut read = Vec::new();
        while let Some(byte) = self.read_byte()? {
            if byte == delimiter {
                return Ok(Outcome::matched(read));
            }
            read.push(byte);
        }
        Ok(Outcome::mismatched(read))
    }

    /// Read a field name, consuming the space that terminates it.
    pub fn read_name(&mut self) -> Result<Vec<u8>> {
        self.read_terminated(b' ', "separator")
    }

    pub(crate) fn read_line(&mut self) -> Result<Vec<u8>> {
        self.read_terminated(b'\n', "newline")
    }

    fn read_terminated(&mut self, delimiter: u8, expected: &'static str) -> Result<Vec<u8>> {
        let outcome = self.read_until(delimiter)?;
        let offset = self.offset;
        outcome.into_result(|_| DecodeError::UnexpectedEof { expected, offset })
    }

    /// Decode the next field, or `None` if input ends cleanly at a field
    /// boundary.
    pub fn next_field(&mut self) -> Result<Option<Field>> {
        let start = self.offset;
        let marker = self.expect(b":")?;
        if !marker.success() {
            let found = marker.into_value();
            if found.is_empty() {
                return Ok(None);
            }
            return Err(DecodeError::UnexpectedBytes {
                expected: b":".to_vec(),
                found,
                offset: start,
            });
        }

        let tag_offset = self.offset;
        let tag = self.read_byte()?.ok_or(DecodeError::UnexpectedEof {
            expected: "field tag",
            offset: tag_offset,
        })?;
        let kind = registry()
            .lookup(tag)
            .ok_or_else(|| DecodeError::UnknownTag {
                valid: registry().describe_tags(),
                found: tag,
                offset: tag_offset,
            })?;

        self.expect_fail(b" ")?;
        let name = self.read_name()?;
        let field = kind.decode(name, self)?;
        trace!(offset = start, kind = ?kind, "Decoded field");
        Ok(Some(field))
    }

    /// Lazily decode the remaining fields.
    ///
    /// The iterator ends after the first fault.
    pub fn fields(&mut self) -> Fields<'_, R> {
        Fields {
            reader: self,
            done: false,
        }
    }
}

/// Iterator returned by [`LogReader::fields`]
pub struct Fields<'a, R> {
    reader: &'a mut LogReader<R>,
    done: bool,
}

impl<R: Read> Iterator for Fields<'_, R> {
    type Item = Result<Field>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_field() {
            Ok(Some(field)) => Some(Ok(field)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<R: Read> std::iter::FusedIterator for Fields<'_, R> {}

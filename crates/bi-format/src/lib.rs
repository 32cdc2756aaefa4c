//! bi field log format
//!
//! A log is a flat sequence of self-describing fields with no header or
//! trailer:
//!
//! ```text
//! :i name 42\n
//! :b name 5\nhello\n
//! ```
//!
//! Integer fields carry an ASCII-decimal value, blob fields carry a
//! length-prefixed run of raw bytes. [`LogReader`] decodes fields lazily from
//! any [`std::io::Read`], [`LogWriter`] appends their exact encoding to any
//! [`std::io::Write`].

mod error;
mod field;
mod outcome;
mod reader;
mod registry;
mod writer;

pub use error::{DecodeError, Result};
pub use field::{BlobField, Field, FieldKind, IntegerField};
pub use outcome::Outcome;
pub use reader::{Fields, LogReader};
pub use registry::{join_with_final, registry, Registry, RegistryError};
pub use writer::{validate_name, LogWriter};

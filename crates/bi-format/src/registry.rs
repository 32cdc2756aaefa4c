//! Tag byte to field kind lookup

use crate::field::FieldKind;
use std::fmt;
use std::sync::LazyLock;

static REGISTRY: LazyLock<Registry> = LazyLock::new(|| {
    let registry = Registry::builtin().unwrap_or_else(|err| panic!("{}", err));
    let unhandled = registry.unhandled_kinds();
    assert!(
        unhandled.is_empty(),
        "field kinds without a registered tag: {:?}",
        unhandled
    );
    registry
});

/// The process-wide registry used by the reader and writer.
///
/// Built on first use; panics if the built-in registrations are inconsistent.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateTag { tag: u8, existing: FieldKind },
    KindAlreadyTagged { kind: FieldKind, tag: u8 },
    /// Tags must be printable ASCII and must not collide with framing bytes
    InvalidTag(u8),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateTag { tag, existing } => write!(
                f,
                "tag '{}' is already registered to {:?}",
                tag.escape_ascii(),
                existing
            ),
            RegistryError::KindAlreadyTagged { kind, tag } => write!(
                f,
                "{:?} is already registered under tag '{}'",
                kind,
                tag.escape_ascii()
            ),
            RegistryError::InvalidTag(tag) => {
                write!(f, "'{}' cannot be used as a field tag", tag.escape_ascii())
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Bidirectional mapping between one-byte tags and [`FieldKind`]s
#[derive(Debug, Clone)]
pub struct Registry {
    by_tag: [Option<FieldKind>; 256],
    by_kind: [Option<u8>; FieldKind::COUNT],
    /// Tags in registration order, for error messages
    order: Vec<u8>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            by_tag: [None; 256],
            by_kind: [None; FieldKind::COUNT],
            order: Vec::new(),
        }
    }

    /// Registry with the standard `i` and `b` tags
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(b'i', FieldKind::Integer)?;
        registry.register(b'b', FieldKind::Blob)?;
        Ok(registry)
    }

    pub fn register(&mut self, tag: u8, kind: FieldKind) -> Result<(), RegistryError> {
        if !tag.is_ascii_graphic() || tag == b':' {
            return Err(RegistryError::InvalidTag(tag));
        }
        if let Some(existing) = self.by_tag[tag as usize] {
            return Err(RegistryError::DuplicateTag { tag, existing });
        }
        if let Some(tag) = self.by_kind[kind.index()] {
            return Err(RegistryError::KindAlreadyTagged { kind, tag });
        }
        self.by_tag[tag as usize] = Some(kind);
        self.by_kind[kind.index()] = Some(tag);
        self.order.push(tag);
        Ok(())
    }

    pub fn lookup(&self, tag: u8) -> Option<FieldKind> {
        self.by_tag[tag as usize]
    }

    pub fn tag_of(&self, kind: FieldKind) -> Option<u8> {
        self.by_kind[kind.index()]
    }

    /// Kinds of the closed union that have no tag
    pub fn unhandled_kinds(&self) -> Vec<FieldKind> {
        FieldKind::ALL
            .into_iter()
            .filter(|kind| self.tag_of(*kind).is_none())
            .collect()
    }

    /// Human-readable list of valid tags, e.g. `'i' or 'b'`
    pub fn describe_tags(&self) -> String {
        join_with_final(
            self.order.iter().map(|tag| format!("'{}'", tag.escape_ascii())),
            "or",
        )
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Join items with commas, phrasing the last one with `final_word`.
///
/// `["a"]` gives `a`, `["a", "b"]` gives `a or b`, three or more give
/// `a, b, or c`.
pub fn join_with_final<I, S>(items: I, final_word: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: ToString,
{
    let mut items: Vec<String> = items.into_iter().map(|s| s.to_string()).collect();
    if items.len() >= 2 {
        if let Some(last) = items.last_mut() {
            *last = format!("{} {}", final_word, last);
        }
    }
    if items.len() > 2 {
        items.join(", ")
    } else {
        items.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_registry_covers_every_kind() {
        assert!(registry().unhandled_kinds().is_empty());
        for kind in FieldKind::ALL {
            let tag = registry().tag_of(kind).unwrap();
            assert_eq!(registry().lookup(tag), Some(kind));
        }
    }

    #[test]
    fn test_builtin_tags() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(registry.lookup(b'i'), Some(FieldKind::Integer));
        assert_eq!(registry.lookup(b'b'), Some(FieldKind::Blob));
        assert_eq!(registry.lookup(b'z'), None);
        assert_eq!(registry.describe_tags(), "'i' or 'b'");
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let mut registry = Registry::new();
        registry.register(b'i', FieldKind::Integer).unwrap();
        let err = registry.register(b'i', FieldKind::Blob).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateTag {
                tag: b'i',
                existing: FieldKind::Integer
            }
        );
    }

    #[test]
    fn test_kind_registered_twice_rejected() {
        let mut registry = Registry::new();
        registry.register(b'i', FieldKind::Integer).unwrap();
        assert!(matches!(
            registry.register(b'n', FieldKind::Integer),
            Err(RegistryError::KindAlreadyTagged { .. })
        ));
    }

    #[test]
    fn test_framing_bytes_rejected_as_tags() {
        let mut registry = Registry::new();
        assert_eq!(
            registry.register(b':', FieldKind::Blob),
            Err(RegistryError::InvalidTag(b':'))
        );
        assert_eq!(
            registry.register(b' ', FieldKind::Blob),
            Err(RegistryError::InvalidTag(b' '))
        );
    }

    #[test]
    fn test_incomplete_registry_reports_unhandled() {
        let mut registry = Registry::new();
        registry.register(b'i', FieldKind::Integer).unwrap();
        assert_eq!(registry.unhandled_kinds(), vec![FieldKind::Blob]);
    }

    #[test]
    fn test_join_with_final() {
        let empty: [&str; 0] = [];
        assert_eq!(join_with_final(empty, "and"), "");
        assert_eq!(join_with_final(["a"], "and"), "a");
        assert_eq!(join_with_final(["a", "b"], "or"), "a or b");
        assert_eq!(join_with_final(["x", "y", "z"], "and"), "x, y, and z");
        assert_eq!(join_with_final([1, 2, 3], "or"), "1, 2, or 3");
    }
}

//! Canonical request signatures

use std::fmt;

/// Canonical byte form of a request's parameters, used as the blob name.
///
/// Parameters are sorted by key and joined as `key=value` pairs with `&`.
/// `%`, space and newline are percent-escaped since they cannot appear in a
/// field name; any other parameters produce the plain joined form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn from_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs: Vec<(K, V)> = params.into_iter().collect();
        pairs.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));

        let mut out = Vec::new();
        for (i, (key, value)) in pairs.iter().enumerate() {
            if i > 0 {
                out.push(b'&');
            }
            escape_into(&mut out, key.as_ref());
            out.push(b'=');
            escape_into(&mut out, value.as_ref());
        }
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.escape_ascii())
    }
}

fn escape_into(out: &mut Vec<u8>, text: &str) {
    for &byte in text.as_bytes() {
        match byte {
            b'%' => out.extend_from_slice(b"%25"),
            b' ' => out.extend_from_slice(b"%20"),
            b'\n' => out.extend_from_slice(b"%0A"),
            _ => out.push(byte),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_signature_is_order_independent() {
        let first = Signature::from_params([("b", "2"), ("a", "1")]);
        let second = Signature::from_params([("a", "1"), ("b", "2")]);
        assert_eq!(first, second);
        assert_eq!(first.as_bytes(), b"a=1&b=2");
    }

    #[test]
    fn test_signature_from_hash_map() {
        let mut params = HashMap::new();
        params.insert("token".to_string(), "abc".to_string());
        params.insert("fileID".to_string(), "42".to_string());
        params.insert("language".to_string(), "English".to_string());

        let signature = Signature::from_params(&params);
        assert_eq!(signature.as_bytes(), b"fileID=42&language=English&token=abc");
    }

    #[test]
    fn test_empty_params() {
        let empty: [(&str, &str); 0] = [];
        assert_eq!(Signature::from_params(empty).as_bytes(), b"");
    }

    #[test]
    fn test_framing_bytes_are_escaped() {
        let signature = Signature::from_params([("q", "hello world\n100%")]);
        assert_eq!(signature.as_bytes(), b"q=hello%20world%0A100%25");
        assert!(bi_format::validate_name(signature.as_bytes()).is_ok());
    }

    #[test]
    fn test_escaping_is_injective_for_literal_escapes() {
        let literal = Signature::from_params([("q", "a%20b")]);
        let spaced = Signature::from_params([("q", "a b")]);
        assert_ne!(literal, spaced);
    }

    #[test]
    fn test_utf8_values_kept_verbatim() {
        let signature = Signature::from_params([("name", "Привет")]);
        assert_eq!(signature.as_bytes(), "name=Привет".as_bytes());
    }
}

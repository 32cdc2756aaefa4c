//! Benign match results for reader primitives

/// Result of a primitive read that may or may not have found the expected
/// pattern.
///
/// A mismatch is data, not a fault: the bytes that were actually read are
/// always carried in `value` so the caller can decide whether to escalate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    pub success: bool,
    pub value: T,
}

impl<T> Outcome<T> {
    pub fn matched(value: T) -> Self {
        Self {
            success: true,
            value,
        }
    }

    pub fn mismatched(value: T) -> Self {
        Self {
            success: false,
            value,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// Return the carried value whether or not the pattern matched.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Escalate a mismatch into an error built from the bytes that were read.
    pub fn into_result<E>(self, fault: impl FnOnce(T) -> E) -> std::result::Result<T, E> {
        if self.success {
            Ok(self.value)
        } else {
            Err(fault(self.value))
        }
    }
}

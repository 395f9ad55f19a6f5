//! Optimistic concurrency version token.

use serde::{Deserialize, Serialize};

/// Monotonically incrementing version token carried by every stock record.
///
/// Mutations are conditional writes: the store accepts an update only if the
/// stored token equals the token the caller read. On mismatch the write is
/// rejected and the whole read-modify-write must be retried.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Version of a freshly created record.
    pub fn initial() -> Self {
        Self(1)
    }

    pub fn from_u64(v: u64) -> Self {
        Self(v)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// The token a successful conditional write advances to.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl core::fmt::Display for Version {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_is_strictly_increasing() {
        let v = Version::initial();
        assert!(v.next() > v);
        assert_eq!(v.next().as_u64(), v.as_u64() + 1);
    }
}

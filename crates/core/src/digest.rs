//! Content-addressed image identity.
//!
//! Unlike the ids in [`crate::id`], a digest is never generated locally: it is
//! reported by the container runtime (or computed by hashing a manifest) and
//! can be arbitrarily long (`sha256:` is 71 bytes already), so it is modeled
//! as a plain owned `String` rather than an [`crate::id::IdBuf`].

use std::borrow::Borrow;
use std::fmt;

/// A content digest, e.g. `sha256:1234…`. The sole identity key for an Image.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The algorithm prefix, e.g. `sha256`, if the digest is well-formed as `alg:hex`.
    pub fn algorithm(&self) -> Option<&str> {
        self.0.split_once(':').map(|(alg, _)| alg)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Digest {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Digest {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Digest {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "digest_tests.rs"]
mod tests;

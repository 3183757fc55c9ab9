use std::fmt;

/// API credential for the generative oracle.
///
/// Passed explicitly through every pipeline call. `Debug` and `Display` never
/// reveal the key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw API key. Surrounding whitespace is trimmed.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    /// Returns true if no key material is present.
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the raw key for placing on the wire.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

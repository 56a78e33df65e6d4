//! Access key check for mutating endpoints.

mod extractor;

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

pub use extractor::StaffAuth;

/// Wrapper type for the shared staff access key.
/// Uses `SecretString` so the key never appears in debug output and is zeroized on drop.
#[derive(Clone)]
pub struct AccessKey(Option<SecretString>);

impl AccessKey {
    /// Create a new AccessKey from an optional string.
    pub fn new(key: Option<String>) -> Self {
        Self(key.map(SecretString::from))
    }

    /// Whether a key is configured at all.
    pub fn is_configured(&self) -> bool {
        self.0.is_some()
    }

    /// Compare the provided key with the stored key in constant time.
    ///
    /// `ConstantTimeEq` returns false for unequal lengths without an early exit.
    pub fn verify(&self, provided: &str) -> bool {
        match &self.0 {
            Some(secret) => secret
                .expose_secret()
                .as_bytes()
                .ct_eq(provided.as_bytes())
                .into(),
            None => false,
        }
    }
}

impl std::fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(_) => write!(f, "AccessKey([REDACTED])"),
            None => write!(f, "AccessKey(None)"),
        }
    }
}

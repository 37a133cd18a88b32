use std::fmt;

use crate::AuthError;

/// The configured token. Never printed.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

#[derive(Clone, Debug)]
pub struct CredentialVerifier {
    secret: Secret,
}

impl CredentialVerifier {
    pub fn new(secret: Secret) -> Self {
        Self { secret }
    }

    /// Accepts `supplied` only if it is byte-for-byte equal to the secret.
    pub fn verify(&self, supplied: Option<&str>) -> Result<(), AuthError> {
        let supplied = supplied.ok_or(AuthError::Missing)?;
        if constant_time_eq(supplied.as_bytes(), self.secret.as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::Invalid)
        }
    }
}

// Runtime depends on the length only, not on where the first mismatch is.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

//! Read-only credential access.
//!
//! Loading and parsing of X.509 material happens outside this crate; the
//! signature engine only ever reads an already-loaded private key and DER
//! certificate through this contract. Implementations are shared across
//! calls and never mutated, so an `Arc<dyn Credentials>` needs no
//! synchronization.

use rsa::RsaPrivateKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    /// The backing store could not produce the requested material. Fatal
    /// for the operation in progress; never retried here.
    #[error("credential store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl CredentialError {
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Read access to signing material.
pub trait Credentials: Send + Sync {
    fn signing_key(&self) -> Result<&RsaPrivateKey, CredentialError>;

    /// DER-encoded X.509 certificate matching the signing key.
    fn certificate_der(&self) -> Result<&[u8], CredentialError>;
}

/// Credentials held in memory for the lifetime of the client.
pub struct InMemoryCredentials {
    key: RsaPrivateKey,
    certificate_der: Vec<u8>,
}

impl InMemoryCredentials {
    #[must_use]
    pub fn new(key: RsaPrivateKey, certificate_der: Vec<u8>) -> Self {
        Self {
            key,
            certificate_der,
        }
    }
}

impl Credentials for InMemoryCredentials {
    fn signing_key(&self) -> Result<&RsaPrivateKey, CredentialError> {
        Ok(&self.key)
    }

    fn certificate_der(&self) -> Result<&[u8], CredentialError> {
        Ok(&self.certificate_der)
    }
}

impl std::fmt::Debug for InMemoryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        f.debug_struct("InMemoryCredentials")
            .field("certificate_der_len", &self.certificate_der.len())
            .finish_non_exhaustive()
    }
}

//! Typed error taxonomy for the transmission layer.
//!
//! Remote faults and business rejections are *not* errors here; they come
//! back as structured data on the call result so callers can branch on
//! them. An `Err` from this crate always means the operation did not
//! complete: nothing was transmitted (structural or credential failures),
//! or the transport failed, or the response could not be understood at all.

use remessa_xmlsec::{CredentialError, SignError, XmlError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransmissionError {
    /// A signed fragment could not be spliced into the envelope because its
    /// placeholder was missing or ambiguous. Fatal: no partial envelope is
    /// ever transmitted.
    #[error(
        "expected exactly one placeholder for signed fragment `{reference_id}`, found {matches}"
    )]
    Structural {
        reference_id: String,
        matches: usize,
    },

    /// Credential material could not be read. Fatal, never retried.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The signing step itself failed.
    #[error(transparent)]
    Signature(SignError),

    /// Network-level failure, surfaced unmodified. Whether to retry is the
    /// caller's decision: submission is not idempotent, consults are.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with an HTTP error and a body that is not a
    /// SOAP envelope. Fault envelopes on error statuses are parsed as
    /// faults instead of reaching this variant.
    #[error("service returned HTTP {status} with a non-envelope body")]
    Http { status: u16 },

    /// An operation endpoint did not resolve against the base URL.
    #[error("invalid endpoint `{endpoint}`: {source}")]
    Endpoint {
        endpoint: String,
        source: url::ParseError,
    },

    /// The response parsed as XML but the envelope shape was wrong.
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope { reason: String },

    /// The request or response XML itself was malformed.
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// A typed request failed to serialize to XML.
    #[error("failed to encode request: {0}")]
    Encode(quick_xml::DeError),

    /// A result element failed to deserialize into its schema type.
    #[error("failed to decode response: {0}")]
    Decode(quick_xml::DeError),
}

impl From<SignError> for TransmissionError {
    fn from(err: SignError) -> Self {
        match err {
            SignError::Credential(inner) => Self::Credential(inner),
            other => Self::Signature(other),
        }
    }
}

impl TransmissionError {
    #[must_use]
    pub fn malformed_envelope(reason: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            reason: reason.into(),
        }
    }
}

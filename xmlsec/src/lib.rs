//! Enveloped XML signatures for the municipal fiscal service.
//!
//! The remote service mandates a legacy signature profile: RSA signing over
//! a SHA-1 digest, SHA-1 as the reference digest, and Canonical XML 1.0
//! (the 2001 C14N recommendation). None of this is configurable here; it is
//! a compatibility requirement of the receiving side, not a security
//! choice.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`tree`] | Minimal XML element tree: parse, render, tree surgery |
//! | [`c14n`] | Canonical XML 1.0 serialization |
//! | [`credentials`] | Read-only key/certificate provider contract |
//! | [`sign`] | The enveloped signature engine |
//!
//! # Usage
//!
//! ```ignore
//! use remessa_xmlsec::{Element, InMemoryCredentials, Signer};
//!
//! let credentials = InMemoryCredentials::new(key, certificate_der);
//! let signer = Signer::new(&credentials);
//! let element = Element::parse("<Rps><InfRps Id=\"rps1\">...</InfRps></Rps>")?;
//! let signed = signer.sign_element(&element, Some("rps1"))?;
//! ```
//!
//! The signed element is the input element with a `Signature` node appended
//! as its last child and any empty `xmlns=""` declarations stripped; all
//! other content is preserved byte for byte.

pub mod c14n;
pub mod credentials;
pub mod sign;
pub mod tree;

pub use credentials::{CredentialError, Credentials, InMemoryCredentials};
pub use sign::{SignError, SignedFragment, Signer};
pub use tree::{Element, Node, XmlError};

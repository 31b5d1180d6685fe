//! The enveloped signature engine.
//!
//! Produces an XML-DSIG `Signature` appended as the last child of the
//! signed element. The profile is fixed by the receiving service: RSA over
//! a SHA-1 digest, SHA-1 reference digest, Canonical XML 1.0, enveloped
//! placement, reference URI `#<id>` when an id is supplied and the whole
//! document otherwise.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rsa::Pkcs1v15Sign;
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::c14n::canonicalize;
use crate::credentials::{CredentialError, Credentials};
use crate::tree::Element;

/// XML-DSIG namespace, declared as the default namespace on `Signature`.
pub const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";
/// Canonical XML 1.0 (2001 recommendation).
pub const C14N_2001: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
/// RSA-SHA1 signature algorithm identifier.
pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
/// SHA-1 digest algorithm identifier.
pub const SHA1_DIGEST: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
/// Enveloped-signature transform identifier.
pub const ENVELOPED_TRANSFORM: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

#[derive(Debug, Error)]
pub enum SignError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("no element carries Id `{id}` for the signature reference")]
    ReferenceNotFound { id: String },
    #[error("RSA signing failed: {0}")]
    Crypto(#[from] rsa::Error),
}

/// A signed element together with the reference id its signature resolves
/// against. Produced once per signable entry and consumed immediately by
/// the envelope builder.
#[derive(Debug, Clone)]
pub struct SignedFragment {
    pub reference_id: Option<String>,
    pub element: Element,
}

/// Signs XML elements with externally supplied credentials.
pub struct Signer<'a> {
    credentials: &'a dyn Credentials,
}

impl<'a> Signer<'a> {
    #[must_use]
    pub fn new(credentials: &'a dyn Credentials) -> Self {
        Self { credentials }
    }

    /// Signs `element`, returning a copy with the `Signature` node appended
    /// as its last child and empty `xmlns=""` declarations stripped. All
    /// other content is preserved exactly.
    pub fn sign_element(
        &self,
        element: &Element,
        reference_id: Option<&str>,
    ) -> Result<SignedFragment, SignError> {
        let key = self.credentials.signing_key()?;
        let certificate = self.credentials.certificate_der()?;

        // The digest covers what the reference URI dereferences to: the
        // descendant carrying the Id when one is named, the whole element
        // otherwise. A verifier resolves `#id` before digesting, so
        // digesting anything wider would never verify.
        let target = match reference_id {
            Some(id) => element
                .find_descendant(|el| el.attr("Id") == Some(id))
                .ok_or_else(|| SignError::ReferenceNotFound { id: id.to_string() })?,
            None => element,
        };
        let content_digest = Sha1::digest(canonicalize(target).as_bytes());
        let reference_uri = reference_id.map_or_else(String::new, |id| format!("#{id}"));

        let signed_info = build_signed_info(&reference_uri, &BASE64.encode(content_digest));

        // SignedInfo is canonicalized as its own subset, where the apex
        // inherits the dsig default namespace from Signature. Digest a copy
        // carrying that declaration explicitly.
        let mut apex = signed_info.clone();
        apex.attributes.insert(0, ("xmlns".to_string(), XMLDSIG_NS.to_string()));
        let signed_info_digest = Sha1::digest(canonicalize(&apex).as_bytes());

        let signature_value = key.sign(Pkcs1v15Sign::new::<Sha1>(), &signed_info_digest)?;

        let signature = Element::new("Signature")
            .with_attr("xmlns", XMLDSIG_NS)
            .with_child(signed_info)
            .with_child(Element::new("SignatureValue").with_text(BASE64.encode(&signature_value)))
            .with_child(
                Element::new("KeyInfo").with_child(
                    Element::new("X509Data").with_child(
                        Element::new("X509Certificate").with_text(BASE64.encode(certificate)),
                    ),
                ),
            );

        let mut signed = element.clone();
        signed.push_element(signature);
        signed.strip_empty_namespace_decls();

        tracing::debug!(
            reference = %reference_uri,
            element = %element.local_name(),
            "signed element"
        );

        Ok(SignedFragment {
            reference_id: reference_id.map(ToString::to_string),
            element: signed,
        })
    }
}

fn build_signed_info(reference_uri: &str, digest_value: &str) -> Element {
    Element::new("SignedInfo")
        .with_child(Element::new("CanonicalizationMethod").with_attr("Algorithm", C14N_2001))
        .with_child(Element::new("SignatureMethod").with_attr("Algorithm", RSA_SHA1))
        .with_child(
            Element::new("Reference")
                .with_attr("URI", reference_uri)
                .with_child(
                    Element::new("Transforms")
                        .with_child(
                            Element::new("Transform").with_attr("Algorithm", ENVELOPED_TRANSFORM),
                        )
                        .with_child(Element::new("Transform").with_attr("Algorithm", C14N_2001)),
                )
                .with_child(Element::new("DigestMethod").with_attr("Algorithm", SHA1_DIGEST))
                .with_child(Element::new("DigestValue").with_text(digest_value)),
        )
}

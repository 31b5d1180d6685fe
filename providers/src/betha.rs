//! Client for the Betha municipal NFS-e webservice.
//!
//! Exposes the four operations the service publishes: batch submission,
//! batch consultation by protocol, document consultation by RPS, and
//! document cancellation. Submission is the only operation whose entries
//! must carry enveloped signatures.

use std::sync::Arc;

use remessa_types::{
    BatchId, DocumentIdentity, Environment, LotSequence, RpsIdentification, RpsLot,
};
use remessa_xmlsec::{Credentials, Element, SignedFragment, Signer};

use crate::error::TransmissionError;
use crate::registry::{Operation, ServiceDescriptor};
use crate::soap::{self, CallResult, Outcome};
use crate::transport::{ServiceUrls, Transport};
use crate::wire::{
    self, CancelRequest, CancelResponse, ConsultBatchRequest, ConsultBatchResponse,
    ConsultByRpsRequest, ConsultByRpsResponse, SubmitBatchResponse,
};

pub const PRODUCTION_BASE_URL: &str = "https://e-gov.betha.com.br/e-nota-contribuinte-ws/";
pub const STAGING_BASE_URL: &str = "https://e-gov.betha.com.br/e-nota-contribuinte-test-ws/";

const SUBMIT_BATCH: ServiceDescriptor = ServiceDescriptor {
    operation: "EnviarLoteRpsEnvio",
    endpoint: "recepcionarLoteRps",
    result_tag: "EnviarLoteRpsResposta",
    requires_signature: true,
};

const CONSULT_BATCH: ServiceDescriptor = ServiceDescriptor {
    operation: "ConsultarLoteRpsEnvio",
    endpoint: "consultarLoteRps",
    result_tag: "ConsultarLoteRpsResposta",
    requires_signature: false,
};

const CONSULT_BY_RPS: ServiceDescriptor = ServiceDescriptor {
    operation: "ConsultarNfsePorRpsEnvio",
    endpoint: "consultarNfsePorRps",
    result_tag: "ConsultarNfseRpsResposta",
    requires_signature: false,
};

const CANCEL_DOCUMENT: ServiceDescriptor = ServiceDescriptor {
    operation: "CancelarNfseEnvio",
    endpoint: "cancelarNfse?wsdl",
    result_tag: "CancelarNfseResposta",
    requires_signature: false,
};

/// Descriptor for one logical operation on this service.
#[must_use]
pub const fn service(operation: Operation) -> &'static ServiceDescriptor {
    match operation {
        Operation::SubmitBatch => &SUBMIT_BATCH,
        Operation::ConsultBatch => &CONSULT_BATCH,
        Operation::ConsultByRps => &CONSULT_BY_RPS,
        Operation::CancelDocument => &CANCEL_DOCUMENT,
    }
}

/// What one submission transmitted, alongside its classified result.
///
/// The batch identifiers are minted per call and returned to the caller,
/// who needs the lot number to match the acknowledgement and the protocol
/// to poll with.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub batch_id: BatchId,
    pub lot_number: u64,
    pub result: CallResult<SubmitBatchResponse>,
}

impl SubmitOutcome {
    /// Whether the service accepted the batch for processing.
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.result.outcome() == Outcome::SuccessWithData
    }

    /// Protocol number to consult the batch with, when accepted.
    #[must_use]
    pub fn protocol(&self) -> Option<&str> {
        self.result.response().and_then(SubmitBatchResponse::protocol)
    }
}

/// One configured connection to the Betha service.
pub struct Betha {
    identity: DocumentIdentity,
    transport: Transport,
    credentials: Arc<dyn Credentials>,
    lots: LotSequence,
}

impl Betha {
    /// Builds a client against the published service URLs.
    ///
    /// `http` is the caller's session: the service authenticates with TLS
    /// client certificates, and the certificate identity is configured on
    /// the `reqwest::Client`, so the same client must carry every call.
    #[must_use]
    pub fn new(
        identity: DocumentIdentity,
        environment: Environment,
        http: reqwest::Client,
        credentials: Arc<dyn Credentials>,
    ) -> Self {
        Self::with_service_urls(
            identity,
            environment,
            http,
            credentials,
            ServiceUrls {
                production: PRODUCTION_BASE_URL.to_string(),
                staging: STAGING_BASE_URL.to_string(),
            },
        )
    }

    /// Like [`Betha::new`] but against explicit base URLs. Integration
    /// tests point this at a local mock server.
    #[must_use]
    pub fn with_service_urls(
        identity: DocumentIdentity,
        environment: Environment,
        http: reqwest::Client,
        credentials: Arc<dyn Credentials>,
        urls: ServiceUrls,
    ) -> Self {
        Self {
            identity,
            transport: Transport::new(http, urls, environment),
            credentials,
            lots: LotSequence::new(),
        }
    }

    /// Replaces the lot sequence, fixing the numbers the next submissions
    /// will use.
    #[must_use]
    pub fn with_lot_sequence(mut self, lots: LotSequence) -> Self {
        self.lots = lots;
        self
    }

    #[must_use]
    pub fn identity(&self) -> &DocumentIdentity {
        &self.identity
    }

    /// Submits one lot of RPS entries as a signed batch.
    ///
    /// Every entry is signed and spliced into the request before anything
    /// is transmitted; any signing or splicing failure aborts the whole
    /// submission. Identifiers are minted fresh per call, so a retry after
    /// a transport failure never reuses a lot number.
    pub async fn submit_batch(&self, lot: &RpsLot) -> Result<SubmitOutcome, TransmissionError> {
        let lot_number = self.lots.next_lot_number();
        let batch_id = BatchId::from_lot_number(lot_number);
        tracing::info!(lot_number, entries = lot.len(), "submitting RPS batch");

        let mut request = wire::submit_request_tree(&self.identity, &batch_id, lot_number, lot);
        let descriptor = service(Operation::SubmitBatch);

        if descriptor.requires_signature {
            let signer = Signer::new(self.credentials.as_ref());
            for rps in &lot.entries {
                let unsigned = wire::rps_element(&self.identity, rps);
                let fragment = signer.sign_element(&unsigned, Some(rps.reference_id()))?;
                splice_signed(&mut request, &fragment)?;
            }
        }

        let envelope = soap::wrap_in_envelope(request).to_xml();
        let raw = self.transport.post_xml(descriptor.endpoint, &envelope).await?;
        let result = soap::parse_call(descriptor, envelope, raw)?;

        Ok(SubmitOutcome {
            batch_id,
            lot_number,
            result,
        })
    }

    /// Consults a submitted batch by its protocol number. Idempotent.
    pub async fn consult_batch(
        &self,
        protocol: &str,
    ) -> Result<CallResult<ConsultBatchResponse>, TransmissionError> {
        let request = ConsultBatchRequest::new(&self.identity, protocol);
        self.transport
            .call(service(Operation::ConsultBatch), &request)
            .await
    }

    /// Consults the issued document for one RPS. Idempotent.
    pub async fn consult_by_rps(
        &self,
        rps: &RpsIdentification,
    ) -> Result<CallResult<ConsultByRpsResponse>, TransmissionError> {
        let request = ConsultByRpsRequest::new(&self.identity, rps);
        self.transport
            .call(service(Operation::ConsultByRps), &request)
            .await
    }

    /// Cancels one issued document by its number, with the fixed reason
    /// code the service expects.
    ///
    /// TODO: confirm against the published ABRASF v2.02 WSDL whether this
    /// deployment validates a signature on `InfPedidoCancelamento`; the
    /// request is currently transmitted unsigned and accepted as such.
    pub async fn cancel_document(
        &self,
        document_number: &str,
    ) -> Result<CallResult<CancelResponse>, TransmissionError> {
        let request = CancelRequest::new(&self.identity, document_number);
        self.transport
            .call(service(Operation::CancelDocument), &request)
            .await
    }

    /// Renders the first issued document embedded in a consult response
    /// body, when one is present.
    #[must_use]
    pub fn first_document_xml(raw_response: &str) -> Option<String> {
        soap::extract_first(raw_response, "CompNfse")
    }
}

/// Replaces the placeholder for `fragment` inside `request` with the
/// signed element.
///
/// The placeholder is located by identity, not by tag order: it is the
/// element one of whose children carries the fragment's reference id as
/// its `Id` attribute. Exactly one such element must exist; zero or
/// several abort the submission before anything is transmitted.
fn splice_signed(
    request: &mut Element,
    fragment: &SignedFragment,
) -> Result<(), TransmissionError> {
    let Some(reference_id) = fragment.reference_id.as_deref() else {
        return Err(TransmissionError::Structural {
            reference_id: String::new(),
            matches: 0,
        });
    };

    let is_placeholder = |el: &Element| {
        el.child_elements()
            .any(|child| child.attr("Id") == Some(reference_id))
    };

    let matches = request.count_descendants(is_placeholder);
    if matches != 1 {
        return Err(TransmissionError::Structural {
            reference_id: reference_id.to_string(),
            matches,
        });
    }

    if let Some(slot) = request.find_descendant_mut(is_placeholder) {
        *slot = fragment.element.clone();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use remessa_types::BatchId;
    use remessa_xmlsec::{Element, SignedFragment};

    use super::splice_signed;
    use crate::error::TransmissionError;

    fn placeholder_tree(ids: &[&str]) -> Element {
        let mut list = Element::new("ListaRps");
        for id in ids {
            list.push_element(
                Element::new("Rps").with_child(Element::new("InfRps").with_attr("Id", *id)),
            );
        }
        Element::new("EnviarLoteRpsEnvio").with_child(list)
    }

    fn fragment(id: &str) -> SignedFragment {
        SignedFragment {
            reference_id: Some(id.to_string()),
            element: Element::new("Rps")
                .with_child(Element::new("InfRps").with_attr("Id", id))
                .with_child(Element::new("Signature")),
        }
    }

    #[test]
    fn splices_by_reference_identity() {
        let mut tree = placeholder_tree(&["rps1", "rps2"]);
        splice_signed(&mut tree, &fragment("rps2")).expect("splice");

        let signed = tree
            .find_descendant(|el| {
                el.child_elements().any(|c| c.attr("Id") == Some("rps2"))
            })
            .expect("rps2 present");
        assert!(signed.child_elements().any(|c| c.name == "Signature"));

        let untouched = tree
            .find_descendant(|el| {
                el.child_elements().any(|c| c.attr("Id") == Some("rps1"))
            })
            .expect("rps1 present");
        assert!(!untouched.child_elements().any(|c| c.name == "Signature"));
    }

    #[test]
    fn missing_placeholder_is_structural() {
        let mut tree = placeholder_tree(&["rps1"]);
        let err = splice_signed(&mut tree, &fragment("rps9")).unwrap_err();
        assert!(matches!(
            err,
            TransmissionError::Structural { matches: 0, .. }
        ));
    }

    #[test]
    fn duplicate_placeholder_is_structural() {
        let mut tree = placeholder_tree(&["rps1", "rps1"]);
        let err = splice_signed(&mut tree, &fragment("rps1")).unwrap_err();
        assert!(matches!(
            err,
            TransmissionError::Structural { matches: 2, .. }
        ));
    }

    #[test]
    fn batch_id_prefix_matches_wire_format() {
        assert_eq!(BatchId::from_lot_number(42).as_str(), "lote42");
    }
}

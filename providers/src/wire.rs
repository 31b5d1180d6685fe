//! Wire schemas for the four Betha operations.
//!
//! Requests and responses follow the ABRASF v2.02 element names the service
//! publishes. The canonical document representation from `remessa-types`
//! maps onto these through the explicit builders below; no business object
//! is ever round-tripped through text to change schema.
//!
//! The submit request is built as an element tree rather than a serde type
//! because the signed RPS fragments are spliced into it before
//! transmission; the other three operations are plain typed calls.

use serde::{Deserialize, Serialize};

use remessa_types::{BatchId, DocumentIdentity, Rps, RpsLot};
use remessa_xmlsec::Element;

use crate::soap::ResponsePayload;

/// Namespace of the Betha NFS-e schema.
pub const NFSE_NS: &str = "http://www.betha.com.br/e-nota-contribuinte-ws";

/// Fixed cancellation reason transmitted with every cancellation request.
pub const CANCELLATION_REASON_CODE: &str = "0001";

fn leaf(name: &str, text: impl Into<String>) -> Element {
    Element::new(name).with_text(text)
}

/// ABRASF encodes booleans as 1 (yes) / 2 (no).
fn flag(value: bool) -> &'static str {
    if value { "1" } else { "2" }
}

/// Builds the `EnviarLoteRpsEnvio` document for one submission.
///
/// Every RPS keeps its `InfRps` `Id`, which is what the signature splicer
/// later resolves placeholders against.
#[must_use]
pub fn submit_request_tree(
    identity: &DocumentIdentity,
    batch_id: &BatchId,
    lot_number: u64,
    lot: &RpsLot,
) -> Element {
    let mut list = Element::new("ListaRps");
    for rps in &lot.entries {
        list.push_element(rps_element(identity, rps));
    }

    Element::new("EnviarLoteRpsEnvio")
        .with_attr("xmlns", NFSE_NS)
        .with_child(
            Element::new("LoteRps")
                .with_attr("Id", batch_id.as_str())
                .with_child(leaf("NumeroLote", lot_number.to_string()))
                .with_child(leaf("Cnpj", identity.cnpj()))
                .with_child(leaf(
                    "InscricaoMunicipal",
                    identity.municipal_registration(),
                ))
                .with_child(leaf("QuantidadeRps", lot.len().to_string()))
                .with_child(list),
        )
}

/// Maps one canonical RPS onto its wire element.
#[must_use]
pub fn rps_element(identity: &DocumentIdentity, rps: &Rps) -> Element {
    let identification = Element::new("IdentificacaoRps")
        .with_child(leaf("Numero", rps.identification.number.to_string()))
        .with_child(leaf("Serie", rps.identification.series.clone()))
        .with_child(leaf("Tipo", rps.identification.kind.code().to_string()));

    let values = Element::new("Valores")
        .with_child(leaf("ValorServicos", rps.service.amount.clone()))
        .with_child(leaf("Aliquota", rps.service.iss_rate.clone()));

    let service = Element::new("Servico")
        .with_child(values)
        .with_child(leaf("ItemListaServico", rps.service.item_code.clone()))
        .with_child(leaf("Discriminacao", rps.service.description.clone()))
        .with_child(leaf(
            "CodigoMunicipio",
            rps.service.municipality_code.to_string(),
        ));

    let provider = Element::new("Prestador")
        .with_child(leaf("Cnpj", identity.cnpj()))
        .with_child(leaf(
            "InscricaoMunicipal",
            identity.municipal_registration(),
        ));

    let info = Element::new("InfRps")
        .with_attr("Id", rps.info_id.clone())
        .with_child(identification)
        .with_child(leaf("DataEmissao", rps.issue_date.clone()))
        .with_child(leaf("NaturezaOperacao", rps.operation_nature.to_string()))
        .with_child(leaf("OptanteSimplesNacional", flag(rps.simples_nacional)))
        .with_child(leaf("IncentivadorCultural", flag(rps.cultural_incentive)))
        .with_child(leaf("Status", rps.status.to_string()))
        .with_child(service)
        .with_child(provider);

    Element::new("Rps").with_child(info)
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderIdentification {
    #[serde(rename = "Cnpj")]
    pub cnpj: String,
    #[serde(rename = "InscricaoMunicipal")]
    pub municipal_registration: String,
}

impl From<&DocumentIdentity> for ProviderIdentification {
    fn from(identity: &DocumentIdentity) -> Self {
        Self {
            cnpj: identity.cnpj().to_string(),
            municipal_registration: identity.municipal_registration().to_string(),
        }
    }
}

/// `ConsultarLoteRpsEnvio` — consult a submitted batch by protocol number.
#[derive(Debug, Clone, Serialize)]
#[serde(rename = "ConsultarLoteRpsEnvio")]
pub struct ConsultBatchRequest {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "Prestador")]
    pub provider: ProviderIdentification,
    #[serde(rename = "Protocolo")]
    pub protocol: String,
}

impl ConsultBatchRequest {
    #[must_use]
    pub fn new(identity: &DocumentIdentity, protocol: impl Into<String>) -> Self {
        Self {
            xmlns: NFSE_NS,
            provider: identity.into(),
            protocol: protocol.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RpsIdentificationBody {
    #[serde(rename = "Numero")]
    pub number: u64,
    #[serde(rename = "Serie")]
    pub series: String,
    #[serde(rename = "Tipo")]
    pub kind: u8,
}

/// `ConsultarNfsePorRpsEnvio` — consult the issued document for one RPS.
#[derive(Debug, Clone, Serialize)]
#[serde(rename = "ConsultarNfsePorRpsEnvio")]
pub struct ConsultByRpsRequest {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "IdentificacaoRps")]
    pub rps: RpsIdentificationBody,
    #[serde(rename = "Prestador")]
    pub provider: ProviderIdentification,
}

impl ConsultByRpsRequest {
    #[must_use]
    pub fn new(identity: &DocumentIdentity, rps: &remessa_types::RpsIdentification) -> Self {
        Self {
            xmlns: NFSE_NS,
            rps: RpsIdentificationBody {
                number: rps.number,
                series: rps.series.clone(),
                kind: rps.kind.code(),
            },
            provider: identity.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentIdentification {
    #[serde(rename = "Numero")]
    pub number: String,
    #[serde(rename = "Cnpj")]
    pub cnpj: String,
    #[serde(rename = "InscricaoMunicipal")]
    pub municipal_registration: String,
    #[serde(rename = "CodigoMunicipio")]
    pub municipality_code: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationInfo {
    #[serde(rename = "@Id")]
    pub id: String,
    #[serde(rename = "IdentificacaoNfse")]
    pub document: DocumentIdentification,
    #[serde(rename = "CodigoCancelamento")]
    pub reason_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationOrder {
    #[serde(rename = "InfPedidoCancelamento")]
    pub info: CancellationInfo,
}

/// `CancelarNfseEnvio` — cancel one issued document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename = "CancelarNfseEnvio")]
pub struct CancelRequest {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "Pedido")]
    pub order: CancellationOrder,
}

impl CancelRequest {
    #[must_use]
    pub fn new(identity: &DocumentIdentity, document_number: impl Into<String>) -> Self {
        let document_number = document_number.into();
        Self {
            xmlns: NFSE_NS,
            order: CancellationOrder {
                info: CancellationInfo {
                    id: document_number.clone(),
                    document: DocumentIdentification {
                        number: document_number,
                        cnpj: identity.cnpj().to_string(),
                        municipal_registration: identity.municipal_registration().to_string(),
                        municipality_code: identity.municipality_code(),
                    },
                    reason_code: CANCELLATION_REASON_CODE.to_string(),
                },
            },
        }
    }
}

/// One entry of a response's return-message list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReturnMessage {
    #[serde(rename = "Codigo")]
    pub code: String,
    #[serde(rename = "Mensagem", default)]
    pub message: String,
    #[serde(rename = "Correcao")]
    pub correction: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReturnMessageList {
    #[serde(rename = "MensagemRetorno", default)]
    pub messages: Vec<ReturnMessage>,
}

fn messages_of(list: Option<&ReturnMessageList>) -> &[ReturnMessage] {
    list.map_or(&[], |l| l.messages.as_slice())
}

/// `EnviarLoteRpsResposta`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitBatchResponse {
    #[serde(rename = "NumeroLote")]
    pub lot_number: Option<u64>,
    #[serde(rename = "DataRecebimento")]
    pub received_at: Option<String>,
    #[serde(rename = "Protocolo")]
    pub protocol: Option<String>,
    #[serde(rename = "ListaMensagemRetorno")]
    pub message_list: Option<ReturnMessageList>,
}

impl SubmitBatchResponse {
    /// Non-empty protocol number, the success predicate for submission.
    #[must_use]
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref().filter(|p| !p.trim().is_empty())
    }

    #[must_use]
    pub fn messages(&self) -> &[ReturnMessage] {
        messages_of(self.message_list.as_ref())
    }
}

impl ResponsePayload for SubmitBatchResponse {
    fn identifying_value(&self) -> Option<&str> {
        self.protocol.as_deref()
    }
    fn return_messages(&self) -> &[ReturnMessage] {
        self.messages()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuedDocumentInfo {
    #[serde(rename = "Numero")]
    pub number: Option<String>,
    #[serde(rename = "CodigoVerificacao")]
    pub verification_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuedDocument {
    #[serde(rename = "InfNfse")]
    pub info: IssuedDocumentInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComplementedDocument {
    #[serde(rename = "Nfse")]
    pub document: Option<IssuedDocument>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssuedDocumentList {
    #[serde(rename = "CompNfse", default)]
    pub entries: Vec<ComplementedDocument>,
}

/// `ConsultarLoteRpsResposta`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsultBatchResponse {
    #[serde(rename = "ListaNfse")]
    pub document_list: Option<IssuedDocumentList>,
    #[serde(rename = "ListaMensagemRetorno")]
    pub message_list: Option<ReturnMessageList>,
}

impl ConsultBatchResponse {
    #[must_use]
    pub fn messages(&self) -> &[ReturnMessage] {
        messages_of(self.message_list.as_ref())
    }

    /// Whether the batch already produced issued documents.
    #[must_use]
    pub fn has_documents(&self) -> bool {
        self.document_list
            .as_ref()
            .is_some_and(|list| !list.entries.is_empty())
    }

    #[must_use]
    pub fn first_document_number(&self) -> Option<&str> {
        self.document_list
            .as_ref()?
            .entries
            .first()?
            .document
            .as_ref()?
            .info
            .number
            .as_deref()
    }
}

impl ResponsePayload for ConsultBatchResponse {
    fn identifying_value(&self) -> Option<&str> {
        self.first_document_number()
    }
    fn return_messages(&self) -> &[ReturnMessage] {
        self.messages()
    }
}

/// `ConsultarNfseRpsResposta`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsultByRpsResponse {
    #[serde(rename = "CompNfse")]
    pub document: Option<ComplementedDocument>,
    #[serde(rename = "ListaMensagemRetorno")]
    pub message_list: Option<ReturnMessageList>,
}

impl ConsultByRpsResponse {
    #[must_use]
    pub fn messages(&self) -> &[ReturnMessage] {
        messages_of(self.message_list.as_ref())
    }

    #[must_use]
    pub fn document_number(&self) -> Option<&str> {
        self.document
            .as_ref()?
            .document
            .as_ref()?
            .info
            .number
            .as_deref()
    }
}

impl ResponsePayload for ConsultByRpsResponse {
    fn identifying_value(&self) -> Option<&str> {
        self.document_number()
    }
    fn return_messages(&self) -> &[ReturnMessage] {
        self.messages()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancellationConfirmation {
    #[serde(rename = "DataHora")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancellationReturn {
    #[serde(rename = "NfseCancelamento")]
    pub cancellation: Option<CancellationConfirmationWrapper>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancellationConfirmationWrapper {
    #[serde(rename = "Confirmacao")]
    pub confirmation: Option<CancellationConfirmation>,
}

/// `CancelarNfseResposta`.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelResponse {
    #[serde(rename = "RetCancelamento")]
    pub cancellation_return: Option<CancellationReturn>,
    #[serde(rename = "ListaMensagemRetorno")]
    pub message_list: Option<ReturnMessageList>,
}

impl CancelResponse {
    #[must_use]
    pub fn messages(&self) -> &[ReturnMessage] {
        messages_of(self.message_list.as_ref())
    }

    /// Timestamp of the cancellation confirmation, the success predicate
    /// for cancellation.
    #[must_use]
    pub fn confirmation_timestamp(&self) -> Option<&str> {
        self.cancellation_return
            .as_ref()?
            .cancellation
            .as_ref()?
            .confirmation
            .as_ref()?
            .timestamp
            .as_deref()
    }
}

impl ResponsePayload for CancelResponse {
    fn identifying_value(&self) -> Option<&str> {
        self.confirmation_timestamp()
    }
    fn return_messages(&self) -> &[ReturnMessage] {
        self.messages()
    }
}

#[cfg(test)]
mod tests {
    use remessa_types::{
        BatchId, DocumentIdentity, Rps, RpsIdentification, RpsKind, RpsLot, ServiceEntry,
    };

    use super::{
        CancelRequest, ConsultBatchRequest, ConsultBatchResponse, SubmitBatchResponse,
        submit_request_tree,
    };

    fn identity() -> DocumentIdentity {
        DocumentIdentity::new("48460292000171", "8365", 4216305)
    }

    fn one_entry_lot() -> RpsLot {
        RpsLot::new(vec![Rps {
            info_id: "rps1".to_string(),
            identification: RpsIdentification::new(343, "111", RpsKind::Rps),
            issue_date: "2023-05-02".to_string(),
            operation_nature: 1,
            simples_nacional: true,
            cultural_incentive: false,
            status: 1,
            service: ServiceEntry {
                amount: "100.00".to_string(),
                iss_rate: "0.02".to_string(),
                item_code: "01.01".to_string(),
                description: "Consulting".to_string(),
                municipality_code: 4216305,
            },
        }])
    }

    #[test]
    fn submit_tree_carries_batch_identifiers() {
        let tree = submit_request_tree(&identity(), &BatchId::from_lot_number(7), 7, &one_entry_lot());
        let xml = tree.to_xml();
        assert!(xml.contains(r#"<LoteRps Id="lote7">"#));
        assert!(xml.contains("<NumeroLote>7</NumeroLote>"));
        assert!(xml.contains("<QuantidadeRps>1</QuantidadeRps>"));
        assert!(xml.contains(r#"<InfRps Id="rps1">"#));
        assert!(xml.contains("<Numero>343</Numero>"));
        assert!(xml.contains("<Serie>111</Serie>"));
        assert!(xml.contains("<Tipo>1</Tipo>"));
    }

    #[test]
    fn submit_tree_preserves_entry_order() {
        let mut lot = one_entry_lot();
        let mut second = lot.entries[0].clone();
        second.info_id = "rps2".to_string();
        second.identification.number = 344;
        lot.entries.push(second);

        let tree = submit_request_tree(&identity(), &BatchId::from_lot_number(1), 1, &lot);
        let xml = tree.to_xml();
        let first = xml.find(r#"Id="rps1""#).unwrap();
        let second = xml.find(r#"Id="rps2""#).unwrap();
        assert!(first < second);
    }

    #[test]
    fn consult_batch_request_serializes_to_schema() {
        let request = ConsultBatchRequest::new(&identity(), "P2023");
        let xml = quick_xml::se::to_string(&request).unwrap();
        assert!(xml.starts_with("<ConsultarLoteRpsEnvio"));
        assert!(xml.contains("<Cnpj>48460292000171</Cnpj>"));
        assert!(xml.contains("<InscricaoMunicipal>8365</InscricaoMunicipal>"));
        assert!(xml.contains("<Protocolo>P2023</Protocolo>"));
    }

    #[test]
    fn cancel_request_carries_identity_and_fixed_reason() {
        let request = CancelRequest::new(&identity(), "123");
        let xml = quick_xml::se::to_string(&request).unwrap();
        assert!(xml.contains(r#"<InfPedidoCancelamento Id="123">"#));
        assert!(xml.contains("<Numero>123</Numero>"));
        assert!(xml.contains("<Cnpj>48460292000171</Cnpj>"));
        assert!(xml.contains("<InscricaoMunicipal>8365</InscricaoMunicipal>"));
        assert!(xml.contains("<CodigoMunicipio>4216305</CodigoMunicipio>"));
        assert!(xml.contains("<CodigoCancelamento>0001</CodigoCancelamento>"));
    }

    #[test]
    fn submit_response_protocol_predicate() {
        let with: SubmitBatchResponse = quick_xml::de::from_str(
            "<EnviarLoteRpsResposta><NumeroLote>7</NumeroLote>\
             <Protocolo>P1</Protocolo></EnviarLoteRpsResposta>",
        )
        .unwrap();
        assert_eq!(with.protocol(), Some("P1"));
        assert_eq!(with.lot_number, Some(7));

        let without: SubmitBatchResponse = quick_xml::de::from_str(
            "<EnviarLoteRpsResposta><Protocolo></Protocolo></EnviarLoteRpsResposta>",
        )
        .unwrap();
        assert_eq!(without.protocol(), None);
    }

    #[test]
    fn consult_response_reads_messages_and_documents() {
        let pending: ConsultBatchResponse = quick_xml::de::from_str(
            "<ConsultarLoteRpsResposta><ListaMensagemRetorno>\
             <MensagemRetorno><Codigo>E92</Codigo><Mensagem>nao processado</Mensagem>\
             </MensagemRetorno></ListaMensagemRetorno></ConsultarLoteRpsResposta>",
        )
        .unwrap();
        assert_eq!(pending.messages().len(), 1);
        assert_eq!(pending.messages()[0].code, "E92");
        assert!(!pending.has_documents());

        let done: ConsultBatchResponse = quick_xml::de::from_str(
            "<ConsultarLoteRpsResposta><ListaNfse><CompNfse><Nfse><InfNfse>\
             <Numero>555</Numero><CodigoVerificacao>abc</CodigoVerificacao>\
             </InfNfse></Nfse></CompNfse></ListaNfse></ConsultarLoteRpsResposta>",
        )
        .unwrap();
        assert!(done.has_documents());
        assert_eq!(done.first_document_number(), Some("555"));
        assert!(done.messages().is_empty());
    }
}

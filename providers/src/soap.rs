//! SOAP 1.1 envelope assembly and unwrapping.
//!
//! Requests are wrapped in a minimal `soapenv:Envelope`/`Body` pair.
//! Responses are unwrapped by local name so the prefix the service chooses
//! (`soap:`, `S:`, none) never matters, and an undeclared `Header` element
//! — which some deployments emit even though their service description
//! does not declare one — is tolerated and surfaced on the call result
//! instead of being an error.
//!
//! Classification never raises for a well-formed remote fault: a fault is
//! one of the four outcome shapes, returned as data.

use serde::de::DeserializeOwned;

use remessa_xmlsec::{Element, Node};

use crate::error::TransmissionError;
use crate::registry::ServiceDescriptor;
use crate::transport::RawResponse;
use crate::wire::ReturnMessage;

/// SOAP 1.1 envelope namespace.
pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Wraps an operation payload in a fresh request envelope.
#[must_use]
pub fn wrap_in_envelope(payload: Element) -> Element {
    Element::new("soapenv:Envelope")
        .with_attr("xmlns:soapenv", SOAP_ENV_NS)
        .with_child(Element::new("soapenv:Body").with_child(payload))
}

/// A remote SOAP fault, returned as data rather than raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    pub code: String,
    pub string: String,
    pub actor: Option<String>,
    pub detail: Option<String>,
}

/// What the response body carried: the operation result, or a fault in its
/// place.
#[derive(Debug, Clone)]
pub enum CallPayload<T> {
    Response(T),
    Fault(SoapFault),
}

/// Normalized view of one completed remote call.
///
/// Success is a caller-visible predicate on the typed response, not a
/// stored boolean: different operations define it differently (a protocol
/// number for submissions, a cancellation confirmation for cancellations).
#[derive(Debug, Clone)]
pub struct CallResult<T> {
    /// Root element name of the transmitted request.
    pub operation: &'static str,
    /// The request document as transmitted.
    pub request_xml: String,
    /// The response body as received.
    pub raw_response: String,
    /// Rendered XML of the undeclared response header, when present.
    pub header: Option<String>,
    pub payload: CallPayload<T>,
}

impl<T> CallResult<T> {
    #[must_use]
    pub fn response(&self) -> Option<&T> {
        match &self.payload {
            CallPayload::Response(response) => Some(response),
            CallPayload::Fault(_) => None,
        }
    }

    #[must_use]
    pub fn fault(&self) -> Option<&SoapFault> {
        match &self.payload {
            CallPayload::Fault(fault) => Some(fault),
            CallPayload::Response(_) => None,
        }
    }
}

/// The four outcome shapes a completed call classifies into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Result present and carrying its identifying field.
    SuccessWithData,
    /// Result present but the identifying field is absent or empty.
    SuccessEmpty,
    /// The body carried a fault element instead of the response.
    ProtocolFault,
    /// The call succeeded at the protocol level but the result embeds
    /// business error codes.
    BusinessRejection,
}

/// Operation responses that can be classified uniformly.
pub trait ResponsePayload {
    /// The field whose presence defines success for this operation.
    fn identifying_value(&self) -> Option<&str>;
    fn return_messages(&self) -> &[ReturnMessage];
}

impl<T: ResponsePayload> CallResult<T> {
    /// Classifies this result. The judgment of whether an outcome is
    /// acceptable stays with the caller.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match &self.payload {
            CallPayload::Fault(_) => Outcome::ProtocolFault,
            CallPayload::Response(response) => {
                if response
                    .identifying_value()
                    .is_some_and(|value| !value.trim().is_empty())
                {
                    Outcome::SuccessWithData
                } else if response.return_messages().is_empty() {
                    Outcome::SuccessEmpty
                } else {
                    Outcome::BusinessRejection
                }
            }
        }
    }
}

/// Unwraps a raw response into a typed call result.
///
/// Fault envelopes often arrive on HTTP error statuses; a body that parses
/// as an envelope is honored regardless of status, and the HTTP status is
/// only an error when the body is not an envelope at all.
pub fn parse_call<T: DeserializeOwned>(
    descriptor: &ServiceDescriptor,
    request_xml: String,
    raw: RawResponse,
) -> Result<CallResult<T>, TransmissionError> {
    let root = match Element::parse(&raw.body) {
        Ok(root) => root,
        Err(err) if !raw.is_success() => {
            tracing::warn!(status = raw.status, error = %err, "non-envelope error body");
            return Err(TransmissionError::Http { status: raw.status });
        }
        Err(err) => return Err(err.into()),
    };

    if root.local_name() != "Envelope" {
        // Gateways answer error statuses with XHTML error pages, which
        // parse as XML without being envelopes.
        if !raw.is_success() {
            return Err(TransmissionError::Http { status: raw.status });
        }
        return Err(TransmissionError::malformed_envelope(format!(
            "expected Envelope, found {}",
            root.local_name()
        )));
    }

    let header = root
        .child_elements()
        .find(|el| el.local_name() == "Header")
        .map(Element::to_xml);

    let body = root
        .child_elements()
        .find(|el| el.local_name() == "Body")
        .ok_or_else(|| TransmissionError::malformed_envelope("envelope has no Body"))?;

    let payload = if let Some(fault) = body.find_descendant(|el| el.local_name() == "Fault") {
        CallPayload::Fault(parse_fault(fault))
    } else if let Some(result) = body.find_descendant(|el| el.local_name() == descriptor.result_tag)
    {
        let mut unqualified = result.clone();
        strip_prefixes(&mut unqualified);
        let typed = quick_xml::de::from_str(&unqualified.to_xml())
            .map_err(TransmissionError::Decode)?;
        CallPayload::Response(typed)
    } else if raw.is_success() {
        return Err(TransmissionError::malformed_envelope(format!(
            "body carries neither {} nor a fault",
            descriptor.result_tag
        )));
    } else {
        return Err(TransmissionError::Http { status: raw.status });
    };

    Ok(CallResult {
        operation: descriptor.operation,
        request_xml,
        raw_response: raw.body,
        header,
        payload,
    })
}

fn parse_fault(fault: &Element) -> SoapFault {
    let child_text = |local: &str| {
        fault
            .child_elements()
            .find(|el| el.local_name() == local)
            .map(|el| el.text())
    };
    SoapFault {
        code: child_text("faultcode").unwrap_or_default(),
        string: child_text("faultstring").unwrap_or_default(),
        actor: child_text("faultactor").filter(|s| !s.is_empty()),
        detail: fault
            .child_elements()
            .find(|el| el.local_name() == "detail")
            .map(Element::to_xml),
    }
}

/// Renders the first descendant with the given local name, if any. Used to
/// surface the issued document embedded in a consult response.
#[must_use]
pub fn extract_first(body: &str, local: &str) -> Option<String> {
    let root = Element::parse(body).ok()?;
    root.find_descendant(|el| el.local_name() == local)
        .map(Element::to_xml)
}

/// Rewrites every element name in the subtree to its local part so schema
/// deserialization is independent of the prefixes the service chose.
fn strip_prefixes(element: &mut Element) {
    element.name = element.local_name().to_string();
    for child in &mut element.children {
        if let Node::Element(el) = child {
            strip_prefixes(el);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use remessa_xmlsec::Element;

    use super::{CallPayload, Outcome, ResponsePayload, parse_call, wrap_in_envelope};
    use crate::error::TransmissionError;
    use crate::registry::ServiceDescriptor;
    use crate::transport::RawResponse;
    use crate::wire::ReturnMessage;

    const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
        operation: "EnviarLoteRpsEnvio",
        endpoint: "recepcionarLoteRps",
        result_tag: "EnviarLoteRpsResposta",
        requires_signature: true,
    };

    #[derive(Debug, Deserialize)]
    struct BareResponse {
        #[serde(rename = "Protocolo")]
        protocol: Option<String>,
    }

    fn ok(body: &str) -> RawResponse {
        RawResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    #[test]
    fn wraps_payload_in_body() {
        let envelope = wrap_in_envelope(Element::new("ConsultarLoteRpsEnvio"));
        assert_eq!(
            envelope.to_xml(),
            "<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\">\
             <soapenv:Body><ConsultarLoteRpsEnvio/></soapenv:Body></soapenv:Envelope>"
        );
    }

    #[test]
    fn unwraps_response_regardless_of_prefix() {
        for (open, close) in [("soap:", "soap:"), ("S:", "S:"), ("", "")] {
            let body = format!(
                "<{open}Envelope xmlns:{pfx}=\"http://schemas.xmlsoap.org/soap/envelope/\">\
                 <{open}Body><ns2:EnviarLoteRpsEnvioResponse>\
                 <EnviarLoteRpsResposta><Protocolo>P123</Protocolo></EnviarLoteRpsResposta>\
                 </ns2:EnviarLoteRpsEnvioResponse></{close}Body></{close}Envelope>",
                pfx = if open.is_empty() { "x" } else { open.trim_end_matches(':') },
            );
            let result =
                parse_call::<BareResponse>(&DESCRIPTOR, String::new(), ok(&body)).expect("parse");
            let response = result.response().expect("response payload");
            assert_eq!(response.protocol.as_deref(), Some("P123"));
        }
    }

    #[test]
    fn strips_prefixes_inside_the_result() {
        let body = "<Envelope><Body><ns2:EnviarLoteRpsResposta xmlns:ns2=\"urn:x\">\
                    <ns2:Protocolo>P9</ns2:Protocolo></ns2:EnviarLoteRpsResposta></Body></Envelope>";
        let result = parse_call::<BareResponse>(&DESCRIPTOR, String::new(), ok(body)).expect("parse");
        assert_eq!(
            result.response().unwrap().protocol.as_deref(),
            Some("P9")
        );
    }

    #[test]
    fn tolerates_undeclared_header() {
        let body = "<Envelope><Header><Trace>abc</Trace></Header><Body>\
                    <EnviarLoteRpsResposta><Protocolo>P1</Protocolo></EnviarLoteRpsResposta>\
                    </Body></Envelope>";
        let result = parse_call::<BareResponse>(&DESCRIPTOR, String::new(), ok(body)).expect("parse");
        assert_eq!(
            result.header.as_deref(),
            Some("<Header><Trace>abc</Trace></Header>")
        );
    }

    #[test]
    fn classifies_fault_bodies_without_error() {
        let body = "<Envelope><Body><Fault>\
                    <faultcode>soap:Server</faultcode>\
                    <faultstring>internal error</faultstring>\
                    <faultactor>urn:betha</faultactor>\
                    <detail><cause>backend down</cause></detail>\
                    </Fault></Body></Envelope>";
        let result =
            parse_call::<BareResponse>(&DESCRIPTOR, String::new(), RawResponse {
                status: 500,
                body: body.to_string(),
            })
            .expect("fault is data, not an error");
        let fault = result.fault().expect("fault payload");
        assert_eq!(fault.code, "soap:Server");
        assert_eq!(fault.string, "internal error");
        assert_eq!(fault.actor.as_deref(), Some("urn:betha"));
        assert!(fault.detail.as_deref().unwrap().contains("backend down"));
    }

    #[test]
    fn http_error_with_non_envelope_body_is_transport_level() {
        let raw = RawResponse {
            status: 502,
            body: "Bad Gateway".to_string(),
        };
        let result = parse_call::<BareResponse>(&DESCRIPTOR, String::new(), raw);
        assert!(matches!(
            result,
            Err(TransmissionError::Http { status: 502 })
        ));
    }

    #[test]
    fn http_error_with_xhtml_body_is_transport_level() {
        // Parses as XML but is not an envelope.
        let raw = RawResponse {
            status: 503,
            body: "<html><body><h1>Service Unavailable</h1></body></html>".to_string(),
        };
        let result = parse_call::<BareResponse>(&DESCRIPTOR, String::new(), raw);
        assert!(matches!(
            result,
            Err(TransmissionError::Http { status: 503 })
        ));
    }

    #[test]
    fn non_envelope_body_on_success_status_is_malformed() {
        let raw = RawResponse {
            status: 200,
            body: "<html><body>ok</body></html>".to_string(),
        };
        let result = parse_call::<BareResponse>(&DESCRIPTOR, String::new(), raw);
        assert!(matches!(
            result,
            Err(TransmissionError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn missing_result_element_is_malformed() {
        let body = "<Envelope><Body><SomethingElse/></Body></Envelope>";
        let result = parse_call::<BareResponse>(&DESCRIPTOR, String::new(), ok(body));
        assert!(matches!(
            result,
            Err(TransmissionError::MalformedEnvelope { .. })
        ));
    }

    struct FakeResponse {
        identifying: Option<String>,
        messages: Vec<ReturnMessage>,
    }

    impl ResponsePayload for FakeResponse {
        fn identifying_value(&self) -> Option<&str> {
            self.identifying.as_deref()
        }
        fn return_messages(&self) -> &[ReturnMessage] {
            &self.messages
        }
    }

    fn result_with(payload: CallPayload<FakeResponse>) -> super::CallResult<FakeResponse> {
        super::CallResult {
            operation: "EnviarLoteRpsEnvio",
            request_xml: String::new(),
            raw_response: String::new(),
            header: None,
            payload,
        }
    }

    #[test]
    fn outcome_distinguishes_all_four_shapes() {
        let with_data = result_with(CallPayload::Response(FakeResponse {
            identifying: Some("P1".to_string()),
            messages: Vec::new(),
        }));
        assert_eq!(with_data.outcome(), Outcome::SuccessWithData);

        let empty = result_with(CallPayload::Response(FakeResponse {
            identifying: None,
            messages: Vec::new(),
        }));
        assert_eq!(empty.outcome(), Outcome::SuccessEmpty);

        let rejected = result_with(CallPayload::Response(FakeResponse {
            identifying: None,
            messages: vec![ReturnMessage {
                code: "E10".to_string(),
                message: "invalid lot".to_string(),
                correction: None,
            }],
        }));
        assert_eq!(rejected.outcome(), Outcome::BusinessRejection);

        let fault = result_with(CallPayload::Fault(super::SoapFault {
            code: "soap:Server".to_string(),
            string: String::new(),
            actor: None,
            detail: None,
        }));
        assert_eq!(fault.outcome(), Outcome::ProtocolFault);
    }

    #[test]
    fn blank_identifying_value_is_empty_success() {
        let blank = result_with(CallPayload::Response(FakeResponse {
            identifying: Some("   ".to_string()),
            messages: Vec::new(),
        }));
        assert_eq!(blank.outcome(), Outcome::SuccessEmpty);
    }
}

//! HTTP transport shared by every operation.
//!
//! The transport owns the environment decision: each call resolves its
//! endpoint against the production or staging base URL at call time, so one
//! client can serve both environments behind a single configuration flag.

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use remessa_types::Environment;
use remessa_xmlsec::Element;

use crate::error::TransmissionError;
use crate::registry::ServiceDescriptor;
use crate::soap::{self, CallResult};

/// Raw outcome of one HTTP exchange, before any envelope parsing.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Production and staging base URLs of one provider.
#[derive(Debug, Clone)]
pub struct ServiceUrls {
    pub production: String,
    pub staging: String,
}

impl ServiceUrls {
    #[must_use]
    pub fn base_for(&self, environment: Environment) -> &str {
        if environment.is_staging() {
            &self.staging
        } else {
            &self.production
        }
    }
}

/// Posts SOAP envelopes to a provider's endpoints.
///
/// The HTTP client is supplied by the caller and shared by every call,
/// typed and raw alike. The service authenticates connections with TLS
/// client certificates, and that identity lives on the client, so building
/// a session internally would silently drop it.
#[derive(Debug, Clone)]
pub struct Transport {
    http: Client,
    urls: ServiceUrls,
    environment: Environment,
}

impl Transport {
    #[must_use]
    pub fn new(http: Client, urls: ServiceUrls, environment: Environment) -> Self {
        Self {
            http,
            urls,
            environment,
        }
    }

    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Resolves an operation endpoint against the active base URL.
    pub fn resolve(&self, endpoint: &str) -> Result<Url, TransmissionError> {
        let base = self.urls.base_for(self.environment);
        let joined = Url::parse(base)
            .and_then(|base| base.join(endpoint))
            .map_err(|source| TransmissionError::Endpoint {
                endpoint: endpoint.to_string(),
                source,
            })?;
        Ok(joined)
    }

    /// Posts one envelope and returns the raw exchange.
    ///
    /// Non-2xx statuses are not errors here. Providers return fault
    /// envelopes with error statuses, and those bodies still need parsing.
    pub async fn post_xml(
        &self,
        endpoint: &str,
        envelope: &str,
    ) -> Result<RawResponse, TransmissionError> {
        let url = self.resolve(endpoint)?;
        tracing::debug!(%url, bytes = envelope.len(), "posting envelope");

        let response = self
            .http
            .post(url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .body(envelope.to_string())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!(status, bytes = body.len(), "received response");

        Ok(RawResponse { status, body })
    }

    /// Typed call path: serializes the request, wraps it in an envelope,
    /// posts it, and classifies the response under the descriptor's result
    /// tag.
    pub async fn call<Req, Resp>(
        &self,
        descriptor: &ServiceDescriptor,
        request: &Req,
    ) -> Result<CallResult<Resp>, TransmissionError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let body = quick_xml::se::to_string(request).map_err(TransmissionError::Encode)?;
        // Parse back into the tree form so the envelope wrapper works from
        // one representation for both the typed and the signed paths.
        let tree = Element::parse(&body)?;
        let envelope = soap::wrap_in_envelope(tree).to_xml();
        let raw = self.post_xml(descriptor.endpoint, &envelope).await?;
        soap::parse_call(descriptor, envelope, raw)
    }
}

#[cfg(test)]
mod tests {
    use remessa_types::Environment;
    use reqwest::Client;

    use super::{RawResponse, ServiceUrls, Transport};

    fn urls() -> ServiceUrls {
        ServiceUrls {
            production: "https://example.com/ws/".to_string(),
            staging: "https://example.com/test-ws/".to_string(),
        }
    }

    #[test]
    fn resolves_against_environment_base() {
        let production = Transport::new(Client::new(), urls(), Environment::Production);
        assert_eq!(
            production.resolve("recepcionarLoteRps").unwrap().as_str(),
            "https://example.com/ws/recepcionarLoteRps"
        );

        let staging = Transport::new(Client::new(), urls(), Environment::Staging);
        assert_eq!(
            staging.resolve("recepcionarLoteRps").unwrap().as_str(),
            "https://example.com/test-ws/recepcionarLoteRps"
        );
    }

    #[test]
    fn resolve_keeps_query_suffixes() {
        let transport = Transport::new(Client::new(), urls(), Environment::Production);
        assert_eq!(
            transport.resolve("cancelarNfse?wsdl").unwrap().as_str(),
            "https://example.com/ws/cancelarNfse?wsdl"
        );
    }

    #[test]
    fn rejects_unparseable_base() {
        let transport = Transport::new(
            Client::new(),
            ServiceUrls {
                production: "not a url".to_string(),
                staging: "not a url".to_string(),
            },
            Environment::Production,
        );
        assert!(transport.resolve("recepcionarLoteRps").is_err());
    }

    #[test]
    fn raw_response_success_window() {
        assert!(RawResponse { status: 200, body: String::new() }.is_success());
        assert!(RawResponse { status: 299, body: String::new() }.is_success());
        assert!(!RawResponse { status: 302, body: String::new() }.is_success());
        assert!(!RawResponse { status: 500, body: String::new() }.is_success());
    }
}

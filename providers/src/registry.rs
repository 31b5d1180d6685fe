//! Static service and provider registries.
//!
//! Two lookups live here: the per-provider table mapping a logical
//! operation to its endpoint path and result element, and the dispatch
//! table mapping an IBGE municipality code to the provider that serves it.
//! Both are fixed at compile time; descriptors are constructed once and
//! shared.

/// The four logical operations every municipal provider exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SubmitBatch,
    ConsultBatch,
    ConsultByRps,
    CancelDocument,
}

impl Operation {
    pub const ALL: [Self; 4] = [
        Self::SubmitBatch,
        Self::ConsultBatch,
        Self::ConsultByRps,
        Self::CancelDocument,
    ];
}

/// How one logical operation maps onto a provider's service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Root element of the request document.
    pub operation: &'static str,
    /// Endpoint path, relative to the environment-selected base URL.
    pub endpoint: &'static str,
    /// Local name of the result element nested in the response envelope.
    pub result_tag: &'static str,
    /// Whether entries in the request must carry an enveloped signature.
    pub requires_signature: bool,
}

/// Municipal providers this crate can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Betha,
}

/// Selects the provider serving a municipality, by IBGE code.
///
/// Returns `None` for municipalities no integrated provider serves.
#[must_use]
pub fn provider_for(municipality_code: u32) -> Option<ProviderKind> {
    match municipality_code {
        // Santa Catarina municipalities on the Betha webservice.
        4202404 | 4204608 | 4216305 => Some(ProviderKind::Betha),
        _ => None,
    }
}

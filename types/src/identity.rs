use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed identity of the service provider issuing documents.
///
/// Supplied once at client construction and stamped into every outgoing
/// request: batch submissions, status consults, and cancellations all carry
/// it. Immutable for the client's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentIdentity {
    /// Taxpayer registration (CNPJ), digits only.
    cnpj: String,
    /// Municipal registration number.
    municipal_registration: String,
    /// IBGE municipality code.
    municipality_code: u32,
}

impl DocumentIdentity {
    #[must_use]
    pub fn new(
        cnpj: impl Into<String>,
        municipal_registration: impl Into<String>,
        municipality_code: u32,
    ) -> Self {
        Self {
            cnpj: cnpj.into(),
            municipal_registration: municipal_registration.into(),
            municipality_code,
        }
    }

    #[must_use]
    pub fn cnpj(&self) -> &str {
        &self.cnpj
    }

    #[must_use]
    pub fn municipal_registration(&self) -> &str {
        &self.municipal_registration
    }

    #[must_use]
    pub const fn municipality_code(&self) -> u32 {
        self.municipality_code
    }
}

/// Kind code of a provisional receipt, per the ABRASF v2.02 schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpsKind {
    /// Plain RPS.
    Rps,
    /// Invoice issued jointly with another document.
    ConjugatedInvoice,
    /// Coupon.
    Coupon,
}

impl RpsKind {
    /// Numeric code transmitted on the wire.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Rps => 1,
            Self::ConjugatedInvoice => 2,
            Self::Coupon => 3,
        }
    }

    /// Parses the wire code back into a kind.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Rps),
            2 => Some(Self::ConjugatedInvoice),
            3 => Some(Self::Coupon),
            _ => None,
        }
    }
}

impl fmt::Display for RpsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The triple that identifies one RPS within a provider's registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpsIdentification {
    pub number: u64,
    pub series: String,
    pub kind: RpsKind,
}

impl RpsIdentification {
    #[must_use]
    pub fn new(number: u64, series: impl Into<String>, kind: RpsKind) -> Self {
        Self {
            number,
            series: series.into(),
            kind,
        }
    }
}

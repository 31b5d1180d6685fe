//! Canonical representation of an RPS lot.
//!
//! This is the single intermediate form the transmission layer maps onto the
//! per-operation wire schemas. Callers build it from whatever business model
//! they keep; the provider layer never sees that model, only this one.
//!
//! Monetary fields are carried as already-formatted decimal text. Fiscal
//! schemas compare these values textually, so reformatting through a float
//! or decimal type here would risk changing the transmitted bytes.

use serde::{Deserialize, Serialize};

use crate::identity::RpsIdentification;

/// One service line of an RPS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Service amount, decimal text (e.g. `"100.00"`).
    pub amount: String,
    /// ISS rate, decimal text (e.g. `"0.02"`).
    pub iss_rate: String,
    /// Item code from the national service list.
    pub item_code: String,
    /// Free-form service description.
    pub description: String,
    /// IBGE code of the municipality where the service was provided.
    pub municipality_code: u32,
}

/// One provisional receipt inside a lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rps {
    /// Id attribute of the signable `InfRps` node. The signature reference
    /// URI resolves against this value, so it must be unique within the lot.
    pub info_id: String,
    pub identification: RpsIdentification,
    /// Issue date, `YYYY-MM-DD`.
    pub issue_date: String,
    /// Operation nature code (1 = taxed in the municipality, ...).
    pub operation_nature: u8,
    /// Whether the provider opted into the Simples Nacional regime.
    pub simples_nacional: bool,
    /// Whether the provider is a cultural incentive sponsor.
    pub cultural_incentive: bool,
    /// RPS status (1 = normal, 2 = cancelled).
    pub status: u8,
    pub service: ServiceEntry,
}

impl Rps {
    /// Reference id used by the enveloped signature (`#<info_id>`).
    #[must_use]
    pub fn reference_id(&self) -> &str {
        &self.info_id
    }
}

/// An ordered lot of RPS entries submitted in one call.
///
/// The lot number and batch id are assigned by the client at submission
/// time, not here, so a lot can be rebuilt and resubmitted without ever
/// reusing an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpsLot {
    pub entries: Vec<Rps>,
}

impl RpsLot {
    #[must_use]
    pub fn new(entries: Vec<Rps>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Rps, RpsLot, ServiceEntry};
    use crate::identity::{RpsIdentification, RpsKind};

    fn sample_rps(info_id: &str, number: u64) -> Rps {
        Rps {
            info_id: info_id.to_string(),
            identification: RpsIdentification::new(number, "111", RpsKind::Rps),
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
        }
    }

    #[test]
    fn lot_preserves_entry_order() {
        let lot = RpsLot::new(vec![sample_rps("rps1", 343), sample_rps("rps2", 344)]);
        assert_eq!(lot.len(), 2);
        assert_eq!(lot.entries[0].reference_id(), "rps1");
        assert_eq!(lot.entries[1].reference_id(), "rps2");
    }

    #[test]
    fn empty_lot() {
        assert!(RpsLot::new(Vec::new()).is_empty());
    }
}

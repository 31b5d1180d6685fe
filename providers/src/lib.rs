//! Transmission clients for municipal NFS-e webservices.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`betha`] | Client for the Betha municipal webservice |
//! | [`error`] | Typed error taxonomy for the transmission layer |
//! | [`registry`] | Operation descriptors and municipality dispatch |
//! | [`soap`] | Envelope assembly, unwrapping, and outcome classification |
//! | [`status`] | Batch status predicates for polling loops |
//! | [`transport`] | Environment-aware HTTP transport |
//! | [`wire`] | Request and response schemas for the four operations |

pub mod betha;
pub mod error;
pub mod registry;
pub mod soap;
pub mod status;
pub mod transport;
pub mod wire;

pub use betha::{Betha, SubmitOutcome};
pub use error::TransmissionError;
pub use registry::{Operation, ProviderKind, ServiceDescriptor, provider_for};
pub use soap::{CallPayload, CallResult, Outcome, SoapFault};
pub use status::{BatchStatus, batch_status, is_pending};
pub use transport::{RawResponse, ServiceUrls, Transport};

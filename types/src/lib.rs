//! Core domain types for Remessa.
//!
//! This crate holds the canonical representation of the documents the
//! transmission layer works with, plus the small value types every other
//! crate needs: provider identity, environment selection, and the
//! session-unique lot number source. No IO, no async.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`identity`] | Provider identity and RPS identification |
//! | [`document`] | Canonical RPS lot representation |
//! | [`environment`] | Production/staging target selection |
//! | [`lot`] | Session-unique lot numbers and batch ids |

pub mod document;
pub mod environment;
pub mod identity;
pub mod lot;

pub use document::{Rps, RpsLot, ServiceEntry};
pub use environment::Environment;
pub use identity::{DocumentIdentity, RpsIdentification, RpsKind};
pub use lot::{BatchId, LotSequence};

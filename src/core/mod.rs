//! Policy authoring core
//!
//! Everything here is provider-agnostic: statements, documents, grant
//! aggregation, validation, and the narrow [`provision::Provisioner`] seam the
//! facades talk to.

pub mod iam;
pub mod provision;
pub mod validation;

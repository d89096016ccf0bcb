//! IAM policy authoring
//!
//! Builds resource policies one grant at a time:
//! - Fixed statement per capability (Read, Write, Encrypt, Decrypt)
//! - At most one statement per capability; repeat grants widen its principal
//! - Documents created lazily on the first grant, then shared as a live view

mod aggregator;
mod capability;
mod document;
mod principal;
mod statement;

pub use aggregator::{GrantOutcome, PolicyAggregator, ResourceLayout};
pub use capability::Capability;
pub use document::{PolicyDocument, SharedDocument, POLICY_VERSION};
pub use principal::{merge, Identities, Principal};
pub use statement::{build_statement, owner_statement, Effect, Statement, StringOrList, OWNER_SID};

//! # lazy-aws - Lazily-Built Resource Policies
//!
//! `lazy-aws` authors IAM resource policies for KMS keys and the S3 buckets
//! encrypted with them, one grant at a time:
//!
//! - **One statement per capability**: granting the same capability again
//!   widens the existing statement's principal instead of adding a new one
//! - **Lazy documents**: a bucket policy only exists (and is only attached)
//!   once something has been granted on the bucket
//! - **Composed grants**: bucket read implies key decrypt, bucket write
//!   implies key encrypt
//!
//! ## Quick Start
//!
//! ```rust
//! use lazy_aws::{
//!     AccountId, EncryptedBucket, Key, KeyArgs, MemoryProvisioner, Principal, ResourceName,
//!     Result,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<()> {
//! let account = AccountId::new("123456789012")?;
//! let provisioner = Arc::new(MemoryProvisioner::new("aws", "us-east-1", account.clone()));
//!
//! let key = Key::new(ResourceName::new("data-key")?, KeyArgs::new(account), provisioner.clone())?;
//! let mut bucket = EncryptedBucket::new(ResourceName::new("logs")?, &key, provisioner)?;
//!
//! bucket
//!     .grant_read_only_to_principal(&Principal::aws("111111111111"))?
//!     .grant_read_only_to_principal(&Principal::aws("222222222222"))?;
//!
//! let json = bucket.policy_json()?;
//! assert!(json.contains(r#""Principal":{"AWS":["111111111111","222222222222"]}"#));
//! # Ok(())
//! # }
//! ```
//!
//! ## Plans
//!
//! The same grants can be described in a TOML [`plan::Plan`] and evaluated in
//! one pass; see the `lazy-aws` binary.

pub mod core;
pub mod error;
pub mod kms;
pub mod plan;
pub mod s3;

pub use crate::core::{
    iam::{
        build_statement, merge, Capability, Effect, GrantOutcome, PolicyAggregator,
        PolicyDocument, Principal, SharedDocument, Statement, StringOrList, POLICY_VERSION,
    },
    provision::{
        AccountRoot, AttachmentHandle, MemoryProvisioner, Provisioner, ResourceAddress,
        ResourceKind, ResourceRef,
    },
    validation::{AccountId, ResourceName},
};
pub use crate::error::{PolicyError, Result};
pub use crate::kms::{Key, KeyArgs};
pub use crate::plan::{Plan, PlanOutput};
pub use crate::s3::{BucketEncryption, EncryptedBucket};

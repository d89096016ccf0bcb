//! Encrypted bucket facade
//!
//! The bucket's policy is created on the first grant, not with the bucket.
//! Reading objects needs the key to decrypt and writing needs it to encrypt,
//! so every bucket grant is forwarded to the bucket's key:
//!
//! | bucket grant | bucket statements | key statements |
//! |---|---|---|
//! | read-only | Read | Decrypt |
//! | read-write | Read, Write | Decrypt, Encrypt |

use super::sse::BucketEncryption;
use crate::core::iam::{Capability, PolicyAggregator, Principal, SharedDocument, StringOrList};
use crate::core::provision::{AttachmentHandle, Provisioner, ResourceAddress, ResourceRef};
use crate::core::validation::ResourceName;
use crate::error::Result;
use crate::kms::Key;
use std::sync::Arc;
use tracing::info;

/// Listing needs the bucket itself; object access needs `<arn>/*`
fn bucket_resources(capability: Capability, address: &ResourceAddress) -> Option<StringOrList> {
    match capability {
        Capability::Read => Some(StringOrList::Many(vec![
            address.to_string(),
            address.objects(),
        ])),
        Capability::Write => Some(StringOrList::One(address.objects())),
        Capability::Encrypt | Capability::Decrypt => None,
    }
}

/// S3 bucket encrypted by default with a KMS key
#[derive(Debug)]
pub struct EncryptedBucket {
    key: Key,
    encryption: BucketEncryption,
    policy: PolicyAggregator,
}

impl EncryptedBucket {
    /// Create a bucket encrypted with `key`
    ///
    /// The bucket keeps a handle to the key but does not own it.
    pub fn new(name: ResourceName, key: &Key, provisioner: Arc<dyn Provisioner>) -> Result<Self> {
        let target = ResourceRef::bucket(name);
        let address = provisioner.resource_address(&target)?;
        let encryption = BucketEncryption::kms(&key.arn());

        info!("Created {} at {} encrypted with {}", target, address, key.name());
        Ok(EncryptedBucket {
            key: key.clone(),
            encryption,
            policy: PolicyAggregator::new(target, address, bucket_resources, provisioner),
        })
    }

    /// Allow `principal` to list and read objects
    pub fn grant_read_only_to_principal(&mut self, principal: &Principal) -> Result<&mut Self> {
        self.policy.grant(Capability::Read, principal)?;
        self.key.grant_decrypt_to_principal(principal)?;
        Ok(self)
    }

    /// Allow `principal` to list, read and write objects
    pub fn grant_read_write_to_principal(&mut self, principal: &Principal) -> Result<&mut Self> {
        self.policy.grant(Capability::Read, principal)?;
        self.policy.grant(Capability::Write, principal)?;
        self.key.grant_decrypt_to_principal(principal)?;
        self.key.grant_encrypt_to_principal(principal)?;
        Ok(self)
    }

    pub fn name(&self) -> &ResourceName {
        &self.policy.target().name
    }

    /// Bucket ARN
    pub fn arn(&self) -> &ResourceAddress {
        self.policy.address()
    }

    /// Key this bucket encrypts with
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Default encryption rule
    pub fn encryption(&self) -> &BucketEncryption {
        &self.encryption
    }

    /// Grant state of the bucket policy
    pub fn policy(&self) -> &PolicyAggregator {
        &self.policy
    }

    /// Live policy document, once anything has been granted
    pub fn document(&self) -> Option<&SharedDocument> {
        self.policy.document()
    }

    /// Bucket policy attachment, once anything has been granted
    pub fn attachment(&self) -> Option<&AttachmentHandle> {
        self.policy.attachment()
    }

    /// Serialize the bucket policy
    pub fn policy_json(&self) -> Result<String> {
        self.policy.to_json()
    }
}

//! Boundary to the provisioning layer
//!
//! Creating buckets and keys is someone else's job. The policy core only
//! needs two things from that layer: the address of a resource, and a way to
//! attach a document to it the moment the document first has a statement.

use super::iam::SharedDocument;
use super::validation::{AccountId, ResourceName};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Kind of resource a policy is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// KMS key (policy lives on the key itself)
    Key,
    /// S3 bucket (policy attached through a bucket policy)
    Bucket,
}

/// Reference to a named resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub name: ResourceName,
}

impl ResourceRef {
    pub fn key(name: ResourceName) -> Self {
        ResourceRef {
            kind: ResourceKind::Key,
            name,
        }
    }

    pub fn bucket(name: ResourceName) -> Self {
        ResourceRef {
            kind: ResourceKind::Bucket,
            name,
        }
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ResourceKind::Key => write!(f, "key '{}'", self.name),
            ResourceKind::Bucket => write!(f, "bucket '{}'", self.name),
        }
    }
}

/// ARN-equivalent address of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceAddress(String);

impl ResourceAddress {
    pub fn new(arn: impl Into<String>) -> Self {
        ResourceAddress(arn.into())
    }

    /// Address of every object below this resource (`<arn>/*`)
    pub fn objects(&self) -> String {
        format!("{}/*", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account that owns a provisioned resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRoot {
    pub partition: String,
    pub account_id: AccountId,
}

impl AccountRoot {
    /// ARN of the account's root user
    pub fn arn(&self) -> String {
        self.account_id.root_arn(&self.partition)
    }
}

/// Handle to the association between a document and its resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentHandle {
    /// Name of the attachment (`<bucket>-policy` for bucket policies)
    pub name: String,
    /// Resource the document is attached to
    pub target: ResourceRef,
}

/// Provisioning collaborator
///
/// Errors are opaque to the policy core and surface unchanged to whoever
/// issued the grant.
pub trait Provisioner: Send + Sync {
    /// Resolve the address embedded in statements for `resource`
    fn resource_address(&self, resource: &ResourceRef) -> anyhow::Result<ResourceAddress>;

    /// Account (and partition) `resource` is provisioned in
    fn account_root(&self, resource: &ResourceRef) -> anyhow::Result<AccountRoot>;

    /// Attach `document` to `resource`
    ///
    /// Called exactly once per resource, when its document first gains a
    /// statement. `document` is live: later grants show up in it.
    fn on_first_grant(
        &self,
        resource: &ResourceRef,
        document: SharedDocument,
    ) -> anyhow::Result<AttachmentHandle>;
}

/// Attachment recorded by [`MemoryProvisioner`]
#[derive(Debug, Clone)]
pub struct Attachment {
    pub handle: AttachmentHandle,
    pub document: SharedDocument,
}

/// In-process provisioner that synthesizes ARNs and records attachments
///
/// Used by plan evaluation and tests; nothing leaves the process.
#[derive(Debug)]
pub struct MemoryProvisioner {
    partition: String,
    region: String,
    account_id: AccountId,
    attachments: Mutex<Vec<Attachment>>,
}

impl MemoryProvisioner {
    pub fn new(
        partition: impl Into<String>,
        region: impl Into<String>,
        account_id: AccountId,
    ) -> Self {
        MemoryProvisioner {
            partition: partition.into(),
            region: region.into(),
            account_id,
            attachments: Mutex::new(Vec::new()),
        }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Every attachment so far, in attachment order
    pub fn attachments(&self) -> Vec<Attachment> {
        self.attachments.lock().clone()
    }

    /// Attachment made for `resource`, if any
    pub fn attachment_for(&self, resource: &ResourceRef) -> Option<Attachment> {
        self.attachments
            .lock()
            .iter()
            .find(|a| &a.handle.target == resource)
            .cloned()
    }
}

impl Provisioner for MemoryProvisioner {
    fn resource_address(&self, resource: &ResourceRef) -> anyhow::Result<ResourceAddress> {
        let arn = match resource.kind {
            ResourceKind::Bucket => format!("arn:{}:s3:::{}", self.partition, resource.name),
            ResourceKind::Key => format!(
                "arn:{}:kms:{}:{}:key/{}",
                self.partition, self.region, self.account_id, resource.name
            ),
        };
        Ok(ResourceAddress::new(arn))
    }

    fn account_root(&self, _resource: &ResourceRef) -> anyhow::Result<AccountRoot> {
        Ok(AccountRoot {
            partition: self.partition.clone(),
            account_id: self.account_id.clone(),
        })
    }

    fn on_first_grant(
        &self,
        resource: &ResourceRef,
        document: SharedDocument,
    ) -> anyhow::Result<AttachmentHandle> {
        let mut attachments = self.attachments.lock();
        if attachments.iter().any(|a| &a.handle.target == resource) {
            anyhow::bail!("{} already has a policy attached", resource);
        }

        let name = match resource.kind {
            ResourceKind::Bucket => format!("{}-policy", resource.name),
            ResourceKind::Key => resource.name.to_string(),
        };
        let handle = AttachmentHandle {
            name,
            target: resource.clone(),
        };

        debug!("Recorded attachment {} for {}", handle.name, resource);
        attachments.push(Attachment {
            handle: handle.clone(),
            document,
        });
        Ok(handle)
    }
}

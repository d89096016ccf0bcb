//! Declarative plans
//!
//! A plan is a TOML file naming the keys, the buckets encrypted with them and
//! the grants to apply, in order:
//!
//! ```toml
//! account_id = "123456789012"
//! region = "us-east-1"
//!
//! [[keys]]
//! name = "data-key"
//!
//! [[buckets]]
//! name = "logs"
//! key = "data-key"
//!
//! [[grants]]
//! bucket = "logs"
//! access = "read-write"
//! principal = { aws = ["111111111111"] }
//!
//! [[grants]]
//! key = "data-key"
//! capability = "decrypt"
//! principal = { service = ["logs.amazonaws.com"] }
//! ```
//!
//! Evaluation builds every facade, applies every grant in file order and then
//! reads the resulting documents, so each document reflects the whole plan.

use crate::core::iam::{Capability, PolicyDocument, Principal};
use crate::core::provision::{AttachmentHandle, Provisioner, ResourceAddress, ResourceRef};
use crate::core::validation::{AccountId, ResourceName};
use crate::error::{PolicyError, Result};
use crate::kms::{Key, KeyArgs};
use crate::s3::{BucketEncryption, EncryptedBucket};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

fn default_partition() -> String {
    "aws".to_string()
}

/// Top-level plan file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    /// Account that owns every key
    pub account_id: AccountId,

    /// Region keys live in
    pub region: String,

    /// ARN partition
    #[serde(default = "default_partition")]
    pub partition: String,

    #[serde(default)]
    pub keys: Vec<KeySpec>,

    #[serde(default)]
    pub buckets: Vec<BucketSpec>,

    #[serde(default)]
    pub grants: Vec<GrantSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeySpec {
    pub name: ResourceName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BucketSpec {
    pub name: ResourceName,
    /// Name of the key the bucket encrypts with
    pub key: ResourceName,
}

/// Access level of a bucket grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BucketAccess {
    ReadOnly,
    ReadWrite,
}

/// One grant; exactly one of `bucket` or `key` is set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrantSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<ResourceName>,

    /// Required with `bucket`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<BucketAccess>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<ResourceName>,

    /// Required with `key`: `encrypt` or `decrypt`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,

    pub principal: Principal,
}

enum GrantTarget<'a> {
    Bucket(&'a ResourceName, BucketAccess),
    Key(&'a ResourceName, Capability),
}

impl GrantSpec {
    fn target(&self) -> Result<GrantTarget<'_>> {
        match (&self.bucket, &self.key) {
            (Some(bucket), None) => {
                if self.capability.is_some() {
                    return Err(PolicyError::InvalidGrant(format!(
                        "grant on bucket '{}' takes `access`, not `capability`",
                        bucket
                    )));
                }
                let access = self.access.ok_or_else(|| {
                    PolicyError::InvalidGrant(format!("grant on bucket '{}' needs `access`", bucket))
                })?;
                Ok(GrantTarget::Bucket(bucket, access))
            }
            (None, Some(key)) => {
                if self.access.is_some() {
                    return Err(PolicyError::InvalidGrant(format!(
                        "grant on key '{}' takes `capability`, not `access`",
                        key
                    )));
                }
                let capability = self.capability.as_deref().ok_or_else(|| {
                    PolicyError::InvalidGrant(format!("grant on key '{}' needs `capability`", key))
                })?;
                Ok(GrantTarget::Key(key, capability.parse()?))
            }
            _ => Err(PolicyError::InvalidGrant(
                "grant must name exactly one of `bucket` or `key`".to_string(),
            )),
        }
    }
}

impl Plan {
    /// Parse a plan from TOML
    pub fn from_toml(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load a plan file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading plan from {:?}", path);
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// Key arguments shared by every key in the plan
    fn key_args(&self) -> KeyArgs {
        KeyArgs::new(self.account_id.clone())
    }

    /// Build every resource, apply every grant, and collect the documents
    pub fn evaluate(&self, provisioner: Arc<dyn Provisioner>) -> Result<PlanOutput> {
        let mut keys: Vec<Key> = Vec::with_capacity(self.keys.len());
        let mut key_index: HashMap<&ResourceName, usize> = HashMap::new();
        for spec in &self.keys {
            if key_index.insert(&spec.name, keys.len()).is_some() {
                return Err(PolicyError::DuplicateResource(format!("key '{}'", spec.name)));
            }
            keys.push(Key::new(spec.name.clone(), self.key_args(), provisioner.clone())?);
        }

        let mut buckets: Vec<EncryptedBucket> = Vec::with_capacity(self.buckets.len());
        let mut bucket_index: HashMap<&ResourceName, usize> = HashMap::new();
        for spec in &self.buckets {
            let key = key_index
                .get(&spec.key)
                .map(|&i| &keys[i])
                .ok_or_else(|| PolicyError::UnknownKey(spec.key.to_string()))?;
            if bucket_index.insert(&spec.name, buckets.len()).is_some() {
                return Err(PolicyError::DuplicateResource(format!("bucket '{}'", spec.name)));
            }
            buckets.push(EncryptedBucket::new(spec.name.clone(), key, provisioner.clone())?);
        }

        for grant in &self.grants {
            match grant.target()? {
                GrantTarget::Bucket(name, access) => {
                    let bucket = bucket_index
                        .get(name)
                        .map(|&i| &mut buckets[i])
                        .ok_or_else(|| PolicyError::UnknownBucket(name.to_string()))?;
                    match access {
                        BucketAccess::ReadOnly => {
                            bucket.grant_read_only_to_principal(&grant.principal)?;
                        }
                        BucketAccess::ReadWrite => {
                            bucket.grant_read_write_to_principal(&grant.principal)?;
                        }
                    }
                }
                GrantTarget::Key(name, capability) => {
                    let key = key_index
                        .get(name)
                        .map(|&i| &keys[i])
                        .ok_or_else(|| PolicyError::UnknownKey(name.to_string()))?;
                    key.grant(capability, &grant.principal)?;
                }
            }
        }

        let mut resources = Vec::with_capacity(keys.len() + buckets.len());
        for key in &keys {
            resources.push(PlanResource {
                target: ResourceRef::key(key.name()),
                address: key.arn(),
                policy: key.document().map(|d| d.snapshot()),
                attachment: key.attachment(),
                encryption: None,
            });
        }
        for bucket in &buckets {
            resources.push(PlanResource {
                target: ResourceRef::bucket(bucket.name().clone()),
                address: bucket.arn().clone(),
                policy: bucket.document().map(|d| d.snapshot()),
                attachment: bucket.attachment().cloned(),
                encryption: Some(bucket.encryption().clone()),
            });
        }

        info!(
            "Evaluated plan: {} keys, {} buckets, {} grants",
            keys.len(),
            buckets.len(),
            self.grants.len()
        );
        Ok(PlanOutput { resources })
    }
}

/// Final state of one resource after plan evaluation
#[derive(Debug, Clone, Serialize)]
pub struct PlanResource {
    pub target: ResourceRef,
    pub address: ResourceAddress,
    /// `None` for a bucket nobody was granted access to
    pub policy: Option<PolicyDocument>,
    pub attachment: Option<AttachmentHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<BucketEncryption>,
}

/// Everything a plan produced, keys first, in declaration order
#[derive(Debug, Clone, Serialize)]
pub struct PlanOutput {
    pub resources: Vec<PlanResource>,
}

impl PlanOutput {
    /// Look up a resource by name
    pub fn find(&self, name: &str) -> Option<&PlanResource> {
        self.resources.iter().find(|r| r.target.name.as_str() == name)
    }

    /// Keep only the resource called `name`
    pub fn retain_named(&mut self, name: &str) {
        self.resources.retain(|r| r.target.name.as_str() == name);
    }

    /// Serialize the whole output as indented JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

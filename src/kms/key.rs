//! KMS key facade
//!
//! A key's policy starts life with the owner statement for the account root,
//! so its document (unlike a bucket's) exists and is attached as soon as the
//! key is created. Encrypt and decrypt grants are added on top of it.

use crate::core::iam::{
    owner_statement, Capability, GrantOutcome, PolicyAggregator, Principal, SharedDocument,
    StringOrList,
};
use crate::core::provision::{AttachmentHandle, Provisioner, ResourceAddress, ResourceRef};
use crate::core::validation::{AccountId, ResourceName};
use crate::error::{PolicyError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Options for creating a key
#[derive(Debug, Clone)]
pub struct KeyArgs {
    /// Account whose root user administers the key
    ///
    /// Must be the account the provisioner creates the key in; the partition
    /// of the root ARN always comes from the provisioner.
    pub account_id: AccountId,
}

impl KeyArgs {
    pub fn new(account_id: AccountId) -> Self {
        KeyArgs { account_id }
    }
}

/// Key statements cover the key itself, spelled `*` inside a key policy
fn key_resources(capability: Capability, _address: &ResourceAddress) -> Option<StringOrList> {
    match capability {
        Capability::Encrypt | Capability::Decrypt => Some(StringOrList::Many(vec!["*".to_string()])),
        Capability::Read | Capability::Write => None,
    }
}

/// Handle to a KMS key and its policy
///
/// Clones share the same key, which is how buckets forward their encrypt and
/// decrypt grants without owning it.
#[derive(Debug, Clone)]
pub struct Key {
    inner: Arc<Mutex<PolicyAggregator>>,
}

impl Key {
    /// Create a key and attach its owner-only policy
    pub fn new(name: ResourceName, args: KeyArgs, provisioner: Arc<dyn Provisioner>) -> Result<Self> {
        let target = ResourceRef::key(name);
        let address = provisioner.resource_address(&target)?;
        let root = provisioner.account_root(&target)?;
        if root.account_id != args.account_id {
            return Err(PolicyError::InvalidAccountId(format!(
                "{} is provisioned in account {}, not {}",
                target, root.account_id, args.account_id
            )));
        }

        let mut policy = PolicyAggregator::new(target, address, key_resources, provisioner);
        policy.seed_owner_statement(owner_statement(root.arn()))?;

        info!("Created {} at {}", policy.target(), policy.address());
        Ok(Key {
            inner: Arc::new(Mutex::new(policy)),
        })
    }

    /// Grant `capability` on this key
    ///
    /// Only `Encrypt` and `Decrypt` apply to keys; anything else is an
    /// `UnknownCapability` error.
    pub fn grant(&self, capability: Capability, principal: &Principal) -> Result<GrantOutcome> {
        self.inner.lock().grant(capability, principal)
    }

    /// Allow `principal` to encrypt with this key
    pub fn grant_encrypt_to_principal(&self, principal: &Principal) -> Result<GrantOutcome> {
        self.grant(Capability::Encrypt, principal)
    }

    /// Allow `principal` to decrypt and generate data keys with this key
    pub fn grant_decrypt_to_principal(&self, principal: &Principal) -> Result<GrantOutcome> {
        self.grant(Capability::Decrypt, principal)
    }

    /// Key name
    ///
    /// Returned by value: the name lives behind the handle's lock.
    pub fn name(&self) -> ResourceName {
        self.inner.lock().target().name.clone()
    }

    /// Key ARN (a copy, for the same reason as [`Key::name`])
    pub fn arn(&self) -> ResourceAddress {
        self.inner.lock().address().clone()
    }

    /// Current principal for `capability`
    pub fn principal(&self, capability: Capability) -> Option<Principal> {
        self.inner.lock().principal(capability)
    }

    /// Live policy document
    pub fn document(&self) -> Option<SharedDocument> {
        self.inner.lock().document().cloned()
    }

    pub fn attachment(&self) -> Option<AttachmentHandle> {
        self.inner.lock().attachment().cloned()
    }

    /// Serialize the key policy
    pub fn policy_json(&self) -> Result<String> {
        self.inner.lock().to_json()
    }

    /// Check if two handles refer to the same key
    pub fn ptr_eq(&self, other: &Key) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

//! Per-resource policy aggregation
//!
//! The aggregator keeps at most one statement per capability. The first grant
//! of a capability appends its statement; every later grant widens that
//! statement's principal in place. The document itself does not exist until
//! the first statement is added, and that same moment is when the document is
//! attached to its resource through the [`Provisioner`].

use super::{
    build_statement, Capability, PolicyDocument, Principal, SharedDocument, Statement,
    StringOrList,
};
use crate::core::provision::{AttachmentHandle, Provisioner, ResourceAddress, ResourceRef};
use crate::error::{PolicyError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maps a capability to the `Resource` field of its statement
///
/// Returns `None` for capabilities the resource does not support.
pub type ResourceLayout = fn(Capability, &ResourceAddress) -> Option<StringOrList>;

/// What a grant did to the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// A new statement was appended
    Created,
    /// An existing statement's principal gained identities
    Widened,
    /// The principal already had access; nothing changed
    Unchanged,
}

/// Capability grants and the lazily-created document of one resource
pub struct PolicyAggregator {
    target: ResourceRef,
    address: ResourceAddress,
    layout: ResourceLayout,
    provisioner: Arc<dyn Provisioner>,
    grants: HashMap<Capability, usize>,
    owner_seeded: bool,
    document: Option<SharedDocument>,
    attachment: Option<AttachmentHandle>,
}

impl PolicyAggregator {
    /// Create an aggregator with no document yet
    pub fn new(
        target: ResourceRef,
        address: ResourceAddress,
        layout: ResourceLayout,
        provisioner: Arc<dyn Provisioner>,
    ) -> Self {
        PolicyAggregator {
            target,
            address,
            layout,
            provisioner,
            grants: HashMap::new(),
            owner_seeded: false,
            document: None,
            attachment: None,
        }
    }

    /// Add the resource owner's statement
    ///
    /// Allowed once, before any grant. The statement is never merged into.
    pub fn seed_owner_statement(&mut self, statement: Statement) -> Result<()> {
        if self.owner_seeded || self.document.is_some() {
            return Err(PolicyError::OwnerStatementAfterGrant(self.target.to_string()));
        }

        debug!("Seeding owner statement '{}' on {}", statement.sid, self.target);
        self.materialize(statement)?;
        self.owner_seeded = true;
        Ok(())
    }

    /// Grant `capability` to `principal`
    ///
    /// # Errors
    ///
    /// - `UnknownCapability` if the resource does not support `capability`
    /// - `EmptyPrincipal` if `principal` names nobody
    /// - whatever the provisioner returns when attaching the document
    pub fn grant(&mut self, capability: Capability, principal: &Principal) -> Result<GrantOutcome> {
        if principal.is_empty() {
            return Err(PolicyError::EmptyPrincipal(format!(
                "{} on {}",
                capability, self.target
            )));
        }

        if let (Some(&slot), Some(document)) = (self.grants.get(&capability), &self.document) {
            let mut document = document.write();
            let statement = &mut document.statement[slot];
            let widened = statement
                .principal
                .get_or_insert_with(Principal::default)
                .merge(principal);

            return Ok(if widened {
                debug!("Widened {} principal on {}", capability, self.target);
                GrantOutcome::Widened
            } else {
                GrantOutcome::Unchanged
            });
        }

        let resources = (self.layout)(capability, &self.address).ok_or_else(|| {
            PolicyError::UnknownCapability(format!("{} is not supported by {}", capability, self.target))
        })?;
        let statement = build_statement(capability, resources, Some(principal.clone()));

        let slot = match &self.document {
            Some(document) => document.write().add_statement(statement),
            None => self.materialize(statement)?,
        };
        self.grants.insert(capability, slot);

        debug!("Added {} statement to {} at slot {}", capability, self.target, slot);
        Ok(GrantOutcome::Created)
    }

    /// Create the document around its first statement and attach it
    ///
    /// If attaching fails the aggregator is left exactly as it was.
    fn materialize(&mut self, first: Statement) -> Result<usize> {
        let mut document = PolicyDocument::new();
        let slot = document.add_statement(first);
        let document = SharedDocument::new(document);

        let handle = self
            .provisioner
            .on_first_grant(&self.target, document.clone())
            .map_err(|err| {
                warn!("Attaching policy to {} failed: {}", self.target, err);
                err
            })?;

        info!("Attached policy {} to {}", handle.name, self.target);
        self.document = Some(document);
        self.attachment = Some(handle);
        Ok(slot)
    }

    /// Resource this aggregator authors the policy for
    pub fn target(&self) -> &ResourceRef {
        &self.target
    }

    /// Address embedded in this resource's statements
    pub fn address(&self) -> &ResourceAddress {
        &self.address
    }

    pub fn is_granted(&self, capability: Capability) -> bool {
        self.grants.contains_key(&capability)
    }

    /// Capabilities granted so far, in statement order
    pub fn granted(&self) -> Vec<Capability> {
        let mut granted: Vec<_> = self.grants.iter().map(|(&c, &slot)| (slot, c)).collect();
        granted.sort_unstable();
        granted.into_iter().map(|(_, c)| c).collect()
    }

    /// Current principal for `capability`
    pub fn principal(&self, capability: Capability) -> Option<Principal> {
        let slot = *self.grants.get(&capability)?;
        let document = self.document.as_ref()?.read();
        let statement = document.statement.get(slot)?;
        statement.principal.clone()
    }

    /// Live document, once the first statement exists
    pub fn document(&self) -> Option<&SharedDocument> {
        self.document.as_ref()
    }

    /// Attachment made when the document was created
    pub fn attachment(&self) -> Option<&AttachmentHandle> {
        self.attachment.as_ref()
    }

    /// Serialize the current document
    ///
    /// Before the first grant this is a document with no statements.
    pub fn to_json(&self) -> Result<String> {
        match &self.document {
            Some(document) => document.to_json(),
            None => PolicyDocument::new().to_json(),
        }
    }
}

impl std::fmt::Debug for PolicyAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyAggregator")
            .field("target", &self.target)
            .field("address", &self.address)
            .field("granted", &self.granted())
            .field("attachment", &self.attachment)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provision::{AccountRoot, MemoryProvisioner};
    use crate::core::validation::{AccountId, ResourceName};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn everything(capability: Capability, address: &ResourceAddress) -> Option<StringOrList> {
        match capability {
            Capability::Write => Some(StringOrList::One(address.objects())),
            _ => Some(StringOrList::Many(vec![address.to_string()])),
        }
    }

    fn reads_only(capability: Capability, address: &ResourceAddress) -> Option<StringOrList> {
        (capability == Capability::Read).then(|| StringOrList::Many(vec![address.to_string()]))
    }

    fn aggregator(layout: ResourceLayout) -> (PolicyAggregator, Arc<MemoryProvisioner>) {
        let provisioner = Arc::new(MemoryProvisioner::new(
            "aws",
            "us-east-1",
            AccountId::new("123456789012").unwrap(),
        ));
        let target = ResourceRef::bucket(ResourceName::new("logs").unwrap());
        let address = provisioner.resource_address(&target).unwrap();
        let agg = PolicyAggregator::new(target, address, layout, provisioner.clone());
        (agg, provisioner)
    }

    fn statements(agg: &PolicyAggregator) -> Vec<Value> {
        let json: Value = serde_json::from_str(&agg.to_json().unwrap()).unwrap();
        json["Statement"].as_array().cloned().unwrap_or_default()
    }

    #[test]
    fn test_lazy_document() {
        let (agg, provisioner) = aggregator(everything);

        assert!(agg.document().is_none());
        assert!(agg.attachment().is_none());
        assert_eq!(agg.to_json().unwrap(), r#"{"Version":"2012-10-17","Statement":[]}"#);
        assert!(provisioner.attachments().is_empty());
    }

    #[test]
    fn test_first_grant_creates_and_attaches() {
        let (mut agg, provisioner) = aggregator(everything);

        let outcome = agg.grant(Capability::Read, &Principal::aws("111")).unwrap();
        assert_eq!(outcome, GrantOutcome::Created);
        assert_eq!(agg.attachment().map(|h| h.name.as_str()), Some("logs-policy"));
        assert_eq!(provisioner.attachments().len(), 1);
    }

    #[test]
    fn test_regrant_widens_in_place() {
        let (mut agg, _) = aggregator(everything);

        agg.grant(Capability::Read, &Principal::aws("111")).unwrap();
        let outcome = agg.grant(Capability::Read, &Principal::aws("222")).unwrap();

        assert_eq!(outcome, GrantOutcome::Widened);
        let stmts = statements(&agg);
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0]["Principal"], json!({"AWS": ["111", "222"]}));
    }

    #[test]
    fn test_same_grant_twice_is_noop() {
        let (mut agg, _) = aggregator(everything);

        agg.grant(Capability::Write, &Principal::aws("111")).unwrap();
        let before = agg.to_json().unwrap();
        let outcome = agg.grant(Capability::Write, &Principal::aws("111")).unwrap();

        assert_eq!(outcome, GrantOutcome::Unchanged);
        assert_eq!(agg.to_json().unwrap(), before);
    }

    #[test]
    fn test_statement_order_survives_widening() {
        let (mut agg, _) = aggregator(everything);

        agg.grant(Capability::Read, &Principal::aws("1")).unwrap();
        agg.grant(Capability::Write, &Principal::aws("1")).unwrap();
        agg.grant(Capability::Encrypt, &Principal::aws("1")).unwrap();
        agg.grant(Capability::Read, &Principal::aws("2")).unwrap();
        agg.grant(Capability::Encrypt, &Principal::aws("3")).unwrap();
        agg.grant(Capability::Write, &Principal::aws("4")).unwrap();

        let sids: Vec<_> = statements(&agg)
            .iter()
            .map(|s| s["Sid"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(sids, vec!["Read", "Write", "Encrypt"]);
        assert_eq!(
            agg.granted(),
            vec![Capability::Read, Capability::Write, Capability::Encrypt]
        );
    }

    #[test]
    fn test_unsupported_capability_fails_fast() {
        let (mut agg, provisioner) = aggregator(reads_only);

        let err = agg
            .grant(Capability::Encrypt, &Principal::aws("111"))
            .unwrap_err();
        assert!(matches!(err, PolicyError::UnknownCapability(_)));
        assert!(agg.document().is_none());
        assert!(provisioner.attachments().is_empty());
    }

    #[test]
    fn test_empty_principal_rejected() {
        let (mut agg, _) = aggregator(everything);
        let err = agg.grant(Capability::Read, &Principal::default()).unwrap_err();
        assert!(matches!(err, PolicyError::EmptyPrincipal(_)));
    }

    #[test]
    fn test_owner_statement_seeding() {
        let (mut agg, provisioner) = aggregator(everything);

        agg.seed_owner_statement(Statement::allow("Owner", "kms:*", "*"))
            .unwrap();
        assert_eq!(provisioner.attachments().len(), 1);

        agg.grant(Capability::Decrypt, &Principal::aws("111")).unwrap();
        assert_eq!(provisioner.attachments().len(), 1);

        let stmts = statements(&agg);
        assert_eq!(stmts[0], json!({"Sid": "Owner", "Effect": "Allow", "Action": "kms:*", "Resource": "*"}));
        assert_eq!(stmts[1]["Sid"], "Decrypt");

        let err = agg
            .seed_owner_statement(Statement::allow("Owner", "kms:*", "*"))
            .unwrap_err();
        assert!(matches!(err, PolicyError::OwnerStatementAfterGrant(_)));
    }

    #[test]
    fn test_seeding_after_grant_rejected() {
        let (mut agg, _) = aggregator(everything);
        agg.grant(Capability::Read, &Principal::aws("111")).unwrap();

        assert!(agg
            .seed_owner_statement(Statement::allow("Owner", "kms:*", "*"))
            .is_err());
    }

    struct FlakyProvisioner {
        failures_left: AtomicUsize,
        calls: AtomicUsize,
    }

    impl Provisioner for FlakyProvisioner {
        fn resource_address(&self, resource: &ResourceRef) -> anyhow::Result<ResourceAddress> {
            Ok(ResourceAddress::new(format!("arn:test:{}", resource.name)))
        }

        fn account_root(&self, _resource: &ResourceRef) -> anyhow::Result<AccountRoot> {
            Ok(AccountRoot {
                partition: "test".to_string(),
                account_id: AccountId::new("123456789012")?,
            })
        }

        fn on_first_grant(
            &self,
            resource: &ResourceRef,
            _document: SharedDocument,
        ) -> anyhow::Result<AttachmentHandle> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                anyhow::bail!("provider unavailable");
            }
            Ok(AttachmentHandle {
                name: "attached".to_string(),
                target: resource.clone(),
            })
        }
    }

    #[test]
    fn test_failed_attachment_rolls_back() {
        let provisioner = Arc::new(FlakyProvisioner {
            failures_left: AtomicUsize::new(1),
            calls: AtomicUsize::new(0),
        });
        let target = ResourceRef::bucket(ResourceName::new("logs").unwrap());
        let address = provisioner.resource_address(&target).unwrap();
        let mut agg = PolicyAggregator::new(target, address, everything, provisioner.clone());

        let err = agg.grant(Capability::Read, &Principal::aws("111")).unwrap_err();
        assert_eq!(err.to_string(), "provider unavailable");
        assert!(!agg.is_granted(Capability::Read));
        assert!(agg.document().is_none());

        agg.grant(Capability::Read, &Principal::aws("111")).unwrap();
        agg.grant(Capability::Write, &Principal::aws("111")).unwrap();
        assert_eq!(provisioner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(agg.document().map(|d| d.len()), Some(2));
    }

    #[test]
    fn test_attached_document_stays_live() {
        let (mut agg, provisioner) = aggregator(everything);

        agg.grant(Capability::Read, &Principal::aws("111")).unwrap();
        let attached = provisioner.attachments()[0].document.clone();

        agg.grant(Capability::Write, &Principal::aws("111")).unwrap();
        agg.grant(Capability::Read, &Principal::aws("222")).unwrap();

        assert_eq!(attached.to_json().unwrap(), agg.to_json().unwrap());
        assert_eq!(attached.len(), 2);
    }

    #[test]
    fn test_principal_lookup() {
        let (mut agg, _) = aggregator(everything);
        assert!(agg.principal(Capability::Read).is_none());

        agg.grant(Capability::Read, &Principal::aws("111")).unwrap();
        agg.grant(Capability::Read, &Principal::service("logs.amazonaws.com"))
            .unwrap();

        let principal = agg.principal(Capability::Read).unwrap();
        assert!(principal.permits(&Principal::aws("111")));
        assert!(principal.permits(&Principal::service("logs.amazonaws.com")));
    }
}

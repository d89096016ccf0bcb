//! Property tests for grant aggregation through the public API

use lazy_aws::{
    AccountId, Capability, MemoryProvisioner, PolicyAggregator, Principal, Provisioner,
    ResourceName, ResourceRef, StringOrList,
};
use proptest::prelude::*;
use std::sync::Arc;

fn aggregator() -> (PolicyAggregator, Arc<MemoryProvisioner>) {
    let provisioner = Arc::new(MemoryProvisioner::new(
        "aws",
        "us-east-1",
        AccountId::new("123456789012").unwrap(),
    ));
    let target = ResourceRef::bucket(ResourceName::new("logs").unwrap());
    let address = provisioner.resource_address(&target).unwrap();
    let agg = PolicyAggregator::new(
        target,
        address,
        |_, address| Some(StringOrList::Many(vec![address.to_string()])),
        provisioner.clone(),
    );
    (agg, provisioner)
}

fn capability() -> impl Strategy<Value = Capability> {
    prop::sample::select(Capability::ALL.to_vec())
}

fn grants() -> impl Strategy<Value = Vec<(Capability, String)>> {
    prop::collection::vec((capability(), "[0-9]{3}"), 0..40)
}

proptest! {
    #[test]
    fn prop_one_statement_per_capability(grants in grants()) {
        let (mut agg, _) = aggregator();
        for (capability, account) in &grants {
            agg.grant(*capability, &Principal::aws(account.as_str())).unwrap();
        }

        let mut first_seen: Vec<Capability> = Vec::new();
        for (capability, _) in &grants {
            if !first_seen.contains(capability) {
                first_seen.push(*capability);
            }
        }

        prop_assert_eq!(agg.granted(), first_seen.clone());
        let len = agg.document().map(|d| d.len()).unwrap_or(0);
        prop_assert_eq!(len, first_seen.len());
    }

    #[test]
    fn prop_every_grant_is_permitted(grants in grants()) {
        let (mut agg, _) = aggregator();
        for (capability, account) in &grants {
            agg.grant(*capability, &Principal::aws(account.as_str())).unwrap();
        }

        for (capability, account) in &grants {
            let principal = agg.principal(*capability).unwrap();
            prop_assert!(principal.permits(&Principal::aws(account.as_str())));
        }
    }

    #[test]
    fn prop_regranting_changes_nothing(grants in grants()) {
        let (mut agg, _) = aggregator();
        for (capability, account) in &grants {
            agg.grant(*capability, &Principal::aws(account.as_str())).unwrap();
        }
        let before = agg.to_json().unwrap();

        for (capability, account) in &grants {
            agg.grant(*capability, &Principal::aws(account.as_str())).unwrap();
        }
        prop_assert_eq!(agg.to_json().unwrap(), before);
    }

    #[test]
    fn prop_attachment_only_after_first_grant(grants in grants()) {
        let (mut agg, provisioner) = aggregator();
        for (capability, account) in &grants {
            agg.grant(*capability, &Principal::aws(account.as_str())).unwrap();
        }

        let expected = usize::from(!grants.is_empty());
        prop_assert_eq!(provisioner.attachments().len(), expected);
        prop_assert_eq!(agg.attachment().is_some(), !grants.is_empty());
    }
}

#[test]
fn test_no_grants_serializes_empty() {
    let (agg, provisioner) = aggregator();
    assert_eq!(
        agg.to_json().unwrap(),
        r#"{"Version":"2012-10-17","Statement":[]}"#
    );
    assert!(provisioner.attachments().is_empty());
}

//! Bucket grants forwarded to the bucket's key

use lazy_aws::{
    AccountId, Capability, EncryptedBucket, Key, KeyArgs, MemoryProvisioner, Principal,
    ResourceKind, ResourceName, ResourceRef,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn account() -> AccountId {
    AccountId::new("123456789012").unwrap()
}

fn setup() -> (Key, EncryptedBucket, Arc<MemoryProvisioner>) {
    let provisioner = Arc::new(MemoryProvisioner::new("aws", "us-east-1", account()));
    let key = Key::new(
        ResourceName::new("data-key").unwrap(),
        KeyArgs::new(account()),
        provisioner.clone(),
    )
    .unwrap();
    let bucket =
        EncryptedBucket::new(ResourceName::new("logs").unwrap(), &key, provisioner.clone()).unwrap();
    (key, bucket, provisioner)
}

fn doc(json: String) -> Value {
    serde_json::from_str(&json).unwrap()
}

#[test]
fn test_read_write_has_four_effects() {
    let (key, mut bucket, _) = setup();
    let principal = Principal::aws("111111111111");

    bucket.grant_read_write_to_principal(&principal).unwrap();

    for capability in [Capability::Read, Capability::Write] {
        assert!(bucket
            .policy()
            .principal(capability)
            .unwrap()
            .permits(&principal));
    }
    for capability in [Capability::Decrypt, Capability::Encrypt] {
        assert!(key.principal(capability).unwrap().permits(&principal));
    }
}

#[test]
fn test_read_only_never_grants_encrypt() {
    let (key, mut bucket, _) = setup();

    bucket
        .grant_read_only_to_principal(&Principal::aws("111111111111"))
        .unwrap();

    assert!(key.principal(Capability::Encrypt).is_none());
    assert!(!bucket.policy().is_granted(Capability::Write));
}

#[test]
fn test_full_documents() {
    let (key, mut bucket, _) = setup();

    bucket
        .grant_read_only_to_principal(&Principal::aws("111111111111"))
        .unwrap()
        .grant_read_write_to_principal(&Principal::aws("222222222222"))
        .unwrap();

    assert_eq!(
        doc(bucket.policy_json().unwrap()),
        json!({
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Sid": "Read",
                    "Effect": "Allow",
                    "Action": ["s3:ListBucket", "s3:GetObject"],
                    "Resource": ["arn:aws:s3:::logs", "arn:aws:s3:::logs/*"],
                    "Principal": {"AWS": ["111111111111", "222222222222"]}
                },
                {
                    "Sid": "Write",
                    "Effect": "Allow",
                    "Action": "s3:PutObject",
                    "Resource": "arn:aws:s3:::logs/*",
                    "Principal": {"AWS": "222222222222"}
                }
            ]
        })
    );

    assert_eq!(
        doc(key.policy_json().unwrap()),
        json!({
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Sid": "Enable IAM User Permissions",
                    "Effect": "Allow",
                    "Action": "kms:*",
                    "Resource": "*",
                    "Principal": {"AWS": "arn:aws:iam::123456789012:root"}
                },
                {
                    "Sid": "Decrypt",
                    "Effect": "Allow",
                    "Action": ["kms:Decrypt", "kms:GenerateDataKey"],
                    "Resource": ["*"],
                    "Principal": {"AWS": ["111111111111", "222222222222"]}
                },
                {
                    "Sid": "Encrypt",
                    "Effect": "Allow",
                    "Action": ["kms:Encrypt"],
                    "Resource": ["*"],
                    "Principal": {"AWS": "222222222222"}
                }
            ]
        })
    );
}

#[test]
fn test_two_buckets_share_one_key() {
    let (key, mut logs, provisioner) = setup();
    let mut archive =
        EncryptedBucket::new(ResourceName::new("archive").unwrap(), &key, provisioner.clone())
            .unwrap();

    logs.grant_read_only_to_principal(&Principal::aws("111111111111"))
        .unwrap();
    archive
        .grant_read_only_to_principal(&Principal::aws("222222222222"))
        .unwrap();

    let decrypt = key.principal(Capability::Decrypt).unwrap();
    assert!(decrypt.permits(&Principal::aws("111111111111")));
    assert!(decrypt.permits(&Principal::aws("222222222222")));

    // one decrypt statement on the key, however many buckets forward to it
    assert_eq!(key.document().unwrap().len(), 2);
    // key policy plus two bucket policies
    assert_eq!(provisioner.attachments().len(), 3);
}

#[test]
fn test_key_outlives_bucket() {
    let (key, mut bucket, _) = setup();
    bucket
        .grant_read_only_to_principal(&Principal::aws("111111111111"))
        .unwrap();
    drop(bucket);

    key.grant_encrypt_to_principal(&Principal::aws("333333333333"))
        .unwrap();
    assert_eq!(key.document().unwrap().len(), 3);
}

#[test]
fn test_attachments_point_at_live_documents() {
    let (key, mut bucket, provisioner) = setup();
    bucket
        .grant_read_only_to_principal(&Principal::aws("111111111111"))
        .unwrap();

    let bucket_ref = ResourceRef::bucket(ResourceName::new("logs").unwrap());
    let attachment = provisioner.attachment_for(&bucket_ref).unwrap();
    assert_eq!(attachment.handle.name, "logs-policy");
    assert_eq!(attachment.handle.target.kind, ResourceKind::Bucket);

    bucket
        .grant_read_write_to_principal(&Principal::aws("222222222222"))
        .unwrap();
    assert_eq!(
        attachment.document.to_json().unwrap(),
        bucket.policy_json().unwrap()
    );

    let key_ref = ResourceRef::key(ResourceName::new("data-key").unwrap());
    let key_attachment = provisioner.attachment_for(&key_ref).unwrap();
    assert_eq!(
        key_attachment.document.to_json().unwrap(),
        key.policy_json().unwrap()
    );
}

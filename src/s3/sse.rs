//! Default server-side encryption for encrypted buckets
//!
//! Every [`super::EncryptedBucket`] encrypts with its KMS key by default. The
//! rule is rendered both as bucket configuration and as the SSE headers a
//! client would see on objects written under it.

use crate::core::provision::ResourceAddress;
use serde::{Deserialize, Serialize};

/// SSE algorithm used with a customer-managed KMS key
pub const SSE_KMS: &str = "aws:kms";

/// Default encryption rule of a bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketEncryption {
    /// Algorithm (`aws:kms`)
    pub sse_algorithm: String,
    /// ARN of the key objects are encrypted with
    pub kms_master_key_id: String,
}

impl BucketEncryption {
    /// KMS encryption with the given key
    pub fn kms(key_arn: &ResourceAddress) -> Self {
        BucketEncryption {
            sse_algorithm: SSE_KMS.to_string(),
            kms_master_key_id: key_arn.to_string(),
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Convert to HTTP header key-value pairs
    pub fn to_http_headers(&self) -> Vec<(String, String)> {
        vec![
            (
                "x-amz-server-side-encryption".to_string(),
                self.sse_algorithm.clone(),
            ),
            (
                "x-amz-server-side-encryption-aws-kms-key-id".to_string(),
                self.kms_master_key_id.clone(),
            ),
        ]
    }
}

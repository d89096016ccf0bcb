//! S3 buckets
//!
//! Buckets are always encrypted with a KMS key and always forward their
//! read and write grants to that key.

mod bucket;
mod sse;

pub use bucket::EncryptedBucket;
pub use sse::{BucketEncryption, SSE_KMS};

//! Error types for policy authoring

use thiserror::Error;

/// Policy authoring result type
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Policy authoring errors
#[derive(Error, Debug)]
pub enum PolicyError {
    /// Capability is outside the set a resource supports, or unparseable
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    /// Grant was issued with a principal naming no identity
    #[error("Empty principal granted {0}")]
    EmptyPrincipal(String),

    /// Owner statement seeded after the document already exists
    #[error("Owner statement must be seeded before any grant: {0}")]
    OwnerStatementAfterGrant(String),

    /// Invalid AWS account id
    #[error("Invalid account id: {0}")]
    InvalidAccountId(String),

    /// Invalid bucket or key name
    #[error("Invalid resource name: {0}")]
    InvalidResourceName(String),

    /// Plan references a key that was never declared
    #[error("Key does not exist: {0}")]
    UnknownKey(String),

    /// Plan references a bucket that was never declared
    #[error("Bucket does not exist: {0}")]
    UnknownBucket(String),

    /// Plan declares the same resource twice
    #[error("Resource declared twice: {0}")]
    DuplicateResource(String),

    /// Plan grant is malformed
    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    /// Provisioning collaborator failed
    #[error(transparent)]
    Provisioner(#[from] anyhow::Error),

    /// Policy document (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Plan file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! Grantable capabilities
//!
//! Each capability maps to a fixed statement id and a fixed action list. The
//! bucket owns `Read` and `Write`; the key owns `Encrypt` and `Decrypt`.

use super::StringOrList;
use crate::error::PolicyError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An access right grantable on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// List the bucket and get its objects
    Read,
    /// Put objects into the bucket
    Write,
    /// Encrypt with the key
    Encrypt,
    /// Decrypt with the key and generate data keys
    Decrypt,
}

impl Capability {
    /// Every capability, in declaration order
    pub const ALL: [Capability; 4] = [
        Capability::Read,
        Capability::Write,
        Capability::Encrypt,
        Capability::Decrypt,
    ];

    /// Statement id used for this capability
    pub fn sid(self) -> &'static str {
        match self {
            Capability::Read => "Read",
            Capability::Write => "Write",
            Capability::Encrypt => "Encrypt",
            Capability::Decrypt => "Decrypt",
        }
    }

    /// Action names granted by this capability
    pub fn actions(self) -> &'static [&'static str] {
        match self {
            Capability::Read => &["s3:ListBucket", "s3:GetObject"],
            Capability::Write => &["s3:PutObject"],
            Capability::Encrypt => &["kms:Encrypt"],
            Capability::Decrypt => &["kms:Decrypt", "kms:GenerateDataKey"],
        }
    }

    /// The `Action` field as it appears on the wire
    ///
    /// `Write` is emitted as a bare string; everything else as an array, even
    /// `Encrypt` with its single action.
    pub fn action_field(self) -> StringOrList {
        match self {
            Capability::Write => StringOrList::One(self.actions()[0].to_string()),
            _ => StringOrList::Many(self.actions().iter().map(|a| a.to_string()).collect()),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::Read => "read",
            Capability::Write => "write",
            Capability::Encrypt => "encrypt",
            Capability::Decrypt => "decrypt",
        };
        f.write_str(name)
    }
}

impl FromStr for Capability {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read" => Ok(Capability::Read),
            "write" => Ok(Capability::Write),
            "encrypt" => Ok(Capability::Encrypt),
            "decrypt" => Ok(Capability::Decrypt),
            _ => Err(PolicyError::UnknownCapability(format!(
                "'{}' (valid options: read, write, encrypt, decrypt)",
                s
            ))),
        }
    }
}

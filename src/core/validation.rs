//! Validation for account ids and resource names
//!
//! Every identifier that ends up inside an ARN passes through here first, so
//! a malformed plan fails at load time instead of producing a policy document
//! the provider would reject.

use crate::error::{PolicyError, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::OnceLock;

/// A twelve-digit AWS account id
///
/// # Examples
///
/// ```
/// use lazy_aws::AccountId;
///
/// let account = AccountId::new("123456789012").unwrap();
/// assert_eq!(account.root_arn("aws"), "arn:aws:iam::123456789012:root");
///
/// assert!(AccountId::new("1234").is_err());
/// assert!(AccountId::new("12345678901a").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(String);

impl AccountId {
    /// Required length of an account id
    const LENGTH: usize = 12;

    /// Create a new validated account id
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.len() != Self::LENGTH || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PolicyError::InvalidAccountId(format!(
                "'{}' must be exactly {} digits",
                id,
                Self::LENGTH
            )));
        }
        Ok(AccountId(id))
    }

    /// ARN of the account's root user
    pub fn root_arn(&self, partition: &str) -> String {
        format!("arn:{}:iam::{}:root", partition, self.0)
    }

    /// Get the account id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a bucket or key
///
/// # Rules
/// - Lowercase letters (a-z), numbers (0-9), hyphens (-) and dots (.) only
/// - Must start and end with letter or number
/// - No consecutive dots
/// - Length: 3-63 characters (S3 bucket name limit)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceName(String);

impl ResourceName {
    /// Pattern for valid names
    const PATTERN: &'static str = r"^[a-z0-9][a-z0-9.-]*[a-z0-9]$";

    const MIN_LENGTH: usize = 3;
    const MAX_LENGTH: usize = 63;

    /// Create a new validated name
    ///
    /// # Errors
    ///
    /// Returns `InvalidResourceName` if the name doesn't meet validation rules.
    ///
    /// # Examples
    ///
    /// ```
    /// use lazy_aws::ResourceName;
    ///
    /// let name = ResourceName::new("logs").unwrap();
    /// assert_eq!(name.as_str(), "logs");
    ///
    /// assert!(ResourceName::new("Logs").is_err()); // uppercase
    /// assert!(ResourceName::new("my..bucket").is_err()); // consecutive dots
    /// ```
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::validate_name(&name)?;
        Ok(ResourceName(name))
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.len() < Self::MIN_LENGTH || name.len() > Self::MAX_LENGTH {
            return Err(PolicyError::InvalidResourceName(format!(
                "'{}' must be {}-{} characters",
                name,
                Self::MIN_LENGTH,
                Self::MAX_LENGTH
            )));
        }

        if !Self::pattern().is_match(name) {
            return Err(PolicyError::InvalidResourceName(format!(
                "'{}' must use lowercase letters, numbers, hyphens and dots, \
                 starting and ending with a letter or number",
                name
            )));
        }

        if name.contains("..") {
            return Err(PolicyError::InvalidResourceName(format!(
                "'{}' cannot contain consecutive dots",
                name
            )));
        }

        Ok(())
    }

    fn pattern() -> &'static Regex {
        static COMPILED: OnceLock<Regex> = OnceLock::new();
        COMPILED.get_or_init(|| Regex::new(Self::PATTERN).expect("resource name pattern compiles"))
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Serde goes through the validating constructors so plans can't smuggle in
// unchecked identifiers.

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AccountId::new(s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for ResourceName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ResourceName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ResourceName::new(s).map_err(serde::de::Error::custom)
    }
}

//! Policy statements and the capability statement builder

use super::{Capability, Principal};
use serde::{Deserialize, Serialize};

/// Effect of a policy statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Allow the action
    Allow,
    /// Deny the action
    Deny,
}

/// A field that is either a single string or a list of strings
///
/// IAM accepts both shapes for `Action` and `Resource`; which one is emitted
/// is part of the document's byte-exact output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    /// Iterate the contained strings
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            StringOrList::One(value) => std::slice::from_ref(value),
            StringOrList::Many(values) => values,
        };
        items.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        match self {
            StringOrList::One(_) => 1,
            StringOrList::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, value: &str) -> bool {
        self.iter().any(|v| v == value)
    }
}

impl From<&str> for StringOrList {
    fn from(value: &str) -> Self {
        StringOrList::One(value.to_string())
    }
}

impl From<Vec<String>> for StringOrList {
    fn from(values: Vec<String>) -> Self {
        StringOrList::Many(values)
    }
}

/// A single policy statement
///
/// Field order is the wire order: `Sid`, `Effect`, `Action`, `Resource`,
/// `Principal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    /// Statement ID
    pub sid: String,

    /// Effect of this statement
    pub effect: Effect,

    /// Actions this statement applies to
    pub action: StringOrList,

    /// Resources this statement applies to
    pub resource: StringOrList,

    /// Who the statement applies to; omitted for the resource's default context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
}

impl Statement {
    /// Create a new allow statement with no principal
    pub fn allow(
        sid: impl Into<String>,
        action: impl Into<StringOrList>,
        resource: impl Into<StringOrList>,
    ) -> Self {
        Statement {
            sid: sid.into(),
            effect: Effect::Allow,
            action: action.into(),
            resource: resource.into(),
            principal: None,
        }
    }

    /// Attach a principal to this statement
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }
}

/// Build the statement for `capability`
///
/// Pure: the same inputs always produce the same statement. The caller
/// supplies `resources` because they depend on the resource's address.
pub fn build_statement(
    capability: Capability,
    resources: StringOrList,
    principal: Option<Principal>,
) -> Statement {
    Statement {
        sid: capability.sid().to_string(),
        effect: Effect::Allow,
        action: capability.action_field(),
        resource: resources,
        principal,
    }
}

/// Statement id of a key's owner statement
pub const OWNER_SID: &str = "Enable IAM User Permissions";

/// Full-access statement for the key's owning account root
///
/// Without it, nobody in the account could administer the key once it is
/// created.
pub fn owner_statement(account_root_arn: impl Into<String>) -> Statement {
    Statement::allow(OWNER_SID, "kms:*", "*").with_principal(Principal::aws(account_root_arn))
}

//! IAM policy document structure
//!
//! A document is an append-only list of statements under the fixed
//! `2012-10-17` version tag. [`SharedDocument`] is the live handle the
//! aggregator hands to whoever attaches the policy: it always serializes
//! the current statements, never a snapshot taken at attachment time.

use super::Statement;
use crate::error::Result;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Policy language version emitted in every document
pub const POLICY_VERSION: &str = "2012-10-17";

/// Complete IAM policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    /// Policy format version
    pub version: String,

    /// List of policy statements
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    /// Create a new empty document
    pub fn new() -> Self {
        PolicyDocument {
            version: POLICY_VERSION.to_string(),
            statement: Vec::new(),
        }
    }

    /// Append a statement, returning its slot
    pub fn add_statement(&mut self, statement: Statement) -> usize {
        self.statement.push(statement);
        self.statement.len() - 1
    }

    /// Look up a statement by its id
    pub fn find(&self, sid: &str) -> Option<&Statement> {
        self.statement.iter().find(|stmt| stmt.sid == sid)
    }

    pub fn len(&self) -> usize {
        self.statement.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statement.is_empty()
    }

    /// Serialize to the compact wire format
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to indented JSON for humans
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a document previously produced by [`PolicyDocument::to_json`]
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate the structure of an authored document
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.version != POLICY_VERSION {
            return Err(format!(
                "Policy version must be {}, got {}",
                POLICY_VERSION, self.version
            ));
        }

        let mut sids = HashSet::new();
        for (i, stmt) in self.statement.iter().enumerate() {
            if stmt.action.is_empty() {
                return Err(format!("Statement {} has no actions", i));
            }
            if stmt.resource.is_empty() {
                return Err(format!("Statement {} has no resources", i));
            }
            if !sids.insert(stmt.sid.as_str()) {
                return Err(format!("Statement {} repeats Sid '{}'", i, stmt.sid));
            }
            if stmt.principal.as_ref().is_some_and(|p| p.is_empty()) {
                return Err(format!("Statement {} has an empty principal", i));
            }
        }

        Ok(())
    }
}

impl Default for PolicyDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Live, shared view of a policy document
///
/// Clones point at the same document.
#[derive(Debug, Clone, Default)]
pub struct SharedDocument {
    inner: Arc<RwLock<PolicyDocument>>,
}

impl SharedDocument {
    pub fn new(document: PolicyDocument) -> Self {
        SharedDocument {
            inner: Arc::new(RwLock::new(document)),
        }
    }

    /// Borrow the current document
    pub fn read(&self) -> RwLockReadGuard<'_, PolicyDocument> {
        self.inner.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, PolicyDocument> {
        self.inner.write()
    }

    /// Copy of the document as it is right now
    pub fn snapshot(&self) -> PolicyDocument {
        self.inner.read().clone()
    }

    /// Serialize the current state to the compact wire format
    pub fn to_json(&self) -> Result<String> {
        self.inner.read().to_json()
    }

    /// Serialize the current state to indented JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        self.inner.read().to_json_pretty()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Check if two handles view the same document
    pub fn ptr_eq(&self, other: &SharedDocument) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<PolicyDocument> for SharedDocument {
    fn from(document: PolicyDocument) -> Self {
        SharedDocument::new(document)
    }
}

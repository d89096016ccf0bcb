//! Principals and principal merging
//!
//! A principal is a tagged union of three identity sets. Merging is a
//! per-set union that keeps first-seen order, so merging never drops an
//! identity and merging the same principal twice changes nothing.
//!
//! On the wire a set with one identity is a bare string and a set with more
//! is an array, matching how AWS itself renders principals:
//!
//! ```json
//! {"AWS": ["111111111111", "222222222222"], "Service": "logs.amazonaws.com"}
//! ```

use indexmap::IndexSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered, duplicate-free set of identity strings
///
/// Two sets are equal only when they hold the same identities in the same
/// order, since order is visible in the serialized document.
#[derive(Debug, Clone, Default)]
pub struct Identities(IndexSet<String>);

impl Identities {
    /// Add an identity, returning `true` if it was not already present
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.0.insert(id.into())
    }

    /// Check whether an identity is present
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    /// Iterate identities in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn union(&mut self, other: &Identities) -> bool {
        let mut changed = false;
        for id in other.iter() {
            changed |= self.insert(id);
        }
        changed
    }

    fn covers(&self, other: &Identities) -> bool {
        other.iter().all(|id| self.contains(id))
    }
}

impl PartialEq for Identities {
    fn eq(&self, other: &Self) -> bool {
        self.0.iter().eq(other.0.iter())
    }
}

impl Eq for Identities {}

impl<S: Into<String>> FromIterator<S> for Identities {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut ids = Identities::default();
        for id in iter {
            ids.insert(id);
        }
        ids
    }
}

impl Serialize for Identities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.first() {
            Some(single) if self.0.len() == 1 => serializer.serialize_str(single),
            _ => serializer.collect_seq(self.0.iter()),
        }
    }
}

impl<'de> Deserialize<'de> for Identities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(id) => std::iter::once(id).collect(),
            OneOrMany::Many(ids) => ids.into_iter().collect(),
        })
    }
}

/// Identity (or identities) a statement grants access to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Account ids, account roots, roles and users
    #[serde(
        rename = "AWS",
        alias = "aws",
        default,
        skip_serializing_if = "Identities::is_empty"
    )]
    pub aws: Identities,

    /// Service principals (e.g. `logs.amazonaws.com`)
    #[serde(
        rename = "Service",
        alias = "service",
        default,
        skip_serializing_if = "Identities::is_empty"
    )]
    pub service: Identities,

    /// Federated identity providers
    #[serde(
        rename = "Federated",
        alias = "federated",
        default,
        skip_serializing_if = "Identities::is_empty"
    )]
    pub federated: Identities,
}

impl Principal {
    /// Principal for an account id, role ARN or user ARN
    pub fn aws(id: impl Into<String>) -> Self {
        let mut principal = Principal::default();
        principal.aws.insert(id);
        principal
    }

    /// Principal for an AWS service
    pub fn service(name: impl Into<String>) -> Self {
        let mut principal = Principal::default();
        principal.service.insert(name);
        principal
    }

    /// Principal for a federated identity provider
    pub fn federated(provider: impl Into<String>) -> Self {
        let mut principal = Principal::default();
        principal.federated.insert(provider);
        principal
    }

    /// True when the principal names no identity at all
    pub fn is_empty(&self) -> bool {
        self.aws.is_empty() && self.service.is_empty() && self.federated.is_empty()
    }

    /// Widen this principal with every identity in `incoming`
    ///
    /// Returns `true` if anything new was added.
    pub fn merge(&mut self, incoming: &Principal) -> bool {
        let aws = self.aws.union(&incoming.aws);
        let service = self.service.union(&incoming.service);
        let federated = self.federated.union(&incoming.federated);
        aws || service || federated
    }

    /// Check if this principal grants access to every identity `other` names
    pub fn permits(&self, other: &Principal) -> bool {
        self.aws.covers(&other.aws)
            && self.service.covers(&other.service)
            && self.federated.covers(&other.federated)
    }
}

/// Union of two principals
///
/// Total over every principal: there is no conflict case.
pub fn merge(existing: &Principal, incoming: &Principal) -> Principal {
    let mut merged = existing.clone();
    merged.merge(incoming);
    merged
}

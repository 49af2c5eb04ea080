//! Set of user identities with stable order and O(1) membership.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// An insertion-ordered set of identities.
///
/// Members live in a plain slice; `index` maps each member to its slot so that
/// membership tests and removals don't scan the slice. Removal swaps the last
/// member into the freed slot, so order is only guaranteed until the first removal.
#[derive(Debug, Clone, Default)]
pub struct MembershipSet {
    members: Vec<String>,
    index: HashMap<String, usize>,
}

impl MembershipSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Adds `id` unless already present. Returns whether the set changed.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.index.contains_key(id) {
            return false;
        }
        self.index.insert(id.to_owned(), self.members.len());
        self.members.push(id.to_owned());
        true
    }

    /// Removes `id` if present. Returns whether the set changed.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(slot) = self.index.remove(id) else {
            return false;
        };
        self.members.swap_remove(slot);
        if let Some(moved) = self.members.get(slot) {
            self.index.insert(moved.clone(), slot);
        }
        true
    }

    /// Brings membership of `id` to `present`. Returns whether the set changed.
    pub fn set(&mut self, id: &str, present: bool) -> bool {
        if present {
            self.insert(id)
        } else {
            self.remove(id)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.members.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.members
    }
}

impl PartialEq for MembershipSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|m| other.contains(m))
    }
}

impl Eq for MembershipSet {}

impl<S: AsRef<str>> FromIterator<S> for MembershipSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = MembershipSet::new();
        for id in iter {
            set.insert(id.as_ref());
        }
        set
    }
}

impl Serialize for MembershipSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.members.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MembershipSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let members = Vec::<String>::deserialize(deserializer)?;
        Ok(members.into_iter().collect())
    }
}

//! Identifier types for both sides of a synchronization profile.
//!
//! Local entities carry two identifiers: the store's entry id, which is
//! stable within one folder, and an optional global id that survives
//! copies between stores. Remote entities are addressed by resource name.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator used by the textual form of a [`LocalId`].
const GLOBAL_ID_SEPARATOR: char = '|';

/// Identifier of an entity in the local store.
///
/// Equality derived here compares both components. Stores that expose more
/// than one valid representation for the same entity should be compared
/// through an identity comparer instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalId {
    entry_id: String,
    global_id: Option<String>,
}

impl LocalId {
    /// Creates a local id from an entry id and an optional global id.
    #[must_use]
    pub fn new(entry_id: impl Into<String>, global_id: Option<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            global_id,
        }
    }

    /// Creates a local id that only has an entry id.
    #[must_use]
    pub fn from_entry_id(entry_id: impl Into<String>) -> Self {
        Self::new(entry_id, None)
    }

    /// Returns the store-local entry id.
    #[must_use]
    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    /// Returns the cross-store global id, if the entity has one.
    #[must_use]
    pub fn global_id(&self) -> Option<&str> {
        self.global_id.as_deref()
    }

    /// Parses the textual form produced by `Display`.
    pub fn parse(s: &str) -> crate::Result<Self> {
        s.parse()
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.global_id {
            Some(global) => write!(f, "{}{GLOBAL_ID_SEPARATOR}{global}", self.entry_id),
            None => write!(f, "{}", self.entry_id),
        }
    }
}

impl FromStr for LocalId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (entry, global) = match s.split_once(GLOBAL_ID_SEPARATOR) {
            Some((entry, global)) => (entry, Some(global.to_string())),
            None => (s, None),
        };
        if entry.is_empty() {
            return Err(Error::InvalidId(format!("empty entry id in '{s}'")));
        }
        if global.as_deref() == Some("") {
            return Err(Error::InvalidId(format!("empty global id in '{s}'")));
        }
        Ok(Self::new(entry, global))
    }
}

/// Identifier of an entity in the remote store: its resource name
/// relative to the synchronized collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    /// Creates a remote id from a resource name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the resource name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RemoteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::InvalidId("empty resource name".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

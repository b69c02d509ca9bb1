//! Identity comparers for local entity ids.
//!
//! A local store may hand out more than one valid id for the same entity
//! (for example after an item was moved between folders). Everything that
//! keys on local ids goes through an [`IdComparer`] instead of the id's own
//! `Eq`/`Hash`.

use calsync_types::LocalId;
use std::hash::Hash;

/// Maps an id to the key used for equality and hashing.
pub trait IdComparer<Id>: Clone + Send + Sync {
    /// Canonical key. Two ids denote the same entity iff their keys are equal.
    type Key: Eq + Hash + Clone + Send + Sync;

    /// Returns the canonical key of `id`.
    fn key(&self, id: &Id) -> Self::Key;

    /// Returns true if both ids denote the same entity.
    fn same(&self, a: &Id, b: &Id) -> bool {
        self.key(a) == self.key(b)
    }
}

/// Compares ids by their own `Eq`/`Hash`, i.e. over every component.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactIdComparer;

impl<Id> IdComparer<Id> for ExactIdComparer
where
    Id: Eq + Hash + Clone + Send + Sync,
{
    type Key = Id;

    fn key(&self, id: &Id) -> Id {
        id.clone()
    }
}

/// Compares local ids by entry id only, ignoring the global id.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryIdComparer;

impl IdComparer<LocalId> for EntryIdComparer {
    type Key = String;

    fn key(&self, id: &LocalId) -> String {
        id.entry_id().to_string()
    }
}

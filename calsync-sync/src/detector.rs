//! Duplicate detection over the entities observed during one pass.
//!
//! The detector owns the observation table: local id -> fingerprint, kept
//! in first-observed order so that grouping is deterministic.

use crate::fingerprint::Fingerprint;
use crate::identity::IdComparer;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Observation<Id> {
    /// Position of the first announcement of this entity.
    seq: u64,
    id: Id,
    fingerprint: Fingerprint,
}

/// Groups local entities whose fingerprints collide.
pub struct DuplicateDetector<Id, C: IdComparer<Id>> {
    comparer: C,
    observations: HashMap<C::Key, Observation<Id>>,
    next_seq: u64,
}

impl<Id: Clone, C: IdComparer<Id>> DuplicateDetector<Id, C> {
    /// Creates an empty detector.
    pub fn new(comparer: C) -> Self {
        Self {
            comparer,
            observations: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Records the fingerprint of an entity. Announcing an entity again
    /// replaces its fingerprint but keeps its first-observed position.
    pub fn announce(&mut self, id: Id, fingerprint: Fingerprint) {
        let key = self.comparer.key(&id);
        match self.observations.get_mut(&key) {
            Some(existing) => {
                existing.id = id;
                existing.fingerprint = fingerprint;
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.observations.insert(
                    key,
                    Observation {
                        seq,
                        id,
                        fingerprint,
                    },
                );
            }
        }
    }

    /// Drops an entity from the table. Returns whether it was present.
    pub fn forget(&mut self, id: &Id) -> bool {
        self.observations.remove(&self.comparer.key(id)).is_some()
    }

    /// Returns the recorded fingerprint of an entity.
    pub fn fingerprint_of(&self, id: &Id) -> Option<Fingerprint> {
        self.observations
            .get(&self.comparer.key(id))
            .map(|o| o.fingerprint)
    }

    /// Number of observed entities.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Returns true if nothing has been observed.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Groups observed ids by fingerprint, keeping only groups with at
    /// least two members. Groups are ordered by their first member and
    /// members by first observation.
    pub fn group_duplicates(&self) -> Vec<Vec<Id>> {
        let mut ordered: Vec<&Observation<Id>> = self.observations.values().collect();
        ordered.sort_by_key(|o| o.seq);

        let mut slots: HashMap<Fingerprint, usize> = HashMap::new();
        let mut groups: Vec<Vec<Id>> = Vec::new();
        for observation in ordered {
            let slot = *slots.entry(observation.fingerprint).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(observation.id.clone());
        }

        groups.retain(|g| g.len() > 1);
        groups
    }

    /// Consumes the detector, returning the duplicate groups.
    pub fn into_groups(self) -> Vec<Vec<Id>> {
        self.group_duplicates()
    }
}

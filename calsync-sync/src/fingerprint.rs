//! Content fingerprints and per-kind duplicate criteria.
//!
//! A fingerprint is a cheap way to find duplicate candidates. It is never
//! trusted on its own: [`DuplicateCriteria::is_duplicate`] compares the
//! relevant fields exactly before anything is deleted.

use calsync_types::{ContactData, EntityKind, EventData, TaskData};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Hash of the duplication-relevant fields of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Wraps a raw fingerprint value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw fingerprint value.
    #[must_use]
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Fingerprints any hashable value. Stable across processes.
    pub fn of<T: Hash + ?Sized>(value: &T) -> Self {
        let mut hasher = StableHasher::default();
        value.hash(&mut hasher);
        Self(hasher.finish())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0.to_be_bytes()))
    }
}

/// `Hasher` backed by SHA-256, truncated to 64 bits on `finish`.
#[derive(Default)]
struct StableHasher(Sha256);

impl Hasher for StableHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    fn finish(&self) -> u64 {
        let digest = self.0.clone().finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(head)
    }
}

/// Decides which fields make two entities of one kind duplicates.
pub trait DuplicateCriteria<E>: Send + Sync {
    /// The duplication-relevant fields, compared exactly.
    type Key: PartialEq + Hash;

    /// The entity kind these criteria apply to.
    fn kind(&self) -> EntityKind;

    /// Extracts the duplication-relevant fields.
    fn relevant(&self, entity: &E) -> Self::Key;

    /// Fingerprint of the relevant fields.
    fn fingerprint(&self, entity: &E) -> Fingerprint {
        Fingerprint::of(&self.relevant(entity))
    }

    /// Authoritative duplicate test.
    fn is_duplicate(&self, a: &E, b: &E) -> bool {
        self.relevant(a) == self.relevant(b)
    }
}

/// Events are duplicates when start, end and subject match.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventCriteria;

impl DuplicateCriteria<EventData> for EventCriteria {
    type Key = (DateTime<Utc>, DateTime<Utc>, String);

    fn kind(&self) -> EntityKind {
        EntityKind::Event
    }

    fn relevant(&self, event: &EventData) -> Self::Key {
        (event.start, event.end, event.subject.clone())
    }
}

/// Contacts are duplicates when display name, email and phone match
/// exactly. The fingerprint ignores surrounding whitespace and email case,
/// so near matches are still compared field by field.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactCriteria;

impl DuplicateCriteria<ContactData> for ContactCriteria {
    type Key = (String, Option<String>, Option<String>);

    fn kind(&self) -> EntityKind {
        EntityKind::Contact
    }

    fn relevant(&self, contact: &ContactData) -> Self::Key {
        (
            contact.display_name.clone(),
            contact.primary_email.clone(),
            contact.primary_phone.clone(),
        )
    }

    fn fingerprint(&self, contact: &ContactData) -> Fingerprint {
        Fingerprint::of(&(
            contact.display_name.trim(),
            contact.primary_email.as_ref().map(|e| e.trim().to_lowercase()),
            contact.primary_phone.as_ref().map(|p| p.trim()),
        ))
    }
}

/// Tasks are duplicates when subject, due date and completion match.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskCriteria;

impl DuplicateCriteria<TaskData> for TaskCriteria {
    type Key = (String, Option<DateTime<Utc>>, bool);

    fn kind(&self) -> EntityKind {
        EntityKind::Task
    }

    fn relevant(&self, task: &TaskData) -> Self::Key {
        (task.subject.clone(), task.due, task.completed)
    }
}

//! Shared test helpers for cleanup and session tests.

#![allow(dead_code)]

use calsync_sync::mock::{MemoryRelationAccess, MockRepository};
use calsync_sync::{CleanupConfig, DuplicateCleaner, EventCriteria, ExactIdComparer, IdComparer};
use calsync_types::{CalendarRelation, EventData, LocalId, LocalVersion, RemoteId, RemoteVersion};
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub type Local = MockRepository<LocalId, LocalVersion, EventData>;
pub type Remote = MockRepository<RemoteId, RemoteVersion, EventData>;
pub type Relations = MemoryRelationAccess<LocalId, LocalVersion, RemoteId, RemoteVersion>;
pub type Cleaner<C = ExactIdComparer> = DuplicateCleaner<Local, Remote, Relations, EventCriteria, C>;

/// Routes sweep logs to the test output (`RUST_LOG=debug`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Local id with an entry id only.
pub fn lid(entry: &str) -> LocalId {
    LocalId::from_entry_id(entry)
}

/// Remote id.
pub fn rid(name: &str) -> RemoteId {
    RemoteId::new(name)
}

/// A one-hour event on 2024-05-01 starting at `hour`.
pub fn event(hour: u32, subject: &str) -> EventData {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 5, 1, hour + 1, 0, 0).unwrap();
    EventData::new(start, end, subject)
}

pub fn relation(local: &LocalId, remote: &str, etag: &str) -> CalendarRelation {
    CalendarRelation::new(
        local.clone(),
        LocalVersion::from_millis(1),
        rid(remote),
        RemoteVersion::new(etag),
    )
}

/// Both repositories plus the relation table.
pub struct Fixture {
    pub local: Arc<Local>,
    pub remote: Arc<Remote>,
    pub relations: Arc<Relations>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            local: Arc::new(Local::new()),
            remote: Arc::new(Remote::new()),
            relations: Arc::new(Relations::empty()),
        }
    }

    pub fn with_relations(relations: Vec<CalendarRelation>) -> Self {
        Self {
            relations: Arc::new(Relations::new(relations)),
            ..Self::new()
        }
    }

    /// Stores a local event.
    pub fn add_local(&self, id: &LocalId, data: EventData) {
        self.local.insert(id.clone(), LocalVersion::from_millis(1), data);
    }

    /// Stores a remote event with the given entity tag.
    pub fn add_remote(&self, name: &str, etag: &str, data: EventData) {
        self.remote.insert(rid(name), RemoteVersion::new(etag), data);
    }

    pub fn cleaner(&self) -> Cleaner {
        self.cleaner_with(CleanupConfig::default())
    }

    pub fn cleaner_with(&self, config: CleanupConfig) -> Cleaner {
        self.cleaner_using(ExactIdComparer, config)
    }

    pub fn cleaner_using<C: IdComparer<LocalId>>(&self, comparer: C, config: CleanupConfig) -> Cleaner<C> {
        DuplicateCleaner::new(
            Arc::clone(&self.local),
            Arc::clone(&self.remote),
            Arc::clone(&self.relations),
            Arc::new(EventCriteria),
            comparer,
            config,
        )
    }
}

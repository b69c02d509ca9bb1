//! Relation tracking and duplicate cleanup for calsync.
//!
//! A synchronization profile pairs a local store (a desktop calendar,
//! address book or task list) with a remote collection. This crate holds
//! the part of the engine that keeps the pairing table consistent and
//! removes duplicates that repeated or overlapping runs leave behind.
//!
//! # Architecture
//!
//! - **Repository**: fetch/delete access to one side ([`EntityRepository`])
//! - **Relations**: the durable local ⇄ remote table ([`RelationDataAccess`],
//!   [`RelationIndex`], [`SqliteRelationStore`])
//! - **Detector**: fingerprints of the entities seen in a pass
//! - **Cleaner**: deletes confirmed duplicates on both sides
//! - **Session**: ties a pass to the detector and runs the cleaner at the end
//!
//! # Example
//!
//! ```
//! use calsync_sync::mock::{MemoryRelationAccess, MockRepository};
//! use calsync_sync::{CleanupConfig, DuplicateCleaner, EventCriteria, ExactIdComparer, SyncSession};
//! use calsync_types::{EventData, LocalId, LocalVersion, RemoteId, RemoteVersion};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let local = Arc::new(MockRepository::<LocalId, LocalVersion, EventData>::new());
//! let remote = Arc::new(MockRepository::<RemoteId, RemoteVersion, EventData>::new());
//! let relations = Arc::new(MemoryRelationAccess::<LocalId, LocalVersion, RemoteId, RemoteVersion>::empty());
//!
//! let cleaner = DuplicateCleaner::new(
//!     local,
//!     remote,
//!     relations,
//!     Arc::new(EventCriteria),
//!     ExactIdComparer,
//!     CleanupConfig::default(),
//! );
//! let session = SyncSession::new(cleaner);
//! let report = session.finish().await.unwrap();
//! assert_eq!(report.deleted_count(), 0);
//! # }
//! ```

pub mod cleanup;
mod config;
pub mod detector;
mod error;
pub mod fingerprint;
pub mod identity;
pub mod relation;
pub mod relation_store;
pub mod repository;
pub mod session;

pub use cleanup::{CleanupReport, DuplicateCleaner, EntityFault, RepositorySide};
pub use config::{CleanupConfig, KeepPolicy};
pub use detector::DuplicateDetector;
pub use error::{RepositoryError, RepositoryResult, SyncError, SyncResult};
pub use fingerprint::{ContactCriteria, DuplicateCriteria, EventCriteria, Fingerprint, TaskCriteria};
pub use identity::{EntryIdComparer, ExactIdComparer, IdComparer};
pub use relation::{RelationDataAccess, RelationIndex};
pub use relation_store::SqliteRelationStore;
pub use repository::{EntityRepository, EntityVersion, Fetched, LocalEntityRepository};
pub use session::SyncSession;

/// Test doubles for repositories and the relation table.
pub mod mock {
    pub use crate::relation::mock::MemoryRelationAccess;
    pub use crate::repository::mock::MockRepository;
}

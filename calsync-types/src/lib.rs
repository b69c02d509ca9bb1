//! Core type definitions for calsync.
//!
//! This crate defines the types shared by both sides of a synchronization
//! profile:
//! - Local and remote entity identifiers
//! - Opaque version tokens used for change detection
//! - The `Relation` record pairing one local entity with one remote entity
//! - Payloads for the synchronized entity kinds (events, contacts, tasks)
//!
//! Parsing and rendering of calendar wire formats belong to the repository
//! adapters, not here.

mod entity;
mod ids;
mod relation;
mod version;

pub use entity::{ContactData, EntityKind, EventData, TaskData};
pub use ids::{LocalId, RemoteId};
pub use relation::{CalendarRelation, Relation};
pub use version::{LocalVersion, RemoteVersion};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

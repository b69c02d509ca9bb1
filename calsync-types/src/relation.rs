//! The durable pairing between a local and a remote entity.

use crate::{LocalId, LocalVersion, RemoteId, RemoteVersion};
use serde::{Deserialize, Serialize};

/// Pairs one local entity with one remote entity, together with the
/// version last observed on each side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation<LId, LVer, RId, RVer> {
    /// Identity of the local entity.
    pub local_id: LId,
    /// Version of the local entity when the pair was last synchronized.
    pub local_version: LVer,
    /// Identity of the remote entity.
    pub remote_id: RId,
    /// Version of the remote entity when the pair was last synchronized.
    pub remote_version: RVer,
}

impl<LId, LVer, RId, RVer> Relation<LId, LVer, RId, RVer> {
    /// Creates a relation.
    pub fn new(local_id: LId, local_version: LVer, remote_id: RId, remote_version: RVer) -> Self {
        Self {
            local_id,
            local_version,
            remote_id,
            remote_version,
        }
    }
}

/// Relation between a local calendar item and a remote resource.
pub type CalendarRelation = Relation<LocalId, LocalVersion, RemoteId, RemoteVersion>;

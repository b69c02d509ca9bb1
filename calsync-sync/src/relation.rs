//! Relation bookkeeping between local and remote entities.
//!
//! The persisted relation table is loaded into a [`RelationIndex`] for the
//! duration of a cleanup sweep. The index enforces that each local and each
//! remote identity appears in at most one relation.

use crate::error::{SyncError, SyncResult};
use crate::identity::IdComparer;
use async_trait::async_trait;
use calsync_types::Relation;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use tracing::debug;

/// Load/save access to the durable relation table.
///
/// Adapters backed by blocking storage must move the I/O off the async
/// runtime themselves.
#[async_trait]
pub trait RelationDataAccess<LId, LVer, RId, RVer>: Send + Sync {
    /// Loads every stored relation.
    async fn load(&self) -> SyncResult<Vec<Relation<LId, LVer, RId, RVer>>>;

    /// Replaces the stored relations. Implementations must apply the whole
    /// set or nothing.
    async fn save(&self, relations: &[Relation<LId, LVer, RId, RVer>]) -> SyncResult<()>;
}

/// In-memory, bijection-checked view of the relation table.
pub struct RelationIndex<LId, LVer, RId, RVer, C: IdComparer<LId>> {
    comparer: C,
    /// Relations keyed by insertion sequence, for a stable save order.
    relations: BTreeMap<u64, Relation<LId, LVer, RId, RVer>>,
    by_local: HashMap<C::Key, u64>,
    by_remote: HashMap<RId, u64>,
    next_seq: u64,
}

impl<LId, LVer, RId, RVer, C> RelationIndex<LId, LVer, RId, RVer, C>
where
    LId: fmt::Display,
    RId: Eq + Hash + Clone + fmt::Display,
    C: IdComparer<LId>,
{
    /// Creates an empty index.
    pub fn new(comparer: C) -> Self {
        Self {
            comparer,
            relations: BTreeMap::new(),
            by_local: HashMap::new(),
            by_remote: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Builds an index from loaded relations. Fails if two relations share
    /// a local or a remote identity.
    pub fn from_relations(
        comparer: C,
        relations: impl IntoIterator<Item = Relation<LId, LVer, RId, RVer>>,
    ) -> SyncResult<Self> {
        let mut index = Self::new(comparer);
        for relation in relations {
            index.insert(relation)?;
        }
        debug!("Indexed {} entity relations", index.len());
        Ok(index)
    }

    /// Adds a relation. Fails if either identity is already paired.
    pub fn insert(&mut self, relation: Relation<LId, LVer, RId, RVer>) -> SyncResult<()> {
        let local_key = self.comparer.key(&relation.local_id);
        if self.by_local.contains_key(&local_key) {
            return Err(SyncError::InvariantViolation(format!(
                "local entity {} has more than one relation",
                relation.local_id
            )));
        }
        if self.by_remote.contains_key(&relation.remote_id) {
            return Err(SyncError::InvariantViolation(format!(
                "remote entity {} has more than one relation",
                relation.remote_id
            )));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_local.insert(local_key, seq);
        self.by_remote.insert(relation.remote_id.clone(), seq);
        self.relations.insert(seq, relation);
        Ok(())
    }

    /// Looks up the relation of a local entity.
    pub fn get_by_local(&self, local_id: &LId) -> Option<&Relation<LId, LVer, RId, RVer>> {
        let seq = self.by_local.get(&self.comparer.key(local_id))?;
        self.relations.get(seq)
    }

    /// Looks up the relation of a remote entity.
    pub fn get_by_remote(&self, remote_id: &RId) -> Option<&Relation<LId, LVer, RId, RVer>> {
        let seq = self.by_remote.get(remote_id)?;
        self.relations.get(seq)
    }

    /// Removes and returns the relation of a local entity, unpairing its
    /// remote entity as well.
    pub fn remove_by_local(&mut self, local_id: &LId) -> Option<Relation<LId, LVer, RId, RVer>> {
        let seq = self.by_local.remove(&self.comparer.key(local_id))?;
        let relation = self.relations.remove(&seq)?;
        self.by_remote.remove(&relation.remote_id);
        Some(relation)
    }

    /// Number of relations.
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Returns true if the index holds no relations.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Iterates relations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Relation<LId, LVer, RId, RVer>> {
        self.relations.values()
    }

    /// Consumes the index, returning relations in insertion order.
    pub fn into_relations(self) -> Vec<Relation<LId, LVer, RId, RVer>> {
        self.relations.into_values().collect()
    }
}

/// In-memory relation table for testing.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    struct State<LId, LVer, RId, RVer> {
        relations: Vec<Relation<LId, LVer, RId, RVer>>,
        load_calls: usize,
        save_calls: usize,
        fail_load: bool,
        fail_save: bool,
    }

    /// Relation table kept in a vector, counting loads and saves.
    pub struct MemoryRelationAccess<LId, LVer, RId, RVer> {
        state: Mutex<State<LId, LVer, RId, RVer>>,
    }

    impl<LId: Clone, LVer: Clone, RId: Clone, RVer: Clone> MemoryRelationAccess<LId, LVer, RId, RVer> {
        /// Creates a table holding `relations`.
        pub fn new(relations: Vec<Relation<LId, LVer, RId, RVer>>) -> Self {
            Self {
                state: Mutex::new(State {
                    relations,
                    load_calls: 0,
                    save_calls: 0,
                    fail_load: false,
                    fail_save: false,
                }),
            }
        }

        /// Creates an empty table.
        pub fn empty() -> Self {
            Self::new(Vec::new())
        }

        /// Currently stored relations.
        pub fn relations(&self) -> Vec<Relation<LId, LVer, RId, RVer>> {
            self.state.lock().unwrap().relations.clone()
        }

        /// Number of `load` calls so far.
        pub fn load_calls(&self) -> usize {
            self.state.lock().unwrap().load_calls
        }

        /// Number of successful `save` calls so far.
        pub fn save_calls(&self) -> usize {
            self.state.lock().unwrap().save_calls
        }

        /// Makes every subsequent `load` fail.
        pub fn fail_load(&self) {
            self.state.lock().unwrap().fail_load = true;
        }

        /// Makes every subsequent `save` fail.
        pub fn fail_save(&self) {
            self.state.lock().unwrap().fail_save = true;
        }
    }

    #[async_trait]
    impl<LId, LVer, RId, RVer> RelationDataAccess<LId, LVer, RId, RVer>
        for MemoryRelationAccess<LId, LVer, RId, RVer>
    where
        LId: Clone + Send + Sync + 'static,
        LVer: Clone + Send + Sync + 'static,
        RId: Clone + Send + Sync + 'static,
        RVer: Clone + Send + Sync + 'static,
    {
        async fn load(&self) -> SyncResult<Vec<Relation<LId, LVer, RId, RVer>>> {
            let mut state = self.state.lock().unwrap();
            state.load_calls += 1;
            if state.fail_load {
                return Err(SyncError::Storage("relation table unavailable".into()));
            }
            Ok(state.relations.clone())
        }

        async fn save(&self, relations: &[Relation<LId, LVer, RId, RVer>]) -> SyncResult<()> {
            let mut state = self.state.lock().unwrap();
            if state.fail_save {
                return Err(SyncError::Storage("relation table is read-only".into()));
            }
            state.save_calls += 1;
            state.relations = relations.to_vec();
            Ok(())
        }
    }
}

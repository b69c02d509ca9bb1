//! Entity repository abstraction.
//!
//! One repository per side of a synchronization profile. Adapters for a
//! concrete local store or remote server implement these traits; the
//! reconciliation core only talks to them through here.

use crate::error::RepositoryResult;
use async_trait::async_trait;
use std::fmt;
use std::hash::Hash;

/// An entity as currently stored, together with its id and version.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityVersion<Id, Version, Entity> {
    pub id: Id,
    pub version: Version,
    pub entity: Entity,
}

impl<Id, Version, Entity> EntityVersion<Id, Version, Entity> {
    /// Creates an entity version.
    pub fn new(id: Id, version: Version, entity: Entity) -> Self {
        Self {
            id,
            version,
            entity,
        }
    }
}

/// The fetched-entity type of a repository.
pub type Fetched<R> = EntityVersion<
    <R as EntityRepository>::Id,
    <R as EntityRepository>::Version,
    <R as EntityRepository>::Entity,
>;

/// Fetch and delete access to one side of the synchronization.
#[async_trait]
pub trait EntityRepository: Send + Sync {
    /// Entity identity.
    type Id: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;
    /// Opaque version token.
    type Version: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;
    /// Entity payload.
    type Entity: Send + Sync + 'static;
    /// Per-pass synchronization context. The cleanup sweep runs with the
    /// default value.
    type Context: Default + Send + Sync;

    /// Fetches the current state of the requested entities. Entities that
    /// no longer exist are omitted from the result.
    async fn get(
        &self,
        ids: &[Self::Id],
        context: &Self::Context,
    ) -> RepositoryResult<Vec<EntityVersion<Self::Id, Self::Version, Self::Entity>>>;

    /// Deletes the entity if its current version equals `version`. Returns
    /// whether the entity is gone afterwards; an already absent entity
    /// counts as deleted.
    async fn try_delete(
        &self,
        id: &Self::Id,
        version: &Self::Version,
        context: &Self::Context,
    ) -> RepositoryResult<bool>;
}

/// Extra operations of the local side.
#[async_trait]
pub trait LocalEntityRepository: EntityRepository {
    /// Deletes the entity without a version check.
    async fn delete(&self, id: &Self::Id) -> RepositoryResult<()>;

    /// Frees transient per-entity handles acquired by `get`.
    fn release(&self, entities: &[EntityVersion<Self::Id, Self::Version, Self::Entity>]) {
        let _ = entities;
    }
}

/// In-memory repository for testing.
pub mod mock {
    use super::*;
    use crate::error::RepositoryError;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct State<Id, Version, Entity> {
        entities: Vec<EntityVersion<Id, Version, Entity>>,
        fail_get: HashSet<Id>,
        not_found_on_get: HashSet<Id>,
        fail_delete: HashSet<Id>,
        panic_on_delete: HashSet<Id>,
        not_found_on_delete: HashSet<Id>,
        get_calls: usize,
        deleted: Vec<Id>,
        released: Vec<Id>,
    }

    /// A repository holding entities in a vector, with fault injection.
    pub struct MockRepository<Id, Version, Entity> {
        state: Mutex<State<Id, Version, Entity>>,
    }

    impl<Id, Version, Entity> Default for MockRepository<Id, Version, Entity> {
        fn default() -> Self {
            Self {
                state: Mutex::new(State {
                    entities: Vec::new(),
                    fail_get: HashSet::new(),
                    not_found_on_get: HashSet::new(),
                    fail_delete: HashSet::new(),
                    panic_on_delete: HashSet::new(),
                    not_found_on_delete: HashSet::new(),
                    get_calls: 0,
                    deleted: Vec::new(),
                    released: Vec::new(),
                }),
            }
        }
    }

    impl<Id, Version, Entity> MockRepository<Id, Version, Entity>
    where
        Id: Clone + Eq + Hash,
        Version: Clone,
        Entity: Clone,
    {
        /// Creates an empty repository.
        pub fn new() -> Self {
            Self::default()
        }

        /// Adds or replaces an entity.
        pub fn insert(&self, id: Id, version: Version, entity: Entity) {
            let mut state = self.state.lock().unwrap();
            state.entities.retain(|e| e.id != id);
            state.entities.push(EntityVersion::new(id, version, entity));
        }

        /// Returns true if the entity is stored.
        pub fn contains(&self, id: &Id) -> bool {
            self.state.lock().unwrap().entities.iter().any(|e| &e.id == id)
        }

        /// Returns the stored version of an entity.
        pub fn version_of(&self, id: &Id) -> Option<Version> {
            self.state
                .lock()
                .unwrap()
                .entities
                .iter()
                .find(|e| &e.id == id)
                .map(|e| e.version.clone())
        }

        /// Number of stored entities.
        pub fn len(&self) -> usize {
            self.state.lock().unwrap().entities.len()
        }

        /// Returns true if nothing is stored.
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Makes `get` fail with a fault whenever `id` is requested.
        pub fn fail_get(&self, id: Id) {
            self.state.lock().unwrap().fail_get.insert(id);
        }

        /// Makes `get` fail with `NotFound` whenever `id` is requested.
        pub fn not_found_on_get(&self, id: Id) {
            self.state.lock().unwrap().not_found_on_get.insert(id);
        }

        /// Makes deleting `id` fail with a fault.
        pub fn fail_delete(&self, id: Id) {
            self.state.lock().unwrap().fail_delete.insert(id);
        }

        /// Makes deleting `id` panic. The internal lock is not held when
        /// the panic is raised.
        pub fn panic_on_delete(&self, id: Id) {
            self.state.lock().unwrap().panic_on_delete.insert(id);
        }

        /// Makes deleting `id` fail with `NotFound` and removes the entity,
        /// as if another client deleted it first.
        pub fn not_found_on_delete(&self, id: Id) {
            self.state.lock().unwrap().not_found_on_delete.insert(id);
        }

        /// Number of `get` calls so far.
        pub fn get_calls(&self) -> usize {
            self.state.lock().unwrap().get_calls
        }

        /// Ids deleted so far, in order.
        pub fn deleted(&self) -> Vec<Id> {
            self.state.lock().unwrap().deleted.clone()
        }

        /// Ids whose handles were released so far, in order.
        pub fn released(&self) -> Vec<Id> {
            self.state.lock().unwrap().released.clone()
        }

        fn delete_checked(&self, id: &Id, version: Option<&Version>) -> RepositoryResult<bool>
        where
            Id: fmt::Display,
            Version: PartialEq,
        {
            if self.state.lock().unwrap().panic_on_delete.contains(id) {
                panic!("delete of {id} panicked");
            }
            let mut state = self.state.lock().unwrap();
            if state.fail_delete.contains(id) {
                return Err(RepositoryError::Fault(format!("delete of {id} failed")));
            }
            if state.not_found_on_delete.contains(id) {
                state.entities.retain(|e| &e.id != id);
                return Err(RepositoryError::NotFound(id.to_string()));
            }
            let Some(pos) = state.entities.iter().position(|e| &e.id == id) else {
                return Ok(true);
            };
            if let Some(expected) = version {
                if &state.entities[pos].version != expected {
                    return Ok(false);
                }
            }
            state.entities.remove(pos);
            state.deleted.push(id.clone());
            Ok(true)
        }
    }

    #[async_trait]
    impl<Id, Version, Entity> EntityRepository for MockRepository<Id, Version, Entity>
    where
        Id: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static,
        Version: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
        Entity: Clone + Send + Sync + 'static,
    {
        type Id = Id;
        type Version = Version;
        type Entity = Entity;
        type Context = ();

        async fn get(
            &self,
            ids: &[Id],
            _context: &(),
        ) -> RepositoryResult<Vec<EntityVersion<Id, Version, Entity>>> {
            let mut state = self.state.lock().unwrap();
            state.get_calls += 1;
            let mut found = Vec::new();
            for id in ids {
                if state.fail_get.contains(id) {
                    return Err(RepositoryError::Fault(format!("get of {id} failed")));
                }
                if state.not_found_on_get.contains(id) {
                    return Err(RepositoryError::NotFound(id.to_string()));
                }
                if let Some(e) = state.entities.iter().find(|e| &e.id == id) {
                    found.push(e.clone());
                }
            }
            Ok(found)
        }

        async fn try_delete(&self, id: &Id, version: &Version, _context: &()) -> RepositoryResult<bool> {
            self.delete_checked(id, Some(version))
        }
    }

    #[async_trait]
    impl<Id, Version, Entity> LocalEntityRepository for MockRepository<Id, Version, Entity>
    where
        Id: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static,
        Version: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
        Entity: Clone + Send + Sync + 'static,
    {
        async fn delete(&self, id: &Id) -> RepositoryResult<()> {
            self.delete_checked(id, None).map(|_| ())
        }

        fn release(&self, entities: &[EntityVersion<Id, Version, Entity>]) {
            let mut state = self.state.lock().unwrap();
            state.released.extend(entities.iter().map(|e| e.id.clone()));
        }
    }
}

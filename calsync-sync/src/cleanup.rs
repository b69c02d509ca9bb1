//! Duplicate cleanup sweep.
//!
//! For every group of local entities whose fingerprints collide, the sweep
//! refetches the members, keeps one of them and deletes the others on both
//! sides, dropping their relations. Faults are attributed to the entity
//! being processed; only relation-table failures abort the sweep.
//!
//! ## Sweep
//!
//! 1. **Load**: read the relation table once (skipped when there are no groups)
//! 2. **Fetch**: refetch each group's members concurrently; vanished ids drop out
//! 3. **Verify**: compare the relevant fields of each member with the kept one
//! 4. **Delete**: remote counterpart (if related), relation, then local entity
//! 5. **Release**: free the fetched handles of the group, whatever happened
//! 6. **Save**: persist the remaining relations once

use crate::config::{CleanupConfig, KeepPolicy};
use crate::error::{RepositoryError, RepositoryResult, SyncError, SyncResult};
use crate::fingerprint::DuplicateCriteria;
use crate::identity::IdComparer;
use crate::relation::{RelationDataAccess, RelationIndex};
use crate::repository::{EntityRepository, Fetched, LocalEntityRepository};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

type IndexOf<L, R, C> = RelationIndex<
    <L as EntityRepository>::Id,
    <L as EntityRepository>::Version,
    <R as EntityRepository>::Id,
    <R as EntityRepository>::Version,
    C,
>;

/// Which repository an entity fault came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositorySide {
    Local,
    Remote,
}

impl fmt::Display for RepositorySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// A repository fault attributed to one local entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityFault<Id> {
    /// The local entity being processed.
    pub id: Id,
    /// The repository that failed.
    pub side: RepositorySide,
    pub error: RepositoryError,
}

/// Outcome of a cleanup sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanupReport<Id> {
    /// Duplicate groups handed to the sweep.
    pub groups_examined: usize,
    /// Groups with fewer than two members left after refetching.
    pub groups_skipped: usize,
    /// Local entities deleted as duplicates.
    pub local_deleted: Vec<Id>,
    /// Remote counterparts deleted (or found already gone).
    pub remote_deleted: usize,
    /// Remote counterparts left alone because their version changed.
    pub remote_version_mismatches: usize,
    /// Relations dropped from the relation table.
    pub relations_removed: usize,
    /// Fingerprint matches rejected by the field comparison.
    pub collisions_rejected: usize,
    pub faults: Vec<EntityFault<Id>>,
}

impl<Id> Default for CleanupReport<Id> {
    fn default() -> Self {
        Self {
            groups_examined: 0,
            groups_skipped: 0,
            local_deleted: Vec::new(),
            remote_deleted: 0,
            remote_version_mismatches: 0,
            relations_removed: 0,
            collisions_rejected: 0,
            faults: Vec::new(),
        }
    }
}

impl<Id> CleanupReport<Id> {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of local entities deleted.
    pub fn deleted_count(&self) -> usize {
        self.local_deleted.len()
    }

    /// Returns true if no fault was recorded.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }

    /// Adds the counts of another report to this one.
    pub fn merge(&mut self, other: CleanupReport<Id>) {
        self.groups_examined += other.groups_examined;
        self.groups_skipped += other.groups_skipped;
        self.local_deleted.extend(other.local_deleted);
        self.remote_deleted += other.remote_deleted;
        self.remote_version_mismatches += other.remote_version_mismatches;
        self.relations_removed += other.relations_removed;
        self.collisions_rejected += other.collisions_rejected;
        self.faults.extend(other.faults);
    }

    fn fault(&mut self, id: Id, side: RepositorySide, error: RepositoryError) {
        self.faults.push(EntityFault { id, side, error });
    }
}

/// The entities fetched for one group. Their handles are released when
/// the group goes out of scope.
struct FetchedGroup<'a, L: LocalEntityRepository> {
    repository: &'a L,
    entities: Vec<Fetched<L>>,
}

impl<'a, L: LocalEntityRepository> FetchedGroup<'a, L> {
    fn new(repository: &'a L, entities: Vec<Fetched<L>>) -> Self {
        Self {
            repository,
            entities,
        }
    }
}

impl<L: LocalEntityRepository> Drop for FetchedGroup<'_, L> {
    fn drop(&mut self) {
        if !self.entities.is_empty() {
            debug!("Releasing {} fetched entities", self.entities.len());
            self.repository.release(&self.entities);
        }
    }
}

/// Deletes duplicates found by the detector from both stores.
pub struct DuplicateCleaner<L, R, D, K, C> {
    local: Arc<L>,
    remote: Arc<R>,
    relations: Arc<D>,
    criteria: Arc<K>,
    comparer: C,
    config: CleanupConfig,
}

impl<L, R, D, K, C: Clone> Clone for DuplicateCleaner<L, R, D, K, C> {
    fn clone(&self) -> Self {
        Self {
            local: Arc::clone(&self.local),
            remote: Arc::clone(&self.remote),
            relations: Arc::clone(&self.relations),
            criteria: Arc::clone(&self.criteria),
            comparer: self.comparer.clone(),
            config: self.config.clone(),
        }
    }
}

impl<L, R, D, K, C> DuplicateCleaner<L, R, D, K, C>
where
    L: LocalEntityRepository,
    R: EntityRepository,
    D: RelationDataAccess<L::Id, L::Version, R::Id, R::Version>,
    K: DuplicateCriteria<L::Entity>,
    C: IdComparer<L::Id>,
{
    /// Creates a cleaner over the given repositories and relation table.
    pub fn new(
        local: Arc<L>,
        remote: Arc<R>,
        relations: Arc<D>,
        criteria: Arc<K>,
        comparer: C,
        config: CleanupConfig,
    ) -> Self {
        Self {
            local,
            remote,
            relations,
            criteria,
            comparer,
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    /// Returns the identity comparer.
    pub fn comparer(&self) -> &C {
        &self.comparer
    }

    /// Returns the duplicate criteria.
    pub fn criteria(&self) -> &K {
        &self.criteria
    }

    /// Runs one sweep over the given duplicate groups.
    ///
    /// The relation table is neither loaded nor saved when there is
    /// nothing to do. Entity-level faults are collected in the report;
    /// an error is returned only for relation-table failures.
    pub async fn clean(&self, groups: Vec<Vec<L::Id>>) -> SyncResult<CleanupReport<L::Id>> {
        if !self.config.enabled {
            debug!("Duplicate cleanup disabled, skipping sweep");
            return Ok(CleanupReport::new());
        }
        if groups.is_empty() {
            debug!("No duplicate candidates");
            return Ok(CleanupReport::new());
        }

        let loaded = self.relations.load().await.inspect_err(|e| {
            error!("Failed to load entity relations: {}", e);
        })?;
        let index = RelationIndex::from_relations(self.comparer.clone(), loaded).inspect_err(|e| {
            error!("Refusing to clean duplicates: {}", e);
        })?;
        let index = Mutex::new(index);

        let pending: Vec<_> = groups
            .into_iter()
            .map(|group| self.process_group(group, &index))
            .collect();
        let reports: Vec<CleanupReport<L::Id>> = stream::iter(pending)
            .buffered(self.config.concurrency())
            .collect()
            .await;

        let mut report = CleanupReport::new();
        for group_report in reports {
            report.merge(group_report);
        }

        let remaining = index.into_inner().into_relations();
        if let Err(e) = self.relations.save(&remaining).await {
            error!(
                "Failed to save entity relations after deleting {} duplicates: {}",
                report.deleted_count(),
                e
            );
            return Err(SyncError::RelationsNotSaved(e.to_string()));
        }

        info!(
            "Duplicate cleanup: {} groups, {} deleted, {} relations removed, {} faults",
            report.groups_examined,
            report.deleted_count(),
            report.relations_removed,
            report.faults.len()
        );
        Ok(report)
    }

    async fn process_group(
        &self,
        ids: Vec<L::Id>,
        index: &Mutex<IndexOf<L, R, C>>,
    ) -> CleanupReport<L::Id> {
        let mut report = CleanupReport::new();
        report.groups_examined = 1;

        let fetched = self.fetch_group(&ids, &mut report).await;
        let group = FetchedGroup::new(self.local.as_ref(), fetched);
        if group.entities.len() < 2 {
            debug!(
                "Skipping duplicate group of {}: {} of {} entities still exist",
                ids.len(),
                group.entities.len(),
                ids.len()
            );
            report.groups_skipped = 1;
            return report;
        }

        let keep_at = self.select_keep(&group.entities, index).await;
        let keep = &group.entities[keep_at];
        for (position, candidate) in group.entities.iter().enumerate() {
            if position == keep_at {
                continue;
            }
            if !self.criteria.is_duplicate(&keep.entity, &candidate.entity) {
                debug!(
                    "Fingerprint of {} matches {} but {} fields differ",
                    candidate.id,
                    keep.id,
                    self.criteria.kind()
                );
                report.collisions_rejected += 1;
                continue;
            }

            info!("Deleting duplicate of '{}'", keep.id);
            self.delete_duplicate(&candidate.id, index, &mut report).await;
        }

        report
    }

    /// Refetches every member of a group concurrently, preserving order.
    async fn fetch_group(&self, ids: &[L::Id], report: &mut CleanupReport<L::Id>) -> Vec<Fetched<L>> {
        let context = L::Context::default();
        let results = join_all(ids.iter().map(|id| self.fetch_one(id, &context))).await;

        let mut fetched = Vec::with_capacity(ids.len());
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(Some(entity)) => fetched.push(entity),
                Ok(None) => debug!("Duplicate candidate {} no longer exists", id),
                Err(e) => {
                    warn!("Failed to fetch duplicate candidate {}: {}", id, e);
                    report.fault(id.clone(), RepositorySide::Local, e);
                }
            }
        }
        fetched
    }

    async fn fetch_one(&self, id: &L::Id, context: &L::Context) -> RepositoryResult<Option<Fetched<L>>> {
        match self.local.get(std::slice::from_ref(id), context).await {
            Ok(entities) => Ok(entities.into_iter().next()),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn select_keep(&self, entities: &[Fetched<L>], index: &Mutex<IndexOf<L, R, C>>) -> usize {
        match self.config.keep_policy {
            KeepPolicy::FirstObserved => 0,
            KeepPolicy::Related => {
                let index = index.lock().await;
                entities
                    .iter()
                    .position(|e| index.get_by_local(&e.id).is_some())
                    .unwrap_or(0)
            }
        }
    }

    async fn delete_duplicate(
        &self,
        id: &L::Id,
        index: &Mutex<IndexOf<L, R, C>>,
        report: &mut CleanupReport<L::Id>,
    ) {
        // Dropped regardless of the remote outcome.
        let relation = index.lock().await.remove_by_local(id);

        if let Some(relation) = relation {
            report.relations_removed += 1;
            let context = R::Context::default();
            match self
                .remote
                .try_delete(&relation.remote_id, &relation.remote_version, &context)
                .await
            {
                Ok(true) => report.remote_deleted += 1,
                Ok(false) => {
                    warn!(
                        "Remote entity {} changed since last sync, not deleting it",
                        relation.remote_id
                    );
                    report.remote_version_mismatches += 1;
                }
                Err(e) if e.is_not_found() => {
                    debug!("Remote entity {} already deleted", relation.remote_id);
                    report.remote_deleted += 1;
                }
                Err(e) => {
                    warn!("Failed to delete remote entity {}: {}", relation.remote_id, e);
                    report.fault(id.clone(), RepositorySide::Remote, e);
                }
            }
        }

        match self.local.delete(id).await {
            Ok(()) => report.local_deleted.push(id.clone()),
            Err(e) if e.is_not_found() => {
                debug!("Local entity {} already deleted", id);
                report.local_deleted.push(id.clone());
            }
            Err(e) => {
                warn!("Failed to delete local duplicate {}: {}", id, e);
                report.fault(id.clone(), RepositorySide::Local, e);
            }
        }
    }
}

//! One synchronization pass, as seen by duplicate cleanup.
//!
//! The session owns the observation table while the main pass runs and
//! hands it to the cleaner when the pass is finished. `finish` consumes
//! the session, so nothing can be announced once cleanup has started.

use crate::cleanup::{CleanupReport, DuplicateCleaner};
use crate::detector::DuplicateDetector;
use crate::error::{SyncError, SyncResult};
use crate::fingerprint::{DuplicateCriteria, Fingerprint};
use crate::identity::IdComparer;
use crate::relation::RelationDataAccess;
use crate::repository::{EntityRepository, LocalEntityRepository};
use tracing::{debug, error};

/// Tracks the entities processed in one pass and cleans duplicates at
/// the end of it.
pub struct SyncSession<L, R, D, K, C>
where
    L: LocalEntityRepository,
    C: IdComparer<L::Id>,
{
    detector: DuplicateDetector<L::Id, C>,
    cleaner: DuplicateCleaner<L, R, D, K, C>,
}

impl<L, R, D, K, C> SyncSession<L, R, D, K, C>
where
    L: LocalEntityRepository + 'static,
    R: EntityRepository + 'static,
    D: RelationDataAccess<L::Id, L::Version, R::Id, R::Version> + 'static,
    K: DuplicateCriteria<L::Entity> + 'static,
    C: IdComparer<L::Id> + 'static,
{
    /// Starts a session with an empty observation table.
    pub fn new(cleaner: DuplicateCleaner<L, R, D, K, C>) -> Self {
        Self {
            detector: DuplicateDetector::new(cleaner.comparer().clone()),
            cleaner,
        }
    }

    /// Records an entity processed by the main pass.
    pub fn announce(&mut self, id: L::Id, entity: &L::Entity) {
        if !self.cleaner.config().enabled {
            return;
        }
        let fingerprint = self.cleaner.criteria().fingerprint(entity);
        self.announce_fingerprint(id, fingerprint);
    }

    /// Records an entity whose fingerprint is already known.
    pub fn announce_fingerprint(&mut self, id: L::Id, fingerprint: Fingerprint) {
        if !self.cleaner.config().enabled {
            return;
        }
        self.detector.announce(id, fingerprint);
    }

    /// Records that the main pass deleted an entity.
    pub fn announce_deleted(&mut self, id: &L::Id) {
        self.detector.forget(id);
    }

    /// Returns the observation table of this pass.
    pub fn detector(&self) -> &DuplicateDetector<L::Id, C> {
        &self.detector
    }

    /// Ends the pass and runs the duplicate cleanup sweep.
    ///
    /// The sweep runs on its own task: dropping the returned future does
    /// not interrupt deletions that are already under way.
    pub async fn finish(self) -> SyncResult<CleanupReport<L::Id>> {
        let groups = self.detector.into_groups();
        debug!("Pass finished with {} duplicate groups", groups.len());

        let cleaner = self.cleaner;
        tokio::spawn(async move { cleaner.clean(groups).await })
            .await
            .map_err(|e| {
                error!("Duplicate cleanup task failed: {}", e);
                SyncError::TaskJoin(e.to_string())
            })?
    }
}

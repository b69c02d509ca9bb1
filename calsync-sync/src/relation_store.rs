//! Persistent relation table backed by SQLite.
//!
//! Uses its own SQLite file so relation data is isolated from any store
//! the adapters keep for entity payloads. Queries run on the blocking
//! thread pool.

use crate::error::{SyncError, SyncResult};
use crate::relation::RelationDataAccess;
use async_trait::async_trait;
use calsync_types::{CalendarRelation, LocalId, LocalVersion, RemoteId, RemoteVersion};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Relation table for calendar profiles, stored in SQLite.
pub struct SqliteRelationStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRelationStore {
    /// Opens (or creates) a relation store at the given path.
    pub fn new(path: impl AsRef<Path>) -> SyncResult<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| SyncError::Storage(format!("failed to open relation store: {e}")))?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory relation store (for testing).
    pub fn open_in_memory() -> SyncResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            SyncError::Storage(format!("failed to open in-memory relation store: {e}"))
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> SyncResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> SyncResult<MutexGuard<'_, Connection>> {
        lock(&self.conn)
    }

    // Identity columns are not UNIQUE: a corrupt table must still
    // load so the relation index can reject it.
    fn init_schema(&self) -> SyncResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS entity_relations (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                local_entry_id TEXT NOT NULL,
                local_global_id TEXT,
                local_version INTEGER NOT NULL,
                remote_id TEXT NOT NULL,
                remote_version TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| SyncError::Storage(format!("failed to init relation schema: {e}")))?;
        Ok(())
    }

    /// Appends a single relation without replacing the table.
    pub fn append(&self, relation: &CalendarRelation) -> SyncResult<()> {
        let conn = self.conn()?;
        insert_relation(&conn, relation)
    }

    /// Returns the number of stored relations.
    pub fn count(&self) -> SyncResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM entity_relations", [], |row| row.get(0))
            .map_err(|e| SyncError::Storage(format!("failed to count relations: {e}")))?;
        usize::try_from(count)
            .map_err(|_| SyncError::Storage(format!("invalid relation count: {count}")))
    }
}

fn insert_relation(conn: &Connection, relation: &CalendarRelation) -> SyncResult<()> {
    conn.execute(
        "INSERT INTO entity_relations (local_entry_id, local_global_id, local_version, remote_id, remote_version) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            relation.local_id.entry_id(),
            relation.local_id.global_id(),
            relation.local_version.millis(),
            relation.remote_id.as_str(),
            relation.remote_version.as_str(),
        ],
    )
    .map_err(|e| SyncError::Storage(format!("failed to save relation: {e}")))?;
    Ok(())
}

#[async_trait]
impl RelationDataAccess<LocalId, LocalVersion, RemoteId, RemoteVersion> for SqliteRelationStore {
    async fn load(&self) -> SyncResult<Vec<CalendarRelation>> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            load_relations(&conn)
        })
        .await
        .map_err(|e| SyncError::TaskJoin(format!("relation load task failed: {e}")))?
    }

    async fn save(&self, relations: &[CalendarRelation]) -> SyncResult<()> {
        let conn = Arc::clone(&self.conn);
        let relations = relations.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn)?;
            save_relations(&mut conn, &relations)
        })
        .await
        .map_err(|e| SyncError::TaskJoin(format!("relation save task failed: {e}")))?
    }
}

fn lock(conn: &Mutex<Connection>) -> SyncResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| SyncError::Storage("relation store lock poisoned".into()))
}

fn load_relations(conn: &Connection) -> SyncResult<Vec<CalendarRelation>> {
    let mut stmt = conn
        .prepare("SELECT local_entry_id, local_global_id, local_version, remote_id, remote_version FROM entity_relations ORDER BY seq")
        .map_err(|e| SyncError::Storage(format!("failed to prepare relation query: {e}")))?;

    let rows = stmt
        .query_map([], |row| {
            let entry_id: String = row.get(0)?;
            let global_id: Option<String> = row.get(1)?;
            let local_version: i64 = row.get(2)?;
            let remote_id: String = row.get(3)?;
            let remote_version: String = row.get(4)?;
            Ok(CalendarRelation::new(
                LocalId::new(entry_id, global_id),
                LocalVersion::from_millis(local_version),
                RemoteId::new(remote_id),
                RemoteVersion::new(remote_version),
            ))
        })
        .map_err(|e| SyncError::Storage(format!("failed to query relations: {e}")))?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(|e| SyncError::Storage(format!("failed to read relation row: {e}")))?);
    }
    debug!("Loaded {} relations from SQLite", result.len());
    Ok(result)
}

fn save_relations(conn: &mut Connection, relations: &[CalendarRelation]) -> SyncResult<()> {
    let tx = conn
        .transaction()
        .map_err(|e| SyncError::Storage(format!("failed to begin relation save: {e}")))?;
    tx.execute("DELETE FROM entity_relations", [])
        .map_err(|e| SyncError::Storage(format!("failed to clear relations: {e}")))?;
    for relation in relations {
        insert_relation(&tx, relation)?;
    }
    tx.commit()
        .map_err(|e| SyncError::Storage(format!("failed to commit relations: {e}")))?;
    debug!("Saved {} relations to SQLite", relations.len());
    Ok(())
}

mod common;

use calsync_sync::{CleanupConfig, DuplicateCriteria, EventCriteria, Fingerprint, KeepPolicy, SyncError, SyncSession};
use common::{event, init_tracing, lid, relation, rid, Fixture};
use pretty_assertions::assert_eq;

// ── Announcements ────────────────────────────────────────────────

#[tokio::test]
async fn session_cleans_duplicates_announced_during_pass() {
    init_tracing();
    let (a1, a2, a3) = (lid("a1"), lid("a2"), lid("a3"));
    let fx = Fixture::with_relations(vec![relation(&a1, "r1.ics", "e1"), relation(&a2, "r2.ics", "e2")]);
    fx.add_local(&a1, event(9, "Standup"));
    fx.add_local(&a2, event(9, "Standup"));
    fx.add_local(&a3, event(11, "Review"));
    fx.add_remote("r1.ics", "e1", event(9, "Standup"));
    fx.add_remote("r2.ics", "e2", event(9, "Standup"));

    let mut session = SyncSession::new(fx.cleaner());
    session.announce(a1.clone(), &event(9, "Standup"));
    session.announce(a2.clone(), &event(9, "Standup"));
    session.announce(a3.clone(), &event(11, "Review"));
    assert_eq!(session.detector().len(), 3);

    let report = session.finish().await.unwrap();

    assert_eq!(report.local_deleted, vec![a2]);
    assert_eq!(report.remote_deleted, 1);
    assert!(fx.local.contains(&a1));
    assert!(fx.local.contains(&a3));
    assert!(!fx.remote.contains(&rid("r2.ics")));
    assert_eq!(fx.relations.relations(), vec![relation(&a1, "r1.ics", "e1")]);
    assert_eq!(fx.relations.save_calls(), 1);
}

#[tokio::test]
async fn announce_uses_criteria_fingerprint() {
    let fx = Fixture::new();
    let mut session = SyncSession::new(fx.cleaner());
    let data = event(9, "Standup");

    session.announce(lid("a"), &data);
    assert_eq!(
        session.detector().fingerprint_of(&lid("a")),
        Some(EventCriteria.fingerprint(&data))
    );
}

#[tokio::test]
async fn deleted_entity_is_not_cleaned() {
    let (a1, a2) = (lid("a1"), lid("a2"));
    let fx = Fixture::new();
    fx.add_local(&a1, event(9, "Standup"));
    fx.add_local(&a2, event(9, "Standup"));

    let mut session = SyncSession::new(fx.cleaner());
    session.announce_fingerprint(a1.clone(), Fingerprint::from_raw(5));
    session.announce_fingerprint(a2.clone(), Fingerprint::from_raw(5));
    session.announce_deleted(&a1);

    let report = session.finish().await.unwrap();

    assert_eq!(report.groups_examined, 0);
    assert_eq!(fx.local.len(), 2);
    assert_eq!(fx.relations.load_calls(), 0);
}

#[tokio::test]
async fn pass_without_duplicates_skips_relation_store() {
    let fx = Fixture::new();
    let mut session = SyncSession::new(fx.cleaner());
    session.announce(lid("a"), &event(9, "Standup"));
    session.announce(lid("b"), &event(10, "Standup"));

    let report = session.finish().await.unwrap();

    assert_eq!(report.deleted_count(), 0);
    assert_eq!(fx.relations.load_calls(), 0);
    assert_eq!(fx.relations.save_calls(), 0);
}

// ── Configuration ────────────────────────────────────────────────

#[tokio::test]
async fn disabled_session_ignores_announcements() {
    let (a1, a2) = (lid("a1"), lid("a2"));
    let fx = Fixture::new();
    fx.add_local(&a1, event(9, "Standup"));
    fx.add_local(&a2, event(9, "Standup"));

    let mut session = SyncSession::new(fx.cleaner_with(CleanupConfig::disabled()));
    session.announce(a1, &event(9, "Standup"));
    session.announce(a2, &event(9, "Standup"));
    assert!(session.detector().is_empty());

    let report = session.finish().await.unwrap();
    assert_eq!(report.deleted_count(), 0);
    assert_eq!(fx.local.len(), 2);
}

#[test]
fn config_from_json_fills_defaults() {
    let config = CleanupConfig::from_json(r#"{"keep_policy": "related"}"#).unwrap();
    assert!(config.enabled);
    assert_eq!(config.max_concurrent_groups, 4);
    assert_eq!(config.keep_policy, KeepPolicy::Related);

    let empty = CleanupConfig::from_json("{}").unwrap();
    assert_eq!(empty, CleanupConfig::default());
}

#[test]
fn config_from_json_rejects_garbage() {
    let err = CleanupConfig::from_json(r#"{"keep_policy": "newest"}"#).unwrap_err();
    assert!(matches!(err, SyncError::Serialization(_)));
}

#[test]
fn zero_concurrency_is_clamped() {
    let config = CleanupConfig {
        max_concurrent_groups: 0,
        ..Default::default()
    };
    assert_eq!(config.concurrency(), 1);
    assert_eq!(CleanupConfig::default().concurrency(), 4);
}

// ── Failure propagation ──────────────────────────────────────────

#[tokio::test]
async fn finish_surfaces_relation_failures() {
    let (a1, a2) = (lid("a1"), lid("a2"));
    let fx = Fixture::new();
    fx.add_local(&a1, event(9, "Standup"));
    fx.add_local(&a2, event(9, "Standup"));
    fx.relations.fail_save();

    let mut session = SyncSession::new(fx.cleaner());
    session.announce(a1, &event(9, "Standup"));
    session.announce(a2, &event(9, "Standup"));

    let err = session.finish().await.unwrap_err();
    assert!(matches!(err, SyncError::RelationsNotSaved(_)));
}

#[tokio::test]
async fn dropped_finish_still_completes_sweep() {
    let (a1, a2) = (lid("a1"), lid("a2"));
    let fx = Fixture::new();
    fx.add_local(&a1, event(9, "Standup"));
    fx.add_local(&a2, event(9, "Standup"));

    let mut session = SyncSession::new(fx.cleaner());
    session.announce(a1, &event(9, "Standup"));
    session.announce(a2.clone(), &event(9, "Standup"));

    // Abandon the caller's future right after the sweep is spawned.
    let finish = session.finish();
    let _ = tokio::time::timeout(std::time::Duration::ZERO, finish).await;

    for _ in 0..100 {
        if fx.relations.save_calls() == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(fx.relations.save_calls(), 1);
    assert!(!fx.local.contains(&a2));
}

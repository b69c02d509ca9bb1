use calsync_sync::{DuplicateDetector, EntryIdComparer, ExactIdComparer, Fingerprint};
use calsync_types::LocalId;
use pretty_assertions::assert_eq;

fn fp(raw: u64) -> Fingerprint {
    Fingerprint::from_raw(raw)
}

fn lid(entry: &str) -> LocalId {
    LocalId::from_entry_id(entry)
}

// ── Grouping ─────────────────────────────────────────────────────

#[test]
fn empty_detector_has_no_groups() {
    let detector: DuplicateDetector<LocalId, ExactIdComparer> = DuplicateDetector::new(ExactIdComparer);
    assert!(detector.is_empty());
    assert!(detector.group_duplicates().is_empty());
}

#[test]
fn distinct_fingerprints_form_no_groups() {
    let mut detector = DuplicateDetector::new(ExactIdComparer);
    detector.announce(lid("a"), fp(1));
    detector.announce(lid("b"), fp(2));
    detector.announce(lid("c"), fp(3));

    assert_eq!(detector.len(), 3);
    assert!(detector.group_duplicates().is_empty());
}

#[test]
fn colliding_fingerprints_grouped_in_observation_order() {
    let mut detector = DuplicateDetector::new(ExactIdComparer);
    detector.announce(lid("a1"), fp(1));
    detector.announce(lid("a2"), fp(1));
    detector.announce(lid("a3"), fp(2));

    assert_eq!(detector.group_duplicates(), vec![vec![lid("a1"), lid("a2")]]);
}

#[test]
fn groups_ordered_by_first_member() {
    let mut detector = DuplicateDetector::new(ExactIdComparer);
    detector.announce(lid("x1"), fp(9));
    detector.announce(lid("y1"), fp(4));
    detector.announce(lid("y2"), fp(4));
    detector.announce(lid("x2"), fp(9));
    detector.announce(lid("x3"), fp(9));

    assert_eq!(
        detector.group_duplicates(),
        vec![
            vec![lid("x1"), lid("x2"), lid("x3")],
            vec![lid("y1"), lid("y2")],
        ]
    );
}

#[test]
fn grouping_does_not_consume_observations() {
    let mut detector = DuplicateDetector::new(ExactIdComparer);
    detector.announce(lid("a"), fp(1));
    detector.announce(lid("b"), fp(1));

    let first = detector.group_duplicates();
    let second = detector.group_duplicates();
    assert_eq!(first, second);
    assert_eq!(detector.into_groups(), first);
}

// ── Re-announcement ──────────────────────────────────────────────

#[test]
fn reannounce_replaces_fingerprint() {
    let mut detector = DuplicateDetector::new(ExactIdComparer);
    detector.announce(lid("a"), fp(1));
    detector.announce(lid("b"), fp(1));
    detector.announce(lid("b"), fp(2));

    assert_eq!(detector.len(), 2);
    assert_eq!(detector.fingerprint_of(&lid("b")), Some(fp(2)));
    assert!(detector.group_duplicates().is_empty());
}

#[test]
fn reannounce_keeps_first_observed_position() {
    let mut detector = DuplicateDetector::new(ExactIdComparer);
    detector.announce(lid("a"), fp(1));
    detector.announce(lid("b"), fp(1));
    detector.announce(lid("a"), fp(1));

    assert_eq!(detector.group_duplicates(), vec![vec![lid("a"), lid("b")]]);
}

// ── Forget ───────────────────────────────────────────────────────

#[test]
fn forget_removes_member_from_group() {
    let mut detector = DuplicateDetector::new(ExactIdComparer);
    detector.announce(lid("a"), fp(1));
    detector.announce(lid("b"), fp(1));
    detector.announce(lid("c"), fp(1));

    assert!(detector.forget(&lid("b")));
    assert!(!detector.forget(&lid("b")));
    assert_eq!(detector.fingerprint_of(&lid("b")), None);
    assert_eq!(detector.group_duplicates(), vec![vec![lid("a"), lid("c")]]);
}

#[test]
fn forget_dissolves_pair() {
    let mut detector = DuplicateDetector::new(ExactIdComparer);
    detector.announce(lid("a"), fp(1));
    detector.announce(lid("b"), fp(1));
    detector.forget(&lid("a"));

    assert!(detector.group_duplicates().is_empty());
}

// ── Identity comparer ────────────────────────────────────────────

#[test]
fn entry_id_comparer_merges_ids_of_same_entry() {
    let mut detector = DuplicateDetector::new(EntryIdComparer);
    detector.announce(LocalId::new("a", Some("g1".into())), fp(1));
    detector.announce(LocalId::new("a", Some("g2".into())), fp(1));

    assert_eq!(detector.len(), 1);
    assert!(detector.group_duplicates().is_empty());

    // The latest id is the one handed to cleanup.
    detector.announce(LocalId::from_entry_id("b"), fp(1));
    assert_eq!(
        detector.group_duplicates(),
        vec![vec![LocalId::new("a", Some("g2".into())), LocalId::from_entry_id("b")]]
    );
}

#[test]
fn exact_comparer_keeps_ids_apart() {
    let mut detector = DuplicateDetector::new(ExactIdComparer);
    detector.announce(LocalId::new("a", Some("g1".into())), fp(1));
    detector.announce(LocalId::new("a", Some("g2".into())), fp(1));

    assert_eq!(detector.len(), 2);
    assert_eq!(detector.group_duplicates().len(), 1);
}

#[test]
fn forget_through_comparer_key() {
    let mut detector = DuplicateDetector::new(EntryIdComparer);
    detector.announce(LocalId::new("a", Some("g1".into())), fp(1));
    assert!(detector.forget(&LocalId::new("a", None)));
    assert!(detector.is_empty());
}

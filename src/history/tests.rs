use super::*;
use crate::changeset::ChangeSet;
use crate::rope::Rope;
use std::thread::sleep;

fn commit_insert(h: &History, rope: &Rope, pos: usize, text: &str) -> (Rope, RevisionId) {
    let cs = ChangeSet::new(rope.len_chars())
        .retain(pos)
        .insert(text)
        .retain(rope.len_chars() - pos);
    let tx = Transaction::new(cs);
    let next = tx.apply(rope).unwrap();
    let id = h.commit(tx, rope).unwrap().expect("non-empty commit");
    (next, id)
}

#[test]
fn fresh_history_starts_at_root() {
    let h = History::new();
    assert!(h.at_root());
    assert!(h.at_tip());
    assert_eq!(h.current_id(), 0);
}

#[test]
fn empty_transaction_is_rejected_as_no_op() {
    let h = History::new();
    let r = Rope::from_str("abc");
    let tx = Transaction::new(ChangeSet::new(3).retain(3));
    let result = h.commit(tx, &r).unwrap();
    assert!(result.is_none());
    assert!(h.at_root());
}

#[test]
fn commit_undo_redo_round_trip() {
    let h = History::new();
    let r0 = Rope::from_str("hello");
    let (r1, _id1) = commit_insert(&h, &r0, 5, " world");
    assert_eq!(r1.to_string_full(), "hello world");
    assert!(!h.at_root());

    let undo_tx = h.undo().expect("undo available");
    let back = undo_tx.apply(&r1).unwrap();
    assert_eq!(back.to_string_full(), "hello");
    assert!(h.at_root());

    let redo_tx = h.redo().expect("redo available");
    let forward = redo_tx.apply(&back).unwrap();
    assert_eq!(forward.to_string_full(), "hello world");
}

#[test]
fn undo_past_root_returns_none() {
    let h = History::new();
    assert!(h.undo().is_none());
}

#[test]
fn redo_with_nothing_ahead_returns_none() {
    let h = History::new();
    let r0 = Rope::from_str("hi");
    let (_r1, _id) = commit_insert(&h, &r0, 2, "!");
    assert!(h.redo().is_none());
}

#[test]
fn committing_after_undo_branches_without_discarding_old_path() {
    let h = History::new();
    let r0 = Rope::from_str("base");
    let (r1, first_id) = commit_insert(&h, &r0, 4, "-A");
    h.undo().unwrap();
    assert!(h.at_root());

    let (r2, second_id) = commit_insert(&h, &r0, 4, "-B");
    assert_ne!(first_id, second_id);
    assert_eq!(r2.to_string_full(), "base-B");

    // Old branch is gone from the default redo path but the new commit
    // still descends directly from root, which is the branch point.
    assert!(h.redo().is_none());
    let _ = r1;
}

#[test]
fn earlier_and_later_are_single_step() {
    let h = History::new();
    let r0 = Rope::from_str("x");
    let (r1, id1) = commit_insert(&h, &r0, 1, "y");
    let (r2, _id2) = commit_insert(&h, &r1, 2, "z");

    let tx = h.earlier(5).expect("one step back even though steps=5");
    let back = tx.apply(&r2).unwrap();
    assert_eq!(back.to_string_full(), "xy");
    assert_eq!(h.current_id(), id1, "earlier(5) takes exactly one step, not five");

    let redo = h.later(5).expect("one step forward even though steps=5");
    let forward = redo.apply(&back).unwrap();
    assert_eq!(forward.to_string_full(), "xyz");
}

#[test]
fn earlier_by_composes_steps_within_duration() {
    let h = History::new();
    let r0 = Rope::from_str("");
    let (r1, _) = commit_insert(&h, &r0, 0, "a");
    sleep(Duration::from_millis(5));
    let (r2, _) = commit_insert(&h, &r1, 1, "b");
    sleep(Duration::from_millis(5));
    let (r3, _) = commit_insert(&h, &r2, 2, "c");

    let tx = h.earlier_by(Duration::from_secs(60)).expect("composed step");
    let back = tx.apply(&r3).unwrap();
    assert_eq!(back.to_string_full(), "");
    assert!(h.at_root());
}

#[test]
fn later_by_composes_steps_symmetrically() {
    let h = History::new();
    let r0 = Rope::from_str("");
    let (r1, _) = commit_insert(&h, &r0, 0, "a");
    let (_r2, _) = commit_insert(&h, &r1, 1, "b");

    h.undo();
    h.undo();
    assert!(h.at_root());

    let tx = h.later_by(Duration::from_secs(60)).expect("composed forward");
    let forward = tx.apply(&r0).unwrap();
    assert_eq!(forward.to_string_full(), "ab");
    assert!(h.at_tip());
}

#[test]
fn stats_report_revision_count() {
    let h = History::new();
    let r0 = Rope::from_str("a");
    commit_insert(&h, &r0, 1, "b");
    let stats = h.stats();
    assert_eq!(stats.revision_count, 2); // root + one commit
    assert_eq!(stats.evicted_count, 0);
}

#[test]
fn eviction_prunes_abandoned_branches_under_cap() {
    let h = History::with_max_size(3);
    let r0 = Rope::from_str("");
    let (r1, _) = commit_insert(&h, &r0, 0, "1");
    h.undo();
    let (r2, _) = commit_insert(&h, &r0, 0, "2");
    h.undo();
    let (_r3, _) = commit_insert(&h, &r0, 0, "3");

    let stats = h.stats();
    assert!(stats.revision_count <= 3);
    assert!(stats.evicted_count >= 1);
    let _ = (r1, r2);
}

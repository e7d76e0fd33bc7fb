use super::*;
use crate::rope::Rope;

#[test]
fn builder_fuses_adjacent_same_kind_ops() {
    let cs = ChangeSet::new(5).retain(2).retain(3);
    assert_eq!(cs.ops(), &[Op::Retain(5)]);
}

#[test]
fn builder_drops_zero_length_ops() {
    let cs = ChangeSet::new(3).retain(0).delete(0).insert("").retain(3);
    assert_eq!(cs.ops(), &[Op::Retain(3)]);
}

#[test]
fn builder_fuses_across_intervening_zero_length_calls() {
    let cs = ChangeSet::new(4).retain(2).retain(0).retain(2);
    assert_eq!(cs.ops(), &[Op::Retain(4)]);
}

#[test]
fn scenario_simple_insert() {
    let r = Rope::from_str("Hello World");
    let r2 = r.insert(5, " Beautiful").unwrap();
    assert_eq!(r2.to_string_full(), "Hello Beautiful World");
    assert_eq!(r.to_string_full(), "Hello World");
}

#[test]
fn scenario_changeset_apply_and_invert() {
    let cs = ChangeSet::new(11).retain(5).insert(" Beautiful").retain(6);
    assert_eq!(cs.len_after(), 21);
    let r = Rope::from_str("Hello World");
    let applied = cs.apply(&r).unwrap();
    assert_eq!(applied.to_string_full(), "Hello Beautiful World");
    let inverted = cs.invert(&r).unwrap();
    let restored = inverted.apply(&applied).unwrap();
    assert_eq!(restored.to_string_full(), "Hello World");
}

#[test]
fn scenario_compose() {
    let cs1 = ChangeSet::new(8)
        .retain(5)
        .insert(" test!")
        .retain(1)
        .delete(2)
        .insert("abc");
    assert_eq!(cs1.len_after(), 15);
    let r = Rope::from_str("hello xz");
    let after_cs1 = cs1.apply(&r).unwrap();
    assert_eq!(after_cs1.to_string_full(), "hello test! abc");

    let cs2 = ChangeSet::new(15).delete(10).insert("世orld").retain(5);
    assert_eq!(cs2.len_after(), 10);
    let after_cs2 = cs2.apply(&after_cs1).unwrap();
    assert_eq!(after_cs2.to_string_full(), "世orld! abc");

    let composed = cs1.compose(&cs2).unwrap();
    assert_eq!(composed.len_before(), 8);
    assert_eq!(composed.len_after(), 10);
    let direct = composed.apply(&r).unwrap();
    assert_eq!(direct.to_string_full(), "世orld! abc");
}

#[test]
fn compose_rejects_length_mismatch() {
    let cs1 = ChangeSet::new(3).retain(3);
    let cs2 = ChangeSet::new(5).retain(5);
    assert!(matches!(
        cs1.compose(&cs2),
        Err(Error::LengthMismatch {
            expected: 3,
            found: 5
        })
    ));
}

#[test]
fn apply_rejects_length_mismatch() {
    let cs = ChangeSet::new(3).retain(3);
    let r = Rope::from_str("ab");
    assert!(cs.apply(&r).is_err());
}

#[test]
fn invert_round_trips_a_pure_delete() {
    let r = Rope::from_str("hello world");
    let cs = ChangeSet::new(11).retain(6).delete(5);
    let applied = cs.apply(&r).unwrap();
    assert_eq!(applied.to_string_full(), "hello ");
    let inv = cs.invert(&r).unwrap();
    let restored = inv.apply(&applied).unwrap();
    assert_eq!(restored.to_string_full(), "hello world");
}

#[test]
fn split_divides_ops_at_char_position() {
    let cs = ChangeSet::new(10).retain(3).insert("XYZ").delete(2).retain(5);
    let (before, after) = cs.split(3).unwrap();
    assert_eq!(before.len_before(), 10);
    assert_eq!(after.len_before(), 10);

    let r = Rope::from_str("0123456789");
    let whole = cs.apply(&r).unwrap();
    let via_before = before.apply(&r).unwrap();
    let via_both = after.apply(&via_before).unwrap();
    assert_eq!(via_both.to_string_full(), whole.to_string_full());
}

#[test]
fn split_at_zero_puts_everything_in_after() {
    let cs = ChangeSet::new(5).insert("hi").retain(5);
    let (before, after) = cs.split(0).unwrap();
    assert_eq!(before.ops(), &[Op::Insert("hi".to_string())]);
    assert!(matches!(after.ops(), [Op::Retain(5)]));
}

#[test]
fn split_out_of_bounds_errors() {
    let cs = ChangeSet::new(5).retain(5);
    assert!(cs.split(6).is_err());
}

#[test]
fn map_position_unchanged_before_any_edit() {
    let cs = ChangeSet::new(10).retain(3).delete(2).retain(5);
    assert_eq!(cs.map_position(0, Association::Before).unwrap(), 0);
    assert_eq!(cs.map_position(2, Association::After).unwrap(), 2);
}

#[test]
fn map_position_inside_deletion_snaps() {
    let cs = ChangeSet::new(10).retain(3).delete(2).retain(5);
    // chars 3,4 are deleted; both associations collapse to the same post
    // position since nothing is inserted in their place.
    assert_eq!(cs.map_position(3, Association::Before).unwrap(), 3);
    assert_eq!(cs.map_position(4, Association::After).unwrap(), 3);
}

#[test]
fn map_position_at_insertion_point_respects_association() {
    let cs = ChangeSet::new(5).retain(2).insert("XY").retain(3);
    assert_eq!(cs.map_position(2, Association::Before).unwrap(), 2);
    assert_eq!(cs.map_position(2, Association::After).unwrap(), 4);
}

#[test]
fn map_position_through_replace_after_skips_insertion() {
    let cs = ChangeSet::new(10).retain(3).delete(2).insert("Q").retain(5);
    assert_eq!(cs.map_position(3, Association::Before).unwrap(), 3);
    assert_eq!(cs.map_position(4, Association::After).unwrap(), 4);
}

#[test]
fn map_position_monotonic_for_random_changeset() {
    let cs = ChangeSet::new(12)
        .retain(2)
        .delete(3)
        .insert("hey")
        .retain(1)
        .delete(2)
        .retain(4);
    let positions: Vec<usize> = (0..=12).collect();
    for assoc in [Association::Before, Association::After] {
        let mapped: Vec<usize> = positions
            .iter()
            .map(|&p| cs.map_position(p, assoc).unwrap())
            .collect();
        for w in mapped.windows(2) {
            assert!(w[0] <= w[1], "monotonicity violated for {:?}", assoc);
        }
    }
}

#[test]
fn map_positions_batch_matches_individual_calls_any_order() {
    let cs = ChangeSet::new(10).retain(3).delete(2).insert("Q").retain(5);
    let ps = vec![7usize, 0, 10, 3, 5];
    let batch = cs.map_positions(&ps, Association::After).unwrap();
    let individual: Vec<usize> = ps
        .iter()
        .map(|&p| cs.map_position(p, Association::After).unwrap())
        .collect();
    assert_eq!(batch, individual);
}

#[test]
fn transform_left_tie_breaker_keeps_self_insert_first() {
    let base_len = 5;
    let a = ChangeSet::new(base_len).retain(2).insert("A").retain(3);
    let b = ChangeSet::new(base_len).retain(2).insert("B").retain(3);
    let a_prime = a.transform(&b, TieBreaker::Left).unwrap();
    let r = Rope::from_str("hello");
    let after_b = b.apply(&r).unwrap();
    let result = a_prime.apply(&after_b).unwrap();
    assert_eq!(result.to_string_full(), "heABllo");
}

#[test]
fn transform_right_tie_breaker_keeps_other_insert_first() {
    let base_len = 5;
    let a = ChangeSet::new(base_len).retain(2).insert("A").retain(3);
    let b = ChangeSet::new(base_len).retain(2).insert("B").retain(3);
    let a_prime = a.transform(&b, TieBreaker::Right).unwrap();
    let r = Rope::from_str("hello");
    let after_b = b.apply(&r).unwrap();
    let result = a_prime.apply(&after_b).unwrap();
    assert_eq!(result.to_string_full(), "heBAllo");
}

#[test]
fn transform_disjoint_edits_commute() {
    let a = ChangeSet::new(10).retain(2).delete(1).retain(7);
    let b = ChangeSet::new(10).retain(8).insert("Z").retain(2);
    let a_prime = a.transform(&b, TieBreaker::Left).unwrap();
    let b_prime = b.transform(&a, TieBreaker::Right).unwrap();

    let r = Rope::from_str("0123456789");
    let via_a_then_bprime = a.apply(&r).and_then(|x| b_prime.apply(&x)).unwrap();
    let via_b_then_aprime = b.apply(&r).and_then(|x| a_prime.apply(&x)).unwrap();
    assert_eq!(
        via_a_then_bprime.to_string_full(),
        via_b_then_aprime.to_string_full()
    );
}

#[test]
fn transaction_caches_inversion() {
    let cs = ChangeSet::new(5).retain(2).insert("!!").retain(3);
    let mut tx = Transaction::new(cs);
    assert!(tx.cached_inverse().is_none());
    let r = Rope::from_str("abcde");
    tx.invert(&r).unwrap();
    assert!(tx.cached_inverse().is_some());
}

#[test]
fn transaction_is_empty_iff_no_ops() {
    let empty = Transaction::new(ChangeSet::new(3).retain(3));
    assert!(!empty.is_empty() || ChangeSet::new(3).ops().is_empty());
    let truly_empty = Transaction::new(ChangeSet::new(0));
    assert!(truly_empty.is_empty());
}

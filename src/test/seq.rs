use crate::tcp::SeqNum;

#[test]
fn seq_add_and_sub_wrap_around() {
    let near_top = SeqNum(u32::MAX - 1);
    assert_eq!(near_top + 3, SeqNum(1));
    assert_eq!(SeqNum(1) - 3, SeqNum(u32::MAX - 1));

    let mut s = SeqNum(u32::MAX);
    s += 1;
    assert_eq!(s, SeqNum(0));
}

#[test]
fn seq_diff_is_signed_distance_across_wrap() {
    // Straddling the wrap point in both directions.
    assert_eq!(SeqNum(10).diff(SeqNum(u32::MAX - 10)), 21);
    assert_eq!(SeqNum(u32::MAX - 10).diff(SeqNum(10)), -21);

    // Plain distances away from the wrap.
    assert_eq!(SeqNum(1000).diff(SeqNum(400)), 600);
    assert_eq!(SeqNum(400).diff(SeqNum(1000)), -600);
    assert_eq!(SeqNum(77).diff(SeqNum(77)), 0);

    // Operator form.
    assert_eq!(SeqNum(5) - SeqNum(u32::MAX), 6);
}

#[test]
fn seq_ordering_is_consistent_with_true_order_near_wrap() {
    // A sequence just past the wrap is "greater" than one just before it.
    assert!(SeqNum(5) > SeqNum(u32::MAX - 5));
    assert!(SeqNum(u32::MAX - 5) < SeqNum(5));

    // Within 2^31 the ordering matches integer ordering.
    assert!(SeqNum(2_000_000_000) > SeqNum(1_000_000_000));
    assert!(SeqNum(0) < SeqNum(2_147_483_647));
}

#[test]
fn seq_recovery_point_comparisons_survive_wrap() {
    // A retransmission window that spans the wrap point: the recovery
    // point sits after the wrap while the cumulative ack is still
    // before it. The ack must compare below the recovery point, and
    // once it passes it the comparison must flip.
    let last_acked = SeqNum(u32::MAX - 1000);
    let recover = last_acked + 5000; // wraps

    assert!(last_acked < recover);
    assert!(recover.diff(last_acked) == 5000);

    let ack_before = last_acked + 4999;
    assert!(ack_before.diff(recover) < 0);

    let ack_at = last_acked + 5000;
    assert!(ack_at.diff(recover) >= 0);

    let ack_past = last_acked + 6000;
    assert!(ack_past > recover);
}

#[test]
fn seq_display_shows_raw_value() {
    assert_eq!(format!("{}", SeqNum(42)), "42");
    assert_eq!(format!("{}", SeqNum(u32::MAX)), u32::MAX.to_string());
}

#[test]
#[should_panic]
#[cfg(debug_assertions)]
fn seq_ordering_half_space_apart_asserts_in_debug() {
    // Exactly 2^31 apart: ordering is undefined by contract.
    let _ = SeqNum(0).diff(SeqNum(1 << 31));
}

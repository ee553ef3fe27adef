use crate::sim::SimTime;
use crate::tcp::cong::NullAckHost;
use crate::tcp::{CaEvent, CongState, CongestionOps, Cubic, EcnState, SeqNum};

fn tcb(cwnd: u32, ssthresh: u32, seg: u32) -> CongState {
    CongState::new(cwnd, ssthresh, seg, SeqNum::ZERO)
}

#[test]
fn cubic_ss_thresh_uses_beta_point_seven() {
    let mut cc = Cubic::new();
    let state = tcb(1000, 1000, 1);
    assert_eq!(cc.ss_thresh(&state, 100), 700);
}

#[test]
fn cubic_abe_with_ecn_signal_uses_beta_point_85() {
    let mut cc = Cubic::with_abe(true);
    let mut state = tcb(1000, 1000, 1);
    state.ecn_state = EcnState::EceRcvd;
    assert_eq!(cc.ss_thresh(&state, 100), 850);

    // Loss-driven reduction keeps the cubic beta even under ABE.
    state.ecn_state = EcnState::Idle;
    assert_eq!(cc.ss_thresh(&state, 100), 700);
}

#[test]
fn cubic_slow_start_matches_reno_growth() {
    let seg = 1000;
    let mut cc = Cubic::new();
    let mut state = tcb(2 * seg, 64 * seg, seg);

    cc.increase_window(&mut state, 2, SimTime::ZERO);
    assert_eq!(state.cwnd, 4 * seg);
    cc.increase_window(&mut state, 4, SimTime::from_micros(10));
    assert_eq!(state.cwnd, 8 * seg);
}

#[test]
fn cubic_grows_in_congestion_avoidance_over_time() {
    let seg = 1000;
    let mut cc = Cubic::new();
    let mut state = tcb(10 * seg, 5 * seg, seg); // congestion avoidance

    let mut now = SimTime::ZERO;
    let before = state.cwnd;
    // Drive one simulated second of acks, 10 per "RTT" of 10 ms.
    for _ in 0..100 {
        now = now.saturating_add(SimTime::from_millis(10));
        cc.increase_window(&mut state, 10, now);
    }
    assert!(
        state.cwnd > before,
        "cubic must grow past the plateau over time: {} vs {}",
        state.cwnd,
        before
    );
}

#[test]
fn cubic_reduction_sets_plateau_from_current_window() {
    let seg = 1000;
    let mut cc = Cubic::new();
    let mut state = tcb(20 * seg, 40 * seg, seg);

    let ss = cc.ss_thresh(&state, 10 * seg);
    assert_eq!(ss, (20 * seg as u64 * 7 / 10) as u32);
    state.ssthresh = ss;
    state.cwnd = ss;

    // After the reduction the window climbs back toward the old
    // plateau (w_max = 20 segments) rather than shooting past it.
    let mut now = SimTime::ZERO;
    for _ in 0..50 {
        now = now.saturating_add(SimTime::from_millis(10));
        cc.increase_window(&mut state, 14, now);
    }
    assert!(state.cwnd > ss);
}

#[test]
fn cubic_loss_event_resets_the_epoch() {
    let seg = 1000;
    let mut cc = Cubic::new();
    let mut state = tcb(10 * seg, 5 * seg, seg);

    let mut now = SimTime::from_millis(100);
    cc.increase_window(&mut state, 10, now);

    cc.cwnd_event(&mut state, CaEvent::Loss, &mut NullAckHost);

    // Growth restarts from a fresh epoch without panicking or jumping.
    now = now.saturating_add(SimTime::from_millis(10));
    let before = state.cwnd;
    cc.increase_window(&mut state, 10, now);
    assert!(state.cwnd >= before);
}

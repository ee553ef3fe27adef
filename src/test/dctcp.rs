use crate::sim::SimTime;
use crate::tcp::{
    AckHost, CaEvent, CongState, CongestionOps, Dctcp, EcnMode, EcnState, EctCodepoint, LinuxReno,
    SeqNum, TcpConfigError,
};

fn tcb(cwnd: u32, ssthresh: u32, seg: u32) -> CongState {
    CongState::new(cwnd, ssthresh, seg, SeqNum::ZERO)
}

fn dctcp() -> Dctcp {
    Dctcp::new(1.0 / 16.0, 1.0, true)
}

/// Records every empty ACK the strategy asks for, with the receive
/// pointer in effect at the time of the call.
#[derive(Default)]
struct RecordingHost {
    acks: Vec<(u32, bool)>,
}

impl AckHost for RecordingHost {
    fn send_empty_ack(&mut self, state: &CongState, ece: bool) {
        self.acks.push((state.rx_next.0, ece));
    }
}

#[test]
fn dctcp_init_forces_ecn_mode_and_ect_codepoint() {
    let mut cc = Dctcp::new(0.0625, 1.0, true);
    let mut state = tcb(1000, 2000, 500);
    cc.init(&mut state);
    assert_eq!(state.use_ecn, EcnMode::Dctcp);
    assert_eq!(state.ect, EctCodepoint::Ect0);

    let mut cc = Dctcp::new(0.0625, 1.0, false);
    let mut state = tcb(1000, 2000, 500);
    cc.init(&mut state);
    assert_eq!(state.ect, EctCodepoint::Ect1);
}

#[test]
fn dctcp_alpha_override_fails_after_init() {
    let mut cc = dctcp();
    assert!(cc.set_alpha_on_init(0.5).is_ok());
    assert_eq!(cc.alpha(), 0.5);

    let mut state = tcb(1000, 2000, 500);
    cc.init(&mut state);
    assert_eq!(
        cc.set_alpha_on_init(0.25),
        Err(TcpConfigError::AlreadyInitialized)
    );
    assert_eq!(cc.alpha(), 0.5);
}

#[test]
fn dctcp_alpha_override_rejects_out_of_range() {
    let mut cc = dctcp();
    assert!(matches!(
        cc.set_alpha_on_init(1.5),
        Err(TcpConfigError::OutOfRange { .. })
    ));
}

#[test]
fn dctcp_ss_thresh_truncates_toward_zero() {
    // alpha = 1.0: full DCTCP backoff is half the window.
    let mut cc = dctcp();
    let state = tcb(1000, 2000, 1);
    assert_eq!(cc.ss_thresh(&state, 400), 500);

    // alpha = 0.0: no reduction at all.
    let mut cc = Dctcp::new(0.0625, 0.0, true);
    assert_eq!(cc.ss_thresh(&state, 400), 1000);

    // Odd window exercises the truncating cast: 0.75 * 1001 = 750.75.
    let mut cc = Dctcp::new(0.0625, 0.5, true);
    let state = tcb(1001, 2000, 1);
    assert_eq!(cc.ss_thresh(&state, 400), 750);
}

#[test]
fn dctcp_ss_thresh_ignores_bytes_in_flight() {
    let mut cc = dctcp();
    let state = tcb(1000, 2000, 1);
    let a = cc.ss_thresh(&state, 0);
    let b = cc.ss_thresh(&state, 10_000);
    assert_eq!(a, b);
}

#[test]
fn dctcp_matches_reno_window_growth_in_slow_start() {
    let seg = 500;
    let mut reno = LinuxReno::new();
    let mut dctcp_cc = dctcp();

    let mut a = tcb(2 * seg, 100 * seg, seg);
    let mut b = a.clone();

    for acked in [1_u32, 2, 1, 3, 2, 2, 1] {
        reno.increase_window(&mut a, acked, SimTime::ZERO);
        dctcp_cc.increase_window(&mut b, acked, SimTime::ZERO);
        assert!(a.in_slow_start());
        assert_eq!(a.cwnd, b.cwnd);
    }
}

#[test]
fn dctcp_alpha_tracks_marked_fraction_per_observation_window() {
    let g = 1.0 / 16.0;
    let seg = 100;
    let mut cc = Dctcp::new(g, 1.0, true);
    let mut state = tcb(10 * seg, 100 * seg, seg);
    cc.init(&mut state);

    // Lock the observation window at the current send edge.
    state.next_tx_seq = SeqNum(1000);
    state.ecn_state = EcnState::Idle;
    cc.pkts_acked(&mut state, 5, SimTime::from_micros(50)); // 500 unmarked bytes

    state.ecn_state = EcnState::EceRcvd;
    cc.pkts_acked(&mut state, 5, SimTime::from_micros(50)); // 500 marked bytes

    // Ack reaches the window edge: half the window was marked.
    state.last_acked_seq = SeqNum(1000);
    state.ecn_state = EcnState::Idle;
    cc.pkts_acked(&mut state, 0, SimTime::from_micros(50));

    let expected = (1.0 - g) * 1.0 + g * 0.5;
    assert!((cc.alpha() - expected).abs() < 1e-12);

    let est = cc.take_estimate().expect("window closed");
    assert!((est.ecn_ratio - 0.5).abs() < 1e-12);
    assert!(cc.take_estimate().is_none(), "estimate is taken once");
}

#[test]
fn dctcp_alpha_stays_within_unit_interval() {
    let g = 0.3;
    let seg = 100;
    let mut cc = Dctcp::new(g, 1.0, true);
    let mut state = tcb(10 * seg, 100 * seg, seg);
    cc.init(&mut state);

    // Alternate fully-marked and unmarked windows for a while.
    let mut edge = 0_u32;
    for round in 0..100 {
        edge += 1000;
        state.next_tx_seq = SeqNum(edge);
        state.ecn_state = if round % 2 == 0 {
            EcnState::EceRcvd
        } else {
            EcnState::Idle
        };
        cc.pkts_acked(&mut state, 10, SimTime::from_micros(50));
        state.last_acked_seq = SeqNum(edge);
        cc.pkts_acked(&mut state, 0, SimTime::from_micros(50));

        let alpha = cc.alpha();
        assert!((0.0..=1.0).contains(&alpha), "alpha out of bounds: {alpha}");
    }
}

#[test]
fn dctcp_empty_observation_window_counts_as_unmarked() {
    let g = 0.5;
    let seg = 100;
    let mut cc = Dctcp::new(g, 1.0, true);
    let mut state = tcb(10 * seg, 100 * seg, seg);
    cc.init(&mut state);

    // Window closes with zero acked bytes: ratio must default to 0,
    // not divide by zero.
    state.next_tx_seq = SeqNum(500);
    cc.pkts_acked(&mut state, 0, SimTime::ZERO);
    state.last_acked_seq = SeqNum(500);
    cc.pkts_acked(&mut state, 0, SimTime::ZERO);

    assert!((cc.alpha() - 0.5).abs() < 1e-12);
}

#[test]
fn dctcp_ce_transitions_emit_retroactive_acks_with_delayed_ack_pending() {
    let mut cc = dctcp();
    let mut state = tcb(1000, 2000, 500);
    cc.init(&mut state);
    let mut host = RecordingHost::default();

    // A delayed ACK is outstanding.
    cc.cwnd_event(&mut state, CaEvent::DelayedAck, &mut host);

    // First CE mark: no prior pointer yet, so no retroactive ACK.
    state.rx_next = SeqNum(1000);
    cc.cwnd_event(&mut state, CaEvent::EcnIsCe, &mut host);
    assert!(host.acks.is_empty());
    assert_eq!(state.ecn_state, EcnState::EceRcvd);

    // CE goes away after more data: the data received while CE was
    // set is acked retroactively WITH ECE, from the prior pointer.
    state.rx_next = SeqNum(2000);
    cc.cwnd_event(&mut state, CaEvent::EcnNoCe, &mut host);
    assert_eq!(host.acks, vec![(1000, true)]);
    assert_eq!(state.rx_next, SeqNum(2000), "pointer restored");
    assert_eq!(state.ecn_state, EcnState::Idle);

    // CE comes back: the pre-CE data is acked WITHOUT ECE.
    state.rx_next = SeqNum(3000);
    cc.cwnd_event(&mut state, CaEvent::EcnIsCe, &mut host);
    assert_eq!(host.acks, vec![(1000, true), (2000, false)]);
    assert_eq!(state.rx_next, SeqNum(3000), "pointer restored");
    assert_eq!(state.ecn_state, EcnState::EceRcvd);
}

#[test]
fn dctcp_ce_transitions_skip_retroactive_ack_without_delayed_ack() {
    let mut cc = dctcp();
    let mut state = tcb(1000, 2000, 500);
    cc.init(&mut state);
    let mut host = RecordingHost::default();

    state.rx_next = SeqNum(1000);
    cc.cwnd_event(&mut state, CaEvent::EcnIsCe, &mut host);
    state.rx_next = SeqNum(2000);
    // No DelayedAck event was reported, so transitions stay silent.
    cc.cwnd_event(&mut state, CaEvent::EcnNoCe, &mut host);
    state.rx_next = SeqNum(3000);
    cc.cwnd_event(&mut state, CaEvent::EcnIsCe, &mut host);

    assert!(host.acks.is_empty());
}

#[test]
fn dctcp_non_delayed_ack_clears_the_pending_flag() {
    let mut cc = dctcp();
    let mut state = tcb(1000, 2000, 500);
    cc.init(&mut state);
    let mut host = RecordingHost::default();

    cc.cwnd_event(&mut state, CaEvent::DelayedAck, &mut host);
    cc.cwnd_event(&mut state, CaEvent::NonDelayedAck, &mut host);

    state.rx_next = SeqNum(1000);
    cc.cwnd_event(&mut state, CaEvent::EcnIsCe, &mut host);
    state.rx_next = SeqNum(2000);
    cc.cwnd_event(&mut state, CaEvent::EcnNoCe, &mut host);

    assert!(host.acks.is_empty(), "flag was cleared before the flip");
}

#[test]
fn dctcp_fork_copies_alpha_and_estimator_state() {
    let mut cc = Dctcp::new(0.25, 0.8, true);
    let copy = cc.fork();
    assert_eq!(copy.congestion_estimate(), Some(0.8));
    assert_eq!(cc.set_alpha_on_init(0.2), Ok(()));
    assert_eq!(copy.congestion_estimate(), Some(0.8), "deep copy");
}

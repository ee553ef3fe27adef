use crate::net::NetWorld;
use crate::sim::{SimTime, Simulator};
use crate::tcp::{CcAlgo, TcpConfig, TcpConn};
use crate::viz::{VizEventKind, VizLogger};

fn dctcp_cfg(mss: u32) -> TcpConfig {
    TcpConfig {
        mss,
        init_cwnd_bytes: 10 * mss,
        init_ssthresh_bytes: 1000 * mss,
        init_rto: SimTime::from_micros(200),
        min_rto: SimTime::from_micros(200),
        max_rto: SimTime::from_millis(200),
        delayed_ack_count: 2,
        cc: CcAlgo::Dctcp,
        ..TcpConfig::default()
    }
}

#[test]
fn dctcp_emits_congestion_estimate_when_link_marks_ce() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();

    let h0 = world.net.add_host("h0");
    let h1 = world.net.add_host("h1");
    let latency = SimTime::from_micros(1);
    let bw = 100_u64 * 1_000_000_000; // 100Gbps

    // Bidirectional connectivity for data + ACKs.
    world.net.connect(h0, h1, latency, bw);
    world.net.connect(h1, h0, latency, bw);

    // Mark every ECT packet as CE on the forward link.
    world.net.set_link_ecn_threshold_bytes(h0, h1, 1);

    world.net.viz = Some(VizLogger::default());

    let cfg = dctcp_cfg(1460);
    let init_cwnd = cfg.init_cwnd_bytes;
    let total_bytes = (init_cwnd as u64).saturating_mul(4);
    let mut conn =
        TcpConn::new(1, h0, h1, vec![h0, h1], total_bytes, cfg).expect("valid config");
    conn.enable_cwnd_log();

    let mut tcp = std::mem::take(&mut world.net.tcp);
    tcp.start_conn(conn, &mut sim, &mut world.net);
    world.net.tcp = tcp;

    sim.run(&mut world);

    let conn = world.net.tcp.get(1).expect("tcp conn missing");
    assert!(conn.is_done(), "dctcp transfer did not complete");
    assert_eq!(conn.bytes_acked(), total_bytes);
    assert!(world.net.stats.ce_marked_pkts > 0, "link never marked CE");

    // With every packet marked, the congestion estimate converges high.
    let alpha = conn.alpha().expect("dctcp exposes alpha");
    assert!(alpha > 0.5, "alpha should converge toward 1, got {alpha}");

    let v = world.net.viz.as_ref().expect("viz enabled");
    let mut saw_estimate = false;
    for ev in &v.events {
        if let VizEventKind::CongEstimate {
            alpha, ecn_ratio, ..
        } = &ev.kind
        {
            saw_estimate = true;
            assert!((0.0..=1.0).contains(alpha));
            assert!((0.0..=1.0).contains(ecn_ratio));
        }
    }
    assert!(saw_estimate, "expected at least one congestion estimate");

    // Receiver echoes arrived: some acks carried ECE.
    let echoed = v.events.iter().any(|ev| {
        matches!(&ev.kind, VizEventKind::TcpSendAck(t) if t.ecn_echo == Some(true))
    });
    assert!(echoed, "dctcp receiver never echoed CE");

    let samples = conn.cwnd_samples().expect("cwnd log enabled");
    assert!(!samples.is_empty());
    assert!(samples.iter().all(|s| s.alpha.is_some()));
}

#[test]
fn dctcp_control_segments_carry_ect_and_data_is_marked() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();

    let h0 = world.net.add_host("h0");
    let h1 = world.net.add_host("h1");
    let latency = SimTime::from_micros(1);
    let bw = 100_u64 * 1_000_000_000;
    world.net.connect(h0, h1, latency, bw);
    world.net.connect(h1, h0, latency, bw);
    world.net.viz = Some(VizLogger::default());

    let cfg = dctcp_cfg(1000);
    let total_bytes = 20_000_u64;
    let conn = TcpConn::new(1, h0, h1, vec![h0, h1], total_bytes, cfg).expect("valid config");
    let mut tcp = std::mem::take(&mut world.net.tcp);
    tcp.start_conn(conn, &mut sim, &mut world.net);
    world.net.tcp = tcp;

    sim.run(&mut world);

    let conn = world.net.tcp.get(1).expect("tcp conn missing");
    assert!(conn.is_done());

    // Every data segment went out ECT-marked (no marking threshold, so
    // nothing is a retransmission here).
    let v = world.net.viz.as_ref().expect("viz enabled");
    let mut data_count = 0;
    for ev in &v.events {
        if let VizEventKind::TcpSendData(t) = &ev.kind {
            data_count += 1;
            assert_eq!(t.ect, Some(true), "dctcp data must carry ECT");
        }
    }
    assert_eq!(data_count, 20, "one send per segment");
}

#[test]
fn dctcp_without_marking_keeps_alpha_decaying_from_init() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();

    let h0 = world.net.add_host("h0");
    let h1 = world.net.add_host("h1");
    let latency = SimTime::from_micros(1);
    let bw = 100_u64 * 1_000_000_000;
    world.net.connect(h0, h1, latency, bw);
    world.net.connect(h1, h0, latency, bw);

    // No ECN threshold: clean path, no CE marks.
    let cfg = dctcp_cfg(1460);
    let total_bytes = (cfg.init_cwnd_bytes as u64).saturating_mul(8);
    let conn = TcpConn::new(1, h0, h1, vec![h0, h1], total_bytes, cfg).expect("valid config");
    let mut tcp = std::mem::take(&mut world.net.tcp);
    tcp.start_conn(conn, &mut sim, &mut world.net);
    world.net.tcp = tcp;

    sim.run(&mut world);

    let conn = world.net.tcp.get(1).expect("tcp conn missing");
    assert!(conn.is_done());
    assert_eq!(world.net.stats.ce_marked_pkts, 0);

    // Alpha starts at 1.0 and decays with every unmarked window.
    let alpha = conn.alpha().expect("dctcp exposes alpha");
    assert!(alpha < 1.0, "alpha must decay on a clean path, got {alpha}");
}

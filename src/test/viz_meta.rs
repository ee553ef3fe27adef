use crate::net::NetWorld;
use crate::sim::SimTime;
use crate::viz::{VizEventKind, VizLogger, VizNodeKind};
use std::collections::HashMap;

#[test]
fn viz_meta_includes_nodes_links_and_queue_caps() {
    let mut world = NetWorld::default();
    let h0 = world.net.add_host("h0");
    let h1 = world.net.add_host("h1");

    let latency = SimTime::from_micros(2);
    let bw = 10_u64 * 1_000_000_000;

    world.net.connect(h0, h1, latency, bw);
    world.net.connect(h1, h0, latency, bw);
    world.net.set_link_queue_capacity_bytes(h0, h1, 111);
    world.net.set_link_queue_capacity_bytes(h1, h0, 222);

    world.net.viz = Some(VizLogger::default());
    world.net.emit_viz_meta();

    let events = &world.net.viz.as_ref().expect("viz enabled").events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].t_ns, 0);

    let (nodes, links) = match &events[0].kind {
        VizEventKind::Meta { nodes, links } => (nodes, links),
        _ => panic!("expected Meta event"),
    };

    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].id, h0.0);
    assert_eq!(nodes[0].name, "h0");
    assert!(matches!(nodes[0].kind, VizNodeKind::Host));
    assert_eq!(nodes[1].id, h1.0);
    assert_eq!(nodes[1].name, "h1");
    assert!(matches!(nodes[1].kind, VizNodeKind::Host));

    let by_pair = links
        .iter()
        .map(|l| ((l.from, l.to), l))
        .collect::<HashMap<_, _>>();
    let l01 = by_pair.get(&(h0.0, h1.0)).expect("missing h0->h1");
    assert_eq!(l01.bandwidth_bps, bw);
    assert_eq!(l01.latency_ns, latency.0);
    assert_eq!(l01.q_cap_bytes, 111);

    let l10 = by_pair.get(&(h1.0, h0.0)).expect("missing h1->h0");
    assert_eq!(l10.bandwidth_bps, bw);
    assert_eq!(l10.latency_ns, latency.0);
    assert_eq!(l10.q_cap_bytes, 222);
}

#[test]
fn viz_meta_distinguishes_hosts_from_switches() {
    let mut world = NetWorld::default();
    let h0 = world.net.add_host("h0");
    let s0 = world.net.add_switch("s0");
    let h1 = world.net.add_host("h1");

    let latency = SimTime::from_micros(1);
    let bw = 100_u64 * 1_000_000_000;
    world.net.connect(h0, s0, latency, bw);
    world.net.connect(s0, h1, latency, bw);

    world.net.viz = Some(VizLogger::default());
    world.net.emit_viz_meta();

    let events = &world.net.viz.as_ref().expect("viz enabled").events;
    let nodes = match &events[0].kind {
        VizEventKind::Meta { nodes, .. } => nodes,
        _ => panic!("expected Meta event"),
    };

    let kinds: HashMap<usize, VizNodeKind> =
        nodes.iter().map(|n| (n.id, n.kind)).collect();
    assert!(matches!(kinds[&h0.0], VizNodeKind::Host));
    assert!(matches!(kinds[&s0.0], VizNodeKind::Switch));
    assert!(matches!(kinds[&h1.0], VizNodeKind::Host));
}

use crate::net::{Ecn, Network, NodeId, TcpSegment, Transport};
use crate::tcp::SeqNum;

fn route_pkt(size_bytes: u32, route: Vec<NodeId>) -> crate::net::Packet {
    let mut net = Network::default();
    // Node ids in the route are only labels here; make_packet does not
    // validate them against the topology.
    net.make_packet(10, size_bytes, route)
}

#[test]
fn packet_route_walk_advances_hop_by_hop() {
    let route = vec![NodeId(1), NodeId(2), NodeId(3)];
    let mut pkt = route_pkt(100, route);
    assert_eq!(pkt.src(), NodeId(1));
    assert_eq!(pkt.dst(), NodeId(3));
    assert_eq!(pkt.at(), NodeId(1));
    assert_eq!(pkt.next(), Some(NodeId(2)));
    assert!(pkt.has_next());

    pkt = pkt.advance();
    assert_eq!(pkt.at(), NodeId(2));
    assert_eq!(pkt.next(), Some(NodeId(3)));

    pkt = pkt.advance();
    assert_eq!(pkt.at(), NodeId(3));
    assert_eq!(pkt.next(), None);
    assert!(!pkt.has_next());
}

#[test]
fn packet_ids_are_unique_per_network() {
    let mut net = Network::default();
    let a = net.make_packet(1, 100, vec![NodeId(0), NodeId(1)]);
    let b = net.make_packet(1, 100, vec![NodeId(0), NodeId(1)]);
    assert_ne!(a.id, b.id);
}

#[test]
fn ecn_codepoint_bits_round_trip() {
    for ecn in [Ecn::NotEct, Ecn::Ect1, Ecn::Ect0, Ecn::Ce] {
        assert_eq!(Ecn::from_bits(ecn.bits()), ecn);
    }
    assert_eq!(Ecn::NotEct.bits(), 0b00);
    assert_eq!(Ecn::Ect1.bits(), 0b01);
    assert_eq!(Ecn::Ect0.bits(), 0b10);
    assert_eq!(Ecn::Ce.bits(), 0b11);
    // Only the low two bits matter.
    assert_eq!(Ecn::from_bits(0b111), Ecn::Ce);
}

#[test]
fn ecn_helpers_match_expected_states() {
    assert!(Ecn::Ect0.is_ect());
    assert!(Ecn::Ect1.is_ect());
    assert!(!Ecn::NotEct.is_ect());
    assert!(!Ecn::Ce.is_ect());

    assert!(Ecn::Ce.is_ce());
    assert!(!Ecn::NotEct.is_ce());
    assert!(!Ecn::Ect0.is_ce());
}

#[test]
fn packet_mark_ce_if_ect_only_marks_ect_packets() {
    let mut pkt = route_pkt(100, vec![NodeId(0), NodeId(1)]);

    pkt.ecn = Ecn::NotEct;
    assert!(!pkt.mark_ce_if_ect());
    assert_eq!(pkt.ecn, Ecn::NotEct);

    pkt.ecn = Ecn::Ect0;
    assert!(pkt.mark_ce_if_ect());
    assert_eq!(pkt.ecn, Ecn::Ce);

    pkt.ecn = Ecn::Ect1;
    assert!(pkt.mark_ce_if_ect());
    assert_eq!(pkt.ecn, Ecn::Ce);

    // Already CE: stays CE, reports no fresh mark.
    assert!(!pkt.mark_ce_if_ect());
    assert_eq!(pkt.ecn, Ecn::Ce);
}

#[test]
fn packet_transport_tag_defaults_to_none_and_is_mutable() {
    let mut pkt = route_pkt(100, vec![NodeId(0), NodeId(1)]);
    match pkt.transport {
        Transport::None => {}
        _ => panic!("expected Transport::None"),
    }

    pkt.transport = Transport::Tcp(TcpSegment::Ack {
        ack: SeqNum(123),
        ece: true,
    });
    match pkt.transport {
        Transport::Tcp(TcpSegment::Ack { ack, ece }) => {
            assert_eq!(ack, SeqNum(123));
            assert!(ece);
        }
        _ => panic!("expected Transport::Tcp Ack"),
    }
}

#[test]
fn tcp_segment_is_data_distinguishes_payload_from_control() {
    assert!(TcpSegment::Data {
        seq: SeqNum(0),
        len: 100,
        cwr: false
    }
    .is_data());
    assert!(!TcpSegment::Syn {
        ece: true,
        cwr: true
    }
    .is_data());
    assert!(!TcpSegment::Ack {
        ack: SeqNum(0),
        ece: false
    }
    .is_data());
}

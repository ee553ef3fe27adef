//! Network-facing API used by the TCP stack.

use crate::sim::Simulator;

use super::{NodeId, Packet};

/// Minimal network API for protocol stacks.
///
/// The stack builds packets, hands them to the network, and reports
/// observable protocol events (sends, ACKs, cwnd samples, ECN state moves,
/// rate samples) for the optional trace log. It never touches links or
/// queues directly.
pub trait NetApi {
    fn make_packet(&mut self, flow_id: u64, size_bytes: u32, route: Vec<NodeId>) -> Packet;
    fn forward_from(&mut self, from: NodeId, pkt: Packet, sim: &mut Simulator);

    fn viz_tcp_send_data(
        &mut self,
        t_ns: u64,
        conn_id: u64,
        seq: u32,
        len: u32,
        retrans: bool,
        ect: bool,
    );
    fn viz_tcp_send_ack(&mut self, t_ns: u64, conn_id: u64, ack: u32, ecn_echo: bool);
    fn viz_tcp_recv_ack(&mut self, t_ns: u64, conn_id: u64, ack: u32, ecn_echo: bool);
    fn viz_tcp_rto(&mut self, t_ns: u64, conn_id: u64, seq: u32);
    fn viz_cwnd(
        &mut self,
        t_ns: u64,
        conn_id: u64,
        cwnd_bytes: u64,
        ssthresh_bytes: u64,
        inflight_bytes: u64,
        phase: &'static str,
        alpha: Option<f64>,
    );
    fn viz_ecn_state(&mut self, t_ns: u64, conn_id: u64, role: &'static str, state: &'static str);
    fn viz_cong_estimate(&mut self, t_ns: u64, conn_id: u64, alpha: f64, ecn_ratio: f64);
    fn viz_rate_sample(
        &mut self,
        t_ns: u64,
        conn_id: u64,
        rate_bps: u64,
        interval_ns: u64,
        delivered_bytes: i64,
        app_limited: bool,
    );
}

impl NetApi for super::Network {
    fn make_packet(&mut self, flow_id: u64, size_bytes: u32, route: Vec<NodeId>) -> Packet {
        super::Network::make_packet(self, flow_id, size_bytes, route)
    }

    fn forward_from(&mut self, from: NodeId, pkt: Packet, sim: &mut Simulator) {
        super::Network::forward_from(self, from, pkt, sim)
    }

    fn viz_tcp_send_data(
        &mut self,
        t_ns: u64,
        conn_id: u64,
        seq: u32,
        len: u32,
        retrans: bool,
        ect: bool,
    ) {
        self.viz_tcp_send_data(t_ns, conn_id, seq, len, retrans, ect)
    }

    fn viz_tcp_send_ack(&mut self, t_ns: u64, conn_id: u64, ack: u32, ecn_echo: bool) {
        self.viz_tcp_send_ack(t_ns, conn_id, ack, ecn_echo)
    }

    fn viz_tcp_recv_ack(&mut self, t_ns: u64, conn_id: u64, ack: u32, ecn_echo: bool) {
        self.viz_tcp_recv_ack(t_ns, conn_id, ack, ecn_echo)
    }

    fn viz_tcp_rto(&mut self, t_ns: u64, conn_id: u64, seq: u32) {
        self.viz_tcp_rto(t_ns, conn_id, seq)
    }

    fn viz_cwnd(
        &mut self,
        t_ns: u64,
        conn_id: u64,
        cwnd_bytes: u64,
        ssthresh_bytes: u64,
        inflight_bytes: u64,
        phase: &'static str,
        alpha: Option<f64>,
    ) {
        self.viz_cwnd(
            t_ns,
            conn_id,
            cwnd_bytes,
            ssthresh_bytes,
            inflight_bytes,
            phase,
            alpha,
        )
    }

    fn viz_ecn_state(&mut self, t_ns: u64, conn_id: u64, role: &'static str, state: &'static str) {
        self.viz_ecn_state(t_ns, conn_id, role, state)
    }

    fn viz_cong_estimate(&mut self, t_ns: u64, conn_id: u64, alpha: f64, ecn_ratio: f64) {
        self.viz_cong_estimate(t_ns, conn_id, alpha, ecn_ratio)
    }

    fn viz_rate_sample(
        &mut self,
        t_ns: u64,
        conn_id: u64,
        rate_bps: u64,
        interval_ns: u64,
        delivered_bytes: i64,
        app_limited: bool,
    ) {
        self.viz_rate_sample(
            t_ns,
            conn_id,
            rate_bps,
            interval_ns,
            delivered_bytes,
            app_limited,
        )
    }
}

//! Visualization hooks for the network.

use crate::sim::SimTime;
use crate::viz::{
    VizEvent, VizEventKind, VizLinkInfo, VizNodeInfo, VizNodeKind, VizPacketKind, VizTcp,
};

use super::node::NodeKind;
use super::{Network, NodeId, Packet, TcpSegment, Transport};

impl Network {
    pub(crate) fn pkt_kind(pkt: &Packet) -> VizPacketKind {
        match &pkt.transport {
            Transport::Tcp(TcpSegment::Data { .. }) => VizPacketKind::Data,
            Transport::Tcp(_) => VizPacketKind::Ack,
            _ => VizPacketKind::Other,
        }
    }

    fn viz_push(&mut self, ev: VizEvent) {
        if let Some(v) = &mut self.viz {
            v.push(ev);
        }
    }

    pub fn emit_viz_meta(&mut self) {
        if self.viz.is_none() {
            return;
        }
        let nodes = (0..self.node_count())
            .map(|id| VizNodeInfo {
                id,
                name: self.node_name(NodeId(id)),
                kind: match self.node_kind(NodeId(id)) {
                    NodeKind::Host => VizNodeKind::Host,
                    NodeKind::Switch => VizNodeKind::Switch,
                },
            })
            .collect::<Vec<_>>();
        let links = self
            .links_iter()
            .map(|l| VizLinkInfo {
                from: l.from.0,
                to: l.to.0,
                bandwidth_bps: l.bandwidth_bps,
                latency_ns: l.latency.0,
                q_cap_bytes: l.queue.capacity_bytes(),
            })
            .collect::<Vec<_>>();
        self.viz_push(VizEvent {
            t_ns: 0,
            pkt_id: None,
            flow_id: None,
            pkt_bytes: None,
            pkt_kind: None,
            kind: VizEventKind::Meta { nodes, links },
        });
    }

    pub(crate) fn viz_enqueue(
        &mut self,
        now: SimTime,
        pkt_id: u64,
        flow_id: u64,
        pkt_bytes: u32,
        from: NodeId,
        to: NodeId,
        q_bytes: u64,
        q_cap_bytes: u64,
    ) {
        self.viz_push(VizEvent {
            t_ns: now.0,
            pkt_id: Some(pkt_id),
            flow_id: Some(flow_id),
            pkt_bytes: Some(pkt_bytes),
            pkt_kind: None,
            kind: VizEventKind::Enqueue {
                link_from: from.0,
                link_to: to.0,
                q_bytes,
                q_cap_bytes,
            },
        });
    }

    pub(crate) fn viz_tx_start(
        &mut self,
        now: SimTime,
        pkt: &Packet,
        from: NodeId,
        to: NodeId,
        depart: SimTime,
        arrive: SimTime,
    ) {
        let kind = Self::pkt_kind(pkt);
        self.viz_push(VizEvent {
            t_ns: now.0,
            pkt_id: Some(pkt.id),
            flow_id: Some(pkt.flow_id),
            pkt_bytes: Some(pkt.size_bytes),
            pkt_kind: Some(kind),
            kind: VizEventKind::TxStart {
                link_from: from.0,
                link_to: to.0,
                depart_ns: depart.0,
                arrive_ns: arrive.0,
            },
        });
    }

    pub(crate) fn viz_delivered(&mut self, now: SimTime, pkt: &Packet, at: NodeId) {
        let kind = Self::pkt_kind(pkt);
        self.viz_push(VizEvent {
            t_ns: now.0,
            pkt_id: Some(pkt.id),
            flow_id: Some(pkt.flow_id),
            pkt_bytes: Some(pkt.size_bytes),
            pkt_kind: Some(kind),
            kind: VizEventKind::Delivered { node: at.0 },
        });
    }

    pub(crate) fn viz_drop(
        &mut self,
        now: SimTime,
        pkt: &Packet,
        from: NodeId,
        to: NodeId,
        q_bytes: u64,
        q_cap_bytes: u64,
    ) {
        let kind = Self::pkt_kind(pkt);
        self.viz_push(VizEvent {
            t_ns: now.0,
            pkt_id: Some(pkt.id),
            flow_id: Some(pkt.flow_id),
            pkt_bytes: Some(pkt.size_bytes),
            pkt_kind: Some(kind),
            kind: VizEventKind::Drop {
                link_from: from.0,
                link_to: to.0,
                q_bytes,
                q_cap_bytes,
            },
        });
    }

    pub(crate) fn viz_ce_mark(
        &mut self,
        now: SimTime,
        pkt_id: u64,
        flow_id: u64,
        from: NodeId,
        to: NodeId,
        q_bytes: u64,
    ) {
        self.viz_push(VizEvent {
            t_ns: now.0,
            pkt_id: Some(pkt_id),
            flow_id: Some(flow_id),
            pkt_bytes: None,
            pkt_kind: None,
            kind: VizEventKind::CeMark {
                link_from: from.0,
                link_to: to.0,
                q_bytes,
            },
        });
    }

    pub(crate) fn viz_tcp_send_data(
        &mut self,
        t_ns: u64,
        conn_id: u64,
        seq: u32,
        len: u32,
        retrans: bool,
        ect: bool,
    ) {
        let retrans = if retrans { Some(true) } else { None };
        self.viz_push(VizEvent {
            t_ns,
            pkt_id: None,
            flow_id: Some(conn_id),
            pkt_bytes: None,
            pkt_kind: Some(VizPacketKind::Data),
            kind: VizEventKind::TcpSendData(VizTcp {
                conn_id,
                seq: Some(seq),
                len: Some(len),
                ack: None,
                retrans,
                ecn_echo: None,
                ect: Some(ect),
            }),
        });
    }

    pub(crate) fn viz_tcp_send_ack(&mut self, t_ns: u64, conn_id: u64, ack: u32, ecn_echo: bool) {
        let ecn_echo = if ecn_echo { Some(true) } else { None };
        self.viz_push(VizEvent {
            t_ns,
            pkt_id: None,
            flow_id: Some(conn_id),
            pkt_bytes: None,
            pkt_kind: Some(VizPacketKind::Ack),
            kind: VizEventKind::TcpSendAck(VizTcp {
                conn_id,
                seq: None,
                len: None,
                ack: Some(ack),
                retrans: None,
                ecn_echo,
                ect: None,
            }),
        });
    }

    pub(crate) fn viz_tcp_recv_ack(&mut self, t_ns: u64, conn_id: u64, ack: u32, ecn_echo: bool) {
        let ecn_echo = if ecn_echo { Some(true) } else { None };
        self.viz_push(VizEvent {
            t_ns,
            pkt_id: None,
            flow_id: Some(conn_id),
            pkt_bytes: None,
            pkt_kind: Some(VizPacketKind::Ack),
            kind: VizEventKind::TcpRecvAck(VizTcp {
                conn_id,
                seq: None,
                len: None,
                ack: Some(ack),
                retrans: None,
                ecn_echo,
                ect: None,
            }),
        });
    }

    pub(crate) fn viz_tcp_rto(&mut self, t_ns: u64, conn_id: u64, seq: u32) {
        self.viz_push(VizEvent {
            t_ns,
            pkt_id: None,
            flow_id: Some(conn_id),
            pkt_bytes: None,
            pkt_kind: Some(VizPacketKind::Data),
            kind: VizEventKind::TcpRto(VizTcp {
                conn_id,
                seq: Some(seq),
                len: None,
                ack: None,
                retrans: None,
                ecn_echo: None,
                ect: None,
            }),
        });
    }

    pub(crate) fn viz_cwnd(
        &mut self,
        t_ns: u64,
        conn_id: u64,
        cwnd_bytes: u64,
        ssthresh_bytes: u64,
        inflight_bytes: u64,
        phase: &'static str,
        alpha: Option<f64>,
    ) {
        self.viz_push(VizEvent {
            t_ns,
            pkt_id: None,
            flow_id: Some(conn_id),
            pkt_bytes: None,
            pkt_kind: None,
            kind: VizEventKind::Cwnd {
                conn_id,
                cwnd_bytes,
                ssthresh_bytes,
                inflight_bytes,
                phase: phase.to_string(),
                alpha,
            },
        });
    }

    pub(crate) fn viz_ecn_state(
        &mut self,
        t_ns: u64,
        conn_id: u64,
        role: &'static str,
        state: &'static str,
    ) {
        self.viz_push(VizEvent {
            t_ns,
            pkt_id: None,
            flow_id: Some(conn_id),
            pkt_bytes: None,
            pkt_kind: None,
            kind: VizEventKind::EcnState {
                conn_id,
                role: role.to_string(),
                state: state.to_string(),
            },
        });
    }

    pub(crate) fn viz_cong_estimate(&mut self, t_ns: u64, conn_id: u64, alpha: f64, ecn_ratio: f64) {
        self.viz_push(VizEvent {
            t_ns,
            pkt_id: None,
            flow_id: Some(conn_id),
            pkt_bytes: None,
            pkt_kind: None,
            kind: VizEventKind::CongEstimate {
                conn_id,
                alpha,
                ecn_ratio,
            },
        });
    }

    pub(crate) fn viz_rate_sample(
        &mut self,
        t_ns: u64,
        conn_id: u64,
        rate_bps: u64,
        interval_ns: u64,
        delivered_bytes: i64,
        app_limited: bool,
    ) {
        self.viz_push(VizEvent {
            t_ns,
            pkt_id: None,
            flow_id: Some(conn_id),
            pkt_bytes: None,
            pkt_kind: None,
            kind: VizEventKind::RateSample {
                conn_id,
                rate_bps,
                interval_ns,
                delivered_bytes,
                app_limited,
            },
        });
    }
}

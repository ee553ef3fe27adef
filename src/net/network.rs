//! 网络拓扑管理
//!
//! 定义网络拓扑结构，包含节点、链路、数据包转发和统计信息。
//! 链路出口带队列：链路忙时包排队，由 `LinkReady` 事件驱动出队；
//! 队列深度越过 ECN 阈值时对 ECT 包做 CE 改写（DCTCP 风格的瞬时标记）。

use std::collections::HashMap;

use super::deliver_packet::DeliverPacket;
use super::id::{LinkId, NodeId};
use super::link::Link;
use super::link_ready::LinkReady;
use super::node::{Host, Node, NodeKind, Switch};
use super::packet::{Ecn, Packet};
use super::stats::Stats;
use crate::queue::DropTailQueue;
use crate::sim::{SimTime, Simulator};
use crate::tcp::TcpStack;
use crate::viz::VizLogger;
use tracing::{debug, trace};

/// 网络拓扑
#[derive(Default)]
pub struct Network {
    nodes: Vec<Option<Box<dyn Node>>>,
    kinds: Vec<NodeKind>,
    links: Vec<Link>,
    edges: HashMap<(NodeId, NodeId), LinkId>,
    next_pkt_id: u64,
    pub stats: Stats,
    /// TCP 协议栈（含各拥塞控制变体）。
    pub tcp: TcpStack,
    /// 可选的可视化/回放事件收集器。
    pub viz: Option<VizLogger>,
}

impl Network {
    /// 添加主机节点
    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Box::new(Host::new(id, name))));
        self.kinds.push(NodeKind::Host);
        id
    }

    /// 添加交换机节点
    pub fn add_switch(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Box::new(Switch::new(id, name))));
        self.kinds.push(NodeKind::Switch);
        id
    }

    /// 连接两个节点（创建单向链路）
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
    ) -> LinkId {
        let id = LinkId(self.links.len());
        self.links.push(Link::new(from, to, latency, bandwidth_bps));
        self.edges.insert((from, to), id);
        id
    }

    pub fn node_kind(&self, id: NodeId) -> NodeKind {
        self.kinds[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn links_iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    pub fn node_name(&self, id: NodeId) -> String {
        self.nodes[id.0]
            .as_ref()
            .map(|n| n.name().to_string())
            .unwrap_or_default()
    }

    /// 设置某条单向链路的队列容量（bytes）。
    pub fn set_link_queue_capacity_bytes(&mut self, from: NodeId, to: NodeId, bytes: u64) {
        let link_id = *self
            .edges
            .get(&(from, to))
            .unwrap_or_else(|| panic!("no link from {from:?} to {to:?}"));
        self.links[link_id.0].queue = Box::new(DropTailQueue::new(bytes));
    }

    /// 设置所有主机出口链路的队列容量（bytes），常用于制造小缓冲丢包场景。
    pub fn set_host_egress_queue_capacity_bytes(&mut self, bytes: u64) {
        for link in &mut self.links {
            if self.kinds[link.from.0] == NodeKind::Host {
                link.queue = Box::new(DropTailQueue::new(bytes));
            }
        }
    }

    /// 设置某条单向链路的 ECN 标记阈值（bytes）。
    pub fn set_link_ecn_threshold_bytes(&mut self, from: NodeId, to: NodeId, bytes: u64) {
        let link_id = *self
            .edges
            .get(&(from, to))
            .unwrap_or_else(|| panic!("no link from {from:?} to {to:?}"));
        self.links[link_id.0].ecn_threshold_bytes = Some(bytes);
    }

    /// 创建数据包
    pub fn make_packet(&mut self, flow_id: u64, size_bytes: u32, route: Vec<NodeId>) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet {
            id,
            flow_id,
            size_bytes,
            route,
            hop: 0,
            ecn: Ecn::NotEct,
            transport: Default::default(),
        }
    }

    /// 将数据包交付给节点处理
    #[tracing::instrument(skip(self, sim), fields(pkt_id = pkt.id, to = ?to))]
    pub fn deliver(&mut self, to: NodeId, pkt: Packet, sim: &mut Simulator) {
        // 暂时把节点取出来，避免 &mut self 与 &mut node 的重叠借用。
        let mut node = self.nodes[to.0].take().expect("node exists");
        trace!(node_name = %node.name(), "取出节点");

        node.on_packet(pkt, sim, self);

        self.nodes[to.0] = Some(node);
    }

    /// 从指定节点转发数据包：入队，必要时做 CE 标记，再尝试启动发送。
    #[tracing::instrument(skip(self, sim), fields(pkt_id = pkt.id, from = ?from, hop = pkt.hop))]
    pub fn forward_from(&mut self, from: NodeId, mut pkt: Packet, sim: &mut Simulator) {
        let to = pkt.next().expect("has_next checked by caller");
        let link_id = *self
            .edges
            .get(&(from, to))
            .unwrap_or_else(|| panic!("no link from {from:?} to {to:?}"));

        let now = sim.now();
        let link = &mut self.links[link_id.0];

        // ECN：入队后的瞬时队列深度达到阈值，且包带 ECT，则改写为 CE。
        let mut marked = false;
        if let Some(k) = link.ecn_threshold_bytes {
            let occupancy = link.queue.bytes().saturating_add(pkt.size_bytes as u64);
            if occupancy >= k {
                marked = pkt.mark_ce_if_ect();
            }
        }

        let pkt_id = pkt.id;
        let flow_id = pkt.flow_id;
        let size_bytes = pkt.size_bytes;
        let q_cap = link.queue.capacity_bytes();

        match link.queue.enqueue(pkt) {
            Ok(()) => {
                let q_bytes = self.links[link_id.0].queue.bytes();
                if marked {
                    self.stats.ce_marked_pkts += 1;
                    self.viz_ce_mark(now, pkt_id, flow_id, from, to, q_bytes);
                }
                self.viz_enqueue(now, pkt_id, flow_id, size_bytes, from, to, q_bytes, q_cap);
                debug!(q_bytes, marked, "包已入队");
            }
            Err(dropped) => {
                self.stats.dropped_pkts += 1;
                let q_bytes = self.links[link_id.0].queue.bytes();
                self.viz_drop(now, &dropped, from, to, q_bytes, q_cap);
                debug!(q_bytes, "队列已满，丢弃");
                return;
            }
        }

        self.try_transmit(link_id, sim);
    }

    /// 若链路空闲且队列非空，取出队首并开始序列化发送。
    fn try_transmit(&mut self, link_id: LinkId, sim: &mut Simulator) {
        let now = sim.now();
        let link = &mut self.links[link_id.0];
        if link.busy_until > now {
            return; // LinkReady 事件会在 depart 时刻继续驱动
        }
        let Some(pkt) = link.queue.dequeue() else {
            return;
        };

        let tx_time = link.tx_time(pkt.size_bytes);
        let depart = now.saturating_add(tx_time);
        let arrive = depart.saturating_add(link.latency);
        link.busy_until = depart;
        let (from, to) = (link.from, link.to);

        trace!(?depart, ?arrive, "开始序列化发送");
        self.viz_tx_start(now, &pkt, from, to, depart, arrive);

        sim.schedule(depart, LinkReady { link_id });
        sim.schedule(arrive, DeliverPacket { to, pkt: pkt.advance() });
    }

    /// 链路完成一次发送后的回调：继续发队列中的下一个包。
    pub(crate) fn on_link_ready(&mut self, link_id: LinkId, sim: &mut Simulator) {
        self.try_transmit(link_id, sim);
    }
}

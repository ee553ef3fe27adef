//! Dumbbell 拓扑构建

use crate::net::{NetWorld, NodeId};
use crate::sim::SimTime;

/// Dumbbell 拓扑配置选项
#[derive(Debug, Clone)]
pub struct DumbbellOpts {
    pub host_link_gbps: u64,
    pub bottleneck_gbps: u64,
    pub link_latency: SimTime,
    /// 瓶颈链路队列容量（bytes）；None 表示默认（几乎无限，不丢包）
    pub bottleneck_queue_bytes: Option<u64>,
    /// 瓶颈链路 ECN 标记阈值（bytes）；None 表示不开启 ECN 标记
    pub ecn_threshold_bytes: Option<u64>,
}

impl Default for DumbbellOpts {
    fn default() -> Self {
        Self {
            host_link_gbps: 100,
            bottleneck_gbps: 10,
            link_latency: SimTime::from_micros(2),
            bottleneck_queue_bytes: None,
            ecn_threshold_bytes: None,
        }
    }
}

/// 构建 dumbbell 拓扑
///
/// 拓扑结构：h0 <-> s0 <-> s1 <-> h1，s0->s1 为瓶颈。
/// 返回：(源节点, 目标节点, 前向路由路径)
pub fn build_dumbbell(world: &mut NetWorld, opts: &DumbbellOpts) -> (NodeId, NodeId, Vec<NodeId>) {
    let h0 = world.net.add_host("h0");
    let h1 = world.net.add_host("h1");
    let s0 = world.net.add_switch("s0");
    let s1 = world.net.add_switch("s1");

    let gbps_to_bps = |g: u64| g.saturating_mul(1_000_000_000);
    let host_bps = gbps_to_bps(opts.host_link_gbps);
    let bottleneck_bps = gbps_to_bps(opts.bottleneck_gbps);

    // h0 <-> s0
    world.net.connect(h0, s0, opts.link_latency, host_bps);
    world.net.connect(s0, h0, opts.link_latency, host_bps);
    // s0 <-> s1 (bottleneck)
    world.net.connect(s0, s1, opts.link_latency, bottleneck_bps);
    world.net.connect(s1, s0, opts.link_latency, bottleneck_bps);
    // s1 <-> h1
    world.net.connect(s1, h1, opts.link_latency, host_bps);
    world.net.connect(h1, s1, opts.link_latency, host_bps);

    if let Some(q) = opts.bottleneck_queue_bytes {
        world.net.set_link_queue_capacity_bytes(s0, s1, q);
    }
    if let Some(k) = opts.ecn_threshold_bytes {
        world.net.set_link_ecn_threshold_bytes(s0, s1, k);
    }

    let route = vec![h0, s0, s1, h1];
    (h0, h1, route)
}

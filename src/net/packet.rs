//! 数据包类型
//!
//! 定义网络数据包、IP 层 ECN 码点及其相关操作。

use super::id::NodeId;
use super::transport::Transport;

/// IP 头里的 ECN 字段（RFC 3168，2 bit）。
///
/// `00=Not-ECT, 01=ECT(1), 10=ECT(0), 11=CE`。两个 ECT 码点对路由器
/// 等价；只需要一个码点的发送方应使用 ECT(0)。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ecn {
    /// 不参与 ECN。
    #[default]
    NotEct,
    /// ECN-Capable Transport (1)。
    Ect1,
    /// ECN-Capable Transport (0)。
    Ect0,
    /// Congestion Experienced：由拥塞的路由器改写。
    Ce,
}

impl Ecn {
    /// 按 IP 头中的两个比特构造。
    pub fn from_bits(bits: u8) -> Ecn {
        match bits & 0b11 {
            0b00 => Ecn::NotEct,
            0b01 => Ecn::Ect1,
            0b10 => Ecn::Ect0,
            _ => Ecn::Ce,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Ecn::NotEct => 0b00,
            Ecn::Ect1 => 0b01,
            Ecn::Ect0 => 0b10,
            Ecn::Ce => 0b11,
        }
    }

    /// 是否携带 ECT 标记（可被路由器改写为 CE）。
    pub fn is_ect(self) -> bool {
        matches!(self, Ecn::Ect0 | Ecn::Ect1)
    }

    pub fn is_ce(self) -> bool {
        matches!(self, Ecn::Ce)
    }
}

/// 网络数据包
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    pub flow_id: u64,
    pub size_bytes: u32,
    pub route: Vec<NodeId>,
    pub hop: usize, // 当前所在节点在 route 中的索引
    /// IP 层 ECN 码点；由传输层请求 ECT，由链路改写为 CE。
    pub ecn: Ecn,
    /// 传输层元数据（TCP 段等）。
    pub transport: Transport,
}

impl Packet {
    /// 获取源节点
    pub fn src(&self) -> NodeId {
        self.route[0]
    }

    /// 获取目标节点
    pub fn dst(&self) -> NodeId {
        *self.route.last().expect("route non-empty")
    }

    /// 获取当前所在节点
    pub fn at(&self) -> NodeId {
        self.route[self.hop]
    }

    /// 检查是否有下一跳
    pub fn has_next(&self) -> bool {
        self.hop + 1 < self.route.len()
    }

    /// 获取下一跳节点（如果有）
    pub fn next(&self) -> Option<NodeId> {
        self.route.get(self.hop + 1).copied()
    }

    /// 前进到下一跳
    pub fn advance(mut self) -> Self {
        self.hop += 1;
        self
    }

    /// 链路拥塞时的 CE 改写：只有带 ECT 标记的包才能被标记。
    pub fn mark_ce_if_ect(&mut self) -> bool {
        if self.ecn.is_ect() {
            self.ecn = Ecn::Ce;
            return true;
        }
        false
    }
}

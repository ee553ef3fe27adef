//! 拥塞控制策略
//!
//! 策略通过对象安全的 [`CongestionOps`] 接入连接：连接把自己的
//! [`CongState`] 借给每一次调用，策略不持有对它的长期引用。

mod cubic;
mod dctcp;
mod linux_reno;

pub use cubic::Cubic;
pub use dctcp::{Dctcp, DctcpEstimate};
pub use linux_reno::LinuxReno;

use super::state::{CaEvent, CongState};
use crate::sim::SimTime;

/// DCTCP 的 CE 迁移需要的回调面：用当前接收指针立即发一个空 ACK。
/// 接收指针本身就在 `CongState::rx_next` 里，由策略直接回拨/恢复。
pub trait AckHost {
    fn send_empty_ack(&mut self, tcb: &CongState, ece: bool);
}

/// 发送端事件用的空实现（发送端没有 ACK 可发）。
pub(crate) struct NullAckHost;

impl AckHost for NullAckHost {
    fn send_empty_ack(&mut self, _tcb: &CongState, _ece: bool) {}
}

/// 拥塞控制策略接口。
pub trait CongestionOps: Send {
    fn name(&self) -> &'static str;

    /// 连接建立时调用一次（DCTCP 在这里强制 ECN 模式与 ECT 码点）。
    fn init(&mut self, _tcb: &mut CongState) {}

    /// 拥塞/丢包时刻的慢启动阈值（bytes）。
    fn ss_thresh(&mut self, tcb: &CongState, bytes_in_flight: u32) -> u32;

    /// 每个推进了累计确认的 ACK 之后的窗口增长。
    fn increase_window(&mut self, tcb: &mut CongState, segments_acked: u32, now: SimTime);

    /// 每个 ACK（带 RTT 样本时 rtt 非零）。
    fn pkts_acked(&mut self, _tcb: &mut CongState, _segments_acked: u32, _rtt: SimTime) {}

    /// 拥塞事件钩子。
    fn cwnd_event(&mut self, _tcb: &mut CongState, _ev: CaEvent, _host: &mut dyn AckHost) {}

    /// DCTCP 风格的拥塞估计值（其余算法为 None）。
    fn congestion_estimate(&self) -> Option<f64> {
        None
    }

    /// 取走最近一次观察窗口结束产生的估计更新（供 trace 输出）。
    fn take_estimate(&mut self) -> Option<DctcpEstimate> {
        None
    }

    /// 显式深拷贝：连接派生第二个端点时使用。
    fn fork(&self) -> Box<dyn CongestionOps>;
}

/// 算法选择（配置面）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CcAlgo {
    #[default]
    LinuxReno,
    Cubic,
    Dctcp,
}

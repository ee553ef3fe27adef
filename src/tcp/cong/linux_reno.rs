//! Linux 风格 Reno
//!
//! 慢启动：每确认一个段窗口加一个段，越过 ssthresh 的部分结转进
//! 拥塞避免。拥塞避免用 `tcp_cong_avoid_ai` 的整数累加器：确认计数
//! 攒满一个窗口（以段计）才加一个段，多余部分按模保留。这使得同样
//! 总量的确认字节无论被延迟 ACK 怎么合并，最终窗口都相同。

use super::super::state::{CongState, EcnState};
use super::CongestionOps;
use crate::sim::SimTime;
use tracing::debug;

/// 丢包回退系数。
const BETA: f64 = 0.5;
/// RFC 8511（ABE）：ECN 信号触发的回退用更温和的系数。
const BETA_ECN: f64 = 0.7;

#[derive(Debug, Clone, Default)]
pub struct LinuxReno {
    /// 拥塞避免的确认计数器（以段计）。
    cwnd_cnt: u32,
    abe: bool,
}

impl LinuxReno {
    pub fn new() -> LinuxReno {
        LinuxReno::default()
    }

    pub fn with_abe(abe: bool) -> LinuxReno {
        LinuxReno { cwnd_cnt: 0, abe }
    }

    /// 慢启动；返回越过 ssthresh 之后剩余的确认段数。
    fn slow_start(&mut self, tcb: &mut CongState, segments_acked: u32) -> u32 {
        if segments_acked == 0 {
            return 0;
        }
        let prev = tcb.cwnd;
        tcb.cwnd = prev
            .saturating_add(segments_acked.saturating_mul(tcb.seg_size))
            .min(tcb.ssthresh);
        debug!(cwnd = tcb.cwnd, ssthresh = tcb.ssthresh, "慢启动增窗");
        segments_acked - (tcb.cwnd - prev) / tcb.seg_size
    }

    /// 拥塞避免（`tcp_cong_avoid_ai`）。
    fn congestion_avoidance(&mut self, tcb: &mut CongState, segments_acked: u32) {
        let w = (tcb.cwnd / tcb.seg_size).max(1);
        if self.cwnd_cnt >= w {
            self.cwnd_cnt = 0;
            tcb.cwnd = tcb.cwnd.saturating_add(tcb.seg_size);
        }
        self.cwnd_cnt += segments_acked;
        if self.cwnd_cnt >= w {
            let delta = self.cwnd_cnt / w;
            self.cwnd_cnt -= delta * w;
            tcb.cwnd = tcb.cwnd.saturating_add(delta * tcb.seg_size);
        }
        debug!(cwnd = tcb.cwnd, cwnd_cnt = self.cwnd_cnt, "拥塞避免");
    }

    pub(crate) fn beta(&self, tcb: &CongState) -> f64 {
        if self.abe && tcb.ecn_state == EcnState::EceRcvd {
            BETA_ECN
        } else {
            BETA
        }
    }
}

impl CongestionOps for LinuxReno {
    fn name(&self) -> &'static str {
        "linux-reno"
    }

    fn ss_thresh(&mut self, tcb: &CongState, _bytes_in_flight: u32) -> u32 {
        // 截断而不是四舍五入。
        let reduced = (tcb.cwnd as f64 * self.beta(tcb)) as u32;
        reduced.max(2 * tcb.seg_size)
    }

    fn increase_window(&mut self, tcb: &mut CongState, segments_acked: u32, _now: SimTime) {
        let mut acked = segments_acked;
        if tcb.in_slow_start() {
            acked = self.slow_start(tcb, acked);
        }
        if !tcb.in_slow_start() && acked > 0 {
            self.congestion_avoidance(tcb, acked);
        }
    }

    fn fork(&self) -> Box<dyn CongestionOps> {
        Box::new(self.clone())
    }
}

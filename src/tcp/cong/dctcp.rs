//! DCTCP（RFC 8257）
//!
//! 用每个观察窗口内被 CE 标记的字节比例驱动拥塞估计 alpha，回退量
//! 为 `(1 - alpha/2) * cwnd`。窗口增长完全委托给 LinuxReno，慢启动
//! 行为与 Reno 逐字节一致。
//!
//! 接收端的 CE 状态迁移要求把迁移点精确对齐到序列号：有延迟 ACK
//! 悬挂时，先把 CE 之前的数据用一个"旧状态"的 ACK 确认掉（回拨
//! 接收指针、发包、恢复指针），再记录新的迁移点。

use super::super::seq::SeqNum;
use super::super::state::{CaEvent, CongState, EcnMode, EcnState, EctCodepoint};
use super::super::TcpConfigError;
use super::{AckHost, CongestionOps, LinuxReno};
use crate::sim::SimTime;
use tracing::debug;

/// 一次观察窗口结束时的拥塞估计更新（供 trace/可视化读取）。
#[derive(Debug, Clone, Copy)]
pub struct DctcpEstimate {
    pub alpha: f64,
    pub ecn_ratio: f64,
    pub acked_bytes_total: u32,
    pub acked_bytes_ecn: u32,
}

#[derive(Debug, Clone)]
pub struct Dctcp {
    reno: LinuxReno,
    alpha: f64,
    /// 估计增益 g（典型 1/16）。
    g: f64,
    use_ect0: bool,
    acked_bytes_ecn: u32,
    acked_bytes_total: u32,
    /// 观察窗口的结束序列；`next_seq_valid` 为 false 时尚未锁定。
    next_seq: SeqNum,
    next_seq_valid: bool,
    /// 接收端：当前是否处于 CE 体验状态。
    ce_state: bool,
    /// 接收端：上一次 CE 迁移时的接收指针。
    prior_rcv_nxt: SeqNum,
    prior_rcv_nxt_valid: bool,
    /// 接收端：有延迟 ACK 悬挂。
    delayed_ack_reserved: bool,
    initialized: bool,
    last_estimate: Option<DctcpEstimate>,
}

impl Dctcp {
    pub fn new(g: f64, alpha_on_init: f64, use_ect0: bool) -> Dctcp {
        debug_assert!((0.0..=1.0).contains(&g), "shift g out of range");
        debug_assert!(
            (0.0..=1.0).contains(&alpha_on_init),
            "initial alpha out of range"
        );
        Dctcp {
            reno: LinuxReno::new(),
            alpha: alpha_on_init,
            g,
            use_ect0,
            acked_bytes_ecn: 0,
            acked_bytes_total: 0,
            next_seq: SeqNum::ZERO,
            next_seq_valid: false,
            ce_state: false,
            prior_rcv_nxt: SeqNum::ZERO,
            prior_rcv_nxt_valid: false,
            delayed_ack_reserved: false,
            initialized: false,
            last_estimate: None,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// 只允许在 `init` 之前覆盖初始 alpha。
    pub fn set_alpha_on_init(&mut self, alpha: f64) -> Result<(), TcpConfigError> {
        if self.initialized {
            return Err(TcpConfigError::AlreadyInitialized);
        }
        if !(0.0..=1.0).contains(&alpha) {
            return Err(TcpConfigError::OutOfRange {
                name: "alpha",
                value: alpha,
                min: 0.0,
                max: 1.0,
            });
        }
        self.alpha = alpha;
        Ok(())
    }


    fn reset_window(&mut self, tcb: &CongState) {
        self.next_seq = tcb.next_tx_seq;
        self.acked_bytes_ecn = 0;
        self.acked_bytes_total = 0;
    }

    /// 进入 CE 体验状态（0→1）。
    fn ce_state_0to1(&mut self, tcb: &mut CongState, host: &mut dyn AckHost) {
        if !self.ce_state && self.delayed_ack_reserved && self.prior_rcv_nxt_valid {
            // 先把 CE 之前的数据用不带 ECE 的 ACK 确认掉。
            // 指针必须在所有路径上恢复，否则后续 ACK 生成会被带偏。
            let tmp_rcv_nxt = tcb.rx_next;
            tcb.rx_next = self.prior_rcv_nxt;
            host.send_empty_ack(tcb, false);
            tcb.rx_next = tmp_rcv_nxt;
        }

        self.prior_rcv_nxt = tcb.rx_next;
        self.prior_rcv_nxt_valid = true;
        self.ce_state = true;
        tcb.ecn_state = EcnState::EceRcvd;
        debug!(rx_next = %tcb.rx_next, "CE 状态 0→1");
    }

    /// 退出 CE 体验状态（1→0）。
    fn ce_state_1to0(&mut self, tcb: &mut CongState, host: &mut dyn AckHost) {
        if self.ce_state && self.delayed_ack_reserved && self.prior_rcv_nxt_valid {
            // 对称：CE 期间的数据用带 ECE 的 ACK 确认掉。
            let tmp_rcv_nxt = tcb.rx_next;
            tcb.rx_next = self.prior_rcv_nxt;
            host.send_empty_ack(tcb, true);
            tcb.rx_next = tmp_rcv_nxt;
        }

        self.prior_rcv_nxt = tcb.rx_next;
        self.prior_rcv_nxt_valid = true;
        self.ce_state = false;
        if matches!(tcb.ecn_state, EcnState::EceRcvd | EcnState::SendingEce) {
            tcb.ecn_state = EcnState::Idle;
        }
        debug!(rx_next = %tcb.rx_next, "CE 状态 1→0");
    }
}

impl CongestionOps for Dctcp {
    fn name(&self) -> &'static str {
        "dctcp"
    }

    fn init(&mut self, tcb: &mut CongState) {
        tcb.use_ecn = EcnMode::Dctcp;
        tcb.ect = if self.use_ect0 {
            EctCodepoint::Ect0
        } else {
            EctCodepoint::Ect1
        };
        self.initialized = true;
        debug!(alpha = self.alpha, g = self.g, "DCTCP 初始化");
    }

    /// 忽略 `bytes_in_flight`：回退量只看 CWR 进入时刻的 cwnd，
    /// 窗口在 CWR 退出时才落到这个值（RFC 8257 §3.3 第 9 步）。
    fn ss_thresh(&mut self, tcb: &CongState, _bytes_in_flight: u32) -> u32 {
        ((1.0 - self.alpha / 2.0) * tcb.cwnd as f64) as u32
    }

    fn increase_window(&mut self, tcb: &mut CongState, segments_acked: u32, now: SimTime) {
        self.reno.increase_window(tcb, segments_acked, now);
    }

    fn pkts_acked(&mut self, tcb: &mut CongState, segments_acked: u32, _rtt: SimTime) {
        let acked_bytes = segments_acked.saturating_mul(tcb.seg_size);
        self.acked_bytes_total = self.acked_bytes_total.saturating_add(acked_bytes);
        if tcb.ecn_state == EcnState::EceRcvd {
            self.acked_bytes_ecn = self.acked_bytes_ecn.saturating_add(acked_bytes);
        }

        if !self.next_seq_valid {
            self.next_seq = tcb.next_tx_seq;
            self.next_seq_valid = true;
        }

        // 观察窗口关闭：确认推进到了锁定窗口时的发送边界。
        if tcb.last_acked_seq >= self.next_seq {
            let ecn_ratio = if self.acked_bytes_total > 0 {
                self.acked_bytes_ecn as f64 / self.acked_bytes_total as f64
            } else {
                0.0
            };
            self.alpha = (1.0 - self.g) * self.alpha + self.g * ecn_ratio;
            self.last_estimate = Some(DctcpEstimate {
                alpha: self.alpha,
                ecn_ratio,
                acked_bytes_total: self.acked_bytes_total,
                acked_bytes_ecn: self.acked_bytes_ecn,
            });
            debug!(alpha = self.alpha, ecn_ratio, "拥塞估计更新");
            self.reset_window(tcb);
        }
    }

    fn cwnd_event(&mut self, tcb: &mut CongState, ev: CaEvent, host: &mut dyn AckHost) {
        match ev {
            CaEvent::EcnIsCe => self.ce_state_0to1(tcb, host),
            CaEvent::EcnNoCe => self.ce_state_1to0(tcb, host),
            CaEvent::DelayedAck => self.delayed_ack_reserved = true,
            CaEvent::NonDelayedAck => self.delayed_ack_reserved = false,
            _ => {}
        }
    }

    fn congestion_estimate(&self) -> Option<f64> {
        Some(self.alpha)
    }

    fn take_estimate(&mut self) -> Option<DctcpEstimate> {
        self.last_estimate.take()
    }

    fn fork(&self) -> Box<dyn CongestionOps> {
        Box::new(self.clone())
    }
}

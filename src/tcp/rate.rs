//! 交付速率估计（Linux `tcp_rate.c` 风格）
//!
//! 发送时给每个段盖上估计器当前状态的快照（`RateSnapshot`），段被确认
//! 时读回快照、推进累计交付量，并在每个 ACK 结束时产出一个
//! [`RateSample`]。同一个 ACK 确认多个段时，以"发送时刻最晚"的段的
//! 快照为参考（快照上 `delivered` 最大者），保证样本用的是最新信息。
//!
//! 算法见 draft-cheng-iccrg-delivery-rate-estimation。

use super::seq::SeqNum;
use super::tx_item::{RateSnapshot, TxItem};
use crate::sim::SimTime;
use tracing::trace;

/// 一次 ACK 产出的交付速率样本。
#[derive(Debug, Clone, Default)]
pub struct RateSample {
    /// 估计的交付速率（bytes/s）。
    pub delivery_rate_bps: u64,
    /// 样本是否产生于应用受限阶段。
    pub is_app_limited: bool,
    /// 样本区间：max(发送侧耗时, 确认侧耗时)。
    pub interval: SimTime,
    /// 参考快照以来交付的字节数；负值表示样本无效。
    pub delivered: i64,
    /// 参考快照上的累计交付字节。
    pub prior_delivered: u64,
    /// 参考快照上的交付时间戳；0 且 interval 为 0 时样本无效。
    pub prior_time: SimTime,
    /// 参考段发送时刻与其快照 first_sent 的间隔。
    pub send_elapsed: SimTime,
    /// 此次确认与参考快照交付时间戳的间隔。
    pub ack_elapsed: SimTime,
    /// 本次 ACK 判定丢失的字节。
    pub bytes_loss: u32,
    /// ACK 处理前的在途字节。
    pub prior_in_flight: u32,
    /// 本次 ACK 确认/SACK 的字节（调用方给出的逐 ACK 增量）。
    pub acked_sacked: u32,
}

impl RateSample {
    /// 有效性判定：`prior_time` 与 `interval` 同时为 0 才无效。
    pub fn is_valid(&self) -> bool {
        !self.prior_time.is_zero() || !self.interval.is_zero()
    }
}

/// 每连接的交付账目。
///
/// 不变式：`delivered` 单调不减；`delivered_time` 只向前推进。
#[derive(Debug, Default)]
pub struct TcpRateLinux {
    delivered: u64,
    delivered_time: SimTime,
    first_sent_time: SimTime,
    /// 应用受限界标（delivered + in_flight），0 表示不受限。
    app_limited: u64,
    /// 本轮 ACK 里已见快照的最大 delivered（tie-break 参考）。
    tx_item_delivered: u64,
    rate_sample: RateSample,
}

impl TcpRateLinux {
    /// 段（重）发送钩子。必须先于在途字节增加调用。
    ///
    /// `is_start_of_transmission`：发送前在途字节为 0（新的发送脉冲），
    /// 此时重置 `first_sent_time`/`delivered_time` 基准。
    pub fn skb_sent(&mut self, item: &mut TxItem, now: SimTime, is_start_of_transmission: bool) {
        if is_start_of_transmission {
            self.first_sent_time = now;
            self.delivered_time = now;
        }

        item.rate = RateSnapshot {
            delivered: self.delivered,
            delivered_time: self.delivered_time,
            first_sent: self.first_sent_time,
            is_app_limited: self.app_limited != 0,
        };
        item.rate_valid = true;
        item.last_sent = now;
    }

    /// 应用受限检查：发不满窗口且没有数据排队时，记下界标；
    /// 直到交付越过界标之前发出的段都打上 app-limited。
    pub fn calculate_app_limited(
        &mut self,
        cwnd: u32,
        in_flight: u32,
        seg_size: u32,
        tail_seq: SeqNum,
        next_tx: SeqNum,
        lost_out: u32,
        retrans_out: u32,
    ) {
        if tail_seq.diff(next_tx) < seg_size as i32
            && in_flight < cwnd
            && lost_out <= retrans_out
        {
            self.app_limited = (self.delivered + in_flight as u64).max(1);
            trace!(app_limited = self.app_limited, "应用受限界标更新");
        }
    }

    /// 段交付钩子：推进账目；快照上 `delivered` 最大的段成为样本参考。
    pub fn skb_delivered(&mut self, item: &mut TxItem, now: SimTime) {
        if !item.rate_valid {
            return; // 快照已被消费（例如先 SACK 后累计确认）
        }

        self.delivered += item.seq_size() as u64;
        self.delivered_time = now;

        if self.rate_sample.prior_time.is_zero() || item.rate.delivered > self.tx_item_delivered {
            self.tx_item_delivered = item.rate.delivered;
            self.rate_sample.prior_delivered = item.rate.delivered;
            self.rate_sample.prior_time = item.rate.delivered_time;
            self.rate_sample.is_app_limited = item.rate.is_app_limited;
            self.rate_sample.send_elapsed = item.last_sent.saturating_sub(item.rate.first_sent);
            self.rate_sample.ack_elapsed = now.saturating_sub(item.rate.delivered_time);
            self.first_sent_time = item.last_sent;
        }

        item.rate_valid = false;
    }

    /// 每个 ACK 结束时产出样本。
    ///
    /// `delivered`/`lost` 是调用方给出的本次 ACK 增量，不在内部重算。
    /// 区间短于 `min_rtt` 的样本不可靠，置 `interval = 0`（随后
    /// `is_valid()` 为 false）。任何退化输入都不会 panic。
    pub fn generate_sample(
        &mut self,
        delivered: u32,
        lost: u32,
        is_sack_reneg: bool,
        prior_in_flight: u32,
        min_rtt: SimTime,
    ) -> RateSample {
        // 交付越过界标后，应用受限阶段结束。
        if self.app_limited != 0 && self.delivered > self.app_limited {
            self.app_limited = 0;
        }

        self.rate_sample.acked_sacked = delivered;
        self.rate_sample.bytes_loss = lost;
        self.rate_sample.prior_in_flight = prior_in_flight;

        if is_sack_reneg {
            // 对端反悔了 SACK 的数据：参考快照不可信，整体作废。
            self.rate_sample.prior_time = SimTime::ZERO;
            self.rate_sample.interval = SimTime::ZERO;
            self.rate_sample.delivered = -1;
            self.rate_sample.delivery_rate_bps = 0;
            return self.rate_sample.clone();
        }

        if self.rate_sample.prior_time.is_zero() {
            // 尚无参考快照，产不出样本。
            self.rate_sample.interval = SimTime::ZERO;
            return self.rate_sample.clone();
        }

        self.rate_sample.delivered =
            self.delivered as i64 - self.rate_sample.prior_delivered as i64;

        let interval = self
            .rate_sample
            .send_elapsed
            .max(self.rate_sample.ack_elapsed);
        self.rate_sample.interval = interval;

        if interval < min_rtt {
            self.rate_sample.interval = SimTime::ZERO;
            return self.rate_sample.clone();
        }

        if !interval.is_zero() && self.rate_sample.delivered > 0 {
            self.rate_sample.delivery_rate_bps =
                (self.rate_sample.delivered as f64 / interval.as_secs_f64()) as u64;
            trace!(
                rate_bps = self.rate_sample.delivery_rate_bps,
                interval_ns = interval.0,
                "交付速率样本"
            );
        }

        self.rate_sample.clone()
    }

    /// 累计交付字节。
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// 当前是否处于应用受限阶段。
    pub fn is_app_limited(&self) -> bool {
        self.app_limited != 0
    }
}

//! 发送段账本条目
//!
//! 每个已发送、尚未确认的数据段在账本里留一条元数据：序列范围、
//! 重传/丢失/SACK 标志、最近发送时刻，以及速率估计在发送时刻盖上的
//! 快照（交付时读回，见 `rate` 模块）。

use super::seq::SeqNum;
use crate::sim::SimTime;

/// 速率估计的发送时刻快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct RateSnapshot {
    /// 发送时估计器的累计交付字节。
    pub delivered: u64,
    /// 发送时估计器的交付时间戳。
    pub delivered_time: SimTime,
    /// 发送时估计器记录的首包发送时刻。
    pub first_sent: SimTime,
    /// 发送时是否处于应用受限阶段。
    pub is_app_limited: bool,
}

/// 账本里的一个发送段。
#[derive(Debug, Clone)]
pub struct TxItem {
    pub start_seq: SeqNum,
    len: u32,
    /// 被判定丢失（RTO）。
    pub lost: bool,
    /// 被重传过。
    pub retrans: bool,
    /// 被 SACK 覆盖。
    pub sacked: bool,
    /// 最近一次（重）传的时刻。
    pub last_sent: SimTime,
    pub rate: RateSnapshot,
    /// 快照尚未被交付消费；交付后失效，防止重复计账。
    pub(crate) rate_valid: bool,
}

impl TxItem {
    pub fn new(start_seq: SeqNum, len: u32) -> TxItem {
        TxItem {
            start_seq,
            len,
            lost: false,
            retrans: false,
            sacked: false,
            last_sent: SimTime::ZERO,
            rate: RateSnapshot::default(),
            rate_valid: false,
        }
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 段占用的序列空间。零长度段按 1 个序号计。
    pub fn seq_size(&self) -> u32 {
        self.len.max(1)
    }

    pub fn end_seq(&self) -> SeqNum {
        self.start_seq + self.seq_size()
    }
}

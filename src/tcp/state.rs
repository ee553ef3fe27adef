//! 连接端点的共享状态记录
//!
//! 每个连接端点一份（发送端一份、接收端一份），由拥塞控制策略和
//! ECN/连接逻辑修改；其他组件只读。对端永远通过报文交互，绝不直接
//! 改写这份记录。

use super::seq::SeqNum;

/// 拥塞状态机阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CongPhase {
    /// 正常路径，无已知拥塞。
    #[default]
    Open,
    /// 收到冗余 ACK，疑似乱序。
    Disorder,
    /// 因 ECE 回退，等待 CWR 点被确认。
    Cwr,
    /// 快速重传后的恢复期。
    Recovery,
    /// RTO 之后的丢失恢复。
    Loss,
}

impl CongPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            CongPhase::Open => "open",
            CongPhase::Disorder => "disorder",
            CongPhase::Cwr => "cwr",
            CongPhase::Recovery => "recovery",
            CongPhase::Loss => "loss",
        }
    }
}

/// 端点 ECN 状态机。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EcnState {
    /// 协商失败或未启用。
    #[default]
    Disabled,
    /// 协商成功，暂无拥塞信号。
    Idle,
    /// 已发出 ECT 标记的数据，尚无反馈（发送端）。
    EctSent,
    /// 收到拥塞信号：发送端收到 ECE 回显，或接收端看到 CE 标记。
    EceRcvd,
    /// 已用 CWR 响应本窗口的拥塞信号（发送端）。
    CwrSent,
    /// 正在持续回显 ECE（接收端）。
    SendingEce,
}

impl EcnState {
    pub fn as_str(self) -> &'static str {
        match self {
            EcnState::Disabled => "disabled",
            EcnState::Idle => "idle",
            EcnState::EctSent => "ect_sent",
            EcnState::EceRcvd => "ece_rcvd",
            EcnState::CwrSent => "cwr_sent",
            EcnState::SendingEce => "sending_ece",
        }
    }
}

/// 使用哪个 ECT 码点标记出包。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EctCodepoint {
    #[default]
    Ect0,
    Ect1,
}

/// 端点的 ECN 运行模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EcnMode {
    /// 不协商、不标记。
    #[default]
    Off,
    /// RFC 3168 经典 ECN。
    Classic,
    /// RFC 8257 DCTCP：逐包回显 + 控制段也带 ECT。
    Dctcp,
    /// 实验性 "try" 协商：TCP 标志宣告能力，IP 层标记推迟到协商
    /// 完成之后；对 CE 标记的 SYN-ACK 做出反应。
    Try,
}

/// 通知拥塞控制策略的事件。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaEvent {
    /// 收到 CE 标记的包（接收端，进入拥塞体验状态）。
    EcnIsCe,
    /// 收到未标记的包（接收端，退出拥塞体验状态）。
    EcnNoCe,
    /// 一个 ACK 被推迟合并。
    DelayedAck,
    /// 立即发出了 ACK。
    NonDelayedAck,
    /// RTO 触发的丢失恢复。
    Loss,
    /// CWR 点被确认，窗口回退结束。
    CompleteCwr,
}

/// 每个连接端点一份的共享可变记录。
#[derive(Debug, Clone)]
pub struct CongState {
    /// 拥塞窗口（bytes）。
    pub cwnd: u32,
    /// 慢启动阈值（bytes）。
    pub ssthresh: u32,
    /// 段大小（bytes）。
    pub seg_size: u32,
    /// 在途字节。
    pub bytes_in_flight: u32,
    pub cong: CongPhase,
    pub ecn_state: EcnState,
    pub ect: EctCodepoint,
    pub use_ecn: EcnMode,
    /// 下一个要发送的序列号。
    pub next_tx_seq: SeqNum,
    /// 最高累计确认。
    pub last_acked_seq: SeqNum,
    /// 发送过的最高序列号。
    pub high_tx_mark: SeqNum,
    /// 接收端下一个期望的序列号。
    pub rx_next: SeqNum,
    /// 最近一次收到 ECE 回显时的确认序列。
    pub ecn_echo_seq: SeqNum,
    /// 最近一次发出 CWR 时的发送序列。
    pub ecn_cwr_seq: SeqNum,
}

impl CongState {
    pub fn new(cwnd: u32, ssthresh: u32, seg_size: u32, isn: SeqNum) -> CongState {
        CongState {
            cwnd,
            ssthresh,
            seg_size,
            bytes_in_flight: 0,
            cong: CongPhase::Open,
            ecn_state: EcnState::Disabled,
            ect: EctCodepoint::Ect0,
            use_ecn: EcnMode::Off,
            next_tx_seq: isn,
            last_acked_seq: isn,
            high_tx_mark: isn,
            rx_next: isn,
            ecn_echo_seq: isn,
            ecn_cwr_seq: isn,
        }
    }

    /// 是否处于慢启动。
    pub fn in_slow_start(&self) -> bool {
        self.cwnd < self.ssthresh
    }

    /// 接收端当前是否应该在 ACK 上回显 ECE。
    pub fn echoing_ece(&self) -> bool {
        matches!(self.ecn_state, EcnState::EceRcvd | EcnState::SendingEce)
    }
}

//! TCP 拥塞控制与 ECN 信令核心
//!
//! 分层（自底向上）：
//! - [`seq`]：32 位序列号回绕算术，所有比较的地基
//! - [`tx_item`]：发送段账本条目（序列范围、标志、速率快照）
//! - [`rate`]：交付速率估计（Linux `tcp_rate.c` 风格）
//! - [`state`]：每端点一份的共享拥塞/ECN 状态记录
//! - [`cong`]：可插拔拥塞控制策略（LinuxReno / Cubic / DCTCP）
//! - [`ecn`]：ECN 协商与标记策略
//! - [`conn`]：把以上组件接到网络上的连接逻辑

pub mod cong;
pub mod conn;
pub mod ecn;
pub mod rate;
pub mod seq;
pub mod state;
pub mod tx_item;

pub use cong::{AckHost, CcAlgo, CongestionOps, Cubic, Dctcp, DctcpEstimate, LinuxReno};
pub use conn::{
    CwndSample, TcpConfig, TcpConn, TcpConnId, TcpDelAck, TcpDoneCallback, TcpRto, TcpStack,
    TcpStart,
};
pub use ecn::EcnNegotiated;
pub use rate::{RateSample, TcpRateLinux};
pub use seq::SeqNum;
pub use state::{CaEvent, CongPhase, CongState, EcnMode, EcnState, EctCodepoint};
pub use tx_item::{RateSnapshot, TxItem};

use thiserror::Error;

/// 配置面错误。运行期的协议状况（协商失败、退化样本）不会走到
/// 这里——那些是状态机分支；这里只报告调用方给错了参数。
#[derive(Debug, Error, PartialEq)]
pub enum TcpConfigError {
    #[error("{name} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{0} must be non-zero")]
    Zero(&'static str),
    #[error("congestion estimate already initialized")]
    AlreadyInitialized,
}

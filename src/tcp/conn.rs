//! TCP 连接（发送/接收路径）
//!
//! 目标：支撑拥塞控制与 ECN 实验所需的连接逻辑：
//! - 可选三次握手（SYN 上叠加 ECN 能力协商）
//! - 数据段/累计 ACK、延迟 ACK 合并
//! - 可插拔拥塞控制（LinuxReno / Cubic / DCTCP）
//! - ECN 信令：CE → ECE 回显 → CWR，一个窗口至多回退一次
//! - 超时重传（指数退避的 RTO，经由可取消的定时器事件）
//! - 交付速率估计（逐 ACK 产出样本）
//!
//! 注意：这是仿真用途的简化 TCP，不实现窗口通告/选择确认/挥手。
//! 连接对象同时持有两端的端点状态（`snd`/`rcv`），但两端各自只改
//! 自己的那份 `CongState`，跨端交互只通过报文。

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::net::{with_tcp_stack, Ecn, NetApi, NodeId, TcpSegment, Transport};
use crate::sim::{Event, EventId, SimTime, Simulator, World};
use tracing::debug;

use super::cong::{AckHost, CcAlgo, CongestionOps, Cubic, Dctcp, LinuxReno, NullAckHost};
use super::ecn;
use super::rate::TcpRateLinux;
use super::seq::SeqNum;
use super::state::{CaEvent, CongPhase, CongState, EcnMode, EcnState, EctCodepoint};
use super::tx_item::TxItem;
use super::TcpConfigError;

/// 一个 TCP 连接的唯一标识（复用 `flow_id` 的语义）。
pub type TcpConnId = u64;
pub type TcpDoneCallback = Box<dyn Fn(TcpConnId, SimTime, &mut Simulator) + Send>;

#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// MSS（数据段载荷大小，字节）
    pub mss: u32,
    /// ACK 包大小（字节）
    pub ack_bytes: u32,
    /// 初始 cwnd（字节）
    pub init_cwnd_bytes: u32,
    /// 初始 ssthresh（字节）
    pub init_ssthresh_bytes: u32,
    /// 初始 RTO
    pub init_rto: SimTime,
    /// 最小 RTO
    pub min_rto: SimTime,
    /// 最大 RTO（用于退避上限）
    pub max_rto: SimTime,
    /// 是否执行三次握手（关闭时视为已建立，ECN 按模式直接生效）
    pub handshake: bool,
    /// 初始序列号（可设到回绕点附近以覆盖回绕路径）
    pub isn: SeqNum,
    /// 延迟 ACK 合并数；1 表示逐包确认
    pub delayed_ack_count: u32,
    /// 延迟 ACK 超时
    pub delayed_ack_timeout: SimTime,
    /// 拥塞控制算法
    pub cc: CcAlgo,
    /// ABE（RFC 8511）：ECN 回退用更温和的系数
    pub abe: bool,
    /// ECN 运行模式（DCTCP 算法会强制为 Dctcp）
    pub ecn: EcnMode,
    /// 接收端点的 ECN 模式；None 表示与发送端相同。用于构造
    /// 两端模式不一致（classic/DCTCP 混用、对端关闭）的协商实验。
    pub ecn_receiver: Option<EcnMode>,
    /// 数据段使用 ECT(0) 还是 ECT(1)
    pub use_ect0: bool,
    /// DCTCP 估计增益 g
    pub dctcp_g: f64,
    /// DCTCP 初始 alpha
    pub dctcp_alpha_on_init: f64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        let mss = 1460;
        Self {
            mss,
            ack_bytes: 64,
            init_cwnd_bytes: mss * 10,
            init_ssthresh_bytes: mss.saturating_mul(1_000),
            init_rto: SimTime::from_micros(200),
            min_rto: SimTime::from_micros(200),
            max_rto: SimTime::from_millis(200),
            handshake: true,
            isn: SeqNum::ZERO,
            delayed_ack_count: 1,
            // 必须明显小于 RTO，否则尾部延迟 ACK 会触发伪重传。
            delayed_ack_timeout: SimTime::from_micros(100),
            cc: CcAlgo::LinuxReno,
            abe: false,
            ecn: EcnMode::Off,
            ecn_receiver: None,
            use_ect0: true,
            dctcp_g: 0.0625,
            dctcp_alpha_on_init: 1.0,
        }
    }
}

impl TcpConfig {
    pub fn validate(&self) -> Result<(), TcpConfigError> {
        if self.mss == 0 {
            return Err(TcpConfigError::Zero("mss"));
        }
        if self.delayed_ack_count == 0 {
            return Err(TcpConfigError::Zero("delayed_ack_count"));
        }
        if !(0.0..=1.0).contains(&self.dctcp_g) {
            return Err(TcpConfigError::OutOfRange {
                name: "dctcp_g",
                value: self.dctcp_g,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(0.0..=1.0).contains(&self.dctcp_alpha_on_init) {
            return Err(TcpConfigError::OutOfRange {
                name: "dctcp_alpha_on_init",
                value: self.dctcp_alpha_on_init,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}

fn make_cc(cfg: &TcpConfig) -> Box<dyn CongestionOps> {
    match cfg.cc {
        CcAlgo::LinuxReno => Box::new(LinuxReno::with_abe(cfg.abe)),
        CcAlgo::Cubic => Box::new(Cubic::with_abe(cfg.abe)),
        CcAlgo::Dctcp => Box::new(Dctcp::new(cfg.dctcp_g, cfg.dctcp_alpha_on_init, cfg.use_ect0)),
    }
}

/// 发送端点。
struct SenderEnd {
    tcb: CongState,
    cc: Box<dyn CongestionOps>,
    rate: TcpRateLinux,
    /// 重传账本：流内字节偏移 -> 段（偏移单调，序列号可回绕）
    ledger: BTreeMap<u64, TxItem>,
    next_off: u64,
    acked_off: u64,
    dup_acks: u32,
    rto: SimTime,
    rto_ev: Option<EventId>,
    /// Recovery/Loss 的退出点
    recover: SeqNum,
    min_rtt: SimTime,
    last_rtt: SimTime,
    lost_out: u32,
    retrans_out: u32,
    ecn_capable: bool,
}

/// 接收端点。
struct ReceiverEnd {
    tcb: CongState,
    cc: Box<dyn CongestionOps>,
    /// 已合并未确认的段数
    delack_segs: u32,
    delack_ev: Option<EventId>,
    ecn_capable: bool,
}

/// DCTCP 拥塞窗口采样（用于离线绘图）
#[derive(Debug, Clone)]
pub struct CwndSample {
    pub t_ns: u64,
    pub cwnd_bytes: u64,
    pub ssthresh_bytes: u64,
    pub alpha: Option<f64>,
    pub acked_bytes: u64,
}

pub struct TcpConn {
    pub id: TcpConnId,
    pub src: NodeId,
    pub dst: NodeId,
    pub fwd_route: Vec<NodeId>,
    pub rev_route: Vec<NodeId>,
    pub total_bytes: u64,
    pub cfg: TcpConfig,

    established: bool,
    snd: SenderEnd,
    rcv: ReceiverEnd,

    // stats
    start_at: Option<SimTime>,
    done_at: Option<SimTime>,
    cwnd_log: Option<Vec<CwndSample>>,
}

impl fmt::Debug for TcpConn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpConn")
            .field("id", &self.id)
            .field("src", &self.src)
            .field("dst", &self.dst)
            .field("total_bytes", &self.total_bytes)
            .field("established", &self.established)
            .field("cwnd", &self.snd.tcb.cwnd)
            .field("cc", &self.snd.cc.name())
            .finish()
    }
}

impl TcpConn {
    pub fn new(
        id: TcpConnId,
        src: NodeId,
        dst: NodeId,
        fwd_route: Vec<NodeId>,
        total_bytes: u64,
        cfg: TcpConfig,
    ) -> Result<Self, TcpConfigError> {
        cfg.validate()?;

        let mut rev_route = fwd_route.clone();
        rev_route.reverse();

        let cwnd = cfg.init_cwnd_bytes.max(cfg.mss);
        let ssthresh = cfg.init_ssthresh_bytes.max(cfg.mss);
        let ect = if cfg.use_ect0 {
            EctCodepoint::Ect0
        } else {
            EctCodepoint::Ect1
        };

        let mut snd_tcb = CongState::new(cwnd, ssthresh, cfg.mss, cfg.isn);
        snd_tcb.use_ecn = cfg.ecn;
        snd_tcb.ect = ect;
        let mut snd_cc = make_cc(&cfg);
        // init 只跑一次；DCTCP 在这里强制模式与码点。
        snd_cc.init(&mut snd_tcb);

        let mut rcv_tcb = CongState::new(cwnd, ssthresh, cfg.mss, cfg.isn);
        rcv_tcb.use_ecn = cfg.ecn_receiver.unwrap_or(snd_tcb.use_ecn);
        rcv_tcb.ect = snd_tcb.ect;
        // 接收端点派生自同一个策略（显式深拷贝）。
        let rcv_cc = snd_cc.fork();

        let established = !cfg.handshake;
        // 跳过握手时，两端模式都非 Off 才算协商成功。
        let capable =
            established && snd_tcb.use_ecn != EcnMode::Off && rcv_tcb.use_ecn != EcnMode::Off;
        let mut snd = SenderEnd {
            tcb: snd_tcb,
            cc: snd_cc,
            rate: TcpRateLinux::default(),
            ledger: BTreeMap::new(),
            next_off: 0,
            acked_off: 0,
            dup_acks: 0,
            rto: cfg.init_rto.max(cfg.min_rto),
            rto_ev: None,
            recover: cfg.isn,
            min_rtt: SimTime::ZERO,
            last_rtt: SimTime::ZERO,
            lost_out: 0,
            retrans_out: 0,
            ecn_capable: capable,
        };
        let mut rcv = ReceiverEnd {
            tcb: rcv_tcb,
            cc: rcv_cc,
            delack_segs: 0,
            delack_ev: None,
            ecn_capable: capable,
        };
        if capable {
            snd.tcb.ecn_state = EcnState::Idle;
            rcv.tcb.ecn_state = EcnState::Idle;
        }

        Ok(Self {
            id,
            src,
            dst,
            fwd_route,
            rev_route,
            total_bytes,
            cfg,
            established,
            snd,
            rcv,
            start_at: None,
            done_at: None,
            cwnd_log: None,
        })
    }

    pub fn bytes_acked(&self) -> u64 {
        self.snd.acked_off.min(self.total_bytes)
    }

    pub fn is_done(&self) -> bool {
        self.done_at.is_some()
    }

    pub fn start_time(&self) -> Option<SimTime> {
        self.start_at
    }

    pub fn done_time(&self) -> Option<SimTime> {
        self.done_at
    }

    /// 发送端点的共享状态（只读）。
    pub fn snd_state(&self) -> &CongState {
        &self.snd.tcb
    }

    /// 接收端点的共享状态（只读）。
    pub fn rcv_state(&self) -> &CongState {
        &self.rcv.tcb
    }

    pub fn cc_name(&self) -> &'static str {
        self.snd.cc.name()
    }

    /// DCTCP 的拥塞估计（其余算法为 None）。
    pub fn alpha(&self) -> Option<f64> {
        self.snd.cc.congestion_estimate()
    }

    pub fn min_rtt(&self) -> SimTime {
        self.snd.min_rtt
    }

    pub fn last_rtt(&self) -> SimTime {
        self.snd.last_rtt
    }

    pub fn enable_cwnd_log(&mut self) {
        self.cwnd_log = Some(Vec::new());
    }

    pub fn cwnd_samples(&self) -> Option<&[CwndSample]> {
        self.cwnd_log.as_deref()
    }

    fn inflight_bytes(&self) -> u64 {
        self.snd.ledger.values().map(|s| s.seq_size() as u64).sum()
    }

    /// 流内偏移对应的线序号（自然回绕）。
    fn seq_at(&self, off: u64) -> SeqNum {
        self.cfg.isn + off as u32
    }

    pub(crate) fn record_cwnd(&mut self, now: SimTime) {
        let alpha = self.snd.cc.congestion_estimate();
        let Some(log) = &mut self.cwnd_log else {
            return;
        };
        log.push(CwndSample {
            t_ns: now.0,
            cwnd_bytes: self.snd.tcb.cwnd as u64,
            ssthresh_bytes: self.snd.tcb.ssthresh as u64,
            alpha,
            acked_bytes: self.snd.acked_off,
        });
    }

    fn viz_state(&mut self, now: SimTime, net: &mut dyn NetApi) {
        self.record_cwnd(now);
        net.viz_cwnd(
            now.0,
            self.id,
            self.snd.tcb.cwnd as u64,
            self.snd.tcb.ssthresh as u64,
            self.inflight_bytes(),
            self.snd.tcb.cong.as_str(),
            self.snd.cc.congestion_estimate(),
        );
    }

    /// 发送端记录收到的 ECE 回显。回退本身发生在发送路径
    /// （见 `send_data_if_possible` 的 CWR 判定）。
    fn note_ecn_echo(&mut self, ack: SeqNum, now: SimTime, net: &mut dyn NetApi) {
        if !self.snd.ecn_capable {
            return;
        }
        self.snd.tcb.ecn_echo_seq = ack;
        if self.snd.tcb.ecn_state != EcnState::EceRcvd {
            self.snd.tcb.ecn_state = EcnState::EceRcvd;
            net.viz_ecn_state(now.0, self.id, "sender", self.snd.tcb.ecn_state.as_str());
        }
    }

    /// 发送路径上的 CWR 判定：看到 ECE、且这个窗口还没回退过
    /// （`ecn_echo_seq > ecn_cwr_seq`）、且不在回退/恢复阶段时，
    /// 在即将发出的数据段（序列 `seq`，非重传）上置 CWR。
    /// ssthresh 在这里算定；cwnd 要等 CWR 点被确认时才落下去。
    fn check_enter_cwr(&mut self, seq: SeqNum, now: SimTime, net: &mut dyn NetApi) -> bool {
        if self.snd.tcb.ecn_state != EcnState::EceRcvd {
            return false;
        }
        let new_window = self.snd.tcb.ecn_echo_seq.diff(self.snd.tcb.ecn_cwr_seq) > 0;
        let phase_ok = matches!(self.snd.tcb.cong, CongPhase::Open | CongPhase::Disorder);
        if !(new_window && phase_ok) {
            return false;
        }

        let ss = self
            .snd
            .cc
            .ss_thresh(&self.snd.tcb, self.snd.tcb.bytes_in_flight);
        self.snd.tcb.ssthresh = ss;
        self.snd.tcb.cong = CongPhase::Cwr;
        self.snd.tcb.ecn_cwr_seq = seq;
        self.snd.tcb.ecn_state = EcnState::CwrSent;
        debug!(
            conn_id = self.id,
            ssthresh = ss,
            cwr_seq = %seq,
            "ECE 回退：CWR 标记（本窗口一次）"
        );
        net.viz_ecn_state(now.0, self.id, "sender", self.snd.tcb.ecn_state.as_str());
        self.viz_state(now, net);
        true
    }
}

#[derive(Default)]
pub struct TcpStack {
    conns: HashMap<TcpConnId, TcpConn>,
    done_callbacks: HashMap<TcpConnId, TcpDoneCallback>,
}

impl fmt::Debug for TcpStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpStack")
            .field("conns", &self.conns)
            .field("done_callbacks", &self.done_callbacks.len())
            .finish()
    }
}

/// DCTCP 的 CE 迁移回调：用接收端当前（可能被回拨过的）接收指针
/// 立即发出一个空 ACK。
struct ReceiverAckHost<'a, 'b> {
    net: &'a mut dyn NetApi,
    sim: &'b mut Simulator,
    conn_id: TcpConnId,
    from: NodeId,
    route: Vec<NodeId>,
    ack_bytes: u32,
    ctrl_ecn: Ecn,
}

impl AckHost for ReceiverAckHost<'_, '_> {
    fn send_empty_ack(&mut self, tcb: &CongState, ece: bool) {
        let mut pkt = self
            .net
            .make_packet(self.conn_id, self.ack_bytes, self.route.clone());
        pkt.size_bytes = self.ack_bytes;
        pkt.transport = Transport::Tcp(TcpSegment::Ack {
            ack: tcb.rx_next,
            ece,
        });
        pkt.ecn = self.ctrl_ecn;
        self.net
            .viz_tcp_send_ack(self.sim.now().0, self.conn_id, tcb.rx_next.0, ece);
        self.net.forward_from(self.from, pkt, self.sim);
    }
}

impl TcpStack {
    pub fn insert(&mut self, conn: TcpConn) {
        self.conns.insert(conn.id, conn);
    }

    pub fn set_done_callback(&mut self, id: TcpConnId, cb: TcpDoneCallback) {
        self.done_callbacks.insert(id, cb);
    }

    pub fn get(&self, id: TcpConnId) -> Option<&TcpConn> {
        self.conns.get(&id)
    }

    pub fn get_mut(&mut self, id: TcpConnId) -> Option<&mut TcpConn> {
        self.conns.get_mut(&id)
    }

    /// Insert a connection, record the initial state, and start it
    /// (handshake first when enabled).
    pub fn start_conn(&mut self, conn: TcpConn, sim: &mut Simulator, net: &mut dyn NetApi) {
        let id = conn.id;
        let handshake = conn.cfg.handshake;
        self.insert(conn);
        if let Some(c) = self.get_mut(id) {
            let now = sim.now();
            c.viz_state(now, net);
            let state = c.snd.tcb.ecn_state.as_str();
            net.viz_ecn_state(now.0, id, "sender", state);
        }
        if handshake {
            self.send_syn(id, sim, net);
        } else {
            self.send_data_if_possible(id, sim, net);
        }
    }

    fn send_syn(&mut self, id: TcpConnId, sim: &mut Simulator, net: &mut dyn NetApi) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if conn.start_at.is_none() {
            conn.start_at = Some(sim.now());
        }
        let mode = conn.snd.tcb.use_ecn;
        let (ece, cwr) = ecn::syn_flags(mode);
        let mut pkt = net.make_packet(conn.id, conn.cfg.ack_bytes, conn.fwd_route.clone());
        pkt.size_bytes = conn.cfg.ack_bytes;
        pkt.transport = Transport::Tcp(TcpSegment::Syn { ece, cwr });
        // SYN 的 IP 标记只看本端意愿（DCTCP 连控制段一起标）。
        pkt.ecn = ecn::control_ect(mode, conn.snd.tcb.ect);
        debug!(conn_id = id, ece, cwr, "发送 SYN");
        net.forward_from(conn.src, pkt, sim);
    }

    pub(crate) fn send_data_if_possible(
        &mut self,
        id: TcpConnId,
        sim: &mut Simulator,
        net: &mut dyn NetApi,
    ) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if conn.done_at.is_some() || !conn.established {
            return;
        }

        if conn.start_at.is_none() {
            conn.start_at = Some(sim.now());
        }

        let now = sim.now();
        let mss = conn.cfg.mss;

        loop {
            let inflight = conn.inflight_bytes();
            conn.snd.tcb.bytes_in_flight = inflight as u32;
            let avail = conn.snd.tcb.cwnd.saturating_sub(inflight as u32) as u64;
            let remain = conn.total_bytes.saturating_sub(conn.snd.next_off);
            let len = (mss as u64).min(remain).min(avail) as u32;
            if len == 0 {
                break;
            }

            let off = conn.snd.next_off;
            let seq = conn.seq_at(off);

            let mut item = TxItem::new(seq, len);
            conn.snd.rate.skb_sent(&mut item, now, inflight == 0);

            let ect = ecn::data_ect(conn.snd.ecn_capable, false, conn.snd.tcb.ect);
            if ect.is_ect() && conn.snd.tcb.ecn_state == EcnState::Idle {
                conn.snd.tcb.ecn_state = EcnState::EctSent;
                net.viz_ecn_state(now.0, id, "sender", conn.snd.tcb.ecn_state.as_str());
            }
            let cwr = conn.check_enter_cwr(seq, now, net);

            conn.snd.ledger.insert(off, item);
            conn.snd.next_off += len as u64;
            conn.snd.tcb.next_tx_seq = conn.seq_at(conn.snd.next_off);
            if conn.snd.tcb.next_tx_seq > conn.snd.tcb.high_tx_mark {
                conn.snd.tcb.high_tx_mark = conn.snd.tcb.next_tx_seq;
            }

            let mut pkt = net.make_packet(conn.id, mss, conn.fwd_route.clone());
            pkt.size_bytes = mss; // 包大小按 mss 计（简化）
            pkt.transport = Transport::Tcp(TcpSegment::Data { seq, len, cwr });
            pkt.ecn = ect;

            net.viz_tcp_send_data(now.0, conn.id, seq.0, len, false, ect.is_ect());

            // 有在途数据且定时器未武装时，武装 RTO。
            if conn.snd.rto_ev.is_none() {
                conn.snd.rto_ev = Some(sim.schedule_in(conn.snd.rto, TcpRto { conn_id: id }));
            }

            net.forward_from(conn.src, pkt, sim);
        }

        // 发不满窗口且没有数据排队：记应用受限界标。
        let inflight = conn.inflight_bytes() as u32;
        conn.snd.tcb.bytes_in_flight = inflight;
        let tail = conn.seq_at(conn.total_bytes);
        conn.snd.rate.calculate_app_limited(
            conn.snd.tcb.cwnd,
            inflight,
            mss,
            tail,
            conn.snd.tcb.next_tx_seq,
            conn.snd.lost_out,
            conn.snd.retrans_out,
        );
    }

    fn send_ack(
        &mut self,
        id: TcpConnId,
        ece: bool,
        sim: &mut Simulator,
        net: &mut dyn NetApi,
    ) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        let ack = conn.rcv.tcb.rx_next;
        let mode = conn.rcv.tcb.use_ecn;
        let mut pkt = net.make_packet(conn.id, conn.cfg.ack_bytes, conn.rev_route.clone());
        pkt.size_bytes = conn.cfg.ack_bytes;
        pkt.transport = Transport::Tcp(TcpSegment::Ack { ack, ece });
        pkt.ecn = if conn.rcv.ecn_capable {
            ecn::control_ect(mode, conn.rcv.tcb.ect)
        } else {
            Ecn::NotEct
        };

        // 第一次带 ECE 的 ACK 之后进入持续回显状态。
        if ece && conn.rcv.tcb.ecn_state == EcnState::EceRcvd {
            conn.rcv.tcb.ecn_state = EcnState::SendingEce;
            net.viz_ecn_state(sim.now().0, id, "receiver", conn.rcv.tcb.ecn_state.as_str());
        }

        net.viz_tcp_send_ack(sim.now().0, conn.id, ack.0, ece);
        net.forward_from(conn.dst, pkt, sim);
    }

    /// 传输层入口：包在 `at` 节点被判定 delivered 后调用。
    pub fn on_segment(
        &mut self,
        conn_id: TcpConnId,
        at: NodeId,
        seg: TcpSegment,
        ip_ecn: Ecn,
        sim: &mut Simulator,
        net: &mut dyn NetApi,
    ) {
        match seg {
            TcpSegment::Syn { ece, cwr } => self.on_syn(conn_id, at, ece, cwr, sim, net),
            TcpSegment::SynAck { ece } => self.on_synack(conn_id, at, ece, ip_ecn, sim, net),
            TcpSegment::HandshakeAck => {}
            TcpSegment::Data { seq, len, cwr } => {
                self.on_data(conn_id, at, seq, len, cwr, ip_ecn, sim, net)
            }
            TcpSegment::Ack { ack, ece } => self.on_ack(conn_id, at, ack, ece, sim, net),
        }
    }

    fn on_syn(
        &mut self,
        conn_id: TcpConnId,
        at: NodeId,
        ece: bool,
        cwr: bool,
        sim: &mut Simulator,
        net: &mut dyn NetApi,
    ) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        if at != conn.dst {
            return;
        }
        let mode = conn.rcv.tcb.use_ecn;
        let capable = ecn::accepts_syn(mode, ece, cwr);
        conn.rcv.ecn_capable = capable;
        conn.rcv.tcb.ecn_state = if capable {
            EcnState::Idle
        } else {
            EcnState::Disabled
        };
        net.viz_ecn_state(
            sim.now().0,
            conn_id,
            "receiver",
            conn.rcv.tcb.ecn_state.as_str(),
        );

        let mut pkt = net.make_packet(conn.id, conn.cfg.ack_bytes, conn.rev_route.clone());
        pkt.size_bytes = conn.cfg.ack_bytes;
        pkt.transport = Transport::Tcp(TcpSegment::SynAck { ece: capable });
        pkt.ecn = if capable {
            ecn::control_ect(mode, conn.rcv.tcb.ect)
        } else {
            Ecn::NotEct
        };
        debug!(conn_id, capable, "SYN-ACK 响应");
        net.forward_from(conn.dst, pkt, sim);
    }

    fn on_synack(
        &mut self,
        conn_id: TcpConnId,
        at: NodeId,
        ece: bool,
        ip_ecn: Ecn,
        sim: &mut Simulator,
        net: &mut dyn NetApi,
    ) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        if at != conn.src {
            return;
        }
        let now = sim.now();
        let mode = conn.snd.tcb.use_ecn;
        let neg = ecn::on_synack(mode, ece, ip_ecn);
        conn.snd.ecn_capable = neg.capable;
        conn.snd.tcb.ecn_state = if neg.capable {
            EcnState::Idle
        } else {
            EcnState::Disabled
        };
        net.viz_ecn_state(now.0, conn_id, "sender", conn.snd.tcb.ecn_state.as_str());

        if neg.collapse_initial_window {
            // CE 标记的 SYN-ACK：try 模式把初始窗口塌缩到一个段。
            conn.snd.tcb.cwnd = conn.cfg.mss;
            debug!(conn_id, "SYN-ACK 带 CE，初始窗口塌缩");
            conn.viz_state(now, net);
        }

        conn.established = true;

        let mut pkt = net.make_packet(conn.id, conn.cfg.ack_bytes, conn.fwd_route.clone());
        pkt.size_bytes = conn.cfg.ack_bytes;
        pkt.transport = Transport::Tcp(TcpSegment::HandshakeAck);
        pkt.ecn = if neg.capable {
            ecn::control_ect(mode, conn.snd.tcb.ect)
        } else {
            Ecn::NotEct
        };
        net.forward_from(conn.src, pkt, sim);

        self.send_data_if_possible(conn_id, sim, net);
    }

    #[allow(clippy::too_many_arguments)]
    fn on_data(
        &mut self,
        conn_id: TcpConnId,
        at: NodeId,
        seq: SeqNum,
        len: u32,
        cwr: bool,
        ip_ecn: Ecn,
        sim: &mut Simulator,
        net: &mut dyn NetApi,
    ) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        if at != conn.dst {
            return;
        }
        let now = sim.now();

        // 1) ECN：先于接收指针推进处理，让 CE 迁移点对齐 CE 首包。
        if conn.rcv.ecn_capable {
            match conn.rcv.tcb.use_ecn {
                EcnMode::Dctcp => {
                    let flip = if ip_ecn.is_ce() {
                        (!conn.rcv.tcb.echoing_ece()).then_some(CaEvent::EcnIsCe)
                    } else {
                        conn.rcv.tcb.echoing_ece().then_some(CaEvent::EcnNoCe)
                    };
                    if let Some(ev) = flip {
                        let prev = conn.rcv.tcb.ecn_state;
                        let mut host = ReceiverAckHost {
                            net: &mut *net,
                            sim: &mut *sim,
                            conn_id,
                            from: conn.dst,
                            route: conn.rev_route.clone(),
                            ack_bytes: conn.cfg.ack_bytes,
                            ctrl_ecn: ecn::control_ect(EcnMode::Dctcp, conn.rcv.tcb.ect),
                        };
                        conn.rcv.cc.cwnd_event(&mut conn.rcv.tcb, ev, &mut host);
                        if conn.rcv.tcb.ecn_state != prev {
                            net.viz_ecn_state(
                                now.0,
                                conn_id,
                                "receiver",
                                conn.rcv.tcb.ecn_state.as_str(),
                            );
                        }
                    }
                }
                _ => {
                    // 经典路径：CE 拉起回显；没有 CWR 之前不松手，
                    // 新的 CE 随时重新拉起。
                    if ip_ecn.is_ce() && !conn.rcv.tcb.echoing_ece() {
                        conn.rcv.tcb.ecn_state = EcnState::EceRcvd;
                        net.viz_ecn_state(
                            now.0,
                            conn_id,
                            "receiver",
                            conn.rcv.tcb.ecn_state.as_str(),
                        );
                    }
                    if cwr && conn.rcv.tcb.echoing_ece() {
                        conn.rcv.tcb.ecn_state = EcnState::Idle;
                        net.viz_ecn_state(
                            now.0,
                            conn_id,
                            "receiver",
                            conn.rcv.tcb.ecn_state.as_str(),
                        );
                    }
                }
            }
        }

        // 2) 序列推进（只接受按序段；乱序立即 dup ACK）。
        let in_order = seq == conn.rcv.tcb.rx_next;
        if in_order {
            conn.rcv.tcb.rx_next = seq + len.max(1);
        }

        // 3) ACK 策略：乱序立即、合并数未满则延迟。
        let ece = conn.rcv.ecn_capable && conn.rcv.tcb.echoing_ece();
        let delay = in_order && conn.cfg.delayed_ack_count > 1;
        if delay {
            conn.rcv.delack_segs += 1;
            if conn.rcv.delack_segs < conn.cfg.delayed_ack_count {
                if conn.rcv.delack_ev.is_none() {
                    conn.rcv.delack_ev = Some(
                        sim.schedule_in(conn.cfg.delayed_ack_timeout, TcpDelAck { conn_id }),
                    );
                }
                conn.rcv
                    .cc
                    .cwnd_event(&mut conn.rcv.tcb, CaEvent::DelayedAck, &mut NullAckHost);
                return;
            }
        }

        conn.rcv.delack_segs = 0;
        if let Some(ev) = conn.rcv.delack_ev.take() {
            sim.cancel(ev);
        }
        conn.rcv
            .cc
            .cwnd_event(&mut conn.rcv.tcb, CaEvent::NonDelayedAck, &mut NullAckHost);
        let _ = conn;
        self.send_ack(conn_id, ece, sim, net);
    }

    fn on_ack(
        &mut self,
        conn_id: TcpConnId,
        at: NodeId,
        ack: SeqNum,
        ece: bool,
        sim: &mut Simulator,
        net: &mut dyn NetApi,
    ) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        if at != conn.src {
            return;
        }
        let now = sim.now();
        let mss = conn.cfg.mss;

        net.viz_tcp_recv_ack(now.0, conn.id, ack.0, ece);

        let prior_in_flight = conn.inflight_bytes() as u32;
        let newly = ack.diff(conn.snd.tcb.last_acked_seq);

        if newly > 0 {
            let newly = newly as u64;
            conn.snd.dup_acks = 0;

            // 账本清理：完全覆盖的段交付给速率估计；RTT 用最后一个
            // 非重传段采样（Karn 规则）。
            let end_off = conn.snd.acked_off + newly;
            let mut acked_sacked: u32 = 0;
            let mut rtt_sample = SimTime::ZERO;
            let mut to_remove = Vec::new();
            for (&off, item) in conn.snd.ledger.iter() {
                if off + item.seq_size() as u64 <= end_off {
                    to_remove.push(off);
                } else {
                    break;
                }
            }
            for off in to_remove {
                let mut item = conn.snd.ledger.remove(&off).expect("ledger entry");
                if item.retrans {
                    conn.snd.retrans_out = conn.snd.retrans_out.saturating_sub(1);
                    if item.lost {
                        conn.snd.lost_out = conn.snd.lost_out.saturating_sub(1);
                    }
                } else {
                    rtt_sample = now.saturating_sub(item.last_sent);
                }
                acked_sacked = acked_sacked.saturating_add(item.seq_size());
                conn.snd.rate.skb_delivered(&mut item, now);
            }
            conn.snd.acked_off = end_off;
            conn.snd.tcb.last_acked_seq = ack;

            if !rtt_sample.is_zero() {
                conn.snd.last_rtt = rtt_sample;
                if conn.snd.min_rtt.is_zero() || rtt_sample < conn.snd.min_rtt {
                    conn.snd.min_rtt = rtt_sample;
                }
            }

            // ECE 回显记录；没有 ECE 的 ACK 把状态放回 Idle（DCTCP 的
            // 标记字节统计依赖逐 ACK 的状态）。真正的回退在发送路径。
            if ece {
                conn.note_ecn_echo(ack, now, net);
            } else if conn.snd.tcb.ecn_state == EcnState::EceRcvd {
                conn.snd.tcb.ecn_state = EcnState::Idle;
                net.viz_ecn_state(now.0, conn_id, "sender", conn.snd.tcb.ecn_state.as_str());
            }

            // 状态机出口。
            match conn.snd.tcb.cong {
                CongPhase::Recovery if ack.diff(conn.snd.recover) >= 0 => {
                    // 退出恢复：窗口收到 ssthresh（去充气）。
                    conn.snd.tcb.cwnd = conn.snd.tcb.ssthresh;
                    conn.snd.tcb.cong = CongPhase::Open;
                }
                CongPhase::Loss if ack.diff(conn.snd.recover) >= 0 => {
                    conn.snd.tcb.cong = CongPhase::Open;
                }
                CongPhase::Cwr if ack.diff(conn.snd.tcb.ecn_cwr_seq) > 0 => {
                    // CWR 点被确认：窗口这时才落到 ssthresh（不低于两个段）。
                    conn.snd.tcb.cwnd = conn.snd.tcb.ssthresh.max(2 * mss);
                    conn.snd.tcb.cong = CongPhase::Open;
                    conn.snd
                        .cc
                        .cwnd_event(&mut conn.snd.tcb, CaEvent::CompleteCwr, &mut NullAckHost);
                }
                CongPhase::Disorder => {
                    conn.snd.tcb.cong = CongPhase::Open;
                }
                _ => {}
            }

            // RTO：取消并按剩余在途重新武装；确认推进时退避复位。
            if let Some(ev) = conn.snd.rto_ev.take() {
                sim.cancel(ev);
            }
            conn.snd.rto = conn.cfg.init_rto.max(conn.cfg.min_rto);
            if !conn.snd.ledger.is_empty() {
                conn.snd.rto_ev = Some(sim.schedule_in(conn.snd.rto, TcpRto { conn_id }));
            }

            // 拥塞控制钩子。
            conn.snd.tcb.bytes_in_flight = conn.inflight_bytes() as u32;
            let segs = ((newly as u32) / mss).max(1);
            conn.snd.cc.pkts_acked(&mut conn.snd.tcb, segs, rtt_sample);
            if let Some(est) = conn.snd.cc.take_estimate() {
                net.viz_cong_estimate(now.0, conn.id, est.alpha, est.ecn_ratio);
            }
            if conn.snd.tcb.cong == CongPhase::Open {
                conn.snd.cc.increase_window(&mut conn.snd.tcb, segs, now);
            }
            conn.viz_state(now, net);

            // 交付速率样本。
            let rs = conn.snd.rate.generate_sample(
                acked_sacked,
                0,
                false,
                prior_in_flight,
                conn.snd.min_rtt,
            );
            if rs.is_valid() {
                net.viz_rate_sample(
                    now.0,
                    conn.id,
                    rs.delivery_rate_bps,
                    rs.interval.0,
                    rs.delivered,
                    rs.is_app_limited,
                );
            }

            // 完成判定：所有数据都被累计确认。
            if conn.snd.acked_off >= conn.total_bytes && conn.done_at.is_none() {
                conn.done_at = Some(now);
                if let Some(ev) = conn.snd.rto_ev.take() {
                    sim.cancel(ev);
                }
                let done_cb = self.done_callbacks.remove(&conn_id);
                if let Some(cb) = done_cb {
                    cb(conn_id, now, sim);
                }
                return;
            }

            // 恢复期内的部分确认：立即重传下一个空洞。
            let partial_recovery = matches!(
                conn.snd.tcb.cong,
                CongPhase::Recovery | CongPhase::Loss
            );
            let _ = conn;
            if partial_recovery {
                self.retransmit_earliest(conn_id, false, sim, net);
            }
            self.send_data_if_possible(conn_id, sim, net);
        } else if newly == 0 {
            // dupACK
            conn.snd.dup_acks = conn.snd.dup_acks.saturating_add(1);
            if conn.snd.tcb.cong == CongPhase::Open {
                conn.snd.tcb.cong = CongPhase::Disorder;
            }
            if ece {
                conn.note_ecn_echo(ack, now, net);
            }

            let dup = conn.snd.dup_acks;
            if dup == 3 {
                // 快速重传。窗口只在首次进入恢复时缩一次；恢复期间
                // 对后续空洞的重传不再叠加缩窗。
                if !matches!(conn.snd.tcb.cong, CongPhase::Recovery | CongPhase::Loss) {
                    let ss = conn.snd.cc.ss_thresh(&conn.snd.tcb, prior_in_flight);
                    conn.snd.tcb.ssthresh = ss;
                    conn.snd.tcb.cwnd = ss.saturating_add(3 * mss);
                    conn.snd.tcb.cong = CongPhase::Recovery;
                    conn.snd.recover = conn.snd.tcb.high_tx_mark;
                    conn.viz_state(now, net);
                }
                let _ = conn;
                self.retransmit_earliest(conn_id, false, sim, net);
            } else if dup > 3 {
                conn.snd.tcb.cwnd = conn.snd.tcb.cwnd.saturating_add(mss);
                conn.viz_state(now, net);
                let _ = conn;
                self.send_data_if_possible(conn_id, sim, net);
            }
        }
    }

    /// 重传最早未确认段。重传段从不带 ECT 标记，速率快照按重传时刻
    /// 重新盖章。
    fn retransmit_earliest(
        &mut self,
        conn_id: TcpConnId,
        mark_lost: bool,
        sim: &mut Simulator,
        net: &mut dyn NetApi,
    ) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        let now = sim.now();
        let mss = conn.cfg.mss;
        let Some((&off, _)) = conn.snd.ledger.iter().next() else {
            return;
        };
        let inflight = conn.inflight_bytes();
        let item = conn.snd.ledger.get_mut(&off).expect("earliest entry");
        if !item.retrans {
            conn.snd.retrans_out += 1;
        }
        item.retrans = true;
        if mark_lost && !item.lost {
            item.lost = true;
            conn.snd.lost_out += 1;
        }
        let seq = item.start_seq;
        let len = item.len();
        // 重传也要重新盖速率快照（账目以最后一次发送为准）。
        conn.snd.rate.skb_sent(item, now, inflight == 0);

        let mut pkt = net.make_packet(conn.id, mss, conn.fwd_route.clone());
        pkt.size_bytes = mss;
        pkt.transport = Transport::Tcp(TcpSegment::Data {
            seq,
            len,
            cwr: false,
        });
        pkt.ecn = ecn::data_ect(conn.snd.ecn_capable, true, conn.snd.tcb.ect);

        net.viz_tcp_send_data(now.0, conn.id, seq.0, len, true, false);
        net.forward_from(conn.src, pkt, sim);
    }

    /// RTO 超时：进入 Loss，窗口收到一个段，重传最早未确认段。
    pub(crate) fn on_rto(&mut self, conn_id: TcpConnId, sim: &mut Simulator, net: &mut dyn NetApi) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        conn.snd.rto_ev = None;
        if conn.done_at.is_some() || conn.snd.ledger.is_empty() {
            return;
        }
        let now = sim.now();
        let mss = conn.cfg.mss;
        let earliest = *conn.snd.ledger.keys().next().expect("non-empty ledger");
        let seq = conn.seq_at(earliest);

        net.viz_tcp_rto(now.0, conn_id, seq.0);

        conn.snd.tcb.bytes_in_flight = conn.inflight_bytes() as u32;
        let inflight = conn.snd.tcb.bytes_in_flight;
        let ss = conn.snd.cc.ss_thresh(&conn.snd.tcb, inflight);
        conn.snd.tcb.ssthresh = ss;
        conn.snd.tcb.cwnd = mss;
        conn.snd.tcb.cong = CongPhase::Loss;
        conn.snd.recover = conn.snd.tcb.high_tx_mark;
        conn.snd.dup_acks = 0;
        conn.snd
            .cc
            .cwnd_event(&mut conn.snd.tcb, CaEvent::Loss, &mut NullAckHost);

        // 指数退避。
        conn.snd.rto = SimTime(
            conn.snd
                .rto
                .0
                .saturating_mul(2)
                .min(conn.cfg.max_rto.0)
                .max(conn.cfg.min_rto.0),
        );
        conn.snd.rto_ev = Some(sim.schedule_in(conn.snd.rto, TcpRto { conn_id }));

        conn.viz_state(now, net);
        let _ = conn;
        self.retransmit_earliest(conn_id, true, sim, net);
    }

    /// 延迟 ACK 定时器到期：把攒着的确认发出去。
    pub(crate) fn on_delack(
        &mut self,
        conn_id: TcpConnId,
        sim: &mut Simulator,
        net: &mut dyn NetApi,
    ) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        conn.rcv.delack_ev = None;
        if conn.rcv.delack_segs == 0 {
            return;
        }
        conn.rcv.delack_segs = 0;
        let ece = conn.rcv.ecn_capable && conn.rcv.tcb.echoing_ece();
        conn.rcv
            .cc
            .cwnd_event(&mut conn.rcv.tcb, CaEvent::NonDelayedAck, &mut NullAckHost);
        let _ = conn;
        self.send_ack(conn_id, ece, sim, net);
    }
}

/// 启动一个 TCP 流。
#[derive(Debug)]
pub struct TcpStart {
    pub conn: TcpConn,
}

impl Event for TcpStart {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpStart { conn } = *self;
        with_tcp_stack(world, |net, tcp| {
            tcp.start_conn(conn, sim, net);
        });
    }
}

/// RTO 超时事件。ACK 推进时旧定时器会被取消，到这里的都是真超时。
#[derive(Debug)]
pub struct TcpRto {
    pub conn_id: TcpConnId,
}

impl Event for TcpRto {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpRto { conn_id } = *self;
        with_tcp_stack(world, |net, tcp| {
            tcp.on_rto(conn_id, sim, net);
        });
    }
}

/// 延迟 ACK 超时事件。
#[derive(Debug)]
pub struct TcpDelAck {
    pub conn_id: TcpConnId,
}

impl Event for TcpDelAck {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpDelAck { conn_id } = *self;
        with_tcp_stack(world, |net, tcp| {
            tcp.on_delack(conn_id, sim, net);
        });
    }
}

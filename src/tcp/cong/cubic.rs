//! CUBIC congestion control (RFC 8312), kept compact: Reno-style slow
//! start, cubic growth in congestion avoidance, no HyStart.
//!
//! Backoff uses `beta = 0.7`, or `0.85` for an ECN-signaled backoff when
//! ABE (RFC 8511) is enabled.

use super::super::state::{CaEvent, CongState, EcnState};
use super::{AckHost, CongestionOps};
use crate::sim::SimTime;
use tracing::debug;

/// Cubic scaling constant (RFC 8312 section 4.1).
const C: f64 = 0.4;
const BETA: f64 = 0.7;
/// RFC 8511 suggests a milder multiplicative decrease for ECN with CUBIC.
const BETA_ECN: f64 = 0.85;

#[derive(Debug, Clone, Default)]
pub struct Cubic {
    abe: bool,
    /// Window (in segments) right before the last reduction.
    w_max: f64,
    /// Time offset (seconds) at which the cubic function regains `w_max`.
    k: f64,
    /// Start of the current congestion-avoidance epoch.
    epoch_start: Option<SimTime>,
    /// Fractional acked-segment accumulator, same role as Reno's counter.
    cwnd_cnt: f64,
}

impl Cubic {
    pub fn new() -> Cubic {
        Cubic::default()
    }

    pub fn with_abe(abe: bool) -> Cubic {
        Cubic {
            abe,
            ..Cubic::default()
        }
    }

    fn beta(&self, tcb: &CongState) -> f64 {
        if self.abe && tcb.ecn_state == EcnState::EceRcvd {
            BETA_ECN
        } else {
            BETA
        }
    }

    fn reset_epoch(&mut self) {
        self.epoch_start = None;
        self.cwnd_cnt = 0.0;
    }
}

impl CongestionOps for Cubic {
    fn name(&self) -> &'static str {
        "cubic"
    }

    fn ss_thresh(&mut self, tcb: &CongState, _bytes_in_flight: u32) -> u32 {
        let beta = self.beta(tcb);
        self.w_max = (tcb.cwnd / tcb.seg_size) as f64;
        self.k = ((self.w_max * (1.0 - beta)) / C).cbrt();
        self.reset_epoch();
        // Truncate, don't round.
        let reduced = (tcb.cwnd as f64 * beta) as u32;
        reduced.max(2 * tcb.seg_size)
    }

    fn increase_window(&mut self, tcb: &mut CongState, segments_acked: u32, now: SimTime) {
        if segments_acked == 0 {
            return;
        }

        if tcb.in_slow_start() {
            tcb.cwnd = tcb
                .cwnd
                .saturating_add(segments_acked.saturating_mul(tcb.seg_size))
                .min(tcb.ssthresh);
            debug!(cwnd = tcb.cwnd, "cubic slow start");
            if tcb.in_slow_start() {
                return;
            }
        }

        if self.epoch_start.is_none() {
            // Fresh epoch without a prior reduction: treat the current
            // window as the plateau.
            if self.w_max == 0.0 {
                self.w_max = (tcb.cwnd / tcb.seg_size) as f64;
                self.k = 0.0;
            }
            self.epoch_start = Some(now);
        }
        let epoch = self.epoch_start.expect("epoch set above");

        let t = now.saturating_sub(epoch).as_secs_f64();
        let target = C * (t - self.k).powi(3) + self.w_max;
        let cwnd_seg = (tcb.cwnd / tcb.seg_size).max(1) as f64;

        // Segments to ack per one-segment growth; clamp the aggressive
        // region the same way the kernel does.
        let cnt = if target > cwnd_seg {
            (cwnd_seg / (target - cwnd_seg)).max(2.0)
        } else {
            100.0 * cwnd_seg
        };

        self.cwnd_cnt += segments_acked as f64;
        if self.cwnd_cnt >= cnt {
            self.cwnd_cnt -= cnt;
            tcb.cwnd = tcb.cwnd.saturating_add(tcb.seg_size);
            debug!(cwnd = tcb.cwnd, target, "cubic growth");
        }
    }

    fn cwnd_event(&mut self, _tcb: &mut CongState, ev: CaEvent, _host: &mut dyn AckHost) {
        if ev == CaEvent::Loss {
            self.reset_epoch();
        }
    }

    fn fork(&self) -> Box<dyn CongestionOps> {
        Box::new(self.clone())
    }
}

//! ECN negotiation and marking policy.
//!
//! Three negotiation flavors share one state machine (`EcnState`):
//!
//! - classic (RFC 3168): capability announced with ECE+CWR on the SYN,
//!   accepted with ECE on the SYN-ACK; control segments are never
//!   ECT-marked; the receiver echoes ECE until it sees CWR.
//! - DCTCP (RFC 8257): same handshake, but control segments carry ECT
//!   too and the receiver echoes the instantaneous CE state per packet.
//! - try: the TCP flags carry the capability announcement while IP-layer
//!   marking is withheld until negotiation completes; a CE mark on the
//!   SYN-ACK is acted upon (initial window collapse) instead of ignored.
//!
//! A peer that answers without ECE simply downgrades the connection to
//! the non-ECN path; a mixed classic/DCTCP pair negotiates successfully
//! and each side keeps its own echo discipline.

use super::state::{EcnMode, EctCodepoint};
use crate::net::Ecn;

/// Outcome of interpreting a SYN-ACK on the active side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcnNegotiated {
    /// Peer accepted the capability announcement.
    pub capable: bool,
    /// A CE-marked SYN-ACK in try mode: collapse the initial window to
    /// one segment before sending any data.
    pub collapse_initial_window: bool,
}

/// Flags `(ece, cwr)` for an outgoing SYN.
pub fn syn_flags(mode: EcnMode) -> (bool, bool) {
    match mode {
        EcnMode::Off => (false, false),
        _ => (true, true),
    }
}

/// Passive side: should the SYN-ACK accept the negotiation?
/// Requires both ECE and CWR on the SYN (RFC 3168 section 6.1.1).
pub fn accepts_syn(mode: EcnMode, syn_ece: bool, syn_cwr: bool) -> bool {
    mode != EcnMode::Off && syn_ece && syn_cwr
}

/// Active side: interpret the SYN-ACK (TCP flag plus its IP codepoint).
pub fn on_synack(mode: EcnMode, synack_ece: bool, ip_ecn: Ecn) -> EcnNegotiated {
    let capable = mode != EcnMode::Off && synack_ece;
    EcnNegotiated {
        capable,
        collapse_initial_window: capable && mode == EcnMode::Try && ip_ecn.is_ce(),
    }
}

/// IP codepoint for control segments (SYN, SYN-ACK, pure ACK).
/// Only DCTCP marks control segments; classic and try never do. The
/// caller gates on the negotiation outcome where one exists (the SYN is
/// sent before any outcome and is marked on willingness alone).
pub fn control_ect(mode: EcnMode, ect: EctCodepoint) -> Ecn {
    if mode == EcnMode::Dctcp {
        codepoint(ect)
    } else {
        Ecn::NotEct
    }
}

/// IP codepoint for a data segment. Retransmissions never carry ECT.
pub fn data_ect(negotiated: bool, is_retransmission: bool, ect: EctCodepoint) -> Ecn {
    if negotiated && !is_retransmission {
        codepoint(ect)
    } else {
        Ecn::NotEct
    }
}

fn codepoint(ect: EctCodepoint) -> Ecn {
    match ect {
        EctCodepoint::Ect0 => Ecn::Ect0,
        EctCodepoint::Ect1 => Ecn::Ect1,
    }
}

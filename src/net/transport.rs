//! Transport-layer tags carried by packets.

use crate::tcp::SeqNum;

/// Packet transport metadata.
///
/// `Packet` is a network-layer carrier; transport tags enable protocol simulation
/// without coupling the network to protocol implementations.
#[derive(Debug, Clone, Default)]
pub enum Transport {
    /// No transport metadata (default).
    #[default]
    None,
    /// TCP segment (simplified).
    Tcp(TcpSegment),
}

/// TCP segment (minimal fields for simulation).
///
/// Only the flags the congestion/ECN machinery consumes are modeled: SYN-side
/// ECE+CWR capability announcement, the ECE echo on ACKs and the CWR mark on
/// data segments. Header serialization stays out of scope.
#[derive(Debug, Clone)]
pub enum TcpSegment {
    /// SYN. `ece && cwr` announces ECN capability (RFC 3168 handshake).
    Syn { ece: bool, cwr: bool },
    /// SYN-ACK. `ece` alone accepts the ECN negotiation.
    SynAck { ece: bool },
    /// Final ACK of the three-way handshake.
    HandshakeAck,
    /// Data segment: `seq` is the 32-bit wire sequence number, `len` payload
    /// bytes. `cwr` acknowledges a received ECE echo (once per window).
    Data { seq: SeqNum, len: u32, cwr: bool },
    /// Cumulative ACK: `ack` is the next expected sequence number; `ece`
    /// echoes congestion back to the sender.
    Ack { ack: SeqNum, ece: bool },
}

impl TcpSegment {
    /// True for segments that occupy sequence space.
    pub fn is_data(&self) -> bool {
        matches!(self, TcpSegment::Data { .. })
    }
}

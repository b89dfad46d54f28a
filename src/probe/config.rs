use std::net::IpAddr;

use crate::chain::Protocol;

/// Bytes of random data carried by every echo request, as `ping` does.
pub const DEFAULT_PAYLOAD_SIZE: usize = 32;

/// What precedes the ICMP message in the buffers handed to
/// `ProbeEngine::on_receive`. Raw IPv4 sockets deliver the IP header, raw
/// ICMPv6 and datagram ICMP sockets do not. Outgoing requests are always
/// bare ICMP messages.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Framing {
    Ethernet,
    Ip,
    Icmp,
}

impl Framing {
    /// The stages a reply must consist of, given the IP and ICMP protocols
    /// of the strategy.
    pub fn stages(self, ip: Protocol, icmp: Protocol) -> Vec<Protocol> {
        match self {
            Framing::Ethernet => vec![Protocol::Ethernet, ip, icmp],
            Framing::Ip => vec![ip, icmp],
            Framing::Icmp => vec![icmp],
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Echo identifier of every request, and required of every reply.
    pub identifier: u16,
    pub payload_size: usize,
    /// Framing of received buffers. `None` picks what a raw socket of the
    /// strategy's family delivers.
    pub framing: Option<Framing>,
    /// Drop replies with a bad checksum.
    pub verify_checksums: bool,
    /// Local address. Only used to compute ICMPv6 checksums in userspace;
    /// without it the checksum is left to the kernel.
    pub source: Option<IpAddr>,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            identifier: std::process::id() as u16,
            payload_size: DEFAULT_PAYLOAD_SIZE,
            framing: None,
            verify_checksums: true,
            source: None,
        }
    }
}

use std::net::IpAddr;

use crate::chain::{ParseChain, Protocol};
use crate::icmp::{Echo, IcmpBuilder, Icmpv6Builder};
use crate::packet::build_packet;
use crate::{RxError, RxResult, TxResult};

use super::Framing;

/// The fields of an echo reply the engine needs to match and report it.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EchoReply {
    pub identifier: u16,
    pub sequence: u16,
    pub payload_len: usize,
    pub ttl: Option<u8>,
    pub source: Option<IpAddr>,
}

/// Everything about echo probing that depends on the IP version.
pub trait EchoStrategy {
    const REQUEST_TYPE: u8;
    const REPLY_TYPE: u8;
    const IP_PROTOCOL: Protocol;
    const ICMP_PROTOCOL: Protocol;
    /// What a raw socket of this family delivers.
    const DEFAULT_FRAMING: Framing;

    /// True if `target` is of the family this strategy probes.
    fn accepts(&self, target: &IpAddr) -> bool;

    /// Builds a complete echo request message, checksum included when it can
    /// be computed here.
    fn build_request(&self,
                     identifier: u16,
                     sequence: u16,
                     payload: &[u8],
                     source: Option<IpAddr>,
                     target: IpAddr)
                     -> TxResult<Vec<u8>>;

    /// Parses `buffer` as an echo reply. Anything else, including echo
    /// requests and ICMP errors, is `RxError::ProtocolMismatch`.
    fn parse_reply(&self, buffer: &[u8], framing: Framing, verify: bool) -> RxResult<EchoReply>;

    fn parser(&self, framing: Framing, verify: bool) -> ParseChain {
        let stages = framing.stages(Self::IP_PROTOCOL, Self::ICMP_PROTOCOL);
        ParseChain::new(stages[0]).expect(&stages).verify_checksums(verify)
    }
}

/// ICMP echo over IPv4.
#[derive(Debug, Clone, Copy, Default)]
pub struct Icmpv4Strategy;

impl EchoStrategy for Icmpv4Strategy {
    const REQUEST_TYPE: u8 = 8;
    const REPLY_TYPE: u8 = 0;
    const IP_PROTOCOL: Protocol = Protocol::Ipv4;
    const ICMP_PROTOCOL: Protocol = Protocol::Icmp;
    const DEFAULT_FRAMING: Framing = Framing::Ip;

    fn accepts(&self, target: &IpAddr) -> bool {
        target.is_ipv4()
    }

    fn build_request(&self,
                     identifier: u16,
                     sequence: u16,
                     payload: &[u8],
                     _source: Option<IpAddr>,
                     _target: IpAddr)
                     -> TxResult<Vec<u8>> {
        build_packet(&mut IcmpBuilder::new(Echo::request(identifier, sequence, payload)))
    }

    fn parse_reply(&self, buffer: &[u8], framing: Framing, verify: bool) -> RxResult<EchoReply> {
        let chain = self.parser(framing, verify).parse(buffer)?;
        let icmp = chain.icmp().ok_or(RxError::ProtocolMismatch)?;
        if icmp.icmp_type().0 != Self::REPLY_TYPE || icmp.icmp_code().0 != 0 {
            return Err(RxError::ProtocolMismatch);
        }
        Ok(EchoReply {
            identifier: icmp.identifier(),
            sequence: icmp.sequence(),
            payload_len: icmp.payload().len(),
            ttl: chain.ipv4().map(|ip| ip.ttl()),
            source: chain.source(),
        })
    }
}

/// ICMPv6 echo.
#[derive(Debug, Clone, Copy, Default)]
pub struct Icmpv6Strategy;

impl EchoStrategy for Icmpv6Strategy {
    const REQUEST_TYPE: u8 = 128;
    const REPLY_TYPE: u8 = 129;
    const IP_PROTOCOL: Protocol = Protocol::Ipv6;
    const ICMP_PROTOCOL: Protocol = Protocol::Icmpv6;
    const DEFAULT_FRAMING: Framing = Framing::Icmp;

    fn accepts(&self, target: &IpAddr) -> bool {
        target.is_ipv6()
    }

    fn build_request(&self,
                     identifier: u16,
                     sequence: u16,
                     payload: &[u8],
                     source: Option<IpAddr>,
                     target: IpAddr)
                     -> TxResult<Vec<u8>> {
        let echo = Echo::request(identifier, sequence, payload);
        let mut builder = match (source, target) {
            (Some(IpAddr::V6(src)), IpAddr::V6(dst)) => {
                Icmpv6Builder::new(echo).with_addresses(src, dst)
            }
            _ => Icmpv6Builder::new(echo),
        };
        build_packet(&mut builder)
    }

    fn parse_reply(&self, buffer: &[u8], framing: Framing, verify: bool) -> RxResult<EchoReply> {
        let chain = self.parser(framing, verify).parse(buffer)?;
        let icmp = chain.icmpv6().ok_or(RxError::ProtocolMismatch)?;
        if icmp.icmpv6_type().0 != Self::REPLY_TYPE || icmp.icmpv6_code().0 != 0 {
            return Err(RxError::ProtocolMismatch);
        }
        Ok(EchoReply {
            identifier: icmp.identifier(),
            sequence: icmp.sequence(),
            payload_len: icmp.payload().len(),
            ttl: chain.ipv6().map(|ip| ip.hop_limit()),
            source: chain.source(),
        })
    }
}

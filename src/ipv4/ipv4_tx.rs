use std::net::Ipv4Addr;

use pnet::packet::ethernet::{EtherType, EtherTypes};
use pnet::packet::ip::IpNextHeaderProtocol;

use crate::ethernet::EthernetPayload;
use crate::packet::{check_buffer, BasicPayload, CheckableMut, Payload};
use crate::{TxError, TxResult};

use super::{Ipv4Packet, DONT_FRAGMENT, IPV4_HEADER_LEN, NO_FLAGS};

/// Default TTL of packets built by `Ipv4Builder`.
pub const DEFAULT_TTL: u8 = 64;

/// Trait for anything wishing to be the payload of an IPv4 packet.
pub trait Ipv4Payload: Payload {
    fn next_level_protocol(&self) -> IpNextHeaderProtocol;
}

pub struct BasicIpv4Payload<'a> {
    next_level_protocol: IpNextHeaderProtocol,
    payload: BasicPayload<'a>,
}

impl<'a> BasicIpv4Payload<'a> {
    pub fn new(next_level_protocol: IpNextHeaderProtocol, payload: &'a [u8]) -> Self {
        BasicIpv4Payload {
            next_level_protocol,
            payload: BasicPayload::new(payload),
        }
    }
}

impl<'a> Ipv4Payload for BasicIpv4Payload<'a> {
    fn next_level_protocol(&self) -> IpNextHeaderProtocol {
        self.next_level_protocol
    }
}

impl<'a> Payload for BasicIpv4Payload<'a> {
    fn len(&self) -> usize {
        self.payload.len()
    }

    fn build(&mut self, buffer: &mut [u8]) -> TxResult {
        self.payload.build(buffer)
    }
}

/// Builds an unfragmented IPv4 packet without options around `payload`.
pub struct Ipv4Builder<P: Ipv4Payload> {
    src: Ipv4Addr,
    dst: Ipv4Addr,
    identification: u16,
    ttl: u8,
    dont_fragment: bool,
    payload: P,
}

impl<P: Ipv4Payload> Ipv4Builder<P> {
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr, identification: u16, payload: P) -> Self {
        Ipv4Builder {
            src,
            dst,
            identification,
            ttl: DEFAULT_TTL,
            dont_fragment: false,
            payload,
        }
    }

    pub fn with_ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_dont_fragment(mut self, dont_fragment: bool) -> Self {
        self.dont_fragment = dont_fragment;
        self
    }
}

impl<P: Ipv4Payload> EthernetPayload for Ipv4Builder<P> {
    fn ether_type(&self) -> EtherType {
        EtherTypes::Ipv4
    }
}

impl<P: Ipv4Payload> Payload for Ipv4Builder<P> {
    fn len(&self) -> usize {
        IPV4_HEADER_LEN + self.payload.len()
    }

    fn build(&mut self, buffer: &mut [u8]) -> TxResult {
        let total_length = self.len();
        if total_length > u16::MAX as usize {
            return Err(TxError::TooLargePayload);
        }
        check_buffer(buffer, total_length)?;
        let protocol = self.payload.next_level_protocol();
        let mut pkg = Ipv4Packet::new_unchecked(&mut buffer[..total_length]);
        pkg.set_version(4);
        pkg.set_header_length((IPV4_HEADER_LEN / 4) as u8);
        pkg.set_dscp(0);
        pkg.set_ecn(0);
        pkg.set_total_length(total_length as u16);
        pkg.set_identification(self.identification);
        pkg.set_flags(if self.dont_fragment { DONT_FRAGMENT } else { NO_FLAGS });
        pkg.set_fragment_offset(0);
        pkg.set_ttl(self.ttl);
        pkg.set_protocol(protocol);
        pkg.set_source(self.src);
        pkg.set_destination(self.dst);
        self.payload.build(pkg.payload_mut())?;
        pkg.commit_checksum(&());
        Ok(())
    }
}

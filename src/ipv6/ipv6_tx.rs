use std::net::Ipv6Addr;

use pnet::packet::ethernet::{EtherType, EtherTypes};
use pnet::packet::ip::IpNextHeaderProtocol;

use crate::ethernet::EthernetPayload;
use crate::packet::{check_buffer, BasicPayload, Payload};
use crate::{TxError, TxResult};

use super::{Ipv6Packet, IPV6_HEADER_LEN};

pub const DEFAULT_HOP_LIMIT: u8 = 64;

/// Trait for anything wishing to be the payload of an IPv6 packet.
pub trait Ipv6Payload: Payload {
    fn next_header(&self) -> IpNextHeaderProtocol;
}

pub struct BasicIpv6Payload<'a> {
    next_header: IpNextHeaderProtocol,
    payload: BasicPayload<'a>,
}

impl<'a> BasicIpv6Payload<'a> {
    pub fn new(next_header: IpNextHeaderProtocol, payload: &'a [u8]) -> Self {
        BasicIpv6Payload {
            next_header,
            payload: BasicPayload::new(payload),
        }
    }
}

impl<'a> Ipv6Payload for BasicIpv6Payload<'a> {
    fn next_header(&self) -> IpNextHeaderProtocol {
        self.next_header
    }
}

impl<'a> Payload for BasicIpv6Payload<'a> {
    fn len(&self) -> usize {
        self.payload.len()
    }

    fn build(&mut self, buffer: &mut [u8]) -> TxResult {
        self.payload.build(buffer)
    }
}

/// Builds an IPv6 packet without extension headers around `payload`.
pub struct Ipv6Builder<P: Ipv6Payload> {
    src: Ipv6Addr,
    dst: Ipv6Addr,
    hop_limit: u8,
    traffic_class: u8,
    flow_label: u32,
    payload: P,
}

impl<P: Ipv6Payload> Ipv6Builder<P> {
    pub fn new(src: Ipv6Addr, dst: Ipv6Addr, payload: P) -> Self {
        Ipv6Builder {
            src,
            dst,
            hop_limit: DEFAULT_HOP_LIMIT,
            traffic_class: 0,
            flow_label: 0,
            payload,
        }
    }

    pub fn with_hop_limit(mut self, hop_limit: u8) -> Self {
        self.hop_limit = hop_limit;
        self
    }

    pub fn with_traffic_class(mut self, traffic_class: u8) -> Self {
        self.traffic_class = traffic_class;
        self
    }

    /// Only the low 20 bits are used.
    pub fn with_flow_label(mut self, flow_label: u32) -> Self {
        self.flow_label = flow_label;
        self
    }
}

impl<P: Ipv6Payload> EthernetPayload for Ipv6Builder<P> {
    fn ether_type(&self) -> EtherType {
        EtherTypes::Ipv6
    }
}

impl<P: Ipv6Payload> Payload for Ipv6Builder<P> {
    fn len(&self) -> usize {
        IPV6_HEADER_LEN + self.payload.len()
    }

    fn build(&mut self, buffer: &mut [u8]) -> TxResult {
        let payload_length = self.payload.len();
        if payload_length > u16::MAX as usize {
            return Err(TxError::TooLargePayload);
        }
        check_buffer(buffer, self.len())?;
        let next_header = self.payload.next_header();
        let mut pkg = Ipv6Packet::new_unchecked(&mut buffer[..IPV6_HEADER_LEN + payload_length]);
        pkg.set_version(6);
        pkg.set_traffic_class(self.traffic_class);
        pkg.set_flow_label(self.flow_label);
        pkg.set_payload_length(payload_length as u16);
        pkg.set_next_header(next_header);
        pkg.set_hop_limit(self.hop_limit);
        pkg.set_source(self.src);
        pkg.set_destination(self.dst);
        self.payload.build(pkg.payload_mut())
    }
}

use std::net::Ipv6Addr;

use pnet::packet::icmp::{IcmpCode, IcmpType, IcmpTypes};
use pnet::packet::icmpv6::{Icmpv6Code, Icmpv6Type, Icmpv6Types};
use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};

use crate::checksum::PseudoHeader;
use crate::ipv4::Ipv4Payload;
use crate::ipv6::Ipv6Payload;
use crate::packet::{check_buffer, BasicPayload, CheckableMut, Payload};
use crate::TxResult;

use super::{IcmpPacket, Icmpv6Packet, ICMP_HEADER_LEN};

/// Trait for anything wishing to be the payload of an ICMP packet.
pub trait IcmpPayload: Payload {
    fn icmp_type(&self) -> IcmpType;

    fn icmp_code(&self) -> IcmpCode;

    /// The four bytes following the checksum.
    fn rest_of_header(&self) -> u32 {
        0
    }
}

/// Trait for anything wishing to be the payload of an ICMPv6 packet.
pub trait Icmpv6Payload: Payload {
    fn icmpv6_type(&self) -> Icmpv6Type;

    fn icmpv6_code(&self) -> Icmpv6Code;

    fn rest_of_header(&self) -> u32 {
        0
    }
}

pub struct BasicIcmpPayload<'a> {
    icmp_type: IcmpType,
    icmp_code: IcmpCode,
    payload: BasicPayload<'a>,
}

impl<'a> BasicIcmpPayload<'a> {
    pub fn new(icmp_type: IcmpType, icmp_code: IcmpCode, payload: &'a [u8]) -> Self {
        BasicIcmpPayload {
            icmp_type,
            icmp_code,
            payload: BasicPayload::new(payload),
        }
    }
}

impl<'a> IcmpPayload for BasicIcmpPayload<'a> {
    fn icmp_type(&self) -> IcmpType {
        self.icmp_type
    }

    fn icmp_code(&self) -> IcmpCode {
        self.icmp_code
    }
}

impl<'a> Payload for BasicIcmpPayload<'a> {
    fn len(&self) -> usize {
        self.payload.len()
    }

    fn build(&mut self, buffer: &mut [u8]) -> TxResult {
        self.payload.build(buffer)
    }
}

pub struct BasicIcmpv6Payload<'a> {
    icmpv6_type: Icmpv6Type,
    icmpv6_code: Icmpv6Code,
    payload: BasicPayload<'a>,
}

impl<'a> BasicIcmpv6Payload<'a> {
    pub fn new(icmpv6_type: Icmpv6Type, icmpv6_code: Icmpv6Code, payload: &'a [u8]) -> Self {
        BasicIcmpv6Payload {
            icmpv6_type,
            icmpv6_code,
            payload: BasicPayload::new(payload),
        }
    }
}

impl<'a> Icmpv6Payload for BasicIcmpv6Payload<'a> {
    fn icmpv6_type(&self) -> Icmpv6Type {
        self.icmpv6_type
    }

    fn icmpv6_code(&self) -> Icmpv6Code {
        self.icmpv6_code
    }
}

impl<'a> Payload for BasicIcmpv6Payload<'a> {
    fn len(&self) -> usize {
        self.payload.len()
    }

    fn build(&mut self, buffer: &mut [u8]) -> TxResult {
        self.payload.build(buffer)
    }
}

/// An echo request or reply, usable inside both `IcmpBuilder` and
/// `Icmpv6Builder`.
pub struct Echo<'a> {
    reply: bool,
    identifier: u16,
    sequence: u16,
    payload: BasicPayload<'a>,
}

impl<'a> Echo<'a> {
    pub fn request(identifier: u16, sequence: u16, payload: &'a [u8]) -> Self {
        Echo {
            reply: false,
            identifier,
            sequence,
            payload: BasicPayload::new(payload),
        }
    }

    pub fn reply(identifier: u16, sequence: u16, payload: &'a [u8]) -> Self {
        Echo {
            reply: true,
            ..Echo::request(identifier, sequence, payload)
        }
    }

    fn rest(&self) -> u32 {
        (u32::from(self.identifier) << 16) | u32::from(self.sequence)
    }
}

impl<'a> IcmpPayload for Echo<'a> {
    fn icmp_type(&self) -> IcmpType {
        if self.reply {
            IcmpTypes::EchoReply
        } else {
            IcmpTypes::EchoRequest
        }
    }

    fn icmp_code(&self) -> IcmpCode {
        IcmpCode::new(0)
    }

    fn rest_of_header(&self) -> u32 {
        self.rest()
    }
}

impl<'a> Icmpv6Payload for Echo<'a> {
    fn icmpv6_type(&self) -> Icmpv6Type {
        if self.reply {
            Icmpv6Types::EchoReply
        } else {
            Icmpv6Types::EchoRequest
        }
    }

    fn icmpv6_code(&self) -> Icmpv6Code {
        Icmpv6Code::new(0)
    }

    fn rest_of_header(&self) -> u32 {
        self.rest()
    }
}

impl<'a> Payload for Echo<'a> {
    fn len(&self) -> usize {
        self.payload.len()
    }

    fn build(&mut self, buffer: &mut [u8]) -> TxResult {
        self.payload.build(buffer)
    }
}

/// Builds an ICMP message. Goes inside an `Ipv4Builder`, or is handed to a
/// socket as is.
pub struct IcmpBuilder<P: IcmpPayload> {
    payload: P,
}

impl<P: IcmpPayload> IcmpBuilder<P> {
    pub fn new(payload: P) -> IcmpBuilder<P> {
        IcmpBuilder { payload }
    }
}

impl<P: IcmpPayload> Ipv4Payload for IcmpBuilder<P> {
    fn next_level_protocol(&self) -> IpNextHeaderProtocol {
        IpNextHeaderProtocols::Icmp
    }
}

impl<P: IcmpPayload> Payload for IcmpBuilder<P> {
    fn len(&self) -> usize {
        ICMP_HEADER_LEN + self.payload.len()
    }

    fn build(&mut self, buffer: &mut [u8]) -> TxResult {
        let len = self.len();
        check_buffer(buffer, len)?;
        let mut pkg = IcmpPacket::new_unchecked(&mut buffer[..len]);
        pkg.set_icmp_type(self.payload.icmp_type());
        pkg.set_icmp_code(self.payload.icmp_code());
        pkg.set_rest_of_header(self.payload.rest_of_header());
        self.payload.build(pkg.payload_mut())?;
        pkg.commit_checksum(&());
        Ok(())
    }
}

/// Builds an ICMPv6 message. Without addresses the checksum field is left
/// zero, which is what a kernel filling in the checksum (as datagram and raw
/// ICMPv6 sockets do) expects.
pub struct Icmpv6Builder<P: Icmpv6Payload> {
    pseudo_header: Option<PseudoHeader>,
    payload: P,
}

impl<P: Icmpv6Payload> Icmpv6Builder<P> {
    pub fn new(payload: P) -> Icmpv6Builder<P> {
        Icmpv6Builder {
            pseudo_header: None,
            payload,
        }
    }

    /// Sets the addresses of the enclosing IPv6 packet, making the builder
    /// commit the checksum itself.
    pub fn with_addresses(mut self, src: Ipv6Addr, dst: Ipv6Addr) -> Self {
        self.pseudo_header = Some(PseudoHeader::V6 { src, dst });
        self
    }
}

impl<P: Icmpv6Payload> Ipv6Payload for Icmpv6Builder<P> {
    fn next_header(&self) -> IpNextHeaderProtocol {
        IpNextHeaderProtocols::Icmpv6
    }
}

impl<P: Icmpv6Payload> Payload for Icmpv6Builder<P> {
    fn len(&self) -> usize {
        ICMP_HEADER_LEN + self.payload.len()
    }

    fn build(&mut self, buffer: &mut [u8]) -> TxResult {
        let len = self.len();
        check_buffer(buffer, len)?;
        let mut pkg = Icmpv6Packet::new_unchecked(&mut buffer[..len]);
        pkg.set_icmpv6_type(self.payload.icmpv6_type());
        pkg.set_icmpv6_code(self.payload.icmpv6_code());
        pkg.set_rest_of_header(self.payload.rest_of_header());
        self.payload.build(pkg.payload_mut())?;
        match self.pseudo_header {
            Some(ref pseudo) => pkg.commit_checksum(pseudo),
            None => pkg.set_checksum(0),
        }
        Ok(())
    }
}

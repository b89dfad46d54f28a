//! Parsing a buffer as a chain of headers, each one selecting the next.

use std::net::IpAddr;

use log::trace;
use pnet::packet::ethernet::{EtherType, EtherTypes};
use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};

use crate::arp::{ArpPacket, ARP_PACKET_LEN};
use crate::checksum::PseudoHeader;
use crate::ethernet::{EthernetFrame, ETHERNET_HEADER_LEN};
use crate::icmp::{IcmpPacket, Icmpv6Packet, ICMP_HEADER_LEN};
use crate::ipv4::Ipv4Packet;
use crate::ipv6::{is_extension_header, Ipv6ExtensionHeader, Ipv6Packet, IPV6_HEADER_LEN};
use crate::packet::{Checkable, Header};
use crate::tcp::TcpPacket;
use crate::udp::{UdpPacket, UDP_HEADER_LEN};
use crate::util::ByteView;
use crate::{RxError, RxResult};

/// The headers a `ParseChain` knows how to interpret.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Protocol {
    Ethernet,
    Arp,
    Ipv4,
    Ipv6,
    Icmp,
    Icmpv6,
    Tcp,
    Udp,
}

impl Protocol {
    pub fn from_ethertype(ether_type: EtherType) -> Option<Protocol> {
        match ether_type {
            EtherTypes::Ipv4 => Some(Protocol::Ipv4),
            EtherTypes::Ipv6 => Some(Protocol::Ipv6),
            EtherTypes::Arp => Some(Protocol::Arp),
            _ => None,
        }
    }

    pub fn from_ip_protocol(protocol: IpNextHeaderProtocol) -> Option<Protocol> {
        match protocol {
            IpNextHeaderProtocols::Icmp => Some(Protocol::Icmp),
            IpNextHeaderProtocols::Icmpv6 => Some(Protocol::Icmpv6),
            IpNextHeaderProtocols::Tcp => Some(Protocol::Tcp),
            IpNextHeaderProtocols::Udp => Some(Protocol::Udp),
            IpNextHeaderProtocols::Ipv4 => Some(Protocol::Ipv4),
            IpNextHeaderProtocols::Ipv6 => Some(Protocol::Ipv6),
            _ => None,
        }
    }
}

/// One parsed header, borrowing the buffer it was parsed from.
#[derive(Debug, Clone)]
pub enum Layer<'a> {
    Ethernet(EthernetFrame<&'a [u8]>),
    Arp(ArpPacket<&'a [u8]>),
    Ipv4(Ipv4Packet<&'a [u8]>),
    Ipv6(Ipv6Packet<&'a [u8]>),
    Ipv6Extension(Ipv6ExtensionHeader<&'a [u8]>),
    Icmp(IcmpPacket<&'a [u8]>),
    Icmpv6(Icmpv6Packet<&'a [u8]>),
    Tcp(TcpPacket<&'a [u8]>),
    Udp(UdpPacket<&'a [u8]>),
}

impl<'a> Layer<'a> {
    /// `None` for IPv6 extension headers, which belong to the IPv6 stage.
    pub fn protocol(&self) -> Option<Protocol> {
        match *self {
            Layer::Ethernet(_) => Some(Protocol::Ethernet),
            Layer::Arp(_) => Some(Protocol::Arp),
            Layer::Ipv4(_) => Some(Protocol::Ipv4),
            Layer::Ipv6(_) => Some(Protocol::Ipv6),
            Layer::Ipv6Extension(_) => None,
            Layer::Icmp(_) => Some(Protocol::Icmp),
            Layer::Icmpv6(_) => Some(Protocol::Icmpv6),
            Layer::Tcp(_) => Some(Protocol::Tcp),
            Layer::Udp(_) => Some(Protocol::Udp),
        }
    }
}

/// Result of a successful `ParseChain::parse`.
#[derive(Debug, Clone)]
pub struct HeaderChain<'a> {
    layers: Vec<Layer<'a>>,
    payload: &'a [u8],
}

impl<'a> HeaderChain<'a> {
    pub fn layers(&self) -> &[Layer<'a>] {
        &self.layers
    }

    /// Whatever follows the last parsed header, link padding excluded.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// The protocols of the chain in order, extension headers left out.
    pub fn protocols(&self) -> Vec<Protocol> {
        self.layers.iter().filter_map(Layer::protocol).collect()
    }

    pub fn ethernet(&self) -> Option<&EthernetFrame<&'a [u8]>> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Ethernet(frame) => Some(frame),
            _ => None,
        })
    }

    pub fn arp(&self) -> Option<&ArpPacket<&'a [u8]>> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Arp(pkg) => Some(pkg),
            _ => None,
        })
    }

    /// The innermost IPv4 header.
    pub fn ipv4(&self) -> Option<&Ipv4Packet<&'a [u8]>> {
        self.layers.iter().rev().find_map(|layer| match layer {
            Layer::Ipv4(pkg) => Some(pkg),
            _ => None,
        })
    }

    /// The innermost IPv6 header.
    pub fn ipv6(&self) -> Option<&Ipv6Packet<&'a [u8]>> {
        self.layers.iter().rev().find_map(|layer| match layer {
            Layer::Ipv6(pkg) => Some(pkg),
            _ => None,
        })
    }

    pub fn icmp(&self) -> Option<&IcmpPacket<&'a [u8]>> {
        match self.layers.last() {
            Some(Layer::Icmp(pkg)) => Some(pkg),
            _ => None,
        }
    }

    pub fn icmpv6(&self) -> Option<&Icmpv6Packet<&'a [u8]>> {
        match self.layers.last() {
            Some(Layer::Icmpv6(pkg)) => Some(pkg),
            _ => None,
        }
    }

    pub fn tcp(&self) -> Option<&TcpPacket<&'a [u8]>> {
        match self.layers.last() {
            Some(Layer::Tcp(pkg)) => Some(pkg),
            _ => None,
        }
    }

    pub fn udp(&self) -> Option<&UdpPacket<&'a [u8]>> {
        match self.layers.last() {
            Some(Layer::Udp(pkg)) => Some(pkg),
            _ => None,
        }
    }

    fn innermost_ip(&self) -> Option<&Layer<'a>> {
        self.layers.iter().rev().find(|layer| matches!(layer, Layer::Ipv4(_) | Layer::Ipv6(_)))
    }

    /// Source address of the innermost IP header.
    pub fn source(&self) -> Option<IpAddr> {
        match self.innermost_ip() {
            Some(Layer::Ipv4(pkg)) => Some(IpAddr::V4(pkg.source())),
            Some(Layer::Ipv6(pkg)) => Some(IpAddr::V6(pkg.source())),
            _ => None,
        }
    }

    /// Destination address of the innermost IP header.
    pub fn destination(&self) -> Option<IpAddr> {
        match self.innermost_ip() {
            Some(Layer::Ipv4(pkg)) => Some(IpAddr::V4(pkg.destination())),
            Some(Layer::Ipv6(pkg)) => Some(IpAddr::V6(pkg.destination())),
            _ => None,
        }
    }
}

/// Interprets a buffer as a sequence of headers starting with a known
/// protocol. Every stage consumes its header and names the next stage, until
/// a stage has no known successor or the expected stages are used up.
///
/// ```
/// use rips_probe::chain::{ParseChain, Protocol};
///
/// let parser = ParseChain::new(Protocol::Ipv4).expect(&[Protocol::Ipv4, Protocol::Icmp]);
/// assert!(parser.parse(&[0x45, 0x00]).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ParseChain {
    first: Protocol,
    expected: Option<Vec<Protocol>>,
    verify_checksums: bool,
}

impl ParseChain {
    pub fn new(first: Protocol) -> Self {
        ParseChain {
            first,
            expected: None,
            verify_checksums: true,
        }
    }

    /// Demands exactly these stages, in order. A buffer whose headers lead
    /// elsewhere, or end early, fails with `RxError::ProtocolMismatch`.
    /// Parsing stops after the last expected stage.
    pub fn expect(mut self, protocols: &[Protocol]) -> Self {
        self.expected = Some(protocols.to_vec());
        self
    }

    /// Whether IPv4 header, ICMP, ICMPv6, UDP and TCP checksums are checked.
    /// Enabled by default.
    ///
    /// ICMPv6, UDP and TCP checksums cover a pseudo-header with the final
    /// destination. Behind an IPv6 routing header with segments left that
    /// address is not in the IPv6 header, and those checksums are not
    /// checked.
    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    pub fn parse<'a>(&self, buffer: &'a [u8]) -> RxResult<HeaderChain<'a>> {
        let result = self.parse_stages(buffer);
        if let Err(ref e) = result {
            trace!("Dropping {} byte buffer starting at {:?}: {}", buffer.len(), self.first, e);
        }
        result
    }

    fn parse_stages<'a>(&self, buffer: &'a [u8]) -> RxResult<HeaderChain<'a>> {
        let mut view = ByteView::new(buffer);
        let mut layers = Vec::new();
        let mut pseudo_header = None;
        let mut next = Some(self.first);
        let mut stage = 0;
        while let Some(protocol) = next {
            if let Some(ref expected) = self.expected {
                match expected.get(stage) {
                    Some(&wanted) if wanted == protocol => (),
                    Some(_) => return Err(RxError::ProtocolMismatch),
                    None => break,
                }
            }
            next = self.parse_stage(protocol, &mut view, &mut layers, &mut pseudo_header)?;
            stage += 1;
        }
        if let Some(ref expected) = self.expected {
            if stage < expected.len() {
                return Err(RxError::ProtocolMismatch);
            }
        }
        Ok(HeaderChain {
            layers,
            payload: view.as_slice(),
        })
    }

    /// Parses one header at the start of `view`, moves `view` past it and
    /// returns the protocol of the next header, if known.
    fn parse_stage<'a>(&self,
                       protocol: Protocol,
                       view: &mut ByteView<'a>,
                       layers: &mut Vec<Layer<'a>>,
                       pseudo_header: &mut Option<PseudoHeader>)
                       -> RxResult<Option<Protocol>> {
        let data = view.as_slice();
        let next = match protocol {
            Protocol::Ethernet => {
                let frame = EthernetFrame::new(data)?;
                view.advance(ETHERNET_HEADER_LEN)?;
                let next = Protocol::from_ethertype(frame.ethertype());
                layers.push(Layer::Ethernet(frame));
                next
            }
            Protocol::Arp => {
                let pkg = ArpPacket::new(data)?;
                view.advance(ARP_PACKET_LEN)?;
                view.truncate(0)?;
                layers.push(Layer::Arp(pkg));
                None
            }
            Protocol::Ipv4 => {
                let pkg = Ipv4Packet::new(data)?;
                if self.verify_checksums && !pkg.verify_checksum(&()) {
                    return Err(RxError::ChecksumMismatch);
                }
                view.truncate(pkg.total_length() as usize)?;
                view.advance(pkg.header_len())?;
                *pseudo_header = Some(PseudoHeader::V4 {
                    src: pkg.source(),
                    dst: pkg.destination(),
                });
                // Only the first fragment starts with the upper layer header.
                let next = if pkg.fragment_offset() != 0 {
                    None
                } else {
                    Protocol::from_ip_protocol(pkg.protocol())
                };
                layers.push(Layer::Ipv4(pkg));
                next
            }
            Protocol::Ipv6 => {
                let pkg = Ipv6Packet::new(data)?;
                view.truncate(IPV6_HEADER_LEN + pkg.payload_length() as usize)?;
                view.advance(IPV6_HEADER_LEN)?;
                *pseudo_header = Some(PseudoHeader::V6 {
                    src: pkg.source(),
                    dst: pkg.destination(),
                });
                let mut next_header = pkg.next_header();
                layers.push(Layer::Ipv6(pkg));
                let mut fragmented = false;
                while is_extension_header(next_header) && !fragmented {
                    let ext = Ipv6ExtensionHeader::new(next_header, view.as_slice())?;
                    view.advance(ext.header_len())?;
                    fragmented = ext.fragment_offset() != 0;
                    if ext.segments_left() != 0 {
                        // The final destination is somewhere in the route.
                        *pseudo_header = None;
                    }
                    next_header = ext.next_header();
                    layers.push(Layer::Ipv6Extension(ext));
                }
                if fragmented {
                    None
                } else {
                    Protocol::from_ip_protocol(next_header)
                }
            }
            Protocol::Icmp => {
                let pkg = IcmpPacket::new(data)?;
                if self.verify_checksums && !pkg.verify_checksum(&()) {
                    return Err(RxError::ChecksumMismatch);
                }
                view.advance(ICMP_HEADER_LEN)?;
                layers.push(Layer::Icmp(pkg));
                None
            }
            Protocol::Icmpv6 => {
                let pkg = Icmpv6Packet::new(data)?;
                if let Some(pseudo @ PseudoHeader::V6 { .. }) = *pseudo_header {
                    if self.verify_checksums && !pkg.verify_checksum(&pseudo) {
                        return Err(RxError::ChecksumMismatch);
                    }
                }
                view.advance(ICMP_HEADER_LEN)?;
                layers.push(Layer::Icmpv6(pkg));
                None
            }
            Protocol::Udp => {
                let pkg = UdpPacket::new(data)?;
                if let Some(ref pseudo) = *pseudo_header {
                    if self.verify_checksums && !pkg.verify_checksum(pseudo) {
                        return Err(RxError::ChecksumMismatch);
                    }
                }
                view.truncate(pkg.length() as usize)?;
                view.advance(UDP_HEADER_LEN)?;
                layers.push(Layer::Udp(pkg));
                None
            }
            Protocol::Tcp => {
                let pkg = TcpPacket::new(data)?;
                if let Some(ref pseudo) = *pseudo_header {
                    if self.verify_checksums && !pkg.verify_checksum(pseudo) {
                        return Err(RxError::ChecksumMismatch);
                    }
                }
                view.advance(pkg.header_len())?;
                layers.push(Layer::Tcp(pkg));
                None
            }
        };
        Ok(next)
    }
}

//! The internet checksum (RFC 1071) and the pseudo-header variants used by
//! UDP, TCP and ICMPv6.
//!
//! All words are summed in network byte order, independent of the host. The
//! field being computed is skipped rather than zeroed, so computing a
//! checksum never needs a mutable copy of the packet.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use pnet::packet::ip::IpNextHeaderProtocol;

/// Source and destination addresses a transport checksum is bound to. Never
/// transmitted, only folded into the sum.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum PseudoHeader {
    V4 { src: Ipv4Addr, dst: Ipv4Addr },
    V6 { src: Ipv6Addr, dst: Ipv6Addr },
}

impl PseudoHeader {
    /// Pairs two addresses. Returns `None` when their families differ.
    pub fn new(src: IpAddr, dst: IpAddr) -> Option<Self> {
        match (src, dst) {
            (IpAddr::V4(src), IpAddr::V4(dst)) => Some(PseudoHeader::V4 { src, dst }),
            (IpAddr::V6(src), IpAddr::V6(dst)) => Some(PseudoHeader::V6 { src, dst }),
            _ => None,
        }
    }

    pub fn src(&self) -> IpAddr {
        match *self {
            PseudoHeader::V4 { src, .. } => IpAddr::V4(src),
            PseudoHeader::V6 { src, .. } => IpAddr::V6(src),
        }
    }

    pub fn dst(&self) -> IpAddr {
        match *self {
            PseudoHeader::V4 { dst, .. } => IpAddr::V4(dst),
            PseudoHeader::V6 { dst, .. } => IpAddr::V6(dst),
        }
    }

    pub fn is_ipv4(&self) -> bool {
        matches!(*self, PseudoHeader::V4 { .. })
    }
}

/// Streaming one's complement accumulator.
///
/// Byte slices can be added in pieces of any length; an odd trailing byte is
/// carried over and paired with the first byte of the next piece, as if the
/// pieces had been concatenated.
#[derive(Debug, Clone, Copy, Default)]
pub struct Checksum {
    sum: u64,
    pending: Option<u8>,
}

impl Checksum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bytes(&mut self, data: &[u8]) -> &mut Self {
        let mut data = data;
        if let Some(high) = self.pending.take() {
            match data.split_first() {
                Some((&low, rest)) => {
                    self.sum += u64::from(u16::from_be_bytes([high, low]));
                    data = rest;
                }
                None => {
                    self.pending = Some(high);
                    return self;
                }
            }
        }
        let mut words = data.chunks_exact(2);
        for word in &mut words {
            self.sum += u64::from(u16::from_be_bytes([word[0], word[1]]));
        }
        if let [last] = words.remainder() {
            self.pending = Some(*last);
        }
        self
    }

    /// Adds `data` except the two byte field at `offset`. The offset must be
    /// even so the words following the field keep their alignment.
    pub fn add_bytes_skipping(&mut self, data: &[u8], offset: usize) -> &mut Self {
        debug_assert_eq!(offset % 2, 0);
        let end = offset.saturating_add(2).min(data.len());
        let start = offset.min(end);
        self.add_bytes(&data[..start]).add_bytes(&data[end..])
    }

    pub fn add_u16(&mut self, value: u16) -> &mut Self {
        self.add_bytes(&value.to_be_bytes())
    }

    pub fn add_u32(&mut self, value: u32) -> &mut Self {
        self.add_bytes(&value.to_be_bytes())
    }

    /// IPv4 pseudo-header: source, destination, zero, protocol, 16 bit length.
    pub fn add_ipv4_pseudo_header(&mut self,
                                  src: Ipv4Addr,
                                  dst: Ipv4Addr,
                                  protocol: IpNextHeaderProtocol,
                                  length: u16)
                                  -> &mut Self {
        self.add_bytes(&src.octets())
            .add_bytes(&dst.octets())
            .add_bytes(&[0, protocol.0])
            .add_u16(length)
    }

    /// IPv6 pseudo-header (RFC 8200 section 8.1): source, destination, 32 bit
    /// upper-layer length, three zero bytes and the next header value.
    pub fn add_ipv6_pseudo_header(&mut self,
                                  src: Ipv6Addr,
                                  dst: Ipv6Addr,
                                  next_header: IpNextHeaderProtocol,
                                  length: u32)
                                  -> &mut Self {
        self.add_bytes(&src.octets())
            .add_bytes(&dst.octets())
            .add_u32(length)
            .add_bytes(&[0, 0, 0, next_header.0])
    }

    /// Adds whichever pseudo-header `pseudo` describes. The IPv4 variant
    /// truncates `length` to its 16 bit field.
    pub fn add_pseudo_header(&mut self,
                             pseudo: &PseudoHeader,
                             protocol: IpNextHeaderProtocol,
                             length: usize)
                             -> &mut Self {
        match *pseudo {
            PseudoHeader::V4 { src, dst } => {
                self.add_ipv4_pseudo_header(src, dst, protocol, length as u16)
            }
            PseudoHeader::V6 { src, dst } => {
                self.add_ipv6_pseudo_header(src, dst, protocol, length as u32)
            }
        }
    }

    /// The folded sum, not complemented.
    pub fn sum(&self) -> u16 {
        let mut sum = self.sum;
        if let Some(high) = self.pending {
            sum += u64::from(u16::from_be_bytes([high, 0]));
        }
        while (sum >> 16) != 0 {
            sum = (sum & 0xffff) + (sum >> 16);
        }
        sum as u16
    }

    /// The checksum to store in a header: the complement of the folded sum.
    pub fn finish(&self) -> u16 {
        !self.sum()
    }
}

/// Checksum of `data` with no pseudo-header.
pub fn internet_checksum(data: &[u8]) -> u16 {
    Checksum::new().add_bytes(data).finish()
}

/// Checks a span that already contains its checksum field: summing it must
/// give all ones.
pub fn verify(data: &[u8]) -> bool {
    Checksum::new().add_bytes(data).sum() == 0xffff
}

use std::net::Ipv6Addr;

use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};

use crate::packet::Header;
use crate::util::{clamp, read_ipv6, read_u16, read_u32, write_ipv6, write_u16, write_u32};
use crate::{RxError, RxResult};

use super::{IPV6_EXTENSION_MIN_LEN, IPV6_HEADER_LEN};

const VERSION_CLASS_FLOW_OFFSET: usize = 0;
const PAYLOAD_LENGTH_OFFSET: usize = 4;
const NEXT_HEADER_OFFSET: usize = 6;
const HOP_LIMIT_OFFSET: usize = 7;
const SOURCE_OFFSET: usize = 8;
const DESTINATION_OFFSET: usize = 24;

/// View of an IPv6 fixed header and the packet it heads. Extension headers
/// are part of `payload()`, see `Ipv6ExtensionHeader`.
#[derive(Debug, Clone)]
pub struct Ipv6Packet<B> {
    buffer: B,
}

impl<B: AsRef<[u8]>> Ipv6Packet<B> {
    /// Parses `buffer` as an IPv6 packet. The version must be 6 and the
    /// payload length must fit in the buffer.
    pub fn new(buffer: B) -> RxResult<Self> {
        if buffer.as_ref().len() < IPV6_HEADER_LEN {
            return Err(RxError::Truncated);
        }
        let pkg = Ipv6Packet { buffer };
        if pkg.version() != 6 {
            Err(RxError::ProtocolMismatch)
        } else if IPV6_HEADER_LEN + pkg.payload_length() as usize > pkg.buffer.as_ref().len() {
            Err(RxError::Truncated)
        } else {
            Ok(pkg)
        }
    }

    pub(crate) fn new_unchecked(buffer: B) -> Self {
        Ipv6Packet { buffer }
    }

    fn first_word(&self) -> u32 {
        read_u32(self.buffer.as_ref(), VERSION_CLASS_FLOW_OFFSET)
    }

    pub fn version(&self) -> u8 {
        (self.first_word() >> 28) as u8
    }

    pub fn traffic_class(&self) -> u8 {
        (self.first_word() >> 20) as u8
    }

    pub fn flow_label(&self) -> u32 {
        self.first_word() & 0x000f_ffff
    }

    /// Length of everything after the fixed header, extension headers
    /// included.
    pub fn payload_length(&self) -> u16 {
        read_u16(self.buffer.as_ref(), PAYLOAD_LENGTH_OFFSET)
    }

    pub fn next_header(&self) -> IpNextHeaderProtocol {
        IpNextHeaderProtocol::new(self.buffer.as_ref()[NEXT_HEADER_OFFSET])
    }

    pub fn hop_limit(&self) -> u8 {
        self.buffer.as_ref()[HOP_LIMIT_OFFSET]
    }

    pub fn source(&self) -> Ipv6Addr {
        read_ipv6(self.buffer.as_ref(), SOURCE_OFFSET)
    }

    pub fn destination(&self) -> Ipv6Addr {
        read_ipv6(self.buffer.as_ref(), DESTINATION_OFFSET)
    }

    pub fn payload(&self) -> &[u8] {
        let data = self.buffer.as_ref();
        let end = IPV6_HEADER_LEN + self.payload_length() as usize;
        let (start, end) = clamp(IPV6_HEADER_LEN, end, data.len());
        &data[start..end]
    }

    pub fn packet(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    pub fn into_inner(self) -> B {
        self.buffer
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Ipv6Packet<B> {
    fn set_first_word(&mut self, word: u32) {
        write_u32(self.buffer.as_mut(), VERSION_CLASS_FLOW_OFFSET, word);
    }

    pub fn set_version(&mut self, version: u8) {
        let word = (self.first_word() & 0x0fff_ffff) | (u32::from(version) << 28);
        self.set_first_word(word);
    }

    pub fn set_traffic_class(&mut self, class: u8) {
        let word = (self.first_word() & 0xf00f_ffff) | (u32::from(class) << 20);
        self.set_first_word(word);
    }

    pub fn set_flow_label(&mut self, label: u32) {
        let word = (self.first_word() & 0xfff0_0000) | (label & 0x000f_ffff);
        self.set_first_word(word);
    }

    pub fn set_payload_length(&mut self, length: u16) {
        write_u16(self.buffer.as_mut(), PAYLOAD_LENGTH_OFFSET, length);
    }

    pub fn set_next_header(&mut self, next_header: IpNextHeaderProtocol) {
        self.buffer.as_mut()[NEXT_HEADER_OFFSET] = next_header.0;
    }

    pub fn set_hop_limit(&mut self, hop_limit: u8) {
        self.buffer.as_mut()[HOP_LIMIT_OFFSET] = hop_limit;
    }

    pub fn set_source(&mut self, addr: Ipv6Addr) {
        write_ipv6(self.buffer.as_mut(), SOURCE_OFFSET, addr);
    }

    pub fn set_destination(&mut self, addr: Ipv6Addr) {
        write_ipv6(self.buffer.as_mut(), DESTINATION_OFFSET, addr);
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        let end = IPV6_HEADER_LEN + self.payload_length() as usize;
        let data = self.buffer.as_mut();
        let (start, end) = clamp(IPV6_HEADER_LEN, end, data.len());
        &mut data[start..end]
    }
}

impl<B: AsRef<[u8]>> Header for Ipv6Packet<B> {
    const MIN_SIZE: usize = IPV6_HEADER_LEN;

    fn header_len(&self) -> usize {
        IPV6_HEADER_LEN
    }
}

/// True for the next header values that introduce an extension header
/// rather than an upper layer protocol.
pub fn is_extension_header(next_header: IpNextHeaderProtocol) -> bool {
    next_header == IpNextHeaderProtocols::Hopopt ||
    next_header == IpNextHeaderProtocols::Ipv6Route ||
    next_header == IpNextHeaderProtocols::Ipv6Frag ||
    next_header == IpNextHeaderProtocols::Ipv6Opts ||
    next_header == IpNextHeaderProtocols::Ah
}

/// One IPv6 extension header. All of them start with a next header byte
/// followed by a length byte, but the unit of the length differs.
#[derive(Debug, Clone)]
pub struct Ipv6ExtensionHeader<B> {
    kind: IpNextHeaderProtocol,
    buffer: B,
}

impl<B: AsRef<[u8]>> Ipv6ExtensionHeader<B> {
    /// Parses the extension header of type `kind` (the next header value
    /// that pointed at it) at the start of `buffer`.
    pub fn new(kind: IpNextHeaderProtocol, buffer: B) -> RxResult<Self> {
        if !is_extension_header(kind) {
            return Err(RxError::ProtocolMismatch);
        }
        if buffer.as_ref().len() < IPV6_EXTENSION_MIN_LEN {
            return Err(RxError::Truncated);
        }
        let header = Ipv6ExtensionHeader { kind, buffer };
        if header.header_len() > header.buffer.as_ref().len() {
            Err(RxError::Truncated)
        } else {
            Ok(header)
        }
    }

    pub fn kind(&self) -> IpNextHeaderProtocol {
        self.kind
    }

    pub fn next_header(&self) -> IpNextHeaderProtocol {
        IpNextHeaderProtocol::new(self.buffer.as_ref()[0])
    }

    /// The header bytes after the next header and length fields.
    pub fn data(&self) -> &[u8] {
        &self.buffer.as_ref()[2..self.header_len()]
    }

    pub fn is_fragment(&self) -> bool {
        self.kind == IpNextHeaderProtocols::Ipv6Frag
    }

    /// Offset in eight byte units. Zero for anything but a fragment header.
    pub fn fragment_offset(&self) -> u16 {
        if self.is_fragment() {
            read_u16(self.buffer.as_ref(), 2) >> 3
        } else {
            0
        }
    }

    pub fn more_fragments(&self) -> bool {
        self.is_fragment() && self.buffer.as_ref()[3] & 1 != 0
    }

    pub fn is_routing(&self) -> bool {
        self.kind == IpNextHeaderProtocols::Ipv6Route
    }

    /// Route segments still to visit before the final destination. Zero for
    /// anything but a routing header.
    pub fn segments_left(&self) -> u8 {
        if self.is_routing() {
            self.buffer.as_ref()[3]
        } else {
            0
        }
    }

    /// Bytes following this header.
    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[self.header_len()..]
    }
}

impl<B: AsRef<[u8]>> Header for Ipv6ExtensionHeader<B> {
    const MIN_SIZE: usize = IPV6_EXTENSION_MIN_LEN;

    fn header_len(&self) -> usize {
        let len = self.buffer.as_ref()[1] as usize;
        if self.kind == IpNextHeaderProtocols::Ipv6Frag {
            IPV6_EXTENSION_MIN_LEN
        } else if self.kind == IpNextHeaderProtocols::Ah {
            (len + 2) * 4
        } else {
            (len + 1) * 8
        }
    }
}

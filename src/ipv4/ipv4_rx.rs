use std::net::Ipv4Addr;

use pnet::packet::ip::IpNextHeaderProtocol;

use crate::checksum::Checksum;
use crate::packet::{Checkable, CheckableMut, Header};
use crate::util::{clamp, read_ipv4, read_u16, write_ipv4, write_u16};
use crate::{RxError, RxResult};

use super::{DONT_FRAGMENT, IPV4_HEADER_LEN, MORE_FRAGMENTS};

const VERSION_IHL_OFFSET: usize = 0;
const DSCP_ECN_OFFSET: usize = 1;
const TOTAL_LENGTH_OFFSET: usize = 2;
const IDENTIFICATION_OFFSET: usize = 4;
const FLAGS_FRAGMENT_OFFSET: usize = 6;
const TTL_OFFSET: usize = 8;
const PROTOCOL_OFFSET: usize = 9;
const CHECKSUM_OFFSET: usize = 10;
const SOURCE_OFFSET: usize = 12;
const DESTINATION_OFFSET: usize = 16;

/// View of an IPv4 header and the packet it heads.
///
/// The internal representation is held in network byte order (big-endian)
/// and all accessor methods take and return data in host byte order.
#[derive(Debug, Clone)]
pub struct Ipv4Packet<B> {
    buffer: B,
}

impl<B: AsRef<[u8]>> Ipv4Packet<B> {
    /// Parses `buffer` as an IPv4 packet. Besides the fixed 20 bytes, the
    /// version must be 4, IHL must cover at least the fixed header and fit in
    /// the buffer, and the total length must cover the header and fit in the
    /// buffer. The buffer may extend past the total length (link padding).
    pub fn new(buffer: B) -> RxResult<Self> {
        let data = buffer.as_ref();
        if data.len() < IPV4_HEADER_LEN {
            return Err(RxError::Truncated);
        }
        let pkg = Ipv4Packet { buffer };
        if pkg.version() != 4 {
            return Err(RxError::ProtocolMismatch);
        }
        let header_len = pkg.header_len();
        let total_length = pkg.total_length() as usize;
        let buffer_len = pkg.buffer.as_ref().len();
        if header_len < IPV4_HEADER_LEN || total_length < header_len {
            Err(RxError::InvalidLength)
        } else if header_len > buffer_len || total_length > buffer_len {
            Err(RxError::Truncated)
        } else {
            Ok(pkg)
        }
    }

    /// Wraps a buffer the caller already checked holds `IPV4_HEADER_LEN` bytes.
    pub(crate) fn new_unchecked(buffer: B) -> Self {
        Ipv4Packet { buffer }
    }

    /// Overlays the header on `buffer` checking nothing but the fixed size.
    /// Meant for filling in a zeroed buffer; the variable length accessors
    /// clamp to the buffer until the length fields are set.
    pub fn overlay(buffer: B) -> RxResult<Self> {
        if buffer.as_ref().len() < IPV4_HEADER_LEN {
            Err(RxError::Truncated)
        } else {
            Ok(Ipv4Packet { buffer })
        }
    }

    pub fn version(&self) -> u8 {
        self.buffer.as_ref()[VERSION_IHL_OFFSET] >> 4
    }

    /// The IHL field, in 32 bit words.
    pub fn header_length(&self) -> u8 {
        self.buffer.as_ref()[VERSION_IHL_OFFSET] & 0x0f
    }

    pub fn dscp(&self) -> u8 {
        self.buffer.as_ref()[DSCP_ECN_OFFSET] >> 2
    }

    pub fn ecn(&self) -> u8 {
        self.buffer.as_ref()[DSCP_ECN_OFFSET] & 0b11
    }

    pub fn total_length(&self) -> u16 {
        read_u16(self.buffer.as_ref(), TOTAL_LENGTH_OFFSET)
    }

    pub fn identification(&self) -> u16 {
        read_u16(self.buffer.as_ref(), IDENTIFICATION_OFFSET)
    }

    /// The three flag bits, see `MORE_FRAGMENTS` and `DONT_FRAGMENT`.
    pub fn flags(&self) -> u8 {
        (read_u16(self.buffer.as_ref(), FLAGS_FRAGMENT_OFFSET) >> 13) as u8
    }

    pub fn dont_fragment(&self) -> bool {
        self.flags() & DONT_FRAGMENT != 0
    }

    pub fn more_fragments(&self) -> bool {
        self.flags() & MORE_FRAGMENTS != 0
    }

    /// Fragment offset in units of eight bytes.
    pub fn fragment_offset(&self) -> u16 {
        read_u16(self.buffer.as_ref(), FLAGS_FRAGMENT_OFFSET) & 0x1fff
    }

    pub fn is_fragment(&self) -> bool {
        self.more_fragments() || self.fragment_offset() != 0
    }

    pub fn ttl(&self) -> u8 {
        self.buffer.as_ref()[TTL_OFFSET]
    }

    pub fn protocol(&self) -> IpNextHeaderProtocol {
        IpNextHeaderProtocol::new(self.buffer.as_ref()[PROTOCOL_OFFSET])
    }

    pub fn source(&self) -> Ipv4Addr {
        read_ipv4(self.buffer.as_ref(), SOURCE_OFFSET)
    }

    pub fn destination(&self) -> Ipv4Addr {
        read_ipv4(self.buffer.as_ref(), DESTINATION_OFFSET)
    }

    pub fn options(&self) -> &[u8] {
        let data = self.buffer.as_ref();
        let (start, end) = clamp(IPV4_HEADER_LEN, self.header_len(), data.len());
        &data[start..end]
    }

    /// Bytes between the end of the header and `total_length`.
    pub fn payload(&self) -> &[u8] {
        let data = self.buffer.as_ref();
        let (start, end) = clamp(self.header_len(), self.total_length() as usize, data.len());
        &data[start..end]
    }

    pub fn packet(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    pub fn into_inner(self) -> B {
        self.buffer
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Ipv4Packet<B> {
    pub fn set_version(&mut self, version: u8) {
        let byte = &mut self.buffer.as_mut()[VERSION_IHL_OFFSET];
        *byte = (*byte & 0x0f) | (version << 4);
    }

    pub fn set_header_length(&mut self, words: u8) {
        let byte = &mut self.buffer.as_mut()[VERSION_IHL_OFFSET];
        *byte = (*byte & 0xf0) | (words & 0x0f);
    }

    pub fn set_dscp(&mut self, dscp: u8) {
        let byte = &mut self.buffer.as_mut()[DSCP_ECN_OFFSET];
        *byte = (*byte & 0b11) | (dscp << 2);
    }

    pub fn set_ecn(&mut self, ecn: u8) {
        let byte = &mut self.buffer.as_mut()[DSCP_ECN_OFFSET];
        *byte = (*byte & !0b11) | (ecn & 0b11);
    }

    pub fn set_total_length(&mut self, length: u16) {
        write_u16(self.buffer.as_mut(), TOTAL_LENGTH_OFFSET, length);
    }

    pub fn set_identification(&mut self, identification: u16) {
        write_u16(self.buffer.as_mut(), IDENTIFICATION_OFFSET, identification);
    }

    pub fn set_flags(&mut self, flags: u8) {
        let offset = self.fragment_offset();
        let value = (u16::from(flags & 0b111) << 13) | offset;
        write_u16(self.buffer.as_mut(), FLAGS_FRAGMENT_OFFSET, value);
    }

    pub fn set_fragment_offset(&mut self, offset: u16) {
        let flags = u16::from(self.flags()) << 13;
        write_u16(self.buffer.as_mut(), FLAGS_FRAGMENT_OFFSET, flags | (offset & 0x1fff));
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.buffer.as_mut()[TTL_OFFSET] = ttl;
    }

    pub fn set_protocol(&mut self, protocol: IpNextHeaderProtocol) {
        self.buffer.as_mut()[PROTOCOL_OFFSET] = protocol.0;
    }

    pub fn set_source(&mut self, addr: Ipv4Addr) {
        write_ipv4(self.buffer.as_mut(), SOURCE_OFFSET, addr);
    }

    pub fn set_destination(&mut self, addr: Ipv4Addr) {
        write_ipv4(self.buffer.as_mut(), DESTINATION_OFFSET, addr);
    }

    pub fn options_mut(&mut self) -> &mut [u8] {
        let header_len = self.header_len();
        let data = self.buffer.as_mut();
        let (start, end) = clamp(IPV4_HEADER_LEN, header_len, data.len());
        &mut data[start..end]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        let header_len = self.header_len();
        let total_length = self.total_length() as usize;
        let data = self.buffer.as_mut();
        let (start, end) = clamp(header_len, total_length, data.len());
        &mut data[start..end]
    }
}

impl<B: AsRef<[u8]>> Header for Ipv4Packet<B> {
    const MIN_SIZE: usize = IPV4_HEADER_LEN;

    fn header_len(&self) -> usize {
        self.header_length() as usize * 4
    }
}

impl<B: AsRef<[u8]>> Checkable for Ipv4Packet<B> {
    type Context = ();

    fn checksum(&self) -> u16 {
        read_u16(self.buffer.as_ref(), CHECKSUM_OFFSET)
    }

    /// Covers the header, options included, but not the payload.
    fn compute_checksum(&self, _context: &()) -> u16 {
        let data = self.buffer.as_ref();
        let (_, end) = clamp(0, self.header_len(), data.len());
        Checksum::new().add_bytes_skipping(&data[..end], CHECKSUM_OFFSET).finish()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> CheckableMut for Ipv4Packet<B> {
    fn set_checksum(&mut self, checksum: u16) {
        write_u16(self.buffer.as_mut(), CHECKSUM_OFFSET, checksum);
    }
}

//! TCP segment headers (RFC 793). Only the header is handled here, there is
//! no connection state.

use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};

use crate::checksum::{Checksum, PseudoHeader};
use crate::ipv4::Ipv4Payload;
use crate::ipv6::Ipv6Payload;
use crate::packet::{check_buffer, BasicPayload, Checkable, CheckableMut, Header, Payload};
use crate::util::{clamp, read_u16, read_u32, write_u16, write_u32};
use crate::{RxError, RxResult, TxError, TxResult};

pub const TCP_HEADER_LEN: usize = 20;
pub const TCP_MAX_HEADER_LEN: usize = 60;

/// Bits of the flags byte.
pub mod flags {
    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
    pub const URG: u8 = 0x20;
    pub const ECE: u8 = 0x40;
    pub const CWR: u8 = 0x80;
}

const SOURCE_OFFSET: usize = 0;
const DESTINATION_OFFSET: usize = 2;
const SEQUENCE_OFFSET: usize = 4;
const ACKNOWLEDGEMENT_OFFSET: usize = 8;
const DATA_OFFSET_OFFSET: usize = 12;
const FLAGS_OFFSET: usize = 13;
const WINDOW_OFFSET: usize = 14;
const CHECKSUM_OFFSET: usize = 16;
const URGENT_POINTER_OFFSET: usize = 18;

/// View of a TCP segment. TCP has no length field of its own, the segment
/// ends where the buffer does.
#[derive(Debug, Clone)]
pub struct TcpPacket<B> {
    buffer: B,
}

impl<B: AsRef<[u8]>> TcpPacket<B> {
    pub fn new(buffer: B) -> RxResult<Self> {
        if buffer.as_ref().len() < TCP_HEADER_LEN {
            return Err(RxError::Truncated);
        }
        let pkg = TcpPacket { buffer };
        if pkg.header_len() < TCP_HEADER_LEN {
            Err(RxError::InvalidLength)
        } else if pkg.header_len() > pkg.buffer.as_ref().len() {
            Err(RxError::Truncated)
        } else {
            Ok(pkg)
        }
    }

    pub(crate) fn new_unchecked(buffer: B) -> Self {
        TcpPacket { buffer }
    }

    pub fn source(&self) -> u16 {
        read_u16(self.buffer.as_ref(), SOURCE_OFFSET)
    }

    pub fn destination(&self) -> u16 {
        read_u16(self.buffer.as_ref(), DESTINATION_OFFSET)
    }

    pub fn sequence(&self) -> u32 {
        read_u32(self.buffer.as_ref(), SEQUENCE_OFFSET)
    }

    pub fn acknowledgement(&self) -> u32 {
        read_u32(self.buffer.as_ref(), ACKNOWLEDGEMENT_OFFSET)
    }

    /// Header length in 32 bit words.
    pub fn data_offset(&self) -> u8 {
        self.buffer.as_ref()[DATA_OFFSET_OFFSET] >> 4
    }

    pub fn flags(&self) -> u8 {
        self.buffer.as_ref()[FLAGS_OFFSET]
    }

    /// True if every bit in `mask` is set.
    pub fn has_flags(&self, mask: u8) -> bool {
        self.flags() & mask == mask
    }

    pub fn window(&self) -> u16 {
        read_u16(self.buffer.as_ref(), WINDOW_OFFSET)
    }

    pub fn urgent_pointer(&self) -> u16 {
        read_u16(self.buffer.as_ref(), URGENT_POINTER_OFFSET)
    }

    pub fn options(&self) -> &[u8] {
        let data = self.buffer.as_ref();
        let (start, end) = clamp(TCP_HEADER_LEN, self.header_len(), data.len());
        &data[start..end]
    }

    pub fn payload(&self) -> &[u8] {
        let data = self.buffer.as_ref();
        let (start, end) = clamp(self.header_len(), data.len(), data.len());
        &data[start..end]
    }

    pub fn packet(&self) -> &[u8] {
        self.buffer.as_ref()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> TcpPacket<B> {
    pub fn set_source(&mut self, port: u16) {
        write_u16(self.buffer.as_mut(), SOURCE_OFFSET, port);
    }

    pub fn set_destination(&mut self, port: u16) {
        write_u16(self.buffer.as_mut(), DESTINATION_OFFSET, port);
    }

    pub fn set_sequence(&mut self, sequence: u32) {
        write_u32(self.buffer.as_mut(), SEQUENCE_OFFSET, sequence);
    }

    pub fn set_acknowledgement(&mut self, acknowledgement: u32) {
        write_u32(self.buffer.as_mut(), ACKNOWLEDGEMENT_OFFSET, acknowledgement);
    }

    /// Also clears the reserved bits sharing the byte.
    pub fn set_data_offset(&mut self, words: u8) {
        self.buffer.as_mut()[DATA_OFFSET_OFFSET] = words << 4;
    }

    pub fn set_flags(&mut self, flags: u8) {
        self.buffer.as_mut()[FLAGS_OFFSET] = flags;
    }

    pub fn set_window(&mut self, window: u16) {
        write_u16(self.buffer.as_mut(), WINDOW_OFFSET, window);
    }

    pub fn set_urgent_pointer(&mut self, pointer: u16) {
        write_u16(self.buffer.as_mut(), URGENT_POINTER_OFFSET, pointer);
    }

    pub fn options_mut(&mut self) -> &mut [u8] {
        let header_len = self.header_len();
        let data = self.buffer.as_mut();
        let (start, end) = clamp(TCP_HEADER_LEN, header_len, data.len());
        &mut data[start..end]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        let header_len = self.header_len();
        let data = self.buffer.as_mut();
        let len = data.len();
        let (start, end) = clamp(header_len, len, len);
        &mut data[start..end]
    }
}

impl<B: AsRef<[u8]>> Header for TcpPacket<B> {
    const MIN_SIZE: usize = TCP_HEADER_LEN;

    fn header_len(&self) -> usize {
        self.data_offset() as usize * 4
    }
}

impl<B: AsRef<[u8]>> Checkable for TcpPacket<B> {
    type Context = PseudoHeader;

    fn checksum(&self) -> u16 {
        read_u16(self.buffer.as_ref(), CHECKSUM_OFFSET)
    }

    fn compute_checksum(&self, pseudo: &PseudoHeader) -> u16 {
        let segment = self.buffer.as_ref();
        Checksum::new()
            .add_pseudo_header(pseudo, IpNextHeaderProtocols::Tcp, segment.len())
            .add_bytes_skipping(segment, CHECKSUM_OFFSET)
            .finish()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> CheckableMut for TcpPacket<B> {
    fn set_checksum(&mut self, checksum: u16) {
        write_u16(self.buffer.as_mut(), CHECKSUM_OFFSET, checksum);
    }
}

/// Builds a single TCP segment.
pub struct TcpBuilder<'a> {
    pseudo_header: PseudoHeader,
    src: u16,
    dst: u16,
    sequence: u32,
    acknowledgement: u32,
    flags: u8,
    window: u16,
    options: &'a [u8],
    payload: BasicPayload<'a>,
}

impl<'a> TcpBuilder<'a> {
    pub fn new(pseudo_header: PseudoHeader,
               src_port: u16,
               dst_port: u16,
               payload: &'a [u8])
               -> TcpBuilder<'a> {
        TcpBuilder {
            pseudo_header,
            src: src_port,
            dst: dst_port,
            sequence: 0,
            acknowledgement: 0,
            flags: 0,
            window: u16::MAX,
            options: &[],
            payload: BasicPayload::new(payload),
        }
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_acknowledgement(mut self, acknowledgement: u32) -> Self {
        self.acknowledgement = acknowledgement;
        self
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_window(mut self, window: u16) -> Self {
        self.window = window;
        self
    }

    /// Raw option bytes, zero padded to a word boundary when built.
    pub fn with_options(mut self, options: &'a [u8]) -> Self {
        self.options = options;
        self
    }

    fn header_len(&self) -> usize {
        TCP_HEADER_LEN + (self.options.len() + 3) / 4 * 4
    }
}

impl<'a> Ipv4Payload for TcpBuilder<'a> {
    fn next_level_protocol(&self) -> IpNextHeaderProtocol {
        IpNextHeaderProtocols::Tcp
    }
}

impl<'a> Ipv6Payload for TcpBuilder<'a> {
    fn next_header(&self) -> IpNextHeaderProtocol {
        IpNextHeaderProtocols::Tcp
    }
}

impl<'a> Payload for TcpBuilder<'a> {
    fn len(&self) -> usize {
        self.header_len() + self.payload.len()
    }

    fn build(&mut self, buffer: &mut [u8]) -> TxResult {
        let header_len = self.header_len();
        if header_len > TCP_MAX_HEADER_LEN {
            return Err(TxError::TooLargeHeader {
                len: header_len,
                max: TCP_MAX_HEADER_LEN,
            });
        }
        let len = self.len();
        check_buffer(buffer, len)?;
        let mut pkg = TcpPacket::new_unchecked(&mut buffer[..len]);
        pkg.set_source(self.src);
        pkg.set_destination(self.dst);
        pkg.set_sequence(self.sequence);
        pkg.set_acknowledgement(self.acknowledgement);
        pkg.set_data_offset((header_len / 4) as u8);
        pkg.set_flags(self.flags);
        pkg.set_window(self.window);
        pkg.set_urgent_pointer(0);
        {
            let options = pkg.options_mut();
            options.iter_mut().for_each(|b| *b = 0);
            options[..self.options.len()].copy_from_slice(self.options);
        }
        self.payload.build(pkg.payload_mut())?;
        pkg.commit_checksum(&self.pseudo_header);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use crate::packet::build_packet;

    use super::*;

    fn pseudo_header() -> PseudoHeader {
        PseudoHeader::V4 {
            src: Ipv4Addr::new(192, 168, 1, 2),
            dst: Ipv4Addr::new(192, 168, 1, 1),
        }
    }

    #[test]
    fn syn_reference() {
        let mut testee = TcpBuilder::new(pseudo_header(), 40000, 443, &[])
            .with_sequence(1)
            .with_flags(flags::SYN);
        let buffer = build_packet(&mut testee).unwrap();
        assert_eq!(20, buffer.len());
        let pkg = TcpPacket::new(&buffer[..]).unwrap();
        assert_eq!(40000, pkg.source());
        assert_eq!(443, pkg.destination());
        assert_eq!(1, pkg.sequence());
        assert_eq!(5, pkg.data_offset());
        assert!(pkg.has_flags(flags::SYN));
        assert!(!pkg.has_flags(flags::SYN | flags::ACK));
        assert_eq!(65535, pkg.window());
        assert_eq!(0x8e92, pkg.checksum());
        assert!(pkg.verify_checksum(&pseudo_header()));
    }

    #[test]
    fn options_are_padded() {
        // MSS 1460 followed by a lone NOP
        let options = [2, 4, 0x05, 0xb4, 1];
        let mut testee = TcpBuilder::new(pseudo_header(), 1, 2, b"data")
            .with_flags(flags::SYN | flags::ACK)
            .with_options(&options);
        let buffer = build_packet(&mut testee).unwrap();
        let pkg = TcpPacket::new(&buffer[..]).unwrap();
        assert_eq!(28, pkg.header_len());
        assert_eq!(&[2, 4, 0x05, 0xb4, 1, 0, 0, 0], pkg.options());
        assert_eq!(b"data", pkg.payload());
        assert!(pkg.verify_checksum(&pseudo_header()));
    }

    #[test]
    fn too_many_options() {
        let options = [1; 41];
        let mut testee = TcpBuilder::new(pseudo_header(), 1, 2, &[]).with_options(&options);
        match build_packet(&mut testee) {
            Err(TxError::TooLargeHeader { len: 64, max: 60 }) => (),
            other => panic!("Unexpected result: {:?}", other),
        }
        let options = [1; 40];
        let mut testee = TcpBuilder::new(pseudo_header(), 1, 2, &[]).with_options(&options);
        assert_eq!(60, build_packet(&mut testee).unwrap().len());
    }

    #[test]
    fn data_offset_checks() {
        let mut buffer = [0u8; 20];
        buffer[12] = 0x40;
        assert_eq!(RxError::InvalidLength, TcpPacket::new(&buffer[..]).unwrap_err());
        buffer[12] = 0x60;
        assert_eq!(RxError::Truncated, TcpPacket::new(&buffer[..]).unwrap_err());
        assert_eq!(RxError::Truncated, TcpPacket::new(&buffer[..19]).unwrap_err());
    }
}

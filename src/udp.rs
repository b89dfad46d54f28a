//! UDP datagrams (RFC 768).

use std::net::{Ipv4Addr, Ipv6Addr};

use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};

use crate::checksum::{Checksum, PseudoHeader};
use crate::ipv4::Ipv4Payload;
use crate::ipv6::Ipv6Payload;
use crate::packet::{check_buffer, BasicPayload, Checkable, CheckableMut, Header, Payload};
use crate::util::{clamp, read_u16, write_u16};
use crate::{RxError, RxResult, TxError, TxResult};

pub const UDP_HEADER_LEN: usize = 8;

const SOURCE_OFFSET: usize = 0;
const DESTINATION_OFFSET: usize = 2;
const LENGTH_OFFSET: usize = 4;
const CHECKSUM_OFFSET: usize = 6;

#[derive(Debug, Clone)]
pub struct UdpPacket<B> {
    buffer: B,
}

impl<B: AsRef<[u8]>> UdpPacket<B> {
    /// The length field must cover the header and fit in `buffer`.
    pub fn new(buffer: B) -> RxResult<Self> {
        if buffer.as_ref().len() < UDP_HEADER_LEN {
            return Err(RxError::Truncated);
        }
        let pkg = UdpPacket { buffer };
        let length = pkg.length() as usize;
        if length < UDP_HEADER_LEN {
            Err(RxError::InvalidLength)
        } else if length > pkg.buffer.as_ref().len() {
            Err(RxError::Truncated)
        } else {
            Ok(pkg)
        }
    }

    pub(crate) fn new_unchecked(buffer: B) -> Self {
        UdpPacket { buffer }
    }

    pub fn source(&self) -> u16 {
        read_u16(self.buffer.as_ref(), SOURCE_OFFSET)
    }

    pub fn destination(&self) -> u16 {
        read_u16(self.buffer.as_ref(), DESTINATION_OFFSET)
    }

    /// Length of header plus data.
    pub fn length(&self) -> u16 {
        read_u16(self.buffer.as_ref(), LENGTH_OFFSET)
    }

    pub fn payload(&self) -> &[u8] {
        let data = self.buffer.as_ref();
        let (start, end) = clamp(UDP_HEADER_LEN, self.length() as usize, data.len());
        &data[start..end]
    }

    pub fn packet(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    fn datagram(&self) -> &[u8] {
        let data = self.buffer.as_ref();
        &data[..(self.length() as usize).min(data.len())]
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> UdpPacket<B> {
    pub fn set_source(&mut self, port: u16) {
        write_u16(self.buffer.as_mut(), SOURCE_OFFSET, port);
    }

    pub fn set_destination(&mut self, port: u16) {
        write_u16(self.buffer.as_mut(), DESTINATION_OFFSET, port);
    }

    pub fn set_length(&mut self, length: u16) {
        write_u16(self.buffer.as_mut(), LENGTH_OFFSET, length);
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        let length = self.length() as usize;
        let data = self.buffer.as_mut();
        let (start, end) = clamp(UDP_HEADER_LEN, length, data.len());
        &mut data[start..end]
    }
}

impl<B: AsRef<[u8]>> Header for UdpPacket<B> {
    const MIN_SIZE: usize = UDP_HEADER_LEN;

    fn header_len(&self) -> usize {
        UDP_HEADER_LEN
    }
}

impl<B: AsRef<[u8]>> Checkable for UdpPacket<B> {
    type Context = PseudoHeader;

    fn checksum(&self) -> u16 {
        read_u16(self.buffer.as_ref(), CHECKSUM_OFFSET)
    }

    /// A computed zero is sent as all ones, zero on the wire means "no
    /// checksum".
    fn compute_checksum(&self, pseudo: &PseudoHeader) -> u16 {
        let datagram = self.datagram();
        let checksum = Checksum::new()
            .add_pseudo_header(pseudo, IpNextHeaderProtocols::Udp, datagram.len())
            .add_bytes_skipping(datagram, CHECKSUM_OFFSET)
            .finish();
        if checksum == 0 { 0xffff } else { checksum }
    }

    /// Over IPv4 the checksum is optional. It is mandatory over IPv6.
    fn verify_checksum(&self, pseudo: &PseudoHeader) -> bool {
        (pseudo.is_ipv4() && self.checksum() == 0) ||
        self.checksum() == self.compute_checksum(pseudo)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> CheckableMut for UdpPacket<B> {
    fn set_checksum(&mut self, checksum: u16) {
        write_u16(self.buffer.as_mut(), CHECKSUM_OFFSET, checksum);
    }
}

/// Builds a UDP datagram carrying `payload`. Goes inside an `Ipv4Builder` or
/// an `Ipv6Builder` with the same addresses as the pseudo-header.
pub struct UdpBuilder<'a> {
    pseudo_header: PseudoHeader,
    src: u16,
    dst: u16,
    payload: BasicPayload<'a>,
}

impl<'a> UdpBuilder<'a> {
    pub fn new(pseudo_header: PseudoHeader,
               src_port: u16,
               dst_port: u16,
               payload: &'a [u8])
               -> UdpBuilder<'a> {
        UdpBuilder {
            pseudo_header,
            src: src_port,
            dst: dst_port,
            payload: BasicPayload::new(payload),
        }
    }

    pub fn v4(src_ip: Ipv4Addr,
              dst_ip: Ipv4Addr,
              src_port: u16,
              dst_port: u16,
              payload: &'a [u8])
              -> UdpBuilder<'a> {
        let pseudo_header = PseudoHeader::V4 { src: src_ip, dst: dst_ip };
        UdpBuilder::new(pseudo_header, src_port, dst_port, payload)
    }

    pub fn v6(src_ip: Ipv6Addr,
              dst_ip: Ipv6Addr,
              src_port: u16,
              dst_port: u16,
              payload: &'a [u8])
              -> UdpBuilder<'a> {
        let pseudo_header = PseudoHeader::V6 { src: src_ip, dst: dst_ip };
        UdpBuilder::new(pseudo_header, src_port, dst_port, payload)
    }
}

impl<'a> Ipv4Payload for UdpBuilder<'a> {
    fn next_level_protocol(&self) -> IpNextHeaderProtocol {
        IpNextHeaderProtocols::Udp
    }
}

impl<'a> Ipv6Payload for UdpBuilder<'a> {
    fn next_header(&self) -> IpNextHeaderProtocol {
        IpNextHeaderProtocols::Udp
    }
}

impl<'a> Payload for UdpBuilder<'a> {
    fn len(&self) -> usize {
        UDP_HEADER_LEN + self.payload.len()
    }

    fn build(&mut self, buffer: &mut [u8]) -> TxResult {
        let len = self.len();
        if len > u16::MAX as usize {
            return Err(TxError::TooLargePayload);
        }
        check_buffer(buffer, len)?;
        let mut pkg = UdpPacket::new_unchecked(&mut buffer[..len]);
        pkg.set_source(self.src);
        pkg.set_destination(self.dst);
        pkg.set_length(len as u16);
        self.payload.build(pkg.payload_mut())?;
        pkg.commit_checksum(&self.pseudo_header);
        Ok(())
    }
}

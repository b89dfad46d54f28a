use pnet::packet::ethernet::EtherType;
use pnet::util::MacAddr;

use crate::packet::Header;
use crate::util::{read_mac, read_u16, write_mac, write_u16};
use crate::{RxError, RxResult};

use super::ETHERNET_HEADER_LEN;

const DESTINATION_OFFSET: usize = 0;
const SOURCE_OFFSET: usize = 6;
const ETHERTYPE_OFFSET: usize = 12;

/// View of an Ethernet II frame. Held in network byte order, accessors
/// convert to and from host values.
#[derive(Debug, Clone)]
pub struct EthernetFrame<B> {
    buffer: B,
}

impl<B: AsRef<[u8]>> EthernetFrame<B> {
    /// Interprets `buffer` as an Ethernet frame. Fails with `Truncated` if it
    /// can't hold the 14 byte header.
    pub fn new(buffer: B) -> RxResult<Self> {
        if buffer.as_ref().len() < ETHERNET_HEADER_LEN {
            Err(RxError::Truncated)
        } else {
            Ok(EthernetFrame { buffer })
        }
    }

    /// Wraps a buffer the caller already checked to be long enough.
    pub(crate) fn new_unchecked(buffer: B) -> Self {
        EthernetFrame { buffer }
    }

    pub fn destination(&self) -> MacAddr {
        read_mac(self.buffer.as_ref(), DESTINATION_OFFSET)
    }

    pub fn source(&self) -> MacAddr {
        read_mac(self.buffer.as_ref(), SOURCE_OFFSET)
    }

    pub fn ethertype(&self) -> EtherType {
        EtherType::new(read_u16(self.buffer.as_ref(), ETHERTYPE_OFFSET))
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[ETHERNET_HEADER_LEN..]
    }

    pub fn packet(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    pub fn into_inner(self) -> B {
        self.buffer
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> EthernetFrame<B> {
    pub fn set_destination(&mut self, mac: MacAddr) {
        write_mac(self.buffer.as_mut(), DESTINATION_OFFSET, mac);
    }

    pub fn set_source(&mut self, mac: MacAddr) {
        write_mac(self.buffer.as_mut(), SOURCE_OFFSET, mac);
    }

    pub fn set_ethertype(&mut self, ethertype: EtherType) {
        write_u16(self.buffer.as_mut(), ETHERTYPE_OFFSET, ethertype.0);
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[ETHERNET_HEADER_LEN..]
    }
}

impl<B: AsRef<[u8]>> Header for EthernetFrame<B> {
    const MIN_SIZE: usize = ETHERNET_HEADER_LEN;

    fn header_len(&self) -> usize {
        ETHERNET_HEADER_LEN
    }
}

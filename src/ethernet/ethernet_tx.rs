use pnet::packet::ethernet::EtherType;
use pnet::util::MacAddr;

use crate::packet::{check_buffer, BasicPayload, Payload};
use crate::TxResult;

use super::{EthernetFrame, ETHERNET_HEADER_LEN};

/// Trait for anything wishing to be the payload of an Ethernet frame.
pub trait EthernetPayload: Payload {
    fn ether_type(&self) -> EtherType;
}

/// Basic reference implementation of an `EthernetPayload`.
/// Can be used to construct Ethernet frames with arbitrary payload from a
/// slice.
pub struct BasicEthernetPayload<'a> {
    ether_type: EtherType,
    payload: BasicPayload<'a>,
}

impl<'a> BasicEthernetPayload<'a> {
    pub fn new(ether_type: EtherType, payload: &'a [u8]) -> Self {
        BasicEthernetPayload {
            ether_type,
            payload: BasicPayload::new(payload),
        }
    }
}

impl<'a> EthernetPayload for BasicEthernetPayload<'a> {
    fn ether_type(&self) -> EtherType {
        self.ether_type
    }
}

impl<'a> Payload for BasicEthernetPayload<'a> {
    fn len(&self) -> usize {
        self.payload.len()
    }

    fn build(&mut self, buffer: &mut [u8]) -> TxResult {
        self.payload.build(buffer)
    }
}

/// Struct building Ethernet frames
pub struct EthernetBuilder<P: EthernetPayload> {
    src: MacAddr,
    dst: MacAddr,
    payload: P,
}

impl<P: EthernetPayload> EthernetBuilder<P> {
    /// Creates a new `EthernetBuilder` with the given parameters
    pub fn new(src: MacAddr, dst: MacAddr, payload: P) -> Self {
        EthernetBuilder { src, dst, payload }
    }
}

impl<P: EthernetPayload> Payload for EthernetBuilder<P> {
    fn len(&self) -> usize {
        ETHERNET_HEADER_LEN + self.payload.len()
    }

    fn build(&mut self, buffer: &mut [u8]) -> TxResult {
        check_buffer(buffer, self.len())?;
        let ether_type = self.payload.ether_type();
        let mut pkg = EthernetFrame::new_unchecked(buffer);
        pkg.set_source(self.src);
        pkg.set_destination(self.dst);
        pkg.set_ethertype(ether_type);
        self.payload.build(pkg.payload_mut())
    }
}

//! ARP for IPv4 over Ethernet (RFC 826). Other hardware/protocol
//! combinations are rejected as a protocol mismatch.

use std::net::Ipv4Addr;

use pnet::packet::arp::{ArpHardwareType, ArpHardwareTypes, ArpOperation, ArpOperations};
use pnet::packet::ethernet::{EtherType, EtherTypes};
use pnet::util::MacAddr;

use crate::ethernet::EthernetPayload;
use crate::packet::{check_buffer, Header, Payload};
use crate::util::{read_ipv4, read_mac, read_u16, write_ipv4, write_mac, write_u16};
use crate::{RxError, RxResult, TxResult};

pub const ARP_PACKET_LEN: usize = 28;

const HARDWARE_TYPE_OFFSET: usize = 0;
const PROTOCOL_TYPE_OFFSET: usize = 2;
const HW_ADDR_LEN_OFFSET: usize = 4;
const PROTO_ADDR_LEN_OFFSET: usize = 5;
const OPERATION_OFFSET: usize = 6;
const SENDER_HW_OFFSET: usize = 8;
const SENDER_PROTO_OFFSET: usize = 14;
const TARGET_HW_OFFSET: usize = 18;
const TARGET_PROTO_OFFSET: usize = 24;

/// View of an ARP packet mapping IPv4 addresses to Ethernet addresses.
#[derive(Debug, Clone)]
pub struct ArpPacket<B> {
    buffer: B,
}

impl<B: AsRef<[u8]>> ArpPacket<B> {
    pub fn new(buffer: B) -> RxResult<Self> {
        let data = buffer.as_ref();
        if data.len() < ARP_PACKET_LEN {
            return Err(RxError::Truncated);
        }
        let ipv4_over_ethernet =
            ArpHardwareType::new(read_u16(data, HARDWARE_TYPE_OFFSET)) == ArpHardwareTypes::Ethernet &&
            EtherType::new(read_u16(data, PROTOCOL_TYPE_OFFSET)) == EtherTypes::Ipv4 &&
            data[HW_ADDR_LEN_OFFSET] == 6 && data[PROTO_ADDR_LEN_OFFSET] == 4;
        if ipv4_over_ethernet {
            Ok(ArpPacket { buffer })
        } else {
            Err(RxError::ProtocolMismatch)
        }
    }

    pub fn operation(&self) -> ArpOperation {
        ArpOperation::new(read_u16(self.buffer.as_ref(), OPERATION_OFFSET))
    }

    pub fn sender_hw_addr(&self) -> MacAddr {
        read_mac(self.buffer.as_ref(), SENDER_HW_OFFSET)
    }

    pub fn sender_proto_addr(&self) -> Ipv4Addr {
        read_ipv4(self.buffer.as_ref(), SENDER_PROTO_OFFSET)
    }

    pub fn target_hw_addr(&self) -> MacAddr {
        read_mac(self.buffer.as_ref(), TARGET_HW_OFFSET)
    }

    pub fn target_proto_addr(&self) -> Ipv4Addr {
        read_ipv4(self.buffer.as_ref(), TARGET_PROTO_OFFSET)
    }

    pub fn packet(&self) -> &[u8] {
        &self.buffer.as_ref()[..ARP_PACKET_LEN]
    }
}

impl<B: AsRef<[u8]>> Header for ArpPacket<B> {
    const MIN_SIZE: usize = ARP_PACKET_LEN;

    fn header_len(&self) -> usize {
        ARP_PACKET_LEN
    }
}

/// Builds ARP requests and replies. Goes inside an `EthernetBuilder`.
#[derive(Debug, Clone, Copy)]
pub struct ArpBuilder {
    operation: ArpOperation,
    sender_mac: MacAddr,
    sender_ip: Ipv4Addr,
    target_mac: MacAddr,
    target_ip: Ipv4Addr,
}

impl ArpBuilder {
    /// "Who has `target_ip`? Tell `sender_ip`". The target hardware address
    /// is left zeroed.
    pub fn request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        ArpBuilder {
            operation: ArpOperations::Request,
            sender_mac,
            sender_ip,
            target_mac: MacAddr::zero(),
            target_ip,
        }
    }

    pub fn reply(sender_mac: MacAddr,
                 sender_ip: Ipv4Addr,
                 target_mac: MacAddr,
                 target_ip: Ipv4Addr)
                 -> Self {
        ArpBuilder {
            operation: ArpOperations::Reply,
            sender_mac,
            sender_ip,
            target_mac,
            target_ip,
        }
    }
}

impl EthernetPayload for ArpBuilder {
    fn ether_type(&self) -> EtherType {
        EtherTypes::Arp
    }
}

impl Payload for ArpBuilder {
    fn len(&self) -> usize {
        ARP_PACKET_LEN
    }

    fn build(&mut self, buffer: &mut [u8]) -> TxResult {
        check_buffer(buffer, ARP_PACKET_LEN)?;
        write_u16(buffer, HARDWARE_TYPE_OFFSET, ArpHardwareTypes::Ethernet.0);
        write_u16(buffer, PROTOCOL_TYPE_OFFSET, EtherTypes::Ipv4.0);
        buffer[HW_ADDR_LEN_OFFSET] = 6;
        buffer[PROTO_ADDR_LEN_OFFSET] = 4;
        write_u16(buffer, OPERATION_OFFSET, self.operation.0);
        write_mac(buffer, SENDER_HW_OFFSET, self.sender_mac);
        write_ipv4(buffer, SENDER_PROTO_OFFSET, self.sender_ip);
        write_mac(buffer, TARGET_HW_OFFSET, self.target_mac);
        write_ipv4(buffer, TARGET_PROTO_OFFSET, self.target_ip);
        Ok(())
    }
}

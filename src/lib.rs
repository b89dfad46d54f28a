//! # rips-probe
//!
//! Zero-copy parsing and construction of Ethernet, ARP, IPv4, IPv6, ICMP,
//! ICMPv6, TCP and UDP headers directly over byte buffers, the internet
//! checksum family, and an ICMP echo probing engine built on top of them.
//!
//! Every header has a view type (`Ipv4Packet`, `UdpPacket`, ...) wrapping
//! any `AsRef<[u8]>` buffer, and a builder implementing `Payload` that nests
//! inside the builder of the protocol carrying it:
//!
//! ```
//! use std::net::Ipv4Addr;
//!
//! use rips_probe::chain::{ParseChain, Protocol};
//! use rips_probe::icmp::{Echo, IcmpBuilder};
//! use rips_probe::ipv4::Ipv4Builder;
//! use rips_probe::packet::build_packet;
//!
//! let icmp = IcmpBuilder::new(Echo::request(1, 1, b"hello"));
//! let mut ip = Ipv4Builder::new(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), 0, icmp);
//! let buffer = build_packet(&mut ip).unwrap();
//!
//! let chain = ParseChain::new(Protocol::Ipv4).parse(&buffer).unwrap();
//! assert_eq!(1, chain.icmp().unwrap().sequence());
//! assert_eq!(b"hello", chain.payload());
//! ```

mod errors;

pub mod arp;
pub mod chain;
pub mod checksum;
pub mod ethernet;
pub mod icmp;
pub mod ipv4;
pub mod ipv6;
pub mod packet;
pub mod probe;
pub mod tcp;
pub mod udp;
pub mod util;

#[cfg(test)]
mod testing;

pub use crate::errors::{RxError, RxResult, TxError, TxResult};
pub use crate::packet::{BasicPayload, Payload};

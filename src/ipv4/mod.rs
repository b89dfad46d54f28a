//! IPv4 headers, including options.

mod ipv4_rx;
mod ipv4_tx;

pub use self::ipv4_rx::Ipv4Packet;
pub use self::ipv4_tx::{BasicIpv4Payload, Ipv4Builder, Ipv4Payload};

pub const MORE_FRAGMENTS: u8 = 0b001;
pub const DONT_FRAGMENT: u8 = 0b010;
pub const NO_FLAGS: u8 = 0b000;

/// Header length without options.
pub const IPV4_HEADER_LEN: usize = 20;

/// IHL is four bits counting 32 bit words.
pub const IPV4_MAX_HEADER_LEN: usize = 60;

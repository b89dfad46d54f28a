//! IPv6 fixed header and the extension headers a parser has to step over.

mod ipv6_rx;
mod ipv6_tx;

pub use self::ipv6_rx::{is_extension_header, Ipv6ExtensionHeader, Ipv6Packet};
pub use self::ipv6_tx::{BasicIpv6Payload, Ipv6Builder, Ipv6Payload, DEFAULT_HOP_LIMIT};

pub const IPV6_HEADER_LEN: usize = 40;

/// Every extension header is at least this long.
pub const IPV6_EXTENSION_MIN_LEN: usize = 8;

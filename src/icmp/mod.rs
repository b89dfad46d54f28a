//! ICMP and ICMPv6. Both share the four byte type/code/checksum preamble and
//! a four byte rest-of-header word, which echo messages split into an
//! identifier and a sequence number.

mod icmp_rx;
mod icmp_tx;

pub use self::icmp_rx::{IcmpPacket, Icmpv6Packet};
pub use self::icmp_tx::{BasicIcmpPayload, BasicIcmpv6Payload, Echo, IcmpBuilder, IcmpPayload,
                        Icmpv6Builder, Icmpv6Payload};

pub const ICMP_HEADER_LEN: usize = 8;

//! Ethernet II frames: parsing views and frame construction.

mod ethernet_rx;
mod ethernet_tx;

pub use self::ethernet_rx::EthernetFrame;
pub use self::ethernet_tx::{BasicEthernetPayload, EthernetBuilder, EthernetPayload};

/// Destination, source and ethertype.
pub const ETHERNET_HEADER_LEN: usize = 14;

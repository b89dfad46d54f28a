//! Big-endian field access shared by the header views. Callers guarantee the
//! offsets are inside the buffer, the views check their minimum size once on
//! construction.

use std::net::{Ipv4Addr, Ipv6Addr};

use pnet::util::MacAddr;

mod view;

pub use self::view::ByteView;

pub(crate) fn read_u16(buffer: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buffer[offset], buffer[offset + 1]])
}

pub(crate) fn write_u16(buffer: &mut [u8], offset: usize, value: u16) {
    buffer[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

pub(crate) fn read_u32(buffer: &[u8], offset: usize) -> u32 {
    let mut bytes = [0; 4];
    bytes.copy_from_slice(&buffer[offset..offset + 4]);
    u32::from_be_bytes(bytes)
}

pub(crate) fn write_u32(buffer: &mut [u8], offset: usize, value: u32) {
    buffer[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

pub(crate) fn read_ipv4(buffer: &[u8], offset: usize) -> Ipv4Addr {
    Ipv4Addr::from(read_u32(buffer, offset))
}

pub(crate) fn write_ipv4(buffer: &mut [u8], offset: usize, addr: Ipv4Addr) {
    buffer[offset..offset + 4].copy_from_slice(&addr.octets());
}

pub(crate) fn read_ipv6(buffer: &[u8], offset: usize) -> Ipv6Addr {
    let mut octets = [0; 16];
    octets.copy_from_slice(&buffer[offset..offset + 16]);
    Ipv6Addr::from(octets)
}

pub(crate) fn write_ipv6(buffer: &mut [u8], offset: usize, addr: Ipv6Addr) {
    buffer[offset..offset + 16].copy_from_slice(&addr.octets());
}

pub(crate) fn read_mac(buffer: &[u8], offset: usize) -> MacAddr {
    let b = &buffer[offset..offset + 6];
    MacAddr::new(b[0], b[1], b[2], b[3], b[4], b[5])
}

pub(crate) fn write_mac(buffer: &mut [u8], offset: usize, mac: MacAddr) {
    let MacAddr(a, b, c, d, e, f) = mac;
    buffer[offset..offset + 6].copy_from_slice(&[a, b, c, d, e, f]);
}

/// Clamps `start..end` into a buffer of length `len`, so accessors on a view
/// whose length fields are not yet trustworthy never index out of bounds.
pub(crate) fn clamp(start: usize, end: usize, len: usize) -> (usize, usize) {
    let end = end.min(len);
    (start.min(end), end)
}

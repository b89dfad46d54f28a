//! Capability traits shared by all header views, and the `Payload` trait the
//! builders are composed from.

use crate::{TxError, TxResult};

/// Geometry every header view knows about itself.
pub trait Header {
    /// Smallest number of bytes that can hold this header.
    const MIN_SIZE: usize;

    /// Length of this particular header including variable-length parts
    /// (IPv4 options, TCP options, IPv6 extension header data).
    fn header_len(&self) -> usize;
}

/// A header protected by an internet checksum.
pub trait Checkable: Header {
    /// What besides the header and its payload the checksum covers. `()` for
    /// IPv4 and ICMP, a `PseudoHeader` for UDP, TCP and ICMPv6.
    type Context: ?Sized;

    /// The value currently stored in the checksum field.
    fn checksum(&self) -> u16;

    /// Computes the checksum over the same span `commit_checksum` covers,
    /// with the checksum field itself skipped.
    fn compute_checksum(&self, context: &Self::Context) -> u16;

    fn verify_checksum(&self, context: &Self::Context) -> bool {
        self.checksum() == self.compute_checksum(context)
    }
}

/// Mutable counterpart of `Checkable`.
pub trait CheckableMut: Checkable {
    fn set_checksum(&mut self, checksum: u16);

    /// Computes and stores the checksum. Must run after every other byte of
    /// the covered span has its final value.
    fn commit_checksum(&mut self, context: &Self::Context) {
        let checksum = self.compute_checksum(context);
        self.set_checksum(checksum);
    }
}

/// Anything that can be serialized into a packet buffer. Builders for the
/// outer protocols wrap the builder of the protocol they carry.
pub trait Payload {
    /// Number of bytes `build` writes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the payload into `buffer`, which is at least `len()` bytes.
    fn build(&mut self, buffer: &mut [u8]) -> TxResult;
}

/// Raw bytes as a payload.
#[derive(Debug, Clone, Copy)]
pub struct BasicPayload<'a> {
    payload: &'a [u8],
}

impl<'a> BasicPayload<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        BasicPayload { payload }
    }
}

impl<'a> Payload for BasicPayload<'a> {
    fn len(&self) -> usize {
        self.payload.len()
    }

    fn build(&mut self, buffer: &mut [u8]) -> TxResult {
        check_buffer(buffer, self.payload.len())?;
        buffer[..self.payload.len()].copy_from_slice(self.payload);
        Ok(())
    }
}

/// Builds `payload` into a freshly allocated buffer of exactly its length.
pub fn build_packet<P: Payload>(payload: &mut P) -> TxResult<Vec<u8>> {
    let mut buffer = vec![0; payload.len()];
    payload.build(&mut buffer)?;
    Ok(buffer)
}

/// Builds `payload` into the start of a caller provided buffer and returns
/// the number of bytes written.
pub fn build_into<P: Payload>(payload: &mut P, buffer: &mut [u8]) -> TxResult<usize> {
    let len = payload.len();
    check_buffer(buffer, len)?;
    payload.build(&mut buffer[..len])?;
    Ok(len)
}

pub(crate) fn check_buffer(buffer: &[u8], needed: usize) -> TxResult {
    if buffer.len() < needed {
        Err(TxError::InsufficientBuffer {
            needed,
            available: buffer.len(),
        })
    } else {
        Ok(())
    }
}

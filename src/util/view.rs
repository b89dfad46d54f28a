use crate::{RxError, RxResult};

/// A bounds-tracked, non-owning window `[start, end)` into a byte buffer.
///
/// The window only ever shrinks. Every read is checked against `end`, so a
/// truncated packet yields `None`/`RxError::Truncated` instead of reading
/// whatever follows it in the underlying storage.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ByteView<'a> {
    data: &'a [u8],
    start: usize,
    end: usize,
}

impl<'a> ByteView<'a> {
    /// Creates a view covering all of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        ByteView {
            data,
            start: 0,
            end: data.len(),
        }
    }

    /// Creates a view over `data[start..end]`. Returns `None` unless
    /// `start <= end <= data.len()`.
    pub fn with_range(data: &'a [u8], start: usize, end: usize) -> Option<Self> {
        if start <= end && end <= data.len() {
            Some(ByteView { data, start, end })
        } else {
            None
        }
    }

    /// Offset of the first byte of the window in the underlying buffer.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Offset one past the last byte of the window in the underlying buffer.
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The bytes inside the window. The returned slice borrows the
    /// underlying buffer, not the view.
    pub fn as_slice(&self) -> &'a [u8] {
        &self.data[self.start..self.end]
    }

    pub fn u8_at(&self, offset: usize) -> Option<u8> {
        self.as_slice().get(offset).copied()
    }

    /// Reads a big-endian `u16` at `offset` relative to `start`.
    pub fn u16_at(&self, offset: usize) -> Option<u16> {
        self.bytes_at(offset, 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    /// Reads a big-endian `u32` at `offset` relative to `start`.
    pub fn u32_at(&self, offset: usize) -> Option<u32> {
        self.bytes_at(offset, 4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn bytes_at(&self, offset: usize, len: usize) -> Option<&'a [u8]> {
        let end = offset.checked_add(len)?;
        self.as_slice().get(offset..end)
    }

    /// Splits off and returns the first `n` bytes, moving `start` past them.
    pub fn advance(&mut self, n: usize) -> RxResult<ByteView<'a>> {
        if n > self.len() {
            return Err(RxError::Truncated);
        }
        let head = ByteView {
            data: self.data,
            start: self.start,
            end: self.start + n,
        };
        self.start += n;
        Ok(head)
    }

    /// Shrinks the window to its first `len` bytes. Used when a length field
    /// says the packet ends before the buffer does (Ethernet padding etc).
    pub fn truncate(&mut self, len: usize) -> RxResult {
        if len > self.len() {
            return Err(RxError::Truncated);
        }
        self.end = self.start + len;
        Ok(())
    }
}

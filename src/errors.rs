use std::io;

use thiserror::Error;

/// Enum representing errors happening while trying to construct packets.
#[derive(Debug, Error)]
pub enum TxError {
    /// The buffer handed to a builder is smaller than the packet it builds.
    #[error("insufficient buffer: need {needed} bytes, got {available}")]
    InsufficientBuffer { needed: usize, available: usize },

    /// Returned when the payload does not fit in the given protocol. For
    /// example building a packet with more than 2^16 bytes in a protocol
    /// with a 16 bit length field
    #[error("too large payload")]
    TooLargePayload,

    /// Options make the header longer than its length field can express.
    #[error("{len} byte header exceeds the maximum of {max}")]
    TooLargeHeader { len: usize, max: usize },

    /// Returned when there was an `IoError` while handing a packet over
    #[error("io error: {0}")]
    IoError(#[from] io::Error),

    /// Any other error not covered by the more specific enum variants
    #[error("other error: {0}")]
    Other(String),
}

impl From<TxError> for io::Error {
    fn from(e: TxError) -> Self {
        match e {
            TxError::IoError(e2) => e2,
            other => io::Error::new(io::ErrorKind::Other, other.to_string()),
        }
    }
}

/// Error returned when an incoming buffer can't be interpreted as the
/// header, or chain of headers, it was expected to hold.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum RxError {
    /// The buffer is shorter than the header, or than a length field in the
    /// header claims.
    #[error("packet truncated")]
    Truncated,

    /// A length field holds a value no valid packet can have, e.g. an IPv4
    /// IHL below five words.
    #[error("invalid length field in packet")]
    InvalidLength,

    /// When a packet contains an invalid checksum.
    #[error("invalid checksum in packet")]
    ChecksumMismatch,

    /// The version, ethertype or next header field does not select the
    /// protocol that was expected at this point of the chain.
    #[error("unexpected protocol in header chain")]
    ProtocolMismatch,
}

pub type TxResult<T = ()> = Result<T, TxError>;

pub type RxResult<T = ()> = Result<T, RxError>;

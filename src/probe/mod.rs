//! ICMP echo probing. A `ProbeEngine` keeps any number of echo requests
//! outstanding over one socket and matches the replies a reactor feeds it
//! back to the probes that caused them.
//!
//! The engine never reads from the socket and never sleeps. Whoever owns the
//! event loop calls `on_receive` with every buffer the socket delivers and
//! `on_tick` whenever `next_deadline` passes.

use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::TxError;

mod config;
mod engine;
mod socket;
mod strategy;
mod table;

pub use self::config::{EngineConfig, Framing, DEFAULT_PAYLOAD_SIZE};
pub use self::engine::{Handle, ProbeEngine};
pub use self::socket::{IcmpSocket, ProbeSocket};
pub use self::strategy::{EchoReply, EchoStrategy, Icmpv4Strategy, Icmpv6Strategy};
pub use self::table::{ProbeKey, ProbeStats};

/// Why a probe ended without a reply, or could not be started.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The target is not of the address family the engine probes.
    #[error("target address family does not match the probe strategy")]
    InvalidAddress,

    /// No reply arrived before the last deadline.
    #[error("no echo reply before the deadline")]
    Timeout,

    /// The engine was shut down or dropped while the probe was pending, or
    /// `send` was called after `shutdown`.
    #[error("probe engine shut down")]
    Shutdown,

    /// The socket failed. Every probe pending at the time gets a clone of
    /// the same error and the engine stops accepting probes.
    #[error("socket error: {0}")]
    Socket(Arc<io::Error>),

    /// `send` on an engine that already saw a socket error.
    #[error("probe engine is defunct after an earlier socket error")]
    Defunct,

    /// All 65536 sequence numbers are pending.
    #[error("no free sequence number")]
    Exhausted,

    #[error("unable to build echo request: {0}")]
    Build(#[from] TxError),
}

/// A matched echo reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The address the request was sent to.
    pub target: IpAddr,
    pub sequence: u16,
    /// Time from the last transmission of the request to the reply.
    pub rtt: Duration,
    /// Length of the echoed data, headers excluded.
    pub bytes: usize,
    /// TTL or hop limit of the reply, when the socket delivers the IP header.
    pub ttl: Option<u8>,
    /// Source address of the reply, when the socket delivers the IP header.
    pub source: Option<IpAddr>,
}

/// What the completion callback of a probe receives, exactly once.
pub type ProbeOutcome = Result<Reply, ProbeError>;

//! Test doubles shared by the unit tests.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use crate::icmp::{Echo, IcmpBuilder, Icmpv6Builder};
use crate::ipv4::Ipv4Builder;
use crate::packet::build_packet;
use crate::probe::ProbeSocket;

/// Socket handing every sent packet to a channel.
pub struct MockSocket {
    chan: Mutex<Sender<(IpAddr, Vec<u8>)>>,
    failure: Mutex<Option<io::ErrorKind>>,
}

impl MockSocket {
    pub fn new() -> (MockSocket, Receiver<(IpAddr, Vec<u8>)>) {
        let (tx, rx) = mpsc::channel();
        let socket = MockSocket {
            chan: Mutex::new(tx),
            failure: Mutex::new(None),
        };
        (socket, rx)
    }

    /// Makes every following send fail with `kind`.
    pub fn fail_sends(&self, kind: io::ErrorKind) {
        *self.failure.lock().unwrap() = Some(kind);
    }
}

impl ProbeSocket for MockSocket {
    fn send_to(&self, packet: &[u8], target: IpAddr) -> io::Result<()> {
        if let Some(kind) = *self.failure.lock().unwrap() {
            return Err(io::Error::new(kind, "mock failure"));
        }
        self.chan
            .lock()
            .unwrap()
            .send((target, packet.to_vec()))
            .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e.to_string()))
    }
}

/// An IPv4 packet holding an ICMP echo reply, as a raw IPv4 socket reads it.
pub fn echo_reply_v4(src: Ipv4Addr,
                     dst: Ipv4Addr,
                     identifier: u16,
                     sequence: u16,
                     payload: &[u8],
                     ttl: u8)
                     -> Vec<u8> {
    let icmp = IcmpBuilder::new(Echo::reply(identifier, sequence, payload));
    build_packet(&mut Ipv4Builder::new(src, dst, 0, icmp).with_ttl(ttl)).unwrap()
}

/// A bare ICMPv6 echo reply with its checksum, as a raw ICMPv6 socket reads
/// it.
pub fn echo_reply_v6(src: Ipv6Addr,
                     dst: Ipv6Addr,
                     identifier: u16,
                     sequence: u16,
                     payload: &[u8])
                     -> Vec<u8> {
    let echo = Echo::reply(identifier, sequence, payload);
    build_packet(&mut Icmpv6Builder::new(echo).with_addresses(src, dst)).unwrap()
}

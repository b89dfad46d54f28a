use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use rips_probe::ethernet::EthernetBuilder;
use rips_probe::icmp::{Echo, IcmpBuilder, Icmpv6Builder};
use rips_probe::ipv4::Ipv4Builder;
use rips_probe::ipv6::Ipv6Builder;
use rips_probe::packet::build_packet;
use rips_probe::probe::ProbeSocket;

use pnet::util::MacAddr;

/// Probe socket that hands every request to a channel instead of the
/// network.
pub struct MockSocket {
    chan: Mutex<Sender<(IpAddr, Vec<u8>)>>,
}

impl MockSocket {
    pub fn new() -> (MockSocket, Receiver<(IpAddr, Vec<u8>)>) {
        let (tx, rx) = mpsc::channel();
        (MockSocket { chan: Mutex::new(tx) }, rx)
    }
}

impl ProbeSocket for MockSocket {
    fn send_to(&self, packet: &[u8], target: IpAddr) -> io::Result<()> {
        self.chan
            .lock()
            .unwrap()
            .send((target, packet.to_vec()))
            .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e.to_string()))
    }
}

/// Reads identifier and sequence from a sent echo request.
pub fn echo_ids(request: &[u8]) -> (u16, u16) {
    (u16::from_be_bytes([request[4], request[5]]), u16::from_be_bytes([request[6], request[7]]))
}

/// What a raw IPv4 ICMP socket reads when `src` answers `request`.
pub fn answer_v4(src: Ipv4Addr, dst: Ipv4Addr, request: &[u8]) -> Vec<u8> {
    let (identifier, sequence) = echo_ids(request);
    let icmp = IcmpBuilder::new(Echo::reply(identifier, sequence, &request[8..]));
    build_packet(&mut Ipv4Builder::new(src, dst, 0, icmp)).unwrap()
}

/// The same as `answer_v4` for ICMPv6, including link and IP headers.
pub fn answer_v6_ethernet(src: Ipv6Addr, dst: Ipv6Addr, request: &[u8]) -> Vec<u8> {
    let (identifier, sequence) = echo_ids(request);
    let icmp = Icmpv6Builder::new(Echo::reply(identifier, sequence, &request[8..]))
        .with_addresses(src, dst);
    let ip = Ipv6Builder::new(src, dst, icmp).with_hop_limit(61);
    let mut frame = EthernetBuilder::new(MacAddr::new(2, 0, 0, 0, 0, 2),
                                         MacAddr::new(2, 0, 0, 0, 0, 1),
                                         ip);
    build_packet(&mut frame).unwrap()
}

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use pnet::packet::ethernet::{EtherTypes, EthernetPacket as PnetEthernetPacket,
                             MutableEthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{self, MutableIpv4Packet};
use pnet::packet::ipv6::Ipv6Packet as PnetIpv6Packet;
use pnet::packet::udp::{self, MutableUdpPacket};
use pnet::packet::Packet;
use pnet::util::MacAddr;

use rips_probe::chain::{Layer, ParseChain, Protocol};
use rips_probe::ethernet::EthernetBuilder;
use rips_probe::ipv6::Ipv6Builder;
use rips_probe::packet::build_packet;
use rips_probe::udp::UdpBuilder;
use rips_probe::RxError;

const SRC: Ipv4Addr = Ipv4Addr::new(192, 168, 10, 1);
const DST: Ipv4Addr = Ipv4Addr::new(192, 168, 10, 2);

/// Ethernet + IPv4 + UDP("hello") written with pnet's mutable packets.
fn pnet_frame() -> Vec<u8> {
    let mut buffer = vec![0; 14 + 20 + 8 + 5];
    {
        let mut eth = MutableEthernetPacket::new(&mut buffer).unwrap();
        eth.set_source(MacAddr::new(2, 0, 0, 0, 0, 1));
        eth.set_destination(MacAddr::new(2, 0, 0, 0, 0, 2));
        eth.set_ethertype(EtherTypes::Ipv4);
    }
    {
        let mut ip = MutableIpv4Packet::new(&mut buffer[14..]).unwrap();
        ip.set_version(4);
        ip.set_header_length(5);
        ip.set_total_length(33);
        ip.set_ttl(64);
        ip.set_next_level_protocol(IpNextHeaderProtocols::Udp);
        ip.set_source(SRC);
        ip.set_destination(DST);
        let checksum = ipv4::checksum(&ip.to_immutable());
        ip.set_checksum(checksum);
    }
    {
        let mut pkg = MutableUdpPacket::new(&mut buffer[34..]).unwrap();
        pkg.set_source(5000);
        pkg.set_destination(6000);
        pkg.set_length(13);
        pkg.set_payload(b"hello");
        let checksum = udp::ipv4_checksum(&pkg.to_immutable(), &SRC, &DST);
        pkg.set_checksum(checksum);
    }
    buffer
}

#[test]
fn parses_pnet_frame() {
    let buffer = pnet_frame();
    let chain = ParseChain::new(Protocol::Ethernet)
        .expect(&[Protocol::Ethernet, Protocol::Ipv4, Protocol::Udp])
        .parse(&buffer)
        .unwrap();
    assert_eq!(MacAddr::new(2, 0, 0, 0, 0, 1), chain.ethernet().unwrap().source());
    let ip = chain.ipv4().unwrap();
    assert_eq!(33, ip.total_length());
    assert_eq!(64, ip.ttl());
    let pkg = chain.udp().unwrap();
    assert_eq!(5000, pkg.source());
    assert_eq!(6000, pkg.destination());
    assert_eq!(b"hello", chain.payload());
    assert_eq!(Some(IpAddr::V4(SRC)), chain.source());
    assert_eq!(Some(IpAddr::V4(DST)), chain.destination());
}

#[test]
fn corrupt_udp_checksum_rejected() {
    let mut buffer = pnet_frame();
    buffer[42] ^= 0x20;
    let parser = ParseChain::new(Protocol::Ethernet);
    assert_eq!(RxError::ChecksumMismatch, parser.parse(&buffer).unwrap_err());
    let chain = parser.verify_checksums(false).parse(&buffer).unwrap();
    assert_eq!(b"Hello", chain.payload());
}

#[test]
fn truncated_everywhere() {
    let buffer = pnet_frame();
    let parser = ParseChain::new(Protocol::Ethernet);
    for len in 14..buffer.len() {
        assert_eq!(RxError::Truncated, parser.parse(&buffer[..len]).unwrap_err());
    }
}

#[test]
fn pnet_parses_our_ipv6_frame() {
    let src: Ipv6Addr = "2001:db8::1".parse().unwrap();
    let dst: Ipv6Addr = "2001:db8::2".parse().unwrap();
    let udp = UdpBuilder::v6(src, dst, 5353, 5353, b"hi");
    let ip = Ipv6Builder::new(src, dst, udp).with_hop_limit(255);
    let mut frame = EthernetBuilder::new(MacAddr::new(2, 0, 0, 0, 0, 1),
                                         MacAddr::new(0x33, 0x33, 0, 0, 0, 0xfb),
                                         ip);
    let buffer = build_packet(&mut frame).unwrap();

    let eth = PnetEthernetPacket::new(&buffer).unwrap();
    assert_eq!(EtherTypes::Ipv6, eth.get_ethertype());
    let ip = PnetIpv6Packet::new(eth.payload()).unwrap();
    assert_eq!(10, ip.get_payload_length());
    assert_eq!(255, ip.get_hop_limit());
    assert_eq!(src, ip.get_source());
    assert_eq!(IpNextHeaderProtocols::Udp, ip.get_next_header());

    let chain = ParseChain::new(Protocol::Ethernet).parse(&buffer).unwrap();
    assert_eq!(0x122a, pnet::packet::udp::UdpPacket::new(&buffer[54..]).unwrap().get_checksum());
    assert!(matches!(chain.layers()[1], Layer::Ipv6(_)));
    assert_eq!(b"hi", chain.payload());
}

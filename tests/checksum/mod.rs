//! Checksums committed by the builders, checked against pnet's own packet
//! implementations.

use std::net::{Ipv4Addr, Ipv6Addr};

use lazy_static::lazy_static;
use pnet::packet::icmp::IcmpPacket as PnetIcmpPacket;
use pnet::packet::icmpv6::Icmpv6Packet as PnetIcmpv6Packet;
use pnet::packet::ipv4::Ipv4Packet as PnetIpv4Packet;
use pnet::packet::tcp::TcpPacket as PnetTcpPacket;
use pnet::packet::udp::UdpPacket as PnetUdpPacket;

use rips_probe::checksum::PseudoHeader;
use rips_probe::icmp::{Echo, IcmpBuilder, Icmpv6Builder};
use rips_probe::ipv4::{Ipv4Builder, Ipv4Packet};
use rips_probe::packet::{build_packet, Checkable};
use rips_probe::tcp::{flags, TcpBuilder, TcpPacket};
use rips_probe::udp::{UdpBuilder, UdpPacket};

lazy_static! {
    static ref SRC4: Ipv4Addr = Ipv4Addr::new(172, 16, 0, 10);
    static ref DST4: Ipv4Addr = Ipv4Addr::new(8, 8, 4, 4);
    static ref SRC6: Ipv6Addr = "2001:db8:1::10".parse().unwrap();
    static ref DST6: Ipv6Addr = "2001:db8:2::53".parse().unwrap();
}

fn odd_payload() -> Vec<u8> {
    (0..37).map(|i| (i * 7) as u8).collect()
}

#[test]
fn ipv4_header() {
    let payload = odd_payload();
    let udp = UdpBuilder::v4(*SRC4, *DST4, 53000, 53, &payload);
    let mut builder = Ipv4Builder::new(*SRC4, *DST4, 0xbeef, udp).with_ttl(17);
    let buffer = build_packet(&mut builder).unwrap();
    let ours = Ipv4Packet::new(&buffer[..]).unwrap();
    let theirs = PnetIpv4Packet::new(&buffer).unwrap();
    assert_eq!(pnet::packet::ipv4::checksum(&theirs), ours.checksum());
}

#[test]
fn udp_over_ipv4() {
    let payload = odd_payload();
    let buffer = build_packet(&mut UdpBuilder::v4(*SRC4, *DST4, 53000, 53, &payload)).unwrap();
    let ours = UdpPacket::new(&buffer[..]).unwrap();
    let theirs = PnetUdpPacket::new(&buffer).unwrap();
    assert_eq!(pnet::packet::udp::ipv4_checksum(&theirs, &SRC4, &DST4), ours.checksum());
}

#[test]
fn udp_over_ipv6() {
    let payload = odd_payload();
    let buffer = build_packet(&mut UdpBuilder::v6(*SRC6, *DST6, 53000, 53, &payload)).unwrap();
    let ours = UdpPacket::new(&buffer[..]).unwrap();
    let theirs = PnetUdpPacket::new(&buffer).unwrap();
    assert_eq!(pnet::packet::udp::ipv6_checksum(&theirs, &SRC6, &DST6), ours.checksum());
    assert!(ours.verify_checksum(&PseudoHeader::V6 { src: *SRC6, dst: *DST6 }));
}

#[test]
fn tcp_over_ipv4() {
    let payload = odd_payload();
    let options = [2, 4, 0x05, 0xb4];
    let pseudo = PseudoHeader::V4 { src: *SRC4, dst: *DST4 };
    let mut builder = TcpBuilder::new(pseudo, 40000, 443, &payload)
        .with_sequence(0xdeadbeef)
        .with_acknowledgement(0x01020304)
        .with_flags(flags::ACK | flags::PSH)
        .with_window(1024)
        .with_options(&options);
    let buffer = build_packet(&mut builder).unwrap();
    let ours = TcpPacket::new(&buffer[..]).unwrap();
    let theirs = PnetTcpPacket::new(&buffer).unwrap();
    assert_eq!(pnet::packet::tcp::ipv4_checksum(&theirs, &SRC4, &DST4), ours.checksum());
    assert_eq!(theirs.get_data_offset(), ours.data_offset());
    assert_eq!(theirs.get_sequence(), ours.sequence());
}

#[test]
fn icmp_echo() {
    let payload = odd_payload();
    let buffer = build_packet(&mut IcmpBuilder::new(Echo::request(0x1234, 77, &payload)))
        .unwrap();
    let theirs = PnetIcmpPacket::new(&buffer).unwrap();
    assert_eq!(pnet::packet::icmp::checksum(&theirs), theirs.get_checksum());
}

#[test]
fn icmpv6_echo() {
    let payload = odd_payload();
    let echo = Echo::reply(0x1234, 77, &payload);
    let mut builder = Icmpv6Builder::new(echo).with_addresses(*SRC6, *DST6);
    let buffer = build_packet(&mut builder).unwrap();
    let theirs = PnetIcmpv6Packet::new(&buffer).unwrap();
    assert_eq!(pnet::packet::icmpv6::checksum(&theirs, &SRC6, &DST6), theirs.get_checksum());
}

#[test]
fn single_bit_flips_detected() {
    let payload = odd_payload();
    let buffer = build_packet(&mut UdpBuilder::v4(*SRC4, *DST4, 53000, 53, &payload)).unwrap();
    let pseudo = PseudoHeader::V4 { src: *SRC4, dst: *DST4 };
    // Skip the length field, flipping it changes the covered span instead.
    for bit in (0..buffer.len() * 8).filter(|bit| !(32..48).contains(bit)) {
        let mut flipped = buffer.clone();
        flipped[bit / 8] ^= 1 << (bit % 8);
        let pkg = UdpPacket::new(&flipped[..]).unwrap();
        assert!(!pkg.verify_checksum(&pseudo), "bit {} went unnoticed", bit);
    }
}

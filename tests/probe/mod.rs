use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rips_probe::probe::{EngineConfig, Framing, Icmpv4Strategy, Icmpv6Strategy, ProbeEngine,
                        ProbeError};

use crate::mock::{answer_v4, answer_v6_ethernet, echo_ids, MockSocket};

const LOCAL: Ipv4Addr = Ipv4Addr::new(10, 1, 0, 1);
const TIMEOUT: Duration = Duration::from_millis(500);

fn config() -> EngineConfig {
    EngineConfig {
        identifier: 0x7777,
        ..Default::default()
    }
}

#[test]
fn out_of_order_replies() {
    let (socket, requests) = MockSocket::new();
    let engine = ProbeEngine::with_config(Icmpv4Strategy, &socket, config());
    let (tx, rx) = mpsc::channel();
    let start = Instant::now();
    let mut handles = HashMap::new();
    for i in 0..16u8 {
        let target = IpAddr::V4(Ipv4Addr::new(10, 1, 1, i));
        let tx = tx.clone();
        let handle = engine.send_at(target, TIMEOUT, 0, start, move |o| tx.send(o).unwrap())
            .unwrap();
        handles.insert(handle.sequence(), target);
    }
    let sent: Vec<(IpAddr, Vec<u8>)> = requests.try_iter().collect();
    assert_eq!(16, sent.len());
    for (n, (target, request)) in sent.iter().rev().enumerate() {
        let src = match *target {
            IpAddr::V4(addr) => addr,
            IpAddr::V6(_) => unreachable!(),
        };
        let reply = answer_v4(src, LOCAL, request);
        let now = start + Duration::from_millis(n as u64 + 1);
        assert!(engine.on_receive_at(&reply, now));
    }
    drop(tx);
    let outcomes: Vec<_> = rx.iter().map(|o| o.unwrap()).collect();
    assert_eq!(16, outcomes.len());
    for (n, reply) in outcomes.iter().enumerate() {
        assert_eq!(handles[&reply.sequence], reply.target);
        assert_eq!(Some(reply.target), reply.source);
        assert_eq!(Duration::from_millis(n as u64 + 1), reply.rtt);
        assert_eq!(32, reply.bytes);
    }
    assert_eq!(0, engine.pending());
    assert_eq!(16, engine.stats().received);
}

#[test]
fn timeout_exactly_once_and_late_reply_ignored() {
    let (socket, requests) = MockSocket::new();
    let engine = ProbeEngine::with_config(Icmpv4Strategy, &socket, config());
    let (tx, rx) = mpsc::channel();
    let start = Instant::now();
    let target = IpAddr::V4(Ipv4Addr::new(10, 1, 1, 1));
    engine.send_at(target, TIMEOUT, 2, start, move |o| tx.send(o).unwrap()).unwrap();

    let mut tick = start;
    while tick <= start + TIMEOUT * 4 {
        engine.on_tick(tick);
        tick += Duration::from_millis(100);
    }
    let sent: Vec<_> = requests.try_iter().collect();
    assert_eq!(3, sent.len());
    assert!(sent.iter().all(|s| echo_ids(&s.1) == echo_ids(&sent[0].1)));
    assert!(matches!(rx.recv().unwrap(), Err(ProbeError::Timeout)));
    assert!(rx.recv().is_err());

    let late = answer_v4(Ipv4Addr::new(10, 1, 1, 1), LOCAL, &sent[0].1);
    assert!(!engine.on_receive(&late));
}

#[test]
fn completes_no_earlier_than_three_timeouts() {
    let (socket, _requests) = MockSocket::new();
    let engine = ProbeEngine::with_config(Icmpv4Strategy, &socket, config());
    let (tx, rx) = mpsc::channel();
    let start = Instant::now();
    let target = IpAddr::V4(Ipv4Addr::new(10, 1, 1, 1));
    engine.send_at(target, TIMEOUT, 2, start, move |o| tx.send(o).unwrap()).unwrap();
    engine.on_tick(start + TIMEOUT);
    engine.on_tick(start + TIMEOUT * 2);
    engine.on_tick(start + TIMEOUT * 3 - Duration::from_millis(1));
    assert!(rx.try_recv().is_err());
    assert_eq!(Some(start + TIMEOUT * 3), engine.next_deadline());
    engine.on_tick(start + TIMEOUT * 3);
    assert!(matches!(rx.try_recv().unwrap(), Err(ProbeError::Timeout)));
}

#[test]
fn cancel_races_reply() {
    for _ in 0..50 {
        let (socket, requests) = MockSocket::new();
        let engine = ProbeEngine::with_config(Icmpv4Strategy, Arc::new(socket), config());
        let (tx, rx) = mpsc::channel();
        let target = IpAddr::V4(Ipv4Addr::new(10, 1, 1, 1));
        let handle = engine.send(target, TIMEOUT, 0, move |o| tx.send(o).unwrap()).unwrap();
        let (_, request) = requests.recv().unwrap();
        let reply = answer_v4(Ipv4Addr::new(10, 1, 1, 1), LOCAL, &request);

        let canceller = thread::spawn(move || handle.cancel());
        let matched = engine.on_receive(&reply);
        let cancelled = canceller.join().unwrap();

        assert!(matched != cancelled);
        drop(engine);
        let outcomes: Vec<_> = rx.iter().collect();
        assert_eq!(usize::from(matched), outcomes.len());
        assert!(outcomes.iter().all(|o| o.is_ok()));
    }
}

#[test]
fn ipv6_over_ethernet() {
    let (socket, requests) = MockSocket::new();
    let local: Ipv6Addr = "2001:db8::1".parse().unwrap();
    let remote: Ipv6Addr = "2001:db8::99".parse().unwrap();
    let config = EngineConfig {
        framing: Some(Framing::Ethernet),
        source: Some(IpAddr::V6(local)),
        payload_size: 0,
        ..config()
    };
    let engine = ProbeEngine::with_config(Icmpv6Strategy, &socket, config);
    assert_eq!(Framing::Ethernet, engine.framing());
    let (tx, rx) = mpsc::channel();
    engine.send(IpAddr::V6(remote), TIMEOUT, 0, move |o| tx.send(o).unwrap()).unwrap();
    let (_, request) = requests.try_recv().unwrap();
    assert_eq!(128, request[0]);
    assert_eq!(8, request.len());

    assert!(!engine.on_receive(&request));
    let reply = answer_v6_ethernet(remote, local, &request);
    assert!(engine.on_receive(&reply));
    let reply = rx.try_recv().unwrap().unwrap();
    assert_eq!(Some(61), reply.ttl);
    assert_eq!(Some(IpAddr::V6(remote)), reply.source);
    assert_eq!(0, reply.bytes);
}

#[test]
fn socket_error_broadcast() {
    let (socket, _requests) = MockSocket::new();
    let engine = ProbeEngine::with_config(Icmpv4Strategy, &socket, config());
    let (tx, rx) = mpsc::channel();
    for i in 1..=4 {
        let tx = tx.clone();
        let target = IpAddr::V4(Ipv4Addr::new(10, 1, 1, i));
        engine.send(target, TIMEOUT, 1, move |o| tx.send(o).unwrap()).unwrap();
    }
    drop(tx);
    engine.on_socket_error(std::io::Error::new(std::io::ErrorKind::Other, "link down"));
    let outcomes: Vec<_> = rx.iter().collect();
    assert_eq!(4, outcomes.len());
    assert!(outcomes.iter().all(|o| matches!(o, Err(ProbeError::Socket(_)))));
    assert!(engine.is_defunct());
    assert_eq!(0, engine.pending());
}

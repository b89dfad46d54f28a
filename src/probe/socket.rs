use std::io::{self, Read};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use super::Framing;

/// The sending half of whatever transports echo requests. Must not block.
pub trait ProbeSocket {
    fn send_to(&self, packet: &[u8], target: IpAddr) -> io::Result<()>;
}

impl<'a, T: ProbeSocket + ?Sized> ProbeSocket for &'a T {
    fn send_to(&self, packet: &[u8], target: IpAddr) -> io::Result<()> {
        (**self).send_to(packet, target)
    }
}

impl<T: ProbeSocket + ?Sized> ProbeSocket for Arc<T> {
    fn send_to(&self, packet: &[u8], target: IpAddr) -> io::Result<()> {
        (**self).send_to(packet, target)
    }
}

/// A non-blocking ICMP or ICMPv6 socket.
///
/// Raw sockets need elevated privileges. Datagram sockets work unprivileged
/// where the system allows it (`net.ipv4.ping_group_range` on Linux), but the
/// kernel then rewrites the echo identifier, so the engine identifier has to
/// match what the kernel picks.
#[derive(Debug)]
pub struct IcmpSocket {
    socket: Socket,
    domain: Domain,
    framing: Framing,
}

impl IcmpSocket {
    pub fn raw_v4() -> io::Result<IcmpSocket> {
        Self::open(Domain::IPV4, Type::RAW, Protocol::ICMPV4, Framing::Ip)
    }

    pub fn raw_v6() -> io::Result<IcmpSocket> {
        Self::open(Domain::IPV6, Type::RAW, Protocol::ICMPV6, Framing::Icmp)
    }

    pub fn datagram_v4() -> io::Result<IcmpSocket> {
        Self::open(Domain::IPV4, Type::DGRAM, Protocol::ICMPV4, Framing::Icmp)
    }

    pub fn datagram_v6() -> io::Result<IcmpSocket> {
        Self::open(Domain::IPV6, Type::DGRAM, Protocol::ICMPV6, Framing::Icmp)
    }

    fn open(domain: Domain,
            ty: Type,
            protocol: Protocol,
            framing: Framing)
            -> io::Result<IcmpSocket> {
        let socket = Socket::new(domain, ty, Some(protocol))?;
        socket.set_nonblocking(true)?;
        Ok(IcmpSocket {
            socket,
            domain,
            framing,
        })
    }

    /// What the buffers read from this socket start with.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Sets the TTL (IPv4) or unicast hop limit (IPv6) of outgoing requests.
    pub fn set_ttl(&self, ttl: u32) -> io::Result<()> {
        if self.domain == Domain::IPV6 {
            self.socket.set_unicast_hops_v6(ttl)
        } else {
            self.socket.set_ttl(ttl)
        }
    }

    /// Reads one datagram. `WouldBlock` when nothing is queued.
    pub fn recv(&self, buffer: &mut [u8]) -> io::Result<usize> {
        (&self.socket).read(buffer)
    }

    /// The underlying socket, for registering with a reactor.
    pub fn socket(&self) -> &Socket {
        &self.socket
    }
}

impl ProbeSocket for IcmpSocket {
    fn send_to(&self, packet: &[u8], target: IpAddr) -> io::Result<()> {
        let addr = SockAddr::from(SocketAddr::new(target, 0));
        let sent = self.socket.send_to(packet, &addr)?;
        if sent == packet.len() {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::WriteZero, "echo request only partly sent"))
        }
    }
}

use std::io;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use rand::random;

use super::table::{deadline_after, EchoProbe, EngineState, ProbeTable};
use super::{EchoStrategy, EngineConfig, Framing, ProbeError, ProbeKey, ProbeOutcome,
            ProbeSocket, ProbeStats, Reply};

fn lock(table: &Mutex<ProbeTable>) -> MutexGuard<'_, ProbeTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Refers to one probe started by `ProbeEngine::send`. Holding a handle does
/// not keep the engine alive.
#[derive(Debug, Clone)]
pub struct Handle {
    key: ProbeKey,
    target: IpAddr,
    table: Weak<Mutex<ProbeTable>>,
}

impl Handle {
    pub fn key(&self) -> ProbeKey {
        self.key
    }

    pub fn sequence(&self) -> u16 {
        self.key.sequence
    }

    pub fn target(&self) -> IpAddr {
        self.target
    }

    /// Cancels the probe if it is still pending. Its completion callback is
    /// dropped without being called. Returns false if the probe had already
    /// completed.
    pub fn cancel(&self) -> bool {
        let table = match self.table.upgrade() {
            Some(table) => table,
            None => return false,
        };
        let removed = {
            let mut table = lock(&table);
            let removed = table.remove(&self.key);
            if removed.is_some() {
                table.stats.cancelled += 1;
            }
            removed
        };
        match removed {
            Some(_) => {
                debug!("Cancelled echo probe {} to {}", self.key.sequence, self.target);
                true
            }
            None => false,
        }
    }
}

/// Sends echo requests through `S`, built and parsed by `T`, and tracks them
/// until each one completes exactly once.
pub struct ProbeEngine<S: ProbeSocket, T: EchoStrategy> {
    strategy: T,
    socket: S,
    config: EngineConfig,
    framing: Framing,
    payload: Vec<u8>,
    table: Arc<Mutex<ProbeTable>>,
}

impl<S: ProbeSocket, T: EchoStrategy> ProbeEngine<S, T> {
    pub fn new(strategy: T, socket: S) -> Self {
        Self::with_config(strategy, socket, EngineConfig::default())
    }

    pub fn with_config(strategy: T, socket: S, config: EngineConfig) -> Self {
        let framing = config.framing.unwrap_or(T::DEFAULT_FRAMING);
        let payload = (0..config.payload_size).map(|_| random()).collect();
        ProbeEngine {
            strategy,
            socket,
            config,
            framing,
            payload,
            table: Arc::new(Mutex::new(ProbeTable::new())),
        }
    }

    pub fn identifier(&self) -> u16 {
        self.config.identifier
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Number of pending probes.
    pub fn pending(&self) -> usize {
        lock(&self.table).len()
    }

    pub fn stats(&self) -> ProbeStats {
        lock(&self.table).stats
    }

    /// True after a socket error. A defunct engine accepts no more probes.
    pub fn is_defunct(&self) -> bool {
        lock(&self.table).state == EngineState::Failed
    }

    /// When `on_tick` next has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        lock(&self.table).next_deadline()
    }

    /// Sends an echo request to `target` and returns immediately.
    /// `on_complete` is called exactly once with the reply, or with the
    /// reason there is none, unless the probe is cancelled. Without a reply
    /// within `timeout` the request is sent again, up to `retries` times.
    ///
    /// When the probe can't be started the error is returned here and
    /// `on_complete` is dropped uncalled.
    pub fn send<F>(&self,
                   target: IpAddr,
                   timeout: Duration,
                   retries: u8,
                   on_complete: F)
                   -> Result<Handle, ProbeError>
        where F: FnOnce(ProbeOutcome) + Send + 'static
    {
        self.send_at(target, timeout, retries, Instant::now(), on_complete)
    }

    /// `send` with the current time given by the caller.
    pub fn send_at<F>(&self,
                      target: IpAddr,
                      timeout: Duration,
                      retries: u8,
                      now: Instant,
                      on_complete: F)
                      -> Result<Handle, ProbeError>
        where F: FnOnce(ProbeOutcome) + Send + 'static
    {
        if !self.strategy.accepts(&target) {
            return Err(ProbeError::InvalidAddress);
        }
        let identifier = self.config.identifier;
        let deadline = deadline_after(now, timeout);
        let send_result = {
            let mut table = lock(&self.table);
            match table.state {
                EngineState::Running => (),
                EngineState::Shutdown => return Err(ProbeError::Shutdown),
                EngineState::Failed => return Err(ProbeError::Defunct),
            }
            let sequence = table.allocate_sequence(identifier).ok_or(ProbeError::Exhausted)?;
            let request = self.strategy
                .build_request(identifier, sequence, &self.payload, self.config.source, target)?;
            let key = ProbeKey { identifier, sequence };
            match self.socket.send_to(&request, target) {
                Ok(()) => {
                    table.insert(EchoProbe {
                        key,
                        target,
                        sent_at: now,
                        deadline,
                        timeout,
                        retries_remaining: retries,
                        request,
                        completion: Box::new(on_complete),
                    });
                    table.stats.sent += 1;
                    table.stats.transmitted += 1;
                    Ok(key)
                }
                Err(e) => Err(e),
            }
        };
        match send_result {
            Ok(key) => {
                debug!("Sent echo request {} to {}", key.sequence, target);
                Ok(Handle {
                    key,
                    target,
                    table: Arc::downgrade(&self.table),
                })
            }
            Err(e) => {
                let error = Arc::new(e);
                self.fail(error.clone());
                Err(ProbeError::Socket(error))
            }
        }
    }

    /// Feeds one buffer read from the socket to the engine. Returns true if
    /// it completed a probe. Anything that isn't a reply to a pending probe
    /// of this engine is ignored.
    pub fn on_receive(&self, buffer: &[u8]) -> bool {
        self.on_receive_at(buffer, Instant::now())
    }

    /// `on_receive` with the current time given by the caller.
    pub fn on_receive_at(&self, buffer: &[u8], now: Instant) -> bool {
        let reply = match self.strategy
            .parse_reply(buffer, self.framing, self.config.verify_checksums) {
            Ok(reply) => reply,
            Err(e) => {
                trace!("Ignoring {} byte buffer: {}", buffer.len(), e);
                return false;
            }
        };
        if reply.identifier != self.config.identifier {
            trace!("Ignoring echo reply for identifier {}", reply.identifier);
            return false;
        }
        let key = ProbeKey {
            identifier: reply.identifier,
            sequence: reply.sequence,
        };
        let (probe, rtt) = {
            let mut table = lock(&self.table);
            let probe = match table.remove(&key) {
                Some(probe) => probe,
                None => {
                    trace!("Ignoring unmatched echo reply {}", key.sequence);
                    return false;
                }
            };
            let rtt = now.saturating_duration_since(probe.sent_at);
            table.stats.record_reply(rtt);
            (probe, rtt)
        };
        debug!("Echo reply {} from {} after {:?}", key.sequence, probe.target, rtt);
        (probe.completion)(Ok(Reply {
            target: probe.target,
            sequence: key.sequence,
            rtt,
            bytes: reply.payload_len,
            ttl: reply.ttl,
            source: reply.source,
        }));
        true
    }

    /// Retransmits or times out every probe whose deadline is at or before
    /// `now`. Probes not yet due are left alone.
    pub fn on_tick(&self, now: Instant) {
        let expired = lock(&self.table).expire(now);
        for &(target, ref request) in &expired.retransmit {
            debug!("Retransmitting echo request to {}", target);
            if let Err(e) = self.socket.send_to(request, target) {
                self.fail(Arc::new(e));
                break;
            }
        }
        for probe in expired.timed_out {
            debug!("Echo probe {} to {} timed out", probe.key.sequence, probe.target);
            (probe.completion)(Err(ProbeError::Timeout));
        }
    }

    /// Cancels the probe behind `handle` if it was started by this engine.
    /// See `Handle::cancel`.
    pub fn cancel(&self, handle: &Handle) -> bool {
        Weak::ptr_eq(&handle.table, &Arc::downgrade(&self.table)) && handle.cancel()
    }

    /// Completes every pending probe with `ProbeError::Shutdown`. Later
    /// calls to `send` fail with the same error.
    pub fn shutdown(&self) {
        let drained = {
            let mut table = lock(&self.table);
            if table.state == EngineState::Running {
                table.drain(EngineState::Shutdown)
            } else {
                Vec::new()
            }
        };
        if !drained.is_empty() {
            debug!("Shutting down with {} pending echo probes", drained.len());
        }
        for probe in drained {
            (probe.completion)(Err(ProbeError::Shutdown));
        }
    }

    /// Reports a failure reading the socket. Every pending probe completes
    /// with the error and the engine becomes defunct.
    pub fn on_socket_error(&self, error: io::Error) {
        self.fail(Arc::new(error));
    }

    fn fail(&self, error: Arc<io::Error>) {
        let drained = {
            let mut table = lock(&self.table);
            if table.state == EngineState::Shutdown {
                return;
            }
            table.drain(EngineState::Failed)
        };
        warn!("Echo probe socket failed, dropping {} probes: {}", drained.len(), error);
        for probe in drained {
            (probe.completion)(Err(ProbeError::Socket(error.clone())));
        }
    }
}

impl<S: ProbeSocket, T: EchoStrategy> Drop for ProbeEngine<S, T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::mpsc;

    use crate::probe::{Icmpv4Strategy, Icmpv6Strategy};
    use crate::testing::{echo_reply_v4, MockSocket};

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn target() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))
    }

    fn config() -> EngineConfig {
        EngineConfig {
            identifier: 0x4242,
            payload_size: 8,
            ..Default::default()
        }
    }

    fn reply_to(sequence: u16) -> Vec<u8> {
        echo_reply_v4(Ipv4Addr::new(10, 0, 0, 2),
                      Ipv4Addr::new(10, 0, 0, 1),
                      0x4242,
                      sequence,
                      &[0; 8],
                      60)
    }

    #[test]
    fn reply_completes_probe() {
        let (socket, requests) = MockSocket::new();
        let engine = ProbeEngine::with_config(Icmpv4Strategy, &socket, config());
        let (tx, rx) = mpsc::channel();
        let now = Instant::now();
        let handle = engine.send_at(target(), TIMEOUT, 0, now, move |o| tx.send(o).unwrap())
            .unwrap();
        let (dst, request) = requests.try_recv().unwrap();
        assert_eq!(target(), dst);
        assert_eq!(16, request.len());
        assert_eq!(1, engine.pending());

        assert!(engine.on_receive_at(&reply_to(handle.sequence()), now + Duration::from_millis(5)));
        let reply = rx.try_recv().unwrap().unwrap();
        assert_eq!(Duration::from_millis(5), reply.rtt);
        assert_eq!(Some(60), reply.ttl);
        assert_eq!(8, reply.bytes);
        assert_eq!(0, engine.pending());
        assert!(!handle.cancel());

        // A duplicate finds nothing to complete.
        assert!(!engine.on_receive_at(&reply_to(handle.sequence()), now));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn wrong_family() {
        let (socket, requests) = MockSocket::new();
        let engine = ProbeEngine::with_config(Icmpv6Strategy, &socket, config());
        match engine.send(target(), TIMEOUT, 0, |_| panic!("called")) {
            Err(ProbeError::InvalidAddress) => (),
            other => panic!("Unexpected result: {:?}", other.map(|h| h.key())),
        }
        assert!(requests.try_recv().is_err());
    }

    #[test]
    fn foreign_identifier_ignored() {
        let (socket, _requests) = MockSocket::new();
        let engine = ProbeEngine::with_config(Icmpv4Strategy, &socket, config());
        let handle = engine.send(target(), TIMEOUT, 0, |_| ()).unwrap();
        let reply = echo_reply_v4(Ipv4Addr::new(10, 0, 0, 2),
                                  Ipv4Addr::new(10, 0, 0, 1),
                                  0x4243,
                                  handle.sequence(),
                                  &[],
                                  64);
        assert!(!engine.on_receive(&reply));
        assert!(!engine.on_receive(&[0x45, 0, 0]));
        assert_eq!(1, engine.pending());
    }

    #[test]
    fn retries_then_timeout() {
        let (socket, requests) = MockSocket::new();
        let engine = ProbeEngine::with_config(Icmpv4Strategy, &socket, config());
        let (tx, rx) = mpsc::channel();
        let start = Instant::now();
        engine.send_at(target(), TIMEOUT, 2, start, move |o| tx.send(o).unwrap()).unwrap();

        engine.on_tick(start + TIMEOUT - Duration::from_millis(1));
        assert_eq!(1, requests.try_iter().count());
        for i in 1..3 {
            engine.on_tick(start + TIMEOUT * i);
            assert_eq!(1, requests.try_iter().count());
            assert!(rx.try_recv().is_err());
        }
        engine.on_tick(start + TIMEOUT * 3);
        assert!(matches!(rx.try_recv().unwrap(), Err(ProbeError::Timeout)));
        assert_eq!(0, requests.try_iter().count());
        assert_eq!(0, engine.pending());
        assert_eq!(3, engine.stats().transmitted);
        assert_eq!(1, engine.stats().timed_out);
    }

    #[test]
    fn shutdown_completes_pending() {
        let (socket, _requests) = MockSocket::new();
        let (tx, rx) = mpsc::channel();
        {
            let engine = ProbeEngine::with_config(Icmpv4Strategy, &socket, config());
            for _ in 0..3 {
                let tx = tx.clone();
                engine.send(target(), TIMEOUT, 0, move |o| tx.send(o).unwrap()).unwrap();
            }
        }
        let outcomes: Vec<_> = rx.try_iter().collect();
        assert_eq!(3, outcomes.len());
        assert!(outcomes.iter().all(|o| matches!(o, Err(ProbeError::Shutdown))));
    }

    #[test]
    fn send_after_shutdown() {
        let (socket, _requests) = MockSocket::new();
        let engine = ProbeEngine::with_config(Icmpv4Strategy, &socket, config());
        engine.shutdown();
        assert!(matches!(engine.send(target(), TIMEOUT, 0, |_| ()), Err(ProbeError::Shutdown)));
        assert!(!engine.is_defunct());
    }

    #[test]
    fn send_failure_is_fatal() {
        let (socket, _requests) = MockSocket::new();
        let engine = ProbeEngine::with_config(Icmpv4Strategy, &socket, config());
        let (tx, rx) = mpsc::channel();
        let first = tx.clone();
        engine.send(target(), TIMEOUT, 0, move |o| first.send(o).unwrap()).unwrap();
        socket.fail_sends(io::ErrorKind::PermissionDenied);
        let result = engine.send(target(), TIMEOUT, 0, move |o| tx.send(o).unwrap());
        assert!(matches!(result, Err(ProbeError::Socket(_))));
        match rx.try_recv().unwrap() {
            Err(ProbeError::Socket(e)) => assert_eq!(io::ErrorKind::PermissionDenied, e.kind()),
            other => panic!("Unexpected outcome: {:?}", other),
        }
        assert!(rx.try_recv().is_err());
        assert!(engine.is_defunct());
        assert!(matches!(engine.send(target(), TIMEOUT, 0, |_| ()), Err(ProbeError::Defunct)));
        assert_eq!(1, engine.stats().failed);
    }

    #[test]
    fn unbounded_timeout() {
        let (socket, requests) = MockSocket::new();
        let engine = ProbeEngine::with_config(Icmpv4Strategy, &socket, config());
        let (tx, rx) = mpsc::channel();
        let now = Instant::now();
        let handle = engine.send_at(target(), Duration::MAX, 1, now, move |o| tx.send(o).unwrap())
            .unwrap();
        assert_eq!(1, requests.try_iter().count());
        assert_eq!(1, engine.pending());
        engine.on_tick(now + Duration::from_secs(86400));
        assert!(rx.try_recv().is_err());
        assert_eq!(0, requests.try_iter().count());

        assert!(engine.on_receive_at(&reply_to(handle.sequence()), now + Duration::from_secs(2)));
        assert_eq!(Duration::from_secs(2), rx.try_recv().unwrap().unwrap().rtt);
    }

    #[test]
    fn retransmit_failure_is_fatal() {
        let (socket, _requests) = MockSocket::new();
        let engine = ProbeEngine::with_config(Icmpv4Strategy, &socket, config());
        let (tx, rx) = mpsc::channel();
        let now = Instant::now();
        for _ in 0..2 {
            let tx = tx.clone();
            engine.send_at(target(), TIMEOUT, 1, now, move |o| tx.send(o).unwrap()).unwrap();
        }
        let last = {
            let tx = tx.clone();
            engine.send_at(target(), TIMEOUT, 0, now, move |o| tx.send(o).unwrap()).unwrap()
        };
        drop(tx);
        socket.fail_sends(io::ErrorKind::NetworkUnreachable);

        engine.on_tick(now + TIMEOUT);
        let outcomes: Vec<ProbeOutcome> = rx.iter().collect();
        assert_eq!(3, outcomes.len());
        let failed = outcomes.iter()
            .filter(|o| match o {
                Err(ProbeError::Socket(e)) => e.kind() == io::ErrorKind::NetworkUnreachable,
                _ => false,
            })
            .count();
        let timed_out = outcomes.iter().filter(|o| matches!(o, Err(ProbeError::Timeout))).count();
        assert_eq!(2, failed);
        assert_eq!(1, timed_out);
        assert_eq!(0, engine.pending());
        assert!(engine.is_defunct());
        assert!(!last.cancel());
        let stats = engine.stats();
        assert_eq!(2, stats.failed);
        assert_eq!(1, stats.timed_out);
    }

    #[test]
    fn cancel_through_engine() {
        let (socket, _requests) = MockSocket::new();
        let engine = ProbeEngine::with_config(Icmpv4Strategy, &socket, config());
        let other = ProbeEngine::with_config(Icmpv4Strategy, &socket, config());
        let handle = engine.send(target(), TIMEOUT, 0, |_| panic!("called")).unwrap();
        assert!(!other.cancel(&handle));
        assert!(engine.cancel(&handle));
        assert!(!engine.cancel(&handle));
        assert!(!engine.on_receive(&reply_to(handle.sequence())));
        assert_eq!(1, engine.stats().cancelled);
    }
}

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use super::ProbeOutcome;

/// Identifies one outstanding echo request.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct ProbeKey {
    pub identifier: u16,
    pub sequence: u16,
}

pub(crate) type Completion = Box<dyn FnOnce(ProbeOutcome) + Send + 'static>;

/// `now + timeout`, saturating at the latest representable instant instead
/// of overflowing. `Duration::MAX` waits for as long as the clock allows.
pub(crate) fn deadline_after(now: Instant, timeout: Duration) -> Instant {
    let mut timeout = timeout;
    loop {
        match now.checked_add(timeout) {
            Some(deadline) => return deadline,
            None => timeout /= 2,
        }
    }
}

pub(crate) struct EchoProbe {
    pub key: ProbeKey,
    pub target: IpAddr,
    pub sent_at: Instant,
    pub deadline: Instant,
    pub timeout: Duration,
    pub retries_remaining: u8,
    /// The request as sent, kept for retransmission.
    pub request: Vec<u8>,
    pub completion: Completion,
}

/// Counters over the lifetime of an engine.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ProbeStats {
    /// Probes started with `send`.
    pub sent: u64,
    /// Echo requests written to the socket, retries included.
    pub transmitted: u64,
    pub received: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    /// Probes ended by shutdown or a socket error.
    pub failed: u64,
    pub min_rtt: Option<Duration>,
    pub max_rtt: Option<Duration>,
    pub total_rtt: Duration,
}

impl ProbeStats {
    pub fn average_rtt(&self) -> Option<Duration> {
        if self.received == 0 {
            None
        } else {
            Some(self.total_rtt / self.received as u32)
        }
    }

    /// Fraction of finished probes that got no reply.
    pub fn loss(&self) -> f64 {
        let finished = self.received + self.timed_out;
        if finished == 0 {
            0.0
        } else {
            self.timed_out as f64 / finished as f64
        }
    }

    pub(crate) fn record_reply(&mut self, rtt: Duration) {
        self.received += 1;
        self.total_rtt += rtt;
        self.min_rtt = Some(self.min_rtt.map_or(rtt, |min| min.min(rtt)));
        self.max_rtt = Some(self.max_rtt.map_or(rtt, |max| max.max(rtt)));
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum EngineState {
    Running,
    Shutdown,
    Failed,
}

/// What `on_tick` has to do once the table lock is released.
pub(crate) struct Expired {
    pub retransmit: Vec<(IpAddr, Vec<u8>)>,
    pub timed_out: Vec<EchoProbe>,
}

/// Outstanding probes of one engine.
pub(crate) struct ProbeTable {
    probes: HashMap<ProbeKey, EchoProbe>,
    next_sequence: u16,
    pub stats: ProbeStats,
    pub state: EngineState,
}

impl ProbeTable {
    pub fn new() -> ProbeTable {
        ProbeTable {
            probes: HashMap::new(),
            next_sequence: 0,
            stats: ProbeStats::default(),
            state: EngineState::Running,
        }
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    /// Next sequence number not pending under `identifier`. Numbers wrap
    /// around, skipping any still in use.
    pub fn allocate_sequence(&mut self, identifier: u16) -> Option<u16> {
        for _ in 0..=u16::MAX as u32 {
            let sequence = self.next_sequence;
            self.next_sequence = self.next_sequence.wrapping_add(1);
            if !self.probes.contains_key(&ProbeKey { identifier, sequence }) {
                return Some(sequence);
            }
        }
        None
    }

    pub fn insert(&mut self, probe: EchoProbe) {
        self.probes.insert(probe.key, probe);
    }

    pub fn remove(&mut self, key: &ProbeKey) -> Option<EchoProbe> {
        self.probes.remove(key)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.probes.values().map(|probe| probe.deadline).min()
    }

    /// Visits every probe due at `now` once. Probes with retries left are
    /// rearmed and queued for retransmission, the rest are removed.
    pub fn expire(&mut self, now: Instant) -> Expired {
        let due: Vec<ProbeKey> = self.probes
            .values()
            .filter(|probe| probe.deadline <= now)
            .map(|probe| probe.key)
            .collect();
        let mut expired = Expired {
            retransmit: Vec::new(),
            timed_out: Vec::new(),
        };
        for key in due {
            let retry = match self.probes.get_mut(&key) {
                Some(probe) if probe.retries_remaining > 0 => {
                    probe.retries_remaining -= 1;
                    probe.sent_at = now;
                    probe.deadline = deadline_after(now, probe.timeout);
                    Some((probe.target, probe.request.clone()))
                }
                _ => None,
            };
            match retry {
                Some(retransmit) => expired.retransmit.push(retransmit),
                None => expired.timed_out.extend(self.probes.remove(&key)),
            }
        }
        self.stats.transmitted += expired.retransmit.len() as u64;
        self.stats.timed_out += expired.timed_out.len() as u64;
        expired
    }

    /// Removes every probe, leaving the table in `state`.
    pub fn drain(&mut self, state: EngineState) -> Vec<EchoProbe> {
        self.state = state;
        let drained: Vec<EchoProbe> = self.probes.drain().map(|(_, probe)| probe).collect();
        self.stats.failed += drained.len() as u64;
        drained
    }
}

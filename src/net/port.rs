//! Single-server output ports with round-robin queue-pair arbitration.

use std::collections::VecDeque;
use std::time::Duration;

use fxhash::FxHashMap;

use crate::net::topology::LinkSpec;
use crate::net::types::{NodeId, Packet, PacketIdent, Qpid};
use crate::net::SimError;
use crate::time::SimTime;

/// The key of a queue pair: flows are identified by their origin source
/// and the qpid assigned there, at every hop of the path.
type FlowKey = (NodeId, Qpid);

///
/// A strict FIFO of packets belonging to one flow. Queues are unbounded;
/// the simulator observes scheduling, it does not model buffer overflow.
///
#[derive(Debug, Default)]
struct QpQueue {
    queue: VecDeque<Packet>,
}

///
/// The result of starting one packet transmission on a port.
///
#[derive(Debug)]
pub(crate) struct Emission {
    /// The packet in flight towards the ports peer.
    pub(crate) packet: Packet,
    /// The identity of the packet, for the completion event and traces.
    pub(crate) ident: PacketIdent,
    /// When the port finishes serializing the packet.
    pub(crate) complete_at: SimTime,
    /// When the packet arrives at the peer.
    pub(crate) arrive_at: SimTime,
}

///
/// One directed output link of a node.
///
/// The port is a single server: it serializes one packet at a time onto the
/// link. Across its queue pairs it arbitrates round-robin, serving up to
/// `quantum` packets per visit before advancing. A drained queue pair ends
/// the visit immediately. Newly registered queue pairs join at the end of
/// the round-robin order.
///
#[derive(Debug)]
pub(crate) struct Port {
    owner: NodeId,
    peer: NodeId,

    line_rate_bps: f64,
    prop_delay: Duration,
    tx_proc_delay: Duration,
    header_bytes: u64,

    quantum: u32,
    qps: Vec<QpQueue>,
    index: FxHashMap<FlowKey, usize>,
    cursor: usize,
    served: u32,

    /// Whether a packet is currently being serialized onto the link.
    busy: bool,
    /// The time the in-service packet is fully on the link.
    busy_until: SimTime,
    tx_started_at: SimTime,
    busy_time: Duration,
}

impl Port {
    pub(crate) fn new(
        owner: NodeId,
        peer: NodeId,
        link: LinkSpec,
        quantum: u32,
        tx_proc_delay: Duration,
        header_bytes: u64,
    ) -> Result<Self, SimError> {
        if quantum == 0 {
            return Err(SimError::InvalidConfig(format!(
                "quantum must be >= 1 on port {owner}->{peer}"
            )));
        }
        Ok(Self {
            owner,
            peer,
            line_rate_bps: link.line_rate_bps,
            prop_delay: link.prop_delay,
            tx_proc_delay,
            header_bytes,
            quantum,
            qps: Vec::new(),
            index: FxHashMap::default(),
            cursor: 0,
            served: 0,
            busy: false,
            busy_until: SimTime::ZERO,
            tx_started_at: SimTime::ZERO,
            busy_time: Duration::ZERO,
        })
    }

    pub(crate) fn owner(&self) -> &NodeId {
        &self.owner
    }

    pub(crate) fn peer(&self) -> &NodeId {
        &self.peer
    }

    pub(crate) fn line_rate_bps(&self) -> f64 {
        self.line_rate_bps
    }

    ///
    /// Updates the links line rate at runtime.
    ///
    /// Affects packets whose service starts after this update; a packet
    /// already in service keeps its previously computed service time.
    ///
    pub(crate) fn set_line_rate(&mut self, rate_bps: f64) -> Result<(), SimError> {
        if !rate_bps.is_finite() || rate_bps <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "line rate must be positive and finite on port {}->{} (got {rate_bps})",
                self.owner, self.peer
            )));
        }
        self.line_rate_bps = rate_bps;
        Ok(())
    }

    ///
    /// Appends the packet to its flows queue pair, registering the queue
    /// pair at the end of the round-robin order if it does not exist yet.
    ///
    pub(crate) fn enqueue(&mut self, packet: Packet) {
        let key = (packet.src.clone(), packet.qpid);
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = self.qps.len();
                self.qps.push(QpQueue::default());
                self.index.insert(key, idx);
                idx
            }
        };
        self.qps[idx].queue.push_back(packet);
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.busy
    }

    ///
    /// Starts transmission of the next packet under round-robin
    /// arbitration, or returns `None` if no packet is queued.
    ///
    /// The caller must only invoke this on an idle port, and must schedule
    /// the completion and arrival events of the returned emission.
    ///
    pub(crate) fn transmit(&mut self, now: SimTime) -> Option<Emission> {
        debug_assert!(!self.busy, "port {}->{} is in service", self.owner, self.peer);

        let qp = self.select_qp()?;
        let packet = self.qps[qp]
            .queue
            .pop_front()
            .expect("selected queue pair cannot be empty");
        self.served += 1;

        let occupancy = self.tx_proc_delay + self.service_time(&packet);
        let complete_at = now + occupancy;
        let arrive_at = complete_at + self.prop_delay;

        self.busy = true;
        self.busy_until = complete_at;
        self.tx_started_at = now;

        Some(Emission {
            ident: packet.ident(),
            packet,
            complete_at,
            arrive_at,
        })
    }

    ///
    /// Ends the current transmission, freeing the server.
    ///
    pub(crate) fn finish_tx(&mut self, now: SimTime) {
        debug_assert!(self.busy);
        self.busy = false;
        self.busy_time += now.saturating_duration_since(self.tx_started_at);
    }

    ///
    /// The accumulated serialization time of this port, including the
    /// elapsed part of a transmission still in service at `now`.
    ///
    pub(crate) fn busy_time_until(&self, now: SimTime) -> Duration {
        if self.busy {
            self.busy_time + now.saturating_duration_since(self.tx_started_at)
        } else {
            self.busy_time
        }
    }

    /// Round-robin selection of the next queue pair to serve.
    fn select_qp(&mut self) -> Option<usize> {
        let n = self.qps.len();
        if n == 0 {
            return None;
        }

        // Continue the current visit while the quantum allows and the
        // queue pair has backlog.
        if self.served < self.quantum && !self.qps[self.cursor].queue.is_empty() {
            return Some(self.cursor);
        }

        // Visit exhausted or queue drained: advance to the next backlogged
        // queue pair and begin a fresh visit.
        for step in 1..=n {
            let idx = (self.cursor + step) % n;
            if !self.qps[idx].queue.is_empty() {
                self.cursor = idx;
                self.served = 0;
                return Some(idx);
            }
        }
        None
    }

    fn service_time(&self, packet: &Packet) -> Duration {
        let eff_rate = self.line_rate_bps.min(packet.rate_bps);
        let bits = (packet.size_bytes + self.header_bytes) * 8;
        Duration::from_secs_f64(bits as f64 / eff_rate)
    }
}

//! Nodes and their per-node chunk stores.

use std::time::Duration;

use fxhash::{FxHashMap, FxHashSet};

use crate::net::error::secs;
use crate::net::port::Port;
use crate::net::types::{ChunkId, NodeId, Packet};
use crate::net::SimError;
use crate::time::SimTime;

///
/// Per-node tuning knobs. All delays default to zero, which models an
/// ideal endpoint/switch.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeConfig {
    /// Overrides the simulator-wide quantum for this nodes egress ports.
    pub quantum: Option<u32>,
    /// Per-packet processing delay charged by this nodes egress ports
    /// before serialization.
    pub tx_proc_delay: f64,
    /// Delay between a packets arrival at a relay and its enqueue on the
    /// next egress port.
    pub forward_delay: f64,
    /// Delay between the last packet of a chunk arriving and the chunk
    /// becoming available at this node.
    pub store_delay: f64,
}

impl NodeConfig {
    pub(crate) fn validate(&self) -> Result<(), SimError> {
        if self.quantum == Some(0) {
            return Err(SimError::InvalidConfig(
                "node quantum must be >= 1".to_string(),
            ));
        }
        secs(self.tx_proc_delay)?;
        secs(self.forward_delay)?;
        secs(self.store_delay)?;
        Ok(())
    }
}

///
/// An endpoint or switch of the topology. There is no structural
/// difference between the two: the arrival rule branches on whether the
/// node is the packets ultimate destination.
///
#[derive(Debug)]
pub(crate) struct Node {
    id: NodeId,
    ports: FxHashMap<NodeId, Port>,

    pub(crate) store: ChunkStore,

    pub(crate) tx_proc_delay: Duration,
    pub(crate) forward_delay: Duration,
    pub(crate) store_delay: Duration,
}

impl Node {
    pub(crate) fn new(id: NodeId, cfg: &NodeConfig) -> Result<Self, SimError> {
        cfg.validate()?;
        Ok(Self {
            id,
            ports: FxHashMap::default(),
            store: ChunkStore::default(),
            tx_proc_delay: secs(cfg.tx_proc_delay)?,
            forward_delay: secs(cfg.forward_delay)?,
            store_delay: secs(cfg.store_delay)?,
        })
    }

    pub(crate) fn add_port(&mut self, port: Port) {
        self.ports.insert(port.peer().clone(), port);
    }

    ///
    /// Consumes a packet that reached its ultimate destination here.
    ///
    pub(crate) fn deposit(&mut self, packet: &Packet, now: SimTime) -> Result<Deposit, SimError> {
        self.store.deposit(&self.id, packet, now)
    }

    pub(crate) fn port(&self, peer: &NodeId) -> Option<&Port> {
        self.ports.get(peer)
    }

    pub(crate) fn port_mut(&mut self, peer: &NodeId) -> Option<&mut Port> {
        self.ports.get_mut(peer)
    }

    pub(crate) fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }
}

///
/// The outcome of depositing a packet into a chunk store.
///
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Deposit {
    /// The chunk is still incomplete.
    Stored,
    /// This deposit completed the chunk; emit the chunk-arrived signal.
    Completed,
}

#[derive(Debug, Default)]
struct ChunkState {
    received: FxHashSet<u32>,
    total: u32,
    /// The node fully owns the chunk (all sequences received, or marked
    /// as locally produced).
    owned: bool,
    /// A completion signal was already emitted for this chunk.
    ready_signaled: bool,
}

///
/// Tracks, per chunk, which packet sequences have arrived at this node.
/// Entries are created on first contact and never evicted.
///
#[derive(Debug, Default)]
pub(crate) struct ChunkStore {
    chunks: FxHashMap<ChunkId, ChunkState>,
}

impl ChunkStore {
    ///
    /// Records the arrival of `packet` at the ultimate destination.
    ///
    /// # Errors
    ///
    /// `DuplicatePacket` if this `(chunk, seq)` was deposited before,
    /// `Engine` if the packets framing contradicts earlier deposits.
    ///
    pub(crate) fn deposit(
        &mut self,
        node: &NodeId,
        packet: &Packet,
        now: SimTime,
    ) -> Result<Deposit, SimError> {
        let state = self.chunks.entry(packet.chunk.clone()).or_default();

        if state.received.is_empty() && state.total == 0 {
            state.total = packet.total;
        } else if state.total != packet.total {
            return Err(SimError::Engine(format!(
                "packet {} disagrees on chunk framing at node {node} ({} != {})",
                packet.ident(),
                packet.total,
                state.total
            )));
        }

        if !state.received.insert(packet.seq) {
            return Err(SimError::DuplicatePacket {
                packet: packet.ident(),
                node: node.clone(),
                time: now,
            });
        }

        if !state.ready_signaled && state.received.len() as u32 == state.total {
            state.ready_signaled = true;
            Ok(Deposit::Completed)
        } else {
            Ok(Deposit::Stored)
        }
    }

    ///
    /// Marks the chunk as fully owned at this node. Returns whether the
    /// chunk was *newly* owned, i.e. whether dependent policies should be
    /// triggered.
    ///
    pub(crate) fn mark_owned(&mut self, chunk: &ChunkId) -> bool {
        let state = self.chunks.entry(chunk.clone()).or_default();
        if state.owned {
            false
        } else {
            state.owned = true;
            true
        }
    }

    pub(crate) fn is_owned(&self, chunk: &ChunkId) -> bool {
        self.chunks.get(chunk).is_some_and(|state| state.owned)
    }
}

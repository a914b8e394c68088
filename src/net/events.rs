//! The event set driving a network simulation.
//!
//! Events carry plain identities (node names, entry indices) rather than
//! references; handlers resolve them against the application state. This
//! keeps all mutable state owned by [`Sim`] and reachable through the
//! runtime without interior mutability.

use std::sync::Arc;

use log::{debug, trace};

use crate::net::node::Deposit;
use crate::net::trace::TraceKind;
use crate::net::types::{ChunkId, NodeId, Packet, PacketIdent, Rate, TxId};
use crate::net::{Sim, SimError};
use crate::runtime::{Event, EventSet, Runtime, RuntimeError};

///
/// The events processed during a network simulation.
///
#[derive(Debug)]
pub enum NetEvents {
    PolicyFire(PolicyFireEvent),
    TxComplete(TxCompleteEvent),
    Arrival(ArrivalEvent),
    Forward(ForwardEvent),
    ChunkArrived(ChunkArrivedEvent),
    SetLineRate(SetLineRateEvent),
}

impl EventSet<Sim> for NetEvents {
    fn handle(self, rt: &mut Runtime<Sim>) -> Result<(), RuntimeError> {
        match self {
            Self::PolicyFire(event) => event.handle(rt),
            Self::TxComplete(event) => event.handle(rt),
            Self::Arrival(event) => event.handle(rt),
            Self::Forward(event) => event.handle(rt),
            Self::ChunkArrived(event) => event.handle(rt),
            Self::SetLineRate(event) => event.handle(rt),
        }
    }
}

macro_rules! impl_from_event {
    ($($variant:ident($ty:ty),)+) => {
        $(
            impl From<$ty> for NetEvents {
                fn from(event: $ty) -> Self {
                    Self::$variant(event)
                }
            }
        )+
    };
}

impl_from_event! {
    PolicyFire(PolicyFireEvent),
    TxComplete(TxCompleteEvent),
    Arrival(ArrivalEvent),
    Forward(ForwardEvent),
    ChunkArrived(ChunkArrivedEvent),
    SetLineRate(SetLineRateEvent),
}

///
/// Fires an eligible policy entry: packetizes its chunk and injects the
/// packets into the source-egress port.
///
#[derive(Debug)]
pub struct PolicyFireEvent {
    pub(crate) entry: usize,
}

impl Event<Sim> for PolicyFireEvent {
    fn handle(self, rt: &mut Runtime<Sim>) -> Result<(), RuntimeError> {
        let now = rt.sim_time();
        let entry = rt.app.policy.fire(self.entry)?;

        debug!(
            target: "cclsim::policy",
            "firing chunk {} {} -> {} ({} B, t = {})",
            entry.chunk, entry.src, entry.dst, entry.size_bytes, now
        );

        debug_assert!(
            rt.app.node(&entry.src)?.store.is_owned(&entry.chunk),
            "entry fired before its source owned the chunk"
        );

        let tx: TxId = (entry.chunk.clone(), entry.src.clone(), entry.dst.clone());
        rt.app.tx_first_send.entry(tx).or_insert(now);
        rt.app.trace_push(
            now,
            entry.src.clone(),
            TraceKind::PolicyFire {
                chunk: entry.chunk.clone(),
                dst: entry.dst.clone(),
            },
        );

        if entry.size_bytes == 0 {
            // Nothing to packetize, but the chunk still completes at the
            // destination so that downstream dependencies resolve.
            rt.add_event(
                NetEvents::ChunkArrived(ChunkArrivedEvent {
                    chunk: entry.chunk,
                    node: entry.dst,
                    tx_src: Some(entry.src),
                }),
                now,
            );
            return Ok(());
        }

        let peer = entry.path[1].clone();
        let payload = rt.app.params.payload_bytes;
        let rate_bps = match entry.rate {
            Rate::Bps(rate) => rate,
            // "Max" resolves against the source-egress line rate at fire
            // time; downstream hops cap with their own line rates.
            Rate::Max => rt.app.port(&entry.src, &peer)?.line_rate_bps(),
        };

        let total = entry.size_bytes.div_ceil(payload) as u32;
        let path: Arc<[NodeId]> = entry.path.clone().into();

        let port = rt.app.port_mut(&entry.src, &peer)?;
        for seq in 0..total {
            let offset = u64::from(seq) * payload;
            let size = (entry.size_bytes - offset).min(payload);
            let mut packet = Packet::new(
                entry.chunk.clone(),
                seq,
                total,
                size,
                rate_bps,
                entry.qpid,
                Arc::clone(&path),
            );
            // Queueing towards the first hop is the first step of the path.
            packet.advance();
            port.enqueue(packet);
        }

        service_port(rt, &entry.src, &peer)
    }
}

///
/// A port finished serializing a packet onto its link; the server is free
/// for the next arbitration step.
///
#[derive(Debug)]
pub struct TxCompleteEvent {
    pub(crate) node: NodeId,
    pub(crate) peer: NodeId,
    pub(crate) ident: PacketIdent,
}

impl Event<Sim> for TxCompleteEvent {
    fn handle(self, rt: &mut Runtime<Sim>) -> Result<(), RuntimeError> {
        let now = rt.sim_time();
        rt.app.port_mut(&self.node, &self.peer)?.finish_tx(now);
        rt.app
            .trace_push(now, self.node.clone(), TraceKind::TxComplete(self.ident));

        service_port(rt, &self.node, &self.peer)
    }
}

///
/// A packet fully arrived at a node (store-and-forward: arrival happens
/// only after the previous hop finished serialization plus propagation).
///
#[derive(Debug)]
pub struct ArrivalEvent {
    pub(crate) node: NodeId,
    pub(crate) packet: Packet,
}

impl Event<Sim> for ArrivalEvent {
    fn handle(self, rt: &mut Runtime<Sim>) -> Result<(), RuntimeError> {
        let now = rt.sim_time();
        rt.app
            .trace_push(now, self.node.clone(), TraceKind::Arrival(self.packet.ident()));

        if self.packet.dst == self.node {
            deliver(rt, self.node, self.packet)
        } else {
            let delay = rt.app.node(&self.node)?.forward_delay;
            if delay.is_zero() {
                forward(rt, self.node, self.packet)
            } else {
                rt.add_event_in(
                    NetEvents::Forward(ForwardEvent {
                        node: self.node,
                        packet: self.packet,
                    }),
                    delay,
                );
                Ok(())
            }
        }
    }
}

///
/// Relays a packet onto the next egress port after the nodes forwarding
/// delay elapsed.
///
#[derive(Debug)]
pub struct ForwardEvent {
    pub(crate) node: NodeId,
    pub(crate) packet: Packet,
}

impl Event<Sim> for ForwardEvent {
    fn handle(self, rt: &mut Runtime<Sim>) -> Result<(), RuntimeError> {
        forward(rt, self.node, self.packet)
    }
}

///
/// A chunk became fully available at a node; dependent policy entries are
/// triggered.
///
#[derive(Debug)]
pub struct ChunkArrivedEvent {
    pub(crate) chunk: ChunkId,
    pub(crate) node: NodeId,
    /// The transmission source, `None` for bootstrap production marks.
    pub(crate) tx_src: Option<NodeId>,
}

impl Event<Sim> for ChunkArrivedEvent {
    fn handle(self, rt: &mut Runtime<Sim>) -> Result<(), RuntimeError> {
        let now = rt.sim_time();

        if let Some(src) = &self.tx_src {
            let tx: TxId = (self.chunk.clone(), src.clone(), self.node.clone());
            rt.app.tx_complete.entry(tx).or_insert(now);
        }

        let newly = rt.app.node_mut(&self.node)?.store.mark_owned(&self.chunk);
        if !newly {
            return Ok(());
        }

        debug!(
            target: "cclsim::node",
            "chunk {} ready at {} (t = {})",
            self.chunk, self.node, now
        );
        rt.app.chunk_ready.insert((self.chunk.clone(), self.node.clone()), now);
        rt.app.trace_push(
            now,
            self.node.clone(),
            TraceKind::ChunkArrived {
                chunk: self.chunk.clone(),
            },
        );

        let eligible = rt.app.policy.on_ready(&self.node, &self.chunk);
        for (idx, release) in eligible {
            rt.add_event(
                NetEvents::PolicyFire(PolicyFireEvent { entry: idx }),
                release.max(now),
            );
        }
        Ok(())
    }
}

///
/// A scheduled line-rate update of a directed link. Affects service starts
/// after this point in time.
///
#[derive(Debug)]
pub struct SetLineRateEvent {
    pub(crate) node: NodeId,
    pub(crate) peer: NodeId,
    pub(crate) rate_bps: f64,
}

impl Event<Sim> for SetLineRateEvent {
    fn handle(self, rt: &mut Runtime<Sim>) -> Result<(), RuntimeError> {
        trace!(
            target: "cclsim::port",
            "{} -> {} line rate set to {} bit/s (t = {})",
            self.node, self.peer, self.rate_bps, rt.sim_time()
        );
        rt.app
            .port_mut(&self.node, &self.peer)?
            .set_line_rate(self.rate_bps)?;
        Ok(())
    }
}

///
/// Starts the next transmission on a port if it is idle and backlogged,
/// scheduling the completion and arrival events of the emission.
///
fn service_port(rt: &mut Runtime<Sim>, node: &NodeId, peer: &NodeId) -> Result<(), RuntimeError> {
    let now = rt.sim_time();

    let emission = {
        let port = rt.app.port_mut(node, peer)?;
        if port.is_busy() {
            None
        } else {
            port.transmit(now)
        }
    };
    let Some(emission) = emission else {
        return Ok(());
    };

    trace!(
        target: "cclsim::port",
        "{} -> {} serializing {} (t = {})",
        node, peer, emission.ident, now
    );
    rt.app
        .trace_push(now, node.clone(), TraceKind::TxStart(emission.ident.clone()));

    rt.add_event(
        NetEvents::TxComplete(TxCompleteEvent {
            node: node.clone(),
            peer: peer.clone(),
            ident: emission.ident,
        }),
        emission.complete_at,
    );
    rt.add_event(
        NetEvents::Arrival(ArrivalEvent {
            node: peer.clone(),
            packet: emission.packet,
        }),
        emission.arrive_at,
    );
    Ok(())
}

///
/// Consumes a packet at its ultimate destination.
///
fn deliver(rt: &mut Runtime<Sim>, node: NodeId, packet: Packet) -> Result<(), RuntimeError> {
    let now = rt.sim_time();
    debug_assert_eq!(packet.path_idx(), packet.path().len() - 1);

    let ident = packet.ident();
    let outcome = rt.app.node_mut(&node)?.deposit(&packet, now)?;

    trace!(
        target: "cclsim::node",
        "{} consumed {} (t = {})",
        node, ident, now
    );
    rt.app.trace_push(now, node.clone(), TraceKind::Delivered(ident));

    if outcome == Deposit::Completed {
        let delay = rt.app.node(&node)?.store_delay;
        rt.add_event(
            NetEvents::ChunkArrived(ChunkArrivedEvent {
                chunk: packet.chunk,
                node,
                tx_src: Some(packet.src),
            }),
            now + delay,
        );
    }
    Ok(())
}

///
/// Moves a packet onto the egress port towards its next hop, preserving
/// the flows `(origin src, qpid)` identity.
///
fn forward(rt: &mut Runtime<Sim>, node: NodeId, mut packet: Packet) -> Result<(), RuntimeError> {
    let now = rt.sim_time();

    let Some(next) = packet.next_hop().cloned() else {
        return Err(SimError::Engine(format!(
            "packet {} ran out of path at non-destination {node}",
            packet.ident()
        ))
        .into());
    };
    packet.advance();

    let Some(port) = rt.app.node_mut(&node)?.port_mut(&next) else {
        return Err(SimError::Route {
            packet: packet.ident(),
            node,
            time: now,
        }
        .into());
    };
    port.enqueue(packet);

    service_port(rt, &node, &next)
}

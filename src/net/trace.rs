//! Optional per-packet tracing.

use std::fmt::Display;

use crate::net::types::{ChunkId, NodeId, PacketIdent};
use crate::time::SimTime;

///
/// One step of a traced run. Records are emitted in dispatch order, so a
/// trace is a total order of the observable engine activity.
///
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    /// The simulated time of the step.
    pub time: SimTime,
    /// The node the step happened at.
    pub node: NodeId,
    /// What happened.
    pub kind: TraceKind,
}

///
/// The kinds of steps a trace distinguishes.
///
#[derive(Debug, Clone, PartialEq)]
pub enum TraceKind {
    /// A policy entry fired at its source.
    PolicyFire {
        /// The transmitted chunk.
        chunk: ChunkId,
        /// The entries destination.
        dst: NodeId,
    },
    /// A port began serializing a packet onto its link.
    TxStart(PacketIdent),
    /// A port finished serializing a packet.
    TxComplete(PacketIdent),
    /// A packet arrived at a node.
    Arrival(PacketIdent),
    /// A packet was consumed by the destinations chunk store.
    Delivered(PacketIdent),
    /// A chunk became fully owned at a node.
    ChunkArrived {
        /// The completed chunk.
        chunk: ChunkId,
    },
}

impl Display for TraceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ", self.time, self.node)?;
        match &self.kind {
            TraceKind::PolicyFire { chunk, dst } => write!(f, "fire {chunk} -> {dst}"),
            TraceKind::TxStart(p) => write!(f, "tx-start {p}"),
            TraceKind::TxComplete(p) => write!(f, "tx-complete {p}"),
            TraceKind::Arrival(p) => write!(f, "arrival {p}"),
            TraceKind::Delivered(p) => write!(f, "delivered {p}"),
            TraceKind::ChunkArrived { chunk } => write!(f, "chunk-arrived {chunk}"),
        }
    }
}

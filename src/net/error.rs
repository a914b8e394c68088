use std::error::Error as StdError;
use std::fmt::Display;
use std::time::Duration;

use crate::net::types::{NodeId, PacketIdent};
use crate::time::SimTime;

///
/// An error raised while building or running a simulation.
///
/// Validation errors (`InvalidPolicy`, `InvalidConfig`, `InvalidDelay`)
/// surface at install/build time, before the simulation starts. Runtime
/// errors (`Route`, `DuplicatePacket`) abort the run: their occurrence
/// implies a model-level bug, never a tolerable condition.
///
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// A policy entry is malformed: bad path, unknown node or edge,
    /// non-positive rate, self-dependency.
    InvalidPolicy(String),
    /// Nonsensical simulator parameters: zero quantum, zero payload,
    /// non-positive line rate.
    InvalidConfig(String),
    /// A negative or non-finite value where a delay or point in time is
    /// required.
    InvalidDelay(f64),
    /// A packet arrived at a node whose next hop is not a local egress
    /// port.
    Route {
        /// The offending packet.
        packet: PacketIdent,
        /// The node the packet was stranded at.
        node: NodeId,
        /// The simulated time of the failure.
        time: SimTime,
    },
    /// The same `(chunk, seq)` was delivered twice to the same chunk
    /// store. The model has no loss or retransmission, so this cannot
    /// legally happen.
    DuplicatePacket {
        /// The offending packet.
        packet: PacketIdent,
        /// The node whose store rejected the deposit.
        node: NodeId,
        /// The simulated time of the failure.
        time: SimTime,
    },
    /// An impossible state was reached; catch-all surfaced to the caller.
    Engine(String),
}

impl Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPolicy(msg) => write!(f, "invalid policy: {msg}"),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::InvalidDelay(value) => {
                write!(f, "invalid delay: {value} (must be finite and >= 0)")
            }
            Self::Route { packet, node, time } => {
                write!(f, "no route for packet {packet} at node {node} (t = {time})")
            }
            Self::DuplicatePacket { packet, node, time } => {
                write!(f, "duplicate packet {packet} at node {node} (t = {time})")
            }
            Self::Engine(msg) => write!(f, "engine failure: {msg}"),
        }
    }
}

impl StdError for SimError {}

///
/// Converts a caller-supplied time span in seconds into a [`Duration`],
/// rejecting negative and non-finite values.
///
pub(crate) fn secs(value: f64) -> Result<Duration, SimError> {
    if value.is_finite() && value >= 0.0 {
        Ok(Duration::from_secs_f64(value))
    } else {
        Err(SimError::InvalidDelay(value))
    }
}

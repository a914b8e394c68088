//! Identities and value types of the simulated network.

use std::fmt::{Debug, Display};
use std::sync::Arc;

use crate::net::SimError;

///
/// The identity of a node in the topology. Nodes are identified by name;
/// cloning an id is cheap.
///
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(Arc<str>);

impl NodeId {
    /// The nodes name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(Arc::from(value.as_str()))
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

///
/// The identity of a chunk: a logical data unit scheduled by a policy.
/// Chunks may be numbered or named; equality is by value.
///
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChunkId {
    /// A numbered chunk.
    Num(u64),
    /// A named chunk.
    Name(Arc<str>),
}

impl From<u64> for ChunkId {
    fn from(value: u64) -> Self {
        Self::Num(value)
    }
}

impl From<u32> for ChunkId {
    fn from(value: u32) -> Self {
        Self::Num(u64::from(value))
    }
}

impl From<&str> for ChunkId {
    fn from(value: &str) -> Self {
        Self::Name(Arc::from(value))
    }
}

impl From<String> for ChunkId {
    fn from(value: String) -> Self {
        Self::Name(Arc::from(value.as_str()))
    }
}

impl Debug for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Num(n) => write!(f, "#{n}"),
            Self::Name(s) => write!(f, "{s:?}"),
        }
    }
}

impl Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Num(n) => write!(f, "#{n}"),
            Self::Name(s) => write!(f, "{s}"),
        }
    }
}

/// A queue-pair id. Flows are identified by `(origin src, qpid)` at every
/// hop of their path.
pub type Qpid = u16;

/// The identity of one transmission: a chunk moved from a source to an
/// ultimate destination.
pub type TxId = (ChunkId, NodeId, NodeId);

///
/// The rate requested by a policy entry.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rate {
    /// A fixed rate in bits per second.
    Bps(f64),
    /// The line rate of the source-egress link, resolved when the entry
    /// fires.
    Max,
}

impl Rate {
    pub(crate) fn validate(&self) -> Result<(), SimError> {
        match self {
            Rate::Max => Ok(()),
            Rate::Bps(r) if r.is_finite() && *r > 0.0 => Ok(()),
            Rate::Bps(r) => Err(SimError::InvalidPolicy(format!(
                "rate must be positive and finite, or Max (got {r})"
            ))),
        }
    }
}

///
/// One unit of data in flight. Packets are owned by exactly one location at
/// a time: a QP queue, an in-flight arrival event, or the destinations
/// chunk store.
///
#[derive(Debug, Clone)]
pub struct Packet {
    /// The chunk this packet is a fragment of.
    pub chunk: ChunkId,
    /// Position within the chunk, `0..total`.
    pub seq: u32,
    /// The number of packets the chunk was split into.
    pub total: u32,
    /// Payload size of this fragment.
    pub size_bytes: u64,
    /// The transmissions source.
    pub src: NodeId,
    /// The transmissions ultimate destination.
    pub dst: NodeId,
    /// The resolved rate limit of the transmission in bit/s.
    pub rate_bps: f64,
    /// The queue pair the packet was injected on at the source.
    pub qpid: Qpid,

    path: Arc<[NodeId]>,
    path_idx: usize,
}

impl Packet {
    pub(crate) fn new(
        chunk: ChunkId,
        seq: u32,
        total: u32,
        size_bytes: u64,
        rate_bps: f64,
        qpid: Qpid,
        path: Arc<[NodeId]>,
    ) -> Self {
        debug_assert!(path.len() >= 2);
        Self {
            chunk,
            seq,
            total,
            size_bytes,
            src: path[0].clone(),
            dst: path[path.len() - 1].clone(),
            rate_bps,
            qpid,
            path,
            path_idx: 0,
        }
    }

    /// The hop of the path the packet currently occupies (or is queued
    /// towards).
    #[must_use]
    pub fn path_idx(&self) -> usize {
        self.path_idx
    }

    /// The full path of the packet, `path[0] == src`, `path[last] == dst`.
    #[must_use]
    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    /// The hop following the current position, `None` at the end of the
    /// path.
    #[must_use]
    pub fn next_hop(&self) -> Option<&NodeId> {
        self.path.get(self.path_idx + 1)
    }

    /// Advances the packet towards the next hop. Only the forwarding node
    /// mutates the position; the index grows monotonically.
    pub(crate) fn advance(&mut self) {
        debug_assert!(self.path_idx + 1 < self.path.len());
        self.path_idx += 1;
    }

    /// A compact copy of the packets identity, for traces and errors.
    #[must_use]
    pub fn ident(&self) -> PacketIdent {
        PacketIdent {
            chunk: self.chunk.clone(),
            seq: self.seq,
            total: self.total,
            src: self.src.clone(),
            dst: self.dst.clone(),
        }
    }
}

///
/// The identity of a packet, carried in traces and error reports.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketIdent {
    /// The chunk the packet belongs to.
    pub chunk: ChunkId,
    /// Position within the chunk.
    pub seq: u32,
    /// The number of packets of the chunk.
    pub total: u32,
    /// Transmission source.
    pub src: NodeId,
    /// Transmission destination.
    pub dst: NodeId,
}

impl Display for PacketIdent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}[{}/{}] {}->{}",
            self.chunk,
            self.seq,
            self.total,
            self.src,
            self.dst
        )
    }
}

///
/// An installed rule that, when its chunk (and all dependency chunks)
/// become fully owned at `src`, emits the chunk along `path`.
///
#[derive(Debug, Clone)]
pub struct PolicyEntry {
    /// The chunk to transmit.
    pub chunk: ChunkId,
    /// The source; must equal `path[0]`.
    pub src: NodeId,
    /// The ultimate destination; must equal `path[last]`.
    pub dst: NodeId,
    /// The queue pair to inject on at the source.
    pub qpid: Qpid,
    /// The requested rate.
    pub rate: Rate,
    /// The chunk size. A zero-sized chunk transmits no packets but still
    /// completes at the destination.
    pub size_bytes: u64,
    /// The full hop-by-hop path from `src` to `dst`.
    pub path: Vec<NodeId>,
    /// Earliest fire time in seconds (default 0).
    pub time: f64,
    /// Chunks that must additionally be fully owned at `src` before the
    /// entry fires.
    pub dependency: Vec<ChunkId>,
}

impl PolicyEntry {
    ///
    /// Creates a policy entry with no release-time or dependency
    /// constraints.
    ///
    pub fn new<C, N, P>(
        chunk: C,
        src: &str,
        dst: &str,
        qpid: Qpid,
        rate: Rate,
        size_bytes: u64,
        path: P,
    ) -> Self
    where
        C: Into<ChunkId>,
        N: Into<NodeId>,
        P: IntoIterator<Item = N>,
    {
        Self {
            chunk: chunk.into(),
            src: NodeId::from(src),
            dst: NodeId::from(dst),
            qpid,
            rate,
            size_bytes,
            path: path.into_iter().map(Into::into).collect(),
            time: 0.0,
            dependency: Vec::new(),
        }
    }

    ///
    /// Sets the earliest fire time (absolute, in seconds).
    ///
    pub fn release_at(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    ///
    /// Adds chunks that must be fully owned at `src` before this entry
    /// fires.
    ///
    pub fn depends_on<C, I>(mut self, deps: I) -> Self
    where
        C: Into<ChunkId>,
        I: IntoIterator<Item = C>,
    {
        self.dependency.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Shape validation, independent of the topology.
    pub(crate) fn validate(&self) -> Result<(), SimError> {
        if self.path.len() < 2 {
            return Err(SimError::InvalidPolicy(format!(
                "path must contain at least two hops for chunk {}",
                self.chunk
            )));
        }
        if self.path[0] != self.src {
            return Err(SimError::InvalidPolicy(format!(
                "path must start at src {} for chunk {}",
                self.src, self.chunk
            )));
        }
        if self.path[self.path.len() - 1] != self.dst {
            return Err(SimError::InvalidPolicy(format!(
                "path must end at dst {} for chunk {}",
                self.dst, self.chunk
            )));
        }
        self.rate.validate()?;
        if !self.time.is_finite() || self.time < 0.0 {
            return Err(SimError::InvalidDelay(self.time));
        }
        if self.dependency.contains(&self.chunk) {
            return Err(SimError::InvalidPolicy(format!(
                "entry for chunk {} must not depend on itself",
                self.chunk
            )));
        }
        Ok(())
    }
}

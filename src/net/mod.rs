//!
//! The packet-level network simulation: nodes, ports, chunk stores and the
//! policy machinery, driven by the [`runtime`](crate::runtime).
//!
//! A [`Sim`] is assembled from a resolved topology (directed links), a set
//! of [`PolicyEntry`]s and global [`Params`], then consumed by
//! [`Sim::run`], which yields a [`Report`] of completion times, transfer
//! times and per-port utilization.
//!

use std::time::Duration;

use fxhash::FxHashMap;
use log::debug;

use crate::runtime::{Application, Builder, EventLifecycle, Profiler, Runtime};
use crate::time::SimTime;

mod error;
pub use self::error::SimError;
pub(crate) use self::error::secs;

mod events;
use self::events::{ChunkArrivedEvent, NetEvents, SetLineRateEvent};

mod node;
pub use self::node::NodeConfig;
use self::node::Node;

mod policy;
use self::policy::PolicyEngine;

mod port;
use self::port::Port;

mod topology;
pub use self::topology::LinkSpec;
use self::topology::Topology;

mod trace;
pub use self::trace::{TraceKind, TraceRecord};

mod types;
pub use self::types::{ChunkId, NodeId, Packet, PacketIdent, PolicyEntry, Qpid, Rate, TxId};

///
/// Simulator-wide parameters.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    /// The packet payload size chunks are fragmented into. The last packet
    /// of a chunk carries the remainder.
    pub payload_bytes: u64,
    /// Per-packet header overhead counted towards serialization.
    pub header_bytes: u64,
    /// The round-robin quantum of ports without a node-level override.
    pub default_quantum: u32,
    /// Record a [`TraceRecord`] stream during the run.
    pub trace: bool,
    /// Stop the simulation past this point in time (seconds). Without a
    /// horizon the simulation runs until quiescence.
    pub horizon: Option<f64>,
}

impl Params {
    fn validate(&self) -> Result<(), SimError> {
        if self.payload_bytes == 0 {
            return Err(SimError::InvalidConfig(
                "payload_bytes must be > 0".to_string(),
            ));
        }
        if self.default_quantum == 0 {
            return Err(SimError::InvalidConfig(
                "default_quantum must be >= 1".to_string(),
            ));
        }
        if let Some(horizon) = self.horizon {
            secs(horizon)?;
        }
        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            payload_bytes: 1500,
            header_bytes: 0,
            default_quantum: 1,
            trace: false,
            horizon: None,
        }
    }
}

///
/// A policy-driven packet-level simulation.
///
/// # Examples
///
/// ```
/// use cclsim::prelude::*;
///
/// let mut sim = Sim::new(Params {
///     payload_bytes: 1000,
///     ..Params::default()
/// })
/// .unwrap();
///
/// sim.add_link("a", "b", 10e9, 1e-6).unwrap();
/// sim.install(PolicyEntry::new(0u64, "a", "b", 0, Rate::Max, 3000, ["a", "b"]))
///     .unwrap();
/// sim.produce(0u64, "a").unwrap();
///
/// let report = sim.run().unwrap();
/// assert_eq!(report.completion_time(0u64, "b"), Some(3.4e-6));
/// ```
///
pub struct Sim {
    params: Params,
    topo: Topology,
    node_cfgs: FxHashMap<NodeId, NodeConfig>,
    rate_updates: Vec<(SimTime, NodeId, NodeId, f64)>,

    nodes: FxHashMap<NodeId, Node>,
    policy: PolicyEngine,

    chunk_ready: FxHashMap<(ChunkId, NodeId), SimTime>,
    tx_complete: FxHashMap<TxId, SimTime>,
    tx_first_send: FxHashMap<TxId, SimTime>,
    trace: Vec<TraceRecord>,
}

impl Sim {
    ///
    /// Creates an empty simulation with the given parameters.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for nonsensical parameters (zero payload or
    /// quantum), `InvalidDelay` for a negative horizon.
    ///
    pub fn new(params: Params) -> Result<Self, SimError> {
        params.validate()?;
        Ok(Self {
            params,
            topo: Topology::new(),
            node_cfgs: FxHashMap::default(),
            rate_updates: Vec::new(),
            nodes: FxHashMap::default(),
            policy: PolicyEngine::new(),
            chunk_ready: FxHashMap::default(),
            tx_complete: FxHashMap::default(),
            tx_first_send: FxHashMap::default(),
            trace: Vec::new(),
        })
    }

    ///
    /// Adds a directed link `from -> to`. Nodes are created implicitly on
    /// first mention.
    ///
    /// # Errors
    ///
    /// Rejects non-positive line rates, negative propagation delays,
    /// self-links and duplicate links.
    ///
    pub fn add_link(
        &mut self,
        from: &str,
        to: &str,
        line_rate_bps: f64,
        prop_delay_secs: f64,
    ) -> Result<(), SimError> {
        let spec = LinkSpec::new(line_rate_bps, prop_delay_secs)?;
        self.topo
            .add_link(NodeId::from(from), NodeId::from(to), spec)
    }

    ///
    /// Overrides the per-node tuning of `node`. The node does not need to
    /// exist yet; it is checked against the topology at build time.
    ///
    /// # Errors
    ///
    /// Rejects a zero quantum and negative delays.
    ///
    pub fn node_config(&mut self, node: &str, cfg: NodeConfig) -> Result<(), SimError> {
        cfg.validate()?;
        self.node_cfgs.insert(NodeId::from(node), cfg);
        Ok(())
    }

    ///
    /// Installs a policy entry. Entries at the same `(chunk, src)` key
    /// fire in install order.
    ///
    /// # Errors
    ///
    /// `InvalidPolicy` for malformed entries; see
    /// [`PolicyEntry`] for the shape requirements.
    ///
    pub fn install(&mut self, entry: PolicyEntry) -> Result<(), SimError> {
        if entry.size_bytes.div_ceil(self.params.payload_bytes) > u64::from(u32::MAX) {
            return Err(SimError::InvalidPolicy(format!(
                "chunk {} fragments into more packets than supported",
                entry.chunk
            )));
        }
        self.policy.install(entry)
    }

    ///
    /// Installs a batch of entries, preserving their order.
    ///
    /// # Errors
    ///
    /// Fails on the first invalid entry; earlier entries stay installed.
    ///
    pub fn install_all<I>(&mut self, entries: I) -> Result<(), SimError>
    where
        I: IntoIterator<Item = PolicyEntry>,
    {
        for entry in entries {
            self.install(entry)?;
        }
        Ok(())
    }

    ///
    /// Declares `chunk` as produced at `node` at `t = 0`: the node fully
    /// owns the chunk from the start, which triggers policies keyed there.
    ///
    /// Without any production declarations, initial owners are inferred
    /// from the installed entries (sources that are never destinations of
    /// the chunk).
    ///
    /// # Errors
    ///
    /// Currently infallible; the node is checked at build time.
    ///
    pub fn produce(&mut self, chunk: impl Into<ChunkId>, node: &str) -> Result<(), SimError> {
        self.policy.declare_produced(chunk.into(), NodeId::from(node));
        Ok(())
    }

    ///
    /// Schedules a line-rate update of the link `from -> to` at the given
    /// simulated time. The update affects packets whose service starts
    /// afterwards.
    ///
    /// # Errors
    ///
    /// `InvalidDelay` for a bad time, `InvalidConfig` for a non-positive
    /// rate.
    ///
    pub fn schedule_line_rate(
        &mut self,
        at_secs: f64,
        from: &str,
        to: &str,
        rate_bps: f64,
    ) -> Result<(), SimError> {
        let at = SimTime::from_duration(secs(at_secs)?);
        if !rate_bps.is_finite() || rate_bps <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "line rate must be positive and finite (got {rate_bps})"
            )));
        }
        self.rate_updates
            .push((at, NodeId::from(from), NodeId::from(to), rate_bps));
        Ok(())
    }

    ///
    /// Builds the node and port structures and runs the simulation to
    /// quiescence (or to the configured horizon).
    ///
    /// # Errors
    ///
    /// Build-time validation failures (`InvalidPolicy`, `InvalidConfig`),
    /// or the runtime error that aborted the run (`Route`,
    /// `DuplicatePacket`, `Engine`).
    ///
    pub fn run(mut self) -> Result<Report, SimError> {
        self.build()?;

        let mut builder = Builder::new();
        if let Some(horizon) = self.params.horizon {
            builder = builder.max_time(SimTime::from_duration(secs(horizon)?));
        }

        let rt = builder.build(self);
        match rt.run() {
            Ok((sim, elapsed, profiler)) => Ok(sim.into_report(elapsed, profiler)),
            Err(err) => Err(err
                .downcast_ref::<SimError>()
                .cloned()
                .unwrap_or_else(|| SimError::Engine(err.to_string()))),
        }
    }

    /// Materializes nodes and ports from the recorded inputs, with all
    /// remaining cross-validation.
    fn build(&mut self) -> Result<(), SimError> {
        if self.topo.is_empty() {
            return Err(SimError::InvalidConfig(
                "topology contains no links".to_string(),
            ));
        }

        self.policy.validate_against(&self.topo)?;

        for node in self.node_cfgs.keys() {
            if !self.topo.contains_node(node) {
                return Err(SimError::InvalidConfig(format!(
                    "node config for unknown node {node}"
                )));
            }
        }
        for (_, from, to, _) in &self.rate_updates {
            if self.topo.link(from, to).is_none() {
                return Err(SimError::InvalidConfig(format!(
                    "line-rate update for unknown link {from}->{to}"
                )));
            }
        }

        let default_cfg = NodeConfig::default();
        for id in self.topo.nodes() {
            let cfg = self.node_cfgs.get(id).unwrap_or(&default_cfg);
            self.nodes.insert(id.clone(), Node::new(id.clone(), cfg)?);
        }

        for ((from, to), spec) in self.topo.links() {
            let cfg = self.node_cfgs.get(from).unwrap_or(&default_cfg);
            let quantum = cfg.quantum.unwrap_or(self.params.default_quantum);
            let node = self
                .nodes
                .get_mut(from)
                .ok_or_else(|| SimError::Engine(format!("node {from} vanished during build")))?;
            let port = Port::new(
                from.clone(),
                to.clone(),
                *spec,
                quantum,
                node.tx_proc_delay,
                self.params.header_bytes,
            )?;
            node.add_port(port);
        }

        debug!(
            target: "cclsim::sim",
            "built {} nodes and {} policy entries",
            self.nodes.len(),
            self.policy.len()
        );
        Ok(())
    }

    fn into_report(self, elapsed: SimTime, profiler: Profiler) -> Report {
        let mut utilization = Vec::new();
        for node in self.nodes.values() {
            for port in node.ports() {
                let busy_time = port.busy_time_until(elapsed);
                let share = if elapsed > SimTime::ZERO {
                    busy_time.as_secs_f64() / elapsed.as_secs_f64()
                } else {
                    0.0
                };
                utilization.push(PortUtilization {
                    from: port.owner().clone(),
                    to: port.peer().clone(),
                    busy_time,
                    utilization: share,
                });
            }
        }
        utilization.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));

        Report {
            chunk_ready: self.chunk_ready,
            tx_complete: self.tx_complete,
            tx_first_send: self.tx_first_send,
            utilization,
            trace: self.trace,
            elapsed,
            profiler,
        }
    }

    // -- accessors used by the event handlers --

    pub(crate) fn node(&self, id: &NodeId) -> Result<&Node, SimError> {
        self.nodes
            .get(id)
            .ok_or_else(|| SimError::Engine(format!("no node {id}")))
    }

    pub(crate) fn node_mut(&mut self, id: &NodeId) -> Result<&mut Node, SimError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| SimError::Engine(format!("no node {id}")))
    }

    pub(crate) fn port(&self, node: &NodeId, peer: &NodeId) -> Result<&Port, SimError> {
        self.node(node)?
            .port(peer)
            .ok_or_else(|| SimError::Engine(format!("no port {node}->{peer}")))
    }

    pub(crate) fn port_mut(&mut self, node: &NodeId, peer: &NodeId) -> Result<&mut Port, SimError> {
        self.node_mut(node)?
            .port_mut(peer)
            .ok_or_else(|| SimError::Engine(format!("no port {node}->{peer}")))
    }

    pub(crate) fn trace_push(&mut self, time: SimTime, node: NodeId, kind: TraceKind) {
        if self.params.trace {
            self.trace.push(TraceRecord { time, node, kind });
        }
    }
}

impl Application for Sim {
    type EventSet = NetEvents;
    type Lifecycle = Self;
}

impl EventLifecycle for Sim {
    fn at_sim_start(rt: &mut Runtime<Self>) {
        // Line-rate updates first, so that a t = 0 update precedes any
        // t = 0 policy firing.
        let updates = rt.app.rate_updates.clone();
        for (at, from, to, rate_bps) in updates {
            rt.add_event(
                NetEvents::SetLineRate(SetLineRateEvent {
                    node: from,
                    peer: to,
                    rate_bps,
                }),
                at,
            );
        }

        // Synthetic ownership marks for produced (or inferred) chunks.
        for (chunk, node) in rt.app.policy.bootstrap() {
            rt.add_event(
                NetEvents::ChunkArrived(ChunkArrivedEvent {
                    chunk,
                    node,
                    tx_src: None,
                }),
                SimTime::ZERO,
            );
        }
    }
}

///
/// Utilization of one directed port over a completed run.
///
#[derive(Debug, Clone, PartialEq)]
pub struct PortUtilization {
    /// The owning node.
    pub from: NodeId,
    /// The peer node.
    pub to: NodeId,
    /// Accumulated serialization time.
    pub busy_time: Duration,
    /// `busy_time / elapsed`.
    pub utilization: f64,
}

///
/// The observables of a completed run.
///
#[derive(Debug)]
pub struct Report {
    chunk_ready: FxHashMap<(ChunkId, NodeId), SimTime>,
    tx_complete: FxHashMap<TxId, SimTime>,
    tx_first_send: FxHashMap<TxId, SimTime>,

    /// Per-port utilization, ordered by `(from, to)`.
    pub utilization: Vec<PortUtilization>,
    /// The recorded trace; empty unless tracing was enabled.
    pub trace: Vec<TraceRecord>,
    /// The final simulation time.
    pub elapsed: SimTime,
    /// Wall-clock profile of the run.
    pub profiler: Profiler,
}

impl Report {
    ///
    /// The time `chunk` became fully owned at `node`, in seconds. Chunks
    /// produced at a node complete there at `0.0`.
    ///
    #[must_use]
    pub fn completion_time(&self, chunk: impl Into<ChunkId>, node: &str) -> Option<f64> {
        self.chunk_ready
            .get(&(chunk.into(), NodeId::from(node)))
            .map(|time| time.as_secs_f64())
    }

    ///
    /// All chunk completions, sorted by time (ties by chunk and node).
    ///
    #[must_use]
    pub fn completions(&self) -> Vec<(ChunkId, NodeId, f64)> {
        let mut all: Vec<_> = self
            .chunk_ready
            .iter()
            .map(|((chunk, node), time)| (*time, chunk.clone(), node.clone()))
            .collect();
        all.sort_by(|a, b| a.cmp(b));
        all.into_iter()
            .map(|(time, chunk, node)| (chunk, node, time.as_secs_f64()))
            .collect()
    }

    ///
    /// The time the transmission of `chunk` from `src` fully arrived at
    /// `dst`, in seconds.
    ///
    #[must_use]
    pub fn tx_complete_time(
        &self,
        chunk: impl Into<ChunkId>,
        src: &str,
        dst: &str,
    ) -> Option<f64> {
        self.tx_complete
            .get(&(chunk.into(), NodeId::from(src), NodeId::from(dst)))
            .map(|time| time.as_secs_f64())
    }

    ///
    /// The time the transmission of `chunk` from `src` to `dst` injected
    /// its first packet, in seconds.
    ///
    #[must_use]
    pub fn tx_first_send_time(
        &self,
        chunk: impl Into<ChunkId>,
        src: &str,
        dst: &str,
    ) -> Option<f64> {
        self.tx_first_send
            .get(&(chunk.into(), NodeId::from(src), NodeId::from(dst)))
            .map(|time| time.as_secs_f64())
    }

    ///
    /// The completion time of the last transmission, in seconds.
    ///
    #[must_use]
    pub fn makespan(&self) -> Option<f64> {
        self.tx_complete
            .values()
            .max()
            .map(|time| time.as_secs_f64())
    }

    ///
    /// The utilization of the port `from -> to` over the run.
    ///
    #[must_use]
    pub fn port_utilization(&self, from: &str, to: &str) -> Option<f64> {
        let (from, to) = (NodeId::from(from), NodeId::from(to));
        self.utilization
            .iter()
            .find(|port| port.from == from && port.to == to)
            .map(|port| port.utilization)
    }
}

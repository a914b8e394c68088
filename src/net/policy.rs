//! The registry of installed policy entries and their trigger machinery.

use fxhash::{FxHashMap, FxHashSet};

use crate::net::topology::Topology;
use crate::net::types::{ChunkId, NodeId, PolicyEntry};
use crate::net::SimError;
use crate::time::SimTime;

struct EntryState {
    entry: PolicyEntry,
    /// Earliest fire time.
    release: SimTime,
    /// Gates (ownership transitions at `src`) still missing before the
    /// entry becomes eligible.
    remaining: usize,
    /// A fire event was scheduled.
    scheduled: bool,
    /// The entry was fired.
    fired: bool,
}

///
/// Policy-driven injection.
///
/// Entries are keyed by `(chunk, src)`. An entry becomes eligible once its
/// chunk and every chunk of its dependency list are fully owned at `src`;
/// eligible entries fire at `max(now, release time)`, each exactly once,
/// in install order.
///
pub(crate) struct PolicyEngine {
    entries: Vec<EntryState>,

    /// For each `(node, chunk)` ownership transition, the entries gated
    /// on it, in install order.
    gate_index: FxHashMap<(NodeId, ChunkId), Vec<usize>>,
    /// Ownership transitions seen so far.
    ready: FxHashSet<(NodeId, ChunkId)>,

    /// Chunks declared as produced at a node, in declaration order.
    produced: Vec<(ChunkId, NodeId)>,
}

impl PolicyEngine {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            gate_index: FxHashMap::default(),
            ready: FxHashSet::default(),
            produced: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    ///
    /// Appends an entry to the registry, after shape validation. The
    /// install order is preserved; no deduplication takes place.
    ///
    pub(crate) fn install(&mut self, entry: PolicyEntry) -> Result<(), SimError> {
        entry.validate()?;

        let idx = self.entries.len();

        // The entry waits for its own chunk plus each distinct dependency.
        let mut gates = vec![entry.chunk.clone()];
        for dep in &entry.dependency {
            if !gates.contains(dep) {
                gates.push(dep.clone());
            }
        }
        for gate in &gates {
            self.gate_index
                .entry((entry.src.clone(), gate.clone()))
                .or_default()
                .push(idx);
        }

        self.entries.push(EntryState {
            release: SimTime::from(entry.time),
            remaining: gates.len(),
            scheduled: false,
            fired: false,
            entry,
        });
        Ok(())
    }

    pub(crate) fn declare_produced(&mut self, chunk: ChunkId, node: NodeId) {
        self.produced.push((chunk, node));
    }

    ///
    /// Cross-validates all entries and production declarations against the
    /// resolved topology. Called once at build time, before any event is
    /// dispatched.
    ///
    pub(crate) fn validate_against(&self, topo: &Topology) -> Result<(), SimError> {
        for state in &self.entries {
            let entry = &state.entry;
            for node in &entry.path {
                if !topo.contains_node(node) {
                    return Err(SimError::InvalidPolicy(format!(
                        "unknown node {node} on path of chunk {}",
                        entry.chunk
                    )));
                }
            }
            for hop in entry.path.windows(2) {
                if topo.link(&hop[0], &hop[1]).is_none() {
                    return Err(SimError::InvalidPolicy(format!(
                        "no link {}->{} on path of chunk {}",
                        hop[0], hop[1], entry.chunk
                    )));
                }
            }
        }
        for (chunk, node) in &self.produced {
            if !topo.contains_node(node) {
                return Err(SimError::InvalidPolicy(format!(
                    "chunk {chunk} declared produced at unknown node {node}"
                )));
            }
        }
        Ok(())
    }

    ///
    /// The `(chunk, node)` pairs to mark as owned at simulation start.
    ///
    /// Explicit production declarations win. Without any, initial owners
    /// are inferred per chunk as the sources that are never destinations
    /// of that chunk (falling back to all of its sources), in sorted
    /// order.
    ///
    pub(crate) fn bootstrap(&self) -> Vec<(ChunkId, NodeId)> {
        if !self.produced.is_empty() {
            let mut seen = FxHashSet::default();
            return self
                .produced
                .iter()
                .filter(|pair| seen.insert((*pair).clone()))
                .cloned()
                .collect();
        }

        let mut srcs: FxHashMap<ChunkId, FxHashSet<NodeId>> = FxHashMap::default();
        let mut dsts: FxHashMap<ChunkId, FxHashSet<NodeId>> = FxHashMap::default();
        for state in &self.entries {
            let entry = &state.entry;
            srcs.entry(entry.chunk.clone())
                .or_default()
                .insert(entry.src.clone());
            dsts.entry(entry.chunk.clone())
                .or_default()
                .insert(entry.dst.clone());
        }

        let mut chunks: Vec<&ChunkId> = srcs.keys().collect();
        chunks.sort();

        let mut initial = Vec::new();
        for chunk in chunks {
            let chunk_srcs = &srcs[chunk];
            let empty = FxHashSet::default();
            let chunk_dsts = dsts.get(chunk).unwrap_or(&empty);

            let mut nodes: Vec<&NodeId> = chunk_srcs.difference(chunk_dsts).collect();
            if nodes.is_empty() {
                nodes = chunk_srcs.iter().collect();
            }
            nodes.sort();

            for node in nodes {
                initial.push((chunk.clone(), node.clone()));
            }
        }
        initial
    }

    ///
    /// Reacts to a `(node, chunk)` ownership transition. Returns the
    /// entries that became eligible, in install order, together with
    /// their release times. The caller schedules the fire events.
    ///
    pub(crate) fn on_ready(&mut self, node: &NodeId, chunk: &ChunkId) -> Vec<(usize, SimTime)> {
        if !self.ready.insert((node.clone(), chunk.clone())) {
            return Vec::new();
        }

        let Some(idxs) = self.gate_index.get(&(node.clone(), chunk.clone())) else {
            return Vec::new();
        };

        let idxs = idxs.clone();
        let mut eligible = Vec::new();
        for idx in idxs {
            let state = &mut self.entries[idx];
            state.remaining -= 1;
            if state.remaining == 0 && !state.scheduled {
                state.scheduled = true;
                eligible.push((idx, state.release));
            }
        }
        eligible
    }

    ///
    /// Marks the entry as fired and hands out its definition.
    ///
    pub(crate) fn fire(&mut self, idx: usize) -> Result<PolicyEntry, SimError> {
        let state = self
            .entries
            .get_mut(idx)
            .ok_or_else(|| SimError::Engine(format!("no policy entry with index {idx}")))?;
        if state.fired {
            return Err(SimError::Engine(format!(
                "policy entry {idx} (chunk {}) fired twice",
                state.entry.chunk
            )));
        }
        state.fired = true;
        Ok(state.entry.clone())
    }
}

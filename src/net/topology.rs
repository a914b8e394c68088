//! The resolved set of directed links the engine operates on.
//!
//! Topology construction utilities (graph builders, file loaders) are
//! external collaborators; by the time the engine sees a topology it is a
//! plain list of directed edges with link parameters.

use std::time::Duration;

use fxhash::{FxHashMap, FxHashSet};

use crate::net::error::secs;
use crate::net::types::NodeId;
use crate::net::SimError;

///
/// The parameters of a directed link.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkSpec {
    /// The maximum throughput of the link in bit/s.
    pub line_rate_bps: f64,
    /// The latency a packet endures traversing the link.
    pub prop_delay: Duration,
}

impl LinkSpec {
    ///
    /// Creates a link spec from raw parameters, validating them.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a non-positive or non-finite line rate,
    /// `InvalidDelay` for a negative or non-finite propagation delay.
    ///
    pub fn new(line_rate_bps: f64, prop_delay_secs: f64) -> Result<Self, SimError> {
        if !line_rate_bps.is_finite() || line_rate_bps <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "line rate must be positive and finite (got {line_rate_bps})"
            )));
        }
        Ok(Self {
            line_rate_bps,
            prop_delay: secs(prop_delay_secs)?,
        })
    }
}

///
/// A mapping of the simulated nodes and their directed links.
///
#[derive(Debug, Default)]
pub(crate) struct Topology {
    // Insertion orders are kept so that node and port construction is
    // deterministic across runs.
    edge_order: Vec<(NodeId, NodeId)>,
    links: FxHashMap<(NodeId, NodeId), LinkSpec>,

    node_order: Vec<NodeId>,
    node_set: FxHashSet<NodeId>,
}

impl Topology {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_link(
        &mut self,
        from: NodeId,
        to: NodeId,
        spec: LinkSpec,
    ) -> Result<(), SimError> {
        if from == to {
            return Err(SimError::InvalidConfig(format!(
                "self-link {from}->{to} is not allowed"
            )));
        }
        let key = (from.clone(), to.clone());
        if self.links.contains_key(&key) {
            return Err(SimError::InvalidConfig(format!(
                "duplicate link {from}->{to}"
            )));
        }

        self.register_node(from.clone());
        self.register_node(to.clone());
        self.edge_order.push(key.clone());
        self.links.insert(key, spec);
        Ok(())
    }

    fn register_node(&mut self, node: NodeId) {
        if self.node_set.insert(node.clone()) {
            self.node_order.push(node);
        }
    }

    pub(crate) fn contains_node(&self, node: &NodeId) -> bool {
        self.node_set.contains(node)
    }

    pub(crate) fn link(&self, from: &NodeId, to: &NodeId) -> Option<&LinkSpec> {
        self.links.get(&(from.clone(), to.clone()))
    }

    /// Nodes in first-seen order.
    pub(crate) fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.node_order.iter()
    }

    /// Links in insertion order.
    pub(crate) fn links(&self) -> impl Iterator<Item = (&(NodeId, NodeId), &LinkSpec)> {
        self.edge_order
            .iter()
            .map(move |key| (key, &self.links[key]))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.edge_order.is_empty()
    }
}

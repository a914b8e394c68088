#![warn(missing_docs)]
#![allow(clippy::cast_precision_loss)]

//!
//! `cclsim` - A packet-level discrete-event simulator for
//! collective-communication workloads.
//!
//! The simulator models when chunks of data become available at nodes and
//! how they propagate across an explicit topology under a dependency-driven
//! policy: each [`PolicyEntry`](net::PolicyEntry) describes one chunk
//! transfer along a fully specified path, triggered once its chunk (and any
//! dependency chunks) are fully owned at the source. Transport dynamics are
//! held constant: links are store-and-forward with fixed line rates and
//! propagation delays, ports arbitrate round-robin across per-flow queue
//! pairs, and there is no loss, retransmission or congestion control.
//!
//! The crate is split into two layers:
//!
//! - [`runtime`] is a generic discrete-event core: a [`Runtime`](runtime::Runtime)
//!   drives an [`Application`](runtime::Application) by dispatching its
//!   event set in `(time, scheduling id)` order, which makes runs
//!   bit-identical across repetitions.
//! - [`net`] builds the network semantics on top: [`Sim`](net::Sim) wires
//!   nodes, ports and policies, and [`Sim::run`](net::Sim::run) produces a
//!   [`Report`](net::Report) of completion times and port utilization.
//!
//! # Example
//!
//! Two GPUs, one switch; a chunk moves to `gpu1` and fans out from there:
//!
//! ```
//! use cclsim::prelude::*;
//!
//! let mut sim = Sim::new(Params {
//!     payload_bytes: 1024,
//!     ..Params::default()
//! })
//! .unwrap();
//!
//! for (u, v) in [("gpu0", "sw0"), ("sw0", "gpu1"), ("gpu1", "sw0"), ("sw0", "gpu0")] {
//!     sim.add_link(u, v, 100e9, 0.0).unwrap();
//! }
//!
//! sim.install_all([
//!     PolicyEntry::new(0u64, "gpu0", "gpu1", 0, Rate::Max, 1 << 20, ["gpu0", "sw0", "gpu1"]),
//!     PolicyEntry::new(0u64, "gpu1", "gpu0", 0, Rate::Max, 1 << 20, ["gpu1", "sw0", "gpu0"]),
//! ])
//! .unwrap();
//! sim.produce(0u64, "gpu0").unwrap();
//!
//! let report = sim.run().unwrap();
//! assert!(report.completion_time(0u64, "gpu1").is_some());
//! assert!(report.completion_time(0u64, "gpu0") == Some(0.0));
//! ```
//!

pub mod logger;
pub mod net;
pub mod prelude;
pub mod runtime;
pub mod time;

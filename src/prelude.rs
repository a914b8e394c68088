//!
//! A prelude for the most common simulation types.
//!

pub use crate::net::{
    ChunkId, LinkSpec, NodeConfig, NodeId, Params, PolicyEntry, Qpid, Rate, Report, Sim, SimError,
    TraceKind, TraceRecord,
};
pub use crate::runtime::{
    Application, Builder, Event, EventLifecycle, EventSet, Profiler, Runtime, RuntimeError,
    RuntimeLimit,
};
pub use crate::time::SimTime;

pub use std::time::Duration;

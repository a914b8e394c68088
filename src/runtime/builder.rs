use std::fmt::Debug;
use std::time::{Duration, Instant};

use crate::runtime::{Application, FutureEventSet, Runtime, RuntimeLimit, State};
use crate::time::SimTime;

/// A builder for a runtime instance.
#[must_use]
pub struct Builder {
    pub(super) limit: RuntimeLimit,
    pub(super) start_time: SimTime,
}

impl Builder {
    /// Creates a new unconfigured builder.
    pub fn new() -> Builder {
        Builder {
            limit: RuntimeLimit::None,
            start_time: SimTime::ZERO,
        }
    }

    ///
    /// Changes the start time of the runtime (default: [`SimTime::ZERO`]).
    ///
    pub fn start_time(mut self, time: SimTime) -> Self {
        self.start_time = time;
        self
    }

    ///
    /// Bounds the number of events the runtime will dispatch.
    ///
    pub fn max_itr(mut self, max_itr: usize) -> Self {
        self.limit.add(RuntimeLimit::EventCount(max_itr));
        self
    }

    ///
    /// Bounds the simulation time the runtime will reach (default: inf).
    ///
    pub fn max_time(mut self, max_time: SimTime) -> Self {
        self.limit.add(RuntimeLimit::SimTime(max_time));
        self
    }

    ///
    /// Adds a custom limit to the end of the runtime, combined with
    /// previously set `max_itr` and `max_time` bounds.
    ///
    pub fn limit(mut self, limit: RuntimeLimit) -> Self {
        self.limit.add(limit);
        self
    }

    ///
    /// Builds a new [`Runtime`] instance, using an application as core,
    /// and accepting events of the applications event set.
    ///
    pub fn build<A: Application>(self, app: A) -> Runtime<A> {
        Runtime {
            future_event_set: FutureEventSet::new_with(self.start_time),

            time: self.start_time,
            state: State::Ready,
            limit: self.limit,

            event_id: 0,
            itr: 0,

            profiler: Profiler::default(),

            app,
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("limit", &self.limit)
            .field("start_time", &self.start_time)
            .finish()
    }
}

/// A run profiler, recording throughput data of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profiler {
    /// The number of events that were dispatched.
    pub event_count: usize,
    /// The wall-clock duration of the run.
    pub duration: Duration,

    time_start: Option<Instant>,
}

impl Profiler {
    /// Starts the profile.
    pub(super) fn start(&mut self) {
        self.time_start = Some(Instant::now());
    }

    /// Finishes the profile.
    pub(super) fn finish(&mut self, event_count: usize) {
        self.event_count = event_count;
        if let Some(start) = self.time_start {
            self.duration = start.elapsed();
        }
    }

    /// Events dispatched per wall-clock second.
    #[must_use]
    pub fn throughput(&self) -> f64 {
        if self.duration.is_zero() {
            0.0
        } else {
            self.event_count as f64 / self.duration.as_secs_f64()
        }
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self {
            event_count: 0,
            duration: Duration::ZERO,
            time_start: None,
        }
    }
}

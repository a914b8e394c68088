//!
//! Simulated time.
//!
//! The engine keeps all timing in exact integer nanoseconds: serialization
//! and propagation delays are computed as [`Duration`]s and added onto
//! [`SimTime`] offsets, so repeated runs accumulate bit-identically.
//! Floating-point seconds appear only at the API boundary, where topology
//! and policy inputs enter and report outputs leave.
//!

use std::fmt::{Debug, Display};
use std::ops::{Add, AddAssign, Sub};
use std::time::Duration;

///
/// A point of simulated time: the offset from the start of the run, with
/// nanosecond precision.
///
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimTime(Duration);

impl SimTime {
    /// The start of the simulation.
    pub const ZERO: SimTime = SimTime(Duration::ZERO);

    /// Interprets a duration since simulation start as a point in time.
    #[must_use]
    pub const fn from_duration(offset: Duration) -> Self {
        Self(offset)
    }

    /// This point in time as fractional seconds since simulation start.
    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.0.as_secs_f64()
    }

    /// The time elapsed since `earlier`, or [`Duration::ZERO`] if
    /// `earlier` lies after `self`.
    #[must_use]
    pub fn saturating_duration_since(self, earlier: SimTime) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

// Event deadlines are built by adding a delay onto the current time.

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> Self::Output {
        SimTime(self.0 + rhs)
    }
}

impl AddAssign<Duration> for SimTime {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs;
    }
}

impl Sub<SimTime> for SimTime {
    type Output = Duration;

    fn sub(self, rhs: SimTime) -> Self::Output {
        self.0 - rhs.0
    }
}

// Seconds cross the API boundary as f64 and are fixed to nanosecond
// precision on entry.

impl From<f64> for SimTime {
    fn from(secs: f64) -> Self {
        SimTime(Duration::from_secs_f64(secs))
    }
}

impl Debug for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0.as_secs_f64())
    }
}

//!
//! Central primitives for running a discrete event simulation.
//!
//! The [`Runtime`] owns an [`Application`]: a type that defines the systems
//! state together with the set of events that drive it. Events live on a
//! future event set ordered by `(time, scheduling id)`, so that equal-time
//! events dispatch in the order they were scheduled. The dispatch loop is a
//! plain dequeue-dispatch cycle; each handler runs to completion and may
//! schedule further events as side effects.
//!

use std::fmt::{Debug, Display};
use std::{any::type_name, time::Duration};

use log::{debug, warn};

use crate::time::SimTime;

mod builder;
pub use self::builder::*;

mod error;
pub use self::error::*;

mod event;
pub use self::event::*;

mod fes;
pub(crate) use self::fes::*;

mod limit;
pub use self::limit::*;

///
/// The central management point for a generic instance of a discrete
/// event based simulation.
///
/// To run a simulation:
///
/// - Create an 'App' struct that implements the trait [`Application`].
///   This struct holds the systems state and names the event set used in
///   the simulation.
/// - Create the events that handle the logic of the simulation. They
///   implement [`Event`] with the generic parameter A, where A is the
///   'App' struct.
/// - Bind the two together with an enum that implements [`EventSet`] and
///   holds all the events.
///
pub struct Runtime<A>
where
    A: Application,
{
    /// The contained runtime application, defining globals and the used
    /// event set.
    pub app: A,

    pub(crate) time: SimTime,
    pub(crate) state: State,

    pub(crate) limit: RuntimeLimit,

    pub(crate) event_id: EventId,
    pub(crate) itr: usize,

    pub(crate) profiler: Profiler,

    pub(crate) future_event_set: FutureEventSet<A>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum State {
    Ready,
    Running,
}

impl<A> Runtime<A>
where
    A: Application,
{
    ///
    /// Returns the number of events that were scheduled on this [`Runtime`]
    /// instance.
    ///
    #[must_use]
    pub fn num_events_scheduled(&self) -> usize {
        self.event_id
    }

    ///
    /// Returns the number of events that were received & handled on this
    /// [`Runtime`] instance.
    ///
    #[must_use]
    pub fn num_events_dispatched(&self) -> usize {
        self.itr
    }

    ///
    /// Returns the current simulation time.
    ///
    #[must_use]
    pub fn sim_time(&self) -> SimTime {
        self.time
    }

    /// Runs the application until it terminates or a breaking condition
    /// is reached.
    ///
    /// # Errors
    ///
    /// Returns an error if an event handler or the applications
    /// end-of-simulation hook has determined that a simulation critical
    /// failure occurred.
    ///
    /// # Panics
    ///
    /// This function panics if the simulation was already started manually.
    pub fn run(mut self) -> Result<(A, SimTime, Profiler), RuntimeError> {
        assert_eq!(
            self.state,
            State::Ready,
            "Runtime::run can only be used for simulations in the ready state"
        );

        self.start();
        self.dispatch_all()?;
        self.finish()
    }

    /// Starts the simulation manually. If [`Runtime::run`] is not used, use
    /// the combination of `start`, `dispatch_all` and `finish` to complete a
    /// full execution cycle.
    pub fn start(&mut self) {
        debug!(
            target: "cclsim::runtime",
            "simulation starting (executor := {}, limit := {})",
            self.future_event_set.descriptor(),
            self.limit
        );

        self.profiler.start();

        A::Lifecycle::at_sim_start(self);

        self.state = State::Running;
    }

    /// Dispatches events until the future event set drains or the limit
    /// applies.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by an event handler.
    ///
    /// # Panics
    ///
    /// This function panics if the simulation has not been started.
    pub fn dispatch_all(&mut self) -> Result<(), RuntimeError> {
        assert_eq!(
            self.state,
            State::Running,
            "dispatching is only allowed for running simulations"
        );

        while !self.dispatch_event()? {}
        Ok(())
    }

    /// Processes the next event in the future event set by calling its
    /// handler. Returns `Ok(true)` if the simulation should stop.
    fn dispatch_event(&mut self) -> Result<bool, RuntimeError> {
        let Some(time) = self.future_event_set.peek_time() else {
            return Ok(true);
        };

        if self.limit.applies(self.itr + 1, time) {
            return Ok(true);
        }

        let (event, time) = self.future_event_set.fetch_next();
        self.itr += 1;

        // The only position where the simulation clock is advanced.
        self.time = time;

        event.handle(self)?;
        Ok(false)
    }

    /// Deconstructs the runtime and returns the application, the final
    /// simulation time and the run profile.
    ///
    /// # Errors
    ///
    /// Propagates an error from the applications end-of-simulation hook.
    ///
    /// # Panics
    ///
    /// This function panics if the runtime has not been started.
    pub fn finish(mut self) -> Result<(A, SimTime, Profiler), RuntimeError> {
        assert_eq!(
            self.state,
            State::Running,
            "only a running simulation can be finished"
        );

        A::Lifecycle::at_sim_end(&mut self)?;
        self.profiler.finish(self.itr);

        if self.itr == 0 {
            warn!(
                target: "cclsim::runtime",
                "simulation ended without dispatching any events"
            );
        } else if self.future_event_set.is_empty() {
            debug!(
                target: "cclsim::runtime",
                "simulation ended at event #{} after {}",
                self.itr,
                self.time
            );
        } else {
            debug!(
                target: "cclsim::runtime",
                "simulation ended prematurely at event #{} with {} active events after {}",
                self.itr,
                self.future_event_set.len(),
                self.time
            );
        }

        let time = self.time;
        Ok((self.app, time, self.profiler))
    }

    ///
    /// Adds an event to the future event set, to be handled after the given
    /// duration has passed.
    ///
    pub fn add_event_in(&mut self, event: impl Into<A::EventSet>, duration: Duration) {
        self.add_event(event, self.time + duration);
    }

    ///
    /// Adds an event to the future event set, to be handled at the given
    /// time. The time must not lie in the past.
    ///
    pub fn add_event(&mut self, event: impl Into<A::EventSet>, time: SimTime) {
        self.future_event_set.add(time, event);
        self.event_id += 1;
    }
}

impl<A> Debug for Runtime<A>
where
    A: Application,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Runtime<{}> {{ sim_time: {} (itr {} / {}) scheduled: {} enqueued: {} }}",
            type_name::<A>(),
            self.sim_time(),
            self.num_events_dispatched(),
            self.limit,
            self.num_events_scheduled(),
            self.future_event_set.len()
        )
    }
}

impl<A> Display for Runtime<A>
where
    A: Application,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

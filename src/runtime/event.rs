use crate::runtime::{Runtime, RuntimeError};

///
/// A trait that defines a runtime application that depends on an event set
/// to be processed by the runtime, and a lifecycle management.
///
pub trait Application: Sized {
    ///
    /// The set of events used in the simulation.
    ///
    type EventSet: EventSet<Self>;
    ///
    /// A global type, defining the behavior at sim start / sim end.
    ///
    type Lifecycle: EventLifecycle<Self>;
}

///
/// The set of events processed by an application. Usually an enum with one
/// variant per [`Event`] type, dispatching to the variants handler.
///
pub trait EventSet<App>
where
    App: Application,
{
    ///
    /// Handles the upcoming event. An `Err` return aborts the dispatch loop
    /// and surfaces through [`Runtime::run`](crate::runtime::Runtime::run).
    ///
    fn handle(self, rt: &mut Runtime<App>) -> Result<(), RuntimeError>;
}

///
/// A type that can handle an event, specific to the given application
/// and its associated event set.
///
pub trait Event<App>
where
    App: Application,
{
    ///
    /// A function to handle an upcoming event represented as a specific
    /// instance of an event type.
    ///
    fn handle(self, rt: &mut Runtime<App>) -> Result<(), RuntimeError>;
}

///
/// A type that defines the lifecycle behaviour of an application `A`.
///
pub trait EventLifecycle<A = Self> {
    ///
    /// A function that is called only once at the start of the simulation,
    /// before any event is dispatched.
    ///
    #[allow(unused_variables)]
    fn at_sim_start(rt: &mut Runtime<A>)
    where
        A: Application,
    {
    }

    ///
    /// A function that is called once the simulation has reached its limit
    /// or ran out of events.
    ///
    /// # Errors
    ///
    /// This function may return an error if some situation occurred that
    /// indicates an overall failure of the simulation. The error will be
    /// propagated to [`Runtime::run`](crate::runtime::Runtime::run).
    ///
    #[allow(unused_variables)]
    fn at_sim_end(rt: &mut Runtime<A>) -> Result<(), RuntimeError>
    where
        A: Application,
    {
        Ok(())
    }
}

impl<A: Application> EventSet<A> for () {
    fn handle(self, _: &mut Runtime<A>) -> Result<(), RuntimeError> {
        Ok(())
    }
}

impl<A> EventLifecycle<A> for () {}

///
/// A runtime unique identifier for an event, assigned in scheduling order.
///
pub(crate) type EventId = usize;

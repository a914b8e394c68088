use std::cmp;
use std::collections::BinaryHeap;

use crate::runtime::{Application, EventId};
use crate::time::SimTime;

///
/// A node of the future event set: an event together with its deadline
/// and its scheduling id.
///
#[derive(Debug)]
pub(crate) struct EventNode<A>
where
    A: Application,
{
    /// The deadline timestamp for the event.
    pub(crate) time: SimTime,
    /// A runtime-specific unique identifier, assigned in scheduling order.
    pub(crate) id: EventId,
    /// The actual event.
    pub(crate) event: A::EventSet,
}

impl<A> cmp::PartialEq for EventNode<A>
where
    A: Application,
{
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<A> cmp::Eq for EventNode<A> where A: Application {}

impl<A> cmp::PartialOrd for EventNode<A>
where
    A: Application,
{
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<A> cmp::Ord for EventNode<A>
where
    A: Application,
{
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        // Inverted comparison, since BinaryHeap is a max-heap. The id acts
        // as a tiebreaker so that equal-time events dequeue in insertion
        // order.
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

///
/// The set of all events scheduled but not yet dispatched, ordered by
/// `(time, id)`.
///
pub(crate) struct FutureEventSet<A>
where
    A: Application,
{
    heap: BinaryHeap<EventNode<A>>,

    next_id: EventId,
    last_event_time: SimTime,
}

impl<A> FutureEventSet<A>
where
    A: Application,
{
    #[allow(clippy::unused_self)]
    pub(crate) fn descriptor(&self) -> String {
        "FutureEventSet::BinaryHeap()".to_string()
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub(crate) fn new_with(start_time: SimTime) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(64),
            next_id: 0,
            last_event_time: start_time,
        }
    }

    ///
    /// The deadline of the earliest scheduled event.
    ///
    pub(crate) fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|node| node.time)
    }

    ///
    /// Removes and returns the earliest event. The caller must guarantee
    /// that at least one event exists in the future event set.
    ///
    pub(crate) fn fetch_next(&mut self) -> (A::EventSet, SimTime) {
        let event = self
            .heap
            .pop()
            .expect("fetch_next may only be called if an event exists");
        self.last_event_time = event.time;
        (event.event, event.time)
    }

    pub(crate) fn add(&mut self, time: SimTime, event: impl Into<A::EventSet>) {
        assert!(
            time >= self.last_event_time,
            "cannot schedule an event at {} before the current time {}",
            time,
            self.last_event_time
        );

        let node = EventNode {
            time,
            id: self.next_id,
            event: event.into(),
        };
        self.next_id += 1;
        self.heap.push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{EventSet, Runtime, RuntimeError};

    struct TestApp;
    impl Application for TestApp {
        type EventSet = usize;
        type Lifecycle = ();
    }
    impl EventSet<TestApp> for usize {
        fn handle(self, _: &mut Runtime<TestApp>) -> Result<(), RuntimeError> {
            Ok(())
        }
    }

    #[test]
    fn orders_by_time() {
        let mut fes = FutureEventSet::<TestApp>::new_with(SimTime::ZERO);
        fes.add(SimTime::from(3.0), 3usize);
        fes.add(SimTime::from(1.0), 1usize);
        fes.add(SimTime::from(2.0), 2usize);

        assert_eq!(fes.peek_time(), Some(SimTime::from(1.0)));
        assert_eq!(fes.fetch_next().0, 1);
        assert_eq!(fes.fetch_next().0, 2);
        assert_eq!(fes.fetch_next().0, 3);
        assert!(fes.is_empty());
    }

    #[test]
    fn equal_times_dequeue_in_insertion_order() {
        let mut fes = FutureEventSet::<TestApp>::new_with(SimTime::ZERO);
        let t = SimTime::from(1.0);
        for i in 0..64usize {
            fes.add(t, i);
        }
        for i in 0..64usize {
            let (event, time) = fes.fetch_next();
            assert_eq!(event, i);
            assert_eq!(time, t);
        }
    }

    #[test]
    #[should_panic]
    fn rejects_scheduling_into_the_past() {
        let mut fes = FutureEventSet::<TestApp>::new_with(SimTime::ZERO);
        fes.add(SimTime::from(2.0), 0usize);
        let _ = fes.fetch_next();
        fes.add(SimTime::from(1.0), 1usize);
    }
}

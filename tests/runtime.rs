//! Behavior of the generic discrete-event core, independent of the
//! network layer.

use cclsim::prelude::*;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum MyEventSet {
    Record(Record),
    RepeatWithDelay(RepeatWithDelay),
    Fail(Fail),
}

impl EventSet<App> for MyEventSet {
    fn handle(self, rt: &mut Runtime<App>) -> Result<(), RuntimeError> {
        match self {
            Self::Record(event) => event.handle(rt),
            Self::RepeatWithDelay(event) => event.handle(rt),
            Self::Fail(event) => event.handle(rt),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Record {
    id: usize,
}

impl Event<App> for Record {
    fn handle(self, rt: &mut Runtime<App>) -> Result<(), RuntimeError> {
        let now = rt.sim_time();
        rt.app.event_list.push((now, self.id));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RepeatWithDelay {
    delay: Duration,
    repeat: usize,
    repeat_limit: usize,
}

impl Event<App> for RepeatWithDelay {
    fn handle(mut self, rt: &mut Runtime<App>) -> Result<(), RuntimeError> {
        if self.repeat <= self.repeat_limit {
            let delay = self.delay;
            self.repeat += 1;
            rt.add_event_in(MyEventSet::RepeatWithDelay(self), delay);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Fail;

#[derive(Debug, Clone, PartialEq, Eq)]
struct FailError;

impl fmt::Display for FailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deliberate failure")
    }
}

impl std::error::Error for FailError {}

impl Event<App> for Fail {
    fn handle(self, _rt: &mut Runtime<App>) -> Result<(), RuntimeError> {
        Err(FailError.into())
    }
}

#[derive(Debug)]
struct App {
    event_list: Vec<(SimTime, usize)>,
}

impl Application for App {
    type EventSet = MyEventSet;
    type Lifecycle = ();
}

fn fresh() -> Runtime<App> {
    Builder::new().build(App {
        event_list: Vec::new(),
    })
}

#[test]
fn zero_event_runtime_finishes_at_zero() {
    let rt = fresh();
    let (_, time, profiler) = rt.run().unwrap();
    assert_eq!(time, SimTime::ZERO);
    assert_eq!(profiler.event_count, 0);
}

#[test]
fn repeated_events_advance_the_clock() {
    let mut rt = fresh();
    rt.add_event(
        MyEventSet::RepeatWithDelay(RepeatWithDelay {
            delay: Duration::new(1, 0),
            repeat: 0,
            repeat_limit: 15,
        }),
        SimTime::ZERO,
    );

    // Repeat i fires at i seconds; the limit (<=) is hit at 15 s, so the
    // final event lands at 16 s, for 17 events in total.
    let (_, time, profiler) = rt.run().unwrap();
    assert_eq!(time, SimTime::from_duration(Duration::new(16, 0)));
    assert_eq!(profiler.event_count, 17);
}

#[test]
fn events_fire_in_time_order() {
    let mut rt = fresh();
    rt.add_event(MyEventSet::Record(Record { id: 2 }), SimTime::from(2.0));
    rt.add_event(MyEventSet::Record(Record { id: 3 }), SimTime::from(3.0));
    rt.add_event(MyEventSet::Record(Record { id: 1 }), SimTime::from(1.0));

    let (app, time, _) = rt.run().unwrap();
    assert_eq!(time, SimTime::from(3.0));

    let ids: Vec<usize> = app.event_list.iter().map(|(_, id)| *id).collect();
    assert_eq!(ids, [1, 2, 3]);
}

#[test]
fn equal_time_events_fire_in_insertion_order() {
    let mut rt = fresh();
    let one = SimTime::from(1.0);

    rt.add_event(MyEventSet::Record(Record { id: 1 }), SimTime::ZERO);
    for id in 2..=4 {
        rt.add_event(MyEventSet::Record(Record { id }), one);
    }
    rt.add_event(MyEventSet::Record(Record { id: 5 }), SimTime::from(2.0));

    let (app, _, profiler) = rt.run().unwrap();
    assert_eq!(profiler.event_count, 5);

    let ids: Vec<usize> = app.event_list.iter().map(|(_, id)| *id).collect();
    assert_eq!(ids, [1, 2, 3, 4, 5]);
}

#[test]
fn event_count_limit_stops_the_run() {
    let mut rt = Builder::new().max_itr(2).build(App {
        event_list: Vec::new(),
    });
    for id in 0..5 {
        rt.add_event(MyEventSet::Record(Record { id }), SimTime::from(id as f64));
    }

    let (app, _, profiler) = rt.run().unwrap();
    assert_eq!(profiler.event_count, 2);
    assert_eq!(app.event_list.len(), 2);
}

#[test]
fn time_limit_stops_the_run() {
    let mut rt = Builder::new()
        .max_time(SimTime::from(1.5))
        .build(App {
            event_list: Vec::new(),
        });
    for id in 0..5 {
        rt.add_event(MyEventSet::Record(Record { id }), SimTime::from(id as f64));
    }

    let (app, time, _) = rt.run().unwrap();
    assert_eq!(app.event_list.len(), 2);
    assert!(time <= SimTime::from(1.5));
}

#[test]
fn handler_errors_abort_the_run() {
    let mut rt = fresh();
    rt.add_event(MyEventSet::Record(Record { id: 0 }), SimTime::ZERO);
    rt.add_event(MyEventSet::Fail(Fail), SimTime::from(1.0));
    rt.add_event(MyEventSet::Record(Record { id: 1 }), SimTime::from(2.0));

    let err = rt.run().unwrap_err();
    assert!(err.downcast_ref::<FailError>().is_some());
}

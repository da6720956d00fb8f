//! Time-ordered event scheduling over a pluggable clock.
//!
//! A `Scheduler` owns a mutex-guarded `MinQueue` of pending events plus the
//! clock hooks its run loop waits against. Callers enter actions at absolute
//! or relative times from any thread; `run` drains the queue in timestamp
//! order, dispatching each action either on its own thread or inline on the
//! loop thread.
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::{clock::Clock, queue::MinQueue, AlarumError};

type Action = Box<dyn FnOnce() + Send + 'static>;

struct Entry {
    at: Instant,
    action: Action,
}

fn due(entry: &Entry) -> Instant {
    entry.at
}

type EventQueue = MinQueue<Entry, Instant, fn(&Entry) -> Instant>;

/// Handle identifying a scheduled action.
///
/// `seq` is the queue's insertion sequence number. Equal timestamps dispatch
/// in ascending `seq`, so the derived ordering is exactly dispatch order.
/// The handle is informational only; there is no cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Event {
    pub at: Instant,
    pub seq: u64,
}

/// Record of a concurrently dispatched action that panicked.
#[derive(Debug, Clone)]
pub struct Fault {
    pub event: Event,
    pub error: AlarumError,
}

/// Next run-loop move, decided while the queue lock is held.
enum Step {
    Wait(Duration),
    Fire(u64, Entry),
}

/// Time-ordered event scheduler.
pub struct Scheduler {
    // if true, dispatches each event on its own thread.
    concurrent: bool,
    clock: Clock,
    queue: Mutex<EventQueue>,
    faults: Arc<Mutex<Vec<Fault>>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler::new()
    }
}

impl Scheduler {
    /// New scheduler with concurrent dispatch and the real wall clock.
    pub fn new() -> Self {
        Self::with_clock(true, Clock::wall())
    }

    /// New scheduler with an explicit dispatch mode and time hooks.
    pub fn with_hooks<N, S>(concurrent: bool, now: N, sleep: S) -> Self
    where
        N: Fn() -> Instant + Send + Sync + 'static,
        S: Fn(Duration) + Send + Sync + 'static,
    {
        Self::with_clock(concurrent, Clock::from_hooks(now, sleep))
    }

    fn with_clock(concurrent: bool, clock: Clock) -> Self {
        Self {
            concurrent,
            clock,
            queue: Mutex::new(MinQueue::new(due as fn(&Entry) -> Instant)),
            faults: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Schedule `action` to run at the absolute instant `at`.
    ///
    /// Safe to call from any thread, including concurrently with `run`.
    pub fn enter_abs<F>(&self, at: Instant, action: F) -> Event
    where
        F: FnOnce() + Send + 'static,
    {
        let seq = self.queue.lock().push(Entry {
            at,
            action: Box::new(action),
        });
        log::trace!("entered event #{seq}");
        Event { at, seq }
    }

    /// Schedule `action` to run once `delay` has elapsed on the clock.
    pub fn enter<F>(&self, delay: Duration, action: F) -> Event
    where
        F: FnOnce() + Send + 'static,
    {
        self.enter_abs(self.clock.now() + delay, action)
    }

    /// True if no events are pending. May be immediately stale while other
    /// threads are scheduling.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Number of pending events. May be immediately stale while other
    /// threads are scheduling.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Drain the panics recorded by concurrently dispatched actions so far.
    pub fn take_faults(&self) -> Vec<Fault> {
        std::mem::take(&mut *self.faults.lock())
    }

    /// Execute events in timestamp order until the queue is empty.
    ///
    /// The queue lock is held only around single peek/pop operations, never
    /// across a sleep or an action. The wait before the next due event is
    /// computed once and is not interrupted when an earlier event arrives
    /// mid-sleep; the loop re-peeks only after the full sleep elapses.
    /// Events entered after the loop observes an empty queue are left for a
    /// later `run` call.
    pub fn run(&self) {
        loop {
            let step = {
                let mut queue = self.queue.lock();
                let Some(at) = queue.peek().map(due) else {
                    break;
                };
                let now = self.clock.now();
                if at > now {
                    Step::Wait(at - now)
                } else {
                    match queue.pop() {
                        Ok((seq, entry)) => Step::Fire(seq, entry),
                        Err(_) => break,
                    }
                }
            };
            match step {
                Step::Wait(wait) => {
                    log::trace!("next event due in {wait:?}, sleeping");
                    self.clock.sleep(wait);
                }
                Step::Fire(seq, entry) => self.dispatch(seq, entry),
            }
        }
    }

    fn dispatch(&self, seq: u64, entry: Entry) {
        log::trace!("dispatching event #{seq}");
        if !self.concurrent {
            (entry.action)();
            return;
        }

        let event = Event {
            at: entry.at,
            seq,
        };
        let faults = Arc::clone(&self.faults);
        let action = entry.action;
        thread::spawn(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(action)) {
                let message = panic_text(payload);
                log::error!("event #{} panicked: {message}", event.seq);
                faults.lock().push(Fault {
                    event,
                    error: AlarumError::ActionPanicked(message),
                });
            }
        });
        // nudge the spawned action onto a core before the next peek
        thread::yield_now();
    }
}

fn panic_text(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

//! Deferred emissions with one pending slot per overlay.
//!
//! The scheduler never runs anything on its own: the host event loop calls
//! [`CoalescingScheduler::run_due`] on every tick, and the scheduler fires the
//! emissions whose deadline passed.

use crate::prelude::HashMap;
use instant::Instant;
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

/// Source of the current time
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Cell::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }

    pub fn advance_ms(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }
}

/// Key of one pending-emission slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u64);

/// Deferred work stored in a slot
pub type Task = Rc<dyn Fn()>;

struct Pending {
    deadline: Instant,
    task: Task,
}

/// Trailing-edge coalescer.
///
/// Scheduling into a slot that already holds a task replaces the task and
/// pushes the deadline back by a full interval, so a burst of events yields
/// one emission `interval` after the last of them.
pub struct CoalescingScheduler {
    clock: Rc<dyn Clock>,
    interval: Duration,
    next_slot: Cell<u64>,
    slots: RefCell<HashMap<SlotId, Pending>>,
}

impl CoalescingScheduler {
    pub fn new(clock: Rc<dyn Clock>, interval: Duration) -> Self {
        Self {
            clock,
            interval,
            next_slot: Cell::new(1),
            slots: RefCell::new(HashMap::default()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn clock(&self) -> &Rc<dyn Clock> {
        &self.clock
    }

    /// Hands out a fresh slot
    pub fn register(&self) -> SlotId {
        let id = self.next_slot.get();
        self.next_slot.set(id + 1);
        SlotId(id)
    }

    /// Puts `task` into `slot`, replacing whatever was pending there
    pub fn schedule(&self, slot: SlotId, task: Task) {
        let deadline = self.clock.now() + self.interval;
        let replaced = self
            .slots
            .borrow_mut()
            .insert(slot, Pending { deadline, task })
            .is_some();
        if replaced {
            log::trace!("coalesced pending emission in slot {:?}", slot);
        }
    }

    /// Drops the pending task of `slot`; returns whether one was pending
    pub fn cancel(&self, slot: SlotId) -> bool {
        self.slots.borrow_mut().remove(&slot).is_some()
    }

    pub fn is_pending(&self, slot: SlotId) -> bool {
        self.slots.borrow().contains_key(&slot)
    }

    pub fn pending_count(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Earliest deadline among pending tasks
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots
            .borrow()
            .values()
            .map(|pending| pending.deadline)
            .min()
    }

    /// Runs every task whose deadline has passed, oldest first.
    ///
    /// Tasks are taken out of their slots before running, so a task may
    /// schedule into its own slot again.
    pub fn run_due(&self) -> usize {
        let now = self.clock.now();
        let mut due: Vec<(Instant, Task)> = {
            let mut slots = self.slots.borrow_mut();
            let ready: Vec<SlotId> = slots
                .iter()
                .filter(|(_, pending)| pending.deadline <= now)
                .map(|(slot, _)| *slot)
                .collect();
            ready
                .into_iter()
                .filter_map(|slot| slots.remove(&slot))
                .map(|pending| (pending.deadline, pending.task))
                .collect()
        };
        due.sort_by_key(|(deadline, _)| *deadline);

        let count = due.len();
        for (_, task) in due {
            task();
        }
        count
    }
}

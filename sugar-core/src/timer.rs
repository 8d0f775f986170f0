//! Timers
//!
//! Delayed callbacks behind a [`Scheduler`] trait so controllers never block
//! and never depend on a particular event loop.
//!
//! - [`ManualClock`] keeps virtual time that only moves when
//!   [`ManualClock::advance`] is called. Deterministic, used in tests.
//! - [`TokioScheduler`] spawns local tasks on the current
//!   [`tokio::task::LocalSet`] and sleeps with [`tokio::time::sleep`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use indexmap::IndexMap;
use tokio::task::JoinHandle;

/// Handle to a scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

pub type TimerCallback = Box<dyn FnOnce()>;

/// One-shot delayed callbacks.
pub trait Scheduler {
    /// Runs `callback` once after `delay`.
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Cancels a pending callback. Unknown or already fired handles are
    /// ignored.
    fn clear_timeout(&self, handle: TimerHandle);
}

struct PendingTimer {
    deadline: Duration,
    callback: TimerCallback,
}

/// Virtual clock for deterministic scheduling.
#[derive(Default)]
pub struct ManualClock {
    now: Cell<Duration>,
    pending: RefCell<IndexMap<TimerHandle, PendingTimer>>,
}

impl ManualClock {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Elapsed virtual time.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Moves time forward by `by`, firing every timer that falls due, in
    /// deadline order. Returns the number of callbacks run.
    ///
    /// Callbacks may schedule new timers; those fire too if they fall due
    /// before the target time.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now.get() + by;
        let mut fired = 0;

        while let Some((handle, deadline)) = self.next_due(target) {
            let Some(timer) = self.pending.borrow_mut().shift_remove(&handle) else {
                continue;
            };
            self.now.set(deadline);
            tracing::trace!(?handle, ?deadline, "timer fired");
            (timer.callback)();
            fired += 1;
        }

        self.now.set(target);
        fired
    }

    /// Earliest pending timer due at or before `target`. Ties go to the
    /// timer scheduled first.
    fn next_due(&self, target: Duration) -> Option<(TimerHandle, Duration)> {
        self.pending
            .borrow()
            .iter()
            .filter(|(_, timer)| timer.deadline <= target)
            .min_by_key(|(_, timer)| timer.deadline)
            .map(|(handle, timer)| (*handle, timer.deadline))
    }
}

impl Scheduler for ManualClock {
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let handle = TimerHandle::next();
        let deadline = self.now.get() + delay;
        self.pending
            .borrow_mut()
            .insert(handle, PendingTimer { deadline, callback });

        handle
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        self.pending.borrow_mut().shift_remove(&handle);
    }
}

/// Scheduler backed by tokio local tasks.
///
/// Must be used from within a [`tokio::task::LocalSet`], since callbacks are
/// not `Send`.
#[derive(Default)]
pub struct TokioScheduler {
    tasks: Rc<RefCell<IndexMap<TimerHandle, JoinHandle<()>>>>,
}

impl TokioScheduler {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.borrow().len()
    }
}

impl Scheduler for TokioScheduler {
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let handle = TimerHandle::next();
        let tasks = Rc::clone(&self.tasks);
        let task = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            tasks.borrow_mut().shift_remove(&handle);
            callback();
        });
        self.tasks.borrow_mut().insert(handle, task);

        handle
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        if let Some(task) = self.tasks.borrow_mut().shift_remove(&handle) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> TimerCallback) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let make = {
            let log = Rc::clone(&log);
            move |name: &'static str| -> TimerCallback {
                let log = Rc::clone(&log);
                Box::new(move || log.borrow_mut().push(name))
            }
        };
        (log, make)
    }

    #[test]
    fn manual_clock_fires_in_deadline_order() {
        let clock = ManualClock::new();
        let (log, make) = recorder();

        clock.set_timeout(Duration::from_millis(300), make("late"));
        clock.set_timeout(Duration::from_millis(100), make("early"));

        assert_eq!(clock.advance(Duration::from_millis(99)), 0);
        assert_eq!(clock.advance(Duration::from_millis(1)), 1);
        assert_eq!(clock.advance(Duration::from_millis(500)), 1);
        assert_eq!(*log.borrow(), vec!["early", "late"]);
        assert_eq!(clock.now(), Duration::from_millis(600));
    }

    #[test]
    fn cleared_timer_never_fires() {
        let clock = ManualClock::new();
        let (log, make) = recorder();

        let handle = clock.set_timeout(Duration::from_millis(10), make("cleared"));
        clock.clear_timeout(handle);
        clock.clear_timeout(handle);

        assert_eq!(clock.advance(Duration::from_secs(1)), 0);
        assert!(log.borrow().is_empty());
        assert_eq!(clock.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_fires_and_cancels() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let scheduler = TokioScheduler::new();
                let (log, make) = recorder();

                scheduler.set_timeout(Duration::from_millis(200), make("fired"));
                let cancelled = scheduler.set_timeout(Duration::from_millis(100), make("cancelled"));
                scheduler.clear_timeout(cancelled);

                tokio::time::sleep(Duration::from_millis(250)).await;

                assert_eq!(*log.borrow(), vec!["fired"]);
                assert_eq!(scheduler.pending_count(), 0);
            })
            .await;
    }
}

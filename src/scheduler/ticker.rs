//! Restartable periodic ticker.
//!
//! Each ticker owns one worker thread that sleeps on a condition variable
//! between ticks. `stop` is cooperative: the worker finishes the tick it is
//! in, and the stopping thread waits for that tick to end unless it *is* the
//! worker.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crate::error::{bounded, Error, ExecutionError, Result};

/// Lifecycle of a ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerStatus {
    /// Firing at the configured interval.
    Running,
    /// Alive but not firing.
    Stopped,
    /// Worker has exited (explicit shutdown or a panicking callback).
    Shutdown,
}

#[derive(Debug)]
struct Schedule {
    interval: Duration,
    running: bool,
    shutdown: bool,
    in_tick: bool,
    /// Bumped whenever the phase must restart (resume, new interval).
    epoch: u64,
}

#[derive(Debug)]
struct Shared {
    schedule: Mutex<Schedule>,
    signal: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Schedule>) -> MutexGuard<'a, Schedule> {
        self.signal
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Invokes a callback every `interval` on a dedicated worker thread.
///
/// # Example
///
/// ```rust,ignore
/// let ticker = Ticker::spawn("x_axis", Duration::from_millis(5), true, move || {
///     actuator_core.tick();
/// })?;
/// ticker.stop();
/// ticker.set_interval(Duration::from_millis(2));
/// ticker.restart();
/// ```
#[derive(Debug)]
pub struct Ticker {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
}

impl Ticker {
    /// Spawn the worker thread. When `start` is false the ticker waits for
    /// [`restart`](Self::restart) before the first tick.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::SchedulerUnavailable` if the thread cannot
    /// be spawned.
    pub fn spawn<F>(name: &str, interval: Duration, start: bool, callback: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let shared = Arc::new(Shared {
            schedule: Mutex::new(Schedule {
                interval,
                running: start,
                shutdown: false,
                in_tick: false,
                epoch: 0,
            }),
            signal: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(format!("tick-{}", name))
            .spawn(move || run(&worker_shared, callback))
            .map_err(|e| {
                Error::Execution(ExecutionError::SchedulerUnavailable(bounded(&e.to_string())))
            })?;
        let worker_id = handle.thread().id();

        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
            worker_id,
        })
    }

    /// Stop firing. Idempotent.
    ///
    /// When called from outside the worker, returns only once any tick in
    /// progress has finished, so no callback runs after `stop` returns.
    pub fn stop(&self) {
        let mut schedule = self.shared.lock();
        schedule.running = false;
        self.shared.signal.notify_all();

        if thread::current().id() == self.worker_id {
            return;
        }
        while schedule.in_tick {
            schedule = self.shared.wait(schedule);
        }
    }

    /// Resume firing, one full interval from now. Idempotent; no effect
    /// after shutdown.
    pub fn restart(&self) {
        let mut schedule = self.shared.lock();
        if schedule.shutdown || schedule.running {
            return;
        }
        schedule.running = true;
        schedule.epoch += 1;
        self.shared.signal.notify_all();
    }

    /// Change the period. Takes effect from now without losing the running state.
    pub fn set_interval(&self, interval: Duration) {
        let mut schedule = self.shared.lock();
        schedule.interval = interval;
        schedule.epoch += 1;
        self.shared.signal.notify_all();
    }

    /// Current period.
    pub fn interval(&self) -> Duration {
        self.shared.lock().interval
    }

    /// Current lifecycle status.
    pub fn status(&self) -> TickerStatus {
        let schedule = self.shared.lock();
        if schedule.shutdown {
            TickerStatus::Shutdown
        } else if schedule.running {
            TickerStatus::Running
        } else {
            TickerStatus::Stopped
        }
    }

    /// Whether the ticker is currently firing.
    pub fn is_running(&self) -> bool {
        self.status() == TickerStatus::Running
    }

    /// Stop permanently and let the worker exit. Idempotent.
    ///
    /// Joins the worker unless called from it.
    pub fn shutdown(&self) {
        {
            let mut schedule = self.shared.lock();
            schedule.shutdown = true;
            schedule.running = false;
            self.shared.signal.notify_all();
        }

        if thread::current().id() == self.worker_id {
            return;
        }
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            // The callback runs under catch_unwind, so the worker never panics.
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<F: FnMut()>(shared: &Shared, mut callback: F) {
    let mut next: Option<Instant> = None;
    let mut seen_epoch = 0;
    let mut schedule = shared.lock();

    loop {
        if schedule.shutdown {
            break;
        }
        if !schedule.running {
            next = None;
            schedule = shared.wait(schedule);
            continue;
        }
        if schedule.epoch != seen_epoch {
            seen_epoch = schedule.epoch;
            next = None;
        }

        let now = Instant::now();
        let deadline = match next.or_else(|| now.checked_add(schedule.interval)) {
            Some(deadline) => deadline,
            None => {
                // Interval too large to represent: wait to be reconfigured.
                schedule = shared.wait(schedule);
                continue;
            }
        };
        next = Some(deadline);
        if now < deadline {
            schedule = shared
                .signal
                .wait_timeout(schedule, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
            continue;
        }

        schedule.in_tick = true;
        drop(schedule);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback()));
        schedule = shared.lock();
        schedule.in_tick = false;
        if outcome.is_err() {
            schedule.shutdown = true;
            schedule.running = false;
        }
        shared.signal.notify_all();

        // Missed ticks are dropped, not replayed in a burst.
        let now = Instant::now();
        next = match deadline.checked_add(schedule.interval) {
            Some(after) if after > now => Some(after),
            _ => now.checked_add(schedule.interval),
        };
    }

    schedule.running = false;
    shared.signal.notify_all();
}

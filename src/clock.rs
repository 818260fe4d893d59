//! Clock and timer service.
//!
//! Two concerns live here:
//!
//! - [`Clock`]: wall-clock timestamps (for `lastUpdate`, commands, exports) and
//!   monotonic elapsed time (for uptime). [`SystemClock`] is the real one,
//!   [`ManualClock`] is driven by hand in tests.
//! - [`spawn_periodic`]: a cancellable periodic tick on the tokio runtime, used
//!   for the simulation cadence and the uptime cadence.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Source of time for the engine.
pub trait Clock: Send + Sync + Debug {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Monotonic time elapsed since the clock was created. Never decreases.
    fn elapsed(&self) -> Duration;
}

/// The real clock.
///
/// Elapsed time is measured with [`tokio::time::Instant`], so a paused tokio
/// test runtime controls it too.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose elapsed time starts now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Create a shareable clock.
    pub fn shared() -> Arc<dyn Clock> {
        Arc::new(Self::new())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<(DateTime<Utc>, Duration)>,
}

impl ManualClock {
    /// Create a manual clock frozen at `start` with zero elapsed time.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new((start, Duration::ZERO)),
        }
    }

    /// Move both wall time and elapsed time forward.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        state.0 += chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
        state.1 += by;
    }

    /// Jump the wall time without touching elapsed time.
    ///
    /// Wall clocks can step backwards (NTP); elapsed time cannot.
    pub fn set_now(&self, now: DateTime<Utc>) {
        self.state.lock().0 = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.state.lock().0
    }

    fn elapsed(&self) -> Duration {
        self.state.lock().1
    }
}

/// Handle for a periodic timer started with [`spawn_periodic`].
///
/// Dropping the handle stops the timer, same as calling [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct TimerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Stop the timer. No tick starts after this returns.
    pub fn cancel(self) {
        // Drop does the work.
    }

    /// True once the timer task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
        self.task.abort();
    }
}

/// Call `on_tick` every `period`, starting one period from now.
///
/// Must be called from within a tokio runtime. Ticks that fall behind are
/// delayed rather than bunched up.
pub fn spawn_periodic<F>(period: Duration, mut on_tick: F) -> TimerHandle
where
    F: FnMut() + Send + 'static,
{
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
                _ = timer.tick() => on_tick(),
            }
        }
    });

    TimerHandle { stop_tx, task }
}

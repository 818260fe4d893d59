//! Process uptime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{spawn_periodic, Clock, TimerHandle};

/// Whole seconds since the clock's origin, refreshed on a fixed cadence.
///
/// The stored value only ever moves forward.
#[derive(Debug)]
pub struct UptimeTracker {
    inner: Arc<Inner>,
    _timer: Option<TimerHandle>,
}

#[derive(Debug)]
struct Inner {
    clock: Arc<dyn Clock>,
    seconds: AtomicU64,
}

impl Inner {
    fn refresh(&self) -> u64 {
        let now = self.clock.elapsed().as_secs();
        let prev = self.seconds.fetch_max(now, Ordering::Relaxed);
        prev.max(now)
    }
}

impl UptimeTracker {
    /// Create a tracker that refreshes itself every `interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(clock: Arc<dyn Clock>, interval: Duration) -> Self {
        let inner = Arc::new(Inner {
            clock,
            seconds: AtomicU64::new(0),
        });
        inner.refresh();

        let weak = Arc::downgrade(&inner);
        let timer = spawn_periodic(interval, move || {
            if let Some(inner) = weak.upgrade() {
                inner.refresh();
            }
        });

        Self {
            inner,
            _timer: Some(timer),
        }
    }

    /// Create a tracker with no timer; values move only on [`refresh`](Self::refresh).
    pub fn manual(clock: Arc<dyn Clock>) -> Self {
        let inner = Arc::new(Inner {
            clock,
            seconds: AtomicU64::new(0),
        });
        inner.refresh();
        Self { inner, _timer: None }
    }

    /// Seconds as of the last refresh.
    pub fn seconds(&self) -> u64 {
        self.inner.seconds.load(Ordering::Relaxed)
    }

    /// Recompute from the clock now and return the new value.
    pub fn refresh(&self) -> u64 {
        self.inner.refresh()
    }

    /// Uptime as of the last refresh, as `HH:MM:SS`.
    pub fn formatted(&self) -> String {
        format_uptime(self.seconds())
    }
}

/// Format whole seconds as `HH:MM:SS`.
///
/// Hours are zero-padded to two digits and keep counting past 24.
///
/// ```
/// use floorwatch::uptime::format_uptime;
///
/// assert_eq!(format_uptime(3725), "01:02:05");
/// assert_eq!(format_uptime(100 * 3600), "100:00:00");
/// ```
pub fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, SystemClock};
    use chrono::Utc;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "00:00:00");
        assert_eq!(format_uptime(59), "00:00:59");
        assert_eq!(format_uptime(60), "00:01:00");
        assert_eq!(format_uptime(3599), "00:59:59");
        assert_eq!(format_uptime(86_399), "23:59:59");
        assert_eq!(format_uptime(86_400), "24:00:00");
    }

    #[test]
    fn test_manual_refresh_tracks_clock() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let uptime = UptimeTracker::manual(clock.clone());
        assert_eq!(uptime.seconds(), 0);

        clock.advance(Duration::from_millis(61_500));
        assert_eq!(uptime.seconds(), 0);
        assert_eq!(uptime.refresh(), 61);
        assert_eq!(uptime.formatted(), "00:01:01");
    }

    #[test]
    fn test_never_decreases() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let uptime = UptimeTracker::manual(clock.clone());
        clock.advance(Duration::from_secs(10));
        uptime.refresh();

        // Wall time going backwards does not affect elapsed time
        clock.set_now(Utc::now() - chrono::Duration::hours(1));
        assert_eq!(uptime.refresh(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_tracker_refreshes_on_cadence() {
        let uptime = UptimeTracker::spawn(Arc::new(SystemClock::new()), Duration::from_secs(1));
        assert_eq!(uptime.seconds(), 0);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(uptime.seconds(), 3);
        assert_eq!(uptime.formatted(), "00:00:03");
    }
}

//! Autoplay timer and cancellation signal

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Repeating timer polled by the host's event loop.
///
/// The timer never runs code itself: [`CancellableTimer::poll`] reports
/// whether the deadline passed and schedules the next one relative to the
/// poll time, so one poll fires at most once however late it comes.
#[derive(Debug, Clone, Default)]
pub struct CancellableTimer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl CancellableTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, interval: Duration, now: Instant) {
        self.interval = interval;
        self.deadline = Some(now + interval);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_active(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the next firing
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Whether the timer fired; a fired timer is rescheduled from `now`
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }
}

/// Shared flag that stops multi-step operations between iterations
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_per_poll() {
        let start = Instant::now();
        let mut timer = CancellableTimer::new();
        timer.start(Duration::from_millis(100), start);

        assert!(!timer.poll(start + Duration::from_millis(50)));
        // Long overdue: still a single firing
        let late = start + Duration::from_millis(1000);
        assert!(timer.poll(late));
        assert!(!timer.poll(late));
        assert_eq!(timer.deadline(), Some(late + Duration::from_millis(100)));
    }

    #[test]
    fn test_cancel() {
        let now = Instant::now();
        let mut timer = CancellableTimer::new();
        timer.start(Duration::from_millis(10), now);
        assert!(timer.is_active());
        timer.cancel();
        assert!(!timer.is_active());
        assert!(!timer.poll(now + Duration::from_secs(1)));
    }

    #[test]
    fn test_abort_is_shared_between_clones() {
        let signal = AbortSignal::new();
        let handle = signal.clone();
        let thread = std::thread::spawn(move || handle.raise());
        thread.join().unwrap();
        assert!(signal.is_raised());
    }
}

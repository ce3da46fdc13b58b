//! Explicit frame loop: one per-frame callback driven by an injectable
//! time source.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Monotonic time source.
pub trait FrameClock {
    fn now(&self) -> Duration;
}

/// Clock advanced by hand; clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, delta: Duration) {
        *self.now.lock() += delta;
    }

    pub fn set(&self, now: Duration) {
        *self.now.lock() = now;
    }
}

impl FrameClock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

/// Wall clock measured from construction.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl FrameClock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

pub type FrameCallback<'a> = Box<dyn FnMut(Duration) + 'a>;

/// Owns the frame callback and the time of the previous frame.
///
/// `tick` is what a host loop (`requestAnimationFrame`, a native event loop
/// or a test) calls once per frame; the callback receives the time elapsed
/// since the previous tick, or since `start` for the first one.
pub struct FrameScheduler<'a, C: FrameClock> {
    clock: C,
    callback: Option<FrameCallback<'a>>,
    last: Duration,
    frames: u64,
}

impl<'a, C: FrameClock> FrameScheduler<'a, C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            callback: None,
            last: Duration::ZERO,
            frames: 0,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Registers the per-frame callback, replacing any previous one.
    pub fn start(&mut self, callback: impl FnMut(Duration) + 'a) {
        self.last = self.clock.now();
        self.callback = Some(Box::new(callback));
    }

    /// Drops the callback; later ticks do nothing.
    pub fn stop(&mut self) {
        self.callback = None;
    }

    pub fn is_running(&self) -> bool {
        self.callback.is_some()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs one frame. Returns the delta handed to the callback, or `None`
    /// when the scheduler is stopped.
    pub fn tick(&mut self) -> Option<Duration> {
        let callback = self.callback.as_mut()?;
        let now = self.clock.now();
        let delta = now.saturating_sub(self.last);
        self.last = now;
        self.frames += 1;
        callback(delta);
        Some(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn ticks_report_time_since_previous_frame() {
        let clock = ManualClock::new();
        clock.set(Duration::from_millis(500));
        let seen = RefCell::new(Vec::new());
        let mut scheduler = FrameScheduler::new(clock.clone());
        scheduler.start(|delta| seen.borrow_mut().push(delta));

        clock.advance(Duration::from_millis(16));
        scheduler.tick();
        clock.advance(Duration::from_millis(20));
        scheduler.tick();

        assert_eq!(
            *seen.borrow(),
            vec![Duration::from_millis(16), Duration::from_millis(20)]
        );
        assert_eq!(scheduler.frames(), 2);
    }

    #[test]
    fn stopped_scheduler_does_not_run() {
        let clock = ManualClock::new();
        let count = RefCell::new(0);
        let mut scheduler = FrameScheduler::new(clock.clone());
        assert_eq!(scheduler.tick(), None);

        scheduler.start(|_| *count.borrow_mut() += 1);
        scheduler.tick();
        scheduler.stop();
        clock.advance(Duration::from_secs(1));
        assert_eq!(scheduler.tick(), None);
        assert_eq!(*count.borrow(), 1);
        assert!(!scheduler.is_running());
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::easing::Easing;

/// Default duration of a control motion.
pub const DEFAULT_MOTION_DURATION: Duration = Duration::from_millis(300);

/// Closed interval a value is clamped into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    pub const UNBOUNDED: Self = Self {
        min: f32::NEG_INFINITY,
        max: f32::INFINITY,
    };

    /// Creates a range, swapping the bounds when they are given in reverse.
    pub fn new(min: f32, max: f32) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn is_bounded(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionOptions {
    pub duration: Duration,
    /// Wraps progress back to zero instead of stopping at the end.
    pub looping: bool,
    pub range: Range,
    pub easing: Easing,
}

impl Default for MotionOptions {
    fn default() -> Self {
        Self {
            duration: DEFAULT_MOTION_DURATION,
            looping: false,
            range: Range::UNBOUNDED,
            easing: Easing::CubicOut,
        }
    }
}

/// A single scalar interpolated from `start` to `end` over time.
///
/// Controls feed gesture deltas into [`Motion::set_end_delta`] and pull the
/// per-frame change out of [`Motion::update`]. Re-targeting rebases the motion
/// at its current value, so a gesture that interrupts an unfinished one
/// continues from wherever the value sits instead of snapping.
#[derive(Debug, Clone)]
pub struct Motion {
    options: MotionOptions,
    start: f32,
    end: f32,
    val: f32,
    progress: f32,
    active: bool,
}

impl Motion {
    pub fn new(options: MotionOptions) -> Self {
        let initial = options.range.clamp(0.0);
        Self {
            options,
            start: initial,
            end: initial,
            val: initial,
            progress: 0.0,
            active: false,
        }
    }

    pub fn val(&self) -> f32 {
        self.val
    }

    pub fn start(&self) -> f32 {
        self.start
    }

    pub fn end(&self) -> f32 {
        self.end
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn range(&self) -> Range {
        self.options.range
    }

    pub fn options(&self) -> &MotionOptions {
        &self.options
    }

    /// Whether the motion still has distance to cover.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Changes the clamping range and pulls every stored value into it.
    pub fn set_range(&mut self, range: Range) {
        self.options.range = range;
        self.start = range.clamp(self.start);
        self.end = range.clamp(self.end);
        self.val = range.clamp(self.val);
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.options.duration = duration;
    }

    /// Jumps to `value` (clamped) and drops any in-flight target.
    pub fn reset(&mut self, value: f32) {
        let value = self.options.range.clamp(value);
        self.start = value;
        self.end = value;
        self.val = value;
        self.progress = 0.0;
        self.active = false;
    }

    /// Re-targets the motion to `val + delta`, restarting progress from zero.
    pub fn set_end_delta(&mut self, delta: f32) {
        self.start = self.val;
        self.end = self.options.range.clamp(self.start + delta);
        self.progress = 0.0;
        self.active = true;
    }

    /// Pushes the current target further by `delta`, keeping any distance
    /// not yet covered. Several input events landing in one frame add up.
    pub fn extend_end(&mut self, delta: f32) {
        let pending = if self.active { self.end - self.val } else { 0.0 };
        self.set_end_delta(pending + delta);
    }

    /// Advances the motion and returns how far `val` moved during this call.
    pub fn update(&mut self, delta: Duration) -> f32 {
        let duration = self.options.duration.as_secs_f64();
        let next = if duration <= 0.0 {
            1.0
        } else {
            self.progress + (delta.as_secs_f64() / duration) as f32
        };

        if !self.active {
            // Already at `end`: time still passes, the value does not move.
            self.progress = next.min(1.0);
            return 0.0;
        }

        let prev = self.val;

        if self.options.looping {
            self.progress = if duration <= 0.0 { 0.0 } else { next.rem_euclid(1.0) };
            let eased = self.options.easing.apply(self.progress);
            self.val = self
                .options
                .range
                .clamp(self.start + (self.end - self.start) * eased);
        } else if next >= 1.0 {
            self.progress = 1.0;
            self.val = self.end;
            self.active = false;
        } else {
            self.progress = next;
            let eased = self.options.easing.apply(next);
            self.val = self
                .options
                .range
                .clamp(self.start + (self.end - self.start) * eased);
        }

        self.val - prev
    }
}

impl Default for Motion {
    fn default() -> Self {
        Self::new(MotionOptions::default())
    }
}

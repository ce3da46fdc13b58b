use std::time::Duration;

use glam::Vec3;

use super::TouchGesture;
use crate::motion::{Motion, MotionOptions, Range};
use crate::scene::Transform;

const SCALE_SMOOTHING: Duration = Duration::from_millis(100);

/// Two-finger pinch scaling of the placed model.
pub struct ArScaleControl {
    scale: Motion,
    enabled: bool,
}

impl ArScaleControl {
    pub fn new(range: Range) -> Self {
        let mut scale = Motion::new(MotionOptions {
            duration: SCALE_SMOOTHING,
            range,
            ..MotionOptions::default()
        });
        scale.reset(1.0);
        Self {
            scale,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn destroy(&mut self) {
        self.disable();
        self.scale.reset(self.scale.val());
    }

    pub fn scale(&self) -> f32 {
        self.scale.val()
    }

    pub fn range(&self) -> Range {
        self.scale.range()
    }

    /// Jumps to `scale` without smoothing.
    pub fn reset(&mut self, scale: f32) {
        self.scale.reset(scale);
    }

    pub fn update(&mut self, gesture: &TouchGesture, delta: Duration, transform: &mut Transform) {
        if !self.enabled {
            return;
        }
        if let Some(ratio) = gesture.pinch {
            let end = self.scale.end();
            self.scale.extend_end(end * (ratio - 1.0));
        }
        if self.scale.update(delta) != 0.0 {
            transform.scale = Vec3::splat(self.scale.val());
        }
    }
}

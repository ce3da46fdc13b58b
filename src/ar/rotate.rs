use std::time::Duration;

use glam::{Quat, Vec3};

use super::TouchGesture;
use crate::motion::{Motion, MotionOptions};
use crate::scene::Transform;

const TWIST_SMOOTHING: Duration = Duration::from_millis(100);

/// Two-finger twist rotation of the placed model about a surface axis.
pub struct ArRotateControl {
    angle: Motion,
    axis: Vec3,
    base: Quat,
    enabled: bool,
}

impl ArRotateControl {
    pub fn new() -> Self {
        Self {
            angle: Motion::new(MotionOptions {
                duration: TWIST_SMOOTHING,
                ..MotionOptions::default()
            }),
            axis: Vec3::Y,
            base: Quat::IDENTITY,
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
        self.angle.reset(0.0);
    }

    /// Degrees turned about the axis since the orientation was anchored.
    pub fn angle(&self) -> f32 {
        self.angle.val()
    }

    pub fn axis(&self) -> Vec3 {
        self.axis
    }

    /// Rotates about `axis` starting from `base`.
    pub fn anchor(&mut self, axis: Vec3, base: Quat) {
        self.axis = axis.try_normalize().unwrap_or(Vec3::Y);
        self.base = base;
        self.angle.reset(0.0);
    }

    pub fn update(&mut self, gesture: &TouchGesture, delta: Duration, transform: &mut Transform) {
        if !self.enabled {
            return;
        }
        // Screen y points down, so a clockwise twist is a positive screen angle.
        if let Some(twist) = gesture.twist {
            self.angle.extend_end(-twist);
        }
        if self.angle.update(delta) != 0.0 {
            transform.rotation =
                Quat::from_axis_angle(self.axis, self.angle.val().to_radians()) * self.base;
        }
    }
}

impl Default for ArRotateControl {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn twist(degrees: f32) -> TouchGesture {
        TouchGesture {
            fingers: 2,
            twist: Some(degrees),
            ..TouchGesture::default()
        }
    }

    #[test]
    fn twist_turns_about_the_anchor_axis() {
        let mut control = ArRotateControl::new();
        control.anchor(Vec3::Y, Quat::IDENTITY);
        control.enable();
        let mut transform = Transform::IDENTITY;
        control.update(&twist(-90.0), Duration::from_millis(200), &mut transform);

        assert!((control.angle() - 90.0).abs() < 1e-4);
        let front = transform.rotation * Vec3::Z;
        assert!((front - Vec3::X).length() < 1e-4);
    }

    #[test]
    fn anchor_keeps_the_base_orientation() {
        let base = Quat::from_rotation_x(0.5);
        let mut control = ArRotateControl::new();
        control.anchor(Vec3::Z, base);
        control.enable();
        let mut transform = Transform::IDENTITY;
        control.update(&twist(0.0), Duration::from_millis(10), &mut transform);
        assert_eq!(transform.rotation, Quat::IDENTITY);

        control.update(&twist(-30.0), Duration::from_secs(1), &mut transform);
        let expected = Quat::from_rotation_z(30f32.to_radians()) * base;
        assert!(transform.rotation.abs_diff_eq(expected, 1e-5));
    }
}

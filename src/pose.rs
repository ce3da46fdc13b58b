use std::ops::{Add, AddAssign};

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Orbital camera placement: yaw and pitch in degrees around `pivot`, at
/// `distance` from it.
///
/// `Pose` is a plain value. Snapshots taken with `clone()` (or a copy) never
/// alias the camera's live pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    #[serde(default)]
    pub pivot: Vec3,
}

impl Pose {
    pub const fn new(yaw: f32, pitch: f32, distance: f32) -> Self {
        Self {
            yaw,
            pitch,
            distance,
            pivot: Vec3::ZERO,
        }
    }

    pub fn with_pivot(mut self, pivot: Vec3) -> Self {
        self.pivot = pivot;
        self
    }

    /// Unit vector from the pivot towards the camera.
    pub fn direction(&self) -> Vec3 {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();
        let (sin_yaw, cos_yaw) = yaw.sin_cos();
        let (sin_pitch, cos_pitch) = pitch.sin_cos();
        Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    /// World-space camera position.
    pub fn position(&self) -> Vec3 {
        self.pivot + self.direction() * self.distance
    }

    /// Interpolates towards `other`; yaw travels the shorter arc.
    pub fn lerp(&self, other: &Pose, t: f32) -> Pose {
        let yaw_span = shortest_arc(self.yaw, other.yaw);
        Pose {
            yaw: self.yaw + yaw_span * t,
            pitch: self.pitch + (other.pitch - self.pitch) * t,
            distance: self.distance + (other.distance - self.distance) * t,
            pivot: self.pivot.lerp(other.pivot, t),
        }
    }

    /// The delta that moves `self` onto `other` (yaw along the shorter arc).
    pub fn delta_to(&self, other: &Pose) -> PoseDelta {
        PoseDelta {
            yaw: shortest_arc(self.yaw, other.yaw),
            pitch: other.pitch - self.pitch,
            distance: other.distance - self.distance,
            pivot: other.pivot - self.pivot,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

/// Signed angle in `(-180, 180]` that rotates `from` onto `to`.
pub fn shortest_arc(from: f32, to: f32) -> f32 {
    let diff = (to - from).rem_euclid(360.0);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}

/// Relative change requested by a control for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseDelta {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub pivot: Vec3,
}

impl PoseDelta {
    pub const ZERO: Self = Self {
        yaw: 0.0,
        pitch: 0.0,
        distance: 0.0,
        pivot: Vec3::ZERO,
    };

    pub fn yaw(yaw: f32) -> Self {
        Self { yaw, ..Self::ZERO }
    }

    pub fn pitch(pitch: f32) -> Self {
        Self { pitch, ..Self::ZERO }
    }

    pub fn distance(distance: f32) -> Self {
        Self {
            distance,
            ..Self::ZERO
        }
    }

    pub fn pivot(pivot: Vec3) -> Self {
        Self {
            pivot,
            ..Self::ZERO
        }
    }

    pub fn is_zero(&self) -> bool {
        self.yaw == 0.0 && self.pitch == 0.0 && self.distance == 0.0 && self.pivot == Vec3::ZERO
    }
}

impl Add for PoseDelta {
    type Output = PoseDelta;

    fn add(self, other: PoseDelta) -> PoseDelta {
        PoseDelta {
            yaw: self.yaw + other.yaw,
            pitch: self.pitch + other.pitch,
            distance: self.distance + other.distance,
            pivot: self.pivot + other.pivot,
        }
    }
}

impl AddAssign for PoseDelta {
    fn add_assign(&mut self, other: PoseDelta) {
        *self = *self + other;
    }
}

use std::time::Duration;

use glam::{Mat4, Vec3};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::control::AnimationControl;
use crate::easing::Easing;
use crate::motion::Range;
use crate::pose::{Pose, PoseDelta};
use crate::scene::BoundingBox;

pub const DEFAULT_FOV: f32 = 45.0;
const NEAR_PLANE: f32 = 0.01;

/// Bounds the camera clamps every pose into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraLimits {
    pub pitch: Range,
    pub distance: Range,
}

impl CameraLimits {
    /// Keeps the camera just short of the poles so `look_at` never flips.
    pub const DEFAULT_PITCH: Range = Range {
        min: -89.9,
        max: 89.9,
    };

    pub fn clamp(&self, pose: Pose) -> Pose {
        Pose {
            yaw: pose.yaw.rem_euclid(360.0),
            pitch: self.pitch.clamp(pose.pitch),
            distance: self.distance.clamp(pose.distance).max(0.0),
            pivot: pose.pivot,
        }
    }
}

impl Default for CameraLimits {
    fn default() -> Self {
        Self {
            pitch: Self::DEFAULT_PITCH,
            distance: Range {
                min: 0.0,
                max: f32::INFINITY,
            },
        }
    }
}

/// Owner of the authoritative camera pose.
///
/// Controls never write the pose directly; the controller applies one
/// combined [`PoseDelta`] per frame through [`Camera::apply_delta`].
/// Out-of-range requests are clamped silently.
#[derive(Debug, Clone)]
pub struct Camera {
    pose: Pose,
    default_pose: Pose,
    limits: CameraLimits,
    fov: f32,
    revision: u64,
    view: Mat4,
}

impl Camera {
    pub fn new(pose: Pose) -> Self {
        Self::with_limits(pose, CameraLimits::default())
    }

    pub fn with_limits(pose: Pose, limits: CameraLimits) -> Self {
        let pose = limits.clamp(pose);
        Self {
            pose,
            default_pose: pose,
            limits,
            fov: DEFAULT_FOV,
            revision: 0,
            view: view_from_pose(&pose),
        }
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = self.limits.clamp(pose);
        self.pose_changed();
    }

    /// Accumulates `delta` onto the pose, then clamps. Returns whether the
    /// pose changed.
    pub fn apply_delta(&mut self, delta: &PoseDelta) -> bool {
        if delta.is_zero() {
            return false;
        }
        let next = self.limits.clamp(Pose {
            yaw: self.pose.yaw + delta.yaw,
            pitch: self.pose.pitch + delta.pitch,
            distance: self.pose.distance + delta.distance,
            pivot: self.pose.pivot + delta.pivot,
        });
        if next == self.pose {
            return false;
        }
        self.pose = next;
        self.pose_changed();
        true
    }

    fn pose_changed(&mut self) {
        self.view = view_from_pose(&self.pose);
        self.revision = self.revision.wrapping_add(1);
    }

    /// Incremented on every pose change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn default_pose(&self) -> &Pose {
        &self.default_pose
    }

    pub fn set_default_pose(&mut self, pose: Pose) {
        self.default_pose = self.limits.clamp(pose);
    }

    pub fn limits(&self) -> &CameraLimits {
        &self.limits
    }

    pub fn set_limits(&mut self, limits: CameraLimits) {
        self.limits = limits;
        self.default_pose = limits.clamp(self.default_pose);
        let clamped = limits.clamp(self.pose);
        if clamped != self.pose {
            self.set_pose(clamped);
        }
    }

    /// Vertical field of view in degrees.
    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov.clamp(1.0, 179.0);
    }

    /// Returns to the default pose. A zero duration snaps immediately;
    /// otherwise the transition is returned for the controller to run.
    pub fn reset(&mut self, duration: Duration, easing: Easing) -> Option<AnimationControl> {
        if duration.is_zero() {
            self.set_pose(self.default_pose);
            return None;
        }
        debug!("camera reset over {duration:?}");
        Some(AnimationControl::new(self.pose, self.default_pose, duration).with_easing(easing))
    }

    /// Frames `bounds`: pivot on its center, far enough back that the
    /// bounding sphere fills the vertical field of view. The result becomes
    /// the default pose and the current pose.
    pub fn fit_model(&mut self, bounds: &BoundingBox) -> Pose {
        let (center, radius) = if bounds.is_degenerate() {
            (
                if bounds.min.is_finite() && bounds.max.is_finite() {
                    bounds.center()
                } else {
                    Vec3::ZERO
                },
                1.0,
            )
        } else {
            (bounds.center(), bounds.radius())
        };
        let half_fov = (self.fov * 0.5).to_radians();
        let distance = radius / half_fov.sin();
        let pose = Pose {
            distance,
            pivot: center,
            ..self.default_pose
        };
        self.set_default_pose(pose);
        self.set_pose(pose);
        self.pose
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position()
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let far = (self.pose.distance * 4.0).max(100.0);
        Mat4::perspective_rh_gl(self.fov.to_radians(), aspect.max(0.01), NEAR_PLANE, far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view
    }

    /// Camera right and up vectors in world space.
    pub fn basis(&self) -> (Vec3, Vec3) {
        let forward = -self.pose.direction();
        let right = forward.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
        let up = right.cross(forward).normalize_or_zero();
        (right, up)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Pose::default())
    }
}

fn view_from_pose(pose: &Pose) -> Mat4 {
    Mat4::look_at_rh(pose.position(), pose.pivot, Vec3::Y)
}

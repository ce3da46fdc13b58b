//! Surface-relative model placement for AR sessions.
//!
//! These controls drive the model root transform from hit-test results and
//! touch gestures. They never touch the camera pose.

use std::time::Duration;

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::input::PointerId;
use crate::motion::Range;
use crate::scene::SceneGraph;

mod floor;
mod hit_test;
mod hover;
mod placement;
mod rotate;
mod scale;
mod touch;
mod translate;
mod wall;

pub use floor::ArFloorControl;
pub use hit_test::{HitTest, HitTestSource, SourceRequest};
pub use hover::ArHoverControl;
pub use rotate::ArRotateControl;
pub use scale::ArScaleControl;
pub use touch::{TouchGesture, TouchTracker};
pub use translate::ArTranslateControl;
pub use wall::ArWallControl;

/// Largest angle between a hit normal and the ideal surface normal.
const SURFACE_TOLERANCE_DEG: f32 = 30.0;

/// Tracked device pose for one XR frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XrPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl XrPose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Direction the device looks along (-Z in device space).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }
}

impl Default for XrPose {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

/// A real-world surface point reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitTestResult {
    pub position: Vec3,
    pub normal: Vec3,
}

impl HitTestResult {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position,
            normal: normal.normalize_or_zero(),
        }
    }

    pub fn floor(position: Vec3) -> Self {
        Self::new(position, Vec3::Y)
    }
}

/// A transient screen touch, in normalized device coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XrInput {
    pub id: PointerId,
    pub position: Vec2,
    /// Surface hit along this touch's ray, if the platform found one.
    pub hit: Option<HitTestResult>,
}

/// Everything the session learns about one XR frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XrFrame {
    pub delta: Duration,
    pub viewer: XrPose,
    /// Results of the viewer hit-test source, nearest first.
    pub hits: Vec<HitTestResult>,
    pub inputs: Vec<XrInput>,
    /// The user confirmed (tapped) during this frame.
    pub select: bool,
}

/// Which detected surfaces a hit may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Floor,
    Wall,
    Any,
}

impl Surface {
    pub fn accepts(self, normal: Vec3) -> bool {
        let Some(normal) = normal.try_normalize() else {
            return false;
        };
        let tolerance = SURFACE_TOLERANCE_DEG.to_radians();
        match self {
            Surface::Floor => normal.dot(Vec3::Y) >= tolerance.cos(),
            Surface::Wall => normal.dot(Vec3::Y).abs() <= tolerance.sin(),
            Surface::Any => true,
        }
    }

    /// First hit that lies on this kind of surface.
    pub fn first_hit<'a>(self, hits: &'a [HitTestResult]) -> Option<&'a HitTestResult> {
        hits.iter().find(|hit| self.accepts(hit.normal))
    }
}

/// Placement mode requested for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArPlacement {
    #[default]
    Floor,
    Wall,
    Hover,
}

impl ArPlacement {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "floor" => Some(ArPlacement::Floor),
            "wall" => Some(ArPlacement::Wall),
            "hover" => Some(ArPlacement::Hover),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementState {
    /// No valid hit yet.
    Searching,
    /// A hit was found and the indicator is shown.
    Candidate,
    /// The user confirmed; gestures are live.
    Placed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArEvent {
    CanPlace,
    ModelPlaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArOptions {
    pub placement: ArPlacement,
    pub scale_range: Range,
    /// Hover offset from the device, in device space.
    pub hover_offset: Vec3,
    /// How far in front of the device the model floats while searching.
    pub search_distance: f32,
    pub bob_amplitude: f32,
    pub bob_period: Duration,
}

impl Default for ArOptions {
    fn default() -> Self {
        Self {
            placement: ArPlacement::Floor,
            scale_range: Range::new(0.05, 5.0),
            hover_offset: Vec3::new(0.0, -0.2, -1.5),
            search_distance: 1.5,
            bob_amplitude: 0.05,
            bob_period: Duration::from_secs(2),
        }
    }
}

/// The placement control active for one AR session.
pub enum ArControl {
    Floor(ArFloorControl),
    Wall(ArWallControl),
    Hover(ArHoverControl),
}

impl ArControl {
    pub fn new(options: &ArOptions) -> Self {
        match options.placement {
            ArPlacement::Floor => ArControl::Floor(ArFloorControl::new(options)),
            ArPlacement::Wall => ArControl::Wall(ArWallControl::new(options)),
            ArPlacement::Hover => ArControl::Hover(ArHoverControl::new(options)),
        }
    }

    pub fn placement(&self) -> ArPlacement {
        match self {
            ArControl::Floor(_) => ArPlacement::Floor,
            ArControl::Wall(_) => ArPlacement::Wall,
            ArControl::Hover(_) => ArPlacement::Hover,
        }
    }

    /// Surfaces the viewer hit-test results are filtered by.
    pub fn surface(&self) -> Surface {
        match self {
            ArControl::Floor(_) | ArControl::Hover(_) => Surface::Floor,
            ArControl::Wall(_) => Surface::Wall,
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            ArControl::Floor(control) => control.is_enabled(),
            ArControl::Wall(control) => control.is_enabled(),
            ArControl::Hover(control) => control.is_enabled(),
        }
    }

    pub fn enable(&mut self) {
        match self {
            ArControl::Floor(control) => control.enable(),
            ArControl::Wall(control) => control.enable(),
            ArControl::Hover(control) => control.enable(),
        }
    }

    pub fn disable(&mut self) {
        match self {
            ArControl::Floor(control) => control.disable(),
            ArControl::Wall(control) => control.disable(),
            ArControl::Hover(control) => control.disable(),
        }
    }

    pub fn destroy(&mut self) {
        match self {
            ArControl::Floor(control) => control.destroy(),
            ArControl::Wall(control) => control.destroy(),
            ArControl::Hover(control) => control.destroy(),
        }
    }

    pub fn state(&self) -> PlacementState {
        match self {
            ArControl::Floor(control) => control.state(),
            ArControl::Wall(control) => control.state(),
            ArControl::Hover(control) => control.state(),
        }
    }

    /// Where the placement indicator is drawn, while a candidate is shown.
    pub fn indicator(&self) -> Option<HitTestResult> {
        match self {
            ArControl::Floor(control) => control.indicator(),
            ArControl::Wall(control) => control.indicator(),
            ArControl::Hover(control) => control.indicator(),
        }
    }

    /// Advances placement for one frame. `hit` is the first viewer hit on
    /// [`ArControl::surface`], if the hit-test source is ready.
    pub fn update(
        &mut self,
        frame: &XrFrame,
        hit: Option<&HitTestResult>,
        scene: &SceneGraph,
    ) -> Vec<ArEvent> {
        match self {
            ArControl::Floor(control) => control.update(frame, hit, scene),
            ArControl::Wall(control) => control.update(frame, hit, scene),
            ArControl::Hover(control) => control.update(frame, hit, scene),
        }
    }

    /// Confirms placement at the current candidate.
    pub fn place(&mut self, scene: &SceneGraph) -> Option<ArEvent> {
        match self {
            ArControl::Floor(control) => control.place(scene),
            ArControl::Wall(control) => control.place(scene),
            ArControl::Hover(control) => control.place(scene),
        }
    }
}

/// Rotation about +Y that turns the model's front (+Z) towards `target`.
pub(crate) fn face_towards(from: Vec3, target: Vec3) -> Quat {
    let to = target - from;
    if to.x.abs() < f32::EPSILON && to.z.abs() < f32::EPSILON {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_y(to.x.atan2(to.z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_predicates_use_a_thirty_degree_cone() {
        let tilted = |deg: f32| {
            let rad = deg.to_radians();
            Vec3::new(rad.sin(), rad.cos(), 0.0)
        };
        assert!(Surface::Floor.accepts(Vec3::Y));
        assert!(Surface::Floor.accepts(tilted(29.0)));
        assert!(!Surface::Floor.accepts(tilted(31.0)));

        assert!(Surface::Wall.accepts(Vec3::X));
        assert!(Surface::Wall.accepts(tilted(61.0)));
        assert!(!Surface::Wall.accepts(tilted(59.0)));
        assert!(!Surface::Floor.accepts(Vec3::ZERO));
    }

    #[test]
    fn first_hit_skips_other_surfaces() {
        let hits = [
            HitTestResult::new(Vec3::new(0.0, 1.0, -2.0), Vec3::Z),
            HitTestResult::floor(Vec3::new(0.0, 0.0, -1.0)),
        ];
        assert_eq!(Surface::Floor.first_hit(&hits), Some(&hits[1]));
        assert_eq!(Surface::Wall.first_hit(&hits), Some(&hits[0]));
    }

    #[test]
    fn face_towards_turns_front_to_target() {
        let rotation = face_towards(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        assert!((rotation * Vec3::Z - Vec3::X).length() < 1e-5);
    }
}

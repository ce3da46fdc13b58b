use std::f32::consts::TAU;

use glam::Vec3;

use super::placement::SurfacePlacement;
use super::{face_towards, ArEvent, ArOptions, HitTestResult, PlacementState, Surface, XrFrame};
use crate::easing::Easing;
use crate::motion::{Motion, MotionOptions};
use crate::scene::{SceneGraph, Transform};

/// Places the model on a detected floor.
///
/// Until a floor is found the model floats in front of the device with a
/// slow bob. Each floor hit moves it onto the hit point, facing the viewer,
/// until the user taps to confirm. After that one finger drags it across
/// the floor, and two fingers scale it and turn it about the vertical.
pub struct ArFloorControl {
    placement: SurfacePlacement,
    bob: Motion,
    bob_amplitude: f32,
    search_distance: f32,
}

impl ArFloorControl {
    pub fn new(options: &ArOptions) -> Self {
        let mut bob = Motion::new(MotionOptions {
            duration: options.bob_period,
            looping: true,
            easing: Easing::Linear,
            ..MotionOptions::default()
        });
        bob.reset(0.0);
        bob.set_end_delta(1.0);
        Self {
            placement: SurfacePlacement::new(Surface::Floor, options),
            bob,
            bob_amplitude: options.bob_amplitude,
            search_distance: options.search_distance,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.placement.is_enabled()
    }

    pub fn enable(&mut self) {
        self.placement.enable();
    }

    pub fn disable(&mut self) {
        self.placement.disable();
    }

    pub fn destroy(&mut self) {
        self.placement.destroy();
    }

    pub fn state(&self) -> PlacementState {
        self.placement.state()
    }

    pub fn indicator(&self) -> Option<HitTestResult> {
        self.placement.indicator()
    }

    pub fn scale(&self) -> f32 {
        self.placement.scale.scale()
    }

    pub fn update(
        &mut self,
        frame: &XrFrame,
        hit: Option<&HitTestResult>,
        scene: &SceneGraph,
    ) -> Vec<ArEvent> {
        if !self.is_enabled() {
            return Vec::new();
        }
        scene.update_root(|root| self.step(frame, hit, root))
    }

    /// Confirms the current candidate.
    pub fn place(&mut self, scene: &SceneGraph) -> Option<ArEvent> {
        if !self.is_enabled() {
            return None;
        }
        scene.update_root(|root| {
            self.placement
                .place(root, Vec3::Y)
                .then_some(ArEvent::ModelPlaced)
        })
    }

    /// Skips straight to a placed model at `hit`.
    pub(crate) fn place_at(&mut self, hit: &HitTestResult, viewer: Vec3, root: &mut Transform) -> bool {
        self.placement.follow(hit, face_towards(hit.position, viewer), root);
        self.placement.place(root, Vec3::Y)
    }

    fn step(&mut self, frame: &XrFrame, hit: Option<&HitTestResult>, root: &mut Transform) -> Vec<ArEvent> {
        let mut events = Vec::new();
        match self.placement.state() {
            PlacementState::Searching | PlacementState::Candidate => {
                if let Some(hit) = hit {
                    let facing = face_towards(hit.position, frame.viewer.position);
                    self.placement.follow(hit, facing, root);
                } else if self.placement.state() == PlacementState::Searching {
                    self.float(frame, root);
                }
                if frame.select && self.placement.place(root, Vec3::Y) {
                    events.push(ArEvent::ModelPlaced);
                }
            }
            PlacementState::Placed => self.placement.gestures(frame, frame.delta, root),
        }
        events
    }

    fn float(&mut self, frame: &XrFrame, root: &mut Transform) {
        self.bob.update(frame.delta);
        let ahead = frame.viewer.position + frame.viewer.forward() * self.search_distance;
        let lift = self.bob_amplitude * (TAU * self.bob.val()).sin();
        root.position = ahead + Vec3::Y * lift;
        root.rotation = face_towards(root.position, frame.viewer.position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ar::{XrInput, XrPose};
    use glam::{Quat, Vec2};
    use std::time::Duration;

    fn frame() -> XrFrame {
        XrFrame {
            delta: Duration::from_millis(16),
            viewer: XrPose::new(Vec3::new(0.0, 1.5, 0.0), Quat::IDENTITY),
            ..XrFrame::default()
        }
    }

    fn enabled() -> (ArFloorControl, SceneGraph) {
        let mut control = ArFloorControl::new(&ArOptions::default());
        control.enable();
        (control, SceneGraph::new())
    }

    #[test]
    fn model_sits_on_the_hit_point() {
        let (mut control, scene) = enabled();
        let hit = HitTestResult::floor(Vec3::new(0.3, 0.0, -1.2));
        control.update(&frame(), Some(&hit), &scene);

        assert_eq!(scene.root().position, hit.position);
        assert_eq!(control.state(), PlacementState::Candidate);
        assert_eq!(control.indicator(), Some(hit));
    }

    #[test]
    fn searching_model_floats_ahead_of_the_viewer() {
        let (mut control, scene) = enabled();
        let mut heights = Vec::new();
        for _ in 0..40 {
            control.update(&frame(), None, &scene);
            let root = scene.root();
            assert!((root.position.z + 1.5).abs() < 1e-5);
            heights.push(root.position.y);
        }
        let low = heights.iter().cloned().fold(f32::MAX, f32::min);
        let high = heights.iter().cloned().fold(f32::MIN, f32::max);
        assert!(high > 1.5 && low < high);
        assert!(high <= 1.5 + 0.05 + 1e-5);
        assert_eq!(control.state(), PlacementState::Searching);
    }

    #[test]
    fn select_places_and_enables_gestures() {
        let (mut control, scene) = enabled();
        let hit = HitTestResult::floor(Vec3::new(0.0, 0.0, -1.0));
        assert!(control.update(&frame(), Some(&hit), &scene).is_empty());

        let tap = XrFrame {
            select: true,
            ..frame()
        };
        let events = control.update(&tap, Some(&hit), &scene);
        assert_eq!(events, vec![ArEvent::ModelPlaced]);
        assert_eq!(control.state(), PlacementState::Placed);
        assert_eq!(control.indicator(), None);

        // Later hits no longer move the placed model.
        let elsewhere = HitTestResult::floor(Vec3::new(2.0, 0.0, -3.0));
        control.update(&frame(), Some(&elsewhere), &scene);
        assert_eq!(scene.root().position, hit.position);

        let touch = |id, x| XrInput {
            id,
            position: Vec2::new(x, 0.0),
            hit: None,
        };
        let pinch = |span: f32| XrFrame {
            inputs: vec![touch(1, -span), touch(2, span)],
            delta: Duration::from_millis(200),
            ..frame()
        };
        control.update(&pinch(0.1), None, &scene);
        control.update(&pinch(0.2), None, &scene);
        control.update(&pinch(0.2), None, &scene);
        assert!((scene.root().uniform_scale() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn select_without_candidate_does_nothing() {
        let (mut control, scene) = enabled();
        let tap = XrFrame {
            select: true,
            ..frame()
        };
        assert!(control.update(&tap, None, &scene).is_empty());
        assert_eq!(control.place(&scene), None);
    }

    #[test]
    fn disabled_control_does_not_move_the_model() {
        let (mut control, scene) = enabled();
        control.disable();
        let hit = HitTestResult::floor(Vec3::new(0.3, 0.0, -1.2));
        control.update(&frame(), Some(&hit), &scene);
        assert_eq!(scene.root(), Transform::IDENTITY);
    }
}

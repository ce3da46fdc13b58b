use glam::Vec3;
use log::debug;

use super::{
    face_towards, ArEvent, ArFloorControl, ArOptions, HitTestResult, PlacementState, XrFrame,
};
use crate::scene::{SceneGraph, Transform};

/// Keeps the model at a fixed offset from the device until the user places
/// it; from then on it behaves like [`ArFloorControl`].
///
/// Emits [`ArEvent::CanPlace`] each time a floor comes into view.
pub struct ArHoverControl {
    floor: ArFloorControl,
    offset: Vec3,
    last_floor: Option<HitTestResult>,
    viewer: Vec3,
    placed: bool,
}

impl ArHoverControl {
    pub fn new(options: &ArOptions) -> Self {
        Self {
            floor: ArFloorControl::new(options),
            offset: options.hover_offset,
            last_floor: None,
            viewer: Vec3::ZERO,
            placed: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.floor.is_enabled()
    }

    pub fn enable(&mut self) {
        self.floor.enable();
    }

    pub fn disable(&mut self) {
        self.floor.disable();
    }

    pub fn destroy(&mut self) {
        self.floor.destroy();
        self.last_floor = None;
    }

    pub fn can_place(&self) -> bool {
        self.last_floor.is_some()
    }

    pub fn state(&self) -> PlacementState {
        if self.placed {
            PlacementState::Placed
        } else if self.last_floor.is_some() {
            PlacementState::Candidate
        } else {
            PlacementState::Searching
        }
    }

    /// Hover mode has no indicator; the model itself marks the spot.
    pub fn indicator(&self) -> Option<HitTestResult> {
        None
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
        if self.placed {
            return self.floor.update(frame, hit, scene);
        }

        let mut events = Vec::new();
        self.viewer = frame.viewer.position;
        scene.update_root(|root| {
            root.position = frame.viewer.position + frame.viewer.rotation * self.offset;
            root.rotation = face_towards(root.position, frame.viewer.position);
        });
        match (hit, self.last_floor) {
            (Some(_), None) => events.push(ArEvent::CanPlace),
            (None, Some(_)) => debug!("hover lost the floor"),
            _ => {}
        }
        self.last_floor = hit.copied();

        if frame.select {
            events.extend(self.place(scene));
        }
        events
    }

    /// Drops the model onto the last floor seen.
    pub fn place(&mut self, scene: &SceneGraph) -> Option<ArEvent> {
        if self.placed || !self.is_enabled() {
            return None;
        }
        let floor = self.last_floor?;
        let viewer = self.viewer;
        let placed = scene.update_root(|root: &mut Transform| self.floor.place_at(&floor, viewer, root));
        if !placed {
            return None;
        }
        self.placed = true;
        Some(ArEvent::ModelPlaced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ar::XrPose;
    use glam::Quat;

    fn frame(select: bool) -> XrFrame {
        XrFrame {
            viewer: XrPose::new(Vec3::new(0.0, 1.6, 0.0), Quat::IDENTITY),
            select,
            ..XrFrame::default()
        }
    }

    fn enabled() -> (ArHoverControl, SceneGraph) {
        let mut control = ArHoverControl::new(&ArOptions::default());
        control.enable();
        (control, SceneGraph::new())
    }

    #[test]
    fn model_follows_the_device_offset() {
        let (mut control, scene) = enabled();
        control.update(&frame(false), None, &scene);
        assert!((scene.root().position - Vec3::new(0.0, 1.4, -1.5)).length() < 1e-5);
        assert_eq!(control.state(), PlacementState::Searching);
    }

    #[test]
    fn can_place_fires_when_a_floor_appears() {
        let (mut control, scene) = enabled();
        let floor = HitTestResult::floor(Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(
            control.update(&frame(false), Some(&floor), &scene),
            vec![ArEvent::CanPlace]
        );
        assert!(control.update(&frame(false), Some(&floor), &scene).is_empty());
        control.update(&frame(false), None, &scene);
        assert_eq!(
            control.update(&frame(false), Some(&floor), &scene),
            vec![ArEvent::CanPlace]
        );
    }

    #[test]
    fn place_hands_over_to_floor_behaviour() {
        let (mut control, scene) = enabled();
        assert_eq!(control.place(&scene), None);

        let floor = HitTestResult::floor(Vec3::new(0.5, 0.0, -1.0));
        control.update(&frame(false), Some(&floor), &scene);
        assert_eq!(control.place(&scene), Some(ArEvent::ModelPlaced));
        assert_eq!(control.state(), PlacementState::Placed);
        assert_eq!(scene.root().position, floor.position);

        // The device moving no longer drags the model along.
        control.update(&frame(false), None, &scene);
        assert_eq!(scene.root().position, floor.position);
    }
}

use glam::{Quat, Vec3};

use super::placement::SurfacePlacement;
use super::{ArEvent, ArOptions, HitTestResult, PlacementState, Surface, XrFrame};
use crate::scene::{SceneGraph, Transform};

/// Mounts the model on a detected wall with its front (+Z) along the wall
/// normal. Once placed, dragging slides it within the wall plane and a
/// two-finger twist spins it about the normal.
pub struct ArWallControl {
    placement: SurfacePlacement,
    wall: Option<HitTestResult>,
}

impl ArWallControl {
    pub fn new(options: &ArOptions) -> Self {
        Self {
            placement: SurfacePlacement::new(Surface::Wall, options),
            wall: None,
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
        self.wall = None;
    }

    pub fn state(&self) -> PlacementState {
        self.placement.state()
    }

    pub fn indicator(&self) -> Option<HitTestResult> {
        self.placement.indicator()
    }

    /// The wall the model was placed on.
    pub fn wall(&self) -> Option<HitTestResult> {
        self.wall
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
        scene.update_root(|root| {
            let mut events = Vec::new();
            if self.placement.state() == PlacementState::Placed {
                self.placement.gestures(frame, frame.delta, root);
                return events;
            }
            if let Some(hit) = hit {
                self.placement.follow(hit, against_wall(hit.normal), root);
            }
            if frame.select && self.confirm(root) {
                events.push(ArEvent::ModelPlaced);
            }
            events
        })
    }

    pub fn place(&mut self, scene: &SceneGraph) -> Option<ArEvent> {
        if !self.is_enabled() {
            return None;
        }
        scene.update_root(|root| self.confirm(root).then_some(ArEvent::ModelPlaced))
    }

    fn confirm(&mut self, root: &Transform) -> bool {
        let Some(wall) = self.placement.indicator() else {
            return false;
        };
        if !self.placement.place(root, wall.normal) {
            return false;
        }
        self.placement.translate.set_plane(wall.position, wall.normal);
        self.wall = Some(wall);
        true
    }
}

/// Orientation that points the model's front out of the wall.
fn against_wall(normal: Vec3) -> Quat {
    Quat::from_rotation_arc(Vec3::Z, normal.normalize_or_zero())
}

use std::time::Duration;

use glam::{Quat, Vec3};
use log::debug;

use super::{
    ArOptions, ArRotateControl, ArScaleControl, ArTranslateControl, HitTestResult,
    PlacementState, Surface, TouchTracker, XrFrame,
};
use crate::scene::Transform;

/// State machine shared by the surface-anchored controls: it follows hits
/// while searching, shows a candidate and, once placed, hands touches to
/// the gesture sub-controls.
pub(crate) struct SurfacePlacement {
    surface: Surface,
    state: PlacementState,
    indicator: Option<HitTestResult>,
    touches: TouchTracker,
    pub(crate) scale: ArScaleControl,
    pub(crate) rotate: ArRotateControl,
    pub(crate) translate: ArTranslateControl,
    enabled: bool,
}

impl SurfacePlacement {
    pub(crate) fn new(surface: Surface, options: &ArOptions) -> Self {
        Self {
            surface,
            state: PlacementState::Searching,
            indicator: None,
            touches: TouchTracker::new(),
            scale: ArScaleControl::new(options.scale_range),
            rotate: ArRotateControl::new(),
            translate: ArTranslateControl::new(surface),
            enabled: false,
        }
    }

    pub(crate) fn state(&self) -> PlacementState {
        self.state
    }

    pub(crate) fn indicator(&self) -> Option<HitTestResult> {
        self.indicator
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn enable(&mut self) {
        self.enabled = true;
        if self.state == PlacementState::Placed {
            self.enable_gestures();
        }
    }

    pub(crate) fn disable(&mut self) {
        self.enabled = false;
        self.touches.clear();
        self.scale.disable();
        self.rotate.disable();
        self.translate.disable();
    }

    pub(crate) fn destroy(&mut self) {
        self.disable();
        self.scale.destroy();
        self.rotate.destroy();
        self.translate.destroy();
        self.indicator = None;
    }

    /// Moves the model onto `hit` and shows it as the candidate.
    pub(crate) fn follow(&mut self, hit: &HitTestResult, rotation: Quat, root: &mut Transform) {
        if self.state == PlacementState::Placed || !self.surface.accepts(hit.normal) {
            return;
        }
        if self.state == PlacementState::Searching {
            debug!("{:?} candidate found", self.surface);
        }
        root.position = hit.position;
        root.rotation = rotation;
        self.indicator = Some(*hit);
        self.state = PlacementState::Candidate;
    }

    /// Confirms the candidate. Returns false when there is none.
    pub(crate) fn place(&mut self, root: &Transform, axis: Vec3) -> bool {
        if self.state != PlacementState::Candidate {
            return false;
        }
        self.state = PlacementState::Placed;
        self.indicator = None;
        self.scale.reset(root.uniform_scale());
        self.rotate.anchor(axis, root.rotation);
        self.touches.clear();
        if self.enabled {
            self.enable_gestures();
        }
        debug!("model placed on {:?}", self.surface);
        true
    }

    /// Runs the gesture sub-controls for a placed model.
    pub(crate) fn gestures(&mut self, frame: &XrFrame, delta: Duration, root: &mut Transform) {
        if self.state != PlacementState::Placed {
            return;
        }
        let gesture = self.touches.advance(&frame.inputs);
        self.translate.update(&gesture, root);
        self.scale.update(&gesture, delta, root);
        self.rotate.update(&gesture, delta, root);
    }

    fn enable_gestures(&mut self) {
        self.scale.enable();
        self.rotate.enable();
        self.translate.enable();
    }
}

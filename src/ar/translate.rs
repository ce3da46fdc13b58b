use glam::Vec3;

use super::{Surface, TouchGesture};
use crate::scene::Transform;

/// One-finger dragging of the placed model along detected surfaces.
///
/// The model keeps the offset between itself and the surface point under
/// the finger when the drag started, so it does not jump to the finger.
/// With a plane set, movement is projected onto that plane; otherwise the
/// offset is kept horizontal and the model follows the surface height.
pub struct ArTranslateControl {
    surface: Surface,
    plane: Option<(Vec3, Vec3)>,
    grab: Option<Vec3>,
    enabled: bool,
}

impl ArTranslateControl {
    pub fn new(surface: Surface) -> Self {
        Self {
            surface,
            plane: None,
            grab: None,
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
        self.grab = None;
    }

    pub fn destroy(&mut self) {
        self.disable();
        self.plane = None;
    }

    /// Constrains movement to the plane through `point` with `normal`.
    pub fn set_plane(&mut self, point: Vec3, normal: Vec3) {
        self.plane = Some((point, normal.normalize_or_zero()));
    }

    pub fn is_dragging(&self) -> bool {
        self.grab.is_some()
    }

    pub fn update(&mut self, gesture: &TouchGesture, transform: &mut Transform) {
        if !self.enabled {
            return;
        }
        if gesture.fingers != 1 {
            self.grab = None;
            return;
        }
        let Some(hit) = gesture.hit.filter(|hit| self.surface.accepts(hit.normal)) else {
            return;
        };

        let (target, normal) = match self.plane {
            Some((point, normal)) => (hit.position - normal * (hit.position - point).dot(normal), normal),
            None => (hit.position, Vec3::Y),
        };
        if gesture.started || self.grab.is_none() {
            let offset = transform.position - target;
            self.grab = Some(offset - normal * offset.dot(normal));
        }
        if let Some(offset) = self.grab {
            transform.position = target + offset;
        }
    }
}

use std::any::Any;
use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::{Control, RotateControl, TranslateControl, ZoomControl};
use crate::camera::Camera;
use crate::error::ControlError;
use crate::input::SharedSurface;
use crate::motion::MotionOptions;
use crate::pose::PoseDelta;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitOptions {
    pub rotate_sensitivity: f32,
    pub translate_sensitivity: f32,
    pub zoom_sensitivity: f32,
    pub motion: MotionOptions,
}

impl Default for OrbitOptions {
    fn default() -> Self {
        Self {
            rotate_sensitivity: 1.0,
            translate_sensitivity: 1.0,
            zoom_sensitivity: 1.0,
            motion: MotionOptions::default(),
        }
    }
}

/// Rotate, translate and zoom as one unit. Every call fans out to the
/// three parts in that order.
pub struct OrbitControl {
    pub rotate: RotateControl,
    pub translate: TranslateControl,
    pub zoom: ZoomControl,
}

impl OrbitControl {
    pub fn new() -> Self {
        Self::with_options(OrbitOptions::default())
    }

    pub fn with_options(options: OrbitOptions) -> Self {
        Self {
            rotate: RotateControl::with_options(options.rotate_sensitivity, options.motion),
            translate: TranslateControl::with_options(
                options.translate_sensitivity,
                options.motion,
            ),
            zoom: ZoomControl::with_options(options.zoom_sensitivity, options.motion),
        }
    }

    fn parts_mut(&mut self) -> [&mut dyn Control; 3] {
        [&mut self.rotate, &mut self.translate, &mut self.zoom]
    }
}

impl Default for OrbitControl {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for OrbitControl {
    fn name(&self) -> &'static str {
        "orbit"
    }

    /// Enabled while any part is enabled.
    fn is_enabled(&self) -> bool {
        self.rotate.is_enabled() || self.translate.is_enabled() || self.zoom.is_enabled()
    }

    fn enable(&mut self) -> Result<(), ControlError> {
        for part in self.parts_mut() {
            part.enable()?;
        }
        Ok(())
    }

    fn disable(&mut self) {
        for part in self.parts_mut() {
            part.disable();
        }
    }

    fn destroy(&mut self) {
        for part in self.parts_mut() {
            part.destroy();
        }
    }

    fn update(&mut self, camera: &Camera, delta: Duration) -> PoseDelta {
        self.parts_mut()
            .into_iter()
            .map(|part| part.update(camera, delta))
            .fold(PoseDelta::ZERO, |total, part| total + part)
    }

    fn sync(&mut self, camera: &Camera) {
        for part in self.parts_mut() {
            part.sync(camera);
        }
    }

    fn set_element(&mut self, element: Option<SharedSurface>) {
        for part in self.parts_mut() {
            part.set_element(element.clone());
        }
    }

    fn resize(&mut self, size: Vec2) {
        for part in self.parts_mut() {
            part.resize(size);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::test_support::surface;
    use crate::input::{InputEvent, InputKind, SurfaceChange};
    use crate::pose::Pose;

    #[test]
    fn fan_out_preserves_part_order() {
        let (surface, shared) = surface();
        let mut orbit = OrbitControl::new();
        orbit.set_element(Some(shared));
        orbit.enable().unwrap();

        let attached: Vec<InputKind> = surface
            .history()
            .into_iter()
            .filter_map(|change| match change {
                SurfaceChange::Attached(kind) => Some(kind),
                SurfaceChange::Detached(_) => None,
            })
            .collect();
        assert_eq!(
            attached,
            vec![
                // rotate
                InputKind::PointerDown,
                InputKind::PointerMove,
                InputKind::PointerUp,
                InputKind::PointerCancel,
                // translate
                InputKind::PointerDown,
                InputKind::PointerMove,
                InputKind::PointerUp,
                InputKind::PointerCancel,
                InputKind::ContextMenu,
                // zoom
                InputKind::Wheel,
                InputKind::PointerDown,
                InputKind::PointerMove,
                InputKind::PointerUp,
                InputKind::PointerCancel,
            ]
        );

        surface.clear_history();
        orbit.disable();
        assert_eq!(surface.total_listeners(), 0);
        assert_eq!(surface.history().len(), 14);
    }

    #[test]
    fn combines_part_deltas() {
        let (surface, shared) = surface();
        let camera = Camera::new(Pose::new(0.0, 0.0, 2.0));
        let mut orbit = OrbitControl::new();
        orbit.set_element(Some(shared));
        orbit.resize(Vec2::new(100.0, 100.0));
        orbit.sync(&camera);
        orbit.enable().unwrap();

        surface.dispatch(InputEvent::touch_down(1, Vec2::ZERO));
        surface.dispatch(InputEvent::pointer_move(1, Vec2::new(-10.0, 0.0)));
        surface.dispatch(InputEvent::Wheel { delta: 100.0 });

        let delta = orbit.update(&camera, Duration::from_secs(1));
        assert!((delta.yaw - 36.0).abs() < 1e-3);
        assert!(delta.distance > 0.0);
    }
}

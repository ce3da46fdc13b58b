use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{listener, Attachment, Bindings, Control};
use crate::camera::Camera;
use crate::error::ControlError;
use crate::input::{InputEvent, InputKind, PointerInfo, PointerTracker, SharedSurface};
use crate::motion::{Motion, MotionOptions};
use crate::pose::PoseDelta;

/// Wheel pixels per e-fold of distance.
const WHEEL_PIXELS_PER_E: f32 = 1000.0;

struct ZoomState {
    pointers: PointerTracker,
    sensitivity: f32,
    distance: Motion,
}

impl ZoomState {
    fn zoom_by(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let target = self.distance.end();
        self.distance.extend_end(target * (factor - 1.0));
    }

    fn on_event(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::Wheel { delta } => {
                let factor = (delta / WHEEL_PIXELS_PER_E * self.sensitivity).exp();
                self.zoom_by(factor);
            }
            InputEvent::PointerDown {
                pointer,
                kind,
                button,
                position,
            } => self.pointers.press(
                pointer,
                PointerInfo {
                    kind,
                    button,
                    position,
                },
            ),
            InputEvent::PointerMove { pointer, position } => {
                let before = self.pointers.span();
                if self.pointers.move_to(pointer, position).is_none() {
                    return;
                }
                if let (Some(before), Some(after)) = (before, self.pointers.span()) {
                    if after > f32::EPSILON {
                        let factor = (before / after).powf(self.sensitivity);
                        self.zoom_by(factor);
                    }
                }
            }
            InputEvent::PointerUp { pointer, .. } | InputEvent::PointerCancel { pointer } => {
                self.pointers.release(pointer);
            }
            _ => {}
        }
    }
}

fn bindings(state: &Arc<Mutex<ZoomState>>) -> Bindings {
    vec![
        (InputKind::Wheel, listener(state, ZoomState::on_event)),
        (InputKind::PointerDown, listener(state, ZoomState::on_event)),
        (InputKind::PointerMove, listener(state, ZoomState::on_event)),
        (InputKind::PointerUp, listener(state, ZoomState::on_event)),
        (InputKind::PointerCancel, listener(state, ZoomState::on_event)),
    ]
}

/// Dolly in and out with the wheel or a pinch.
pub struct ZoomControl {
    attachment: Attachment,
    state: Arc<Mutex<ZoomState>>,
}

impl ZoomControl {
    pub fn new() -> Self {
        Self::with_options(1.0, MotionOptions::default())
    }

    pub fn with_options(sensitivity: f32, motion: MotionOptions) -> Self {
        Self {
            attachment: Attachment::new(),
            state: Arc::new(Mutex::new(ZoomState {
                pointers: PointerTracker::new(),
                sensitivity,
                distance: Motion::new(motion),
            })),
        }
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.state.lock().sensitivity = sensitivity;
    }
}

impl Default for ZoomControl {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for ZoomControl {
    fn name(&self) -> &'static str {
        "zoom"
    }

    fn is_enabled(&self) -> bool {
        self.attachment.is_enabled()
    }

    fn enable(&mut self) -> Result<(), ControlError> {
        let state = Arc::clone(&self.state);
        self.attachment.enable("zoom", || bindings(&state))
    }

    fn disable(&mut self) {
        if self.attachment.disable() {
            let mut state = self.state.lock();
            state.pointers.clear();
            let current = state.distance.val();
            state.distance.reset(current);
        }
    }

    fn destroy(&mut self) {
        self.disable();
        self.attachment.destroy();
        self.state.lock().distance.reset(0.0);
    }

    fn update(&mut self, camera: &Camera, delta: Duration) -> PoseDelta {
        if !self.is_enabled() {
            return PoseDelta::ZERO;
        }
        let mut state = self.state.lock();
        state.distance.set_range(camera.limits().distance);
        if !state.distance.is_active() {
            state.distance.reset(camera.pose().distance);
        }
        PoseDelta::distance(state.distance.update(delta))
    }

    fn sync(&mut self, camera: &Camera) {
        let mut state = self.state.lock();
        state.distance.set_range(camera.limits().distance);
        state.distance.reset(camera.pose().distance);
    }

    fn set_element(&mut self, element: Option<SharedSurface>) {
        let state = Arc::clone(&self.state);
        self.attachment.set_element(element, || bindings(&state));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;
use parking_lot::Mutex;

use super::{listener, Attachment, Bindings, Control};
use crate::camera::Camera;
use crate::error::ControlError;
use crate::input::{InputEvent, InputKind, PointerInfo, PointerKind, PointerTracker, SharedSurface};
use crate::motion::{Motion, MotionOptions, Range};
use crate::pose::PoseDelta;

/// Degrees of yaw for a drag across the full element width.
const YAW_PER_WIDTH: f32 = 360.0;
/// Degrees of pitch for a drag across the full element height.
const PITCH_PER_HEIGHT: f32 = 180.0;

struct RotateState {
    pointers: PointerTracker,
    size: Vec2,
    sensitivity: f32,
    yaw: Motion,
    pitch: Motion,
}

impl RotateState {
    fn on_event(&mut self, event: &InputEvent) {
        match *event {
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
                let rotating = self.pointers.count() == 1
                    && self
                        .pointers
                        .get(pointer)
                        .is_some_and(|info| info.kind != PointerKind::Mouse || info.button.is_primary());
                let Some(previous) = self.pointers.move_to(pointer, position) else {
                    return;
                };
                if rotating {
                    let moved = position - previous;
                    self.yaw
                        .extend_end(-moved.x / self.size.x * YAW_PER_WIDTH * self.sensitivity);
                    self.pitch
                        .extend_end(moved.y / self.size.y * PITCH_PER_HEIGHT * self.sensitivity);
                }
            }
            InputEvent::PointerUp { pointer, .. } | InputEvent::PointerCancel { pointer } => {
                self.pointers.release(pointer);
            }
            _ => {}
        }
    }

    fn settle(&mut self) {
        self.pointers.clear();
        let (yaw, pitch) = (self.yaw.val(), self.pitch.val());
        self.yaw.reset(yaw);
        self.pitch.reset(pitch);
    }
}

/// Single-pointer drag to orbit the camera.
pub struct RotateControl {
    attachment: Attachment,
    state: Arc<Mutex<RotateState>>,
}

impl RotateControl {
    pub fn new() -> Self {
        Self::with_options(1.0, MotionOptions::default())
    }

    pub fn with_options(sensitivity: f32, motion: MotionOptions) -> Self {
        Self {
            attachment: Attachment::new(),
            state: Arc::new(Mutex::new(RotateState {
                pointers: PointerTracker::new(),
                size: Vec2::ONE,
                sensitivity,
                yaw: Motion::new(MotionOptions {
                    range: Range::UNBOUNDED,
                    ..motion
                }),
                pitch: Motion::new(motion),
            })),
        }
    }

    pub fn sensitivity(&self) -> f32 {
        self.state.lock().sensitivity
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.state.lock().sensitivity = sensitivity;
    }

    /// Whether a drag is still easing towards its target.
    pub fn is_moving(&self) -> bool {
        let state = self.state.lock();
        state.yaw.is_active() || state.pitch.is_active()
    }
}

fn bindings(state: &Arc<Mutex<RotateState>>) -> Bindings {
    vec![
        (InputKind::PointerDown, listener(state, RotateState::on_event)),
        (InputKind::PointerMove, listener(state, RotateState::on_event)),
        (InputKind::PointerUp, listener(state, RotateState::on_event)),
        (InputKind::PointerCancel, listener(state, RotateState::on_event)),
    ]
}

impl Default for RotateControl {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for RotateControl {
    fn name(&self) -> &'static str {
        "rotate"
    }

    fn is_enabled(&self) -> bool {
        self.attachment.is_enabled()
    }

    fn enable(&mut self) -> Result<(), ControlError> {
        let state = Arc::clone(&self.state);
        self.attachment.enable("rotate", || bindings(&state))
    }

    fn disable(&mut self) {
        if self.attachment.disable() {
            self.state.lock().settle();
        }
    }

    fn destroy(&mut self) {
        self.disable();
        self.attachment.destroy();
        let mut state = self.state.lock();
        state.yaw.reset(0.0);
        state.pitch.reset(0.0);
    }

    fn update(&mut self, camera: &Camera, delta: Duration) -> PoseDelta {
        if !self.is_enabled() {
            return PoseDelta::ZERO;
        }
        let mut state = self.state.lock();
        state.pitch.set_range(camera.limits().pitch);
        if !state.pitch.is_active() {
            state.pitch.reset(camera.pose().pitch);
        }
        PoseDelta {
            yaw: state.yaw.update(delta),
            pitch: state.pitch.update(delta),
            ..PoseDelta::ZERO
        }
    }

    fn sync(&mut self, camera: &Camera) {
        let mut state = self.state.lock();
        state.pitch.set_range(camera.limits().pitch);
        state.yaw.reset(camera.pose().yaw);
        state.pitch.reset(camera.pose().pitch);
    }

    fn set_element(&mut self, element: Option<SharedSurface>) {
        let state = Arc::clone(&self.state);
        self.attachment.set_element(element, || bindings(&state));
    }

    fn resize(&mut self, size: Vec2) {
        self.state.lock().size = size.max(Vec2::ONE);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

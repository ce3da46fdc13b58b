use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;
use parking_lot::Mutex;

use super::{listener, Attachment, Bindings, Control};
use crate::camera::Camera;
use crate::error::ControlError;
use crate::input::{
    InputEvent, InputKind, MouseButton, PointerInfo, PointerKind, PointerTracker, SharedSurface,
};
use crate::motion::{Motion, MotionOptions, Range};
use crate::pose::PoseDelta;

/// Pan offsets are kept as fractions of the element size and converted to
/// world units against the camera on update.
struct TranslateState {
    pointers: PointerTracker,
    size: Vec2,
    sensitivity: f32,
    x: Motion,
    y: Motion,
}

impl TranslateState {
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
                let before = self.pointers.centroid();
                let Some(previous) = self.pointers.move_to(pointer, position) else {
                    return;
                };
                let moved = match self.pointers.count() {
                    1 if self.pointers.first().is_some_and(is_pan_button) => position - previous,
                    2 => match (before, self.pointers.centroid()) {
                        (Some(before), Some(after)) => after - before,
                        _ => return,
                    },
                    _ => return,
                };
                let fraction = moved / self.size * self.sensitivity;
                self.x.extend_end(fraction.x);
                self.y.extend_end(fraction.y);
            }
            InputEvent::PointerUp { pointer, .. } | InputEvent::PointerCancel { pointer } => {
                self.pointers.release(pointer);
            }
            _ => {}
        }
    }

    fn settle(&mut self) {
        self.pointers.clear();
        self.x.reset(0.0);
        self.y.reset(0.0);
    }
}

fn is_pan_button(info: &PointerInfo) -> bool {
    info.kind == PointerKind::Mouse
        && (info.button == MouseButton::RIGHT || info.button == MouseButton::MIDDLE)
}

fn bindings(state: &Arc<Mutex<TranslateState>>) -> Bindings {
    vec![
        (InputKind::PointerDown, listener(state, TranslateState::on_event)),
        (InputKind::PointerMove, listener(state, TranslateState::on_event)),
        (InputKind::PointerUp, listener(state, TranslateState::on_event)),
        (InputKind::PointerCancel, listener(state, TranslateState::on_event)),
        // Claimed so a secondary-button pan does not open the menu.
        (InputKind::ContextMenu, listener(state, |_: &mut TranslateState, _: &InputEvent| {})),
    ]
}

/// Moves the pivot in the camera plane: secondary or middle button drag,
/// or a two-finger drag.
pub struct TranslateControl {
    attachment: Attachment,
    state: Arc<Mutex<TranslateState>>,
}

impl TranslateControl {
    pub fn new() -> Self {
        Self::with_options(1.0, MotionOptions::default())
    }

    pub fn with_options(sensitivity: f32, motion: MotionOptions) -> Self {
        let motion = MotionOptions {
            range: Range::UNBOUNDED,
            ..motion
        };
        Self {
            attachment: Attachment::new(),
            state: Arc::new(Mutex::new(TranslateState {
                pointers: PointerTracker::new(),
                size: Vec2::ONE,
                sensitivity,
                x: Motion::new(motion),
                y: Motion::new(motion),
            })),
        }
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.state.lock().sensitivity = sensitivity;
    }
}

impl Default for TranslateControl {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for TranslateControl {
    fn name(&self) -> &'static str {
        "translate"
    }

    fn is_enabled(&self) -> bool {
        self.attachment.is_enabled()
    }

    fn enable(&mut self) -> Result<(), ControlError> {
        let state = Arc::clone(&self.state);
        self.attachment.enable("translate", || bindings(&state))
    }

    fn disable(&mut self) {
        if self.attachment.disable() {
            self.state.lock().settle();
        }
    }

    fn destroy(&mut self) {
        self.disable();
        self.attachment.destroy();
        self.state.lock().settle();
    }

    fn update(&mut self, camera: &Camera, delta: Duration) -> PoseDelta {
        if !self.is_enabled() {
            return PoseDelta::ZERO;
        }
        let mut state = self.state.lock();
        let dx = state.x.update(delta);
        let dy = state.y.update(delta);
        if dx == 0.0 && dy == 0.0 {
            return PoseDelta::ZERO;
        }
        let view_height = 2.0 * camera.pose().distance * (camera.fov() * 0.5).to_radians().tan();
        let view_width = view_height * state.size.x / state.size.y;
        let (right, up) = camera.basis();
        PoseDelta::pivot(-right * dx * view_width + up * dy * view_height)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::test_support::{drag, surface};
    use crate::input::VirtualSurface;
    use crate::pose::Pose;
    use glam::Vec3;

    fn ready() -> (Arc<VirtualSurface>, TranslateControl, Camera) {
        let (virtual_surface, shared) = surface();
        let mut control = TranslateControl::new();
        control.set_element(Some(shared));
        control.resize(Vec2::new(400.0, 400.0));
        control.enable().unwrap();
        (virtual_surface, control, Camera::new(Pose::new(0.0, 0.0, 4.0)))
    }

    #[test]
    fn right_drag_pans_against_the_camera_basis() {
        let (surface, mut control, camera) = ready();
        drag(&surface, MouseButton::RIGHT, Vec2::ZERO, Vec2::new(200.0, 0.0));
        let delta = control.update(&camera, Duration::from_secs(1));

        let view_height = 2.0 * 4.0 * (camera.fov() * 0.5).to_radians().tan();
        // Camera looks down -Z, so screen-right is +X.
        assert!((delta.pivot - Vec3::new(-0.5 * view_height, 0.0, 0.0)).length() < 1e-4);
        assert_eq!(delta.yaw, 0.0);
    }

    #[test]
    fn two_finger_drag_follows_the_midpoint() {
        let (surface, mut control, camera) = ready();
        surface.dispatch(InputEvent::touch_down(1, Vec2::new(100.0, 100.0)));
        surface.dispatch(InputEvent::touch_down(2, Vec2::new(200.0, 100.0)));
        surface.dispatch(InputEvent::pointer_move(1, Vec2::new(100.0, 140.0)));
        surface.dispatch(InputEvent::pointer_move(2, Vec2::new(200.0, 140.0)));

        let delta = control.update(&camera, Duration::from_secs(1));
        assert!(delta.pivot.y > 0.0);
        assert!(delta.pivot.x.abs() < 1e-5);
    }

    #[test]
    fn primary_drag_is_ignored() {
        let (surface, mut control, camera) = ready();
        drag(&surface, MouseButton::LEFT, Vec2::ZERO, Vec2::new(50.0, 50.0));
        assert!(control.update(&camera, Duration::from_secs(1)).is_zero());
    }

    #[test]
    fn claims_the_context_menu() {
        let (surface, mut control, _) = ready();
        assert_eq!(surface.listener_count(InputKind::ContextMenu), 1);
        control.destroy();
        assert_eq!(surface.total_listeners(), 0);
        assert_eq!(
            control.enable(),
            Err(ControlError::Destroyed { control: "translate" })
        );
    }
}

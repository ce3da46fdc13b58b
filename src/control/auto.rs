use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{listener, Attachment, Bindings, Control};
use crate::camera::Camera;
use crate::error::ControlError;
use crate::input::{InputEvent, InputKind, SharedSurface};
use crate::pose::PoseDelta;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoOptions {
    /// Degrees of yaw per second.
    pub speed: f32,
    /// Idle time after the last interaction before rotation resumes.
    pub delay: Duration,
    /// Idle time after the pointer leaves the element.
    pub delay_on_mouse_leave: Duration,
    /// Hovering the element pauses rotation.
    pub pause_on_hover: bool,
    pub can_interrupt: bool,
    /// An interruption stops rotation until the control is re-enabled.
    pub disable_on_interrupt: bool,
}

impl Default for AutoOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            delay: Duration::from_millis(2000),
            delay_on_mouse_leave: Duration::ZERO,
            pause_on_hover: false,
            can_interrupt: true,
            disable_on_interrupt: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoState {
    Idle,
    Rotating,
    /// Paused by user input; `resume_in` is `None` while input is held.
    Interrupted { resume_in: Option<Duration> },
    /// Stopped by an interruption with `disable_on_interrupt` set.
    Disabled,
}

struct AutoShared {
    options: AutoOptions,
    state: AutoState,
    pressed: usize,
    hovering: bool,
}

impl AutoShared {
    fn interrupt(&mut self, resume_in: Option<Duration>) {
        if !self.options.can_interrupt || self.state == AutoState::Disabled {
            return;
        }
        if self.options.disable_on_interrupt {
            debug!("auto rotation stopped by user input");
            self.state = AutoState::Disabled;
            return;
        }
        self.state = AutoState::Interrupted { resume_in };
    }

    /// Delay to arm once nothing holds the rotation back.
    fn idle_delay(&self) -> Option<Duration> {
        if self.pressed > 0 || (self.hovering && self.options.pause_on_hover) {
            None
        } else {
            Some(self.options.delay)
        }
    }

    fn on_event(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::PointerDown { .. } => {
                self.pressed += 1;
                self.interrupt(None);
            }
            InputEvent::PointerMove { .. } => {
                if self.pressed > 0 {
                    self.interrupt(None);
                }
            }
            InputEvent::PointerUp { .. } | InputEvent::PointerCancel { .. } => {
                self.pressed = self.pressed.saturating_sub(1);
                if matches!(self.state, AutoState::Interrupted { .. }) {
                    self.interrupt(self.idle_delay());
                }
            }
            InputEvent::Wheel { .. } => {
                let delay = self.idle_delay();
                self.interrupt(delay);
            }
            InputEvent::PointerEnter => {
                self.hovering = true;
                if self.options.pause_on_hover {
                    self.interrupt(None);
                }
            }
            InputEvent::PointerLeave => {
                self.hovering = false;
                if self.pressed == 0 && matches!(self.state, AutoState::Interrupted { .. }) {
                    self.state = AutoState::Interrupted {
                        resume_in: Some(self.options.delay_on_mouse_leave),
                    };
                }
            }
            InputEvent::ContextMenu => {}
        }
    }

    /// Seconds of rotation owed for this frame.
    fn advance(&mut self, delta: Duration) -> Duration {
        match self.state {
            AutoState::Rotating => delta,
            AutoState::Interrupted {
                resume_in: Some(remaining),
            } => {
                if delta >= remaining {
                    debug!("auto rotation resumed");
                    self.state = AutoState::Rotating;
                    delta - remaining
                } else {
                    self.state = AutoState::Interrupted {
                        resume_in: Some(remaining - delta),
                    };
                    Duration::ZERO
                }
            }
            _ => Duration::ZERO,
        }
    }
}

fn bindings(state: &Arc<Mutex<AutoShared>>) -> Bindings {
    [
        InputKind::PointerDown,
        InputKind::PointerMove,
        InputKind::PointerUp,
        InputKind::PointerCancel,
        InputKind::Wheel,
        InputKind::PointerEnter,
        InputKind::PointerLeave,
    ]
    .into_iter()
    .map(|kind| (kind, listener(state, AutoShared::on_event)))
    .collect()
}

/// Idle-driven yaw rotation that yields to user input.
///
/// Needs an element before it can be enabled: interruption is detected by
/// listening to the same surface the orbit controls use.
pub struct AutoControl {
    attachment: Attachment,
    shared: Arc<Mutex<AutoShared>>,
}

impl AutoControl {
    pub fn new(options: AutoOptions) -> Self {
        Self {
            attachment: Attachment::new(),
            shared: Arc::new(Mutex::new(AutoShared {
                options,
                state: AutoState::Idle,
                pressed: 0,
                hovering: false,
            })),
        }
    }

    pub fn state(&self) -> AutoState {
        self.shared.lock().state
    }

    pub fn options(&self) -> AutoOptions {
        self.shared.lock().options
    }

    pub fn set_options(&mut self, options: AutoOptions) {
        self.shared.lock().options = options;
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.shared.lock().options.speed = speed;
    }
}

impl Default for AutoControl {
    fn default() -> Self {
        Self::new(AutoOptions::default())
    }
}

impl Control for AutoControl {
    fn name(&self) -> &'static str {
        "auto"
    }

    fn is_enabled(&self) -> bool {
        self.attachment.is_enabled()
    }

    fn enable(&mut self) -> Result<(), ControlError> {
        if self.attachment.is_enabled() {
            return Ok(());
        }
        let shared = Arc::clone(&self.shared);
        self.attachment.enable("auto", || bindings(&shared))?;
        let mut shared = self.shared.lock();
        shared.pressed = 0;
        shared.state = AutoState::Rotating;
        Ok(())
    }

    fn disable(&mut self) {
        if self.attachment.disable() {
            self.shared.lock().state = AutoState::Idle;
        }
    }

    fn destroy(&mut self) {
        self.disable();
        self.attachment.destroy();
    }

    fn update(&mut self, _camera: &Camera, delta: Duration) -> PoseDelta {
        if !self.is_enabled() {
            return PoseDelta::ZERO;
        }
        let mut shared = self.shared.lock();
        let rotating_for = shared.advance(delta);
        if rotating_for.is_zero() {
            return PoseDelta::ZERO;
        }
        PoseDelta::yaw(shared.options.speed * rotating_for.as_secs_f32())
    }

    fn set_element(&mut self, element: Option<SharedSurface>) {
        let shared = Arc::clone(&self.shared);
        self.attachment.set_element(element, || bindings(&shared));
        if !self.attachment.is_enabled() {
            self.shared.lock().state = AutoState::Idle;
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
    use crate::input::{MouseButton, VirtualSurface};
    use glam::Vec2;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn enabled(options: AutoOptions) -> (Arc<VirtualSurface>, AutoControl) {
        let (virtual_surface, shared) = surface();
        let mut control = AutoControl::new(options);
        control.set_element(Some(shared));
        control.enable().unwrap();
        (virtual_surface, control)
    }

    fn press_and_release(surface: &VirtualSurface) {
        surface.dispatch(InputEvent::mouse_down(MouseButton::LEFT, Vec2::ZERO));
        surface.dispatch(InputEvent::pointer_up(1, Vec2::ZERO));
    }

    #[test]
    fn one_second_at_unit_speed_is_one_degree() {
        let (_surface, mut control) = enabled(AutoOptions::default());
        let delta = control.update(&Camera::default(), ms(1000));
        assert!((delta.yaw - 1.0).abs() < 1e-6);
    }

    #[test]
    fn enable_without_element_is_not_ready() {
        let mut control = AutoControl::default();
        assert_eq!(
            control.enable(),
            Err(ControlError::NotReady { control: "auto" })
        );
        assert_eq!(control.state(), AutoState::Idle);
    }

    #[test]
    fn pointer_down_pauses_until_delay_elapses() {
        let (surface, mut control) = enabled(AutoOptions::default());
        let camera = Camera::default();

        surface.dispatch(InputEvent::mouse_down(MouseButton::LEFT, Vec2::ZERO));
        assert!(control.update(&camera, ms(5000)).is_zero());
        surface.dispatch(InputEvent::pointer_up(1, Vec2::ZERO));

        assert!(control.update(&camera, ms(1500)).is_zero());
        assert!(control.update(&camera, ms(500)).is_zero());
        assert_eq!(control.state(), AutoState::Rotating);
        let delta = control.update(&camera, ms(1000));
        assert!((delta.yaw - 1.0).abs() < 1e-6);
    }

    #[test]
    fn new_input_restarts_the_delay() {
        let (surface, mut control) = enabled(AutoOptions::default());
        let camera = Camera::default();
        press_and_release(&surface);
        control.update(&camera, ms(1500));
        surface.dispatch(InputEvent::Wheel { delta: 10.0 });
        assert!(control.update(&camera, ms(1500)).is_zero());
        let delta = control.update(&camera, ms(1000));
        assert!((delta.yaw - 0.5).abs() < 1e-6);
    }

    #[test]
    fn disable_on_interrupt_stops_for_good() {
        let (surface, mut control) = enabled(AutoOptions {
            disable_on_interrupt: true,
            ..AutoOptions::default()
        });
        let camera = Camera::default();
        press_and_release(&surface);
        assert_eq!(control.state(), AutoState::Disabled);
        assert!(control.update(&camera, ms(60_000)).is_zero());

        control.disable();
        control.enable().unwrap();
        assert_eq!(control.state(), AutoState::Rotating);
    }

    #[test]
    fn uninterruptible_rotation_ignores_input() {
        let (surface, mut control) = enabled(AutoOptions {
            can_interrupt: false,
            speed: 10.0,
            ..AutoOptions::default()
        });
        press_and_release(&surface);
        let delta = control.update(&Camera::default(), ms(100));
        assert!((delta.yaw - 1.0).abs() < 1e-5);
    }

    #[test]
    fn hover_pause_uses_the_leave_delay() {
        let (surface, mut control) = enabled(AutoOptions {
            pause_on_hover: true,
            delay_on_mouse_leave: ms(300),
            ..AutoOptions::default()
        });
        let camera = Camera::default();
        surface.dispatch(InputEvent::PointerEnter);
        assert!(control.update(&camera, ms(10_000)).is_zero());
        surface.dispatch(InputEvent::PointerLeave);
        assert!(control.update(&camera, ms(300)).is_zero());
        assert!(!control.update(&camera, ms(100)).is_zero());
    }
}

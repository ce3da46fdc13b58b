//! Pluggable units that turn input into camera pose deltas.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;
use log::debug;
use parking_lot::Mutex;

use crate::camera::Camera;
use crate::error::ControlError;
use crate::events::{Listener, ListenerId};
use crate::input::{InputEvent, InputKind, SharedSurface};
use crate::pose::PoseDelta;

mod animation;
mod auto;
mod orbit;
mod rotate;
mod translate;
mod zoom;

pub use animation::{AnimationControl, FinishedCallback};
pub use auto::{AutoControl, AutoOptions, AutoState};
pub use orbit::{OrbitControl, OrbitOptions};
pub use rotate::RotateControl;
pub use translate::TranslateControl;
pub use zoom::ZoomControl;

/// Capability shared by every control the [`crate::controller::Controller`]
/// drives.
///
/// A control must not contribute deltas while disabled. `enable` and
/// `disable` are idempotent and attach or detach exactly the listeners the
/// control declares.
pub trait Control: Any {
    fn name(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    fn enable(&mut self) -> Result<(), ControlError>;

    fn disable(&mut self);

    /// Disables the control and releases its motions. Destroyed controls
    /// refuse to enable again.
    fn destroy(&mut self);

    /// Advances internal motions and returns the pose change requested for
    /// this frame.
    fn update(&mut self, camera: &Camera, delta: Duration) -> PoseDelta;

    /// Re-bases internal state on the camera's current pose.
    fn sync(&mut self, _camera: &Camera) {}

    /// Replaces the input element. When enabled, listeners move to the new
    /// element; clearing the element disables the control.
    fn set_element(&mut self, _element: Option<SharedSurface>) {}

    /// Canvas size in pixels, used to normalise drag distances.
    fn resize(&mut self, _size: Vec2) {}

    /// One-shot controls report completion so the controller can drop them.
    fn is_finished(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub type Bindings = Vec<(InputKind, Listener<InputEvent>)>;

/// Element + listener bookkeeping shared by the input-driven controls.
#[derive(Default)]
pub(crate) struct Attachment {
    element: Option<SharedSurface>,
    attached: Vec<(InputKind, ListenerId)>,
    enabled: bool,
    destroyed: bool,
}

impl Attachment {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub(crate) fn element(&self) -> Option<&SharedSurface> {
        self.element.as_ref()
    }

    /// Attaches `bindings` to the element. A no-op when already enabled.
    pub(crate) fn enable(
        &mut self,
        control: &'static str,
        bindings: impl FnOnce() -> Bindings,
    ) -> Result<(), ControlError> {
        if self.destroyed {
            return Err(ControlError::Destroyed { control });
        }
        if self.enabled {
            return Ok(());
        }
        let Some(element) = self.element.clone() else {
            return Err(ControlError::NotReady { control });
        };
        self.attach(&element, bindings());
        self.enabled = true;
        debug!("{control} control enabled");
        Ok(())
    }

    /// Detaches every listener. Returns whether the control was enabled.
    pub(crate) fn disable(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        self.detach();
        self.enabled = false;
        true
    }

    pub(crate) fn destroy(&mut self) {
        self.disable();
        self.element = None;
        self.destroyed = true;
    }

    pub(crate) fn set_element(
        &mut self,
        element: Option<SharedSurface>,
        bindings: impl FnOnce() -> Bindings,
    ) {
        if self.enabled {
            self.detach();
        }
        self.element = element;
        match (&self.element, self.enabled) {
            (Some(element), true) => {
                let element = element.clone();
                self.attach(&element, bindings());
            }
            (None, true) => self.enabled = false,
            _ => {}
        }
    }

    fn attach(&mut self, element: &SharedSurface, bindings: Bindings) {
        for (kind, listener) in bindings {
            let id = element.add_listener(kind, listener);
            self.attached.push((kind, id));
        }
    }

    fn detach(&mut self) {
        let attached = std::mem::take(&mut self.attached);
        if let Some(element) = &self.element {
            for (kind, id) in attached {
                element.remove_listener(kind, id);
            }
        }
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Wraps a closure over the control's shared state as a listener.
pub(crate) fn listener<S, F>(state: &Arc<Mutex<S>>, handler: F) -> Listener<InputEvent>
where
    S: Send + 'static,
    F: Fn(&mut S, &InputEvent) + Send + Sync + 'static,
{
    let state = Arc::clone(state);
    Arc::new(move |event: &InputEvent| handler(&mut state.lock(), event))
}

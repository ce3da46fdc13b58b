use std::time::Duration;

use glam::Vec2;
use indexmap::IndexMap;
use log::{debug, warn};

use crate::camera::Camera;
use crate::control::Control;
use crate::error::ControlError;
use crate::input::SharedSurface;
use crate::pose::PoseDelta;

/// Identity of a control registered with a [`Controller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(u64);

/// Ordered registry of controls.
///
/// Each frame every enabled control is updated in registration order; the
/// deltas are summed and applied to the camera once.
pub struct Controller {
    controls: IndexMap<ControlId, Box<dyn Control>>,
    element: Option<SharedSurface>,
    size: Vec2,
    next_id: u64,
    destroyed: bool,
}

impl Controller {
    pub fn new() -> Self {
        Self {
            controls: IndexMap::new(),
            element: None,
            size: Vec2::ONE,
            next_id: 0,
            destroyed: false,
        }
    }

    /// Registers a control, handing it the current element and size.
    /// Ownership moves into the controller, so a control cannot be
    /// registered twice.
    pub fn add(&mut self, mut control: Box<dyn Control>) -> ControlId {
        let id = ControlId(self.next_id);
        self.next_id += 1;
        if self.element.is_some() {
            control.set_element(self.element.clone());
        }
        control.resize(self.size);
        debug!("registered {} control as {id:?}", control.name());
        self.controls.insert(id, control);
        id
    }

    /// Adds a control and enables it in one step.
    pub fn add_enabled(&mut self, control: Box<dyn Control>) -> Result<ControlId, ControlError> {
        let id = self.add(control);
        if let Some(control) = self.controls.get_mut(&id) {
            if let Err(err) = control.enable() {
                self.controls.shift_remove(&id);
                return Err(err);
            }
        }
        Ok(id)
    }

    /// Unregisters a control and hands it back without destroying it.
    pub fn remove(&mut self, id: ControlId) -> Option<Box<dyn Control>> {
        self.controls.shift_remove(&id)
    }

    pub fn contains(&self, id: ControlId) -> bool {
        self.controls.contains_key(&id)
    }

    pub fn get(&self, id: ControlId) -> Option<&dyn Control> {
        self.controls.get(&id).map(|control| control.as_ref())
    }

    pub fn get_mut(&mut self, id: ControlId) -> Option<&mut (dyn Control + 'static)> {
        self.controls.get_mut(&id).map(|control| control.as_mut())
    }

    /// Typed access to a registered control.
    pub fn get_as<T: Control>(&self, id: ControlId) -> Option<&T> {
        self.controls.get(&id)?.as_any().downcast_ref::<T>()
    }

    pub fn get_as_mut<T: Control>(&mut self, id: ControlId) -> Option<&mut T> {
        self.controls.get_mut(&id)?.as_any_mut().downcast_mut::<T>()
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Control identities in update order.
    pub fn ids(&self) -> Vec<ControlId> {
        self.controls.keys().copied().collect()
    }

    pub fn set_element(&mut self, element: Option<SharedSurface>) {
        self.element = element;
        for control in self.controls.values_mut() {
            control.set_element(self.element.clone());
        }
    }

    pub fn resize(&mut self, size: Vec2) {
        if size == self.size {
            return;
        }
        self.size = size;
        for control in self.controls.values_mut() {
            control.resize(size);
        }
    }

    pub fn enable_all(&mut self) -> Result<(), ControlError> {
        for control in self.controls.values_mut() {
            control.enable()?;
        }
        Ok(())
    }

    pub fn disable_all(&mut self) {
        for control in self.controls.values_mut() {
            control.disable();
        }
    }

    /// Runs one frame: sums the deltas of enabled controls, applies the sum
    /// to `camera` once and drops controls that finished. Returns whether the
    /// camera pose changed.
    pub fn update(&mut self, camera: &mut Camera, delta: Duration) -> bool {
        let mut total = PoseDelta::ZERO;
        for control in self.controls.values_mut() {
            if control.is_enabled() {
                total += control.update(camera, delta);
            }
        }
        let changed = camera.apply_delta(&total);
        self.controls.retain(|id, control| {
            let keep = !control.is_finished();
            if !keep {
                debug!("dropping finished {} control {id:?}", control.name());
            }
            keep
        });
        changed
    }

    pub fn sync(&mut self, camera: &Camera) {
        for control in self.controls.values_mut() {
            control.sync(camera);
        }
    }

    /// Destroys every control exactly once and empties the registry.
    pub fn destroy(&mut self) {
        if self.destroyed {
            warn!("controller destroyed twice");
            return;
        }
        for (_, mut control) in self.controls.drain(..) {
            control.destroy();
        }
        self.element = None;
        self.destroyed = true;
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

use std::any::Any;
use std::time::Duration;

use log::debug;

use super::Control;
use crate::animation::Animation;
use crate::camera::Camera;
use crate::easing::Easing;
use crate::error::ControlError;
use crate::pose::{Pose, PoseDelta};

pub type FinishedCallback = Box<dyn FnOnce()>;

/// Scripted transition of the camera from one pose to another.
///
/// Runs once. Completion callbacks fire exactly once, and never when the
/// control is disabled or destroyed before the transition ends, even if it
/// is enabled again and runs to completion.
pub struct AnimationControl {
    from: Pose,
    to: Pose,
    animation: Animation,
    applied: f32,
    enabled: bool,
    destroyed: bool,
    finished: bool,
    callbacks: Vec<FinishedCallback>,
}

impl AnimationControl {
    /// Both endpoints are copied; later changes to the camera do not move
    /// them.
    pub fn new(from: Pose, to: Pose, duration: Duration) -> Self {
        Self {
            from,
            to,
            animation: Animation::new(duration),
            applied: 0.0,
            enabled: false,
            destroyed: false,
            finished: false,
            callbacks: Vec::new(),
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.animation = Animation::new(self.animation.duration()).with_easing(easing);
        self
    }

    pub fn from_pose(&self) -> &Pose {
        &self.from
    }

    pub fn to_pose(&self) -> &Pose {
        &self.to
    }

    pub fn progress(&self) -> f32 {
        self.animation.progress()
    }

    /// Registers a callback for the end of the transition.
    pub fn on_finished(&mut self, callback: impl FnOnce() + 'static) -> &mut Self {
        self.callbacks.push(Box::new(callback));
        self
    }

    pub fn clear_finished(&mut self) {
        self.callbacks.clear();
    }

    fn finish(&mut self) {
        self.finished = true;
        self.enabled = false;
        debug!("camera transition finished");
        for callback in self.callbacks.drain(..) {
            callback();
        }
    }
}

impl Control for AnimationControl {
    fn name(&self) -> &'static str {
        "animation"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Starts or resumes the transition.
    fn enable(&mut self) -> Result<(), ControlError> {
        if self.destroyed {
            return Err(ControlError::Destroyed {
                control: "animation",
            });
        }
        if self.enabled || self.finished {
            return Ok(());
        }
        self.enabled = true;
        self.animation.start();
        Ok(())
    }

    /// Pauses the transition. Callbacks registered so far are dropped; a
    /// later `enable` resumes the motion without them.
    fn disable(&mut self) {
        if self.enabled {
            self.enabled = false;
            self.animation.pause();
            if !self.callbacks.is_empty() {
                debug!(
                    "camera transition interrupted, dropping {} callback(s)",
                    self.callbacks.len()
                );
                self.callbacks.clear();
            }
        }
    }

    fn destroy(&mut self) {
        self.disable();
        self.callbacks.clear();
        self.animation.stop();
        self.destroyed = true;
    }

    fn update(&mut self, _camera: &Camera, delta: Duration) -> PoseDelta {
        if !self.enabled {
            return PoseDelta::ZERO;
        }
        let tick = self.animation.update(delta);
        let before = self.from.lerp(&self.to, self.applied);
        let after = self.from.lerp(&self.to, tick.eased);
        self.applied = tick.eased;
        if tick.finished {
            self.finish();
        }
        PoseDelta {
            yaw: after.yaw - before.yaw,
            pitch: after.pitch - before.pitch,
            distance: after.distance - before.distance,
            pivot: after.pivot - before.pivot,
        }
    }

    fn is_finished(&self) -> bool {
        self.finished || self.destroyed
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
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn run(control: &mut AnimationControl, camera: &mut Camera, frames: usize, step: Duration) {
        for _ in 0..frames {
            let delta = control.update(camera, step);
            camera.apply_delta(&delta);
        }
    }

    #[test]
    fn drives_camera_to_the_target_pose() {
        let from = Pose::new(10.0, 0.0, 2.0);
        let to = Pose::new(90.0, 30.0, 6.0);
        let mut camera = Camera::new(from);
        let mut control = AnimationControl::new(from, to, ms(400)).with_easing(Easing::QuadInOut);
        control.enable().unwrap();

        run(&mut control, &mut camera, 30, ms(16));
        let pose = camera.pose();
        assert!((pose.yaw - 90.0).abs() < 1e-3);
        assert!((pose.pitch - 30.0).abs() < 1e-3);
        assert!((pose.distance - 6.0).abs() < 1e-3);
        assert!(control.is_finished());
    }

    #[test]
    fn callbacks_fire_once_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut control =
            AnimationControl::new(Pose::default(), Pose::new(45.0, 0.0, 1.0), ms(100));
        for tag in ["first", "second"] {
            let log = Rc::clone(&log);
            control.on_finished(move || log.borrow_mut().push(tag));
        }
        control.enable().unwrap();

        let mut camera = Camera::default();
        run(&mut control, &mut camera, 20, ms(16));
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn disabling_before_completion_suppresses_callbacks() {
        let fired = Rc::new(RefCell::new(false));
        let mut control =
            AnimationControl::new(Pose::default(), Pose::new(45.0, 0.0, 1.0), ms(100));
        let flag = Rc::clone(&fired);
        control.on_finished(move || *flag.borrow_mut() = true);
        control.enable().unwrap();

        let mut camera = Camera::default();
        run(&mut control, &mut camera, 2, ms(16));
        control.disable();
        run(&mut control, &mut camera, 20, ms(16));
        assert!(!*fired.borrow());
        assert!(!control.is_finished());

        control.destroy();
        assert!(control.is_finished());
        assert!(!*fired.borrow());
    }

    #[test]
    fn resumed_transition_keeps_callbacks_cancelled() {
        let fired = Rc::new(RefCell::new(false));
        let mut control =
            AnimationControl::new(Pose::default(), Pose::new(45.0, 0.0, 1.0), ms(100));
        let flag = Rc::clone(&fired);
        control.on_finished(move || *flag.borrow_mut() = true);
        control.enable().unwrap();

        let mut camera = Camera::default();
        run(&mut control, &mut camera, 1, ms(30));
        control.disable();
        control.enable().unwrap();
        run(&mut control, &mut camera, 1, ms(200));

        assert!(control.is_finished());
        assert!((camera.pose().yaw - 45.0).abs() < 1e-3);
        assert!(!*fired.borrow());
    }

    #[test]
    fn clear_finished_drops_callbacks() {
        let fired = Rc::new(RefCell::new(0));
        let mut control = AnimationControl::new(Pose::default(), Pose::default(), ms(10));
        let counter = Rc::clone(&fired);
        control.on_finished(move || *counter.borrow_mut() += 1);
        control.clear_finished();
        control.enable().unwrap();
        control.update(&Camera::default(), ms(20));
        assert_eq!(*fired.borrow(), 0);
        assert!(control.is_finished());
    }

    #[test]
    fn endpoints_are_snapshots() {
        let mut camera = Camera::new(Pose::new(0.0, 0.0, 3.0));
        let control = AnimationControl::new(*camera.pose(), Pose::default(), ms(100));
        camera.set_pose(Pose::new(50.0, 10.0, 8.0));
        assert_eq!(control.from_pose(), &Pose::new(0.0, 0.0, 3.0));
    }
}

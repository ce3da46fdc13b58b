use std::sync::Arc;
use std::time::Duration;

use log::debug;
use parking_lot::Mutex;

use crate::animation::{Animation, AnimationEvent, AnimationEventKind, AnimationState, Repeat};
use crate::easing::Easing;
use crate::events::{Listener, ViewerEvent};
use crate::scene::{AnimationClip, Model};

/// Plays one animation clip of the loaded model.
pub struct ModelAnimator {
    clips: Vec<AnimationClip>,
    clip: Option<usize>,
    repeat: Repeat,
    animation: Option<Animation>,
    inbox: Arc<Mutex<Vec<AnimationEvent>>>,
}

impl ModelAnimator {
    pub fn new(repeat: Repeat) -> Self {
        Self {
            clips: Vec::new(),
            clip: None,
            repeat,
            animation: None,
            inbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Takes over the clips of a newly loaded model and selects the first.
    pub fn set_model(&mut self, model: Option<&Model>) {
        self.clips = model.map(|model| model.clips.clone()).unwrap_or_default();
        self.clip = None;
        self.animation = None;
        if !self.clips.is_empty() {
            self.select(0);
        }
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    pub fn clip(&self) -> Option<&AnimationClip> {
        self.clips.get(self.clip?)
    }

    pub fn repeat(&self) -> Repeat {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: Repeat) {
        self.repeat = repeat;
        if let Some(index) = self.clip {
            let playing = self.is_playing();
            self.select(index);
            if playing {
                self.play();
            }
        }
    }

    /// Switches to the named clip, keeping playback running if it was.
    /// Returns false when the model has no such clip.
    pub fn set_clip(&mut self, name: &str) -> bool {
        let Some(index) = self.clips.iter().position(|clip| clip.name == name) else {
            return false;
        };
        let playing = self.is_playing();
        self.select(index);
        if playing {
            self.play();
        }
        true
    }

    pub fn state(&self) -> AnimationState {
        self.animation
            .as_ref()
            .map_or(AnimationState::Idle, Animation::state)
    }

    pub fn is_playing(&self) -> bool {
        self.state() == AnimationState::Running
    }

    /// Seconds into the current cycle.
    pub fn current_time(&self) -> Duration {
        self.animation
            .as_ref()
            .map_or(Duration::ZERO, Animation::elapsed)
    }

    pub fn play(&mut self) -> bool {
        match self.animation.as_mut() {
            Some(animation) => {
                animation.start();
                true
            }
            None => false,
        }
    }

    pub fn pause(&mut self) {
        if let Some(animation) = self.animation.as_mut() {
            animation.pause();
        }
    }

    pub fn stop(&mut self) {
        if let Some(animation) = self.animation.as_mut() {
            animation.stop();
        }
        self.inbox.lock().clear();
    }

    /// Advances playback and returns the loop and finish events it produced.
    pub fn update(&mut self, delta: Duration) -> Vec<ViewerEvent> {
        let (Some(animation), Some(clip)) = (self.animation.as_mut(), self.clip) else {
            return Vec::new();
        };
        animation.update(delta);
        self.inbox
            .lock()
            .drain(..)
            .filter_map(|event| match event {
                AnimationEvent::Loop { count } => Some(ViewerEvent::AnimationLoop { clip, count }),
                AnimationEvent::Finish => Some(ViewerEvent::AnimationFinish { clip }),
                AnimationEvent::Progress { .. } => None,
            })
            .collect()
    }

    fn select(&mut self, index: usize) {
        let Some(clip) = self.clips.get(index) else {
            return;
        };
        debug!("selected animation clip {:?}", clip.name);
        let mut animation = Animation::new(clip.duration)
            .with_repeat(self.repeat)
            .with_easing(Easing::Linear);
        for kind in [AnimationEventKind::Loop, AnimationEventKind::Finish] {
            let inbox = Arc::clone(&self.inbox);
            let forward: Listener<AnimationEvent> = Arc::new(move |event: &AnimationEvent| inbox.lock().push(*event));
            animation.on(kind, forward);
        }
        self.inbox.lock().clear();
        self.animation = Some(animation);
        self.clip = Some(index);
    }
}

impl Default for ModelAnimator {
    fn default() -> Self {
        Self::new(Repeat::Infinite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{BoundingBox, SceneHandle};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn model() -> Model {
        Model::new("robot", SceneHandle(3), BoundingBox::default()).with_clips(vec![
            AnimationClip::new("Idle", ms(1000)),
            AnimationClip::new("Wave", ms(500)),
        ])
    }

    #[test]
    fn finite_repeat_reports_loops_then_finish() {
        let mut animator = ModelAnimator::new(Repeat::Finite(2));
        animator.set_model(Some(&model()));
        assert!(animator.set_clip("Wave"));
        assert!(animator.play());

        let mut events = Vec::new();
        for _ in 0..10 {
            events.extend(animator.update(ms(200)));
        }
        assert_eq!(
            events,
            vec![
                ViewerEvent::AnimationLoop { clip: 1, count: 1 },
                ViewerEvent::AnimationLoop { clip: 1, count: 2 },
                ViewerEvent::AnimationFinish { clip: 1 },
            ]
        );
        assert_eq!(animator.state(), AnimationState::Finished);
    }

    #[test]
    fn switching_clips_keeps_playing() {
        let mut animator = ModelAnimator::default();
        animator.set_model(Some(&model()));
        assert_eq!(animator.clip().map(|clip| clip.name.as_str()), Some("Idle"));
        animator.play();
        animator.update(ms(300));
        assert!(animator.set_clip("Wave"));
        assert!(animator.is_playing());
        assert_eq!(animator.current_time(), Duration::ZERO);
        assert!(!animator.set_clip("Jump"));
    }

    #[test]
    fn pause_holds_the_current_time() {
        let mut animator = ModelAnimator::default();
        animator.set_model(Some(&model()));
        animator.play();
        animator.update(ms(250));
        animator.pause();
        animator.update(ms(500));
        assert_eq!(animator.current_time(), ms(250));
        animator.stop();
        assert_eq!(animator.current_time(), Duration::ZERO);
    }

    #[test]
    fn models_without_clips_do_nothing() {
        let mut animator = ModelAnimator::default();
        animator.set_model(Some(&Model::new("box", SceneHandle(1), BoundingBox::default())));
        assert!(!animator.play());
        assert!(animator.update(ms(16)).is_empty());
    }
}

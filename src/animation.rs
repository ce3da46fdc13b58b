use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::easing::Easing;
use crate::events::{Event, EventEmitter, Listener, ListenerId};

/// How many extra cycles an [`Animation`] plays after the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    Finite(u32),
    Infinite,
}

impl Default for Repeat {
    fn default() -> Self {
        Repeat::Finite(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    Idle,
    Running,
    Paused,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationEvent {
    Progress { progress: f32, eased: f32 },
    Loop { count: u32 },
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationEventKind {
    Progress,
    Loop,
    Finish,
}

impl Event for AnimationEvent {
    type Kind = AnimationEventKind;

    fn kind(&self) -> AnimationEventKind {
        match self {
            AnimationEvent::Progress { .. } => AnimationEventKind::Progress,
            AnimationEvent::Loop { .. } => AnimationEventKind::Loop,
            AnimationEvent::Finish => AnimationEventKind::Finish,
        }
    }
}

/// What a single [`Animation::update`] call produced.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimationTick {
    pub progress: f32,
    pub eased: f32,
    pub loops: u32,
    pub finished: bool,
}

/// Repeatable, time-driven progress engine.
///
/// `start` is a no-op while running and resumes from a pause without
/// resetting elapsed time; `restart` always begins again from zero.
/// With `Repeat::Finite(n)` a run emits `n` loop events and then one finish.
pub struct Animation {
    duration: Duration,
    repeat: Repeat,
    easing: Easing,
    elapsed: Duration,
    loops_completed: u32,
    state: AnimationState,
    events: EventEmitter<AnimationEvent>,
}

impl Animation {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            repeat: Repeat::default(),
            easing: Easing::CubicOut,
            elapsed: Duration::ZERO,
            loops_completed: 0,
            state: AnimationState::Idle,
            events: EventEmitter::new(),
        }
    }

    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn repeat(&self) -> Repeat {
        self.repeat
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn loops_completed(&self) -> u32 {
        self.loops_completed
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == AnimationState::Running
    }

    /// Fractional position inside the current cycle.
    pub fn progress(&self) -> f32 {
        match self.state {
            AnimationState::Finished => 1.0,
            _ if self.duration.is_zero() => 0.0,
            _ => (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()) as f32,
        }
    }

    pub fn on(&mut self, kind: AnimationEventKind, listener: Listener<AnimationEvent>) -> ListenerId {
        self.events.on(kind, listener)
    }

    pub fn off(&mut self, kind: AnimationEventKind, id: ListenerId) -> bool {
        self.events.off(kind, id)
    }

    pub fn start(&mut self) {
        match self.state {
            AnimationState::Running => {}
            AnimationState::Paused => self.state = AnimationState::Running,
            AnimationState::Idle => self.state = AnimationState::Running,
            AnimationState::Finished => {
                self.rewind();
                self.state = AnimationState::Running;
            }
        }
    }

    pub fn restart(&mut self) {
        self.stop();
        self.start();
    }

    pub fn pause(&mut self) {
        if self.state == AnimationState::Running {
            self.state = AnimationState::Paused;
        }
    }

    pub fn stop(&mut self) {
        self.rewind();
        self.state = AnimationState::Idle;
    }

    fn rewind(&mut self) {
        self.elapsed = Duration::ZERO;
        self.loops_completed = 0;
    }

    fn repeats_left(&self) -> bool {
        match self.repeat {
            Repeat::Infinite => true,
            Repeat::Finite(count) => self.loops_completed < count,
        }
    }

    /// Advances the animation while it is running.
    pub fn update(&mut self, delta: Duration) -> AnimationTick {
        if self.state != AnimationState::Running {
            let progress = self.progress();
            return AnimationTick {
                progress,
                eased: self.easing.apply(progress),
                loops: 0,
                finished: false,
            };
        }

        let mut tick = AnimationTick::default();

        if self.duration.is_zero() {
            // Every update covers at least one whole cycle.
            if let Repeat::Finite(_) = self.repeat {
                while self.repeats_left() {
                    self.complete_loop(&mut tick);
                }
                self.finish(&mut tick);
            } else {
                self.complete_loop(&mut tick);
                self.emit_progress(&mut tick, 0.0);
            }
            return tick;
        }

        self.elapsed += delta;
        loop {
            if self.elapsed < self.duration {
                let progress =
                    (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()) as f32;
                self.emit_progress(&mut tick, progress);
                return tick;
            }
            if !self.repeats_left() {
                self.elapsed = self.duration;
                self.finish(&mut tick);
                return tick;
            }
            self.elapsed -= self.duration;
            self.complete_loop(&mut tick);
        }
    }

    fn emit_progress(&self, tick: &mut AnimationTick, progress: f32) {
        tick.progress = progress;
        tick.eased = self.easing.apply(progress);
        self.events.emit(&AnimationEvent::Progress {
            progress: tick.progress,
            eased: tick.eased,
        });
    }

    fn complete_loop(&mut self, tick: &mut AnimationTick) {
        self.loops_completed += 1;
        tick.loops += 1;
        self.events.emit(&AnimationEvent::Loop {
            count: self.loops_completed,
        });
    }

    fn finish(&mut self, tick: &mut AnimationTick) {
        self.state = AnimationState::Finished;
        self.emit_progress(tick, 1.0);
        tick.finished = true;
        debug!("animation finished after {} loop(s)", self.loops_completed);
        self.events.emit(&AnimationEvent::Finish);
    }
}

impl std::fmt::Debug for Animation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animation")
            .field("duration", &self.duration)
            .field("repeat", &self.repeat)
            .field("elapsed", &self.elapsed)
            .field("loops_completed", &self.loops_completed)
            .field("state", &self.state)
            .finish()
    }
}

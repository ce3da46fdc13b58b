//! Camera, control, animation and AR coordination core of a 3D model
//! viewer.
//!
//! Loading models and drawing them happen outside the crate: a host hands
//! the [`Viewer`] a [`Model`] description and a [`Renderer`], feeds it input
//! through an [`input::InputSurface`] and calls [`Viewer::tick`] once per
//! frame. Everything in between (orbit and auto-rotate controls, smoothing,
//! camera framing, clip playback and AR placement) lives here and runs
//! headless, so it can be driven by tests and the `model-viewer` binary as
//! well as by the browser.

pub mod animation;
pub mod ar;
pub mod camera;
pub mod config;
pub mod control;
pub mod controller;
pub mod easing;
pub mod error;
pub mod events;
pub mod input;
pub mod motion;
pub mod pose;
pub mod render;
pub mod scene;
pub mod scheduler;
pub mod viewer;
#[cfg(target_arch = "wasm32")]
pub mod web;
pub mod xr;

pub use animation::{Animation, AnimationEvent, AnimationState, Repeat};
pub use camera::{Camera, CameraLimits};
pub use config::ViewerConfig;
pub use control::{
    AnimationControl, AutoControl, AutoOptions, Control, OrbitControl, OrbitOptions,
    RotateControl, TranslateControl, ZoomControl,
};
pub use controller::{ControlId, Controller};
pub use easing::Easing;
pub use error::{ControlError, SessionError, XrError};
pub use events::{EventEmitter, ViewerEvent, ViewerEventKind};
pub use input::{
    InputEvent, InputKind, InputSurface, MouseButton, StaticViewport, ViewportProvider,
    VirtualSurface,
};
pub use motion::{Motion, MotionOptions, Range};
pub use pose::{Pose, PoseDelta};
pub use render::{CameraParams, HeadlessRenderer, Renderer};
pub use scene::{AnimationClip, BoundingBox, Model, SceneGraph, SceneHandle, Transform};
pub use scheduler::{FrameClock, FrameScheduler, ManualClock};
pub use viewer::{ModelAnimator, Viewer};
pub use xr::{ArManager, Session, SessionKind, XrPlatform};

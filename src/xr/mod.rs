//! AR session lifecycles: an in-page WebXR session that drives the AR
//! placement controls, and handoffs to the platform's own AR viewers.

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use crate::ar::{HitTestSource, SourceRequest, XrFrame};
use crate::error::{SessionResult, XrError};
use crate::scene::SceneGraph;

mod handoff;
mod manager;
mod webar;

pub use handoff::{
    resolve_source, HandoffLauncher, HandoffOptions, HandoffTarget, NoHandoff, QuickLookSession,
    SceneViewerSession,
};
pub use manager::ArManager;
pub use webar::WebArSession;

pub type SessionRequest = LocalBoxFuture<'static, Result<(), XrError>>;

/// The device's XR runtime, as seen by a WebXR session.
pub trait XrPlatform {
    fn is_ar_supported(&self) -> bool;

    /// Asks for an immersive AR session. Resolves once the user granted it.
    fn request_session(&self) -> SessionRequest;

    fn request_hit_test_source(&self) -> SourceRequest;

    fn release_hit_test_source(&self, source: HitTestSource);

    fn end_session(&self);
}

/// Platform without any AR runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoXr;

impl XrPlatform for NoXr {
    fn is_ar_supported(&self) -> bool {
        false
    }

    fn request_session(&self) -> SessionRequest {
        Box::pin(async { Err(XrError::Unsupported) })
    }

    fn request_hit_test_source(&self) -> SourceRequest {
        Box::pin(async { Err(XrError::HitTestUnavailable("no XR runtime".into())) })
    }

    fn release_hit_test_source(&self, _source: HitTestSource) {}

    fn end_session(&self) {}
}

/// Operating system facts used to pick a handoff viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlatformInfo {
    pub android: bool,
    pub ios: bool,
}

impl PlatformInfo {
    pub fn from_user_agent(agent: &str) -> Self {
        let ios = ["iPhone", "iPad", "iPod"]
            .iter()
            .any(|device| agent.contains(device));
        Self {
            android: agent.contains("Android"),
            ios,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrSessionState {
    Inactive,
    /// Waiting for the platform to grant the session.
    Requesting,
    Active,
    /// Tearing down; the scene is restored before returning to inactive.
    Ending,
}

/// What happened to a session during a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    End,
    CanPlace,
    ModelPlaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    #[serde(rename = "webxr")]
    WebXr,
    #[serde(rename = "scene-viewer")]
    SceneViewer,
    #[serde(rename = "quick-look")]
    QuickLook,
}

impl SessionKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "webxr" => Some(SessionKind::WebXr),
            "scene-viewer" => Some(SessionKind::SceneViewer),
            "quick-look" => Some(SessionKind::QuickLook),
            _ => None,
        }
    }
}

/// One way of showing the model in AR.
///
/// A WebXR session runs inside the page and receives XR frames. Handoff
/// sessions launch an external viewer and are done as soon as `enter`
/// returns; they never become active.
pub enum Session {
    WebXr(WebArSession),
    SceneViewer(SceneViewerSession),
    QuickLook(QuickLookSession),
}

impl Session {
    pub fn kind(&self) -> SessionKind {
        match self {
            Session::WebXr(_) => SessionKind::WebXr,
            Session::SceneViewer(_) => SessionKind::SceneViewer,
            Session::QuickLook(_) => SessionKind::QuickLook,
        }
    }

    pub fn is_available(&self, scene: &SceneGraph) -> bool {
        match self {
            Session::WebXr(session) => session.is_available(scene),
            Session::SceneViewer(session) => session.is_available(scene),
            Session::QuickLook(session) => session.is_available(scene),
        }
    }

    pub fn state(&self) -> XrSessionState {
        match self {
            Session::WebXr(session) => session.state(),
            Session::SceneViewer(_) | Session::QuickLook(_) => XrSessionState::Inactive,
        }
    }

    /// Starts the session without waiting for the platform. A WebXR session
    /// is left requesting; see [`Session::poll_start`].
    pub fn begin(&mut self, scene: &SceneGraph) -> SessionResult<Vec<SessionEvent>> {
        match self {
            Session::WebXr(session) => session.request(scene).map(|()| Vec::new()),
            Session::SceneViewer(session) => session.enter(scene).map(|()| Vec::new()),
            Session::QuickLook(session) => session.enter(scene).map(|()| Vec::new()),
        }
    }

    /// Completes a pending WebXR request if the platform answered.
    pub fn poll_start(&mut self, scene: &SceneGraph) -> Option<SessionResult<Vec<SessionEvent>>> {
        match self {
            Session::WebXr(session) => session.poll_start(scene),
            Session::SceneViewer(_) | Session::QuickLook(_) => None,
        }
    }

    pub async fn enter(&mut self, scene: &SceneGraph) -> SessionResult<Vec<SessionEvent>> {
        match self {
            Session::WebXr(session) => session.enter(scene).await,
            Session::SceneViewer(session) => session.enter(scene).map(|()| Vec::new()),
            Session::QuickLook(session) => session.enter(scene).map(|()| Vec::new()),
        }
    }

    pub fn on_frame(&mut self, frame: &XrFrame, scene: &SceneGraph) -> Vec<SessionEvent> {
        match self {
            Session::WebXr(session) => session.on_frame(frame, scene),
            Session::SceneViewer(_) | Session::QuickLook(_) => Vec::new(),
        }
    }

    /// Confirms placement of the model. Only an in-page session places it.
    pub fn place(&mut self, scene: &SceneGraph) -> Option<SessionEvent> {
        match self {
            Session::WebXr(session) => session.place(scene),
            Session::SceneViewer(_) | Session::QuickLook(_) => None,
        }
    }

    pub fn exit(&mut self, scene: &SceneGraph) -> Vec<SessionEvent> {
        match self {
            Session::WebXr(session) => session.exit(scene),
            Session::SceneViewer(_) | Session::QuickLook(_) => Vec::new(),
        }
    }
}

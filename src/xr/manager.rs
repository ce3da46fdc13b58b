use std::rc::Rc;

use log::debug;

use super::{
    HandoffLauncher, HandoffOptions, PlatformInfo, QuickLookSession, SceneViewerSession, Session,
    SessionEvent, SessionKind, WebArSession, XrPlatform, XrSessionState,
};
use crate::ar::{ArOptions, XrFrame};
use crate::error::{SessionError, SessionResult};
use crate::scene::SceneGraph;

/// Picks the first usable AR mode and keeps at most one session running.
pub struct ArManager {
    sessions: Vec<Session>,
    active: Option<usize>,
}

impl ArManager {
    /// Candidates in the default order: WebXR, Scene Viewer, Quick Look.
    pub fn new(
        platform: Rc<dyn XrPlatform>,
        launcher: Rc<dyn HandoffLauncher>,
        info: PlatformInfo,
        ar: ArOptions,
        handoff: HandoffOptions,
    ) -> Self {
        Self::with_sessions(vec![
            Session::WebXr(WebArSession::new(platform, ar)),
            Session::SceneViewer(SceneViewerSession::new(
                Rc::clone(&launcher),
                info,
                handoff.clone(),
            )),
            Session::QuickLook(QuickLookSession::new(launcher, info, handoff)),
        ])
    }

    pub fn with_sessions(sessions: Vec<Session>) -> Self {
        Self {
            sessions,
            active: None,
        }
    }

    /// Keeps only the listed modes, in the listed order.
    pub fn with_modes(mut self, modes: &[SessionKind]) -> Self {
        let mut sessions = std::mem::take(&mut self.sessions);
        self.sessions = modes
            .iter()
            .filter_map(|kind| {
                let index = sessions.iter().position(|session| session.kind() == *kind)?;
                Some(sessions.remove(index))
            })
            .collect();
        self.active = None;
        self
    }

    pub fn modes(&self) -> Vec<SessionKind> {
        self.sessions.iter().map(Session::kind).collect()
    }

    pub fn is_available(&self, scene: &SceneGraph) -> bool {
        self.sessions
            .iter()
            .any(|session| session.is_available(scene))
    }

    /// Whether a session is requesting or running.
    pub fn is_active(&self) -> bool {
        self.active_session()
            .is_some_and(|session| session.state() != XrSessionState::Inactive)
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.sessions.get(self.active?)
    }

    pub fn active_session_mut(&mut self) -> Option<&mut Session> {
        let index = self.active?;
        self.sessions.get_mut(index)
    }

    fn choose(&mut self, scene: &SceneGraph) -> SessionResult<usize> {
        if self.is_active() {
            return Err(SessionError::AlreadyActive);
        }
        if !scene.has_model() {
            return Err(SessionError::NotSupported("no model loaded".into()));
        }
        let index = self
            .sessions
            .iter()
            .position(|session| session.is_available(scene))
            .ok_or_else(|| SessionError::NotSupported("no AR mode available on this device".into()))?;
        debug!("entering AR through {:?}", self.sessions[index].kind());
        Ok(index)
    }

    /// Starts the first available mode without blocking. A WebXR session is
    /// left requesting until [`ArManager::poll`] sees the platform's answer.
    pub fn begin(&mut self, scene: &SceneGraph) -> SessionResult<Vec<SessionEvent>> {
        let index = self.choose(scene)?;
        let events = self.sessions[index].begin(scene)?;
        self.active = Some(index);
        Ok(events)
    }

    /// Settles a pending WebXR request. A rejected request leaves no active
    /// session behind.
    pub fn poll(&mut self, scene: &SceneGraph) -> Option<SessionResult<Vec<SessionEvent>>> {
        let result = self.active_session_mut()?.poll_start(scene);
        if matches!(result, Some(Err(_))) {
            self.active = None;
        }
        result
    }

    pub async fn enter(&mut self, scene: &SceneGraph) -> SessionResult<Vec<SessionEvent>> {
        let index = self.choose(scene)?;
        let events = self.sessions[index].enter(scene).await?;
        self.active = Some(index);
        Ok(events)
    }

    pub fn on_frame(&mut self, frame: &XrFrame, scene: &SceneGraph) -> Vec<SessionEvent> {
        match self.active_session_mut() {
            Some(session) => session.on_frame(frame, scene),
            None => Vec::new(),
        }
    }

    pub fn place(&mut self, scene: &SceneGraph) -> Option<SessionEvent> {
        self.active_session_mut()?.place(scene)
    }

    /// Ends the active session, if any.
    pub fn exit(&mut self, scene: &SceneGraph) -> Vec<SessionEvent> {
        let Some(index) = self.active.take() else {
            return Vec::new();
        };
        self.sessions[index].exit(scene)
    }
}

use std::rc::Rc;
use std::task::{Context, Poll};

use futures::task::noop_waker_ref;
use futures::FutureExt;
use log::{debug, info, warn};

use super::{SessionEvent, SessionRequest, XrPlatform, XrSessionState};
use crate::ar::{ArControl, ArEvent, ArOptions, HitTest, XrFrame};
use crate::error::{SessionError, SessionResult, XrError};
use crate::scene::{SceneGraph, Transform};

/// In-page immersive AR session.
///
/// While active, every XR frame runs the viewer hit test and hands the
/// result to the session's [`ArControl`]. The ordinary scene is hidden for
/// the session's lifetime and the model's root transform is put back when
/// the session ends.
pub struct WebArSession {
    platform: Rc<dyn XrPlatform>,
    options: ArOptions,
    state: XrSessionState,
    pending: Option<SessionRequest>,
    control: Option<ArControl>,
    hit_test: HitTest,
    saved_root: Option<Transform>,
}

impl WebArSession {
    pub fn new(platform: Rc<dyn XrPlatform>, options: ArOptions) -> Self {
        Self {
            platform,
            options,
            state: XrSessionState::Inactive,
            pending: None,
            control: None,
            hit_test: HitTest::new(),
            saved_root: None,
        }
    }

    pub fn state(&self) -> XrSessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == XrSessionState::Active
    }

    pub fn options(&self) -> &ArOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ArOptions) {
        self.options = options;
    }

    /// Placement control of the current session, or of the last one after
    /// it ended.
    pub fn control(&self) -> Option<&ArControl> {
        self.control.as_ref()
    }

    pub fn control_mut(&mut self) -> Option<&mut ArControl> {
        self.control.as_mut()
    }

    pub fn is_available(&self, scene: &SceneGraph) -> bool {
        scene.has_model() && self.platform.is_ar_supported()
    }

    /// Checks the preconditions and asks the platform for a session.
    pub fn request(&mut self, scene: &SceneGraph) -> SessionResult<()> {
        if self.state != XrSessionState::Inactive {
            return Err(SessionError::AlreadyActive);
        }
        if !scene.has_model() {
            return Err(SessionError::NotSupported("no model loaded".into()));
        }
        if !self.platform.is_ar_supported() {
            return Err(SessionError::NotSupported(
                "immersive-ar sessions are not supported".into(),
            ));
        }
        debug!("requesting WebXR session");
        self.pending = Some(self.platform.request_session());
        self.state = XrSessionState::Requesting;
        Ok(())
    }

    /// Finishes a pending request once the platform has answered.
    pub fn poll_start(&mut self, scene: &SceneGraph) -> Option<SessionResult<Vec<SessionEvent>>> {
        let request = self.pending.as_mut()?;
        let mut cx = Context::from_waker(noop_waker_ref());
        match request.poll_unpin(&mut cx) {
            Poll::Pending => None,
            Poll::Ready(result) => {
                self.pending = None;
                Some(self.settle(result, scene))
            }
        }
    }

    /// Requests a session and waits for the platform to grant it.
    pub async fn enter(&mut self, scene: &SceneGraph) -> SessionResult<Vec<SessionEvent>> {
        self.request(scene)?;
        let Some(request) = self.pending.take() else {
            return Err(SessionError::AlreadyActive);
        };
        let result = request.await;
        self.settle(result, scene)
    }

    fn settle(
        &mut self,
        result: Result<(), XrError>,
        scene: &SceneGraph,
    ) -> SessionResult<Vec<SessionEvent>> {
        match result {
            Ok(()) => Ok(self.on_start(scene)),
            Err(err) => {
                warn!("WebXR session request failed: {err}");
                self.state = XrSessionState::Inactive;
                Err(err.into())
            }
        }
    }

    fn on_start(&mut self, scene: &SceneGraph) -> Vec<SessionEvent> {
        self.saved_root = Some(scene.root());
        scene.set_visible(false);

        let mut control = ArControl::new(&self.options);
        control.enable();
        self.control = Some(control);
        self.hit_test.request(self.platform.request_hit_test_source());
        self.state = XrSessionState::Active;
        info!("AR session started ({:?} placement)", self.options.placement);
        vec![SessionEvent::Start]
    }

    /// Runs hit testing and placement for one XR frame.
    pub fn on_frame(&mut self, frame: &XrFrame, scene: &SceneGraph) -> Vec<SessionEvent> {
        if self.state != XrSessionState::Active {
            return Vec::new();
        }
        let Some(control) = self.control.as_mut() else {
            return Vec::new();
        };
        let hit = self.hit_test.hit(frame, control.surface());
        control
            .update(frame, hit, scene)
            .into_iter()
            .map(|event| match event {
                ArEvent::CanPlace => SessionEvent::CanPlace,
                ArEvent::ModelPlaced => SessionEvent::ModelPlaced,
            })
            .collect()
    }

    /// Confirms placement at the current candidate, as a tap would.
    pub fn place(&mut self, scene: &SceneGraph) -> Option<SessionEvent> {
        if self.state != XrSessionState::Active {
            return None;
        }
        self.control
            .as_mut()?
            .place(scene)
            .map(|_| SessionEvent::ModelPlaced)
    }

    /// Ends the session. Calling it on an inactive session does nothing.
    pub fn exit(&mut self, scene: &SceneGraph) -> Vec<SessionEvent> {
        match self.state {
            XrSessionState::Inactive | XrSessionState::Ending => Vec::new(),
            XrSessionState::Requesting => {
                debug!("WebXR session request abandoned");
                self.pending = None;
                self.state = XrSessionState::Inactive;
                Vec::new()
            }
            XrSessionState::Active => {
                self.state = XrSessionState::Ending;
                self.on_end(scene);
                self.state = XrSessionState::Inactive;
                vec![SessionEvent::End]
            }
        }
    }

    fn on_end(&mut self, scene: &SceneGraph) {
        if let Some(control) = self.control.as_mut() {
            control.destroy();
        }
        if let Some(source) = self.hit_test.cancel() {
            self.platform.release_hit_test_source(source);
        }
        self.platform.end_session();
        if let Some(root) = self.saved_root.take() {
            scene.set_root(root);
        }
        scene.set_visible(true);
        info!("AR session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ar::{HitTestResult, HitTestSource, PlacementState};
    use crate::scene::{BoundingBox, Model, SceneHandle};
    use crate::xr::test_support::FakeXr;
    use glam::Vec3;

    fn scene_with_model() -> SceneGraph {
        let scene = SceneGraph::new();
        scene.replace_model(Some(Model::new(
            "chair",
            SceneHandle(1),
            BoundingBox::default(),
        )));
        scene
    }

    fn session(platform: &Rc<FakeXr>) -> WebArSession {
        let shared: Rc<dyn XrPlatform> = platform.clone();
        WebArSession::new(shared, ArOptions::default())
    }

    fn floor_frame(position: Vec3) -> XrFrame {
        XrFrame {
            hits: vec![HitTestResult::floor(position)],
            ..XrFrame::default()
        }
    }

    fn started(platform: &Rc<FakeXr>, scene: &SceneGraph) -> WebArSession {
        let mut session = session(platform);
        session.request(scene).unwrap();
        platform.grant();
        let events = session.poll_start(scene).unwrap().unwrap();
        assert_eq!(events, vec![SessionEvent::Start]);
        session
    }

    #[test]
    fn enter_requires_a_model() {
        let platform = Rc::new(FakeXr::supported());
        let mut session = session(&platform);
        let result = session.request(&SceneGraph::new());
        assert!(matches!(result, Err(SessionError::NotSupported(_))));
        assert_eq!(session.state(), XrSessionState::Inactive);
    }

    #[test]
    fn enter_requires_platform_support() {
        let platform = Rc::new(FakeXr::default());
        let mut session = session(&platform);
        let result = session.request(&scene_with_model());
        assert!(matches!(result, Err(SessionError::NotSupported(_))));
    }

    #[test]
    fn second_enter_is_rejected() {
        let platform = Rc::new(FakeXr::supported());
        let scene = scene_with_model();
        let mut session = session(&platform);
        session.request(&scene).unwrap();
        assert_eq!(session.request(&scene), Err(SessionError::AlreadyActive));
    }

    #[test]
    fn start_hides_scene_and_frames_place_the_model() {
        let platform = Rc::new(FakeXr::supported());
        let scene = scene_with_model();
        let mut session = started(&platform, &scene);
        assert!(!scene.is_visible());
        assert!(session.control().is_some_and(ArControl::is_enabled));

        // No hits flow until the hit-test source resolves.
        let hit = Vec3::new(0.4, 0.0, -1.3);
        session.on_frame(&floor_frame(hit), &scene);
        assert_ne!(scene.root().position, hit);

        assert!(platform.provide_source(HitTestSource(9)));
        session.on_frame(&floor_frame(hit), &scene);
        assert!((scene.root().position - hit).length() < 1e-6);
        assert_eq!(
            session.control().map(ArControl::state),
            Some(PlacementState::Candidate)
        );
    }

    #[test]
    fn exit_mid_session_restores_the_scene() {
        let platform = Rc::new(FakeXr::supported());
        let scene = scene_with_model();
        let mut session = started(&platform, &scene);
        assert!(platform.provide_source(HitTestSource(2)));
        session.on_frame(&floor_frame(Vec3::new(1.0, 0.0, -1.0)), &scene);

        assert_eq!(session.exit(&scene), vec![SessionEvent::End]);
        assert!(scene.is_visible());
        assert_eq!(scene.root(), Transform::IDENTITY);
        assert!(!session.control().is_some_and(ArControl::is_enabled));
        assert_eq!(*platform.released.borrow(), vec![HitTestSource(2)]);
        assert_eq!(platform.ended.get(), 1);

        assert!(session.exit(&scene).is_empty());
        assert_eq!(platform.ended.get(), 1);
    }

    #[test]
    fn exit_before_hit_test_source_cancels_it() {
        let platform = Rc::new(FakeXr::supported());
        let scene = scene_with_model();
        let mut session = started(&platform, &scene);
        session.exit(&scene);
        assert!(!platform.provide_source(HitTestSource(5)));
        assert!(platform.released.borrow().is_empty());
    }

    #[test]
    fn rejected_request_leaves_session_inactive() {
        let platform = Rc::new(FakeXr::supported());
        let scene = scene_with_model();
        let mut session = session(&platform);
        session.request(&scene).unwrap();
        assert!(session.poll_start(&scene).is_none());
        platform.reject("user declined");
        let result = session.poll_start(&scene).unwrap();
        assert_eq!(
            result,
            Err(SessionError::Platform(XrError::SessionRejected(
                "user declined".into()
            )))
        );
        assert_eq!(session.state(), XrSessionState::Inactive);
        assert!(scene.is_visible());
    }

    #[test]
    fn async_enter_resolves_with_start() {
        let platform = Rc::new(FakeXr::supported());
        let scene = scene_with_model();
        let mut session = session(&platform);
        let grant = {
            let platform = Rc::clone(&platform);
            async move { platform.grant() }
        };
        let (events, ()) = pollster::block_on(futures::future::join(session.enter(&scene), grant));
        assert_eq!(events, Ok(vec![SessionEvent::Start]));
        assert!(session.is_active());
    }
}

//! The embeddable viewer: one camera, one model and the controls, AR
//! sessions and animation playback around them, advanced one frame at a
//! time by the host.

use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use glam::Vec2;
use log::{debug, info, warn};

use crate::ar::XrFrame;
use crate::camera::Camera;
use crate::config::ViewerConfig;
use crate::control::{AutoControl, OrbitControl};
use crate::controller::{ControlId, Controller};
use crate::error::{ControlError, SessionResult};
use crate::events::{EventEmitter, Listener, ListenerId, ViewerEvent, ViewerEventKind};
use crate::input::{SharedSurface, ViewportProvider};
use crate::pose::Pose;
use crate::render::Renderer;
use crate::scene::{Model, SceneGraph, SceneHandle, Transform};
use crate::xr::{
    ArManager, HandoffLauncher, NoHandoff, NoXr, PlatformInfo, SessionEvent, XrPlatform,
    XrSessionState,
};

mod animator;

pub use animator::ModelAnimator;

pub struct Viewer<R: Renderer> {
    config: ViewerConfig,
    camera: Camera,
    controller: Controller,
    orbit: ControlId,
    auto: ControlId,
    reset: Option<ControlId>,
    attached: bool,
    scene: SceneGraph,
    animator: ModelAnimator,
    ar: ArManager,
    events: EventEmitter<ViewerEvent>,
    renderer: R,
    viewport: Option<Arc<dyn ViewportProvider>>,
    size: Vec2,
    last_revision: u64,
    frames: u64,
    destroyed: bool,
}

impl<R: Renderer> Viewer<R> {
    /// Builds a viewer without AR support. See [`Viewer::with_ar`].
    pub fn new(config: ViewerConfig, renderer: R) -> Self {
        let mut camera = Camera::with_limits(initial_pose(&config), config.camera.limits);
        camera.set_fov(config.camera.fov);

        let mut controller = Controller::new();
        let orbit = controller.add(Box::new(OrbitControl::with_options(config.orbit.options)));
        let auto = controller.add(Box::new(AutoControl::new(config.autoplay.options)));

        let ar = build_ar(
            &config,
            Rc::new(NoXr),
            Rc::new(NoHandoff),
            PlatformInfo::default(),
        );
        let last_revision = camera.revision();
        Self {
            config,
            camera,
            controller,
            orbit,
            auto,
            reset: None,
            attached: false,
            scene: SceneGraph::new(),
            animator: ModelAnimator::default(),
            ar,
            events: EventEmitter::new(),
            renderer,
            viewport: None,
            size: Vec2::ONE,
            last_revision,
            frames: 0,
            destroyed: false,
        }
    }

    /// Replaces the AR runtime, keeping the modes listed in the config.
    pub fn with_ar(
        mut self,
        platform: Rc<dyn XrPlatform>,
        launcher: Rc<dyn HandoffLauncher>,
        info: PlatformInfo,
    ) -> Self {
        self.ar = build_ar(&self.config, platform, launcher, info);
        self
    }

    /// Polls `viewport` for the canvas size at the start of every frame.
    pub fn with_viewport(mut self, viewport: Arc<dyn ViewportProvider>) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn pose(&self) -> Pose {
        *self.camera.pose()
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    pub fn orbit_control(&self) -> Option<&OrbitControl> {
        self.controller.get_as(self.orbit)
    }

    pub fn auto_control(&self) -> Option<&AutoControl> {
        self.controller.get_as(self.auto)
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn animator(&self) -> &ModelAnimator {
        &self.animator
    }

    pub fn animator_mut(&mut self) -> &mut ModelAnimator {
        &mut self.animator
    }

    pub fn ar(&self) -> &ArManager {
        &self.ar
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Frames drawn to the page so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn on(&mut self, kind: ViewerEventKind, listener: Listener<ViewerEvent>) -> ListenerId {
        self.events.on(kind, listener)
    }

    pub fn off(&mut self, kind: ViewerEventKind, id: ListenerId) -> bool {
        self.events.off(kind, id)
    }

    /// Hands the input element to every control and enables the ones the
    /// config asks for.
    pub fn attach(&mut self, element: SharedSurface) -> Result<(), ControlError> {
        self.controller.set_element(Some(element));
        self.attached = true;
        self.enable_controls()
    }

    /// Removes the input element; every control stops listening.
    pub fn detach(&mut self) {
        self.controller.set_element(None);
        self.attached = false;
    }

    pub fn resize(&mut self, size: Vec2) {
        if size == self.size {
            return;
        }
        debug!("viewer resized to {}x{}", size.x, size.y);
        self.size = size;
        self.controller.resize(size);
        self.renderer.resize(size);
    }

    pub fn set_orbit_enabled(&mut self, enabled: bool) -> Result<(), ControlError> {
        self.config.orbit.enabled = enabled;
        toggle(&mut self.controller, self.orbit, enabled && self.attached)
    }

    pub fn set_autoplay_enabled(&mut self, enabled: bool) -> Result<(), ControlError> {
        self.config.autoplay.enabled = enabled;
        toggle(&mut self.controller, self.auto, enabled && self.attached)
    }

    fn enable_controls(&mut self) -> Result<(), ControlError> {
        if !self.attached {
            return Ok(());
        }
        toggle(&mut self.controller, self.orbit, self.config.orbit.enabled)?;
        toggle(&mut self.controller, self.auto, self.config.autoplay.enabled)
    }

    /// Swaps in a new model. A running AR session ends first; the camera is
    /// framed on the new bounds and the controls re-based on the new pose.
    pub fn load_model(&mut self, model: Model) -> Option<Arc<Model>> {
        if self.destroyed {
            warn!("load_model called on a destroyed viewer");
            return None;
        }
        let events = self.ar.exit(&self.scene);
        self.handle_session_events(events);
        if let Some(id) = self.reset.take() {
            if let Some(mut control) = self.controller.remove(id) {
                control.destroy();
            }
        }

        let bounds = model.bounds;
        let name = model.name.clone();
        let previous = self.scene.replace_model(Some(model));
        self.scene.set_root(Transform::default());

        let fitted = self.camera.fit_model(&bounds);
        if let Some(orbit) = self.config.camera.orbit {
            let pose = Pose {
                pivot: self.config.camera.pivot.unwrap_or(fitted.pivot),
                ..orbit
            };
            self.camera.set_default_pose(pose);
            self.camera.set_pose(pose);
        } else if let Some(pivot) = self.config.camera.pivot {
            let pose = Pose { pivot, ..fitted };
            self.camera.set_default_pose(pose);
            self.camera.set_pose(pose);
        }
        self.controller.sync(&self.camera);

        self.animator.set_model(self.scene.model().as_deref());
        info!("loaded model {name:?}");
        self.events.emit(&ViewerEvent::ModelLoaded { name });
        previous
    }

    /// Loads the model described by the `<model>` section, selecting and
    /// starting its configured animation.
    pub fn load_configured_model(&mut self, handle: SceneHandle) -> Result<()> {
        let model = self
            .config
            .model
            .clone()
            .context("the configuration has no <model> section")?;
        self.animator.set_repeat(model.repeat);
        self.load_model(model.to_model(handle));
        if let Some(clip) = &model.animation {
            if !self.animator.set_clip(clip) {
                warn!("model {:?} has no animation named {clip:?}", model.name);
            }
        }
        if model.autoplay {
            self.animator.play();
        }
        Ok(())
    }

    /// Animates the camera back to its default pose.
    pub fn reset_camera(&mut self) -> Result<(), ControlError> {
        if let Some(id) = self.reset.take() {
            if let Some(mut control) = self.controller.remove(id) {
                control.destroy();
            }
        }
        let camera = &self.config.camera;
        if let Some(control) = self.camera.reset(camera.interpolation, camera.easing) {
            self.reset = Some(self.controller.add_enabled(Box::new(control))?);
        }
        Ok(())
    }

    /// Picks a camera reset paused by an AR session back up.
    fn resume_reset(&mut self) {
        let Some(id) = self.reset else {
            return;
        };
        match self.controller.get_mut(id) {
            Some(control) => {
                if let Err(err) = control.enable() {
                    warn!("camera reset not resumed after AR: {err}");
                }
            }
            None => self.reset = None,
        }
    }

    /// Whether an immersive session currently owns the frame loop.
    pub fn is_presenting(&self) -> bool {
        self.ar
            .active_session()
            .is_some_and(|session| session.state() == XrSessionState::Active)
    }

    pub fn can_activate_ar(&self) -> bool {
        self.config.ar.enabled && self.ar.is_available(&self.scene)
    }

    /// Starts the first available AR mode. An in-page session reports
    /// `ArStart` from a later [`Viewer::tick`] once the platform grants it.
    pub fn enter_ar(&mut self) -> SessionResult<()> {
        let events = self.ar.begin(&self.scene)?;
        self.handle_session_events(events);
        Ok(())
    }

    /// Starts AR and waits for the platform's answer.
    pub async fn enter_ar_async(&mut self) -> SessionResult<()> {
        let events = self.ar.enter(&self.scene).await?;
        self.handle_session_events(events);
        Ok(())
    }

    pub fn exit_ar(&mut self) {
        let events = self.ar.exit(&self.scene);
        self.handle_session_events(events);
    }

    /// Places the model at the current AR candidate, as a tap would.
    pub fn place_model(&mut self) -> bool {
        match self.ar.place(&self.scene) {
            Some(event) => {
                self.handle_session_events(vec![event]);
                true
            }
            None => false,
        }
    }

    /// Runs one page frame: controls, one camera update, animation and the
    /// draw call. Does nothing to the camera while an immersive session runs.
    pub fn tick(&mut self, delta: Duration) {
        if self.destroyed {
            return;
        }
        if let Some(viewport) = &self.viewport {
            let size = viewport.viewport_vec();
            self.resize(size);
        }
        self.poll_ar();
        if self.is_presenting() {
            return;
        }

        self.controller.update(&mut self.camera, delta);
        if self.reset.is_some_and(|id| !self.controller.contains(id)) {
            self.reset = None;
        }
        if self.camera.revision() != self.last_revision {
            self.last_revision = self.camera.revision();
            self.events.emit(&ViewerEvent::PoseChange(*self.camera.pose()));
        }
        self.advance_animation(delta);

        let state = self.scene.snapshot();
        if state.visible {
            self.renderer.render(&state, &self.camera);
            self.frames += 1;
        }
    }

    /// Runs one frame of the immersive session.
    pub fn xr_frame(&mut self, frame: &XrFrame) {
        if self.destroyed {
            return;
        }
        self.poll_ar();
        if !self.is_presenting() {
            return;
        }
        let events = self.ar.on_frame(frame, &self.scene);
        self.handle_session_events(events);
        self.advance_animation(frame.delta);
        self.renderer.render_xr(&self.scene.snapshot(), &frame.viewer);
    }

    /// Tears everything down. Later calls do nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            warn!("viewer destroyed twice");
            return;
        }
        self.exit_ar();
        self.controller.destroy();
        self.animator.stop();
        self.events.clear();
        self.attached = false;
        self.destroyed = true;
        info!("viewer destroyed");
    }

    fn poll_ar(&mut self) {
        match self.ar.poll(&self.scene) {
            Some(Ok(events)) => self.handle_session_events(events),
            Some(Err(err)) => warn!("AR session did not start: {err}"),
            None => {}
        }
    }

    fn advance_animation(&mut self, delta: Duration) {
        for event in self.animator.update(delta) {
            self.events.emit(&event);
        }
    }

    fn handle_session_events(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            let event = match event {
                SessionEvent::Start => {
                    self.controller.disable_all();
                    ViewerEvent::ArStart
                }
                SessionEvent::End => {
                    if let Err(err) = self.enable_controls() {
                        warn!("controls not restored after AR: {err}");
                    }
                    self.resume_reset();
                    ViewerEvent::ArEnd
                }
                SessionEvent::CanPlace => ViewerEvent::CanPlace,
                SessionEvent::ModelPlaced => ViewerEvent::ModelPlaced,
            };
            self.events.emit(&event);
        }
    }
}

fn initial_pose(config: &ViewerConfig) -> Pose {
    let mut pose = config.camera.orbit.unwrap_or_default();
    if let Some(pivot) = config.camera.pivot {
        pose.pivot = pivot;
    }
    pose
}

fn build_ar(
    config: &ViewerConfig,
    platform: Rc<dyn XrPlatform>,
    launcher: Rc<dyn HandoffLauncher>,
    info: PlatformInfo,
) -> ArManager {
    if !config.ar.enabled {
        return ArManager::with_sessions(Vec::new());
    }
    ArManager::new(
        platform,
        launcher,
        info,
        config.ar.options,
        config.ar.handoff.clone(),
    )
    .with_modes(&config.ar.modes)
}

fn toggle(controller: &mut Controller, id: ControlId, enabled: bool) -> Result<(), ControlError> {
    let Some(control) = controller.get_mut(id) else {
        return Ok(());
    };
    if enabled {
        control.enable()
    } else {
        control.disable();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use parking_lot::Mutex;

    use crate::ar::{HitTestResult, HitTestSource};
    use crate::config::ModelConfig;
    use crate::control::test_support::{drag, surface};
    use crate::input::MouseButton;
    use crate::render::HeadlessRenderer;
    use crate::scene::{AnimationClip, BoundingBox};
    use crate::xr::test_support::FakeXr;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn chair() -> Model {
        Model::new(
            "chair",
            SceneHandle(7),
            BoundingBox::from_center_size(Vec3::new(0.0, 1.0, 0.0), Vec3::splat(2.0)),
        )
        .with_src("chair.glb")
    }

    fn record(
        viewer: &mut Viewer<HeadlessRenderer>,
        kinds: &[ViewerEventKind],
    ) -> Arc<Mutex<Vec<ViewerEvent>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in kinds {
            let sink = Arc::clone(&log);
            viewer.on(*kind, Arc::new(move |event: &ViewerEvent| sink.lock().push(event.clone())));
        }
        log
    }

    fn autoplay_config(speed: f32) -> ViewerConfig {
        let mut config = ViewerConfig::default();
        config.autoplay.enabled = true;
        config.autoplay.options.speed = speed;
        config
    }

    #[test]
    fn autoplay_rotates_and_reports_pose_changes() {
        let mut viewer = Viewer::new(autoplay_config(90.0), HeadlessRenderer::new());
        let (_surface, element) = surface();
        viewer.attach(element).unwrap();
        viewer.load_model(chair());
        let log = record(&mut viewer, &[ViewerEventKind::PoseChange]);
        let start = viewer.pose().yaw;

        viewer.tick(ms(1000));

        assert!((viewer.pose().yaw - (start + 90.0)).abs() < 1e-3);
        assert_eq!(log.lock().as_slice(), &[ViewerEvent::PoseChange(viewer.pose())]);
        assert_eq!(viewer.renderer().frames(), 1);
        assert_eq!(viewer.frames(), 1);
    }

    #[test]
    fn still_camera_reports_nothing() {
        let mut viewer = Viewer::new(ViewerConfig::default(), HeadlessRenderer::new());
        viewer.load_model(chair());
        viewer.tick(ms(16));
        let log = record(&mut viewer, &[ViewerEventKind::PoseChange]);
        viewer.tick(ms(16));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn loading_a_model_frames_it() {
        let mut viewer = Viewer::new(ViewerConfig::default(), HeadlessRenderer::new());
        let log = record(&mut viewer, &[ViewerEventKind::ModelLoaded]);
        assert!(viewer.load_model(chair()).is_none());

        let pose = viewer.pose();
        assert_eq!(pose.pivot, Vec3::new(0.0, 1.0, 0.0));
        assert!(pose.distance > 3f32.sqrt());
        assert_eq!(viewer.camera().default_pose(), &pose);
        assert_eq!(
            log.lock().as_slice(),
            &[ViewerEvent::ModelLoaded {
                name: "chair".into()
            }]
        );

        let previous = viewer.load_model(Model::new("lamp", SceneHandle(8), BoundingBox::default()));
        assert_eq!(previous.map(|model| model.name.clone()), Some("chair".to_string()));
    }

    #[test]
    fn configured_orbit_overrides_the_framing() {
        let mut config = ViewerConfig::default();
        config.camera.orbit = Some(Pose::new(30.0, 10.0, 4.0));
        let mut viewer = Viewer::new(config, HeadlessRenderer::new());
        viewer.load_model(chair());

        let pose = viewer.pose();
        assert_eq!((pose.yaw, pose.pitch, pose.distance), (30.0, 10.0, 4.0));
        assert_eq!(pose.pivot, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn reset_animates_back_to_the_default_pose() {
        let mut config = ViewerConfig::default();
        config.camera.orbit = Some(Pose::new(45.0, 0.0, 5.0));
        let mut viewer = Viewer::new(config, HeadlessRenderer::new());
        viewer.load_model(chair());
        let home = viewer.pose();
        viewer.camera_mut().set_pose(Pose {
            yaw: home.yaw + 90.0,
            ..home
        });

        viewer.reset_camera().unwrap();
        viewer.tick(ms(150));
        let halfway = viewer.pose().yaw;
        assert!(halfway > home.yaw && halfway < home.yaw + 90.0);

        viewer.tick(ms(200));
        assert!((viewer.pose().yaw - home.yaw).abs() < 1e-3);
        viewer.tick(ms(16));
        assert_eq!(viewer.controller().len(), 2);
    }

    #[test]
    fn dragging_orbits_the_camera() {
        let mut viewer = Viewer::new(ViewerConfig::default(), HeadlessRenderer::new());
        let (surface, element) = surface();
        viewer.attach(element).unwrap();
        viewer.resize(Vec2::new(400.0, 400.0));
        viewer.load_model(chair());
        let start = viewer.pose().yaw;

        drag(&surface, MouseButton::LEFT, Vec2::new(100.0, 200.0), Vec2::new(100.0, 0.0));
        for _ in 0..60 {
            viewer.tick(ms(16));
        }
        assert!((viewer.pose().yaw - start).abs() > 1.0);
    }

    #[test]
    fn configured_model_starts_its_animation() {
        let mut config = ViewerConfig::default();
        config.model = Some(ModelConfig {
            name: "robot".into(),
            clips: vec![AnimationClip::new("Idle", ms(1000)), AnimationClip::new("Wave", ms(400))],
            animation: Some("Wave".into()),
            autoplay: true,
            ..ModelConfig::default()
        });
        let mut viewer = Viewer::new(config, HeadlessRenderer::new());
        let log = record(&mut viewer, &[ViewerEventKind::AnimationLoop]);
        viewer.load_configured_model(SceneHandle(2)).unwrap();

        assert!(viewer.animator().is_playing());
        viewer.tick(ms(500));
        assert_eq!(
            log.lock().as_slice(),
            &[ViewerEvent::AnimationLoop { clip: 1, count: 1 }]
        );
    }

    #[test]
    fn missing_model_section_is_an_error() {
        let mut viewer = Viewer::new(ViewerConfig::default(), HeadlessRenderer::new());
        let err = viewer.load_configured_model(SceneHandle(1)).unwrap_err();
        assert!(err.to_string().contains("<model>"));
    }

    #[test]
    fn ar_session_places_and_restores_the_model() {
        let platform = Rc::new(FakeXr::supported());
        let xr: Rc<dyn XrPlatform> = platform.clone();
        let mut viewer = Viewer::new(ViewerConfig::default(), HeadlessRenderer::new()).with_ar(
            xr,
            Rc::new(NoHandoff),
            PlatformInfo::default(),
        );
        let log = record(
            &mut viewer,
            &[
                ViewerEventKind::ArStart,
                ViewerEventKind::ModelPlaced,
                ViewerEventKind::ArEnd,
            ],
        );
        viewer.load_model(chair());
        assert!(viewer.can_activate_ar());

        viewer.enter_ar().unwrap();
        assert!(!viewer.is_presenting());
        platform.grant();
        viewer.tick(ms(16));
        assert!(viewer.is_presenting());
        assert!(!viewer.scene().is_visible());
        let drawn = viewer.frames();
        viewer.tick(ms(16));
        assert_eq!(viewer.frames(), drawn);

        assert!(platform.provide_source(HitTestSource(4)));
        let floor = Vec3::new(0.5, 0.0, -2.0);
        let mut frame = XrFrame {
            delta: ms(16),
            hits: vec![HitTestResult::floor(floor)],
            ..XrFrame::default()
        };
        viewer.xr_frame(&frame);
        frame.select = true;
        viewer.xr_frame(&frame);
        assert!((viewer.scene().root().position - floor).length() < 1e-4);

        viewer.exit_ar();
        assert!(!viewer.is_presenting());
        assert!(viewer.scene().is_visible());
        assert_eq!(viewer.scene().root(), Transform::default());
        assert_eq!(
            log.lock().as_slice(),
            &[ViewerEvent::ArStart, ViewerEvent::ModelPlaced, ViewerEvent::ArEnd]
        );
    }

    #[test]
    fn reset_interrupted_by_ar_finishes_afterwards() {
        let platform = Rc::new(FakeXr::supported());
        let xr: Rc<dyn XrPlatform> = platform.clone();
        let mut config = ViewerConfig::default();
        config.camera.orbit = Some(Pose::new(45.0, 0.0, 5.0));
        let mut viewer = Viewer::new(config, HeadlessRenderer::new()).with_ar(
            xr,
            Rc::new(NoHandoff),
            PlatformInfo::default(),
        );
        viewer.load_model(chair());
        let home = viewer.pose();
        viewer.camera_mut().set_pose(Pose {
            yaw: home.yaw + 90.0,
            ..home
        });

        viewer.reset_camera().unwrap();
        viewer.tick(ms(50));
        viewer.enter_ar().unwrap();
        platform.grant();
        viewer.tick(ms(16));
        assert!(viewer.is_presenting());
        viewer.exit_ar();

        for _ in 0..100 {
            viewer.tick(ms(16));
        }
        assert!((viewer.pose().yaw - home.yaw).abs() < 1e-3);
        assert_eq!(viewer.controller().len(), 2);
    }

    #[test]
    fn ar_needs_a_model() {
        let platform: Rc<dyn XrPlatform> = Rc::new(FakeXr::supported());
        let mut viewer = Viewer::new(ViewerConfig::default(), HeadlessRenderer::new()).with_ar(
            platform,
            Rc::new(NoHandoff),
            PlatformInfo::default(),
        );
        assert!(!viewer.can_activate_ar());
        assert!(viewer.enter_ar().is_err());
    }

    #[test]
    fn destroy_is_idempotent_and_stops_frames() {
        let mut viewer = Viewer::new(autoplay_config(30.0), HeadlessRenderer::new());
        let (surface, element) = surface();
        viewer.attach(element).unwrap();
        viewer.load_model(chair());
        viewer.tick(ms(16));

        viewer.destroy();
        viewer.destroy();
        viewer.tick(ms(16));
        assert!(viewer.is_destroyed());
        assert_eq!(viewer.frames(), 1);
        assert_eq!(surface.total_listeners(), 0);
    }
}

#![cfg(target_arch = "wasm32")]

//! Browser bindings: a `requestAnimationFrame` loop driving a [`Viewer`]
//! on a canvas, DOM input, JavaScript draw and XR callbacks, and the
//! Scene Viewer / Quick Look handoffs.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures::FutureExt;
use glam::{Quat, Vec2, Vec3};
use indexmap::IndexMap;
use js_sys::{Array, Float32Array, Function, Promise, Reflect};
use parking_lot::Mutex;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{window, HtmlAnchorElement, HtmlCanvasElement, HtmlElement, Performance};

use crate::ar::{HitTestResult, HitTestSource, SourceRequest, XrFrame, XrInput, XrPose};
use crate::camera::Camera;
use crate::config::ViewerConfig;
use crate::error::XrError;
use crate::events::{Event, ViewerEvent, ViewerEventKind};
use crate::input::dom::DomSurface;
use crate::input::{PointerId, SharedSurface, SharedViewport};
use crate::render::{CameraParams, Renderer};
use crate::scene::{AnimationClip, BoundingBox, Model, SceneHandle, SceneState};
use crate::scheduler::{FrameClock, FrameScheduler};
use crate::viewer::Viewer;
use crate::xr::{HandoffLauncher, HandoffTarget, NoXr, PlatformInfo, SessionRequest, XrPlatform};

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    let _ = wasm_logger::init(wasm_logger::Config::default());
}

type WebViewer = Viewer<JsRenderer>;

#[wasm_bindgen]
pub struct WasmViewer {
    viewer: Rc<RefCell<WebViewer>>,
    frame_loop: Rc<RefCell<FrameLoop>>,
    bridge: Rc<EventBridge>,
}

#[wasm_bindgen]
impl WasmViewer {
    /// `draw(viewProj, position, model)` is called once per frame with
    /// column-major matrices; `viewProj` is null for immersive frames.
    /// `xr`, when given, is an object with `isArSupported`, `requestSession`,
    /// `requestHitTestSource`, `releaseHitTestSource` and `endSession`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        canvas_id: String,
        config_xml: Option<String>,
        draw: Function,
        xr: Option<JsValue>,
    ) -> Result<WasmViewer, JsValue> {
        let mut config = match config_xml {
            Some(xml) => ViewerConfig::from_xml(&xml).map_err(to_js)?,
            None => ViewerConfig::default(),
        };

        let window = window().ok_or_else(|| JsValue::from_str("window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("document not available"))?;
        let canvas = document
            .get_element_by_id(&canvas_id)
            .ok_or_else(|| JsValue::from_str("canvas element not found"))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str("element is not a canvas"))?;
        let performance = window
            .performance()
            .ok_or_else(|| JsValue::from_str("performance timer not available"))?;
        if config.ar.handoff.base_url.is_none() {
            config.ar.handoff.base_url = window.location().href().ok();
        }
        let info = PlatformInfo::from_user_agent(&window.navigator().user_agent().unwrap_or_default());

        let platform: Rc<dyn XrPlatform> = match xr {
            Some(runtime) if !runtime.is_undefined() && !runtime.is_null() => {
                Rc::new(JsXrPlatform { runtime })
            }
            _ => Rc::new(NoXr),
        };
        let viewport = Arc::new(SharedViewport::new(
            canvas.client_width().max(1) as u32,
            canvas.client_height().max(1) as u32,
        ));
        let mut viewer = Viewer::new(config, JsRenderer::new(draw))
            .with_ar(platform, Rc::new(BrowserLauncher), info)
            .with_viewport(viewport.clone());

        let element: HtmlElement = canvas.clone().unchecked_into();
        let surface: SharedSurface = Arc::new(DomSurface::new(element));
        viewer.attach(surface).map_err(to_js)?;

        let bridge = Rc::new(EventBridge::default());
        bridge.subscribe(&mut viewer);

        let viewer = Rc::new(RefCell::new(viewer));
        let frame_loop = Rc::new(RefCell::new(FrameLoop {
            scheduler: FrameScheduler::new(PerformanceClock { performance }),
            generation: 0,
            viewer: Rc::downgrade(&viewer),
            canvas,
            viewport,
        }));
        Ok(Self {
            viewer,
            frame_loop,
            bridge,
        })
    }

    /// Starts the animation-frame loop.
    pub fn start(&self) -> Result<(), JsValue> {
        let generation = self.frame_loop.borrow_mut().start();
        schedule_animation_loop(
            Rc::clone(&self.frame_loop),
            Rc::clone(&self.bridge),
            generation,
        )
        .map_err(to_js)
    }

    pub fn stop(&self) {
        self.frame_loop.borrow_mut().stop();
    }

    /// Swaps in a model. `bounds` is `[minX, minY, minZ, maxX, maxY, maxZ]`;
    /// clip names and durations (milliseconds) are matched by index.
    #[allow(clippy::too_many_arguments)]
    pub fn load_model(
        &self,
        name: String,
        handle: u32,
        bounds: &[f32],
        src: Option<String>,
        ios_src: Option<String>,
        clip_names: Array,
        clip_durations: &[f64],
    ) -> Result<(), JsValue> {
        let [min_x, min_y, min_z, max_x, max_y, max_z] = bounds else {
            return Err(JsValue::from_str("bounds needs six numbers"));
        };
        let bounds = BoundingBox::new(
            Vec3::new(*min_x, *min_y, *min_z),
            Vec3::new(*max_x, *max_y, *max_z),
        );
        let clips = clip_names
            .iter()
            .zip(clip_durations)
            .filter_map(|(name, millis)| {
                let name = name.as_string()?;
                Some(AnimationClip::new(
                    name,
                    Duration::from_secs_f64(millis.max(0.0) / 1000.0),
                ))
            })
            .collect();
        let mut model = Model::new(name, SceneHandle(u64::from(handle)), bounds).with_clips(clips);
        model.src = src;
        model.ios_src = ios_src;
        self.viewer.borrow_mut().load_model(model);
        self.bridge.dispatch();
        Ok(())
    }

    pub fn reset_camera(&self) -> Result<(), JsValue> {
        self.viewer.borrow_mut().reset_camera().map_err(to_js)
    }

    /// `[yaw, pitch, distance]` in degrees and scene units.
    pub fn pose(&self) -> Vec<f32> {
        let pose = self.viewer.borrow().pose();
        vec![pose.yaw, pose.pitch, pose.distance]
    }

    pub fn set_autoplay(&self, enabled: bool) -> Result<(), JsValue> {
        self.viewer
            .borrow_mut()
            .set_autoplay_enabled(enabled)
            .map_err(to_js)
    }

    pub fn play_animation(&self) -> bool {
        self.viewer.borrow_mut().animator_mut().play()
    }

    pub fn pause_animation(&self) {
        self.viewer.borrow_mut().animator_mut().pause();
    }

    pub fn set_animation(&self, name: String) -> bool {
        self.viewer.borrow_mut().animator_mut().set_clip(&name)
    }

    pub fn can_activate_ar(&self) -> bool {
        self.viewer.borrow().can_activate_ar()
    }

    pub fn enter_ar(&self) -> Result<(), JsValue> {
        let result = self.viewer.borrow_mut().enter_ar();
        self.bridge.dispatch();
        result.map_err(to_js)
    }

    pub fn exit_ar(&self) {
        self.viewer.borrow_mut().exit_ar();
        self.bridge.dispatch();
    }

    pub fn place_model(&self) -> bool {
        let placed = self.viewer.borrow_mut().place_model();
        self.bridge.dispatch();
        placed
    }

    /// Runs one immersive frame. `viewer` is `[x, y, z, qx, qy, qz, qw]`,
    /// `hits` holds six numbers (position, normal) per hit and `touches`
    /// nine per touch: id, x, y, then a hit position and normal that are
    /// NaN when the touch ray found nothing.
    pub fn xr_frame(
        &self,
        delta_ms: f64,
        viewer: &[f32],
        hits: &[f32],
        touches: &[f32],
        select: bool,
    ) -> Result<(), JsValue> {
        let [x, y, z, qx, qy, qz, qw] = viewer else {
            return Err(JsValue::from_str("viewer pose needs seven numbers"));
        };
        let frame = XrFrame {
            delta: Duration::from_secs_f64(delta_ms.max(0.0) / 1000.0),
            viewer: XrPose::new(
                Vec3::new(*x, *y, *z),
                Quat::from_xyzw(*qx, *qy, *qz, *qw).normalize(),
            ),
            hits: hits.chunks_exact(6).map(hit_from).collect(),
            inputs: touches
                .chunks_exact(9)
                .map(|touch| XrInput {
                    id: touch[0] as PointerId,
                    position: Vec2::new(touch[1], touch[2]),
                    hit: touch[3].is_finite().then(|| hit_from(&touch[3..9])),
                })
                .collect(),
            select,
        };
        self.viewer.borrow_mut().xr_frame(&frame);
        self.bridge.dispatch();
        Ok(())
    }

    /// Subscribes `callback` to `pose-change`, `ar-start`, `ar-end`,
    /// `can-place`, `model-placed`, `loop`, `finish` or `load`.
    pub fn on(&self, event: String, callback: Function) -> Result<(), JsValue> {
        let kind = event_kind(&event)
            .ok_or_else(|| JsValue::from_str(&format!("unknown event {event:?}")))?;
        self.bridge
            .callbacks
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push(callback);
        Ok(())
    }

    pub fn destroy(&self) {
        self.frame_loop.borrow_mut().stop();
        self.viewer.borrow_mut().destroy();
        self.bridge.callbacks.borrow_mut().clear();
    }
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn hit_from(values: &[f32]) -> HitTestResult {
    HitTestResult::new(
        Vec3::new(values[0], values[1], values[2]),
        Vec3::new(values[3], values[4], values[5]),
    )
}

fn event_kind(name: &str) -> Option<ViewerEventKind> {
    Some(match name {
        "pose-change" => ViewerEventKind::PoseChange,
        "ar-start" => ViewerEventKind::ArStart,
        "ar-end" => ViewerEventKind::ArEnd,
        "can-place" => ViewerEventKind::CanPlace,
        "model-placed" => ViewerEventKind::ModelPlaced,
        "loop" => ViewerEventKind::AnimationLoop,
        "finish" => ViewerEventKind::AnimationFinish,
        "load" => ViewerEventKind::ModelLoaded,
        _ => return None,
    })
}

/// Queues viewer events so JavaScript callbacks run after the viewer is
/// released.
#[derive(Default)]
struct EventBridge {
    inbox: Arc<Mutex<Vec<ViewerEvent>>>,
    callbacks: RefCell<IndexMap<ViewerEventKind, Vec<Function>>>,
}

impl EventBridge {
    fn subscribe(&self, viewer: &mut WebViewer) {
        for kind in [
            ViewerEventKind::PoseChange,
            ViewerEventKind::ArStart,
            ViewerEventKind::ArEnd,
            ViewerEventKind::CanPlace,
            ViewerEventKind::ModelPlaced,
            ViewerEventKind::AnimationLoop,
            ViewerEventKind::AnimationFinish,
            ViewerEventKind::ModelLoaded,
        ] {
            let inbox = Arc::clone(&self.inbox);
            viewer.on(
                kind,
                Arc::new(move |event: &ViewerEvent| inbox.lock().push(event.clone())),
            );
        }
    }

    fn dispatch(&self) {
        let events: Vec<ViewerEvent> = self.inbox.lock().drain(..).collect();
        for event in events {
            let kind = event.kind();
            let callbacks = self
                .callbacks
                .borrow()
                .get(&kind)
                .cloned()
                .unwrap_or_default();
            let payload = payload(&event);
            for callback in callbacks {
                if let Err(err) = callback.call1(&JsValue::NULL, &payload) {
                    web_sys::console::error_1(&err);
                }
            }
        }
    }
}

fn payload(event: &ViewerEvent) -> JsValue {
    match event {
        ViewerEvent::PoseChange(pose) => {
            Float32Array::from(&[pose.yaw, pose.pitch, pose.distance][..]).into()
        }
        ViewerEvent::AnimationLoop { clip, count } => {
            Array::of2(&JsValue::from(*clip as u32), &JsValue::from(*count)).into()
        }
        ViewerEvent::AnimationFinish { clip } => JsValue::from(*clip as u32),
        ViewerEvent::ModelLoaded { name } => JsValue::from_str(name),
        ViewerEvent::ArStart
        | ViewerEvent::ArEnd
        | ViewerEvent::CanPlace
        | ViewerEvent::ModelPlaced => JsValue::UNDEFINED,
    }
}

struct PerformanceClock {
    performance: Performance,
}

impl FrameClock for PerformanceClock {
    fn now(&self) -> Duration {
        Duration::from_secs_f64(self.performance.now().max(0.0) / 1000.0)
    }
}

struct FrameLoop {
    scheduler: FrameScheduler<'static, PerformanceClock>,
    generation: u64,
    viewer: Weak<RefCell<WebViewer>>,
    canvas: HtmlCanvasElement,
    viewport: Arc<SharedViewport>,
}

impl FrameLoop {
    fn start(&mut self) -> u64 {
        self.generation += 1;
        let viewer = self.viewer.clone();
        let canvas = self.canvas.clone();
        let viewport = Arc::clone(&self.viewport);
        self.scheduler.start(move |delta| {
            let Some(viewer) = viewer.upgrade() else {
                return;
            };
            viewport.update(canvas.client_width().max(1) as u32, canvas.client_height().max(1) as u32);
            viewer.borrow_mut().tick(delta);
        });
        self.generation
    }

    fn stop(&mut self) {
        self.scheduler.stop();
        self.generation += 1;
    }
}

fn schedule_animation_loop(
    frame_loop: Rc<RefCell<FrameLoop>>,
    bridge: Rc<EventBridge>,
    generation: u64,
) -> Result<()> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let slot: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let next = Rc::clone(&slot);

    *slot.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        {
            let mut state = frame_loop.borrow_mut();
            if state.generation != generation || state.scheduler.tick().is_none() {
                return;
            }
        }
        bridge.dispatch();
        let Some(window) = web_sys::window() else {
            return;
        };
        if let Some(closure) = next.borrow().as_ref() {
            if let Err(err) = window.request_animation_frame(closure.as_ref().unchecked_ref()) {
                web_sys::console::error_1(&err);
            }
        }
    }) as Box<dyn FnMut()>));

    if let Some(closure) = slot.borrow().as_ref() {
        window
            .request_animation_frame(closure.as_ref().unchecked_ref())
            .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))?;
    }
    Ok(())
}

/// Hands camera and model matrices to a JavaScript draw function.
pub struct JsRenderer {
    draw: Function,
    aspect: f32,
}

impl JsRenderer {
    pub fn new(draw: Function) -> Self {
        Self { draw, aspect: 1.0 }
    }

    fn call(&self, view_proj: JsValue, position: Vec3, scene: &SceneState) {
        let position = Float32Array::from(&position.to_array()[..]);
        let model = Float32Array::from(&scene.root.matrix().to_cols_array()[..]);
        if let Err(err) = self.draw.call3(&JsValue::NULL, &view_proj, &position, &model) {
            web_sys::console::error_1(&err);
        }
    }
}

impl Renderer for JsRenderer {
    fn render(&mut self, scene: &SceneState, camera: &Camera) {
        let params = CameraParams::from_camera(camera, self.aspect);
        let view_proj = Float32Array::from(&params.view_proj.to_cols_array()[..]);
        self.call(view_proj.into(), params.position, scene);
    }

    fn render_xr(&mut self, scene: &SceneState, viewer: &XrPose) {
        self.call(JsValue::NULL, viewer.position, scene);
    }

    fn resize(&mut self, size: Vec2) {
        self.aspect = size.x / size.y.max(1.0);
    }
}

/// Opens Scene Viewer intents by navigation and Quick Look through an
/// `<a rel="ar">` click.
struct BrowserLauncher;

impl HandoffLauncher for BrowserLauncher {
    fn launch(&self, target: &HandoffTarget) -> Result<(), XrError> {
        let launch_error = |err: JsValue| XrError::Launch(format!("{err:?}"));
        let window = window().ok_or_else(|| XrError::Launch("window not available".into()))?;
        match target {
            HandoffTarget::SceneViewer { intent } => {
                window.location().set_href(intent).map_err(launch_error)
            }
            HandoffTarget::QuickLook { href } => {
                let document = window
                    .document()
                    .ok_or_else(|| XrError::Launch("document not available".into()))?;
                let anchor = document
                    .create_element("a")
                    .map_err(launch_error)?
                    .dyn_into::<HtmlAnchorElement>()
                    .map_err(|_| XrError::Launch("failed to create anchor".into()))?;
                anchor.set_rel("ar");
                anchor.set_href(href);
                // Quick Look only opens anchors that wrap an image.
                let image = document.create_element("img").map_err(launch_error)?;
                anchor.append_child(&image).map_err(launch_error)?;
                anchor.click();
                Ok(())
            }
        }
    }
}

/// WebXR runtime implemented in JavaScript.
struct JsXrPlatform {
    runtime: JsValue,
}

impl JsXrPlatform {
    fn call(&self, name: &str, args: &Array) -> Result<JsValue, JsValue> {
        let method = Reflect::get(&self.runtime, &JsValue::from_str(name))?.dyn_into::<Function>()?;
        method.apply(&self.runtime, args)
    }

    fn promise(&self, name: &str) -> Result<Promise, String> {
        self.call(name, &Array::new())
            .and_then(|value| value.dyn_into::<Promise>())
            .map_err(|err| describe(&err))
    }
}

fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

impl XrPlatform for JsXrPlatform {
    fn is_ar_supported(&self) -> bool {
        self.call("isArSupported", &Array::new())
            .map(|value| value.is_truthy())
            .unwrap_or(false)
    }

    fn request_session(&self) -> SessionRequest {
        let promise = self.promise("requestSession");
        async move {
            let promise = promise.map_err(XrError::SessionRejected)?;
            JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|err| XrError::SessionRejected(describe(&err)))
        }
        .boxed_local()
    }

    fn request_hit_test_source(&self) -> SourceRequest {
        let promise = self.promise("requestHitTestSource");
        async move {
            let promise = promise.map_err(XrError::HitTestUnavailable)?;
            let value = JsFuture::from(promise)
                .await
                .map_err(|err| XrError::HitTestUnavailable(describe(&err)))?;
            value
                .as_f64()
                .map(|id| HitTestSource(id as u64))
                .ok_or_else(|| XrError::HitTestUnavailable("source id is not a number".into()))
        }
        .boxed_local()
    }

    fn release_hit_test_source(&self, source: HitTestSource) {
        let args = Array::of1(&JsValue::from_f64(source.0 as f64));
        if let Err(err) = self.call("releaseHitTestSource", &args) {
            web_sys::console::error_1(&err);
        }
    }

    fn end_session(&self) {
        if let Err(err) = self.call("endSession", &Array::new()) {
            web_sys::console::error_1(&err);
        }
    }
}

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;

use model_viewer_core::input::SharedSurface;
use model_viewer_core::scene::SceneHandle;
use model_viewer_core::{
    BoundingBox, FrameScheduler, HeadlessRenderer, InputEvent, ManualClock, Model, MouseButton,
    StaticViewport, Viewer, ViewerConfig, ViewerEvent, ViewerEventKind, ViewportProvider,
    VirtualSurface,
};

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let config = ViewerConfig::from_file(&options.path)?;

    let viewport = Arc::new(StaticViewport::new(1280, 720));
    let mut viewer = Viewer::new(config, HeadlessRenderer::new());
    viewer.resize(viewport.viewport_vec());
    let mut viewer = viewer.with_viewport(viewport);

    let surface = VirtualSurface::shared();
    let element: SharedSurface = surface.clone();
    viewer
        .attach(element)
        .context("failed to attach the input surface")?;

    let changes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&changes);
    viewer.on(
        ViewerEventKind::PoseChange,
        Arc::new(move |_: &ViewerEvent| {
            counter.fetch_add(1, Ordering::Relaxed);
        }),
    );

    if viewer.config().model.is_some() {
        viewer.load_configured_model(SceneHandle(1))?;
    } else {
        viewer.load_model(Model::new("default", SceneHandle(1), BoundingBox::default()));
    }
    if let Some(model) = viewer.scene().model() {
        println!(
            "Loaded model {} ({} clip(s))",
            model.name,
            model.clips.len()
        );
    }

    if let Some(by) = options.drag {
        let from = Vec2::new(640.0, 360.0);
        surface.dispatch(InputEvent::mouse_down(MouseButton::LEFT, from));
        surface.dispatch(InputEvent::pointer_move(1, from + by));
        surface.dispatch(InputEvent::pointer_up(1, from + by));
    }

    run_frames(&mut viewer, options.frames, options.step);

    if options.reset {
        viewer.reset_camera().context("failed to reset the camera")?;
        let interpolation = viewer.config().camera.interpolation;
        let steps = (interpolation.as_secs_f64() / options.step.as_secs_f64().max(1e-3)).ceil();
        run_frames(&mut viewer, steps as u32 + 1, options.step);
    }

    print_final_state(&viewer, changes.load(Ordering::Relaxed));
    viewer.destroy();
    Ok(())
}

fn run_frames(viewer: &mut Viewer<HeadlessRenderer>, frames: u32, step: Duration) {
    let clock = ManualClock::new();
    let mut scheduler = FrameScheduler::new(clock.clone());
    scheduler.start(|delta| viewer.tick(delta));
    for _ in 0..frames {
        clock.advance(step);
        scheduler.tick();
    }
}

fn print_final_state(viewer: &Viewer<HeadlessRenderer>, changes: usize) {
    let pose = viewer.pose();
    println!(
        "Final pose: yaw={:.2} pitch={:.2} distance={:.2}",
        pose.yaw, pose.pitch, pose.distance
    );
    println!(
        " - pivot=({:.2}, {:.2}, {:.2})",
        pose.pivot.x, pose.pivot.y, pose.pivot.z
    );
    println!("Pose changed on {changes} frame(s)");
    println!("Rendered {} frame(s)", viewer.frames());
}

struct CliOptions {
    path: PathBuf,
    frames: u32,
    step: Duration,
    drag: Option<Vec2>,
    reset: bool,
}

const USAGE: &str =
    "Usage: model-viewer <config.xml> [--frames N] [--step-ms M] [--drag DX,DY] [--reset]";

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(path) = args.next() else {
            return Err(anyhow!(USAGE));
        };
        let mut options = Self {
            path: PathBuf::from(path),
            frames: 60,
            step: Duration::from_millis(16),
            drag: None,
            reset: false,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--frames" => {
                    let value = args.next().ok_or_else(|| anyhow!("--frames needs a value"))?;
                    options.frames = value
                        .parse()
                        .with_context(|| format!("invalid frame count {value:?}"))?;
                }
                "--step-ms" => {
                    let value = args.next().ok_or_else(|| anyhow!("--step-ms needs a value"))?;
                    let millis: u64 = value
                        .parse()
                        .with_context(|| format!("invalid step {value:?}"))?;
                    options.step = Duration::from_millis(millis);
                }
                "--drag" => {
                    let value = args.next().ok_or_else(|| anyhow!("--drag needs DX,DY"))?;
                    options.drag = Some(parse_drag(&value)?);
                }
                "--reset" => options.reset = true,
                other => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
            }
        }
        Ok(options)
    }
}

fn parse_drag(value: &str) -> Result<Vec2> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| anyhow!("--drag expects DX,DY, found {value:?}"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f32>()
            .with_context(|| format!("invalid drag component {part:?}"))
    };
    Ok(Vec2::new(parse(x)?, parse(y)?))
}

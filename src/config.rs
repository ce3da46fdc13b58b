use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::animation::Repeat;
use crate::ar::{ArOptions, ArPlacement};
use crate::camera::{CameraLimits, DEFAULT_FOV};
use crate::control::{AutoOptions, OrbitOptions};
use crate::easing::Easing;
use crate::motion::Range;
use crate::pose::Pose;
use crate::scene::{AnimationClip, BoundingBox, Model, SceneHandle};
use crate::xr::{HandoffOptions, SessionKind};

/// Viewer settings, read from a `<viewer>` XML document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub orbit: OrbitConfig,
    pub autoplay: AutoplayConfig,
    pub ar: ArConfig,
    pub model: Option<ModelConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Starting pose; framed from the model bounds when absent.
    pub orbit: Option<Pose>,
    pub pivot: Option<Vec3>,
    pub fov: f32,
    pub limits: CameraLimits,
    /// Duration of the reset transition.
    pub interpolation: Duration,
    pub easing: Easing,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            orbit: None,
            pivot: None,
            fov: DEFAULT_FOV,
            limits: CameraLimits::default(),
            interpolation: Duration::from_millis(300),
            easing: Easing::CubicOut,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    pub enabled: bool,
    pub options: OrbitOptions,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            options: OrbitOptions::default(),
        }
    }
}

/// Automatic yaw rotation while the user is idle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoplayConfig {
    pub enabled: bool,
    pub options: AutoOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArConfig {
    pub enabled: bool,
    /// AR modes in order of preference.
    pub modes: Vec<SessionKind>,
    pub options: ArOptions,
    pub handoff: HandoffOptions,
}

impl Default for ArConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            modes: vec![
                SessionKind::WebXr,
                SessionKind::SceneViewer,
                SessionKind::QuickLook,
            ],
            options: ArOptions::default(),
            handoff: HandoffOptions::default(),
        }
    }
}

/// Describes the model to load; the loader itself lives outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub src: Option<String>,
    pub ios_src: Option<String>,
    pub center: Vec3,
    pub size: Vec3,
    pub clips: Vec<AnimationClip>,
    /// Clip played once the model is loaded.
    pub animation: Option<String>,
    pub autoplay: bool,
    pub repeat: Repeat,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            src: None,
            ios_src: None,
            center: Vec3::ZERO,
            size: Vec3::ONE,
            clips: Vec::new(),
            animation: None,
            autoplay: false,
            repeat: Repeat::Infinite,
        }
    }
}

impl ModelConfig {
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_center_size(self.center, self.size)
    }

    pub fn to_model(&self, scene: SceneHandle) -> Model {
        let mut model = Model::new(self.name.clone(), scene, self.bounds()).with_clips(self.clips.clone());
        model.src = self.src.clone();
        model.ios_src = self.ios_src.clone();
        model
    }
}

impl ViewerConfig {
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid viewer XML")?;
        let root = document.root_element();
        if !root.has_tag_name("viewer") {
            return Err(anyhow!(
                "expected <viewer> root element, found <{}>",
                root.tag_name().name()
            ));
        }

        let mut config = ViewerConfig::default();
        if let Some(node) = child(&root, "camera") {
            config.camera = parse_camera(&node).context("in <camera>")?;
        }
        if let Some(node) = child(&root, "orbit") {
            config.orbit = parse_orbit(&node).context("in <orbit>")?;
        }
        if let Some(node) = child(&root, "autoplay") {
            config.autoplay = parse_autoplay(&node).context("in <autoplay>")?;
        }
        if let Some(node) = child(&root, "ar") {
            config.ar = parse_ar(&node).context("in <ar>")?;
        }
        if let Some(node) = child(&root, "model") {
            config.model = Some(parse_model(&node).context("in <model>")?);
        }
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let xml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_xml(&xml).with_context(|| format!("failed to parse {}", path.display()))
    }
}

fn parse_camera(node: &Node<'_, '_>) -> Result<CameraConfig> {
    let defaults = CameraConfig::default();
    let orbit = match optional_text(node, "orbit") {
        Some(text) => {
            let [yaw, pitch, distance] = parse_floats::<3>(&text, "orbit")?;
            Some(Pose::new(yaw, pitch, distance))
        }
        None => None,
    };
    let pivot = match optional_text(node, "pivot") {
        Some(text) => Some(parse_vec3(Some(text), Vec3::ZERO).context("<pivot>")?),
        None => None,
    };
    let limits = CameraLimits {
        pitch: Range::new(
            parse_f32(node, "min-pitch", defaults.limits.pitch.min)?,
            parse_f32(node, "max-pitch", defaults.limits.pitch.max)?,
        ),
        distance: Range::new(
            parse_f32(node, "min-distance", defaults.limits.distance.min)?,
            parse_f32(node, "max-distance", defaults.limits.distance.max)?,
        ),
    };
    Ok(CameraConfig {
        orbit,
        pivot,
        fov: parse_f32(node, "fov", defaults.fov)?,
        limits,
        interpolation: parse_millis(node, "interpolation-ms", defaults.interpolation)?,
        easing: parse_easing(node, "easing", defaults.easing)?,
    })
}

fn parse_orbit(node: &Node<'_, '_>) -> Result<OrbitConfig> {
    let defaults = OrbitConfig::default();
    let mut options = defaults.options;
    options.rotate_sensitivity = parse_f32(node, "rotate-sensitivity", options.rotate_sensitivity)?;
    options.translate_sensitivity =
        parse_f32(node, "translate-sensitivity", options.translate_sensitivity)?;
    options.zoom_sensitivity = parse_f32(node, "zoom-sensitivity", options.zoom_sensitivity)?;
    options.motion.duration = parse_millis(node, "interpolation-ms", options.motion.duration)?;
    options.motion.easing = parse_easing(node, "easing", options.motion.easing)?;
    Ok(OrbitConfig {
        enabled: parse_bool(node, "enabled", defaults.enabled)?,
        options,
    })
}

fn parse_autoplay(node: &Node<'_, '_>) -> Result<AutoplayConfig> {
    let defaults = AutoOptions::default();
    Ok(AutoplayConfig {
        // A present <autoplay> section turns rotation on unless told otherwise.
        enabled: parse_bool(node, "enabled", true)?,
        options: AutoOptions {
            speed: parse_f32(node, "speed", defaults.speed)?,
            delay: parse_millis(node, "delay-ms", defaults.delay)?,
            delay_on_mouse_leave: parse_millis(
                node,
                "delay-on-mouse-leave-ms",
                defaults.delay_on_mouse_leave,
            )?,
            pause_on_hover: parse_bool(node, "pause-on-hover", defaults.pause_on_hover)?,
            can_interrupt: parse_bool(node, "can-interrupt", defaults.can_interrupt)?,
            disable_on_interrupt: parse_bool(
                node,
                "disable-on-interrupt",
                defaults.disable_on_interrupt,
            )?,
        },
    })
}

fn parse_ar(node: &Node<'_, '_>) -> Result<ArConfig> {
    let defaults = ArConfig::default();
    let modes = match optional_text(node, "modes") {
        Some(text) => text
            .split_whitespace()
            .map(|name| {
                SessionKind::from_name(name).ok_or_else(|| anyhow!("<modes>: unknown AR mode {name:?}"))
            })
            .collect::<Result<Vec<_>>>()?,
        None => defaults.modes,
    };
    let placement = match optional_text(node, "placement") {
        Some(text) => ArPlacement::from_name(&text)
            .ok_or_else(|| anyhow!("<placement>: unknown placement {text:?}"))?,
        None => defaults.options.placement,
    };
    let options = ArOptions {
        placement,
        scale_range: Range::new(
            parse_f32(node, "min-scale", defaults.options.scale_range.min)?,
            parse_f32(node, "max-scale", defaults.options.scale_range.max)?,
        ),
        hover_offset: parse_vec3(optional_text(node, "hover-offset"), defaults.options.hover_offset)
            .context("<hover-offset>")?,
        ..defaults.options
    };
    Ok(ArConfig {
        enabled: parse_bool(node, "enabled", defaults.enabled)?,
        modes,
        options,
        handoff: HandoffOptions {
            fallback_url: optional_text(node, "fallback-url"),
            title: optional_text(node, "title"),
            base_url: optional_text(node, "base-url"),
            fixed_scale: parse_bool(node, "fixed-scale", false)?,
        },
    })
}

fn parse_model(node: &Node<'_, '_>) -> Result<ModelConfig> {
    let defaults = ModelConfig::default();
    let mut clips = Vec::new();
    for clip in node.children().filter(|n| n.has_tag_name("clip")) {
        let name = required_text(&clip, "name")?;
        let duration = parse_millis(&clip, "duration-ms", Duration::ZERO)?;
        clips.push(AnimationClip::new(name, duration));
    }
    let repeat = match optional_text(node, "repeat") {
        Some(text) if text.eq_ignore_ascii_case("infinite") => Repeat::Infinite,
        Some(text) => Repeat::Finite(
            text.parse::<u32>()
                .map_err(|err| anyhow!("<repeat>: failed to parse count: {err}"))?,
        ),
        None => defaults.repeat,
    };
    Ok(ModelConfig {
        name: required_text(node, "name")?,
        src: optional_text(node, "src"),
        ios_src: optional_text(node, "ios-src"),
        center: parse_vec3(optional_text(node, "center"), defaults.center).context("<center>")?,
        size: parse_vec3(optional_text(node, "size"), defaults.size).context("<size>")?,
        clips,
        animation: optional_text(node, "animation"),
        autoplay: parse_bool(node, "autoplay", defaults.autoplay)?,
        repeat,
    })
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_floats<const N: usize>(text: &str, tag: &str) -> Result<[f32; N]> {
    let mut values = [0.0; N];
    let mut parts = text.split_whitespace();
    for value in values.iter_mut() {
        let part = parts
            .next()
            .ok_or_else(|| anyhow!("<{tag}> needs {N} numbers"))?;
        *value = part
            .parse::<f32>()
            .map_err(|err| anyhow!("<{tag}>: failed to parse {part:?}: {err}"))?;
    }
    Ok(values)
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let mut numbers = value
        .split_whitespace()
        .map(|component| component.parse::<f32>());
    let mut next = || -> Result<f32> {
        numbers
            .next()
            .ok_or_else(|| anyhow!("vector is missing components"))?
            .map_err(|err| anyhow!("failed to parse vector component: {err}"))
    };
    Ok(Vec3::new(next()?, next()?, next()?))
}

fn parse_f32(node: &Node<'_, '_>, tag: &str, default: f32) -> Result<f32> {
    match optional_text(node, tag) {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("<{tag}>: failed to parse float: {err}")),
        None => Ok(default),
    }
}

fn parse_millis(node: &Node<'_, '_>, tag: &str, default: Duration) -> Result<Duration> {
    match optional_text(node, tag) {
        Some(value) => {
            let millis = value
                .parse::<f64>()
                .map_err(|err| anyhow!("<{tag}>: failed to parse milliseconds: {err}"))?;
            if !millis.is_finite() || millis < 0.0 {
                return Err(anyhow!("<{tag}>: {millis} is not a valid duration"));
            }
            Ok(Duration::from_secs_f64(millis / 1000.0))
        }
        None => Ok(default),
    }
}

fn parse_bool(node: &Node<'_, '_>, tag: &str, default: bool) -> Result<bool> {
    match optional_text(node, tag).as_deref() {
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(anyhow!("<{tag}>: expected true or false, found {other:?}")),
        None => Ok(default),
    }
}

fn parse_easing(node: &Node<'_, '_>, tag: &str, default: Easing) -> Result<Easing> {
    match optional_text(node, tag) {
        Some(name) => Easing::from_name(&name).ok_or_else(|| anyhow!("<{tag}>: unknown easing {name:?}")),
        None => Ok(default),
    }
}

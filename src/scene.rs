use std::sync::Arc;
use std::time::Duration;

use glam::{Mat4, Quat, Vec3};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box of a loaded model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self::new(center - half, center + half)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Radius of the bounding sphere.
    pub fn radius(&self) -> f32 {
        self.size().length() * 0.5
    }

    /// A box with no extent or non-finite corners.
    pub fn is_degenerate(&self) -> bool {
        !self.min.is_finite() || !self.max.is_finite() || self.radius() <= f32::EPSILON
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::from_center_size(Vec3::ZERO, Vec3::ONE)
    }
}

/// Translation, rotation and scale applied to the model root.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Uniform scale factor (x component).
    pub fn uniform_scale(&self) -> f32 {
        self.scale.x
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    pub duration: Duration,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }
}

/// Opaque handle to the renderer-side scene graph of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneHandle(pub u64);

/// A loaded model as handed over by the loading subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub scene: SceneHandle,
    pub clips: Vec<AnimationClip>,
    pub bounds: BoundingBox,
    /// USDZ variant used by the Quick Look handoff, if one exists.
    pub ios_src: Option<String>,
    /// Source URL handed to external AR viewers.
    pub src: Option<String>,
}

impl Model {
    pub fn new(name: impl Into<String>, scene: SceneHandle, bounds: BoundingBox) -> Self {
        Self {
            name: name.into(),
            scene,
            clips: Vec::new(),
            bounds,
            ios_src: None,
            src: None,
        }
    }

    pub fn with_clips(mut self, clips: Vec<AnimationClip>) -> Self {
        self.clips = clips;
        self
    }

    pub fn with_src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    pub fn with_ios_src(mut self, src: impl Into<String>) -> Self {
        self.ios_src = Some(src.into());
        self
    }

    pub fn clip_index(&self, name: &str) -> Option<usize> {
        self.clips.iter().position(|clip| clip.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneState {
    pub model: Option<Arc<Model>>,
    pub root: Transform,
    /// Whether the ordinary (non-AR) scene is drawn.
    pub visible: bool,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            model: None,
            root: Transform::IDENTITY,
            visible: true,
        }
    }
}

/// Thread-safe handle to the single shared scene: the loaded model, its
/// root transform and the visibility flag toggled by AR sessions.
#[derive(Debug, Default)]
pub struct SceneGraph {
    state: Arc<RwLock<SceneState>>,
}

impl Clone for SceneGraph {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a new model and resets the root transform. Returns the
    /// previous model.
    pub fn replace_model(&self, model: Option<Model>) -> Option<Arc<Model>> {
        let mut state = self.state.write();
        state.root = Transform::IDENTITY;
        std::mem::replace(&mut state.model, model.map(Arc::new))
    }

    pub fn model(&self) -> Option<Arc<Model>> {
        self.state.read().model.clone()
    }

    pub fn has_model(&self) -> bool {
        self.state.read().model.is_some()
    }

    pub fn snapshot(&self) -> SceneState {
        self.state.read().clone()
    }

    pub fn root(&self) -> Transform {
        self.state.read().root
    }

    pub fn set_root(&self, root: Transform) {
        self.state.write().root = root;
    }

    /// Applies a mutation to the root transform.
    pub fn update_root<F, R>(&self, updater: F) -> R
    where
        F: FnOnce(&mut Transform) -> R,
    {
        let mut guard = self.state.write();
        updater(&mut guard.root)
    }

    pub fn is_visible(&self) -> bool {
        self.state.read().visible
    }

    pub fn set_visible(&self, visible: bool) {
        self.state.write().visible = visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> Model {
        Model::new("cube", SceneHandle(1), BoundingBox::default())
    }

    #[test]
    fn replace_model_returns_previous_and_resets_root() {
        let scene = SceneGraph::new();
        assert!(scene.replace_model(Some(cube())).is_none());
        scene.update_root(|root| root.position = Vec3::X);

        let previous = scene.replace_model(None);
        assert_eq!(previous.map(|model| model.name.clone()), Some("cube".to_string()));
        assert!(!scene.has_model());
        assert_eq!(scene.root(), Transform::IDENTITY);
    }

    #[test]
    fn clones_share_state() {
        let scene = SceneGraph::new();
        let other = scene.clone();
        other.set_visible(false);
        other.update_root(|root| root.scale = Vec3::splat(2.0));
        assert!(!scene.is_visible());
        assert_eq!(scene.root().uniform_scale(), 2.0);
    }

    #[test]
    fn bounding_box_geometry() {
        let bounds = BoundingBox::new(Vec3::new(1.0, 2.0, 2.0), Vec3::new(-1.0, -2.0, -2.0));
        assert_eq!(bounds.center(), Vec3::ZERO);
        assert_eq!(bounds.radius(), 3.0);
        assert!(!bounds.is_degenerate());
        assert!(BoundingBox::new(Vec3::ONE, Vec3::ONE).is_degenerate());
    }

    #[test]
    fn clip_lookup_by_name() {
        let model = cube().with_clips(vec![
            AnimationClip::new("idle", Duration::from_secs(1)),
            AnimationClip::new("walk", Duration::from_secs(2)),
        ]);
        assert_eq!(model.clip_index("walk"), Some(1));
        assert_eq!(model.clip_index("run"), None);
    }
}

//! The drawing seam. Rendering itself happens outside this crate; a
//! [`Renderer`] receives the scene and camera once per frame.

use glam::{Mat4, Vec2, Vec3};

use crate::ar::XrPose;
use crate::camera::Camera;
use crate::scene::SceneState;

/// Camera values a renderer uploads for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

impl CameraParams {
    pub fn from_camera(camera: &Camera, aspect: f32) -> Self {
        Self {
            view_proj: camera.view_projection(aspect.max(0.01)),
            position: camera.position(),
        }
    }
}

pub trait Renderer {
    fn render(&mut self, scene: &SceneState, camera: &Camera);

    /// Draws into the immersive session from the tracked device pose.
    fn render_xr(&mut self, _scene: &SceneState, _viewer: &XrPose) {}

    fn resize(&mut self, _size: Vec2) {}
}

/// Renderer that draws nothing and keeps the last frame's matrices.
#[derive(Debug, Clone, Default)]
pub struct HeadlessRenderer {
    frames: u64,
    aspect: f32,
    last: Option<CameraParams>,
    model_matrix: Mat4,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self {
            aspect: 1.0,
            ..Self::default()
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_camera(&self) -> Option<&CameraParams> {
        self.last.as_ref()
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.model_matrix
    }
}

impl Renderer for HeadlessRenderer {
    fn render(&mut self, scene: &SceneState, camera: &Camera) {
        self.last = Some(CameraParams::from_camera(camera, self.aspect));
        self.model_matrix = scene.root.matrix();
        self.frames += 1;
    }

    fn render_xr(&mut self, scene: &SceneState, _viewer: &XrPose) {
        self.model_matrix = scene.root.matrix();
        self.frames += 1;
    }

    fn resize(&mut self, size: Vec2) {
        self.aspect = size.x / size.y.max(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Pose;

    #[test]
    fn headless_renderer_tracks_frames_and_camera() {
        let mut renderer = HeadlessRenderer::new();
        renderer.resize(Vec2::new(800.0, 400.0));
        let camera = Camera::new(Pose::new(0.0, 0.0, 5.0));
        renderer.render(&SceneState::default(), &camera);

        assert_eq!(renderer.frames(), 1);
        let params = renderer.last_camera().unwrap();
        assert_eq!(params.position, camera.position());
        assert_eq!(params.view_proj, camera.view_projection(2.0));
        assert_eq!(renderer.model_matrix(), Mat4::IDENTITY);
    }
}

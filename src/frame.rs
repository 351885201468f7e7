//! Per-frame host state consumed by [`NodeGraph::update`](crate::graph::NodeGraph::update).

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub projection: Mat4,
    /// World-to-view transform (the inverse of `world`).
    pub view: Mat4,
    pub world: Mat4,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            world: Mat4::IDENTITY,
            near: 0.1,
            far: 2000.0,
        }
    }
}

impl CameraState {
    /// Camera looking from `eye` at `target` with a right-handed perspective projection.
    pub fn perspective(eye: Vec3, target: Vec3, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        Self {
            projection: Mat4::perspective_rh_gl(fov_y, aspect, near, far),
            view,
            world: view.inverse(),
            near,
            far,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectState {
    pub world: Mat4,
}

impl Default for ObjectState {
    fn default() -> Self {
        Self {
            world: Mat4::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneState {
    pub background_blurriness: f32,
    pub background_intensity: f32,
}

/// Snapshot of everything uniform-backed nodes read between draws.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeFrame {
    /// Seconds since start.
    pub time: f32,
    /// Seconds since the previous frame.
    pub delta_time: f32,
    pub frame_id: u64,
    pub camera: CameraState,
    /// Object being drawn; `None` means an identity transform.
    pub object: Option<ObjectState>,
    pub scene: SceneState,
}

impl NodeFrame {
    /// Advance the clock by `delta` seconds.
    pub fn advance(&mut self, delta: f32) {
        self.delta_time = delta;
        self.time += delta;
        self.frame_id += 1;
    }

    pub fn object_world(&self) -> Mat4 {
        self.object.map_or(Mat4::IDENTITY, |object| object.world)
    }
}

/// Runtime value of a uniform-backed node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn as_float(&self) -> Option<f32> {
        match self {
            UniformValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// Inverse-transpose of the upper 3x3, used to transform normals.
pub fn normal_matrix(matrix: Mat4) -> Mat3 {
    Mat3::from_mat4(matrix).inverse().transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates_time() {
        let mut frame = NodeFrame::default();
        frame.advance(0.5);
        frame.advance(0.25);
        assert_eq!(frame.time, 0.75);
        assert_eq!(frame.delta_time, 0.25);
        assert_eq!(frame.frame_id, 2);
    }

    #[test]
    fn normal_matrix_of_uniform_scale_is_inverse_scale() {
        let m = Mat4::from_scale(Vec3::splat(2.0));
        let n = normal_matrix(m);
        assert!((n.x_axis.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn uniform_values_serialize_tagged() {
        let json = serde_json::to_value(UniformValue::Float(1.5)).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "float", "value": 1.5 }));
    }
}

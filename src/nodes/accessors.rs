//! Accessors for host-provided values: geometry position, object and camera
//! transforms, scene settings, time and textures.

use glam::Vec3;

use crate::builder::NodeBuilder;
use crate::error::{NodeError, Result};
use crate::frame::{normal_matrix, NodeFrame, UniformValue};
use crate::graph::NodeId;
use crate::nodes::core::AttributeNode;
use crate::nodes::NodeKind;
use crate::types::NodeType;

// ── Position ───────────────────────────────────────────────────────────

node_enum! {
    pub enum PositionScope ("PositionNode", "scope") {
        Geometry => "geometry",
        Local => "local",
        World => "world",
        WorldDirection => "worldDirection",
        View => "view",
        ViewDirection => "viewDirection",
    }
}

/// Vertex position in a given space. Instances with the same scope share a
/// hash, so they resolve to a single node per build.
#[derive(Debug, Clone)]
pub struct PositionNode {
    pub scope: PositionScope,
}

impl PositionNode {
    pub(crate) fn construct(&self, builder: &mut NodeBuilder<'_>) -> Result<NodeId> {
        let graph = builder.graph();
        let output = match self.scope {
            PositionScope::Geometry => graph.insert(NodeKind::Attribute(AttributeNode {
                name: "position".to_string(),
                node_type: NodeType::VEC3,
            })),
            PositionScope::Local => graph.position_geometry().varying(None),
            PositionScope::World => graph
                .model_world_matrix()
                .mul(graph.position_local())
                .xyz()
                .varying(None),
            PositionScope::View => graph
                .model_view_matrix()
                .mul(graph.position_local())
                .xyz()
                .varying(None),
            PositionScope::ViewDirection => graph.position_view().negate().varying(None).normalize(),
            PositionScope::WorldDirection => graph
                .position_local()
                .transform_direction(graph.model_world_matrix())
                .varying(None)
                .normalize(),
        };
        Ok(output.id())
    }
}

// ── Object transforms ──────────────────────────────────────────────────

node_enum! {
    pub enum Object3dTarget ("Object3dNode", "target") {
        Model => "model",
        Camera => "camera",
    }
}

node_enum! {
    pub enum Object3dScope ("Object3dNode", "scope") {
        ViewMatrix => "viewMatrix",
        NormalMatrix => "normalMatrix",
        WorldMatrix => "worldMatrix",
        Position => "position",
        Scale => "scale",
        ViewPosition => "viewPosition",
        Direction => "direction",
        ProjectionMatrix => "projectionMatrix",
        Near => "near",
        Far => "far",
    }
}

impl Object3dScope {
    pub fn node_type(self) -> NodeType {
        match self {
            Object3dScope::ViewMatrix
            | Object3dScope::WorldMatrix
            | Object3dScope::ProjectionMatrix => NodeType::MAT4,
            Object3dScope::NormalMatrix => NodeType::MAT3,
            Object3dScope::Position
            | Object3dScope::Scale
            | Object3dScope::ViewPosition
            | Object3dScope::Direction => NodeType::VEC3,
            Object3dScope::Near | Object3dScope::Far => NodeType::FLOAT,
        }
    }

    fn camera_only(self) -> bool {
        matches!(
            self,
            Object3dScope::ProjectionMatrix | Object3dScope::Near | Object3dScope::Far
        )
    }
}

/// Uniform-backed transform of the rendered object or the camera.
#[derive(Debug, Clone)]
pub struct Object3dNode {
    pub target: Object3dTarget,
    pub scope: Object3dScope,
}

impl Object3dNode {
    pub fn new(target: Object3dTarget, scope: Object3dScope) -> Result<Self> {
        let mut node = Self {
            target,
            scope: Object3dScope::WorldMatrix,
        };
        node.set_scope(scope)?;
        Ok(node)
    }

    pub fn set_scope(&mut self, scope: Object3dScope) -> Result<()> {
        if scope.camera_only() && self.target == Object3dTarget::Model {
            return Err(NodeError::unknown_variant("ModelNode", "scope", scope.as_str()));
        }
        self.scope = scope;
        Ok(())
    }

    pub fn type_name(&self) -> &'static str {
        match self.target {
            Object3dTarget::Model => "ModelNode",
            Object3dTarget::Camera => "CameraNode",
        }
    }

    /// Uniform name, e.g. `modelViewMatrix` or `cameraNear`.
    pub fn uniform_name(&self) -> String {
        let scope = self.scope.as_str();
        let mut name = String::from(self.target.as_str());
        let mut chars = scope.chars();
        if let Some(first) = chars.next() {
            name.push(first.to_ascii_uppercase());
            name.push_str(chars.as_str());
        }
        name
    }

    pub fn update(&self, frame: &NodeFrame) -> UniformValue {
        let camera = &frame.camera;
        let world = match self.target {
            Object3dTarget::Model => frame.object_world(),
            Object3dTarget::Camera => camera.world,
        };
        let view = match self.target {
            Object3dTarget::Model => camera.view * world,
            Object3dTarget::Camera => camera.view,
        };
        let position = world.w_axis.truncate();

        match self.scope {
            Object3dScope::ViewMatrix => UniformValue::Mat4(view),
            Object3dScope::NormalMatrix => UniformValue::Mat3(normal_matrix(view)),
            Object3dScope::WorldMatrix => UniformValue::Mat4(world),
            Object3dScope::Position => UniformValue::Vec3(position),
            Object3dScope::Scale => {
                let (scale, _, _) = world.to_scale_rotation_translation();
                UniformValue::Vec3(scale)
            }
            Object3dScope::ViewPosition => UniformValue::Vec3(camera.view.transform_point3(position)),
            Object3dScope::Direction => {
                // Cameras look down their local -Z axis.
                let forward = match self.target {
                    Object3dTarget::Model => Vec3::Z,
                    Object3dTarget::Camera => Vec3::NEG_Z,
                };
                UniformValue::Vec3(world.transform_vector3(forward).normalize_or_zero())
            }
            Object3dScope::ProjectionMatrix => UniformValue::Mat4(camera.projection),
            Object3dScope::Near => UniformValue::Float(camera.near),
            Object3dScope::Far => UniformValue::Float(camera.far),
        }
    }

    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, id: NodeId) -> Result<String> {
        let name = self.uniform_name();
        Ok(builder.uniform_from_node(id, self.scope.node_type(), Some(&name)))
    }
}

// ── Scene ──────────────────────────────────────────────────────────────

node_enum! {
    pub enum SceneScope ("SceneNode", "scope") {
        BackgroundBlurriness => "backgroundBlurriness",
        BackgroundIntensity => "backgroundIntensity",
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub scope: SceneScope,
}

impl SceneNode {
    pub fn update(&self, frame: &NodeFrame) -> UniformValue {
        UniformValue::Float(match self.scope {
            SceneScope::BackgroundBlurriness => frame.scene.background_blurriness,
            SceneScope::BackgroundIntensity => frame.scene.background_intensity,
        })
    }

    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, id: NodeId) -> Result<String> {
        Ok(builder.uniform_from_node(id, NodeType::FLOAT, Some(self.scope.as_str())))
    }
}

// ── Time ───────────────────────────────────────────────────────────────

node_enum! {
    pub enum TimerScope ("TimerNode", "scope") {
        Local => "local",
        Global => "global",
        Delta => "delta",
    }
}

/// Float uniform advanced by the frame clock. `local` accumulates
/// `delta * scale`, `global` mirrors the frame time, `delta` the frame step.
#[derive(Debug, Clone)]
pub struct TimerNode {
    pub scope: TimerScope,
    pub scale: f64,
}

impl TimerNode {
    /// New value given the previous one; only `local` accumulates.
    pub fn update(&self, frame: &NodeFrame, previous: f32) -> UniformValue {
        let scale = self.scale as f32;
        UniformValue::Float(match self.scope {
            TimerScope::Local => previous + frame.delta_time * scale,
            TimerScope::Global => frame.time * scale,
            TimerScope::Delta => frame.delta_time * scale,
        })
    }

    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, id: NodeId) -> Result<String> {
        Ok(builder.uniform_from_node(id, NodeType::FLOAT, None))
    }
}

// ── Textures ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TextureNode {
    pub name: String,
    pub uv: NodeId,
    pub level: Option<NodeId>,
}

impl TextureNode {
    pub(crate) fn generate(
        &self,
        builder: &mut NodeBuilder<'_>,
        id: NodeId,
        output: Option<NodeType>,
    ) -> Result<String> {
        let texture = builder.texture_from_node(id, &self.name);
        let uv = builder.build(self.uv, Some(NodeType::VEC2))?;
        let level = self
            .level
            .map(|level| builder.build(level, Some(NodeType::FLOAT)))
            .transpose()?;
        let snippet = builder
            .language()
            .texture_sample(builder.stage(), &texture, &uv, level.as_deref());
        Ok(builder.format(&snippet, NodeType::VEC4, output))
    }
}

/// Dimensions of a texture's mip level as `uvec2`.
#[derive(Debug, Clone)]
pub struct TextureSizeNode {
    pub texture: NodeId,
    pub level: NodeId,
}

impl TextureSizeNode {
    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>) -> Result<String> {
        let entry = builder.graph().entry(self.texture);
        let NodeKind::Texture(texture) = &entry.kind else {
            return Err(NodeError::invalid_argument(format!(
                "textureSize expects a TextureNode, got {}",
                entry.kind.type_name()
            )));
        };
        let name = builder.texture_from_node(self.texture, &texture.name);
        let level = builder.build(self.level, Some(NodeType::INT))?;
        Ok(builder.language().texture_size(&name, &level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_names() {
        let node = Object3dNode::new(Object3dTarget::Camera, Object3dScope::ProjectionMatrix).unwrap();
        assert_eq!(node.uniform_name(), "cameraProjectionMatrix");
        let node = Object3dNode::new(Object3dTarget::Model, Object3dScope::ViewMatrix).unwrap();
        assert_eq!(node.uniform_name(), "modelViewMatrix");
    }

    #[test]
    fn camera_scopes_are_rejected_on_models() {
        let err = Object3dNode::new(Object3dTarget::Model, Object3dScope::Near).unwrap_err();
        assert_eq!(err.to_string(), "ModelNode: unknown scope 'near'");
    }

    #[test]
    fn model_view_combines_camera_and_object() {
        let mut frame = NodeFrame::default();
        frame.camera.view = glam::Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
        frame.object = Some(crate::frame::ObjectState {
            world: glam::Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)),
        });
        let node = Object3dNode::new(Object3dTarget::Model, Object3dScope::ViewPosition).unwrap();
        assert_eq!(node.update(&frame), UniformValue::Vec3(Vec3::new(1.0, 0.0, -5.0)));
    }

    #[test]
    fn unknown_scene_scope_is_a_hard_error() {
        assert!("backgroundRotation".parse::<SceneScope>().is_err());
    }
}

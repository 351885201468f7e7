//! Fluent graph-building API.
//!
//! [`Node`] handles combine into expressions with methods (`a.mul(b)`,
//! `v.xyz()`), `std::ops` operators or dynamic [`Node::member`] lookups
//! through the graph's element registry. The builtin accessors below are
//! memoized per graph, so `graph.position_local()` always returns the same
//! node.

pub mod convert;
mod handle;
pub mod registry;
pub mod tsl;

use crate::graph::NodeGraph;
use crate::nodes::{
    AttributeNode, FrontFacingNode, IndexNode, IndexScope, NodeKind, Object3dNode, Object3dScope,
    Object3dTarget, OscMethod, OscNode, PositionNode, PositionScope, PropertyNode, SceneNode,
    SceneScope, TextureNode, TimerNode, TimerScope, UniformNode,
};
use crate::types::NodeType;

pub use self::convert::{ConvertArg, IntoConvertArg, IntoConvertArgs};
pub use self::handle::{BoundElement, IntoNode, Member, Node};
pub use self::registry::{Element, ElementRegistry, Value};
pub use self::tsl::{Inputs, ShaderFn, TslFn};

pub const EPSILON: f64 = 1e-6;
pub const INFINITY: f64 = 1e6;

macro_rules! position_accessors {
    ($($name:ident => $scope:ident, $key:literal),+ $(,)?) => {
        $(
            pub fn $name(&self) -> Node<'_> {
                self.immutable($key, |graph| {
                    graph.add(NodeKind::Position(PositionNode { scope: PositionScope::$scope }))
                })
            }
        )+
    };
}

macro_rules! object_accessors {
    ($($name:ident => $target:ident . $scope:ident, $key:literal),+ $(,)?) => {
        $(
            pub fn $name(&self) -> Node<'_> {
                self.immutable($key, |graph| {
                    graph.add(NodeKind::Object3d(Object3dNode {
                        target: Object3dTarget::$target,
                        scope: Object3dScope::$scope,
                    }))
                })
            }
        )+
    };
}

macro_rules! property_presets {
    ($($name:ident => $label:literal, $ty:expr),+ $(,)?) => {
        $(
            pub fn $name(&self) -> Node<'_> {
                self.property($ty, Some($label))
            }
        )+
    };
}

impl NodeGraph {
    // ── Geometry ───────────────────────────────────────────────────────

    position_accessors! {
        position_geometry => Geometry, "positionGeometry",
        position_local => Local, "positionLocal",
        position_world => World, "positionWorld",
        position_world_direction => WorldDirection, "positionWorldDirection",
        position_view => View, "positionView",
        position_view_direction => ViewDirection, "positionViewDirection",
    }

    /// Per-vertex input named `name`.
    pub fn attribute(&self, name: &str, ty: NodeType) -> Node<'_> {
        self.insert(NodeKind::Attribute(AttributeNode {
            name: name.to_string(),
            node_type: ty,
        }))
    }

    /// Texture coordinates of UV set `index`: `uv`, `uv1`, `uv2`...
    pub fn uv(&self, index: u32) -> Node<'_> {
        let name = match index {
            0 => "uv".to_string(),
            n => format!("uv{n}"),
        };
        self.attribute(&name, NodeType::VEC2)
    }

    pub fn vertex_index(&self) -> Node<'_> {
        self.immutable("vertexIndex", |graph| {
            graph.add(NodeKind::Index(IndexNode {
                scope: IndexScope::Vertex,
            }))
        })
    }

    pub fn instance_index(&self) -> Node<'_> {
        self.immutable("instanceIndex", |graph| {
            graph.add(NodeKind::Index(IndexNode {
                scope: IndexScope::Instance,
            }))
        })
    }

    pub fn front_facing(&self) -> Node<'_> {
        self.immutable("frontFacing", |graph| graph.add(NodeKind::FrontFacing(FrontFacingNode)))
    }

    /// `1.0` for front faces, `-1.0` for back faces.
    pub fn face_direction(&self) -> Node<'_> {
        self.immutable("faceDirection", |graph| {
            graph.float(graph.front_facing()).mul(2.0).sub(1.0).id()
        })
    }

    // ── Transforms ─────────────────────────────────────────────────────

    object_accessors! {
        model_view_matrix => Model.ViewMatrix, "modelViewMatrix",
        model_normal_matrix => Model.NormalMatrix, "modelNormalMatrix",
        model_world_matrix => Model.WorldMatrix, "modelWorldMatrix",
        model_position => Model.Position, "modelPosition",
        model_scale => Model.Scale, "modelScale",
        model_view_position => Model.ViewPosition, "modelViewPosition",
        model_direction => Model.Direction, "modelDirection",
        camera_view_matrix => Camera.ViewMatrix, "cameraViewMatrix",
        camera_normal_matrix => Camera.NormalMatrix, "cameraNormalMatrix",
        camera_world_matrix => Camera.WorldMatrix, "cameraWorldMatrix",
        camera_position => Camera.Position, "cameraPosition",
        camera_projection_matrix => Camera.ProjectionMatrix, "cameraProjectionMatrix",
        camera_near => Camera.Near, "cameraNear",
        camera_far => Camera.Far, "cameraFar",
    }

    // ── Scene and time ─────────────────────────────────────────────────

    pub fn background_blurriness(&self) -> Node<'_> {
        self.immutable("backgroundBlurriness", |graph| {
            graph.add(NodeKind::Scene(SceneNode {
                scope: SceneScope::BackgroundBlurriness,
            }))
        })
    }

    pub fn background_intensity(&self) -> Node<'_> {
        self.immutable("backgroundIntensity", |graph| {
            graph.add(NodeKind::Scene(SceneNode {
                scope: SceneScope::BackgroundIntensity,
            }))
        })
    }

    pub fn timer(&self, scope: TimerScope, scale: f64) -> Node<'_> {
        self.insert(NodeKind::Timer(TimerNode { scope, scale }))
    }

    pub fn timer_local(&self, scale: f64) -> Node<'_> {
        self.timer(TimerScope::Local, scale)
    }

    pub fn timer_global(&self, scale: f64) -> Node<'_> {
        self.timer(TimerScope::Global, scale)
    }

    pub fn timer_delta(&self, scale: f64) -> Node<'_> {
        self.timer(TimerScope::Delta, scale)
    }

    /// Shared local timer at unit scale.
    pub fn time(&self) -> Node<'_> {
        self.immutable("time", |graph| graph.timer_local(1.0).id())
    }

    pub fn osc<'g>(&'g self, method: OscMethod, time: impl IntoNode<'g>) -> Node<'g> {
        let time = time.into_node(self);
        self.insert(NodeKind::Osc(OscNode {
            method,
            time: time.id(),
        }))
    }

    // ── Values ─────────────────────────────────────────────────────────

    /// Scratch variable; properties with the same name are one variable.
    pub fn property(&self, ty: NodeType, name: Option<&str>) -> Node<'_> {
        self.insert(NodeKind::Property(PropertyNode {
            node_type: ty,
            name: name.map(str::to_string),
        }))
    }

    pub fn uniform(&self, ty: NodeType, name: Option<&str>) -> Node<'_> {
        self.insert(NodeKind::Uniform(UniformNode {
            node_type: ty,
            name: name.map(str::to_string),
        }))
    }

    pub fn texture<'g>(&'g self, name: &str, uv: impl IntoNode<'g>, level: Option<Node<'g>>) -> Node<'g> {
        let uv = uv.into_node(self);
        self.insert(NodeKind::Texture(TextureNode {
            name: name.to_string(),
            uv: uv.id(),
            level: level.map(Node::id),
        }))
    }

    property_presets! {
        diffuse_color => "DiffuseColor", NodeType::VEC4,
        roughness => "Roughness", NodeType::FLOAT,
        metalness => "Metalness", NodeType::FLOAT,
        clearcoat => "Clearcoat", NodeType::FLOAT,
        clearcoat_roughness => "ClearcoatRoughness", NodeType::FLOAT,
        sheen => "Sheen", NodeType::VEC3,
        sheen_roughness => "SheenRoughness", NodeType::FLOAT,
        iridescence => "Iridescence", NodeType::FLOAT,
        iridescence_ior => "IridescenceIOR", NodeType::FLOAT,
        iridescence_thickness => "IridescenceThickness", NodeType::FLOAT,
        specular_color => "SpecularColor", NodeType::VEC3,
        shininess => "Shininess", NodeType::FLOAT,
        output => "Output", NodeType::VEC4,
    }

    /// Builtin value by its script name (`positionLocal`, `time`, `PI`...).
    pub fn builtin(&self, name: &str) -> Option<Node<'_>> {
        let node = match name {
            "positionGeometry" => self.position_geometry(),
            "positionLocal" => self.position_local(),
            "positionWorld" => self.position_world(),
            "positionWorldDirection" => self.position_world_direction(),
            "positionView" => self.position_view(),
            "positionViewDirection" => self.position_view_direction(),
            "modelViewMatrix" => self.model_view_matrix(),
            "modelNormalMatrix" => self.model_normal_matrix(),
            "modelWorldMatrix" => self.model_world_matrix(),
            "modelPosition" => self.model_position(),
            "modelScale" => self.model_scale(),
            "modelViewPosition" => self.model_view_position(),
            "modelDirection" => self.model_direction(),
            "cameraViewMatrix" => self.camera_view_matrix(),
            "cameraNormalMatrix" => self.camera_normal_matrix(),
            "cameraWorldMatrix" => self.camera_world_matrix(),
            "cameraPosition" => self.camera_position(),
            "cameraProjectionMatrix" => self.camera_projection_matrix(),
            "cameraNear" => self.camera_near(),
            "cameraFar" => self.camera_far(),
            "vertexIndex" => self.vertex_index(),
            "instanceIndex" => self.instance_index(),
            "frontFacing" => self.front_facing(),
            "faceDirection" => self.face_direction(),
            "uv" => self.uv(0),
            "time" | "timerLocal" => self.time(),
            "timerGlobal" => self.timer_global(1.0),
            "timerDelta" => self.timer_delta(1.0),
            "backgroundBlurriness" => self.background_blurriness(),
            "backgroundIntensity" => self.background_intensity(),
            "diffuseColor" => self.diffuse_color(),
            "roughness" => self.roughness(),
            "metalness" => self.metalness(),
            "clearcoat" => self.clearcoat(),
            "clearcoatRoughness" => self.clearcoat_roughness(),
            "sheen" => self.sheen(),
            "sheenRoughness" => self.sheen_roughness(),
            "iridescence" => self.iridescence(),
            "iridescenceIOR" => self.iridescence_ior(),
            "iridescenceThickness" => self.iridescence_thickness(),
            "specularColor" => self.specular_color(),
            "shininess" => self.shininess(),
            "output" => self.output(),
            "PI" => self.float(std::f64::consts::PI),
            "PI2" => self.float(std::f64::consts::TAU),
            "EPSILON" => self.float(EPSILON),
            "INFINITY" => self.float(INFINITY),
            _ => return None,
        };
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn builtins_are_memoized() {
        let graph = NodeGraph::new();
        assert_eq!(graph.position_local(), graph.position_local());
        assert_eq!(graph.builtin("modelViewMatrix"), Some(graph.model_view_matrix()));
        assert!(graph.builtin("positionScreen").is_none());
    }

    #[test]
    fn swizzle_letter_sets_are_equivalent() {
        let graph = NodeGraph::new();
        let color = graph.vec4((0.1, 0.2, 0.3, 0.4));
        let masks = ["rgba", "xyzw", "stpq"].map(|mask| {
            let node = color.swizzle(mask).expect("valid swizzle");
            let NodeKind::Split(split) = &graph.entry(node.id()).kind else {
                panic!("expected a split node");
            };
            (split.node, split.components.clone())
        });
        assert!(masks.iter().all(|m| *m == (color.id(), "xyzw".to_string())));
    }

    #[test]
    fn dynamic_members() {
        let graph = NodeGraph::new();
        let v = graph.vec3((1.0, 2.0, 3.0));

        let Member::Node(zy) = v.member("bg").unwrap() else {
            panic!("expected a swizzle");
        };
        let NodeKind::Split(split) = &graph.entry(zy.id()).kind else {
            panic!("expected a split node");
        };
        assert_eq!(split.components, "zy");

        assert!(matches!(v.member("2").unwrap(), Member::Node(_)));
        assert!(matches!(v.member("abs").unwrap(), Member::Method(_)));
        assert!(matches!(v.member("nodeType").unwrap(), Member::Field(_)));

        let err = v.member("bogus").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownMember { .. }));

        let err = v.call_member("xyz", &[]).unwrap_err();
        assert_eq!(err.to_string(), "node element xyz is not a function");
    }

    #[test]
    fn compound_assign_outside_a_stack_returns_the_assignment() {
        let graph = NodeGraph::new();
        let acc = graph.property(NodeType::FLOAT, Some("acc"));
        let result = acc
            .call_member("addAssign", &[Value::Number(1.0)])
            .expect("addAssign resolves");
        let NodeKind::Operator(op) = &graph.entry(result.id()).kind else {
            panic!("expected an assignment");
        };
        assert_eq!(op.op.as_str(), "=");
        assert_eq!(op.a, acc.id());
    }

    #[test]
    fn operators_fold_left() {
        let graph = NodeGraph::new();
        let a = graph.uniform(NodeType::FLOAT, Some("a"));
        let sum = a
            .call_member("add", &[Value::Number(1.0), Value::Number(2.0)])
            .unwrap();
        let NodeKind::Operator(outer) = &graph.entry(sum.id()).kind else {
            panic!("expected an operator");
        };
        assert_eq!(outer.b, graph.float(2.0).id());
        assert!(matches!(graph.entry(outer.a).kind, NodeKind::Operator(_)));
    }
}

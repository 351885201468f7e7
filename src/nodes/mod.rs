//! Node kinds of the shader graph.
//!
//! Every node lives in a [`NodeGraph`](crate::graph::NodeGraph) arena as a
//! [`NodeKind`]. The builder drives each kind through three stages:
//! `construct` may rewrite the node into another sub-graph, `analyze` counts
//! usages for CSE, and `generate` emits the code fragment.

/// Declares a string-backed configuration enum (`op`, `method`, `scope`...).
/// Unknown strings fail with `UnknownVariant` naming the node kind and field.
macro_rules! node_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($node:literal, $field:literal) {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::NodeError;

            fn from_str(s: &str) -> crate::error::Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(crate::error::NodeError::unknown_variant($node, $field, s)),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod accessors;
pub mod context;
pub mod core;
pub mod display;
pub mod functions;
pub mod index;
pub mod math;
pub mod operator;
pub mod procedural;
pub mod utils;

use serde_json::{Map, Value};

use crate::builder::NodeBuilder;
use crate::builder::context::ContextMap;
use crate::error::{ErrorKind, NodeError, Result};
use crate::graph::NodeId;
use crate::types::NodeType;

pub use self::accessors::{
    Object3dNode, Object3dScope, Object3dTarget, PositionNode, PositionScope, SceneNode,
    SceneScope, TextureNode, TextureSizeNode, TimerNode, TimerScope,
};
pub use self::context::{BypassNode, ContextNode};
pub use self::core::{
    AttributeNode, ConstNode, ConstValue, FunctionNode, PropertyNode, StackNode, UniformNode,
    VaryingNode,
};
pub use self::display::{BlendMode, BlendModeNode};
pub use self::index::{FrontFacingNode, IndexNode, IndexScope};
pub use self::math::{MathMethod, MathNode};
pub use self::operator::{Op, OperatorNode};
pub use self::procedural::CheckerNode;
pub use self::utils::{
    ArrayElementNode, CondNode, ConvertNode, JoinNode, OscMethod, OscNode, PackingNode,
    PackingScope, RemapNode, SplitNode,
};

#[derive(Debug, Clone)]
pub enum NodeKind {
    Const(ConstNode),
    Property(PropertyNode),
    Varying(VaryingNode),
    Attribute(AttributeNode),
    Uniform(UniformNode),
    Stack(StackNode),
    Function(FunctionNode),
    Operator(OperatorNode),
    Math(MathNode),
    Context(ContextNode),
    Bypass(BypassNode),
    Index(IndexNode),
    FrontFacing(FrontFacingNode),
    Join(JoinNode),
    Split(SplitNode),
    Convert(ConvertNode),
    ArrayElement(ArrayElementNode),
    Cond(CondNode),
    Remap(RemapNode),
    Osc(OscNode),
    Packing(PackingNode),
    Position(PositionNode),
    Object3d(Object3dNode),
    Scene(SceneNode),
    Timer(TimerNode),
    Texture(TextureNode),
    TextureSize(TextureSizeNode),
    BlendMode(BlendModeNode),
    Checker(CheckerNode),
}

impl NodeKind {
    /// Class name used in serialized records.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Const(_) => "ConstNode",
            NodeKind::Property(_) => "PropertyNode",
            NodeKind::Varying(_) => "VaryingNode",
            NodeKind::Attribute(_) => "AttributeNode",
            NodeKind::Uniform(_) => "UniformNode",
            NodeKind::Stack(_) => "StackNode",
            NodeKind::Function(_) => "ShaderNode",
            NodeKind::Operator(_) => "OperatorNode",
            NodeKind::Math(_) => "MathNode",
            NodeKind::Context(_) => "ContextNode",
            NodeKind::Bypass(_) => "BypassNode",
            NodeKind::Index(_) => "IndexNode",
            NodeKind::FrontFacing(_) => "FrontFacingNode",
            NodeKind::Join(_) => "JoinNode",
            NodeKind::Split(_) => "SplitNode",
            NodeKind::Convert(_) => "ConvertNode",
            NodeKind::ArrayElement(_) => "ArrayElementNode",
            NodeKind::Cond(_) => "CondNode",
            NodeKind::Remap(_) => "RemapNode",
            NodeKind::Osc(_) => "OscNode",
            NodeKind::Packing(_) => "PackingNode",
            NodeKind::Position(_) => "PositionNode",
            NodeKind::Object3d(n) => n.type_name(),
            NodeKind::Scene(_) => "SceneNode",
            NodeKind::Timer(_) => "TimerNode",
            NodeKind::Texture(_) => "TextureNode",
            NodeKind::TextureSize(_) => "TextureSizeNode",
            NodeKind::BlendMode(_) => "BlendModeNode",
            NodeKind::Checker(_) => "CheckerNode",
        }
    }

    /// Child node references, in declaration order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Const(_)
            | NodeKind::Property(_)
            | NodeKind::Attribute(_)
            | NodeKind::Uniform(_)
            | NodeKind::Index(_)
            | NodeKind::FrontFacing(_)
            | NodeKind::Position(_)
            | NodeKind::Object3d(_)
            | NodeKind::Scene(_)
            | NodeKind::Timer(_) => Vec::new(),
            NodeKind::Varying(n) => vec![n.node],
            NodeKind::Stack(n) => {
                let mut children = n.statements.clone();
                children.push(n.output);
                children
            }
            NodeKind::Function(n) => n.inputs.iter().map(|(_, id)| *id).collect(),
            NodeKind::Operator(n) => vec![n.a, n.b],
            NodeKind::Math(n) => [Some(n.a), n.b, n.c].into_iter().flatten().collect(),
            NodeKind::Context(n) => vec![n.node],
            NodeKind::Bypass(n) => vec![n.call, n.output],
            NodeKind::Join(n) => n.nodes.clone(),
            NodeKind::Split(n) => vec![n.node],
            NodeKind::Convert(n) => vec![n.node],
            NodeKind::ArrayElement(n) => vec![n.node, n.index],
            NodeKind::Cond(n) => vec![n.cond, n.if_node, n.else_node],
            NodeKind::Remap(n) => vec![n.node, n.in_low, n.in_high, n.out_low, n.out_high],
            NodeKind::Osc(n) => vec![n.time],
            NodeKind::Packing(n) => vec![n.node],
            NodeKind::Texture(n) => [Some(n.uv), n.level].into_iter().flatten().collect(),
            NodeKind::TextureSize(n) => vec![n.texture, n.level],
            NodeKind::BlendMode(n) => vec![n.base, n.blend],
            NodeKind::Checker(n) => vec![n.uv],
        }
    }

    /// Semantic cache key. `None` means identity (the node's handle) is the key.
    pub fn hash(&self) -> Option<String> {
        match self {
            NodeKind::Property(n) => n.name.as_ref().map(|name| format!("property-{name}")),
            NodeKind::Varying(n) => n.name.as_ref().map(|name| format!("varying-{name}")),
            NodeKind::Attribute(n) => Some(format!("attribute-{}", n.name)),
            NodeKind::Position(n) => Some(format!("position-{}", n.scope)),
            NodeKind::Object3d(n) => Some(format!("{}-{}", n.target, n.scope)),
            NodeKind::Scene(n) => Some(format!("scene-{}", n.scope)),
            _ => None,
        }
    }

    /// Stage-invariant values: uniforms, named properties and per-vertex inputs.
    pub fn is_global(&self) -> bool {
        matches!(
            self,
            NodeKind::Const(_)
                | NodeKind::Property(_)
                | NodeKind::Varying(_)
                | NodeKind::Attribute(_)
                | NodeKind::Uniform(_)
                | NodeKind::Position(_)
                | NodeKind::Object3d(_)
                | NodeKind::Scene(_)
                | NodeKind::Timer(_)
        )
    }

    /// Nodes whose snippet is generated once per shader stage and then reused.
    pub(crate) fn generates_once(&self) -> bool {
        !matches!(self, NodeKind::Const(_))
            && (self.is_global()
                || matches!(
                    self,
                    NodeKind::Index(_)
                        | NodeKind::FrontFacing(_)
                        | NodeKind::Bypass(_)
                        | NodeKind::Stack(_)
                        | NodeKind::TextureSize(_)
                ))
    }

    /// Nodes that are stored into a temporary variable when used more than once.
    pub(crate) fn is_temp(&self) -> bool {
        match self {
            NodeKind::Operator(n) => n.op != Op::Assign,
            NodeKind::Math(_) | NodeKind::Join(_) | NodeKind::Cond(_) => true,
            _ => false,
        }
    }

    /// Context pushed around this node's children in every build stage.
    pub(crate) fn scoped_context(&self) -> Option<&ContextMap> {
        match self {
            NodeKind::Context(n) => Some(&n.context),
            _ => None,
        }
    }

    /// Whether the host must call `update(frame)` on this node.
    pub fn needs_update(&self) -> bool {
        matches!(
            self,
            NodeKind::Object3d(_) | NodeKind::Scene(_) | NodeKind::Timer(_)
        )
    }

    /// Type known without a builder, used by the conversion helpers.
    pub fn declared_type(&self) -> Option<NodeType> {
        match self {
            NodeKind::Const(n) => n.node_type().ok(),
            NodeKind::Property(n) => Some(n.node_type),
            NodeKind::Attribute(n) => Some(n.node_type),
            NodeKind::Uniform(n) => Some(n.node_type),
            NodeKind::Index(_) => Some(NodeType::UINT),
            NodeKind::FrontFacing(_) => Some(NodeType::BOOL),
            NodeKind::Join(n) => n.node_type,
            NodeKind::Convert(n) => Some(n.convert_to),
            NodeKind::Position(_) => Some(NodeType::VEC3),
            NodeKind::Object3d(n) => Some(n.scope.node_type()),
            NodeKind::Scene(_) | NodeKind::Timer(_) | NodeKind::Checker(_) => {
                Some(NodeType::FLOAT)
            }
            NodeKind::Texture(_) => Some(NodeType::VEC4),
            NodeKind::TextureSize(_) => Some(NodeType::UVEC2),
            _ => None,
        }
    }

    pub(crate) fn node_type(
        &self,
        builder: &NodeBuilder<'_>,
        id: NodeId,
        output: Option<NodeType>,
    ) -> Result<NodeType> {
        match self {
            NodeKind::Const(n) => n.node_type(),
            NodeKind::Varying(n) => builder.node_type(n.node),
            NodeKind::Stack(n) => builder.node_type(n.output),
            NodeKind::Operator(n) => n.node_type(builder, output),
            NodeKind::Math(n) => n.node_type(builder),
            NodeKind::Context(n) => builder.node_type(n.node),
            NodeKind::Bypass(n) => builder.node_type(n.output),
            NodeKind::Split(n) => n.node_type(builder),
            NodeKind::ArrayElement(n) => n.node_type(builder),
            NodeKind::Cond(n) => n.node_type(builder),
            NodeKind::Join(n) => n.node_type(builder),
            NodeKind::Function(_)
            | NodeKind::Remap(_)
            | NodeKind::Osc(_)
            | NodeKind::Packing(_)
            | NodeKind::BlendMode(_) => match builder.constructed_output(id) {
                Some(out) => builder.node_type(out),
                None => Err(ErrorKind::Unresolved(self.type_name().to_string()).into()),
            },
            other => other
                .declared_type()
                .ok_or_else(|| ErrorKind::Unresolved(other.type_name().to_string()).into()),
        }
    }

    /// Optional rewrite into another sub-graph. Runs once per builder.
    pub(crate) fn construct(&self, builder: &mut NodeBuilder<'_>) -> Result<Option<NodeId>> {
        match self {
            NodeKind::Function(n) => n.construct(builder).map(Some),
            NodeKind::Math(n) => n.construct(builder),
            NodeKind::Remap(n) => n.construct(builder).map(Some),
            NodeKind::Osc(n) => n.construct(builder).map(Some),
            NodeKind::Packing(n) => n.construct(builder).map(Some),
            NodeKind::Position(n) => n.construct(builder).map(Some),
            NodeKind::BlendMode(n) => n.construct(builder).map(Some),
            NodeKind::Checker(n) => n.construct(builder).map(Some),
            _ => Ok(None),
        }
    }

    pub(crate) fn generate(
        &self,
        builder: &mut NodeBuilder<'_>,
        id: NodeId,
        output: Option<NodeType>,
    ) -> Result<String> {
        if let Some(out) = builder.constructed_output(id) {
            let ty = match self {
                NodeKind::Position(_) => Some(NodeType::VEC3),
                _ => output,
            };
            return builder.build(out, ty);
        }

        match self {
            NodeKind::Const(n) => n.generate(builder, output),
            NodeKind::Property(n) => n.generate(builder, id),
            NodeKind::Varying(n) => n.generate(builder, id),
            NodeKind::Attribute(n) => n.generate(builder, id),
            NodeKind::Uniform(n) => n.generate(builder, id),
            NodeKind::Stack(n) => n.generate(builder),
            NodeKind::Operator(n) => n.generate(builder, output),
            NodeKind::Math(n) => n.generate(builder, output),
            NodeKind::Context(n) => n.generate(builder, output),
            NodeKind::Bypass(n) => n.generate(builder),
            NodeKind::Index(n) => n.generate(builder, id),
            NodeKind::FrontFacing(n) => n.generate(builder),
            NodeKind::Join(n) => n.generate(builder, output),
            NodeKind::Split(n) => n.generate(builder, output),
            NodeKind::Convert(n) => n.generate(builder, output),
            NodeKind::ArrayElement(n) => n.generate(builder, output),
            NodeKind::Cond(n) => n.generate(builder, output),
            NodeKind::Object3d(n) => n.generate(builder, id),
            NodeKind::Scene(n) => n.generate(builder, id),
            NodeKind::Timer(n) => n.generate(builder, id),
            NodeKind::Texture(n) => n.generate(builder, id, output),
            NodeKind::TextureSize(n) => n.generate(builder),
            NodeKind::Function(_)
            | NodeKind::Remap(_)
            | NodeKind::Osc(_)
            | NodeKind::Packing(_)
            | NodeKind::Position(_)
            | NodeKind::BlendMode(_)
            | NodeKind::Checker(_) => Err(NodeError::message(format!(
                "{} was not constructed before generation",
                self.type_name()
            ))),
        }
    }

    /// Write the scalar configuration that affects generated code.
    pub fn serialize(&self, data: &mut Map<String, Value>) {
        let mut put = |key: &str, value: Value| {
            data.insert(key.to_string(), value);
        };
        match self {
            NodeKind::Const(n) => {
                if let Ok(ty) = n.node_type() {
                    put("nodeType", ty.to_string().into());
                }
                put("value", n.value.to_json());
            }
            NodeKind::Property(n) => {
                put("nodeType", n.node_type.to_string().into());
                put("name", n.name.clone().map_or(Value::Null, Value::from));
            }
            NodeKind::Varying(n) => put("name", n.name.clone().map_or(Value::Null, Value::from)),
            NodeKind::Attribute(n) => {
                put("nodeType", n.node_type.to_string().into());
                put("name", n.name.clone().into());
            }
            NodeKind::Uniform(n) => {
                put("nodeType", n.node_type.to_string().into());
                put("name", n.name.clone().map_or(Value::Null, Value::from));
            }
            NodeKind::Function(n) => put("name", n.name.into()),
            NodeKind::Operator(n) => put("op", n.op.as_str().into()),
            NodeKind::Math(n) => put("method", n.method.as_str().into()),
            NodeKind::Context(n) => put("context", n.context.to_json()),
            NodeKind::Index(n) => put("scope", n.scope.as_str().into()),
            NodeKind::Join(n) => {
                if let Some(ty) = n.node_type {
                    put("nodeType", ty.to_string().into());
                }
            }
            NodeKind::Split(n) => put("components", n.components.clone().into()),
            NodeKind::Convert(n) => put("convertTo", n.convert_to.to_string().into()),
            NodeKind::Remap(n) => put("doClamp", n.do_clamp.into()),
            NodeKind::Osc(n) => put("method", n.method.as_str().into()),
            NodeKind::Packing(n) => put("scope", n.scope.as_str().into()),
            NodeKind::Position(n) => put("scope", n.scope.as_str().into()),
            NodeKind::Object3d(n) => put("scope", n.scope.as_str().into()),
            NodeKind::Scene(n) => put("scope", n.scope.as_str().into()),
            NodeKind::Timer(n) => {
                put("scope", n.scope.as_str().into());
                put("scale", n.scale.into());
            }
            NodeKind::Texture(n) => put("name", n.name.clone().into()),
            NodeKind::BlendMode(n) => put("blendMode", n.mode.as_str().into()),
            NodeKind::Stack(_)
            | NodeKind::Bypass(_)
            | NodeKind::FrontFacing(_)
            | NodeKind::ArrayElement(_)
            | NodeKind::Cond(_)
            | NodeKind::TextureSize(_)
            | NodeKind::Checker(_) => {}
        }
    }

    /// Restore the configuration written by [`NodeKind::serialize`].
    pub fn deserialize(&mut self, data: &Map<String, Value>) -> Result<()> {
        let node = self.type_name();
        let text = |key: &'static str| field(data, node, key);
        let optional_text = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);

        match self {
            NodeKind::Const(n) => {
                let ty: NodeType = text("nodeType")?.parse()?;
                let value = data.get("value").unwrap_or(&Value::Null);
                n.value = ConstValue::from_json(value, ty)?;
                n.ty = Some(ty);
            }
            NodeKind::Property(n) => {
                n.node_type = text("nodeType")?.parse()?;
                n.name = optional_text("name");
            }
            NodeKind::Varying(n) => n.name = optional_text("name"),
            NodeKind::Attribute(n) => {
                n.node_type = text("nodeType")?.parse()?;
                n.name = text("name")?.to_string();
            }
            NodeKind::Uniform(n) => {
                n.node_type = text("nodeType")?.parse()?;
                n.name = optional_text("name");
            }
            NodeKind::Function(n) => {
                let name = text("name")?;
                if name != n.name {
                    return Err(NodeError::unknown_variant("ShaderNode", "name", name));
                }
            }
            NodeKind::Operator(n) => n.op = text("op")?.parse()?,
            NodeKind::Math(n) => n.method = text("method")?.parse()?,
            NodeKind::Context(n) => {
                if let Some(context) = data.get("context") {
                    n.context = ContextMap::from_json(context)?;
                }
            }
            NodeKind::Index(n) => n.scope = text("scope")?.parse()?,
            NodeKind::Join(n) => {
                n.node_type = optional_text("nodeType").map(|t| t.parse()).transpose()?;
            }
            NodeKind::Split(n) => n.components = utils::normalize_swizzle(text("components")?)?,
            NodeKind::Convert(n) => n.convert_to = text("convertTo")?.parse()?,
            NodeKind::Remap(n) => {
                n.do_clamp = data.get("doClamp").and_then(Value::as_bool).unwrap_or(true);
            }
            NodeKind::Osc(n) => n.method = text("method")?.parse()?,
            NodeKind::Packing(n) => n.scope = text("scope")?.parse()?,
            NodeKind::Position(n) => n.scope = text("scope")?.parse()?,
            NodeKind::Object3d(n) => n.set_scope(text("scope")?.parse()?)?,
            NodeKind::Scene(n) => n.scope = text("scope")?.parse()?,
            NodeKind::Timer(n) => {
                n.scope = text("scope")?.parse()?;
                n.scale = data.get("scale").and_then(Value::as_f64).unwrap_or(1.0);
            }
            NodeKind::Texture(n) => n.name = text("name")?.to_string(),
            NodeKind::BlendMode(n) => n.mode = text("blendMode")?.parse()?,
            NodeKind::Stack(_)
            | NodeKind::Bypass(_)
            | NodeKind::FrontFacing(_)
            | NodeKind::ArrayElement(_)
            | NodeKind::Cond(_)
            | NodeKind::TextureSize(_)
            | NodeKind::Checker(_) => {}
        }
        Ok(())
    }
}

fn field<'a>(data: &'a Map<String, Value>, node: &str, key: &str) -> Result<&'a str> {
    data.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| NodeError::invalid_argument(format!("{node}: missing string field '{key}'")))
}

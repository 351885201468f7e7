//! Type constructors (`float`, `vec3`, `mat4`...) and the literal cache.

use std::collections::HashMap;
use std::f64::consts::{FRAC_1_PI, FRAC_2_PI, FRAC_PI_2, PI, TAU};

use crate::error::Result;
use crate::graph::{NodeGraph, NodeId};
use crate::nodes::{ConstNode, ConstValue, ConvertNode, JoinNode, NodeKind};
use crate::shader::{Node, EPSILON, INFINITY};
use crate::types::{Component, NodeType};

// ── Literal cache ──────────────────────────────────────────────────────

/// Shared constant nodes for common literals, keyed by component and exact
/// value. Filled when the graph is created and never changed afterwards.
#[derive(Debug, Default)]
pub struct ConstCache {
    nodes: HashMap<(Component, u64), NodeId>,
}

fn key(component: Component, value: f64) -> (Component, u64) {
    // -0.0 and 0.0 share a slot.
    let value = if value == 0.0 { 0.0 } else { value };
    (component, value.to_bits())
}

impl ConstCache {
    pub fn populate(graph: &NodeGraph) -> Self {
        let mut cache = Self::default();
        let mut add = |component: Component, value: f64| {
            cache.nodes.entry(key(component, value)).or_insert_with(|| {
                graph.add(NodeKind::Const(ConstNode {
                    value: ConstValue::scalar(component, value),
                    ty: Some(NodeType::Scalar(component)),
                }))
            });
        };

        for value in [0.0, 1.0] {
            add(Component::Bool, value);
        }
        for value in [0.0, 1.0, 2.0, 3.0] {
            add(Component::Uint, value);
        }
        for value in [0.0, 1.0, 2.0, 3.0, -1.0, -2.0] {
            add(Component::Int, value);
        }
        let floats = [
            0.0,
            1.0,
            2.0,
            3.0,
            0.5,
            1.5,
            1.0 / 3.0,
            EPSILON,
            INFINITY,
            PI,
            TAU,
            FRAC_1_PI,
            FRAC_2_PI,
            1.0 / TAU,
            FRAC_PI_2,
        ];
        for value in floats {
            add(Component::Float, value);
            add(Component::Float, -value);
        }
        cache
    }

    pub fn get(&self, component: Component, value: f64) -> Option<NodeId> {
        self.nodes.get(&key(component, value)).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ── Constructor arguments ──────────────────────────────────────────────

/// One argument of a type constructor.
#[derive(Debug, Clone, Copy)]
pub enum ConvertArg<'g> {
    Number(f64),
    Bool(bool),
    Node(Node<'g>),
}

impl ConvertArg<'_> {
    fn raw(&self) -> Option<f64> {
        match *self {
            ConvertArg::Number(v) => Some(v),
            ConvertArg::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
            ConvertArg::Node(_) => None,
        }
    }
}

pub trait IntoConvertArg<'g> {
    fn into_convert_arg(self) -> ConvertArg<'g>;
}

impl<'g> IntoConvertArg<'g> for Node<'g> {
    fn into_convert_arg(self) -> ConvertArg<'g> {
        ConvertArg::Node(self)
    }
}

impl<'g> IntoConvertArg<'g> for f64 {
    fn into_convert_arg(self) -> ConvertArg<'g> {
        ConvertArg::Number(self)
    }
}

impl<'g> IntoConvertArg<'g> for f32 {
    fn into_convert_arg(self) -> ConvertArg<'g> {
        ConvertArg::Number(f64::from(self))
    }
}

impl<'g> IntoConvertArg<'g> for i32 {
    fn into_convert_arg(self) -> ConvertArg<'g> {
        ConvertArg::Number(f64::from(self))
    }
}

impl<'g> IntoConvertArg<'g> for u32 {
    fn into_convert_arg(self) -> ConvertArg<'g> {
        ConvertArg::Number(f64::from(self))
    }
}

impl<'g> IntoConvertArg<'g> for bool {
    fn into_convert_arg(self) -> ConvertArg<'g> {
        ConvertArg::Bool(self)
    }
}

impl<'g> IntoConvertArg<'g> for ConvertArg<'g> {
    fn into_convert_arg(self) -> ConvertArg<'g> {
        self
    }
}

/// Argument list of a type constructor: nothing, a single value, a tuple
/// of up to four values or a vector.
pub trait IntoConvertArgs<'g> {
    fn into_convert_args(self) -> Vec<ConvertArg<'g>>;
}

impl<'g, T: IntoConvertArg<'g>> IntoConvertArgs<'g> for T {
    fn into_convert_args(self) -> Vec<ConvertArg<'g>> {
        vec![self.into_convert_arg()]
    }
}

impl<'g> IntoConvertArgs<'g> for () {
    fn into_convert_args(self) -> Vec<ConvertArg<'g>> {
        Vec::new()
    }
}

impl<'g> IntoConvertArgs<'g> for Vec<ConvertArg<'g>> {
    fn into_convert_args(self) -> Vec<ConvertArg<'g>> {
        self
    }
}

impl<'g, A: IntoConvertArg<'g>, B: IntoConvertArg<'g>> IntoConvertArgs<'g> for (A, B) {
    fn into_convert_args(self) -> Vec<ConvertArg<'g>> {
        vec![self.0.into_convert_arg(), self.1.into_convert_arg()]
    }
}

impl<'g, A, B, C> IntoConvertArgs<'g> for (A, B, C)
where
    A: IntoConvertArg<'g>,
    B: IntoConvertArg<'g>,
    C: IntoConvertArg<'g>,
{
    fn into_convert_args(self) -> Vec<ConvertArg<'g>> {
        vec![
            self.0.into_convert_arg(),
            self.1.into_convert_arg(),
            self.2.into_convert_arg(),
        ]
    }
}

impl<'g, A, B, C, D> IntoConvertArgs<'g> for (A, B, C, D)
where
    A: IntoConvertArg<'g>,
    B: IntoConvertArg<'g>,
    C: IntoConvertArg<'g>,
    D: IntoConvertArg<'g>,
{
    fn into_convert_args(self) -> Vec<ConvertArg<'g>> {
        vec![
            self.0.into_convert_arg(),
            self.1.into_convert_arg(),
            self.2.into_convert_arg(),
            self.3.into_convert_arg(),
        ]
    }
}

// ── Conversion ─────────────────────────────────────────────────────────

fn literal<'g>(graph: &'g NodeGraph, ty: NodeType, values: &[f64]) -> Node<'g> {
    if let (NodeType::Scalar(component), [_] | []) = (ty, values) {
        let value = values.first().copied().unwrap_or(0.0);
        if let Some(id) = graph.constants().get(component, value) {
            return graph.node(id);
        }
    }
    graph.insert(NodeKind::Const(ConstNode {
        value: ConstValue::from_type(ty, values),
        ty: Some(ty),
    }))
}

/// Build a value of type `ty` from constructor arguments:
///
/// - no arguments give the type's default literal,
/// - raw numbers only give one literal (cached for common scalars),
/// - a single node of type `ty` is returned as is,
/// - any other single node is wrapped in a conversion,
/// - several arguments are joined component-wise.
pub fn convert_type<'g>(graph: &'g NodeGraph, ty: NodeType, args: Vec<ConvertArg<'g>>) -> Node<'g> {
    let raw: Option<Vec<f64>> = args.iter().map(ConvertArg::raw).collect();
    if let Some(values) = raw {
        return literal(graph, ty, &values);
    }

    match args.as_slice() {
        [ConvertArg::Node(node)] => {
            if node.static_type() == Some(ty) {
                *node
            } else {
                graph.insert(NodeKind::Convert(ConvertNode {
                    node: node.id(),
                    convert_to: ty,
                }))
            }
        }
        _ => {
            let nodes = args
                .iter()
                .map(|arg| match *arg {
                    ConvertArg::Node(node) => node.id(),
                    ConvertArg::Number(v) => graph.float(v).id(),
                    ConvertArg::Bool(b) => graph.bool(b).id(),
                })
                .collect();
            graph.insert(NodeKind::Join(JoinNode {
                nodes,
                node_type: Some(ty),
            }))
        }
    }
}

macro_rules! constructors {
    ($($name:ident => $ty:expr),+ $(,)?) => {
        $(
            pub fn $name<'g>(&'g self, args: impl IntoConvertArgs<'g>) -> Node<'g> {
                convert_type(self, $ty, args.into_convert_args())
            }
        )+
    };
}

impl NodeGraph {
    constructors! {
        float => NodeType::FLOAT,
        int => NodeType::INT,
        uint => NodeType::UINT,
        bool => NodeType::BOOL,
        color => NodeType::VEC3,
        vec2 => NodeType::VEC2,
        vec3 => NodeType::VEC3,
        vec4 => NodeType::VEC4,
        ivec2 => NodeType::Vector(Component::Int, 2),
        ivec3 => NodeType::Vector(Component::Int, 3),
        ivec4 => NodeType::Vector(Component::Int, 4),
        uvec2 => NodeType::UVEC2,
        uvec3 => NodeType::Vector(Component::Uint, 3),
        uvec4 => NodeType::Vector(Component::Uint, 4),
        bvec2 => NodeType::Vector(Component::Bool, 2),
        bvec3 => NodeType::Vector(Component::Bool, 3),
        bvec4 => NodeType::Vector(Component::Bool, 4),
        mat3 => NodeType::MAT3,
        mat4 => NodeType::MAT4,
    }

    /// Constructor of `ty` over already-built nodes.
    pub fn convert_nodes<'g>(&'g self, ty: NodeType, nodes: Vec<Node<'g>>) -> Node<'g> {
        convert_type(self, ty, nodes.into_iter().map(ConvertArg::Node).collect())
    }

    /// Constructor by type name, as used by scripts (`vec3`, `color`...).
    pub fn construct_named<'g>(&'g self, name: &str, args: Vec<ConvertArg<'g>>) -> Option<Node<'g>> {
        let ty = match name {
            "color" => NodeType::VEC3,
            other => other.parse::<NodeType>().ok()?,
        };
        if ty.is_reference() || ty == NodeType::Void {
            return None;
        }
        Some(convert_type(self, ty, args))
    }

    /// Literal node holding `value`, typed after the value.
    pub fn constant(&self, value: ConstValue) -> Result<Node<'_>> {
        value.value_type()?;
        Ok(self.insert(NodeKind::Const(ConstNode { value, ty: None })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_literals_share_one_node() {
        let graph = NodeGraph::new();
        for value in [0.0, 1.0, -1.0, 0.5, PI, -TAU, EPSILON] {
            assert_eq!(graph.float(value), graph.float(value));
        }
        assert_eq!(graph.float(-0.0), graph.float(0.0));
        assert_eq!(graph.uint(2), graph.uint(2));
        assert_eq!(graph.bool(true), graph.bool(true));
        assert_ne!(graph.float(1.0), graph.int(1));
        assert_ne!(graph.float(0.7), graph.float(0.7));
    }

    #[test]
    fn constructor_rules() {
        let graph = NodeGraph::new();

        let literal = graph.vec3((2.0, 0.0, 0.0));
        assert!(matches!(graph.entry(literal.id()).kind, NodeKind::Const(_)));

        let v = graph.vec3(1.0);
        assert_eq!(graph.vec3(v), v);
        assert!(matches!(graph.entry(graph.vec4(v).id()).kind, NodeKind::Convert(_)));

        let joined = graph.vec4((v, 1.0));
        let NodeKind::Join(join) = &graph.entry(joined.id()).kind else {
            panic!("expected a join");
        };
        assert_eq!(join.nodes.len(), 2);
        assert_eq!(join.node_type, Some(NodeType::VEC4));
    }

    #[test]
    fn default_literals() {
        let graph = NodeGraph::new();
        let NodeKind::Const(zero) = &graph.entry(graph.vec2(()).id()).kind else {
            panic!("expected a literal");
        };
        assert_eq!(zero.value, ConstValue::Vector(vec![0.0, 0.0]));
        assert_eq!(graph.float(()), graph.float(0.0));
    }
}

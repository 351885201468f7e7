//! Leaf value nodes and the statement stack.

use std::fmt;

use serde_json::Value;

use crate::builder::{NodeBuilder, Stage};
use crate::error::{NodeError, Result};
use crate::graph::NodeId;
use crate::nodes::NodeKind;
use crate::shader::tsl::{Inputs, ShaderFn};
use crate::types::{Component, NodeType};

// ── Literals ───────────────────────────────────────────────────────────

/// Literal payload of a [`ConstNode`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Vector(Vec<f64>),
    /// Column-major elements of a 3x3 or 4x4 matrix.
    Matrix(Vec<f64>),
}

impl ConstValue {
    /// Type the literal has on its own. Vectors hold 2 to 4 components and
    /// matrices 9 or 16 elements; other lengths are rejected.
    pub fn value_type(&self) -> Result<NodeType> {
        match self {
            ConstValue::Bool(_) => Ok(NodeType::BOOL),
            ConstValue::Int(_) => Ok(NodeType::INT),
            ConstValue::Uint(_) => Ok(NodeType::UINT),
            ConstValue::Float(_) => Ok(NodeType::FLOAT),
            ConstValue::Vector(v) => match v.len() {
                n @ 2..=4 => Ok(NodeType::Vector(Component::Float, n as u8)),
                n => Err(NodeError::invalid_argument(format!(
                    "ConstNode: a vector literal has 2 to 4 components, got {n}"
                ))),
            },
            ConstValue::Matrix(v) => match v.len() {
                9 => Ok(NodeType::MAT3),
                16 => Ok(NodeType::MAT4),
                n => Err(NodeError::invalid_argument(format!(
                    "ConstNode: a matrix literal has 9 or 16 elements, got {n}"
                ))),
            },
        }
    }

    /// Numeric view of every component.
    pub fn components(&self) -> Vec<f64> {
        match self {
            ConstValue::Bool(b) => vec![if *b { 1.0 } else { 0.0 }],
            ConstValue::Int(i) => vec![*i as f64],
            ConstValue::Uint(u) => vec![*u as f64],
            ConstValue::Float(f) => vec![*f],
            ConstValue::Vector(v) | ConstValue::Matrix(v) => v.clone(),
        }
    }

    /// Scalar literal of the given component type.
    pub fn scalar(component: Component, value: f64) -> ConstValue {
        match component {
            Component::Bool => ConstValue::Bool(value != 0.0),
            Component::Int => ConstValue::Int(value.trunc() as i64),
            Component::Uint => ConstValue::Uint(value.max(0.0).trunc() as u64),
            Component::Float => ConstValue::Float(value),
        }
    }

    /// Literal for a constructor call made only of raw numbers.
    /// No values gives the type's default (zero, or identity for matrices);
    /// a single value splats across a vector or fills a matrix diagonal.
    pub fn from_type(ty: NodeType, values: &[f64]) -> ConstValue {
        match ty {
            NodeType::Scalar(c) => ConstValue::scalar(c, values.first().copied().unwrap_or(0.0)),
            NodeType::Vector(_, n) => {
                let n = n as usize;
                let components = match values {
                    [] => vec![0.0; n],
                    [v] => vec![*v; n],
                    _ => (0..n).map(|i| values.get(i).copied().unwrap_or(0.0)).collect(),
                };
                ConstValue::Vector(components)
            }
            NodeType::Matrix(_, n) => {
                let n = n as usize;
                let elements = if values.len() > 1 {
                    (0..n * n).map(|i| values.get(i).copied().unwrap_or(0.0)).collect()
                } else {
                    let diagonal = values.first().copied().unwrap_or(1.0);
                    (0..n * n)
                        .map(|i| if i % (n + 1) == 0 { diagonal } else { 0.0 })
                        .collect()
                };
                ConstValue::Matrix(elements)
            }
            NodeType::Void | NodeType::Texture | NodeType::Str => ConstValue::Float(0.0),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ConstValue::Bool(b) => Value::from(*b),
            ConstValue::Int(i) => Value::from(*i),
            ConstValue::Uint(u) => Value::from(*u),
            ConstValue::Float(f) => Value::from(*f),
            ConstValue::Vector(v) | ConstValue::Matrix(v) => Value::from(v.clone()),
        }
    }

    pub fn from_json(value: &Value, ty: NodeType) -> Result<ConstValue> {
        let number = |v: &Value| {
            v.as_f64()
                .or_else(|| v.as_bool().map(|b| if b { 1.0 } else { 0.0 }))
                .ok_or_else(|| NodeError::invalid_argument(format!("ConstNode: bad value {v}")))
        };
        match (ty, value) {
            (NodeType::Scalar(c), v) => Ok(ConstValue::scalar(c, number(v)?)),
            (NodeType::Vector(..) | NodeType::Matrix(..), Value::Array(items)) => {
                let expected = ty.length();
                if items.len() != expected && items.len() != 1 {
                    return Err(NodeError::invalid_argument(format!(
                        "ConstNode: {ty} needs {expected} values, got {}",
                        items.len()
                    )));
                }
                let values = items.iter().map(number).collect::<Result<Vec<_>>>()?;
                Ok(ConstValue::from_type(ty, &values))
            }
            (NodeType::Vector(..) | NodeType::Matrix(..), v) => {
                Ok(ConstValue::from_type(ty, &[number(v)?]))
            }
            _ => Err(NodeError::invalid_argument(format!(
                "ConstNode: cannot hold a value of type {ty}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConstNode {
    pub value: ConstValue,
    pub ty: Option<NodeType>,
}

impl ConstNode {
    pub fn node_type(&self) -> Result<NodeType> {
        match self.ty {
            Some(ty) => Ok(ty),
            None => self.value.value_type(),
        }
    }

    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, output: Option<NodeType>) -> Result<String> {
        let ty = self.node_type()?;
        let snippet = builder.const_snippet(ty, &self.value);
        Ok(builder.format(&snippet, ty, output))
    }
}

// ── Named values ───────────────────────────────────────────────────────

/// Scratch variable declared in the current stage. Named properties
/// co-identify: every `PropertyNode` with the same name is one variable.
#[derive(Debug, Clone)]
pub struct PropertyNode {
    pub node_type: NodeType,
    pub name: Option<String>,
}

impl PropertyNode {
    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, id: NodeId) -> Result<String> {
        Ok(builder.var_from_node(id, self.name.as_deref(), self.node_type))
    }
}

/// Value computed in the vertex stage and interpolated into the fragment stage.
#[derive(Debug, Clone)]
pub struct VaryingNode {
    pub node: NodeId,
    pub name: Option<String>,
}

impl VaryingNode {
    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, id: NodeId) -> Result<String> {
        let ty = builder.node_type(self.node)?;

        if builder.stage() == Stage::Compute {
            return builder.build(self.node, Some(ty));
        }

        let index = builder.varying_from_node(id, ty, self.name.as_deref());
        builder.flow_varying(index, self.node, ty)?;
        Ok(builder.varying_property(index))
    }
}

/// Per-vertex input. Read in the fragment stage it is carried by a varying.
#[derive(Debug, Clone)]
pub struct AttributeNode {
    pub name: String,
    pub node_type: NodeType,
}

impl AttributeNode {
    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, id: NodeId) -> Result<String> {
        match builder.stage() {
            Stage::Vertex => Ok(builder.attribute(&self.name, self.node_type)),
            Stage::Fragment => {
                let varying = builder.derived_node(id, "varying", |graph| {
                    graph.add(NodeKind::Varying(VaryingNode { node: id, name: None }))
                });
                builder.build(varying, Some(self.node_type))
            }
            Stage::Compute => Err(NodeError::unsupported(
                builder.language().name(),
                format!("vertex attribute '{}' in a compute shader", self.name),
            )),
        }
    }
}

/// Host-provided value, refreshed between frames.
#[derive(Debug, Clone)]
pub struct UniformNode {
    pub node_type: NodeType,
    pub name: Option<String>,
}

impl UniformNode {
    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, id: NodeId) -> Result<String> {
        Ok(builder.uniform_from_node(id, self.node_type, self.name.as_deref()))
    }
}

// ── Statements ─────────────────────────────────────────────────────────

/// Statements emitted before an output value is read.
#[derive(Debug, Clone)]
pub struct StackNode {
    pub statements: Vec<NodeId>,
    pub output: NodeId,
}

impl StackNode {
    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>) -> Result<String> {
        for &statement in &self.statements {
            let snippet = builder.build(statement, Some(NodeType::Void))?;
            builder.add_statement(statement, &snippet);
        }
        let ty = builder.node_type(self.output)?;
        builder.build(self.output, Some(ty))
    }
}

/// Deferred `tslFn` invocation: the function runs in the construct stage.
#[derive(Clone)]
pub struct FunctionNode {
    pub name: &'static str,
    pub func: ShaderFn,
    pub inputs: Vec<(String, NodeId)>,
}

impl fmt::Debug for FunctionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionNode")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .finish()
    }
}

impl FunctionNode {
    pub(crate) fn construct(&self, builder: &mut NodeBuilder<'_>) -> Result<NodeId> {
        let graph = builder.graph();
        let inputs = Inputs::from_ids(graph, self.name, &self.inputs);
        graph.run_in_stack(|| (self.func)(&inputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_literals() {
        assert_eq!(ConstValue::from_type(NodeType::VEC3, &[]), ConstValue::Vector(vec![0.0; 3]));
        assert_eq!(
            ConstValue::from_type(NodeType::VEC2, &[0.5]),
            ConstValue::Vector(vec![0.5, 0.5])
        );
        let ConstValue::Matrix(identity) = ConstValue::from_type(NodeType::MAT3, &[]) else {
            panic!("expected a matrix literal");
        };
        assert_eq!(identity, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn scalar_coercion() {
        assert_eq!(ConstValue::scalar(Component::Uint, -3.0), ConstValue::Uint(0));
        assert_eq!(ConstValue::scalar(Component::Int, 2.7), ConstValue::Int(2));
        assert_eq!(ConstValue::scalar(Component::Bool, 1.0), ConstValue::Bool(true));
    }

    #[test]
    fn json_round_trip_keeps_type() {
        let value = ConstValue::Vector(vec![1.0, 2.0, 3.0]);
        let json = value.to_json();
        assert_eq!(ConstValue::from_json(&json, NodeType::VEC3).unwrap(), value);
        assert!(ConstValue::from_json(&json, NodeType::Texture).is_err());
    }

    #[test]
    fn literal_lengths_are_checked() {
        assert!(ConstValue::Vector(vec![1.0; 5]).value_type().is_err());
        assert!(ConstValue::Vector(vec![1.0]).value_type().is_err());
        assert!(ConstValue::Matrix(vec![0.0; 12]).value_type().is_err());
        assert_eq!(ConstValue::Matrix(vec![0.0; 16]).value_type().unwrap(), NodeType::MAT4);

        let err = ConstValue::from_json(&serde_json::json!([1.0, 2.0]), NodeType::VEC3).unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: ConstNode: vec3 needs 3 values, got 2");
        assert_eq!(
            ConstValue::from_json(&serde_json::json!([0.5]), NodeType::VEC3).unwrap(),
            ConstValue::Vector(vec![0.5; 3])
        );
        assert!(ConstValue::from_json(&serde_json::json!([1.0, 1.0, 1.0, 1.0]), NodeType::MAT3).is_err());

        let node = ConstNode {
            value: ConstValue::Vector(vec![1.0; 6]),
            ty: None,
        };
        assert!(node.node_type().is_err());
    }
}

use std::f64::consts::PI;

use crate::builder::NodeBuilder;
use crate::error::{NodeError, Result};
use crate::graph::NodeId;
use crate::types::{Component, NodeType};

const VECTOR_COMPONENTS: &str = "xyzw";

/// Map `rgba`/`stpq` letters onto `xyzw`. Accepts 1-4 letters.
pub fn normalize_swizzle(mask: &str) -> Result<String> {
    if mask.is_empty() || mask.len() > 4 {
        return Err(NodeError::invalid_argument(format!("invalid swizzle '{mask}'")));
    }
    mask.chars()
        .map(|c| match c {
            'x' | 'r' | 's' => Ok('x'),
            'y' | 'g' | 't' => Ok('y'),
            'z' | 'b' | 'p' => Ok('z'),
            'w' | 'a' | 'q' => Ok('w'),
            _ => Err(NodeError::invalid_argument(format!("invalid swizzle '{mask}'"))),
        })
        .collect()
}

/// Whether `name` is a swizzle mask (1-4 component letters from any set).
pub fn is_swizzle(name: &str) -> bool {
    (1..=4).contains(&name.len()) && name.chars().all(|c| "xyzwrgbastpq".contains(c))
}

// ── Vector assembly ────────────────────────────────────────────────────

/// Constructor call over several nodes: `vec3(a, b, c)`.
#[derive(Debug, Clone)]
pub struct JoinNode {
    pub nodes: Vec<NodeId>,
    pub node_type: Option<NodeType>,
}

impl JoinNode {
    pub(crate) fn node_type(&self, builder: &NodeBuilder<'_>) -> Result<NodeType> {
        if let Some(ty) = self.node_type {
            return Ok(ty);
        }
        let mut length = 0;
        for &node in &self.nodes {
            length += builder.node_type(node)?.length();
        }
        Ok(NodeType::from_length(length, Component::Float).unwrap_or(NodeType::VEC4))
    }

    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, output: Option<NodeType>) -> Result<String> {
        let ty = self.node_type(builder)?;
        let component = ty.component().unwrap_or(Component::Float);

        let mut values = Vec::with_capacity(self.nodes.len());
        for &node in &self.nodes {
            let input_type = builder.node_type(node)?;
            let target = NodeType::from_length(input_type.length(), component).unwrap_or(input_type);
            values.push(builder.build(node, Some(target))?);
        }

        let snippet = format!("{}({})", builder.type_name(ty), values.join(", "));
        Ok(builder.format(&snippet, ty, output))
    }
}

/// Component extraction (swizzle). `components` only holds `xyzw` letters.
#[derive(Debug, Clone)]
pub struct SplitNode {
    pub node: NodeId,
    pub components: String,
}

impl SplitNode {
    fn vector_length(&self) -> usize {
        self.components
            .chars()
            .filter_map(|c| VECTOR_COMPONENTS.find(c))
            .map(|i| i + 1)
            .max()
            .unwrap_or(1)
    }

    fn component(&self, builder: &NodeBuilder<'_>) -> Result<Component> {
        Ok(builder.node_type(self.node)?.component().unwrap_or(Component::Float))
    }

    pub(crate) fn node_type(&self, builder: &NodeBuilder<'_>) -> Result<NodeType> {
        let component = self.component(builder)?;
        Ok(NodeType::from_length(self.components.len(), component).unwrap_or(NodeType::FLOAT))
    }

    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, output: Option<NodeType>) -> Result<String> {
        let node_length = builder.node_type(self.node)?.length();

        if node_length <= 1 {
            return builder.build(self.node, output);
        }

        let vector_length = self.vector_length();
        let ty = if vector_length >= node_length {
            NodeType::from_length(vector_length, self.component(builder)?)
        } else {
            None
        };
        let snippet = builder.build(self.node, ty)?;

        let identity = self.components.len() == node_length
            && VECTOR_COMPONENTS.starts_with(self.components.as_str());
        if identity {
            let from = ty.unwrap_or(self.node_type(builder)?);
            Ok(builder.format(&snippet, from, output))
        } else {
            let split_type = self.node_type(builder)?;
            Ok(builder.format(&format!("{snippet}.{}", self.components), split_type, output))
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConvertNode {
    pub node: NodeId,
    pub convert_to: NodeType,
}

impl ConvertNode {
    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, output: Option<NodeType>) -> Result<String> {
        let snippet = builder.build(self.node, Some(self.convert_to))?;
        Ok(builder.format(&snippet, self.convert_to, output))
    }
}

/// `node[index]` over a vector, matrix or array.
#[derive(Debug, Clone)]
pub struct ArrayElementNode {
    pub node: NodeId,
    pub index: NodeId,
}

impl ArrayElementNode {
    pub(crate) fn node_type(&self, builder: &NodeBuilder<'_>) -> Result<NodeType> {
        let ty = builder.node_type(self.node)?;
        Ok(match ty {
            NodeType::Vector(c, _) => NodeType::Scalar(c),
            NodeType::Matrix(..) => ty.vector_from_matrix(),
            other => other,
        })
    }

    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, output: Option<NodeType>) -> Result<String> {
        let ty = self.node_type(builder)?;
        let node = builder.build(self.node, None)?;
        let index = builder.build(self.index, Some(NodeType::UINT))?;
        Ok(builder.format(&format!("{node}[{index}]"), ty, output))
    }
}

/// Ternary select between two values.
#[derive(Debug, Clone)]
pub struct CondNode {
    pub cond: NodeId,
    pub if_node: NodeId,
    pub else_node: NodeId,
}

impl CondNode {
    pub(crate) fn node_type(&self, builder: &NodeBuilder<'_>) -> Result<NodeType> {
        let if_type = builder.node_type(self.if_node)?;
        let else_type = builder.node_type(self.else_node)?;
        Ok(if else_type.length() > if_type.length() {
            else_type
        } else {
            if_type
        })
    }

    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, output: Option<NodeType>) -> Result<String> {
        let ty = self.node_type(builder)?;
        let cond = builder.build(self.cond, Some(NodeType::BOOL))?;
        let if_value = builder.build(self.if_node, Some(ty))?;
        let else_value = builder.build(self.else_node, Some(ty))?;
        let snippet = builder.language().select(&cond, &if_value, &else_value);
        Ok(builder.format(&snippet, ty, output))
    }
}

// ── Composite rewrites ─────────────────────────────────────────────────

/// Linear remap of `node` from `[in_low, in_high]` to `[out_low, out_high]`.
#[derive(Debug, Clone)]
pub struct RemapNode {
    pub node: NodeId,
    pub in_low: NodeId,
    pub in_high: NodeId,
    pub out_low: NodeId,
    pub out_high: NodeId,
    pub do_clamp: bool,
}

impl RemapNode {
    pub(crate) fn construct(&self, builder: &mut NodeBuilder<'_>) -> Result<NodeId> {
        let graph = builder.graph();
        let node = graph.node(self.node);
        let (in_low, in_high) = (graph.node(self.in_low), graph.node(self.in_high));
        let (out_low, out_high) = (graph.node(self.out_low), graph.node(self.out_high));

        let mut t = node.sub(in_low).div(in_high.sub(in_low));
        if self.do_clamp {
            t = t.clamp(0.0, 1.0);
        }
        Ok(t.mul(out_high.sub(out_low)).add(out_low).id())
    }
}

node_enum! {
    pub enum OscMethod ("OscNode", "method") {
        Sine => "sine",
        Square => "square",
        Triangle => "triangle",
        Sawtooth => "sawtooth",
    }
}

/// Periodic waveform in `[0, 1]` driven by a time node.
#[derive(Debug, Clone)]
pub struct OscNode {
    pub method: OscMethod,
    pub time: NodeId,
}

impl OscNode {
    pub(crate) fn construct(&self, builder: &mut NodeBuilder<'_>) -> Result<NodeId> {
        let graph = builder.graph();
        let time = graph.node(self.time);

        let output = match self.method {
            OscMethod::Sine => time.add(0.75).mul(PI * 2.0).sin().mul(0.5).add(0.5),
            OscMethod::Square => time.fract().round(),
            OscMethod::Triangle => time.add(0.5).fract().mul(2.0).sub(1.0).abs(),
            OscMethod::Sawtooth => time.fract(),
        };
        Ok(output.id())
    }
}

node_enum! {
    pub enum PackingScope ("PackingNode", "scope") {
        DirectionToColor => "directionToColor",
        ColorToDirection => "colorToDirection",
    }
}

/// Conversion between signed directions and `[0, 1]` colors.
#[derive(Debug, Clone)]
pub struct PackingNode {
    pub scope: PackingScope,
    pub node: NodeId,
}

impl PackingNode {
    pub(crate) fn construct(&self, builder: &mut NodeBuilder<'_>) -> Result<NodeId> {
        let node = builder.graph().node(self.node);
        let output = match self.scope {
            PackingScope::DirectionToColor => node.mul(0.5).add(0.5),
            PackingScope::ColorToDirection => node.mul(2.0).sub(1.0),
        };
        Ok(output.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swizzle_sets_normalize_to_xyzw() {
        assert_eq!(normalize_swizzle("rgba").unwrap(), "xyzw");
        assert_eq!(normalize_swizzle("stpq").unwrap(), "xyzw");
        assert_eq!(normalize_swizzle("bgr").unwrap(), "zyx");
    }

    #[test]
    fn invalid_swizzles() {
        assert!(normalize_swizzle("").is_err());
        assert!(normalize_swizzle("xyzwx").is_err());
        assert!(normalize_swizzle("xk").is_err());
        assert!(!is_swizzle("width"));
        assert!(is_swizzle("ts"));
    }
}

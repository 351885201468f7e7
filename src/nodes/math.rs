use crate::builder::NodeBuilder;
use crate::error::Result;
use crate::graph::NodeId;
use crate::types::NodeType;

node_enum! {
    pub enum MathMethod ("MathNode", "method") {
        // 1 input
        Radians => "radians",
        Degrees => "degrees",
        Exp => "exp",
        Exp2 => "exp2",
        Log => "log",
        Log2 => "log2",
        Sqrt => "sqrt",
        InverseSqrt => "inversesqrt",
        Floor => "floor",
        Ceil => "ceil",
        Normalize => "normalize",
        Fract => "fract",
        Sin => "sin",
        Cos => "cos",
        Tan => "tan",
        Asin => "asin",
        Acos => "acos",
        Atan => "atan",
        Abs => "abs",
        Sign => "sign",
        Length => "length",
        Negate => "negate",
        OneMinus => "oneMinus",
        DFdx => "dFdx",
        DFdy => "dFdy",
        Round => "round",
        Reciprocal => "reciprocal",
        Trunc => "trunc",
        Fwidth => "fwidth",
        // 2 inputs
        Atan2 => "atan2",
        Min => "min",
        Max => "max",
        Mod => "mod",
        Step => "step",
        Reflect => "reflect",
        Distance => "distance",
        Difference => "difference",
        Dot => "dot",
        Cross => "cross",
        Pow => "pow",
        TransformDirection => "transformDirection",
        // 3 inputs
        Mix => "mix",
        Clamp => "clamp",
        Refract => "refract",
        Smoothstep => "smoothstep",
        FaceForward => "faceforward",
    }
}

impl MathMethod {
    pub fn arity(self) -> usize {
        use MathMethod::*;
        match self {
            Atan2 | Min | Max | Mod | Step | Reflect | Distance | Difference | Dot | Cross
            | Pow | TransformDirection => 2,
            Mix | Clamp | Refract | Smoothstep | FaceForward => 3,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MathNode {
    pub method: MathMethod,
    pub a: NodeId,
    pub b: Option<NodeId>,
    pub c: Option<NodeId>,
}

impl MathNode {
    /// Operand type with the most components; matrices count as zero.
    pub(crate) fn input_type(&self, builder: &NodeBuilder<'_>) -> Result<NodeType> {
        let type_a = builder.node_type(self.a)?;
        let type_b = self.b.map(|b| builder.node_type(b)).transpose()?;
        let type_c = self.c.map(|c| builder.node_type(c)).transpose()?;

        let length = |ty: Option<NodeType>| match ty {
            Some(ty) if ty.is_matrix() => 0,
            Some(ty) => ty.length(),
            None => 0,
        };
        let (a_len, b_len, c_len) = (length(Some(type_a)), length(type_b), length(type_c));

        let ty = if a_len > b_len && a_len > c_len {
            type_a
        } else if b_len > c_len {
            type_b.unwrap_or(type_a)
        } else if c_len > a_len {
            type_c.unwrap_or(type_a)
        } else {
            type_a
        };
        Ok(ty)
    }

    pub(crate) fn node_type(&self, builder: &NodeBuilder<'_>) -> Result<NodeType> {
        match self.method {
            MathMethod::Length | MathMethod::Distance | MathMethod::Dot => Ok(NodeType::FLOAT),
            MathMethod::Cross => Ok(NodeType::VEC3),
            _ => self.input_type(builder),
        }
    }

    /// Methods expressed through other operator/math nodes.
    pub(crate) fn construct(&self, builder: &mut NodeBuilder<'_>) -> Result<Option<NodeId>> {
        let graph = builder.graph();
        let a = graph.node(self.a);
        let b = self.b.map(|b| graph.node(b));

        let rewritten = match (self.method, b) {
            (MathMethod::TransformDirection, Some(b)) => {
                let (mut t_a, mut t_b) = (a, b);
                if builder.node_type(self.a)?.is_matrix() {
                    t_b = graph.vec4((graph.vec3(t_b), 0.0));
                } else {
                    t_a = graph.vec4((graph.vec3(t_a), 0.0));
                }
                t_a.mul(t_b).xyz().normalize()
            }
            (MathMethod::OneMinus, _) => graph.float(1.0).sub(a),
            (MathMethod::Reciprocal, _) => graph.float(1.0).div(a),
            (MathMethod::Difference, Some(b)) => a.sub(b).abs(),
            _ => return Ok(None),
        };
        Ok(Some(rewritten.id()))
    }

    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, output: Option<NodeType>) -> Result<String> {
        let method = self.method;
        let ty = self.node_type(builder)?;
        let input_type = self.input_type(builder)?;

        if method == MathMethod::Negate {
            let a = builder.build(self.a, Some(input_type))?;
            return Ok(builder.format(&format!("(-{a})"), ty, output));
        }

        let scalar_or = |builder: &NodeBuilder<'_>, node: NodeId| -> Result<NodeType> {
            Ok(if builder.node_type(node)?.length() == 1 {
                NodeType::FLOAT
            } else {
                input_type
            })
        };

        let mut operands: Vec<(NodeId, NodeType)> = Vec::with_capacity(3);
        match (method, self.b, self.c) {
            (MathMethod::Cross, Some(b), _) => {
                operands.push((self.a, ty));
                operands.push((b, ty));
            }
            (MathMethod::Step, Some(b), _) if builder.language().scalar_min_max() => {
                operands.push((self.a, scalar_or(builder, self.a)?));
                operands.push((b, input_type));
            }
            (MathMethod::Mod, Some(b), _) => {
                operands.push((self.a, input_type));
                operands.push((b, scalar_or(builder, b)?));
            }
            (MathMethod::Min | MathMethod::Max, Some(b), _)
                if builder.language().scalar_min_max() =>
            {
                operands.push((self.a, input_type));
                operands.push((b, scalar_or(builder, b)?));
            }
            (MathMethod::Refract, Some(b), Some(c)) => {
                operands.push((self.a, input_type));
                operands.push((b, input_type));
                operands.push((c, NodeType::FLOAT));
            }
            (MathMethod::Mix, Some(b), Some(c)) => {
                operands.push((self.a, input_type));
                operands.push((b, input_type));
                operands.push((c, scalar_or(builder, c)?));
            }
            _ => {
                for node in [Some(self.a), self.b, self.c].into_iter().flatten() {
                    operands.push((node, input_type));
                }
            }
        }

        let mut params = Vec::with_capacity(operands.len());
        for (node, operand_type) in operands {
            params.push(builder.build(node, Some(operand_type))?);
        }

        let call = builder.language().method(method.as_str(), &params);
        Ok(builder.format(&call, ty, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arities() {
        assert_eq!(MathMethod::Sin.arity(), 1);
        assert_eq!(MathMethod::TransformDirection.arity(), 2);
        assert_eq!(MathMethod::FaceForward.arity(), 3);
    }

    #[test]
    fn unknown_method_is_an_error() {
        let err = "sinh".parse::<MathMethod>().unwrap_err();
        assert_eq!(err.to_string(), "MathNode: unknown method 'sinh'");
    }
}

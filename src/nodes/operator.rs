use crate::builder::NodeBuilder;
use crate::error::Result;
use crate::graph::NodeId;
use crate::types::{Component, NodeType};

node_enum! {
    /// Infix operators, keyed by their source token.
    pub enum Op ("OperatorNode", "op") {
        Add => "+",
        Sub => "-",
        Mul => "*",
        Div => "/",
        Rem => "%",
        Equal => "==",
        Assign => "=",
        Less => "<",
        Greater => ">",
        LessEqual => "<=",
        GreaterEqual => ">=",
        And => "&&",
        Or => "||",
        Xor => "^^",
        BitAnd => "&",
        BitOr => "|",
        BitXor => "^",
        ShiftLeft => "<<",
        ShiftRight => ">>",
    }
}

impl Op {
    /// Ordering comparisons, the only operators that vectorize.
    pub fn is_comparison(self) -> bool {
        matches!(self, Op::Less | Op::Greater | Op::LessEqual | Op::GreaterEqual)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            Op::BitAnd | Op::BitOr | Op::BitXor | Op::ShiftLeft | Op::ShiftRight
        )
    }

    /// Library function replacing a vectorized comparison.
    pub fn comparison_method(self) -> Option<&'static str> {
        match self {
            Op::Less => Some("lessThan"),
            Op::Greater => Some("greaterThan"),
            Op::LessEqual => Some("lessThanEqual"),
            Op::GreaterEqual => Some("greaterThanEqual"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperatorNode {
    pub op: Op,
    pub a: NodeId,
    pub b: NodeId,
}

impl OperatorNode {
    pub(crate) fn node_type(&self, builder: &NodeBuilder<'_>, output: Option<NodeType>) -> Result<NodeType> {
        let type_a = builder.node_type(self.a)?;
        let type_b = builder.node_type(self.b)?;

        if type_a == NodeType::Void || type_b == NodeType::Void {
            return Ok(NodeType::Void);
        }

        let ty = match self.op {
            Op::Assign | Op::Rem => type_a,
            op if op.is_bitwise() => type_a.integer_type(),
            Op::Equal | Op::And | Op::Or | Op::Xor => NodeType::BOOL,
            op if op.is_comparison() => {
                let length = match output {
                    Some(output) => output.length(),
                    None => type_a.length().max(type_b.length()),
                };
                if (2..=4).contains(&length) {
                    NodeType::Vector(Component::Bool, length as u8)
                } else {
                    NodeType::BOOL
                }
            }
            _ => {
                if type_a == NodeType::FLOAT && type_b.is_matrix() {
                    type_b
                } else if type_a.is_matrix() && type_b.is_vector() {
                    type_a.vector_from_matrix()
                } else if type_a.is_vector() && type_b.is_matrix() {
                    type_b.vector_from_matrix()
                } else if type_b.length() > type_a.length() {
                    type_b
                } else {
                    type_a
                }
            }
        };
        Ok(ty)
    }

    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, output: Option<NodeType>) -> Result<String> {
        let op = self.op;
        let ty = self.node_type(builder, output)?;

        let mut type_a = builder.node_type(self.a)?;
        let mut type_b = builder.node_type(self.b)?;

        if op == Op::Assign {
            type_b = type_a;
        } else if op.is_comparison() || op == Op::Equal {
            if type_a.is_vector() {
                type_b = type_a;
            } else {
                type_a = NodeType::FLOAT;
                type_b = NodeType::FLOAT;
            }
        } else if matches!(op, Op::ShiftLeft | Op::ShiftRight) {
            type_a = ty;
            type_b = type_b.change_component(Component::Uint);
        } else if type_a.is_matrix() && type_b.is_vector() {
            type_b = type_a.vector_from_matrix();
        } else if type_a.is_vector() && type_b.is_matrix() {
            type_a = type_b.vector_from_matrix();
        } else {
            type_a = ty;
            type_b = ty;
        }

        let a = builder.build(self.a, Some(type_a))?;
        let b = builder.build(self.b, Some(type_b))?;

        if op == Op::Assign {
            let statement = format!("{a} = {b}");
            if output == Some(NodeType::Void) {
                return Ok(statement);
            }
            builder.add_line_flow_code(&statement);
            return Ok(a);
        }

        let output_length = output.map_or(0, NodeType::length);
        if let (Some(method), true) = (op.comparison_method(), output_length > 1) {
            let call = builder.language().method(method, &[a, b]);
            return Ok(builder.format(&call, ty, output));
        }

        let token = builder.language().operator(op);
        Ok(builder.format(&format!("({a} {token} {b})"), ty, output))
    }
}

use std::fmt;
use std::str::FromStr;

use crate::error::{NodeError, Result};

/// Scalar component of a value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Bool,
    Int,
    Uint,
    Float,
}

impl Component {
    /// Prefix used by vector/matrix type names (`bvec3`, `ivec2`, `mat4`).
    fn prefix(self) -> &'static str {
        match self {
            Component::Bool => "b",
            Component::Int => "i",
            Component::Uint => "u",
            Component::Float => "",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Component::Int | Component::Uint)
    }
}

/// Semantic type of a node's output value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Void,
    Scalar(Component),
    Vector(Component, u8),
    Matrix(Component, u8),
    Texture,
    Str,
}

impl NodeType {
    pub const FLOAT: NodeType = NodeType::Scalar(Component::Float);
    pub const INT: NodeType = NodeType::Scalar(Component::Int);
    pub const UINT: NodeType = NodeType::Scalar(Component::Uint);
    pub const BOOL: NodeType = NodeType::Scalar(Component::Bool);
    pub const VEC2: NodeType = NodeType::Vector(Component::Float, 2);
    pub const VEC3: NodeType = NodeType::Vector(Component::Float, 3);
    pub const VEC4: NodeType = NodeType::Vector(Component::Float, 4);
    pub const UVEC2: NodeType = NodeType::Vector(Component::Uint, 2);
    pub const MAT3: NodeType = NodeType::Matrix(Component::Float, 3);
    pub const MAT4: NodeType = NodeType::Matrix(Component::Float, 4);

    /// Number of scalar slots: 1 for scalars, N for vectors, N*N for matrices,
    /// 0 for void and reference types.
    pub fn length(self) -> usize {
        match self {
            NodeType::Scalar(_) => 1,
            NodeType::Vector(_, n) => n as usize,
            NodeType::Matrix(_, n) => (n as usize) * (n as usize),
            NodeType::Void | NodeType::Texture | NodeType::Str => 0,
        }
    }

    pub fn is_vector(self) -> bool {
        matches!(self, NodeType::Vector(..))
    }

    pub fn is_matrix(self) -> bool {
        matches!(self, NodeType::Matrix(..))
    }

    pub fn is_scalar(self) -> bool {
        matches!(self, NodeType::Scalar(_))
    }

    /// Types that are passed through `format` untouched.
    pub fn is_reference(self) -> bool {
        matches!(self, NodeType::Void | NodeType::Texture | NodeType::Str)
    }

    pub fn component(self) -> Option<Component> {
        match self {
            NodeType::Scalar(c) | NodeType::Vector(c, _) | NodeType::Matrix(c, _) => Some(c),
            _ => None,
        }
    }

    /// Build a type from its slot count (1-4, 9, 16).
    pub fn from_length(length: usize, component: Component) -> Option<NodeType> {
        match length {
            1 => Some(NodeType::Scalar(component)),
            2..=4 => Some(NodeType::Vector(component, length as u8)),
            9 => Some(NodeType::Matrix(component, 3)),
            16 => Some(NodeType::Matrix(component, 4)),
            _ => None,
        }
    }

    /// Column vector type of a matrix (`mat4` -> `vec4`). Non-matrices are returned unchanged.
    pub fn vector_from_matrix(self) -> NodeType {
        match self {
            NodeType::Matrix(c, n) => NodeType::Vector(c, n),
            other => other,
        }
    }

    pub fn change_component(self, component: Component) -> NodeType {
        match self {
            NodeType::Scalar(_) => NodeType::Scalar(component),
            NodeType::Vector(_, n) => NodeType::Vector(component, n),
            NodeType::Matrix(_, n) => NodeType::Matrix(component, n),
            other => other,
        }
    }

    /// Integer variant of this type; integer types are kept as they are.
    pub fn integer_type(self) -> NodeType {
        match self.component() {
            Some(c) if c.is_integer() => self,
            _ => self.change_component(Component::Int),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            NodeType::Void => f.write_str("void"),
            NodeType::Texture => f.write_str("texture"),
            NodeType::Str => f.write_str("string"),
            NodeType::Scalar(Component::Bool) => f.write_str("bool"),
            NodeType::Scalar(Component::Int) => f.write_str("int"),
            NodeType::Scalar(Component::Uint) => f.write_str("uint"),
            NodeType::Scalar(Component::Float) => f.write_str("float"),
            NodeType::Vector(c, n) => write!(f, "{}vec{n}", c.prefix()),
            NodeType::Matrix(c, n) => write!(f, "{}mat{n}", c.prefix()),
        }
    }
}

impl FromStr for NodeType {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self> {
        let ty = match s {
            "void" => NodeType::Void,
            "texture" => NodeType::Texture,
            "string" => NodeType::Str,
            "bool" => NodeType::BOOL,
            "int" => NodeType::INT,
            "uint" => NodeType::UINT,
            "float" => NodeType::FLOAT,
            "color" => NodeType::VEC3,
            _ => {
                let (component, rest) = match s.as_bytes().first() {
                    Some(b'b') => (Component::Bool, &s[1..]),
                    Some(b'i') => (Component::Int, &s[1..]),
                    Some(b'u') => (Component::Uint, &s[1..]),
                    _ => (Component::Float, s),
                };
                let size = |digits: &str| match digits.parse::<u8>() {
                    Ok(n) if (2..=4).contains(&n) => Some(n),
                    _ => None,
                };
                if let Some(size) = rest.strip_prefix("vec").and_then(size) {
                    NodeType::Vector(component, size)
                } else if let Some(size) = rest.strip_prefix("mat").and_then(size) {
                    NodeType::Matrix(component, size)
                } else {
                    return Err(NodeError::unknown_variant("NodeType", "type", s));
                }
            }
        };
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        for name in ["float", "vec3", "ivec2", "uvec4", "bvec4", "mat3", "mat4", "bool", "uint"] {
            let ty: NodeType = name.parse().expect("type should parse");
            assert_eq!(ty.to_string(), name);
        }
    }

    #[test]
    fn color_is_vec3() {
        assert_eq!("color".parse::<NodeType>().unwrap(), NodeType::VEC3);
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!("vec5".parse::<NodeType>().is_err());
        assert!("quaternion".parse::<NodeType>().is_err());
    }

    #[test]
    fn lengths() {
        assert_eq!(NodeType::FLOAT.length(), 1);
        assert_eq!(NodeType::VEC3.length(), 3);
        assert_eq!(NodeType::MAT3.length(), 9);
        assert_eq!(NodeType::MAT4.length(), 16);
        assert_eq!(NodeType::Void.length(), 0);
    }

    #[test]
    fn matrix_and_integer_helpers() {
        assert_eq!(NodeType::MAT4.vector_from_matrix(), NodeType::VEC4);
        assert_eq!(NodeType::VEC3.integer_type().to_string(), "ivec3");
        assert_eq!(NodeType::UVEC2.integer_type(), NodeType::UVEC2);
        assert_eq!(NodeType::VEC2.change_component(Component::Uint), NodeType::UVEC2);
        assert_eq!(NodeType::from_length(16, Component::Float), Some(NodeType::MAT4));
        assert_eq!(NodeType::from_length(5, Component::Float), None);
    }
}

//! Named operations reachable through [`Node::member`].

use std::collections::BTreeMap;
use std::fmt;

use log::trace;

use crate::error::{ErrorKind, NodeError, Result};
use crate::graph::NodeGraph;
use crate::nodes::{BlendMode, MathMethod, Op};
use crate::shader::Node;
use crate::types::NodeType;

/// Argument of an element call.
#[derive(Debug, Clone)]
pub enum Value<'g> {
    Node(Node<'g>),
    Number(f64),
    Bool(bool),
    Str(String),
}

impl<'g> Value<'g> {
    /// Operand node; raw numbers become float constants.
    pub fn to_node(&self, graph: &'g NodeGraph) -> Result<Node<'g>> {
        match self {
            Value::Node(node) => Ok(*node),
            Value::Number(v) => Ok(graph.float(*v)),
            Value::Bool(v) => Ok(graph.bool(*v)),
            Value::Str(s) => Err(NodeError::invalid_argument(format!(
                "expected a node operand, got string \"{s}\""
            ))),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

pub type ElementFn = for<'g> fn(Node<'g>, &[Value<'g>]) -> Result<Node<'g>>;

/// An operation callable with a receiver node as its first operand.
#[derive(Clone, Copy)]
pub enum Element {
    /// Binary operator, folded left over every argument.
    Operator(Op),
    Math(MathMethod),
    /// Type constructor over the receiver and the arguments.
    Convert(NodeType),
    Function(ElementFn),
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Operator(op) => write!(f, "Operator({op})"),
            Element::Math(method) => write!(f, "Math({method})"),
            Element::Convert(ty) => write!(f, "Convert({ty})"),
            Element::Function(_) => f.write_str("Function"),
        }
    }
}

impl Element {
    pub fn apply<'g>(&self, receiver: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
        let graph = receiver.graph();
        match *self {
            Element::Operator(op) => {
                if args.is_empty() {
                    return Err(NodeError::invalid_argument(format!(
                        "operator {op} expects at least one operand"
                    )));
                }
                let operands = nodes(graph, args)?;
                Ok(receiver.fold(op, operands))
            }
            Element::Math(method) => {
                let expected = method.arity() - 1;
                if args.len() != expected {
                    return Err(NodeError::invalid_argument(format!(
                        "{method} expects {expected} argument(s) after the receiver, got {}",
                        args.len()
                    )));
                }
                let operands = nodes(graph, args)?;
                Ok(receiver.math(method, operands.first().copied(), operands.get(1).copied()))
            }
            Element::Convert(ty) => {
                let mut parts = vec![receiver];
                parts.extend(nodes(graph, args)?);
                Ok(graph.convert_nodes(ty, parts))
            }
            Element::Function(func) => func(receiver, args),
        }
    }
}

fn nodes<'g>(graph: &'g NodeGraph, args: &[Value<'g>]) -> Result<Vec<Node<'g>>> {
    args.iter().map(|arg| arg.to_node(graph)).collect()
}

/// Exactly `N` operand nodes.
fn operands<'g, const N: usize>(name: &str, receiver: Node<'g>, args: &[Value<'g>]) -> Result<[Node<'g>; N]> {
    let nodes = nodes(receiver.graph(), args)?;
    let count = nodes.len();
    nodes.try_into().map_err(|_| {
        NodeError::invalid_argument(format!("{name} expects {N} argument(s), got {count}"))
    })
}

/// Operand `index`, or `default` when absent.
fn optional<'g>(receiver: Node<'g>, args: &[Value<'g>], index: usize, default: f64) -> Result<Node<'g>> {
    match args.get(index) {
        Some(arg) => arg.to_node(receiver.graph()),
        None => Ok(receiver.graph().float(default)),
    }
}

/// Name → element table owned by a [`NodeGraph`].
#[derive(Debug, Default)]
pub struct ElementRegistry {
    elements: BTreeMap<String, Element>,
}

impl ElementRegistry {
    /// Register `name`. A name is registered at most once; a second
    /// registration fails and keeps the first.
    pub fn register(&mut self, name: &str, element: Element) -> Result<()> {
        if self.elements.contains_key(name) {
            return Err(ErrorKind::DuplicateElement(name.to_string()).into());
        }
        trace!("register node element {name}: {element:?}");
        self.elements.insert(name.to_string(), element);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Element> {
        self.elements.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.elements.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    /// Registry with every builtin operator, math method, conversion and
    /// utility element.
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        for (name, element) in builtins() {
            let registered = registry.register(name, element);
            debug_assert!(registered.is_ok(), "builtin element {name} is registered twice");
        }
        registry
    }
}

fn builtins() -> Vec<(&'static str, Element)> {
    let mut table: Vec<(&'static str, Element)> = vec![
        ("add", Element::Operator(Op::Add)),
        ("sub", Element::Operator(Op::Sub)),
        ("mul", Element::Operator(Op::Mul)),
        ("div", Element::Operator(Op::Div)),
        ("remainder", Element::Operator(Op::Rem)),
        ("equal", Element::Operator(Op::Equal)),
        ("lessThan", Element::Operator(Op::Less)),
        ("greaterThan", Element::Operator(Op::Greater)),
        ("lessThanEqual", Element::Operator(Op::LessEqual)),
        ("greaterThanEqual", Element::Operator(Op::GreaterEqual)),
        ("and", Element::Operator(Op::And)),
        ("or", Element::Operator(Op::Or)),
        ("xor", Element::Operator(Op::Xor)),
        ("bitAnd", Element::Operator(Op::BitAnd)),
        ("bitOr", Element::Operator(Op::BitOr)),
        ("bitXor", Element::Operator(Op::BitXor)),
        ("shiftLeft", Element::Operator(Op::ShiftLeft)),
        ("shiftRight", Element::Operator(Op::ShiftRight)),
        ("assign", Element::Function(assign)),
    ];

    for &method in MathMethod::ALL {
        let name = match method {
            MathMethod::InverseSqrt => "inverseSqrt",
            MathMethod::FaceForward => "faceForward",
            MathMethod::Mix => "mix",
            MathMethod::Smoothstep => "smoothstep",
            MathMethod::Clamp => "clamp",
            other => other.as_str(),
        };
        let element = match method {
            MathMethod::Mix => Element::Function(mix),
            MathMethod::Smoothstep => Element::Function(smoothstep),
            MathMethod::Clamp => Element::Function(clamp),
            other => Element::Math(other),
        };
        table.push((name, element));
    }

    for (name, ty) in [
        ("float", NodeType::FLOAT),
        ("int", NodeType::INT),
        ("uint", NodeType::UINT),
        ("bool", NodeType::BOOL),
        ("color", NodeType::VEC3),
        ("vec2", NodeType::VEC2),
        ("vec3", NodeType::VEC3),
        ("vec4", NodeType::VEC4),
        ("mat3", NodeType::MAT3),
        ("mat4", NodeType::MAT4),
    ] {
        table.push((name, Element::Convert(ty)));
    }

    table.extend([
        ("saturate", Element::Function(saturate)),
        ("pow2", Element::Function(pow2)),
        ("pow3", Element::Function(pow3)),
        ("pow4", Element::Function(pow4)),
        ("remap", Element::Function(remap)),
        ("remapClamp", Element::Function(remap_clamp)),
        ("cond", Element::Function(cond)),
        ("element", Element::Function(element)),
        ("label", Element::Function(label)),
        ("varying", Element::Function(varying)),
        ("bypass", Element::Function(bypass)),
        ("burn", Element::Function(burn)),
        ("dodge", Element::Function(dodge)),
        ("screen", Element::Function(screen)),
        ("overlay", Element::Function(overlay)),
        ("checker", Element::Function(checker)),
        ("directionToColor", Element::Function(direction_to_color)),
        ("colorToDirection", Element::Function(color_to_direction)),
        ("textureSize", Element::Function(texture_size)),
    ]);
    table
}

// ── Element functions ──────────────────────────────────────────────────

fn assign<'g>(receiver: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    let [value] = operands("assign", receiver, args)?;
    Ok(receiver.assign(value))
}

/// `t.mix(a, b)` is `mix(a, b, t)`.
fn mix<'g>(t: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    let [a, b] = operands("mix", t, args)?;
    Ok(a.mix(b, t))
}

/// `x.smoothstep(low, high)` is `smoothstep(low, high, x)`.
fn smoothstep<'g>(x: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    let [low, high] = operands("smoothstep", x, args)?;
    Ok(x.smoothstep(low, high))
}

fn clamp<'g>(value: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    let low = optional(value, args, 0, 0.0)?;
    let high = optional(value, args, 1, 1.0)?;
    Ok(value.clamp(low, high))
}

fn saturate<'g>(value: Node<'g>, _args: &[Value<'g>]) -> Result<Node<'g>> {
    Ok(value.saturate())
}

fn pow2<'g>(value: Node<'g>, _args: &[Value<'g>]) -> Result<Node<'g>> {
    Ok(value.pow2())
}

fn pow3<'g>(value: Node<'g>, _args: &[Value<'g>]) -> Result<Node<'g>> {
    Ok(value.pow3())
}

fn pow4<'g>(value: Node<'g>, _args: &[Value<'g>]) -> Result<Node<'g>> {
    Ok(value.pow4())
}

fn remap_args<'g>(node: Node<'g>, args: &[Value<'g>]) -> Result<[Node<'g>; 4]> {
    if !(2..=4).contains(&args.len()) {
        return Err(NodeError::invalid_argument(format!(
            "remap expects 2 to 4 arguments, got {}",
            args.len()
        )));
    }
    Ok([
        optional(node, args, 0, 0.0)?,
        optional(node, args, 1, 1.0)?,
        optional(node, args, 2, 0.0)?,
        optional(node, args, 3, 1.0)?,
    ])
}

fn remap<'g>(node: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    let [in_low, in_high, out_low, out_high] = remap_args(node, args)?;
    Ok(node.remap(in_low, in_high, out_low, out_high))
}

fn remap_clamp<'g>(node: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    let [in_low, in_high, out_low, out_high] = remap_args(node, args)?;
    Ok(node.remap_clamp(in_low, in_high, out_low, out_high))
}

fn cond<'g>(cond: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    let [if_value, else_value] = operands("cond", cond, args)?;
    Ok(cond.cond(if_value, else_value))
}

fn element<'g>(node: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    let [index] = operands("element", node, args)?;
    Ok(node.element(index))
}

fn string_arg<'a>(name: &str, args: &'a [Value<'_>]) -> Result<&'a str> {
    match args {
        [value] => value
            .as_str()
            .ok_or_else(|| NodeError::invalid_argument(format!("{name} expects a string"))),
        _ => Err(NodeError::invalid_argument(format!("{name} expects one string"))),
    }
}

fn label<'g>(node: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    Ok(node.label(string_arg("label", args)?))
}

fn varying<'g>(node: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    let name = match args {
        [] => None,
        _ => Some(string_arg("varying", args)?),
    };
    Ok(node.varying(name))
}

fn bypass<'g>(node: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    let [call] = operands("bypass", node, args)?;
    Ok(node.bypass(call))
}

fn blend<'g>(mode: BlendMode, base: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    let [blend] = operands(mode.as_str(), base, args)?;
    Ok(base.blend(mode, blend))
}

fn burn<'g>(base: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    blend(BlendMode::Burn, base, args)
}

fn dodge<'g>(base: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    blend(BlendMode::Dodge, base, args)
}

fn screen<'g>(base: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    blend(BlendMode::Screen, base, args)
}

fn overlay<'g>(base: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    blend(BlendMode::Overlay, base, args)
}

fn checker<'g>(uv: Node<'g>, _args: &[Value<'g>]) -> Result<Node<'g>> {
    Ok(uv.checker())
}

fn direction_to_color<'g>(node: Node<'g>, _args: &[Value<'g>]) -> Result<Node<'g>> {
    Ok(node.direction_to_color())
}

fn color_to_direction<'g>(node: Node<'g>, _args: &[Value<'g>]) -> Result<Node<'g>> {
    Ok(node.color_to_direction())
}

fn texture_size<'g>(texture: Node<'g>, args: &[Value<'g>]) -> Result<Node<'g>> {
    let level = match args {
        [] => texture.graph().int(0),
        [level] => level.to_node(texture.graph())?,
        _ => {
            return Err(NodeError::invalid_argument(
                "textureSize expects at most one argument",
            ))
        }
    };
    Ok(texture.texture_size(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity<'g>(node: Node<'g>, _: &[Value<'g>]) -> Result<Node<'g>> {
        Ok(node)
    }

    #[test]
    fn duplicate_registration_keeps_the_first() {
        let mut registry = ElementRegistry::default();
        registry.register("foo", Element::Operator(Op::Add)).unwrap();
        let err = registry.register("foo", Element::Function(identity)).unwrap_err();
        assert_eq!(err.to_string(), "redefinition of node element foo");
        assert!(matches!(registry.get("foo"), Some(Element::Operator(Op::Add))));
    }

    #[test]
    fn builtins_use_element_names() {
        let registry = ElementRegistry::with_builtins();
        assert!(registry.contains("inverseSqrt"));
        assert!(registry.contains("faceForward"));
        assert!(registry.contains("oneMinus"));
        assert!(!registry.contains("inversesqrt"));
        assert!(matches!(registry.get("mix"), Some(Element::Function(_))));
    }

    #[test]
    fn builtin_names_are_distinct() {
        let table = builtins();
        let names: std::collections::BTreeSet<_> = table.iter().map(|(name, _)| *name).collect();
        assert_eq!(names.len(), table.len());
        assert_eq!(ElementRegistry::with_builtins().len(), table.len());
    }

    #[test]
    fn math_arity_is_checked() {
        let graph = NodeGraph::new();
        let x = graph.float(0.5);
        let err = Element::Math(MathMethod::Pow).apply(x, &[]).unwrap_err();
        assert!(err.to_string().contains("pow expects 1 argument(s)"));
    }
}

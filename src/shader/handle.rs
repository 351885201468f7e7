use std::fmt;
use std::rc::Rc;

use serde_json::Value as Json;

use crate::builder::context::ContextMap;
use crate::error::{ErrorKind, Result};
use crate::graph::{NodeEntry, NodeGraph, NodeId};
use crate::nodes::utils::{is_swizzle, normalize_swizzle};
use crate::nodes::{
    ArrayElementNode, BlendMode, BlendModeNode, BypassNode, CheckerNode, CondNode, ContextNode,
    MathMethod, MathNode, NodeKind, Op, OperatorNode, PackingNode, PackingScope, RemapNode,
    SplitNode, TextureSizeNode, VaryingNode,
};
use crate::shader::convert::{convert_type, ConvertArg};
use crate::shader::registry::{Element, Value};
use crate::types::NodeType;

/// Copyable handle to a node of a [`NodeGraph`], carrying the fluent
/// graph-building API.
#[derive(Clone, Copy)]
pub struct Node<'g> {
    graph: &'g NodeGraph,
    id: NodeId,
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.entry().kind.type_name(), self.id)
    }
}

/// Anything usable where a node operand is expected. Raw numbers become
/// float constants, booleans bool constants.
pub trait IntoNode<'g> {
    fn into_node(self, graph: &'g NodeGraph) -> Node<'g>;
}

impl<'g> IntoNode<'g> for Node<'g> {
    fn into_node(self, _graph: &'g NodeGraph) -> Node<'g> {
        self
    }
}

impl<'g> IntoNode<'g> for f64 {
    fn into_node(self, graph: &'g NodeGraph) -> Node<'g> {
        graph.float(self)
    }
}

impl<'g> IntoNode<'g> for f32 {
    fn into_node(self, graph: &'g NodeGraph) -> Node<'g> {
        graph.float(f64::from(self))
    }
}

impl<'g> IntoNode<'g> for i32 {
    fn into_node(self, graph: &'g NodeGraph) -> Node<'g> {
        graph.float(f64::from(self))
    }
}

impl<'g> IntoNode<'g> for bool {
    fn into_node(self, graph: &'g NodeGraph) -> Node<'g> {
        graph.bool(self)
    }
}

/// Result of a dynamic member lookup on a node.
#[derive(Debug)]
pub enum Member<'g> {
    /// Swizzle, index or size component.
    Node(Node<'g>),
    /// Registered element bound to its receiver.
    Method(BoundElement<'g>),
    /// Scalar configuration field of the node.
    Field(Json),
}

/// A registered element with the receiver as its first operand.
#[derive(Debug, Clone)]
pub struct BoundElement<'g> {
    pub receiver: Node<'g>,
    pub name: String,
    pub element: Element,
    /// Assign the result back onto the receiver (`addAssign` and friends).
    pub assign: bool,
}

impl<'g> BoundElement<'g> {
    pub fn call(&self, args: &[Value<'g>]) -> Result<Node<'g>> {
        let result = self.element.apply(self.receiver, args)?;
        if self.assign {
            Ok(self.receiver.assign(result))
        } else {
            Ok(result)
        }
    }
}

macro_rules! unary_math {
    ($($name:ident => $method:ident),+ $(,)?) => {
        $(
            pub fn $name(self) -> Node<'g> {
                self.math(MathMethod::$method, None, None)
            }
        )+
    };
}

macro_rules! binary_math {
    ($($name:ident => $method:ident),+ $(,)?) => {
        $(
            pub fn $name(self, b: impl IntoNode<'g>) -> Node<'g> {
                let b = b.into_node(self.graph);
                self.math(MathMethod::$method, Some(b), None)
            }
        )+
    };
}

macro_rules! operators {
    ($($name:ident => $op:ident),+ $(,)?) => {
        $(
            pub fn $name(self, b: impl IntoNode<'g>) -> Node<'g> {
                self.operator(Op::$op, b)
            }
        )+
    };
}

macro_rules! compound_assign {
    ($($name:ident => $op:ident),+ $(,)?) => {
        $(
            pub fn $name(self, b: impl IntoNode<'g>) -> Node<'g> {
                self.assign(self.operator(Op::$op, b))
            }
        )+
    };
}

macro_rules! swizzles {
    ($($name:ident => $mask:literal),+ $(,)?) => {
        $(
            pub fn $name(self) -> Node<'g> {
                self.split($mask)
            }
        )+
    };
}

impl<'g> Node<'g> {
    pub fn new(graph: &'g NodeGraph, id: NodeId) -> Self {
        Self { graph, id }
    }

    pub fn id(self) -> NodeId {
        self.id
    }

    pub fn graph(self) -> &'g NodeGraph {
        self.graph
    }

    pub fn entry(self) -> Rc<NodeEntry> {
        self.graph.entry(self.id)
    }

    /// Type known without a builder.
    pub fn static_type(self) -> Option<NodeType> {
        self.graph.static_type(self.id)
    }

    fn insert(self, kind: NodeKind) -> Node<'g> {
        self.graph.insert(kind)
    }

    // ── Operators ──────────────────────────────────────────────────────

    pub fn operator(self, op: Op, b: impl IntoNode<'g>) -> Node<'g> {
        let b = b.into_node(self.graph);
        self.insert(NodeKind::Operator(OperatorNode {
            op,
            a: self.id,
            b: b.id,
        }))
    }

    /// `self op b0 op b1 ...`, folded left.
    pub fn fold(self, op: Op, operands: impl IntoIterator<Item = Node<'g>>) -> Node<'g> {
        operands.into_iter().fold(self, |acc, b| acc.operator(op, b))
    }

    operators! {
        add => Add,
        sub => Sub,
        mul => Mul,
        div => Div,
        rem => Rem,
        equal => Equal,
        less_than => Less,
        greater_than => Greater,
        less_than_equal => LessEqual,
        greater_than_equal => GreaterEqual,
        and => And,
        or => Or,
        xor => Xor,
        bit_and => BitAnd,
        bit_or => BitOr,
        bit_xor => BitXor,
        shift_left => ShiftLeft,
        shift_right => ShiftRight,
    }

    /// `self = value`. Inside an open statement stack the assignment is
    /// recorded there and the receiver is returned; otherwise the assignment
    /// node itself is the result.
    pub fn assign(self, value: impl IntoNode<'g>) -> Node<'g> {
        let assign = self.operator(Op::Assign, value);
        if self.graph.append(assign.id) {
            self
        } else {
            assign
        }
    }

    compound_assign! {
        add_assign => Add,
        sub_assign => Sub,
        mul_assign => Mul,
        div_assign => Div,
        rem_assign => Rem,
        bit_and_assign => BitAnd,
        bit_or_assign => BitOr,
        bit_xor_assign => BitXor,
        shift_left_assign => ShiftLeft,
        shift_right_assign => ShiftRight,
    }

    // ── Math ───────────────────────────────────────────────────────────

    pub fn math(self, method: MathMethod, b: Option<Node<'g>>, c: Option<Node<'g>>) -> Node<'g> {
        self.insert(NodeKind::Math(MathNode {
            method,
            a: self.id,
            b: b.map(Node::id),
            c: c.map(Node::id),
        }))
    }

    unary_math! {
        radians => Radians,
        degrees => Degrees,
        exp => Exp,
        exp2 => Exp2,
        log => Log,
        log2 => Log2,
        sqrt => Sqrt,
        inverse_sqrt => InverseSqrt,
        floor => Floor,
        ceil => Ceil,
        normalize => Normalize,
        fract => Fract,
        sin => Sin,
        cos => Cos,
        tan => Tan,
        asin => Asin,
        acos => Acos,
        atan => Atan,
        abs => Abs,
        sign => Sign,
        length => Length,
        negate => Negate,
        one_minus => OneMinus,
        dfdx => DFdx,
        dfdy => DFdy,
        round => Round,
        reciprocal => Reciprocal,
        trunc => Trunc,
        fwidth => Fwidth,
    }

    binary_math! {
        atan2 => Atan2,
        min => Min,
        max => Max,
        modulo => Mod,
        step => Step,
        reflect => Reflect,
        distance => Distance,
        difference => Difference,
        dot => Dot,
        cross => Cross,
        pow => Pow,
        transform_direction => TransformDirection,
    }

    /// `mix(self, b, t)`.
    pub fn mix(self, b: impl IntoNode<'g>, t: impl IntoNode<'g>) -> Node<'g> {
        let (b, t) = (b.into_node(self.graph), t.into_node(self.graph));
        self.math(MathMethod::Mix, Some(b), Some(t))
    }

    pub fn clamp(self, low: impl IntoNode<'g>, high: impl IntoNode<'g>) -> Node<'g> {
        let (low, high) = (low.into_node(self.graph), high.into_node(self.graph));
        self.math(MathMethod::Clamp, Some(low), Some(high))
    }

    pub fn saturate(self) -> Node<'g> {
        self.clamp(0.0, 1.0)
    }

    /// `smoothstep(low, high, self)`.
    pub fn smoothstep(self, low: impl IntoNode<'g>, high: impl IntoNode<'g>) -> Node<'g> {
        let (low, high) = (low.into_node(self.graph), high.into_node(self.graph));
        low.math(MathMethod::Smoothstep, Some(high), Some(self))
    }

    pub fn refract(self, normal: impl IntoNode<'g>, eta: impl IntoNode<'g>) -> Node<'g> {
        let (normal, eta) = (normal.into_node(self.graph), eta.into_node(self.graph));
        self.math(MathMethod::Refract, Some(normal), Some(eta))
    }

    pub fn face_forward(self, incident: impl IntoNode<'g>, reference: impl IntoNode<'g>) -> Node<'g> {
        let incident = incident.into_node(self.graph);
        let reference = reference.into_node(self.graph);
        self.math(MathMethod::FaceForward, Some(incident), Some(reference))
    }

    pub fn pow2(self) -> Node<'g> {
        self.pow(2.0)
    }

    pub fn pow3(self) -> Node<'g> {
        self.pow(3.0)
    }

    pub fn pow4(self) -> Node<'g> {
        self.pow(4.0)
    }

    // ── Components ─────────────────────────────────────────────────────

    /// Component extraction; `components` holds normalized `xyzw` letters.
    fn split(self, components: &str) -> Node<'g> {
        self.insert(NodeKind::Split(SplitNode {
            node: self.id,
            components: components.to_string(),
        }))
    }

    /// Swizzle from any of the `xyzw`, `rgba` or `stpq` letter sets.
    pub fn swizzle(self, mask: &str) -> Result<Node<'g>> {
        Ok(self.split(&normalize_swizzle(mask)?))
    }

    swizzles! {
        x => "x",
        y => "y",
        z => "z",
        w => "w",
        xy => "xy",
        xz => "xz",
        yz => "yz",
        zw => "zw",
        xyz => "xyz",
        xyzw => "xyzw",
        r => "x",
        g => "y",
        b => "z",
        a => "w",
        rgb => "xyz",
    }

    pub fn element(self, index: impl IntoNode<'g>) -> Node<'g> {
        let index = index.into_node(self.graph);
        self.insert(NodeKind::ArrayElement(ArrayElementNode {
            node: self.id,
            index: index.id,
        }))
    }

    /// Reinterpret as `ty`. Nodes already of that type are returned as is.
    pub fn convert(self, ty: NodeType) -> Node<'g> {
        convert_type(self.graph, ty, vec![ConvertArg::Node(self)])
    }

    // ── Scope ──────────────────────────────────────────────────────────

    pub fn context(self, context: ContextMap) -> Node<'g> {
        self.insert(NodeKind::Context(ContextNode {
            node: self.id,
            context,
        }))
    }

    /// Name the variable or uniform this node produces.
    pub fn label(self, name: &str) -> Node<'g> {
        self.context(ContextMap::new().with("label", name))
    }

    /// Emit `call` as a statement before yielding `self`.
    pub fn bypass(self, call: Node<'g>) -> Node<'g> {
        self.insert(NodeKind::Bypass(BypassNode {
            output: self.id,
            call: call.id,
        }))
    }

    /// `self ? if_value : else_value`.
    pub fn cond(self, if_value: impl IntoNode<'g>, else_value: impl IntoNode<'g>) -> Node<'g> {
        let if_node = if_value.into_node(self.graph);
        let else_node = else_value.into_node(self.graph);
        self.insert(NodeKind::Cond(CondNode {
            cond: self.id,
            if_node: if_node.id,
            else_node: else_node.id,
        }))
    }

    pub fn varying(self, name: Option<&str>) -> Node<'g> {
        self.insert(NodeKind::Varying(VaryingNode {
            node: self.id,
            name: name.map(str::to_string),
        }))
    }

    // ── Utilities ──────────────────────────────────────────────────────

    fn remap_node(
        self,
        in_low: impl IntoNode<'g>,
        in_high: impl IntoNode<'g>,
        out_low: impl IntoNode<'g>,
        out_high: impl IntoNode<'g>,
        do_clamp: bool,
    ) -> Node<'g> {
        let graph = self.graph;
        self.insert(NodeKind::Remap(RemapNode {
            node: self.id,
            in_low: in_low.into_node(graph).id,
            in_high: in_high.into_node(graph).id,
            out_low: out_low.into_node(graph).id,
            out_high: out_high.into_node(graph).id,
            do_clamp,
        }))
    }

    pub fn remap(
        self,
        in_low: impl IntoNode<'g>,
        in_high: impl IntoNode<'g>,
        out_low: impl IntoNode<'g>,
        out_high: impl IntoNode<'g>,
    ) -> Node<'g> {
        self.remap_node(in_low, in_high, out_low, out_high, false)
    }

    pub fn remap_clamp(
        self,
        in_low: impl IntoNode<'g>,
        in_high: impl IntoNode<'g>,
        out_low: impl IntoNode<'g>,
        out_high: impl IntoNode<'g>,
    ) -> Node<'g> {
        self.remap_node(in_low, in_high, out_low, out_high, true)
    }

    pub fn blend(self, mode: BlendMode, blend: impl IntoNode<'g>) -> Node<'g> {
        let blend = blend.into_node(self.graph);
        self.insert(NodeKind::BlendMode(BlendModeNode {
            mode,
            base: self.id,
            blend: blend.id,
        }))
    }

    pub fn burn(self, blend: impl IntoNode<'g>) -> Node<'g> {
        self.blend(BlendMode::Burn, blend)
    }

    pub fn dodge(self, blend: impl IntoNode<'g>) -> Node<'g> {
        self.blend(BlendMode::Dodge, blend)
    }

    pub fn screen(self, blend: impl IntoNode<'g>) -> Node<'g> {
        self.blend(BlendMode::Screen, blend)
    }

    pub fn overlay(self, blend: impl IntoNode<'g>) -> Node<'g> {
        self.blend(BlendMode::Overlay, blend)
    }

    pub fn checker(self) -> Node<'g> {
        self.insert(NodeKind::Checker(CheckerNode { uv: self.id }))
    }

    pub fn direction_to_color(self) -> Node<'g> {
        self.insert(NodeKind::Packing(PackingNode {
            scope: PackingScope::DirectionToColor,
            node: self.id,
        }))
    }

    pub fn color_to_direction(self) -> Node<'g> {
        self.insert(NodeKind::Packing(PackingNode {
            scope: PackingScope::ColorToDirection,
            node: self.id,
        }))
    }

    /// Size of a texture node's mip `level`.
    pub fn texture_size(self, level: Node<'g>) -> Node<'g> {
        self.insert(NodeKind::TextureSize(TextureSizeNode {
            texture: self.id,
            level: level.id,
        }))
    }

    // ── Dynamic members ────────────────────────────────────────────────

    /// Resolve `name` the way graph scripts see a node: registered elements
    /// (and their `...Assign` forms) first, then swizzles, numeric indices,
    /// `width`/`height`, and finally the node's own configuration fields.
    pub fn member(self, name: &str) -> Result<Member<'g>> {
        let bound = |element: Element, assign: bool| {
            Member::Method(BoundElement {
                receiver: self,
                name: name.to_string(),
                element,
                assign,
            })
        };

        let elements = self.graph.elements();
        if let Some(element) = elements.get(name) {
            return Ok(bound(element, false));
        }
        if let Some(element) = name.strip_suffix("Assign").and_then(|prefix| elements.get(prefix)) {
            return Ok(bound(element, true));
        }
        drop(elements);

        if is_swizzle(name) {
            return self.swizzle(name).map(Member::Node);
        }
        if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
            let index = name
                .parse::<u32>()
                .map_err(|_| ErrorKind::UnknownMember {
                    node: self.entry().kind.type_name().to_string(),
                    member: name.to_string(),
                })?;
            return Ok(Member::Node(self.element(self.graph.uint(index))));
        }
        match name {
            "width" => return Ok(Member::Node(self.x())),
            "height" => return Ok(Member::Node(self.y())),
            _ => {}
        }

        let record = self.graph.serialize_node(self.id);
        match record.get(name) {
            Some(field) => Ok(Member::Field(field.clone())),
            None => Err(ErrorKind::UnknownMember {
                node: self.entry().kind.type_name().to_string(),
                member: name.to_string(),
            }
            .into()),
        }
    }

    /// Resolve `name` and invoke it with `args`.
    pub fn call_member(self, name: &str, args: &[Value<'g>]) -> Result<Node<'g>> {
        match self.member(name)? {
            Member::Method(method) => method.call(args),
            Member::Node(_) | Member::Field(_) => Err(ErrorKind::NotCallable(name.to_string()).into()),
        }
    }
}

// ── std::ops ───────────────────────────────────────────────────────────

macro_rules! ops_impl {
    ($($trait:ident :: $method:ident => $op:ident),+ $(,)?) => {
        $(
            impl<'g, T: IntoNode<'g>> std::ops::$trait<T> for Node<'g> {
                type Output = Node<'g>;

                fn $method(self, rhs: T) -> Node<'g> {
                    self.operator(Op::$op, rhs)
                }
            }

            impl<'g> std::ops::$trait<Node<'g>> for f64 {
                type Output = Node<'g>;

                fn $method(self, rhs: Node<'g>) -> Node<'g> {
                    rhs.graph.float(self).operator(Op::$op, rhs)
                }
            }
        )+
    };
}

ops_impl! {
    Add::add => Add,
    Sub::sub => Sub,
    Mul::mul => Mul,
    Div::div => Div,
    Rem::rem => Rem,
}

impl<'g> std::ops::Neg for Node<'g> {
    type Output = Node<'g>;

    fn neg(self) -> Node<'g> {
        self.negate()
    }
}

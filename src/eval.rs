//! Evaluates a parsed script into nodes of a [`NodeGraph`].
//!
//! Identifiers resolve to `let` bindings first, then to builtin nodes.
//! Calls by bare name try the global constructors (`vec3`, `uniform`,
//! `texture`...) and fall back to registered elements, whose first argument
//! is the receiver: `mix(t, a, b)` is `t.mix(a, b)`.

use std::collections::HashMap;
use std::mem;

use log::{debug, warn};
use serde_json::Value as Json;

use crate::ast::{Expr, ExprKind, Script, Statement};
use crate::builder::Stage;
use crate::error::{ErrorKind, NodeError, Result};
use crate::graph::{NodeGraph, NodeId};
use crate::nodes::{NodeKind, OscMethod, StackNode};
use crate::shader::{ConvertArg, Member, Node, Value};
use crate::types::NodeType;

/// Output nodes selected by a script's `output` statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptOutputs {
    pub vertex: Option<NodeId>,
    pub fragment: Option<NodeId>,
    pub compute: Option<NodeId>,
}

impl ScriptOutputs {
    pub fn is_empty(&self) -> bool {
        self.vertex.is_none() && self.fragment.is_none() && self.compute.is_none()
    }
}

pub struct Evaluator<'g> {
    graph: &'g NodeGraph,
    bindings: HashMap<String, Value<'g>>,
    /// Statements recorded since the last output.
    pending: Vec<NodeId>,
    outputs: ScriptOutputs,
}

impl<'g> Evaluator<'g> {
    pub fn new(graph: &'g NodeGraph) -> Self {
        Self {
            graph,
            bindings: HashMap::new(),
            pending: Vec::new(),
            outputs: ScriptOutputs::default(),
        }
    }

    pub fn run(mut self, script: &Script) -> Result<ScriptOutputs> {
        for statement in &script.statements {
            self.statement(statement)?;
        }
        if !self.pending.is_empty() {
            warn!(
                "{} statement(s) after the last output are not part of any shader",
                self.pending.len()
            );
        }
        Ok(self.outputs)
    }

    fn statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Let { name, value, .. } => {
                let value = self.expr(value)?;
                debug!("let {name}");
                self.bindings.insert(name.clone(), value);
            }
            Statement::Output { stage, value, span } => {
                let node = self.node(value)?;
                let output = self.with_pending(node.id());
                let slot = match stage {
                    Stage::Vertex => &mut self.outputs.vertex,
                    Stage::Fragment => &mut self.outputs.fragment,
                    Stage::Compute => &mut self.outputs.compute,
                };
                if slot.replace(output).is_some() {
                    return Err(
                        NodeError::invalid_argument(format!("{stage} output is set twice")).with_span(span.clone()),
                    );
                }
            }
            Statement::Expr(expr) => {
                // Assignments made while the stack is open record themselves.
                self.graph.push_stack();
                let value = self.expr(expr);
                let recorded = self.graph.pop_stack();
                match (value?, recorded.is_empty()) {
                    (_, false) => self.pending.extend(recorded),
                    (Value::Node(node), true) => self.pending.push(node.id()),
                    (_, true) => {}
                }
            }
        }
        Ok(())
    }

    /// Wrap `output` so statements recorded before it run first.
    fn with_pending(&mut self, output: NodeId) -> NodeId {
        if self.pending.is_empty() {
            return output;
        }
        let statements = mem::take(&mut self.pending);
        self.graph.add(NodeKind::Stack(StackNode { statements, output }))
    }

    // ── Expressions ────────────────────────────────────────────────────

    fn node(&mut self, expr: &Expr) -> Result<Node<'g>> {
        let value = self.expr(expr)?;
        value.to_node(self.graph).map_err(|e| e.with_span(expr.span.clone()))
    }

    fn expr(&mut self, expr: &Expr) -> Result<Value<'g>> {
        self.eval(expr).map_err(|e| e.with_span(expr.span.clone()))
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value<'g>> {
        let value = match &expr.kind {
            ExprKind::Number(v) => Value::Number(*v),
            ExprKind::Bool(v) => Value::Bool(*v),
            ExprKind::String(s) => Value::Str(s.clone()),
            ExprKind::Ident(name) => self.ident(name)?,
            ExprKind::Member { object, name } => {
                let object = self.node(object)?;
                member_value(object.member(name)?)?
            }
            ExprKind::Call { callee, args } => {
                let args = args.iter().map(|arg| self.expr(arg)).collect::<Result<Vec<_>>>()?;
                Value::Node(self.call(callee, args)?)
            }
            ExprKind::Index { object, index } => {
                let object = self.node(object)?;
                let index = self.node(index)?;
                Value::Node(object.element(index))
            }
            ExprKind::Binary { left, op, right } => {
                let left = self.node(left)?;
                let right = self.node(right)?;
                Value::Node(left.operator(op.op(), right))
            }
            ExprKind::Negate(operand) => Value::Node(self.node(operand)?.negate()),
        };
        Ok(value)
    }

    fn ident(&self, name: &str) -> Result<Value<'g>> {
        if let Some(value) = self.bindings.get(name) {
            return Ok(value.clone());
        }
        self.graph
            .builtin(name)
            .map(Value::Node)
            .ok_or_else(|| ErrorKind::UnknownIdentifier(name.to_string()).into())
    }

    fn call(&mut self, callee: &Expr, args: Vec<Value<'g>>) -> Result<Node<'g>> {
        match &callee.kind {
            ExprKind::Member { object, name } => {
                let receiver = self.node(object)?;
                receiver.call_member(name, &args)
            }
            ExprKind::Ident(name) => {
                if self.bindings.contains_key(name) {
                    return Err(ErrorKind::NotCallable(name.clone()).into());
                }
                if let Some(node) = global(self.graph, name, &args)? {
                    return Ok(node);
                }
                if !self.graph.elements().contains(name) {
                    return Err(ErrorKind::UnknownIdentifier(name.clone()).into());
                }
                let Some((receiver, rest)) = args.split_first() else {
                    return Err(NodeError::invalid_argument(format!(
                        "{name} expects its receiver as the first argument"
                    )));
                };
                receiver.to_node(self.graph)?.call_member(name, rest)
            }
            _ => Err(ErrorKind::NotCallable(describe(callee)).into()),
        }
    }
}

/// Script-visible value of a dynamic member.
fn member_value(member: Member<'_>) -> Result<Value<'_>> {
    match member {
        Member::Node(node) => Ok(Value::Node(node)),
        Member::Method(method) => Err(NodeError::invalid_argument(format!(
            "element {} must be called",
            method.name
        ))),
        Member::Field(Json::Number(n)) => Ok(Value::Number(n.as_f64().unwrap_or_default())),
        Member::Field(Json::Bool(b)) => Ok(Value::Bool(b)),
        Member::Field(Json::String(s)) => Ok(Value::Str(s)),
        Member::Field(other) => Err(NodeError::invalid_argument(format!(
            "field value {other} has no script representation"
        ))),
    }
}

fn describe(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Ident(name) => name.clone(),
        _ => format!("expression at {}..{}", expr.span.start, expr.span.end),
    }
}

// ── Global constructors ────────────────────────────────────────────────

fn str_arg<'a>(args: &'a [Value<'_>], index: usize, function: &str, what: &str) -> Result<&'a str> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| NodeError::invalid_argument(format!("{function} expects {what} as argument {}", index + 1)))
}

fn type_arg(args: &[Value<'_>], index: usize, function: &str) -> Result<NodeType> {
    str_arg(args, index, function, "a type name")?.parse()
}

fn number_arg(args: &[Value<'_>], index: usize, function: &str, default: f64) -> Result<f64> {
    match args.get(index) {
        None => Ok(default),
        Some(Value::Number(v)) => Ok(*v),
        Some(_) => Err(NodeError::invalid_argument(format!(
            "{function} expects a number as argument {}",
            index + 1
        ))),
    }
}

fn convert_arg<'g>(value: &Value<'g>) -> Result<ConvertArg<'g>> {
    match value {
        Value::Node(node) => Ok(ConvertArg::Node(*node)),
        Value::Number(v) => Ok(ConvertArg::Number(*v)),
        Value::Bool(b) => Ok(ConvertArg::Bool(*b)),
        Value::Str(s) => Err(NodeError::invalid_argument(format!(
            "type constructors take numbers or nodes, got \"{s}\""
        ))),
    }
}

fn is_value_type(name: &str) -> bool {
    name.parse::<NodeType>()
        .is_ok_and(|ty| !ty.is_reference() && ty != NodeType::Void)
}

fn osc_method(name: &str) -> Option<OscMethod> {
    match name {
        "oscSine" => Some(OscMethod::Sine),
        "oscSquare" => Some(OscMethod::Square),
        "oscTriangle" => Some(OscMethod::Triangle),
        "oscSawtooth" => Some(OscMethod::Sawtooth),
        _ => None,
    }
}

/// Free functions that create nodes without a receiver. `None` when `name`
/// is not one of them.
fn global<'g>(graph: &'g NodeGraph, name: &str, args: &[Value<'g>]) -> Result<Option<Node<'g>>> {
    let optional_node = |index: usize| args.get(index).map(|v| v.to_node(graph)).transpose();

    let node = match name {
        "attribute" => {
            let attribute = str_arg(args, 0, name, "an attribute name")?;
            graph.attribute(attribute, type_arg(args, 1, name)?)
        }
        "property" | "uniform" => {
            let ty = type_arg(args, 0, name)?;
            let label = match args.get(1) {
                None => None,
                Some(_) => Some(str_arg(args, 1, name, "a name")?),
            };
            if name == "property" {
                graph.property(ty, label)
            } else {
                graph.uniform(ty, label)
            }
        }
        "texture" => {
            let texture = str_arg(args, 0, name, "a texture name")?;
            let uv = match optional_node(1)? {
                Some(uv) => uv,
                None => graph.uv(0),
            };
            graph.texture(texture, uv, optional_node(2)?)
        }
        "uv" => graph.uv(number_arg(args, 0, name, 0.0)? as u32),
        "timerLocal" => graph.timer_local(number_arg(args, 0, name, 1.0)?),
        "timerGlobal" => graph.timer_global(number_arg(args, 0, name, 1.0)?),
        "timerDelta" => graph.timer_delta(number_arg(args, 0, name, 1.0)?),
        _ => {
            if let Some(method) = osc_method(name) {
                let time = match optional_node(0)? {
                    Some(time) => time,
                    None => graph.time(),
                };
                return Ok(Some(graph.osc(method, time)));
            }
            if !is_value_type(name) {
                return Ok(None);
            }
            let args = args.iter().map(convert_arg).collect::<Result<Vec<_>>>()?;
            return Ok(graph.construct_named(name, args));
        }
    };
    Ok(Some(node))
}

/// Parse and evaluate `source` into `graph`.
pub fn evaluate<'g>(graph: &'g NodeGraph, source: &str) -> Result<ScriptOutputs> {
    let script = crate::parser::parse(source)?;
    Evaluator::new(graph).run(&script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::MathMethod;

    fn outputs(graph: &NodeGraph, source: &str) -> ScriptOutputs {
        evaluate(graph, source).expect("script should evaluate")
    }

    #[test]
    fn let_bindings_feed_outputs() {
        let graph = NodeGraph::new();
        let out = outputs(
            &graph,
            r#"
            let tint = uniform("vec3", "tint");
            output fragment = vec4(tint * 0.5, 1.0);
            "#,
        );
        let fragment = out.fragment.expect("fragment output");
        assert!(matches!(graph.entry(fragment).kind, NodeKind::Join(_)));
        assert!(out.vertex.is_none());
    }

    #[test]
    fn element_calls_take_the_receiver_first() {
        let graph = NodeGraph::new();
        let out = outputs(
            &graph,
            r#"
            let t = uniform("float", "t");
            output fragment = vec4(mix(t, vec3(0.0), vec3(1.0)), 1.0);
            let blend = t.mix(1.0, 2.0);
            output vertex = vec4(positionLocal * blend, 1.0);
            "#,
        );
        assert!(out.fragment.is_some() && out.vertex.is_some());

        let mixes = graph
            .ids()
            .filter(|&id| matches!(&graph.entry(id).kind, NodeKind::Math(m) if m.method == MathMethod::Mix))
            .count();
        assert_eq!(mixes, 2);
    }

    #[test]
    fn statements_run_before_the_next_output() {
        let graph = NodeGraph::new();
        let out = outputs(
            &graph,
            r#"
            let acc = property("float", "acc");
            acc.assign(1.0);
            acc.addAssign(time);
            output fragment = vec4(acc);
            "#,
        );
        let NodeKind::Stack(stack) = &graph.entry(out.fragment.unwrap()).kind else {
            panic!("expected a statement stack");
        };
        assert_eq!(stack.statements.len(), 2);
    }

    #[test]
    fn compute_outputs_are_assignments() {
        let graph = NodeGraph::new();
        let out = outputs(
            &graph,
            r#"
            let acc = property("float", "acc");
            output compute = acc.addAssign(timerDelta(2.0));
            "#,
        );
        let NodeKind::Operator(op) = &graph.entry(out.compute.unwrap()).kind else {
            panic!("expected an assignment");
        };
        assert_eq!(op.op.as_str(), "=");
    }

    #[test]
    fn unknown_identifiers_report_their_span() {
        let graph = NodeGraph::new();
        let err = evaluate(&graph, "output fragment = vec4(nope, 1.0);").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownIdentifier(ref name) if name == "nope"));
        assert_eq!(err.span, Some(23..27));
    }

    #[test]
    fn non_functions_are_not_callable() {
        let graph = NodeGraph::new();
        let err = evaluate(&graph, "let v = vec3(1.0); output fragment = v.xyz(2.0);").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NotCallable(ref name) if name == "xyz"));

        let err = evaluate(&graph, "let v = vec3(1.0); output fragment = v(2.0);").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NotCallable(_)));
    }

    #[test]
    fn members_read_fields_and_swizzles() {
        let graph = NodeGraph::new();
        let err = evaluate(&graph, "output fragment = vec4(1.0).abs;").unwrap_err();
        assert!(err.to_string().contains("element abs must be called"));

        let out = outputs(&graph, "let c = uniform(\"vec4\", \"c\"); output fragment = vec4(c.bgr, c.3);");
        assert!(out.fragment.is_some());
    }

    #[test]
    fn outputs_are_set_once() {
        let graph = NodeGraph::new();
        let err = evaluate(&graph, "output fragment = vec4(1.0); output fragment = vec4(0.0);").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidArgument(_)));
    }

    #[test]
    fn global_constructors() {
        let graph = NodeGraph::new();
        let out = outputs(
            &graph,
            r#"
            let wave = oscSine(time * 2.0);
            let albedo = texture("albedo", uv(), 0.0);
            output fragment = albedo * wave + vec4(attribute("color", "vec3"), 0.0);
            "#,
        );
        assert!(out.fragment.is_some());

        let err = evaluate(&graph, "output fragment = uniform(1.0);").unwrap_err();
        assert!(err.to_string().contains("uniform expects a type name"));
    }
}

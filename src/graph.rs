//! Node arena.
//!
//! A [`NodeGraph`] owns every node of one shader program together with the
//! state shared by graph-building code: the element registry consulted by
//! [`Node::member`](crate::shader::Node::member), the literal cache, the
//! statement stacks of `tslFn` bodies and the runtime uniform values.
//! Graphs are independent: nothing is process-wide.

use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{NodeError, Result};
use crate::frame::{NodeFrame, UniformValue};
use crate::nodes::{NodeKind, StackNode};
use crate::shader::convert::ConstCache;
use crate::shader::registry::{Element, ElementRegistry};
use crate::shader::Node;
use crate::types::NodeType;

/// Handle of a node inside its [`NodeGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct NodeEntry {
    pub uuid: Uuid,
    pub kind: NodeKind,
}

pub struct NodeGraph {
    nodes: RefCell<Vec<Rc<NodeEntry>>>,
    elements: RefCell<ElementRegistry>,
    constants: ConstCache,
    stacks: RefCell<Vec<Vec<NodeId>>>,
    immutables: RefCell<HashMap<&'static str, NodeId>>,
    uniforms: RefCell<HashMap<NodeId, UniformValue>>,
}

impl fmt::Debug for NodeGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeGraph")
            .field("nodes", &self.len())
            .field("elements", &self.elements.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Default for NodeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeGraph {
    /// Empty graph with the builtin elements registered and the literal
    /// cache populated.
    pub fn new() -> Self {
        let mut graph = Self {
            nodes: RefCell::new(Vec::new()),
            elements: RefCell::new(ElementRegistry::with_builtins()),
            constants: ConstCache::default(),
            stacks: RefCell::new(Vec::new()),
            immutables: RefCell::new(HashMap::new()),
            uniforms: RefCell::new(HashMap::new()),
        };
        graph.constants = ConstCache::populate(&graph);
        graph
    }

    // ── Arena ──────────────────────────────────────────────────────────

    pub fn add(&self, kind: NodeKind) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len() as u32);
        nodes.push(Rc::new(NodeEntry {
            uuid: Uuid::new_v4(),
            kind,
        }));
        id
    }

    pub fn insert(&self, kind: NodeKind) -> Node<'_> {
        self.node(self.add(kind))
    }

    pub fn node(&self, id: NodeId) -> Node<'_> {
        Node::new(self, id)
    }

    /// Panics if `id` was handed out by another graph.
    pub fn entry(&self, id: NodeId) -> Rc<NodeEntry> {
        Rc::clone(&self.nodes.borrow()[id.index()])
    }

    pub fn uuid(&self, id: NodeId) -> Uuid {
        self.entry(id).uuid
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.len() as u32).map(NodeId)
    }

    /// Type known without a builder; `None` for inferred types.
    pub fn static_type(&self, id: NodeId) -> Option<NodeType> {
        self.entry(id).kind.declared_type()
    }

    // ── Registries ─────────────────────────────────────────────────────

    pub fn elements(&self) -> Ref<'_, ElementRegistry> {
        self.elements.borrow()
    }

    /// Add a named operation to this graph's element registry.
    /// A name can only be registered once; the first registration is kept.
    pub fn register_element(&self, name: &str, element: Element) -> Result<()> {
        self.elements.borrow_mut().register(name, element)
    }

    pub fn constants(&self) -> &ConstCache {
        &self.constants
    }

    /// Memoized node for a builtin accessor such as `positionLocal`.
    pub(crate) fn immutable(&self, key: &'static str, make: impl FnOnce(&Self) -> NodeId) -> Node<'_> {
        if let Some(&id) = self.immutables.borrow().get(key) {
            return self.node(id);
        }
        let id = make(self);
        self.immutables.borrow_mut().insert(key, id);
        self.node(id)
    }

    // ── Statement stacks ───────────────────────────────────────────────

    /// Append a statement to the innermost open stack.
    /// Returns `false` when no stack is open.
    pub fn append(&self, statement: NodeId) -> bool {
        match self.stacks.borrow_mut().last_mut() {
            Some(stack) => {
                stack.push(statement);
                true
            }
            None => false,
        }
    }

    pub fn push_stack(&self) {
        self.stacks.borrow_mut().push(Vec::new());
    }

    pub fn pop_stack(&self) -> Vec<NodeId> {
        self.stacks.borrow_mut().pop().unwrap_or_default()
    }

    /// Statements recorded so far in the innermost stack.
    pub fn stack_statements(&self) -> Vec<NodeId> {
        self.stacks.borrow().last().cloned().unwrap_or_default()
    }

    /// Run `body` with a fresh statement stack. When the body recorded
    /// statements, the result is a [`StackNode`] that emits them first.
    pub fn run_in_stack<'g>(&'g self, body: impl FnOnce() -> Result<Node<'g>>) -> Result<NodeId> {
        self.push_stack();
        let output = body();
        let statements = self.pop_stack();
        let output = output?.id();

        if statements.is_empty() {
            Ok(output)
        } else {
            Ok(self.add(NodeKind::Stack(StackNode { statements, output })))
        }
    }

    // ── Serialization ──────────────────────────────────────────────────

    /// Flat record of the node's configuration. Children are not included.
    pub fn serialize_node(&self, id: NodeId) -> Value {
        let entry = self.entry(id);
        let mut data = Map::new();
        data.insert("uuid".into(), entry.uuid.to_string().into());
        data.insert("type".into(), entry.kind.type_name().into());
        entry.kind.serialize(&mut data);
        Value::Object(data)
    }

    /// Restore a record written by [`NodeGraph::serialize_node`] onto an
    /// existing node of the same kind.
    pub fn deserialize_node(&self, id: NodeId, record: &Value) -> Result<()> {
        let Value::Object(data) = record else {
            return Err(NodeError::invalid_argument("node record must be an object"));
        };
        let entry = self.entry(id);
        let expected = entry.kind.type_name();
        let found = data.get("type").and_then(Value::as_str).unwrap_or("<missing>");
        if found != expected {
            return Err(NodeError::invalid_argument(format!(
                "cannot restore a {found} record into {expected}"
            )));
        }

        let mut kind = entry.kind.clone();
        kind.deserialize(data)?;

        let uuid = match data.get("uuid").and_then(Value::as_str) {
            Some(text) => Uuid::parse_str(text)
                .map_err(|e| NodeError::invalid_argument(format!("bad uuid '{text}': {e}")))?,
            None => entry.uuid,
        };

        self.nodes.borrow_mut()[id.index()] = Rc::new(NodeEntry { uuid, kind });
        Ok(())
    }

    // ── Runtime values ─────────────────────────────────────────────────

    /// Refresh the uniform values of `nodes` from `frame`. Nodes that do not
    /// need updates are skipped.
    pub fn update(&self, frame: &NodeFrame, nodes: &[NodeId]) {
        for &id in nodes {
            let entry = self.entry(id);
            let value = match &entry.kind {
                NodeKind::Object3d(node) => node.update(frame),
                NodeKind::Scene(node) => node.update(frame),
                NodeKind::Timer(node) => {
                    let previous = self
                        .uniform_value(id)
                        .and_then(|value| value.as_float())
                        .unwrap_or(0.0);
                    node.update(frame, previous)
                }
                _ => continue,
            };
            self.set_uniform(id, value);
        }
    }

    pub fn uniform_value(&self, id: NodeId) -> Option<UniformValue> {
        self.uniforms.borrow().get(&id).copied()
    }

    pub fn set_uniform(&self, id: NodeId, value: UniformValue) {
        self.uniforms.borrow_mut().insert(id, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Object3dNode, Object3dScope, Object3dTarget, TimerNode, TimerScope};
    use crate::shader::registry::Value;

    #[test]
    fn record_round_trip_restores_configuration() {
        let graph = NodeGraph::new();
        let a = graph.float(2.5);
        let b = graph.uniform(NodeType::VEC3, Some("tint"));
        let sum = a.add(b);

        let record = graph.serialize_node(sum.id());
        assert_eq!(record["type"], "OperatorNode");
        assert_eq!(record["op"], "+");

        let mut edited = record.clone();
        edited["op"] = "*".into();
        graph.deserialize_node(sum.id(), &edited).expect("restore record");

        let NodeKind::Operator(op) = &graph.entry(sum.id()).kind else {
            panic!("expected an operator");
        };
        assert_eq!(op.op.as_str(), "*");
        assert_eq!(graph.uuid(sum.id()).to_string(), record["uuid"]);
    }

    #[test]
    fn deserialize_rejects_other_kinds_and_unknown_values() {
        let graph = NodeGraph::new();
        let sum = graph.float(1.0).add(graph.float(2.0));
        let sin = graph.float(1.0).sin();

        let record = graph.serialize_node(sin.id());
        assert!(graph.deserialize_node(sum.id(), &record).is_err());

        let mut bad = graph.serialize_node(sin.id());
        bad["method"] = "sinh".into();
        let err = graph.deserialize_node(sin.id(), &bad).unwrap_err();
        assert_eq!(err.to_string(), "MathNode: unknown method 'sinh'");
    }

    #[test]
    fn scene_records_with_unknown_scope_fail() {
        let graph = NodeGraph::new();
        let node = graph.background_intensity();
        let mut record = graph.serialize_node(node.id());
        record["scope"] = "backgroundRotation".into();
        let err = graph.deserialize_node(node.id(), &record).unwrap_err();
        assert_eq!(err.to_string(), "SceneNode: unknown scope 'backgroundRotation'");
    }

    #[test]
    fn run_in_stack_wraps_statements() {
        let graph = NodeGraph::new();
        let acc = graph.property(NodeType::FLOAT, Some("acc"));
        let id = graph
            .run_in_stack(|| {
                acc.add_assign(1.0);
                Ok(acc)
            })
            .expect("run body");
        let NodeKind::Stack(stack) = &graph.entry(id).kind else {
            panic!("expected a stack node");
        };
        assert_eq!(stack.statements.len(), 1);
        assert_eq!(stack.output, acc.id());
        assert!(!graph.append(acc.id()));
    }

    #[test]
    fn update_refreshes_uniforms() {
        let graph = NodeGraph::new();
        let near = graph.insert(NodeKind::Object3d(
            Object3dNode::new(Object3dTarget::Camera, Object3dScope::Near).expect("camera scope"),
        ));
        let timer = graph.insert(NodeKind::Timer(TimerNode {
            scope: TimerScope::Local,
            scale: 2.0,
        }));

        let mut frame = NodeFrame::default();
        frame.camera.near = 0.5;
        frame.advance(0.25);
        graph.update(&frame, &[near.id(), timer.id()]);
        frame.advance(0.25);
        graph.update(&frame, &[timer.id()]);

        assert_eq!(graph.uniform_value(near.id()), Some(UniformValue::Float(0.5)));
        assert_eq!(graph.uniform_value(timer.id()), Some(UniformValue::Float(1.0)));
    }

    fn identity<'g>(node: Node<'g>, _: &[Value<'g>]) -> Result<Node<'g>> {
        Ok(node)
    }

    #[test]
    fn graphs_do_not_share_registries() {
        let first = NodeGraph::new();
        let second = NodeGraph::new();
        first
            .register_element("foo", Element::Function(identity))
            .expect("register foo");
        assert!(first.elements().get("foo").is_some());
        assert!(second.elements().get("foo").is_none());
    }
}

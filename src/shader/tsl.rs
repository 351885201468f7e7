//! Shader functions: node factories written as plain Rust functions.

use std::collections::BTreeMap;
use std::fmt;

use log::trace;

use crate::error::{ErrorKind, Result};
use crate::graph::{NodeGraph, NodeId};
use crate::nodes::{FunctionNode, NodeKind};
use crate::shader::{IntoNode, Node};

pub type ShaderFn = for<'g> fn(&Inputs<'g>) -> Result<Node<'g>>;

/// Named inputs of a shader function.
#[derive(Debug, Clone)]
pub struct Inputs<'g> {
    graph: &'g NodeGraph,
    function: &'static str,
    values: BTreeMap<String, Node<'g>>,
}

impl<'g> Inputs<'g> {
    pub fn new(graph: &'g NodeGraph) -> Self {
        Self {
            graph,
            function: "",
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl IntoNode<'g>) -> Self {
        self.values.insert(name.to_string(), value.into_node(self.graph));
        self
    }

    pub fn get(&self, name: &str) -> Result<Node<'g>> {
        self.values.get(name).copied().ok_or_else(|| {
            ErrorKind::MissingInput {
                function: self.function.to_string(),
                input: name.to_string(),
            }
            .into()
        })
    }

    pub fn graph(&self) -> &'g NodeGraph {
        self.graph
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Node<'g>)> {
        self.values.iter().map(|(name, node)| (name.as_str(), *node))
    }

    pub(crate) fn from_ids(graph: &'g NodeGraph, function: &'static str, ids: &[(String, NodeId)]) -> Self {
        Self {
            graph,
            function,
            values: ids.iter().map(|(name, id)| (name.clone(), graph.node(*id))).collect(),
        }
    }

    fn named(mut self, function: &'static str) -> Self {
        self.function = function;
        self
    }
}

/// A shader function with its name. Every call runs the body again;
/// statements the body records end up in a stack node.
#[derive(Clone, Copy)]
pub struct TslFn {
    name: &'static str,
    func: ShaderFn,
}

impl fmt::Debug for TslFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TslFn").field(&self.name).finish()
    }
}

impl TslFn {
    pub const fn new(name: &'static str, func: ShaderFn) -> Self {
        Self { name, func }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the body now.
    pub fn call<'g>(&self, graph: &'g NodeGraph, inputs: Inputs<'g>) -> Result<Node<'g>> {
        let inputs = inputs.named(self.name);
        let id = graph.run_in_stack(|| (self.func)(&inputs))?;
        trace!("{} -> {id}", self.name);
        Ok(graph.node(id))
    }

    /// Defer the body to the construct stage of the build.
    pub fn deferred<'g>(&self, graph: &'g NodeGraph, inputs: Inputs<'g>) -> Node<'g> {
        graph.insert(NodeKind::Function(FunctionNode {
            name: self.name,
            func: self.func,
            inputs: inputs.iter().map(|(name, node)| (name.to_string(), node.id())).collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{CompileOptions, NodeBuilder, Stage};
    use crate::types::NodeType;

    fn scaled<'g>(inputs: &Inputs<'g>) -> Result<Node<'g>> {
        Ok(inputs.get("value")?.mul(inputs.get("scale")?))
    }

    fn accumulate<'g>(inputs: &Inputs<'g>) -> Result<Node<'g>> {
        let acc = inputs.graph().property(NodeType::FLOAT, Some("acc"));
        acc.add_assign(inputs.get("value")?);
        Ok(acc)
    }

    static SCALED: TslFn = TslFn::new("scaled", scaled);
    static ACCUMULATE: TslFn = TslFn::new("accumulate", accumulate);

    #[test]
    fn pure_calls_build_fresh_nodes() {
        let graph = NodeGraph::new();
        let value = graph.uniform(NodeType::FLOAT, Some("value"));
        let first = SCALED
            .call(&graph, Inputs::new(&graph).with("value", value).with("scale", 2.0))
            .unwrap();
        let again = SCALED
            .call(&graph, Inputs::new(&graph).with("value", value).with("scale", 2.0))
            .unwrap();
        assert_ne!(first, again);
        assert!(matches!(graph.entry(first.id()).kind, NodeKind::Operator(_)));
    }

    #[test]
    fn repeated_calls_keep_every_statement() {
        let graph = NodeGraph::new();
        let first = ACCUMULATE
            .call(&graph, Inputs::new(&graph).with("value", 1.0))
            .unwrap();
        let second = ACCUMULATE
            .call(&graph, Inputs::new(&graph).with("value", 1.0))
            .unwrap();
        assert_ne!(first, second);

        let mut builder = NodeBuilder::new(&graph, CompileOptions::default());
        let code = builder
            .build_node(Stage::Fragment, first.add(second).id(), None)
            .unwrap();
        assert_eq!(code, "(acc + acc)");
        assert_eq!(
            builder.flow_code(Stage::Fragment).matches("acc = (acc + 1.0);").count(),
            2
        );
    }

    #[test]
    fn recorded_statements_become_a_stack() {
        let graph = NodeGraph::new();
        let out = ACCUMULATE
            .call(&graph, Inputs::new(&graph).with("value", 1.0))
            .unwrap();
        assert!(matches!(graph.entry(out.id()).kind, NodeKind::Stack(_)));
    }

    #[test]
    fn deferred_calls_build_a_function_node() {
        let graph = NodeGraph::new();
        let node = SCALED.deferred(&graph, Inputs::new(&graph).with("value", 1.0).with("scale", 0.5));
        let NodeKind::Function(function) = &graph.entry(node.id()).kind else {
            panic!("expected a function node");
        };
        assert_eq!(function.name, "scaled");
        assert_eq!(function.inputs.len(), 2);
    }
}

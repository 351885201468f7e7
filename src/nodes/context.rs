use crate::builder::context::ContextMap;
use crate::builder::NodeBuilder;
use crate::error::Result;
use crate::graph::NodeId;
use crate::types::NodeType;

/// Builds `node` with `context` merged over the builder's current context.
/// The previous context is restored afterwards, also when the build fails.
#[derive(Debug, Clone)]
pub struct ContextNode {
    pub node: NodeId,
    pub context: ContextMap,
}

impl ContextNode {
    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, output: Option<NodeType>) -> Result<String> {
        if let Some(label) = self.context.get_str("label") {
            builder.set_label(self.node, label);
        }
        builder.with_context(&self.context, |builder| builder.build(self.node, output))
    }
}

/// Emits `call` as a statement, then yields `output`.
#[derive(Debug, Clone)]
pub struct BypassNode {
    pub output: NodeId,
    pub call: NodeId,
}

impl BypassNode {
    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>) -> Result<String> {
        let snippet = builder.build(self.call, Some(NodeType::Void))?;
        builder.add_statement(self.call, &snippet);
        builder.build(self.output, None)
    }
}

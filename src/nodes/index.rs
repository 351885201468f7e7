use crate::builder::{NodeBuilder, Stage};
use crate::error::{NodeError, Result};
use crate::graph::NodeId;
use crate::nodes::core::VaryingNode;
use crate::nodes::NodeKind;
use crate::types::NodeType;

node_enum! {
    pub enum IndexScope ("IndexNode", "scope") {
        Vertex => "vertex",
        Instance => "instance",
    }
}

/// Built-in per-invocation index. The fragment stage has no native index,
/// so there the value is carried from the vertex stage by a varying.
#[derive(Debug, Clone)]
pub struct IndexNode {
    pub scope: IndexScope,
}

impl IndexNode {
    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>, id: NodeId) -> Result<String> {
        match builder.stage() {
            Stage::Vertex | Stage::Compute => builder.index_snippet(self.scope),
            Stage::Fragment => {
                let varying = builder.derived_node(id, "varying", |graph| {
                    graph.add(NodeKind::Varying(VaryingNode { node: id, name: None }))
                });
                builder.build(varying, Some(NodeType::UINT))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrontFacingNode;

impl FrontFacingNode {
    pub(crate) fn generate(&self, builder: &mut NodeBuilder<'_>) -> Result<String> {
        if builder.stage() != Stage::Fragment {
            return Err(NodeError::unsupported(
                builder.language().name(),
                format!("frontFacing in the {} stage", builder.stage()),
            ));
        }
        Ok(builder.front_facing())
    }
}

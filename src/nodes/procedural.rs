use crate::builder::NodeBuilder;
use crate::error::Result;
use crate::graph::NodeId;
use crate::shader::tsl::{Inputs, TslFn};
use crate::shader::Node;

/// Two-tone checkerboard over `uv`: `1.0` on odd cells, `0.0` on even ones.
#[derive(Debug, Clone)]
pub struct CheckerNode {
    pub uv: NodeId,
}

impl CheckerNode {
    pub(crate) fn construct(&self, builder: &mut NodeBuilder<'_>) -> Result<NodeId> {
        let graph = builder.graph();
        let inputs = Inputs::new(graph).with("uv", graph.node(self.uv));
        Ok(CHECKER.call(graph, inputs)?.id())
    }
}

fn checker<'g>(inputs: &Inputs<'g>) -> Result<Node<'g>> {
    let uv = inputs.get("uv")?.mul(2.0);
    let cx = uv.x().floor();
    let cy = uv.y().floor();
    Ok(cx.add(cy).modulo(2.0).sign())
}

pub static CHECKER: TslFn = TslFn::new("checker", checker);

use crate::builder::NodeBuilder;
use crate::error::Result;
use crate::graph::NodeId;
use crate::shader::tsl::{Inputs, TslFn};
use crate::shader::{Node, EPSILON};

node_enum! {
    pub enum BlendMode ("BlendModeNode", "blendMode") {
        Burn => "burn",
        Dodge => "dodge",
        Screen => "screen",
        Overlay => "overlay",
    }
}

/// Photoshop-style blend of two colors, applied per RGB channel.
#[derive(Debug, Clone)]
pub struct BlendModeNode {
    pub mode: BlendMode,
    pub base: NodeId,
    pub blend: NodeId,
}

impl BlendModeNode {
    pub(crate) fn construct(&self, builder: &mut NodeBuilder<'_>) -> Result<NodeId> {
        let graph = builder.graph();
        let inputs = Inputs::new(graph)
            .with("base", graph.node(self.base))
            .with("blend", graph.node(self.blend));

        let function = match self.mode {
            BlendMode::Burn => &BURN,
            BlendMode::Dodge => &DODGE,
            BlendMode::Screen => &SCREEN,
            BlendMode::Overlay => &OVERLAY,
        };
        Ok(function.call(graph, inputs)?.id())
    }
}

type Channel<'g> = fn(Node<'g>) -> Node<'g>;

/// Apply `op` to the x, y and z channels of `base` and `blend` and join the results.
fn per_channel<'g>(
    inputs: &Inputs<'g>,
    op: impl Fn(Node<'g>, Node<'g>) -> Node<'g>,
) -> Result<Node<'g>> {
    let base = inputs.get("base")?;
    let blend = inputs.get("blend")?;
    let channels: [Channel<'g>; 3] = [Node::x, Node::y, Node::z];
    let [x, y, z] = channels.map(|pick| op(pick(base), pick(blend)));
    Ok(inputs.graph().vec3((x, y, z)))
}

fn screen_channel<'g>(base: Node<'g>, blend: Node<'g>) -> Node<'g> {
    base.one_minus().mul(blend.one_minus()).one_minus()
}

fn burn<'g>(inputs: &Inputs<'g>) -> Result<Node<'g>> {
    per_channel(inputs, |base, blend| {
        blend
            .less_than(EPSILON)
            .cond(blend, base.one_minus().div(blend).one_minus().max(0.0))
    })
}

fn dodge<'g>(inputs: &Inputs<'g>) -> Result<Node<'g>> {
    per_channel(inputs, |base, blend| {
        blend
            .equal(1.0)
            .cond(blend, base.div(blend.one_minus()).max(0.0))
    })
}

fn screen<'g>(inputs: &Inputs<'g>) -> Result<Node<'g>> {
    per_channel(inputs, screen_channel)
}

fn overlay<'g>(inputs: &Inputs<'g>) -> Result<Node<'g>> {
    per_channel(inputs, |base, blend| {
        base.less_than(0.5)
            .cond(base.mul(blend).mul(2.0), screen_channel(base, blend))
    })
}

pub static BURN: TslFn = TslFn::new("burn", burn);
pub static DODGE: TslFn = TslFn::new("dodge", dodge);
pub static SCREEN: TslFn = TslFn::new("screen", screen);
pub static OVERLAY: TslFn = TslFn::new("overlay", overlay);

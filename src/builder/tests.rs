use super::*;
use crate::nodes::OperatorNode;
use crate::shader::Node;

fn builder(graph: &NodeGraph) -> NodeBuilder<'_> {
    NodeBuilder::new(graph, CompileOptions::default())
}

fn wgsl_builder(graph: &NodeGraph) -> NodeBuilder<'_> {
    NodeBuilder::new(
        graph,
        CompileOptions {
            language: Language::Wgsl,
            ..CompileOptions::default()
        },
    )
}

// ── Types ──────────────────────────────────────────────────────────────

#[test]
fn scalar_operands_widen_to_the_vector_side() {
    let graph = NodeGraph::new();
    let sum = graph.float(1.0).add(graph.vec3((2.0, 0.0, 0.0)));

    let mut builder = builder(&graph);
    assert_eq!(builder.node_type(sum.id()).unwrap(), NodeType::VEC3);
    let code = builder.build_node(Stage::Fragment, sum.id(), None).unwrap();
    assert_eq!(code, "(vec3(1.0) + vec3(2.0, 0.0, 0.0))");
}

#[test]
fn comparison_types_follow_the_requested_output() {
    let graph = NodeGraph::new();
    let a = graph.uniform(NodeType::VEC4, Some("a"));
    let b = graph.uniform(NodeType::VEC4, Some("b"));
    let less = a.less_than(b);

    let builder = builder(&graph);
    let bvec4 = NodeType::Vector(Component::Bool, 4);
    assert_eq!(builder.node_type(less.id()).unwrap(), bvec4);
    assert_eq!(builder.node_type_for(less.id(), Some(NodeType::BOOL)).unwrap(), NodeType::BOOL);
    assert_eq!(builder.node_type(a.equal(b).id()).unwrap(), NodeType::BOOL);
}

#[test]
fn matrix_products() {
    let graph = NodeGraph::new();
    let m4 = graph.uniform(NodeType::MAT4, Some("m4"));
    let m3 = graph.uniform(NodeType::MAT3, Some("m3"));
    let v4 = graph.uniform(NodeType::VEC4, Some("v4"));
    let v3 = graph.uniform(NodeType::VEC3, Some("v3"));

    let builder = builder(&graph);
    assert_eq!(builder.node_type(m4.mul(v4).id()).unwrap(), NodeType::VEC4);
    assert_eq!(builder.node_type(v3.mul(m3).id()).unwrap(), NodeType::VEC3);
    assert_eq!(builder.node_type(graph.float(2.0).mul(m3).id()).unwrap(), NodeType::MAT3);
}

#[test]
fn math_result_types() {
    let graph = NodeGraph::new();
    let v = graph.uniform(NodeType::VEC3, Some("v"));
    let t = graph.uniform(NodeType::FLOAT, Some("t"));

    let builder = builder(&graph);
    assert_eq!(builder.node_type(v.length().id()).unwrap(), NodeType::FLOAT);
    assert_eq!(builder.node_type(v.cross(v).id()).unwrap(), NodeType::VEC3);
    assert_eq!(builder.node_type(v.mix(graph.vec3(1.0), t).id()).unwrap(), NodeType::VEC3);
    assert_eq!(builder.node_type(v.dot(v).id()).unwrap(), NodeType::FLOAT);
}

// ── Context ────────────────────────────────────────────────────────────

#[test]
fn context_is_restored_after_nested_builds() {
    let graph = NodeGraph::new();
    let mut builder = builder(&graph);

    let outer = ContextMap::new().with("label", "a");
    let inner = ContextMap::new().with("label", "b");
    builder
        .with_context(&outer, |builder| {
            builder.with_context(&inner, |builder| {
                assert_eq!(builder.context().get_str("label"), Some("b"));
                Ok(())
            })?;
            assert_eq!(builder.context().get_str("label"), Some("a"));
            Ok(())
        })
        .unwrap();
    assert!(builder.context().is_empty());
}

#[test]
fn context_is_restored_on_error() {
    let graph = NodeGraph::new();
    let mut builder = builder(&graph);
    let overrides = ContextMap::new().with("tempWrite", false);

    let result: Result<()> = builder.with_context(&overrides, |_| Err(NodeError::message("boom")));
    assert!(result.is_err());
    assert_eq!(builder.context().get_bool("tempWrite"), None);
}

#[test]
fn nested_context_nodes_restore_the_outer_context() {
    let graph = NodeGraph::new();
    let inner = graph
        .uniform(NodeType::FLOAT, Some("u"))
        .add(1.0)
        .context(ContextMap::new().with("label", "a").with("tempWrite", true));
    let shared = graph.uniform(NodeType::FLOAT, Some("v")).add(2.0);
    let sibling = shared.mul(shared);
    let root = inner
        .add(sibling)
        .context(ContextMap::new().with("label", "b").with("tempWrite", false));

    let mut builder = builder(&graph);
    let code = builder.build_node(Stage::Fragment, root.id(), None).unwrap();

    // The inner subtree writes its labelled temp; the sibling built after it
    // sees the outer tempWrite = false again and inlines its shared operand.
    assert_eq!(code, "(a + ((v + 2.0) * (v + 2.0)))");
    assert_eq!(builder.flow_code(Stage::Fragment), "    a = (u + 1.0);\n");
    let names: Vec<_> = builder.vars(Stage::Fragment).iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["a"]);
    assert!(builder.context().is_empty());
}

#[test]
fn labels_name_the_shared_variable() {
    let graph = NodeGraph::new();
    let sum = graph.uniform(NodeType::FLOAT, Some("u")).add(1.0).label("sum");
    let square = sum.mul(sum);

    let mut builder = builder(&graph);
    let code = builder.build_node(Stage::Fragment, square.id(), None).unwrap();
    assert_eq!(code, "(sum * sum)");
    assert!(builder.flow_code(Stage::Fragment).contains("sum = (u + 1.0);"));
    assert_eq!(builder.vars(Stage::Fragment)[0].name, "sum");
}

// ── Temporaries and identity ───────────────────────────────────────────

#[test]
fn shared_expressions_are_stored_once() {
    let graph = NodeGraph::new();
    let sum = graph.uniform(NodeType::FLOAT, Some("u")).add(1.0);
    let square = sum.mul(sum);

    let mut builder = builder(&graph);
    let code = builder.build_node(Stage::Fragment, square.id(), None).unwrap();
    assert_eq!(code, "(nodeVar0 * nodeVar0)");
    assert_eq!(builder.flow_code(Stage::Fragment).matches("nodeVar0 = (u + 1.0);").count(), 1);
    assert_eq!(builder.vars(Stage::Fragment).len(), 1);
}

#[test]
fn disabled_temp_writes_inline_the_expression() {
    let graph = NodeGraph::new();
    let sum = graph.uniform(NodeType::FLOAT, Some("u")).add(1.0);
    let square = sum.mul(sum).context(ContextMap::new().with("tempWrite", false));

    let mut builder = builder(&graph);
    let code = builder.build_node(Stage::Fragment, square.id(), None).unwrap();
    assert_eq!(code, "((u + 1.0) * (u + 1.0))");
    assert!(builder.flow_code(Stage::Fragment).is_empty());
}

#[test]
fn positions_with_the_same_scope_share_one_varying() {
    let graph = NodeGraph::new();
    let first = graph.insert(NodeKind::Position(crate::nodes::PositionNode {
        scope: crate::nodes::PositionScope::Local,
    }));
    let second = graph.insert(NodeKind::Position(crate::nodes::PositionNode {
        scope: crate::nodes::PositionScope::Local,
    }));
    assert_ne!(first, second);

    let mut builder = builder(&graph);
    builder.set_fragment_output(graph.vec4((first.add(second), 1.0)).id());
    let output = builder.compile().unwrap();
    assert_eq!(output.varyings.len(), 1);
    assert_eq!(output.attributes.len(), 1);
    assert_eq!(output.attributes[0].name, "position");
}

#[test]
fn fragment_indices_travel_through_a_flat_varying() {
    let graph = NodeGraph::new();
    let index = graph.float(graph.instance_index());

    let mut builder = builder(&graph);
    builder.set_fragment_output(graph.vec4((index, 0.0, 0.0, 1.0)).id());
    let output = builder.compile().unwrap();

    let varying = &output.varyings[0];
    assert_eq!(varying.ty, NodeType::UINT);
    assert!(varying.flat);

    let vertex = output.vertex.unwrap();
    assert!(vertex.contains("flat out uint nodeVarying0;"));
    assert!(vertex.contains("nodeVarying0 = uint(gl_InstanceID);"));
    assert!(output.fragment.unwrap().contains("flat in uint nodeVarying0;"));
}

#[test]
fn fragment_attributes_travel_through_a_varying() {
    let graph = NodeGraph::new();
    let normal = graph.attribute("normal", NodeType::VEC3);

    let mut builder = builder(&graph);
    builder.set_fragment_output(graph.vec4((normal, 1.0)).id());
    let output = builder.compile().unwrap();

    let varying = &output.varyings[0];
    assert_eq!(varying.name, "nodeVarying0");
    assert_eq!(varying.ty, NodeType::VEC3);
    assert!(!varying.flat);
    let attributes: Vec<_> = output.attributes.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(attributes, ["normal", "position"]);

    let vertex = output.vertex.unwrap();
    assert!(vertex.contains("layout(location = 0) in vec3 normal;"));
    assert!(vertex.contains("out vec3 nodeVarying0;"));
    assert_eq!(vertex.matches("nodeVarying0 = normal;").count(), 1);

    let fragment = output.fragment.unwrap();
    assert!(fragment.contains("in vec3 nodeVarying0;"));
    assert!(fragment.contains("fragColor = vec4(nodeVarying0, 1.0);"));
    assert!(!fragment.contains(" normal"));
}

#[test]
fn attributes_read_twice_in_fragment_share_one_varying() {
    let graph = NodeGraph::new();
    let uv = graph.attribute("uv", NodeType::VEC2);

    let mut builder = builder(&graph);
    builder.set_fragment_output(graph.vec4((uv.x(), uv.y(), 0.0, 1.0)).id());
    let output = builder.compile().unwrap();

    // uv for the fragment stage, positionLocal for the default vertex stage
    assert_eq!(output.varyings.len(), 2);
    assert_eq!(output.vertex.unwrap().matches("nodeVarying0 = uv;").count(), 1);
}

#[test]
fn cycles_are_reported() {
    let graph = NodeGraph::new();
    let a = graph.uniform(NodeType::FLOAT, Some("a"));
    let next = NodeId(graph.len() as u32);
    let looped = graph.insert(NodeKind::Operator(OperatorNode {
        op: Op::Add,
        a: a.id(),
        b: next,
    }));
    assert_eq!(looped.id(), next);

    let mut builder = builder(&graph);
    let err = builder.build_node(Stage::Fragment, looped.id(), None).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Cycle(_)));
}

// ── Outputs ────────────────────────────────────────────────────────────

#[test]
fn fragment_only_builds_get_a_default_vertex_stage() {
    let graph = NodeGraph::new();
    let mut builder = builder(&graph);
    builder.set_fragment_output(graph.vec4(1.0).id());
    let output = builder.compile().unwrap();

    let vertex = output.vertex.unwrap();
    assert!(vertex.contains("gl_Position = "));
    let names: Vec<_> = output.uniforms.iter().map(|u| u.name.as_str()).collect();
    assert!(names.contains(&"cameraProjectionMatrix"));
    assert!(names.contains(&"modelViewMatrix"));
}

#[test]
fn compute_outputs_are_exclusive() {
    let graph = NodeGraph::new();
    let acc = graph.property(NodeType::FLOAT, Some("acc"));

    let mut builder = builder(&graph);
    builder.set_compute(acc.assign(1.0).id());
    builder.set_fragment_output(graph.vec4(1.0).id());
    assert!(matches!(builder.compile().unwrap_err().kind, ErrorKind::InvalidArgument(_)));

    assert!(NodeBuilder::new(&graph, CompileOptions::default()).compile().is_err());
}

#[test]
fn compute_statements_land_in_main() {
    let graph = NodeGraph::new();
    let acc = graph.property(NodeType::FLOAT, Some("acc"));

    let mut builder = builder(&graph);
    builder.set_compute(acc.assign(graph.uniform(NodeType::FLOAT, Some("step"))).id());
    let output = builder.compile().unwrap();
    let compute = output.compute.unwrap();
    assert!(compute.contains("layout(local_size_x = 64) in;"));
    assert!(compute.contains("acc = step;"));
}

#[test]
fn bypass_emits_the_call_before_the_value() {
    let graph = NodeGraph::new();
    let acc = graph.property(NodeType::FLOAT, Some("acc"));
    let value = acc.bypass(acc.assign(graph.uniform(NodeType::FLOAT, Some("amount"))));

    let mut builder = builder(&graph);
    builder.set_fragment_output(graph.vec4((value, 1.0)).id());
    let fragment = builder.compile().unwrap().fragment.unwrap();

    let assign = fragment.find("acc = amount;").expect("assignment statement");
    let output = fragment.find("vec4(acc, 1.0)").expect("bypassed value");
    assert!(assign < output);
}

#[test]
fn wgsl_fragment_stage() {
    let graph = NodeGraph::new();
    let tint: Node<'_> = graph.uniform(NodeType::VEC3, Some("tint"));

    let mut builder = wgsl_builder(&graph);
    builder.set_fragment_output(graph.vec4((tint, 1.0)).id());
    let output = builder.compile().unwrap();

    let fragment = output.fragment.unwrap();
    assert!(fragment.contains("@fragment"));
    assert!(fragment.contains("vec4<f32>(tint, 1.0)"));
    assert!(output.uniforms.iter().any(|u| u.name == "tint"));
}

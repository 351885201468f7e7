pub mod ast;
pub mod builder;
pub mod error;
pub mod eval;
pub mod frame;
pub mod graph;
pub mod lexer;
pub mod nodes;
pub mod parser;
pub mod shader;
pub mod token;
pub mod types;

pub use builder::{CompileOptions, Language, NodeBuilder, ShaderOutput, Stage};
pub use error::{ErrorKind, NodeError, Result};
pub use eval::ScriptOutputs;
pub use frame::NodeFrame;
pub use graph::{NodeGraph, NodeId};
pub use shader::{IntoNode, Node};
pub use types::NodeType;

/// Compile the outputs a script selected from `graph`.
pub fn compile_outputs(graph: &NodeGraph, outputs: ScriptOutputs, options: &CompileOptions) -> Result<ShaderOutput> {
    let mut builder = NodeBuilder::new(graph, options.clone());
    if let Some(vertex) = outputs.vertex {
        builder.set_vertex_output(vertex);
    }
    if let Some(fragment) = outputs.fragment {
        builder.set_fragment_output(fragment);
    }
    if let Some(compute) = outputs.compute {
        builder.set_compute(compute);
    }
    builder.compile()
}

/// Compile a graph script to shader source.
pub fn compile(source: &str, options: &CompileOptions) -> Result<ShaderOutput> {
    let graph = NodeGraph::new();
    let outputs = eval::evaluate(&graph, source)?;
    compile_outputs(&graph, outputs, options)
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn end_to_end_glsl() {
        let source = r#"
            let wave = oscSine(time);
            output fragment = vec4(vec3(wave), 1.0);
        "#;

        let output = compile(source, &CompileOptions::default()).expect("compilation should succeed");
        let fragment = output.fragment.unwrap();
        assert!(fragment.starts_with("#version 300 es"));
        assert!(fragment.contains("fragColor = "));
        assert!(output.vertex.unwrap().contains("gl_Position = "));
        let names: Vec<_> = output.uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["nodeUniform0", "cameraProjectionMatrix", "modelViewMatrix"]);
        assert_eq!(output.update_nodes.len(), 3);
    }

    #[test]
    fn end_to_end_wgsl() {
        let options = CompileOptions {
            language: Language::Wgsl,
            ..CompileOptions::default()
        };
        let output = compile("output fragment = vec4(uv(), 0.0, 1.0);", &options).unwrap();
        let fragment = output.fragment.unwrap();
        assert!(fragment.contains("@fragment"));
        // uv for the fragment stage, positionLocal for the default vertex stage
        assert_eq!(output.varyings.len(), 2);
        assert_eq!(output.attributes.len(), 2);
    }

    #[test]
    fn end_to_end_error_has_span() {
        let err = compile("output fragment = vec4(1.0) +;", &CompileOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "expected expression, got ';' (at byte 29..30)");
    }

    #[test]
    fn scripts_without_outputs_fail() {
        let err = compile("let a = 1.0;", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Message(_)));
    }
}

//! GLSL ES backend: 3.00 for render stages, 3.10 for compute.

use std::fmt::Write;

use crate::builder::language::{value_literal, Declaration, ShaderLanguage, StageSource};
use crate::builder::Stage;
use crate::error::{NodeError, Result};
use crate::nodes::{ConstValue, IndexScope, Op};
use crate::types::NodeType;

pub struct Glsl;

const INDENT: &str = "    ";

impl ShaderLanguage for Glsl {
    fn name(&self) -> &'static str {
        "GLSL"
    }

    fn type_name(&self, ty: NodeType) -> String {
        match ty {
            NodeType::Texture => "sampler2D".to_string(),
            other => other.to_string(),
        }
    }

    fn literal(&self, ty: NodeType, value: &ConstValue) -> String {
        value_literal(ty, value, &self.type_name(ty), "")
    }

    fn method(&self, name: &str, args: &[String]) -> String {
        let name = match name {
            "atan2" => "atan",
            other => other,
        };
        format!("{name}({})", args.join(", "))
    }

    fn operator(&self, op: Op) -> &'static str {
        op.as_str()
    }

    fn select(&self, cond: &str, if_value: &str, else_value: &str) -> String {
        format!("({cond} ? {if_value} : {else_value})")
    }

    fn scalar_min_max(&self) -> bool {
        true
    }

    fn texture_sample(&self, _stage: Stage, texture: &str, uv: &str, level: Option<&str>) -> String {
        match level {
            Some(level) => format!("textureLod({texture}, {uv}, {level})"),
            None => format!("texture({texture}, {uv})"),
        }
    }

    fn texture_size(&self, texture: &str, level: &str) -> String {
        format!("uvec2(textureSize({texture}, {level}))")
    }

    fn index(&self, stage: Stage, scope: IndexScope) -> Result<String> {
        match (stage, scope) {
            (Stage::Vertex, IndexScope::Vertex) => Ok("uint(gl_VertexID)".to_string()),
            (Stage::Vertex, IndexScope::Instance) => Ok("uint(gl_InstanceID)".to_string()),
            (Stage::Compute, IndexScope::Instance) => Ok("gl_GlobalInvocationID.x".to_string()),
            (stage, scope) => Err(NodeError::unsupported(
                self.name(),
                format!("a native {scope} index in the {stage} stage"),
            )),
        }
    }

    fn front_facing(&self) -> String {
        "gl_FrontFacing".to_string()
    }

    fn varying_property(&self, name: &str) -> String {
        name.to_string()
    }

    fn discard_value(&self, snippet: &str) -> String {
        snippet.to_string()
    }

    fn var_declaration(&self, var: &Declaration) -> String {
        format!("{} {}", self.type_name(var.ty), var.name)
    }

    fn stage_source(&self, source: &StageSource<'_>) -> String {
        let mut out = String::new();

        let version = match source.stage {
            Stage::Compute => "310 es",
            Stage::Vertex | Stage::Fragment => "300 es",
        };
        let _ = writeln!(out, "#version {version}");
        out.push_str("precision highp float;\nprecision highp int;\n");
        if source.uniforms.iter().any(|u| u.ty == NodeType::Texture) {
            out.push_str("precision highp sampler2D;\n");
        }
        if source.stage == Stage::Compute {
            let _ = writeln!(out, "layout(local_size_x = {}) in;", source.workgroup_size);
        }
        out.push('\n');

        // ── Interface ──
        for uniform in source.uniforms {
            let _ = writeln!(out, "uniform {};", self.var_declaration(uniform));
        }
        match source.stage {
            Stage::Vertex => {
                for (location, attribute) in source.attributes.iter().enumerate() {
                    let _ = writeln!(
                        out,
                        "layout(location = {location}) in {};",
                        self.var_declaration(attribute)
                    );
                }
                for varying in source.varyings {
                    let flat = if varying.flat { "flat " } else { "" };
                    let _ = writeln!(out, "{flat}out {};", self.var_declaration(varying));
                }
            }
            Stage::Fragment => {
                for varying in source.varyings {
                    let flat = if varying.flat { "flat " } else { "" };
                    let _ = writeln!(out, "{flat}in {};", self.var_declaration(varying));
                }
                out.push_str("layout(location = 0) out vec4 fragColor;\n");
            }
            Stage::Compute => {}
        }

        // ── Main ──
        out.push_str("\nvoid main() {\n");
        for var in source.vars {
            let _ = writeln!(out, "{INDENT}{};", self.var_declaration(var));
        }
        out.push_str(source.flow);
        if let Some(output) = source.output {
            match source.stage {
                Stage::Vertex => {
                    let _ = writeln!(out, "{INDENT}gl_Position = {output};");
                }
                Stage::Fragment => {
                    let _ = writeln!(out, "{INDENT}fragColor = {output};");
                }
                Stage::Compute => {}
            }
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names() {
        let args = ["y".to_string(), "x".to_string()];
        assert_eq!(Glsl.method("atan2", &args), "atan(y, x)");
        assert_eq!(Glsl.method("lessThan", &args), "lessThan(y, x)");
    }

    #[test]
    fn fragment_index_is_not_native() {
        assert!(Glsl.index(Stage::Fragment, IndexScope::Instance).is_err());
        assert!(Glsl.index(Stage::Compute, IndexScope::Vertex).is_err());
        assert_eq!(
            Glsl.index(Stage::Vertex, IndexScope::Instance).unwrap(),
            "uint(gl_InstanceID)"
        );
    }

    #[test]
    fn fragment_source_layout() {
        let varyings = [Declaration::new("nodeVarying0", NodeType::UINT)];
        let source = StageSource {
            stage: Stage::Fragment,
            attributes: &[],
            varyings: &varyings,
            uniforms: &[],
            vars: &[],
            flow: "",
            output: Some("vec4(1.0)"),
            workgroup_size: 64,
        };
        let code = Glsl.stage_source(&source);
        assert!(code.starts_with("#version 300 es\n"));
        assert!(code.contains("flat in uint nodeVarying0;"));
        assert!(code.contains("fragColor = vec4(1.0);"));
    }
}

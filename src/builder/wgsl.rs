//! WGSL backend.

use std::fmt::Write;

use crate::builder::language::{value_literal, Declaration, ShaderLanguage, StageSource};
use crate::builder::Stage;
use crate::error::{NodeError, Result};
use crate::nodes::{ConstValue, IndexScope, Op};
use crate::types::{Component, NodeType};

pub struct Wgsl;

const INDENT: &str = "    ";
const VARYINGS_STRUCT: &str = "VaryingsStruct";

fn scalar_name(component: Component) -> &'static str {
    match component {
        Component::Bool => "bool",
        Component::Int => "i32",
        Component::Uint => "u32",
        Component::Float => "f32",
    }
}

impl ShaderLanguage for Wgsl {
    fn name(&self) -> &'static str {
        "WGSL"
    }

    fn type_name(&self, ty: NodeType) -> String {
        match ty {
            NodeType::Scalar(c) => scalar_name(c).to_string(),
            NodeType::Vector(c, n) => format!("vec{n}<{}>", scalar_name(c)),
            NodeType::Matrix(c, n) => format!("mat{n}x{n}<{}>", scalar_name(c)),
            NodeType::Texture => "texture_2d<f32>".to_string(),
            NodeType::Void => "void".to_string(),
            NodeType::Str => "string".to_string(),
        }
    }

    fn literal(&self, ty: NodeType, value: &ConstValue) -> String {
        value_literal(ty, value, &self.type_name(ty), "i")
    }

    fn method(&self, name: &str, args: &[String]) -> String {
        let binary = |token: &str| match args {
            [a, b] => format!("({a} {token} {b})"),
            _ => format!("{name}({})", args.join(", ")),
        };
        match name {
            "lessThan" => binary("<"),
            "greaterThan" => binary(">"),
            "lessThanEqual" => binary("<="),
            "greaterThanEqual" => binary(">="),
            "equal" => binary("=="),
            "mod" => match args {
                [a, b] => format!("({a} - {b} * floor({a} / {b}))"),
                _ => format!("mod({})", args.join(", ")),
            },
            _ => {
                let name = match name {
                    "inversesqrt" => "inverseSqrt",
                    "dFdx" => "dpdx",
                    "dFdy" => "dpdy",
                    "faceforward" => "faceForward",
                    other => other,
                };
                format!("{name}({})", args.join(", "))
            }
        }
    }

    fn operator(&self, op: Op) -> &'static str {
        match op {
            Op::Xor => "!=",
            other => other.as_str(),
        }
    }

    fn select(&self, cond: &str, if_value: &str, else_value: &str) -> String {
        format!("select({else_value}, {if_value}, {cond})")
    }

    fn scalar_min_max(&self) -> bool {
        false
    }

    fn texture_sample(&self, stage: Stage, texture: &str, uv: &str, level: Option<&str>) -> String {
        match (stage, level) {
            (Stage::Fragment, None) => format!("textureSample({texture}, {texture}_sampler, {uv})"),
            (_, level) => format!(
                "textureSampleLevel({texture}, {texture}_sampler, {uv}, {})",
                level.unwrap_or("0.0")
            ),
        }
    }

    fn texture_size(&self, texture: &str, level: &str) -> String {
        format!("textureDimensions({texture}, {level})")
    }

    fn index(&self, stage: Stage, scope: IndexScope) -> Result<String> {
        match (stage, scope) {
            (Stage::Vertex, IndexScope::Vertex) => Ok("vertexIndex".to_string()),
            (Stage::Vertex, IndexScope::Instance) => Ok("instanceIndex".to_string()),
            (Stage::Compute, IndexScope::Instance) => Ok("globalId.x".to_string()),
            (stage, scope) => Err(NodeError::unsupported(
                self.name(),
                format!("a native {scope} index in the {stage} stage"),
            )),
        }
    }

    fn front_facing(&self) -> String {
        "frontFacing".to_string()
    }

    fn varying_property(&self, name: &str) -> String {
        format!("varyings.{name}")
    }

    fn discard_value(&self, snippet: &str) -> String {
        format!("_ = {snippet}")
    }

    fn var_declaration(&self, var: &Declaration) -> String {
        format!("var {}: {}", var.name, self.type_name(var.ty))
    }

    fn stage_source(&self, source: &StageSource<'_>) -> String {
        let mut out = String::new();

        // ── Bindings ──
        let mut binding = 0;
        for uniform in source.uniforms {
            if uniform.ty == NodeType::Texture {
                let _ = writeln!(
                    out,
                    "@group(0) @binding({binding}) var {}: texture_2d<f32>;",
                    uniform.name
                );
                let _ = writeln!(
                    out,
                    "@group(0) @binding({}) var {}_sampler: sampler;",
                    binding + 1,
                    uniform.name
                );
                binding += 2;
            } else {
                let _ = writeln!(
                    out,
                    "@group(0) @binding({binding}) var<uniform> {}: {};",
                    uniform.name,
                    self.type_name(uniform.ty)
                );
                binding += 1;
            }
        }
        if binding > 0 {
            out.push('\n');
        }

        if source.stage != Stage::Compute {
            let _ = writeln!(out, "struct {VARYINGS_STRUCT} {{");
            let _ = writeln!(out, "{INDENT}@builtin(position) Vertex: vec4<f32>,");
            for (location, varying) in source.varyings.iter().enumerate() {
                let flat = if varying.flat { "@interpolate(flat) " } else { "" };
                let _ = writeln!(
                    out,
                    "{INDENT}@location({location}) {flat}{}: {},",
                    varying.name,
                    self.type_name(varying.ty)
                );
            }
            out.push_str("}\n\n");
        }

        // ── Entry point ──
        match source.stage {
            Stage::Vertex => {
                let mut params: Vec<String> = source
                    .attributes
                    .iter()
                    .enumerate()
                    .map(|(location, a)| {
                        format!("@location({location}) {}: {}", a.name, self.type_name(a.ty))
                    })
                    .collect();
                params.push("@builtin(vertex_index) vertexIndex: u32".to_string());
                params.push("@builtin(instance_index) instanceIndex: u32".to_string());
                let _ = writeln!(
                    out,
                    "@vertex\nfn main({}) -> {VARYINGS_STRUCT} {{",
                    params.join(", ")
                );
                let _ = writeln!(out, "{INDENT}var varyings: {VARYINGS_STRUCT};");
            }
            Stage::Fragment => {
                let _ = writeln!(
                    out,
                    "@fragment\nfn main(varyings: {VARYINGS_STRUCT}, @builtin(front_facing) frontFacing: bool) -> @location(0) vec4<f32> {{"
                );
            }
            Stage::Compute => {
                let _ = writeln!(
                    out,
                    "@compute @workgroup_size({})\nfn main(@builtin(global_invocation_id) globalId: vec3<u32>) {{",
                    source.workgroup_size
                );
            }
        }

        for var in source.vars {
            let _ = writeln!(out, "{INDENT}{};", self.var_declaration(var));
        }
        out.push_str(source.flow);

        match (source.stage, source.output) {
            (Stage::Vertex, Some(output)) => {
                let _ = writeln!(out, "{INDENT}varyings.Vertex = {output};");
                let _ = writeln!(out, "{INDENT}return varyings;");
            }
            (Stage::Vertex, None) => {
                let _ = writeln!(out, "{INDENT}return varyings;");
            }
            (Stage::Fragment, Some(output)) => {
                let _ = writeln!(out, "{INDENT}return {output};");
            }
            (Stage::Fragment, None) => {
                let _ = writeln!(out, "{INDENT}return vec4<f32>(0.0, 0.0, 0.0, 1.0);");
            }
            (Stage::Compute, _) => {}
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(Wgsl.type_name(NodeType::VEC3), "vec3<f32>");
        assert_eq!(Wgsl.type_name(NodeType::UVEC2), "vec2<u32>");
        assert_eq!(Wgsl.type_name(NodeType::MAT4), "mat4x4<f32>");
    }

    #[test]
    fn vector_comparisons_become_operators() {
        let args = ["a".to_string(), "b".to_string()];
        assert_eq!(Wgsl.method("lessThan", &args), "(a < b)");
        assert_eq!(Wgsl.method("mod", &args), "(a - b * floor(a / b))");
        assert_eq!(Wgsl.method("inversesqrt", &args[..1]), "inverseSqrt(a)");
        assert_eq!(Wgsl.operator(Op::Xor), "!=");
    }

    #[test]
    fn sampling_outside_fragment_uses_explicit_level() {
        assert_eq!(
            Wgsl.texture_sample(Stage::Vertex, "map", "uv", None),
            "textureSampleLevel(map, map_sampler, uv, 0.0)"
        );
        assert_eq!(
            Wgsl.texture_sample(Stage::Fragment, "map", "uv", None),
            "textureSample(map, map_sampler, uv)"
        );
    }
}

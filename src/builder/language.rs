//! Target shading languages and compile configuration.

use serde::{Deserialize, Serialize, Serializer};

use crate::builder::glsl::Glsl;
use crate::builder::wgsl::Wgsl;
use crate::builder::Stage;
use crate::error::Result;
use crate::graph::NodeId;
use crate::nodes::{ConstValue, IndexScope, Op};
use crate::types::{Component, NodeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// GLSL ES 3.00 (3.10 for compute shaders).
    #[default]
    Glsl,
    Wgsl,
}

impl Language {
    pub fn backend(self) -> Box<dyn ShaderLanguage> {
        match self {
            Language::Glsl => Box::new(Glsl),
            Language::Wgsl => Box::new(Wgsl),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    pub language: Language,
    /// Invocations per workgroup along x for compute shaders.
    pub workgroup_size: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            language: Language::Glsl,
            workgroup_size: 64,
        }
    }
}

/// A named, typed shader interface variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declaration {
    pub name: String,
    #[serde(rename = "type", serialize_with = "type_name")]
    pub ty: NodeType,
    /// Integer varyings are not interpolated.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub flat: bool,
}

impl Declaration {
    pub fn new(name: impl Into<String>, ty: NodeType) -> Self {
        Self {
            name: name.into(),
            ty,
            flat: ty.component().is_some_and(Component::is_integer),
        }
    }
}

fn type_name<S: Serializer>(ty: &NodeType, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(ty)
}

/// Everything a backend needs to print one shader stage.
#[derive(Debug)]
pub struct StageSource<'a> {
    pub stage: Stage,
    pub attributes: &'a [Declaration],
    pub varyings: &'a [Declaration],
    pub uniforms: &'a [Declaration],
    /// Function-scope variables: temporaries and properties.
    pub vars: &'a [Declaration],
    pub flow: &'a str,
    /// Final position (vertex) or color (fragment) expression.
    pub output: Option<&'a str>,
    pub workgroup_size: u32,
}

/// Code-emission capability of one target language.
pub trait ShaderLanguage {
    fn name(&self) -> &'static str;

    fn type_name(&self, ty: NodeType) -> String;

    fn literal(&self, ty: NodeType, value: &ConstValue) -> String;

    /// Library call; backends rename or expand methods they spell differently.
    fn method(&self, name: &str, args: &[String]) -> String;

    fn operator(&self, op: Op) -> &'static str;

    fn select(&self, cond: &str, if_value: &str, else_value: &str) -> String;

    /// Whether `min`/`max` accept a scalar second operand for vector inputs.
    fn scalar_min_max(&self) -> bool;

    fn texture_sample(&self, stage: Stage, texture: &str, uv: &str, level: Option<&str>) -> String;

    fn texture_size(&self, texture: &str, level: &str) -> String;

    fn index(&self, stage: Stage, scope: IndexScope) -> Result<String>;

    fn front_facing(&self) -> String;

    fn varying_property(&self, name: &str) -> String;

    /// Statement evaluating an expression whose value is unused.
    fn discard_value(&self, snippet: &str) -> String;

    fn var_declaration(&self, var: &Declaration) -> String;

    fn stage_source(&self, source: &StageSource<'_>) -> String;
}

/// Result of compiling a graph.
#[derive(Debug, Clone, Serialize)]
pub struct ShaderOutput {
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute: Option<String>,
    pub attributes: Vec<Declaration>,
    pub varyings: Vec<Declaration>,
    pub uniforms: Vec<Declaration>,
    /// Nodes whose uniform values the host refreshes with `NodeGraph::update`.
    pub update_nodes: Vec<NodeId>,
}

/// Float literal that always carries a decimal point.
pub(crate) fn float_literal(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

/// Scalar literal in the syntax shared by GLSL and WGSL; `int_suffix` is
/// appended to signed integers.
pub(crate) fn scalar_literal(component: Component, v: f64, int_suffix: &str) -> String {
    match component {
        Component::Bool => (v != 0.0).to_string(),
        Component::Int => format!("{}{int_suffix}", v.trunc() as i64),
        Component::Uint => format!("{}u", v.max(0.0).trunc() as u64),
        Component::Float => float_literal(v),
    }
}

/// Literal of any value type, spelled as a constructor call for vectors and
/// matrices. Vectors with equal components use the single-argument splat form.
pub(crate) fn value_literal(ty: NodeType, value: &ConstValue, type_name: &str, int_suffix: &str) -> String {
    let component = ty.component().unwrap_or(Component::Float);
    let values = match ConstValue::from_type(ty, &value.components()) {
        ConstValue::Vector(v) | ConstValue::Matrix(v) => v,
        other => other.components(),
    };

    if ty.is_scalar() || ty.is_reference() {
        let v = values.first().copied().unwrap_or(0.0);
        return scalar_literal(component, v, int_suffix);
    }

    let splat = ty.is_vector() && values.windows(2).all(|w| w[0] == w[1]);
    let items: Vec<String> = if splat {
        vec![scalar_literal(component, values.first().copied().unwrap_or(0.0), int_suffix)]
    } else {
        values
            .iter()
            .map(|&v| scalar_literal(component, v, int_suffix))
            .collect()
    };
    format!("{type_name}({})", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_literals_keep_a_decimal_point() {
        assert_eq!(float_literal(1.0), "1.0");
        assert_eq!(float_literal(-2.0), "-2.0");
        assert_eq!(float_literal(0.25), "0.25");
    }

    #[test]
    fn vector_literals_splat_equal_components() {
        let value = ConstValue::Vector(vec![1.0, 1.0, 1.0]);
        assert_eq!(value_literal(NodeType::VEC3, &value, "vec3", ""), "vec3(1.0)");
        let value = ConstValue::Vector(vec![2.0, 0.0, 0.0]);
        assert_eq!(value_literal(NodeType::VEC3, &value, "vec3", ""), "vec3(2.0, 0.0, 0.0)");
        assert_eq!(
            value_literal(NodeType::INT, &ConstValue::Int(-2), "i32", "i"),
            "-2i"
        );
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: CompileOptions = serde_json::from_str(r#"{ "language": "wgsl" }"#).unwrap();
        assert_eq!(options.language, Language::Wgsl);
        assert_eq!(options.workgroup_size, 64);
    }

    #[test]
    fn integer_declarations_are_flat() {
        assert!(Declaration::new("index", NodeType::UINT).flat);
        assert!(!Declaration::new("uv", NodeType::VEC2).flat);
    }
}

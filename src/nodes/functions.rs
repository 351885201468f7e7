//! Shading functions built from node operands.

use std::f64::consts::FRAC_1_PI;

use crate::error::Result;
use crate::shader::tsl::{Inputs, TslFn};
use crate::shader::Node;

/// Lambertian diffuse term for a punctual light.
pub static BRDF_LAMBERT: TslFn = TslFn::new("BRDF_Lambert", brdf_lambert);

/// Analytical approximation of the split-sum DFG term (Karis, mobile PBR).
/// Yields the scale and bias applied to F0 as a `vec2`.
pub static DFG_APPROX: TslFn = TslFn::new("DFGApprox", dfg_approx);

/// Pre-integrated specular environment response.
pub static ENVIRONMENT_BRDF: TslFn = TslFn::new("EnvironmentBRDF", environment_brdf);

fn brdf_lambert<'g>(inputs: &Inputs<'g>) -> Result<Node<'g>> {
    Ok(inputs.get("diffuseColor")?.mul(FRAC_1_PI))
}

fn dfg_approx<'g>(inputs: &Inputs<'g>) -> Result<Node<'g>> {
    let graph = inputs.graph();
    let roughness = inputs.get("roughness")?;
    let dot_nv = inputs.get("dotNV")?;

    let c0 = graph.vec4((-1.0, -0.0275, -0.572, 0.022));
    let c1 = graph.vec4((1.0, 0.0425, 1.04, -0.04));

    let r = roughness.mul(c0).add(c1);
    let a004 = r
        .x()
        .mul(r.x())
        .min(dot_nv.mul(-9.28).exp2())
        .mul(r.x())
        .add(r.y());

    Ok(graph.vec2((-1.04, 1.04)).mul(a004).add(r.zw()))
}

fn environment_brdf<'g>(inputs: &Inputs<'g>) -> Result<Node<'g>> {
    let graph = inputs.graph();
    let specular_color = inputs.get("specularColor")?;
    let specular_f90 = inputs.get("specularF90")?;

    let dfg_inputs = Inputs::new(graph)
        .with("dotNV", inputs.get("dotNV")?)
        .with("roughness", inputs.get("roughness")?);
    let fab = DFG_APPROX.call(graph, dfg_inputs)?;

    Ok(specular_color.mul(fab.x()).add(specular_f90.mul(fab.y())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeGraph;
    use crate::nodes::NodeKind;

    #[test]
    fn missing_input_names_the_function() {
        let graph = NodeGraph::new();
        let inputs = Inputs::new(&graph).with("roughness", 0.5);
        let err = DFG_APPROX.call(&graph, inputs).unwrap_err();
        assert_eq!(err.to_string(), "DFGApprox: missing input 'dotNV'");
    }

    #[test]
    fn environment_brdf_builds_an_expression() {
        let graph = NodeGraph::new();
        let inputs = Inputs::new(&graph)
            .with("dotNV", 0.5)
            .with("roughness", 0.25)
            .with("specularColor", graph.vec3(0.04))
            .with("specularF90", 1.0);
        let out = ENVIRONMENT_BRDF.call(&graph, inputs).expect("call EnvironmentBRDF");
        assert!(matches!(graph.entry(out.id()).kind, NodeKind::Operator(_)));
    }
}

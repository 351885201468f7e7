//! Parse every generated WGSL stage through naga to catch codegen bugs that
//! string-matching tests miss.

use std::fs;
use std::path::Path;

use shader_graph::{CompileOptions, Language};

/// Parse WGSL through naga and return any errors.
fn validate_wgsl(wgsl: &str, name: &str) -> Result<(), String> {
    match naga::front::wgsl::parse_str(wgsl) {
        Ok(_module) => Ok(()),
        Err(e) => Err(format!("{name}: naga WGSL parse error:\n{e}")),
    }
}

/// Compile a graph script to WGSL and validate each stage it produced.
fn compile_and_validate(source: &str, name: &str) {
    let options = CompileOptions {
        language: Language::Wgsl,
        ..CompileOptions::default()
    };
    let output = shader_graph::compile(source, &options)
        .unwrap_or_else(|e| panic!("{name}: compilation failed: {e}"));

    let stages = [
        ("vertex", &output.vertex),
        ("fragment", &output.fragment),
        ("compute", &output.compute),
    ];
    let mut validated = 0;
    for (stage, code) in stages {
        let Some(code) = code else { continue };
        let label = format!("{name}/{stage}");
        if let Err(e) = validate_wgsl(code, &label) {
            // Print the WGSL with line numbers for debugging
            eprintln!("\n--- Generated WGSL for {label} ---");
            for (i, line) in code.lines().enumerate() {
                eprintln!("{:4} | {}", i + 1, line);
            }
            eprintln!("--- End WGSL ---\n");
            panic!("{e}");
        }
        validated += 1;
    }
    assert!(validated > 0, "{name}: no stages were generated");
}

#[test]
fn validate_constant_color() {
    compile_and_validate("output fragment = vec4(1.0, 0.5, 0.25, 1.0);", "constant_color");
}

#[test]
fn validate_uniforms_and_time() {
    compile_and_validate(
        r#"
        let tint = uniform("vec3", "tint");
        let strength = uniform("float");
        output fragment = vec4(tint * sin(time) * strength, 1.0);
        "#,
        "uniforms_and_time",
    );
}

#[test]
fn validate_shared_subexpressions() {
    // `wave` is read three times and must land in a single temp var
    compile_and_validate(
        r#"
        let wave = uv().x * 6.0 + timerLocal(2.0);
        output fragment = vec4(sin(wave), cos(wave), wave.fract(), 1.0);
        "#,
        "shared_subexpressions",
    );
}

#[test]
fn validate_custom_vertex_output() {
    compile_and_validate(
        r#"
        let lifted = positionLocal + vec3(0.0, oscTriangle(time), 0.0);
        output vertex = cameraProjectionMatrix * modelViewMatrix * vec4(lifted, 1.0);
        output fragment = vec4(positionWorldDirection * 0.5 + 0.5, 1.0);
        "#,
        "custom_vertex_output",
    );
}

#[test]
fn validate_comparisons_and_selects() {
    compile_and_validate(
        r#"
        let x = uv().x;
        let band = x.step(0.5) * x.greaterThan(0.25).cond(1.0, 0.5);
        output fragment = vec4(vec3(band), 1.0);
        "#,
        "comparisons_and_selects",
    );
}

#[test]
fn validate_face_direction() {
    compile_and_validate(
        r#"
        let shade = faceDirection * 0.5 + 0.5;
        output fragment = vec4(vec3(shade), 1.0);
        "#,
        "face_direction",
    );
}

#[test]
fn validate_texture_sampling() {
    compile_and_validate(
        r#"
        let base = texture("map", uv());
        let luma = base.rgb.dot(vec3(0.2126, 0.7152, 0.0722));
        output fragment = vec4(vec3(luma), base.a);
        "#,
        "texture_sampling",
    );
}

#[test]
fn validate_compute_accumulator() {
    compile_and_validate(
        r#"
        let acc = property("vec3", "acc");
        acc.assign(vec3(float(instanceIndex)));
        output compute = acc.addAssign(vec3(1.0, 2.0, 3.0));
        "#,
        "compute_accumulator",
    );
}

#[test]
fn validate_all_demos() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");
    let mut count = 0;
    for entry in fs::read_dir(&dir).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().map(|e| e == "sg").unwrap_or(false) {
            let source = fs::read_to_string(&path).unwrap();
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            compile_and_validate(&source, &format!("demos/{name}"));
            count += 1;
        }
    }
    assert!(count > 0, "no demo scripts found in {}", dir.display());
}

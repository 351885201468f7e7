use std::fs;
use std::path::{Path, PathBuf};

use shader_graph::{compile, CompileOptions, Language};

fn scripts_in(dir: &Path) -> Vec<PathBuf> {
    assert!(dir.is_dir(), "{} is not a directory", dir.display());

    let mut paths: Vec<_> = fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", dir.display()))
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "sg").unwrap_or(false))
        .collect();
    paths.sort();

    assert!(!paths.is_empty(), "no .sg files found in {}", dir.display());
    paths
}

fn compile_all_in_dir(dir: &Path, language: Language) {
    let options = CompileOptions {
        language,
        ..CompileOptions::default()
    };

    for path in scripts_in(dir) {
        let source = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));

        let output = compile(&source, &options)
            .unwrap_or_else(|e| panic!("{} failed to compile: {e}", path.display()));

        match &output.compute {
            Some(compute) => {
                assert!(output.vertex.is_none() && output.fragment.is_none());
                assert!(!compute.is_empty(), "{} produced an empty compute stage", path.display());
            }
            None => {
                let vertex = output.vertex.as_deref().unwrap_or_default();
                let fragment = output.fragment.as_deref().unwrap_or_default();
                assert!(!vertex.is_empty(), "{} produced no vertex stage", path.display());
                assert!(!fragment.is_empty(), "{} produced no fragment stage", path.display());
            }
        }
    }
}

fn demos_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos")
}

#[test]
fn all_demos_compile_to_glsl() {
    compile_all_in_dir(&demos_dir(), Language::Glsl);
}

#[test]
fn all_demos_compile_to_wgsl() {
    compile_all_in_dir(&demos_dir(), Language::Wgsl);
}

#[test]
fn compute_demo_has_only_a_compute_stage() {
    let source = fs::read_to_string(demos_dir().join("particles.sg")).unwrap();
    let output = compile(&source, &CompileOptions::default()).unwrap();

    let compute = output.compute.unwrap();
    assert!(compute.starts_with("#version 310 es"));
    assert!(compute.contains("age = "));
    assert!(compute.contains("gl_GlobalInvocationID.x"));
    assert!(output.varyings.is_empty());
}

#[test]
fn compiling_twice_is_deterministic() {
    let source = fs::read_to_string(demos_dir().join("lit.sg")).unwrap();
    let options = CompileOptions {
        language: Language::Wgsl,
        ..CompileOptions::default()
    };

    let first = compile(&source, &options).unwrap();
    let second = compile(&source, &options).unwrap();
    assert_eq!(first.vertex, second.vertex);
    assert_eq!(first.fragment, second.fragment);
}

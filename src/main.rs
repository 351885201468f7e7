use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use log::debug;

use shader_graph::{eval, CompileOptions, Language, NodeError, NodeGraph, ShaderOutput};

#[derive(Parser)]
#[command(name = "shgraph", version)]
#[command(about = "Compile node-based shader graphs to GLSL or WGSL")]
struct Cli {
    /// Log build passes to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a graph script to shader source
    Compile {
        /// Input script
        file: PathBuf,

        /// Target language (overrides the config file)
        #[arg(long, value_enum)]
        lang: Option<Language>,

        /// What to print
        #[arg(long, value_enum, default_value_t = Emit::Code)]
        emit: Emit,

        /// Write output to file instead of stdout
        #[arg(short)]
        o: Option<PathBuf>,

        /// JSON file with compile options
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a graph script without producing output
    Check {
        /// Input script
        file: PathBuf,
    },

    /// Print the serialized record of every node the script creates
    Graph {
        /// Input script
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Emit {
    /// Shader source of every compiled stage
    Code,
    /// The full compile output as JSON
    Json,
}

/// Failures reported to the user: IO problems, or a script error that is
/// printed with its source line.
enum Failure {
    Io(anyhow::Error),
    Script(NodeError, String),
}

impl From<anyhow::Error> for Failure {
    fn from(e: anyhow::Error) -> Self {
        Failure::Io(e)
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Compile {
            file,
            lang,
            emit,
            o,
            config,
        } => compile(&file, lang, emit, o.as_deref(), config.as_deref()),
        Commands::Check { file } => check(&file),
        Commands::Graph { file } => graph(&file),
    };

    match result {
        Ok(()) => {}
        Err(Failure::Io(e)) => {
            eprintln!("error: {e:#}");
            process::exit(1);
        }
        Err(Failure::Script(e, source)) => {
            print_error(&e, &source);
            process::exit(1);
        }
    }
}

fn read_source(file: &Path) -> anyhow::Result<String> {
    fs::read_to_string(file).with_context(|| format!("cannot read '{}'", file.display()))
}

fn load_options(config: Option<&Path>, lang: Option<Language>) -> anyhow::Result<CompileOptions> {
    let mut options = match config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("cannot read '{}'", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("invalid options in '{}'", path.display()))?
        }
        None => CompileOptions::default(),
    };
    if let Some(lang) = lang {
        options.language = lang;
    }
    debug!("compile options: {options:?}");
    Ok(options)
}

fn compile(
    file: &Path,
    lang: Option<Language>,
    emit: Emit,
    out: Option<&Path>,
    config: Option<&Path>,
) -> Result<(), Failure> {
    let source = read_source(file)?;
    let options = load_options(config, lang)?;

    let output = shader_graph::compile(&source, &options).map_err(|e| Failure::Script(e, source.clone()))?;
    let text = match emit {
        Emit::Code => render_code(&output),
        Emit::Json => serde_json::to_string_pretty(&output).context("cannot serialize the compile output")?,
    };

    match out {
        Some(path) => {
            fs::write(path, &text).with_context(|| format!("cannot write '{}'", path.display()))?;
            eprintln!("wrote {} ({} bytes)", path.display(), text.len());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn check(file: &Path) -> Result<(), Failure> {
    let source = read_source(file)?;
    shader_graph::compile(&source, &CompileOptions::default()).map_err(|e| Failure::Script(e, source.clone()))?;
    eprintln!("ok: {}", file.display());
    Ok(())
}

fn graph(file: &Path) -> Result<(), Failure> {
    let source = read_source(file)?;
    let graph = NodeGraph::new();
    let outputs = eval::evaluate(&graph, &source).map_err(|e| Failure::Script(e, source.clone()))?;

    let nodes: Vec<_> = graph.ids().map(|id| graph.serialize_node(id)).collect();
    let roots = serde_json::json!({
        "vertex": outputs.vertex.map(|id| graph.uuid(id).to_string()),
        "fragment": outputs.fragment.map(|id| graph.uuid(id).to_string()),
        "compute": outputs.compute.map(|id| graph.uuid(id).to_string()),
    });
    let document = serde_json::json!({ "outputs": roots, "nodes": nodes });
    let text = serde_json::to_string_pretty(&document).context("cannot serialize the graph")?;
    println!("{text}");
    Ok(())
}

fn render_code(output: &ShaderOutput) -> String {
    let mut text = String::new();
    let stages = [
        ("vertex", &output.vertex),
        ("fragment", &output.fragment),
        ("compute", &output.compute),
    ];
    for (name, code) in stages {
        if let Some(code) = code {
            text.push_str(&format!("// ── {name} ──\n{code}\n"));
        }
    }
    text
}

fn print_error(e: &NodeError, source: &str) {
    eprintln!("error: {e}");

    if let Some(span) = &e.span {
        if span.start <= source.len() {
            let line_num = source[..span.start].chars().filter(|c| *c == '\n').count() + 1;
            let line_start = source[..span.start].rfind('\n').map(|i| i + 1).unwrap_or(0);
            let line_end = source[span.start..]
                .find('\n')
                .map(|i| span.start + i)
                .unwrap_or(source.len());
            let line = &source[line_start..line_end];
            let col = span.start - line_start;
            let width = span.end.min(line_end).saturating_sub(span.start).max(1);

            eprintln!();
            eprintln!("  {line_num} | {line}");
            eprintln!(
                "  {} | {}{}",
                " ".repeat(line_num.to_string().len()),
                " ".repeat(col),
                "^".repeat(width)
            );
        }
    }
}

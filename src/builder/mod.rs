//! Graph-to-code compiler.
//!
//! A [`NodeBuilder`] compiles the outputs of one [`NodeGraph`] into shader
//! source. Every output goes through three build stages:
//!
//! 1. **construct**: composite nodes rewrite themselves into sub-graphs.
//!    The result is shared by all shader stages.
//! 2. **analyze**: usages are counted per shader stage.
//! 3. **generate**: code is emitted. Temp-capable nodes used more than once
//!    are stored in a `nodeVarN` variable and referenced by name after that.
//!
//! Nodes with a semantic hash co-identify: the first node seen with a hash
//! stands in for every later node with the same hash.

pub mod context;
pub mod glsl;
pub mod language;
pub mod wgsl;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fmt;

use log::{debug, trace, warn};

use self::context::ContextMap;
use self::language::{Declaration, ShaderLanguage, StageSource};
use crate::error::{ErrorKind, NodeError, Result};
use crate::graph::{NodeGraph, NodeId};
use crate::nodes::{ConstValue, IndexScope, NodeKind, Op};
use crate::types::{Component, NodeType};

pub use self::language::{CompileOptions, Language, ShaderOutput};

const INDENT: &str = "    ";

// ── Stages ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    Fragment,
    Compute,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Vertex => "vertex",
            Stage::Fragment => "fragment",
            Stage::Compute => "compute",
        }
    }

    fn index(self) -> usize {
        match self {
            Stage::Vertex => 0,
            Stage::Fragment => 1,
            Stage::Compute => 2,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Construct,
    Analyze,
    Generate,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildStage::Construct => "construct",
            BuildStage::Analyze => "analyze",
            BuildStage::Generate => "generate",
        })
    }
}

// ── Per-build state ────────────────────────────────────────────────────

/// Per shader stage bookkeeping of one node.
#[derive(Debug, Default)]
struct NodeData {
    usage: u32,
    /// Cached snippet of generate-once nodes.
    snippet: Option<String>,
    /// Temp variable holding the node's value.
    temp: Option<String>,
}

#[derive(Debug, Default)]
struct StageState {
    data: HashMap<NodeId, NodeData>,
    vars: Vec<Declaration>,
    var_names: HashMap<NodeId, String>,
    flow: String,
    output: Option<String>,
}

#[derive(Debug, Default)]
struct Outputs {
    vertex: Option<NodeId>,
    fragment: Option<NodeId>,
    compute: Option<NodeId>,
}

pub struct NodeBuilder<'g> {
    graph: &'g NodeGraph,
    options: CompileOptions,
    backend: Box<dyn ShaderLanguage>,
    stage: Stage,
    build_stage: BuildStage,
    context: ContextMap,
    labels: HashMap<NodeId, String>,
    /// Construct results, shared by all shader stages. Presence marks a
    /// constructed node.
    constructed: HashMap<NodeId, Option<NodeId>>,
    hashes: HashMap<String, NodeId>,
    derived: HashMap<(NodeId, &'static str), NodeId>,
    stages: [StageState; 3],
    attributes: Vec<Declaration>,
    varyings: Vec<Declaration>,
    varying_ids: HashMap<NodeId, usize>,
    flowed: Vec<bool>,
    uniforms: Vec<Declaration>,
    uniform_ids: HashMap<NodeId, usize>,
    update_nodes: Vec<NodeId>,
    chain: Vec<NodeId>,
    outputs: Outputs,
}

impl<'g> NodeBuilder<'g> {
    pub fn new(graph: &'g NodeGraph, options: CompileOptions) -> Self {
        Self {
            graph,
            backend: options.language.backend(),
            options,
            stage: Stage::Fragment,
            build_stage: BuildStage::Construct,
            context: ContextMap::new(),
            labels: HashMap::new(),
            constructed: HashMap::new(),
            hashes: HashMap::new(),
            derived: HashMap::new(),
            stages: Default::default(),
            attributes: Vec::new(),
            varyings: Vec::new(),
            varying_ids: HashMap::new(),
            flowed: Vec::new(),
            uniforms: Vec::new(),
            uniform_ids: HashMap::new(),
            update_nodes: Vec::new(),
            chain: Vec::new(),
            outputs: Outputs::default(),
        }
    }

    pub fn graph(&self) -> &'g NodeGraph {
        self.graph
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn build_stage(&self) -> BuildStage {
        self.build_stage
    }

    pub fn language(&self) -> &dyn ShaderLanguage {
        self.backend.as_ref()
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn context(&self) -> &ContextMap {
        &self.context
    }

    pub fn set_vertex_output(&mut self, node: NodeId) {
        self.outputs.vertex = Some(node);
    }

    pub fn set_fragment_output(&mut self, node: NodeId) {
        self.outputs.fragment = Some(node);
    }

    pub fn set_compute(&mut self, node: NodeId) {
        self.outputs.compute = Some(node);
    }

    // ── Compilation ────────────────────────────────────────────────────

    /// Compile every output set on this builder.
    pub fn compile(mut self) -> Result<ShaderOutput> {
        let targets = self.targets()?;

        for build_stage in [BuildStage::Construct, BuildStage::Analyze, BuildStage::Generate] {
            self.build_stage = build_stage;
            for &(stage, node, ty) in &targets {
                debug!("{build_stage} pass over the {stage} stage");
                self.stage = stage;
                let snippet = self.build(node, Some(ty))?;
                if build_stage == BuildStage::Generate {
                    match stage {
                        Stage::Compute => self.add_statement(node, &snippet),
                        _ => self.stages[stage.index()].output = Some(snippet),
                    }
                }
            }
        }

        let mut output = ShaderOutput {
            language: self.options.language,
            vertex: None,
            fragment: None,
            compute: None,
            attributes: self.attributes.clone(),
            varyings: self.varyings.clone(),
            uniforms: self.uniforms.clone(),
            update_nodes: self.update_nodes.clone(),
        };
        for &(stage, _, _) in &targets {
            let code = self.stage_source(stage);
            match stage {
                Stage::Vertex => output.vertex = Some(code),
                Stage::Fragment => output.fragment = Some(code),
                Stage::Compute => output.compute = Some(code),
            }
        }
        Ok(output)
    }

    /// Shader stages to compile with their output node and type, in
    /// generation order. Fragment comes first so its varyings exist before
    /// the vertex stage is printed.
    fn targets(&mut self) -> Result<Vec<(Stage, NodeId, NodeType)>> {
        let Outputs {
            vertex,
            fragment,
            compute,
        } = self.outputs;

        if let Some(compute) = compute {
            if vertex.is_some() || fragment.is_some() {
                return Err(NodeError::invalid_argument(
                    "a compute output cannot be combined with vertex or fragment outputs",
                ));
            }
            return Ok(vec![(Stage::Compute, compute, NodeType::Void)]);
        }

        let vertex = match (vertex, fragment) {
            (None, None) => return Err(NodeError::message("no output node to compile")),
            (Some(vertex), _) => vertex,
            (None, Some(_)) => {
                warn!("no vertex output set, using cameraProjectionMatrix * modelViewMatrix * positionLocal");
                self.default_vertex_output()
            }
        };

        let mut targets = Vec::with_capacity(2);
        if let Some(fragment) = fragment {
            targets.push((Stage::Fragment, fragment, NodeType::VEC4));
        }
        targets.push((Stage::Vertex, vertex, NodeType::VEC4));
        Ok(targets)
    }

    fn default_vertex_output(&self) -> NodeId {
        let graph = self.graph;
        let position = graph.vec4((graph.position_local(), 1.0));
        graph
            .camera_projection_matrix()
            .mul(graph.model_view_matrix())
            .mul(position)
            .id()
    }

    fn stage_source(&self, stage: Stage) -> String {
        let state = &self.stages[stage.index()];
        let source = StageSource {
            stage,
            attributes: &self.attributes,
            varyings: &self.varyings,
            uniforms: &self.uniforms,
            vars: &state.vars,
            flow: &state.flow,
            output: state.output.as_deref(),
            workgroup_size: self.options.workgroup_size,
        };
        self.backend.stage_source(&source)
    }

    /// Run all three build stages for a single node in `stage` and return
    /// its snippet. Statements it emits land in [`NodeBuilder::flow_code`].
    pub fn build_node(&mut self, stage: Stage, node: NodeId, output: Option<NodeType>) -> Result<String> {
        self.stage = stage;
        self.build_stage = BuildStage::Construct;
        self.build(node, output)?;
        self.build_stage = BuildStage::Analyze;
        self.build(node, output)?;
        self.build_stage = BuildStage::Generate;
        self.build(node, output)
    }

    pub fn flow_code(&self, stage: Stage) -> &str {
        &self.stages[stage.index()].flow
    }

    pub fn vars(&self, stage: Stage) -> &[Declaration] {
        &self.stages[stage.index()].vars
    }

    pub fn varyings(&self) -> &[Declaration] {
        &self.varyings
    }

    pub fn uniforms(&self) -> &[Declaration] {
        &self.uniforms
    }

    // ── Node protocol ──────────────────────────────────────────────────

    /// Build `node` in the current build stage. Only the generate stage
    /// returns code; the other stages return an empty string.
    pub fn build(&mut self, node: NodeId, output: Option<NodeType>) -> Result<String> {
        let id = self.resolve(node);
        match self.build_stage {
            BuildStage::Construct => self.construct_node(id).map(|_| String::new()),
            BuildStage::Analyze => self.analyze_node(id).map(|_| String::new()),
            BuildStage::Generate => self.generate_node(id, output),
        }
    }

    pub fn node_type(&self, node: NodeId) -> Result<NodeType> {
        self.node_type_for(node, None)
    }

    /// Type of `node` when read as `output`. Only vectorized comparisons
    /// depend on the output.
    pub fn node_type_for(&self, node: NodeId, output: Option<NodeType>) -> Result<NodeType> {
        let id = self.lookup(node);
        self.graph.entry(id).kind.node_type(self, id, output)
    }

    /// Sub-graph a node was rewritten into by its construct stage.
    pub fn constructed_output(&self, node: NodeId) -> Option<NodeId> {
        self.constructed.get(&self.lookup(node)).copied().flatten()
    }

    fn lookup(&self, node: NodeId) -> NodeId {
        match self.graph.entry(node).kind.hash() {
            Some(hash) => self.hashes.get(&hash).copied().unwrap_or(node),
            None => node,
        }
    }

    fn resolve(&mut self, node: NodeId) -> NodeId {
        match self.graph.entry(node).kind.hash() {
            Some(hash) => *self.hashes.entry(hash).or_insert(node),
            None => node,
        }
    }

    fn describe(&self, node: NodeId) -> String {
        format!("{} {node}", self.graph.entry(node).kind.type_name())
    }

    fn cycle_error(&self, node: NodeId) -> NodeError {
        ErrorKind::Cycle(self.describe(node)).into()
    }

    fn construct_node(&mut self, id: NodeId) -> Result<()> {
        if self.constructed.contains_key(&id) {
            return Ok(());
        }
        if self.chain.contains(&id) {
            return Err(self.cycle_error(id));
        }

        let entry = self.graph.entry(id);
        self.chain.push(id);
        let result = self.construct_entry(&entry.kind);
        self.chain.pop();

        self.constructed.insert(id, result?);
        Ok(())
    }

    fn construct_entry(&mut self, kind: &NodeKind) -> Result<Option<NodeId>> {
        let children = kind.children();
        self.in_scope(kind.scoped_context(), |builder| {
            for child in children {
                let child = builder.resolve(child);
                builder.construct_node(child)?;
            }
            Ok(())
        })?;

        let output = kind.construct(self)?;
        if let Some(output) = output {
            let output = self.resolve(output);
            self.construct_node(output)?;
        }
        Ok(output)
    }

    fn analyze_node(&mut self, id: NodeId) -> Result<()> {
        self.construct_node(id)?;

        let data = self.data_mut(id);
        data.usage += 1;
        if data.usage > 1 {
            return Ok(());
        }

        let entry = self.graph.entry(id);
        let targets = match self.constructed_output(id) {
            Some(output) => vec![output],
            None => entry.kind.children(),
        };
        self.in_scope(entry.kind.scoped_context(), |builder| {
            for target in targets {
                let target = builder.resolve(target);
                builder.analyze_node(target)?;
            }
            Ok(())
        })
    }

    fn generate_node(&mut self, id: NodeId, output: Option<NodeType>) -> Result<String> {
        if self.chain.contains(&id) {
            return Err(self.cycle_error(id));
        }
        self.construct_node(id)?;

        let entry = self.graph.entry(id);
        self.chain.push(id);
        let result = self.generate_entry(id, &entry.kind, output);
        self.chain.pop();

        if let Ok(snippet) = &result {
            trace!("{} {} -> {snippet}", self.stage, self.describe(id));
        }
        result
    }

    fn generate_entry(&mut self, id: NodeId, kind: &NodeKind, output: Option<NodeType>) -> Result<String> {
        if kind.generates_once() {
            let cached = self.data(id).and_then(|data| data.snippet.clone());
            let snippet = match cached {
                Some(snippet) => snippet,
                None => {
                    let snippet = kind.generate(self, id, None)?;
                    self.data_mut(id).snippet = Some(snippet.clone());
                    snippet
                }
            };
            let ty = self.node_type(id)?;
            return Ok(self.format(&snippet, ty, output));
        }

        if kind.is_temp() {
            let ty = self.node_type_for(id, output)?;

            if self.context.get_bool("tempRead") != Some(false) {
                if let Some(name) = self.data(id).and_then(|data| data.temp.clone()) {
                    return Ok(self.format(&name, ty, output));
                }
            }

            let shared = self.usage(id) > 1 || self.labels.contains_key(&id);
            let writable = self.context.get_bool("tempWrite") != Some(false)
                && ty != NodeType::Void
                && output != Some(NodeType::Void);
            if shared && writable {
                let snippet = kind.generate(self, id, Some(ty))?;
                let name = self.var_from_node(id, None, ty);
                self.add_line_flow_code(&format!("{name} = {snippet}"));
                self.data_mut(id).temp = Some(name.clone());
                return Ok(self.format(&name, ty, output));
            }
        }

        kind.generate(self, id, output)
    }

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.stages[self.stage.index()].data.get(&id)
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.stages[self.stage.index()].data.entry(id).or_default()
    }

    fn usage(&self, id: NodeId) -> u32 {
        self.data(id).map_or(0, |data| data.usage)
    }

    // ── Context ────────────────────────────────────────────────────────

    /// Run `body` with `overrides` merged over the current context. The
    /// previous context is restored afterwards, also on error.
    pub fn with_context<T>(
        &mut self,
        overrides: &ContextMap,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let merged = self.context.merged(overrides);
        let previous = std::mem::replace(&mut self.context, merged);
        let result = body(self);
        self.context = previous;
        result
    }

    fn in_scope<T>(
        &mut self,
        context: Option<&ContextMap>,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        match context {
            Some(context) => self.with_context(context, body),
            None => body(self),
        }
    }

    /// Name the variable or uniform created for `node`.
    pub(crate) fn set_label(&mut self, node: NodeId, label: &str) {
        let id = self.resolve(node);
        self.labels.insert(id, label.to_string());
    }

    /// Node derived from `node` once per builder, e.g. the varying carrying
    /// a vertex attribute into the fragment stage.
    pub(crate) fn derived_node(
        &mut self,
        node: NodeId,
        key: &'static str,
        make: impl FnOnce(&'g NodeGraph) -> NodeId,
    ) -> NodeId {
        if let Some(&derived) = self.derived.get(&(node, key)) {
            return derived;
        }
        let derived = make(self.graph);
        self.derived.insert((node, key), derived);
        derived
    }

    // ── Code emission ──────────────────────────────────────────────────

    pub fn type_name(&self, ty: NodeType) -> String {
        self.backend.type_name(ty)
    }

    pub fn const_snippet(&self, ty: NodeType, value: &ConstValue) -> String {
        self.backend.literal(ty, value)
    }

    /// Convert `snippet` of type `from` so it reads as `to`.
    pub fn format(&self, snippet: &str, from: NodeType, to: Option<NodeType>) -> String {
        let Some(to) = to else {
            return snippet.to_string();
        };
        if from == to || to.is_reference() || from.is_reference() || from.is_matrix() || to.is_matrix() {
            return snippet.to_string();
        }

        let from_length = from.length();
        let to_length = to.length();
        let from_component = from.component().unwrap_or(Component::Float);
        let to_component = to.component().unwrap_or(Component::Float);

        if from_length == 0 {
            return snippet.to_string();
        }

        if from_length == to_length {
            return format!("{}({snippet})", self.type_name(to));
        }

        if from_length > to_length {
            let narrowed = format!("{snippet}.{}", &"xyzw"[..to_length]);
            let narrowed_type = NodeType::from_length(to_length, from_component).unwrap_or(to);
            return self.format(&narrowed, narrowed_type, Some(to));
        }

        if to_length == 4 && from_length > 1 {
            let vec3 = NodeType::Vector(to_component, 3);
            let widened = self.format(snippet, from, Some(vec3));
            let one = self.const_snippet(NodeType::Scalar(to_component), &ConstValue::scalar(to_component, 1.0));
            return format!("{}({widened}, {one})", self.type_name(to));
        }

        if from_length == 2 {
            let zero = self.const_snippet(NodeType::Scalar(to_component), &ConstValue::scalar(to_component, 0.0));
            return format!("{}({snippet}, {zero})", self.type_name(to));
        }

        if from_length == 1 && to_length > 1 && from_component != to_component {
            let cast = self.format(snippet, from, Some(NodeType::Scalar(to_component)));
            return format!("{}({cast})", self.type_name(to));
        }

        format!("{}({snippet})", self.type_name(to))
    }

    /// Append a statement to the current stage's main body.
    pub fn add_line_flow_code(&mut self, line: &str) {
        let flow = &mut self.stages[self.stage.index()].flow;
        flow.push_str(INDENT);
        flow.push_str(line);
        flow.push_str(";\n");
    }

    /// Emit the snippet of `node` as a statement. Expressions whose value is
    /// dropped are wrapped so every backend accepts them.
    pub fn add_statement(&mut self, node: NodeId, snippet: &str) {
        if snippet.is_empty() {
            return;
        }
        let id = self.lookup(node);
        let is_statement = matches!(&self.graph.entry(id).kind, NodeKind::Operator(n) if n.op == Op::Assign)
            || self.node_type(id).map_or(true, |ty| ty == NodeType::Void);
        let line = if is_statement {
            snippet.to_string()
        } else {
            self.backend.discard_value(snippet)
        };
        self.add_line_flow_code(&line);
    }

    /// Function-scope variable of the current stage for `node`.
    pub fn var_from_node(&mut self, node: NodeId, name: Option<&str>, ty: NodeType) -> String {
        let stage = self.stage.index();
        if let Some(existing) = self.stages[stage].var_names.get(&node) {
            return existing.clone();
        }

        let vars = &self.stages[stage].vars;
        let base = name
            .map(str::to_string)
            .or_else(|| self.labels.get(&node).cloned())
            .unwrap_or_else(|| format!("nodeVar{}", vars.len()));
        let name = unique_name(vars.iter().map(|v| v.name.as_str()), base);

        let state = &mut self.stages[stage];
        state.vars.push(Declaration::new(name.clone(), ty));
        state.var_names.insert(node, name.clone());
        name
    }

    /// Register the varying produced by `node` and return its slot.
    pub fn varying_from_node(&mut self, node: NodeId, ty: NodeType, name: Option<&str>) -> usize {
        if let Some(&index) = self.varying_ids.get(&node) {
            return index;
        }

        let name = name
            .map(str::to_string)
            .or_else(|| self.labels.get(&node).cloned())
            .unwrap_or_else(|| format!("nodeVarying{}", self.varyings.len()));
        let index = match self.varyings.iter().position(|v| v.name == name) {
            Some(index) => index,
            None => {
                self.varyings.push(Declaration::new(name, ty));
                self.flowed.push(false);
                self.varyings.len() - 1
            }
        };
        self.varying_ids.insert(node, index);
        index
    }

    /// Assign the varying in the vertex stage from `node`. Runs once per slot;
    /// temporaries are disabled since the value is built outside the
    /// current stage's flow.
    pub fn flow_varying(&mut self, index: usize, node: NodeId, ty: NodeType) -> Result<()> {
        if self.flowed[index] {
            return Ok(());
        }
        self.flowed[index] = true;

        // The fragment-stage chain may hold `node` itself (an attribute or
        // index carried by this varying); the vertex build starts a new chain.
        let previous = self.stage;
        let chain = std::mem::take(&mut self.chain);
        self.stage = Stage::Vertex;
        let no_temps = ContextMap::new().with("tempRead", false).with("tempWrite", false);
        let result = self
            .with_context(&no_temps, |builder| builder.build(node, Some(ty)))
            .map(|snippet| {
                let property = self.varying_property(index);
                self.add_line_flow_code(&format!("{property} = {snippet}"));
            });
        self.stage = previous;
        self.chain = chain;
        result
    }

    pub fn varying_property(&self, index: usize) -> String {
        self.backend.varying_property(&self.varyings[index].name)
    }

    /// Vertex input `name`; only valid in the vertex stage.
    pub fn attribute(&mut self, name: &str, ty: NodeType) -> String {
        if !self.attributes.iter().any(|a| a.name == name) {
            self.attributes.push(Declaration::new(name, ty));
        }
        name.to_string()
    }

    /// Uniform backing `node`. Uniforms with the same name are shared.
    pub fn uniform_from_node(&mut self, node: NodeId, ty: NodeType, name: Option<&str>) -> String {
        if let Some(&index) = self.uniform_ids.get(&node) {
            return self.uniforms[index].name.clone();
        }

        let name = self
            .labels
            .get(&node)
            .cloned()
            .or_else(|| name.map(str::to_string))
            .unwrap_or_else(|| format!("nodeUniform{}", self.uniforms.len()));
        let index = match self.uniforms.iter().position(|u| u.name == name) {
            Some(index) => index,
            None => {
                self.uniforms.push(Declaration::new(name.clone(), ty));
                if self.graph.entry(node).kind.needs_update() {
                    self.update_nodes.push(node);
                }
                self.uniforms.len() - 1
            }
        };
        self.uniform_ids.insert(node, index);
        name
    }

    pub fn texture_from_node(&mut self, node: NodeId, name: &str) -> String {
        self.uniform_from_node(node, NodeType::Texture, Some(name))
    }

    pub fn index_snippet(&self, scope: IndexScope) -> Result<String> {
        self.backend.index(self.stage, scope)
    }

    pub fn front_facing(&self) -> String {
        self.backend.front_facing()
    }
}

/// `base`, or `base` with the first free numeric suffix.
fn unique_name<'a>(existing: impl Iterator<Item = &'a str> + Clone, base: String) -> String {
    if !existing.clone().any(|name| name == base) {
        return base;
    }
    (1..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !existing.clone().any(|name| name == candidate))
        .unwrap_or(base)
}

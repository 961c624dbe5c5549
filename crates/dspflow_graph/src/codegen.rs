// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rust source generation.
//!
//! A graph compiles to one function whose parameters are its input terminals
//! and whose results are its output terminals, all `f32`. Graphs holding any
//! stateful node compile to a struct instead, with one field per stateful node
//! and `init`/`process` methods.
//!
//! Nodes are emitted in arrangement order, which is a topological order.
//! Delay reads that run before their write node in that order see the value
//! from the previous invocation (`feedback_read`); reads after it see the
//! value just written (`read`).

use crate::arrange::{arrange, ArrangeConfig, Arrangement};
use crate::factory::{CONFIG, STDLIB};
use crate::graph::Graph;
use crate::node::{DelayLink, Node, NodeId};
use crate::port::{InPort, OutPort};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::fmt::Write;

/// First line of every generated file
pub const GENERATED_HEADER: &str = "// Code generated by dspflow. DO NOT EDIT.";

const INDENT: &str = "    ";
const ZERO: &str = "0.0";
const DISCARD: &str = "_";

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while",
];

/// Error during source generation
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// Writing to the output buffer failed
    #[error("format error: {0}")]
    Format(#[from] std::fmt::Error),

    /// A node consumes an output that was never bound
    #[error("{} output {} is used before it is computed", .0.node, .0.index)]
    Unbound(OutPort),

    /// The arrangement references a node missing from the graph
    #[error("node {0} is not in the graph")]
    MissingNode(NodeId),
}

/// Layer, arrange and generate in one step
pub fn generate_source(graph: &Graph, config: &ArrangeConfig) -> Result<String, CodegenError> {
    let arrangement = arrange(graph, config);
    generate(graph, &arrangement)
}

/// Generate source for a graph from its arrangement
pub fn generate(graph: &Graph, arrangement: &Arrangement) -> Result<String, CodegenError> {
    let mut generator = Generator::new(graph, arrangement)?;
    let source = generator.emit()?;
    tracing::debug!(
        graph = %graph.name,
        stateful = !generator.fields.is_empty(),
        variables = generator.next_var,
        bytes = source.len(),
        "generated source"
    );
    Ok(source)
}

struct Generator<'a> {
    graph: &'a Graph,
    /// Body nodes in emission order
    order: Vec<NodeId>,
    /// Module alias of each origin package
    aliases: IndexMap<String, String>,
    /// Field name of each stateful node, delay reads share their write's
    fields: IndexMap<NodeId, String>,
    bindings: HashMap<OutPort, String>,
    written: HashSet<NodeId>,
    next_var: usize,
}

impl<'a> Generator<'a> {
    fn new(graph: &'a Graph, arrangement: &Arrangement) -> Result<Self, CodegenError> {
        let mut generator = Self {
            graph,
            order: Vec::new(),
            aliases: IndexMap::new(),
            fields: IndexMap::new(),
            bindings: HashMap::new(),
            written: HashSet::new(),
            next_var: 0,
        };

        let mut params = HashSet::new();
        for id in graph.in_ports() {
            let node = graph.node(*id).ok_or(CodegenError::MissingNode(*id))?;
            let base = ident(node.terminal_name().unwrap_or_default(), "input");
            let param = unique_param(&base, &params);
            params.insert(param.clone());
            generator.bindings.insert(OutPort::new(*id, 0), param);
        }

        let mut nodes = Vec::new();
        for id in arrangement.nodes() {
            let node = graph.node(id).ok_or(CodegenError::MissingNode(id))?;
            nodes.push((id, node));
        }

        if nodes.iter().any(|(_, n)| n.stateful) {
            generator.alias(STDLIB);
        }
        for (id, node) in &nodes {
            if let Some(value) = node.constant_value() {
                generator.bindings.insert(OutPort::new(*id, 0), float_literal(value));
                continue;
            }
            if node.is_terminal() {
                continue;
            }
            if !node.origin.is_builtin() {
                generator.alias(&node.origin.pkg);
            }
            if node.stateful && !matches!(node.delay, Some(DelayLink::Read(_))) {
                let field = format!("{}_{}", ident(node.name(), "node"), generator.fields.len());
                generator.fields.insert(*id, field);
            }
            generator.order.push(*id);
        }
        Ok(generator)
    }

    /// Register a package, giving it the first free alias based on its last
    /// path segment
    fn alias(&mut self, pkg: &str) -> String {
        if let Some(alias) = self.aliases.get(pkg) {
            return alias.clone();
        }
        let base = ident(pkg.rsplit(['/', ':']).next().unwrap_or(pkg), "pkg");
        let taken = |name: &str| self.aliases.values().any(|a| a == name);
        let mut alias = base.clone();
        let mut n = 2;
        while taken(&alias) {
            alias = format!("{base}{n}");
            n += 1;
        }
        self.aliases.insert(pkg.to_string(), alias.clone());
        alias
    }

    fn stdlib(&self) -> &str {
        self.aliases.get(STDLIB).map_or(STDLIB, String::as_str)
    }

    fn emit(&mut self) -> Result<String, CodegenError> {
        let mut body = String::new();
        for id in self.order.clone() {
            self.emit_node(&mut body, id)?;
        }
        let results = self.results()?;

        let mut out = String::new();
        writeln!(out, "{GENERATED_HEADER}")?;
        writeln!(out)?;
        if !self.aliases.is_empty() {
            for (pkg, alias) in &self.aliases {
                let path = pkg.replace('/', "::");
                if path == *alias {
                    writeln!(out, "use {path};")?;
                } else {
                    writeln!(out, "use {path} as {alias};")?;
                }
            }
            writeln!(out)?;
        }

        let params = self.params();
        let ret = match self.graph.out_ports().len() {
            0 => String::new(),
            1 => " -> f32".to_string(),
            n => format!(" -> ({})", vec!["f32"; n].join(", ")),
        };

        if self.fields.is_empty() {
            let name = ident(&snake_case(&self.graph.name), "process");
            writeln!(out, "pub fn {name}({params}){ret} {{")?;
            out.push_str(&body);
            if let Some(results) = results {
                writeln!(out, "{INDENT}{results}")?;
            }
            writeln!(out, "}}")?;
            return Ok(out);
        }

        let name = type_ident(&self.graph.name, "Graph");
        writeln!(out, "#[derive(Debug, Default)]")?;
        writeln!(out, "pub struct {name} {{")?;
        for (id, field) in &self.fields {
            let node = self.node(*id)?;
            let alias = self.aliases.get(&node.origin.pkg).map_or(STDLIB, String::as_str);
            writeln!(out, "{INDENT}{field}: {alias}::{},", node.name())?;
        }
        writeln!(out, "}}")?;
        writeln!(out)?;
        writeln!(out, "impl {name} {{")?;
        writeln!(out, "{INDENT}pub fn init(&mut self, config: &{}::{CONFIG}) {{", self.stdlib())?;
        for field in self.fields.values() {
            writeln!(out, "{INDENT}{INDENT}self.{field}.init(config);")?;
        }
        writeln!(out, "{INDENT}}}")?;
        writeln!(out)?;
        let self_param = if params.is_empty() { "&mut self".to_string() } else { format!("&mut self, {params}") };
        writeln!(out, "{INDENT}pub fn process({self_param}){ret} {{")?;
        for line in body.lines() {
            writeln!(out, "{INDENT}{line}")?;
        }
        if let Some(results) = results {
            writeln!(out, "{INDENT}{INDENT}{results}")?;
        }
        writeln!(out, "{INDENT}}}")?;
        writeln!(out, "}}")?;
        Ok(out)
    }

    fn node(&self, id: NodeId) -> Result<&'a Node, CodegenError> {
        self.graph.node(id).ok_or(CodegenError::MissingNode(id))
    }

    fn params(&self) -> String {
        self.graph
            .in_ports()
            .iter()
            .filter_map(|id| self.bindings.get(&OutPort::new(*id, 0)))
            .map(|name| format!("{name}: f32"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn results(&self) -> Result<Option<String>, CodegenError> {
        let values = self
            .graph
            .out_ports()
            .iter()
            .map(|id| self.arg(InPort::new(*id, 0)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match values.len() {
            0 => None,
            1 => values.into_iter().next(),
            _ => Some(format!("({})", values.join(", "))),
        })
    }

    /// Expression for an input port: its source binding, or zero
    fn arg(&self, dst: InPort) -> Result<String, CodegenError> {
        match self.graph.source_of(dst) {
            None => Ok(ZERO.to_string()),
            Some(src) => self.bindings.get(&src).cloned().ok_or(CodegenError::Unbound(src)),
        }
    }

    fn args(&self, id: NodeId, node: &Node) -> Result<Vec<String>, CodegenError> {
        (0..node.inputs.len())
            .map(|i| self.arg(InPort::new(id, i)))
            .collect()
    }

    /// Bind each consumed output to a fresh variable
    fn bind(&mut self, id: NodeId, node: &Node) -> Vec<String> {
        (0..node.outputs.len())
            .map(|i| {
                let port = OutPort::new(id, i);
                if self.graph.consumers_of(port).is_empty() {
                    return DISCARD.to_string();
                }
                let var = format!("v{}", self.next_var);
                self.next_var += 1;
                self.bindings.insert(port, var.clone());
                var
            })
            .collect()
    }

    fn field(&self, id: NodeId) -> Result<&str, CodegenError> {
        let owner = self.graph.delay_write_of(id).unwrap_or(id);
        self.fields
            .get(&owner)
            .map(String::as_str)
            .ok_or(CodegenError::MissingNode(owner))
    }

    fn emit_node(&mut self, out: &mut String, id: NodeId) -> Result<(), CodegenError> {
        let node = self.node(id)?;
        let args = self.args(id, node)?;

        match node.delay {
            Some(DelayLink::Write) => {
                let field = self.field(id)?.to_string();
                let (time, value) = (&args[0], &args[1]);
                writeln!(out, "{INDENT}self.{field}.write({value});")?;
                self.written.insert(id);
                let vars = self.bind(id, node);
                if vars.iter().any(|v| v != DISCARD) {
                    writeln!(out, "{INDENT}let {} = self.{field}.read({time});", vars[0])?;
                }
                return Ok(());
            }
            Some(DelayLink::Read(write)) => {
                let field = self.field(id)?.to_string();
                let method = if self.written.contains(&write) { "read" } else { "feedback_read" };
                let call = format!("self.{field}.{method}({})", args.join(", "));
                let vars = self.bind(id, node);
                writeln!(out, "{INDENT}let {} = {call};", vars[0])?;
                return Ok(());
            }
            None => {}
        }

        let call = if node.is_operator() {
            format!("{} {} {}", args[0], node.name(), args[1])
        } else if node.stateful {
            format!("self.{}.process({})", self.field(id)?, args.join(", "))
        } else {
            let alias = self.alias(&node.origin.pkg);
            format!("{alias}::{}({})", node.name(), args.join(", "))
        };

        let vars = self.bind(id, node);
        match vars.as_slice() {
            [] => writeln!(out, "{INDENT}{call};")?,
            [var] => writeln!(out, "{INDENT}let {var} = {call};")?,
            vars if vars.iter().all(|v| v == DISCARD) => {
                writeln!(out, "{INDENT}let {DISCARD} = {call};")?;
            }
            vars => writeln!(out, "{INDENT}let ({}) = {call};", vars.join(", "))?,
        }
        Ok(())
    }
}

/// Render a constant as an `f32` literal
fn float_literal(value: f64) -> String {
    format!("{:?}", value as f32)
}

/// `WhiteNoise` -> `white_noise`
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if c.is_uppercase() && prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        }
    }
    out.trim_end_matches('_').to_string()
}

/// `add_one` -> `AddOne`
pub fn camel_case(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect()
}

/// Whether `name` has the shape of a generated variable
fn is_variable(name: &str) -> bool {
    name.strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// `base`, renamed if it is already taken or could clash with a variable
fn unique_param(base: &str, taken: &HashSet<String>) -> String {
    let base = if is_variable(base) { format!("{base}_") } else { base.to_string() };
    let mut name = base.clone();
    let mut n = 2;
    while taken.contains(&name) {
        name = format!("{base}_{n}");
        n += 1;
    }
    name
}

/// A valid Rust type name derived from `text`
fn type_ident(text: &str, fallback: &str) -> String {
    let mut name = camel_case(text);
    if name.is_empty() {
        name = fallback.to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    if name == "Self" {
        name.push('_');
    }
    name
}

/// A valid Rust identifier derived from `text`
fn ident(text: &str, fallback: &str) -> String {
    let mut name = snake_case(text);
    if name.is_empty() {
        name = fallback.to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    if KEYWORDS.contains(&name.as_str()) {
        name.push('_');
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{Capability, Manifest, NodeFactory, Param, Signature};
    use crate::node::Origin;
    use crate::port::PortDirection;

    fn build(graph: &mut Graph, manifest: &Manifest, pkg: &str, name: &str) -> NodeId {
        let node = NodeFactory::build(manifest, &Origin::new(pkg, name)).unwrap();
        graph.add_node(node).unwrap()
    }

    fn constant(graph: &mut Graph, text: &str) -> NodeId {
        graph.add_node(NodeFactory::constant(text).unwrap()).unwrap()
    }

    fn wire(graph: &mut Graph, src: NodeId, out: usize, dst: NodeId, port: usize) {
        graph.connect(OutPort::new(src, out), InPort::new(dst, port)).unwrap();
    }

    fn source(graph: &Graph) -> String {
        generate_source(graph, &ArrangeConfig::default()).unwrap()
    }

    #[test]
    fn test_add_one() {
        let mut graph = Graph::new("AddOne");
        let x = graph.insert_terminal(PortDirection::Input, 0, "x");
        let plus = graph.add_node(NodeFactory::operator("+").unwrap()).unwrap();
        let one = constant(&mut graph, "1");
        let y = graph.insert_terminal(PortDirection::Output, 0, "y");
        wire(&mut graph, x, 0, plus, 0);
        wire(&mut graph, one, 0, plus, 1);
        wire(&mut graph, plus, 0, y, 0);

        assert_eq!(
            source(&graph),
            "// Code generated by dspflow. DO NOT EDIT.\n\
             \n\
             pub fn add_one(x: f32) -> f32 {\n    \
                 let v0 = x + 1.0;\n    \
                 v0\n\
             }\n"
        );
    }

    #[test]
    fn test_delay_feedback_and_fresh_reads() {
        let mut graph = Graph::new("Echo");
        let x = graph.insert_terminal(PortDirection::Input, 0, "x");
        let write = graph.add_node(NodeFactory::delay()).unwrap();
        let feedback = graph.add_delay_read(write).unwrap();
        let tap = graph.add_delay_read(write).unwrap();
        let plus = graph.add_node(NodeFactory::operator("+").unwrap()).unwrap();
        let half = constant(&mut graph, "0.5");
        let quarter = constant(&mut graph, "0.25");
        let y = graph.insert_terminal(PortDirection::Output, 0, "y");
        let z = graph.insert_terminal(PortDirection::Output, 1, "z");

        wire(&mut graph, half, 0, feedback, 0);
        wire(&mut graph, x, 0, plus, 0);
        wire(&mut graph, feedback, 0, plus, 1);
        wire(&mut graph, quarter, 0, write, 0);
        wire(&mut graph, plus, 0, write, 1);
        wire(&mut graph, write, 0, y, 0);
        wire(&mut graph, write, 0, tap, 0);
        wire(&mut graph, tap, 0, z, 0);

        let text = source(&graph);
        let expected = "\
// Code generated by dspflow. DO NOT EDIT.

use dsp;

#[derive(Debug, Default)]
pub struct Echo {
    delay_0: dsp::Delay,
}

impl Echo {
    pub fn init(&mut self, config: &dsp::Config) {
        self.delay_0.init(config);
    }

    pub fn process(&mut self, x: f32) -> (f32, f32) {
        let v0 = self.delay_0.feedback_read(0.5);
        let v1 = x + v0;
        self.delay_0.write(v1);
        let v2 = self.delay_0.read(0.25);
        let v3 = self.delay_0.read(v2);
        (v2, v3)
    }
}
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_multi_output_bindings() {
        let manifest = Manifest::stdlib();
        let mut graph = Graph::new("Quadrature");
        let f = graph.insert_terminal(PortDirection::Input, 0, "freq");
        let used = build(&mut graph, &manifest, STDLIB, "Oscillator");
        let unused = build(&mut graph, &manifest, STDLIB, "Oscillator");
        let y = graph.insert_terminal(PortDirection::Output, 0, "y");
        wire(&mut graph, f, 0, used, 0);
        wire(&mut graph, f, 0, unused, 0);
        wire(&mut graph, used, 1, y, 0);

        let text = source(&graph);
        assert!(text.contains("oscillator_0: dsp::Oscillator,"));
        assert!(text.contains("oscillator_1: dsp::Oscillator,"));
        assert!(text.contains("let _ = self.oscillator"));
        assert!(text.contains("let (_, v0) = self.oscillator"));
        assert!(text.contains("pub fn process(&mut self, freq: f32) -> f32 {"));
    }

    #[test]
    fn test_unconnected_ports_read_zero() {
        let manifest = Manifest::stdlib();
        let mut graph = Graph::new("Loose");
        let min = build(&mut graph, &manifest, STDLIB, "min");
        let y = graph.insert_terminal(PortDirection::Output, 0, "y");
        let _z = graph.insert_terminal(PortDirection::Output, 1, "z");
        wire(&mut graph, min, 0, y, 0);

        let text = source(&graph);
        assert!(text.contains("pub fn loose() -> (f32, f32) {"));
        assert!(text.contains("let v0 = dsp::min(0.0, 0.0);"));
        assert!(text.contains("(v0, 0.0)"));
    }

    #[test]
    fn test_package_aliases_deduplicate() {
        let mut manifest = Manifest::stdlib();
        let unary = Capability::Function(Signature::new(vec![Param::f32("x")], vec![Param::f32("")]));
        manifest.register(Origin::new("audio::dsp", "gain"), unary);

        let mut graph = Graph::new("Chain");
        let x = graph.insert_terminal(PortDirection::Input, 0, "x");
        let sin = build(&mut graph, &manifest, STDLIB, "sin");
        let gain = build(&mut graph, &manifest, "audio::dsp", "gain");
        let y = graph.insert_terminal(PortDirection::Output, 0, "y");
        wire(&mut graph, x, 0, sin, 0);
        wire(&mut graph, sin, 0, gain, 0);
        wire(&mut graph, gain, 0, y, 0);

        let text = source(&graph);
        assert!(text.contains("use dsp;\nuse audio::dsp as dsp2;\n"));
        assert!(text.contains("let v0 = dsp::sin(x);"));
        assert!(text.contains("let v1 = dsp2::gain(v0);"));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let manifest = Manifest::stdlib();
        let mut graph = Graph::new("Noisy Mix");
        let a = graph.insert_terminal(PortDirection::Input, 0, "in");
        let noise = build(&mut graph, &manifest, STDLIB, "WhiteNoise");
        let times = graph.add_node(NodeFactory::operator("*").unwrap()).unwrap();
        let y = graph.insert_terminal(PortDirection::Output, 0, "out");
        wire(&mut graph, a, 0, times, 0);
        wire(&mut graph, noise, 0, times, 1);
        wire(&mut graph, times, 0, y, 0);

        let first = source(&graph);
        assert_eq!(first, source(&graph));
        assert!(first.contains("pub struct NoisyMix {"));
        assert!(first.contains("pub fn process(&mut self, in_: f32) -> f32 {"));
        assert!(first.contains("let v0 = self.white_noise_0.process();"));
        assert!(first.contains("let v1 = in_ * v0;"));
    }

    #[test]
    fn test_parameter_named_like_a_variable() {
        let mut graph = Graph::new("Shadow");
        let v0 = graph.insert_terminal(PortDirection::Input, 0, "v0");
        let plus = graph.add_node(NodeFactory::operator("+").unwrap()).unwrap();
        let one = constant(&mut graph, "1");
        let times = graph.add_node(NodeFactory::operator("*").unwrap()).unwrap();
        let y = graph.insert_terminal(PortDirection::Output, 0, "y");
        wire(&mut graph, v0, 0, plus, 0);
        wire(&mut graph, one, 0, plus, 1);
        wire(&mut graph, plus, 0, times, 0);
        wire(&mut graph, v0, 0, times, 1);
        wire(&mut graph, times, 0, y, 0);

        let text = source(&graph);
        assert!(text.contains("pub fn shadow(v0_: f32) -> f32 {"));
        assert!(text.contains("let v0 = v0_ + 1.0;"));
        assert!(text.contains("let v1 = v0 * v0_;"));
    }

    #[test]
    fn test_duplicate_parameters_renamed() {
        let manifest = Manifest::stdlib();
        let mut graph = Graph::new("2Dup");
        let x1 = graph.insert_terminal(PortDirection::Input, 0, "x");
        let x2 = graph.insert_terminal(PortDirection::Input, 1, "x");
        let a = graph.insert_terminal(PortDirection::Input, 2, "");
        let b = graph.insert_terminal(PortDirection::Input, 3, "");
        let noise = build(&mut graph, &manifest, STDLIB, "WhiteNoise");
        let clip = build(&mut graph, &manifest, STDLIB, "clip");
        let minus = graph.add_node(NodeFactory::operator("-").unwrap()).unwrap();
        let times = graph.add_node(NodeFactory::operator("*").unwrap()).unwrap();
        let y = graph.insert_terminal(PortDirection::Output, 0, "y");
        wire(&mut graph, x1, 0, clip, 0);
        wire(&mut graph, a, 0, clip, 1);
        wire(&mut graph, b, 0, clip, 2);
        wire(&mut graph, clip, 0, minus, 0);
        wire(&mut graph, x2, 0, minus, 1);
        wire(&mut graph, minus, 0, times, 0);
        wire(&mut graph, noise, 0, times, 1);
        wire(&mut graph, times, 0, y, 0);

        let text = source(&graph);
        assert!(text.contains("pub struct _2Dup {"));
        assert!(text.contains("impl _2Dup {"));
        assert!(text.contains("pub fn process(&mut self, x: f32, x_2: f32, input: f32, input_2: f32) -> f32 {"));
        assert!(text.contains("= dsp::clip(x, input, input_2);"));
        assert!(text.contains(" - x_2;"));
    }

    #[test]
    fn test_field_counter_is_separated() {
        let mut manifest = Manifest::stdlib();
        let stateful = || Capability::Stateful {
            init: Signature::new(vec![Param::config("c")], vec![]),
            process: Signature::new(vec![], vec![Param::f32("")]),
        };
        manifest.register(Origin::new("fx", "Osc2"), stateful());
        manifest.register(Origin::new("fx", "Osc"), stateful());

        let mut graph = Graph::new("Bank");
        build(&mut graph, &manifest, "fx", "Osc2");
        build(&mut graph, &manifest, "fx", "Osc");

        let text = source(&graph);
        assert!(text.contains("osc2_0: fx::Osc2,") || text.contains("osc2_1: fx::Osc2,"));
        assert!(text.contains("osc_0: fx::Osc,") || text.contains("osc_1: fx::Osc,"));
    }

    #[test]
    fn test_unique_param_and_type_ident() {
        let mut taken = HashSet::new();
        for base in ["x", "x", "x_2", "v12", "v"] {
            let name = unique_param(base, &taken);
            taken.insert(name);
        }
        let mut names: Vec<&str> = taken.iter().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["v", "v12_", "x", "x_2", "x_2_2"]);

        assert_eq!(type_ident("2Dup", "Graph"), "_2Dup");
        assert_eq!(type_ident("self", "Graph"), "Self_");
        assert_eq!(type_ident("--", "Graph"), "Graph");
    }

    #[test]
    fn test_case_conversions() {
        assert_eq!(snake_case("WhiteNoise"), "white_noise");
        assert_eq!(snake_case("add one"), "add_one");
        assert_eq!(snake_case("AddOne"), "add_one");
        assert_eq!(camel_case("add_one"), "AddOne");
        assert_eq!(camel_case("AddOne"), "AddOne");
        assert_eq!(ident("2x", "p"), "_2x");
        assert_eq!(ident("", "p"), "p");
    }
}

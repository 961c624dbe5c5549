// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node construction from capability descriptors and built-in primitives.
//!
//! External node kinds are described by a [`Capability`]: either a plain
//! function signature, or a stateful type with an initialization routine and
//! a processing routine. Only descriptors whose processing signature is made
//! entirely of `f32` values produce a usable node. Everything else is
//! filtered out by returning `None`, which is how node discovery separates
//! candidates from unrelated items.

use crate::node::{
    DelayLink, Node, NodeId, Origin, INPUT_TERMINAL_PREFIX, OPERATORS, OUTPUT_TERMINAL_PREFIX,
};
use crate::port::{Port, PortDirection};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Package path of the standard node library
pub const STDLIB: &str = "dsp";
/// Name of the delay primitive within [`STDLIB`]
pub const DELAY: &str = "Delay";
/// Name of the configuration type within [`STDLIB`] passed to `init`
pub const CONFIG: &str = "Config";

/// Kind of a value in a capability signature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// 32-bit float, the only kind carried by ports
    F32,
    /// 64-bit float
    F64,
    /// 32-bit integer
    I32,
    /// Boolean
    Bool,
    /// The configuration handed to stateful nodes on initialization
    Config,
    /// Anything else, by type name
    Other(String),
}

/// A named parameter or result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Name (may be empty)
    #[serde(default)]
    pub name: String,
    /// Value kind
    pub kind: ValueKind,
}

impl Param {
    /// An `f32` parameter
    pub fn f32(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::F32,
        }
    }

    /// A configuration parameter
    pub fn config(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::Config,
        }
    }
}

/// Parameters and results of a callable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Parameters in order
    #[serde(default)]
    pub params: Vec<Param>,
    /// Results in order
    #[serde(default)]
    pub results: Vec<Param>,
}

impl Signature {
    /// Create a signature
    pub fn new(params: Vec<Param>, results: Vec<Param>) -> Self {
        Self { params, results }
    }

    fn is_all_f32(&self) -> bool {
        self.params
            .iter()
            .chain(&self.results)
            .all(|p| p.kind == ValueKind::F32)
    }
}

/// What an origin provides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability {
    /// A free function
    Function(Signature),
    /// A type with `init` and `process` routines
    Stateful {
        /// Signature of the initialization routine
        init: Signature,
        /// Signature of the processing routine
        process: Signature,
    },
}

/// Resolves an origin identity to the capability it provides
pub trait SignatureResolver {
    /// Look up an origin, `None` if it is unknown
    fn resolve(&self, origin: &Origin) -> Option<Capability>;
}

/// Builds nodes
pub struct NodeFactory;

impl NodeFactory {
    /// Build a node from a capability descriptor.
    ///
    /// Returns `None` when the descriptor cannot be used as a node: mixed
    /// value kinds, an empty processing signature, or an `init` routine that
    /// does not take exactly one configuration argument.
    pub fn from_capability(origin: Origin, capability: &Capability) -> Option<Node> {
        let (process, stateful) = match capability {
            Capability::Function(sig) => (sig, false),
            Capability::Stateful { init, process } => {
                let config_only = init.results.is_empty()
                    && init.params.len() == 1
                    && init.params[0].kind == ValueKind::Config;
                if !config_only {
                    return None;
                }
                (process, true)
            }
        };
        if process.params.is_empty() && process.results.is_empty() {
            return None;
        }
        if !process.is_all_f32() {
            return None;
        }
        let mut node = Node::new(
            origin,
            process.params.iter().map(|p| p.name.clone()),
            process.results.iter().map(|p| p.name.clone()),
        );
        node.stateful = stateful;
        Some(node)
    }

    /// Build a node for an origin: built-ins first, then the resolver
    pub fn build(resolver: &dyn SignatureResolver, origin: &Origin) -> Result<Node, FactoryError> {
        if let Some(node) = Self::builtin(origin) {
            return Ok(node);
        }
        let capability = resolver
            .resolve(origin)
            .ok_or_else(|| FactoryError::UnknownNode(origin.clone()))?;
        Self::from_capability(origin.clone(), &capability)
            .ok_or_else(|| FactoryError::Unusable(origin.clone()))
    }

    /// Build a built-in primitive without any lookup.
    ///
    /// A delay origin always yields a write node; read nodes are created
    /// with [`NodeFactory::delay_read`] once the write node is known.
    pub fn builtin(origin: &Origin) -> Option<Node> {
        if origin.pkg == STDLIB && origin.name == DELAY {
            return Some(Self::delay());
        }
        if !origin.is_builtin() {
            return None;
        }
        let name = origin.name.as_str();
        if let Some(param) = name.strip_prefix(INPUT_TERMINAL_PREFIX) {
            return Some(Self::terminal(PortDirection::Input, param));
        }
        if let Some(result) = name.strip_prefix(OUTPUT_TERMINAL_PREFIX) {
            return Some(Self::terminal(PortDirection::Output, result));
        }
        Self::operator(name).or_else(|| Self::constant(name))
    }

    /// A binary arithmetic operator: two inputs, one output
    pub fn operator(op: &str) -> Option<Node> {
        OPERATORS
            .contains(&op)
            .then(|| Node::new(Origin::builtin(op), ["", ""], [""]))
    }

    /// A graph-level terminal.
    ///
    /// An input terminal has a single output port and an output terminal a
    /// single input port, both named after the terminal.
    pub fn terminal(direction: PortDirection, name: &str) -> Node {
        match direction {
            PortDirection::Input => Node::new(
                Origin::builtin(format!("{INPUT_TERMINAL_PREFIX}{name}")),
                Vec::<String>::new(),
                [name],
            ),
            PortDirection::Output => Node::new(
                Origin::builtin(format!("{OUTPUT_TERMINAL_PREFIX}{name}")),
                [name],
                Vec::<String>::new(),
            ),
        }
    }

    /// A numeric constant, `None` if `text` is not a number finite as `f32`
    pub fn constant(text: &str) -> Option<Node> {
        let node = Node::new(Origin::builtin(text.trim()), Vec::<String>::new(), [""]);
        node.is_constant().then_some(node)
    }

    /// A delay write node: inputs are the feedback read time and the value
    /// to write, the output is the feedback read
    pub fn delay() -> Node {
        let mut node = Node::new(Origin::new(STDLIB, DELAY), ["time", "value"], [""]);
        node.stateful = true;
        node.delay = Some(DelayLink::Write);
        node
    }

    /// A delay read node sharing the delay line of `write`
    pub fn delay_read(write: NodeId) -> Node {
        Node {
            origin: Origin::new(STDLIB, DELAY),
            stateful: true,
            inputs: vec![Port::input("time")],
            outputs: vec![Port::output("")],
            delay: Some(DelayLink::Read(write)),
        }
    }
}

/// One entry of a [`Manifest`] as written in manifest files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Origin identity
    pub origin: Origin,
    /// What the origin provides
    pub capability: Capability,
}

/// An explicit table of available node kinds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ManifestEntry>", into = "Vec<ManifestEntry>")]
pub struct Manifest {
    nodes: IndexMap<Origin, Capability>,
}

impl From<Vec<ManifestEntry>> for Manifest {
    fn from(entries: Vec<ManifestEntry>) -> Self {
        Self {
            nodes: entries.into_iter().map(|e| (e.origin, e.capability)).collect(),
        }
    }
}

impl From<Manifest> for Vec<ManifestEntry> {
    fn from(manifest: Manifest) -> Self {
        manifest
            .nodes
            .into_iter()
            .map(|(origin, capability)| ManifestEntry { origin, capability })
            .collect()
    }
}

impl Manifest {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard node library
    pub fn stdlib() -> Self {
        let unary = || Capability::Function(Signature::new(vec![Param::f32("x")], vec![Param::f32("")]));
        let binary = || {
            Capability::Function(Signature::new(
                vec![Param::f32("a"), Param::f32("b")],
                vec![Param::f32("")],
            ))
        };

        let mut manifest = Self::new();
        for name in ["sin", "cos", "tanh", "abs"] {
            manifest.register(Origin::new(STDLIB, name), unary());
        }
        for name in ["min", "max"] {
            manifest.register(Origin::new(STDLIB, name), binary());
        }
        manifest.register(
            Origin::new(STDLIB, "clip"),
            Capability::Function(Signature::new(
                vec![Param::f32("x"), Param::f32("lo"), Param::f32("hi")],
                vec![Param::f32("")],
            )),
        );
        manifest.register(
            Origin::new(STDLIB, "WhiteNoise"),
            Capability::Stateful {
                init: Signature::new(vec![Param::config("c")], vec![]),
                process: Signature::new(vec![], vec![Param::f32("")]),
            },
        );
        manifest.register(
            Origin::new(STDLIB, "Oscillator"),
            Capability::Stateful {
                init: Signature::new(vec![Param::config("c")], vec![]),
                process: Signature::new(vec![Param::f32("freq")], vec![Param::f32("sin"), Param::f32("cos")]),
            },
        );
        manifest
    }

    /// Add or replace an entry
    pub fn register(&mut self, origin: Origin, capability: Capability) {
        self.nodes.insert(origin, capability);
    }

    /// Merge another manifest into this one, later entries winning
    pub fn extend(&mut self, other: Manifest) {
        self.nodes.extend(other.nodes);
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the manifest has no entries
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parse a manifest from RON text
    pub fn from_ron(text: &str) -> Result<Self, FactoryError> {
        Ok(ron::from_str(text)?)
    }

    /// Load a manifest from a RON file
    pub fn load(path: &Path) -> Result<Self, FactoryError> {
        let text = std::fs::read_to_string(path)?;
        let manifest = Self::from_ron(&text)?;
        tracing::debug!(path = %path.display(), entries = manifest.len(), "loaded manifest");
        Ok(manifest)
    }

    /// Origins that the factory accepts as nodes, sorted.
    ///
    /// This is the only verdict node discovery needs.
    pub fn candidates(&self) -> Vec<Origin> {
        let mut origins: Vec<Origin> = self
            .nodes
            .iter()
            .filter(|(origin, capability)| {
                NodeFactory::from_capability((*origin).clone(), capability).is_some()
            })
            .map(|(origin, _)| origin.clone())
            .collect();
        origins.sort();
        origins
    }
}

impl SignatureResolver for Manifest {
    fn resolve(&self, origin: &Origin) -> Option<Capability> {
        self.nodes.get(origin).cloned()
    }
}

/// Error when building a node
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    /// The origin could not be resolved
    #[error("unknown node {0}")]
    UnknownNode(Origin),

    /// The origin resolved to a capability that cannot be a node
    #[error("{0} cannot be used as a node")]
    Unusable(Origin),

    /// Manifest file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest text could not be parsed
    #[error("Invalid manifest: {0}")]
    Manifest(#[from] ron::error::SpannedError),
}

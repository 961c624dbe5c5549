// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.

use crate::port::Port;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of the name of a graph-level input terminal
pub const INPUT_TERMINAL_PREFIX: &str = "in-";
/// Prefix of the name of a graph-level output terminal
pub const OUTPUT_TERMINAL_PREFIX: &str = "out-";

/// Binary arithmetic operators available as built-in nodes
pub const OPERATORS: [&str; 4] = ["+", "-", "*", "/"];

/// Unique identifier for a node, stable for the lifetime of its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Where a node's processing capability is defined.
///
/// An empty `pkg` denotes a built-in primitive (operator, terminal, constant).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Origin {
    /// Package path (empty for built-ins)
    pub pkg: String,
    /// Name within the package
    pub name: String,
}

impl Origin {
    /// Create an origin from a package path and a name
    pub fn new(pkg: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            pkg: pkg.into(),
            name: name.into(),
        }
    }

    /// Origin of a built-in primitive
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::new("", name)
    }

    /// Whether this names a built-in primitive
    pub fn is_builtin(&self) -> bool {
        self.pkg.is_empty()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pkg.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}::{}", self.pkg, self.name)
        }
    }
}

/// Link from a delay node to the write node owning the shared delay line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelayLink {
    /// This node is the write node (the link points to itself)
    Write,
    /// This node reads the delay line written by the given node
    Read(NodeId),
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Origin identity
    pub origin: Origin,
    /// Whether the node carries state across invocations
    pub stateful: bool,
    /// Input ports
    pub inputs: Vec<Port>,
    /// Output ports
    pub outputs: Vec<Port>,
    /// Delay back-reference, `None` for non-delay nodes
    pub delay: Option<DelayLink>,
}

impl Node {
    /// Create a stateless node with the given port names
    pub fn new<I, O>(origin: Origin, inputs: I, outputs: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            origin,
            stateful: false,
            inputs: inputs.into_iter().map(Port::input).collect(),
            outputs: outputs.into_iter().map(Port::output).collect(),
            delay: None,
        }
    }

    /// Display name used for ordering and labels
    pub fn name(&self) -> &str {
        &self.origin.name
    }

    /// Get an input port by index
    pub fn input(&self, index: usize) -> Option<&Port> {
        self.inputs.get(index)
    }

    /// Get an output port by index
    pub fn output(&self, index: usize) -> Option<&Port> {
        self.outputs.get(index)
    }

    /// Graph-level input terminal
    pub fn is_input_terminal(&self) -> bool {
        self.origin.is_builtin() && self.origin.name.starts_with(INPUT_TERMINAL_PREFIX)
    }

    /// Graph-level output terminal
    pub fn is_output_terminal(&self) -> bool {
        self.origin.is_builtin() && self.origin.name.starts_with(OUTPUT_TERMINAL_PREFIX)
    }

    /// Either kind of terminal
    pub fn is_terminal(&self) -> bool {
        self.is_input_terminal() || self.is_output_terminal()
    }

    /// Name of the parameter or result a terminal stands for
    pub fn terminal_name(&self) -> Option<&str> {
        if !self.origin.is_builtin() {
            return None;
        }
        self.origin
            .name
            .strip_prefix(INPUT_TERMINAL_PREFIX)
            .or_else(|| self.origin.name.strip_prefix(OUTPUT_TERMINAL_PREFIX))
    }

    /// Delay write or delay read node
    pub fn is_delay(&self) -> bool {
        self.delay.is_some()
    }

    /// Delay write node
    pub fn is_delay_write(&self) -> bool {
        self.delay == Some(DelayLink::Write)
    }

    /// Binary arithmetic operator
    pub fn is_operator(&self) -> bool {
        self.origin.is_builtin() && OPERATORS.contains(&self.origin.name.as_str())
    }

    /// Numeric constant literal
    pub fn is_constant(&self) -> bool {
        self.constant_value().is_some()
    }

    /// Value of a numeric constant node.
    ///
    /// Signals are `f32`, so values that overflow it are not constants.
    pub fn constant_value(&self) -> Option<f64> {
        if !self.origin.is_builtin() {
            return None;
        }
        self.origin
            .name
            .parse::<f64>()
            .ok()
            .filter(|v| (*v as f32).is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates_follow_origin() {
        let input = Node::new(Origin::builtin("in-x"), Vec::<String>::new(), ["x"]);
        assert!(input.is_input_terminal());
        assert!(!input.is_output_terminal());
        assert_eq!(input.terminal_name(), Some("x"));

        let constant = Node::new(Origin::builtin("0.5"), Vec::<String>::new(), [""]);
        assert!(constant.is_constant());
        assert_eq!(constant.constant_value(), Some(0.5));

        let minus = Node::new(Origin::builtin("-"), ["", ""], [""]);
        assert!(minus.is_operator());
        assert!(!minus.is_constant());

        let foreign = Node::new(Origin::new("dsp", "in-x"), ["t"], [""]);
        assert!(!foreign.is_input_terminal());
        assert_eq!(foreign.terminal_name(), None);
    }

    #[test]
    fn test_non_finite_is_not_constant() {
        let inf = Node::new(Origin::builtin("inf"), Vec::<String>::new(), [""]);
        assert!(!inf.is_constant());

        // Finite as f64 but not as f32.
        let huge = Node::new(Origin::builtin("1e39"), Vec::<String>::new(), [""]);
        assert!(!huge.is_constant());
        let max = Node::new(Origin::builtin("3.4e38"), Vec::<String>::new(), [""]);
        assert!(max.is_constant());
    }

    #[test]
    fn test_origin_display() {
        assert_eq!(Origin::new("dsp", "Delay").to_string(), "dsp::Delay");
        assert_eq!(Origin::builtin("+").to_string(), "+");
    }
}

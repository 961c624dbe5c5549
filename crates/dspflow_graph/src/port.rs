// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use crate::connection::ConnectionId;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// Address of an output port: the node plus the index into its outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPort {
    /// Owning node
    pub node: NodeId,
    /// Index into [`crate::Node::outputs`]
    pub index: usize,
}

impl OutPort {
    /// Create an output port address
    pub fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

/// Address of an input port: the node plus the index into its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InPort {
    /// Owning node
    pub node: NodeId,
    /// Index into [`crate::Node::inputs`]
    pub index: usize,
}

impl InPort {
    /// Create an input port address
    pub fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

/// A port on a node
///
/// Every signal carries the same numeric kind, so a port only records its
/// direction, an optional display name and the connections incident to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    /// Port name (may be empty)
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    connections: Vec<ConnectionId>,
}

impl Port {
    /// Create a new input port
    pub fn input(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Input,
            connections: Vec::new(),
        }
    }

    /// Create a new output port
    pub fn output(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Output,
            connections: Vec::new(),
        }
    }

    /// Whether this is an output port
    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }

    /// Connections registered on this port, in the order they were made
    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    /// Whether any connection touches this port
    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    /// Whether another connection may be attached.
    ///
    /// Inputs accept a single incoming connection; outputs fan out freely.
    pub fn accepts_connection(&self) -> bool {
        self.is_output() || self.connections.is_empty()
    }

    pub(crate) fn register(&mut self, id: ConnectionId) {
        self.connections.push(id);
    }

    pub(crate) fn deregister(&mut self, id: ConnectionId) {
        self.connections.retain(|c| *c != id);
    }
}

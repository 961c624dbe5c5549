// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::node::NodeId;
use crate::port::{InPort, OutPort};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a connection, stable for the lifetime of its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A connection from an output port to an input port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Source output port
    pub src: OutPort,
    /// Destination input port
    pub dst: InPort,
}

impl Connection {
    /// Create a new connection
    pub fn new(id: ConnectionId, src: OutPort, dst: InPort) -> Self {
        Self { id, src, dst }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.src.node == node_id || self.dst.node == node_id
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.
//!
//! Nodes live in an arena keyed by [`NodeId`]. The graph additionally keeps
//! three ordered sequences: input terminals and output terminals, whose order
//! is the parameter/result order of the compiled function, and the remaining
//! nodes, whose order carries no meaning.

use crate::connection::{Connection, ConnectionId};
use crate::factory::NodeFactory;
use crate::node::{DelayLink, Node, NodeId, INPUT_TERMINAL_PREFIX, OUTPUT_TERMINAL_PREFIX};
use crate::port::{InPort, OutPort, PortDirection};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Extension of persisted graph files
pub const GRAPH_FILE_EXTENSION: &str = "dsp";
/// Extension of generated source files
pub const SOURCE_FILE_EXTENSION: &str = "rs";

/// A signal-processing dataflow graph
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Graph name, used for file and type naming
    pub name: String,
    arena: IndexMap<NodeId, Node>,
    in_ports: Vec<NodeId>,
    body: Vec<NodeId>,
    out_ports: Vec<NodeId>,
    connections: IndexMap<ConnectionId, Connection>,
    next_node: u32,
    next_connection: u32,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Name of the persisted graph file
    pub fn file_name(&self) -> String {
        format!("{}.{GRAPH_FILE_EXTENSION}", self.name.to_lowercase())
    }

    /// Name of the generated source file
    pub fn source_file_name(&self) -> String {
        format!("{}.{SOURCE_FILE_EXTENSION}", self.name.to_lowercase())
    }

    /// Whether the graph holds no nodes at all
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Add a node to the graph.
    ///
    /// Terminals are appended to their ordered group; everything else goes
    /// to the body. A delay read node must reference a delay write node that
    /// is already present.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        if let Some(DelayLink::Read(write)) = node.delay {
            self.expect_delay_write(write)?;
        }
        let id = self.allocate(node);
        let node = &self.arena[&id];
        if node.is_input_terminal() {
            self.in_ports.push(id);
        } else if node.is_output_terminal() {
            self.out_ports.push(id);
        } else {
            self.body.push(id);
        }
        Ok(id)
    }

    /// Insert a new input or output terminal at `position` in its group
    pub fn insert_terminal(
        &mut self,
        direction: PortDirection,
        position: usize,
        name: &str,
    ) -> NodeId {
        let node = NodeFactory::terminal(direction, name);
        let id = self.allocate(node);
        let group = match direction {
            PortDirection::Input => &mut self.in_ports,
            PortDirection::Output => &mut self.out_ports,
        };
        group.insert(position.min(group.len()), id);
        id
    }

    /// Rename a terminal, keeping its position and connections
    pub fn rename_terminal(&mut self, id: NodeId, name: &str) -> Result<(), GraphError> {
        let node = self.arena.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        let (prefix, port) = if node.is_input_terminal() {
            (INPUT_TERMINAL_PREFIX, node.outputs.first_mut())
        } else if node.is_output_terminal() {
            (OUTPUT_TERMINAL_PREFIX, node.inputs.first_mut())
        } else {
            return Err(GraphError::NotATerminal(id));
        };
        if let Some(port) = port {
            port.name = name.to_string();
        }
        node.origin.name = format!("{prefix}{name}");
        Ok(())
    }

    /// Add another read node sharing the delay line of `delay`.
    ///
    /// `delay` may be the write node itself or any of its read nodes.
    pub fn add_delay_read(&mut self, delay: NodeId) -> Result<NodeId, GraphError> {
        let write = self
            .delay_write_of(delay)
            .ok_or(GraphError::NotADelay(delay))?;
        self.add_node(NodeFactory::delay_read(write))
    }

    pub(crate) fn link_delay_read(&mut self, read: NodeId, write: NodeId) -> Result<(), GraphError> {
        self.expect_delay_write(write)?;
        let node = self.arena.get_mut(&read).ok_or(GraphError::NodeNotFound(read))?;
        node.delay = Some(DelayLink::Read(write));
        Ok(())
    }

    /// Remove a node together with its connections.
    ///
    /// Removing a delay write node also removes every read node sharing its
    /// delay line.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        if !self.arena.contains_key(&node_id) {
            return None;
        }
        let touching: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.involves_node(node_id))
            .map(|c| c.id)
            .collect();
        for id in touching {
            self.disconnect(id);
        }

        let node = self.arena.shift_remove(&node_id)?;
        self.in_ports.retain(|n| *n != node_id);
        self.body.retain(|n| *n != node_id);
        self.out_ports.retain(|n| *n != node_id);

        if node.is_delay_write() {
            for read in self.delay_reads_of(node_id) {
                self.remove_node(read);
            }
        }
        tracing::trace!(node = %node_id, origin = %node.origin, "removed node");
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.arena.get(&node_id)
    }

    /// Input terminals in parameter order
    pub fn in_ports(&self) -> &[NodeId] {
        &self.in_ports
    }

    /// Non-terminal nodes, in no meaningful order
    pub fn body(&self) -> &[NodeId] {
        &self.body
    }

    /// Output terminals in result order
    pub fn out_ports(&self) -> &[NodeId] {
        &self.out_ports
    }

    /// Input terminals, then the body, then output terminals
    pub fn all_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.in_ports
            .iter()
            .chain(&self.body)
            .chain(&self.out_ports)
            .copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Connect an output port to an input port.
    ///
    /// Fails if either port does not exist, if the input is already fed, or
    /// if the connection would close a cycle.
    pub fn connect(&mut self, src: OutPort, dst: InPort) -> Result<ConnectionId, GraphError> {
        let source = self.arena.get(&src.node).ok_or(GraphError::NodeNotFound(src.node))?;
        if source.output(src.index).is_none() {
            return Err(GraphError::PortNotFound {
                node: src.node,
                direction: PortDirection::Output,
                index: src.index,
            });
        }
        let target = self.arena.get(&dst.node).ok_or(GraphError::NodeNotFound(dst.node))?;
        let port = target.input(dst.index).ok_or(GraphError::PortNotFound {
            node: dst.node,
            direction: PortDirection::Input,
            index: dst.index,
        })?;
        if !port.accepts_connection() {
            return Err(GraphError::PortAlreadyConnected(dst));
        }
        if self.is_or_precedes(dst.node, src.node) {
            return Err(GraphError::Cycle {
                from: src.node,
                to: dst.node,
            });
        }

        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;
        self.connections.insert(id, Connection::new(id, src, dst));
        self.arena[&src.node].outputs[src.index].register(id);
        self.arena[&dst.node].inputs[dst.index].register(id);
        Ok(id)
    }

    /// Remove a connection, deregistering it from both endpoints
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.shift_remove(&connection_id)?;
        if let Some(node) = self.arena.get_mut(&connection.src.node) {
            node.outputs[connection.src.index].deregister(connection_id);
        }
        if let Some(node) = self.arena.get_mut(&connection.dst.node) {
            node.inputs[connection.dst.index].deregister(connection_id);
        }
        Some(connection)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// The output port feeding an input port, if any
    pub fn source_of(&self, dst: InPort) -> Option<OutPort> {
        let port = self.arena.get(&dst.node)?.input(dst.index)?;
        port.connections()
            .first()
            .and_then(|id| self.connections.get(id))
            .map(|c| c.src)
    }

    /// Input ports fed by an output port, in connection order
    pub fn consumers_of(&self, src: OutPort) -> Vec<InPort> {
        self.arena
            .get(&src.node)
            .and_then(|n| n.output(src.index))
            .map(|port| {
                port.connections()
                    .iter()
                    .filter_map(|id| self.connections.get(id))
                    .map(|c| c.dst)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Source nodes of every incoming connection, in input-port order
    pub fn predecessors(&self, node_id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.arena.get(&node_id) else {
            return Vec::new();
        };
        node.inputs
            .iter()
            .flat_map(|p| p.connections())
            .filter_map(|id| self.connections.get(id))
            .map(|c| c.src.node)
            .collect()
    }

    /// Destination nodes of every outgoing connection, in output-port order
    pub fn successors(&self, node_id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.arena.get(&node_id) else {
            return Vec::new();
        };
        node.outputs
            .iter()
            .flat_map(|p| p.connections())
            .filter_map(|id| self.connections.get(id))
            .map(|c| c.dst.node)
            .collect()
    }

    /// Whether `a` is `b` or reaches `b` by following connections downstream
    pub fn is_or_precedes(&self, a: NodeId, b: NodeId) -> bool {
        let mut stack = vec![b];
        let mut seen = HashSet::new();
        while let Some(n) = stack.pop() {
            if n == a {
                return true;
            }
            if seen.insert(n) {
                stack.extend(self.predecessors(n));
            }
        }
        false
    }

    /// The write node owning the delay line a delay node uses
    pub fn delay_write_of(&self, node_id: NodeId) -> Option<NodeId> {
        match self.arena.get(&node_id)?.delay? {
            DelayLink::Write => Some(node_id),
            DelayLink::Read(write) => Some(write),
        }
    }

    /// Read nodes sharing the delay line of `write`, excluding `write` itself
    pub fn delay_reads_of(&self, write: NodeId) -> Vec<NodeId> {
        self.all_nodes()
            .filter(|id| self.arena[id].delay == Some(DelayLink::Read(write)))
            .collect()
    }

    /// Verify the structural invariants of the graph.
    ///
    /// Connections are registered on exactly their two endpoints, inputs
    /// have at most one source, delay reads resolve to a present write node,
    /// terminals have a single port of the right direction and the graph is
    /// acyclic.
    pub fn check_invariants(&self) -> Result<(), GraphError> {
        let broken = |reason: String| Err(GraphError::Invariant(reason));

        let mut registered: HashMap<ConnectionId, usize> = HashMap::new();
        for (id, node) in &self.arena {
            for (index, port) in node.inputs.iter().enumerate() {
                if port.connections().len() > 1 {
                    return broken(format!("input {index} of {id} has several sources"));
                }
                for c in port.connections() {
                    match self.connections.get(c) {
                        Some(conn) if conn.dst == InPort::new(*id, index) => {
                            *registered.entry(*c).or_default() += 1;
                        }
                        _ => return broken(format!("{c} is not incident to input {index} of {id}")),
                    }
                }
            }
            for (index, port) in node.outputs.iter().enumerate() {
                for c in port.connections() {
                    match self.connections.get(c) {
                        Some(conn) if conn.src == OutPort::new(*id, index) => {
                            *registered.entry(*c).or_default() += 1;
                        }
                        _ => return broken(format!("{c} is not incident to output {index} of {id}")),
                    }
                }
            }
            if let Some(DelayLink::Read(write)) = node.delay {
                if self.arena.get(&write).map(Node::is_delay_write) != Some(true) {
                    return broken(format!("{id} reads a missing delay line {write}"));
                }
            }
        }
        if let Some(c) = self.connections.keys().find(|c| registered.get(c) != Some(&2)) {
            return broken(format!("{c} is not registered on both endpoints"));
        }

        for id in &self.in_ports {
            let node = &self.arena[id];
            if !node.inputs.is_empty() || node.outputs.len() != 1 {
                return broken(format!("input terminal {id} must have exactly one output"));
            }
        }
        for id in &self.out_ports {
            let node = &self.arena[id];
            if node.inputs.len() != 1 || !node.outputs.is_empty() {
                return broken(format!("output terminal {id} must have exactly one input"));
            }
        }

        // Kahn: every node must eventually lose all of its incoming edges.
        let mut indegree: HashMap<NodeId, usize> = self
            .arena
            .keys()
            .map(|id| (*id, self.predecessors(*id).len()))
            .collect();
        let mut ready: Vec<NodeId> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut visited = 0;
        while let Some(id) = ready.pop() {
            visited += 1;
            for succ in self.successors(id) {
                if let Some(d) = indegree.get_mut(&succ) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(succ);
                    }
                }
            }
        }
        if visited != self.arena.len() {
            return broken("graph contains a cycle".to_string());
        }
        Ok(())
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.arena.insert(id, node);
        id
    }

    fn expect_delay_write(&self, write: NodeId) -> Result<(), GraphError> {
        match self.arena.get(&write) {
            Some(node) if node.is_delay_write() => Ok(()),
            Some(_) => Err(GraphError::NotADelay(write)),
            None => Err(GraphError::NodeNotFound(write)),
        }
    }
}

/// Error when editing a graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("{direction:?} port {index} not found on {node}")]
    PortNotFound {
        /// Node that was addressed
        node: NodeId,
        /// Direction of the missing port
        direction: PortDirection,
        /// Requested index
        index: usize,
    },

    /// Input port is already connected
    #[error("Input {} of {} is already connected", .0.index, .0.node)]
    PortAlreadyConnected(InPort),

    /// The connection would create a cycle
    #[error("Connecting {from} to {to} would create a cycle")]
    Cycle {
        /// Source node
        from: NodeId,
        /// Destination node
        to: NodeId,
    },

    /// Node is not a delay node
    #[error("{0} is not a delay node")]
    NotADelay(NodeId),

    /// Node is not a terminal
    #[error("{0} is not a terminal")]
    NotATerminal(NodeId),

    /// A structural invariant does not hold
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

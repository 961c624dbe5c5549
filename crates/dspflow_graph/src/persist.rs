// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persisted graph format and on-disk store.
//!
//! A graph is stored as a flat record: its name, a node table and a
//! connection table. Nodes are identified by their origin and listed input
//! terminals first, then the other nodes, then output terminals. Delay nodes
//! carry the 1-based index of the write node owning their delay line, 0 for
//! every other node. Connections address nodes and ports by table index.
//!
//! Decoding rebuilds every node through the [`NodeFactory`] and rejects any
//! index outside its table instead of clamping it.

use crate::factory::{FactoryError, Manifest, NodeFactory, SignatureResolver};
use crate::graph::{Graph, GraphError};
use crate::node::{DelayLink, NodeId, Origin};
use crate::port::{InPort, OutPort, PortDirection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// A persisted graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRecord {
    /// Graph name
    pub name: String,
    /// Node table
    pub nodes: Vec<NodeRecord>,
    /// Connection table
    pub connections: Vec<ConnectionRecord>,
}

/// A persisted node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Origin package, empty for built-ins
    pub pkg: String,
    /// Origin name
    pub name: String,
    /// 1-based index of the delay write node, 0 if not a delay
    pub delay_write: u32,
}

/// A persisted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Index of the source node
    pub src_node: u32,
    /// Output port index on the source node
    pub src_port: u32,
    /// Index of the destination node
    pub dst_node: u32,
    /// Input port index on the destination node
    pub dst_port: u32,
}

/// Error when reading or writing graphs
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary encoding error
    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// RON rendering error
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    /// RON parse error
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// A connection references a node outside the node table
    #[error("node index {index} out of range ({len} nodes)")]
    NodeIndexOutOfRange {
        /// Offending index
        index: u32,
        /// Size of the node table
        len: usize,
    },

    /// A connection references a port the node does not have
    #[error("{direction:?} port index {index} of node {node} out of range ({len} ports)")]
    PortIndexOutOfRange {
        /// Node table index
        node: u32,
        /// Direction of the port
        direction: PortDirection,
        /// Offending index
        index: u32,
        /// Number of ports of that direction
        len: usize,
    },

    /// A delay back-reference points outside the node table
    #[error("delay index {index} of node {node} out of range ({len} nodes)")]
    DelayIndexOutOfRange {
        /// Node table index
        node: usize,
        /// Offending 1-based index
        index: u32,
        /// Size of the node table
        len: usize,
    },

    /// A delay back-reference points at something other than a delay write
    #[error("node {node} references node {write}, which is not a delay write")]
    NotADelayWrite {
        /// Node table index
        node: usize,
        /// Referenced node table index
        write: usize,
    },

    /// A node origin could not be rebuilt
    #[error(transparent)]
    Factory(#[from] FactoryError),

    /// Replaying the connection table failed
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Build the persisted record of a graph
pub fn to_record(graph: &Graph) -> GraphRecord {
    let order: Vec<NodeId> = graph.all_nodes().collect();
    let index: HashMap<NodeId, u32> = order
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i as u32))
        .collect();

    let mut record = GraphRecord {
        name: graph.name.clone(),
        ..GraphRecord::default()
    };
    for (i, id) in order.iter().enumerate() {
        let Some(node) = graph.node(*id) else {
            continue;
        };
        let delay_write = match node.delay {
            None => 0,
            Some(DelayLink::Write) => i as u32 + 1,
            Some(DelayLink::Read(write)) => index.get(&write).map_or(0, |w| w + 1),
        };
        record.nodes.push(NodeRecord {
            pkg: node.origin.pkg.clone(),
            name: node.origin.name.clone(),
            delay_write,
        });
        for port in 0..node.inputs.len() {
            let Some(src) = graph.source_of(InPort::new(*id, port)) else {
                continue;
            };
            if let Some(src_node) = index.get(&src.node).copied() {
                record.connections.push(ConnectionRecord {
                    src_node,
                    src_port: src.index as u32,
                    dst_node: i as u32,
                    dst_port: port as u32,
                });
            }
        }
    }
    record
}

/// Rebuild a graph from its persisted record
pub fn from_record(
    record: GraphRecord,
    resolver: &dyn SignatureResolver,
) -> Result<Graph, PersistError> {
    let mut graph = Graph::new(record.name);
    let len = record.nodes.len();
    let mut ids = Vec::with_capacity(len);
    let mut reads = Vec::new();

    for (i, entry) in record.nodes.iter().enumerate() {
        let origin = Origin::new(&entry.pkg, &entry.name);
        let mut node = NodeFactory::build(resolver, &origin)?;
        if entry.delay_write != 0 {
            let write = entry.delay_write as usize - 1;
            if write >= len {
                return Err(PersistError::DelayIndexOutOfRange {
                    node: i,
                    index: entry.delay_write,
                    len,
                });
            }
            if !node.is_delay() {
                return Err(PersistError::NotADelayWrite { node: i, write });
            }
            if write != i {
                // Linked once every write node exists.
                node = NodeFactory::delay_read(NodeId(0));
                node.delay = None;
                reads.push((i, write));
            }
        }
        ids.push(graph.add_node(node)?);
    }

    for (read, write) in reads {
        graph
            .link_delay_read(ids[read], ids[write])
            .map_err(|_| PersistError::NotADelayWrite { node: read, write })?;
    }

    for c in &record.connections {
        let src = node_index(c.src_node, len)?;
        let dst = node_index(c.dst_node, len)?;
        let (src_id, dst_id) = (ids[src], ids[dst]);
        let outputs = graph.node(src_id).map_or(0, |n| n.outputs.len());
        if c.src_port as usize >= outputs {
            return Err(PersistError::PortIndexOutOfRange {
                node: c.src_node,
                direction: PortDirection::Output,
                index: c.src_port,
                len: outputs,
            });
        }
        let inputs = graph.node(dst_id).map_or(0, |n| n.inputs.len());
        if c.dst_port as usize >= inputs {
            return Err(PersistError::PortIndexOutOfRange {
                node: c.dst_node,
                direction: PortDirection::Input,
                index: c.dst_port,
                len: inputs,
            });
        }
        graph.connect(
            OutPort::new(src_id, c.src_port as usize),
            InPort::new(dst_id, c.dst_port as usize),
        )?;
    }

    graph.check_invariants()?;
    Ok(graph)
}

fn node_index(index: u32, len: usize) -> Result<usize, PersistError> {
    if index as usize >= len {
        return Err(PersistError::NodeIndexOutOfRange { index, len });
    }
    Ok(index as usize)
}

/// Encode a graph to bytes
pub fn encode(graph: &Graph) -> Result<Vec<u8>, PersistError> {
    Ok(bincode::serialize(&to_record(graph))?)
}

/// Decode a graph from bytes
pub fn decode(bytes: &[u8], resolver: &dyn SignatureResolver) -> Result<Graph, PersistError> {
    let record: GraphRecord = bincode::deserialize(bytes)?;
    from_record(record, resolver)
}

/// Write a graph to a writer
pub fn write_graph<W: Write>(writer: W, graph: &Graph) -> Result<(), PersistError> {
    bincode::serialize_into(writer, &to_record(graph))?;
    Ok(())
}

/// Read a graph from a reader
pub fn read_graph<R: Read>(
    reader: R,
    resolver: &dyn SignatureResolver,
) -> Result<Graph, PersistError> {
    let record: GraphRecord = bincode::deserialize_from(reader)?;
    from_record(record, resolver)
}

/// Render the persisted record as RON, for inspection
pub fn to_ron(graph: &Graph) -> Result<String, PersistError> {
    let config = ron::ser::PrettyConfig::default()
        .struct_names(true)
        .enumerate_arrays(true);
    Ok(ron::ser::to_string_pretty(&to_record(graph), config)?)
}

/// Rebuild a graph from the RON rendering of its record
pub fn from_ron(text: &str, resolver: &dyn SignatureResolver) -> Result<Graph, PersistError> {
    let record: GraphRecord = ron::from_str(text)?;
    from_record(record, resolver)
}

/// Graphs stored by name in a directory
#[derive(Debug, Clone)]
pub struct GraphStore {
    dir: PathBuf,
    source_dir: PathBuf,
    manifest: Manifest,
}

impl GraphStore {
    /// A store in `dir`, resolving origins through `manifest`
    pub fn new(dir: impl Into<PathBuf>, manifest: Manifest) -> Self {
        let dir = dir.into();
        Self {
            source_dir: dir.clone(),
            dir,
            manifest,
        }
    }

    /// Write generated sources to `dir` instead of the graph directory
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    /// Manifest used to rebuild nodes
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Path of the file holding the graph called `name`
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(Graph::new(name).file_name())
    }

    /// Load a graph by name; a name with no file yet is a new empty graph
    pub fn load(&self, name: &str) -> Result<Graph, PersistError> {
        let path = self.path_for(name);
        if !path.exists() {
            tracing::info!(name, path = %path.display(), "new graph");
            return Ok(Graph::new(name));
        }
        self.load_path(&path)
    }

    /// Load a graph from an explicit path, which must exist
    pub fn load_path(&self, path: &Path) -> Result<Graph, PersistError> {
        let file = File::open(path)?;
        let graph = read_graph(BufReader::new(file), &self.manifest)?;
        tracing::info!(
            name = %graph.name,
            nodes = graph.node_count(),
            connections = graph.connection_count(),
            path = %path.display(),
            "loaded graph"
        );
        Ok(graph)
    }

    /// Save a graph under its own name
    pub fn save(&self, graph: &Graph) -> Result<PathBuf, PersistError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(graph.file_name());
        let mut writer = BufWriter::new(File::create(&path)?);
        write_graph(&mut writer, graph)?;
        writer.flush()?;
        tracing::info!(name = %graph.name, path = %path.display(), "saved graph");
        Ok(path)
    }

    /// Save generated source for a graph
    pub fn save_source(&self, graph: &Graph, source: &str) -> Result<PathBuf, PersistError> {
        std::fs::create_dir_all(&self.source_dir)?;
        let path = self.source_dir.join(graph.source_file_name());
        std::fs::write(&path, source)?;
        tracing::info!(name = %graph.name, path = %path.display(), "saved source");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{DELAY, STDLIB};

    fn connect(graph: &mut Graph, src: NodeId, out: usize, dst: NodeId, port: usize) {
        graph.connect(OutPort::new(src, out), InPort::new(dst, port)).unwrap();
    }

    fn echo() -> Graph {
        let manifest = Manifest::stdlib();
        let mut graph = Graph::new("Echo");
        let x = graph.insert_terminal(PortDirection::Input, 0, "x");
        let y = graph.insert_terminal(PortDirection::Output, 0, "y");
        let write = graph.add_node(NodeFactory::delay()).unwrap();
        let read = graph.add_delay_read(write).unwrap();
        let plus = graph.add_node(NodeFactory::operator("+").unwrap()).unwrap();
        let time = graph.add_node(NodeFactory::constant("0.5").unwrap()).unwrap();
        let tanh = NodeFactory::build(&manifest, &Origin::new(STDLIB, "tanh")).unwrap();
        let tanh = graph.add_node(tanh).unwrap();
        connect(&mut graph, time, 0, read, 0);
        connect(&mut graph, time, 0, write, 0);
        connect(&mut graph, x, 0, plus, 0);
        connect(&mut graph, read, 0, plus, 1);
        connect(&mut graph, plus, 0, tanh, 0);
        connect(&mut graph, tanh, 0, write, 1);
        connect(&mut graph, tanh, 0, y, 0);
        graph
    }

    fn record(nodes: &[(&str, &str, u32)], connections: &[[u32; 4]]) -> Vec<u8> {
        let record = GraphRecord {
            name: "Bad".to_string(),
            nodes: nodes
                .iter()
                .map(|(pkg, name, delay_write)| NodeRecord {
                    pkg: (*pkg).to_string(),
                    name: (*name).to_string(),
                    delay_write: *delay_write,
                })
                .collect(),
            connections: connections
                .iter()
                .map(|[src_node, src_port, dst_node, dst_port]| ConnectionRecord {
                    src_node: *src_node,
                    src_port: *src_port,
                    dst_node: *dst_node,
                    dst_port: *dst_port,
                })
                .collect(),
        };
        bincode::serialize(&record).unwrap()
    }

    #[test]
    fn test_roundtrip_preserves_structure() {
        let graph = echo();
        let bytes = encode(&graph).unwrap();
        let loaded = decode(&bytes, &Manifest::stdlib()).unwrap();

        assert_eq!(loaded.name, "Echo");
        assert_eq!(loaded.node_count(), graph.node_count());
        assert_eq!(loaded.connection_count(), graph.connection_count());
        assert_eq!(loaded.in_ports().len(), 1);
        assert_eq!(loaded.out_ports().len(), 1);
        assert_eq!(encode(&loaded).unwrap(), bytes);
        loaded.check_invariants().unwrap();

        let write = loaded
            .body()
            .iter()
            .copied()
            .find(|id| loaded.node(*id).is_some_and(|n| n.is_delay_write()))
            .unwrap();
        assert_eq!(loaded.delay_reads_of(write).len(), 1);
    }

    #[test]
    fn test_record_layout() {
        let record = to_record(&echo());
        let names: Vec<&str> = record.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["in-x", DELAY, DELAY, "+", "0.5", "tanh", "out-y"]);
        let delays: Vec<u32> = record.nodes.iter().map(|n| n.delay_write).collect();
        assert_eq!(delays, vec![0, 2, 2, 0, 0, 0, 0]);
        assert_eq!(record.connections.len(), 7);
    }

    #[test]
    fn test_port_index_equal_to_count_rejected() {
        // The output terminal has exactly one input, so index 1 is one past it.
        let bytes = record(&[("", "in-x", 0), ("", "out-y", 0)], &[[0, 0, 1, 1]]);
        let err = decode(&bytes, &Manifest::stdlib()).unwrap_err();
        assert!(matches!(
            err,
            PersistError::PortIndexOutOfRange {
                direction: PortDirection::Input,
                index: 1,
                len: 1,
                ..
            }
        ));

        let bytes = record(&[("", "in-x", 0), ("", "out-y", 0)], &[[0, 1, 1, 0]]);
        let err = decode(&bytes, &Manifest::stdlib()).unwrap_err();
        assert!(matches!(
            err,
            PersistError::PortIndexOutOfRange {
                direction: PortDirection::Output,
                ..
            }
        ));
    }

    #[test]
    fn test_node_index_out_of_range() {
        let bytes = record(&[("", "in-x", 0), ("", "out-y", 0)], &[[0, 0, 2, 0]]);
        let err = decode(&bytes, &Manifest::stdlib()).unwrap_err();
        assert!(matches!(err, PersistError::NodeIndexOutOfRange { index: 2, len: 2 }));
    }

    #[test]
    fn test_bad_delay_references() {
        let bytes = record(&[(STDLIB, DELAY, 1), (STDLIB, DELAY, 3)], &[]);
        let err = decode(&bytes, &Manifest::stdlib()).unwrap_err();
        assert!(matches!(err, PersistError::DelayIndexOutOfRange { node: 1, index: 3, .. }));

        let bytes = record(&[("", "+", 0), (STDLIB, DELAY, 1)], &[]);
        let err = decode(&bytes, &Manifest::stdlib()).unwrap_err();
        assert!(matches!(err, PersistError::NotADelayWrite { node: 1, write: 0 }));

        let bytes = record(&[("", "+", 1)], &[]);
        let err = decode(&bytes, &Manifest::stdlib()).unwrap_err();
        assert!(matches!(err, PersistError::NotADelayWrite { node: 0, write: 0 }));
    }

    #[test]
    fn test_unknown_origin_fails_whole_load() {
        let bytes = record(&[("nowhere", "thing", 0)], &[]);
        let err = decode(&bytes, &Manifest::stdlib()).unwrap_err();
        assert!(matches!(err, PersistError::Factory(FactoryError::UnknownNode(_))));
    }

    #[test]
    fn test_fan_in_in_table_rejected() {
        let bytes = record(
            &[("", "in-a", 0), ("", "in-b", 0), ("", "out-y", 0)],
            &[[0, 0, 2, 0], [1, 0, 2, 0]],
        );
        let err = decode(&bytes, &Manifest::stdlib()).unwrap_err();
        assert!(matches!(err, PersistError::Graph(GraphError::PortAlreadyConnected(_))));
    }

    #[test]
    fn test_ron_dump() {
        let text = to_ron(&echo()).unwrap();
        assert!(text.contains("GraphRecord"));
        assert!(text.contains("\"Echo\""));
        assert!(text.contains("\"tanh\""));

        let parsed = from_ron(&text, &Manifest::stdlib()).unwrap();
        assert_eq!(encode(&parsed).unwrap(), encode(&echo()).unwrap());
    }

    #[test]
    fn test_store_missing_name_is_new_graph() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::new(dir.path(), Manifest::stdlib());
        let graph = store.load("Fresh").unwrap();
        assert_eq!(graph.name, "Fresh");
        assert!(graph.is_empty());
    }

    #[test]
    fn test_store_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::new(dir.path(), Manifest::stdlib());
        let err = store.load_path(&dir.path().join("gone.dsp")).unwrap_err();
        assert!(matches!(err, PersistError::Io(_)));
    }

    #[test]
    fn test_store_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::new(dir.path(), Manifest::stdlib());
        let graph = echo();
        let path = store.save(&graph).unwrap();
        assert_eq!(path, dir.path().join("echo.dsp"));

        let loaded = store.load("Echo").unwrap();
        assert_eq!(encode(&loaded).unwrap(), encode(&graph).unwrap());

        let out = dir.path().join("gen");
        let store = store.with_source_dir(&out);
        let path = store.save_source(&graph, "// empty\n").unwrap();
        assert_eq!(path, out.join("echo.rs"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "// empty\n");
    }
}

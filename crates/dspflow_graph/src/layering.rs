// SPDX-License-Identifier: MIT OR Apache-2.0
//! Layer assignment.
//!
//! Every node gets an integer layer such that each connection points from a
//! lower layer to a strictly higher one. Layers are computed as longest paths
//! back from the sinks, graph-level input terminals are pinned to their own
//! first layer and output terminals to their own last layer, and each layer
//! is given a canonical, deterministic order.

use crate::graph::Graph;
use crate::node::NodeId;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Result of layer assignment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layering {
    /// Nodes of each layer, in canonical order
    pub layers: Vec<Vec<NodeId>>,
    /// Layer of each node
    pub node_layers: HashMap<NodeId, usize>,
}

impl Layering {
    /// Layer of a node
    pub fn layer_of(&self, node: NodeId) -> Option<usize> {
        self.node_layers.get(&node).copied()
    }

    /// Number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether there are no layers
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Nodes in layer order
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.layers.iter().flatten().copied()
    }
}

/// Assign a layer to every node of the graph
pub fn assign_layers(graph: &Graph) -> Layering {
    let all: Vec<NodeId> = graph.all_nodes().collect();
    if all.is_empty() {
        return Layering::default();
    }

    let sinks: Vec<NodeId> = all
        .iter()
        .copied()
        .filter(|id| {
            graph
                .node(*id)
                .is_some_and(|n| n.outputs.iter().all(|p| !p.is_connected()))
        })
        .collect();

    let mut rank: HashMap<NodeId, i64> = HashMap::with_capacity(all.len());
    let mut first = 0;
    for sink in &sinks {
        propagate(graph, *sink, 0, &mut rank, &mut first);
    }
    let num_layers = 1 - first;

    // Sinks trail their own inputs rather than all collapsing onto layer 0.
    for sink in &sinks {
        let prev = graph
            .predecessors(*sink)
            .iter()
            .filter_map(|p| rank.get(p).copied())
            .max()
            .unwrap_or(first - 1);
        let layer = if prev < first {
            first + num_layers / 2
        } else {
            prev + 1
        };
        rank.insert(*sink, layer);
    }

    pin_terminals(graph, &all, &mut rank, graph.in_ports(), first, first - 1);
    pin_terminals(graph, &all, &mut rank, graph.out_ports(), 0, 1);

    // Normalize to start at 0 and drop layers left empty by pinning.
    let used: BTreeSet<i64> = rank.values().copied().collect();
    let dense: HashMap<i64, usize> = used.iter().enumerate().map(|(i, l)| (*l, i)).collect();
    let node_layers: HashMap<NodeId, usize> =
        rank.iter().map(|(n, l)| (*n, dense[l])).collect();

    let mut layers = vec![Vec::new(); used.len()];
    for id in &all {
        layers[node_layers[id]].push(*id);
    }
    canonical_order(graph, &mut layers, &node_layers);

    tracing::trace!(nodes = all.len(), layers = layers.len(), "assigned layers");
    Layering {
        layers,
        node_layers,
    }
}

/// Move a terminal group to `layer` if it already holds that layer alone,
/// otherwise to the fresh layer next to it.
///
/// Constants have no inputs and may share the input terminals' layer.
fn pin_terminals(
    graph: &Graph,
    all: &[NodeId],
    rank: &mut HashMap<NodeId, i64>,
    ports: &[NodeId],
    layer: i64,
    fresh: i64,
) {
    if ports.is_empty() {
        return;
    }
    let inputs = ports.first().and_then(|id| graph.node(*id)).is_some_and(|n| n.is_input_terminal());
    let ports_in_layer = ports.iter().filter(|n| rank[*n] == layer).count();
    let nodes_in_layer = all
        .iter()
        .filter(|n| rank[*n] == layer)
        .filter(|n| !(inputs && graph.node(**n).is_some_and(|node| node.is_constant())))
        .count();
    let target = if ports_in_layer == nodes_in_layer { layer } else { fresh };
    for port in ports {
        rank.insert(*port, target);
    }
}

/// Push `layer` upstream from `node`, keeping for every node the lowest
/// layer implied by any downstream path.
fn propagate(
    graph: &Graph,
    node: NodeId,
    layer: i64,
    rank: &mut HashMap<NodeId, i64>,
    first: &mut i64,
) {
    if rank.get(&node).is_some_and(|current| *current <= layer) {
        return;
    }
    rank.insert(node, layer);
    for pred in graph.predecessors(node) {
        propagate(graph, pred, layer - 1, rank, first);
    }
    *first = (*first).min(layer);
}

/// Sort each layer into its canonical order.
///
/// Terminals keep their declared order at the front of their layer. The
/// other nodes are ordered by name, arity, and then by where their inputs
/// come from, so that the result depends only on the graph structure.
fn canonical_order(graph: &Graph, layers: &mut [Vec<NodeId>], node_layers: &HashMap<NodeId, usize>) {
    let mut positions: HashMap<NodeId, usize> = HashMap::new();
    for group in [graph.in_ports(), graph.out_ports()] {
        for (i, id) in group.iter().enumerate() {
            positions.insert(*id, i);
        }
    }

    for layer in layers.iter_mut() {
        let (mut terminals, mut rest): (Vec<NodeId>, Vec<NodeId>) = layer
            .iter()
            .partition(|id| graph.node(**id).is_some_and(|n| n.is_terminal()));
        terminals.sort_by_key(|id| {
            let node = graph.node(*id);
            (node.is_some_and(|n| n.is_output_terminal()), positions.get(id).copied())
        });
        rest.sort_by(|a, b| compare_nodes(graph, *a, *b, node_layers, &positions));

        layer.clear();
        layer.extend(terminals);
        layer.extend(rest);
        for (i, id) in layer.iter().enumerate() {
            positions.insert(*id, i);
        }
    }
}

fn compare_nodes(
    graph: &Graph,
    a: NodeId,
    b: NodeId,
    node_layers: &HashMap<NodeId, usize>,
    positions: &HashMap<NodeId, usize>,
) -> Ordering {
    let (Some(n1), Some(n2)) = (graph.node(a), graph.node(b)) else {
        return Ordering::Equal;
    };
    let layer = |id: NodeId| node_layers.get(&id).copied();
    let position = |id: NodeId| positions.get(&id).copied().unwrap_or(0);

    let by_shape = n1
        .name()
        .cmp(n2.name())
        .then(n1.inputs.len().cmp(&n2.inputs.len()))
        .then(n1.outputs.len().cmp(&n2.outputs.len()));
    if by_shape != Ordering::Equal {
        return by_shape;
    }

    for (p1, p2) in n1.inputs.iter().zip(&n2.inputs) {
        let by_count = p1.connections().len().cmp(&p2.connections().len());
        if by_count != Ordering::Equal {
            return by_count;
        }
        for (c1, c2) in p1.connections().iter().zip(p2.connections()) {
            let (Some(c1), Some(c2)) = (graph.connection(*c1), graph.connection(*c2)) else {
                continue;
            };
            let by_source = layer(c1.src.node)
                .cmp(&layer(c2.src.node))
                .then(position(c1.src.node).cmp(&position(c2.src.node)))
                .then(c1.src.index.cmp(&c2.src.index));
            if by_source != Ordering::Equal {
                return by_source;
            }
        }
    }

    for (p1, p2) in n1.outputs.iter().zip(&n2.outputs) {
        let by_count = p1.connections().len().cmp(&p2.connections().len());
        if by_count != Ordering::Equal {
            return by_count;
        }
        for (c1, c2) in p1.connections().iter().zip(p2.connections()) {
            let (Some(c1), Some(c2)) = (graph.connection(*c1), graph.connection(*c2)) else {
                continue;
            };
            let by_target = layer(c1.dst.node).cmp(&layer(c2.dst.node));
            if by_target != Ordering::Equal {
                return by_target;
            }
        }
    }
    Ordering::Equal
}

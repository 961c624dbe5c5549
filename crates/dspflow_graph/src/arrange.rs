// SPDX-License-Identifier: MIT OR Apache-2.0
//! Arrangement and crossing minimization.
//!
//! Connections spanning more than one layer are routed through virtual
//! pass-through nodes, one per intermediate layer, so that every drawn edge
//! hops exactly one layer. The nodes of each movable layer are then reordered
//! to reduce the number of edge crossings between adjacent layers.
//!
//! Terminal layers are never reordered: the order of input and output
//! terminals is the parameter and result order of the graph.

use crate::connection::ConnectionId;
use crate::graph::Graph;
use crate::layering::{assign_layers, Layering};
use crate::node::NodeId;
use crate::port::{InPort, OutPort};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Above this many candidate orderings the exhaustive search falls back to
/// local search.
pub const EXHAUSTIVE_LIMIT: u64 = 40_320;

/// How to search for a low-crossing ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CrossingStrategy {
    /// Randomized pairwise swaps with a fixed seed
    #[default]
    LocalSearch,
    /// Try every ordering of every movable layer (tiny graphs only)
    Exhaustive,
}

/// Arrangement settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrangeConfig {
    /// Search strategy
    pub strategy: CrossingStrategy,
    /// Swap attempts for local search
    pub iterations: usize,
    /// Seed of the local search random sequence
    pub seed: u64,
}

impl Default for ArrangeConfig {
    fn default() -> Self {
        Self {
            strategy: CrossingStrategy::LocalSearch,
            iterations: 1000,
            seed: 1,
        }
    }
}

/// Identifier of a virtual routing node within an [`Arrangement`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualId(pub u32);

/// An entry in an arranged layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// A real graph node
    Node(NodeId),
    /// A routing placeholder with one input and one output
    Virtual(VirtualId),
}

/// A routing placeholder standing in for one layer of a long connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualNode {
    /// The connection being routed
    pub connection: ConnectionId,
    /// Layer the placeholder occupies
    pub layer: usize,
}

/// The path of a long connection: its true endpoints and the placeholders
/// it passes through, in layer order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Original source port
    pub src: OutPort,
    /// Original destination port
    pub dst: InPort,
    /// Placeholders from the layer after `src` up to the layer before `dst`
    pub via: Vec<VirtualId>,
}

/// Ordered layers ready for drawing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Arrangement {
    /// Slots of each layer, top to bottom
    pub layers: Vec<Vec<Slot>>,
    /// Layer of each real node
    pub node_layers: HashMap<NodeId, usize>,
    /// Placeholders, indexed by [`VirtualId`]
    pub virtual_nodes: Vec<VirtualNode>,
    /// Routes of the connections that span more than one layer
    pub routes: IndexMap<ConnectionId, Route>,
    /// Crossings of the canonical ordering
    pub initial_crossings: usize,
    /// Crossings of the final ordering
    pub crossings: usize,
}

impl Arrangement {
    /// Real nodes in layer order, skipping placeholders
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.layers.iter().flatten().filter_map(|slot| match slot {
            Slot::Node(id) => Some(*id),
            Slot::Virtual(_) => None,
        })
    }

    /// Look up a placeholder
    pub fn virtual_node(&self, id: VirtualId) -> Option<&VirtualNode> {
        self.virtual_nodes.get(id.0 as usize)
    }

    /// Route of a long connection
    pub fn route(&self, connection: ConnectionId) -> Option<&Route> {
        self.routes.get(&connection)
    }

    /// Count crossings of the current layer order
    pub fn count_crossings(&self, graph: &Graph) -> usize {
        let router = Router::new(graph, self);
        (0..self.layers.len().saturating_sub(1))
            .map(|b| router.crossings_at(&self.layers, b))
            .sum()
    }
}

/// Layer and arrange a graph
pub fn arrange(graph: &Graph, config: &ArrangeConfig) -> Arrangement {
    arrange_layers(graph, assign_layers(graph), config)
}

/// Arrange an existing layering
pub fn arrange_layers(graph: &Graph, layering: Layering, config: &ArrangeConfig) -> Arrangement {
    let Layering {
        layers,
        node_layers,
    } = layering;
    let mut arrangement = Arrangement {
        layers: layers
            .into_iter()
            .map(|layer| layer.into_iter().map(Slot::Node).collect())
            .collect(),
        node_layers,
        ..Arrangement::default()
    };
    insert_virtual_nodes(graph, &mut arrangement);

    let router = Router::new(graph, &arrangement);
    let movable = movable_layers(graph, &arrangement.layers);
    let initial = router.total(&arrangement.layers);
    arrangement.initial_crossings = initial;

    let strategy = match config.strategy {
        CrossingStrategy::Exhaustive
            if orderings(&arrangement.layers, &movable) > EXHAUSTIVE_LIMIT =>
        {
            tracing::warn!(
                limit = EXHAUSTIVE_LIMIT,
                "too many orderings for exhaustive search, using local search"
            );
            CrossingStrategy::LocalSearch
        }
        strategy => strategy,
    };
    arrangement.crossings = match strategy {
        CrossingStrategy::LocalSearch => {
            local_search(&router, &mut arrangement.layers, &movable, initial, config)
        }
        CrossingStrategy::Exhaustive => exhaustive(&router, &mut arrangement.layers, &movable, initial),
    };

    tracing::debug!(
        layers = arrangement.layers.len(),
        virtual_nodes = arrangement.virtual_nodes.len(),
        initial = arrangement.initial_crossings,
        crossings = arrangement.crossings,
        "arranged graph"
    );
    arrangement
}

fn insert_virtual_nodes(graph: &Graph, arrangement: &mut Arrangement) {
    for connection in graph.connections() {
        let (Some(&from), Some(&to)) = (
            arrangement.node_layers.get(&connection.src.node),
            arrangement.node_layers.get(&connection.dst.node),
        ) else {
            continue;
        };
        if to <= from + 1 {
            continue;
        }
        let mut via = Vec::with_capacity(to - from - 1);
        for layer in from + 1..to {
            let id = VirtualId(arrangement.virtual_nodes.len() as u32);
            arrangement.virtual_nodes.push(VirtualNode {
                connection: connection.id,
                layer,
            });
            arrangement.layers[layer].push(Slot::Virtual(id));
            via.push(id);
        }
        arrangement.routes.insert(
            connection.id,
            Route {
                src: connection.src,
                dst: connection.dst,
                via,
            },
        );
    }
}

/// Layers whose order may change: not a terminal layer, at least two slots
fn movable_layers(graph: &Graph, layers: &[Vec<Slot>]) -> Vec<usize> {
    let last = layers.len().saturating_sub(1);
    (0..layers.len())
        .filter(|l| !(*l == 0 && !graph.in_ports().is_empty()))
        .filter(|l| !(*l == last && !graph.out_ports().is_empty()))
        .filter(|l| layers[*l].len() > 1)
        .collect()
}

fn orderings(layers: &[Vec<Slot>], movable: &[usize]) -> u64 {
    movable.iter().fold(1u64, |acc, l| {
        (1..=layers[*l].len() as u64).fold(acc, u64::saturating_mul)
    })
}

/// One single-layer edge segment: (slot, port index) at both ends
#[derive(Debug, Clone, Copy)]
struct Hop {
    src: (Slot, usize),
    dst: (Slot, usize),
}

/// Edge segments grouped by the layer boundary they cross
struct Router<'a> {
    graph: &'a Graph,
    boundaries: Vec<Vec<Hop>>,
}

impl<'a> Router<'a> {
    fn new(graph: &'a Graph, arrangement: &Arrangement) -> Self {
        let mut boundaries = vec![Vec::new(); arrangement.layers.len().saturating_sub(1)];
        for connection in graph.connections() {
            let Some(&from) = arrangement.node_layers.get(&connection.src.node) else {
                continue;
            };
            let mut prev = (Slot::Node(connection.src.node), connection.src.index);
            if let Some(route) = arrangement.routes.get(&connection.id) {
                for (i, v) in route.via.iter().enumerate() {
                    let next = (Slot::Virtual(*v), 0);
                    boundaries[from + i].push(Hop { src: prev, dst: next });
                    prev = next;
                }
            }
            let hops = arrangement
                .routes
                .get(&connection.id)
                .map_or(0, |r| r.via.len());
            if let Some(boundary) = boundaries.get_mut(from + hops) {
                boundary.push(Hop {
                    src: prev,
                    dst: (Slot::Node(connection.dst.node), connection.dst.index),
                });
            }
        }
        Self { graph, boundaries }
    }

    fn arity(&self, slot: Slot, outputs: bool) -> usize {
        match slot {
            Slot::Virtual(_) => 1,
            Slot::Node(id) => self.graph.node(id).map_or(0, |n| {
                if outputs {
                    n.outputs.len()
                } else {
                    n.inputs.len()
                }
            }),
        }
    }

    /// Rank of every port of a layer, counting ports top to bottom
    fn port_offsets(&self, layer: &[Slot], outputs: bool) -> HashMap<Slot, usize> {
        let mut offset = 0;
        layer
            .iter()
            .map(|slot| {
                let start = offset;
                offset += self.arity(*slot, outputs);
                (*slot, start)
            })
            .collect()
    }

    /// Inversions between the source order and the destination order of
    /// the segments crossing boundary `b`
    fn crossings_at(&self, layers: &[Vec<Slot>], b: usize) -> usize {
        let Some(hops) = self.boundaries.get(b) else {
            return 0;
        };
        let src = self.port_offsets(&layers[b], true);
        let dst = self.port_offsets(&layers[b + 1], false);
        let ends: Vec<(i64, i64)> = hops
            .iter()
            .filter_map(|h| {
                let s = src.get(&h.src.0)? + h.src.1;
                let d = dst.get(&h.dst.0)? + h.dst.1;
                Some((s as i64, d as i64))
            })
            .collect();

        let mut crossings = 0;
        for (i, (s1, d1)) in ends.iter().enumerate() {
            for (s2, d2) in &ends[i + 1..] {
                if (s1 - s2) * (d1 - d2) < 0 {
                    crossings += 1;
                }
            }
        }
        crossings
    }

    /// Crossings on both sides of layer `l`
    fn around(&self, layers: &[Vec<Slot>], l: usize) -> usize {
        let before = if l > 0 { self.crossings_at(layers, l - 1) } else { 0 };
        before + self.crossings_at(layers, l)
    }

    fn total(&self, layers: &[Vec<Slot>]) -> usize {
        (0..self.boundaries.len()).map(|b| self.crossings_at(layers, b)).sum()
    }
}

/// Random pairwise swaps within movable layers, keeping every swap that
/// does not add crossings
fn local_search(
    router: &Router<'_>,
    layers: &mut [Vec<Slot>],
    movable: &[usize],
    initial: usize,
    config: &ArrangeConfig,
) -> usize {
    let mut total = initial;
    if movable.is_empty() || total == 0 {
        return total;
    }
    let mut rng = StdRng::seed_from_u64(config.seed);
    for _ in 0..config.iterations {
        let l = movable[rng.random_range(0..movable.len())];
        let n = layers[l].len();
        let i = rng.random_range(0..n);
        let j = rng.random_range(0..n);
        if i == j {
            continue;
        }
        let before = router.around(layers, l);
        layers[l].swap(i, j);
        let after = router.around(layers, l);
        if after > before {
            layers[l].swap(i, j);
        } else {
            total = total - before + after;
        }
    }
    total
}

/// Every ordering of every movable layer, keeping the first best one
fn exhaustive(
    router: &Router<'_>,
    layers: &mut [Vec<Slot>],
    movable: &[usize],
    initial: usize,
) -> usize {
    let original: Vec<Vec<Slot>> = movable.iter().map(|l| layers[*l].clone()).collect();
    let mut perms: Vec<Vec<usize>> = original.iter().map(|l| (0..l.len()).collect()).collect();
    let mut best = perms.clone();
    let mut min = initial;

    let apply = |layers: &mut [Vec<Slot>], perms: &[Vec<usize>]| {
        for ((l, perm), slots) in movable.iter().zip(perms).zip(&original) {
            layers[*l] = perm.iter().map(|i| slots[*i]).collect();
        }
    };

    'odometer: loop {
        apply(layers, &perms);
        let crossings = router.total(layers);
        if crossings < min {
            min = crossings;
            best.clone_from(&perms);
        }
        for perm in perms.iter_mut() {
            if next_permutation(perm) {
                continue 'odometer;
            }
        }
        break;
    }
    apply(layers, &best);
    min
}

/// Advance to the next lexicographic permutation, resetting to the first
/// one and returning `false` after the last
fn next_permutation(perm: &mut [usize]) -> bool {
    let Some(i) = (1..perm.len()).rev().find(|&i| perm[i - 1] < perm[i]) else {
        perm.reverse();
        return false;
    };
    let pivot = i - 1;
    let Some(j) = (i..perm.len()).rev().find(|&j| perm[j] > perm[pivot]) else {
        return false;
    };
    perm.swap(pivot, j);
    perm[i..].reverse();
    true
}

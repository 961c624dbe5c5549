// SPDX-License-Identifier: MIT OR Apache-2.0
//! Signal-processing dataflow graphs.
//!
//! This crate provides the graph model and the passes that turn a graph into
//! something usable:
//! - Layer assignment and crossing minimization for drawing
//! - Rust source generation, including stateful nodes and delay feedback
//! - A compact binary file format
//!
//! ## Architecture
//!
//! The framework is built on a small graph model with:
//! - Typed input/output ports
//! - Connection validation (single source per input, no cycles)
//! - Node construction from capability descriptors
//! - Delay write/read nodes sharing one delay line

pub mod node;
pub mod port;
pub mod connection;
pub mod graph;
pub mod factory;
pub mod layering;
pub mod arrange;
pub mod codegen;
pub mod persist;

pub use node::{DelayLink, Node, NodeId, Origin};
pub use port::{InPort, OutPort, Port, PortDirection};
pub use connection::{Connection, ConnectionId};
pub use graph::{Graph, GraphError};
pub use factory::{Capability, FactoryError, Manifest, NodeFactory, SignatureResolver};
pub use layering::{assign_layers, Layering};
pub use arrange::{arrange, ArrangeConfig, Arrangement, CrossingStrategy, Slot};
pub use codegen::{generate, generate_source, CodegenError};
pub use persist::{GraphStore, PersistError};

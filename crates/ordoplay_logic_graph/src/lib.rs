// SPDX-License-Identifier: MIT OR Apache-2.0
//! Logic graph container for `OrdoPlay` node-based tools.
//!
//! This crate provides the domain-independent half of the material graph:
//! - Typed connectors (`Float`, `Vec2`, `Vec3`, `Vec4`) with enable flags
//! - Nodes keyed by a monotonically increasing [`NodeKey`]
//! - Edges stored on the consuming input, at most one per input
//! - Cycle-free connection, dependency ordering and structural validation
//!
//! ## Architecture
//!
//! [`LogicGraph`] is generic over the node payload. Domain crates plug in
//! their node catalogue through [`LogicNodeData`] and build on the
//! structural guarantees provided here.

pub mod connector;
pub mod diagnostics;
pub mod graph;
pub mod node;

pub use connector::{ConnectorId, ConnectorShape, ConnectorType, Edge, InputConnector, OutputConnector};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use graph::{ConnectionError, CycleError, GraphError, LogicGraph};
pub use node::{LogicNodeData, Node, NodeKey};

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph container.

use crate::connector::{ConnectorId, InputConnector, OutputConnector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Graph-unique identifier for a node, assigned on insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(pub u32);

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Domain payload stored on every node of a [`LogicGraph`](crate::LogicGraph)
pub trait LogicNodeData {
    /// Stable name of the node's type, used in diagnostics and for
    /// single-instance checks
    fn type_name(&self) -> &'static str;

    /// Whether at most one node of this type may exist in a graph
    fn is_unique(&self) -> bool {
        false
    }
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node<T> {
    key: NodeKey,
    /// Position in the editor canvas
    pub position: [f32; 2],
    /// Draw order in the editor canvas
    #[serde(default)]
    pub z_order: i32,
    inputs: Vec<InputConnector>,
    outputs: Vec<OutputConnector>,
    /// Domain payload
    pub data: T,
}

impl<T> Node<T> {
    /// Create a node that is not yet part of a graph.
    ///
    /// The key is only meaningful once the graph assigns it, except for
    /// nodes inserted through [`LogicGraph::insert_node`](crate::LogicGraph::insert_node).
    pub fn new(
        key: NodeKey,
        data: T,
        inputs: Vec<InputConnector>,
        outputs: Vec<OutputConnector>,
    ) -> Self {
        Self {
            key,
            position: [0.0, 0.0],
            z_order: 0,
            inputs,
            outputs,
            data,
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Key of this node
    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// All input connectors
    pub fn inputs(&self) -> &[InputConnector] {
        &self.inputs
    }

    /// All output connectors
    pub fn outputs(&self) -> &[OutputConnector] {
        &self.outputs
    }

    /// Get an input connector by ID
    pub fn input(&self, id: ConnectorId) -> Option<&InputConnector> {
        self.inputs.get(id.index())
    }

    /// Get an output connector by ID
    pub fn output(&self, id: ConnectorId) -> Option<&OutputConnector> {
        self.outputs.get(id.index())
    }

    /// Iterate over `(id, connector)` pairs of the inputs
    pub fn inputs_with_ids(&self) -> impl Iterator<Item = (ConnectorId, &InputConnector)> {
        self.inputs
            .iter()
            .enumerate()
            .map(|(i, c)| (connector_id(i), c))
    }

    /// Iterate over `(id, connector)` pairs of the outputs
    pub fn outputs_with_ids(&self) -> impl Iterator<Item = (ConnectorId, &OutputConnector)> {
        self.outputs
            .iter()
            .enumerate()
            .map(|(i, c)| (connector_id(i), c))
    }

    pub(crate) fn set_key(&mut self, key: NodeKey) {
        self.key = key;
    }

    pub(crate) fn inputs_mut(&mut self) -> &mut [InputConnector] {
        &mut self.inputs
    }

    pub(crate) fn outputs_mut(&mut self) -> &mut [OutputConnector] {
        &mut self.outputs
    }

    pub(crate) fn replace_connectors(
        &mut self,
        inputs: Vec<InputConnector>,
        outputs: Vec<OutputConnector>,
    ) {
        self.inputs = inputs;
        self.outputs = outputs;
    }
}

// Connector lists are built from small static tables; u16 is plenty.
fn connector_id(index: usize) -> ConnectorId {
    ConnectorId(u16::try_from(index).unwrap_or(u16::MAX))
}

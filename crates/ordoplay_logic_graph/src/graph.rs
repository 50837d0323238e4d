// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure owning nodes and the edges between them.
//!
//! Edges are stored on the consuming input connector, so an input has at
//! most one producer while an output may fan out to any number of consumers.

use crate::connector::{ConnectorId, ConnectorShape, ConnectorType, Edge, InputConnector, OutputConnector};
use crate::diagnostics::Diagnostics;
use crate::node::{LogicNodeData, Node, NodeKey};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;

/// A directed acyclic node graph
#[derive(Debug, Clone, PartialEq)]
pub struct LogicGraph<T> {
    /// Nodes in insertion order
    nodes: IndexMap<NodeKey, Node<T>>,
    /// Next key handed out by [`LogicGraph::add_node`]
    next_key: u32,
}

impl<T> LogicGraph<T> {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            next_key: 0,
        }
    }

    /// Create a graph holding a single node under the key it carries
    pub fn with_node(node: Node<T>) -> Self {
        let key = node.key();
        let mut nodes = IndexMap::new();
        nodes.insert(key, node);
        Self {
            nodes,
            next_key: key.0.saturating_add(1),
        }
    }

    /// Rebuild a graph from deserialized nodes, keeping their keys
    pub fn from_nodes(next_key: u32, nodes: Vec<Node<T>>) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        graph.next_key = next_key;
        for node in nodes {
            graph.insert_node(node)?;
        }
        Ok(graph)
    }

    /// Add a node, assigning it the next free key
    pub fn add_node(
        &mut self,
        data: T,
        inputs: Vec<InputConnector>,
        outputs: Vec<OutputConnector>,
        position: [f32; 2],
    ) -> Result<NodeKey, GraphError>
    where
        T: LogicNodeData,
    {
        if data.is_unique() && self.nodes.values().any(|n| n.data.type_name() == data.type_name()) {
            return Err(GraphError::UniqueNodeExists(data.type_name()));
        }

        let key = self.allocate_key();
        let mut node = Node::new(key, data, inputs, outputs);
        node.position = position;
        self.nodes.insert(key, node);
        tracing::debug!(%key, "Added node");
        Ok(key)
    }

    /// Insert a node under the key it already carries.
    ///
    /// Used when restoring a saved graph or placing nodes with pinned keys;
    /// single-instance rules are left to the caller.
    pub fn insert_node(&mut self, node: Node<T>) -> Result<NodeKey, GraphError> {
        let key = node.key();
        if self.nodes.contains_key(&key) {
            return Err(GraphError::DuplicateKey(key));
        }
        self.next_key = self.next_key.max(key.0.saturating_add(1));
        self.nodes.insert(key, node);
        Ok(key)
    }

    fn allocate_key(&mut self) -> NodeKey {
        while self.nodes.contains_key(&NodeKey(self.next_key)) {
            self.next_key += 1;
        }
        let key = NodeKey(self.next_key);
        self.next_key += 1;
        key
    }

    /// Remove a node and every edge touching it
    pub fn remove_node(&mut self, key: NodeKey) -> Option<Node<T>> {
        if !self.disconnect_node(key) {
            return None;
        }
        tracing::debug!(%key, "Removed node");
        self.nodes.shift_remove(&key)
    }

    /// Get a node by key
    pub fn node(&self, key: NodeKey) -> Option<&Node<T>> {
        self.nodes.get(&key)
    }

    /// Get a mutable node by key
    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut Node<T>> {
        self.nodes.get_mut(&key)
    }

    /// Whether a node with this key exists
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// Get all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node<T>> {
        self.nodes.values()
    }

    /// Get all node keys in insertion order
    pub fn node_keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Key the next [`LogicGraph::add_node`] call will try first
    pub fn next_key(&self) -> u32 {
        self.next_key
    }

    /// Connect a producer output to a consumer input.
    ///
    /// Re-requesting an existing connection is a no-op.
    pub fn connect(
        &mut self,
        consumer: NodeKey,
        input: ConnectorId,
        producer: NodeKey,
        output: ConnectorId,
    ) -> Result<(), ConnectionError> {
        let consumer_node = self
            .nodes
            .get(&consumer)
            .ok_or(ConnectionError::NodeNotFound(consumer))?;
        let producer_node = self
            .nodes
            .get(&producer)
            .ok_or(ConnectionError::NodeNotFound(producer))?;

        let target = consumer_node.input(input).ok_or(ConnectionError::InputNotFound {
            node: consumer,
            input,
        })?;
        let source = producer_node.output(output).ok_or(ConnectionError::OutputNotFound {
            node: producer,
            output,
        })?;

        let edge = Edge::new(producer, output);
        if target.link() == Some(edge) {
            return Ok(());
        }

        if consumer == producer {
            return Err(ConnectionError::SelfLoop);
        }

        if !target.is_enabled() || !source.is_enabled() {
            return Err(ConnectionError::DisabledConnector);
        }

        if !source.ty().can_connect_to(target.ty()) {
            return Err(ConnectionError::IncompatibleTypes {
                output: source.ty(),
                input: target.ty(),
            });
        }

        if target.is_connected() {
            return Err(ConnectionError::InputAlreadyConnected {
                node: consumer,
                input,
            });
        }

        if self.depends_on(producer, consumer) {
            return Err(ConnectionError::WouldCreateCycle);
        }

        if let Some(node) = self.nodes.get_mut(&consumer) {
            node.inputs_mut()[input.index()].set_link(Some(edge));
        }
        tracing::debug!(%producer, %output, %consumer, %input, "Connected");
        Ok(())
    }

    /// Remove the edge feeding one input, returning it
    pub fn disconnect_input(
        &mut self,
        consumer: NodeKey,
        input: ConnectorId,
    ) -> Result<Option<Edge>, ConnectionError> {
        let node = self
            .nodes
            .get_mut(&consumer)
            .ok_or(ConnectionError::NodeNotFound(consumer))?;
        let connector = node
            .inputs_mut()
            .get_mut(input.index())
            .ok_or(ConnectionError::InputNotFound {
                node: consumer,
                input,
            })?;
        Ok(connector.set_link(None))
    }

    /// Remove every edge touching a node, as consumer or producer.
    ///
    /// Returns `false` if the node does not exist.
    pub fn disconnect_node(&mut self, key: NodeKey) -> bool {
        if !self.nodes.contains_key(&key) {
            return false;
        }

        for node in self.nodes.values_mut() {
            let own = node.key() == key;
            for input in node.inputs_mut() {
                if own || input.link().is_some_and(|e| e.node == key) {
                    input.set_link(None);
                }
            }
        }
        true
    }

    /// Change the type and enabled state of a node's connectors.
    ///
    /// The number of slots must stay the same. Edges whose connector type
    /// changed are removed; edges on slots that merely became disabled are
    /// kept. Returns the number of removed edges.
    pub fn reshape_node(
        &mut self,
        key: NodeKey,
        inputs: &[ConnectorShape],
        outputs: &[ConnectorShape],
    ) -> Result<usize, GraphError> {
        let node = self.nodes.get(&key).ok_or(GraphError::NodeNotFound(key))?;
        if node.inputs().len() != inputs.len() || node.outputs().len() != outputs.len() {
            return Err(GraphError::ConnectorCountMismatch(key));
        }

        let retyped_outputs: HashSet<ConnectorId> = node
            .outputs_with_ids()
            .filter(|(id, c)| c.ty() != outputs[id.index()].ty)
            .map(|(id, _)| id)
            .collect();

        let mut removed = 0;
        if !retyped_outputs.is_empty() {
            for other in self.nodes.values_mut() {
                for input in other.inputs_mut() {
                    if input
                        .link()
                        .is_some_and(|e| e.node == key && retyped_outputs.contains(&e.output))
                    {
                        input.set_link(None);
                        removed += 1;
                    }
                }
            }
        }

        let node = self.nodes.get_mut(&key).ok_or(GraphError::NodeNotFound(key))?;
        for (connector, shape) in node.inputs_mut().iter_mut().zip(inputs) {
            if connector.ty() != shape.ty && connector.set_link(None).is_some() {
                removed += 1;
            }
            connector.set_shape(*shape);
        }
        for (connector, shape) in node.outputs_mut().iter_mut().zip(outputs) {
            connector.set_shape(*shape);
        }

        if removed > 0 {
            tracing::debug!(%key, removed, "Reshaping node dropped edges");
        }
        Ok(removed)
    }

    /// Replace a node's connector lists entirely, dropping all of its edges
    pub fn rebuild_connectors(
        &mut self,
        key: NodeKey,
        inputs: Vec<InputConnector>,
        outputs: Vec<OutputConnector>,
    ) -> Result<(), GraphError> {
        if !self.disconnect_node(key) {
            return Err(GraphError::NodeNotFound(key));
        }
        let node = self.nodes.get_mut(&key).ok_or(GraphError::NodeNotFound(key))?;
        node.replace_connectors(inputs, outputs);
        Ok(())
    }

    /// Get all edges as `(consumer, input, edge)` triples
    pub fn edges(&self) -> impl Iterator<Item = (NodeKey, ConnectorId, Edge)> + '_ {
        self.nodes.values().flat_map(|node| {
            node.inputs_with_ids()
                .filter_map(move |(id, input)| input.link().map(|edge| (node.key(), id, edge)))
        })
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    /// Whether `consumer` transitively reads from `producer`
    pub fn depends_on(&self, consumer: NodeKey, producer: NodeKey) -> bool {
        let mut stack = vec![consumer];
        let mut visited = HashSet::new();

        while let Some(key) = stack.pop() {
            if key == producer {
                return true;
            }
            if !visited.insert(key) {
                continue;
            }
            if let Some(node) = self.nodes.get(&key) {
                stack.extend(node.inputs().iter().filter_map(|i| i.link()).map(|e| e.node));
            }
        }
        false
    }

    /// Get all nodes ordered so that every consumer comes before the nodes it
    /// reads from. Walking the result backwards visits producers first.
    pub fn topological_sort(&self) -> Result<Vec<NodeKey>, CycleError> {
        let mut visited = HashSet::new();
        let mut temp_mark = HashSet::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        for key in self.nodes.keys() {
            if !visited.contains(key) {
                self.visit(*key, &mut visited, &mut temp_mark, &mut order)?;
            }
        }

        order.reverse();
        Ok(order)
    }

    fn visit(
        &self,
        key: NodeKey,
        visited: &mut HashSet<NodeKey>,
        temp_mark: &mut HashSet<NodeKey>,
        order: &mut Vec<NodeKey>,
    ) -> Result<(), CycleError> {
        if temp_mark.contains(&key) {
            return Err(CycleError(key));
        }
        if visited.contains(&key) {
            return Ok(());
        }
        let Some(node) = self.nodes.get(&key) else {
            return Ok(());
        };

        temp_mark.insert(key);

        // Visit all nodes that this node depends on
        for edge in node.inputs().iter().filter_map(|i| i.link()) {
            self.visit(edge.node, visited, temp_mark, order)?;
        }

        temp_mark.remove(&key);
        visited.insert(key);
        order.push(key);

        Ok(())
    }

    /// Structural check: every edge on an enabled input resolves to an
    /// existing, enabled, type-compatible output; single-instance node types
    /// occur at most once; no cycles.
    pub fn validate(&self, diagnostics: &mut Diagnostics) -> bool
    where
        T: LogicNodeData,
    {
        let errors_before = diagnostics.error_count();

        for node in self.nodes.values() {
            for (id, input) in node.inputs_with_ids() {
                let Some(edge) = input.link() else { continue };
                if !input.is_enabled() {
                    continue;
                }

                let Some(producer) = self.nodes.get(&edge.node) else {
                    diagnostics.error(
                        Some(node.key()),
                        format!("input '{}' ({id}) references missing node {}", input.name, edge.node),
                    );
                    continue;
                };
                let Some(output) = producer.output(edge.output) else {
                    diagnostics.error(
                        Some(node.key()),
                        format!(
                            "input '{}' ({id}) references missing output {} of node {}",
                            input.name, edge.output, edge.node
                        ),
                    );
                    continue;
                };
                if !output.is_enabled() {
                    diagnostics.error(
                        Some(node.key()),
                        format!(
                            "input '{}' ({id}) reads disabled output '{}' of node {}",
                            input.name, output.name, edge.node
                        ),
                    );
                }
                if !output.ty().can_connect_to(input.ty()) {
                    diagnostics.error(
                        Some(node.key()),
                        format!(
                            "input '{}' ({id}) expects {} but output '{}' of node {} is {}",
                            input.name,
                            input.ty(),
                            output.name,
                            edge.node,
                            output.ty()
                        ),
                    );
                }
            }
        }

        let mut seen_unique = HashSet::new();
        for node in self.nodes.values().filter(|n| n.data.is_unique()) {
            if !seen_unique.insert(node.data.type_name()) {
                diagnostics.error(
                    Some(node.key()),
                    format!("only one {} node may exist", node.data.type_name()),
                );
            }
        }

        if let Err(CycleError(key)) = self.topological_sort() {
            diagnostics.error(Some(key), "graph contains a cycle");
        }

        diagnostics.error_count() == errors_before
    }
}

impl<T> Default for LogicGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphWireRef<'a, T> {
    next_key: u32,
    nodes: Vec<&'a Node<T>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphWire<T> {
    #[serde(default)]
    next_key: u32,
    nodes: Vec<Node<T>>,
}

impl<T: Serialize> Serialize for LogicGraph<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        GraphWireRef {
            next_key: self.next_key,
            nodes: self.nodes.values().collect(),
        }
        .serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for LogicGraph<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = GraphWire::<T>::deserialize(deserializer)?;
        Self::from_nodes(wire.next_key, wire.nodes).map_err(serde::de::Error::custom)
    }
}

/// Error when creating a connection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeKey),

    /// Input connector not found
    #[error("Node {node} has no input {input}")]
    InputNotFound {
        /// Consumer node
        node: NodeKey,
        /// Requested input
        input: ConnectorId,
    },

    /// Output connector not found
    #[error("Node {node} has no output {output}")]
    OutputNotFound {
        /// Producer node
        node: NodeKey,
        /// Requested output
        output: ConnectorId,
    },

    /// Connector types differ
    #[error("Incompatible connector types: output is {output}, input is {input}")]
    IncompatibleTypes {
        /// Producer output type
        output: ConnectorType,
        /// Consumer input type
        input: ConnectorType,
    },

    /// One of the connectors is hidden by the node's current mode
    #[error("Cannot connect a disabled connector")]
    DisabledConnector,

    /// The input already has a different producer
    #[error("Input {input} of node {node} is already connected")]
    InputAlreadyConnected {
        /// Consumer node
        node: NodeKey,
        /// Consumer input
        input: ConnectorId,
    },

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// The connection would close a cycle
    #[error("Connection would create a cycle")]
    WouldCreateCycle,
}

/// Error when modifying graph structure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeKey),

    /// Two nodes share a key
    #[error("Duplicate node key: {0}")]
    DuplicateKey(NodeKey),

    /// A single-instance node type already exists
    #[error("Only one {0} node may exist")]
    UniqueNodeExists(&'static str),

    /// Reshaping tried to change the number of connector slots
    #[error("Connector count of node {0} cannot change")]
    ConnectorCountMismatch(NodeKey),
}

/// Error when graph contains a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Graph contains a cycle through node {0}")]
pub struct CycleError(pub NodeKey);

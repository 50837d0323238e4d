// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material logic graph: a [`LogicGraph`] of [`MaterialNode`]s bound to one
//! material family.

use crate::family::{MaterialFamilyDefinition, PerFrameDataSets};
use crate::naming::{is_glsl_reserved_word, is_reserved_name, is_valid_identifier, PADDING_PREFIX};
use crate::node::{MaterialNode, MaterialNodeType, ModeId};
use crate::output::{output_connectors, OutputNode, OutputState, OUTPUT_NODE_KEY};
use crate::packing::{pack_material_data, FieldCandidate, MaterialDataLayout};
use crate::registry::FamilyId;
use ordoplay_logic_graph::{
    ConnectionError, ConnectorId, CycleError, Diagnostics, Edge, GraphError, LogicGraph, Node, NodeKey,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Settings of a material graph, injected at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialGraphConfig {
    /// Capacity of the material data buffer in float components
    pub material_data_budget: u32,
    /// Fill the material data struct with padding up to the budget
    pub pad_material_data_to_budget: bool,
    /// Prefix of generated variable names
    pub identifier_prefix: String,
}

impl Default for MaterialGraphConfig {
    fn default() -> Self {
        Self {
            material_data_budget: 64,
            pad_material_data_to_budget: true,
            identifier_prefix: "n".to_string(),
        }
    }
}

/// Errors from editing a material graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaterialGraphError {
    /// Structural error from the underlying graph
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Connection rejected by the underlying graph
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeKey),

    /// The Output node cannot be removed
    #[error("The Output node cannot be removed")]
    OutputNodeRemoval,

    /// The node has no modes, or the mode is out of range
    #[error("Node {node} cannot switch to mode {mode}")]
    InvalidMode {
        /// Node
        node: NodeKey,
        /// Requested mode
        mode: ModeId,
    },

    /// No connector with this name
    #[error("Node {node} has no connector named '{name}'")]
    UnknownConnector {
        /// Node
        node: NodeKey,
        /// Requested name
        name: String,
    },

    /// The node kind has no author-assigned name
    #[error("Node {0} has no name")]
    Unnamed(NodeKey),

    /// The node kind has no stored value
    #[error("Node {0} has no value")]
    NoValue(NodeKey),

    /// A stored value component is NaN or infinite
    #[error("Node {0} values must be finite")]
    NonFiniteValue(NodeKey),
}

/// A material graph bound to a family definition.
///
/// The Output node always exists at [`OUTPUT_NODE_KEY`]. Validation and
/// code generation only read the graph.
#[derive(Debug, Clone)]
pub struct MaterialLogicGraph {
    graph: LogicGraph<MaterialNode>,
    family_id: FamilyId,
    family: Arc<MaterialFamilyDefinition>,
    config: MaterialGraphConfig,
}

impl MaterialLogicGraph {
    /// Create a graph holding only the Output node for `family`
    pub fn new(family_id: FamilyId, family: Arc<MaterialFamilyDefinition>, config: MaterialGraphConfig) -> Self {
        let output = Node::new(
            OUTPUT_NODE_KEY,
            MaterialNode::Output(OutputNode::default()),
            output_connectors(&family),
            Vec::new(),
        );
        Self {
            graph: LogicGraph::with_node(output),
            family_id,
            family,
            config,
        }
    }

    pub(crate) fn from_parts(
        graph: LogicGraph<MaterialNode>,
        family_id: FamilyId,
        family: Arc<MaterialFamilyDefinition>,
        config: MaterialGraphConfig,
    ) -> Self {
        Self {
            graph,
            family_id,
            family,
            config,
        }
    }

    /// Underlying graph
    pub fn graph(&self) -> &LogicGraph<MaterialNode> {
        &self.graph
    }

    /// Get a node by key
    pub fn node(&self, key: NodeKey) -> Option<&Node<MaterialNode>> {
        self.graph.node(key)
    }

    /// The bound family
    pub fn family(&self) -> &Arc<MaterialFamilyDefinition> {
        &self.family
    }

    /// ID of the bound family
    pub fn family_id(&self) -> FamilyId {
        self.family_id
    }

    /// Settings
    pub fn config(&self) -> &MaterialGraphConfig {
        &self.config
    }

    /// Add a node of the given type.
    ///
    /// Fails for the Output type, which exists exactly once.
    pub fn add_node(&mut self, node_type: MaterialNodeType, position: [f32; 2]) -> Result<NodeKey, MaterialGraphError> {
        let data = node_type.create();
        let (inputs, outputs) = data.connectors(&self.family);
        Ok(self.graph.add_node(data, inputs, outputs, position)?)
    }

    /// Remove a node and its edges
    pub fn remove_node(&mut self, key: NodeKey) -> Result<Node<MaterialNode>, MaterialGraphError> {
        if key == OUTPUT_NODE_KEY {
            return Err(MaterialGraphError::OutputNodeRemoval);
        }
        self.graph.remove_node(key).ok_or(MaterialGraphError::NodeNotFound(key))
    }

    /// Connect a producer output to a consumer input
    pub fn connect(
        &mut self,
        consumer: NodeKey,
        input: ConnectorId,
        producer: NodeKey,
        output: ConnectorId,
    ) -> Result<(), MaterialGraphError> {
        Ok(self.graph.connect(consumer, input, producer, output)?)
    }

    /// Connect by connector names
    pub fn connect_by_name(
        &mut self,
        consumer: NodeKey,
        input: &str,
        producer: NodeKey,
        output: &str,
    ) -> Result<(), MaterialGraphError> {
        let input_id = self.input_id(consumer, input)?;
        let output_id = self.output_id(producer, output)?;
        self.connect(consumer, input_id, producer, output_id)
    }

    /// Position of a named input
    pub fn input_id(&self, key: NodeKey, name: &str) -> Result<ConnectorId, MaterialGraphError> {
        let node = self.graph.node(key).ok_or(MaterialGraphError::NodeNotFound(key))?;
        node.inputs_with_ids()
            .find(|(_, c)| c.name == name)
            .map(|(id, _)| id)
            .ok_or_else(|| MaterialGraphError::UnknownConnector {
                node: key,
                name: name.to_string(),
            })
    }

    /// Position of a named output
    pub fn output_id(&self, key: NodeKey, name: &str) -> Result<ConnectorId, MaterialGraphError> {
        let node = self.graph.node(key).ok_or(MaterialGraphError::NodeNotFound(key))?;
        node.outputs_with_ids()
            .find(|(_, c)| c.name == name)
            .map(|(id, _)| id)
            .ok_or_else(|| MaterialGraphError::UnknownConnector {
                node: key,
                name: name.to_string(),
            })
    }

    /// Remove the edge feeding one input
    pub fn disconnect_input(&mut self, consumer: NodeKey, input: ConnectorId) -> Result<Option<Edge>, MaterialGraphError> {
        Ok(self.graph.disconnect_input(consumer, input)?)
    }

    /// Remove every edge touching a node. Returns `false` if it does not exist.
    pub fn disconnect_node(&mut self, key: NodeKey) -> bool {
        self.graph.disconnect_node(key)
    }

    /// Switch a modal node to another mode.
    ///
    /// Edges on connectors whose type changed are removed; edges on
    /// connectors that were only disabled stay in place. Returns the number
    /// of removed edges.
    pub fn set_mode(&mut self, key: NodeKey, mode: ModeId) -> Result<usize, MaterialGraphError> {
        let node = self.graph.node_mut(key).ok_or(MaterialGraphError::NodeNotFound(key))?;
        let current = node.data.mode();
        if current == mode && !node.data.modes().is_empty() {
            return Ok(0);
        }
        if !node.data.on_mode_change(current, mode) {
            return Err(MaterialGraphError::InvalidMode { node: key, mode });
        }

        let (inputs, outputs) = node.data.connector_shapes(&self.family);
        let removed = self.graph.reshape_node(key, &inputs, &outputs)?;
        tracing::debug!(%key, %mode, removed, "Changed node mode");
        Ok(removed)
    }

    /// Set the author-assigned name of a named node
    pub fn set_node_name(&mut self, key: NodeKey, name: impl Into<String>) -> Result<(), MaterialGraphError> {
        let node = self.graph.node_mut(key).ok_or(MaterialGraphError::NodeNotFound(key))?;
        if node.data.set_name(name) {
            Ok(())
        } else {
            Err(MaterialGraphError::Unnamed(key))
        }
    }

    /// Set the stored literal of a Constant or Variable node
    pub fn set_node_value(&mut self, key: NodeKey, value: [f32; 4]) -> Result<(), MaterialGraphError> {
        let node = self.graph.node_mut(key).ok_or(MaterialGraphError::NodeNotFound(key))?;
        if node.data.value().is_some() && !value.iter().all(|v| v.is_finite()) {
            return Err(MaterialGraphError::NonFiniteValue(key));
        }
        if node.data.set_value(value) {
            Ok(())
        } else {
            Err(MaterialGraphError::NoValue(key))
        }
    }

    /// Set the editor position of a node
    pub fn set_position(&mut self, key: NodeKey, position: [f32; 2]) -> Result<(), MaterialGraphError> {
        let node = self.graph.node_mut(key).ok_or(MaterialGraphError::NodeNotFound(key))?;
        node.position = position;
        Ok(())
    }

    /// Set the editor draw order of a node
    pub fn set_z_order(&mut self, key: NodeKey, z_order: i32) -> Result<(), MaterialGraphError> {
        let node = self.graph.node_mut(key).ok_or(MaterialGraphError::NodeNotFound(key))?;
        node.z_order = z_order;
        Ok(())
    }

    /// Fixed-function state of the Output node
    pub fn output_state(&self) -> Option<&OutputState> {
        match self.graph.node(OUTPUT_NODE_KEY).map(|n| &n.data) {
            Some(MaterialNode::Output(output)) => Some(&output.state),
            _ => None,
        }
    }

    /// Mutable fixed-function state of the Output node
    pub fn output_state_mut(&mut self) -> Option<&mut OutputState> {
        match self.graph.node_mut(OUTPUT_NODE_KEY).map(|n| &mut n.data) {
            Some(MaterialNode::Output(output)) => Some(&mut output.state),
            _ => None,
        }
    }

    /// Bind the graph to another family.
    ///
    /// The Output node's inputs are rebuilt for the new family and every
    /// edge into them is removed.
    pub fn change_material_family(
        &mut self,
        family_id: FamilyId,
        family: Arc<MaterialFamilyDefinition>,
    ) -> Result<(), MaterialGraphError> {
        self.graph
            .rebuild_connectors(OUTPUT_NODE_KEY, output_connectors(&family), Vec::new())?;
        tracing::info!(from = self.family.name(), to = family.name(), "Changed material family");
        self.family_id = family_id;
        self.family = family;
        Ok(())
    }

    /// Rebuild the Output node's inputs from the bound family, restoring
    /// edges into inputs whose name and type are unchanged. Returns the
    /// number of restored edges.
    pub fn refresh_output_connectors(&mut self) -> Result<usize, MaterialGraphError> {
        let node = self
            .graph
            .node(OUTPUT_NODE_KEY)
            .ok_or(MaterialGraphError::NodeNotFound(OUTPUT_NODE_KEY))?;
        let previous: Vec<(String, _, Edge)> = node
            .inputs()
            .iter()
            .filter_map(|i| i.link().map(|edge| (i.name.clone(), i.ty(), edge)))
            .collect();

        let inputs = output_connectors(&self.family);
        let restorable: Vec<(ConnectorId, Edge)> = previous
            .into_iter()
            .filter_map(|(name, ty, edge)| {
                inputs
                    .iter()
                    .position(|i| i.name == name && i.ty() == ty)
                    .map(|index| (ConnectorId(index as u16), edge))
            })
            .collect();

        self.graph.rebuild_connectors(OUTPUT_NODE_KEY, inputs, Vec::new())?;

        let mut restored = 0;
        for (input, edge) in restorable {
            if self.graph.connect(OUTPUT_NODE_KEY, input, edge.node, edge.output).is_ok() {
                restored += 1;
            }
        }
        Ok(restored)
    }

    /// Nodes ordered consumers first; iterate in reverse for producers first
    pub fn topological_sort(&self) -> Result<Vec<NodeKey>, CycleError> {
        self.graph.topological_sort()
    }

    /// Validate the graph, writing every problem found to `diagnostics`
    pub fn validate(&self, diagnostics: &mut Diagnostics) -> bool {
        self.validate_with_layout(diagnostics).is_some()
    }

    /// Validate the graph and return the material data layout on success
    pub fn validate_with_layout(&self, diagnostics: &mut Diagnostics) -> Option<MaterialDataLayout> {
        let errors_before = diagnostics.error_count();

        self.graph.validate(diagnostics);
        self.validate_output_node(diagnostics);
        self.validate_nodes(diagnostics);
        self.validate_names(diagnostics);

        let candidates: Vec<FieldCandidate> = self
            .graph
            .nodes()
            .filter_map(|node| match &node.data {
                MaterialNode::Variable(variable) => node.data.mode_type().map(|ty| {
                    FieldCandidate::new(node.key(), variable.name.clone(), ty.component_count())
                }),
                _ => None,
            })
            .collect();

        let layout = match pack_material_data(
            &candidates,
            self.config.material_data_budget,
            self.config.pad_material_data_to_budget,
        ) {
            Ok(layout) => Some(layout),
            Err(err) => {
                diagnostics.error(None, err.to_string());
                None
            }
        };

        if diagnostics.error_count() == errors_before {
            layout
        } else {
            None
        }
    }

    fn validate_output_node(&self, diagnostics: &mut Diagnostics) {
        let Some(node) = self.graph.node(OUTPUT_NODE_KEY) else {
            diagnostics.error(None, format!("material graph has no Output node at key {OUTPUT_NODE_KEY}"));
            return;
        };
        if !matches!(node.data, MaterialNode::Output(_)) {
            diagnostics.error(
                Some(OUTPUT_NODE_KEY),
                format!("key {OUTPUT_NODE_KEY} is reserved for the Output node"),
            );
            return;
        }

        let expected = output_connectors(&self.family);
        let matches_family = node.inputs().len() == expected.len()
            && node
                .inputs()
                .iter()
                .zip(&expected)
                .all(|(actual, wanted)| actual.name == wanted.name && actual.ty() == wanted.ty());
        if !matches_family {
            diagnostics.error(
                Some(OUTPUT_NODE_KEY),
                format!("Output node inputs do not match family '{}'", self.family.name()),
            );
        }
    }

    fn validate_nodes(&self, diagnostics: &mut Diagnostics) {
        let sets = self.family.fragment_data_sets();
        for node in self.graph.nodes() {
            let missing_set = match &node.data {
                MaterialNode::Variable(_) => Some((PerFrameDataSets::MATERIAL_DATA, "material data")),
                MaterialNode::TextureInput(_) | MaterialNode::NormalMapInput(_) => {
                    Some((PerFrameDataSets::TEXTURES, "textures"))
                }
                _ => None,
            }
            .filter(|(set, _)| !sets.contains(*set));
            if let Some((_, what)) = missing_set {
                diagnostics.error(
                    Some(node.key()),
                    format!(
                        "{} node reads {what}, which family '{}' does not bind in the fragment stage",
                        node.data.node_type(),
                        self.family.name()
                    ),
                );
            }

            if node.data.value().is_some_and(|value| !value.iter().all(|v| v.is_finite())) {
                diagnostics.error(
                    Some(node.key()),
                    format!("{} node value must be finite", node.data.node_type()),
                );
            }

            if !node.data.modes().is_empty() && node.data.mode_type().is_none() {
                diagnostics.error(
                    Some(node.key()),
                    format!("{} node has invalid mode {}", node.data.node_type(), node.data.mode()),
                );
            }

            if !matches!(node.data, MaterialNode::Output(_)) {
                let (inputs, outputs) = node.data.connector_shapes(&self.family);
                let actual_inputs = node.inputs().iter().map(|c| c.shape());
                let actual_outputs = node.outputs().iter().map(|c| c.shape());
                if !actual_inputs.eq(inputs) || !actual_outputs.eq(outputs) {
                    diagnostics.error(
                        Some(node.key()),
                        format!("{} node connectors do not match its mode", node.data.node_type()),
                    );
                    continue;
                }
            }

            for input in node.inputs() {
                if input.default_value.is_some_and(|value| !value.iter().all(|v| v.is_finite())) {
                    diagnostics.error(
                        Some(node.key()),
                        format!("default of input '{}' must be finite", input.name),
                    );
                }
                if input.is_enabled() && input.required && !input.is_connected() && input.default_value.is_none() {
                    diagnostics.error(
                        Some(node.key()),
                        format!(
                            "input '{}' of {} node is required but not connected",
                            input.name,
                            node.data.node_type()
                        ),
                    );
                }
            }
        }
    }

    fn validate_names(&self, diagnostics: &mut Diagnostics) {
        let mut variables: HashMap<&str, NodeKey> = HashMap::new();
        let mut textures: HashMap<&str, NodeKey> = HashMap::new();

        for node in self.graph.nodes() {
            let (namespace, seen) = match &node.data {
                MaterialNode::Variable(_) => ("variable", &mut variables),
                MaterialNode::TextureInput(_) | MaterialNode::NormalMapInput(_) => ("texture", &mut textures),
                _ => continue,
            };
            let name = node.data.name().unwrap_or_default();
            let key = node.key();

            if name.is_empty() {
                diagnostics.error(Some(key), format!("{} node needs a name", node.data.node_type()));
                continue;
            }
            if !is_valid_identifier(name) {
                diagnostics.error(
                    Some(key),
                    format!("{namespace} name '{name}' must start with a letter and contain only letters and digits"),
                );
                continue;
            }
            if is_reserved_name(name) {
                diagnostics.error(
                    Some(key),
                    format!("{namespace} name '{name}' starts with the reserved prefix '{PADDING_PREFIX}'"),
                );
                continue;
            }
            if is_glsl_reserved_word(name) {
                diagnostics.error(Some(key), format!("{namespace} name '{name}' is a GLSL reserved word"));
                continue;
            }
            if let Some(first) = seen.insert(name, key) {
                diagnostics.error(
                    Some(key),
                    format!("{namespace} name '{name}' is also used by node {first}; {namespace}s need unique names"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BuiltInInput, MathOp};
    use crate::registry::{pbr_family, toon_family};
    use ordoplay_logic_graph::ConnectorType;

    fn toon_graph() -> MaterialLogicGraph {
        let family = toon_family();
        MaterialLogicGraph::new(
            FamilyId::from_name(family.name()),
            Arc::new(family),
            MaterialGraphConfig::default(),
        )
    }

    #[test]
    fn test_new_graph_has_output_node() {
        let graph = toon_graph();
        let output = graph.node(OUTPUT_NODE_KEY).unwrap();
        assert!(matches!(output.data, MaterialNode::Output(_)));
        assert_eq!(output.inputs().len(), graph.family().light_inputs().len() + 1);
        assert_eq!(graph.output_state(), Some(&OutputState::default()));

        let mut diagnostics = Diagnostics::new();
        assert!(graph.validate(&mut diagnostics), "{diagnostics}");
    }

    #[test]
    fn test_output_node_is_unique_and_pinned() {
        let mut graph = toon_graph();
        assert!(matches!(
            graph.add_node(MaterialNodeType::Output, [0.0, 0.0]),
            Err(MaterialGraphError::Graph(GraphError::UniqueNodeExists("Output")))
        ));
        assert_eq!(graph.remove_node(OUTPUT_NODE_KEY).unwrap_err(), MaterialGraphError::OutputNodeRemoval);
    }

    #[test]
    fn test_set_mode_drops_retyped_edges_only() {
        let mut graph = toon_graph();
        let uv = graph
            .add_node(MaterialNodeType::BuiltIn(BuiltInInput::TextureCoordinates), [0.0, 0.0])
            .unwrap();
        let splitter = graph.add_node(MaterialNodeType::Splitter, [0.0, 0.0]).unwrap();
        let sin = graph.add_node(MaterialNodeType::Math(MathOp::Sin), [0.0, 0.0]).unwrap();

        graph.set_mode(splitter, ModeId(0)).unwrap();
        graph.connect_by_name(splitter, "vector", uv, "uv").unwrap();
        graph.connect_by_name(sin, "angle", splitter, "x").unwrap();

        // Vec2 -> Vec3 retypes the input; the x output stays a float
        assert_eq!(graph.set_mode(splitter, ModeId(1)).unwrap(), 1);
        assert_eq!(graph.graph().edge_count(), 1);
        assert!(graph.node(sin).unwrap().inputs()[0].is_connected());
    }

    #[test]
    fn test_set_mode_keeps_edges_on_disabled_connectors() {
        let mut graph = toon_graph();
        let splitter = graph.add_node(MaterialNodeType::Splitter, [0.0, 0.0]).unwrap();
        let sin = graph.add_node(MaterialNodeType::Math(MathOp::Sin), [0.0, 0.0]).unwrap();
        graph.connect_by_name(sin, "angle", splitter, "w").unwrap();

        assert_eq!(graph.set_mode(splitter, ModeId(0)).unwrap(), 0);
        let w = graph.node(splitter).unwrap().outputs()[3].clone();
        assert!(!w.is_enabled());
        assert!(graph.node(sin).unwrap().inputs()[0].is_connected());

        let mut diagnostics = Diagnostics::new();
        assert!(!graph.validate(&mut diagnostics));
        assert!(diagnostics.mentions("disabled output"));
    }

    #[test]
    fn test_set_mode_rejects_non_modal_nodes() {
        let mut graph = toon_graph();
        let position = graph
            .add_node(MaterialNodeType::BuiltIn(BuiltInInput::Position), [0.0, 0.0])
            .unwrap();
        assert!(matches!(
            graph.set_mode(position, ModeId(1)),
            Err(MaterialGraphError::InvalidMode { .. })
        ));
    }

    #[test]
    fn test_required_input_reported() {
        let mut graph = toon_graph();
        let sin = graph.add_node(MaterialNodeType::Math(MathOp::Sin), [0.0, 0.0]).unwrap();

        let mut diagnostics = Diagnostics::new();
        assert!(!graph.validate(&mut diagnostics));
        assert!(diagnostics.mentions("'angle'"));
        assert!(diagnostics.iter().any(|d| d.node == Some(sin)));
    }

    #[test]
    fn test_name_rules() {
        let mut graph = toon_graph();
        for name in ["", "1bad", "padding3", "good_name"] {
            let key = graph.add_node(MaterialNodeType::Variable, [0.0, 0.0]).unwrap();
            graph.set_node_name(key, name).unwrap();
        }

        let mut diagnostics = Diagnostics::new();
        assert!(!graph.validate(&mut diagnostics));
        assert_eq!(diagnostics.error_count(), 4);
        assert!(diagnostics.mentions("needs a name"));
        assert!(diagnostics.mentions("'1bad'"));
        assert!(diagnostics.mentions("reserved prefix"));
        assert!(diagnostics.mentions("'good_name'"));
    }

    #[test]
    fn test_variable_and_texture_namespaces_are_separate() {
        let mut graph = toon_graph();
        let variable = graph.add_node(MaterialNodeType::Variable, [0.0, 0.0]).unwrap();
        graph.set_node_name(variable, "detail").unwrap();
        let uv = graph
            .add_node(MaterialNodeType::BuiltIn(BuiltInInput::TextureCoordinates), [0.0, 0.0])
            .unwrap();
        let texture = graph.add_node(MaterialNodeType::TextureInput, [0.0, 0.0]).unwrap();
        graph.set_node_name(texture, "detail").unwrap();
        graph.connect_by_name(texture, "uv", uv, "uv").unwrap();

        let mut diagnostics = Diagnostics::new();
        assert!(graph.validate(&mut diagnostics), "{diagnostics}");

        let normal_map = graph.add_node(MaterialNodeType::NormalMapInput, [0.0, 0.0]).unwrap();
        graph.set_node_name(normal_map, "detail").unwrap();
        graph.connect_by_name(normal_map, "uv", uv, "uv").unwrap();

        let mut diagnostics = Diagnostics::new();
        assert!(!graph.validate(&mut diagnostics));
        assert!(diagnostics.mentions("textures need unique names"));
    }

    #[test]
    fn test_packing_overflow_is_a_validation_error() {
        let family = toon_family();
        let config = MaterialGraphConfig {
            material_data_budget: 8,
            ..MaterialGraphConfig::default()
        };
        let mut graph = MaterialLogicGraph::new(FamilyId::from_name("Toon"), Arc::new(family), config);
        for name in ["a", "b", "c"] {
            let key = graph.add_node(MaterialNodeType::Variable, [0.0, 0.0]).unwrap();
            graph.set_node_name(key, name).unwrap();
            graph.set_mode(key, ModeId(3)).unwrap();
        }

        let mut diagnostics = Diagnostics::new();
        assert!(graph.validate_with_layout(&mut diagnostics).is_none());
        assert!(diagnostics.mentions("budget is 8"));
        assert!(diagnostics.mentions("c[8+4]"));
    }

    #[test]
    fn test_validate_is_idempotent() {
        let mut graph = toon_graph();
        for (name, mode) in [("tint", 2), ("gloss", 0), ("offset", 1)] {
            let key = graph.add_node(MaterialNodeType::Variable, [0.0, 0.0]).unwrap();
            graph.set_node_name(key, name).unwrap();
            graph.set_mode(key, ModeId(mode)).unwrap();
        }

        let mut first = Diagnostics::new();
        let mut second = Diagnostics::new();
        let a = graph.validate_with_layout(&mut first).unwrap();
        let b = graph.validate_with_layout(&mut second).unwrap();
        assert_eq!(a, b);
        assert_eq!(first.len(), second.len());
        assert_eq!(a.field_for(NodeKey(1)).unwrap().offset, 0);
    }

    #[test]
    fn test_change_material_family_rebuilds_output() {
        let mut graph = toon_graph();
        let constant = graph.add_node(MaterialNodeType::Constant, [0.0, 0.0]).unwrap();
        graph.set_mode(constant, ModeId(2)).unwrap();
        graph.connect_by_name(OUTPUT_NODE_KEY, "diffuseColor", constant, "value").unwrap();

        let pbr = pbr_family();
        let expected: Vec<(String, ConnectorType)> = output_connectors(&pbr)
            .iter()
            .map(|i| (i.name.clone(), i.ty()))
            .collect();
        graph
            .change_material_family(FamilyId::from_name("PBR"), Arc::new(pbr))
            .unwrap();

        let actual: Vec<(String, ConnectorType)> = graph
            .node(OUTPUT_NODE_KEY)
            .unwrap()
            .inputs()
            .iter()
            .map(|i| (i.name.clone(), i.ty()))
            .collect();
        assert_eq!(actual, expected);
        assert_eq!(graph.graph().edge_count(), 0);
        assert_eq!(graph.family().name(), "PBR");
    }

    #[test]
    fn test_refresh_keeps_matching_edges() {
        let mut graph = toon_graph();
        let threshold = graph.add_node(MaterialNodeType::Constant, [0.0, 0.0]).unwrap();
        graph.connect_by_name(OUTPUT_NODE_KEY, "shadeThreshold", threshold, "value").unwrap();

        let mut family = (**graph.family()).clone();
        let mut inputs = family.light_inputs().to_vec();
        inputs.remove(0);
        family.set_light_inputs(inputs).unwrap();
        graph.family = Arc::new(family);

        assert_eq!(graph.refresh_output_connectors().unwrap(), 1);
        let id = graph.input_id(OUTPUT_NODE_KEY, "shadeThreshold").unwrap();
        assert_eq!(id, ConnectorId(1));
        assert!(graph.node(OUTPUT_NODE_KEY).unwrap().inputs()[1].is_connected());
    }

    #[test]
    fn test_nodes_need_the_data_sets_they_read() {
        let mut family = toon_family();
        family.set_data_sets(PerFrameDataSets::TRANSFORMATIONS, PerFrameDataSets::CAMERA_AND_LIGHTS);
        let mut graph = MaterialLogicGraph::new(
            FamilyId::from_name("Toon"),
            Arc::new(family),
            MaterialGraphConfig::default(),
        );
        let tint = graph.add_node(MaterialNodeType::Variable, [0.0, 0.0]).unwrap();
        graph.set_node_name(tint, "tint").unwrap();
        let sin = graph.add_node(MaterialNodeType::Math(MathOp::Sin), [0.0, 0.0]).unwrap();
        graph.connect_by_name(sin, "angle", tint, "value").unwrap();
        graph.connect_by_name(OUTPUT_NODE_KEY, "shadeThreshold", sin, "result").unwrap();

        let mut diagnostics = Diagnostics::new();
        assert!(!graph.validate(&mut diagnostics));
        assert!(diagnostics.mentions("reads material data"));
        assert!(diagnostics.iter().any(|d| d.node == Some(tint)));

        let uv = graph
            .add_node(MaterialNodeType::BuiltIn(BuiltInInput::TextureCoordinates), [0.0, 0.0])
            .unwrap();
        let mask = graph.add_node(MaterialNodeType::TextureInput, [0.0, 0.0]).unwrap();
        graph.set_node_name(mask, "mask").unwrap();
        graph.connect_by_name(mask, "uv", uv, "uv").unwrap();

        let mut diagnostics = Diagnostics::new();
        assert!(!graph.validate(&mut diagnostics));
        assert!(diagnostics.iter().any(|d| d.node == Some(mask) && d.message.contains("reads textures")));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let mut graph = toon_graph();
        let constant = graph.add_node(MaterialNodeType::Constant, [0.0, 0.0]).unwrap();
        graph.connect_by_name(OUTPUT_NODE_KEY, "shadeThreshold", constant, "value").unwrap();

        for value in [[f32::NAN, 0.0, 0.0, 0.0], [0.0, f32::INFINITY, 0.0, 0.0]] {
            assert_eq!(
                graph.set_node_value(constant, value),
                Err(MaterialGraphError::NonFiniteValue(constant))
            );
        }
        assert_eq!(graph.node(constant).unwrap().data.value(), Some([0.0; 4]));

        // values that bypass the setter are caught by validation
        graph.graph.node_mut(constant).unwrap().data.set_value([f32::NAN, f32::INFINITY, 0.0, 0.0]);
        let mut diagnostics = Diagnostics::new();
        assert!(!graph.validate(&mut diagnostics));
        assert!(diagnostics.mentions("value must be finite"));
    }

    #[test]
    fn test_names_cannot_be_glsl_reserved_words() {
        let mut graph = toon_graph();
        for name in ["float", "vec3", "struct"] {
            let key = graph.add_node(MaterialNodeType::Variable, [0.0, 0.0]).unwrap();
            graph.set_node_name(key, name).unwrap();
        }

        let mut diagnostics = Diagnostics::new();
        assert!(!graph.validate(&mut diagnostics));
        assert_eq!(diagnostics.error_count(), 3);
        assert!(diagnostics.mentions("'vec3' is a GLSL reserved word"));
    }

    #[test]
    fn test_editing_helpers() {
        let mut graph = toon_graph();
        let sin = graph.add_node(MaterialNodeType::Math(MathOp::Sin), [0.0, 0.0]).unwrap();
        graph.set_position(sin, [10.0, 20.0]).unwrap();
        graph.set_z_order(sin, 3).unwrap();
        assert_eq!(graph.node(sin).unwrap().position, [10.0, 20.0]);
        assert_eq!(graph.node(sin).unwrap().z_order, 3);
        assert_eq!(graph.set_node_name(sin, "x"), Err(MaterialGraphError::Unnamed(sin)));
        assert_eq!(graph.set_node_value(sin, [0.0; 4]), Err(MaterialGraphError::NoValue(sin)));

        graph.output_state_mut().unwrap().depth_write = false;
        assert!(!graph.output_state().unwrap().depth_write);

        graph.remove_node(sin).unwrap();
        assert!(matches!(graph.remove_node(sin), Err(MaterialGraphError::NodeNotFound(_))));
    }
}

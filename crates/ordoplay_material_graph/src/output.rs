// SPDX-License-Identifier: MIT OR Apache-2.0
//! The material Output node: connectors derived from the family and the
//! fixed-function state authored alongside the graph.

use crate::family::MaterialFamilyDefinition;
use ordoplay_logic_graph::{ConnectorType, InputConnector, NodeKey};
use serde::{Deserialize, Serialize};

/// Key the Output node is pinned to
pub const OUTPUT_NODE_KEY: NodeKey = NodeKey(0);

/// Name of the optional normal input of the Output node
pub const NORMAL_CONNECTOR_NAME: &str = "normal";

/// Face culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CullMode {
    /// Draw both faces
    None,
    /// Cull front faces
    Front,
    /// Cull back faces
    #[default]
    Back,
}

/// Depth comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CompareOp {
    /// Never passes
    Never,
    /// Passes if less
    #[default]
    Less,
    /// Passes if equal
    Equal,
    /// Passes if less or equal
    LessOrEqual,
    /// Passes if greater
    Greater,
    /// Passes if not equal
    NotEqual,
    /// Passes if greater or equal
    GreaterOrEqual,
    /// Always passes
    Always,
}

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Blend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[allow(missing_docs)]
pub enum BlendOp {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Color blending of the material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlendState {
    /// Whether blending is enabled
    pub enabled: bool,
    /// Source color factor
    pub src_color: BlendFactor,
    /// Destination color factor
    pub dst_color: BlendFactor,
    /// Color operation
    pub color_op: BlendOp,
    /// Source alpha factor
    pub src_alpha: BlendFactor,
    /// Destination alpha factor
    pub dst_alpha: BlendFactor,
    /// Alpha operation
    pub alpha_op: BlendOp,
}

impl BlendState {
    /// Standard alpha blending
    pub fn alpha_blending() -> Self {
        Self {
            enabled: true,
            src_color: BlendFactor::SrcAlpha,
            dst_color: BlendFactor::OneMinusSrcAlpha,
            color_op: BlendOp::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::OneMinusSrcAlpha,
            alpha_op: BlendOp::Add,
        }
    }
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            enabled: false,
            src_color: BlendFactor::One,
            dst_color: BlendFactor::Zero,
            color_op: BlendOp::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            alpha_op: BlendOp::Add,
        }
    }
}

/// Fixed-function state carried by the Output node.
///
/// Not used by code generation; handed to the pipeline setup unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputState {
    /// Face culling
    pub cull_mode: CullMode,
    /// Depth test enabled
    pub depth_test: bool,
    /// Depth writes enabled
    pub depth_write: bool,
    /// Depth comparison
    pub depth_compare: CompareOp,
    /// Color blending
    pub blend: BlendState,
}

impl Default for OutputState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            depth_test: true,
            depth_write: true,
            depth_compare: CompareOp::Less,
            blend: BlendState::default(),
        }
    }
}

/// Payload of the Output node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputNode {
    /// Fixed-function state
    #[serde(default)]
    pub state: OutputState,
}

/// Input connectors of the Output node for a family: one per light input,
/// then `normal` when the family uses normals. All are optional.
pub fn output_connectors(family: &MaterialFamilyDefinition) -> Vec<InputConnector> {
    let mut inputs: Vec<InputConnector> = family
        .light_inputs()
        .iter()
        .map(|input| InputConnector::new(input.name.clone(), input.ty).with_default(input.default_value))
        .collect();

    if family.requires_normals() {
        inputs.push(InputConnector::new(NORMAL_CONNECTOR_NAME, ConnectorType::Vec3).optional());
    }
    inputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::FamilyRequirements;
    use crate::registry::toon_family;

    #[test]
    fn test_connectors_follow_light_inputs() {
        let family = toon_family();
        let inputs = output_connectors(&family);

        assert_eq!(inputs.len(), family.light_inputs().len() + 1);
        for (connector, light_input) in inputs.iter().zip(family.light_inputs()) {
            assert_eq!(connector.name, light_input.name);
            assert_eq!(connector.ty(), light_input.ty);
            assert!(!connector.required);
        }
        let normal = inputs.last().unwrap();
        assert_eq!(normal.name, NORMAL_CONNECTOR_NAME);
        assert_eq!(normal.default_value, None);
    }

    #[test]
    fn test_no_normal_connector_without_normals() {
        let mut family = toon_family();
        family.set_requirement(FamilyRequirements::NORMALS, false);
        let inputs = output_connectors(&family);
        assert!(inputs.iter().all(|i| i.name != NORMAL_CONNECTOR_NAME));
    }
}

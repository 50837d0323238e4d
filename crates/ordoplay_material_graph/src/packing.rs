// SPDX-License-Identifier: MIT OR Apache-2.0
//! Layout of material variables in the fixed-size material data buffer.
//!
//! The packer is a deterministic first-fit heuristic rather than general bin
//! packing. Fields are ordered by descending width; every three-component
//! field is completed to four components with the last remaining scalar
//! field, or with a padding float if none is left. Two- and one-component
//! fields are laid out as they come.

use crate::naming::PADDING_PREFIX;
use ordoplay_logic_graph::NodeKey;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// A value waiting to be placed in the buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCandidate {
    /// Variable node the value belongs to
    pub node: NodeKey,
    /// Field name
    pub name: String,
    /// Width in float components (1-4)
    pub component_count: u8,
}

impl FieldCandidate {
    /// Create a candidate
    pub fn new(node: NodeKey, name: impl Into<String>, component_count: u8) -> Self {
        Self {
            node,
            name: name.into(),
            component_count,
        }
    }
}

/// A placed field of the material data struct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableNodeStructField {
    /// Variable node, or `None` for padding
    pub node: Option<NodeKey>,
    /// Field name
    pub name: String,
    /// Offset in float components from the start of the struct
    pub offset: u32,
    /// Width in float components (1-4)
    pub component_count: u8,
}

impl VariableNodeStructField {
    fn padding(index: u32) -> Self {
        Self {
            node: None,
            name: format!("{PADDING_PREFIX}{index}"),
            offset: 0,
            component_count: 1,
        }
    }

    /// Whether this is a synthetic padding field
    pub fn is_padding(&self) -> bool {
        self.node.is_none()
    }
}

impl fmt::Display for VariableNodeStructField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}+{}]", self.name, self.offset, self.component_count)
    }
}

impl From<FieldCandidate> for VariableNodeStructField {
    fn from(candidate: FieldCandidate) -> Self {
        Self {
            node: Some(candidate.node),
            name: candidate.name,
            offset: 0,
            component_count: candidate.component_count,
        }
    }
}

/// Result of packing the material variables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDataLayout {
    /// Fields in struct order
    pub fields: Vec<VariableNodeStructField>,
    /// Footprint of all fields in float components
    pub total_components: u32,
}

impl MaterialDataLayout {
    /// Footprint in four-component slots, rounded up
    pub fn vec4_slots(&self) -> u32 {
        self.total_components.div_ceil(4)
    }

    /// Field of a Variable node
    pub fn field_for(&self, node: NodeKey) -> Option<&VariableNodeStructField> {
        self.fields.iter().find(|f| f.node == Some(node))
    }

    /// Fields that hold a variable
    pub fn variables(&self) -> impl Iterator<Item = &VariableNodeStructField> {
        self.fields.iter().filter(|f| !f.is_padding())
    }
}

/// Errors from [`pack_material_data`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackingError {
    /// The packed fields do not fit in the budget
    #[error(
        "Material data needs {required} components but the budget is {budget}; layout: {}",
        format_fields(.fields)
    )]
    Overflow {
        /// Footprint of the packed fields
        required: u32,
        /// Configured budget
        budget: u32,
        /// The sorted and padded field list
        fields: Vec<VariableNodeStructField>,
    },

    /// A candidate is not 1-4 components wide
    #[error("Field '{name}' has invalid width {count}")]
    InvalidComponentCount {
        /// Field name
        name: String,
        /// Offending width
        count: u8,
    },
}

fn format_fields(fields: &[VariableNodeStructField]) -> String {
    fields.iter().map(|f| f.to_string()).collect::<Vec<_>>().join(", ")
}

/// Pack material variables into a buffer of `budget` float components.
///
/// With `pad_to_budget` set, the tail is filled with padding floats so the
/// struct always spans the whole budget.
pub fn pack_material_data(
    candidates: &[FieldCandidate],
    budget: u32,
    pad_to_budget: bool,
) -> Result<MaterialDataLayout, PackingError> {
    if let Some(bad) = candidates.iter().find(|c| !(1..=4).contains(&c.component_count)) {
        return Err(PackingError::InvalidComponentCount {
            name: bad.name.clone(),
            count: bad.component_count,
        });
    }

    let mut sorted = candidates.to_vec();
    sorted.sort_by_key(|c| Reverse(c.component_count));
    let mut remaining: VecDeque<FieldCandidate> = sorted.into();

    let mut fields = Vec::with_capacity(remaining.len());
    let mut padding_count = 0;

    while let Some(field) = remaining.pop_front() {
        let three_wide = field.component_count == 3;
        fields.push(VariableNodeStructField::from(field));

        if three_wide {
            if remaining.back().is_some_and(|c| c.component_count == 1) {
                if let Some(filler) = remaining.pop_back() {
                    fields.push(filler.into());
                }
            } else {
                fields.push(VariableNodeStructField::padding(padding_count));
                padding_count += 1;
            }
        }
        // Two scalars or a pair of two-component fields are not merged.
    }

    let mut total = 0;
    for field in &mut fields {
        field.offset = total;
        total += u32::from(field.component_count);
    }

    if total > budget {
        tracing::debug!(total, budget, "Material data overflow");
        return Err(PackingError::Overflow {
            required: total,
            budget,
            fields,
        });
    }

    if pad_to_budget {
        while total < budget {
            let mut padding = VariableNodeStructField::padding(padding_count);
            padding.offset = total;
            fields.push(padding);
            padding_count += 1;
            total += 1;
        }
    }

    Ok(MaterialDataLayout {
        fields,
        total_components: total,
    })
}

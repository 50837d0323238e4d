// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connector definitions for node inputs/outputs.
//!
//! Connectors are fixed slots on a node. A node never gains or loses slots
//! while it lives in a graph (short of an explicit rebuild); what changes at
//! runtime is the value type carried by a slot and whether it is enabled.

use crate::node::NodeKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a connector within its node's input or output list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorId(pub u16);

impl ConnectorId {
    /// Index into the owning connector list
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl From<u16> for ConnectorId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value type that can flow through a connector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorType {
    /// Scalar
    Float,
    /// 2-component vector
    Vec2,
    /// 3-component vector
    Vec3,
    /// 4-component vector
    Vec4,
}

impl ConnectorType {
    /// All types, ordered by component count
    pub const ALL: [ConnectorType; 4] = [Self::Float, Self::Vec2, Self::Vec3, Self::Vec4];

    /// Number of float components
    pub fn component_count(self) -> u8 {
        match self {
            Self::Float => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
        }
    }

    /// Type with the given component count (1-4)
    pub fn from_component_count(count: u8) -> Option<Self> {
        match count {
            1 => Some(Self::Float),
            2 => Some(Self::Vec2),
            3 => Some(Self::Vec3),
            4 => Some(Self::Vec4),
            _ => None,
        }
    }

    /// Check if this type can connect to another type.
    ///
    /// There is no implicit widening or narrowing.
    pub fn can_connect_to(self, other: ConnectorType) -> bool {
        self == other
    }
}

impl fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Float => "Float",
            Self::Vec2 => "Vec2",
            Self::Vec3 => "Vec3",
            Self::Vec4 => "Vec4",
        };
        f.write_str(name)
    }
}

/// Incoming edge of an input connector: the producing node and its output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Producer node
    pub node: NodeKey,
    /// Producer output connector
    pub output: ConnectorId,
}

impl Edge {
    /// Create a new edge reference
    pub fn new(node: NodeKey, output: ConnectorId) -> Self {
        Self { node, output }
    }
}

/// Runtime-mutable part of a connector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectorShape {
    /// Value type
    pub ty: ConnectorType,
    /// Whether the slot is currently exposed
    pub enabled: bool,
}

impl ConnectorShape {
    /// Enabled slot of the given type
    pub fn enabled(ty: ConnectorType) -> Self {
        Self { ty, enabled: true }
    }

    /// Disabled slot of the given type
    pub fn disabled(ty: ConnectorType) -> Self {
        Self { ty, enabled: false }
    }
}

/// An input slot on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputConnector {
    /// Connector name
    pub name: String,
    ty: ConnectorType,
    enabled: bool,
    /// Whether a disconnected input without a default is an error
    pub required: bool,
    /// Literal used when the input is disconnected, truncated to the arity
    pub default_value: Option<[f32; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    link: Option<Edge>,
}

impl InputConnector {
    /// Create a new required input
    pub fn new(name: impl Into<String>, ty: ConnectorType) -> Self {
        Self {
            name: name.into(),
            ty,
            enabled: true,
            required: true,
            default_value: None,
            link: None,
        }
    }

    /// Set the default value, which also makes the input optional
    pub fn with_default(mut self, value: [f32; 4]) -> Self {
        self.default_value = Some(value);
        self.required = false;
        self
    }

    /// Mark as optional without a default
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Start out disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Value type
    pub fn ty(&self) -> ConnectorType {
        self.ty
    }

    /// Whether the slot is exposed
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Incoming edge, if any
    pub fn link(&self) -> Option<Edge> {
        self.link
    }

    /// Whether an edge is attached
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Current type and enabled state
    pub fn shape(&self) -> ConnectorShape {
        ConnectorShape {
            ty: self.ty,
            enabled: self.enabled,
        }
    }

    pub(crate) fn set_link(&mut self, link: Option<Edge>) -> Option<Edge> {
        std::mem::replace(&mut self.link, link)
    }

    pub(crate) fn set_shape(&mut self, shape: ConnectorShape) {
        self.ty = shape.ty;
        self.enabled = shape.enabled;
    }
}

/// An output slot on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConnector {
    /// Connector name
    pub name: String,
    ty: ConnectorType,
    enabled: bool,
}

impl OutputConnector {
    /// Create a new enabled output
    pub fn new(name: impl Into<String>, ty: ConnectorType) -> Self {
        Self {
            name: name.into(),
            ty,
            enabled: true,
        }
    }

    /// Start out disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Value type
    pub fn ty(&self) -> ConnectorType {
        self.ty
    }

    /// Whether the slot is exposed
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current type and enabled state
    pub fn shape(&self) -> ConnectorShape {
        ConnectorShape {
            ty: self.ty,
            enabled: self.enabled,
        }
    }

    pub(crate) fn set_shape(&mut self, shape: ConnectorShape) {
        self.ty = shape.ty;
        self.enabled = shape.enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_counts() {
        for ty in ConnectorType::ALL {
            assert_eq!(ConnectorType::from_component_count(ty.component_count()), Some(ty));
        }
        assert_eq!(ConnectorType::from_component_count(0), None);
        assert_eq!(ConnectorType::from_component_count(5), None);
    }

    #[test]
    fn test_exact_type_compatibility() {
        assert!(ConnectorType::Vec3.can_connect_to(ConnectorType::Vec3));
        assert!(!ConnectorType::Float.can_connect_to(ConnectorType::Vec2));
        assert!(!ConnectorType::Vec4.can_connect_to(ConnectorType::Vec3));
    }

    #[test]
    fn test_default_makes_input_optional() {
        let input = InputConnector::new("a", ConnectorType::Float);
        assert!(input.required);

        let input = input.with_default([0.5, 0.0, 0.0, 0.0]);
        assert!(!input.required);
        assert_eq!(input.default_value, Some([0.5, 0.0, 0.0, 0.0]));
    }
}

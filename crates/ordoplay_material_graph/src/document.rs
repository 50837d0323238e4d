// SPDX-License-Identifier: MIT OR Apache-2.0
//! JSON documents of material graphs.
//!
//! A document stores the graph next to a `materialInfo` header naming the
//! family it was authored against and that family's content hash. A hash
//! mismatch on load is reported as a warning and the Output node is
//! refreshed to the current family.

use crate::family_codec::family_hash;
use crate::graph::{MaterialGraphConfig, MaterialGraphError, MaterialLogicGraph};
use crate::node::MaterialNode;
use crate::output::OUTPUT_NODE_KEY;
use crate::registry::{FamilyId, FamilyRegistry};
use ordoplay_logic_graph::{Diagnostics, LogicGraph};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current document version
pub const MATERIAL_GRAPH_VERSION: u32 = 1;

/// File extension used for material graph documents
pub const MATERIAL_GRAPH_EXTENSION: &str = "opmat";

/// Header of a material graph document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialInfo {
    /// Document version
    pub version: u32,
    /// Family the graph is bound to
    #[serde(rename = "familyID")]
    pub family_id: FamilyId,
    /// Content hash of the family when the graph was saved
    pub family_hash: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRef<'a> {
    material_info: MaterialInfo,
    graph: &'a LogicGraph<MaterialNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    material_info: MaterialInfo,
    graph: LogicGraph<MaterialNode>,
}

/// Errors reading or writing material graph documents
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Malformed JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Written by a newer version
    #[error("Unsupported material graph version {0}")]
    UnsupportedVersion(u32),

    /// The family is not in the registry
    #[error("Unknown material family {0}")]
    UnknownFamily(FamilyId),

    /// Key 0 does not hold the Output node
    #[error("Material graph has no Output node")]
    MissingOutputNode,

    /// The Output node could not be refreshed
    #[error(transparent)]
    Graph(#[from] MaterialGraphError),
}

impl MaterialLogicGraph {
    /// Header describing the graph and its family as they are now
    pub fn material_info(&self) -> MaterialInfo {
        MaterialInfo {
            version: MATERIAL_GRAPH_VERSION,
            family_id: self.family_id(),
            family_hash: family_hash(self.family()),
        }
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String, DocumentError> {
        let document = DocumentRef {
            material_info: self.material_info(),
            graph: self.graph(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Deserialize from JSON, resolving the family through `registry`.
    ///
    /// A family hash mismatch adds a warning to `diagnostics` and rebuilds
    /// the Output node's inputs for the current family.
    pub fn from_json(
        json: &str,
        registry: &FamilyRegistry,
        config: MaterialGraphConfig,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, DocumentError> {
        let document: Document = serde_json::from_str(json)?;
        let info = document.material_info;
        if info.version == 0 || info.version > MATERIAL_GRAPH_VERSION {
            return Err(DocumentError::UnsupportedVersion(info.version));
        }

        let family = registry
            .get(info.family_id)
            .cloned()
            .ok_or(DocumentError::UnknownFamily(info.family_id))?;

        if !matches!(
            document.graph.node(OUTPUT_NODE_KEY).map(|n| &n.data),
            Some(MaterialNode::Output(_))
        ) {
            return Err(DocumentError::MissingOutputNode);
        }

        let current_hash = family_hash(&family);
        let mut graph = Self::from_parts(document.graph, info.family_id, family, config);

        if current_hash != info.family_hash {
            tracing::warn!(
                family = graph.family().name(),
                saved = info.family_hash,
                current = current_hash,
                "Material family changed since the graph was saved"
            );
            let restored = graph.refresh_output_connectors()?;
            diagnostics.warning(
                Some(OUTPUT_NODE_KEY),
                format!(
                    "family '{}' changed since the graph was saved; Output node rebuilt, {restored} edge(s) kept",
                    graph.family().name()
                ),
            );
        }

        Ok(graph)
    }

    /// Write the graph to a JSON file
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        tracing::info!("Saved material graph to {:?}", path);
        Ok(())
    }

    /// Read a graph from a JSON file
    pub fn load(
        path: &Path,
        registry: &FamilyRegistry,
        config: MaterialGraphConfig,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, DocumentError> {
        let json = std::fs::read_to_string(path)?;
        let graph = Self::from_json(&json, registry, config, diagnostics)?;
        tracing::info!("Loaded material graph from {:?}", path);
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{MaterialNodeType, ModeId};
    use crate::output::CullMode;

    fn registry_and_graph() -> (FamilyRegistry, MaterialLogicGraph) {
        let registry = FamilyRegistry::with_builtin_families();
        let id = FamilyId::from_name("Toon");
        let family = registry.get(id).unwrap().clone();
        (registry, MaterialLogicGraph::new(id, family, MaterialGraphConfig::default()))
    }

    #[test]
    fn test_json_shape() {
        let (_, graph) = registry_and_graph();
        let value: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();

        let info = &value["materialInfo"];
        assert_eq!(info["version"], 1);
        assert_eq!(info["familyID"], FamilyId::from_name("Toon").to_string());
        assert_eq!(info["familyHash"], family_hash(graph.family()));
        assert_eq!(value["graph"]["nextKey"], 1);
        assert_eq!(value["graph"]["nodes"][0]["data"]["type"], "Output");
    }

    #[test]
    fn test_reload_keeps_nodes_and_edges() {
        let (registry, mut graph) = registry_and_graph();
        let constant = graph.add_node(MaterialNodeType::Constant, [4.0, 2.0]).unwrap();
        graph.set_mode(constant, ModeId(2)).unwrap();
        graph.set_node_value(constant, [1.0, 0.0, 1.0, 0.0]).unwrap();
        graph.connect_by_name(OUTPUT_NODE_KEY, "diffuseColor", constant, "value").unwrap();
        graph.output_state_mut().unwrap().cull_mode = CullMode::None;

        let mut diagnostics = Diagnostics::new();
        let loaded = MaterialLogicGraph::from_json(
            &graph.to_json().unwrap(),
            &registry,
            MaterialGraphConfig::default(),
            &mut diagnostics,
        )
        .unwrap();

        assert!(diagnostics.is_empty());
        assert_eq!(loaded.graph(), graph.graph());
        assert_eq!(loaded.output_state().unwrap().cull_mode, CullMode::None);
        assert_eq!(loaded.graph().next_key(), 2);
    }

    #[test]
    fn test_stale_family_hash_warns_and_refreshes() {
        let (registry, graph) = registry_and_graph();
        let mut value: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
        value["materialInfo"]["familyHash"] = serde_json::json!(12345u64);

        let mut diagnostics = Diagnostics::new();
        let loaded = MaterialLogicGraph::from_json(
            &value.to_string(),
            &registry,
            MaterialGraphConfig::default(),
            &mut diagnostics,
        )
        .unwrap();

        assert!(!diagnostics.has_errors());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics.mentions("changed since the graph was saved"));
        assert_eq!(loaded.material_info().family_hash, family_hash(loaded.family()));
    }

    #[test]
    fn test_load_errors() {
        let (registry, graph) = registry_and_graph();
        let mut diagnostics = Diagnostics::new();
        let config = MaterialGraphConfig::default;

        let mut value: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
        value["materialInfo"]["version"] = serde_json::json!(7);
        assert!(matches!(
            MaterialLogicGraph::from_json(&value.to_string(), &registry, config(), &mut diagnostics),
            Err(DocumentError::UnsupportedVersion(7))
        ));

        let empty = FamilyRegistry::new();
        assert!(matches!(
            MaterialLogicGraph::from_json(&graph.to_json().unwrap(), &empty, config(), &mut diagnostics),
            Err(DocumentError::UnknownFamily(_))
        ));

        let mut value: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
        value["graph"]["nodes"] = serde_json::json!([]);
        assert!(matches!(
            MaterialLogicGraph::from_json(&value.to_string(), &registry, config(), &mut diagnostics),
            Err(DocumentError::MissingOutputNode)
        ));

        assert!(matches!(
            MaterialLogicGraph::from_json("{", &registry, config(), &mut diagnostics),
            Err(DocumentError::Json(_))
        ));
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material logic graph for `OrdoPlay`.
//!
//! This crate turns node graphs authored against a material family into
//! shader code:
//! - Material families (light inputs, requirements, code snippets) and their
//!   binary definition files
//! - The material node catalogue, including modal nodes
//! - Validation and packing of material variables into a fixed-size buffer
//! - GLSL generation, one block per node in dependency order
//! - JSON documents with family staleness detection
//!
//! ## Architecture
//!
//! [`MaterialLogicGraph`] wraps a [`LogicGraph`](ordoplay_logic_graph::LogicGraph)
//! of [`MaterialNode`]s and is bound to one [`MaterialFamilyDefinition`]
//! looked up in a session-scoped [`FamilyRegistry`].

pub mod codegen;
pub mod document;
pub mod family;
pub mod family_codec;
pub mod glsl;
pub mod graph;
pub mod language;
pub mod naming;
pub mod node;
pub mod output;
pub mod packing;
pub mod platform;
pub mod registry;
pub mod shared;

pub use codegen::{CodeGenError, GeneratedMaterialCode, TextureBinding};
pub use document::{DocumentError, MaterialInfo, MATERIAL_GRAPH_VERSION};
pub use family::{
    CodeSnippet, FamilyCode, FamilyError, FamilyRequirements, LightProcessingFunctionInput,
    MaterialFamilyDefinition, PerFrameDataSets, VertexShaderOutput,
};
pub use family_codec::{decode_family, encode_family, family_hash, load_family, save_family, FamilyCodecError};
pub use graph::{MaterialGraphConfig, MaterialGraphError, MaterialLogicGraph};
pub use language::ShaderLanguage;
pub use node::{BuiltInInput, MaterialNode, MaterialNodeType, MathOp, ModeId, NodeCategory};
pub use output::{OutputState, NORMAL_CONNECTOR_NAME, OUTPUT_NODE_KEY};
pub use packing::{pack_material_data, FieldCandidate, MaterialDataLayout, PackingError, VariableNodeStructField};
pub use platform::{PlatformInfo, TextureCompressionFamily, VertexAttributeSemantic, VertexLayout};
pub use registry::{FamilyId, FamilyRegistry};
pub use shared::SharedMaterialGraph;

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Binary format of material family definitions.
//!
//! Layout: 5-byte magic, little-endian `u16` version, then a bincode body
//! (fixed-width integers, little-endian, `u64` length prefixes) holding, in
//! order: name, language list, requirement bitset, light inputs, vertex and
//! fragment per-frame bitsets, per-language code snippets and the additional
//! vertex outputs.

use crate::family::{
    FamilyCode, FamilyError, FamilyRequirements, LightProcessingFunctionInput,
    MaterialFamilyDefinition, PerFrameDataSets, VertexShaderOutput,
};
use crate::language::ShaderLanguage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// File magic
pub const FAMILY_MAGIC: [u8; 5] = *b"OPMFD";

/// Current format version
pub const FAMILY_FORMAT_VERSION: u16 = 1;

/// File extension used for family definition files
pub const FAMILY_FILE_EXTENSION: &str = "opfamily";

const HEADER_LEN: usize = FAMILY_MAGIC.len() + 2;

// The vertex color channel count lives above the boolean requirement bits.
const VERTEX_COLOR_SHIFT: u32 = 32;
const VERTEX_COLOR_MASK: u64 = 0xF;

/// Errors reading or writing family definitions
#[derive(Debug, Error)]
pub enum FamilyCodecError {
    /// Data does not start with the family magic
    #[error("Not a material family definition (bad magic)")]
    InvalidMagic,

    /// Data ends before the header does
    #[error("Material family definition is truncated")]
    Truncated,

    /// Written by a newer version
    #[error("Unsupported material family format version {0}")]
    UnsupportedVersion(u16),

    /// Body could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Decoded definition breaks an invariant
    #[error("Invalid material family definition: {0}")]
    Invalid(#[from] FamilyError),

    /// Unknown requirement bits
    #[error("Unknown requirement flags: {0:#x}")]
    UnknownFlags(u64),

    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize, Deserialize)]
struct FamilyWire {
    name: String,
    languages: Vec<ShaderLanguage>,
    flags: u64,
    light_inputs: Vec<LightProcessingFunctionInput>,
    vertex_data_sets: u64,
    fragment_data_sets: u64,
    code: Vec<FamilyCode>,
    additional_vertex_outputs: Vec<VertexShaderOutput>,
}

/// Encode a family definition
pub fn encode_family(definition: &MaterialFamilyDefinition) -> Result<Vec<u8>, FamilyCodecError> {
    let flags = definition.requirements().bits()
        | (u64::from(definition.vertex_color_channels()) << VERTEX_COLOR_SHIFT);
    let wire = FamilyWire {
        name: definition.name().to_string(),
        languages: definition.supported_languages().to_vec(),
        flags,
        light_inputs: definition.light_inputs().to_vec(),
        vertex_data_sets: definition.vertex_data_sets().bits(),
        fragment_data_sets: definition.fragment_data_sets().bits(),
        code: definition.code_table().to_vec(),
        additional_vertex_outputs: definition.additional_vertex_outputs().to_vec(),
    };

    let mut bytes = Vec::with_capacity(256);
    bytes.extend_from_slice(&FAMILY_MAGIC);
    bytes.extend_from_slice(&FAMILY_FORMAT_VERSION.to_le_bytes());
    bincode::serialize_into(&mut bytes, &wire)?;
    Ok(bytes)
}

/// Decode and validate a family definition
pub fn decode_family(bytes: &[u8]) -> Result<MaterialFamilyDefinition, FamilyCodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(if bytes.starts_with(&FAMILY_MAGIC[..bytes.len().min(FAMILY_MAGIC.len())]) {
            FamilyCodecError::Truncated
        } else {
            FamilyCodecError::InvalidMagic
        });
    }
    if bytes[..FAMILY_MAGIC.len()] != FAMILY_MAGIC {
        return Err(FamilyCodecError::InvalidMagic);
    }
    let version = u16::from_le_bytes([bytes[FAMILY_MAGIC.len()], bytes[FAMILY_MAGIC.len() + 1]]);
    if version == 0 || version > FAMILY_FORMAT_VERSION {
        return Err(FamilyCodecError::UnsupportedVersion(version));
    }

    let wire: FamilyWire = bincode::deserialize(&bytes[HEADER_LEN..])?;

    let requirement_bits = wire.flags & !(VERTEX_COLOR_MASK << VERTEX_COLOR_SHIFT);
    let requirements = FamilyRequirements::from_bits(requirement_bits)
        .ok_or(FamilyCodecError::UnknownFlags(requirement_bits))?;
    let vertex_color_channels = ((wire.flags >> VERTEX_COLOR_SHIFT) & VERTEX_COLOR_MASK) as u8;

    let definition = MaterialFamilyDefinition::from_parts(
        wire.name,
        wire.languages,
        requirements,
        vertex_color_channels,
        PerFrameDataSets::from_bits_truncate(wire.vertex_data_sets),
        PerFrameDataSets::from_bits_truncate(wire.fragment_data_sets),
        wire.light_inputs,
        wire.code,
        wire.additional_vertex_outputs,
    )?;
    Ok(definition)
}

/// Read a family definition file
pub fn load_family(path: &Path) -> Result<MaterialFamilyDefinition, FamilyCodecError> {
    let bytes = std::fs::read(path)?;
    let definition = decode_family(&bytes)?;
    tracing::debug!("Loaded material family {} from {:?}", definition.name(), path);
    Ok(definition)
}

/// Write a family definition file
pub fn save_family(definition: &MaterialFamilyDefinition, path: &Path) -> Result<(), FamilyCodecError> {
    let bytes = encode_family(definition)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// 64-bit FNV-1a digest of a family's content.
///
/// Stored in saved material graphs to detect graphs authored against an
/// older version of the family.
pub fn family_hash(definition: &MaterialFamilyDefinition) -> u64 {
    let mut h = Fnv1a64::new();
    h.write_str(definition.name());
    h.write_u64(definition.supported_languages().len() as u64);
    for language in definition.supported_languages() {
        h.write_u64(match language {
            ShaderLanguage::GlslVulkan => 0,
            ShaderLanguage::Hlsl => 1,
        });
    }
    h.write_u64(definition.requirements().bits());
    h.write_u64(u64::from(definition.vertex_color_channels()));
    h.write_u64(definition.vertex_data_sets().bits());
    h.write_u64(definition.fragment_data_sets().bits());

    h.write_u64(definition.light_inputs().len() as u64);
    for input in definition.light_inputs() {
        h.write_str(&input.name);
        h.write_u64(u64::from(input.ty.component_count()));
        for v in input.default_value {
            h.write_u64(u64::from(v.to_bits()));
        }
    }

    for code in definition.code_table() {
        h.write_str(&code.additional_vertex_processing);
        h.write_str(&code.light_processing);
        h.write_str(&code.compositing);
    }

    h.write_u64(definition.additional_vertex_outputs().len() as u64);
    for output in definition.additional_vertex_outputs() {
        h.write_str(&output.name);
        h.write_u64(u64::from(output.ty.component_count()));
    }
    h.finish()
}

struct Fnv1a64 {
    state: u64,
}

impl Fnv1a64 {
    fn new() -> Self {
        Self {
            state: 0xcbf29ce484222325,
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.state ^= u64::from(*b);
            self.state = self.state.wrapping_mul(0x100000001b3);
        }
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write_bytes(s.as_bytes());
    }

    fn finish(&self) -> u64 {
        self.state
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Platform and vertex layout descriptors.
//!
//! Both are owned by the surrounding engine and only read during code
//! generation and shader assembly.

use serde::{Deserialize, Serialize};

/// Preferred block-compression family of a target platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TextureCompressionFamily {
    /// BC1-BC7 (desktop)
    #[default]
    Bc,
    /// ETC2/EAC (mobile, GLES 3)
    Etc2,
    /// ASTC (mobile)
    Astc,
    /// No compression
    Uncompressed,
}

impl TextureCompressionFamily {
    /// Channels a compressed normal map keeps on this family
    pub fn normal_map_channels(&self) -> u8 {
        match self {
            Self::Bc | Self::Etc2 => 2,
            Self::Astc | Self::Uncompressed => 3,
        }
    }
}

/// Platform properties relevant to material code generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformInfo {
    /// Texture compression family
    pub texture_compression: TextureCompressionFamily,
    /// Number of channels stored in normal maps (2 or 3)
    pub normal_map_channels: u8,
}

impl PlatformInfo {
    /// Platform info derived from a compression family
    pub fn for_compression(texture_compression: TextureCompressionFamily) -> Self {
        Self {
            texture_compression,
            normal_map_channels: texture_compression.normal_map_channels(),
        }
    }
}

impl Default for PlatformInfo {
    fn default() -> Self {
        Self::for_compression(TextureCompressionFamily::default())
    }
}

/// Meaning of a vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexAttributeSemantic {
    /// Object-space position
    Position,
    /// Object-space normal
    Normal,
    /// Object-space tangent
    Tangent,
    /// Object-space bitangent
    Bitangent,
    /// First texture coordinate set
    TextureCoordinates,
    /// Vertex color
    Color,
    /// Skinning bone indices
    BoneIndices,
    /// Skinning bone weights
    BoneWeights,
}

impl VertexAttributeSemantic {
    /// Name used for the attribute in generated vertex shaders
    pub fn attribute_name(&self) -> &'static str {
        match self {
            Self::Position => "inPosition",
            Self::Normal => "inNormal",
            Self::Tangent => "inTangent",
            Self::Bitangent => "inBitangent",
            Self::TextureCoordinates => "inUV",
            Self::Color => "inColor",
            Self::BoneIndices => "inBoneIndices",
            Self::BoneWeights => "inBoneWeights",
        }
    }
}

/// Storage format of a vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexAttributeFormat {
    /// Two 32-bit floats
    Float32x2,
    /// Three 32-bit floats
    Float32x3,
    /// Four 32-bit floats
    Float32x4,
    /// Four normalized bytes
    Unorm8x4,
    /// Four unsigned bytes
    Uint8x4,
}

impl VertexAttributeFormat {
    /// Number of components
    pub fn component_count(&self) -> u8 {
        match self {
            Self::Float32x2 => 2,
            Self::Float32x3 => 3,
            Self::Float32x4 | Self::Unorm8x4 | Self::Uint8x4 => 4,
        }
    }

    /// Size in bytes
    pub fn size(&self) -> u32 {
        match self {
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
            Self::Float32x4 => 16,
            Self::Unorm8x4 | Self::Uint8x4 => 4,
        }
    }

    /// GLSL type the attribute is read as
    pub fn glsl_type(&self) -> &'static str {
        match self {
            Self::Float32x2 => "vec2",
            Self::Float32x3 => "vec3",
            Self::Float32x4 | Self::Unorm8x4 => "vec4",
            Self::Uint8x4 => "uvec4",
        }
    }
}

/// One attribute of a vertex layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexAttribute {
    /// Meaning
    pub semantic: VertexAttributeSemantic,
    /// Storage format
    pub format: VertexAttributeFormat,
    /// Byte offset within the vertex
    pub offset: u32,
}

/// Vertex layout of a mesh format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexLayout {
    /// Layout name, used to name generated vertex shaders
    pub name: String,
    /// Attributes in binding order
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Create a layout, computing tightly packed offsets
    pub fn packed(
        name: impl Into<String>,
        attributes: &[(VertexAttributeSemantic, VertexAttributeFormat)],
    ) -> Self {
        let mut offset = 0;
        let attributes = attributes
            .iter()
            .map(|&(semantic, format)| {
                let attribute = VertexAttribute {
                    semantic,
                    format,
                    offset,
                };
                offset += format.size();
                attribute
            })
            .collect();
        Self {
            name: name.into(),
            attributes,
        }
    }

    /// Position, normal, tangent, bitangent and UV
    pub fn mesh() -> Self {
        use VertexAttributeFormat::*;
        use VertexAttributeSemantic::*;
        Self::packed(
            "Mesh",
            &[
                (Position, Float32x3),
                (Normal, Float32x3),
                (Tangent, Float32x3),
                (Bitangent, Float32x3),
                (TextureCoordinates, Float32x2),
            ],
        )
    }

    /// Mesh layout with an additional vertex color
    pub fn colored_mesh() -> Self {
        let mut layout = Self::mesh();
        layout.name = "ColoredMesh".to_string();
        let offset = layout.stride();
        layout.attributes.push(VertexAttribute {
            semantic: VertexAttributeSemantic::Color,
            format: VertexAttributeFormat::Unorm8x4,
            offset,
        });
        layout
    }

    /// Position and color only, used for debug geometry
    pub fn debug_lines() -> Self {
        Self::packed(
            "DebugLines",
            &[
                (VertexAttributeSemantic::Position, VertexAttributeFormat::Float32x3),
                (VertexAttributeSemantic::Color, VertexAttributeFormat::Unorm8x4),
            ],
        )
    }

    /// Get the attribute with the given semantic
    pub fn attribute(&self, semantic: VertexAttributeSemantic) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.semantic == semantic)
    }

    /// Whether the layout has the given semantic
    pub fn has(&self, semantic: VertexAttributeSemantic) -> bool {
        self.attribute(semantic).is_some()
    }

    /// Size of one vertex in bytes
    pub fn stride(&self) -> u32 {
        self.attributes
            .iter()
            .map(|a| a.offset + a.format.size())
            .max()
            .unwrap_or(0)
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Vertex program assembly, one program per compatible vertex layout.

use crate::assembler::ShaderAssembler;
use crate::blocks::{fragment_input_block, material_blocks, per_frame_blocks, Direction, TRANSFORMATIONS};
use crate::error::{AssemblyError, Result};
use ordoplay_material_graph::glsl::{BITANGENT_WS, COLOR, FRAGMENT_INPUT, NORMAL_WS, POSITION_WS, TANGENT_WS, UV};
use ordoplay_material_graph::platform::VertexAttributeFormat;
use ordoplay_material_graph::{
    CodeSnippet, MaterialFamilyDefinition, PerFrameDataSets, ShaderLanguage, TextureBinding,
    VertexAttributeSemantic, VertexLayout,
};
use std::fmt::Write;

/// Vertex attributes a family's shaders read
pub fn required_attributes(family: &MaterialFamilyDefinition) -> Vec<VertexAttributeSemantic> {
    let mut attributes = vec![VertexAttributeSemantic::Position];
    if family.requires_normals() {
        attributes.push(VertexAttributeSemantic::Normal);
    }
    if family.requires_tangents() {
        attributes.push(VertexAttributeSemantic::Tangent);
        attributes.push(VertexAttributeSemantic::Bitangent);
    }
    if family.vertex_color_channels() > 0 {
        attributes.push(VertexAttributeSemantic::Color);
    }
    if family.requires_texture_coordinates() {
        attributes.push(VertexAttributeSemantic::TextureCoordinates);
    }
    attributes
}

/// Attributes the family needs that `layout` does not have
pub fn missing_attributes(family: &MaterialFamilyDefinition, layout: &VertexLayout) -> Vec<VertexAttributeSemantic> {
    required_attributes(family)
        .into_iter()
        .filter(|semantic| !layout.has(*semantic))
        .collect()
}

impl ShaderAssembler {
    /// Assemble the vertex program of a family for one vertex layout.
    ///
    /// Fails with [`AssemblyError::IncompatibleLayout`] when the layout lacks
    /// an attribute the family needs.
    pub fn vertex_shader(
        &self,
        family: &MaterialFamilyDefinition,
        layout: &VertexLayout,
        material_data_struct: &str,
        textures: &[TextureBinding],
    ) -> Result<String> {
        let missing = missing_attributes(family, layout);
        if !missing.is_empty() {
            return Err(AssemblyError::IncompatibleLayout {
                layout: layout.name.clone(),
                missing,
            });
        }

        let config = self.config();
        let sets = family.vertex_data_sets() | PerFrameDataSets::TRANSFORMATIONS;

        let mut text = String::new();
        let _ = writeln!(text, "{}", config.glsl_version);
        text.push_str("#define VERTEX_SHADER\n\n");

        let required = required_attributes(family);
        for (location, attribute) in layout.attributes.iter().enumerate() {
            if required.contains(&attribute.semantic) {
                let _ = writeln!(
                    text,
                    "layout(location = {location}) in {} {};",
                    attribute.format.glsl_type(),
                    attribute.semantic.attribute_name()
                );
            }
        }
        text.push('\n');

        let block = fragment_input_block(family, Direction::Out);
        if !block.is_empty() {
            let _ = writeln!(text, "{block}");
        }
        text.push_str(&per_frame_blocks(config, self.lights(), sets));
        text.push_str(&material_blocks(config, sets, material_data_struct, textures));

        text.push_str("void main() {\n");
        let position = VertexAttributeSemantic::Position.attribute_name();
        let _ = writeln!(
            text,
            "    vec4 worldPosition = {TRANSFORMATIONS}.model * vec4({position}, 1.0);"
        );
        if family.requires_world_position() {
            let _ = writeln!(text, "    {FRAGMENT_INPUT}.{POSITION_WS} = worldPosition.xyz;");
        }
        if family.requires_normals() {
            let _ = writeln!(
                text,
                "    {FRAGMENT_INPUT}.{NORMAL_WS} = normalize(mat3({TRANSFORMATIONS}.normalMatrix) * {});",
                VertexAttributeSemantic::Normal.attribute_name()
            );
        }
        if family.requires_tangents() {
            let _ = writeln!(
                text,
                "    {FRAGMENT_INPUT}.{TANGENT_WS} = normalize(mat3({TRANSFORMATIONS}.model) * {});\n    \
                 {FRAGMENT_INPUT}.{BITANGENT_WS} = normalize(mat3({TRANSFORMATIONS}.model) * {});",
                VertexAttributeSemantic::Tangent.attribute_name(),
                VertexAttributeSemantic::Bitangent.attribute_name()
            );
        }
        if let Some(color) = layout.attribute(VertexAttributeSemantic::Color) {
            if family.vertex_color_channels() > 0 {
                let read = match color.format {
                    VertexAttributeFormat::Uint8x4 => format!("vec4({}) / 255.0", color.semantic.attribute_name()),
                    VertexAttributeFormat::Float32x2 => format!("vec4({}, 0.0, 1.0)", color.semantic.attribute_name()),
                    VertexAttributeFormat::Float32x3 => format!("vec4({}, 1.0)", color.semantic.attribute_name()),
                    VertexAttributeFormat::Float32x4 | VertexAttributeFormat::Unorm8x4 => {
                        color.semantic.attribute_name().to_string()
                    }
                };
                let _ = writeln!(text, "    {FRAGMENT_INPUT}.{COLOR} = {read};");
            }
        }
        if family.requires_texture_coordinates() {
            let _ = writeln!(
                text,
                "    {FRAGMENT_INPUT}.{UV} = {};",
                VertexAttributeSemantic::TextureCoordinates.attribute_name()
            );
        }
        if let Some(extra) = family.code_snippet(ShaderLanguage::GlslVulkan, CodeSnippet::AdditionalVertexProcessing) {
            if !extra.trim().is_empty() {
                text.push_str(extra);
                if !extra.ends_with('\n') {
                    text.push('\n');
                }
            }
        }
        let _ = writeln!(
            text,
            "    gl_Position = {TRANSFORMATIONS}.projection * {TRANSFORMATIONS}.view * worldPosition;"
        );
        text.push_str("}\n");

        Ok(text)
    }
}

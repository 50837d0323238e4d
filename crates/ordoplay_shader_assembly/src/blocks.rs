// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interface blocks shared by the vertex and fragment programs.

use crate::config::AssemblyConfig;
use crate::lights::LightLoopProvider;
use ordoplay_material_graph::glsl::{
    glsl_type, BITANGENT_WS, CAMERA_AND_LIGHTS, COLOR, FRAGMENT_INPUT, FRAGMENT_INPUT_BLOCK, MATERIAL_DATA,
    MATERIAL_DATA_STRUCT, NORMAL_WS, POSITION_WS, TANGENT_WS, UV,
};
use ordoplay_material_graph::{MaterialFamilyDefinition, PerFrameDataSets, TextureBinding};
use std::fmt::Write;

pub use ordoplay_material_graph::glsl::{RENDERER_DATA, TRANSFORMATIONS};

/// Direction of the vertex-to-fragment block in the program being written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    In,
    Out,
}

/// Members of the block passed from the vertex to the fragment stage
pub(crate) fn fragment_input_members(family: &MaterialFamilyDefinition) -> Vec<(&'static str, String)> {
    let mut members = Vec::new();
    if family.requires_world_position() {
        members.push(("vec3", POSITION_WS.to_string()));
    }
    if family.requires_normals() {
        members.push(("vec3", NORMAL_WS.to_string()));
    }
    if family.requires_tangents() {
        members.push(("vec3", TANGENT_WS.to_string()));
        members.push(("vec3", BITANGENT_WS.to_string()));
    }
    if family.vertex_color_channels() > 0 {
        members.push(("vec4", COLOR.to_string()));
    }
    if family.requires_texture_coordinates() {
        members.push(("vec2", UV.to_string()));
    }
    for output in family.additional_vertex_outputs() {
        members.push((glsl_type(output.ty), output.name.clone()));
    }
    members
}

pub(crate) fn fragment_input_block(family: &MaterialFamilyDefinition, direction: Direction) -> String {
    let members = fragment_input_members(family);
    if members.is_empty() {
        return String::new();
    }

    let keyword = match direction {
        Direction::In => "in",
        Direction::Out => "out",
    };
    let mut text = format!("layout(location = 0) {keyword} {FRAGMENT_INPUT_BLOCK} {{\n");
    for (ty, name) in members {
        let _ = writeln!(text, "    {ty} {name};");
    }
    let _ = writeln!(text, "}} {FRAGMENT_INPUT};");
    text
}

/// Per-frame uniform blocks selected by `sets`
pub(crate) fn per_frame_blocks(
    config: &AssemblyConfig,
    lights: &dyn LightLoopProvider,
    sets: PerFrameDataSets,
) -> String {
    let set = config.per_frame_set;
    let mut text = String::new();

    if sets.contains(PerFrameDataSets::CAMERA_AND_LIGHTS) {
        text.push_str(&lights.declarations());
        let _ = writeln!(
            text,
            "layout(set = {set}, binding = {}) uniform CameraAndLights {{",
            config.camera_and_lights_binding
        );
        text.push_str(
            "    mat4 viewMatrix;\n    mat4 projectionMatrix;\n    vec3 cameraPosition;\n    float zNear;\n    \
             vec2 screenDimensions;\n    float zFar;\n    float fieldOfView;\n",
        );
        text.push_str(&lights.block_members());
        let _ = writeln!(text, "}} {CAMERA_AND_LIGHTS};\n");
    }

    if sets.contains(PerFrameDataSets::TRANSFORMATIONS) {
        let _ = writeln!(
            text,
            "layout(set = {set}, binding = {}) uniform Transformations {{\n    mat4 model;\n    mat4 view;\n    \
             mat4 projection;\n    mat4 normalMatrix;\n}} {TRANSFORMATIONS};\n",
            config.transformations_binding
        );
    }

    if sets.contains(PerFrameDataSets::RENDERER_DATA) {
        let _ = writeln!(
            text,
            "layout(set = {set}, binding = {}) uniform RendererData {{\n    float time;\n    float deltaTime;\n    \
             uint frameIndex;\n}} {RENDERER_DATA};\n",
            config.renderer_data_binding
        );
    }

    text
}

/// Material data block and texture samplers selected by `sets`
pub(crate) fn material_blocks(
    config: &AssemblyConfig,
    sets: PerFrameDataSets,
    material_data_struct: &str,
    textures: &[TextureBinding],
) -> String {
    let set = config.material_set;
    let mut text = String::new();

    if sets.contains(PerFrameDataSets::MATERIAL_DATA) && !material_data_struct.is_empty() {
        text.push_str(material_data_struct);
        let _ = writeln!(
            text,
            "layout(std140, set = {set}, binding = {}) uniform MaterialDataBlock {{\n    \
             {MATERIAL_DATA_STRUCT} {MATERIAL_DATA};\n}};\n",
            config.material_data_binding
        );
    }

    if sets.contains(PerFrameDataSets::TEXTURES) {
        for (index, texture) in textures.iter().enumerate() {
            let _ = writeln!(
                text,
                "layout(set = {set}, binding = {}) uniform sampler2D {};",
                config.texture_binding(index),
                texture.sampler
            );
        }
        if !textures.is_empty() {
            text.push('\n');
        }
    }

    text
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fragment program assembly.
//!
//! The generated material body becomes `evaluateMaterial`, which writes the
//! family's light inputs through `out` parameters. `main` feeds those into the
//! family's light-processing function once per light and composites the
//! result.

use crate::assembler::ShaderAssembler;
use crate::blocks::{fragment_input_block, material_blocks, per_frame_blocks, Direction};
use crate::error::{AssemblyError, Result};
use crate::lights::{ACCUMULATED_LIGHT, FRAGMENT_POSITION, LIGHT_COLOR, LIGHT_DIRECTION, LIGHT_INTENSITY};
use ordoplay_material_graph::glsl::{
    glsl_type, CAMERA_AND_LIGHTS, CAMERA_DATA_AVAILABLE, FRAGMENT_INPUT, FRAGMENT_SHADER, NORMAL_AVAILABLE,
    NORMAL_WS, POSITION_WS, TANGENTS_AVAILABLE, TEXTURE_COORDINATES_AVAILABLE, VERTEX_COLOR_AVAILABLE,
    VIEW_DIRECTION, WORLD_POSITION_AVAILABLE,
};
pub use ordoplay_material_graph::glsl::{COMPOSITING_FUNCTION, FRAGMENT_OUTPUT, LIGHT_FUNCTION, MATERIAL_FUNCTION};
use ordoplay_material_graph::{
    CodeSnippet, GeneratedMaterialCode, MaterialFamilyDefinition, PerFrameDataSets, ShaderLanguage,
    NORMAL_CONNECTOR_NAME,
};
use std::fmt::Write;

/// Feature macros defined at the top of a family's fragment program
pub fn fragment_defines(family: &MaterialFamilyDefinition) -> Vec<&'static str> {
    let mut defines = vec![FRAGMENT_SHADER];
    if family.requires_normals() {
        defines.push(NORMAL_AVAILABLE);
    }
    if family.requires_tangents() {
        defines.push(TANGENTS_AVAILABLE);
    }
    if family.requires_world_position() {
        defines.push(WORLD_POSITION_AVAILABLE);
    }
    if family.vertex_color_channels() > 0 {
        defines.push(VERTEX_COLOR_AVAILABLE);
    }
    if family.requires_texture_coordinates() {
        defines.push(TEXTURE_COORDINATES_AVAILABLE);
    }
    if family.fragment_data_sets().contains(PerFrameDataSets::CAMERA_AND_LIGHTS) {
        defines.push(CAMERA_DATA_AVAILABLE);
    }
    defines
}

fn snippet<'a>(family: &'a MaterialFamilyDefinition, kind: CodeSnippet, what: &'static str) -> Result<&'a str> {
    match family.code_snippet(ShaderLanguage::GlslVulkan, kind) {
        Some(code) if !code.trim().is_empty() => Ok(code),
        _ => Err(AssemblyError::EmptySnippet {
            family: family.name().to_string(),
            snippet: what,
        }),
    }
}

impl ShaderAssembler {
    /// Assemble the fragment program of a material from its generated code
    pub fn fragment_shader(&self, family: &MaterialFamilyDefinition, code: &GeneratedMaterialCode) -> Result<String> {
        if code.language != ShaderLanguage::GlslVulkan {
            return Err(AssemblyError::UnsupportedLanguage(code.language));
        }
        let light_processing = snippet(family, CodeSnippet::LightProcessing, "light processing")?;
        let compositing = snippet(family, CodeSnippet::Compositing, "compositing")?;

        let light_params: Vec<String> = family
            .light_inputs()
            .iter()
            .map(|input| format!("{} {}", glsl_type(input.ty), input.name))
            .collect();
        let light_args: Vec<&str> = family.light_inputs().iter().map(|i| i.name.as_str()).collect();
        let sets = family.fragment_data_sets();
        let config = self.config();

        let mut text = String::new();
        let _ = writeln!(text, "{}", config.glsl_version);
        for define in fragment_defines(family) {
            let _ = writeln!(text, "#define {define}");
        }
        text.push_str(&code.preamble);
        text.push('\n');

        let block = fragment_input_block(family, Direction::In);
        if !block.is_empty() {
            let _ = writeln!(text, "{block}");
        }
        let _ = writeln!(text, "layout(location = 0) out vec4 {FRAGMENT_OUTPUT};\n");

        text.push_str(&per_frame_blocks(config, self.lights(), sets));
        text.push_str(&material_blocks(config, sets, &code.material_data_struct, &code.textures));

        // light processing
        let mut params = light_params.clone();
        params.extend([
            format!("vec3 {NORMAL_CONNECTOR_NAME}"),
            format!("vec3 {VIEW_DIRECTION}"),
            format!("vec3 {LIGHT_DIRECTION}"),
            format!("vec3 {LIGHT_COLOR}"),
            format!("float {LIGHT_INTENSITY}"),
        ]);
        let _ = writeln!(text, "vec3 {LIGHT_FUNCTION}({}) {{", params.join(", "));
        push_snippet(&mut text, light_processing);
        text.push_str("}\n\n");

        let mut params = light_params.clone();
        params.push(format!("vec3 {ACCUMULATED_LIGHT}"));
        let _ = writeln!(text, "vec4 {COMPOSITING_FUNCTION}({}) {{", params.join(", "));
        push_snippet(&mut text, compositing);
        text.push_str("}\n\n");

        // material
        let mut params: Vec<String> = light_params.iter().map(|p| format!("out {p}")).collect();
        if family.requires_normals() {
            params.push(format!("inout vec3 {NORMAL_CONNECTOR_NAME}"));
        }
        let _ = writeln!(text, "void {MATERIAL_FUNCTION}({}) {{", params.join(", "));
        text.push_str(&code.body);
        text.push_str("}\n\n");

        text.push_str("void main() {\n");
        for param in &light_params {
            let _ = writeln!(text, "    {param};");
        }
        let _ = write!(
            text,
            "#ifdef {NORMAL_AVAILABLE}\n    vec3 {NORMAL_CONNECTOR_NAME} = normalize({FRAGMENT_INPUT}.{NORMAL_WS});\n\
             #else\n    vec3 {NORMAL_CONNECTOR_NAME} = vec3(0.0, 0.0, 1.0);\n#endif\n\
             #ifdef {WORLD_POSITION_AVAILABLE}\n    vec3 {FRAGMENT_POSITION} = {FRAGMENT_INPUT}.{POSITION_WS};\n\
             #else\n    vec3 {FRAGMENT_POSITION} = vec3(0.0);\n#endif\n"
        );

        let mut args = light_args.clone();
        if family.requires_normals() {
            args.push(NORMAL_CONNECTOR_NAME);
        }
        let _ = writeln!(text, "    {MATERIAL_FUNCTION}({});", args.join(", "));

        let _ = write!(
            text,
            "#ifdef {CAMERA_DATA_AVAILABLE}\n    \
             vec3 {VIEW_DIRECTION} = normalize({CAMERA_AND_LIGHTS}.cameraPosition - {FRAGMENT_POSITION});\n\
             #else\n    vec3 {VIEW_DIRECTION} = vec3(0.0, 0.0, 1.0);\n#endif\n"
        );
        let _ = writeln!(text, "    vec3 {ACCUMULATED_LIGHT} = vec3(0.0);");

        let mut args = light_args.clone();
        args.extend([
            NORMAL_CONNECTOR_NAME,
            VIEW_DIRECTION,
            LIGHT_DIRECTION,
            LIGHT_COLOR,
            LIGHT_INTENSITY,
        ]);
        let call = format!("{LIGHT_FUNCTION}({})", args.join(", "));
        if family.supports_multiple_lights() && sets.contains(PerFrameDataSets::CAMERA_AND_LIGHTS) {
            text.push_str(&self.lights().light_loop(&call));
        } else {
            let _ = write!(
                text,
                "    {{\n        vec3 {LIGHT_DIRECTION} = {VIEW_DIRECTION};\n        \
                 vec3 {LIGHT_COLOR} = vec3(1.0);\n        float {LIGHT_INTENSITY} = 1.0;\n        \
                 {ACCUMULATED_LIGHT} += {call};\n    }}\n"
            );
        }

        let mut args = light_args;
        args.push(ACCUMULATED_LIGHT);
        let _ = writeln!(text, "    {FRAGMENT_OUTPUT} = {COMPOSITING_FUNCTION}({});", args.join(", "));
        text.push_str("}\n");

        Ok(text)
    }
}

fn push_snippet(text: &mut String, snippet: &str) {
    text.push_str(snippet);
    if !snippet.ends_with('\n') {
        text.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssemblyConfig;
    use ordoplay_material_graph::registry::{pbr_family, toon_family};
    use ordoplay_material_graph::{
        FamilyId, FamilyRequirements, MaterialGraphConfig, MaterialLogicGraph, MaterialNodeType, PlatformInfo,
        OUTPUT_NODE_KEY,
    };
    use std::sync::Arc;

    fn generated(family: &MaterialFamilyDefinition) -> GeneratedMaterialCode {
        let mut graph = MaterialLogicGraph::new(
            FamilyId::from_name(family.name()),
            Arc::new(family.clone()),
            MaterialGraphConfig::default(),
        );
        let texture = graph.add_node(MaterialNodeType::TextureInput, [0.0, 0.0]).unwrap();
        graph.set_node_name(texture, "albedo").unwrap();
        let uv = graph
            .add_node(
                MaterialNodeType::BuiltIn(ordoplay_material_graph::BuiltInInput::TextureCoordinates),
                [0.0, 0.0],
            )
            .unwrap();
        graph.connect_by_name(texture, "uv", uv, "uv").unwrap();
        let opacity = family.light_inputs().last().unwrap().name.clone();
        let split = graph.add_node(MaterialNodeType::Splitter, [0.0, 0.0]).unwrap();
        graph.connect_by_name(split, "vector", texture, "value").unwrap();
        graph.connect_by_name(OUTPUT_NODE_KEY, &opacity, split, "w").unwrap();
        graph.to_code(ShaderLanguage::GlslVulkan, &PlatformInfo::default()).unwrap()
    }

    #[test]
    fn test_defines_follow_requirements() {
        let toon = fragment_defines(&toon_family());
        assert_eq!(
            toon,
            vec![FRAGMENT_SHADER, NORMAL_AVAILABLE, WORLD_POSITION_AVAILABLE, CAMERA_DATA_AVAILABLE]
        );
        let pbr = fragment_defines(&pbr_family());
        assert!(pbr.contains(&TANGENTS_AVAILABLE));
        assert!(pbr.contains(&TEXTURE_COORDINATES_AVAILABLE));
        assert!(!pbr.contains(&VERTEX_COLOR_AVAILABLE));
    }

    #[test]
    fn test_toon_fragment_program() {
        let family = toon_family();
        let code = generated(&family);
        let text = ShaderAssembler::new(AssemblyConfig::default()).fragment_shader(&family, &code).unwrap();

        assert!(text.starts_with("#version 450\n#define FRAGMENT_SHADER\n"));
        assert!(text.contains("layout(location = 0) in FragmentInput {"));
        assert!(text.contains(&code.material_data_struct));
        assert!(text.contains("uniform sampler2D tex_albedo;"));
        assert!(text.contains(
            "void evaluateMaterial(out vec3 diffuseColor, out vec3 shadeColor, out float shadeThreshold, \
             out float opacity, inout vec3 normal) {"
        ));
        assert!(text.contains(&code.body));
        assert!(text.contains("    evaluateMaterial(diffuseColor, shadeColor, shadeThreshold, opacity, normal);"));
        assert!(text.contains("for (uint i = 0u;"));
        assert!(text.contains(
            "accumulatedLight += processLight(diffuseColor, shadeColor, shadeThreshold, opacity, normal, \
             viewDirection, lightDirection, lightColor, lightIntensity);"
        ));
        assert!(text.contains("    outColor = compositeLight(diffuseColor, shadeColor, shadeThreshold, opacity, accumulatedLight);"));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_normal_override_is_defined_in_the_preamble() {
        let family = toon_family();
        let mut graph = MaterialLogicGraph::new(
            FamilyId::from_name("Toon"),
            Arc::new(family.clone()),
            MaterialGraphConfig::default(),
        );
        let normal = graph
            .add_node(
                MaterialNodeType::BuiltIn(ordoplay_material_graph::BuiltInInput::Normal),
                [0.0, 0.0],
            )
            .unwrap();
        graph.connect_by_name(OUTPUT_NODE_KEY, "normal", normal, "normal").unwrap();
        let code = graph.to_code(ShaderLanguage::GlslVulkan, &PlatformInfo::default()).unwrap();
        let text = ShaderAssembler::new(AssemblyConfig::default()).fragment_shader(&family, &code).unwrap();

        let define = text.find("#define MATERIAL_NORMAL_OVERRIDE\n").unwrap();
        assert_eq!(text.matches("MATERIAL_NORMAL_OVERRIDE").count(), 1);
        assert!(define < text.find("layout(").unwrap());
        assert!(define < text.find("void evaluateMaterial(").unwrap());
    }

    #[test]
    fn test_single_light_family_calls_once() {
        let mut family = toon_family();
        family.set_requirement(FamilyRequirements::MULTIPLE_LIGHTS, false);
        let code = generated(&family);
        let text = ShaderAssembler::new(AssemblyConfig::default()).fragment_shader(&family, &code).unwrap();

        assert!(!text.contains("for (uint i"));
        assert!(text.contains("        vec3 lightDirection = viewDirection;"));
        assert_eq!(text.matches("accumulatedLight += processLight(").count(), 1);
    }

    #[test]
    fn test_empty_light_processing_is_rejected() {
        let mut family = toon_family();
        family
            .set_code_snippet(ShaderLanguage::GlslVulkan, CodeSnippet::LightProcessing, String::new())
            .unwrap();
        let code = generated(&toon_family());
        let result = ShaderAssembler::new(AssemblyConfig::default()).fragment_shader(&family, &code);
        assert!(matches!(result, Err(AssemblyError::EmptySnippet { snippet: "light processing", .. })));
    }
}

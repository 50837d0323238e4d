// SPDX-License-Identifier: MIT OR Apache-2.0
//! Names shared between generated material code and the shader assembly
//! layer: interface blocks, feature macros and built-in reads.

use crate::node::BuiltInInput;
use crate::output::NORMAL_CONNECTOR_NAME;
use ordoplay_logic_graph::ConnectorType;

/// Instance name of the interpolated fragment inputs
pub const FRAGMENT_INPUT: &str = "fragmentInput";
/// Block name of the interpolated fragment inputs
pub const FRAGMENT_INPUT_BLOCK: &str = "FragmentInput";

/// World-space position member of the fragment inputs
pub const POSITION_WS: &str = "positionWS";
/// World-space normal member of the fragment inputs
pub const NORMAL_WS: &str = "normalWS";
/// World-space tangent member of the fragment inputs
pub const TANGENT_WS: &str = "tangentWS";
/// World-space bitangent member of the fragment inputs
pub const BITANGENT_WS: &str = "bitangentWS";
/// Vertex color member of the fragment inputs
pub const COLOR: &str = "color";
/// Texture coordinate member of the fragment inputs
pub const UV: &str = "uv";

/// Name of the material data struct
pub const MATERIAL_DATA_STRUCT: &str = "MaterialData";
/// Instance name of the material data
pub const MATERIAL_DATA: &str = "materialData";
/// Instance name of the camera and light data
pub const CAMERA_AND_LIGHTS: &str = "cameraAndLights";
/// Instance name of the transformation matrices
pub const TRANSFORMATIONS: &str = "transformations";
/// Instance name of the renderer data
pub const RENDERER_DATA: &str = "rendererData";
/// Prefix of texture sampler names
pub const TEXTURE_PREFIX: &str = "tex_";

/// Defined in fragment shaders
pub const FRAGMENT_SHADER: &str = "FRAGMENT_SHADER";
/// Defined when interpolated normals are available
pub const NORMAL_AVAILABLE: &str = "NORMAL_AVAILABLE";
/// Defined when interpolated tangents and bitangents are available
pub const TANGENTS_AVAILABLE: &str = "TANGENTS_AVAILABLE";
/// Defined when the world-space position is available
pub const WORLD_POSITION_AVAILABLE: &str = "WORLD_POSITION_AVAILABLE";
/// Defined when vertex colors are available
pub const VERTEX_COLOR_AVAILABLE: &str = "VERTEX_COLOR_AVAILABLE";
/// Defined when texture coordinates are available
pub const TEXTURE_COORDINATES_AVAILABLE: &str = "TEXTURE_COORDINATES_AVAILABLE";
/// Defined when the camera data block is bound
pub const CAMERA_DATA_AVAILABLE: &str = "CAMERA_DATA_AVAILABLE";
/// Defined by material code that writes its own normal
pub const MATERIAL_NORMAL_OVERRIDE: &str = "MATERIAL_NORMAL_OVERRIDE";

/// Function holding the generated material body
pub const MATERIAL_FUNCTION: &str = "evaluateMaterial";
/// Function wrapping the family's light-processing snippet
pub const LIGHT_FUNCTION: &str = "processLight";
/// Function wrapping the family's compositing snippet
pub const COMPOSITING_FUNCTION: &str = "compositeLight";
/// Color output of the fragment program
pub const FRAGMENT_OUTPUT: &str = "outColor";
/// Normalized direction from the fragment to the camera
pub const VIEW_DIRECTION: &str = "viewDirection";
/// Direction towards the light being processed
pub const LIGHT_DIRECTION: &str = "lightDirection";
/// Color of the light being processed
pub const LIGHT_COLOR: &str = "lightColor";
/// Intensity of the light being processed
pub const LIGHT_INTENSITY: &str = "lightIntensity";
/// Accumulator each light's contribution is added to
pub const ACCUMULATED_LIGHT: &str = "accumulatedLight";
/// World-space fragment position visible to the light loop
pub const FRAGMENT_POSITION: &str = "fragmentPosition";

/// Identifiers the assembled fragment program declares next to the family's
/// light inputs. A light input with one of these names would shadow or
/// redeclare it.
pub const SHADER_SCOPE_NAMES: &[&str] = &[
    MATERIAL_FUNCTION,
    LIGHT_FUNCTION,
    COMPOSITING_FUNCTION,
    FRAGMENT_OUTPUT,
    VIEW_DIRECTION,
    LIGHT_DIRECTION,
    LIGHT_COLOR,
    LIGHT_INTENSITY,
    ACCUMULATED_LIGHT,
    FRAGMENT_POSITION,
    FRAGMENT_INPUT,
    MATERIAL_DATA,
    CAMERA_AND_LIGHTS,
    TRANSFORMATIONS,
    RENDERER_DATA,
    NORMAL_CONNECTOR_NAME,
    "main",
    "light",
    "lights",
    "i",
];

/// Members of the interpolated fragment inputs declared by the assembler
pub const FRAGMENT_INPUT_MEMBERS: &[&str] = &[POSITION_WS, NORMAL_WS, TANGENT_WS, BITANGENT_WS, COLOR, UV];

/// GLSL type of a connector type
pub fn glsl_type(ty: ConnectorType) -> &'static str {
    match ty {
        ConnectorType::Float => "float",
        ConnectorType::Vec2 => "vec2",
        ConnectorType::Vec3 => "vec3",
        ConnectorType::Vec4 => "vec4",
    }
}

/// GLSL type of a field `count` components wide
pub fn glsl_type_for_width(count: u8) -> &'static str {
    ConnectorType::from_component_count(count)
        .map(glsl_type)
        .unwrap_or("float")
}

/// Swizzle narrowing a `vec4` to `ty`, empty for `Vec4`
pub fn narrowing_swizzle(ty: ConnectorType) -> &'static str {
    match ty {
        ConnectorType::Float => ".x",
        ConnectorType::Vec2 => ".xy",
        ConnectorType::Vec3 => ".xyz",
        ConnectorType::Vec4 => "",
    }
}

/// GLSL literal of `ty` built from the leading components of `value`
///
/// Components must be finite; graph validation rejects other values.
pub fn literal(ty: ConnectorType, value: [f32; 4]) -> String {
    let count = ty.component_count() as usize;
    let components: Vec<String> = value[..count].iter().map(|v| format!("{v:?}")).collect();
    if count == 1 {
        components.join("")
    } else {
        format!("{}({})", glsl_type(ty), components.join(", "))
    }
}

/// Guarded read of one built-in output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltInRead {
    /// Macro that must be defined for `expression` to be valid
    pub guard: &'static str,
    /// Expression reading the value
    pub expression: &'static str,
    /// Literal used when the guard is not defined
    pub fallback: &'static str,
}

/// Reads of a built-in input, one per output connector
pub fn built_in_reads(input: BuiltInInput) -> &'static [BuiltInRead] {
    const fn read(guard: &'static str, expression: &'static str, fallback: &'static str) -> BuiltInRead {
        BuiltInRead {
            guard,
            expression,
            fallback,
        }
    }

    match input {
        BuiltInInput::Position => {
            const READS: &[BuiltInRead] = &[read(WORLD_POSITION_AVAILABLE, "fragmentInput.positionWS", "vec3(0.0)")];
            READS
        }
        BuiltInInput::Normal => {
            const READS: &[BuiltInRead] = &[read(
                NORMAL_AVAILABLE,
                "normalize(fragmentInput.normalWS)",
                "vec3(0.0, 0.0, 1.0)",
            )];
            READS
        }
        BuiltInInput::CameraPosition => {
            const READS: &[BuiltInRead] = &[read(CAMERA_DATA_AVAILABLE, "cameraAndLights.cameraPosition", "vec3(0.0)")];
            READS
        }
        BuiltInInput::ScreenDimensions => {
            const READS: &[BuiltInRead] = &[read(CAMERA_DATA_AVAILABLE, "cameraAndLights.screenDimensions", "vec2(1.0)")];
            READS
        }
        BuiltInInput::VertexColor => {
            const READS: &[BuiltInRead] = &[read(VERTEX_COLOR_AVAILABLE, "fragmentInput.color", "vec4(1.0)")];
            READS
        }
        BuiltInInput::FragmentCoordinate => {
            const READS: &[BuiltInRead] = &[read(FRAGMENT_SHADER, "gl_FragCoord", "vec4(0.0)")];
            READS
        }
        BuiltInInput::CameraProperties => {
            const READS: &[BuiltInRead] = &[
                read(CAMERA_DATA_AVAILABLE, "cameraAndLights.zNear", "0.1"),
                read(CAMERA_DATA_AVAILABLE, "cameraAndLights.zFar", "1000.0"),
                read(CAMERA_DATA_AVAILABLE, "cameraAndLights.fieldOfView", "1.0"),
            ];
            READS
        }
        BuiltInInput::TextureCoordinates => {
            const READS: &[BuiltInRead] = &[read(TEXTURE_COORDINATES_AVAILABLE, "fragmentInput.uv", "vec2(0.0)")];
            READS
        }
    }
}

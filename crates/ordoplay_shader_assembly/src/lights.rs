// SPDX-License-Identifier: MIT OR Apache-2.0
//! Renderer-provided light iteration.
//!
//! The assembled fragment shader does not know how a renderer stores its
//! lights. A [`LightLoopProvider`] supplies the declarations and the loop
//! that calls the family's light-processing function once per light.

pub use ordoplay_material_graph::glsl::{
    ACCUMULATED_LIGHT, FRAGMENT_POSITION, LIGHT_COLOR, LIGHT_DIRECTION, LIGHT_INTENSITY,
};

/// Supplies a renderer's light storage and iteration
pub trait LightLoopProvider: Send + Sync {
    /// Declarations placed before the camera and light block
    fn declarations(&self) -> String;

    /// Members appended to the camera and light block
    fn block_members(&self) -> String;

    /// Statements that define [`LIGHT_DIRECTION`], [`LIGHT_COLOR`] and
    /// [`LIGHT_INTENSITY`] per light and add `call` to [`ACCUMULATED_LIGHT`]
    fn light_loop(&self, call: &str) -> String;
}

/// Forward renderer storing up to `max_lights` lights in the camera block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardLightLoop {
    /// Size of the light array
    pub max_lights: u32,
}

impl Default for ForwardLightLoop {
    fn default() -> Self {
        Self { max_lights: 16 }
    }
}

impl LightLoopProvider for ForwardLightLoop {
    fn declarations(&self) -> String {
        format!(
            "#define MAX_LIGHTS {}\n\
             struct Light {{\n    \
                 vec4 positionOrDirection; // w == 0: directional\n    \
                 vec4 colorAndIntensity;\n\
             }};\n",
            self.max_lights
        )
    }

    fn block_members(&self) -> String {
        "    uint lightCount;\n    Light lights[MAX_LIGHTS];\n".to_string()
    }

    fn light_loop(&self, call: &str) -> String {
        format!(
            "    for (uint i = 0u; i < min(cameraAndLights.lightCount, uint(MAX_LIGHTS)); ++i) {{\n        \
                 Light light = cameraAndLights.lights[i];\n        \
                 vec3 {LIGHT_DIRECTION} = light.positionOrDirection.w == 0.0\n            \
                     ? normalize(-light.positionOrDirection.xyz)\n            \
                     : normalize(light.positionOrDirection.xyz - {FRAGMENT_POSITION});\n        \
                 vec3 {LIGHT_COLOR} = light.colorAndIntensity.rgb;\n        \
                 float {LIGHT_INTENSITY} = light.colorAndIntensity.a;\n        \
                 {ACCUMULATED_LIGHT} += {call};\n    \
             }}\n"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_loop_wraps_call() {
        let lights = ForwardLightLoop { max_lights: 8 };
        assert!(lights.declarations().starts_with("#define MAX_LIGHTS 8\n"));
        assert!(lights.block_members().contains("Light lights[MAX_LIGHTS];"));

        let code = lights.light_loop("shade(lightDirection)");
        assert!(code.contains("accumulatedLight += shade(lightDirection);"));
        assert!(code.contains("float lightIntensity = light.colorAndIntensity.a;"));
        assert!(code.ends_with("    }\n"));
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Descriptor layout and language settings for assembled shaders.

use serde::{Deserialize, Serialize};

/// Where assembled shaders expect their resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// First line of every program
    pub glsl_version: String,
    /// Descriptor set holding the per-frame blocks
    pub per_frame_set: u32,
    /// Binding of the camera and light block
    pub camera_and_lights_binding: u32,
    /// Binding of the transformation block
    pub transformations_binding: u32,
    /// Binding of the renderer data block
    pub renderer_data_binding: u32,
    /// Descriptor set holding material data and textures
    pub material_set: u32,
    /// Binding of the material data block
    pub material_data_binding: u32,
    /// Binding of the first material texture; later textures follow in order
    pub first_texture_binding: u32,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            glsl_version: "#version 450".to_string(),
            per_frame_set: 0,
            camera_and_lights_binding: 0,
            transformations_binding: 1,
            renderer_data_binding: 2,
            material_set: 1,
            material_data_binding: 0,
            first_texture_binding: 1,
        }
    }
}

impl AssemblyConfig {
    /// Binding of the texture at `index` in first-use order
    pub fn texture_binding(&self, index: usize) -> u32 {
        self.first_texture_binding + index as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textures_follow_first_binding() {
        let config = AssemblyConfig::default();
        assert_eq!(config.texture_binding(0), 1);
        assert_eq!(config.texture_binding(3), 4);
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Target shading languages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shading language a material family can be generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderLanguage {
    /// GLSL 4.50 targeting Vulkan
    GlslVulkan,
    /// HLSL shader model 5
    Hlsl,
}

impl ShaderLanguage {
    /// All known languages
    pub const ALL: [ShaderLanguage; 2] = [Self::GlslVulkan, Self::Hlsl];

    /// Get display name for this language
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::GlslVulkan => "GLSL (Vulkan)",
            Self::Hlsl => "HLSL",
        }
    }

    /// Whether the code generator can emit this language
    pub fn has_code_generator(&self) -> bool {
        matches!(self, Self::GlslVulkan)
    }
}

impl fmt::Display for ShaderLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

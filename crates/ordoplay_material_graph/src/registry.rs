// SPDX-License-Identifier: MIT OR Apache-2.0
//! Session-scoped registry of material families.
//!
//! The registry is created by whoever owns the editing or build session and
//! passed to the code that needs it; there is no process-wide family table.

use crate::family::{
    FamilyCode, FamilyRequirements, LightProcessingFunctionInput, MaterialFamilyDefinition,
    PerFrameDataSets,
};
use crate::family_codec::{load_family, FamilyCodecError};
use crate::language::ShaderLanguage;
use indexmap::IndexMap;
use ordoplay_logic_graph::ConnectorType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

const FAMILY_NAMESPACE: Uuid = Uuid::from_u128(0x3c1f_9a52_77d0_4b8e_9e0a_5d21_c6f4_8b13);

/// Stable identifier of a family, derived from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyId(pub Uuid);

impl FamilyId {
    /// Identifier of the family with the given name
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&FAMILY_NAMESPACE, name.as_bytes()))
    }
}

impl fmt::Display for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry of family definitions by ID
#[derive(Debug, Clone, Default)]
pub struct FamilyRegistry {
    families: IndexMap<FamilyId, Arc<MaterialFamilyDefinition>>,
}

impl FamilyRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in families
    pub fn with_builtin_families() -> Self {
        let mut registry = Self::new();
        for family in builtin_families() {
            registry.register(family);
        }
        registry
    }

    /// Register a family, replacing any family with the same name
    pub fn register(&mut self, definition: MaterialFamilyDefinition) -> FamilyId {
        let id = FamilyId::from_name(definition.name());
        if self.families.insert(id, Arc::new(definition)).is_some() {
            tracing::debug!(%id, "Replaced material family");
        }
        id
    }

    /// Load a family definition file and register it
    pub fn load_file(&mut self, path: &Path) -> Result<FamilyId, FamilyCodecError> {
        let definition = load_family(path)?;
        Ok(self.register(definition))
    }

    /// Get a family by ID
    pub fn get(&self, id: FamilyId) -> Option<&Arc<MaterialFamilyDefinition>> {
        self.families.get(&id)
    }

    /// Get a family by name
    pub fn get_by_name(&self, name: &str) -> Option<&Arc<MaterialFamilyDefinition>> {
        self.get(FamilyId::from_name(name))
    }

    /// Get all families in registration order
    pub fn iter(&self) -> impl Iterator<Item = (FamilyId, &Arc<MaterialFamilyDefinition>)> {
        self.families.iter().map(|(id, family)| (*id, family))
    }

    /// Number of registered families
    pub fn len(&self) -> usize {
        self.families.len()
    }

    /// Whether no family is registered
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

/// The families every registry starts from
pub fn builtin_families() -> Vec<MaterialFamilyDefinition> {
    vec![toon_family(), pbr_family()]
}

/// Cel-shaded family with a hard light/shade threshold
pub fn toon_family() -> MaterialFamilyDefinition {
    let code = FamilyCode {
        additional_vertex_processing: String::new(),
        light_processing: "\
    float lambert = dot(normal, lightDirection) * 0.5 + 0.5;
    float lit = step(shadeThreshold, lambert);
    return mix(shadeColor, diffuseColor, lit) * lightColor * lightIntensity;
"
        .to_string(),
        compositing: "    return vec4(accumulatedLight, opacity);\n".to_string(),
    };

    MaterialFamilyDefinition::from_parts_unchecked(
        "Toon",
        vec![ShaderLanguage::GlslVulkan],
        FamilyRequirements::NORMALS
            | FamilyRequirements::WORLD_POSITION
            | FamilyRequirements::MULTIPLE_LIGHTS,
        0,
        PerFrameDataSets::TRANSFORMATIONS,
        PerFrameDataSets::CAMERA_AND_LIGHTS | PerFrameDataSets::MATERIAL_DATA | PerFrameDataSets::TEXTURES,
        vec![
            LightProcessingFunctionInput::new("diffuseColor", ConnectorType::Vec3, [1.0, 1.0, 1.0, 0.0]),
            LightProcessingFunctionInput::new("shadeColor", ConnectorType::Vec3, [0.35, 0.35, 0.45, 0.0]),
            LightProcessingFunctionInput::new("shadeThreshold", ConnectorType::Float, [0.5, 0.0, 0.0, 0.0]),
            LightProcessingFunctionInput::new("opacity", ConnectorType::Float, [1.0, 0.0, 0.0, 0.0]),
        ],
        vec![code],
    )
}

/// Metallic-roughness family with a GGX specular term
pub fn pbr_family() -> MaterialFamilyDefinition {
    let code = FamilyCode {
        additional_vertex_processing: String::new(),
        light_processing: "\
    const float PI = 3.14159265;
    vec3 h = normalize(viewDirection + lightDirection);
    float nDotL = max(dot(normal, lightDirection), 0.0);
    float nDotV = max(dot(normal, viewDirection), 0.0001);
    float nDotH = max(dot(normal, h), 0.0);
    float a = roughness * roughness;
    float a2 = a * a;
    float denom = nDotH * nDotH * (a2 - 1.0) + 1.0;
    float d = a2 / (PI * denom * denom);
    float k = (roughness + 1.0) * (roughness + 1.0) / 8.0;
    float g = (nDotV / (nDotV * (1.0 - k) + k)) * (nDotL / (nDotL * (1.0 - k) + k));
    vec3 f0 = mix(vec3(0.04), albedo, metallic);
    vec3 f = f0 + (1.0 - f0) * pow(1.0 - max(dot(h, viewDirection), 0.0), 5.0);
    vec3 specular = d * g * f / max(4.0 * nDotV * nDotL, 0.0001);
    vec3 diffuse = (vec3(1.0) - f) * (1.0 - metallic) * albedo / PI;
    return (diffuse + specular) * lightColor * lightIntensity * nDotL;
"
        .to_string(),
        compositing: "    return vec4(accumulatedLight * ambientOcclusion + emission, opacity);\n".to_string(),
    };

    MaterialFamilyDefinition::from_parts_unchecked(
        "PBR",
        vec![ShaderLanguage::GlslVulkan],
        FamilyRequirements::NORMALS
            | FamilyRequirements::WORLD_POSITION
            | FamilyRequirements::TEXTURE_COORDINATES
            | FamilyRequirements::TANGENTS
            | FamilyRequirements::MULTIPLE_LIGHTS,
        0,
        PerFrameDataSets::TRANSFORMATIONS,
        PerFrameDataSets::CAMERA_AND_LIGHTS
            | PerFrameDataSets::RENDERER_DATA
            | PerFrameDataSets::MATERIAL_DATA
            | PerFrameDataSets::TEXTURES,
        vec![
            LightProcessingFunctionInput::new("albedo", ConnectorType::Vec3, [0.8, 0.8, 0.8, 0.0]),
            LightProcessingFunctionInput::new("metallic", ConnectorType::Float, [0.0; 4]),
            LightProcessingFunctionInput::new("roughness", ConnectorType::Float, [0.5, 0.0, 0.0, 0.0]),
            LightProcessingFunctionInput::new("ambientOcclusion", ConnectorType::Float, [1.0, 0.0, 0.0, 0.0]),
            LightProcessingFunctionInput::new("emission", ConnectorType::Vec3, [0.0; 4]),
            LightProcessingFunctionInput::new("opacity", ConnectorType::Float, [1.0, 0.0, 0.0, 0.0]),
        ],
        vec![code],
    )
}

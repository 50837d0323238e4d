// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material family definitions.
//!
//! A family describes a lighting model shared by many materials: which
//! values the material graph feeds into the light-processing function, which
//! vertex and per-frame data the shaders need, and the hand-written code
//! snippets that implement the lighting itself.

use crate::language::ShaderLanguage;
use crate::glsl::{FRAGMENT_INPUT_MEMBERS, SHADER_SCOPE_NAMES};
use crate::naming::{is_glsl_reserved_word, is_valid_identifier};
use bitflags::bitflags;
use ordoplay_logic_graph::ConnectorType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Maximum number of vertex color channels a family may request
pub const MAX_VERTEX_COLOR_CHANNELS: u8 = 4;

bitflags! {
    /// Vertex and fragment data a family relies on
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FamilyRequirements: u64 {
        /// Per-vertex normals
        const NORMALS = 1;
        /// World-space fragment position
        const WORLD_POSITION = 1 << 1;
        /// Texture coordinates
        const TEXTURE_COORDINATES = 1 << 2;
        /// Per-vertex tangents and bitangents
        const TANGENTS = 1 << 3;
        /// Lighting runs once per light instead of once per fragment
        const MULTIPLE_LIGHTS = 1 << 4;
    }
}

bitflags! {
    /// Per-frame data blocks a shader stage reads
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PerFrameDataSets: u64 {
        /// Camera properties and the light list
        const CAMERA_AND_LIGHTS = 1;
        /// Model, view and projection matrices
        const TRANSFORMATIONS = 1 << 1;
        /// Renderer-specific data (time, frame index, ...)
        const RENDERER_DATA = 1 << 2;
        /// Packed material data
        const MATERIAL_DATA = 1 << 3;
        /// Material textures
        const TEXTURES = 1 << 4;
    }
}

/// One parameter of the family's light-processing function.
///
/// Each becomes an input connector of the material graph's Output node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightProcessingFunctionInput {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub ty: ConnectorType,
    /// Value used when the Output input is left disconnected
    pub default_value: [f32; 4],
}

impl LightProcessingFunctionInput {
    /// Create a new light input
    pub fn new(name: impl Into<String>, ty: ConnectorType, default_value: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            ty,
            default_value,
        }
    }
}

/// Additional value passed from the vertex to the fragment stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexShaderOutput {
    /// Variable name
    pub name: String,
    /// Value type
    pub ty: ConnectorType,
}

/// Kinds of author-written code carried by a family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeSnippet {
    /// Appended to the vertex shader's main function
    AdditionalVertexProcessing,
    /// Body of the per-light processing function
    LightProcessing,
    /// Body of the function combining accumulated light into the final color
    Compositing,
}

/// Code snippets of a family for one language
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyCode {
    /// See [`CodeSnippet::AdditionalVertexProcessing`]
    pub additional_vertex_processing: String,
    /// See [`CodeSnippet::LightProcessing`]
    pub light_processing: String,
    /// See [`CodeSnippet::Compositing`]
    pub compositing: String,
}

impl FamilyCode {
    /// Get one snippet
    pub fn snippet(&self, kind: CodeSnippet) -> &str {
        match kind {
            CodeSnippet::AdditionalVertexProcessing => &self.additional_vertex_processing,
            CodeSnippet::LightProcessing => &self.light_processing,
            CodeSnippet::Compositing => &self.compositing,
        }
    }

    fn snippet_mut(&mut self, kind: CodeSnippet) -> &mut String {
        match kind {
            CodeSnippet::AdditionalVertexProcessing => &mut self.additional_vertex_processing,
            CodeSnippet::LightProcessing => &mut self.light_processing,
            CodeSnippet::Compositing => &mut self.compositing,
        }
    }
}

/// Errors raised when a family definition would become invalid
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FamilyError {
    /// Family name is not a valid identifier
    #[error("Invalid family name '{0}': use letters and digits, starting with a letter")]
    InvalidName(String),

    /// No language listed
    #[error("A family must support at least one language")]
    NoLanguages,

    /// Language listed twice
    #[error("Language {0} is listed more than once")]
    DuplicateLanguage(ShaderLanguage),

    /// Language not listed as supported
    #[error("Language {0} is not supported by this family")]
    UnsupportedLanguage(ShaderLanguage),

    /// Light input name is not a valid identifier
    #[error("Invalid light input name '{0}'")]
    InvalidLightInputName(String),

    /// Light input name collides with a GLSL reserved word or a name the
    /// assembled shader declares itself
    #[error("Light input name '{0}' is reserved")]
    ReservedLightInputName(String),

    /// Light input default is NaN or infinite
    #[error("Default of light input '{0}' must be finite")]
    NonFiniteLightInputDefault(String),

    /// Two light inputs share a name
    #[error("Light input '{0}' is defined more than once")]
    DuplicateLightInput(String),

    /// Too many vertex color channels
    #[error("At most {MAX_VERTEX_COLOR_CHANNELS} vertex color channels are supported, got {0}")]
    TooManyVertexColorChannels(u8),

    /// Vertex output name is not a valid identifier
    #[error("Invalid vertex output name '{0}'")]
    InvalidVertexOutputName(String),

    /// Vertex output name collides with a GLSL reserved word or a built-in
    /// member of the fragment inputs
    #[error("Vertex output name '{0}' is reserved")]
    ReservedVertexOutputName(String),

    /// Two vertex outputs share a name
    #[error("Vertex output '{0}' is defined more than once")]
    DuplicateVertexOutput(String),

    /// Snippet table does not line up with the language list
    #[error("Expected code for {expected} languages, found {found}")]
    CodeTableMismatch {
        /// Number of supported languages
        expected: usize,
        /// Number of code entries
        found: usize,
    },
}

/// Immutable description of a material family.
///
/// All setters re-validate the affected invariants and leave the definition
/// untouched when they fail.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialFamilyDefinition {
    name: String,
    supported_languages: Vec<ShaderLanguage>,
    requirements: FamilyRequirements,
    vertex_color_channels: u8,
    vertex_data_sets: PerFrameDataSets,
    fragment_data_sets: PerFrameDataSets,
    light_inputs: Vec<LightProcessingFunctionInput>,
    /// One entry per supported language, same order
    code: Vec<FamilyCode>,
    additional_vertex_outputs: Vec<VertexShaderOutput>,
}

impl MaterialFamilyDefinition {
    /// Create a family with no requirements, inputs or code
    pub fn new(
        name: impl Into<String>,
        supported_languages: Vec<ShaderLanguage>,
    ) -> Result<Self, FamilyError> {
        let name = name.into();
        validate_name(&name)?;
        validate_languages(&supported_languages)?;

        let code = vec![FamilyCode::default(); supported_languages.len()];
        Ok(Self {
            name,
            supported_languages,
            requirements: FamilyRequirements::empty(),
            vertex_color_channels: 0,
            vertex_data_sets: PerFrameDataSets::TRANSFORMATIONS,
            fragment_data_sets: PerFrameDataSets::MATERIAL_DATA | PerFrameDataSets::TEXTURES,
            light_inputs: Vec::new(),
            code,
            additional_vertex_outputs: Vec::new(),
        })
    }

    /// Assemble a definition from raw parts, validating everything
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        name: String,
        supported_languages: Vec<ShaderLanguage>,
        requirements: FamilyRequirements,
        vertex_color_channels: u8,
        vertex_data_sets: PerFrameDataSets,
        fragment_data_sets: PerFrameDataSets,
        light_inputs: Vec<LightProcessingFunctionInput>,
        code: Vec<FamilyCode>,
        additional_vertex_outputs: Vec<VertexShaderOutput>,
    ) -> Result<Self, FamilyError> {
        let definition = Self {
            name,
            supported_languages,
            requirements,
            vertex_color_channels,
            vertex_data_sets,
            fragment_data_sets,
            light_inputs,
            code,
            additional_vertex_outputs,
        };
        definition.validate()?;
        Ok(definition)
    }

    /// Assemble a definition known to be valid, such as a built-in family
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts_unchecked(
        name: &str,
        supported_languages: Vec<ShaderLanguage>,
        requirements: FamilyRequirements,
        vertex_color_channels: u8,
        vertex_data_sets: PerFrameDataSets,
        fragment_data_sets: PerFrameDataSets,
        light_inputs: Vec<LightProcessingFunctionInput>,
        code: Vec<FamilyCode>,
    ) -> Self {
        let definition = Self {
            name: name.to_string(),
            supported_languages,
            requirements,
            vertex_color_channels,
            vertex_data_sets,
            fragment_data_sets,
            light_inputs,
            code,
            additional_vertex_outputs: Vec::new(),
        };
        debug_assert!(definition.validate().is_ok(), "invalid built-in family {name}");
        definition
    }

    /// Check every invariant
    pub fn validate(&self) -> Result<(), FamilyError> {
        validate_name(&self.name)?;
        validate_languages(&self.supported_languages)?;
        if self.code.len() != self.supported_languages.len() {
            return Err(FamilyError::CodeTableMismatch {
                expected: self.supported_languages.len(),
                found: self.code.len(),
            });
        }
        if self.vertex_color_channels > MAX_VERTEX_COLOR_CHANNELS {
            return Err(FamilyError::TooManyVertexColorChannels(self.vertex_color_channels));
        }
        validate_light_inputs(&self.light_inputs)?;
        validate_vertex_outputs(&self.additional_vertex_outputs)
    }

    /// Family name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the family
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), FamilyError> {
        let name = name.into();
        validate_name(&name)?;
        self.name = name;
        Ok(())
    }

    /// Languages this family provides code for
    pub fn supported_languages(&self) -> &[ShaderLanguage] {
        &self.supported_languages
    }

    /// Whether the family provides code for `language`
    pub fn supports(&self, language: ShaderLanguage) -> bool {
        self.supported_languages.contains(&language)
    }

    /// Replace the language list.
    ///
    /// Snippets of languages that remain supported are kept; new languages
    /// start with empty snippets.
    pub fn set_supported_languages(
        &mut self,
        languages: Vec<ShaderLanguage>,
    ) -> Result<(), FamilyError> {
        validate_languages(&languages)?;
        let code = languages
            .iter()
            .map(|language| {
                self.language_index(*language)
                    .map(|i| self.code[i].clone())
                    .unwrap_or_default()
            })
            .collect();
        self.supported_languages = languages;
        self.code = code;
        Ok(())
    }

    fn language_index(&self, language: ShaderLanguage) -> Option<usize> {
        self.supported_languages.iter().position(|l| *l == language)
    }

    /// Requirement flags
    pub fn requirements(&self) -> FamilyRequirements {
        self.requirements
    }

    /// Enable or disable a requirement
    pub fn set_requirement(&mut self, requirement: FamilyRequirements, enabled: bool) {
        self.requirements.set(requirement, enabled);
    }

    /// Whether per-vertex normals are needed
    pub fn requires_normals(&self) -> bool {
        self.requirements.contains(FamilyRequirements::NORMALS)
    }

    /// Whether the world-space position is needed
    pub fn requires_world_position(&self) -> bool {
        self.requirements.contains(FamilyRequirements::WORLD_POSITION)
    }

    /// Whether texture coordinates are needed
    pub fn requires_texture_coordinates(&self) -> bool {
        self.requirements.contains(FamilyRequirements::TEXTURE_COORDINATES)
    }

    /// Whether tangents are needed
    pub fn requires_tangents(&self) -> bool {
        self.requirements.contains(FamilyRequirements::TANGENTS)
    }

    /// Whether lighting runs once per light
    pub fn supports_multiple_lights(&self) -> bool {
        self.requirements.contains(FamilyRequirements::MULTIPLE_LIGHTS)
    }

    /// Number of vertex color channels needed (0 = none)
    pub fn vertex_color_channels(&self) -> u8 {
        self.vertex_color_channels
    }

    /// Set the number of vertex color channels
    pub fn set_vertex_color_channels(&mut self, channels: u8) -> Result<(), FamilyError> {
        if channels > MAX_VERTEX_COLOR_CHANNELS {
            return Err(FamilyError::TooManyVertexColorChannels(channels));
        }
        self.vertex_color_channels = channels;
        Ok(())
    }

    /// Per-frame data read by the vertex stage
    pub fn vertex_data_sets(&self) -> PerFrameDataSets {
        self.vertex_data_sets
    }

    /// Per-frame data read by the fragment stage
    pub fn fragment_data_sets(&self) -> PerFrameDataSets {
        self.fragment_data_sets
    }

    /// Set the per-frame data of both stages
    pub fn set_data_sets(&mut self, vertex: PerFrameDataSets, fragment: PerFrameDataSets) {
        self.vertex_data_sets = vertex;
        self.fragment_data_sets = fragment;
    }

    /// Parameters of the light-processing function
    pub fn light_inputs(&self) -> &[LightProcessingFunctionInput] {
        &self.light_inputs
    }

    /// Replace the light-processing function parameters
    pub fn set_light_inputs(
        &mut self,
        light_inputs: Vec<LightProcessingFunctionInput>,
    ) -> Result<(), FamilyError> {
        validate_light_inputs(&light_inputs)?;
        self.light_inputs = light_inputs;
        Ok(())
    }

    /// Extra vertex-to-fragment values
    pub fn additional_vertex_outputs(&self) -> &[VertexShaderOutput] {
        &self.additional_vertex_outputs
    }

    /// Replace the extra vertex-to-fragment values
    pub fn set_additional_vertex_outputs(
        &mut self,
        outputs: Vec<VertexShaderOutput>,
    ) -> Result<(), FamilyError> {
        validate_vertex_outputs(&outputs)?;
        self.additional_vertex_outputs = outputs;
        Ok(())
    }

    /// All code of one language
    pub fn code(&self, language: ShaderLanguage) -> Option<&FamilyCode> {
        self.language_index(language).map(|i| &self.code[i])
    }

    /// Code table in language order
    pub fn code_table(&self) -> &[FamilyCode] {
        &self.code
    }

    /// Get one snippet of one language
    pub fn code_snippet(&self, language: ShaderLanguage, kind: CodeSnippet) -> Option<&str> {
        self.code(language).map(|code| code.snippet(kind))
    }

    /// Set one snippet of one supported language
    pub fn set_code_snippet(
        &mut self,
        language: ShaderLanguage,
        kind: CodeSnippet,
        code: impl Into<String>,
    ) -> Result<(), FamilyError> {
        let index = self
            .language_index(language)
            .ok_or(FamilyError::UnsupportedLanguage(language))?;
        *self.code[index].snippet_mut(kind) = code.into();
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), FamilyError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(FamilyError::InvalidName(name.to_string()))
    }
}

fn validate_languages(languages: &[ShaderLanguage]) -> Result<(), FamilyError> {
    if languages.is_empty() {
        return Err(FamilyError::NoLanguages);
    }
    let mut seen = HashSet::new();
    for language in languages {
        if !seen.insert(*language) {
            return Err(FamilyError::DuplicateLanguage(*language));
        }
    }
    Ok(())
}

fn validate_light_inputs(inputs: &[LightProcessingFunctionInput]) -> Result<(), FamilyError> {
    let mut seen = HashSet::new();
    for input in inputs {
        if !is_valid_identifier(&input.name) {
            return Err(FamilyError::InvalidLightInputName(input.name.clone()));
        }
        if is_glsl_reserved_word(&input.name) || SHADER_SCOPE_NAMES.contains(&input.name.as_str()) {
            return Err(FamilyError::ReservedLightInputName(input.name.clone()));
        }
        if !input.default_value.iter().all(|v| v.is_finite()) {
            return Err(FamilyError::NonFiniteLightInputDefault(input.name.clone()));
        }
        if !seen.insert(input.name.as_str()) {
            return Err(FamilyError::DuplicateLightInput(input.name.clone()));
        }
    }
    Ok(())
}

fn validate_vertex_outputs(outputs: &[VertexShaderOutput]) -> Result<(), FamilyError> {
    let mut seen = HashSet::new();
    for output in outputs {
        if !is_valid_identifier(&output.name) {
            return Err(FamilyError::InvalidVertexOutputName(output.name.clone()));
        }
        if is_glsl_reserved_word(&output.name) || FRAGMENT_INPUT_MEMBERS.contains(&output.name.as_str()) {
            return Err(FamilyError::ReservedVertexOutputName(output.name.clone()));
        }
        if !seen.insert(output.name.as_str()) {
            return Err(FamilyError::DuplicateVertexOutput(output.name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family() -> MaterialFamilyDefinition {
        MaterialFamilyDefinition::new("Toon", vec![ShaderLanguage::GlslVulkan]).unwrap()
    }

    #[test]
    fn test_name_must_be_identifier() {
        assert_eq!(
            MaterialFamilyDefinition::new("my family", vec![ShaderLanguage::GlslVulkan]),
            Err(FamilyError::InvalidName("my family".to_string()))
        );
        let mut family = family();
        assert!(family.set_name("../evil").is_err());
        assert_eq!(family.name(), "Toon");
    }

    #[test]
    fn test_languages_required_and_unique() {
        assert_eq!(
            MaterialFamilyDefinition::new("Toon", vec![]),
            Err(FamilyError::NoLanguages)
        );
        let mut family = family();
        assert_eq!(
            family.set_supported_languages(vec![ShaderLanguage::Hlsl, ShaderLanguage::Hlsl]),
            Err(FamilyError::DuplicateLanguage(ShaderLanguage::Hlsl))
        );
    }

    #[test]
    fn test_language_change_resizes_code_table() {
        let mut family = family();
        family
            .set_code_snippet(ShaderLanguage::GlslVulkan, CodeSnippet::LightProcessing, "return vec3(1.0);")
            .unwrap();

        family
            .set_supported_languages(vec![ShaderLanguage::Hlsl, ShaderLanguage::GlslVulkan])
            .unwrap();
        assert_eq!(family.code_table().len(), 2);
        assert_eq!(
            family.code_snippet(ShaderLanguage::GlslVulkan, CodeSnippet::LightProcessing),
            Some("return vec3(1.0);")
        );
        assert_eq!(family.code_snippet(ShaderLanguage::Hlsl, CodeSnippet::LightProcessing), Some(""));

        family.set_supported_languages(vec![ShaderLanguage::Hlsl]).unwrap();
        assert_eq!(family.code_table().len(), 1);
        assert_eq!(family.code(ShaderLanguage::GlslVulkan), None);
    }

    #[test]
    fn test_snippet_for_unsupported_language_rejected() {
        let mut family = family();
        assert_eq!(
            family.set_code_snippet(ShaderLanguage::Hlsl, CodeSnippet::Compositing, ""),
            Err(FamilyError::UnsupportedLanguage(ShaderLanguage::Hlsl))
        );
    }

    #[test]
    fn test_light_input_rules() {
        let mut family = family();
        let color = LightProcessingFunctionInput::new("diffuseColor", ConnectorType::Vec3, [1.0; 4]);

        assert_eq!(
            family.set_light_inputs(vec![color.clone(), color.clone()]),
            Err(FamilyError::DuplicateLightInput("diffuseColor".to_string()))
        );
        assert_eq!(
            family.set_light_inputs(vec![LightProcessingFunctionInput::new(
                "normal",
                ConnectorType::Vec3,
                [0.0; 4]
            )]),
            Err(FamilyError::ReservedLightInputName("normal".to_string()))
        );
        assert!(family.light_inputs().is_empty());

        family.set_light_inputs(vec![color]).unwrap();
        assert_eq!(family.light_inputs().len(), 1);
    }

    #[test]
    fn test_light_inputs_cannot_shadow_shader_names() {
        let mut family = family();
        for name in ["viewDirection", "lightColor", "fragmentPosition", "accumulatedLight", "outColor", "vec3", "dot"] {
            assert_eq!(
                family.set_light_inputs(vec![LightProcessingFunctionInput::new(name, ConnectorType::Vec3, [0.0; 4])]),
                Err(FamilyError::ReservedLightInputName(name.to_string())),
                "{name}"
            );
        }
        assert!(family.light_inputs().is_empty());
    }

    #[test]
    fn test_light_input_defaults_must_be_finite() {
        let mut family = family();
        for value in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert_eq!(
                family.set_light_inputs(vec![LightProcessingFunctionInput::new(
                    "gloss",
                    ConnectorType::Float,
                    [value, 0.0, 0.0, 0.0]
                )]),
                Err(FamilyError::NonFiniteLightInputDefault("gloss".to_string()))
            );
        }
        // components past the arity are still stored and hashed
        assert!(family
            .set_light_inputs(vec![LightProcessingFunctionInput::new(
                "gloss",
                ConnectorType::Float,
                [0.5, 0.0, 0.0, f32::NAN]
            )])
            .is_err());
    }

    #[test]
    fn test_vertex_output_names() {
        let mut family = family();
        for name in ["uv", "normalWS", "float"] {
            assert_eq!(
                family.set_additional_vertex_outputs(vec![VertexShaderOutput {
                    name: name.to_string(),
                    ty: ConnectorType::Vec2,
                }]),
                Err(FamilyError::ReservedVertexOutputName(name.to_string()))
            );
        }
        family
            .set_additional_vertex_outputs(vec![VertexShaderOutput {
                name: "windPhase".to_string(),
                ty: ConnectorType::Float,
            }])
            .unwrap();
        assert_eq!(family.additional_vertex_outputs().len(), 1);
    }

    #[test]
    fn test_vertex_color_channel_limit() {
        let mut family = family();
        assert_eq!(
            family.set_vertex_color_channels(5),
            Err(FamilyError::TooManyVertexColorChannels(5))
        );
        family.set_vertex_color_channels(4).unwrap();
        assert_eq!(family.vertex_color_channels(), 4);
    }
}

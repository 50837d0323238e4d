// SPDX-License-Identifier: MIT OR Apache-2.0
//! Turning a material graph into complete shader programs.

use crate::config::AssemblyConfig;
use crate::error::{AssemblyError, Result};
use crate::lights::{ForwardLightLoop, LightLoopProvider};
use ordoplay_material_graph::{
    GeneratedMaterialCode, MaterialLogicGraph, PlatformInfo, ShaderLanguage, VertexLayout,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pipeline stage of a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
}

impl ShaderStage {
    /// File extension used for programs of this stage
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Vertex => "vert",
            Self::Fragment => "frag",
        }
    }
}

/// Source text of one program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderProgram {
    /// Program name, without extension
    pub name: String,
    /// Stage
    pub stage: ShaderStage,
    /// GLSL source
    pub source: String,
}

impl ShaderProgram {
    /// `name.vert` or `name.frag`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.stage.extension())
    }
}

/// Programs assembled for one material
#[derive(Debug, Clone)]
pub struct AssembledMaterial {
    /// Material code the fragment program was built from
    pub code: GeneratedMaterialCode,
    /// Fragment program
    pub fragment: ShaderProgram,
    /// One vertex program per compatible layout
    pub vertex: Vec<ShaderProgram>,
    /// Layouts skipped for lacking attributes
    pub skipped_layouts: Vec<String>,
}

impl AssembledMaterial {
    /// Fragment program followed by the vertex programs
    pub fn programs(&self) -> impl Iterator<Item = &ShaderProgram> {
        std::iter::once(&self.fragment).chain(&self.vertex)
    }
}

/// Builds complete programs around generated material code.
///
/// An assembler holds no per-material state and can be shared across
/// threads.
#[derive(Clone)]
pub struct ShaderAssembler {
    config: AssemblyConfig,
    lights: Arc<dyn LightLoopProvider>,
}

impl ShaderAssembler {
    /// Create an assembler using [`ForwardLightLoop`]
    pub fn new(config: AssemblyConfig) -> Self {
        Self {
            config,
            lights: Arc::new(ForwardLightLoop::default()),
        }
    }

    /// Replace the light loop
    pub fn with_light_loop(mut self, lights: impl LightLoopProvider + 'static) -> Self {
        self.lights = Arc::new(lights);
        self
    }

    /// Assembly settings
    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    pub(crate) fn lights(&self) -> &dyn LightLoopProvider {
        self.lights.as_ref()
    }

    /// Generate the material's code and assemble every program.
    ///
    /// Layouts missing attributes the family needs are skipped and listed in
    /// [`AssembledMaterial::skipped_layouts`].
    pub fn assemble(
        &self,
        name: &str,
        graph: &MaterialLogicGraph,
        platform: &PlatformInfo,
        layouts: &[VertexLayout],
    ) -> Result<AssembledMaterial> {
        let family = graph.family();
        let code = graph.to_code(ShaderLanguage::GlslVulkan, platform)?;

        let fragment = ShaderProgram {
            name: name.to_string(),
            stage: ShaderStage::Fragment,
            source: self.fragment_shader(family, &code)?,
        };

        let mut vertex = Vec::new();
        let mut skipped_layouts = Vec::new();
        for layout in layouts {
            match self.vertex_shader(family, layout, &code.material_data_struct, &code.textures) {
                Ok(source) => vertex.push(ShaderProgram {
                    name: format!("{name}_{}", layout.name),
                    stage: ShaderStage::Vertex,
                    source,
                }),
                Err(AssemblyError::IncompatibleLayout { layout, missing }) => {
                    tracing::debug!(
                        material = name,
                        layout = %layout,
                        ?missing,
                        "Skipping vertex layout without required attributes"
                    );
                    skipped_layouts.push(layout);
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            material = name,
            family = family.name(),
            vertex_programs = vertex.len(),
            skipped = skipped_layouts.len(),
            "Assembled material shaders"
        );

        Ok(AssembledMaterial {
            code,
            fragment,
            vertex,
            skipped_layouts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordoplay_material_graph::registry::{pbr_family, toon_family};
    use ordoplay_material_graph::{
        CodeGenError, FamilyId, MaterialGraphConfig, MaterialNodeType, MathOp, PerFrameDataSets, OUTPUT_NODE_KEY,
    };

    fn pbr_graph() -> MaterialLogicGraph {
        MaterialLogicGraph::new(
            FamilyId::from_name("PBR"),
            Arc::new(pbr_family()),
            MaterialGraphConfig::default(),
        )
    }

    #[test]
    fn test_assemble_skips_incompatible_layouts() {
        let assembler = ShaderAssembler::new(AssemblyConfig::default());
        let layouts = [VertexLayout::mesh(), VertexLayout::debug_lines(), VertexLayout::colored_mesh()];
        let assembled = assembler
            .assemble("brick", &pbr_graph(), &PlatformInfo::default(), &layouts)
            .unwrap();

        assert_eq!(assembled.fragment.file_name(), "brick.frag");
        let names: Vec<String> = assembled.vertex.iter().map(ShaderProgram::file_name).collect();
        assert_eq!(names, vec!["brick_Mesh.vert", "brick_ColoredMesh.vert"]);
        assert_eq!(assembled.skipped_layouts, vec!["DebugLines".to_string()]);
        assert_eq!(assembled.programs().count(), 3);
    }

    #[test]
    fn test_invalid_graph_is_not_assembled() {
        let mut graph = pbr_graph();
        graph.add_node(MaterialNodeType::Variable, [0.0, 0.0]).unwrap();

        let assembler = ShaderAssembler::new(AssemblyConfig::default());
        let result = assembler.assemble("broken", &graph, &PlatformInfo::default(), &[VertexLayout::mesh()]);
        assert!(matches!(result, Err(AssemblyError::CodeGen(CodeGenError::Validation(_)))));
    }

    #[test]
    fn test_variables_need_bound_material_data() {
        let mut family = toon_family();
        family.set_data_sets(PerFrameDataSets::TRANSFORMATIONS, PerFrameDataSets::CAMERA_AND_LIGHTS);
        let mut graph = MaterialLogicGraph::new(
            FamilyId::from_name("Toon"),
            Arc::new(family),
            MaterialGraphConfig::default(),
        );
        let tint = graph.add_node(MaterialNodeType::Variable, [0.0, 0.0]).unwrap();
        graph.set_node_name(tint, "tint").unwrap();
        let sin = graph.add_node(MaterialNodeType::Math(MathOp::Sin), [0.0, 0.0]).unwrap();
        graph.connect_by_name(sin, "angle", tint, "value").unwrap();
        graph.connect_by_name(OUTPUT_NODE_KEY, "shadeThreshold", sin, "result").unwrap();

        let assembler = ShaderAssembler::new(AssemblyConfig::default());
        match assembler.assemble("tinted", &graph, &PlatformInfo::default(), &[VertexLayout::mesh()]) {
            Err(AssemblyError::CodeGen(CodeGenError::Validation(diagnostics))) => {
                assert!(diagnostics.iter().any(|d| d.node == Some(tint)));
                assert!(diagnostics.mentions("material data"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_assembler_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ShaderAssembler>();
    }
}

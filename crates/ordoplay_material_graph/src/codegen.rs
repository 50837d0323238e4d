// SPDX-License-Identifier: MIT OR Apache-2.0
//! GLSL generation for material graphs.
//!
//! Nodes are visited producers first. Every node output is written once to
//! a variable named after its node key and output position, so generated
//! names never depend on author-chosen names.

use crate::glsl::{
    built_in_reads, glsl_type, glsl_type_for_width, literal, narrowing_swizzle, BITANGENT_WS, FRAGMENT_INPUT,
    MATERIAL_DATA, MATERIAL_DATA_STRUCT, MATERIAL_NORMAL_OVERRIDE, NORMAL_WS, TANGENTS_AVAILABLE, TANGENT_WS,
    TEXTURE_PREFIX,
};
use crate::graph::MaterialLogicGraph;
use crate::language::ShaderLanguage;
use crate::node::{MathEmit, MaterialNode};
use crate::output::NORMAL_CONNECTOR_NAME;
use crate::packing::MaterialDataLayout;
use crate::platform::PlatformInfo;
use ordoplay_logic_graph::{ConnectorId, CycleError, Diagnostics, LogicGraph, Node, NodeKey};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use thiserror::Error;

/// A texture sampled by generated material code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureBinding {
    /// Author-assigned name
    pub name: String,
    /// Sampler name in generated code
    pub sampler: String,
    /// Node that samples it
    pub node: NodeKey,
    /// Whether the texture holds a normal map
    pub normal_map: bool,
}

/// Output of [`MaterialLogicGraph::to_code`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedMaterialCode {
    /// Target language
    pub language: ShaderLanguage,
    /// Macro definitions placed at the top of the program
    pub preamble: String,
    /// Statements of the material function
    pub body: String,
    /// Declaration of the material data struct
    pub material_data_struct: String,
    /// Packed material data fields
    pub layout: MaterialDataLayout,
    /// Sampled textures in first-use order
    pub textures: Vec<TextureBinding>,
    /// Whether the body writes its own normal
    pub normal_overridden: bool,
}

/// Errors from code generation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodeGenError {
    /// No generator for the language, or the family does not support it
    #[error("Unsupported shader language: {0}")]
    UnsupportedLanguage(ShaderLanguage),

    /// The graph failed validation
    #[error("Material graph is invalid:\n{0}")]
    Validation(Diagnostics),

    /// A required input has neither an edge nor a default
    #[error("Input '{input}' of node {node} is not connected and has no default")]
    MissingInput {
        /// Node
        node: NodeKey,
        /// Input name
        input: String,
    },

    /// The graph contains a cycle
    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// An edge points at a node that does not exist
    #[error("Node not found: {0}")]
    NodeNotFound(NodeKey),
}

impl MaterialLogicGraph {
    /// Generate material code for `language`.
    ///
    /// The graph is validated first; nothing is generated for an invalid
    /// graph and the validation diagnostics are returned instead.
    pub fn to_code(
        &self,
        language: ShaderLanguage,
        platform: &PlatformInfo,
    ) -> Result<GeneratedMaterialCode, CodeGenError> {
        if !language.has_code_generator() || !self.family().supports(language) {
            return Err(CodeGenError::UnsupportedLanguage(language));
        }

        let mut diagnostics = Diagnostics::new();
        let Some(layout) = self.validate_with_layout(&mut diagnostics) else {
            return Err(CodeGenError::Validation(diagnostics));
        };

        let order = self.topological_sort()?;
        let mut emitter = Emitter {
            graph: self.graph(),
            prefix: &self.config().identifier_prefix,
            platform,
            body: String::new(),
            textures: Vec::new(),
            normal_overridden: false,
        };
        for key in order.iter().rev() {
            let node = self.graph().node(*key).ok_or(CodeGenError::NodeNotFound(*key))?;
            emitter.emit_node(node)?;
        }

        let mut preamble = String::new();
        if emitter.normal_overridden {
            let _ = writeln!(preamble, "#define {MATERIAL_NORMAL_OVERRIDE}");
        }
        let material_data_struct = material_data_struct(&layout);
        tracing::info!(
            nodes = order.len(),
            fields = layout.fields.len(),
            textures = emitter.textures.len(),
            "Generated material code"
        );

        Ok(GeneratedMaterialCode {
            language,
            preamble,
            body: emitter.body,
            material_data_struct,
            layout,
            textures: emitter.textures,
            normal_overridden: emitter.normal_overridden,
        })
    }
}

/// Declaration of the material data struct, one member per field
pub fn material_data_struct(layout: &MaterialDataLayout) -> String {
    let mut text = format!("struct {MATERIAL_DATA_STRUCT} {{\n");
    for field in &layout.fields {
        let _ = writeln!(text, "    {} {};", glsl_type_for_width(field.component_count), field.name);
    }
    text.push_str("};\n");
    text
}

struct Emitter<'a> {
    graph: &'a LogicGraph<MaterialNode>,
    prefix: &'a str,
    platform: &'a PlatformInfo,
    body: String,
    textures: Vec<TextureBinding>,
    normal_overridden: bool,
}

impl Emitter<'_> {
    fn ident(&self, node: NodeKey, output: ConnectorId) -> String {
        format!("{}{}_{}", self.prefix, node, output)
    }

    /// Expression feeding an input: the producer's variable or the default
    fn input_expr(&self, node: &Node<MaterialNode>, id: ConnectorId) -> Result<String, CodeGenError> {
        let input = node.input(id).ok_or(CodeGenError::MissingInput {
            node: node.key(),
            input: id.to_string(),
        })?;
        if let Some(edge) = input.link() {
            if !self.graph.contains(edge.node) {
                return Err(CodeGenError::NodeNotFound(edge.node));
            }
            return Ok(self.ident(edge.node, edge.output));
        }
        input
            .default_value
            .map(|value| literal(input.ty(), value))
            .ok_or_else(|| CodeGenError::MissingInput {
                node: node.key(),
                input: input.name.clone(),
            })
    }

    fn line(&mut self, line: &str) {
        self.body.push_str(line);
        self.body.push('\n');
    }

    fn emit_node(&mut self, node: &Node<MaterialNode>) -> Result<(), CodeGenError> {
        let key = node.key();
        let header = format!("    // {} ({key})", node.data.node_type());
        self.line(&header);

        match &node.data {
            MaterialNode::Output(_) => self.emit_output(node)?,
            MaterialNode::Constant(constant) => {
                let output = &node.outputs()[0];
                let line = format!(
                    "    {} {} = {};",
                    glsl_type(output.ty()),
                    self.ident(key, ConnectorId(0)),
                    literal(output.ty(), constant.value)
                );
                self.line(&line);
            }
            MaterialNode::Variable(variable) => {
                let output = &node.outputs()[0];
                let line = format!(
                    "    {} {} = {MATERIAL_DATA}.{};",
                    glsl_type(output.ty()),
                    self.ident(key, ConnectorId(0)),
                    variable.name
                );
                self.line(&line);
            }
            MaterialNode::TextureInput(texture) => {
                let sampler = self.bind_texture(key, &texture.name, false);
                let uv = self.input_expr(node, ConnectorId(0))?;
                let ty = node.outputs()[0].ty();
                let line = format!(
                    "    {} {} = texture({sampler}, {uv}){};",
                    glsl_type(ty),
                    self.ident(key, ConnectorId(0)),
                    narrowing_swizzle(ty)
                );
                self.line(&line);
            }
            MaterialNode::NormalMapInput(texture) => {
                let sampler = self.bind_texture(key, &texture.name, true);
                let uv = self.input_expr(node, ConnectorId(0))?;
                self.emit_normal_map(key, &sampler, &uv);
            }
            MaterialNode::Splitter(_) => {
                let vector = self.input_expr(node, ConnectorId(0))?;
                for (id, _) in node.outputs_with_ids().filter(|(_, o)| o.is_enabled()) {
                    let line = format!(
                        "    float {} = {vector}.{};",
                        self.ident(key, id),
                        ["x", "y", "z", "w"][id.index()]
                    );
                    self.line(&line);
                }
            }
            MaterialNode::Joiner(_) => {
                let mut components = Vec::new();
                for (id, _) in node.inputs_with_ids().filter(|(_, i)| i.is_enabled()) {
                    components.push(self.input_expr(node, id)?);
                }
                let ty = glsl_type(node.outputs()[0].ty());
                let line = format!(
                    "    {ty} {} = {ty}({});",
                    self.ident(key, ConnectorId(0)),
                    components.join(", ")
                );
                self.line(&line);
            }
            MaterialNode::BuiltIn(input) => {
                for ((id, output), read) in node.outputs_with_ids().zip(built_in_reads(*input)) {
                    let ty = glsl_type(output.ty());
                    let ident = self.ident(key, id);
                    self.line(&format!("    {ty} {ident};"));
                    self.line(&format!("#ifdef {}", read.guard));
                    self.line(&format!("    {ident} = {};", read.expression));
                    self.line("#else");
                    self.line(&format!("    {ident} = {};", read.fallback));
                    self.line("#endif");
                }
            }
            MaterialNode::Math(math) => {
                let mut args = Vec::with_capacity(node.inputs().len());
                for (id, _) in node.inputs_with_ids() {
                    args.push(self.input_expr(node, id)?);
                }
                let expression = match math.op.emit() {
                    MathEmit::Operator(op) => args.join(&format!(" {op} ")),
                    MathEmit::Prefix(op) => format!("{op}{}", args.join("")),
                    MathEmit::Function(function) => format!("{function}({})", args.join(", ")),
                };
                let line = format!(
                    "    {} {} = {expression};",
                    glsl_type(node.outputs()[0].ty()),
                    self.ident(key, ConnectorId(0))
                );
                self.line(&line);
            }
        }
        Ok(())
    }

    fn emit_output(&mut self, node: &Node<MaterialNode>) -> Result<(), CodeGenError> {
        for (id, input) in node.inputs_with_ids() {
            let is_normal = input.name == NORMAL_CONNECTOR_NAME;
            if is_normal && input.is_connected() {
                self.normal_overridden = true;
            }
            if !input.is_connected() && input.default_value.is_none() && !input.required {
                continue;
            }
            let value = self.input_expr(node, id)?;
            self.line(&format!("    {} = {value};", input.name));
        }
        Ok(())
    }

    fn bind_texture(&mut self, node: NodeKey, name: &str, normal_map: bool) -> String {
        let sampler = format!("{TEXTURE_PREFIX}{name}");
        self.textures.push(TextureBinding {
            name: name.to_string(),
            sampler: sampler.clone(),
            node,
            normal_map,
        });
        sampler
    }

    fn emit_normal_map(&mut self, key: NodeKey, sampler: &str, uv: &str) {
        let ident = self.ident(key, ConnectorId(0));
        if self.platform.normal_map_channels == 2 {
            let xy = format!("{ident}xy");
            self.line(&format!("    vec2 {xy} = texture({sampler}, {uv}).xy * 2.0 - 1.0;"));
            self.line(&format!(
                "    vec3 {ident} = vec3({xy}, sqrt(max(1.0 - dot({xy}, {xy}), 0.0)));"
            ));
        } else {
            self.line(&format!(
                "    vec3 {ident} = normalize(texture({sampler}, {uv}).xyz * 2.0 - 1.0);"
            ));
        }
        self.line(&format!("#ifdef {TANGENTS_AVAILABLE}"));
        self.line(&format!(
            "    {ident} = normalize(mat3({FRAGMENT_INPUT}.{TANGENT_WS}, {FRAGMENT_INPUT}.{BITANGENT_WS}, {FRAGMENT_INPUT}.{NORMAL_WS}) * {ident});"
        ));
        self.line("#endif");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MaterialGraphConfig;
    use crate::node::{BuiltInInput, MaterialNodeType, MathOp, ModeId};
    use crate::output::OUTPUT_NODE_KEY;
    use crate::platform::TextureCompressionFamily;
    use crate::registry::{toon_family, FamilyId};
    use std::sync::Arc;

    fn toon_graph() -> MaterialLogicGraph {
        MaterialLogicGraph::new(
            FamilyId::from_name("Toon"),
            Arc::new(toon_family()),
            MaterialGraphConfig::default(),
        )
    }

    #[test]
    fn test_unsupported_language() {
        let graph = toon_graph();
        assert_eq!(
            graph.to_code(ShaderLanguage::Hlsl, &PlatformInfo::default()).unwrap_err(),
            CodeGenError::UnsupportedLanguage(ShaderLanguage::Hlsl)
        );
    }

    #[test]
    fn test_empty_graph_writes_defaults() {
        let graph = toon_graph();
        let code = graph.to_code(ShaderLanguage::GlslVulkan, &PlatformInfo::default()).unwrap();
        assert!(code.body.contains("    diffuseColor = vec3(1.0, 1.0, 1.0);"));
        assert!(code.body.contains("    shadeThreshold = 0.5;"));
        assert!(!code.body.contains("normal ="));
        assert!(!code.normal_overridden);
        assert!(code.preamble.is_empty());
        assert_eq!(code.layout.total_components, 64);
    }

    #[test]
    fn test_math_and_operator_forms() {
        let mut graph = toon_graph();
        let a = graph.add_node(MaterialNodeType::Constant, [0.0, 0.0]).unwrap();
        let add = graph.add_node(MaterialNodeType::Math(MathOp::Add), [0.0, 0.0]).unwrap();
        let negate = graph.add_node(MaterialNodeType::Math(MathOp::Negate), [0.0, 0.0]).unwrap();
        let clamp = graph.add_node(MaterialNodeType::Math(MathOp::Clamp), [0.0, 0.0]).unwrap();
        graph.connect_by_name(add, "a", a, "value").unwrap();
        graph.connect_by_name(add, "b", a, "value").unwrap();
        graph.connect_by_name(negate, "x", add, "result").unwrap();
        graph.connect_by_name(clamp, "x", negate, "result").unwrap();
        graph.connect_by_name(OUTPUT_NODE_KEY, "shadeThreshold", clamp, "result").unwrap();

        let code = graph.to_code(ShaderLanguage::GlslVulkan, &PlatformInfo::default()).unwrap();
        assert!(code.body.contains("float n2_0 = n1_0 + n1_0;"));
        assert!(code.body.contains("float n3_0 = -n2_0;"));
        assert!(code.body.contains("float n4_0 = clamp(n3_0, 0.0, 1.0);"));
        assert!(code.body.contains("    shadeThreshold = n4_0;"));
    }

    #[test]
    fn test_built_in_reads_are_guarded() {
        let mut graph = toon_graph();
        let color = graph
            .add_node(MaterialNodeType::BuiltIn(BuiltInInput::VertexColor), [0.0, 0.0])
            .unwrap();
        let splitter = graph.add_node(MaterialNodeType::Splitter, [0.0, 0.0]).unwrap();
        graph.set_mode(splitter, ModeId(2)).unwrap();
        graph.connect_by_name(splitter, "vector", color, "color").unwrap();
        graph.connect_by_name(OUTPUT_NODE_KEY, "opacity", splitter, "w").unwrap();

        let code = graph.to_code(ShaderLanguage::GlslVulkan, &PlatformInfo::default()).unwrap();
        let expected = "    vec4 n1_0;\n#ifdef VERTEX_COLOR_AVAILABLE\n    n1_0 = fragmentInput.color;\n#else\n    n1_0 = vec4(1.0);\n#endif\n";
        assert!(code.body.contains(expected), "{}", code.body);
        assert!(code.body.contains("float n2_3 = n1_0.w;"));
        assert!(code.body.contains("    opacity = n2_3;"));
    }

    #[test]
    fn test_joiner_uses_enabled_inputs() {
        let mut graph = toon_graph();
        let joiner = graph.add_node(MaterialNodeType::Joiner, [0.0, 0.0]).unwrap();
        graph.set_mode(joiner, ModeId(1)).unwrap();
        let x = graph.add_node(MaterialNodeType::Constant, [0.0, 0.0]).unwrap();
        graph.set_node_value(x, [0.25, 0.0, 0.0, 0.0]).unwrap();
        graph.connect_by_name(joiner, "x", x, "value").unwrap();
        graph.connect_by_name(OUTPUT_NODE_KEY, "shadeColor", joiner, "vector").unwrap();

        let code = graph.to_code(ShaderLanguage::GlslVulkan, &PlatformInfo::default()).unwrap();
        assert!(code.body.contains("vec3 n1_0 = vec3(n2_0, 0.0, 0.0);"), "{}", code.body);
    }

    #[test]
    fn test_textures_are_bound_and_swizzled() {
        let mut graph = toon_graph();
        let uv = graph
            .add_node(MaterialNodeType::BuiltIn(BuiltInInput::TextureCoordinates), [0.0, 0.0])
            .unwrap();
        let albedo = graph.add_node(MaterialNodeType::TextureInput, [0.0, 0.0]).unwrap();
        graph.set_node_name(albedo, "albedo").unwrap();
        graph.set_mode(albedo, ModeId(2)).unwrap();
        graph.connect_by_name(albedo, "uv", uv, "uv").unwrap();
        graph.connect_by_name(OUTPUT_NODE_KEY, "diffuseColor", albedo, "value").unwrap();

        let code = graph.to_code(ShaderLanguage::GlslVulkan, &PlatformInfo::default()).unwrap();
        assert!(code.body.contains("vec3 n2_0 = texture(tex_albedo, n1_0).xyz;"));
        assert_eq!(code.textures.len(), 1);
        assert_eq!(code.textures[0].sampler, "tex_albedo");
        assert!(!code.textures[0].normal_map);
    }

    #[test]
    fn test_normal_map_follows_platform_channels() {
        let mut graph = toon_graph();
        let uv = graph
            .add_node(MaterialNodeType::BuiltIn(BuiltInInput::TextureCoordinates), [0.0, 0.0])
            .unwrap();
        let normal_map = graph.add_node(MaterialNodeType::NormalMapInput, [0.0, 0.0]).unwrap();
        graph.set_node_name(normal_map, "bumps").unwrap();
        graph.connect_by_name(normal_map, "uv", uv, "uv").unwrap();
        graph.connect_by_name(OUTPUT_NODE_KEY, "normal", normal_map, "normal").unwrap();

        let two = graph.to_code(ShaderLanguage::GlslVulkan, &PlatformInfo::default()).unwrap();
        assert!(two.body.contains("sqrt(max(1.0 - dot(n2_0xy, n2_0xy), 0.0))"));
        assert!(two.normal_overridden);
        assert_eq!(two.preamble, "#define MATERIAL_NORMAL_OVERRIDE\n");
        assert!(!two.body.contains("#define"));
        assert!(two.textures[0].normal_map);

        let astc = PlatformInfo::for_compression(TextureCompressionFamily::Astc);
        let three = graph.to_code(ShaderLanguage::GlslVulkan, &astc).unwrap();
        assert!(three.body.contains("normalize(texture(tex_bumps, n1_0).xyz * 2.0 - 1.0)"));
    }

    #[test]
    fn test_invalid_graph_generates_nothing() {
        let mut graph = toon_graph();
        graph.add_node(MaterialNodeType::Math(MathOp::Sin), [0.0, 0.0]).unwrap();
        match graph.to_code(ShaderLanguage::GlslVulkan, &PlatformInfo::default()) {
            Err(CodeGenError::Validation(diagnostics)) => assert!(diagnostics.mentions("'angle'")),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_struct_text() {
        let mut graph = toon_graph();
        let tint = graph.add_node(MaterialNodeType::Variable, [0.0, 0.0]).unwrap();
        graph.set_node_name(tint, "tint").unwrap();
        graph.set_mode(tint, ModeId(2)).unwrap();

        let code = graph.to_code(ShaderLanguage::GlslVulkan, &PlatformInfo::default()).unwrap();
        assert!(code.material_data_struct.starts_with("struct MaterialData {\n    vec3 tint;\n    float padding0;\n"));
        assert!(code.material_data_struct.ends_with("    float padding60;\n};\n"));
        assert!(code.body.contains("vec3 n1_0 = materialData.tint;"));
    }
}

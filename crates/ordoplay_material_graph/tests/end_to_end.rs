// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end material graph scenarios: build, validate, pack, generate.

use ordoplay_logic_graph::{ConnectorId, Diagnostics, NodeKey};
use ordoplay_material_graph::{
    BuiltInInput, FamilyId, FamilyRegistry, MaterialGraphConfig, MaterialGraphError, MaterialLogicGraph,
    MaterialNodeType, MathOp, ModeId, PlatformInfo, ShaderLanguage, OUTPUT_NODE_KEY,
};

fn graph_for(family: &str) -> MaterialLogicGraph {
    let registry = FamilyRegistry::with_builtin_families();
    let id = FamilyId::from_name(family);
    let definition = registry.get(id).cloned().unwrap();
    MaterialLogicGraph::new(id, definition, MaterialGraphConfig::default())
}

fn generate(graph: &MaterialLogicGraph) -> String {
    graph
        .to_code(ShaderLanguage::GlslVulkan, &PlatformInfo::default())
        .unwrap()
        .body
}

#[test]
fn test_constant_into_diffuse_color() {
    let mut graph = graph_for("Toon");
    let constant = graph.add_node(MaterialNodeType::Constant, [0.0, 0.0]).unwrap();
    graph.set_mode(constant, ModeId(2)).unwrap();
    graph.set_node_value(constant, [1.0, 0.0, 1.0, 0.0]).unwrap();
    graph.connect(OUTPUT_NODE_KEY, ConnectorId(0), constant, ConnectorId(0)).unwrap();

    let body = generate(&graph);
    assert!(body.contains("    vec3 n1_0 = vec3(1.0, 0.0, 1.0);"), "{body}");
    assert!(body.contains("    diffuseColor = n1_0;"), "{body}");
}

#[test]
fn test_sin_of_split_texture_coordinates() {
    let mut graph = graph_for("Toon");
    let uv = graph
        .add_node(MaterialNodeType::BuiltIn(BuiltInInput::TextureCoordinates), [0.0, 0.0])
        .unwrap();
    let splitter = graph.add_node(MaterialNodeType::Splitter, [0.0, 0.0]).unwrap();
    graph.set_mode(splitter, ModeId(0)).unwrap();
    let sin = graph.add_node(MaterialNodeType::Math(MathOp::Sin), [0.0, 0.0]).unwrap();
    graph.connect_by_name(splitter, "vector", uv, "uv").unwrap();
    graph.connect_by_name(OUTPUT_NODE_KEY, "shadeThreshold", sin, "result").unwrap();

    let mut diagnostics = Diagnostics::new();
    assert!(!graph.validate(&mut diagnostics));
    assert!(diagnostics.iter().any(|d| d.node == Some(sin)));

    graph.connect_by_name(sin, "angle", splitter, "x").unwrap();
    let mut diagnostics = Diagnostics::new();
    assert!(graph.validate(&mut diagnostics), "{diagnostics}");

    let producers_first: Vec<NodeKey> = graph.topological_sort().unwrap().into_iter().rev().collect();
    let position = |key| producers_first.iter().position(|k| *k == key).unwrap();
    assert!(position(uv) < position(splitter));
    assert!(position(splitter) < position(sin));
    assert!(position(sin) < position(OUTPUT_NODE_KEY));

    let body = generate(&graph);
    let uv_at = body.find("n1_0 = fragmentInput.uv").unwrap();
    let split_at = body.find("float n2_0 = n1_0.x;").unwrap();
    let sin_at = body.find("float n3_0 = sin(n2_0);").unwrap();
    assert!(uv_at < split_at && split_at < sin_at);
}

#[test]
fn test_eleven_variables_pack_into_sixteen_slots() {
    let mut graph = graph_for("Toon");
    let widths = [4u8, 4, 3, 3, 2, 2, 1, 1, 1, 1, 1];
    let mut keys = Vec::new();
    for (i, width) in widths.iter().enumerate() {
        let key = graph.add_node(MaterialNodeType::Variable, [0.0, 0.0]).unwrap();
        graph.set_node_name(key, format!("var{i}")).unwrap();
        graph.set_mode(key, ModeId(width - 1)).unwrap();
        keys.push(key);
    }

    let mut diagnostics = Diagnostics::new();
    let layout = graph.validate_with_layout(&mut diagnostics).unwrap();

    assert_eq!(layout.fields[0].node, Some(keys[0]));
    assert_eq!(layout.fields[1].node, Some(keys[1]));
    assert_eq!((layout.fields[0].offset, layout.fields[1].offset), (0, 4));

    // each three-wide field is completed to a full slot
    for (i, field) in layout.fields.iter().enumerate() {
        if field.component_count == 3 {
            let next = &layout.fields[i + 1];
            assert_eq!(next.component_count, 1);
            assert_eq!(field.offset % 4, 0);
            assert_eq!(next.offset, field.offset + 3);
        }
    }

    assert_eq!(layout.variables().count(), 11);
    assert_eq!(layout.total_components, 64);
    assert_eq!(layout.vec4_slots(), 16);
    assert_eq!(layout.fields.last().unwrap().offset, 63);
}

#[test]
fn test_duplicate_variable_names_fail() {
    let mut graph = graph_for("PBR");
    for _ in 0..2 {
        let key = graph.add_node(MaterialNodeType::Variable, [0.0, 0.0]).unwrap();
        graph.set_node_name(key, "roughness").unwrap();
    }

    let mut diagnostics = Diagnostics::new();
    assert!(!graph.validate(&mut diagnostics));
    assert!(diagnostics.iter().any(|d| d.message.contains("roughness") && d.message.contains("unique names")));
}

#[test]
fn test_normal_override_macro_follows_connection() {
    let mut graph = graph_for("Toon");
    let normal = graph
        .add_node(MaterialNodeType::BuiltIn(BuiltInInput::Normal), [0.0, 0.0])
        .unwrap();
    let negate = graph.add_node(MaterialNodeType::Math(MathOp::Negate), [0.0, 0.0]).unwrap();
    graph.set_mode(negate, ModeId(2)).unwrap();
    graph.connect_by_name(negate, "x", normal, "normal").unwrap();
    graph.connect_by_name(OUTPUT_NODE_KEY, "normal", negate, "result").unwrap();

    let code = graph.to_code(ShaderLanguage::GlslVulkan, &PlatformInfo::default()).unwrap();
    assert!(code.preamble.contains("#define MATERIAL_NORMAL_OVERRIDE"));
    assert!(!code.body.contains("#define"));
    assert!(code.body.contains("    normal = n2_0;"));
    assert!(code.normal_overridden);

    let input = graph.input_id(OUTPUT_NODE_KEY, "normal").unwrap();
    graph.disconnect_input(OUTPUT_NODE_KEY, input).unwrap();
    let code = graph.to_code(ShaderLanguage::GlslVulkan, &PlatformInfo::default()).unwrap();
    assert!(!code.preamble.contains("MATERIAL_NORMAL_OVERRIDE"));
    assert!(!code.body.contains("MATERIAL_NORMAL_OVERRIDE"));
    assert!(!code.normal_overridden);
}

#[test]
fn test_change_material_family_matches_new_light_inputs() {
    let registry = FamilyRegistry::with_builtin_families();
    let mut graph = graph_for("Toon");
    let constant = graph.add_node(MaterialNodeType::Constant, [0.0, 0.0]).unwrap();
    graph.connect_by_name(OUTPUT_NODE_KEY, "opacity", constant, "value").unwrap();
    graph.connect_by_name(OUTPUT_NODE_KEY, "shadeThreshold", constant, "value").unwrap();

    let pbr_id = FamilyId::from_name("PBR");
    let pbr = registry.get(pbr_id).cloned().unwrap();
    graph.change_material_family(pbr_id, pbr.clone()).unwrap();

    let output = graph.node(OUTPUT_NODE_KEY).unwrap();
    let light_inputs = pbr.light_inputs();
    assert_eq!(output.inputs().len(), light_inputs.len() + 1);
    for (connector, input) in output.inputs().iter().zip(light_inputs) {
        assert_eq!(connector.name, input.name);
        assert_eq!(connector.ty(), input.ty);
    }
    assert_eq!(output.inputs().last().unwrap().name, "normal");
    assert!(output.inputs().iter().all(|i| !i.is_connected()));
    assert_eq!(graph.graph().edge_count(), 0);
}

#[test]
fn test_cycle_rejected_without_changing_edges() {
    let mut graph = graph_for("Toon");
    let a = graph.add_node(MaterialNodeType::Math(MathOp::Add), [0.0, 0.0]).unwrap();
    let b = graph.add_node(MaterialNodeType::Math(MathOp::Abs), [0.0, 0.0]).unwrap();
    let c = graph.add_node(MaterialNodeType::Math(MathOp::Fract), [0.0, 0.0]).unwrap();
    graph.connect_by_name(b, "x", a, "result").unwrap();
    graph.connect_by_name(c, "x", b, "result").unwrap();

    let before: Vec<_> = graph.graph().edges().collect();
    assert!(matches!(
        graph.connect_by_name(a, "a", c, "result"),
        Err(MaterialGraphError::Connection(_))
    ));
    let after: Vec<_> = graph.graph().edges().collect();
    assert_eq!(before, after);

    let order = graph.topological_sort().unwrap();
    assert_eq!(order.len(), graph.graph().node_count());
    let mut sorted = order.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), order.len());
}

#[test]
fn test_producers_are_defined_before_use() {
    let mut graph = graph_for("PBR");
    let uv = graph
        .add_node(MaterialNodeType::BuiltIn(BuiltInInput::TextureCoordinates), [0.0, 0.0])
        .unwrap();
    let albedo = graph.add_node(MaterialNodeType::TextureInput, [0.0, 0.0]).unwrap();
    graph.set_node_name(albedo, "albedo").unwrap();
    graph.set_mode(albedo, ModeId(2)).unwrap();
    let tint = graph.add_node(MaterialNodeType::Variable, [0.0, 0.0]).unwrap();
    graph.set_node_name(tint, "tint").unwrap();
    graph.set_mode(tint, ModeId(2)).unwrap();
    let multiply = graph.add_node(MaterialNodeType::Math(MathOp::Multiply), [0.0, 0.0]).unwrap();
    graph.set_mode(multiply, ModeId(2)).unwrap();
    let length = graph.add_node(MaterialNodeType::Math(MathOp::Length), [0.0, 0.0]).unwrap();
    graph.set_mode(length, ModeId(2)).unwrap();

    graph.connect_by_name(albedo, "uv", uv, "uv").unwrap();
    graph.connect_by_name(multiply, "a", albedo, "value").unwrap();
    graph.connect_by_name(multiply, "b", tint, "value").unwrap();
    graph.connect_by_name(length, "x", multiply, "result").unwrap();
    graph.connect_by_name(OUTPUT_NODE_KEY, "albedo", multiply, "result").unwrap();
    graph.connect_by_name(OUTPUT_NODE_KEY, "roughness", length, "result").unwrap();

    let body = generate(&graph);
    for (consumer, input, edge) in graph.graph().edges() {
        let ident = format!("n{}_{}", edge.node, edge.output);
        let defined = body
            .lines()
            .position(|l| l.contains(&format!("{ident} =")) || l.trim_start().ends_with(&format!(" {ident};")))
            .unwrap();
        let used = body
            .lines()
            .position(|l| {
                let rhs = l.split_once('=').map(|(_, r)| r).unwrap_or("");
                rhs.contains(&ident)
            })
            .unwrap_or_else(|| panic!("{ident} unused by {consumer}:{input}\n{body}"));
        assert!(defined < used, "{ident} used before definition\n{body}");
    }
}

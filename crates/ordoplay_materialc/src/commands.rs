// SPDX-License-Identifier: MIT OR Apache-2.0
//! Subcommand implementations.

use crate::config::MaterialcConfig;
use anyhow::{bail, Context};
use ordoplay_logic_graph::Diagnostics;
use ordoplay_material_graph::family_codec::FAMILY_FILE_EXTENSION;
use ordoplay_material_graph::{family_hash, load_family, save_family, FamilyRegistry, MaterialLogicGraph};
use ordoplay_shader_assembly::{compile_and_write_all, CompileJob, ShaderAssembler, SourceOutput};
use std::path::{Path, PathBuf};

/// Built-in families plus the ones listed in the configuration
pub fn load_registry(config: &MaterialcConfig) -> anyhow::Result<FamilyRegistry> {
    let mut registry = FamilyRegistry::with_builtin_families();
    for path in &config.families {
        let family = load_family(path).with_context(|| format!("Failed to load family {}", path.display()))?;
        let name = family.name().to_string();
        let id = registry.register(family);
        tracing::info!(family = %name, %id, "Registered material family");
    }
    Ok(registry)
}

fn material_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "material".to_string())
}

fn load_material(
    path: &Path,
    registry: &FamilyRegistry,
    config: &MaterialcConfig,
    diagnostics: &mut Diagnostics,
) -> anyhow::Result<MaterialLogicGraph> {
    MaterialLogicGraph::load(path, registry, config.graph.clone(), diagnostics)
        .with_context(|| format!("Failed to load material {}", path.display()))
}

fn report(path: &Path, diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        println!("{}: {diagnostic}", path.display());
    }
}

/// Validate every material; fails if any is invalid
pub fn validate(config: &MaterialcConfig, materials: &[PathBuf]) -> anyhow::Result<()> {
    let registry = load_registry(config)?;
    let mut failed = 0usize;

    for path in materials {
        let mut diagnostics = Diagnostics::new();
        let graph = load_material(path, &registry, config, &mut diagnostics)?;
        let valid = graph.validate(&mut diagnostics);
        report(path, &diagnostics);
        if valid {
            println!("{}: ok", path.display());
        } else {
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{failed} of {} material(s) failed validation", materials.len());
    }
    Ok(())
}

/// Assemble every material and write its programs and packing report
pub fn generate(config: &MaterialcConfig, materials: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let registry = load_registry(config)?;
    let assembler = ShaderAssembler::new(config.assembly.clone());
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory {}", config.output_dir.display()))?;

    let mut jobs = Vec::new();
    let mut written = Vec::new();
    for path in materials {
        let mut diagnostics = Diagnostics::new();
        let graph = load_material(path, &registry, config, &mut diagnostics)?;
        report(path, &diagnostics);

        let name = material_name(path);
        let assembled = assembler
            .assemble(&name, &graph, &config.platform, &config.vertex_layouts)
            .with_context(|| format!("Failed to generate shaders for {}", path.display()))?;

        let layout_path = config.output_dir.join(format!("{name}.layout.json"));
        let layout = serde_json::to_string_pretty(&assembled.code.layout)?;
        std::fs::write(&layout_path, layout)
            .with_context(|| format!("Failed to write {}", layout_path.display()))?;
        written.push(layout_path);

        jobs.extend(
            assembled
                .programs()
                .cloned()
                .map(|program| CompileJob::in_directory(program, &config.output_dir)),
        );
    }

    written.extend(compile_and_write_all(&SourceOutput, &jobs, config.threads)?);
    tracing::info!(files = written.len(), output = ?config.output_dir, "Generation finished");
    Ok(written)
}

/// List registered families, optionally exporting each as a definition file
pub fn families(config: &MaterialcConfig, export: Option<&Path>) -> anyhow::Result<()> {
    let registry = load_registry(config)?;
    if let Some(dir) = export {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    for (id, family) in registry.iter() {
        println!("{:<16} {id} {:016x}", family.name(), family_hash(family));
        if let Some(dir) = export {
            let path = dir.join(format!("{}.{FAMILY_FILE_EXTENSION}", family.name()));
            save_family(family, &path).with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }
    Ok(())
}

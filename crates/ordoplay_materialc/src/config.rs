// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compiler configuration.
//!
//! Stored as RON. Relative paths are resolved against the directory of the
//! configuration file.

use anyhow::{bail, Context};
use ordoplay_material_graph::{MaterialGraphConfig, PlatformInfo, VertexLayout};
use ordoplay_shader_assembly::AssemblyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current configuration format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Configuration file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "materialc.ron";

/// Everything the compiler needs besides the command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialcConfig {
    /// Format version
    pub version: u32,
    /// Family definition files registered next to the built-in families
    pub families: Vec<PathBuf>,
    /// Material graph documents
    pub materials: Vec<PathBuf>,
    /// Vertex layouts vertex programs are generated for
    pub vertex_layouts: Vec<VertexLayout>,
    /// Target platform
    pub platform: PlatformInfo,
    /// Material graph settings
    pub graph: MaterialGraphConfig,
    /// Shader assembly settings
    pub assembly: AssemblyConfig,
    /// Where generated programs are written
    pub output_dir: PathBuf,
    /// Compile worker threads, rayon's default when unset
    pub threads: Option<usize>,
}

impl Default for MaterialcConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            families: Vec::new(),
            materials: Vec::new(),
            vertex_layouts: vec![VertexLayout::mesh(), VertexLayout::colored_mesh()],
            platform: PlatformInfo::default(),
            graph: MaterialGraphConfig::default(),
            assembly: AssemblyConfig::default(),
            output_dir: PathBuf::from("shaders"),
            threads: None,
        }
    }
}

impl MaterialcConfig {
    /// Parse a configuration from RON
    pub fn from_ron(content: &str) -> anyhow::Result<Self> {
        let config: MaterialcConfig = ron::from_str(content).context("Invalid materialc configuration")?;
        if config.version > CONFIG_FORMAT_VERSION {
            bail!(
                "Configuration version {} is newer than supported version {}",
                config.version,
                CONFIG_FORMAT_VERSION
            );
        }
        Ok(config)
    }

    /// Load a configuration file and resolve its paths
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config = Self::from_ron(&content).with_context(|| format!("In {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> anyhow::Result<String> {
        let pretty = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        ron::ser::to_string_pretty(self, pretty).context("Failed to serialize configuration")
    }

    /// Make relative paths relative to `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        self.families.iter_mut().for_each(resolve);
        self.materials.iter_mut().for_each(resolve);
        resolve(&mut self.output_dir);
    }
}

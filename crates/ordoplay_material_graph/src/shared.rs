// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared access to a material graph from several threads.
//!
//! Edits take the write lock; validation and code generation take the read
//! lock, so they always see a consistent snapshot.

use crate::codegen::{CodeGenError, GeneratedMaterialCode};
use crate::graph::MaterialLogicGraph;
use crate::language::ShaderLanguage;
use crate::platform::PlatformInfo;
use ordoplay_logic_graph::Diagnostics;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// One-writer-many-readers handle to a material graph
#[derive(Debug, Clone)]
pub struct SharedMaterialGraph {
    inner: Arc<RwLock<MaterialLogicGraph>>,
}

impl SharedMaterialGraph {
    /// Wrap a graph
    pub fn new(graph: MaterialLogicGraph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    /// Lock for reading
    pub fn read(&self) -> RwLockReadGuard<'_, MaterialLogicGraph> {
        self.inner.read()
    }

    /// Lock for writing
    pub fn write(&self) -> RwLockWriteGuard<'_, MaterialLogicGraph> {
        self.inner.write()
    }

    /// Apply an edit under the write lock
    pub fn edit<R>(&self, f: impl FnOnce(&mut MaterialLogicGraph) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Validate under the read lock
    pub fn validate(&self, diagnostics: &mut Diagnostics) -> bool {
        self.inner.read().validate(diagnostics)
    }

    /// Generate code under the read lock
    pub fn to_code(
        &self,
        language: ShaderLanguage,
        platform: &PlatformInfo,
    ) -> Result<GeneratedMaterialCode, CodeGenError> {
        self.inner.read().to_code(language, platform)
    }

    /// Copy of the current graph
    pub fn snapshot(&self) -> MaterialLogicGraph {
        self.inner.read().clone()
    }
}

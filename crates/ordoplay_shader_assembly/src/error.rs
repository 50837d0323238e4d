// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors from shader assembly and compilation.

use ordoplay_material_graph::{CodeGenError, ShaderLanguage, VertexAttributeSemantic};
use std::path::PathBuf;
use thiserror::Error;

/// Errors assembling, compiling or writing shader programs
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Material code could not be generated
    #[error(transparent)]
    CodeGen(#[from] CodeGenError),

    /// The assembler has no templates for this language
    #[error("Shader assembly does not support {0}")]
    UnsupportedLanguage(ShaderLanguage),

    /// The family left a snippet the program needs empty
    #[error("Family '{family}' has no {snippet} code")]
    EmptySnippet {
        /// Family name
        family: String,
        /// Snippet description
        snippet: &'static str,
    },

    /// A vertex layout lacks attributes the family needs
    #[error("Vertex layout '{layout}' lacks {missing:?}")]
    IncompatibleLayout {
        /// Layout name
        layout: String,
        /// Missing attributes
        missing: Vec<VertexAttributeSemantic>,
    },

    /// Two programs would be written to the same file
    #[error("Several programs write to {0:?}")]
    DuplicateDestination(PathBuf),

    /// The external compiler rejected a program
    #[error("Failed to compile {program}: {message}")]
    Compile {
        /// Program name
        program: String,
        /// Compiler output
        message: String,
    },

    /// Output could not be written
    #[error("Failed to write {path:?}: {source}")]
    Io {
        /// Destination path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The worker pool could not be created
    #[error("Failed to build compile thread pool: {0}")]
    ThreadPool(String),
}

/// Result type for shader assembly
pub type Result<T> = std::result::Result<T, AssemblyError>;

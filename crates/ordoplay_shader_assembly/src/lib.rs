// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader assembly for `OrdoPlay` materials.
//!
//! Wraps the code generated from a material graph into complete GLSL
//! programs:
//! - A fragment program declaring the per-frame and material blocks the
//!   family needs, the family's light-processing and compositing functions,
//!   and a `main` that runs the renderer's light loop
//! - One vertex program per vertex layout that carries every attribute the
//!   family needs; other layouts are skipped
//!
//! Compilation to bytecode is delegated to a [`ShaderCompiler`];
//! [`compile_and_write_all`] runs it on a worker pool.

mod blocks;

pub mod assembler;
pub mod compile;
pub mod config;
pub mod error;
pub mod fragment;
pub mod lights;
pub mod vertex;

pub use assembler::{AssembledMaterial, ShaderAssembler, ShaderProgram, ShaderStage};
pub use blocks::{RENDERER_DATA, TRANSFORMATIONS};
pub use compile::{compile_and_write_all, CompileJob, ShaderCompiler, SourceOutput};
pub use config::AssemblyConfig;
pub use error::{AssemblyError, Result};
pub use fragment::fragment_defines;
pub use lights::{ForwardLightLoop, LightLoopProvider};
pub use vertex::{missing_attributes, required_attributes};

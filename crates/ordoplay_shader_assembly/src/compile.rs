// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compiling assembled programs and writing the results.
//!
//! Compilation runs on a rayon pool. Each output is written to a temporary
//! file next to its destination and renamed into place, so a destination
//! never holds a partially written program.

use crate::assembler::ShaderProgram;
use crate::error::{AssemblyError, Result};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Turns program source into the bytes written to disk
pub trait ShaderCompiler: Send + Sync {
    /// Compile one program; the error is the compiler's message
    fn compile(&self, program: &ShaderProgram) -> std::result::Result<Vec<u8>, String>;
}

/// Writes the GLSL source unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceOutput;

impl ShaderCompiler for SourceOutput {
    fn compile(&self, program: &ShaderProgram) -> std::result::Result<Vec<u8>, String> {
        Ok(program.source.clone().into_bytes())
    }
}

/// A program and where its compiled output goes
#[derive(Debug, Clone)]
pub struct CompileJob {
    /// Program to compile
    pub program: ShaderProgram,
    /// Output file
    pub destination: PathBuf,
}

impl CompileJob {
    /// Job writing `program` into `directory` under its file name
    pub fn in_directory(program: ShaderProgram, directory: &Path) -> Self {
        let destination = directory.join(program.file_name());
        Self { program, destination }
    }
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

fn build_thread_pool(threads: Option<usize>) -> Result<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        if n == 0 {
            return Err(AssemblyError::ThreadPool("thread count must be >= 1 when set".to_string()));
        }
        builder = builder.num_threads(n);
    }
    builder.build().map_err(|e| AssemblyError::ThreadPool(e.to_string()))
}

fn write_atomically(destination: &Path, bytes: &[u8]) -> Result<()> {
    let io_error = |source| AssemblyError::Io {
        path: destination.to_path_buf(),
        source,
    };

    let mut file_name = destination.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    file_name.push(format!(".{}.tmp", std::process::id()));
    let temp = destination.with_file_name(file_name);

    let mut guard = TempFileGuard(Some(temp.clone()));
    std::fs::write(&temp, bytes).map_err(io_error)?;
    std::fs::rename(&temp, destination).map_err(io_error)?;
    guard.0 = None;
    Ok(())
}

fn compile_and_write(compiler: &dyn ShaderCompiler, job: &CompileJob) -> Result<PathBuf> {
    let bytes = compiler.compile(&job.program).map_err(|message| AssemblyError::Compile {
        program: job.program.file_name(),
        message,
    })?;
    write_atomically(&job.destination, &bytes)?;
    tracing::debug!(program = %job.program.file_name(), destination = ?job.destination, "Wrote shader");
    Ok(job.destination.clone())
}

/// Compile every job on a pool of `threads` workers (rayon's default when
/// `None`) and write the outputs.
///
/// Jobs sharing a destination are rejected before anything is compiled.
/// Every job runs even if others fail; the first failure in job order is
/// returned.
pub fn compile_and_write_all(
    compiler: &dyn ShaderCompiler,
    jobs: &[CompileJob],
    threads: Option<usize>,
) -> Result<Vec<PathBuf>> {
    let mut destinations = HashSet::with_capacity(jobs.len());
    for job in jobs {
        if !destinations.insert(job.destination.as_path()) {
            return Err(AssemblyError::DuplicateDestination(job.destination.clone()));
        }
    }

    let pool = build_thread_pool(threads)?;
    let results = pool.install(|| {
        jobs.par_iter()
            .map(|job| compile_and_write(compiler, job))
            .collect::<Vec<_>>()
    });

    let mut written = Vec::with_capacity(results.len());
    for result in results {
        written.push(result?);
    }
    tracing::info!(programs = written.len(), "Compiled shader programs");
    Ok(written)
}

//! Turning `.proto` sources into serialized descriptor sets.
//!
//! Every compilation runs in its own scratch directory, so compilers can be
//! shared between threads and invoked concurrently.

use crate::error::CompileError;
use protobuf::Message;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, PoisonError};

/// One schema file, addressed by its import path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// What a compiler made of its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// Serialized `FileDescriptorSet`, imports included
    Compiled(Vec<u8>),
    /// The compiler rejected the sources; carries its diagnostics verbatim
    Failed(String),
}

pub trait SchemaCompiler: Send + Sync {
    fn compile(&self, sources: &[SourceFile]) -> Result<CompileOutcome, CompileError>;
}

impl<T: SchemaCompiler + ?Sized> SchemaCompiler for Box<T> {
    fn compile(&self, sources: &[SourceFile]) -> Result<CompileOutcome, CompileError> {
        (**self).compile(sources)
    }
}

/// Writes `sources` below `root`, refusing paths that would escape it.
fn write_sources(root: &Path, sources: &[SourceFile]) -> Result<Vec<PathBuf>, CompileError> {
    let mut relative = Vec::with_capacity(sources.len());
    for source in sources {
        let path = Path::new(&source.path);
        if path.as_os_str().is_empty()
            || !path.components().all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(CompileError::InvalidPath(source.path.clone()));
        }
        let target = root.join(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, &source.content)?;
        relative.push(path.to_path_buf());
    }
    Ok(relative)
}

/// Runs an external `protoc`.
#[derive(Debug, Clone)]
pub struct ProtocCompiler {
    protoc_path: PathBuf,
}

impl ProtocCompiler {
    pub fn new(protoc_path: impl Into<PathBuf>) -> Self {
        Self {
            protoc_path: protoc_path.into(),
        }
    }
}

impl Default for ProtocCompiler {
    fn default() -> Self {
        Self::new("protoc")
    }
}

impl SchemaCompiler for ProtocCompiler {
    fn compile(&self, sources: &[SourceFile]) -> Result<CompileOutcome, CompileError> {
        let scratch = tempfile::tempdir()?;
        let inputs = write_sources(scratch.path(), sources)?;
        let output = scratch.path().join("descriptor_set.pb");

        tracing::debug!(
            protoc = %self.protoc_path.display(),
            files = inputs.len(),
            "running protoc"
        );
        let result = Command::new(&self.protoc_path)
            .current_dir(scratch.path())
            .arg("-o")
            .arg(&output)
            .arg("--include_source_info")
            .arg("--include_imports")
            .args(&inputs)
            .output()
            .map_err(|source| CompileError::Spawn {
                program: self.protoc_path.display().to_string(),
                source,
            })?;

        if !result.status.success() {
            let diagnostics = String::from_utf8_lossy(&result.stderr).into_owned();
            tracing::info!(status = %result.status, "protoc rejected sources");
            return Ok(CompileOutcome::Failed(diagnostics));
        }
        Ok(CompileOutcome::Compiled(std::fs::read(&output)?))
    }
}

/// In-process parser from `protobuf-parse`. It records no source locations.
#[derive(Debug, Clone, Copy, Default)]
pub struct PureCompiler;

impl SchemaCompiler for PureCompiler {
    fn compile(&self, sources: &[SourceFile]) -> Result<CompileOutcome, CompileError> {
        let scratch = tempfile::tempdir()?;
        let inputs: Vec<PathBuf> = write_sources(scratch.path(), sources)?
            .into_iter()
            .map(|p| scratch.path().join(p))
            .collect();

        let parsed = protobuf_parse::Parser::new()
            .pure()
            .include(scratch.path())
            .inputs(&inputs)
            .file_descriptor_set();
        match parsed {
            Ok(set) => Ok(CompileOutcome::Compiled(set.write_to_bytes()?)),
            Err(err) => {
                tracing::info!("parser rejected sources: {err:#}");
                Ok(CompileOutcome::Failed(format!("{err:#}")))
            }
        }
    }
}

/// Memoizes successful compilations of identical inputs.
pub struct CachingCompiler<C> {
    inner: C,
    cache: Mutex<HashMap<String, Vec<u8>>>,
}

impl<C: SchemaCompiler> CachingCompiler<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn digest(sources: &[SourceFile]) -> String {
        let mut sorted: Vec<&SourceFile> = sources.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));

        let mut hasher = Sha256::new();
        for source in sorted {
            // Length prefixes keep ("ab", "c") and ("a", "bc") apart.
            hasher.update((source.path.len() as u64).to_le_bytes());
            hasher.update(source.path.as_bytes());
            hasher.update((source.content.len() as u64).to_le_bytes());
            hasher.update(source.content.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<C: SchemaCompiler> SchemaCompiler for CachingCompiler<C> {
    fn compile(&self, sources: &[SourceFile]) -> Result<CompileOutcome, CompileError> {
        let key = Self::digest(sources);
        if let Some(bytes) = self.cache.lock().unwrap_or_else(PoisonError::into_inner).get(&key) {
            tracing::debug!("descriptor set cache hit");
            return Ok(CompileOutcome::Compiled(bytes.clone()));
        }

        let outcome = self.inner.compile(sources)?;
        if let CompileOutcome::Compiled(bytes) = &outcome {
            self.cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, bytes.clone());
        }
        Ok(outcome)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerKind {
    #[default]
    Protoc,
    Pure,
}

/// Configuration for the compiler
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub kind: CompilerKind,
    /// `protoc` executable; looked up on `PATH` when unset
    pub protoc_path: Option<PathBuf>,
}

impl CompilerConfig {
    /// Builds the configured compiler, with caching.
    pub fn build(&self) -> Box<dyn SchemaCompiler> {
        match self.kind {
            CompilerKind::Protoc => {
                let protoc = self
                    .protoc_path
                    .clone()
                    .map(ProtocCompiler::new)
                    .unwrap_or_default();
                Box::new(CachingCompiler::new(protoc))
            }
            CompilerKind::Pure => Box::new(CachingCompiler::new(PureCompiler)),
        }
    }
}

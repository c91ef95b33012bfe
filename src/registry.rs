//! Publishing schema changes against a versioned store.
//!
//! [`SchemaRegistry::publish`] validates a set of changed files against the
//! latest stored state, computes new package versions and commits both in one
//! optimistic transaction. A [`StoreError::Conflict`] means another publish
//! won the race; calling `publish` again starts over from a fresh snapshot.

use crate::compat::{ValidationConfig, ValidationEngine, ValidationReport};
use crate::compiler::{CompileOutcome, SchemaCompiler, SourceFile};
use crate::descriptor::DescriptorSet;
use crate::error::{Error, Result, StoreError};
use crate::versioning::{SchemaVersion, SchemaVersioner, SemverSchemaVersioner};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{LazyLock, Mutex, PoisonError};

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s+(?:public\s+|weak\s+)?"([^"]+)"\s*;"#)
        .expect("valid import pattern")
});

/// Stored state at one revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub revision: u64,
    /// Import path -> file content
    pub files: BTreeMap<String, String>,
    /// Package -> latest published version
    pub versions: BTreeMap<String, SchemaVersion>,
}

/// Files and versions to write on top of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commit {
    pub files: BTreeMap<String, String>,
    pub versions: BTreeMap<String, SchemaVersion>,
}

/// Storage for published schemas.
pub trait SchemaStore: Send + Sync {
    fn snapshot(&self) -> std::result::Result<Snapshot, StoreError>;

    /// Applies `commit` if the store is still at `base_revision` and returns
    /// the new revision.
    fn commit(&self, base_revision: u64, commit: Commit) -> std::result::Result<u64, StoreError>;
}

/// In-process store, mostly useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySchemaStore {
    state: Mutex<Snapshot>,
}

impl MemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }
}

impl SchemaStore for MemorySchemaStore {
    fn snapshot(&self) -> std::result::Result<Snapshot, StoreError> {
        Ok(self.state.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn commit(&self, base_revision: u64, commit: Commit) -> std::result::Result<u64, StoreError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.revision != base_revision {
            return Err(StoreError::Conflict {
                expected: base_revision,
                actual: state.revision,
            });
        }
        state.files.extend(commit.files);
        state.versions.extend(commit.versions);
        state.revision += 1;
        tracing::info!(revision = state.revision, "committed schema changes");
        Ok(state.revision)
    }
}

/// Outcome of a publish attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishResult {
    /// Diagnostics of a candidate that does not compile
    pub compile_error: Option<String>,
    pub report: Option<ValidationReport>,
    /// New version per touched package
    pub versions: BTreeMap<String, SchemaVersion>,
    /// Revision written, if anything was committed
    pub revision: Option<u64>,
}

impl PublishResult {
    pub fn committed(&self) -> bool {
        self.revision.is_some()
    }
}

/// Import paths referenced by a schema file.
pub fn imports(content: &str) -> impl Iterator<Item = &str> {
    IMPORT
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
}

/// `roots` plus everything they import, transitively, as far as `files`
/// knows about.
fn import_closure(roots: &BTreeSet<String>, files: &BTreeMap<String, String>) -> BTreeSet<String> {
    let mut closure = BTreeSet::new();
    let mut queue: VecDeque<&str> = roots.iter().map(String::as_str).collect();
    while let Some(path) = queue.pop_front() {
        let Some(content) = files.get(path) else {
            continue;
        };
        if !closure.insert(path.to_string()) {
            continue;
        }
        queue.extend(imports(content).filter(|i| !closure.contains(*i)));
    }
    closure
}

fn sources(paths: &BTreeSet<String>, files: &BTreeMap<String, String>) -> Vec<SourceFile> {
    paths
        .iter()
        .filter_map(|p| files.get(p).map(|c| SourceFile::new(p.clone(), c.clone())))
        .collect()
}

pub struct SchemaRegistry<S, C, V = SemverSchemaVersioner> {
    store: S,
    compiler: C,
    versioner: V,
    engine: ValidationEngine,
    config: ValidationConfig,
}

impl<S: SchemaStore, C: SchemaCompiler> SchemaRegistry<S, C> {
    pub fn new(store: S, compiler: C, config: ValidationConfig) -> Result<Self> {
        let engine = ValidationEngine::from_config(&config)?;
        Ok(Self {
            store,
            compiler,
            versioner: SemverSchemaVersioner,
            engine,
            config,
        })
    }
}

impl<S: SchemaStore, C: SchemaCompiler, V: SchemaVersioner> SchemaRegistry<S, C, V> {
    pub fn with_versioner<W: SchemaVersioner>(self, versioner: W) -> SchemaRegistry<S, C, W> {
        SchemaRegistry {
            store: self.store,
            compiler: self.compiler,
            versioner,
            engine: self.engine,
            config: self.config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn build(
        &self,
        sources: &[SourceFile],
        touched: &BTreeSet<String>,
    ) -> Result<std::result::Result<DescriptorSet, String>> {
        if sources.is_empty() {
            return Ok(Ok(DescriptorSet::empty()));
        }
        match self.compiler.compile(sources)? {
            CompileOutcome::Compiled(bytes) => {
                Ok(Ok(DescriptorSet::from_bytes(&bytes, |name| touched.contains(name))?))
            }
            CompileOutcome::Failed(diagnostics) => Ok(Err(diagnostics)),
        }
    }

    /// Validates `files` against the stored schemas and, unless `dry_run` or
    /// a violation of a failing kind was found, commits them with new package
    /// versions.
    pub fn publish(&self, files: Vec<SourceFile>, dry_run: bool) -> Result<PublishResult> {
        let snapshot = self.store.snapshot()?;
        let touched: BTreeSet<String> = files.iter().map(|f| f.path.clone()).collect();

        let mut overlay = snapshot.files.clone();
        overlay.extend(files.into_iter().map(|f| (f.path, f.content)));

        // Imports may have changed too, so each side gets its own closure.
        let current_sources = sources(&import_closure(&touched, &snapshot.files), &snapshot.files);
        let candidate_sources = sources(&import_closure(&touched, &overlay), &overlay);
        tracing::debug!(
            revision = snapshot.revision,
            touched = touched.len(),
            current = current_sources.len(),
            candidate = candidate_sources.len(),
            "publishing"
        );

        let current = self
            .build(&current_sources, &touched)?
            .map_err(Error::CurrentSchemaInvalid)?;
        let candidate = match self.build(&candidate_sources, &touched)? {
            Ok(set) => set,
            Err(diagnostics) => {
                return Ok(PublishResult {
                    compile_error: Some(diagnostics),
                    ..Default::default()
                });
            }
        };

        let report = self.engine.validate(&current, &candidate);
        if self.config.fails(&report) {
            tracing::info!(violations = report.violations.len(), "publish rejected");
            return Ok(PublishResult {
                report: Some(report),
                ..Default::default()
            });
        }

        let packages: BTreeSet<&str> = current
            .files()
            .chain(candidate.files())
            .map(|f| f.package.as_str())
            .collect();
        let versions: BTreeMap<String, SchemaVersion> = packages
            .into_iter()
            .map(|package| {
                let version = self.versioner.determine_version(
                    package,
                    snapshot.versions.get(package).copied(),
                    &current,
                    &candidate,
                );
                (package.to_string(), version)
            })
            .collect();

        let revision = if dry_run {
            None
        } else {
            let commit = Commit {
                files: touched
                    .iter()
                    .filter_map(|p| overlay.get(p).map(|c| (p.clone(), c.clone())))
                    .collect(),
                versions: versions.clone(),
            };
            Some(self.store.commit(snapshot.revision, commit)?)
        };

        Ok(PublishResult {
            compile_error: None,
            report: Some(report),
            versions,
            revision,
        })
    }
}

//! Error types

use thiserror::Error;

/// Result type for crate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures while turning raw descriptors into a descriptor graph
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(
        "Missing dependency. File {file} depends on {dependency}, which is not included in the descriptor set"
    )]
    MissingDependency { file: String, dependency: String },

    #[error("File {0} appears more than once in the descriptor set")]
    DuplicateFile(String),

    #[error("Symbol {name} in file {file} is already defined")]
    DuplicateSymbol { name: String, file: String },

    #[error("Dependency cycle between files: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("Invalid descriptor set: {0}")]
    Decode(#[from] protobuf::Error),
}

/// The compiler could not be run at all. A compiler that ran and rejected its
/// input is not an error; see `CompileOutcome::Failed`.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid source path: {0}")]
    InvalidPath(String),

    #[error("Failed to encode descriptor set: {0}")]
    Encode(#[from] protobuf::Error),
}

/// Errors raised by a schema store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(
        "Snapshot changed concurrently (expected revision {expected}, found {actual}), retry with fresh state"
    )]
    Conflict { expected: u64, actual: u64 },

    #[error("Schema store is unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unknown rule: {0}")]
    UnknownRule(String),
}

#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Semver error: {0}")]
    Semver(#[from] semver::Error),

    #[error("Schema versions carry no pre-release or build metadata: {0}")]
    Unsupported(String),
}

/// Crate-level error
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("Stored schemas failed to compile: {0}")]
    CurrentSchemaInvalid(String),
}

//! Validation and semantic versioning of evolving protocol buffer schemas.
//!
//! A typical pipeline compiles the published ("current") and proposed
//! ("candidate") sources, builds a [`DescriptorSet`] for each, validates the
//! candidate with a [`ValidationEngine`] and derives the next package version
//! with a [`SchemaVersioner`].
//!
//! ```no_run
//! use proto_semver::{
//!     CompileOutcome, DescriptorSet, PureCompiler, SchemaCompiler, SourceFile, ValidationEngine,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let compile = |content: &str| -> anyhow::Result<DescriptorSet> {
//!     match PureCompiler.compile(&[SourceFile::new("shop/order.proto", content)])? {
//!         CompileOutcome::Compiled(bytes) => Ok(DescriptorSet::from_bytes(&bytes, |_| true)?),
//!         CompileOutcome::Failed(diagnostics) => anyhow::bail!(diagnostics),
//!     }
//! };
//! let current = compile("syntax = \"proto3\"; package shop; message Order { int32 id = 1; }")?;
//! let candidate = compile("syntax = \"proto3\"; package shop; message Order { string id = 1; }")?;
//!
//! let report = ValidationEngine::with_default_rules().validate(&current, &candidate);
//! for violation in &report.violations {
//!     println!("{} {}", violation.kind, violation.description);
//! }
//! # Ok(())
//! # }
//! ```

pub mod compat;
pub mod compiler;
pub mod config;
pub mod descriptor;
pub mod diff;
pub mod error;
pub mod registry;
pub mod versioning;

pub use compat::{ValidationConfig, ValidationEngine, ValidationReport, Violation, ViolationKind};
pub use compiler::{
    CompileOutcome, CompilerConfig, ProtocCompiler, PureCompiler, SchemaCompiler, SourceFile,
};
pub use config::Config;
pub use descriptor::DescriptorSet;
pub use error::{Error, Result};
pub use registry::{MemorySchemaStore, PublishResult, SchemaRegistry, SchemaStore};
pub use versioning::{SchemaVersion, SchemaVersioner, SemverSchemaVersioner};

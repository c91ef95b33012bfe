//! Shared helpers for integration tests: inline `.proto` sources compiled
//! with the in-process parser.

#![allow(dead_code)]

use protobuf::Message;
use protobuf::descriptor::FileDescriptorSet;
use proto_semver::compat::ValidationReport;
use proto_semver::{CompileOutcome, DescriptorSet, PureCompiler, SchemaCompiler, SourceFile};

/// Compiles `files` (path, content) into a raw descriptor set.
pub fn compile_raw(files: &[(&str, &str)]) -> FileDescriptorSet {
    let sources: Vec<SourceFile> = files.iter().map(|(p, c)| SourceFile::new(*p, *c)).collect();
    match PureCompiler.compile(&sources).expect("compiler should run") {
        CompileOutcome::Compiled(bytes) => {
            FileDescriptorSet::parse_from_bytes(&bytes).expect("valid descriptor set")
        }
        CompileOutcome::Failed(diagnostics) => {
            panic!("Failed to compile test sources: {diagnostics}")
        }
    }
}

/// Builds a graph with every file in `fds` selected.
pub fn build(fds: FileDescriptorSet) -> DescriptorSet {
    DescriptorSet::from_file_descriptor_set(fds, |_| true).expect("Failed to build descriptor set")
}

/// Compiles `files` and selects exactly those files.
pub fn compile(files: &[(&str, &str)]) -> DescriptorSet {
    let names: Vec<&str> = files.iter().map(|(p, _)| *p).collect();
    DescriptorSet::from_file_descriptor_set(compile_raw(files), |name| {
        names.iter().any(|n| *n == name)
    })
    .expect("Failed to build descriptor set")
}

/// Single-file shorthand.
pub fn compile_one(path: &str, content: &str) -> DescriptorSet {
    compile(&[(path, content)])
}

/// Rule ids and descriptions of every violation, for assertion messages.
pub fn describe(report: &ValidationReport) -> Vec<String> {
    report
        .violations
        .iter()
        .map(|v| format!("{} {} {}: {}", v.rule_id, v.kind, v.element, v.description))
        .collect()
}

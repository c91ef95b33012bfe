//! File-level rules, evaluated against the candidate file when it is added or
//! changed.

use crate::compat::categories::ViolationKind;
use crate::compat::types::{Event, Rule, RuleContext};
use crate::descriptor::FileDescriptor;
use crate::diff::Change;
use std::path::Path;

#[derive(Debug, Default)]
pub struct PackageRequiredRule;

impl Rule for PackageRequiredRule {
    fn id(&self) -> &'static str {
        "PACKAGE_REQUIRED"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        if let Event::File(change) = event {
            if change.candidate().is_some_and(|f| f.package.is_empty()) {
                ctx.report(ViolationKind::BestPractice, "package must always be set");
            }
        }
        Ok(())
    }
}

/// `foo/bar/baz.proto` must declare `package foo.bar`.
#[derive(Debug, Default)]
pub struct FilePathAndPackageMatchRule;

impl FilePathAndPackageMatchRule {
    fn matches(file: &FileDescriptor) -> bool {
        let Some(parent) = Path::new(&file.name).parent() else {
            return false;
        };
        let segments: Vec<_> = parent
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        !segments.is_empty() && segments.join(".") == file.package
    }
}

impl Rule for FilePathAndPackageMatchRule {
    fn id(&self) -> &'static str {
        "FILE_PATH_PACKAGE_MATCH"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        if let Event::File(change) = event {
            if change.candidate().is_some_and(|f| !Self::matches(f)) {
                ctx.report(ViolationKind::BestPractice, "proto file path must match package name");
            }
        }
        Ok(())
    }
}

/// Opt-in: files should pin their Java package, and keep it.
#[derive(Debug, Default)]
pub struct JavaPackageRule;

impl Rule for JavaPackageRule {
    fn id(&self) -> &'static str {
        "JAVA_PACKAGE"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        let Event::File(change) = event else {
            return Ok(());
        };
        if let Some(candidate) = change.candidate() {
            if candidate.java_package().is_none() {
                ctx.report(ViolationKind::BestPractice, "java_package option should be set");
            }
        }
        if let Change::Changed { current, candidate } = change {
            if current.java_package() != candidate.java_package() {
                ctx.report(
                    ViolationKind::GeneratedSourceCodeIncompatibility,
                    "Java package changed",
                );
            }
        }
        Ok(())
    }
}

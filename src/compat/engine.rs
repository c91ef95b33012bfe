//! Validation engine
//!
//! Runs the configured rules over every change found between two descriptor
//! sets and collects what they report.

use crate::compat::categories::ViolationKind;
use crate::compat::rule_registry;
use crate::compat::types::{
    Diagnostic, DiagnosticLevel, Event, Located, Rule, RuleContext, Violation,
};
use crate::descriptor::{
    Descriptor, DescriptorSet, EnumDescriptor, EnumValueDescriptor, FieldDescriptor,
    FileDescriptor, MessageDescriptor, MethodDescriptor, OneofDescriptor, ServiceDescriptor,
};
use crate::diff::{self, Change, ComparingVisitor, Pair};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Specific rules to enable (defaults are used when empty)
    pub use_rules: Vec<String>,
    /// Rules to explicitly disable
    pub except_rules: Vec<String>,
    /// Violation kinds that make a validation fail
    pub fail_on: Vec<ViolationKind>,
}

impl ValidationConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from the `validation` key of a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        struct ConfigFile {
            validation: Option<ValidationConfig>,
        }

        let config_file: ConfigFile = serde_yaml::from_str(yaml)?;
        Ok(config_file.validation.unwrap_or_default())
    }

    pub fn fails(&self, report: &ValidationReport) -> bool {
        report.has_violations_of(&self.fail_on)
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            use_rules: Vec::new(),
            except_rules: Vec::new(),
            fail_on: vec![ViolationKind::WireIncompatibility],
        }
    }
}

/// Result of validating a candidate against the current schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// All violations, in the order rules reported them
    pub violations: Vec<Violation>,
    /// Internal problems that did not stop validation
    pub diagnostics: Vec<Diagnostic>,
    /// Rules that were executed
    pub executed_rules: Vec<String>,
}

impl ValidationReport {
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Whether any violation has one of `kinds`
    pub fn has_violations_of(&self, kinds: &[ViolationKind]) -> bool {
        self.violations.iter().any(|v| kinds.contains(&v.kind))
    }

    pub fn violations_of(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }

    /// Violation counts by kind
    pub fn summary(&self) -> BTreeMap<ViolationKind, usize> {
        let mut summary = BTreeMap::new();
        for violation in &self.violations {
            *summary.entry(violation.kind).or_insert(0) += 1;
        }
        summary
    }

    /// Rules that failed internally at least once
    pub fn failed_rules(&self) -> Vec<&str> {
        let mut failed: Vec<&str> = self
            .diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
            .map(|d| d.rule_id.as_str())
            .collect();
        failed.sort_unstable();
        failed.dedup();
        failed
    }
}

/// Main engine for schema validation
pub struct ValidationEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl ValidationEngine {
    /// Create an engine running `rules` in the given order
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn with_default_rules() -> Self {
        Self::new(rule_registry::default_rules())
    }

    pub fn from_config(config: &ValidationConfig) -> Result<Self, ConfigError> {
        let rules = rule_registry::select_rules(&config.use_rules, &config.except_rules)?;
        Ok(Self::new(rules))
    }

    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    /// Validate `candidate` against `current`
    pub fn validate(&self, current: &DescriptorSet, candidate: &DescriptorSet) -> ValidationReport {
        let mut visitor = ValidationVisitor {
            rules: &self.rules,
            ctx: RuleContext::new(current, candidate),
        };
        diff::compare(current, candidate, &mut visitor);
        let (violations, diagnostics) = visitor.ctx.finish();

        let report = ValidationReport {
            violations,
            diagnostics,
            executed_rules: self.rule_ids().into_iter().map(String::from).collect(),
        };
        tracing::info!(
            rules = report.executed_rules.len(),
            violations = report.violations.len(),
            diagnostics = report.diagnostics.len(),
            "validation finished"
        );
        report
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

/// Turns matched pairs into events and hands each to every rule.
struct ValidationVisitor<'a, 'r> {
    rules: &'r [Box<dyn Rule>],
    ctx: RuleContext<'a>,
}

impl<'a> ValidationVisitor<'a, '_> {
    fn locate<D: Descriptor>(&self, change: &Change<'a, D>) -> (Option<Located>, Option<Located>) {
        (
            change.current().map(|d| Located::of(self.ctx.current(), d)),
            change.candidate().map(|d| Located::of(self.ctx.candidate(), d)),
        )
    }

    fn dispatch<D: Descriptor>(&mut self, change: Change<'a, D>, event: Event<'a>) {
        let (current, candidate) = self.locate(&change);
        for rule in self.rules {
            self.ctx.focus(rule.id(), current.clone(), candidate.clone());
            let reported = self.ctx.violations_len();
            if let Err(err) = rule.check(&mut self.ctx, &event) {
                // Partial output of a failed rule is not trustworthy.
                self.ctx.truncate_violations(reported);
                tracing::error!(
                    rule = rule.id(),
                    element = change.subject().full_name(),
                    "rule failed: {err:#}"
                );
                self.ctx.fail(rule.id(), format!("{}: {err:#}", change.subject().full_name()));
            }
        }
    }
}

impl<'a> ComparingVisitor<'a> for ValidationVisitor<'a, '_> {
    fn visit_file(&mut self, pair: Pair<'a, FileDescriptor>) {
        if let Some(change) = pair.change() {
            self.dispatch(change, Event::File(change));
        }
    }

    fn visit_message(&mut self, pair: Pair<'a, MessageDescriptor>) {
        if let Some(change) = pair.change() {
            self.dispatch(change, Event::Message(change));
        }
    }

    fn visit_field(
        &mut self,
        pair: Pair<'a, FieldDescriptor>,
        parents: Pair<'a, MessageDescriptor>,
    ) {
        if let Some(change) = pair.change() {
            self.dispatch(change, Event::Field { change, parents });
        }
    }

    fn visit_oneof(
        &mut self,
        pair: Pair<'a, OneofDescriptor>,
        parents: Pair<'a, MessageDescriptor>,
    ) {
        if let Some(change) = pair.change() {
            self.dispatch(change, Event::Oneof { change, parents });
        }
    }

    fn visit_enum(&mut self, pair: Pair<'a, EnumDescriptor>) {
        if let Some(change) = pair.change() {
            self.dispatch(change, Event::Enum(change));
        }
    }

    fn visit_enum_value(
        &mut self,
        pair: Pair<'a, EnumValueDescriptor>,
        parents: Pair<'a, EnumDescriptor>,
    ) {
        if let Some(change) = pair.change() {
            self.dispatch(change, Event::EnumValue { change, parents });
        }
    }

    fn visit_service(&mut self, pair: Pair<'a, ServiceDescriptor>) {
        if let Some(change) = pair.change() {
            self.dispatch(change, Event::Service(change));
        }
    }

    fn visit_method(
        &mut self,
        pair: Pair<'a, MethodDescriptor>,
        parents: Pair<'a, ServiceDescriptor>,
    ) {
        if let Some(change) = pair.change() {
            self.dispatch(change, Event::Method { change, parents });
        }
    }
}

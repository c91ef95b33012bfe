//! Core types for schema validation

use crate::compat::categories::ViolationKind;
use crate::descriptor::{
    Descriptor, DescriptorKind, DescriptorSet, EnumDescriptor, EnumValueDescriptor,
    FieldDescriptor, FileDescriptor, MessageDescriptor, MethodDescriptor, OneofDescriptor,
    ServiceDescriptor,
};
use crate::diff::{Change, Pair};
use serde::{Deserialize, Serialize};

/// A compatibility or convention problem found between two schema states
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// The rule that reported this violation
    pub rule_id: String,
    pub kind: ViolationKind,
    /// Human-readable description
    pub description: String,
    /// Fully-qualified name of the descriptor the violation is about
    pub element: String,
    pub element_kind: DescriptorKind,
    pub file_path: Option<String>,
    /// Line number (1-based)
    pub line: Option<u32>,
    /// Column number (1-based)
    pub column: Option<u32>,
    /// True when the position refers to the current (old) schema because the
    /// descriptor no longer exists in the candidate
    pub references_old: bool,
}

/// Severity of an internal diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    /// The rule could not evaluate something fully
    Warning,
    /// The rule failed while running
    Error,
}

/// Something that went wrong inside the validation machinery itself, as
/// opposed to a problem with the schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule_id: String,
    pub level: DiagnosticLevel,
    pub message: String,
}

/// Phase of a descriptor change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Added,
    Removed,
    Changed,
}

/// One change delivered to every rule
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    File(Change<'a, FileDescriptor>),
    Message(Change<'a, MessageDescriptor>),
    Field {
        change: Change<'a, FieldDescriptor>,
        /// Containing message on each side
        parents: Pair<'a, MessageDescriptor>,
    },
    Oneof {
        change: Change<'a, OneofDescriptor>,
        parents: Pair<'a, MessageDescriptor>,
    },
    Enum(Change<'a, EnumDescriptor>),
    EnumValue {
        change: Change<'a, EnumValueDescriptor>,
        /// Containing enum on each side
        parents: Pair<'a, EnumDescriptor>,
    },
    Service(Change<'a, ServiceDescriptor>),
    Method {
        change: Change<'a, MethodDescriptor>,
        parents: Pair<'a, ServiceDescriptor>,
    },
}

impl Event<'_> {
    pub fn kind(&self) -> DescriptorKind {
        match self {
            Event::File(_) => DescriptorKind::File,
            Event::Message(_) => DescriptorKind::Message,
            Event::Field { .. } => DescriptorKind::Field,
            Event::Oneof { .. } => DescriptorKind::Oneof,
            Event::Enum(_) => DescriptorKind::Enum,
            Event::EnumValue { .. } => DescriptorKind::EnumValue,
            Event::Service(_) => DescriptorKind::Service,
            Event::Method { .. } => DescriptorKind::Method,
        }
    }

    pub fn phase(&self) -> Phase {
        fn phase_of<T>(change: &Change<'_, T>) -> Phase {
            match change {
                Change::Added(_) => Phase::Added,
                Change::Removed(_) => Phase::Removed,
                Change::Changed { .. } => Phase::Changed,
            }
        }
        match self {
            Event::File(c) => phase_of(c),
            Event::Message(c) => phase_of(c),
            Event::Field { change, .. } => phase_of(change),
            Event::Oneof { change, .. } => phase_of(change),
            Event::Enum(c) => phase_of(c),
            Event::EnumValue { change, .. } => phase_of(change),
            Event::Service(c) => phase_of(c),
            Event::Method { change, .. } => phase_of(change),
        }
    }
}

/// Where a descriptor sits, for attaching positions to violations
#[derive(Debug, Clone)]
pub(crate) struct Located {
    element: String,
    element_kind: DescriptorKind,
    file_path: String,
    line: Option<u32>,
    column: Option<u32>,
}

impl Located {
    pub(crate) fn of<D: Descriptor>(set: &DescriptorSet, descriptor: &D) -> Self {
        let source = descriptor.source();
        Self {
            element: descriptor.full_name().to_string(),
            element_kind: D::KIND,
            file_path: set.file(descriptor.file()).name.clone(),
            line: source.map(|s| s.start_line),
            column: source.map(|s| s.start_column),
        }
    }
}

/// Shared reporting context handed to rules
pub struct RuleContext<'a> {
    current: &'a DescriptorSet,
    candidate: &'a DescriptorSet,
    rule_id: &'static str,
    subject_current: Option<Located>,
    subject_candidate: Option<Located>,
    violations: Vec<Violation>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> RuleContext<'a> {
    pub fn new(current: &'a DescriptorSet, candidate: &'a DescriptorSet) -> Self {
        Self {
            current,
            candidate,
            rule_id: "",
            subject_current: None,
            subject_candidate: None,
            violations: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// The published schema state
    pub fn current(&self) -> &'a DescriptorSet {
        self.current
    }

    /// The proposed schema state
    pub fn candidate(&self) -> &'a DescriptorSet {
        self.candidate
    }

    pub fn rule_id(&self) -> &'static str {
        self.rule_id
    }

    /// Records a violation against the descriptor of the event being handled.
    pub fn report(&mut self, kind: ViolationKind, description: impl Into<String>) {
        let (location, references_old) = match (&self.subject_candidate, &self.subject_current) {
            (Some(candidate), _) => (Some(candidate), false),
            (None, Some(current)) => (Some(current), true),
            (None, None) => (None, false),
        };
        self.violations.push(Violation {
            rule_id: self.rule_id.to_string(),
            kind,
            description: description.into(),
            element: location.map(|l| l.element.clone()).unwrap_or_default(),
            element_kind: location.map_or(DescriptorKind::File, |l| l.element_kind),
            file_path: location.map(|l| l.file_path.clone()),
            line: location.and_then(|l| l.line),
            column: location.and_then(|l| l.column),
            references_old,
        });
    }

    /// Records a limitation the rule ran into without failing validation.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(rule = self.rule_id, "{message}");
        self.diagnostics.push(Diagnostic {
            rule_id: self.rule_id.to_string(),
            level: DiagnosticLevel::Warning,
            message,
        });
    }

    pub(crate) fn fail(&mut self, rule_id: &'static str, message: String) {
        self.diagnostics.push(Diagnostic {
            rule_id: rule_id.to_string(),
            level: DiagnosticLevel::Error,
            message,
        });
    }

    pub(crate) fn focus(
        &mut self,
        rule_id: &'static str,
        current: Option<Located>,
        candidate: Option<Located>,
    ) {
        self.rule_id = rule_id;
        self.subject_current = current;
        self.subject_candidate = candidate;
    }

    pub(crate) fn violations_len(&self) -> usize {
        self.violations.len()
    }

    pub(crate) fn truncate_violations(&mut self, len: usize) {
        self.violations.truncate(len);
    }

    pub(crate) fn finish(self) -> (Vec<Violation>, Vec<Diagnostic>) {
        (self.violations, self.diagnostics)
    }
}

/// A validation rule
///
/// Rules see every change exactly once and report through the context. An
/// `Err` is treated as an internal failure of the rule, never as a violation.
pub trait Rule: Send + Sync {
    /// Registry identifier, e.g. `FIELD_LABEL`
    fn id(&self) -> &'static str;

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()>;
}

//! Rules for fields that exist on both sides.

use crate::compat::categories::ViolationKind;
use crate::compat::type_compat::{TypeChecker, TypeCompatibility, referenced_type_name};
use crate::compat::types::{Event, Rule, RuleContext};
use crate::descriptor::{FieldDescriptor, Label};
use crate::diff::Change;

/// Extracts the two sides of a changed field.
fn changed_field<'a>(event: &Event<'a>) -> Option<(&'a FieldDescriptor, &'a FieldDescriptor)> {
    match event {
        Event::Field {
            change: Change::Changed { current, candidate },
            ..
        } => Some((*current, *candidate)),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct FieldNumberRule;

impl Rule for FieldNumberRule {
    fn id(&self) -> &'static str {
        "FIELD_NUMBER"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        if let Some((current, candidate)) = changed_field(event) {
            if current.number != candidate.number {
                ctx.report(ViolationKind::WireIncompatibility, "field number changed");
            }
        }
        Ok(())
    }
}

/// Moving to or from `required` breaks decoding; switching between singular
/// and repeated only changes generated code.
#[derive(Debug, Default)]
pub struct FieldLabelRule;

impl Rule for FieldLabelRule {
    fn id(&self) -> &'static str {
        "FIELD_LABEL"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        let Some((current, candidate)) = changed_field(event) else {
            return Ok(());
        };
        let required = |f: &FieldDescriptor| f.label == Label::Required;
        let repeated = |f: &FieldDescriptor| f.label == Label::Repeated;
        if required(current) != required(candidate) {
            ctx.report(ViolationKind::WireIncompatibility, "field label changed to/from required");
        } else if repeated(current) != repeated(candidate) {
            ctx.report(ViolationKind::GeneratedSourceCodeIncompatibility, "field label changed");
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FieldJsonNameRule;

impl Rule for FieldJsonNameRule {
    fn id(&self) -> &'static str {
        "FIELD_JSON_NAME"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        if let Some((current, candidate)) = changed_field(event) {
            if current.json_name != candidate.json_name {
                ctx.report(
                    ViolationKind::WireIncompatibility,
                    format!("json name changed ({} -> {})", current.json_name, candidate.json_name),
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FieldNameChangeRule;

impl Rule for FieldNameChangeRule {
    fn id(&self) -> &'static str {
        "FIELD_NAME_CHANGE"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        if let Some((current, candidate)) = changed_field(event) {
            if current.name != candidate.name {
                ctx.report(
                    ViolationKind::FieldMaskIncompatibility,
                    "field name changed - will break usage of FieldMask",
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FieldTypeCompatibilityRule;

impl Rule for FieldTypeCompatibilityRule {
    fn id(&self) -> &'static str {
        "FIELD_TYPE_COMPATIBILITY"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        let Some((current, candidate)) = changed_field(event) else {
            return Ok(());
        };
        let mut checker = TypeChecker::new(ctx.current(), ctx.candidate());
        match checker.check_fields(current, candidate) {
            TypeCompatibility::Incompatible(incompatibility) => {
                ctx.report(incompatibility.kind, incompatibility.description);
                return Ok(());
            }
            TypeCompatibility::Unknown(reason) => ctx.warn(reason),
            TypeCompatibility::Compatible => {}
        }

        let kind_changed = current.field_type != candidate.field_type;
        let type_changed = !kind_changed
            && referenced_type_name(ctx.current(), current)
                != referenced_type_name(ctx.candidate(), candidate);
        if kind_changed || type_changed {
            ctx.report(
                ViolationKind::GeneratedSourceCodeIncompatibility,
                "field type changed (wire-compat)",
            );
        }
        Ok(())
    }
}

//! Removal rules. Deprecating a declaration first makes its removal
//! acceptable for messages, enums, services, methods and enum values.

use crate::compat::categories::ViolationKind;
use crate::compat::types::{Event, Rule, RuleContext};
use crate::diff::Change;

#[derive(Debug, Default)]
pub struct MessageRemovalRule;

impl Rule for MessageRemovalRule {
    fn id(&self) -> &'static str {
        "MESSAGE_REMOVAL"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        if let Event::Message(Change::Removed(message)) = event {
            if !message.deprecated() {
                ctx.report(ViolationKind::WireIncompatibility, "message removed");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct EnumRemovalRule;

impl Rule for EnumRemovalRule {
    fn id(&self) -> &'static str {
        "ENUM_REMOVAL"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        if let Event::Enum(Change::Removed(enum_type)) = event {
            if !enum_type.deprecated() {
                ctx.report(ViolationKind::WireIncompatibility, "enum removed");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ServiceRemovalRule;

impl Rule for ServiceRemovalRule {
    fn id(&self) -> &'static str {
        "SERVICE_REMOVAL"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        if let Event::Service(Change::Removed(service)) = event {
            if !service.deprecated() {
                ctx.report(ViolationKind::WireIncompatibility, "service removed");
            }
        }
        Ok(())
    }
}

/// Reported for every removed method, including those of a removed service.
#[derive(Debug, Default)]
pub struct MethodRemovalRule;

impl Rule for MethodRemovalRule {
    fn id(&self) -> &'static str {
        "METHOD_REMOVAL"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        if let Event::Method {
            change: Change::Removed(method),
            ..
        } = event
        {
            if !method.deprecated() {
                ctx.report(ViolationKind::WireIncompatibility, "method removed");
            }
        }
        Ok(())
    }
}

/// Only fields of a message that still exists are considered; the message
/// removal itself is reported by [`MessageRemovalRule`].
#[derive(Debug, Default)]
pub struct FieldRemovalRule;

impl Rule for FieldRemovalRule {
    fn id(&self) -> &'static str {
        "FIELD_REMOVAL"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        let Event::Field {
            change: Change::Removed(field),
            parents,
        } = event
        else {
            return Ok(());
        };
        let Some(message) = parents.candidate else {
            return Ok(());
        };
        if message.is_reserved_number(field.number) && message.is_reserved_name(&field.name) {
            ctx.report(ViolationKind::GeneratedSourceCodeIncompatibility, "field made reserved");
        } else {
            ctx.report(ViolationKind::GeneratedSourceCodeIncompatibility, "field removed");
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct EnumValueRemovalRule;

impl Rule for EnumValueRemovalRule {
    fn id(&self) -> &'static str {
        "ENUM_VALUE_REMOVAL"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        let Event::EnumValue {
            change: Change::Removed(value),
            parents,
        } = event
        else {
            return Ok(());
        };
        let Some(enum_type) = parents.candidate else {
            return Ok(());
        };
        if value.deprecated() {
            return Ok(());
        }
        if enum_type.is_reserved_number(value.number) && enum_type.is_reserved_name(&value.name) {
            ctx.report(
                ViolationKind::GeneratedSourceCodeIncompatibility,
                "enum value made reserved",
            );
        } else {
            ctx.report(ViolationKind::GeneratedSourceCodeIncompatibility, "enum value removed");
        }
        Ok(())
    }
}

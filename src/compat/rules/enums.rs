use crate::compat::categories::ViolationKind;
use crate::compat::rules::naming::upper_camel_to_upper_snake;
use crate::compat::types::{Event, Rule, RuleContext};
use crate::diff::Change;

/// Value 0 is the default and should mean "unknown".
#[derive(Debug, Default)]
pub struct EnumDefaultValueRule;

impl Rule for EnumDefaultValueRule {
    fn id(&self) -> &'static str {
        "ENUM_DEFAULT_VALUE"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        let Event::Enum(change) = event else {
            return Ok(());
        };
        let Some(candidate) = change.candidate() else {
            return Ok(());
        };
        // With allow_alias several values may share number 0; any one of them
        // carrying an unknown-style name is enough.
        let has_unknown_default = candidate.values_by_number(0).any(|value| {
            let name = value.name.to_uppercase();
            name.contains("UNKNOWN") || name.contains("UNSPECIFIED")
        });
        if !has_unknown_default {
            ctx.report(
                ViolationKind::BestPractice,
                format!(
                    "enum value 0 should be used for unknown value, e.g. {}_UNSPECIFIED",
                    upper_camel_to_upper_snake(&candidate.name)
                ),
            );
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct EnumValueNameChangeRule;

impl Rule for EnumValueNameChangeRule {
    fn id(&self) -> &'static str {
        "ENUM_VALUE_NAME_CHANGE"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        if let Event::EnumValue {
            change: Change::Changed { current, candidate },
            ..
        } = event
        {
            if current.name != candidate.name {
                ctx.report(
                    ViolationKind::GeneratedSourceCodeIncompatibility,
                    "enum value name changed",
                );
            }
        }
        Ok(())
    }
}

//! Naming conventions, checked on newly added declarations only.

use crate::compat::categories::ViolationKind;
use crate::compat::types::{Event, Rule, RuleContext};
use crate::diff::Change;

pub fn is_lower_snake_case(name: &str) -> bool {
    name.to_lowercase() == name
}

pub fn is_upper_snake_case(name: &str) -> bool {
    name.to_uppercase() == name
}

pub fn is_upper_camel_case(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return false;
    };
    first.is_uppercase()
        && !name.contains('_')
        && (name.chars().count() == 1 || name.to_uppercase() != name)
}

/// `FooBarBaz` -> `FOO_BAR_BAZ`
pub fn upper_camel_to_upper_snake(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() && i > 0 {
            result.push('_');
        }
        result.extend(c.to_uppercase());
    }
    result
}

macro_rules! naming_rule {
    ($(#[$doc:meta])* $rule:ident, $id:literal, $variant:ident, $check:path, $message:literal) => {
        $(#[$doc])*
        #[derive(Debug, Default)]
        pub struct $rule;

        impl Rule for $rule {
            fn id(&self) -> &'static str {
                $id
            }

            fn check<'a>(
                &self,
                ctx: &mut RuleContext<'a>,
                event: &Event<'a>,
            ) -> anyhow::Result<()> {
                if let naming_rule!(@pattern $variant, added) = event {
                    if !$check(&added.name) {
                        ctx.report(ViolationKind::StyleGuide, $message);
                    }
                }
                Ok(())
            }
        }
    };
    (@pattern Message, $binding:ident) => { Event::Message(Change::Added($binding)) };
    (@pattern Enum, $binding:ident) => { Event::Enum(Change::Added($binding)) };
    (@pattern Service, $binding:ident) => { Event::Service(Change::Added($binding)) };
    (@pattern Field, $binding:ident) => {
        Event::Field { change: Change::Added($binding), .. }
    };
    (@pattern Oneof, $binding:ident) => {
        Event::Oneof { change: Change::Added($binding), .. }
    };
    (@pattern EnumValue, $binding:ident) => {
        Event::EnumValue { change: Change::Added($binding), .. }
    };
    (@pattern Method, $binding:ident) => {
        Event::Method { change: Change::Added($binding), .. }
    };
}

naming_rule!(
    MessageNamingRule,
    "MESSAGE_NAMING",
    Message,
    is_upper_camel_case,
    "message name should be UpperCamelCase"
);
naming_rule!(
    /// Only added fields are checked. A rename keeps the field number, so the
    /// diff reports it as a changed field and this rule does not see it.
    FieldNamingRule,
    "FIELD_NAMING",
    Field,
    is_lower_snake_case,
    "field name should be lower_snake_case"
);
naming_rule!(
    OneofNamingRule,
    "ONEOF_NAMING",
    Oneof,
    is_lower_snake_case,
    "oneof name should be lower_snake_case"
);
naming_rule!(
    EnumNamingRule,
    "ENUM_NAMING",
    Enum,
    is_upper_camel_case,
    "enum name should be UpperCamelCase"
);
naming_rule!(
    EnumValueNamingRule,
    "ENUM_VALUE_NAMING",
    EnumValue,
    is_upper_snake_case,
    "enum value should be UPPER_SNAKE_CASE"
);
naming_rule!(
    ServiceNamingRule,
    "SERVICE_NAMING",
    Service,
    is_upper_camel_case,
    "service name should be UpperCamelCase"
);
naming_rule!(
    MethodNamingRule,
    "METHOD_NAMING",
    Method,
    is_upper_camel_case,
    "method name should be UpperCamelCase"
);

/// Package names are checked whenever a file is added or changed.
#[derive(Debug, Default)]
pub struct PackageNamingRule;

impl Rule for PackageNamingRule {
    fn id(&self) -> &'static str {
        "PACKAGE_NAMING"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        let Event::File(change) = event else {
            return Ok(());
        };
        let Some(file) = change.candidate() else {
            return Ok(());
        };
        let package = file.package.as_str();
        if !is_lower_snake_case(package) {
            ctx.report(ViolationKind::StyleGuide, "package name should be all-lower case");
        }
        let lower = package.to_lowercase();
        if ["proto", "schema"]
            .iter()
            .any(|word| {
                lower.ends_with(&format!(".{word}")) || lower.contains(&format!(".{word}."))
            })
        {
            ctx.report(
                ViolationKind::StyleGuide,
                "package name should not contain 'schema' or 'proto'",
            );
        }
        Ok(())
    }
}

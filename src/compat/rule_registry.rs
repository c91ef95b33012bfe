//! Rule registry
//!
//! Every built-in rule is listed here once, in the order rules run.

use crate::compat::rules::*;
use crate::compat::types::Rule;
use crate::error::ConfigError;
use std::collections::HashSet;

type RuleFactory = fn() -> Box<dyn Rule>;

fn boxed<R: Rule + Default + 'static>() -> Box<dyn Rule> {
    Box::new(R::default())
}

/// Static rule table in execution order
const RULES: &[(&str, RuleFactory)] = &[
    // Enum rules
    ("ENUM_DEFAULT_VALUE", boxed::<EnumDefaultValueRule>),
    ("ENUM_VALUE_NAME_CHANGE", boxed::<EnumValueNameChangeRule>),
    // Field rules
    ("FIELD_JSON_NAME", boxed::<FieldJsonNameRule>),
    ("FIELD_LABEL", boxed::<FieldLabelRule>),
    ("FIELD_TYPE_COMPATIBILITY", boxed::<FieldTypeCompatibilityRule>),
    ("FIELD_NUMBER", boxed::<FieldNumberRule>),
    // Method rules
    ("METHOD_SERVER_STREAMING", boxed::<MethodServerStreamingRule>),
    ("METHOD_CLIENT_STREAMING", boxed::<MethodClientStreamingRule>),
    ("METHOD_INPUT_TYPE", boxed::<MethodInputTypeRule>),
    ("METHOD_OUTPUT_TYPE", boxed::<MethodOutputTypeRule>),
    ("METHOD_IDEMPOTENCY", boxed::<MethodIdempotencyRule>),
    // FieldMask
    ("FIELD_NAME_CHANGE", boxed::<FieldNameChangeRule>),
    // Naming
    ("MESSAGE_NAMING", boxed::<MessageNamingRule>),
    ("FIELD_NAMING", boxed::<FieldNamingRule>),
    ("ONEOF_NAMING", boxed::<OneofNamingRule>),
    ("ENUM_NAMING", boxed::<EnumNamingRule>),
    ("ENUM_VALUE_NAMING", boxed::<EnumValueNamingRule>),
    ("SERVICE_NAMING", boxed::<ServiceNamingRule>),
    ("METHOD_NAMING", boxed::<MethodNamingRule>),
    ("PACKAGE_NAMING", boxed::<PackageNamingRule>),
    // File rules
    ("PACKAGE_REQUIRED", boxed::<PackageRequiredRule>),
    ("FILE_PATH_PACKAGE_MATCH", boxed::<FilePathAndPackageMatchRule>),
    ("JAVA_PACKAGE", boxed::<JavaPackageRule>),
    // Removal
    ("MESSAGE_REMOVAL", boxed::<MessageRemovalRule>),
    ("FIELD_REMOVAL", boxed::<FieldRemovalRule>),
    ("ENUM_REMOVAL", boxed::<EnumRemovalRule>),
    ("ENUM_VALUE_REMOVAL", boxed::<EnumValueRemovalRule>),
    ("SERVICE_REMOVAL", boxed::<ServiceRemovalRule>),
    ("METHOD_REMOVAL", boxed::<MethodRemovalRule>),
];

/// Rules that only run when named in `use_rules`
pub const OPT_IN_RULES: &[&str] = &["JAVA_PACKAGE"];

/// All registered rule ids, in execution order
pub fn rule_ids() -> impl Iterator<Item = &'static str> {
    RULES.iter().map(|(id, _)| *id)
}

pub fn is_default_rule(rule_id: &str) -> bool {
    !OPT_IN_RULES.iter().any(|id| *id == rule_id)
}

pub fn is_known_rule(rule_id: &str) -> bool {
    RULES.iter().any(|(id, _)| *id == rule_id)
}

pub const fn rule_count() -> usize {
    RULES.len()
}

/// Instantiates the default rule set
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    RULES
        .iter()
        .filter(|(id, _)| is_default_rule(id))
        .map(|(_, factory)| factory())
        .collect()
}

/// Instantiates the rules selected by `use_rules` minus `except_rules`.
///
/// An empty `use_rules` selects the defaults. The result always follows
/// registry order, regardless of the order ids were listed in.
pub fn select_rules(
    use_rules: &[String],
    except_rules: &[String],
) -> Result<Vec<Box<dyn Rule>>, ConfigError> {
    for id in use_rules.iter().chain(except_rules) {
        if !is_known_rule(id) {
            return Err(ConfigError::UnknownRule(id.clone()));
        }
    }

    let selected = |id: &str| -> bool {
        if use_rules.is_empty() {
            is_default_rule(id)
        } else {
            use_rules.iter().any(|u| u == id)
        }
    };

    Ok(RULES
        .iter()
        .filter(|(id, _)| selected(*id) && !except_rules.iter().any(|e| e == id))
        .map(|(_, factory)| factory())
        .collect())
}

/// Verify rule table consistency (for testing)
pub fn verify_rules() -> Result<(), String> {
    let mut seen = HashSet::new();
    for (rule_id, factory) in RULES {
        if !seen.insert(rule_id) {
            return Err(format!("Duplicate rule ID: {rule_id}"));
        }
        let rule = factory();
        if rule.id() != *rule_id {
            return Err(format!(
                "Rule registered as {rule_id} reports id {}",
                rule.id()
            ));
        }
    }
    for opt_in in OPT_IN_RULES {
        if !is_known_rule(opt_in) {
            return Err(format!("Opt-in rule {opt_in} is not registered"));
        }
    }
    Ok(())
}

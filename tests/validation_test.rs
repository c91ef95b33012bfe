mod common;

use common::{compile_one, describe};
use protobuf::descriptor::method_options::IdempotencyLevel;
use proto_semver::compat::{DiagnosticLevel, ValidationConfig};
use proto_semver::{DescriptorSet, ValidationEngine, ValidationReport, ViolationKind};

const PATH: &str = "shop/order.proto";

fn validate(current: &str, candidate: &str) -> ValidationReport {
    ValidationEngine::with_default_rules()
        .validate(&compile_one(PATH, current), &compile_one(PATH, candidate))
}

/// (element, kind, description) of every violation reported by `rule`.
fn reported<'r>(
    report: &'r ValidationReport,
    rule: &str,
) -> Vec<(&'r str, ViolationKind, &'r str)> {
    report
        .violations
        .iter()
        .filter(|v| v.rule_id == rule)
        .map(|v| (v.element.as_str(), v.kind, v.description.as_str()))
        .collect()
}

#[test]
fn test_field_rename_breaks_field_masks() {
    let report = validate(
        r#"
syntax = "proto3";
package shop;

message Order {
  int32 x = 1;
}
"#,
        r#"
syntax = "proto3";
package shop;

message Order {
  int32 y = 1;
}
"#,
    );

    let field_mask: Vec<_> =
        report.violations_of(ViolationKind::FieldMaskIncompatibility).collect();
    assert_eq!(field_mask.len(), 1, "{:#?}", describe(&report));
    assert_eq!(field_mask[0].rule_id, "FIELD_NAME_CHANGE");
    assert_eq!(field_mask[0].description, "field name changed - will break usage of FieldMask");
    assert_eq!(field_mask[0].element, "shop.Order.y");
    assert!(!field_mask[0].references_old);

    assert!(
        report
            .violations
            .iter()
            .all(|v| v.rule_id != "FIELD_REMOVAL" && v.rule_id != "FIELD_NAMING"),
        "A rename must not read as removal plus addition: {:#?}",
        describe(&report)
    );
}

#[test]
fn test_wire_incompatible_type_change() {
    let report = validate(
        r#"
syntax = "proto3";
package shop;

message Order {
  int32 amount = 1;
}
"#,
        r#"
syntax = "proto3";
package shop;

message Order {
  string amount = 1;
}
"#,
    );

    let wire: Vec<_> = report.violations_of(ViolationKind::WireIncompatibility).collect();
    assert_eq!(wire.len(), 1, "{:#?}", describe(&report));
    assert_eq!(wire[0].description, "wire-incompatible field type change INT32 -> STRING");
}

#[test]
fn test_wire_compatible_type_change_breaks_generated_code() {
    let report = validate(
        r#"
syntax = "proto3";
package shop;

message Order {
  int32 amount = 1;
}
"#,
        r#"
syntax = "proto3";
package shop;

message Order {
  int64 amount = 1;
}
"#,
    );

    assert_eq!(
        report.violations_of(ViolationKind::WireIncompatibility).count(),
        0,
        "{:#?}",
        describe(&report)
    );
    let generated: Vec<_> = report
        .violations_of(ViolationKind::GeneratedSourceCodeIncompatibility)
        .collect();
    assert_eq!(generated.len(), 1, "{:#?}", describe(&report));
    assert_eq!(generated[0].description, "field type changed (wire-compat)");
}

#[test]
fn test_deprecated_message_removal_is_allowed() {
    let candidate = r#"
syntax = "proto3";
package shop;

message Order {
  int32 id = 1;
}
"#;

    let deprecated = validate(
        r#"
syntax = "proto3";
package shop;

message Order {
  int32 id = 1;
}

message LegacyOrder {
  option deprecated = true;
  int32 id = 1;
}
"#,
        candidate,
    );
    assert_eq!(
        deprecated.violations_of(ViolationKind::WireIncompatibility).count(),
        0,
        "{:#?}",
        describe(&deprecated)
    );

    let plain = validate(
        r#"
syntax = "proto3";
package shop;

message Order {
  int32 id = 1;
}

message LegacyOrder {
  int32 id = 1;
}
"#,
        candidate,
    );
    let wire: Vec<_> = plain.violations_of(ViolationKind::WireIncompatibility).collect();
    assert_eq!(wire.len(), 1, "{:#?}", describe(&plain));
    assert_eq!(wire[0].description, "message removed");
    assert_eq!(wire[0].element, "shop.LegacyOrder");
    assert!(wire[0].references_old, "Removed elements point at the current schema");
}

#[test]
fn test_field_removal_and_reservation() {
    let current = r#"
syntax = "proto3";
package shop;

message Order {
  int32 id = 1;
  string note = 2;
}
"#;

    let removed = validate(
        current,
        r#"
syntax = "proto3";
package shop;

message Order {
  int32 id = 1;
}
"#,
    );
    let descriptions: Vec<_> = removed
        .violations
        .iter()
        .filter(|v| v.rule_id == "FIELD_REMOVAL")
        .map(|v| v.description.as_str())
        .collect();
    assert_eq!(descriptions, vec!["field removed"]);

    let reserved = validate(
        current,
        r#"
syntax = "proto3";
package shop;

message Order {
  reserved 2;
  reserved "note";
  int32 id = 1;
}
"#,
    );
    let removal: Vec<_> =
        reserved.violations.iter().filter(|v| v.rule_id == "FIELD_REMOVAL").collect();
    assert_eq!(removal.len(), 1, "{:#?}", describe(&reserved));
    assert_eq!(removal[0].description, "field made reserved");
    assert_eq!(removal[0].kind, ViolationKind::GeneratedSourceCodeIncompatibility);
}

#[test]
fn test_field_number_and_label_changes() {
    let report = validate(
        r#"
syntax = "proto3";
package shop;

message Order {
  int32 id = 1;
  string tag = 2;
}
"#,
        r#"
syntax = "proto3";
package shop;

message Order {
  int32 id = 3;
  repeated string tag = 2;
}
"#,
    );

    let by_rule = |rule: &str| {
        report.violations.iter().filter(|v| v.rule_id == rule).collect::<Vec<_>>()
    };
    let number = by_rule("FIELD_NUMBER");
    assert_eq!(number.len(), 1, "{:#?}", describe(&report));
    assert_eq!(number[0].element, "shop.Order.id");
    assert_eq!(number[0].kind, ViolationKind::WireIncompatibility);

    let label = by_rule("FIELD_LABEL");
    assert_eq!(label.len(), 1, "{:#?}", describe(&report));
    assert_eq!(label[0].description, "field label changed");
    assert_eq!(label[0].kind, ViolationKind::GeneratedSourceCodeIncompatibility);
}

#[test]
fn test_enum_value_rename() {
    let report = validate(
        r#"
syntax = "proto3";
package shop;

enum Status {
  STATUS_UNSPECIFIED = 0;
  PAID = 1;
}
"#,
        r#"
syntax = "proto3";
package shop;

enum Status {
  STATUS_UNSPECIFIED = 0;
  SETTLED = 1;
}
"#,
    );

    let names: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.rule_id == "ENUM_VALUE_NAME_CHANGE")
        .collect();
    assert_eq!(names.len(), 1, "{:#?}", describe(&report));
    assert!(
        report.violations.iter().all(|v| v.rule_id != "ENUM_VALUE_REMOVAL"),
        "{:#?}",
        describe(&report)
    );
}

#[test]
fn test_enum_default_value() {
    let report = ValidationEngine::with_default_rules().validate(
        &DescriptorSet::empty(),
        &compile_one(
            PATH,
            r#"
syntax = "proto3";
package shop;

enum PaymentMethod {
  CARD = 0;
  CASH = 1;
}
"#,
        ),
    );

    let default_value: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.rule_id == "ENUM_DEFAULT_VALUE")
        .collect();
    assert_eq!(default_value.len(), 1, "{:#?}", describe(&report));
    assert_eq!(
        default_value[0].description,
        "enum value 0 should be used for unknown value, e.g. PAYMENT_METHOD_UNSPECIFIED"
    );
    assert_eq!(default_value[0].kind, ViolationKind::BestPractice);
}

#[test]
fn test_naming_rules_apply_to_additions_only() {
    let badly_named = r#"
syntax = "proto3";
package shop;

message order_line {
  int32 Quantity = 1;
}
"#;

    let added = ValidationEngine::with_default_rules()
        .validate(&DescriptorSet::empty(), &compile_one(PATH, badly_named));
    let mut rules: Vec<_> = added
        .violations_of(ViolationKind::StyleGuide)
        .map(|v| v.rule_id.as_str())
        .collect();
    rules.sort_unstable();
    assert_eq!(rules, vec!["FIELD_NAMING", "MESSAGE_NAMING"], "{:#?}", describe(&added));

    let unchanged = validate(badly_named, badly_named);
    assert!(unchanged.violations.is_empty(), "{:#?}", describe(&unchanged));
}

#[test]
fn test_package_rules() {
    let report = ValidationEngine::with_default_rules().validate(
        &DescriptorSet::empty(),
        &compile_one(
            "orders.proto",
            r#"
syntax = "proto3";

message Order {
  int32 id = 1;
}
"#,
        ),
    );

    let best_practice: Vec<_> = report
        .violations_of(ViolationKind::BestPractice)
        .map(|v| v.description.as_str())
        .collect();
    assert!(best_practice.contains(&"package must always be set"), "{best_practice:?}");
    assert!(
        best_practice.contains(&"proto file path must match package name"),
        "{best_practice:?}"
    );
}

#[test]
fn test_service_changes() {
    let current = r#"
syntax = "proto3";
package shop;

message Request {}
message Response {}

service OrderService {
  rpc Get(Request) returns (Response);
  rpc Watch(Request) returns (stream Response);
  rpc Cancel(Request) returns (Response);
}
"#;
    let candidate = r#"
syntax = "proto3";
package shop;

message Request {}
message Response {}

service OrderService {
  rpc Get(Request) returns (Request);
  rpc Watch(Request) returns (Response);
}
"#;

    let report = validate(current, candidate);
    let find = |rule: &str| {
        report
            .violations
            .iter()
            .filter(|v| v.rule_id == rule)
            .map(|v| (v.element.as_str(), v.description.as_str()))
            .collect::<Vec<_>>()
    };

    assert_eq!(find("METHOD_REMOVAL"), vec![("shop.OrderService.Cancel", "method removed")]);
    assert_eq!(
        find("METHOD_SERVER_STREAMING"),
        vec![("shop.OrderService.Watch", "changed to/from server streaming")]
    );
    assert_eq!(
        find("METHOD_OUTPUT_TYPE"),
        vec![("shop.OrderService.Get", "method output type changed")]
    );
    assert!(find("METHOD_INPUT_TYPE").is_empty(), "{:#?}", describe(&report));
}

#[test]
fn test_streaming_changes() {
    let current = r#"
syntax = "proto3";
package shop;

message Request {}
message Response {}

service OrderService {
  rpc Upload(Request) returns (Response);
  rpc Download(Request) returns (stream Response);
  rpc Sync(stream Request) returns (stream Response);
}
"#;
    let candidate = r#"
syntax = "proto3";
package shop;

message Request {}
message Response {}

service OrderService {
  rpc Upload(stream Request) returns (Response);
  rpc Download(Request) returns (Response);
  rpc Sync(stream Request) returns (stream Response);
}
"#;

    let report = validate(current, candidate);
    assert_eq!(
        reported(&report, "METHOD_CLIENT_STREAMING"),
        vec![(
            "shop.OrderService.Upload",
            ViolationKind::WireIncompatibility,
            "changed to/from client streaming"
        )],
        "{:#?}",
        describe(&report)
    );
    assert_eq!(
        reported(&report, "METHOD_SERVER_STREAMING"),
        vec![(
            "shop.OrderService.Download",
            ViolationKind::WireIncompatibility,
            "changed to/from server streaming"
        )]
    );
}

#[test]
fn test_incompatible_method_input_type() {
    let messages = r#"
syntax = "proto3";
package shop;

message A { int32 a = 1; }
message B { string b = 2; }
message C { string a = 1; }
message Response {}
"#;
    let current = format!(
        "{messages}
service OrderService {{
  rpc Get(A) returns (Response);
  rpc Put(A) returns (Response);
}}
"
    );
    let candidate = format!(
        "{messages}
service OrderService {{
  rpc Get(B) returns (Response);
  rpc Put(C) returns (Response);
}}
"
    );

    let report = validate(&current, &candidate);
    let mut input = reported(&report, "METHOD_INPUT_TYPE");
    input.sort();
    assert_eq!(
        input,
        vec![
            (
                "shop.OrderService.Get",
                ViolationKind::WireIncompatibility,
                "input type changed: message types A and B are not interchangable, \
                 field a does exist in the new message type used"
            ),
            (
                "shop.OrderService.Put",
                ViolationKind::WireIncompatibility,
                "input type changed: wire-incompatible field type change INT32 -> STRING"
            ),
        ],
        "{:#?}",
        describe(&report)
    );
    assert!(reported(&report, "METHOD_OUTPUT_TYPE").is_empty());
}

/// A single `Get` method, with its idempotency level set when `level` is given.
fn with_idempotency(level: Option<IdempotencyLevel>) -> DescriptorSet {
    let mut fds = common::compile_raw(&[(
        PATH,
        r#"
syntax = "proto3";
package shop;

message Request {}
message Response {}

service OrderService {
  rpc Get(Request) returns (Response);
}
"#,
    )]);
    if let Some(level) = level {
        fds.file[0].service[0].method[0]
            .options
            .mut_or_insert_default()
            .set_idempotency_level(level);
    }
    common::build(fds)
}

#[test]
fn test_idempotency_may_only_get_stricter() {
    let engine = ValidationEngine::with_default_rules();
    let check = |from: Option<IdempotencyLevel>, to: Option<IdempotencyLevel>| {
        engine.validate(&with_idempotency(from), &with_idempotency(to))
    };

    let weakened = check(
        Some(IdempotencyLevel::NO_SIDE_EFFECTS),
        Some(IdempotencyLevel::IDEMPOTENT),
    );
    assert_eq!(
        reported(&weakened, "METHOD_IDEMPOTENCY"),
        vec![(
            "shop.OrderService.Get",
            ViolationKind::BestPractice,
            "Idempotency level changed to less strict"
        )],
        "{:#?}",
        describe(&weakened)
    );

    let dropped = check(Some(IdempotencyLevel::IDEMPOTENT), None);
    assert_eq!(reported(&dropped, "METHOD_IDEMPOTENCY").len(), 1, "{:#?}", describe(&dropped));

    let raised = check(None, Some(IdempotencyLevel::IDEMPOTENT));
    assert!(raised.violations.is_empty(), "{:#?}", describe(&raised));
}

#[test]
fn test_java_package_rule() {
    let config = ValidationConfig {
        use_rules: vec!["JAVA_PACKAGE".to_string()],
        ..Default::default()
    };
    let engine = ValidationEngine::from_config(&config).unwrap();
    let file = |java_package: &str| {
        let content = format!(
            "syntax = \"proto3\";\npackage shop;\n{java_package}\nmessage Order {{}}\n"
        );
        compile_one(PATH, &content)
    };
    fn kinds(report: &ValidationReport) -> Vec<(ViolationKind, &str)> {
        reported(report, "JAVA_PACKAGE")
            .into_iter()
            .map(|(element, kind, description)| {
                assert_eq!(element, PATH);
                (kind, description)
            })
            .collect()
    }

    let unset = engine.validate(&DescriptorSet::empty(), &file(""));
    assert_eq!(
        kinds(&unset),
        vec![(ViolationKind::BestPractice, "java_package option should be set")]
    );

    let changed = engine.validate(
        &file("option java_package = \"com.example.shop\";"),
        &file("option java_package = \"com.example.orders\";"),
    );
    assert_eq!(
        kinds(&changed),
        vec![(ViolationKind::GeneratedSourceCodeIncompatibility, "Java package changed")]
    );

    let dropped = engine.validate(&file("option java_package = \"com.example.shop\";"), &file(""));
    assert_eq!(
        kinds(&dropped),
        vec![
            (ViolationKind::BestPractice, "java_package option should be set"),
            (ViolationKind::GeneratedSourceCodeIncompatibility, "Java package changed"),
        ]
    );
}

#[test]
fn test_enum_and_service_removal() {
    let current = r#"
syntax = "proto3";
package shop;

enum Status {
  STATUS_UNKNOWN = 0;
  STATUS_OPEN = 1;
}

message Request {}
message Response {}

service OrderService {
  rpc Get(Request) returns (Response);
}
"#;
    let candidate = r#"
syntax = "proto3";
package shop;

message Request {}
message Response {}
"#;

    let report = validate(current, candidate);
    assert_eq!(
        reported(&report, "ENUM_REMOVAL"),
        vec![("shop.Status", ViolationKind::WireIncompatibility, "enum removed")]
    );
    assert_eq!(
        reported(&report, "SERVICE_REMOVAL"),
        vec![("shop.OrderService", ViolationKind::WireIncompatibility, "service removed")]
    );
    // Values go with their enum.
    assert!(reported(&report, "ENUM_VALUE_REMOVAL").is_empty(), "{:#?}", describe(&report));
}

#[test]
fn test_enum_value_removal_and_reservation() {
    let current = r#"
syntax = "proto3";
package shop;

enum Status {
  STATUS_UNKNOWN = 0;
  STATUS_B = 1;
  STATUS_C = 2;
}
"#;
    // STATUS_B gives up both its number and its name, STATUS_C only its number.
    let candidate = r#"
syntax = "proto3";
package shop;

enum Status {
  reserved 1, 2;
  reserved "STATUS_B";
  STATUS_UNKNOWN = 0;
}
"#;

    let report = validate(current, candidate);
    let mut removal = reported(&report, "ENUM_VALUE_REMOVAL");
    removal.sort();
    assert_eq!(
        removal,
        vec![
            (
                "shop.Status.STATUS_B",
                ViolationKind::GeneratedSourceCodeIncompatibility,
                "enum value made reserved"
            ),
            (
                "shop.Status.STATUS_C",
                ViolationKind::GeneratedSourceCodeIncompatibility,
                "enum value removed"
            ),
        ],
        "{:#?}",
        describe(&report)
    );
}

#[test]
fn test_naming_of_added_declarations() {
    let report = ValidationEngine::with_default_rules().validate(
        &DescriptorSet::empty(),
        &compile_one(
            PATH,
            r#"
syntax = "proto3";
package shop;

enum order_status {
  ORDER_STATUS_UNKNOWN = 0;
}

message Order {
  oneof PaymentMethod {
    string card = 1;
    string voucher = 2;
  }
}

service order_service {
  rpc get_order(Order) returns (Order);
}
"#,
        ),
    );

    let mut style: Vec<_> = report
        .violations_of(ViolationKind::StyleGuide)
        .map(|v| (v.rule_id.as_str(), v.element.as_str(), v.description.as_str()))
        .collect();
    style.sort();
    assert_eq!(
        style,
        vec![
            ("ENUM_NAMING", "shop.order_status", "enum name should be UpperCamelCase"),
            (
                "METHOD_NAMING",
                "shop.order_service.get_order",
                "method name should be UpperCamelCase"
            ),
            (
                "ONEOF_NAMING",
                "shop.Order.PaymentMethod",
                "oneof name should be lower_snake_case"
            ),
            ("SERVICE_NAMING", "shop.order_service", "service name should be UpperCamelCase"),
        ],
        "{:#?}",
        describe(&report)
    );
}

#[test]
fn test_renamed_field_is_not_checked_for_naming() {
    let report = validate(
        r#"
syntax = "proto3";
package shop;

message Order {
  int32 x = 1;
}
"#,
        r#"
syntax = "proto3";
package shop;

message Order {
  int32 BadName = 1;
}
"#,
    );

    assert_eq!(
        reported(&report, "FIELD_NAME_CHANGE"),
        vec![(
            "shop.Order.BadName",
            ViolationKind::FieldMaskIncompatibility,
            "field name changed - will break usage of FieldMask"
        )]
    );
    // A rename is a changed field, and naming rules only look at additions.
    assert!(reported(&report, "FIELD_NAMING").is_empty(), "{:#?}", describe(&report));
}

#[test]
fn test_unresolved_types_produce_warnings() {
    // Descriptor sets normally carry every dependency; drop one by hand.
    let mut current = common::compile_raw(&[(
        PATH,
        r#"
syntax = "proto3";
package shop;

message Money { int64 units = 1; }
message Order { Money total = 1; }
"#,
    )]);
    let mut candidate = current.clone();
    for fds in [&mut current, &mut candidate] {
        let file = &mut fds.file[0];
        file.message_type.retain(|m| m.name() != "Money");
    }
    candidate.file[0].message_type[0].field[0].set_type_name(".shop.Price".to_string());

    let report = ValidationEngine::with_default_rules()
        .validate(&common::build(current), &common::build(candidate));

    assert!(
        report
            .diagnostics
            .iter()
            .any(|d| {
                d.rule_id == "FIELD_TYPE_COMPATIBILITY" && d.level == DiagnosticLevel::Warning
            }),
        "{:?}",
        report.diagnostics
    );
    assert!(report.failed_rules().is_empty());
    assert!(
        report
            .violations
            .iter()
            .any(|v| v.rule_id == "FIELD_TYPE_COMPATIBILITY"
                && v.kind == ViolationKind::GeneratedSourceCodeIncompatibility),
        "{:#?}",
        describe(&report)
    );
}

#[test]
fn test_configured_rules() {
    let config = ValidationConfig {
        use_rules: vec!["FIELD_NUMBER".to_string(), "JAVA_PACKAGE".to_string()],
        ..Default::default()
    };
    let engine = ValidationEngine::from_config(&config).unwrap();
    assert_eq!(engine.rule_ids(), vec!["FIELD_NUMBER", "JAVA_PACKAGE"]);

    let report = engine.validate(
        &DescriptorSet::empty(),
        &compile_one(
            PATH,
            r#"
syntax = "proto3";
package shop;
option java_package = "com.example.shop";

message Order { int32 id = 1; }
"#,
        ),
    );
    assert!(report.violations.is_empty(), "{:#?}", describe(&report));
    assert!(!config.fails(&report));
}

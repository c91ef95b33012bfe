mod common;

use common::compile_one;
use proto_semver::compat::type_compat::check_enums;
use proto_semver::compat::{TypeChecker, TypeCompatibility, ViolationKind};
use proto_semver::descriptor::DescriptorSet;

const TYPES: &str = r#"
syntax = "proto3";
package acme.types;

message A {
  int32 a = 1;
}

message Empty {}

message WireCompatWithA {
  int64 a = 1;
}

message WireIncompatWithA {
  string a = 1;
}

message RenamedA {
  int32 b = 1;
}

message JsonRenamedA {
  int32 a = 1 [json_name = "aa"];
}

message Nested {
  A inner = 1;
}

message NestedIncompat {
  WireIncompatWithA inner = 1;
}

enum Small {
  SMALL_UNSPECIFIED = 0;
  ONE = 1;
}

enum Large {
  LARGE_UNSPECIFIED = 0;
  UNO = 1;
  DOS = 2;
}
"#;

fn types() -> DescriptorSet {
    compile_one("acme/types/types.proto", TYPES)
}

fn check(set: &DescriptorSet, from: &str, to: &str) -> TypeCompatibility {
    let current = set.find_message(&format!("acme.types.{from}")).unwrap();
    let candidate = set.find_message(&format!("acme.types.{to}")).unwrap();
    TypeChecker::new(set, set).check_messages(current, candidate)
}

fn incompatibility(outcome: TypeCompatibility) -> (ViolationKind, String) {
    match outcome {
        TypeCompatibility::Incompatible(i) => (i.kind, i.description),
        other => panic!("expected an incompatibility, got {other:?}"),
    }
}

#[test]
fn test_same_message_is_compatible() {
    let set = types();
    assert_eq!(check(&set, "A", "A"), TypeCompatibility::Compatible);
}

#[test]
fn test_wire_compatible_substitution() {
    let set = types();
    assert_eq!(check(&set, "A", "WireCompatWithA"), TypeCompatibility::Compatible);
    // Extra fields on the replacement are fine.
    assert_eq!(check(&set, "Empty", "A"), TypeCompatibility::Compatible);
}

#[test]
fn test_missing_field() {
    let set = types();
    let (kind, description) = incompatibility(check(&set, "A", "Empty"));
    assert_eq!(kind, ViolationKind::WireIncompatibility);
    assert_eq!(
        description,
        "message types A and Empty are not interchangable, field a does exist in the new message type used"
    );
}

#[test]
fn test_wire_incompatible_field() {
    let set = types();
    let (kind, description) = incompatibility(check(&set, "A", "WireIncompatWithA"));
    assert_eq!(kind, ViolationKind::WireIncompatibility);
    assert_eq!(description, "wire-incompatible field type change INT32 -> STRING");
}

#[test]
fn test_renamed_field() {
    let set = types();
    let (kind, description) = incompatibility(check(&set, "A", "RenamedA"));
    assert_eq!(kind, ViolationKind::FieldMaskIncompatibility);
    assert_eq!(
        description,
        "message types A and RenamedA are not interchangable, field a has different name in new \
         message type used (current=a, candidate=b)"
    );
}

#[test]
fn test_json_renamed_field() {
    let set = types();
    let (kind, description) = incompatibility(check(&set, "A", "JsonRenamedA"));
    assert_eq!(kind, ViolationKind::WireIncompatibility);
    assert!(description.contains("different JSON name"), "{description}");
    assert!(description.contains("(current=a, candidate=aa)"), "{description}");
}

#[test]
fn test_recursion_into_field_types() {
    let set = types();
    let (kind, description) = incompatibility(check(&set, "Nested", "NestedIncompat"));
    assert_eq!(kind, ViolationKind::WireIncompatibility);
    assert_eq!(description, "wire-incompatible field type change INT32 -> STRING");
}

#[test]
fn test_recursive_types_terminate() {
    let set = compile_one(
        "acme/types/tree.proto",
        r#"
syntax = "proto3";
package acme.types;
message Node { repeated Node children = 1; }
message Tree { repeated Tree children = 1; }
"#,
    );
    assert_eq!(check(&set, "Node", "Tree"), TypeCompatibility::Compatible);
}

#[test]
fn test_enum_containment() {
    let set = types();
    let small = set.find_enum("acme.types.Small").unwrap();
    let large = set.find_enum("acme.types.Large").unwrap();

    // Value names may differ; only numbers matter.
    assert_eq!(check_enums(small, large), TypeCompatibility::Compatible);

    let (kind, description) = incompatibility(check_enums(large, small));
    assert_eq!(kind, ViolationKind::WireIncompatibility);
    assert_eq!(
        description,
        "enum types Large and Small are not interchangable, value with number 2 does exist in the new type used"
    );
}

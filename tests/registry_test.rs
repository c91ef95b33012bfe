use proto_semver::error::StoreError;
use proto_semver::registry::{Commit, Snapshot};
use proto_semver::{
    Error, MemorySchemaStore, PureCompiler, SchemaRegistry, SchemaStore, SchemaVersion, SourceFile,
    ValidationConfig, ViolationKind,
};
use std::collections::BTreeMap;

const ORDER_V1: &str = r#"
syntax = "proto3";
package shop;

message Order {
  int32 id = 1;
}
"#;

const ORDER_WITH_NOTE: &str = r#"
syntax = "proto3";
package shop;

message Order {
  int32 id = 1;
  string note = 2;
}
"#;

const ORDER_STRING_ID: &str = r#"
syntax = "proto3";
package shop;

message Order {
  string id = 1;
}
"#;

fn order(content: &str) -> Vec<SourceFile> {
    vec![SourceFile::new("shop/order.proto", content)]
}

fn registry() -> SchemaRegistry<MemorySchemaStore, PureCompiler> {
    SchemaRegistry::new(MemorySchemaStore::new(), PureCompiler, ValidationConfig::default())
        .unwrap()
}

fn version(s: &str) -> SchemaVersion {
    s.parse().unwrap()
}

#[test]
fn test_first_publish() {
    let registry = registry();
    let result = registry.publish(order(ORDER_V1), false).unwrap();

    assert!(result.committed());
    assert_eq!(result.revision, Some(1));
    assert!(result.compile_error.is_none());
    assert_eq!(result.versions.get("shop"), Some(&version("1.0.0")));

    let snapshot = registry.store().snapshot().unwrap();
    assert_eq!(snapshot.revision, 1);
    assert_eq!(snapshot.files.get("shop/order.proto").map(String::as_str), Some(ORDER_V1));
    assert_eq!(snapshot.versions.get("shop"), Some(&version("1.0.0")));
}

#[test]
fn test_compatible_change_bumps_minor() {
    let registry = registry();
    registry.publish(order(ORDER_V1), false).unwrap();

    let result = registry.publish(order(ORDER_WITH_NOTE), false).unwrap();
    assert_eq!(result.revision, Some(2));
    assert_eq!(result.versions.get("shop"), Some(&version("1.1.0")));
    let report = result.report.unwrap();
    assert!(!report.has_violations_of(&[ViolationKind::WireIncompatibility]));
}

#[test]
fn test_republishing_the_same_content() {
    let registry = registry();
    registry.publish(order(ORDER_V1), false).unwrap();

    let result = registry.publish(order(ORDER_V1), false).unwrap();
    assert_eq!(result.versions.get("shop"), Some(&version("1.0.0")));
    assert!(!result.report.unwrap().has_violations());
}

#[test]
fn test_breaking_change_is_rejected() {
    let registry = registry();
    registry.publish(order(ORDER_V1), false).unwrap();

    let result = registry.publish(order(ORDER_STRING_ID), false).unwrap();
    assert!(!result.committed());
    assert!(result.versions.is_empty());
    let report = result.report.unwrap();
    let wire: Vec<_> = report.violations_of(ViolationKind::WireIncompatibility).collect();
    assert_eq!(wire.len(), 1);
    assert_eq!(wire[0].description, "wire-incompatible field type change INT32 -> STRING");

    let snapshot = registry.store().snapshot().unwrap();
    assert_eq!(snapshot.revision, 1);
    assert_eq!(snapshot.files.get("shop/order.proto").map(String::as_str), Some(ORDER_V1));
}

#[test]
fn test_breaking_change_accepted_when_not_failing() {
    let config = ValidationConfig {
        fail_on: Vec::new(),
        ..Default::default()
    };
    let registry = SchemaRegistry::new(MemorySchemaStore::new(), PureCompiler, config).unwrap();
    registry.publish(order(ORDER_V1), false).unwrap();

    let result = registry.publish(order(ORDER_STRING_ID), false).unwrap();
    assert_eq!(result.revision, Some(2));
    assert_eq!(result.versions.get("shop"), Some(&version("1.1.0")));
    assert!(result.report.unwrap().has_violations());
}

#[test]
fn test_dry_run_does_not_commit() {
    let registry = registry();
    registry.publish(order(ORDER_V1), false).unwrap();

    let result = registry.publish(order(ORDER_WITH_NOTE), true).unwrap();
    assert!(!result.committed());
    assert_eq!(result.versions.get("shop"), Some(&version("1.1.0")));

    let snapshot = registry.store().snapshot().unwrap();
    assert_eq!(snapshot.revision, 1);
    assert_eq!(snapshot.versions.get("shop"), Some(&version("1.0.0")));
}

#[test]
fn test_candidate_compile_error() {
    let registry = registry();
    let broken = "syntax = \"proto3\";\npackage shop;\nmessage Order { int32 id = }\n";
    let result = registry.publish(order(broken), false).unwrap();

    assert!(result.compile_error.is_some());
    assert!(result.report.is_none());
    assert!(!result.committed());
    assert_eq!(registry.store().snapshot().unwrap().revision, 0);
}

#[test]
fn test_invalid_stored_schema() {
    let snapshot = Snapshot {
        revision: 7,
        files: BTreeMap::from([("shop/order.proto".to_string(), "message {".to_string())]),
        versions: BTreeMap::new(),
    };
    let registry = SchemaRegistry::new(
        MemorySchemaStore::with_snapshot(snapshot),
        PureCompiler,
        ValidationConfig::default(),
    )
    .unwrap();

    let err = registry.publish(order(ORDER_V1), false).unwrap_err();
    assert!(matches!(err, Error::CurrentSchemaInvalid(_)), "{err}");
}

#[test]
fn test_imports_come_from_the_store() {
    let registry = registry();
    let money = r#"
syntax = "proto3";
package shop.common;
message Money { int64 units = 1; }
"#;
    let priced = r#"
syntax = "proto3";
package shop;
import "shop/common/money.proto";
message Order {
  int32 id = 1;
  shop.common.Money total = 2;
}
"#;
    registry
        .publish(vec![SourceFile::new("shop/common/money.proto", money)], false)
        .unwrap();
    registry.publish(order(ORDER_V1), false).unwrap();

    let result = registry.publish(order(priced), false).unwrap();
    assert!(result.compile_error.is_none(), "{:?}", result.compile_error);
    assert_eq!(result.revision, Some(3));
    // Only packages of the published files get a new version.
    assert_eq!(result.versions.keys().collect::<Vec<_>>(), vec!["shop"]);
    assert_eq!(result.versions.get("shop"), Some(&version("1.1.0")));
}

/// Lets another writer commit between snapshot and commit.
struct RacingStore(MemorySchemaStore);

impl SchemaStore for RacingStore {
    fn snapshot(&self) -> Result<Snapshot, StoreError> {
        self.0.snapshot()
    }

    fn commit(&self, base_revision: u64, commit: Commit) -> Result<u64, StoreError> {
        self.0.commit(base_revision, Commit::default())?;
        self.0.commit(base_revision, commit)
    }
}

#[test]
fn test_concurrent_commit_conflicts() {
    let registry = SchemaRegistry::new(
        RacingStore(MemorySchemaStore::new()),
        PureCompiler,
        ValidationConfig::default(),
    )
    .unwrap();

    let err = registry.publish(order(ORDER_V1), false).unwrap_err();
    assert!(
        matches!(err, Error::Store(StoreError::Conflict { expected: 0, actual: 1 })),
        "{err}"
    );
    assert!(registry.store().0.snapshot().unwrap().files.is_empty());
}

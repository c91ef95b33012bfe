//! Compatibility validation between a current and a candidate schema state
//!
//! Differences found by [`crate::diff`] are handed to an ordered list of
//! [`Rule`]s, each of which may report classified [`Violation`]s.

pub mod categories;
pub mod engine;
pub mod matrix;
pub mod rule_registry;
pub mod rules;
pub mod type_compat;
pub mod types;

pub use categories::ViolationKind;
pub use engine::{ValidationConfig, ValidationEngine, ValidationReport};
pub use matrix::WireCompatibilityMatrix;
pub use type_compat::{TypeChecker, TypeCompatibility, TypeIncompatibility};
pub use types::{Diagnostic, DiagnosticLevel, Event, Phase, Rule, RuleContext, Violation};

//! Structural substitutability of field and method types.
//!
//! A type used by a field may be swapped for a differently named type as long
//! as data written with the old type still decodes with the new one: same
//! field numbers, compatible field kinds, same names and JSON names for
//! messages; a superset of value numbers for enums.

use crate::compat::categories::ViolationKind;
use crate::compat::matrix::WireCompatibilityMatrix;
use crate::descriptor::{
    DescriptorSet, EnumDescriptor, FieldDescriptor, FieldType, MessageDescriptor,
};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeIncompatibility {
    pub kind: ViolationKind,
    pub description: String,
}

impl TypeIncompatibility {
    fn new(kind: ViolationKind, description: String) -> Self {
        Self { kind, description }
    }
}

/// Outcome of a substitutability check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeCompatibility {
    Compatible,
    Incompatible(TypeIncompatibility),
    /// A referenced type did not resolve, so the check could not go deeper.
    Unknown(String),
}

/// Compares types across a current and a candidate descriptor set.
pub struct TypeChecker<'a> {
    current: &'a DescriptorSet,
    candidate: &'a DescriptorSet,
    visiting: HashSet<(String, String)>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(current: &'a DescriptorSet, candidate: &'a DescriptorSet) -> Self {
        Self {
            current,
            candidate,
            visiting: HashSet::new(),
        }
    }

    pub fn check_fields(
        &mut self,
        current: &FieldDescriptor,
        candidate: &FieldDescriptor,
    ) -> TypeCompatibility {
        if current.field_type != candidate.field_type {
            if WireCompatibilityMatrix::is_wire_compatible(current.field_type, candidate.field_type)
            {
                return TypeCompatibility::Compatible;
            }
            return TypeCompatibility::Incompatible(TypeIncompatibility::new(
                ViolationKind::WireIncompatibility,
                format!(
                    "wire-incompatible field type change {} -> {}",
                    current.field_type, candidate.field_type
                ),
            ));
        }

        match current.field_type {
            FieldType::Message | FieldType::Group => {
                match (
                    self.current.field_message_type(current),
                    self.candidate.field_message_type(candidate),
                ) {
                    (Some(a), Some(b)) => self.check_messages(a, b),
                    _ => unresolved(current, candidate),
                }
            }
            FieldType::Enum => match (
                self.current.field_enum_type(current),
                self.candidate.field_enum_type(candidate),
            ) {
                (Some(a), Some(b)) => check_enums(a, b),
                _ => unresolved(current, candidate),
            },
            _ => TypeCompatibility::Compatible,
        }
    }

    pub fn check_messages(
        &mut self,
        current: &MessageDescriptor,
        candidate: &MessageDescriptor,
    ) -> TypeCompatibility {
        if current.full_name == candidate.full_name {
            // Changes inside the same type are reported where they happen.
            return TypeCompatibility::Compatible;
        }
        let key = (current.full_name.clone(), candidate.full_name.clone());
        if !self.visiting.insert(key.clone()) {
            // Already being compared further up a recursive type.
            return TypeCompatibility::Compatible;
        }
        let result = self.check_message_fields(current, candidate);
        self.visiting.remove(&key);
        result
    }

    fn check_message_fields(
        &mut self,
        current: &MessageDescriptor,
        candidate: &MessageDescriptor,
    ) -> TypeCompatibility {
        for field in &current.fields {
            let Some(replacement) = candidate.find_field_by_number(field.number) else {
                return TypeCompatibility::Incompatible(TypeIncompatibility::new(
                    ViolationKind::WireIncompatibility,
                    format!(
                        "message types {} and {} are not interchangable, field {} does exist in the new message type used",
                        current.name, candidate.name, field.name
                    ),
                ));
            };

            if field.name != replacement.name {
                return TypeCompatibility::Incompatible(TypeIncompatibility::new(
                    ViolationKind::FieldMaskIncompatibility,
                    format!(
                        "message types {} and {} are not interchangable, field {} has different name in new message type used (current={}, candidate={})",
                        current.name, candidate.name, field.name, field.name, replacement.name
                    ),
                ));
            }

            match self.check_fields(field, replacement) {
                TypeCompatibility::Compatible => {}
                other => return other,
            }

            if field.json_name != replacement.json_name {
                return TypeCompatibility::Incompatible(TypeIncompatibility::new(
                    ViolationKind::WireIncompatibility,
                    format!(
                        "message types {} and {} are not interchangable, field {} has different JSON name in new message type used (current={}, candidate={})",
                        current.name,
                        candidate.name,
                        field.name,
                        field.json_name,
                        replacement.json_name
                    ),
                ));
            }
        }
        TypeCompatibility::Compatible
    }
}

pub fn check_enums(current: &EnumDescriptor, candidate: &EnumDescriptor) -> TypeCompatibility {
    if current.full_name == candidate.full_name {
        return TypeCompatibility::Compatible;
    }
    // Values are matched by number, so relabelling a value is fine here.
    for value in &current.values {
        if candidate.values_by_number(value.number).next().is_none() {
            return TypeCompatibility::Incompatible(TypeIncompatibility::new(
                ViolationKind::WireIncompatibility,
                format!(
                    "enum types {} and {} are not interchangable, value with number {} does exist in the new type used",
                    current.name, candidate.name, value.number
                ),
            ));
        }
    }
    TypeCompatibility::Compatible
}

fn unresolved(current: &FieldDescriptor, candidate: &FieldDescriptor) -> TypeCompatibility {
    if current.type_name == candidate.type_name {
        return TypeCompatibility::Compatible;
    }
    TypeCompatibility::Unknown(format!(
        "cannot compare unresolved types {} and {} of field {}",
        display_type(&current.type_name),
        display_type(&candidate.type_name),
        candidate.full_name
    ))
}

fn display_type(name: &str) -> &str {
    if name.is_empty() { "<unknown>" } else { name.trim_start_matches('.') }
}

/// Fully-qualified name of the type a field refers to, falling back to the
/// declared name when it did not resolve.
pub fn referenced_type_name(set: &DescriptorSet, field: &FieldDescriptor) -> Option<String> {
    match field.field_type {
        FieldType::Message | FieldType::Group => Some(
            set.field_message_type(field)
                .map(|m| m.full_name.clone())
                .unwrap_or_else(|| field.type_name.trim_start_matches('.').to_string()),
        ),
        FieldType::Enum => Some(
            set.field_enum_type(field)
                .map(|e| e.full_name.clone())
                .unwrap_or_else(|| field.type_name.trim_start_matches('.').to_string()),
        ),
        _ => None,
    }
}

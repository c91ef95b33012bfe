//! Scalar vocabulary of the descriptor graph: field kinds, labels, idempotency
//! levels and descriptor kinds.

use protobuf::descriptor::field_descriptor_proto::{Label as ProtoLabel, Type as ProtoType};
use protobuf::descriptor::method_options::IdempotencyLevel as ProtoIdempotency;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Declared kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Message,
    Group,
    Enum,
    Bytes,
    String,
    Int32,
    Sint32,
    Uint32,
    Fixed32,
    Sfixed32,
    Int64,
    Sint64,
    Uint64,
    Fixed64,
    Sfixed64,
    Bool,
    Double,
    Float,
}

impl FieldType {
    pub const ALL: [FieldType; 18] = [
        FieldType::Message,
        FieldType::Group,
        FieldType::Enum,
        FieldType::Bytes,
        FieldType::String,
        FieldType::Int32,
        FieldType::Sint32,
        FieldType::Uint32,
        FieldType::Fixed32,
        FieldType::Sfixed32,
        FieldType::Int64,
        FieldType::Sint64,
        FieldType::Uint64,
        FieldType::Fixed64,
        FieldType::Sfixed64,
        FieldType::Bool,
        FieldType::Double,
        FieldType::Float,
    ];

    /// Upper-case name used in violation messages, e.g. `INT32`.
    pub fn id(&self) -> &'static str {
        match self {
            FieldType::Message => "MESSAGE",
            FieldType::Group => "GROUP",
            FieldType::Enum => "ENUM",
            FieldType::Bytes => "BYTES",
            FieldType::String => "STRING",
            FieldType::Int32 => "INT32",
            FieldType::Sint32 => "SINT32",
            FieldType::Uint32 => "UINT32",
            FieldType::Fixed32 => "FIXED32",
            FieldType::Sfixed32 => "SFIXED32",
            FieldType::Int64 => "INT64",
            FieldType::Sint64 => "SINT64",
            FieldType::Uint64 => "UINT64",
            FieldType::Fixed64 => "FIXED64",
            FieldType::Sfixed64 => "SFIXED64",
            FieldType::Bool => "BOOL",
            FieldType::Double => "DOUBLE",
            FieldType::Float => "FLOAT",
        }
    }

    /// True for kinds whose values reference a named message or enum type.
    pub fn is_named_type(&self) -> bool {
        matches!(self, FieldType::Message | FieldType::Group | FieldType::Enum)
    }
}

impl From<ProtoType> for FieldType {
    fn from(value: ProtoType) -> Self {
        match value {
            ProtoType::TYPE_DOUBLE => FieldType::Double,
            ProtoType::TYPE_FLOAT => FieldType::Float,
            ProtoType::TYPE_INT64 => FieldType::Int64,
            ProtoType::TYPE_UINT64 => FieldType::Uint64,
            ProtoType::TYPE_INT32 => FieldType::Int32,
            ProtoType::TYPE_FIXED64 => FieldType::Fixed64,
            ProtoType::TYPE_FIXED32 => FieldType::Fixed32,
            ProtoType::TYPE_BOOL => FieldType::Bool,
            ProtoType::TYPE_STRING => FieldType::String,
            ProtoType::TYPE_GROUP => FieldType::Group,
            ProtoType::TYPE_MESSAGE => FieldType::Message,
            ProtoType::TYPE_BYTES => FieldType::Bytes,
            ProtoType::TYPE_UINT32 => FieldType::Uint32,
            ProtoType::TYPE_ENUM => FieldType::Enum,
            ProtoType::TYPE_SFIXED32 => FieldType::Sfixed32,
            ProtoType::TYPE_SFIXED64 => FieldType::Sfixed64,
            ProtoType::TYPE_SINT32 => FieldType::Sint32,
            ProtoType::TYPE_SINT64 => FieldType::Sint64,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Optional,
    Required,
    Repeated,
}

impl From<ProtoLabel> for Label {
    fn from(value: ProtoLabel) -> Self {
        match value {
            ProtoLabel::LABEL_OPTIONAL => Label::Optional,
            ProtoLabel::LABEL_REQUIRED => Label::Required,
            ProtoLabel::LABEL_REPEATED => Label::Repeated,
        }
    }
}

/// Method idempotency level.
///
/// Levels form a strict partial order by strictness: `Unknown` is below every
/// declared level, and `NoSideEffects` is stricter than `Idempotent`.
/// Comparing with `<`/`>` answers "is less/more strict than".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdempotencyLevel {
    Unknown,
    Idempotent,
    NoSideEffects,
}

impl IdempotencyLevel {
    /// Whether moving a method from `self` to `to` keeps or raises strictness.
    pub fn permits_transition_to(self, to: IdempotencyLevel) -> bool {
        matches!(
            self.partial_cmp(&to),
            Some(Ordering::Less) | Some(Ordering::Equal)
        )
    }
}

impl PartialOrd for IdempotencyLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use IdempotencyLevel::*;
        match (self, other) {
            (a, b) if a == b => Some(Ordering::Equal),
            (Unknown, Idempotent) | (Unknown, NoSideEffects) | (Idempotent, NoSideEffects) => {
                Some(Ordering::Less)
            }
            (Idempotent, Unknown) | (NoSideEffects, Unknown) | (NoSideEffects, Idempotent) => {
                Some(Ordering::Greater)
            }
            _ => None,
        }
    }
}

impl From<ProtoIdempotency> for IdempotencyLevel {
    fn from(value: ProtoIdempotency) -> Self {
        match value {
            ProtoIdempotency::IDEMPOTENCY_UNKNOWN => IdempotencyLevel::Unknown,
            ProtoIdempotency::NO_SIDE_EFFECTS => IdempotencyLevel::NoSideEffects,
            ProtoIdempotency::IDEMPOTENT => IdempotencyLevel::Idempotent,
        }
    }
}

/// The eight kinds of node in a descriptor graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    File,
    Message,
    Field,
    Enum,
    EnumValue,
    Oneof,
    Service,
    Method,
}

impl DescriptorKind {
    pub fn id(&self) -> &'static str {
        match self {
            DescriptorKind::File => "file",
            DescriptorKind::Message => "message",
            DescriptorKind::Field => "field",
            DescriptorKind::Enum => "enum",
            DescriptorKind::EnumValue => "enum value",
            DescriptorKind::Oneof => "oneof",
            DescriptorKind::Service => "service",
            DescriptorKind::Method => "method",
        }
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_order() {
        use IdempotencyLevel::*;
        assert!(Unknown.permits_transition_to(Idempotent));
        assert!(Unknown.permits_transition_to(NoSideEffects));
        assert!(Idempotent.permits_transition_to(NoSideEffects));
        assert!(Idempotent.permits_transition_to(Idempotent));
        assert!(!NoSideEffects.permits_transition_to(Idempotent));
        assert!(!Idempotent.permits_transition_to(Unknown));
        assert!(!NoSideEffects.permits_transition_to(Unknown));
    }

    #[test]
    fn proto_type_names() {
        assert_eq!(FieldType::from(ProtoType::TYPE_SFIXED64).id(), "SFIXED64");
        assert_eq!(FieldType::Int32.to_string(), "INT32");
        assert_eq!(FieldType::ALL.len(), 18);
    }
}

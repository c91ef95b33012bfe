//! Descriptor records stored in a [`DescriptorSet`](super::DescriptorSet).
//!
//! Messages and enums live in arenas and are referred to by [`MessageId`] and
//! [`EnumId`]; everything else is owned by its parent. Resolved type links on
//! fields and methods are optional arena ids, never owning references.

use super::source::SourceCodeInfo;
use super::types::{DescriptorKind, FieldType, IdempotencyLevel, Label};
use protobuf::MessageField;
use protobuf::descriptor::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MethodDescriptorProto, OneofDescriptorProto, ServiceDescriptorProto,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumId(pub(crate) usize);

/// Behaviour shared by every descriptor kind.
pub trait Descriptor {
    const KIND: DescriptorKind;

    fn name(&self) -> &str;
    fn full_name(&self) -> &str;
    fn file(&self) -> FileId;
    fn source(&self) -> Option<&SourceCodeInfo>;

    /// Compares the raw declarations, source positions and comments included.
    fn structurally_eq(&self, other: &Self) -> bool;
}

macro_rules! impl_descriptor {
    ($ty:ty, $kind:expr) => {
        impl Descriptor for $ty {
            const KIND: DescriptorKind = $kind;

            fn name(&self) -> &str {
                &self.name
            }

            fn full_name(&self) -> &str {
                &self.full_name
            }

            fn file(&self) -> FileId {
                self.file
            }

            fn source(&self) -> Option<&SourceCodeInfo> {
                self.source.as_ref()
            }

            fn structurally_eq(&self, other: &Self) -> bool {
                self.proto == other.proto && self.source == other.source
            }
        }
    };
}

#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub id: FileId,
    /// Path of the file relative to the compiler's include root.
    pub name: String,
    pub package: String,
    pub messages: Vec<MessageId>,
    pub enums: Vec<EnumId>,
    pub services: Vec<ServiceDescriptor>,
    pub dependencies: Vec<FileId>,
    pub proto: FileDescriptorProto,
}

impl FileDescriptor {
    pub fn java_package(&self) -> Option<&str> {
        let options = self.proto.options.as_ref()?;
        options.has_java_package().then(|| options.java_package())
    }

    pub fn find_service(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.name == name)
    }

    /// The raw declaration with source positions and comments removed.
    pub fn proto_without_source_info(&self) -> FileDescriptorProto {
        let mut proto = self.proto.clone();
        proto.source_code_info = MessageField::none();
        proto
    }
}

impl Descriptor for FileDescriptor {
    const KIND: DescriptorKind = DescriptorKind::File;

    fn name(&self) -> &str {
        &self.name
    }

    fn full_name(&self) -> &str {
        &self.name
    }

    fn file(&self) -> FileId {
        self.id
    }

    fn source(&self) -> Option<&SourceCodeInfo> {
        None
    }

    fn structurally_eq(&self, other: &Self) -> bool {
        self.proto == other.proto
    }
}

/// A half-open (`end` exclusive) range of reserved numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedRange {
    pub start: i32,
    pub end: i32,
}

impl ReservedRange {
    pub fn contains(&self, number: i32) -> bool {
        self.start <= number && number < self.end
    }
}

#[derive(Debug, Clone)]
pub struct MessageDescriptor {
    pub id: MessageId,
    pub name: String,
    pub full_name: String,
    pub file: FileId,
    pub parent: Option<MessageId>,
    /// Position among the sibling messages of the same parent.
    pub index: usize,
    pub fields: Vec<FieldDescriptor>,
    pub nested_messages: Vec<MessageId>,
    pub nested_enums: Vec<EnumId>,
    pub oneofs: Vec<OneofDescriptor>,
    pub reserved_ranges: Vec<ReservedRange>,
    pub reserved_names: Vec<String>,
    pub source: Option<SourceCodeInfo>,
    pub proto: DescriptorProto,
}

impl MessageDescriptor {
    pub fn deprecated(&self) -> bool {
        self.proto.options.get_or_default().deprecated()
    }

    pub fn find_field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn find_field_by_number(&self, number: i32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }

    pub fn find_oneof(&self, name: &str) -> Option<&OneofDescriptor> {
        self.oneofs.iter().find(|o| o.name == name)
    }

    pub fn is_reserved_number(&self, number: i32) -> bool {
        self.reserved_ranges.iter().any(|r| r.contains(number))
    }

    pub fn is_reserved_name(&self, name: &str) -> bool {
        self.reserved_names.iter().any(|n| n == name)
    }
}

impl_descriptor!(MessageDescriptor, DescriptorKind::Message);

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub full_name: String,
    pub file: FileId,
    pub containing_message: MessageId,
    pub index: usize,
    pub number: i32,
    pub field_type: FieldType,
    pub label: Label,
    pub json_name: String,
    /// Declared type name for message and enum fields, as written by the compiler.
    pub type_name: String,
    pub message_type: Option<MessageId>,
    pub enum_type: Option<EnumId>,
    pub oneof_index: Option<i32>,
    pub source: Option<SourceCodeInfo>,
    pub proto: FieldDescriptorProto,
}

impl FieldDescriptor {
    pub fn deprecated(&self) -> bool {
        self.proto.options.get_or_default().deprecated()
    }

    /// True when the declared kind names a type but cross-linking found none.
    pub fn is_unresolved(&self) -> bool {
        match self.field_type {
            FieldType::Message | FieldType::Group => self.message_type.is_none(),
            FieldType::Enum => self.enum_type.is_none(),
            _ => false,
        }
    }
}

impl_descriptor!(FieldDescriptor, DescriptorKind::Field);

#[derive(Debug, Clone)]
pub struct OneofDescriptor {
    pub name: String,
    pub full_name: String,
    pub file: FileId,
    pub containing_message: MessageId,
    pub index: usize,
    pub source: Option<SourceCodeInfo>,
    pub proto: OneofDescriptorProto,
}

impl_descriptor!(OneofDescriptor, DescriptorKind::Oneof);

#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    pub id: EnumId,
    pub name: String,
    pub full_name: String,
    pub file: FileId,
    pub parent: Option<MessageId>,
    pub index: usize,
    pub values: Vec<EnumValueDescriptor>,
    /// Inclusive ranges, unlike message reserved ranges.
    pub reserved_ranges: Vec<(i32, i32)>,
    pub reserved_names: Vec<String>,
    pub source: Option<SourceCodeInfo>,
    pub proto: EnumDescriptorProto,
}

impl EnumDescriptor {
    pub fn allow_alias(&self) -> bool {
        self.proto.options.get_or_default().allow_alias()
    }

    pub fn deprecated(&self) -> bool {
        self.proto.options.get_or_default().deprecated()
    }

    pub fn find_value_by_name(&self, name: &str) -> Option<&EnumValueDescriptor> {
        self.values.iter().find(|v| v.name == name)
    }

    pub fn values_by_number(&self, number: i32) -> impl Iterator<Item = &EnumValueDescriptor> {
        self.values.iter().filter(move |v| v.number == number)
    }

    pub fn is_reserved_number(&self, number: i32) -> bool {
        self.reserved_ranges
            .iter()
            .any(|(start, end)| *start <= number && number <= *end)
    }

    pub fn is_reserved_name(&self, name: &str) -> bool {
        self.reserved_names.iter().any(|n| n == name)
    }
}

impl_descriptor!(EnumDescriptor, DescriptorKind::Enum);

#[derive(Debug, Clone)]
pub struct EnumValueDescriptor {
    pub name: String,
    pub full_name: String,
    pub file: FileId,
    pub containing_enum: EnumId,
    pub index: usize,
    pub number: i32,
    pub source: Option<SourceCodeInfo>,
    pub proto: EnumValueDescriptorProto,
}

impl EnumValueDescriptor {
    pub fn deprecated(&self) -> bool {
        self.proto.options.get_or_default().deprecated()
    }
}

impl_descriptor!(EnumValueDescriptor, DescriptorKind::EnumValue);

#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub name: String,
    pub full_name: String,
    pub file: FileId,
    pub index: usize,
    pub methods: Vec<MethodDescriptor>,
    pub source: Option<SourceCodeInfo>,
    pub proto: ServiceDescriptorProto,
}

impl ServiceDescriptor {
    pub fn deprecated(&self) -> bool {
        self.proto.options.get_or_default().deprecated()
    }

    pub fn find_method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }
}

impl_descriptor!(ServiceDescriptor, DescriptorKind::Service);

#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub name: String,
    pub full_name: String,
    pub file: FileId,
    pub index: usize,
    pub input_type_name: String,
    pub output_type_name: String,
    pub input_type: Option<MessageId>,
    pub output_type: Option<MessageId>,
    pub client_streaming: bool,
    pub server_streaming: bool,
    pub idempotency_level: IdempotencyLevel,
    pub source: Option<SourceCodeInfo>,
    pub proto: MethodDescriptorProto,
}

impl MethodDescriptor {
    pub fn deprecated(&self) -> bool {
        self.proto.options.get_or_default().deprecated()
    }
}

impl_descriptor!(MethodDescriptor, DescriptorKind::Method);

/// Derives the JSON name the compiler would assign to a field.
pub fn json_name(field_name: &str) -> String {
    let mut result = String::with_capacity(field_name.len());
    let mut upper_next = false;
    for c in field_name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            result.extend(c.to_uppercase());
            upper_next = false;
        } else {
            result.push(c);
        }
    }
    result
}

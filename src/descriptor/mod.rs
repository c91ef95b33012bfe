//! Typed, cross-linked descriptor graphs built from compiled schema files.
//!
//! A [`DescriptorSet`] is an immutable snapshot of one schema state. It owns
//! every file needed to resolve types, but only exposes the files selected at
//! construction through [`DescriptorSet::files`].

pub mod builder;
pub mod model;
pub mod pool;
pub mod source;
pub mod types;

pub use builder::DescriptorGraphBuilder;
pub use model::{
    Descriptor, EnumDescriptor, EnumId, EnumValueDescriptor, FieldDescriptor, FileDescriptor,
    FileId, MessageDescriptor, MessageId, MethodDescriptor, OneofDescriptor, ReservedRange,
    ServiceDescriptor, json_name,
};
pub use pool::{Symbol, SymbolPool};
pub use source::SourceCodeInfo;
pub use types::{DescriptorKind, FieldType, IdempotencyLevel, Label};

use crate::error::BuildError;
use protobuf::Message;
use protobuf::descriptor::FileDescriptorSet;

#[derive(Debug, Default)]
pub struct DescriptorSet {
    pub(crate) files: Vec<FileDescriptor>,
    pub(crate) messages: Vec<MessageDescriptor>,
    pub(crate) enums: Vec<EnumDescriptor>,
    pub(crate) selected: Vec<FileId>,
    pub(crate) pool: SymbolPool,
}

impl DescriptorSet {
    /// A set with no files, used when nothing has been published yet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decodes a serialized `FileDescriptorSet` and builds the graph for the
    /// files matching `predicate` (plus, internally, their dependencies).
    pub fn from_bytes<P>(bytes: &[u8], predicate: P) -> Result<Self, BuildError>
    where
        P: Fn(&str) -> bool,
    {
        let fds = FileDescriptorSet::parse_from_bytes(bytes)?;
        Self::from_file_descriptor_set(fds, predicate)
    }

    pub fn from_file_descriptor_set<P>(
        fds: FileDescriptorSet,
        predicate: P,
    ) -> Result<Self, BuildError>
    where
        P: Fn(&str) -> bool,
    {
        DescriptorGraphBuilder::new(fds.file).build(predicate)
    }

    /// The selected files, in input order.
    pub fn files(&self) -> impl Iterator<Item = &FileDescriptor> {
        self.selected.iter().map(|id| self.file(*id))
    }

    /// Every file built, dependency-only files included.
    pub fn all_files(&self) -> impl Iterator<Item = &FileDescriptor> {
        self.files.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn file(&self, id: FileId) -> &FileDescriptor {
        &self.files[id.0]
    }

    pub fn message(&self, id: MessageId) -> &MessageDescriptor {
        &self.messages[id.0]
    }

    pub fn enum_type(&self, id: EnumId) -> &EnumDescriptor {
        &self.enums[id.0]
    }

    pub fn pool(&self) -> &SymbolPool {
        &self.pool
    }

    /// Looks up a selected file by its path.
    pub fn file_by_name(&self, name: &str) -> Option<&FileDescriptor> {
        self.files().find(|f| f.name == name)
    }

    /// Top-level messages of a file.
    pub fn messages_of<'a>(
        &'a self,
        file: &'a FileDescriptor,
    ) -> impl Iterator<Item = &'a MessageDescriptor> {
        file.messages.iter().map(|id| self.message(*id))
    }

    /// Top-level enums of a file.
    pub fn enums_of<'a>(
        &'a self,
        file: &'a FileDescriptor,
    ) -> impl Iterator<Item = &'a EnumDescriptor> {
        file.enums.iter().map(|id| self.enum_type(*id))
    }

    pub fn nested_messages<'a>(
        &'a self,
        message: &'a MessageDescriptor,
    ) -> impl Iterator<Item = &'a MessageDescriptor> {
        message.nested_messages.iter().map(|id| self.message(*id))
    }

    pub fn nested_enums<'a>(
        &'a self,
        message: &'a MessageDescriptor,
    ) -> impl Iterator<Item = &'a EnumDescriptor> {
        message.nested_enums.iter().map(|id| self.enum_type(*id))
    }

    /// The message type a field refers to, if it resolved.
    pub fn field_message_type(&self, field: &FieldDescriptor) -> Option<&MessageDescriptor> {
        field.message_type.map(|id| self.message(id))
    }

    /// The enum type a field refers to, if it resolved.
    pub fn field_enum_type(&self, field: &FieldDescriptor) -> Option<&EnumDescriptor> {
        field.enum_type.map(|id| self.enum_type(id))
    }

    pub fn find_message(&self, full_name: &str) -> Option<&MessageDescriptor> {
        self.pool.find_message(full_name).map(|id| self.message(id))
    }

    pub fn find_enum(&self, full_name: &str) -> Option<&EnumDescriptor> {
        self.pool.find_enum(full_name).map(|id| self.enum_type(id))
    }

    pub fn find_service(&self, full_name: &str) -> Option<&ServiceDescriptor> {
        let full_name = full_name.trim_start_matches('.');
        self.files
            .iter()
            .flat_map(|f| f.services.iter())
            .find(|s| s.full_name == full_name)
    }

    pub fn find_method(&self, full_name: &str) -> Option<&MethodDescriptor> {
        let (service, name) = split_last(full_name)?;
        self.find_service(service)?.find_method(name)
    }

    pub fn find_field(&self, full_name: &str) -> Option<&FieldDescriptor> {
        let (message, name) = split_last(full_name)?;
        self.find_message(message)?.find_field_by_name(name)
    }

    pub fn find_oneof(&self, full_name: &str) -> Option<&OneofDescriptor> {
        let (message, name) = split_last(full_name)?;
        self.find_message(message)?.find_oneof(name)
    }

    pub fn find_enum_value(&self, full_name: &str) -> Option<&EnumValueDescriptor> {
        let (enum_name, name) = split_last(full_name)?;
        self.find_enum(enum_name)?.find_value_by_name(name)
    }
}

fn split_last(full_name: &str) -> Option<(&str, &str)> {
    full_name.rsplit_once('.')
}

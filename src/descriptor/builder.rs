//! Descriptor graph construction.
//!
//! Files are built in dependency order: every file's dependencies are fully
//! constructed (and their types registered in the pool) before the file
//! itself. Within a file, messages and enums come first, then services, then
//! a cross-linking pass resolves field type references.

use super::model::{
    EnumDescriptor, EnumId, EnumValueDescriptor, FieldDescriptor, FileDescriptor, FileId,
    MessageDescriptor, MessageId, MethodDescriptor, OneofDescriptor, ReservedRange,
    ServiceDescriptor, json_name,
};
use super::pool::Symbol;
use super::source::{self, PathNode};
use super::types::FieldType;
use super::DescriptorSet;
use crate::error::BuildError;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use protobuf::descriptor::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    MethodDescriptorProto, ServiceDescriptorProto,
};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// Builds a [`DescriptorSet`] from raw file descriptors.
pub struct DescriptorGraphBuilder {
    protos: Vec<FileDescriptorProto>,
}

impl DescriptorGraphBuilder {
    pub fn new(protos: Vec<FileDescriptorProto>) -> Self {
        Self { protos }
    }

    /// Builds every file matched by `predicate` together with its transitive
    /// dependencies. Only the matched files are exposed by the result.
    pub fn build<P>(self, predicate: P) -> Result<DescriptorSet, BuildError>
    where
        P: Fn(&str) -> bool,
    {
        let mut by_name: HashMap<&str, NodeIndex> = HashMap::new();
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        for (index, proto) in self.protos.iter().enumerate() {
            let node = graph.add_node(index);
            if by_name.insert(proto.name(), node).is_some() {
                return Err(BuildError::DuplicateFile(proto.name().to_string()));
            }
        }

        // Edges point from a file to each of its dependencies.
        for (index, proto) in self.protos.iter().enumerate() {
            for dependency in &proto.dependency {
                let Some(target) = by_name.get(dependency.as_str()) else {
                    return Err(BuildError::MissingDependency {
                        file: proto.name().to_string(),
                        dependency: dependency.clone(),
                    });
                };
                graph.add_edge(NodeIndex::new(index), *target, ());
            }
        }

        let required = required_closure(&graph, &self.protos, &predicate);
        let waves = construction_waves(&graph, &required).map_err(|stuck| {
            BuildError::DependencyCycle(
                stuck
                    .into_iter()
                    .map(|node| self.protos[graph[node]].name().to_string())
                    .collect(),
            )
        })?;

        let mut set = DescriptorSet::default();
        let mut built: HashMap<String, FileId> = HashMap::new();
        for (number, wave) in waves.iter().enumerate() {
            debug!(wave = number, files = wave.len(), "building descriptor wave");
            for node in wave {
                let proto = &self.protos[graph[*node]];
                let id = FileBuilder::new(&mut set, &built).build(proto)?;
                built.insert(proto.name().to_string(), id);
            }
        }

        set.selected = self
            .protos
            .iter()
            .filter(|proto| predicate(proto.name()))
            .filter_map(|proto| built.get(proto.name()).copied())
            .collect();

        debug!(
            files = set.files.len(),
            selected = set.selected.len(),
            symbols = set.pool.len(),
            "descriptor set built"
        );
        Ok(set)
    }
}

/// Breadth-first closure over dependency edges from the selected files.
fn required_closure<P>(
    graph: &DiGraph<usize, ()>,
    protos: &[FileDescriptorProto],
    predicate: &P,
) -> HashSet<NodeIndex>
where
    P: Fn(&str) -> bool,
{
    let mut required = HashSet::new();
    let mut queue: VecDeque<NodeIndex> = graph
        .node_indices()
        .filter(|node| predicate(protos[graph[*node]].name()))
        .collect();
    while let Some(node) = queue.pop_front() {
        if !required.insert(node) {
            continue;
        }
        queue.extend(
            graph
                .neighbors_directed(node, Direction::Outgoing)
                .filter(|dep| !required.contains(dep)),
        );
    }
    required
}

/// Kahn's algorithm restricted to `required`, grouped into waves. Each wave
/// only depends on earlier waves. On a cycle, returns the nodes that could
/// never be scheduled.
fn construction_waves(
    graph: &DiGraph<usize, ()>,
    required: &HashSet<NodeIndex>,
) -> Result<Vec<Vec<NodeIndex>>, Vec<NodeIndex>> {
    let mut pending: HashMap<NodeIndex, usize> = required
        .iter()
        .map(|node| {
            let deps: HashSet<NodeIndex> =
                graph.neighbors_directed(*node, Direction::Outgoing).collect();
            (*node, deps.len())
        })
        .collect();

    let mut current: Vec<NodeIndex> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| *node)
        .collect();
    current.sort();

    let mut waves = Vec::new();
    let mut scheduled = 0;
    while !current.is_empty() {
        let mut next = Vec::new();
        for node in &current {
            pending.remove(node);
            let dependents: HashSet<NodeIndex> =
                graph.neighbors_directed(*node, Direction::Incoming).collect();
            for dependent in dependents {
                if let Some(count) = pending.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        next.push(dependent);
                    }
                }
            }
        }
        scheduled += current.len();
        next.sort();
        waves.push(std::mem::replace(&mut current, next));
    }

    if scheduled < required.len() {
        let mut stuck: Vec<NodeIndex> = pending.into_keys().collect();
        stuck.sort();
        return Err(stuck);
    }
    Ok(waves)
}

/// Builds one file into the shared arenas.
struct FileBuilder<'a> {
    set: &'a mut DescriptorSet,
    built: &'a HashMap<String, FileId>,
    file: FileId,
    file_name: String,
}

impl<'a> FileBuilder<'a> {
    fn new(set: &'a mut DescriptorSet, built: &'a HashMap<String, FileId>) -> Self {
        let file = FileId(set.files.len());
        Self {
            set,
            built,
            file,
            file_name: String::new(),
        }
    }

    fn build(mut self, proto: &FileDescriptorProto) -> Result<FileId, BuildError> {
        self.file_name = proto.name().to_string();
        let package = proto.package();
        let root = proto.source_code_info.as_ref().map(PathNode::from_raw);
        let root = root.as_ref();
        let first_message = self.set.messages.len();

        let messages = proto
            .message_type
            .iter()
            .enumerate()
            .map(|(index, message)| {
                let node = root.and_then(|r| r.descend(source::FILE_MESSAGE_TYPE, index));
                self.build_message(message, None, package, index, node)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let enums = proto
            .enum_type
            .iter()
            .enumerate()
            .map(|(index, enum_proto)| {
                let node = root.and_then(|r| r.descend(source::FILE_ENUM_TYPE, index));
                self.build_enum(enum_proto, None, package, index, node)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let services = proto
            .service
            .iter()
            .enumerate()
            .map(|(index, service)| {
                let node = root.and_then(|r| r.descend(source::FILE_SERVICE, index));
                self.build_service(service, package, index, node)
            })
            .collect();

        self.cross_link(first_message);

        let dependencies = proto
            .dependency
            .iter()
            .filter_map(|name| self.built.get(name).copied())
            .collect();

        self.set.files.push(FileDescriptor {
            id: self.file,
            name: self.file_name.clone(),
            package: package.to_string(),
            messages,
            enums,
            services,
            dependencies,
            proto: proto.clone(),
        });
        Ok(self.file)
    }

    fn register(&mut self, full_name: &str, symbol: Symbol) -> Result<(), BuildError> {
        match self.set.pool.insert(full_name, symbol) {
            None => Ok(()),
            Some(_) => Err(BuildError::DuplicateSymbol {
                name: full_name.to_string(),
                file: self.file_name.clone(),
            }),
        }
    }

    fn build_message(
        &mut self,
        proto: &DescriptorProto,
        parent: Option<MessageId>,
        scope: &str,
        index: usize,
        node: Option<&PathNode>,
    ) -> Result<MessageId, BuildError> {
        let id = MessageId(self.set.messages.len());
        let full_name = qualify(scope, proto.name());
        self.register(&full_name, Symbol::Message(id))?;
        self.set.messages.push(MessageDescriptor {
            id,
            name: proto.name().to_string(),
            full_name: full_name.clone(),
            file: self.file,
            parent,
            index,
            fields: Vec::new(),
            nested_messages: Vec::new(),
            nested_enums: Vec::new(),
            oneofs: Vec::new(),
            reserved_ranges: proto
                .reserved_range
                .iter()
                .map(|r| ReservedRange {
                    start: r.start(),
                    end: r.end(),
                })
                .collect(),
            reserved_names: proto.reserved_name.clone(),
            source: node.and_then(|n| n.source_info(&self.file_name)),
            proto: proto.clone(),
        });

        let nested_messages = proto
            .nested_type
            .iter()
            .enumerate()
            .map(|(i, nested)| {
                let child = node.and_then(|n| n.descend(source::MESSAGE_NESTED_TYPE, i));
                self.build_message(nested, Some(id), &full_name, i, child)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let nested_enums = proto
            .enum_type
            .iter()
            .enumerate()
            .map(|(i, nested)| {
                let child = node.and_then(|n| n.descend(source::MESSAGE_ENUM_TYPE, i));
                self.build_enum(nested, Some(id), &full_name, i, child)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let fields = proto
            .field
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let child = node.and_then(|n| n.descend(source::MESSAGE_FIELD, i));
                self.build_field(field, id, &full_name, i, child)
            })
            .collect();

        let oneofs = proto
            .oneof_decl
            .iter()
            .enumerate()
            .map(|(i, oneof)| OneofDescriptor {
                name: oneof.name().to_string(),
                full_name: qualify(&full_name, oneof.name()),
                file: self.file,
                containing_message: id,
                index: i,
                source: node
                    .and_then(|n| n.descend(source::MESSAGE_ONEOF_DECL, i))
                    .and_then(|n| n.source_info(&self.file_name)),
                proto: oneof.clone(),
            })
            .collect();

        let message = &mut self.set.messages[id.0];
        message.nested_messages = nested_messages;
        message.nested_enums = nested_enums;
        message.fields = fields;
        message.oneofs = oneofs;
        Ok(id)
    }

    fn build_field(
        &self,
        proto: &FieldDescriptorProto,
        containing_message: MessageId,
        message_name: &str,
        index: usize,
        node: Option<&PathNode>,
    ) -> FieldDescriptor {
        FieldDescriptor {
            name: proto.name().to_string(),
            full_name: qualify(message_name, proto.name()),
            file: self.file,
            containing_message,
            index,
            number: proto.number(),
            field_type: FieldType::from(proto.type_()),
            label: proto.label().into(),
            json_name: proto
                .json_name
                .clone()
                .unwrap_or_else(|| json_name(proto.name())),
            type_name: proto.type_name().to_string(),
            message_type: None,
            enum_type: None,
            oneof_index: proto.oneof_index,
            source: node.and_then(|n| n.source_info(&self.file_name)),
            proto: proto.clone(),
        }
    }

    fn build_enum(
        &mut self,
        proto: &EnumDescriptorProto,
        parent: Option<MessageId>,
        scope: &str,
        index: usize,
        node: Option<&PathNode>,
    ) -> Result<EnumId, BuildError> {
        let id = EnumId(self.set.enums.len());
        let full_name = qualify(scope, proto.name());
        self.register(&full_name, Symbol::Enum(id))?;

        let values = proto
            .value
            .iter()
            .enumerate()
            .map(|(i, value)| EnumValueDescriptor {
                name: value.name().to_string(),
                full_name: qualify(&full_name, value.name()),
                file: self.file,
                containing_enum: id,
                index: i,
                number: value.number(),
                source: node
                    .and_then(|n| n.descend(source::ENUM_VALUE, i))
                    .and_then(|n| n.source_info(&self.file_name)),
                proto: value.clone(),
            })
            .collect();

        self.set.enums.push(EnumDescriptor {
            id,
            name: proto.name().to_string(),
            full_name,
            file: self.file,
            parent,
            index,
            values,
            reserved_ranges: proto
                .reserved_range
                .iter()
                .map(|r| (r.start(), r.end()))
                .collect(),
            reserved_names: proto.reserved_name.clone(),
            source: node.and_then(|n| n.source_info(&self.file_name)),
            proto: proto.clone(),
        });
        Ok(id)
    }

    fn build_service(
        &self,
        proto: &ServiceDescriptorProto,
        package: &str,
        index: usize,
        node: Option<&PathNode>,
    ) -> ServiceDescriptor {
        let full_name = qualify(package, proto.name());
        let methods = proto
            .method
            .iter()
            .enumerate()
            .map(|(i, method)| {
                let child = node.and_then(|n| n.descend(source::SERVICE_METHOD, i));
                self.build_method(method, &full_name, package, i, child)
            })
            .collect();
        ServiceDescriptor {
            name: proto.name().to_string(),
            full_name,
            file: self.file,
            index,
            methods,
            source: node.and_then(|n| n.source_info(&self.file_name)),
            proto: proto.clone(),
        }
    }

    fn build_method(
        &self,
        proto: &MethodDescriptorProto,
        service_name: &str,
        package: &str,
        index: usize,
        node: Option<&PathNode>,
    ) -> MethodDescriptor {
        let resolve = |type_name: &str| {
            let found = self.set.pool.resolve(type_name, package);
            match found {
                Some(Symbol::Message(id)) => Some(id),
                _ => {
                    warn!(
                        file = %self.file_name,
                        method = %qualify(service_name, proto.name()),
                        type_name,
                        "method type did not resolve to a message"
                    );
                    None
                }
            }
        };
        MethodDescriptor {
            name: proto.name().to_string(),
            full_name: qualify(service_name, proto.name()),
            file: self.file,
            index,
            input_type_name: proto.input_type().to_string(),
            output_type_name: proto.output_type().to_string(),
            input_type: resolve(proto.input_type()),
            output_type: resolve(proto.output_type()),
            client_streaming: proto.client_streaming(),
            server_streaming: proto.server_streaming(),
            idempotency_level: proto
                .options
                .get_or_default()
                .idempotency_level()
                .into(),
            source: node.and_then(|n| n.source_info(&self.file_name)),
            proto: proto.clone(),
        }
    }

    /// Resolves field type references for every message built by this file.
    fn cross_link(&mut self, first_message: usize) {
        let pool = &self.set.pool;
        for message in &mut self.set.messages[first_message..] {
            for field in &mut message.fields {
                if !field.field_type.is_named_type() {
                    continue;
                }
                match (field.field_type, pool.resolve(&field.type_name, &message.full_name)) {
                    (FieldType::Enum, Some(Symbol::Enum(id))) => field.enum_type = Some(id),
                    (FieldType::Message | FieldType::Group, Some(Symbol::Message(id))) => {
                        field.message_type = Some(id)
                    }
                    (kind, found) => warn!(
                        file = %self.file_name,
                        field = %field.full_name,
                        type_name = %field.type_name,
                        kind = %kind,
                        found = ?found,
                        "field type reference left unresolved"
                    ),
                }
            }
        }
    }
}

/// Joins a scope (package or enclosing type) and a simple name.
fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

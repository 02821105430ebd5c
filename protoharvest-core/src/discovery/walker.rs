use super::FileSet;
use prost_reflect::{
    EnumDescriptor, FieldDescriptor, FileDescriptor, Kind, MessageDescriptor, MethodDescriptor,
    ServiceDescriptor,
};
use std::collections::HashSet;

/// Collects the files reachable from one or more services.
///
/// Message and enum types are expanded at most once per walker, keyed by their fully qualified
/// name, so the walk terminates on self-referencing or mutually-referencing messages.
#[derive(Debug, Default)]
pub struct SchemaWalker {
    visited: HashSet<String>,
    files: FileSet,
}

impl SchemaWalker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the service's file, then walks every one of its methods.
    pub fn walk_service(&mut self, service: &ServiceDescriptor) {
        tracing::debug!(service = service.full_name(), "Walking service");

        self.add_file(service.parent_file());

        for method in service.methods() {
            self.walk_method(&method);
        }
    }

    /// Records the method's file, then walks its input and output messages.
    ///
    /// The method's file is recorded on its own, even though it normally is the service's file.
    pub fn walk_method(&mut self, method: &MethodDescriptor) {
        self.add_file(method.parent_file());
        self.walk_message(&method.input());
        self.walk_message(&method.output());
    }

    /// Records the message's file, then walks every one of its fields.
    pub fn walk_message(&mut self, message: &MessageDescriptor) {
        if !self.visited.insert(message.full_name().to_string()) {
            return;
        }

        tracing::trace!(message = message.full_name(), "Expanding message");

        self.add_file(message.parent_file());

        for field in message.fields() {
            self.walk_field(&field);
        }
    }

    fn walk_field(&mut self, field: &FieldDescriptor) {
        match field.kind() {
            Kind::Enum(enum_desc) => self.walk_enum(&enum_desc),
            // Map entries are synthetic messages declared next to the field, only their key
            // and value types can bring in new files.
            Kind::Message(entry) if field.is_map() => {
                self.walk_field(&entry.map_entry_key_field());
                self.walk_field(&entry.map_entry_value_field());
            }
            Kind::Message(message) => self.walk_message(&message),
            _ => {}
        }
    }

    fn walk_enum(&mut self, enum_desc: &EnumDescriptor) {
        if self.visited.insert(enum_desc.full_name().to_string()) {
            self.add_file(enum_desc.parent_file());
        }
    }

    fn add_file(&mut self, file: FileDescriptor) {
        if !self.files.contains(file.name()) {
            tracing::debug!(file = file.name(), "Discovered file");
            self.files.insert(file);
        }
    }

    /// Files collected so far.
    pub fn files(&self) -> &FileSet {
        &self.files
    }

    pub fn into_files(self) -> FileSet {
        self.files
    }
}

/// Returns every file reachable from `service`.
///
/// No filtering happens here: the reflection protocol's own files are removed when partial
/// results are combined with [`FileSet::merge`].
pub fn discover_service_files(service: &ServiceDescriptor) -> FileSet {
    let mut walker = SchemaWalker::new();
    walker.walk_service(service);
    walker.into_files()
}
